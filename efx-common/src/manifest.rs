//! Content item manifest (`config.json`)
//!
//! Every experiment, survey or game folder carries a `config.json` holding a
//! JSON array with a single object. The pipeline only reads it; it is never
//! rewritten.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Number, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Manifest file name inside every content folder
pub const MANIFEST_FILE: &str = "config.json";

/// Identifier field; `tag` is the legacy spelling
pub const ID_FIELD: &str = "exp_id";
pub const LEGACY_ID_FIELD: &str = "tag";

/// Errors reading or interpreting a manifest file
#[derive(Debug, Error)]
pub enum ManifestError {
    /// No `config.json` in the folder
    #[error("config.json could not be found in {0}")]
    Missing(PathBuf),

    /// File exists but could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid JSON
    #[error("{path} is not loadable: {source}")]
    Unparsable {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Array holds more than one object
    #[error("config.json has length > 1, not valid")]
    MultipleEntries,

    /// Top level is neither an object nor a one-element array of objects
    #[error("config.json must hold a single JSON object")]
    NotAnObject,

    /// A field has the wrong shape for the typed model
    #[error("field {field}: {message}")]
    Field { field: String, message: String },
}

/// Experiment template family (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    Jspsych,
    Survey,
    Phaser,
    Custom,
}

impl Template {
    /// All supported templates, in documentation order
    pub const ALL: [Template; 4] = [
        Template::Jspsych,
        Template::Survey,
        Template::Phaser,
        Template::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Template::Jspsych => "jspsych",
            Template::Survey => "survey",
            Template::Phaser => "phaser",
            Template::Custom => "custom",
        }
    }

    /// Battery namespace the item is copied under
    pub fn kind(&self) -> ItemKind {
        match self {
            Template::Jspsych | Template::Custom => ItemKind::Experiments,
            Template::Survey => ItemKind::Surveys,
            Template::Phaser => ItemKind::Games,
        }
    }

    /// Comma separated list of supported names, for messages
    pub fn supported() -> String {
        Self::ALL
            .iter()
            .map(Template::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Template {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unsupported template '{}'", s))
    }
}

/// Content repository type; doubles as the battery namespace directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Experiments,
    Surveys,
    Games,
}

impl ItemKind {
    pub const ALL: [ItemKind; 3] = [ItemKind::Experiments, ItemKind::Surveys, ItemKind::Games];

    /// Directory name under `static/` in a battery
    pub fn namespace(&self) -> &'static str {
        match self {
            ItemKind::Experiments => "experiments",
            ItemKind::Surveys => "surveys",
            ItemKind::Games => "games",
        }
    }

    /// Singular noun for log messages
    pub fn singular(&self) -> &'static str {
        match self {
            ItemKind::Experiments => "experiment",
            ItemKind::Surveys => "survey",
            ItemKind::Games => "game",
        }
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.namespace() == s || k.singular() == s)
            .ok_or_else(|| {
                format!("repo type must be one of experiments,surveys,games (got '{}')", s)
            })
    }
}

/// Typed view of a validated manifest
///
/// The raw object is kept so any field can be used as a lookup key and so the
/// full metadata can be served back unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub exp_id: String,
    pub name: Option<String>,
    pub run: Vec<String>,
    /// Estimated duration in minutes, kept as written (3.5 stays 3.5, 4 stays 4)
    pub time: Number,
    pub template: Template,
    pub deployment_variables: Option<Map<String, Value>>,
    raw: Map<String, Value>,
}

impl Manifest {
    /// Build the typed view from a manifest object
    pub fn from_object(raw: Map<String, Value>) -> Result<Self, ManifestError> {
        let exp_id = raw
            .get(ID_FIELD)
            .or_else(|| raw.get(LEGACY_ID_FIELD))
            .and_then(Value::as_str)
            .ok_or_else(|| field_error(ID_FIELD, "missing or not a string"))?
            .to_string();

        let run = match raw.get("run") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| field_error("run", "entries must be strings"))
                })
                .collect::<Result<Vec<_>, _>>()?,
            _ => return Err(field_error("run", "missing or not a list")),
        };

        let time = match raw.get("time") {
            Some(Value::Number(n)) => n.clone(),
            _ => return Err(field_error("time", "missing or not a number")),
        };

        let template = raw
            .get("template")
            .and_then(Value::as_str)
            .ok_or_else(|| field_error("template", "missing or not a string"))?
            .parse::<Template>()
            .map_err(|message| ManifestError::Field {
                field: "template".to_string(),
                message,
            })?;

        let name = raw.get("name").and_then(Value::as_str).map(str::to_string);
        let deployment_variables = raw
            .get("deployment_variables")
            .and_then(Value::as_object)
            .cloned();

        Ok(Self {
            exp_id,
            name,
            run,
            time,
            template,
            deployment_variables,
            raw,
        })
    }

    /// Raw field access
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.raw.get(field)
    }

    /// Field rendered as a lookup key (strings verbatim, other scalars as JSON text)
    pub fn key(&self, field: &str) -> Option<String> {
        if field == ID_FIELD || field == LEGACY_ID_FIELD {
            return Some(self.exp_id.clone());
        }
        match self.raw.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// The whole manifest object
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    pub fn kind(&self) -> ItemKind {
        self.template.kind()
    }

    /// `deployment_variables.<section>` as an object, if present
    pub fn deployment_section(&self, section: &str) -> Option<&Map<String, Value>> {
        self.deployment_variables
            .as_ref()
            .and_then(|vars| vars.get(section))
            .and_then(Value::as_object)
    }
}

impl Serialize for Manifest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

fn field_error(field: &str, message: &str) -> ManifestError {
    ManifestError::Field {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// Read the manifest object of a content folder without interpreting fields
pub fn read_manifest_object(folder: &Path) -> Result<Map<String, Value>, ManifestError> {
    let path = folder.join(MANIFEST_FILE);
    if !path.is_file() {
        return Err(ManifestError::Missing(folder.to_path_buf()));
    }

    let text = std::fs::read_to_string(&path).map_err(|source| ManifestError::Io {
        path: path.clone(),
        source,
    })?;

    let value: Value = serde_json::from_str(&text).map_err(|source| {
        tracing::error!(path = %path.display(), error = %source, "Problem reading config.json");
        ManifestError::Unparsable {
            path: path.clone(),
            source,
        }
    })?;

    match value {
        Value::Object(object) => Ok(object),
        Value::Array(mut items) => {
            if items.len() > 1 {
                return Err(ManifestError::MultipleEntries);
            }
            match items.pop() {
                Some(Value::Object(object)) => Ok(object),
                _ => Err(ManifestError::NotAnObject),
            }
        }
        _ => Err(ManifestError::NotAnObject),
    }
}

/// Load and type a manifest from a content folder
pub fn load_manifest(folder: &Path) -> Result<Manifest, ManifestError> {
    Manifest::from_object(read_manifest_object(folder)?)
}

/// Load several folders; the first failure aborts
pub fn load_manifests<P: AsRef<Path>>(folders: &[P]) -> Result<Vec<Manifest>, ManifestError> {
    folders
        .iter()
        .map(|folder| load_manifest(folder.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_template_namespaces() {
        assert_eq!(Template::Jspsych.kind(), ItemKind::Experiments);
        assert_eq!(Template::Custom.kind(), ItemKind::Experiments);
        assert_eq!(Template::Survey.kind(), ItemKind::Surveys);
        assert_eq!(Template::Phaser.kind(), ItemKind::Games);
        assert_eq!(Template::supported(), "jspsych,survey,phaser,custom");
    }

    #[test]
    fn test_template_parse_is_exact() {
        assert_eq!("survey".parse::<Template>().unwrap(), Template::Survey);
        assert!("Survey".parse::<Template>().is_err());
        assert!("psiturk".parse::<Template>().is_err());
    }

    #[test]
    fn test_item_kind_accepts_singular_and_plural() {
        assert_eq!("games".parse::<ItemKind>().unwrap(), ItemKind::Games);
        assert_eq!("survey".parse::<ItemKind>().unwrap(), ItemKind::Surveys);
        assert!("batteries".parse::<ItemKind>().is_err());
    }

    #[test]
    fn test_legacy_tag_is_identifier() {
        let manifest = Manifest::from_object(object(json!({
            "tag": "stroop",
            "run": ["experiment.js"],
            "time": 5,
            "template": "jspsych"
        })))
        .unwrap();
        assert_eq!(manifest.exp_id, "stroop");
        assert_eq!(manifest.key("exp_id").as_deref(), Some("stroop"));
    }

    #[test]
    fn test_time_kept_as_written() {
        let manifest = Manifest::from_object(object(json!({
            "exp_id": "a", "run": [], "time": 3.5, "template": "custom"
        })))
        .unwrap();
        assert_eq!(manifest.time.to_string(), "3.5");
    }

    #[test]
    fn test_serializes_raw_object() {
        let raw = json!({
            "exp_id": "a", "run": [], "time": 4, "template": "custom", "notes": "x"
        });
        let manifest = Manifest::from_object(object(raw.clone())).unwrap();
        assert_eq!(serde_json::to_value(&manifest).unwrap(), raw);
    }
}
