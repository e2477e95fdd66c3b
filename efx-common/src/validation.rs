//! Content item validation
//!
//! Checks a folder's `config.json` against a fixed field table, plus the files
//! the manifest refers to. Validation is fail-fast: the first failing check
//! ends the run and is the only failure reported. Missing "warn" fields never
//! fail an item; they are collected as warnings.
//!
//! A manifest that cannot be parsed makes the folder invalid
//! ([`Failure::Manifest`]); the parse error is never propagated to the caller.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::manifest::{read_manifest_object, ManifestError, Template, ID_FIELD, LEGACY_ID_FIELD};

/// How strongly a manifest field is expected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Not required, no warning when absent
    Optional,
    /// Absent or empty makes the item invalid
    Required,
    /// Absent or empty produces a warning only
    Warn,
}

/// A row of the manifest field table
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub requirement: Requirement,
}

const fn field(name: &'static str, requirement: Requirement) -> FieldSpec {
    FieldSpec { name, requirement }
}

/// Manifest fields in validation order
pub const FIELDS: [FieldSpec; 12] = [
    field("run", Requirement::Required),
    field("name", Requirement::Warn),
    field("contributors", Requirement::Optional),
    field("time", Requirement::Required),
    field("notes", Requirement::Optional),
    field("reference", Requirement::Warn),
    field(ID_FIELD, Requirement::Required),
    field("cognitive_atlas_task_id", Requirement::Warn),
    field("experiment_variables", Requirement::Optional),
    field("publish", Requirement::Required),
    field("deployment_variables", Requirement::Optional),
    field("template", Requirement::Required),
];

/// Keys allowed in `deployment_variables.jspsych_init`
pub const JSPSYCH_INIT_KEYS: [&str; 10] = [
    "display_element",
    "on_finish",
    "on_trial_start",
    "on_trial_finish",
    "on_data_update",
    "show_progress_bar",
    "max_load_time",
    "skip_load_check",
    "fullscreen",
    "default_iti",
];

/// Keys allowed in `deployment_variables.material_design`
pub const MATERIAL_DESIGN_KEYS: [&str; 1] = ["fullscreen"];

/// Deployment keys that must be literal JSON booleans
pub const BOOLEAN_KEYS: [&str; 3] = ["show_progress_bar", "fullscreen", "skip_load_check"];

/// jsPsych keys that must be numeric
pub const NUMERIC_KEYS: [&str; 2] = ["default_iti", "max_load_time"];

/// Reason a content item is not valid
#[derive(Debug, Error)]
pub enum Failure {
    #[error("{0}")]
    Manifest(#[from] ManifestError),

    #[error("config.json is missing required field {0}")]
    MissingField(&'static str),

    #[error("config.json must be defined for field {0}")]
    EmptyField(&'static str),

    #[error("field {field} must be {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },

    #[error("exp_id parameter {id} does not match folder name")]
    IdMismatch { id: String },

    #[error("exp_id parameter {id} has invalid characters, only lowercase [a-z],[0-9], and _ allowed")]
    InvalidId { id: String },

    #[error("config.json specifies not production ready")]
    NotPublished,

    #[error("{0} is specified in config.json but missing")]
    MissingRunFile(String),

    #[error("external script {0} must be https")]
    InsecureScript(String),

    #[error("template {0} is not supported, we currently only support {supported} experiments", supported = Template::supported())]
    UnsupportedTemplate(String),

    #[error("experiment.js is not defined in run")]
    MissingExperimentJs,

    #[error("required survey.tsv for template survey not found")]
    MissingSurveyFile,

    #[error("required Run.js main game file not found")]
    MissingGameFile,

    #[error("'run' (code) is required in deployment_variables")]
    MissingGameRun,

    #[error("{key} is not an acceptable value for {section}")]
    UnknownVariable { key: String, section: &'static str },

    #[error("{value} is not an acceptable value for {key}. Must be true/false")]
    NotBoolean { key: String, value: Value },

    #[error("{value} is not an acceptable value for {key} in {section}. Must be numeric")]
    NotNumeric {
        key: String,
        value: Value,
        section: &'static str,
    },
}

/// Validation options
#[derive(Debug, Clone, Copy)]
pub struct ValidateOptions {
    /// Log warnings for missing "warn" fields (they are collected either way)
    pub warnings: bool,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self { warnings: true }
    }
}

impl ValidateOptions {
    pub fn quiet() -> Self {
        Self { warnings: false }
    }
}

/// Outcome of validating one folder
#[derive(Debug)]
pub struct ValidationResult {
    pub folder: PathBuf,
    /// Folder base name, used to prefix messages
    pub name: String,
    /// First failing check, if any
    pub failure: Option<Failure>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.failure.is_none()
    }

    /// Human readable reasons: the failure (if any) first, then warnings
    pub fn reasons(&self) -> Vec<String> {
        self.failure
            .iter()
            .map(|failure| format!("{}: {}", self.name, failure))
            .chain(
                self.warnings
                    .iter()
                    .map(|warning| format!("WARNING: {}: {}", self.name, warning)),
            )
            .collect()
    }
}

/// Validate a content folder
pub fn validate(folder: &Path, options: &ValidateOptions) -> ValidationResult {
    let name = folder
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut result = ValidationResult {
        folder: folder.to_path_buf(),
        name,
        failure: None,
        warnings: Vec::new(),
    };

    let outcome = read_manifest_object(folder)
        .map_err(Failure::from)
        .and_then(|meta| check_fields(folder, &result.name, &meta, &mut result.warnings));

    if options.warnings {
        for warning in &result.warnings {
            tracing::warn!(item = %result.name, "WARNING: {}", warning);
        }
    }

    if let Err(failure) = outcome {
        tracing::warn!(folder = %folder.display(), reason = %failure, "Invalid content item");
        result.failure = Some(failure);
    }

    result
}

/// Convenience wrapper returning only the verdict
pub fn is_valid(folder: &Path, options: &ValidateOptions) -> bool {
    validate(folder, options).is_valid()
}

fn check_fields(
    folder: &Path,
    folder_name: &str,
    meta: &Map<String, Value>,
    warnings: &mut Vec<String>,
) -> Result<(), Failure> {
    for spec in FIELDS {
        let value = if spec.name == ID_FIELD {
            meta.get(ID_FIELD).or_else(|| meta.get(LEGACY_ID_FIELD))
        } else {
            meta.get(spec.name)
        };

        let Some(value) = value else {
            match spec.requirement {
                Requirement::Required => return Err(Failure::MissingField(spec.name)),
                Requirement::Warn => {
                    warnings.push(format!("config.json is missing field {}", spec.name))
                }
                Requirement::Optional => {}
            }
            continue;
        };

        match spec.name {
            "run" => check_run(folder, value)?,
            "time" => {
                if !value.is_number() {
                    return Err(wrong_type("time", "a number"));
                }
            }
            ID_FIELD => check_identifier(folder_name, value)?,
            "publish" => {
                // Only the literal string marks an item as not ready
                if value.as_str() == Some("False") {
                    return Err(Failure::NotPublished);
                }
            }
            _ => {}
        }

        match spec.requirement {
            Requirement::Required if is_empty(value) => return Err(Failure::EmptyField(spec.name)),
            Requirement::Warn if is_empty(value) => {
                warnings.push(format!("config.json is missing value for field {}", spec.name))
            }
            _ => {}
        }

        match spec.name {
            "deployment_variables" => check_deployment_variables(value)?,
            "template" => check_template(folder, meta, value)?,
            _ => {}
        }
    }
    Ok(())
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Null => true,
        _ => false,
    }
}

fn wrong_type(field: &str, expected: &'static str) -> Failure {
    Failure::WrongType {
        field: field.to_string(),
        expected,
    }
}

fn check_run(folder: &Path, value: &Value) -> Result<(), Failure> {
    let scripts = value.as_array().ok_or_else(|| wrong_type("run", "a list"))?;
    for script in scripts {
        let script = script
            .as_str()
            .ok_or_else(|| wrong_type("run", "a list of strings"))?;

        // Bare file names live inside the item folder
        if !script.contains('/') && !folder.join(script).exists() {
            return Err(Failure::MissingRunFile(script.to_string()));
        }
        if script.contains("http") && !script.contains("https") {
            return Err(Failure::InsecureScript(script.to_string()));
        }
    }
    Ok(())
}

fn check_identifier(folder_name: &str, value: &Value) -> Result<(), Failure> {
    let id = value.as_str().ok_or_else(|| wrong_type(ID_FIELD, "a string"))?;
    if id != folder_name {
        return Err(Failure::IdMismatch { id: id.to_string() });
    }
    if !is_valid_identifier(id) {
        return Err(Failure::InvalidId { id: id.to_string() });
    }
    Ok(())
}

/// `^[a-z0-9_]*$`
pub fn is_valid_identifier(id: &str) -> bool {
    id.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn check_template(folder: &Path, meta: &Map<String, Value>, value: &Value) -> Result<(), Failure> {
    let raw = value.as_str().ok_or_else(|| wrong_type("template", "a string"))?;
    let template = raw
        .parse::<Template>()
        .map_err(|_| Failure::UnsupportedTemplate(raw.to_string()))?;

    match template {
        Template::Jspsych => {
            let run = meta
                .get("run")
                .and_then(Value::as_array)
                .ok_or(Failure::MissingField("run"))?;
            if !run.iter().any(|s| s.as_str() == Some("experiment.js")) {
                return Err(Failure::MissingExperimentJs);
            }
        }
        Template::Survey => {
            if !folder.join("survey.tsv").exists() {
                return Err(Failure::MissingSurveyFile);
            }
        }
        Template::Phaser => {
            if !folder.join("Run.js").exists() {
                return Err(Failure::MissingGameFile);
            }
            let has_run = meta
                .get("deployment_variables")
                .and_then(Value::as_object)
                .is_some_and(|vars| vars.contains_key("run"));
            if !has_run {
                return Err(Failure::MissingGameRun);
            }
        }
        Template::Custom => {}
    }
    Ok(())
}

fn check_deployment_variables(value: &Value) -> Result<(), Failure> {
    let vars = value
        .as_object()
        .ok_or_else(|| wrong_type("deployment_variables", "an object"))?;

    if let Some(section) = vars.get("jspsych_init") {
        check_section(section, "jspsych_init", &JSPSYCH_INIT_KEYS, true)?;
    }
    if let Some(section) = vars.get("material_design") {
        check_section(section, "material_design", &MATERIAL_DESIGN_KEYS, false)?;
    }
    Ok(())
}

fn check_section(
    section: &Value,
    section_name: &'static str,
    allowed: &[&str],
    numeric_checks: bool,
) -> Result<(), Failure> {
    let entries = section.as_object().ok_or_else(|| Failure::WrongType {
        field: format!("deployment_variables.{}", section_name),
        expected: "an object",
    })?;

    for (key, value) in entries {
        if !allowed.contains(&key.as_str()) {
            return Err(Failure::UnknownVariable {
                key: key.clone(),
                section: section_name,
            });
        }
        if BOOLEAN_KEYS.contains(&key.as_str()) && !value.is_boolean() {
            return Err(Failure::NotBoolean {
                key: key.clone(),
                value: value.clone(),
            });
        }
        if numeric_checks
            && NUMERIC_KEYS.contains(&key.as_str())
            && (value.is_string() || value.is_boolean())
        {
            return Err(Failure::NotNumeric {
                key: key.clone(),
                value: value.clone(),
                section: section_name,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_charset() {
        assert!(is_valid_identifier("stroop_2"));
        assert!(is_valid_identifier(""));
        assert!(!is_valid_identifier("Stroop"));
        assert!(!is_valid_identifier("go-nogo"));
        assert!(!is_valid_identifier("go nogo"));
    }

    #[test]
    fn test_field_table_order_ends_with_template() {
        assert_eq!(FIELDS[0].name, "run");
        assert_eq!(FIELDS[FIELDS.len() - 1].name, "template");
        let required: Vec<_> = FIELDS
            .iter()
            .filter(|f| f.requirement == Requirement::Required)
            .map(|f| f.name)
            .collect();
        assert_eq!(required, vec!["run", "time", "exp_id", "publish", "template"]);
    }

    #[test]
    fn test_emptiness() {
        assert!(is_empty(&Value::String(String::new())));
        assert!(is_empty(&Value::Array(vec![])));
        assert!(!is_empty(&Value::Bool(false)));
        assert!(!is_empty(&serde_json::json!(0)));
    }

    #[test]
    fn test_reasons_prefix_item_name() {
        let result = ValidationResult {
            folder: PathBuf::from("/repo/stroop"),
            name: "stroop".to_string(),
            failure: Some(Failure::NotPublished),
            warnings: vec!["config.json is missing field name".to_string()],
        };
        assert_eq!(
            result.reasons(),
            vec![
                "stroop: config.json specifies not production ready".to_string(),
                "WARNING: stroop: config.json is missing field name".to_string(),
            ]
        );
    }
}
