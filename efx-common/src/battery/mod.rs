//! Battery assembly
//!
//! A battery is a copy of the skeleton folder with the selected items placed
//! under `static/<namespace>/<exp_id>` and the loader script rendered from the
//! skeleton's `static/js/load_experiments.js` template.

pub mod config_txt;
pub mod scripts;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::fetch::{custom_battery_download, RepoKind};
use crate::files::copy_directory;
use crate::manifest::Manifest;
use crate::selection::{load_valid, select_by_time, ContentItem};
use crate::template::{get_template, save_template, Substitutions};
use crate::validation::ValidateOptions;
use crate::{Error, Result};

pub use config_txt::{generate_config, ConfigTemplate};

/// Loader template location inside a skeleton (and inside the output)
pub const LOADER_TEMPLATE: &str = "static/js/load_experiments.js";

pub const TOKEN_LOAD: &str = "[SUB_EXPERIMENTLOAD_SUB]";
pub const TOKEN_CONCAT: &str = "[SUB_EXPERIMENTCONCAT_SUB]";
pub const TOKEN_TIMES: &str = "[SUB_EXPERIMENTTIMES_SUB]";
pub const TOKEN_SUBJECT: &str = "[SUB_SUBJECTID_SUB]";

/// Inputs to [`assemble`]
#[derive(Debug, Clone)]
pub struct BatteryRequest {
    pub destination: PathBuf,
    pub skeleton: PathBuf,
    pub items: Vec<ContentItem>,
    /// Write `config.txt` into the battery
    pub make_config: bool,
    /// Overrides for `config.txt` keys
    pub config: BTreeMap<String, String>,
    /// Loader template to use instead of the skeleton's own
    pub loader_template: Option<PathBuf>,
}

impl BatteryRequest {
    pub fn new(destination: impl Into<PathBuf>, skeleton: impl Into<PathBuf>, items: Vec<ContentItem>) -> Self {
        Self {
            destination: destination.into(),
            skeleton: skeleton.into(),
            items,
            make_config: true,
            config: BTreeMap::new(),
            loader_template: None,
        }
    }
}

/// Result of a successful assembly
#[derive(Debug, Clone)]
pub struct AssembledBattery {
    pub destination: PathBuf,
    /// Items present in the battery, in selection order
    pub items: Vec<ContentItem>,
    /// Source folders that could not be copied and were left out
    pub skipped: Vec<PathBuf>,
}

impl AssembledBattery {
    pub fn manifests(&self) -> impl Iterator<Item = &Manifest> {
        self.items.iter().map(|item| &item.manifest)
    }
}

/// Where an item lands inside a battery
pub fn item_destination(battery: &Path, manifest: &Manifest) -> PathBuf {
    battery
        .join("static")
        .join(manifest.kind().namespace())
        .join(&manifest.exp_id)
}

/// Fill the three loader tokens for `manifests`
pub fn render_loader<'a, I>(template: &str, manifests: I) -> Result<String>
where
    I: IntoIterator<Item = &'a Manifest>,
    I::IntoIter: Clone,
{
    let manifests = manifests.into_iter();
    let subs = Substitutions::new()
        .with(TOKEN_LOAD, scripts::load_js(manifests.clone(), ""))
        .with(TOKEN_CONCAT, scripts::concat_js(manifests.clone()))
        .with(TOKEN_TIMES, scripts::timing_js(manifests)?);
    Ok(subs.apply(template))
}

/// Copy each item folder into the battery
///
/// A folder that fails to copy is logged and dropped; the rest continue.
pub fn move_items(items: &[ContentItem], battery: &Path) -> (Vec<ContentItem>, Vec<PathBuf>) {
    let mut moved = Vec::with_capacity(items.len());
    let mut skipped = Vec::new();

    for item in items {
        let target = item_destination(battery, &item.manifest);
        match copy_directory(&item.folder, &target) {
            Ok(_) => {
                tracing::debug!(item = %item.exp_id(), dest = %target.display(), "Copied item");
                moved.push(item.clone());
            }
            Err(e) => {
                tracing::warn!(
                    folder = %item.folder.display(),
                    error = %e,
                    "Cannot copy item into battery, skipping"
                );
                skipped.push(item.folder.clone());
            }
        }
    }
    (moved, skipped)
}

/// Build a battery folder from a skeleton and a list of valid items
///
/// Refuses to run when `destination` exists; nothing is written in that case.
pub fn assemble(request: &BatteryRequest) -> Result<AssembledBattery> {
    let destination = &request.destination;
    if destination.exists() {
        return Err(Error::DestinationExists(destination.clone()));
    }

    let template_path = request
        .loader_template
        .clone()
        .unwrap_or_else(|| request.skeleton.join(LOADER_TEMPLATE));
    let template = get_template(&template_path)?;

    tracing::info!(
        dest = %destination.display(),
        skeleton = %request.skeleton.display(),
        items = request.items.len(),
        "Assembling battery"
    );
    copy_directory(&request.skeleton, destination)?;

    let (items, skipped) = move_items(&request.items, destination);
    let loader = render_loader(&template, items.iter().map(|item| &item.manifest))?;
    save_template(&destination.join(LOADER_TEMPLATE), &loader)?;

    if request.make_config {
        generate_config(destination, &request.config)?;
    }

    tracing::info!(
        dest = %destination.display(),
        included = items.len(),
        skipped = skipped.len(),
        "Battery assembled"
    );
    Ok(AssembledBattery {
        destination: destination.clone(),
        items,
        skipped,
    })
}

/// Options for [`generate`]
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub destination: PathBuf,
    /// Skeleton folder; cloned when absent
    pub battery_repo: Option<PathBuf>,
    /// Content repositories; the experiments repository is cloned when empty
    pub content_repos: Vec<PathBuf>,
    /// Identifiers to include; empty selects everything valid
    pub selection: Vec<String>,
    pub make_config: bool,
    pub config: BTreeMap<String, String>,
    /// Keep items while their summed `time` fits this many minutes
    pub max_minutes: Option<f64>,
    /// Subject identifier written into the battery entry page
    pub subject_id: Option<String>,
    pub warnings: bool,
}

/// Validate, select and assemble in one step, fetching missing repositories
pub fn generate(options: &GenerateOptions) -> Result<AssembledBattery> {
    if options.destination.exists() {
        return Err(Error::DestinationExists(options.destination.clone()));
    }

    let mut needed = Vec::new();
    if options.battery_repo.is_none() {
        needed.push(RepoKind::Battery);
    }
    if options.content_repos.is_empty() {
        needed.push(RepoKind::Experiments);
    }
    // Clones live until the battery has been copied out of them
    let download = if needed.is_empty() {
        None
    } else {
        Some(custom_battery_download(&needed)?)
    };
    let cloned = |kind: RepoKind| -> Result<PathBuf> {
        download
            .as_ref()
            .map(|tmp| tmp.path().join(kind.folder_name()))
            .ok_or_else(|| Error::Internal(format!("{} repository was not fetched", kind)))
    };

    let skeleton = match &options.battery_repo {
        Some(path) => path.clone(),
        None => cloned(RepoKind::Battery)?,
    };
    let repos = if options.content_repos.is_empty() {
        vec![cloned(RepoKind::Experiments)?]
    } else {
        options.content_repos.clone()
    };

    let validate_options = ValidateOptions {
        warnings: options.warnings,
    };
    let mut valid = Vec::new();
    for repo in &repos {
        valid.extend(load_valid(repo, &validate_options)?);
    }
    if !options.selection.is_empty() {
        valid.retain(|item| options.selection.iter().any(|id| id == item.exp_id()));
    }
    if let Some(max) = options.max_minutes {
        valid = select_by_time(valid, max);
    }

    let request = BatteryRequest {
        destination: options.destination.clone(),
        skeleton,
        items: valid,
        make_config: options.make_config,
        config: options.config.clone(),
        loader_template: None,
    };
    let battery = assemble(&request)?;

    if let Some(subject) = &options.subject_id {
        embed_subject_id(&battery.destination, subject)?;
    }
    Ok(battery)
}

/// Substitute the subject token in the battery's `index.html`, if present
pub fn embed_subject_id(battery: &Path, subject: &str) -> Result<()> {
    let index = battery.join("index.html");
    if !index.is_file() {
        tracing::debug!(battery = %battery.display(), "No index.html, subject id not embedded");
        return Ok(());
    }
    let text = get_template(&index)?;
    save_template(&index, &Substitutions::new().with(TOKEN_SUBJECT, subject).apply(&text))
}
