//! Content repository discovery, selection and lookup
//!
//! A content repository is a folder whose immediate, non-hidden subfolders are
//! content items. Only items passing validation are ever selected.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::manifest::{load_manifest, Manifest};
use crate::validation::{validate, ValidateOptions};
use crate::{Error, Result};

/// A validated content folder with its loaded manifest
#[derive(Debug, Clone, PartialEq)]
pub struct ContentItem {
    pub folder: PathBuf,
    pub manifest: Manifest,
}

impl ContentItem {
    pub fn load(folder: &Path) -> Result<Self> {
        Ok(Self {
            folder: folder.to_path_buf(),
            manifest: load_manifest(folder)?,
        })
    }

    pub fn exp_id(&self) -> &str {
        &self.manifest.exp_id
    }
}

/// Immediate subdirectories of `root`, hidden ones excluded, sorted by name
pub fn find_directories(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(Error::NotFound(format!(
            "content folder {} does not exist",
            root.display()
        )));
    }

    let mut directories = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if !hidden && entry.path().is_dir() {
            directories.push(entry.path());
        }
    }
    directories.sort();
    Ok(directories)
}

/// Folders of `repo` that pass validation
pub fn list_valid(repo: &Path, options: &ValidateOptions) -> Result<Vec<PathBuf>> {
    let valid: Vec<PathBuf> = find_directories(repo)?
        .into_iter()
        .filter(|folder| validate(folder, options).is_valid())
        .collect();

    tracing::info!(repo = %repo.display(), count = valid.len(), "Found valid content items");
    Ok(valid)
}

/// Valid items of `repo`, with manifests loaded
pub fn load_valid(repo: &Path, options: &ValidateOptions) -> Result<Vec<ContentItem>> {
    load_items(&list_valid(repo, options)?)
}

/// Load manifests for already validated folders
pub fn load_items(folders: &[PathBuf]) -> Result<Vec<ContentItem>> {
    folders.iter().map(|folder| ContentItem::load(folder)).collect()
}

/// Split a selection list (`EXPERIMENTS`) into identifiers
///
/// Entries are separated by commas and/or whitespace; a path contributes its
/// base name.
pub fn parse_selection(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(|entry| entry.trim_end_matches('/'))
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            Path::new(entry)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| entry.to_string())
        })
        .collect()
}

/// Keep folders whose base name is in `allow`; an empty list keeps everything
///
/// Output keeps the order of `valid`.
pub fn select(valid: &[PathBuf], allow: &[String]) -> Vec<PathBuf> {
    if allow.is_empty() {
        return valid.to_vec();
    }
    valid
        .iter()
        .filter(|folder| {
            folder
                .file_name()
                .map(|name| allow.iter().any(|a| a.as_str() == name.to_string_lossy()))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// Map `key_field` value → manifest
///
/// Keys are assumed unique; a later duplicate replaces an earlier entry.
pub fn build_lookup(manifests: &[Manifest], key_field: &str) -> BTreeMap<String, Manifest> {
    let mut lookup = BTreeMap::new();
    for manifest in manifests {
        if let Some(key) = manifest.key(key_field) {
            lookup.insert(key, manifest.clone());
        }
    }
    lookup
}

/// Keep items, in order, while the running total of `time` fits `max_minutes`
pub fn select_by_time(items: Vec<ContentItem>, max_minutes: f64) -> Vec<ContentItem> {
    let mut total = 0.0;
    let mut selected = Vec::new();
    for item in items {
        let minutes = item.manifest.time.as_f64().unwrap_or(0.0);
        if total + minutes > max_minutes {
            tracing::debug!(item = %item.exp_id(), minutes, total, "Skipping item over time budget");
            continue;
        }
        total += minutes;
        selected.push(item);
    }
    selected
}

/// Valid item folders of `new_repo` with files that are new or differ from
/// the same relative path in `comparison_repo`
pub fn find_changed(new_repo: &Path, comparison_repo: &Path) -> Result<Vec<PathBuf>> {
    let mut changed = Vec::new();

    for folder in list_valid(new_repo, &ValidateOptions::quiet())? {
        let mut folder_changed = false;
        for entry in WalkDir::new(&folder).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(new_repo)
                .map_err(|e| Error::Internal(e.to_string()))?;
            let old_file = comparison_repo.join(relative);

            let differs = !old_file.is_file() || fs::read(&old_file)? != fs::read(entry.path())?;
            if differs {
                tracing::debug!(file = %entry.path().display(), "Changed file");
                folder_changed = true;
                break;
            }
        }
        if folder_changed {
            changed.push(folder);
        }
    }

    tracing::info!(count = changed.len(), "Found changed content items");
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selection_mixed_separators() {
        assert_eq!(
            parse_selection("stroop, /scif/apps/go_nogo  tower_of_london/"),
            vec!["stroop", "go_nogo", "tower_of_london"]
        );
        assert!(parse_selection("  ").is_empty());
    }

    #[test]
    fn test_select_by_basename_keeps_repo_order() {
        let valid = vec![
            PathBuf::from("/repo/a"),
            PathBuf::from("/repo/b"),
            PathBuf::from("/repo/c"),
        ];
        let chosen = select(&valid, &["c".to_string(), "a".to_string()]);
        assert_eq!(chosen, vec![PathBuf::from("/repo/a"), PathBuf::from("/repo/c")]);
    }

    #[test]
    fn test_select_empty_allow_list_keeps_all() {
        let valid = vec![PathBuf::from("/repo/a")];
        assert_eq!(select(&valid, &[]), valid);
    }

    #[test]
    fn test_find_directories_missing_root() {
        let err = find_directories(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
