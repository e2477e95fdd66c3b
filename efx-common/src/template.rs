//! Placeholder substitution in text templates
//!
//! Templates carry literal tokens such as `[SUB_EXPERIMENTLOAD_SUB]` or
//! `{{exp_id}}`. Substitution is plain substring replacement applied in
//! insertion order; no pattern or escaping semantics.

use std::fs;
use std::path::Path;

use crate::{Error, Result};

/// Ordered token → replacement list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitutions {
    pairs: Vec<(String, String)>,
}

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a substitution (builder style)
    pub fn with(mut self, token: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.push(token, replacement);
        self
    }

    pub fn push(&mut self, token: impl Into<String>, replacement: impl Into<String>) {
        self.pairs.push((token.into(), replacement.into()));
    }

    /// Apply every substitution, in order, to `template`
    pub fn apply(&self, template: &str) -> String {
        self.pairs
            .iter()
            .fold(template.to_string(), |text, (token, replacement)| {
                sub_template(&text, token, replacement)
            })
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Replace every occurrence of `token` in `template`
pub fn sub_template(template: &str, token: &str, substitution: &str) -> String {
    template.replace(token, substitution)
}

/// Read a template file; an unreadable template is fatal for the operation
pub fn get_template(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| Error::Template {
        path: path.to_path_buf(),
        source,
    })
}

/// Write rendered text, creating parent directories
pub fn save_template(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text)?;
    Ok(())
}
