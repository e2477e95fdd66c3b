//! Battery `config.txt` (psiturk-style `[Section]` / `key = value` file)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::template::save_template;
use crate::Result;

/// Default `config.txt` shipped with the tool
pub const DEFAULT_CONFIG: &str = include_str!("../../templates/config.txt");

pub const CONFIG_FILE: &str = "config.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Section(String),
    Entry { key: String, value: String },
    Verbatim(String),
}

/// Parsed `config.txt` keeping line order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigTemplate {
    lines: Vec<Line>,
}

impl ConfigTemplate {
    pub fn parse(text: &str) -> Self {
        let lines = text
            .lines()
            .map(|line| {
                let trimmed = line.trim();
                if trimmed.starts_with('[') && trimmed.ends_with(']') {
                    Line::Section(trimmed.to_string())
                } else if let Some((key, value)) = line.split_once('=') {
                    Line::Entry {
                        key: key.trim().to_string(),
                        value: value.trim().to_string(),
                    }
                } else {
                    Line::Verbatim(line.to_string())
                }
            })
            .collect();
        Self { lines }
    }

    /// Value currently set for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| match line {
            Line::Entry { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn keys(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                Line::Entry { key, .. } => Some(key.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Render with `overrides` replacing values of matching keys
    ///
    /// Override keys that do not appear in the template are ignored. The
    /// output always ends with a newline.
    pub fn render(&self, overrides: &BTreeMap<String, String>) -> String {
        let mut text = self
            .lines
            .iter()
            .map(|line| match line {
                Line::Section(section) => section.clone(),
                Line::Entry { key, value } => {
                    let value = overrides.get(key).unwrap_or(value);
                    format!("{} = {}", key, value)
                }
                Line::Verbatim(raw) => raw.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n");
        if !text.ends_with('\n') {
            text.push('\n');
        }
        text
    }
}

impl Default for ConfigTemplate {
    fn default() -> Self {
        Self::parse(DEFAULT_CONFIG)
    }
}

/// Write `<battery>/config.txt` from the default template with `overrides`
pub fn generate_config(battery: &Path, overrides: &BTreeMap<String, String>) -> Result<PathBuf> {
    let path = battery.join(CONFIG_FILE);
    let text = ConfigTemplate::default().render(overrides);
    save_template(&path, &text)?;
    tracing::debug!(path = %path.display(), overrides = overrides.len(), "Wrote battery config");
    Ok(path)
}

/// Parse `key=value` command line overrides
pub fn parse_overrides<S: AsRef<str>>(pairs: &[S]) -> Result<BTreeMap<String, String>> {
    let mut overrides = BTreeMap::new();
    for pair in pairs {
        let pair = pair.as_ref();
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            crate::Error::InvalidInput(format!("expected key=value, got '{}'", pair))
        })?;
        overrides.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(overrides)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template_has_sections() {
        let template = ConfigTemplate::default();
        assert_eq!(template.get("database_url"), Some("sqlite:///participants.db"));
        assert!(template.keys().contains(&"title"));
    }

    #[test]
    fn test_render_overrides_matching_keys_only() {
        let template = ConfigTemplate::parse("[Server Parameters]\nhost = 0.0.0.0\nport = 22362\n\n");
        let mut overrides = BTreeMap::new();
        overrides.insert("port".to_string(), "8000".to_string());
        overrides.insert("unknown".to_string(), "x".to_string());

        assert_eq!(
            template.render(&overrides),
            "[Server Parameters]\nhost = 0.0.0.0\nport = 8000\n"
        );
    }

    #[test]
    fn test_render_keeps_trailing_newline() {
        let template = ConfigTemplate::parse("[HIT Configuration]\ntitle = Battery\n");
        assert_eq!(
            template.render(&BTreeMap::new()),
            "[HIT Configuration]\ntitle = Battery\n"
        );
        assert!(ConfigTemplate::default().render(&BTreeMap::new()).ends_with("= true\n"));
    }

    #[test]
    fn test_parse_overrides() {
        let parsed = parse_overrides(&["title=My Battery", "port = 9000"]).unwrap();
        assert_eq!(parsed.get("title").map(String::as_str), Some("My Battery"));
        assert_eq!(parsed.get("port").map(String::as_str), Some("9000"));
        assert!(parse_overrides(&["novalue"]).is_err());
    }
}
