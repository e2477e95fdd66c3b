//! Stand-alone page for running a single content item
//!
//! Used by previews, the web UI and static site demo pages.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::battery::{item_destination, scripts};
use crate::files::copy_directory;
use crate::manifest::{Manifest, Template};
use crate::survey::{render_survey, RenderOptions};
use crate::template::{save_template, Substitutions};
use crate::{Error, Result};

const EXPERIMENT_PAGE: &str = include_str!("../templates/experiment.html");
const SURVEY_PAGE: &str = include_str!("../templates/survey.html");
const PHASER_PAGE: &str = include_str!("../templates/phaser.html");

/// Where an item page sends its results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Deployment {
    /// Save results as a local download
    #[default]
    Local,
    /// POST results back to the serving process
    Server,
}

/// Page template for an item type; custom items bring their own page
pub fn page_template(template: Template) -> Option<&'static str> {
    match template {
        Template::Jspsych => Some(EXPERIMENT_PAGE),
        Template::Survey => Some(SURVEY_PAGE),
        Template::Phaser => Some(PHASER_PAGE),
        Template::Custom => None,
    }
}

/// `(css, js)` include tags for the item's `run` list
///
/// Only `.css` and `.js` entries produce a tag.
pub fn get_stylejs(manifest: &Manifest, url_prefix: &str) -> (String, String) {
    let mut css = String::new();
    let mut js = String::new();
    for script in &manifest.run {
        let url = scripts::asset_url(manifest, script, url_prefix);
        match scripts::extension(script).as_str() {
            "js" => js.push_str(&format!("\n<script src='{}'></script>", url)),
            "css" => css.push_str(&format!("\n<link rel='stylesheet prefetch' href='{}'>", url)),
            _ => {}
        }
    }
    (css, js)
}

fn results_handler(manifest: &Manifest, deployment: Deployment, url_prefix: &str) -> String {
    match deployment {
        Deployment::Local => format!(
            "function(data) {{\n            expfactory_finished = true;\n            jsPsych.data.localSave('{}_results.csv', 'csv');\n        }}",
            manifest.exp_id
        ),
        Deployment::Server => format!(
            "function(data) {{\n            expfactory_finished = true;\n            \
             $.ajax({{ type: 'POST', url: '{}experiments/{}/complete', contentType: 'application/json', \
             data: jsPsych.data.dataAsJSON() }});\n        }}",
            url_prefix, manifest.exp_id
        ),
    }
}

/// Options passed to `jsPsych.init`, manifest `jspsych_init` values overriding defaults
///
/// String values of callback keys (`on_*`) are emitted as raw code.
pub fn jspsych_init_options(
    manifest: &Manifest,
    deployment: Deployment,
    url_prefix: &str,
) -> Vec<(String, String)> {
    let mut options = vec![
        ("timeline".to_string(), format!("{}_experiment", manifest.exp_id)),
        (
            "display_element".to_string(),
            "$('#jspsych_target')".to_string(),
        ),
        (
            "on_finish".to_string(),
            results_handler(manifest, deployment, url_prefix),
        ),
    ];

    let empty = Map::new();
    for (key, value) in manifest.deployment_section("jspsych_init").unwrap_or(&empty) {
        let code = match value {
            Value::String(code) if key.starts_with("on_") || key == "display_element" => code.clone(),
            other => other.to_string(),
        };
        match options.iter_mut().find(|(k, _)| k == key) {
            Some(existing) => existing.1 = code,
            None => options.push((key.clone(), code)),
        }
    }
    options
}

/// Script that starts a jsPsych item when the page is ready
pub fn get_experiment_run(manifest: &Manifest, deployment: Deployment, url_prefix: &str) -> String {
    let body = jspsych_init_options(manifest, deployment, url_prefix)
        .iter()
        .map(|(key, value)| format!("        {}: {}", key, value))
        .collect::<Vec<_>>()
        .join(",\n");
    format!(
        "$( document ).ready(function() {{\n    jsPsych.init({{\n{}\n    }});\n}});",
        body
    )
}

/// HTML page running one item
pub fn render_item_page(
    manifest: &Manifest,
    folder: &Path,
    url_prefix: &str,
    deployment: Deployment,
) -> Result<String> {
    let template = page_template(manifest.template).ok_or_else(|| {
        Error::InvalidInput(format!(
            "{} uses the custom template and has no generated page",
            manifest.exp_id
        ))
    })?;

    let (css, js) = get_stylejs(manifest, url_prefix);
    let (html, validation, run) = match manifest.template {
        Template::Jspsych => (
            String::new(),
            String::new(),
            get_experiment_run(manifest, deployment, url_prefix),
        ),
        Template::Survey => {
            let survey = render_survey(manifest, folder, &RenderOptions::default())?;
            (survey.html, survey.validation, String::new())
        }
        Template::Phaser => {
            let run = manifest
                .deployment_variables
                .as_ref()
                .and_then(|vars| vars.get("run"))
                .map(|run| match run {
                    Value::String(code) => code.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_default();
            (String::new(), String::new(), run)
        }
        Template::Custom => (String::new(), String::new(), String::new()),
    };

    Ok(Substitutions::new()
        .with("{{prefix}}", url_prefix)
        .with("{{js}}", js)
        .with("{{css}}", css)
        .with("{{run}}", run)
        .with("{{html}}", html)
        .with("{{validation}}", validation)
        .with("{{exp_id}}", manifest.exp_id.as_str())
        .apply(template))
}

/// Lay out a preview: the skeleton copied to `dest`, the item placed in its
/// namespace and `index.html` replaced by the item page
pub fn stage_preview(manifest: &Manifest, folder: &Path, skeleton: &Path, dest: &Path) -> Result<PathBuf> {
    copy_directory(skeleton, dest)?;

    let item_dir = item_destination(dest, manifest);
    if item_dir.exists() {
        std::fs::remove_dir_all(&item_dir)?;
    }
    copy_directory(folder, &item_dir)?;

    let page = render_item_page(manifest, &item_dir, "", Deployment::Local)?;
    let index = dest.join("index.html");
    save_template(&index, &page)?;

    tracing::info!(item = %manifest.exp_id, dest = %dest.display(), "Staged preview");
    Ok(index)
}
