//! Generated JavaScript fragments embedded into a battery
//!
//! All fragments iterate items in the order given, which is the selection
//! order.

use serde::Serialize;
use serde_json::Number;
use std::path::Path;

use crate::manifest::Manifest;

/// One entry of the timing array
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingEntry {
    pub name: String,
    pub time: Number,
}

/// Lower-case file extension without the dot ("" when there is none)
pub fn extension(script: &str) -> String {
    Path::new(script)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Whether a `run` entry is a file inside the item folder (no path separator)
pub fn is_local(script: &str) -> bool {
    !script.contains('/')
}

/// URL of a `run` entry as seen from the battery root
pub fn asset_url(manifest: &Manifest, script: &str, url_prefix: &str) -> String {
    if is_local(script) {
        format!(
            "{}static/{}/{}/{}",
            url_prefix,
            manifest.kind().namespace(),
            manifest.exp_id,
            script
        )
    } else {
        format!("{}{}", url_prefix, script)
    }
}

/// `case` dispatch loading every asset of every item
///
/// ```text
/// case "simple_rt":
///          loadjscssfile("static/experiments/simple_rt/style.css","css")
///          loadjscssfile("static/experiments/simple_rt/experiment.js","js")
///          break;
/// ```
pub fn load_js<'a>(manifests: impl IntoIterator<Item = &'a Manifest>, url_prefix: &str) -> String {
    let mut js = String::from("\n");
    for manifest in manifests {
        js.push_str(&format!("case \"{}\":\n", manifest.exp_id));
        for script in &manifest.run {
            js.push_str(&format!(
                "         loadjscssfile(\"{}\",\"{}\")\n",
                asset_url(manifest, script, url_prefix),
                extension(script)
            ));
        }
        js.push_str("         break;\n");
    }
    js
}

/// `case` dispatch folding each item's `<exp_id>_experiment` array into the
/// aggregate `experiments` array
pub fn concat_js<'a>(manifests: impl IntoIterator<Item = &'a Manifest>) -> String {
    let mut js = String::from("\n");
    for manifest in manifests {
        js.push_str(&format!("case \"{}\":\n", manifest.exp_id));
        js.push_str(&format!(
            "      experiments = experiments.concat({}_experiment)\n",
            manifest.exp_id
        ));
        js.push_str("      break;\n");
    }
    js
}

/// Ordered `{name, time}` pairs taken from each manifest
pub fn timing<'a>(manifests: impl IntoIterator<Item = &'a Manifest>) -> Vec<TimingEntry> {
    manifests
        .into_iter()
        .map(|manifest| TimingEntry {
            name: manifest.exp_id.clone(),
            time: manifest.time.clone(),
        })
        .collect()
}

/// Timing array as a JSON literal
pub fn timing_js<'a>(
    manifests: impl IntoIterator<Item = &'a Manifest>,
) -> Result<String, serde_json::Error> {
    serde_json::to_string(&timing(manifests))
}

/// `<script>` / `<link>` tags to embed items directly in a page
pub fn static_includes<'a>(
    manifests: impl IntoIterator<Item = &'a Manifest>,
    url_prefix: &str,
) -> String {
    let mut html = String::from("\n");
    for manifest in manifests {
        for script in &manifest.run {
            let url = asset_url(manifest, script, url_prefix);
            if is_local(script) && extension(script) != "js" {
                html.push_str(&format!("<link rel=\"stylesheet\" href=\"{}\" />\n", url));
            } else {
                html.push_str(&format!(
                    "<script type=\"text/javascript\" src=\"{}\"></script>\n",
                    url
                ));
            }
        }
    }
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest(value: serde_json::Value) -> Manifest {
        Manifest::from_object(value.as_object().cloned().unwrap()).unwrap()
    }

    fn simple_rt() -> Manifest {
        manifest(json!({
            "exp_id": "simple_rt",
            "run": ["style.CSS", "experiment.js", "https://cdn.example.org/jspsych.js"],
            "time": 3.5,
            "template": "jspsych"
        }))
    }

    #[test]
    fn test_extension_lowercased() {
        assert_eq!(extension("style.CSS"), "css");
        assert_eq!(extension("https://cdn.example.org/lib.min.js"), "js");
        assert_eq!(extension("README"), "");
    }

    #[test]
    fn test_load_js_case_block() {
        let m = simple_rt();
        let js = load_js([&m], "");
        assert_eq!(
            js,
            "\ncase \"simple_rt\":\n\
             \x20        loadjscssfile(\"static/experiments/simple_rt/style.CSS\",\"css\")\n\
             \x20        loadjscssfile(\"static/experiments/simple_rt/experiment.js\",\"js\")\n\
             \x20        loadjscssfile(\"https://cdn.example.org/jspsych.js\",\"js\")\n\
             \x20        break;\n"
        );
    }

    #[test]
    fn test_survey_assets_use_surveys_namespace() {
        let m = manifest(json!({
            "exp_id": "bis11", "run": ["survey.js"], "time": 5, "template": "survey"
        }));
        assert_eq!(asset_url(&m, "survey.js", "/"), "/static/surveys/bis11/survey.js");
    }

    #[test]
    fn test_concat_js() {
        let m = simple_rt();
        assert_eq!(
            concat_js([&m]),
            "\ncase \"simple_rt\":\n      experiments = experiments.concat(simple_rt_experiment)\n      break;\n"
        );
    }

    #[test]
    fn test_static_includes_tags() {
        let m = simple_rt();
        let html = static_includes([&m], "");
        assert!(html.contains("<link rel=\"stylesheet\" href=\"static/experiments/simple_rt/style.CSS\" />"));
        assert!(html.contains(
            "<script type=\"text/javascript\" src=\"https://cdn.example.org/jspsych.js\"></script>"
        ));
    }
}
