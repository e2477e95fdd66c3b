//! Validator rules, one content folder per case

use efx_common::validation::{validate, Failure, ValidateOptions, ValidationResult};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

fn write_item(repo: &Path, id: &str, manifest: &Value) -> PathBuf {
    let folder = repo.join(id);
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join("config.json"), json!([manifest]).to_string()).unwrap();
    fs::write(folder.join("experiment.js"), "var experiment = [];").unwrap();
    folder
}

fn manifest(id: &str, template: &str) -> Value {
    json!({
        "exp_id": id,
        "name": id,
        "run": ["experiment.js"],
        "time": 5,
        "publish": "True",
        "reference": "https://example.org",
        "cognitive_atlas_task_id": "tsk_1",
        "template": template
    })
}

fn check(repo: &Path, id: &str, manifest: &Value) -> ValidationResult {
    validate(&write_item(repo, id, manifest), &ValidateOptions::quiet())
}

#[test]
fn test_publish_false_string_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let mut m = manifest("stroop", "jspsych");
    m["publish"] = json!("False");

    let result = check(tmp.path(), "stroop", &m);
    assert!(matches!(result.failure, Some(Failure::NotPublished)));
}

#[test]
fn test_publish_false_boolean_accepted() {
    let tmp = tempfile::tempdir().unwrap();
    let mut m = manifest("stroop", "jspsych");
    m["publish"] = json!(false);

    let result = check(tmp.path(), "stroop", &m);
    assert!(result.is_valid(), "{:?}", result.reasons());
}

#[test]
fn test_http_script_rejected_https_accepted() {
    let tmp = tempfile::tempdir().unwrap();
    let mut m = manifest("stroop", "jspsych");
    m["run"] = json!(["experiment.js", "http://cdn.example.org/lib.js"]);

    let result = check(tmp.path(), "stroop", &m);
    assert!(matches!(
        result.failure,
        Some(Failure::InsecureScript(ref s)) if s == "http://cdn.example.org/lib.js"
    ));

    m["run"] = json!(["experiment.js", "https://cdn.example.org/lib.js"]);
    let result = check(tmp.path(), "stroop", &m);
    assert!(result.is_valid(), "{:?}", result.reasons());
}

#[test]
fn test_missing_bare_run_file() {
    let tmp = tempfile::tempdir().unwrap();
    let mut m = manifest("stroop", "jspsych");
    m["run"] = json!(["experiment.js", "utils.js"]);

    let result = check(tmp.path(), "stroop", &m);
    assert!(matches!(result.failure, Some(Failure::MissingRunFile(ref s)) if s == "utils.js"));
}

#[test]
fn test_unsupported_template() {
    let tmp = tempfile::tempdir().unwrap();
    let result = check(tmp.path(), "stroop", &manifest("stroop", "psychopy"));
    assert!(matches!(result.failure, Some(Failure::UnsupportedTemplate(ref t)) if t == "psychopy"));
}

#[test]
fn test_survey_needs_question_file() {
    let tmp = tempfile::tempdir().unwrap();
    let m = manifest("bis11_survey", "survey");

    let result = check(tmp.path(), "bis11_survey", &m);
    assert!(matches!(result.failure, Some(Failure::MissingSurveyFile)));

    fs::write(
        tmp.path().join("bis11_survey/survey.tsv"),
        "question_type\tquestion_text\tpage_number\toption_text\toption_values\trequired\n",
    )
    .unwrap();
    let result = check(tmp.path(), "bis11_survey", &m);
    assert!(result.is_valid(), "{:?}", result.reasons());
}

#[test]
fn test_phaser_needs_game_file_and_run_code() {
    let tmp = tempfile::tempdir().unwrap();
    let mut m = manifest("breakout", "phaser");

    let result = check(tmp.path(), "breakout", &m);
    assert!(matches!(result.failure, Some(Failure::MissingGameFile)));

    fs::write(tmp.path().join("breakout/Run.js"), "var game;").unwrap();
    let result = check(tmp.path(), "breakout", &m);
    assert!(matches!(result.failure, Some(Failure::MissingGameRun)));

    m["deployment_variables"] = json!({"run": "var game = new Phaser.Game(800, 600);"});
    let result = check(tmp.path(), "breakout", &m);
    assert!(result.is_valid(), "{:?}", result.reasons());
}

#[test]
fn test_unknown_deployment_keys() {
    let tmp = tempfile::tempdir().unwrap();
    let mut m = manifest("stroop", "jspsych");

    m["deployment_variables"] = json!({"jspsych_init": {"show_timer": true}});
    let result = check(tmp.path(), "stroop", &m);
    assert!(matches!(
        result.failure,
        Some(Failure::UnknownVariable { ref key, section: "jspsych_init" }) if key == "show_timer"
    ));

    m["deployment_variables"] = json!({"material_design": {"show_progress_bar": true}});
    let result = check(tmp.path(), "stroop", &m);
    assert!(matches!(
        result.failure,
        Some(Failure::UnknownVariable { section: "material_design", .. })
    ));
}

#[test]
fn test_boolean_keys_must_be_booleans() {
    let tmp = tempfile::tempdir().unwrap();
    let mut m = manifest("stroop", "jspsych");

    m["deployment_variables"] = json!({"jspsych_init": {"fullscreen": "true"}});
    let result = check(tmp.path(), "stroop", &m);
    assert!(matches!(result.failure, Some(Failure::NotBoolean { ref key, .. }) if key == "fullscreen"));

    m["deployment_variables"] = json!({"material_design": {"fullscreen": "true"}});
    let result = check(tmp.path(), "stroop", &m);
    assert!(matches!(result.failure, Some(Failure::NotBoolean { .. })));

    m["deployment_variables"] = json!({"jspsych_init": {"fullscreen": true}});
    assert!(check(tmp.path(), "stroop", &m).is_valid());
}

#[test]
fn test_numeric_keys_reject_strings_and_booleans() {
    let tmp = tempfile::tempdir().unwrap();
    let mut m = manifest("stroop", "jspsych");

    for bad in [json!("5"), json!(true)] {
        m["deployment_variables"] = json!({"jspsych_init": {"default_iti": bad}});
        let result = check(tmp.path(), "stroop", &m);
        assert!(
            matches!(result.failure, Some(Failure::NotNumeric { ref key, .. }) if key == "default_iti"),
            "{:?}",
            result.reasons()
        );
    }

    m["deployment_variables"] = json!({"jspsych_init": {"default_iti": 5, "max_load_time": 60000}});
    assert!(check(tmp.path(), "stroop", &m).is_valid());
}

#[test]
fn test_missing_warn_field_is_valid_with_warning() {
    let tmp = tempfile::tempdir().unwrap();
    let mut m = manifest("stroop", "jspsych");
    m.as_object_mut().unwrap().remove("reference");
    m["name"] = json!("");

    let result = check(tmp.path(), "stroop", &m);
    assert!(result.is_valid(), "{:?}", result.reasons());
    assert_eq!(result.warnings.len(), 2);
    assert!(result.warnings.iter().any(|w| w.contains("name")));
    assert!(result.warnings.iter().any(|w| w.contains("reference")));
}
