//! Integration tests for validate → select → assemble
//!
//! Every test builds a throwaway content repository and battery skeleton
//! under a tempdir.

use efx_common::battery::{assemble, BatteryRequest, LOADER_TEMPLATE};
use efx_common::selection::{build_lookup, find_changed, list_valid, load_items, load_valid, select};
use efx_common::validation::{validate, Failure, ValidateOptions};
use efx_common::Error;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write `<repo>/<id>/config.json` (array-wrapped) plus `experiment.js`
fn write_item(repo: &Path, id: &str, manifest: Value) -> PathBuf {
    let folder = repo.join(id);
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join("config.json"), json!([manifest]).to_string()).unwrap();
    fs::write(folder.join("experiment.js"), format!("var {}_experiment = [];", id)).unwrap();
    folder
}

fn jspsych_manifest(id: &str, time: Value) -> Value {
    json!({
        "exp_id": id,
        "name": id,
        "run": ["experiment.js"],
        "time": time,
        "publish": "True",
        "reference": "https://example.org",
        "cognitive_atlas_task_id": "tsk_1",
        "template": "jspsych"
    })
}

fn skeleton(root: &Path) -> PathBuf {
    let skeleton = root.join("skeleton");
    fs::create_dir_all(skeleton.join("static/js")).unwrap();
    fs::write(skeleton.join("index.html"), "<html></html>").unwrap();
    fs::write(
        skeleton.join(LOADER_TEMPLATE),
        "switch (tag) {[SUB_EXPERIMENTLOAD_SUB]}\nswitch (tag) {[SUB_EXPERIMENTCONCAT_SUB]}\nvar times = [SUB_EXPERIMENTTIMES_SUB];\n",
    )
    .unwrap();
    skeleton
}

fn repo_with(items: &[(&str, Value)]) -> (TempDir, PathBuf) {
    let tmp = tempfile::tempdir().unwrap();
    let repo = tmp.path().join("experiments");
    for (id, time) in items {
        write_item(&repo, id, jspsych_manifest(id, time.clone()));
    }
    (tmp, repo)
}

#[test]
fn test_missing_required_field_named() {
    let (_tmp, repo) = repo_with(&[]);
    for field in ["run", "time", "exp_id", "publish", "template"] {
        let mut manifest = jspsych_manifest("stroop", json!(5));
        manifest.as_object_mut().unwrap().remove(field);
        let folder = write_item(&repo, "stroop", manifest);

        let result = validate(&folder, &ValidateOptions::quiet());
        assert!(!result.is_valid(), "missing {} should be invalid", field);
        assert!(
            result.reasons()[0].contains(field),
            "reason {:?} should name {}",
            result.reasons(),
            field
        );
    }
}

#[test]
fn test_identifier_must_match_folder() {
    let (_tmp, repo) = repo_with(&[]);
    let folder = write_item(&repo, "stroop", jspsych_manifest("go_nogo", json!(5)));

    let result = validate(&folder, &ValidateOptions::quiet());
    assert!(matches!(result.failure, Some(Failure::IdMismatch { .. })));
}

#[test]
fn test_identifier_charset() {
    let (_tmp, repo) = repo_with(&[]);
    let folder = write_item(&repo, "Stroop-Task", jspsych_manifest("Stroop-Task", json!(5)));

    let result = validate(&folder, &ValidateOptions::quiet());
    assert!(matches!(result.failure, Some(Failure::InvalidId { .. })));
}

#[test]
fn test_jspsych_requires_experiment_js() {
    let (_tmp, repo) = repo_with(&[]);
    let mut manifest = jspsych_manifest("stroop", json!(5));
    manifest["run"] = json!(["style.css"]);
    let folder = write_item(&repo, "stroop", manifest);
    fs::write(folder.join("style.css"), "body {}").unwrap();

    assert!(!validate(&folder, &ValidateOptions::quiet()).is_valid());

    let folder = write_item(&repo, "stroop", jspsych_manifest("stroop", json!(5)));
    let result = validate(&folder, &ValidateOptions::quiet());
    assert!(result.is_valid(), "{:?}", result.reasons());
    assert!(result.warnings.is_empty());
}

#[test]
fn test_unparsable_manifest_is_failure_not_error() {
    let (_tmp, repo) = repo_with(&[]);
    let folder = repo.join("broken");
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join("config.json"), "[{\"exp_id\": ").unwrap();

    let result = validate(&folder, &ValidateOptions::quiet());
    assert!(matches!(result.failure, Some(Failure::Manifest(_))));
}

#[test]
fn test_selector_is_idempotent() {
    let (_tmp, repo) = repo_with(&[("stroop", json!(5)), ("go_nogo", json!(3))]);
    fs::create_dir_all(repo.join(".git")).unwrap();
    fs::create_dir_all(repo.join("not_an_item")).unwrap();

    let first = list_valid(&repo, &ValidateOptions::quiet()).unwrap();
    let second = list_valid(&repo, &ValidateOptions::quiet()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);

    let manifests = |folders: &[PathBuf]| -> Vec<_> {
        load_items(folders).unwrap().into_iter().map(|i| i.manifest).collect()
    };
    assert_eq!(
        build_lookup(&manifests(&first), "exp_id"),
        build_lookup(&manifests(&second), "exp_id")
    );
}

#[test]
fn test_lookup_last_write_wins() {
    let (_tmp, repo) = repo_with(&[("alpha", json!(5)), ("beta", json!(5))]);
    let items = load_valid(&repo, &ValidateOptions::quiet()).unwrap();
    let manifests: Vec<_> = items.into_iter().map(|i| i.manifest).collect();

    let by_task = build_lookup(&manifests, "cognitive_atlas_task_id");
    assert_eq!(by_task.len(), 1);
    assert_eq!(by_task["tsk_1"].exp_id, "beta");
}

#[test]
fn test_timing_artifact_preserves_order_and_numbers() {
    let (tmp, repo) = repo_with(&[("a_task", json!(3.5)), ("b_task", json!(4))]);
    let valid = list_valid(&repo, &ValidateOptions::quiet()).unwrap();
    let items = load_items(&select(&valid, &[])).unwrap();

    let dest = tmp.path().join("battery");
    let request = BatteryRequest::new(&dest, skeleton(tmp.path()), items);
    let battery = assemble(&request).unwrap();

    assert_eq!(battery.items.len(), 2);
    let loader = fs::read_to_string(dest.join(LOADER_TEMPLATE)).unwrap();
    assert!(loader.contains(r#"var times = [{"name":"a_task","time":3.5},{"name":"b_task","time":4}];"#));
    assert!(loader.contains("loadjscssfile(\"static/experiments/a_task/experiment.js\",\"js\")"));
    assert!(loader.contains("experiments = experiments.concat(b_task_experiment)"));
    assert!(dest.join("static/experiments/b_task/config.json").is_file());
    assert!(dest.join("config.txt").is_file());
}

#[test]
fn test_existing_destination_untouched() {
    let (tmp, repo) = repo_with(&[("stroop", json!(5))]);
    let items = load_valid(&repo, &ValidateOptions::quiet()).unwrap();

    let dest = tmp.path().join("battery");
    fs::create_dir_all(&dest).unwrap();
    fs::write(dest.join("keep.txt"), "stale").unwrap();

    let err = assemble(&BatteryRequest::new(&dest, skeleton(tmp.path()), items)).unwrap_err();
    assert!(matches!(err, Error::DestinationExists(_)));

    let entries: Vec<_> = fs::read_dir(&dest).unwrap().collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(fs::read_to_string(dest.join("keep.txt")).unwrap(), "stale");
}

#[test]
fn test_missing_loader_template_writes_nothing() {
    let (tmp, repo) = repo_with(&[("stroop", json!(5))]);
    let items = load_valid(&repo, &ValidateOptions::quiet()).unwrap();
    let empty_skeleton = tmp.path().join("empty");
    fs::create_dir_all(&empty_skeleton).unwrap();

    let dest = tmp.path().join("battery");
    let err = assemble(&BatteryRequest::new(&dest, empty_skeleton, items)).unwrap_err();
    assert!(matches!(err, Error::Template { .. }));
    assert!(!dest.exists());
}

#[test]
fn test_uncopyable_item_dropped() {
    let (tmp, repo) = repo_with(&[("stroop", json!(5)), ("go_nogo", json!(3))]);
    let mut items = load_valid(&repo, &ValidateOptions::quiet()).unwrap();
    items[0].folder = tmp.path().join("vanished");

    let dest = tmp.path().join("battery");
    let battery = assemble(&BatteryRequest::new(&dest, skeleton(tmp.path()), items)).unwrap();

    assert_eq!(battery.items.len(), 1);
    assert_eq!(battery.skipped, vec![tmp.path().join("vanished")]);
    let loader = fs::read_to_string(dest.join(LOADER_TEMPLATE)).unwrap();
    assert!(!loader.contains("case \"go_nogo\""));
}

#[test]
fn test_find_changed_items() {
    let (tmp, repo) = repo_with(&[("stroop", json!(5)), ("go_nogo", json!(3))]);
    let old = tmp.path().join("old");
    efx_common::files::copy_directory(&repo, &old).unwrap();
    fs::write(repo.join("stroop/experiment.js"), "var stroop_experiment = [1];").unwrap();

    let changed = find_changed(&repo, &old).unwrap();
    assert_eq!(changed, vec![repo.join("stroop")]);
}
