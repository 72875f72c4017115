use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn workspace_root() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/../.."))
}

#[test]
fn validate_only_skips_analysis() {
    Command::cargo_bin("deckstress")
        .expect("binary built")
        .current_dir(workspace_root())
        .args(["--config", "fixtures/run.yaml", "--validate-only"])
        .args(["--run-id", "cli_validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded configuration 'cli_validate'"))
        .stdout(predicate::str::contains("Validation-only mode"));
    assert!(!workspace_root().join("out/cli_validate/report.json").exists());
}

#[test]
fn full_run_writes_report_and_summary() {
    let dir = tempdir().expect("temp dir");
    let fixtures = workspace_root().join("fixtures");
    let config_path = dir.path().join("run.yaml");
    let yaml = format!(
        r#"
run_id: "cli_full"
inputs:
  buckets: "{fixtures}/buckets.json"
  draw_policy: "{fixtures}/draw_policy.json"
  scenario_catalog: "{fixtures}/scenario_catalog.json"
  operator_policy: "{fixtures}/operator_policy.json"
request:
  format: "commander"
  bracket_id: "3"
  profile_id: "graveyard"
outputs:
  report_json: "{out}/{{run_id}}/report.json"
  summary_md: "{out}/{{run_id}}/summary.md"
"#,
        fixtures = fixtures.display(),
        out = dir.path().display(),
    );
    fs::write(&config_path, yaml).expect("write config");

    Command::cargo_bin("deckstress")
        .expect("binary built")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Stress analysis complete for 'cli_full': OK"))
        .stdout(predicate::str::contains("Model: graveyard_hate"));

    let summary = fs::read_to_string(dir.path().join("cli_full/summary.md")).expect("summary written");
    assert!(summary.contains("GRAVEYARD_HATE_WINDOW"));
    assert!(summary.contains("via profile_bracket"));
    assert!(dir.path().join("cli_full/report.json").exists());
}

#[test]
fn override_model_is_accepted() {
    Command::cargo_bin("deckstress")
        .expect("binary built")
        .current_dir(workspace_root())
        .args(["--config", "fixtures/run.yaml", "--validate-only"])
        .args(["--override-model", "casual_table"])
        .assert()
        .success();
}

#[test]
fn missing_config_fails() {
    Command::cargo_bin("deckstress")
        .expect("binary built")
        .args(["--config", "does/not/exist.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exist.yaml"));
}
