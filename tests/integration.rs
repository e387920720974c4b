#![allow(
    clippy::indexing_slicing,
    clippy::missing_assert_message,
    clippy::missing_docs_in_private_items,
    clippy::tests_outside_test_module,
    clippy::unwrap_used,
    reason = "tests"
)]

use std::path::Path;
use std::process::{Command, Output};

const PIPELINE: &str = "pipelines/main.yml";

fn pipenav_cmd() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_pipenav"));
    cmd.current_dir(Path::new("tests/fixtures/repo"));
    cmd.env_remove("PIPENAV_LOG");
    return cmd;
}

fn run(args: &[&str]) -> Output {
    return pipenav_cmd().args(args).output().unwrap();
}

fn stdout(output: &Output) -> String {
    return String::from_utf8_lossy(&output.stdout).into_owned();
}

fn stderr(output: &Output) -> String {
    return String::from_utf8_lossy(&output.stderr).into_owned();
}

#[test]
fn scan_json_lists_every_reference() {
    let output = run(&["scan", PIPELINE, "--json"]);
    assert!(output.status.success(), "scan failed: {}", stderr(&output));

    let index: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = index.as_array().unwrap();
    assert_eq!(entries.len(), 4);

    let template = &entries[0];
    assert_eq!(template["reference"]["kind"], "template");
    assert_eq!(template["reference"]["line_number"], 3);
    assert_eq!(template["reference"]["span"]["start"], 14);
    assert_eq!(template["resolution"]["type"], "file");
    assert_eq!(template["resolution"]["found"], true);
    let resolved = template["resolution"]["resolved_path"].as_str().unwrap();
    assert!(resolved.ends_with("shared/steps/build.yml"), "{resolved}");

    assert_eq!(entries[1]["resolution"]["type"], "task");
    assert_eq!(entries[1]["resolution"]["task_name"], "Bash");
    assert_eq!(entries[3]["resolution"]["found"], false);
}

#[test]
fn scan_text_summarizes() {
    let output = run(&["scan", PIPELINE]);
    assert!(output.status.success(), "scan failed: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("4:14-45 template steps/build.yml@refs/heads/main -> "), "{text}");
    assert!(text.contains("azure-file-copy-v4?view=azure-devops"), "{text}");
    assert!(text.ends_with("4 references\n"), "{text}");
}

#[test]
fn links_only_for_tasks() {
    let output = run(&["links", PIPELINE, "--json"]);
    assert!(output.status.success(), "links failed: {}", stderr(&output));

    let links: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(links["decorations"].as_array().unwrap().len(), 4);
    let targets: Vec<&str> = links["links"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| return l["target"].as_str().unwrap())
        .collect();
    assert_eq!(targets.len(), 2);
    assert!(targets[0].contains("/bash-v3?"));
}

#[test]
fn definition_of_template_in_sibling_folder() {
    let output = run(&["definition", PIPELINE, "4"]);
    assert!(output.status.success(), "definition failed: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.trim_end().ends_with("shared/steps/build.yml:1:1"), "{text}");
}

#[test]
fn definition_of_task_is_documentation_url() {
    let output = run(&["definition", PIPELINE, "5"]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output).trim_end(),
        "https://learn.microsoft.com/en-us/azure/devops/pipelines/tasks/reference/bash-v3?view=azure-devops"
    );
}

#[test]
fn definition_without_reference_exits_1() {
    let output = run(&["definition", PIPELINE, "1"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn line_past_end_is_runtime_error() {
    let output = run(&["hover", PIPELINE, "99"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("Line Out Of Range"));
}

#[test]
fn hover_template_shows_parameters() {
    let output = run(&["hover", PIPELINE, "4"]);
    assert!(output.status.success(), "hover failed: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("```yaml\nparameters:"), "{text}");
    assert!(text.contains("name: configuration"), "{text}");
    assert!(text.contains("script: make build"), "{text}");
}

#[test]
fn hover_missing_file() {
    let output = run(&["hover", PIPELINE, "7"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("File not found."));
}

#[test]
fn hover_task_with_fetch_disabled() {
    let output = run(&["hover", PIPELINE, "5"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("`InternetFetch` feature is disabled"), "{text}");
    assert!(text.contains("pipenav toggle InternetFetch"), "{text}");
}

#[test]
fn unsupported_document_rejected() {
    let output = run(&["scan", "notes.json"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("Unsupported Document"));
}

#[test]
fn missing_document_rejected() {
    let output = run(&["scan", "pipelines/nope.yml"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("Document Not Found"));
}

#[test]
fn toggle_persists_to_settings_file() {
    let dir = tempfile::tempdir().unwrap();
    let settings = dir.path().join(".pipenav.toml");
    let config = settings.to_str().unwrap();

    let output = run(&["--config", config, "toggle", "InternetFetch"]);
    assert!(output.status.success(), "toggle failed: {}", stderr(&output));
    assert!(stdout(&output).starts_with("InternetFetch enabled"));
    assert!(std::fs::read_to_string(&settings).unwrap().contains("InternetFetch = true"));

    let output = run(&["--config", config, "toggle", "internetfetch"]);
    assert!(stdout(&output).starts_with("InternetFetch disabled"));
}

#[test]
fn toggle_unknown_feature() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join(".pipenav.toml");
    let output = run(&["--config", config.to_str().unwrap(), "toggle", "Telemetry"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("Unknown Feature"));
    assert!(!config.exists());
}

#[test]
fn replacement_rule_redirects_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let settings = dir.path().join(".pipenav.toml");
    let config = settings.to_str().unwrap();

    let output = run(&["--config", config, "replace", "./missing.yml", "shared/steps/build.yml"]);
    assert!(output.status.success(), "replace failed: {}", stderr(&output));

    let output = run(&["--config", config, "definition", PIPELINE, "7"]);
    assert!(stdout(&output).trim_end().ends_with("shared/steps/build.yml:1:1"), "{}", stdout(&output));

    let output = run(&["--config", config, "replace", "a", "b", "--slot", "1"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("Replacement Slot Out Of Range"));
}

#[test]
fn info_json_reports_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join(".pipenav.toml");
    let output = run(&["--config", config.to_str().unwrap(), "info", "--json"]);
    assert!(output.status.success());

    let info: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let state = &info["current_state"];
    assert_eq!(state["settings_found"], false);
    assert_eq!(state["feature_toggles"][0]["name"], "InternetFetch");
    assert_eq!(state["feature_toggles"][0]["enabled"], false);
    assert_eq!(state["feature_toggles"][1]["enabled"], true);
    assert_eq!(state["quick_replace_count"], 1);
}
