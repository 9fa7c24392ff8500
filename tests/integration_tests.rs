//! Integration tests for the RTT CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Helper to get an rtt command isolated inside a temp workspace
fn rtt(tmp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("rtt").unwrap();
    cmd.current_dir(tmp.path())
        .env("XDG_CONFIG_HOME", tmp.path().join("xdg"))
        .env("HOME", tmp.path())
        .env("RTT_LOG", "error")
        .env_remove("RTT_STORE")
        .env_remove("RTT_AUTHOR")
        .env_remove("RTT_VALIDATION")
        .env_remove("RTT_LOG_FORMAT");
    cmd
}

/// Helper to create an initialized workspace
fn setup_store() -> TempDir {
    let tmp = TempDir::new().unwrap();
    rtt(&tmp).arg("init").assert().success();
    tmp
}

fn greeting() -> Value {
    json!({
        "template_info": {"name": "Greeting", "version": "1.0", "description": "Says hello"},
        "sections": [
            {"id": "s1", "name": "Hello", "type": "text",
             "content": {"text": "Hello {{name}}", "footer": "{{ upper(site.code) }} {{missing}}"}}
        ],
        "format_config": {
            "page_settings": {"size": "A4"},
            "styles": {"font_family": "SimHei"}
        }
    })
}

fn write_json(tmp: &TempDir, name: &str, value: &Value) -> PathBuf {
    let path = tmp.path().join(name);
    fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

/// Store the greeting template under the id "greeting"
fn create_greeting(tmp: &TempDir) {
    let file = write_json(tmp, "greeting.json", &greeting());
    rtt(tmp)
        .args(["new", file.to_str().unwrap(), "-t", "custom", "--id", "greeting", "--tag", "demo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("greeting"));
}

fn stdout_json(output: std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    let tmp = TempDir::new().unwrap();
    rtt(&tmp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Report Template Toolkit"));
}

#[test]
fn test_unknown_template_type_is_rejected() {
    let tmp = setup_store();
    rtt(&tmp)
        .args(["list", "-t", "weekly_digest"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("weekly_digest"));
}

#[test]
fn test_completions_bash() {
    let tmp = TempDir::new().unwrap();
    rtt(&tmp)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rtt"));
}

#[test]
fn test_completions_fish_lists_subcommands() {
    let tmp = TempDir::new().unwrap();
    rtt(&tmp)
        .args(["completions", "fish"])
        .assert()
        .success()
        .stdout(predicate::str::contains("complete -c rtt"))
        .stdout(predicate::str::contains("preview"));
}

// ============================================================================
// Store Tests
// ============================================================================

#[test]
fn test_init_seeds_defaults() {
    let tmp = setup_store();
    assert!(tmp.path().join(".rtt/templates/fault_diagnosis").is_dir());

    rtt(&tmp)
        .args(["list", "--format", "id", "-t", "fault_diagnosis"])
        .assert()
        .success()
        .stdout("default-fault-diagnosis\n");

    rtt(&tmp)
        .args(["list", "--count"])
        .assert()
        .success()
        .stdout("3\n");
}

#[test]
fn test_init_twice_keeps_defaults() {
    let tmp = setup_store();
    rtt(&tmp)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already present"));
}

#[test]
fn test_store_flag_overrides_default_location() {
    let tmp = TempDir::new().unwrap();
    let store = tmp.path().join("elsewhere");
    rtt(&tmp)
        .args(["init", "--no-defaults", "--store", store.to_str().unwrap()])
        .assert()
        .success();
    assert!(store.join("custom").is_dir());
    assert!(!tmp.path().join(".rtt/templates").exists());
}

#[test]
fn test_new_then_show_round_trips_content() {
    let tmp = setup_store();
    create_greeting(&tmp);

    let output = rtt(&tmp)
        .args(["show", "greeting", "-t", "custom"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(output), greeting());

    let output = rtt(&tmp)
        .args(["show", "greeting", "-t", "custom", "--metadata"])
        .output()
        .unwrap();
    let shown = stdout_json(output);
    assert_eq!(shown["metadata"]["name"], json!("Greeting"));
    assert_eq!(shown["metadata"]["sections"], json!(["s1"]));
    assert_eq!(shown["metadata"]["required_fields"], json!(["missing", "name", "site.code"]));
}

#[test]
fn test_new_refuses_invalid_content() {
    let tmp = setup_store();
    let file = write_json(&tmp, "broken.json", &json!({"template_info": {}}));

    rtt(&tmp)
        .args(["new", file.to_str().unwrap(), "-t", "custom"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("sections"));

    rtt(&tmp)
        .args(["new", file.to_str().unwrap(), "-t", "custom", "--force", "-f", "id"])
        .assert()
        .success();
}

#[test]
fn test_new_refuses_taken_id() {
    let tmp = setup_store();
    create_greeting(&tmp);
    let file = tmp.path().join("greeting.json");

    rtt(&tmp)
        .args(["new", file.to_str().unwrap(), "-t", "custom", "--id", "greeting"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_show_missing_template_fails() {
    let tmp = setup_store();
    rtt(&tmp)
        .args(["show", "ghost", "-t", "custom"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ghost"));
}

#[test]
fn test_search_matches_tags_and_names() {
    let tmp = setup_store();
    rtt(&tmp)
        .args(["search", "FAULT", "--format", "id"])
        .assert()
        .success()
        .stdout("default-fault-diagnosis\n");

    rtt(&tmp)
        .args(["search", "no-such-thing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No results"));
}

#[test]
fn test_delete_removes_template() {
    let tmp = setup_store();
    create_greeting(&tmp);

    rtt(&tmp)
        .args(["delete", "greeting", "-t", "custom"])
        .assert()
        .success();
    rtt(&tmp)
        .args(["show", "greeting", "-t", "custom"])
        .assert()
        .failure();
    rtt(&tmp)
        .args(["delete", "greeting", "-t", "custom"])
        .assert()
        .failure();
}

#[test]
fn test_stats_json() {
    let tmp = setup_store();
    create_greeting(&tmp);

    let output = rtt(&tmp).args(["stats", "--format", "json"]).output().unwrap();
    let stats = stdout_json(output);
    assert_eq!(stats["total_templates"], json!(4));
    assert_eq!(stats["by_type"]["custom"], json!(1));
    assert_eq!(stats["total_versions"], json!(0));
}

// ============================================================================
// Validation Tests
// ============================================================================

#[test]
fn test_validate_default_templates() {
    let tmp = setup_store();
    for (id, kind) in [
        ("default-vibration-analysis", "vibration_analysis"),
        ("default-fault-diagnosis", "fault_diagnosis"),
        ("default-maintenance", "maintenance"),
    ] {
        rtt(&tmp)
            .args(["validate", id, "-t", kind, "--validation", "strict"])
            .assert()
            .success()
            .stdout(predicate::str::contains("0 error(s)"));
    }
}

#[test]
fn test_validate_file_fault_diagnosis_needs_conclusion() {
    let tmp = TempDir::new().unwrap();
    let file = write_json(&tmp, "greeting.json", &greeting());

    rtt(&tmp)
        .args(["validate", "--file", file.to_str().unwrap(), "-t", "fault_diagnosis"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("analysis_conclusion"));

    rtt(&tmp)
        .args(["validate", "--file", file.to_str().unwrap(), "-t", "custom"])
        .assert()
        .success();
}

#[test]
fn test_validate_none_level_demotes_rule_errors() {
    let tmp = TempDir::new().unwrap();
    let file = write_json(&tmp, "greeting.json", &greeting());

    let output = rtt(&tmp)
        .args([
            "validate", "--file", file.to_str().unwrap(), "-t", "fault_diagnosis",
            "--validation", "none", "--format", "json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let result = stdout_json(output);
    assert_eq!(result["is_valid"], json!(true));
    assert!(!result["warnings"].as_array().unwrap().is_empty());
}

#[test]
fn test_validation_level_from_env() {
    let tmp = TempDir::new().unwrap();
    let file = write_json(&tmp, "greeting.json", &greeting());

    rtt(&tmp)
        .env("RTT_VALIDATION", "none")
        .args(["validate", "--file", file.to_str().unwrap(), "-t", "fault_diagnosis"])
        .assert()
        .success();
}

#[test]
fn test_variables_from_file() {
    let tmp = TempDir::new().unwrap();
    let file = write_json(&tmp, "greeting.json", &greeting());

    rtt(&tmp)
        .args(["variables", "--file", file.to_str().unwrap()])
        .assert()
        .success()
        .stdout("missing\nname\nsite.code\n");
}

// ============================================================================
// Render Tests
// ============================================================================

#[test]
fn test_render_with_set_values() {
    let tmp = setup_store();
    create_greeting(&tmp);

    let output = rtt(&tmp)
        .args([
            "render", "greeting", "-t", "custom",
            "--set", "name=World", "--set", "site.code=wf-7",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let rendered = stdout_json(output);
    let text = &rendered["sections"][0]["content"];
    assert_eq!(text["text"], json!("Hello World"));
    assert_eq!(text["footer"], json!("WF-7 {{missing}}"));
}

#[test]
fn test_render_with_vars_file_to_output() {
    let tmp = setup_store();
    create_greeting(&tmp);
    let vars = write_json(&tmp, "vars.json", &json!({"name": "Turbine 12", "missing": "found"}));
    let out = tmp.path().join("out/rendered.json");

    rtt(&tmp)
        .args([
            "render", "greeting", "-t", "custom",
            "--vars", vars.to_str().unwrap(),
            "-o", out.to_str().unwrap(),
        ])
        .assert()
        .success();

    let rendered: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(
        rendered["sections"][0]["content"]["text"],
        json!("Hello Turbine 12")
    );
}

#[test]
fn test_render_blocked_by_validation() {
    let tmp = setup_store();
    let file = write_json(&tmp, "greeting.json", &greeting());
    rtt(&tmp)
        .args(["new", file.to_str().unwrap(), "-t", "fault_diagnosis", "--id", "g", "--force"])
        .assert()
        .success();

    rtt(&tmp)
        .args(["render", "g", "-t", "fault_diagnosis", "--set", "name=x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("analysis_conclusion"));

    rtt(&tmp)
        .args(["render", "g", "-t", "fault_diagnosis", "--set", "name=x", "--no-validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Hello x"));
}

#[test]
fn test_preview_default_template() {
    let tmp = setup_store();
    rtt(&tmp)
        .args(["preview", "default-vibration-analysis", "-t", "vibration_analysis"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sample Name"))
        .stdout(predicate::str::contains("{{").not());
}

#[test]
fn test_preview_samples() {
    let tmp = setup_store();
    let output = rtt(&tmp)
        .args(["preview", "default-maintenance", "-t", "maintenance", "--samples"])
        .output()
        .unwrap();
    let samples = stdout_json(output);
    assert_eq!(samples["estimated_cost"], json!("sample_estimated_cost"));
    assert_eq!(samples["health_score"], json!("sample_health_score"));
    assert_eq!(samples["turbine_id"], json!("sample_turbine_id"));
}

// ============================================================================
// Version and Bundle Tests
// ============================================================================

#[test]
fn test_version_create_list_restore() {
    let tmp = setup_store();
    create_greeting(&tmp);

    let output = rtt(&tmp)
        .args(["version", "create", "greeting", "-t", "custom", "-m", "first", "-f", "id"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let version_id = String::from_utf8(output.stdout).unwrap().trim().to_string();
    assert!(!version_id.is_empty());

    // Change the content, then restore the snapshot
    let mut changed = greeting();
    changed["template_info"]["version"] = json!("2.0");
    let file = write_json(&tmp, "changed.json", &changed);
    rtt(&tmp)
        .args(["new", file.to_str().unwrap(), "-t", "custom", "--id", "greeting", "--force"])
        .assert()
        .success();

    rtt(&tmp)
        .args(["version", "restore", "greeting", &version_id, "-t", "custom"])
        .assert()
        .success();

    let output = rtt(&tmp)
        .args(["show", "greeting", "-t", "custom"])
        .output()
        .unwrap();
    assert_eq!(stdout_json(output), greeting());

    let output = rtt(&tmp)
        .args(["version", "list", "greeting", "-t", "custom", "--format", "json"])
        .output()
        .unwrap();
    let versions = stdout_json(output);
    assert_eq!(versions.as_array().unwrap().len(), 2);
    assert_eq!(versions[0]["version_id"], json!(version_id));
}

#[test]
fn test_restore_unknown_version_fails() {
    let tmp = setup_store();
    create_greeting(&tmp);
    rtt(&tmp)
        .args(["version", "restore", "greeting", "19990101T000000000-deadbeef", "-t", "custom"])
        .assert()
        .failure();
}

#[test]
fn test_export_import_between_stores() {
    let tmp = setup_store();
    create_greeting(&tmp);
    rtt(&tmp)
        .args(["version", "create", "greeting", "-t", "custom"])
        .assert()
        .success();

    let bundle = tmp.path().join("bundle.json");
    rtt(&tmp)
        .args([
            "export", "greeting", "-t", "custom",
            "-o", bundle.to_str().unwrap(), "--with-versions",
        ])
        .assert()
        .success();

    let other = tmp.path().join("other-store");
    rtt(&tmp)
        .args(["import", bundle.to_str().unwrap(), "--store", other.to_str().unwrap()])
        .assert()
        .success();
    rtt(&tmp)
        .args(["import", bundle.to_str().unwrap(), "--store", other.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    rtt(&tmp)
        .args([
            "import", bundle.to_str().unwrap(),
            "--store", other.to_str().unwrap(), "--overwrite",
        ])
        .assert()
        .success();

    let output = rtt(&tmp)
        .args(["show", "greeting", "-t", "custom", "--store", other.to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(stdout_json(output), greeting());
}
