//! CLI tests for `flowline check`, `flowline resolve` and `flowline table`.
//!
//! Spawns the flowline binary against manifests in a temp directory and
//! verifies exit codes and JSON output.

use std::fs;
use std::path::Path;
use std::process::Command;

use flowline::exit_codes;
use serde_json::Value;

const ROUTES: &str = r#"
[[route]]
pattern = ""
target = "HomeView"
layouts = ["MainLayout"]

[[route]]
pattern = "users/{id}"
target = "UserView"
layouts = ["MainLayout", "UsersLayout"]

[[route]]
pattern = "docs/{*page}"
target = "DocsView"
"#;

fn write_routes(dir: &Path, contents: &str) {
    fs::write(dir.join("routes.toml"), contents).expect("write routes");
}

fn flowline(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_flowline"));
    cmd.current_dir(dir);
    cmd
}

#[test]
fn check_valid_manifest_exits_ok() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_routes(temp.path(), ROUTES);

    let output = flowline(temp.path())
        .args(["check", "routes.toml"])
        .output()
        .expect("flowline check");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(String::from_utf8_lossy(&output.stdout).contains("ok: 3 routes"));
}

#[test]
fn check_reports_each_conflict() {
    let temp = tempfile::tempdir().expect("tempdir");
    let conflicting = format!(
        "{ROUTES}\n[[route]]\npattern = \"/\"\ntarget = \"LandingView\"\n\n[[route]]\npattern = \"users/{{name}}\"\ntarget = \"UserByName\"\n"
    );
    write_routes(temp.path(), &conflicting);

    let output = flowline(temp.path())
        .args(["check", "routes.toml"])
        .output()
        .expect("flowline check");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 2);
    assert!(stdout.contains("'HomeView' and 'LandingView'"));
    assert!(stdout.contains("'UserView' and 'UserByName'"));
}

#[test]
fn resolve_prints_target_layouts_and_parameters() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_routes(temp.path(), ROUTES);

    let output = flowline(temp.path())
        .args(["resolve", "/users/42", "--manifest", "routes.toml"])
        .output()
        .expect("flowline resolve");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let json: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(json["target"], "UserView");
    assert_eq!(json["pattern"], "users/{id}");
    assert_eq!(json["layouts"], serde_json::json!(["MainLayout", "UsersLayout"]));
    assert_eq!(json["parameters"]["id"], "42");
}

#[test]
fn resolve_uses_manifest_from_config() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_routes(temp.path(), ROUTES);
    fs::write(temp.path().join("flowline.toml"), "routes = \"routes.toml\"\n")
        .expect("write config");

    let output = flowline(temp.path())
        .args(["resolve", "docs/guide/intro"])
        .output()
        .expect("flowline resolve");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let json: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(json["target"], "DocsView");
    assert_eq!(json["parameters"]["page"], "guide/intro");
}

#[test]
fn resolve_unknown_path_exits_not_found() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_routes(temp.path(), ROUTES);

    let status = flowline(temp.path())
        .args(["resolve", "admin", "--manifest", "routes.toml"])
        .status()
        .expect("flowline resolve");

    assert_eq!(status.code(), Some(exit_codes::NOT_FOUND));
}

#[test]
fn table_lists_routes_in_pattern_order() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_routes(temp.path(), ROUTES);

    let output = flowline(temp.path())
        .args(["table", "routes.toml"])
        .output()
        .expect("flowline table");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let json: Value = serde_json::from_slice(&output.stdout).expect("json");
    let patterns: Vec<&str> = json
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|entry| entry["pattern"].as_str())
        .collect();
    assert_eq!(patterns, vec!["", "docs/{*page}", "users/{id}"]);
}

#[test]
fn missing_manifest_without_config_is_invalid() {
    let temp = tempfile::tempdir().expect("tempdir");

    let status = flowline(temp.path())
        .arg("check")
        .status()
        .expect("flowline check");

    assert_eq!(status.code(), Some(exit_codes::INVALID));
}
