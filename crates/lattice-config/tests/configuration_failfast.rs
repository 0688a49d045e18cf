//! Fail-fast coverage for invalid configuration input.

use std::ffi::OsString;
use std::fs;

use tempfile::TempDir;

use lattice_config::Config;
use ortho_config::OrthoConfig;

fn load_with_file(contents: &str) -> Result<Config, String> {
    let temp_dir = TempDir::new().expect("create temp dir");
    let path = temp_dir.path().join("lattice.toml");
    fs::write(&path, contents).expect("write configuration");

    let args = vec![
        OsString::from("lattice"),
        OsString::from("--config-path"),
        path.into_os_string(),
    ];
    Config::load_from_iter(args).map_err(|error| error.to_string())
}

#[test]
fn unknown_log_format_is_rejected() {
    let message = load_with_file("log_format = \"yaml\"\n").expect_err("yaml is not a format");
    assert!(
        message.contains("yaml") || message.contains("log_format"),
        "expected the offending value in the message, got {message:?}"
    );
}

#[test]
fn unknown_deployment_mode_is_rejected() {
    load_with_file("deployment_mode = \"embedded\"\n").expect_err("embedded is not a mode");
}

#[test]
fn malformed_toml_is_rejected() {
    load_with_file("log_filter = ").expect_err("truncated file must not load");
}

#[test]
fn unknown_cli_flag_is_rejected() {
    let args = vec![OsString::from("lattice"), OsString::from("--socket")];
    Config::load_from_iter(args).expect_err("unknown flags must fail");
}

#[test]
fn managed_mode_loads_from_file() {
    let config = load_with_file("deployment_mode = \"managed\"\nlog_format = \"compact\"\n")
        .expect("valid configuration");
    assert!(!config.deployment_mode().owns_container());
    assert_eq!(config.log_format().to_string(), "compact");
}
