#![allow(clippy::unwrap_used)]
//! CLI smoke tests: the binary starts and the offline commands work.
//!
//! Every test points XDG directories at a fresh temp dir so no real config
//! or history is touched.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

#[allow(deprecated)]
fn cliplens(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cliplens").unwrap();
    cmd.env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_DATA_HOME", home.path().join("data"))
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(home: &TempDir, contents: &str) {
    let dir = home.path().join("config").join("cliplens");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), contents).unwrap();
}

#[test]
fn test_help_displays_usage() {
    let home = TempDir::new().unwrap();
    cliplens(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Clipboard history"))
        .stdout(predicate::str::contains("process"))
        .stdout(predicate::str::contains("history"))
        .stdout(predicate::str::contains("--provider"));
}

#[test]
fn test_version_displays_version() {
    let home = TempDir::new().unwrap();
    cliplens(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_languages_uses_defaults_without_config() {
    let home = TempDir::new().unwrap();
    cliplens(&home)
        .arg("languages")
        .assert()
        .success()
        .stdout(predicate::str::contains("en"))
        .stdout(predicate::str::contains("Japanese"));
}

#[test]
fn test_languages_follow_config() {
    let home = TempDir::new().unwrap();
    write_config(&home, "[processing]\nlanguages = [\"en\", \"ko\"]\n");
    cliplens(&home)
        .arg("languages")
        .assert()
        .success()
        .stdout(predicate::str::contains("Korean"))
        .stdout(predicate::str::contains("Japanese").not());
}

#[test]
fn test_history_list_empty() {
    let home = TempDir::new().unwrap();
    cliplens(&home)
        .args(["history", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("History is empty."));
}

#[test]
fn test_history_show_out_of_range() {
    let home = TempDir::new().unwrap();
    cliplens(&home)
        .args(["history", "show", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No item 3"));
}

#[test]
fn test_history_clear_without_file() {
    let home = TempDir::new().unwrap();
    cliplens(&home)
        .args(["history", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 0 item(s)"));
}

#[test]
fn test_providers_list_without_config() {
    let home = TempDir::new().unwrap();
    cliplens(&home)
        .arg("providers")
        .assert()
        .success()
        .stdout(predicate::str::contains("No providers configured."));
}

#[test]
fn test_providers_show_configured() {
    let home = TempDir::new().unwrap();
    write_config(
        &home,
        r#"
[cliplens]
provider = "ollama"

[providers.ollama]
kind = "ollama"
models = ["llama3.2"]
"#,
    );
    cliplens(&home)
        .args(["providers", "ollama"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://localhost:11434"))
        .stdout(predicate::str::contains("llama3.2"))
        .stdout(predicate::str::contains("(default)"));
}

#[test]
fn test_providers_show_unknown() {
    let home = TempDir::new().unwrap();
    write_config(&home, "[providers.ollama]\nkind = \"ollama\"\n");
    cliplens(&home)
        .args(["providers", "nonexistent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_process_without_provider_fails() {
    let home = TempDir::new().unwrap();
    cliplens(&home)
        .arg("process")
        .write_stdin("hello")
        .assert()
        .failure()
        .stderr(predicate::str::contains("'provider'"));
}

#[test]
fn test_process_rejects_unconfigured_language() {
    let home = TempDir::new().unwrap();
    write_config(
        &home,
        r#"
[cliplens]
provider = "ollama"
model = "llama3.2"

[providers.ollama]
kind = "ollama"
"#,
    );
    cliplens(&home)
        .args(["process", "--to", "xx"])
        .write_stdin("hello")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid language code"));
}

#[test]
fn test_models_list_builtin_for_local_provider() {
    let home = TempDir::new().unwrap();
    write_config(
        &home,
        r#"
[cliplens]
provider = "device"
model = "qwen2.5-1.5b-instruct"

[providers.device]
kind = "local"
"#,
    );
    cliplens(&home)
        .args(["models", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("qwen2.5-1.5b-instruct"))
        .stdout(predicate::str::contains("vision"));
}

#[test]
fn test_models_download_unknown_fails_fast() {
    let home = TempDir::new().unwrap();
    write_config(
        &home,
        r#"
[cliplens]
provider = "device"
model = "qwen2.5-1.5b-instruct"

[providers.device]
kind = "local"
"#,
    );
    cliplens(&home)
        .args(["models", "download", "no-such-model"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no-such-model"));
}
