// tests/cli.rs

mod common;

use assert_cmd::prelude::*;
use common::papersync_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_compile_without_worker_url_fails() -> Result<(), Box<dyn std::error::Error>> {
    let out = tempdir()?;
    papersync_cmd()
        .env_remove("PAPERSYNC_WORKER_URL")
        .arg("compile")
        .arg("https://github.com/someone/thesis.git")
        .arg("--out-dir")
        .arg(out.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("PAPERSYNC_WORKER_URL"));
    Ok(())
}

#[test]
fn test_invalid_worker_url_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    papersync_cmd()
        .args(["--worker-url", "ftp://worker", "compile", "https://github.com/u/p.git"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected an http(s) URL"));
    Ok(())
}

#[test]
fn test_unknown_compiler_is_a_usage_error() -> Result<(), Box<dyn std::error::Error>> {
    papersync_cmd()
        .args(["compile", "https://github.com/u/p.git", "--compiler", "context"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("unknown compiler"));
    Ok(())
}

#[test]
fn test_unreadable_previous_result() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let previous = dir.path().join("build.json");
    fs::write(&previous, "{ not json")?;
    papersync_cmd()
        .args(["--worker-url", "http://127.0.0.1:9"])
        .arg("compile")
        .arg("https://github.com/u/p.git")
        .arg("--previous")
        .arg(&previous)
        .assert()
        .failure()
        .stderr(predicate::str::contains("build.json"));
    Ok(())
}

#[test]
fn test_clear_cache_without_worker_is_skipped() -> Result<(), Box<dyn std::error::Error>> {
    papersync_cmd()
        .env_remove("PAPERSYNC_WORKER_URL")
        .args(["clear-cache", "paper-1", "paper-2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"skipped\""));
    Ok(())
}

#[test]
fn test_version_flag() {
    papersync_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
