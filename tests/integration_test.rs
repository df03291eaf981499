use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_version_command() -> Result<()> {
    let mut cmd = Command::cargo_bin("build-image")?;
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("build-image 0.1.0"));
    Ok(())
}

#[test]
fn test_version_subcommand() -> Result<()> {
    let mut cmd = Command::cargo_bin("build-image")?;
    cmd.arg("version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("build-image 0.1.0"));
    Ok(())
}

#[test]
fn test_help_command() -> Result<()> {
    let mut cmd = Command::cargo_bin("build-image")?;
    cmd.arg("--help");
    cmd.assert().success().stdout(predicate::str::contains(
        "Build container images from .NET projects",
    ));
    Ok(())
}

#[test]
fn test_build_help() -> Result<()> {
    let mut cmd = Command::cargo_bin("build-image")?;
    cmd.arg("build").arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "Build a container image from a .NET project",
        ))
        .stdout(predicate::str::contains("--as-dockerfile"))
        .stdout(predicate::str::contains("--portable"));
    Ok(())
}

#[test]
fn test_build_missing_context() -> Result<()> {
    let dir = tempdir()?;

    // Writing a Containerfile works without an engine, so this reaches the context check.
    let mut cmd = Command::cargo_bin("build-image")?;
    cmd.arg("build")
        .arg("--as-dockerfile")
        .arg(dir.path().join("Containerfile"))
        .arg("--context")
        .arg(dir.path().join("missing"));

    cmd.assert().failure().stderr(predicate::str::contains(
        "The build context directory does not exist.",
    ));
    assert!(!dir.path().join("Containerfile").exists());
    Ok(())
}

#[test]
fn test_build_project_outside_context() -> Result<()> {
    let dir = tempdir()?;
    let context = dir.path().join("context");
    fs::create_dir_all(&context)?;
    fs::write(dir.path().join("web.csproj"), "<Project />")?;

    let mut cmd = Command::cargo_bin("build-image")?;
    cmd.arg("build")
        .arg("--as-dockerfile")
        .arg(dir.path().join("Containerfile"))
        .arg("--context")
        .arg(&context)
        .arg("../web.csproj");

    cmd.assert().failure().stderr(predicate::str::contains(
        "Project must be a subdirectory of the context directory.",
    ));
    Ok(())
}

#[test]
fn test_build_project_not_found() -> Result<()> {
    let dir = tempdir()?;

    let mut cmd = Command::cargo_bin("build-image")?;
    cmd.arg("build")
        .arg("--as-dockerfile")
        .arg(dir.path().join("Containerfile"))
        .arg("--context")
        .arg(dir.path())
        .arg("web");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("not found."));
    Ok(())
}
