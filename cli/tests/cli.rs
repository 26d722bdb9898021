//! Integration tests for the `imgstack` binary.
//!
//! Only `plan` and `--dry-run` builds are exercised, so no container
//! engine is needed. Logs go to stderr, summaries to stdout.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

fn imgstack(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_imgstack"))
        .args(args)
        .env("RUST_LOG", "info")
        .output()
        .expect("failed to run imgstack binary")
}

/// `<tmp>/proj` with `base-image/` and `dev-image/` Dockerfiles.
fn project(root: &TempDir) -> PathBuf {
    let project = root.path().join("proj");
    for dir in ["base-image", "dev-image"] {
        let dir = project.join(dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("Dockerfile"), "FROM scratch\n").unwrap();
    }
    project
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_plan_json_conventional_layout() {
    let root = TempDir::new().unwrap();
    let project = project(&root);

    let output = imgstack(&["plan", path_str(&project), "--json"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let plans: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let plans = plans.as_array().unwrap();
    assert_eq!(plans.len(), 2);
    assert_eq!(plans[0]["stage"], "base");
    assert_eq!(plans[0]["builds"][0]["tag"], "proj-base-image-linux/amd64:latest");
    assert_eq!(plans[0]["builds"][1]["tag"], "proj-base-image-linux/arm64/v8:latest");
    assert_eq!(plans[1]["builds"][0]["platform"], "linux/amd64");

    let dev_options: Vec<String> = plans[1]["builds"][0]["options"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o.as_str().unwrap().to_string())
        .collect();
    assert!(dev_options.contains(&"BASE_IMAGE=proj-base-image-linux/amd64:latest".to_string()));
    let target = dev_options.iter().position(|o| o == "--target").unwrap();
    assert_eq!(dev_options[target + 1], "dev");
}

#[test]
fn test_plan_uses_manifest() {
    let root = TempDir::new().unwrap();
    let project = project(&root);
    std::fs::write(
        project.join("imgstack.yaml"),
        "engine: podman\nstages:\n  - name: only\n    dir: base-image\n    tag: app:2\n",
    )
    .unwrap();

    let output = imgstack(&["plan", path_str(&project)]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("podman build -f"));
    assert!(stdout.contains("-t app:2"));
}

#[test]
fn test_build_dry_run_succeeds() {
    let root = TempDir::new().unwrap();
    let project = project(&root);
    let context = project.join("base-image");

    let output = imgstack(&[
        "build",
        path_str(&context),
        "--platform",
        "linux/amd64,linux/arm64/v8",
        "--dry-run",
    ]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("docker build "));
    assert!(stderr.contains("linux/arm64/v8"));
    assert!(stdout.contains("Finished building 2 image(s)."));
}

#[test]
fn test_build_all_dry_run_succeeds() {
    let root = TempDir::new().unwrap();
    let project = project(&root);

    let output = imgstack(&["build-all", path_str(&project), "--dry-run", "--no-cache"]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stdout.contains("Finished building 3 image(s)."));
    assert!(stderr.contains("--no-cache"));
    assert!(stderr.contains("USER_ID="));
}

#[test]
fn test_missing_dockerfile_exits_non_zero() {
    let root = TempDir::new().unwrap();
    let empty = root.path().join("proj").join("empty");
    std::fs::create_dir_all(&empty).unwrap();

    let output = imgstack(&["build", path_str(&empty), "--dry-run"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Aborted at stage 'proj-empty'"));
}

#[test]
fn test_invalid_builder_rejected() {
    let output = imgstack(&["build", ".", "--builder", "buildah"]);
    assert!(!output.status.success());
}
