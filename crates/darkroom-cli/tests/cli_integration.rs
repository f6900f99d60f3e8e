//! CLI subprocess integration tests.
//!
//! These tests invoke the `darkroom` binary as a subprocess against a
//! scratch install directory and a local release mirror, and verify exit
//! codes, file effects, and JSON output.

use std::fs;
use std::path::Path;
use std::process::Command;

const COMPOSE: &str = include_str!("../../darkroom-core/tests/fixtures/docker-compose.yml");
const EXAMPLE_ENV: &str = include_str!("../../darkroom-core/tests/fixtures/example.env");
const TRANSCODING: &str =
    include_str!("../../darkroom-core/tests/fixtures/hwaccel.transcoding.yml");
const ML: &str = include_str!("../../darkroom-core/tests/fixtures/hwaccel.ml.yml");

struct Workspace {
    root: tempfile::TempDir,
}

impl Workspace {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let release = root.path().join("release");
        fs::create_dir_all(&release).unwrap();
        fs::write(release.join("docker-compose.yml"), COMPOSE).unwrap();
        fs::write(release.join("example.env"), EXAMPLE_ENV).unwrap();
        fs::write(release.join("hwaccel.transcoding.yml"), TRANSCODING).unwrap();
        fs::write(release.join("hwaccel.ml.yml"), ML).unwrap();
        Self { root }
    }

    fn install_dir(&self) -> std::path::PathBuf {
        self.root.path().join("immich-app")
    }

    fn with_compose(self) -> Self {
        fs::create_dir_all(self.install_dir()).unwrap();
        fs::write(self.install_dir().join("docker-compose.yml"), COMPOSE).unwrap();
        self
    }

    fn compose(&self) -> String {
        fs::read_to_string(self.install_dir().join("docker-compose.yml")).unwrap()
    }

    fn darkroom(&self) -> Command {
        self.darkroom_with_source(&self.root.path().join("release"))
    }

    fn darkroom_with_source(&self, source: &Path) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_darkroom"));
        // Skip runtime prerequisite checks: tests never start containers.
        cmd.env("DARKROOM_SKIP_PREREQS", "1")
            .env_remove("DARKROOM_SOURCE")
            .env_remove("DARKROOM_LOG")
            .arg("--config")
            .arg(self.root.path().join("config.toml"))
            .arg("--dir")
            .arg(self.install_dir())
            .arg("--source")
            .arg(source)
            .arg("--no-wsl");
        cmd
    }
}

#[test]
fn cli_version_exits_zero() {
    let output = Command::new(env!("CARGO_BIN_EXE_darkroom"))
        .arg("--version")
        .output()
        .unwrap();
    assert!(output.status.success(), "darkroom --version must exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("darkroom"), "{stdout}");
}

#[test]
fn cli_help_lists_commands() {
    let output = Command::new(env!("CARGO_BIN_EXE_darkroom"))
        .arg("--help")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["install", "accel", "disable", "detect", "up"] {
        assert!(stdout.contains(command), "help must list '{command}'");
    }
}

#[test]
fn cli_detect_json_lists_both_categories() {
    let ws = Workspace::new();
    let output = ws.darkroom().args(["detect", "--json"]).output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let categories = json["categories"].as_array().unwrap();
    assert_eq!(categories.len(), 2);
    assert_eq!(categories[0]["category"], "transcoding");
    assert_eq!(categories[1]["category"], "inference");
    assert_eq!(json["evidence"]["wsl"], false);
}

#[test]
fn cli_install_writes_env_without_acceleration() {
    let ws = Workspace::new();
    let output = ws
        .darkroom()
        .args([
            "install",
            "--yes",
            "--no-accel",
            "--upload-location",
            "/srv/photos",
            "--timezone",
            "Etc/UTC",
            "--json",
        ])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(ws.compose(), COMPOSE);
    let env = fs::read_to_string(ws.install_dir().join(".env")).unwrap();
    assert!(env.contains("UPLOAD_LOCATION=/srv/photos"));
    assert!(env.contains("TZ=Etc/UTC"));
    assert!(!env.contains("DB_PASSWORD=postgres"));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["install"]["generated_password"], true);
}

#[test]
fn cli_install_refuses_existing_compose_without_terminal() {
    let ws = Workspace::new();
    fs::create_dir_all(ws.install_dir()).unwrap();
    fs::write(ws.install_dir().join("docker-compose.yml"), "services:\n").unwrap();
    let output = ws
        .darkroom()
        .args(["install", "--no-accel", "--upload-location", "/srv/photos"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(ws.compose(), "services:\n");
}

#[test]
fn cli_accel_applies_explicit_inference_profile() {
    let ws = Workspace::new().with_compose();
    let output = ws
        .darkroom()
        .args(["accel", "inference", "--inference", "openvino", "--yes"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    let compose = ws.compose();
    assert!(compose.contains("service: openvino"));
    assert!(compose.contains("release}-openvino"));
    assert!(ws.install_dir().join("hwaccel.ml.yml").exists());
}

#[test]
fn cli_accel_then_disable_restores_image() {
    let ws = Workspace::new().with_compose();
    let status = ws
        .darkroom()
        .args(["accel", "inference", "--inference", "cuda", "--yes"])
        .status()
        .unwrap();
    assert!(status.success());

    let output = ws
        .darkroom()
        .args(["disable", "inference", "--yes", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["outcome"]["result"], "disabled");
    let compose = ws.compose();
    assert!(compose.contains("immich-machine-learning:${IMMICH_VERSION:-release}\n"));
    assert!(!compose.contains("service: cuda"));
    assert!(!ws.install_dir().join("hwaccel.ml.yml").exists());
}

#[test]
fn cli_disable_with_nothing_leaves_compose_untouched() {
    let ws = Workspace::new().with_compose();
    let output = ws
        .darkroom()
        .args(["disable", "transcoding", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["outcome"]["result"], "nothing_to_disable");
    assert_eq!(ws.compose(), COMPOSE);
}

#[test]
fn cli_missing_fragment_fails_category_and_keeps_compose() {
    let ws = Workspace::new().with_compose();
    let empty = ws.root.path().join("empty-release");
    fs::create_dir_all(&empty).unwrap();
    let output = ws
        .darkroom_with_source(&empty)
        .args(["accel", "transcoding", "--transcoding", "vaapi", "--yes", "--json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["failures"].as_array().unwrap().len(), 1);
    assert_eq!(ws.compose(), COMPOSE);
}

#[test]
fn cli_accel_without_install_is_document_error() {
    let ws = Workspace::new();
    let output = ws.darkroom().args(["accel", "--yes"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn cli_unparseable_compose_is_document_error() {
    let ws = Workspace::new();
    fs::create_dir_all(ws.install_dir()).unwrap();
    fs::write(
        ws.install_dir().join("docker-compose.yml"),
        "name: immich\n",
    )
    .unwrap();
    let output = ws
        .darkroom()
        .args(["accel", "inference", "--inference", "cuda", "--yes"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn cli_rejects_profile_from_other_category() {
    let ws = Workspace::new().with_compose();
    let output = ws
        .darkroom()
        .args(["accel", "transcoding", "--transcoding", "rknn", "--yes"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(ws.compose(), COMPOSE);
}

#[test]
fn cli_bad_config_exits_one() {
    let ws = Workspace::new();
    fs::write(ws.root.path().join("config.toml"), "[install]\nfolder = 1\n").unwrap();
    let output = ws.darkroom().arg("detect").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("config error"), "{stderr}");
}

#[test]
fn cli_completions_bash() {
    let output = Command::new(env!("CARGO_BIN_EXE_darkroom"))
        .args(["completions", "bash"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("darkroom"));
}

#[test]
fn cli_man_pages_per_subcommand() {
    let dir = tempfile::tempdir().unwrap();
    let status = Command::new(env!("CARGO_BIN_EXE_darkroom"))
        .arg("man-pages")
        .arg(dir.path())
        .status()
        .unwrap();
    assert!(status.success());
    assert!(dir.path().join("darkroom.1").exists());
    assert!(dir.path().join("darkroom-accel.1").exists());
}

#[test]
fn cli_man_pages_with_global_dir() {
    let ws = Workspace::new();
    let out = ws.root.path().join("man");
    let status = ws.darkroom().arg("man-pages").arg(&out).status().unwrap();
    assert!(status.success());
    assert!(out.join("darkroom-install.1").exists());
    assert!(!ws.install_dir().exists());
}

#[test]
fn cli_install_fetch_failure_points_at_manual_download() {
    let ws = Workspace::new();
    let empty = ws.root.path().join("empty-release");
    fs::create_dir_all(&empty).unwrap();
    let output = ws
        .darkroom_with_source(&empty)
        .args(["install", "--yes", "--no-accel", "--upload-location", "/srv/photos"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("manually into"), "{stderr}");
    assert!(!ws.install_dir().join("docker-compose.yml").exists());
}
