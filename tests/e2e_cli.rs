//! CLI end-to-end tests
//!
//! Tests for the vodforge command-line interface.

#[cfg(unix)]
mod common;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the vodforge binary with no ambient overrides
#[allow(deprecated)]
fn vodforge_cmd() -> Command {
    let mut cmd = Command::cargo_bin("vodforge").unwrap();
    for key in vodforge::config::ENV_VARS {
        cmd.env_remove(key);
    }
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = vodforge_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = vodforge_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("vodforge"))
        .stdout(predicate::str::contains("supervise"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = vodforge_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("vodforge "));
}

#[test]
fn test_cli_check_tools_command() {
    let mut cmd = vodforge_cmd();
    cmd.arg("check-tools").assert().success().stdout(
        predicate::str::contains("ffmpeg").and(predicate::str::contains("ffprobe")),
    );
}

#[test]
fn test_cli_run_help() {
    let mut cmd = vodforge_cmd();
    cmd.args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--resolutions"))
        .stdout(predicate::str::contains("--no-mp4"));
}

#[test]
fn test_cli_validate_reports_warnings() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("vodforge.toml");
    fs::write(&path, "output = \"/srv/vod\"\nresolutions = [720, 999]\n").unwrap();

    let mut cmd = vodforge_cmd();
    cmd.arg("validate")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("999"));
}

#[test]
fn test_cli_validate_rejects_bad_toml() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "resolutions = [\"huge\"]\n").unwrap();

    let mut cmd = vodforge_cmd();
    cmd.arg("validate").arg(&path).assert().failure();
}

#[test]
fn test_cli_probe_missing_file() {
    let mut cmd = vodforge_cmd();
    cmd.args(["probe", "/nonexistent/video.mp4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_cli_worker_without_output_reports_error() {
    let dir = tempdir().unwrap();
    let mut cmd = vodforge_cmd();
    cmd.current_dir(dir.path())
        .args(["worker", "movie.mp4"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[\"error\""))
        .stdout(predicate::str::contains("output destination"));
}

#[cfg(unix)]
fn fake_path(h: &common::Harness) -> String {
    format!("{}:/usr/bin:/bin", h.bin.display())
}

#[cfg(unix)]
#[test]
fn test_cli_worker_speaks_the_wire_protocol() {
    use common::{Harness, FFMPEG, FFPROBE};

    let h = Harness::new(&[("ffmpeg", FFMPEG), ("ffprobe", FFPROBE)]);
    let mut cmd = vodforge_cmd();
    let assert = cmd
        .current_dir(h.dir.path())
        .env("PATH", fake_path(&h))
        .env("OUTPUT_LOCATION", &h.output)
        .args(["worker", "--no-unique", "--no-webp", "--no-transcribe"])
        .args(["--resolutions", "720"])
        .arg(&h.source)
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    for line in stdout.lines() {
        assert!(line.starts_with('['), "not a wire line: {line}");
    }
    assert!(stdout.contains("[\"step\""), "{stdout}");
    assert!(stdout.contains("\"720p.m3u8\""), "{stdout}");
    assert!(h.destination().join("main.m3u8").exists());
    assert!(h.destination().join("video.mp4").exists());
}

#[cfg(unix)]
#[test]
fn test_cli_supervise_follows_a_worker() {
    use common::{Harness, FFMPEG, FFPROBE};

    let h = Harness::new(&[("ffmpeg", FFMPEG), ("ffprobe", FFPROBE)]);
    let mut cmd = vodforge_cmd();
    cmd.current_dir(h.dir.path())
        .env("PATH", fake_path(&h))
        .args(["supervise", "--no-unique", "--no-webp", "--no-transcribe"])
        .args(["--resolutions", "720", "-o"])
        .arg(&h.output)
        .arg(&h.source)
        .assert()
        .success()
        .stdout(predicate::str::contains("movie.mp4: Complete"))
        .stdout(predicate::str::contains("1 completed, 0 failed"));

    assert!(h.destination().join("720p/720p.m3u8").exists());
}

#[cfg(unix)]
#[test]
fn test_cli_run_discovers_sources() {
    use common::{Harness, FFMPEG, FFPROBE};

    let h = Harness::new(&[("ffmpeg", FFMPEG), ("ffprobe", FFPROBE)]);
    let mut cmd = vodforge_cmd();
    cmd.current_dir(h.dir.path())
        .env("PATH", fake_path(&h))
        .env("SOURCE_LOCATION", h.dir.path())
        .env("OUTPUT_LOCATION", &h.output)
        .env("USE_UNIQUE_NAME", "false")
        .env("INCLUDE_TRANSCRIPTION", "false")
        .env("INCLUDE_WEBP", "false")
        .env("RESOLUTIONS", "480")
        .args(["run", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PROGRESS: movie.mp4: 100%"));

    assert!(h.destination().join("480p/480p.m3u8").exists());
}
