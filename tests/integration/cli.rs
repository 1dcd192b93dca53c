#[path = "common/mod.rs"]
mod common;

use std::fs;

use assert_cmd::Command;
use common::API_CONFIG;
use predicates::boolean::PredicateBooleanExt;
use predicates::str::contains;
use tempfile::tempdir;

fn funnelg(dir: &std::path::Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("funnelg"));
    cmd.current_dir(dir)
        .env("USER", "funnelg-test")
        .env_remove("SUDO_USER")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn deploy_without_env_file_touches_nothing() {
    let temp = tempdir().expect("failed to create tempdir");
    let dir = temp.path();
    fs::write(dir.join("services.yml"), API_CONFIG).unwrap();

    funnelg(dir)
        .arg("deploy")
        .assert()
        .failure()
        .stderr(contains(".env file not found"));

    assert!(!dir.join("api").exists());
}

#[test]
fn deploy_without_auth_key_touches_nothing() {
    let temp = tempdir().expect("failed to create tempdir");
    let dir = temp.path();
    fs::write(dir.join("services.yml"), API_CONFIG).unwrap();
    fs::write(dir.join(".env"), "# TS_AUTHKEY=\nOTHER=1\n").unwrap();

    funnelg(dir)
        .arg("deploy")
        .assert()
        .failure()
        .stderr(contains("TS_AUTHKEY missing"));

    assert!(!dir.join("api").exists());
}

#[test]
fn deploy_with_malformed_config_fails_before_services() {
    let temp = tempdir().expect("failed to create tempdir");
    let dir = temp.path();
    fs::write(
        dir.join("services.yml"),
        "services:\n  api:\n    hostname: api-host\n    port: 99999\n",
    )
    .unwrap();
    fs::write(dir.join(".env"), "TS_AUTHKEY=abc123\n").unwrap();

    funnelg(dir)
        .arg("deploy")
        .assert()
        .failure()
        .stderr(contains("Invalid configuration").and(contains("99999")));

    assert!(!dir.join("api").exists());
}

#[test]
fn deploy_exit_status_reflects_unconverged_services() {
    let temp = tempdir().expect("failed to create tempdir");
    let dir = temp.path();
    let empty_path = dir.join("empty-bin");
    let units = dir.join("units");
    fs::create_dir_all(&empty_path).unwrap();
    fs::create_dir_all(&units).unwrap();
    fs::write(dir.join("services.yml"), API_CONFIG).unwrap();
    fs::write(dir.join(".env"), "TS_AUTHKEY=abc123\n").unwrap();

    // With an empty PATH neither chown nor go can be launched.
    funnelg(dir)
        .env("PATH", &empty_path)
        .args(["deploy", "--unit-dir"])
        .arg(&units)
        .assert()
        .code(2)
        .stdout(contains("1 service(s) checked: 0 converged, 1 failed (api)"));

    assert!(dir.join("api/state").is_dir());
    let source = fs::read_to_string(dir.join("api/main.go")).unwrap();
    assert!(source.contains("localhost:8080"));
    assert!(!units.join("api-funnel.service").exists());

    funnelg(dir)
        .env("PATH", &empty_path)
        .args(["deploy", "--allow-partial", "--unit-dir"])
        .arg(&units)
        .assert()
        .success()
        .stdout(contains("1 failed (api)"));
}

#[test]
fn render_program_prints_generated_source() {
    let temp = tempdir().expect("failed to create tempdir");
    let dir = temp.path();
    fs::write(dir.join("services.yml"), API_CONFIG).unwrap();
    fs::write(dir.join(".env"), "TS_AUTHKEY=abc123\n").unwrap();

    funnelg(dir)
        .args(["render", "program", "--service", "api"])
        .assert()
        .success()
        .stdout(
            contains("package main")
                .and(contains(r#"r.URL.Host = "localhost:8080""#))
                .and(contains("abc123").not()),
        );

    assert!(!dir.join("api").exists());
}

#[test]
fn render_unit_references_env_file_and_operator() {
    let temp = tempdir().expect("failed to create tempdir");
    let dir = temp.path().canonicalize().unwrap();
    fs::write(dir.join("services.yml"), API_CONFIG).unwrap();
    fs::write(dir.join(".env"), "TS_AUTHKEY=abc123\n").unwrap();

    funnelg(&dir)
        .args(["render", "unit", "-s", "api"])
        .assert()
        .success()
        .stdout(
            contains(format!("EnvironmentFile={}", dir.join(".env").display()))
                .and(contains(format!("WorkingDirectory={}", dir.join("api").display())))
                .and(contains("User=funnelg-test"))
                .and(contains("WantedBy=multi-user.target")),
        );
}

#[test]
fn render_unit_keeps_symlinked_env_path() {
    let temp = tempdir().expect("failed to create tempdir");
    let dir = temp.path().canonicalize().unwrap();
    fs::write(dir.join("services.yml"), API_CONFIG).unwrap();
    fs::create_dir_all(dir.join("secrets")).unwrap();
    fs::write(dir.join("secrets/real.env"), "TS_AUTHKEY=abc123\n").unwrap();
    std::os::unix::fs::symlink("secrets/real.env", dir.join(".env")).unwrap();

    funnelg(&dir)
        .args(["render", "unit", "-s", "api"])
        .assert()
        .success()
        .stdout(
            contains(format!("EnvironmentFile={}\n", dir.join(".env").display()))
                .and(contains("real.env").not()),
        );
}

#[test]
fn render_unknown_service_fails() {
    let temp = tempdir().expect("failed to create tempdir");
    let dir = temp.path();
    fs::write(dir.join("services.yml"), API_CONFIG).unwrap();
    fs::write(dir.join(".env"), "TS_AUTHKEY=abc123\n").unwrap();

    funnelg(dir)
        .args(["render", "program", "-s", "web"])
        .assert()
        .failure()
        .stderr(contains("'web' is not declared"));
}

#[test]
fn plan_reports_state_without_side_effects() {
    let temp = tempdir().expect("failed to create tempdir");
    let dir = temp.path();
    let units = dir.join("units");
    fs::create_dir_all(&units).unwrap();
    fs::write(dir.join("services.yml"), API_CONFIG).unwrap();
    fs::write(dir.join(".env"), "TS_AUTHKEY=abc123\n").unwrap();

    funnelg(dir)
        .args(["plan", "--unit-dir"])
        .arg(&units)
        .assert()
        .success()
        .stdout(contains("api").and(contains("pending")));
    assert!(!dir.join("api").exists());

    fs::create_dir_all(dir.join("api")).unwrap();
    fs::write(dir.join("api/app"), b"").unwrap();
    fs::write(units.join("api-funnel.service"), "[Unit]\n").unwrap();

    funnelg(dir)
        .args(["plan", "--unit-dir"])
        .arg(&units)
        .assert()
        .success()
        .stdout(contains("converged").and(contains("missing").not()));
}
