#![allow(dead_code)]

use std::{fs, path::Path};

use funnelg::{
    config::{Config, parse_config},
    env::EnvironmentContext,
    layout::Layout,
    operator::Operator,
    reconciler::Reconciler,
    test_utils::RecordingSystem,
};

pub const API_CONFIG: &str = r#"
services:
  api:
    hostname: "api-host"
    port: 8080
"#;

pub const THREE_SERVICES: &str = r#"
services:
  a:
    hostname: "a-host"
    port: 3001
  b:
    hostname: "b-host"
    port: 3002
  c:
    hostname: "c-host"
    port: 3003
"#;

/// Writes `.env` with the test key and returns the loaded context.
pub fn write_env(root: &Path) -> EnvironmentContext {
    let path = root.join(".env");
    fs::write(&path, "# funnel credentials\nTS_AUTHKEY=abc123\n").expect("write .env");
    EnvironmentContext::load(&path).expect("load .env")
}

pub fn unit_dir(root: &Path) -> std::path::PathBuf {
    let dir = root.join("systemd");
    fs::create_dir_all(&dir).expect("create unit dir");
    dir
}

pub fn config(yaml: &str) -> Config {
    parse_config(yaml).expect("valid config")
}

pub fn reconciler(root: &Path, ops: RecordingSystem) -> Reconciler<RecordingSystem> {
    Reconciler::new(
        ops,
        Layout::new(root.to_path_buf(), unit_dir(root)),
        write_env(root),
        Operator::new("alice", "alice"),
    )
}
