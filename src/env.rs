//! Environment file loading.
use std::{
    collections::HashMap,
    fmt, fs,
    path::{Path, PathBuf},
};

use tracing::warn;

use crate::{constants::AUTH_KEY_VAR, error::ProvisionError};

/// Credentials and the env file they came from. Loaded once per run and
/// shared read-only by every service.
#[derive(Clone, PartialEq, Eq)]
pub struct EnvironmentContext {
    auth_key: String,
    env_file: PathBuf,
}

impl EnvironmentContext {
    /// Builds a context directly. `env_file` should be absolute since it is
    /// written verbatim into generated units.
    pub fn new(
        auth_key: impl Into<String>,
        env_file: impl Into<PathBuf>,
    ) -> Result<Self, ProvisionError> {
        let auth_key = auth_key.into();
        let env_file = env_file.into();
        if auth_key.is_empty() {
            return Err(ProvisionError::MissingCredential {
                key: AUTH_KEY_VAR,
                path: env_file,
            });
        }
        Ok(Self { auth_key, env_file })
    }

    /// Reads `path`, requiring a non-empty authentication key.
    pub fn load(path: &Path) -> Result<Self, ProvisionError> {
        if !path.exists() {
            return Err(ProvisionError::EnvFileMissing(path.to_path_buf()));
        }

        let content =
            fs::read_to_string(path).map_err(|source| ProvisionError::EnvFileReadError {
                path: path.to_path_buf(),
                source,
            })?;

        let vars = parse_env(&content, path);
        let auth_key = vars.get(AUTH_KEY_VAR).cloned().unwrap_or_default();
        Self::new(auth_key, path)
    }

    /// `text` contains the authentication key verbatim.
    pub fn contains_key(&self, text: &str) -> bool {
        text.contains(&self.auth_key)
    }

    /// Absolute path of the env file.
    pub fn env_file(&self) -> &Path {
        &self.env_file
    }
}

impl fmt::Debug for EnvironmentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentContext")
            .field("auth_key", &"<redacted>")
            .field("env_file", &self.env_file)
            .finish()
    }
}

/// Parses `KEY=value` lines. Blank lines and `#` comments are skipped, a pair
/// of surrounding double quotes is stripped, and a later definition of a key
/// overrides an earlier one, matching how systemd reads `EnvironmentFile=`.
pub fn parse_env(content: &str, origin: &Path) -> HashMap<String, String> {
    let mut resolved = HashMap::new();

    for raw_line in content.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim().to_string();
            let mut value = value.trim().to_string();

            if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
                value = value[1..value.len() - 1].to_string();
            }

            resolved.insert(key, value);
        } else {
            warn!(
                "Ignoring malformed line in env file {}: {}",
                origin.display(),
                line
            );
        }
    }

    resolved
}
