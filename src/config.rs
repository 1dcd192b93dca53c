//! Configuration management for funnelg.
use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;
use std::{fs, path::Path, sync::OnceLock};

use crate::error::ProvisionError;

/// Raw shape of the services file before validation.
#[derive(Debug, Deserialize)]
struct RawConfig {
    services: Option<IndexMap<String, RawServiceEntry>>,
}

/// Raw service entry. The port is read wide so out-of-range values produce a
/// readable error instead of a deserializer overflow message.
#[derive(Debug, Deserialize)]
struct RawServiceEntry {
    hostname: Option<String>,
    port: Option<i64>,
}

/// Validated configuration: services in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Declared services, in the order they appear in the file.
    pub services: Vec<ServiceSpec>,
}

/// A single declared service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    /// Identifier; also the working directory name and unit name prefix.
    pub name: String,
    /// Name exposed through the tunnel.
    pub hostname: String,
    /// Local backend port.
    pub port: u16,
}

impl ServiceSpec {
    /// Builds a spec, applying the same validation as the config loader.
    pub fn new(
        name: impl Into<String>,
        hostname: impl Into<String>,
        port: u16,
    ) -> Result<Self, ProvisionError> {
        let spec = Self {
            name: name.into(),
            hostname: hostname.into(),
            port,
        };
        spec.validate()?;
        Ok(spec)
    }

    fn validate(&self) -> Result<(), ProvisionError> {
        if !name_pattern().is_match(&self.name) {
            return Err(ProvisionError::InvalidConfig(format!(
                "service name '{}' must start with a letter or digit and contain only letters, digits, '.', '_' or '-'",
                self.name
            )));
        }
        if !hostname_pattern().is_match(&self.hostname) {
            return Err(ProvisionError::InvalidConfig(format!(
                "service '{}' has invalid hostname '{}'",
                self.name, self.hostname
            )));
        }
        if self.port == 0 {
            return Err(ProvisionError::InvalidConfig(format!(
                "service '{}' has port 0; expected 1-65535",
                self.name
            )));
        }
        Ok(())
    }
}

impl Config {
    /// Looks up a declared service by name.
    pub fn service(&self, name: &str) -> Result<&ServiceSpec, ProvisionError> {
        self.services
            .iter()
            .find(|spec| spec.name == name)
            .ok_or_else(|| ProvisionError::UnknownService(name.to_string()))
    }

    /// Narrows the configuration to one service, or returns it unchanged.
    pub fn select(self, only: Option<&str>) -> Result<Self, ProvisionError> {
        match only {
            None => Ok(self),
            Some(name) => {
                let spec = self.service(name)?.clone();
                Ok(Self {
                    services: vec![spec],
                })
            }
        }
    }
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("service name pattern")
    })
}

fn hostname_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?)*$")
            .expect("hostname pattern")
    })
}

/// Parses services YAML text into a validated [`Config`].
pub fn parse_config(content: &str) -> Result<Config, ProvisionError> {
    let raw: RawConfig = serde_yaml::from_str(content)?;
    let entries = raw.services.ok_or_else(|| {
        ProvisionError::InvalidConfig("missing top-level 'services' mapping".into())
    })?;

    if entries.is_empty() {
        return Err(ProvisionError::InvalidConfig("no services declared".into()));
    }

    let mut services = Vec::with_capacity(entries.len());
    for (name, entry) in entries {
        let hostname = entry.hostname.ok_or_else(|| {
            ProvisionError::InvalidConfig(format!("service '{name}' is missing 'hostname'"))
        })?;
        let port = entry.port.ok_or_else(|| {
            ProvisionError::InvalidConfig(format!("service '{name}' is missing 'port'"))
        })?;
        let port = u16::try_from(port)
            .ok()
            .filter(|port| *port != 0)
            .ok_or_else(|| {
                ProvisionError::InvalidConfig(format!(
                    "service '{name}' has port {port}; expected 1-65535"
                ))
            })?;

        services.push(ServiceSpec::new(name, hostname, port)?);
    }

    Ok(Config { services })
}

/// Loads and validates the services file.
pub fn load_config(config_path: &Path) -> Result<Config, ProvisionError> {
    let content = fs::read_to_string(config_path).map_err(|source| {
        ProvisionError::ConfigReadError {
            path: config_path.to_path_buf(),
            source,
        }
    })?;

    parse_config(&content)
}
