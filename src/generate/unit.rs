use std::path::Path;

use crate::{constants::UNIT_SUFFIX, operator::Operator};

/// Inputs for a single `<name>-funnel.service` unit.
#[derive(Debug, Clone, Copy)]
pub struct UnitTemplate<'a> {
    /// Declared service name.
    pub service_name: &'a str,
    /// Tunnel hostname, shown in the description.
    pub hostname: &'a str,
    /// Directory the proxy runs in.
    pub working_dir: &'a Path,
    /// Built proxy executable.
    pub executable: &'a Path,
    /// Env file holding the auth key; referenced, never inlined.
    pub env_file: &'a Path,
    /// Account the proxy runs as.
    pub operator: &'a Operator,
}

impl UnitTemplate<'_> {
    /// Renders a unit systemd can load as-is.
    pub fn render(&self) -> String {
        format!(
            "# {service}{suffix} generated by funnelg
[Unit]
Description=Tailscale Funnel Proxy for {hostname}
After=network.target

[Service]
EnvironmentFile={env_file}
WorkingDirectory={working_dir}
ExecStart={executable}
Restart=always
User={user}
Group={group}

[Install]
WantedBy=multi-user.target
",
            service = self.service_name,
            suffix = UNIT_SUFFIX,
            hostname = self.hostname,
            env_file = self.env_file.display(),
            working_dir = self.working_dir.display(),
            executable = self.executable.display(),
            user = self.operator.user(),
            group = self.operator.group(),
        )
    }
}
