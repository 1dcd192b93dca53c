//! Privileged host actions behind a narrow capability trait.
//!
//! The reconciler never spawns processes itself. Everything that touches
//! ownership, the Go toolchain or systemd goes through [`SystemOperations`],
//! so the convergence logic can run against [`HostSystem`] in production and
//! against a recording fake in tests.
use std::{ffi::OsStr, path::Path};

use strum_macros::{Display, EnumIter};

use crate::{
    constants::{GO_BINARY, MODULE_PATH_PREFIX, SYSTEMCTL_BINARY, TSNET_MODULE},
    error::CommandError,
    executor,
    operator::Operator,
};

/// Steps of the build pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum BuildStep {
    /// Create the module manifest.
    #[strum(serialize = "go mod init")]
    ModInit,
    /// Resolve imports into the manifest.
    #[strum(serialize = "go mod tidy")]
    ModTidy,
    /// Fetch the tunnel library.
    #[strum(serialize = "go get")]
    FetchDeps,
    /// Compile the executable.
    #[strum(serialize = "go build")]
    Compile,
}

impl BuildStep {
    /// Full argument vector for this step when building `service`.
    pub fn argv(&self, service: &str, binary_name: &str) -> Vec<String> {
        let args: Vec<String> = match self {
            Self::ModInit => vec![
                "mod".into(),
                "init".into(),
                format!("{MODULE_PATH_PREFIX}{service}"),
            ],
            Self::ModTidy => vec!["mod".into(), "tidy".into()],
            Self::FetchDeps => vec!["get".into(), TSNET_MODULE.into()],
            Self::Compile => vec!["build".into(), "-o".into(), binary_name.into()],
        };

        std::iter::once(GO_BINARY.to_string()).chain(args).collect()
    }
}

/// Steps of the unit installation sequence, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum InstallStep {
    /// Move the staged unit into the unit directory.
    #[strum(serialize = "move unit")]
    MoveUnit,
    /// Reload the service manager's unit cache.
    #[strum(serialize = "systemctl daemon-reload")]
    Reload,
    /// Enable start on boot.
    #[strum(serialize = "systemctl enable")]
    Enable,
    /// Start now.
    #[strum(serialize = "systemctl start")]
    Start,
}

/// Host actions the reconciler depends on.
pub trait SystemOperations {
    /// Recursively hands `path` to the operator.
    fn chown_recursive(&mut self, path: &Path, owner: &Operator) -> Result<(), CommandError>;

    /// Runs one build step for `service` inside `cwd`.
    fn build_step(
        &mut self,
        step: BuildStep,
        service: &str,
        cwd: &Path,
    ) -> Result<(), CommandError>;

    /// Moves a file, crossing filesystems if needed.
    fn move_file(&mut self, from: &Path, to: &Path) -> Result<(), CommandError>;

    /// Reloads the service manager's unit cache.
    fn reload_units(&mut self) -> Result<(), CommandError>;

    /// Enables `unit` for start on boot.
    fn enable_unit(&mut self, unit: &str) -> Result<(), CommandError>;

    /// Starts `unit` now.
    fn start_unit(&mut self, unit: &str) -> Result<(), CommandError>;
}

/// Production implementation: shells out to `chown`, `go`, `mv` and `systemctl`.
#[derive(Debug, Clone)]
pub struct HostSystem {
    binary_name: String,
}

impl HostSystem {
    /// Creates a host backend that builds executables named `binary_name`.
    pub fn new(binary_name: impl Into<String>) -> Self {
        Self {
            binary_name: binary_name.into(),
        }
    }
}

impl SystemOperations for HostSystem {
    fn chown_recursive(&mut self, path: &Path, owner: &Operator) -> Result<(), CommandError> {
        let spec = owner.chown_spec();
        executor::run(
            &[
                OsStr::new("chown"),
                OsStr::new("-R"),
                OsStr::new(&spec),
                path.as_os_str(),
            ],
            None,
        )?;
        Ok(())
    }

    fn build_step(
        &mut self,
        step: BuildStep,
        service: &str,
        cwd: &Path,
    ) -> Result<(), CommandError> {
        executor::run(&step.argv(service, &self.binary_name), Some(cwd))?;
        Ok(())
    }

    fn move_file(&mut self, from: &Path, to: &Path) -> Result<(), CommandError> {
        executor::run(&[OsStr::new("mv"), from.as_os_str(), to.as_os_str()], None)?;
        Ok(())
    }

    fn reload_units(&mut self) -> Result<(), CommandError> {
        executor::run(&[SYSTEMCTL_BINARY, "daemon-reload"], None)?;
        Ok(())
    }

    fn enable_unit(&mut self, unit: &str) -> Result<(), CommandError> {
        executor::run(&[SYSTEMCTL_BINARY, "enable", unit], None)?;
        Ok(())
    }

    fn start_unit(&mut self, unit: &str) -> Result<(), CommandError> {
        executor::run(&[SYSTEMCTL_BINARY, "start", unit], None)?;
        Ok(())
    }
}
