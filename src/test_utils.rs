//! Test doubles shared by unit and integration tests.
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    constants::{BINARY_NAME, UNIT_SUFFIX},
    error::CommandError,
    operator::Operator,
    system::{BuildStep, InstallStep, SystemOperations},
};

/// A host action observed by [`RecordingSystem`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// `chown -R`.
    Chown {
        /// Target directory.
        path: PathBuf,
        /// `user:group`.
        owner: String,
    },
    /// One build pipeline step.
    Build {
        /// Service being built.
        service: String,
        /// Step that ran.
        step: BuildStep,
    },
    /// Unit move into the unit directory.
    Move {
        /// Staged unit.
        from: PathBuf,
        /// Destination.
        to: PathBuf,
    },
    /// `systemctl daemon-reload`.
    Reload,
    /// `systemctl enable`.
    Enable {
        /// Unit name.
        unit: String,
    },
    /// `systemctl start`.
    Start {
        /// Unit name.
        unit: String,
    },
}

/// Fake [`SystemOperations`] that records every call.
///
/// Successful calls reproduce the filesystem effect a real host would leave
/// behind: the compile step creates the executable and the move step moves the
/// staged unit. That lets a second reconciler pass observe the first pass's
/// results. Failures can be injected per service and step.
#[derive(Debug, Default)]
pub struct RecordingSystem {
    /// Every call, in order. Failed calls are recorded too.
    pub actions: Vec<Action>,
    /// Make every ownership fix fail.
    pub fail_chown: bool,
    /// Fail this build step for this service.
    pub fail_build: Option<(String, BuildStep)>,
    /// Fail this install step for the unit of this service.
    pub fail_install: Option<(String, InstallStep)>,
    last_moved: Option<String>,
}

impl RecordingSystem {
    /// Fails `step` whenever it runs for `service`.
    pub fn with_build_failure(mut self, service: &str, step: BuildStep) -> Self {
        self.fail_build = Some((service.to_string(), step));
        self
    }

    /// Fails `step` whenever it runs for the unit of `service`.
    pub fn with_install_failure(mut self, service: &str, step: InstallStep) -> Self {
        self.fail_install = Some((service.to_string(), step));
        self
    }

    /// Number of build steps attempted.
    pub fn build_actions(&self) -> usize {
        self.actions
            .iter()
            .filter(|action| matches!(action, Action::Build { .. }))
            .count()
    }

    /// Number of unit install steps attempted.
    pub fn install_actions(&self) -> usize {
        self.actions
            .iter()
            .filter(|action| {
                matches!(
                    action,
                    Action::Move { .. }
                        | Action::Reload
                        | Action::Enable { .. }
                        | Action::Start { .. }
                )
            })
            .count()
    }

    /// Build steps attempted for `service`, in order.
    pub fn build_steps_for(&self, service: &str) -> Vec<BuildStep> {
        self.actions
            .iter()
            .filter_map(|action| match action {
                Action::Build { service: s, step } if s == service => Some(*step),
                _ => None,
            })
            .collect()
    }

    fn injected(&self, service: &str, step: InstallStep) -> Result<(), CommandError> {
        match &self.fail_install {
            Some((name, failing)) if name == service && *failing == step => {
                Err(injected_failure(&step.to_string()))
            }
            _ => Ok(()),
        }
    }
}

fn injected_failure(command: &str) -> CommandError {
    CommandError::CommandFailed {
        command: command.to_string(),
        code: Some(1),
        stderr: "injected failure".to_string(),
    }
}

fn service_of_unit(unit: &str) -> &str {
    unit.strip_suffix(UNIT_SUFFIX).unwrap_or(unit)
}

impl SystemOperations for RecordingSystem {
    fn chown_recursive(&mut self, path: &Path, owner: &Operator) -> Result<(), CommandError> {
        self.actions.push(Action::Chown {
            path: path.to_path_buf(),
            owner: owner.chown_spec(),
        });
        if self.fail_chown {
            return Err(CommandError::CommandFailed {
                command: "chown -R".into(),
                code: Some(1),
                stderr: "Operation not permitted".into(),
            });
        }
        Ok(())
    }

    fn build_step(
        &mut self,
        step: BuildStep,
        service: &str,
        cwd: &Path,
    ) -> Result<(), CommandError> {
        self.actions.push(Action::Build {
            service: service.to_string(),
            step,
        });
        if let Some((name, failing)) = &self.fail_build
            && name == service
            && *failing == step
        {
            return Err(injected_failure(&step.to_string()));
        }
        if step == BuildStep::Compile {
            fs::write(cwd.join(BINARY_NAME), b"#!/bin/true\n")
                .map_err(|source| CommandError::LaunchFailed {
                    program: "go".into(),
                    source,
                })?;
        }
        Ok(())
    }

    fn move_file(&mut self, from: &Path, to: &Path) -> Result<(), CommandError> {
        self.actions.push(Action::Move {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
        });
        let unit = to
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let service = service_of_unit(&unit).to_string();
        self.last_moved = Some(service.clone());
        self.injected(&service, InstallStep::MoveUnit)?;
        fs::rename(from, to).map_err(|source| CommandError::LaunchFailed {
            program: "mv".into(),
            source,
        })
    }

    fn reload_units(&mut self) -> Result<(), CommandError> {
        self.actions.push(Action::Reload);
        // Reload carries no unit name; attribute it to the unit moved last.
        let service = self.last_moved.clone().unwrap_or_default();
        self.injected(&service, InstallStep::Reload)
    }

    fn enable_unit(&mut self, unit: &str) -> Result<(), CommandError> {
        self.actions.push(Action::Enable {
            unit: unit.to_string(),
        });
        self.injected(service_of_unit(unit), InstallStep::Enable)
    }

    fn start_unit(&mut self, unit: &str) -> Result<(), CommandError> {
        self.actions.push(Action::Start {
            unit: unit.to_string(),
        });
        self.injected(service_of_unit(unit), InstallStep::Start)
    }
}
