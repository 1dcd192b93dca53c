//! Idempotent convergence of declared services.
//!
//! Each service is driven toward the same end state: a `state/` directory, a
//! built proxy executable and an installed, enabled, running unit. Existence
//! probes decide which steps run, so a second pass over a converged tree does
//! nothing beyond directory creation and the ownership fix.
use std::{fmt, fs, path::Path};

use strum::IntoEnumIterator;
use tracing::{error, info, warn};

use crate::{
    config::ServiceSpec,
    constants::STATE_DIR_RELATIVE,
    env::EnvironmentContext,
    error::ServiceError,
    generate::{UnitTemplate, render_program},
    layout::{Layout, ServicePaths},
    operator::Operator,
    system::{BuildStep, InstallStep, SystemOperations},
};

/// What already exists for a service. Probed fresh every time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergenceState {
    /// The built executable is present.
    pub binary_exists: bool,
    /// The unit file is present in the unit directory.
    pub unit_exists: bool,
}

impl ConvergenceState {
    /// Probes the filesystem for `paths`.
    pub fn probe(paths: &ServicePaths) -> Self {
        Self {
            binary_exists: paths.binary.exists(),
            unit_exists: paths.unit_file.exists(),
        }
    }

    /// Nothing is left to do.
    pub fn is_converged(&self) -> bool {
        self.binary_exists && self.unit_exists
    }
}

/// Outcome of reconciling one service.
#[derive(Debug)]
pub struct ServiceReport {
    /// Service name.
    pub name: String,
    /// State observed before any build or install work. `None` when the
    /// service failed before it could be probed.
    pub initial: Option<ConvergenceState>,
    /// The recursive ownership fix succeeded.
    pub ownership_fixed: bool,
    /// The build pipeline ran to completion during this pass.
    pub built: bool,
    /// The unit was installed and activated during this pass.
    pub installed: bool,
    /// Error that stopped this service, if any.
    pub error: Option<ServiceError>,
}

impl ServiceReport {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            initial: None,
            ownership_fixed: false,
            built: false,
            installed: false,
            error: None,
        }
    }

    /// The service reached (or already was in) converged state.
    pub fn converged(&self) -> bool {
        self.error.is_none()
    }
}

/// Reports for every service of a run, in declaration order.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Per-service reports.
    pub reports: Vec<ServiceReport>,
}

impl RunSummary {
    /// Names of services that did not converge.
    pub fn failed(&self) -> Vec<&str> {
        self.reports
            .iter()
            .filter(|report| !report.converged())
            .map(|report| report.name.as_str())
            .collect()
    }

    /// Every service converged.
    pub fn all_converged(&self) -> bool {
        self.reports.iter().all(ServiceReport::converged)
    }

    /// Number of build pipelines that completed.
    pub fn builds(&self) -> usize {
        self.reports.iter().filter(|report| report.built).count()
    }

    /// Number of units installed.
    pub fn installs(&self) -> usize {
        self.reports.iter().filter(|report| report.installed).count()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failed = self.failed();
        write!(
            f,
            "{} service(s) checked: {} converged, {} failed",
            self.reports.len(),
            self.reports.len() - failed.len(),
            failed.len()
        )?;
        if !failed.is_empty() {
            write!(f, " ({})", failed.join(", "))?;
        }
        Ok(())
    }
}

/// Drives declared services toward converged state through `S`.
pub struct Reconciler<S> {
    ops: S,
    layout: Layout,
    env: EnvironmentContext,
    operator: Operator,
}

impl<S: SystemOperations> Reconciler<S> {
    /// Creates a reconciler. `env` and `operator` are shared by every service.
    pub fn new(ops: S, layout: Layout, env: EnvironmentContext, operator: Operator) -> Self {
        Self {
            ops,
            layout,
            env,
            operator,
        }
    }

    /// Backend used for host actions.
    pub fn ops(&self) -> &S {
        &self.ops
    }

    /// Consumes the reconciler, returning its backend.
    pub fn into_ops(self) -> S {
        self.ops
    }

    /// Current state of `spec` without changing anything.
    pub fn probe(&self, spec: &ServiceSpec) -> ConvergenceState {
        ConvergenceState::probe(&self.layout.service(spec))
    }

    /// Unit text that would be installed for `spec`.
    pub fn render_unit(&self, spec: &ServiceSpec) -> String {
        let paths = self.layout.service(spec);
        UnitTemplate {
            service_name: &spec.name,
            hostname: &spec.hostname,
            working_dir: &paths.working_dir,
            executable: &paths.binary,
            env_file: self.env.env_file(),
            operator: &self.operator,
        }
        .render()
    }

    /// Reconciles every service in order. A failing service never prevents
    /// later services from being attempted.
    pub fn reconcile_all(&mut self, services: &[ServiceSpec]) -> RunSummary {
        let reports = services.iter().map(|spec| self.reconcile(spec)).collect();
        RunSummary { reports }
    }

    /// Reconciles a single service, catching its errors at the boundary.
    pub fn reconcile(&mut self, spec: &ServiceSpec) -> ServiceReport {
        info!("Processing service '{}'", spec.name);

        let paths = self.layout.service(spec);
        let mut report = ServiceReport::new(&spec.name);

        if let Err(err) = self.converge(spec, &paths, &mut report) {
            error!("Service '{}' did not converge: {}", spec.name, err);
            report.error = Some(err);
        }

        report
    }

    fn converge(
        &mut self,
        spec: &ServiceSpec,
        paths: &ServicePaths,
        report: &mut ServiceReport,
    ) -> Result<(), ServiceError> {
        fs::create_dir_all(&paths.state_dir).map_err(|source| ServiceError::PrepareFailed {
            path: paths.state_dir.clone(),
            source,
        })?;

        report.ownership_fixed = self.fix_ownership(&paths.working_dir);
        let initial = ConvergenceState::probe(paths);
        report.initial = Some(initial);

        if initial.binary_exists {
            info!("Binary for '{}' already exists, skipping build", spec.name);
        } else {
            self.build(spec, paths)?;
            report.built = true;
        }

        if initial.unit_exists {
            info!(
                "Unit {} already exists, skipping installation",
                paths.unit_name
            );
        } else {
            self.install_unit(spec, paths)?;
            report.installed = true;
        }

        Ok(())
    }

    fn fix_ownership(&mut self, working_dir: &Path) -> bool {
        match self.ops.chown_recursive(working_dir, &self.operator) {
            Ok(()) => true,
            Err(source) => {
                let err = ServiceError::PermissionFixFailed {
                    path: working_dir.to_path_buf(),
                    source,
                };
                warn!("{err}");
                false
            }
        }
    }

    fn write_artifact(&self, path: &Path, text: &str) -> Result<(), ServiceError> {
        if self.env.contains_key(text) {
            return Err(ServiceError::SecretInArtifact {
                path: path.to_path_buf(),
            });
        }
        fs::write(path, text).map_err(|source| ServiceError::ArtifactWriteFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    fn build(&mut self, spec: &ServiceSpec, paths: &ServicePaths) -> Result<(), ServiceError> {
        info!("Writing program source for '{}'", spec.name);
        let source = render_program(spec, STATE_DIR_RELATIVE);
        self.write_artifact(&paths.program_source, &source)?;

        info!("Building binary for '{}'", spec.name);
        for step in BuildStep::iter() {
            if step == BuildStep::ModInit && paths.module_manifest.exists() {
                info!(
                    "Module manifest for '{}' already exists, skipping `{}`",
                    spec.name, step
                );
                continue;
            }

            self.ops
                .build_step(step, &spec.name, &paths.working_dir)
                .map_err(|source| ServiceError::BuildFailed { step, source })?;
        }

        info!("Build for '{}' successful", spec.name);
        Ok(())
    }

    fn install_unit(
        &mut self,
        spec: &ServiceSpec,
        paths: &ServicePaths,
    ) -> Result<(), ServiceError> {
        info!("Creating and installing unit {}", paths.unit_name);
        let unit = self.render_unit(spec);
        self.write_artifact(&paths.staged_unit, &unit)?;

        for step in InstallStep::iter() {
            let result = match step {
                InstallStep::MoveUnit => self.ops.move_file(&paths.staged_unit, &paths.unit_file),
                InstallStep::Reload => self.ops.reload_units(),
                InstallStep::Enable => self.ops.enable_unit(&paths.unit_name),
                InstallStep::Start => self.ops.start_unit(&paths.unit_name),
            };
            result.map_err(|source| ServiceError::UnitInstallFailed { step, source })?;
        }

        info!("Unit {} installed and started", paths.unit_name);
        Ok(())
    }
}
