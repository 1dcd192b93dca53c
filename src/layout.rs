//! Where each service's files live on the host.
use std::path::PathBuf;

use crate::{
    config::ServiceSpec,
    constants::{
        BINARY_NAME, MODULE_MANIFEST_NAME, PROGRAM_SOURCE_NAME, STATE_DIR_NAME, UNIT_SUFFIX,
    },
};

/// Roots that every per-service path is derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
    unit_dir: PathBuf,
}

impl Layout {
    /// `root` holds the per-service working directories; `unit_dir` receives
    /// installed units. Both should be absolute.
    pub fn new(root: impl Into<PathBuf>, unit_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            unit_dir: unit_dir.into(),
        }
    }

    /// Paths for one service.
    pub fn service(&self, spec: &ServiceSpec) -> ServicePaths {
        let working_dir = self.root.join(&spec.name);
        let unit_name = unit_name(&spec.name);

        ServicePaths {
            state_dir: working_dir.join(STATE_DIR_NAME),
            binary: working_dir.join(BINARY_NAME),
            program_source: working_dir.join(PROGRAM_SOURCE_NAME),
            module_manifest: working_dir.join(MODULE_MANIFEST_NAME),
            staged_unit: working_dir.join(&unit_name),
            unit_file: self.unit_dir.join(&unit_name),
            unit_name,
            working_dir,
        }
    }
}

/// Every path the reconciler reads or writes for a single service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePaths {
    /// `<root>/<name>`.
    pub working_dir: PathBuf,
    /// `<root>/<name>/state`.
    pub state_dir: PathBuf,
    /// `<root>/<name>/app`.
    pub binary: PathBuf,
    /// `<root>/<name>/main.go`.
    pub program_source: PathBuf,
    /// `<root>/<name>/go.mod`.
    pub module_manifest: PathBuf,
    /// Unit text staged inside the working directory before the move.
    pub staged_unit: PathBuf,
    /// Installed unit inside the unit directory.
    pub unit_file: PathBuf,
    /// `<name>-funnel.service`.
    pub unit_name: String,
}

/// Unit name for a service.
pub fn unit_name(service: &str) -> String {
    format!("{service}{UNIT_SUFFIX}")
}
