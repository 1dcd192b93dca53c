//! Error handling for funnelg.
use std::path::PathBuf;

use thiserror::Error;

use crate::system::{BuildStep, InstallStep};

/// Fatal errors that abort a run before any service is touched.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Error reading or accessing the services file.
    #[error("Failed to read config file {path}: {source}")]
    ConfigReadError {
        /// Path that could not be read.
        path: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },

    /// Error parsing YAML configuration.
    #[error("Invalid YAML format: {0}")]
    ConfigParseError(#[from] serde_yaml::Error),

    /// The configuration parsed but declares something unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A service was requested on the command line but is not declared.
    #[error("Service '{0}' is not declared in the configuration")]
    UnknownService(String),

    /// The environment file does not exist.
    #[error(".env file not found at {0}")]
    EnvFileMissing(PathBuf),

    /// The environment file exists but could not be read.
    #[error("Failed to read env file {path}: {source}")]
    EnvFileReadError {
        /// Path of the env file.
        path: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },

    /// The required authentication key is absent or empty.
    #[error("{key} missing in {path}")]
    MissingCredential {
        /// Name of the required key.
        key: &'static str,
        /// Env file that was searched.
        path: PathBuf,
    },

    /// The invoking operator could not be determined.
    #[error("Unable to determine invoking user: {0}")]
    OperatorUnresolved(String),
}

/// Failures surfaced by the command executor.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The child process could not be started at all.
    #[error("Failed to launch `{program}`: {source}")]
    LaunchFailed {
        /// Program that failed to launch.
        program: String,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },

    /// The child ran but exited unsuccessfully.
    #[error("Command `{command}` failed ({}): {stderr}", describe_exit(.code))]
    CommandFailed {
        /// Full command line, space separated.
        command: String,
        /// Exit code, or `None` when terminated by a signal.
        code: Option<i32>,
        /// Captured standard error, trimmed.
        stderr: String,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Errors scoped to a single service. None of these cross a service boundary.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The working or state directory could not be created.
    #[error("Failed to prepare {path}: {source}")]
    PrepareFailed {
        /// Directory that could not be created.
        path: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },

    /// Ownership correction failed. Recoverable.
    #[error("Permission fix failed for {path}: {source}")]
    PermissionFixFailed {
        /// Working directory whose ownership could not be changed.
        path: PathBuf,
        /// The underlying command failure.
        #[source]
        source: CommandError,
    },

    /// A generated artifact could not be written to disk.
    #[error("Failed to write {path}: {source}")]
    ArtifactWriteFailed {
        /// Destination of the artifact.
        path: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },

    /// A generated artifact contained the authentication key.
    #[error("Refusing to write {path}: generated text contains the auth key")]
    SecretInArtifact {
        /// Destination of the artifact.
        path: PathBuf,
    },

    /// A build pipeline step failed.
    #[error("Build failed at `{step}`: {source}")]
    BuildFailed {
        /// The step that failed.
        step: BuildStep,
        /// The underlying command failure.
        #[source]
        source: CommandError,
    },

    /// A unit installation step failed.
    #[error("Unit install failed at `{step}`: {source}")]
    UnitInstallFailed {
        /// The step that failed.
        step: InstallStep,
        /// The underlying command failure.
        #[source]
        source: CommandError,
    },
}
