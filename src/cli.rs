//! Command-line interface for funnelg.
use std::{path::PathBuf, str::FromStr};

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::level_filters::LevelFilter;

use crate::constants::{DEFAULT_CONFIG_FILE, DEFAULT_ENV_FILE, SYSTEMD_UNIT_DIR};

/// Wrapper around `LevelFilter` so clap can parse log levels from either
/// string names ("info", "debug", etc.) or numeric shorthands (0-5).
#[derive(Clone, Copy, Debug)]
pub struct LogLevelArg(LevelFilter);

impl LogLevelArg {
    /// String representation suitable for `RUST_LOG`.
    pub fn as_str(&self) -> &'static str {
        match self.0 {
            LevelFilter::OFF => "off",
            LevelFilter::ERROR => "error",
            LevelFilter::WARN => "warn",
            LevelFilter::INFO => "info",
            LevelFilter::DEBUG => "debug",
            LevelFilter::TRACE => "trace",
        }
    }
}

impl FromStr for LogLevelArg {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err("log level cannot be empty".into());
        }

        if let Ok(number) = trimmed.parse::<u8>() {
            let level = match number {
                0 => LevelFilter::OFF,
                1 => LevelFilter::ERROR,
                2 => LevelFilter::WARN,
                3 => LevelFilter::INFO,
                4 => LevelFilter::DEBUG,
                5 => LevelFilter::TRACE,
                _ => {
                    return Err(format!(
                        "unsupported log level number '{number}' (expected 0-5)"
                    ));
                }
            };

            return Ok(LogLevelArg(level));
        }

        let level = match trimmed.to_ascii_lowercase().as_str() {
            "off" => LevelFilter::OFF,
            "error" | "err" => LevelFilter::ERROR,
            "warn" | "warning" => LevelFilter::WARN,
            "info" => LevelFilter::INFO,
            "debug" => LevelFilter::DEBUG,
            "trace" => LevelFilter::TRACE,
            _ => return Err(format!("invalid log level '{trimmed}'")),
        };

        Ok(LogLevelArg(level))
    }
}

/// Artifact printed by `render`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ArtifactKind {
    /// Generated proxy program source.
    Program,
    /// Generated systemd unit.
    Unit,
}

/// Inputs shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Path to the services file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Path to the env file defining TS_AUTHKEY.
    #[arg(short, long = "env-file", default_value = DEFAULT_ENV_FILE)]
    pub env_file: PathBuf,

    /// Directory holding the per-service working directories.
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Directory systemd units are installed into.
    #[arg(long = "unit-dir", default_value = SYSTEMD_UNIT_DIR)]
    pub unit_dir: PathBuf,
}

/// Command-line interface for funnelg.
#[derive(Parser)]
#[command(name = "funnelg", version, author)]
#[command(
    about = "Builds and installs Tailscale Funnel reverse proxies as systemd services",
    long_about = None
)]
pub struct Cli {
    /// Override the logging verbosity for this invocation only.
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevelArg>,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for funnelg.
#[derive(Subcommand)]
pub enum Commands {
    /// Build and install every declared service that is not yet converged.
    Deploy {
        #[command(flatten)]
        target: TargetArgs,

        /// Only reconcile the named service.
        #[arg(short, long)]
        service: Option<String>,

        /// Exit successfully even when some services failed to converge.
        #[arg(long)]
        allow_partial: bool,
    },

    /// Show which services are built and installed, without changing anything.
    Plan {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Print an artifact deploy would write for a service.
    Render {
        #[command(flatten)]
        target: TargetArgs,

        /// Artifact to print.
        #[arg(value_enum)]
        kind: ArtifactKind,

        /// Service to render.
        #[arg(short, long)]
        service: String,
    },
}

/// Parses command-line arguments and returns a `Cli` struct.
pub fn parse_args() -> Cli {
    Cli::parse()
}
