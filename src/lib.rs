//! funnelg provisions Tailscale Funnel reverse proxies for local HTTP backends.
//! For every service declared in a YAML file it generates and builds a small Go
//! proxy, then installs it as a systemd unit. Runs are idempotent: only the
//! steps whose results are missing on disk are performed.

/// CLI interface.
pub mod cli;

/// Configuration management.
pub mod config;

/// Fixed names and paths.
pub mod constants;

/// Environment file loading.
pub mod env;

/// Error handling.
pub mod error;

/// External command execution.
pub mod executor;

/// Program and unit generators.
pub mod generate;

/// Per-service filesystem layout.
pub mod layout;

/// Invoking operator identity.
pub mod operator;

/// Service convergence.
pub mod reconciler;

/// Host actions behind a capability trait.
pub mod system;

/// Test doubles.
#[doc(hidden)]
pub mod test_utils;
