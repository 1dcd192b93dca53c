//! Constants and fixed names used throughout funnelg.
//!
//! Everything that ends up on disk or in a generated artifact is named here so
//! the reconciler, the generators and the tests agree on a single layout.

// ============================================================================
// Inputs
// ============================================================================

/// Default services file, resolved against the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "services.yml";

/// Default environment file, resolved against the current directory.
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Environment variable holding the Tailscale authentication key.
/// Read by the generated program at its own runtime, never embedded.
pub const AUTH_KEY_VAR: &str = "TS_AUTHKEY";

// ============================================================================
// Per-service Filesystem Layout
// ============================================================================

/// Name of the built proxy executable inside a service's working directory.
pub const BINARY_NAME: &str = "app";

/// Tunnel client state directory inside a service's working directory.
pub const STATE_DIR_NAME: &str = "state";

/// State directory as seen from the generated program's working directory.
pub const STATE_DIR_RELATIVE: &str = "./state";

/// Generated program source written before the build.
pub const PROGRAM_SOURCE_NAME: &str = "main.go";

/// Module manifest produced by the first build step.
pub const MODULE_MANIFEST_NAME: &str = "go.mod";

// ============================================================================
// Build Pipeline
// ============================================================================

/// Toolchain binary used for every build step.
pub const GO_BINARY: &str = "go";

/// Module path prefix; the service name is appended.
pub const MODULE_PATH_PREFIX: &str = "tsnet/";

/// Dependency fetched before compiling.
pub const TSNET_MODULE: &str = "tailscale.com/tsnet";

// ============================================================================
// systemd
// ============================================================================

/// Directory systemd loads administrator units from.
pub const SYSTEMD_UNIT_DIR: &str = "/etc/systemd/system";

/// Suffix appended to the service name to form the unit name.
pub const UNIT_SUFFIX: &str = "-funnel.service";

/// Service manager control binary.
pub const SYSTEMCTL_BINARY: &str = "systemctl";

// ============================================================================
// Process Exit
// ============================================================================

/// Exit status when the run completed but at least one service did not converge.
pub const PARTIAL_FAILURE_EXIT_CODE: u8 = 2;
