//! Text artifacts rendered from a service definition.
//!
//! Both generators are pure: identical inputs always produce byte-identical
//! output, and neither reads the environment or the filesystem.

/// Go source for the tunnel reverse proxy.
pub mod program;

/// systemd unit definition.
pub mod unit;

pub use program::render_program;
pub use unit::UnitTemplate;
