//! Library side of the `nova-mapper` binary.
//!
//! The binary (`src/main.rs`) only parses arguments and prints; loading workspace files lives
//! here so it can be tested without spawning the process.

pub mod workspace;

pub use workspace::Workspace;

/// Tracing target of the CLI.
pub const CLI_TARGET: &str = "nova.mapper.cli";
