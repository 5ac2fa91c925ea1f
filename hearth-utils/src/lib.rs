//! hearth-utils: Common utilities shared across hearth crates
//!
//! This crate provides:
//! - Unified error types ([`HearthError`], [`Result`])
//! - Logging infrastructure ([`init_logging_with_config`], [`LogConfig`])
//! - XDG-compliant path utilities ([`paths`] module)

pub mod error;
pub mod logging;
pub mod paths;

// Re-export main types at crate root for convenience
pub use error::{HearthError, Result};
pub use logging::{init_logging_with_config, LogConfig, LogOutput};

pub use paths::{config_dir, log_dir, server_config_file, state_dir};
