//! Path utilities for hearth
//!
//! Handles XDG Base Directory specification compliance for config
//! and state directories.

use std::path::PathBuf;

use directories::ProjectDirs;

/// Application identifier for XDG directories
const APP_NAME: &str = "hearth";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APP_NAME)
}

/// Get the configuration directory
///
/// Location: `$XDG_CONFIG_HOME/hearth` or `~/.config/hearth`
pub fn config_dir() -> PathBuf {
    project_dirs()
        .map(|p| p.config_dir().to_path_buf())
        .unwrap_or_else(|| home_dir().join(".config").join(APP_NAME))
}

/// Get the server configuration file path
///
/// Location: `$XDG_CONFIG_HOME/hearth/server.toml`
pub fn server_config_file() -> PathBuf {
    config_dir().join("server.toml")
}

/// Get the state directory
///
/// Location: `$XDG_STATE_HOME/hearth` or `~/.local/state/hearth`
pub fn state_dir() -> PathBuf {
    project_dirs()
        .and_then(|p| p.state_dir().map(|d| d.to_path_buf()))
        .unwrap_or_else(|| home_dir().join(".local").join("state").join(APP_NAME))
}

/// Get the log directory
///
/// Location: `$XDG_STATE_HOME/hearth/log`
pub fn log_dir() -> PathBuf {
    state_dir().join("log")
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| fallback_home())
}

/// Per-user scratch directory when `$HOME` is unset
fn fallback_home() -> PathBuf {
    // SAFETY: getuid() is always safe to call
    let uid = unsafe { libc::getuid() };
    PathBuf::from(format!("/tmp/{}-{}", APP_NAME, uid))
}
