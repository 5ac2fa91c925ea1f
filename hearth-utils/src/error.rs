//! Error types for hearth
//!
//! Provides a unified error type used across all hearth crates.

use std::path::PathBuf;

/// Main error type for hearth operations
#[derive(Debug, thiserror::Error)]
pub enum HearthError {
    // === IO Errors ===

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // === Server Lifecycle Errors ===

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("Invalid host key {path}: {message}")]
    HostKey { path: PathBuf, message: String },

    #[error("Server closed")]
    ServerClosed,

    // === Connection Errors ===

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    #[error("Handshake timed out after {seconds}s")]
    HandshakeTimeout { seconds: u64 },

    #[error("Terminal capability error: {0}")]
    Capability(String),

    // === Protocol Errors ===

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Protocol version mismatch: client={client}, server={server}")]
    ProtocolMismatch { client: u32, server: u32 },

    // === Configuration Errors ===

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    // === Internal Errors ===

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HearthError {
    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a capability error
    pub fn capability(msg: impl Into<String>) -> Self {
        Self::Capability(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a host key error
    pub fn host_key(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::HostKey {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Errors that only affect a single connection attempt
    pub fn is_per_connection(&self) -> bool {
        matches!(
            self,
            Self::Connection(_)
                | Self::ConnectionClosed
                | Self::HandshakeTimeout { .. }
                | Self::Capability(_)
                | Self::Protocol(_)
                | Self::ProtocolMismatch { .. }
        )
    }
}

/// Result type alias using HearthError
pub type Result<T> = std::result::Result<T, HearthError>;
