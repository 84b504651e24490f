//! Error types for nfcbox-player
//!
//! Everything except [`PlayerError::StartupAuth`] and [`PlayerError::Config`]
//! is recoverable: the control loop logs it and keeps polling.

use thiserror::Error;

/// Main error type for the player
#[derive(Error, Debug)]
pub enum PlayerError {
    /// Tag reader returned no usable data
    #[error("Tag read failed: {0}")]
    HardwareRead(String),

    /// Scanned tag has no registry row
    #[error("Tag {0} not found in registry")]
    RegistryMiss(String),

    /// Registry lookup itself failed
    #[error("Registry error: {0}")]
    Registry(#[from] nfcbox_common::Error),

    /// Backend offline, timed out or failing server-side
    #[error("Playback backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Backend refused the request (no active device, bad URI, ...)
    #[error("Playback backend rejected request ({status}): {message}")]
    BackendRejected { status: u16, message: String },

    /// Backend client could not authenticate before the loop started
    #[error("Startup authentication failed: {0}")]
    StartupAuth(String),

    /// Registry row carries a media type the player cannot start
    #[error("Unknown media type '{kind}' for URI: {uri}")]
    UnknownMediaKind { uri: String, kind: String },

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Token cache and console I/O
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using the player error
pub type Result<T> = std::result::Result<T, PlayerError>;

/// Error class recorded in the playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    HardwareRead,
    RegistryMiss,
    Registry,
    BackendUnavailable,
    BackendRejected,
    StartupAuth,
    UnknownMediaKind,
    Config,
    Io,
}

impl PlayerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlayerError::HardwareRead(_) => ErrorKind::HardwareRead,
            PlayerError::RegistryMiss(_) => ErrorKind::RegistryMiss,
            PlayerError::Registry(_) => ErrorKind::Registry,
            PlayerError::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
            PlayerError::BackendRejected { .. } => ErrorKind::BackendRejected,
            PlayerError::StartupAuth(_) => ErrorKind::StartupAuth,
            PlayerError::UnknownMediaKind { .. } => ErrorKind::UnknownMediaKind,
            PlayerError::Config(_) => ErrorKind::Config,
            PlayerError::Io(_) => ErrorKind::Io,
        }
    }

    /// Fatal errors abort the process before the loop starts
    pub fn is_fatal(&self) -> bool {
        matches!(self, PlayerError::StartupAuth(_) | PlayerError::Config(_))
    }
}
