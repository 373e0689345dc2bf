//! Device Factory error types

use contracts::RigError;
use thiserror::Error;

/// Device Factory specific error
#[derive(Debug, Error)]
pub enum DeviceFactoryError {
    /// Device boot error
    #[error("failed to boot device: {message}")]
    BootFailed { message: String },

    /// Topology rejected by the runtime
    #[error("device rejected topology at node '{node}': {message}")]
    TopologyRejected { node: String, message: String },

    /// Output queue open error
    #[error("failed to open queue '{stream}': {message}")]
    QueueOpenFailed { stream: String, message: String },

    /// Recording session load error
    #[error("failed to load recording from '{path}': {message}")]
    RecordingLoad { path: String, message: String },

    /// Wrapped RigError
    #[error(transparent)]
    Rig(#[from] RigError),
}

impl DeviceFactoryError {
    /// Create boot error
    pub fn boot_failed(message: impl Into<String>) -> Self {
        Self::BootFailed {
            message: message.into(),
        }
    }

    /// Create queue open error
    pub fn queue_open(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::QueueOpenFailed {
            stream: stream.into(),
            message: message.into(),
        }
    }

    /// Create recording load error
    pub fn recording_load(path: &std::path::Path, message: impl Into<String>) -> Self {
        Self::RecordingLoad {
            path: path.display().to_string(),
            message: message.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, DeviceFactoryError>;
