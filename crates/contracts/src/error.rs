//! Layered error definitions
//!
//! Categorized by source: config / device / queue / geometry / sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum RigError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// Topology node configuration error
    #[error("topology error at node '{node}': {message}")]
    Topology { node: String, message: String },

    // ===== Device Errors =====
    /// Device boot error
    #[error("device boot error: {message}")]
    DeviceBoot { message: String },

    /// Output queue could not be opened
    #[error("queue open error for '{stream}': {message}")]
    QueueOpen { stream: String, message: String },

    // ===== Queue I/O Errors =====
    /// Queue closed by the producer side
    #[error("queue '{stream}' closed")]
    QueueClosed { stream: String },

    /// Poll found no frame and the empty policy forbids waiting
    #[error("no frame available on '{stream}'")]
    NoData { stream: String },

    // ===== Precondition Violations =====
    /// Image geometry violates an operation's precondition
    #[error("bad geometry {width}x{height}: {message}")]
    BadGeometry {
        width: u32,
        height: u32,
        message: String,
    },

    /// Frame layout does not match the stream contract
    #[error("frame layout error for '{stream}': {message}")]
    FrameLayout { stream: String, message: String },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    /// Sink connection error
    #[error("sink '{sink_name}' connection error: {message}")]
    SinkConnection { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Coarse error classification, used by callers to pick a failure mode:
/// configuration faults are permanent, I/O faults may be retried upstream,
/// precondition faults indicate a broken frame contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Configuration,
    Io,
    Precondition,
}

impl RigError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create topology node error
    pub fn topology(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Topology {
            node: node.into(),
            message: message.into(),
        }
    }

    /// Create queue open error
    pub fn queue_open(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::QueueOpen {
            stream: stream.into(),
            message: message.into(),
        }
    }

    /// Create frame layout error
    pub fn frame_layout(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FrameLayout {
            stream: stream.into(),
            message: message.into(),
        }
    }

    /// Create bad geometry error
    pub fn bad_geometry(width: u32, height: u32, message: impl Into<String>) -> Self {
        Self::BadGeometry {
            width,
            height,
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Classify this error
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::ConfigParse { .. } | Self::ConfigValidation { .. } | Self::Topology { .. } => {
                ErrorClass::Configuration
            }
            Self::DeviceBoot { .. }
            | Self::QueueOpen { .. }
            | Self::QueueClosed { .. }
            | Self::NoData { .. }
            | Self::SinkWrite { .. }
            | Self::SinkConnection { .. }
            | Self::Io(_)
            | Self::Other(_) => ErrorClass::Io,
            Self::BadGeometry { .. } | Self::FrameLayout { .. } => ErrorClass::Precondition,
        }
    }
}
