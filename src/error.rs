//! Error types for the animatronic head.

/// Top-level error type for the head controller.
#[derive(Debug, thiserror::Error)]
pub enum HeadError {
    /// Remote speech/chat service could not be reached.
    ///
    /// Recoverable: the controller shows the offline pose and keeps running.
    #[error("connectivity error: {0}")]
    Connectivity(String),

    /// No microphone or speaker was found.
    #[error("no audio device: {0}")]
    NoDevice(String),

    /// Remote service answered but the request failed.
    #[error("remote service error: {0}")]
    Remote(String),

    /// Audio decoding or stream error.
    #[error("audio error: {0}")]
    Audio(String),

    /// Servo driver or LED strip error.
    #[error("actuator error: {0}")]
    Actuator(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HeadError {
    /// Whether this error means the remote service is unreachable.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }
}

impl From<hound::Error> for HeadError {
    fn from(e: hound::Error) -> Self {
        Self::Audio(e.to_string())
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, HeadError>;
