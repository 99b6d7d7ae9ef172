//! Error types for the voice interaction controller.

/// Top-level error type for the voice controller.
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    /// Speech recognition backend error.
    #[error("recognition error: {0}")]
    Recognition(String),

    /// Speech synthesis backend error.
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Message processor collaborator error.
    #[error("processor error: {0}")]
    Processor(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Conversation loop coordination error.
    #[error("pipeline error: {0}")]
    Pipeline(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, VoiceError>;
