//! Error types for the mail engine.

use crate::test_send::ValidationError;
use thiserror::Error;

/// Errors surfaced by composition, dispatch and configuration.
#[derive(Debug, Error)]
pub enum Error {
    /// The message has no sender and no default sender is configured.
    #[error("No sender address: outbound from address is not configured")]
    NoDefaultSender,

    /// No explicit SMTP parameters were given and no system account exists.
    #[error("No SMTP transport configured")]
    NoTransportConfigured,

    /// The server refused the credentials. The server text is logged, not
    /// carried.
    #[error("Invalid credentials.")]
    InvalidCredentials,

    /// Any other protocol-level failure.
    #[error("Unknown error.")]
    UnknownTransportError,

    /// Network, TLS or persistence failure, with the original text.
    #[error("{0}")]
    Sending(String),

    /// A test-send request failed validation.
    #[error("Invalid request: {}", join_messages(.0))]
    Validation(Vec<ValidationError>),

    /// The MIME tree could not be built or rendered.
    #[error("MIME error: {0}")]
    Mime(#[from] mailroom_mime::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ValidationError::message)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
