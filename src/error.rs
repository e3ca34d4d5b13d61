//! Error taxonomy for the display pipeline
//!
//! None of these are fatal. Every handler fails closed: the event is logged
//! and dropped, display state stays as it was.

/// Result type for reconciliation and transport operations
pub type DisplayResult<T> = Result<T, DisplayError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DisplayError {
    /// Missing or wrong-typed field, or an unknown event kind
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Event is well-formed but not valid in the current display state
    #[error("Invalid sequence: {0}")]
    InvalidSequence(String),

    /// Connection to the game server dropped or could not be established
    #[error("Transport disruption: {0}")]
    TransportDisruption(String),
}

impl From<serde_json::Error> for DisplayError {
    fn from(err: serde_json::Error) -> Self {
        DisplayError::MalformedPayload(err.to_string())
    }
}
