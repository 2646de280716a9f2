use thiserror::Error;

/// The first place a completion response departed from the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: expected {expected}, received {received}")]
pub struct ValidationError {
    pub field: String,
    pub expected: String,
    pub received: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, expected: impl Into<String>, received: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            received: received.into(),
        }
    }
}

/// Failure talking to the completion service, reported by the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("completion request timed out")]
    Timeout,

    #[error("could not reach completion service: {0}")]
    Connection(String),

    #[error("completion service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("completion service returned no structured output")]
    EmptyResponse,

    #[error("completion output did not match the schema: {0}")]
    Validation(#[from] ValidationError),

    #[error("completion request failed: {0}")]
    UpstreamTransport(#[from] TransportError),
}
