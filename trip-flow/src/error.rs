use thiserror::Error;

/// Errors raised by the trip flow
#[derive(Error, Debug)]
pub enum TripError {
    /// The model reply could not be split into its expected sections
    #[error("Malformed itinerary section: {0}")]
    MalformedSection(String),

    /// The LLM client failed or returned nothing usable
    #[error("Upstream LLM failure: {0}")]
    Upstream(String),

    #[error("Session storage error: {0}")]
    StorageError(String),

    #[error("Interaction recorder error: {0}")]
    RecorderError(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl From<sqlx::Error> for TripError {
    fn from(err: sqlx::Error) -> Self {
        TripError::RecorderError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TripError>;
