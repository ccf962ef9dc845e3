use thiserror::Error;

/// Error type for remote record service calls
#[derive(Debug, Error)]
pub enum RecordServiceError {
    /// No endpoint configured, so nothing was sent
    #[error("Record service URL is not configured")]
    NotConfigured,

    /// Transport failure from the reqwest HTTP client
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("Record service returned status {0}")]
    Status(u16),

    /// Request or response body was not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The HTTP client itself could not be built
    #[error("Client error: {0}")]
    Client(String),
}
