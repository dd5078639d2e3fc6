use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlmError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Request timed out")]
    Timeout,

    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Gave up after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<AlmError>,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Malformed response body: {0}")]
    MalformedResponse(String),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AlmError>;
