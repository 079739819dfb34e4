use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parsing failed: {0}")]
    Url(#[from] url::ParseError),

    #[error("API key not found. Set DAYTONA_API_KEY environment variable or provide it explicitly")]
    ApiKeyNotFound,

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Timed out waiting for the provider")]
    Timeout,

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Snapshot {name} failed to build: {reason}")]
    BuildFailed { name: String, reason: String },

    #[error("Sandbox {id} failed to start: {reason}")]
    SandboxFailed { id: String, reason: String },
}
