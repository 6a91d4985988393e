use thiserror::Error;

/// Remote search error types
#[derive(Debug, Error)]
pub enum FlickrError {
    #[error("No Flickr API keys are available")]
    NoCredentials,

    #[error("Key pool has not been started")]
    NotStarted,

    #[error("Key pool is already started")]
    AlreadyStarted,

    #[error("Key pool was stopped")]
    Stopped,

    #[error("Invalid base URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Request failed with HTTP status {status}")]
    Status { status: u16 },

    #[error("Service unavailable: HTTP {status} after {attempts} attempts")]
    ServiceUnavailable { attempts: u32, status: u16 },

    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, FlickrError>;
