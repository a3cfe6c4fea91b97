use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid fetch settings: {0}")]
    InvalidSettings(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;

/// Why a single source did not produce a usable image.
///
/// Every variant is soft: the fetcher records it and moves on to the next
/// source in the chain.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceFailure {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("image decode failed: {0}")]
    Decode(String),

    #[error("no icon link found in page")]
    NoIconLink,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for SourceFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceFailure::Timeout
        } else {
            SourceFailure::Transport(err.to_string())
        }
    }
}

impl From<image::ImageError> for SourceFailure {
    fn from(err: image::ImageError) -> Self {
        SourceFailure::Decode(err.to_string())
    }
}
