use logomatch_scanner::ScanError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GroupError {
    #[error("No domains to process")]
    EmptyInput,

    #[error("Malformed domain at position {index}: {value:?}")]
    MalformedDomain { index: usize, value: String },

    #[error("Similarity threshold {threshold} is outside 0..={max}")]
    InvalidThreshold { threshold: u32, max: u32 },

    #[error("Fetch concurrency must be at least 1")]
    InvalidConcurrency,

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("Scanner error: {0}")]
    Scanner(#[from] ScanError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GroupError>;

/// A decoded image the perceptual hash cannot work with
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    #[error("cannot hash a {width}x{height} image")]
    EmptyImage { width: u32, height: u32 },
}
