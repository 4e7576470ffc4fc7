use crate::interval::IntervalError;
use crate::nhc::isotach::IsotachError;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Not found (404): {0}")]
    NotFound(String),
    #[error("Server error (5xx): {0}")]
    ServerError(String),
    #[error("Unexpected response status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse response: {0}")]
    ParseError(String),
    #[error("Failed to parse date/time: {0}")]
    DateTimeError(String),
    #[error("Invalid storm identifier: {0}")]
    InvalidStorm(String),
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error(transparent)]
    Interval(#[from] IntervalError),
    #[error(transparent)]
    Isotach(#[from] IsotachError),
}
