use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("non-numeric DEFAULT value for i={i}, j={j}: {value}")]
    NonNumericValue {
        i: u32,
        j: u32,
        value: serde_json::Value,
    },

    #[error("unexpected response for i={i}, j={j}: expected {expected} at {path}, found {found}")]
    UnexpectedShape {
        i: u32,
        j: u32,
        path: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("grid fetch timed out after {0:?}")]
    Timeout(Duration),
}
