use std::path::PathBuf;
use thiserror::Error;

/// Failures talking to the timestamp service. Every variant is treated as transient.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(u16),

    /// Body is not JSON at all; JSON of the wrong shape is not an error
    #[error("response body is not json: {0}")]
    Decode(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoercionError {
    #[error("expected a non-negative integer, got {0}")]
    Invalid(String),

    #[error("negative amount {0}")]
    Negative(String),
}

/// Input-fatal errors: the run cannot produce a report.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("{} not found", .0.display())]
    NotFound(PathBuf),

    #[error("could not read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not decode JSON from {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
