use thiserror::Error;

/// Failures that can surface from the crate's I/O edges (config, store, reports).
/// Ticking the engine never fails.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("plot error: {0}")]
    Plot(String),
    #[error("store entry '{0}' is malformed")]
    MalformedEntry(String),
}

pub type SimResult<T> = Result<T, SimError>;
