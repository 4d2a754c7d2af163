use thiserror::Error;

/// Errors surfaced by rendering and output writing.
///
/// Per-module read and parse failures are deliberately not represented
/// here: a module that cannot be read or parsed contributes no
/// dependencies and the scan continues (a warning is printed to stderr).
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to render CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),
}
