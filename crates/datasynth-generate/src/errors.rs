use thiserror::Error;

/// Failures of the generative text backend.
///
/// The synthesis engine absorbs all of these; they only surface to callers
/// that talk to a backend directly.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("missing credential for the generative backend")]
    MissingApiKey,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed backend response: {0}")]
    Decode(String),
    #[error("backend returned no completion text")]
    EmptyCompletion,
}

/// Errors emitted while writing datasets.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}
