use thiserror::Error;

/// Errors raised by the decoder, the metric and graph interchange.
///
/// Malformed records and dangling references in a token sequence are not
/// errors: they are skipped while decoding.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("depth count mismatch: {left} vs {right}")]
    ShapeMismatch { left: usize, right: usize },

    #[error("invalid graph document: {0}")]
    InvalidGraph(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
