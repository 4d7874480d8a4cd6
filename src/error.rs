use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    /// Nothing matched the request, or the request itself was malformed.
    #[error("selection error: {0}")]
    Selection(String),
    /// The PDF writer could not produce a document.
    #[error("pdf renderer unavailable: {0}")]
    RendererUnavailable(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// Rejected by the account book (duplication and form saves).
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<lopdf::Error> for ReportError {
    fn from(value: lopdf::Error) -> Self {
        ReportError::RendererUnavailable(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
