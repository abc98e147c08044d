use thiserror::Error;

use crate::annotations::AnnotationId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnnotateError {
    #[error(
        "Preview geometry not measured{}",
        .page.map(|p| format!(" for page {}", p)).unwrap_or_default()
    )]
    GeometryNotReady { page: Option<u32> },

    #[error("Annotation {0} not found")]
    NotFound(AnnotationId),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Failed to parse PDF: {0}")]
    InvalidDocument(String),

    #[error("Export failed: {0}")]
    ExportFailed(String),

    #[error("An export is already running for this session")]
    ExportInProgress,

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AnnotateError {
    /// Runtime conditions the user can retry after, as opposed to
    /// contract violations by the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AnnotateError::InvalidDocument(_)
                | AnnotateError::ExportFailed(_)
                | AnnotateError::ExportInProgress
        )
    }
}

impl From<serde_json::Error> for AnnotateError {
    fn from(err: serde_json::Error) -> Self {
        AnnotateError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AnnotateError>;
