//! Error types for the annotator CLI

use annotator_core::AnnotateError;
use thiserror::Error;

/// Failures while turning an annotation plan into a PDF
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Invalid annotation plan: {0}")]
    Parse(#[from] serde_json::Error),

    /// One entry of the plan was rejected; `index` is its position in the file
    #[error("Annotation #{index}: {source}")]
    Annotation {
        index: usize,
        #[source]
        source: AnnotateError,
    },

    #[error(transparent)]
    Session(#[from] AnnotateError),
}

impl PlanError {
    pub fn annotation(index: usize) -> impl FnOnce(AnnotateError) -> PlanError {
        move |source| PlanError::Annotation { index, source }
    }
}
