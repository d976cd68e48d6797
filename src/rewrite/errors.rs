use crate::edit::SpliceError;
use crate::tree::InvalidReferenceError;
use std::ops::Range;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RewriteError {
    #[error(transparent)]
    InvalidReference(#[from] InvalidReferenceError),

    #[error("'{first_label}' at {first_range:?} conflicts with '{second_label}' at {second_range:?}")]
    OperationConflict {
        first_label: String,
        first_range: Range<usize>,
        second_label: String,
        second_range: Range<usize>,
    },

    #[error("patch no longer matches the text: {source}")]
    StaleTree {
        #[source]
        source: SpliceError,
    },

    #[error("operation '{label}' needs a parse tree but none was built")]
    MissingTree { label: String },

    #[error("detector '{detector}' failed: {source}")]
    Detector {
        detector: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl From<SpliceError> for RewriteError {
    fn from(source: SpliceError) -> Self {
        RewriteError::StaleTree { source }
    }
}

impl RewriteError {
    /// Wrap a detector's own failure.
    pub fn detector(
        detector: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        RewriteError::Detector {
            detector: detector.into(),
            source: source.into(),
        }
    }
}
