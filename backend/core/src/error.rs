use thiserror::Error;

/// Top-level error taxonomy for the ScreenSage pipeline.
///
/// Each variant maps to one failure class with its own handling policy at
/// the pipeline boundary: recognition failures terminate a run, generation
/// and persistence failures degrade it, credential failures are fatal to
/// the current call only.
#[derive(Debug, Error)]
pub enum SageError {
    #[error("credential exchange failed: {0}")]
    Credential(String),

    #[error("text recognition failed: {0}")]
    Recognition(String),

    #[error("answer generation failed: {0}")]
    Generation(String),

    #[error("history persistence failed: {0}")]
    Persistence(String),

    #[error("no history record with id {0}")]
    NotFound(i64),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SageError {
    /// Whether this error is a by-id lookup miss rather than an I/O or
    /// vendor failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SageError::NotFound(_))
    }
}
