//! Error types shared across the store boundary.

/// Failure reported by a [`crate::TaskStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No task with this id exists.
    #[error("task not found: {0}")]
    NotFound(String),

    /// Input rejected before it reached storage (e.g. an empty title).
    #[error("invalid task: {0}")]
    InvalidTask(String),

    /// The underlying storage failed (I/O, serialization, ...).
    #[error("storage backend failure: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        StoreError::Backend(Box::new(err))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}
