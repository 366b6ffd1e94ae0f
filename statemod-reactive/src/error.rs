//! Error types for reactive instance operations

/// Error types for reactive instance operations
#[derive(Debug, thiserror::Error)]
pub enum ReactiveError {
    #[error("Unknown state key: {0}")]
    UnknownKey(String),

    #[error("Computed member is read-only: {0}")]
    ReadOnlyComputed(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type ReactiveResult<T> = Result<T, ReactiveError>;
