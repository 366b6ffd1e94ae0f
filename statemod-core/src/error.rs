//! Error types for the module layer
//!
//! All errors are synchronous and raised at the call site. The only condition
//! that is deliberately not an error is a missing devtools root at
//! registration time, which is skipped as a no-op.

use statemod_reactive::ReactiveError;

/// Error types for module declaration, registration, and interface operations
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    /// Declaration does not satisfy the capability contract (reserved or
    /// duplicate member name, empty module name)
    #[error("Module contract violation: {0}")]
    ContractViolation(String),

    /// `revert` was passed a non-object snapshot; state is left unmodified
    #[error("Invalid sample: revert expects an object-shaped snapshot")]
    InvalidSample,

    /// `revert_to` index outside the commit log
    #[error("Commit not found: {0}")]
    CommitNotFound(usize),

    /// Registration attempted before an engine was installed on the host
    #[error("Reactivity engine not installed")]
    NotInstalled,

    #[error("Unknown member: {0}")]
    UnknownMember(String),

    #[error("Unknown module: {0}")]
    UnknownModule(String),

    #[error("Duplicate module name: {0}")]
    DuplicateModule(String),

    /// A host supports exactly one registration batch
    #[error("Module batch already registered")]
    AlreadyRegistered,

    /// Failure signalled by a caller-declared method body
    #[error("Method failed: {0}")]
    MethodFailed(String),

    #[error(transparent)]
    Reactive(#[from] ReactiveError),
}

pub type ModuleResult<T> = Result<T, ModuleError>;

/// Translate store-level key misses into member misses at the interface
pub(crate) fn member_error(err: ReactiveError) -> ModuleError {
    match err {
        ReactiveError::UnknownKey(key) => ModuleError::UnknownMember(key),
        other => ModuleError::Reactive(other),
    }
}
