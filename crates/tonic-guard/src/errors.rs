use thiserror::Error;

/// Errors surfaced by subject resolution and rule evaluation.
///
/// Every variant is mapped to an `Internal` status on the wire; a negative
/// decision is not an error and becomes `PermissionDenied` instead. The full
/// error reaches the `on_error` hook, never the caller.
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("policy {0:?} not defined")]
    UndefinedPolicy(String),
    #[error("policy {0:?} declared without an implementation")]
    InvalidPolicy(String),
    #[error("policy {name:?} failed")]
    PolicyFailure {
        name: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to resolve subject")]
    SubjectResolution(#[source] anyhow::Error),
}

pub type GuardResult<T> = Result<T, GuardError>;
