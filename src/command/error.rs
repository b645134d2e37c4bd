//! Error taxonomy of the command engine.
//!
//! Work and fallback functions report through [`RunError`] and
//! [`FallbackError`]. Callers of `execute()` only ever see [`ExecuteError`]:
//! either the caller's own bad request, passed through untouched, or one
//! [`CommandRuntimeError`] describing the stage that failed.

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Error shared between the execution record and the surfaced error.
pub type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

/// Returned by a command's work function.
#[derive(Debug, Error)]
pub enum RunError {
    /// Caller error. Never counted, never falls back.
    #[error("Bad request: {0}")]
    BadRequest(#[source] BoxError),

    /// Any other failure. Counted and routed to the fallback.
    #[error("{0}")]
    Failure(#[source] BoxError),
}

impl RunError {
    pub fn bad_request(err: impl Into<BoxError>) -> Self {
        Self::BadRequest(err.into())
    }

    pub fn failure(err: impl Into<BoxError>) -> Self {
        Self::Failure(err.into())
    }
}

/// Returned by a command's fallback.
#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("No fallback available")]
    NotAvailable,

    #[error("{0}")]
    Failed(#[source] BoxError),
}

impl FallbackError {
    pub fn failed(err: impl Into<BoxError>) -> Self {
        Self::Failed(err.into())
    }
}

/// Stage at which an execution gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    FallbackDisabled,
    FallbackUnavailable,
    FallbackFailed,
}

impl FailureKind {
    fn suffix(self) -> &'static str {
        match self {
            FailureKind::FallbackDisabled => "and fallback disabled",
            FailureKind::FallbackUnavailable => "and no fallback available",
            FailureKind::FallbackFailed => "and failed retrieving fallback",
        }
    }
}

/// Failure surfaced by `execute()` once the fallback path is exhausted.
///
/// `original` is `None` when the request was short-circuited. `fallback` is
/// only set when the fallback itself failed.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CommandRuntimeError {
    kind: FailureKind,
    command_key: String,
    message: String,
    #[source]
    original: Option<SharedError>,
    fallback: Option<SharedError>,
}

impl CommandRuntimeError {
    pub(crate) fn new(
        kind: FailureKind,
        command_key: impl Into<String>,
        original: Option<SharedError>,
        fallback: Option<SharedError>,
    ) -> Self {
        let reason = match &original {
            Some(err) => err.to_string(),
            None => "Short-circuited".to_string(),
        };
        Self {
            kind,
            command_key: command_key.into(),
            message: format!("{reason} {}", kind.suffix()),
            original,
            fallback,
        }
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn command_key(&self) -> &str {
        &self.command_key
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn original(&self) -> Option<&SharedError> {
        self.original.as_ref()
    }

    pub fn fallback(&self) -> Option<&SharedError> {
        self.fallback.as_ref()
    }

    pub fn was_short_circuited(&self) -> bool {
        self.original.is_none()
    }
}

/// Everything `execute()` can return instead of a value.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("Bad request: {0}")]
    BadRequest(#[source] BoxError),

    #[error(transparent)]
    Runtime(#[from] CommandRuntimeError),
}

impl ExecuteError {
    pub fn is_bad_request(&self) -> bool {
        matches!(self, ExecuteError::BadRequest(_))
    }

    pub fn runtime(&self) -> Option<&CommandRuntimeError> {
        match self {
            ExecuteError::Runtime(err) => Some(err),
            ExecuteError::BadRequest(_) => None,
        }
    }
}
