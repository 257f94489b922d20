//! Error taxonomy shared by the compilers, the dispatcher and the router.
//!
//! Every failure is returned to the caller; only the binary's `main` turns an
//! error into an exit status. `ErrorKind` lets callers classify an error
//! without inspecting its message.

use std::fmt;
use thiserror::Error;

/// Catalog status code for a query that matched no rows.
pub const CAT_NO_ROWS_FOUND: i32 = -808_000;

pub type Result<T, E = BatonError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum BatonError {
    /// A field required by the active operation is absent from the document.
    #[error("no {key} key found in input document")]
    MissingKey { key: String },

    /// A required external input (flag, environment variable, file) was not supplied.
    #[error("missing argument: {0}")]
    MissingArgument(String),

    /// A supplied value has the wrong shape or contradicts another value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Failure reported by the catalog collaborator, passed through verbatim.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// A metadata batch failed after some items had already been applied.
    #[error(
        "metadata update on {path} stopped after {applied} of {total} AVUs{}: {source}",
        .last_applied.as_deref().map(|attr| format!(" (last applied: {attr})")).unwrap_or_default()
    )]
    PartialMutation {
        path: String,
        applied: usize,
        total: usize,
        last_applied: Option<String>,
        source: Box<BatonError>,
    },

    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed input JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    MissingKey,
    MissingArgument,
    InvalidArgument,
    CollaboratorFailure,
    Io,
    MalformedInput,
}

impl BatonError {
    pub fn missing_key(key: impl Into<String>) -> Self {
        BatonError::MissingKey { key: key.into() }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        BatonError::InvalidArgument(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BatonError::MissingKey { .. } => ErrorKind::MissingKey,
            BatonError::MissingArgument(_) => ErrorKind::MissingArgument,
            BatonError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            BatonError::Catalog(_) => ErrorKind::CollaboratorFailure,
            BatonError::PartialMutation { source, .. } => source.kind(),
            BatonError::Io(_) => ErrorKind::Io,
            BatonError::Json(_) => ErrorKind::MalformedInput,
        }
    }
}

/// Error surfaced by the external catalog client.
///
/// `code` is the catalog's own status code when the client could recover one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogError {
    pub code: Option<i32>,
    pub message: String,
}

impl CatalogError {
    pub fn new(code: Option<i32>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn no_rows(message: impl Into<String>) -> Self {
        Self::new(Some(CAT_NO_ROWS_FOUND), message)
    }

    pub fn is_no_rows(&self) -> bool {
        self.code == Some(CAT_NO_ROWS_FOUND)
    }
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "catalog error {code}: {}", self.message),
            None => write!(f, "catalog error: {}", self.message),
        }
    }
}

impl std::error::Error for CatalogError {}
