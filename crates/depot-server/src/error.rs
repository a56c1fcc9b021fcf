//! Error types for the repository service

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use depot_core::CoreError;
use thiserror::Error;

/// Service operation errors
#[derive(Debug, Error)]
pub enum ServerError {
    // ============ Not found ============
    #[error("No such branch: {name}")]
    BranchNotFound { name: String },

    #[error("No such package file: {name}")]
    PackageNotFound { name: String },

    // ============ Bad requests ============
    #[error("Invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("{0}")]
    CorruptArchive(#[source] CoreError),

    #[error("Empty upgrade payload")]
    EmptyUpgradePayload,

    #[error("Upload aborted: {message}")]
    UploadAborted { message: String },

    // ============ Index rebuilds ============
    #[error("Index rebuild failed with status {status}: stdout={stdout:?}, stderr={stderr:?}")]
    IndexBuildFailed {
        status: i32,
        stdout: String,
        stderr: String,
    },

    #[error("Failed to run indexer '{command}': {source}")]
    IndexerSpawn {
        command: String,
        source: std::io::Error,
    },

    // ============ IO ============
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Reject a name that is not usable as a path component.
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// HTTP status this error surfaces as.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BranchNotFound { .. } | Self::PackageNotFound { .. } => StatusCode::NOT_FOUND,
            Self::InvalidName { .. }
            | Self::CorruptArchive(_)
            | Self::EmptyUpgradePayload
            | Self::UploadAborted { .. } => StatusCode::BAD_REQUEST,
            Self::IndexBuildFailed { .. } | Self::IndexerSpawn { .. } | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<CoreError> for ServerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::CorruptArchive { .. } => Self::CorruptArchive(err),
            CoreError::Io(err) => Self::Io(err),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{self}");
        }
        (status, format!("{self}\n")).into_response()
    }
}

/// Result type for service operations
pub type Result<T> = std::result::Result<T, ServerError>;
