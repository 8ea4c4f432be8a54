//! Unified error types for the Cradle workspace.
//!
//! Every error carries enough context (operation, container ID, path or
//! layer identifiers) to be actionable without a debugger.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum CradleError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Malformed or missing required input.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid input.
        message: String,
    },

    /// An operation was attempted from a disallowed lifecycle state.
    #[error("container {id} is in an invalid state: {message}")]
    InvalidState {
        /// Container the operation was attempted on.
        id: String,
        /// Description of the state conflict.
        message: String,
    },

    /// The container handle is no longer valid; it may have been removed
    /// by another process.
    #[error("container {id} is not valid")]
    Removed {
        /// Identifier of the removed container.
        id: String,
    },

    /// A storage-service call failed.
    #[error("storage error while {operation} for container {id}: {message}")]
    Storage {
        /// Operation that was being performed.
        operation: &'static str,
        /// Container the operation was performed for.
        id: String,
        /// Description of the underlying failure.
        message: String,
    },

    /// A state-store call failed.
    #[error("persistence error for container {id}: {message}")]
    Persistence {
        /// Container whose record could not be read or written.
        id: String,
        /// Description of the underlying failure.
        message: String,
    },

    /// An OS-level mount or unmount failed.
    #[error("mount error at {path}: {message}")]
    Mount {
        /// Path of the mount target.
        path: PathBuf,
        /// Description of the underlying failure.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CradleError>;
