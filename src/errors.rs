//! Error types for upload, authentication, and archive operations.
//!
//! Every failure is tagged with the subsystem it came from and keeps its
//! underlying cause, so the binary can print a full chain on exit. No layer
//! retries; a failed remote call surfaces immediately.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while uploading to Drive.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Missing or invalid credential, path, or range input.
    #[error("configuration error: {0}")]
    Config(String),

    /// A remote API call failed; `operation` names what was attempted.
    #[error("remote API error while {operation}: {source}")]
    RemoteApi {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Local filesystem read/write/stat failure.
    #[error("I/O error on {}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Compression or decompression failure.
    #[error("archive error: {0}")]
    Archive(String),

    /// The authorization code never arrived at the callback listener.
    #[error("timed out waiting for the authorization code")]
    AuthTimeout,
}

impl UploadError {
    /// Wrap a remote failure with the operation that was being attempted.
    pub fn remote<E>(operation: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        UploadError::RemoteApi {
            operation: operation.into(),
            source: Box::new(source),
        }
    }

    /// Wrap a filesystem failure with the path it touched.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        UploadError::LocalIo {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = UploadError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_remote_error_preserves_cause() {
        let cause = std::io::Error::new(std::io::ErrorKind::Other, "connection reset");
        let err = UploadError::remote("creating folder \"docs\"", cause);

        let message = err.to_string();
        assert!(message.contains("creating folder \"docs\""));
        assert!(err.source().is_some());
        assert!(err.source().unwrap().to_string().contains("connection reset"));
    }

    #[test]
    fn test_io_error_names_path() {
        let cause = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = UploadError::io("/tmp/missing.txt", cause);

        assert!(err.to_string().contains("/tmp/missing.txt"));
    }

    #[test]
    fn test_timeout_message() {
        let err = UploadError::AuthTimeout;
        assert!(err.to_string().contains("authorization code"));
    }
}
