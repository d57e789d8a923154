//! Error types for offroot operations

use std::io;
use thiserror::Error;

/// Result type for offroot operations
pub type Result<T> = std::result::Result<T, ExecError>;

/// Errors surfaced to callers of offroot
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Signature verification failed: {0}")]
    SignatureRejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExecError::CommandFailed("ls: exited with code 2".to_string());
        assert_eq!(err.to_string(), "Command failed: ls: exited with code 2");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err = ExecError::from(io_err);
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_signature_rejected() {
        let err = ExecError::SignatureRejected("Packages.sig".to_string());
        assert!(err.to_string().starts_with("Signature verification failed"));
        assert!(err.to_string().contains("Packages.sig"));
    }
}
