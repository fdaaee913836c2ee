//! Error types for the cammrust toolkit

use std::io;
use thiserror::Error;

/// Main error type for cammrust operations
#[derive(Debug, Error)]
pub enum CamError {
    /// IO error occurred during stream operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error parsing a DXF group-code stream (non-numeric code, missing EOF, ...)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Unparseable input value (bad CAMM token, non-numeric attribute, ...)
    #[error("Bad input: {0}")]
    BadInput(String),

    /// The same section appeared twice while reading in strict mode
    #[error("Duplicate section: {0}")]
    DuplicateSection(String),

    /// Boil-down could not reach the acceptable set for these entity kinds
    #[error("Unable to boil down entity kinds: {0}")]
    UnsupportedEntity(String),

    /// Feature outside the supported subset (block child type, recursion, ...)
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Bad filter criterion, sort criterion, or wrong arity
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Mismatched coordinate arrays or an empty point list
    #[error("Invalid polyline: {0}")]
    InvalidPolyline(String),

    /// Generic error with custom message
    #[error("{0}")]
    Custom(String),
}

/// Result type alias for cammrust operations
pub type Result<T> = std::result::Result<T, CamError>;

impl From<String> for CamError {
    fn from(s: String) -> Self {
        CamError::Custom(s)
    }
}

impl From<&str> for CamError {
    fn from(s: &str) -> Self {
        CamError::Custom(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CamError::Parse("line 4: 'SECTION' is not a group code".to_string());
        assert_eq!(
            err.to_string(),
            "Parse error: line 4: 'SECTION' is not a group code"
        );
    }

    #[test]
    fn test_unsupported_entity_lists_kinds() {
        let err = CamError::UnsupportedEntity("HATCH, MTEXT".to_string());
        assert!(err.to_string().contains("HATCH"));
        assert!(err.to_string().contains("MTEXT"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: CamError = io_err.into();
        assert!(matches!(err, CamError::Io(_)));
    }
}
