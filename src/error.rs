//! Error types for cloudfile

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Boxed provider error carried as the cause of a storage failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum Error {
    /// A caller-supplied argument violated a precondition. Raised before any I/O.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The provider reported a failure, or succeeded without returning a result.
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl Error {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Error::Storage {
            message: msg.into(),
            source: None,
        }
    }

    pub fn storage_with(msg: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Error::Storage {
            message: msg.into(),
            source: Some(source.into()),
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Storage { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn storage_error_keeps_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let err = Error::storage_with("Error storing file a.txt", io);

        assert!(err.is_storage());
        assert_eq!(err.to_string(), "Storage error: Error storing file a.txt");
        let cause = err.source().expect("cause should be set");
        assert_eq!(cause.to_string(), "reset by peer");
    }

    #[test]
    fn invalid_argument_has_no_cause() {
        let err = Error::invalid_argument("bucket is empty");
        assert!(err.is_invalid_argument());
        assert!(err.source().is_none());
    }
}
