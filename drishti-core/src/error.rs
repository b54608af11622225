use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl Error {
    /// True for errors the caller caused (bad path, missing file) rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::InvalidPath(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NotFound("result.jpg".to_string());
        assert_eq!(err.to_string(), "Not found: result.jpg");
    }

    #[test]
    fn test_client_errors() {
        assert!(Error::NotFound("x".to_string()).is_client_error());
        assert!(Error::InvalidPath("..".to_string()).is_client_error());
        assert!(!Error::Storage("disk".to_string()).is_client_error());
    }

    #[test]
    fn test_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
