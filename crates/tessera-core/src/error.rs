//! Error types for tessera.

use thiserror::Error;

/// Result type alias using tessera's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for tessera operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Item not found
    #[error("Item not found: {0}")]
    ItemNotFound(uuid::Uuid),

    /// Board not found (deleted or never existed)
    #[error("Board not found: {0}")]
    BoardNotFound(uuid::Uuid),

    /// Unique constraint hit at commit time (duplicate connection, board name)
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Completion provider failed
    #[error("Inference error: {0}")]
    Inference(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input (caller precondition violated)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error reports a duplicate that callers may treat as success.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::AlreadyExists(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_display_item_not_found() {
        let id = Uuid::nil();
        let err = Error::ItemNotFound(id);
        assert_eq!(err.to_string(), format!("Item not found: {}", id));
    }

    #[test]
    fn test_error_display_board_not_found() {
        let id = Uuid::new_v4();
        let err = Error::BoardNotFound(id);
        assert!(err.to_string().contains(&id.to_string()));
    }

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("synthesis needs at least 2 items".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid input: synthesis needs at least 2 items"
        );
    }

    #[test]
    fn test_already_exists_is_detected() {
        assert!(Error::AlreadyExists("connection".to_string()).is_already_exists());
        assert!(!Error::NotFound("connection".to_string()).is_already_exists());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
