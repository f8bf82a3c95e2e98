use serde::{Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ChatError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        ChatError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// The offending request field, for validation failures.
    pub fn field(&self) -> Option<&str> {
        match self {
            ChatError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ChatError {
    fn from(e: std::io::Error) -> Self {
        ChatError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(e: serde_json::Error) -> Self {
        ChatError::Storage(e.to_string())
    }
}

impl From<config::ConfigError> for ChatError {
    fn from(e: config::ConfigError) -> Self {
        ChatError::Config(e.to_string())
    }
}

// Errors cross the HTTP boundary as plain strings
impl Serialize for ChatError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display_names_field() {
        let err = ChatError::validation("roomKey", "expected two tokens");
        assert_eq!(err.to_string(), "roomKey: expected two tokens");
        assert_eq!(err.field(), Some("roomKey"));
    }

    #[test]
    fn test_serializes_as_string() {
        let err = ChatError::NotFound("receiver REG404".to_string());
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, "\"Not found: receiver REG404\"");
        assert!(err.field().is_none());
    }
}
