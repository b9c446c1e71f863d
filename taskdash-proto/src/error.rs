//! Validation errors and the JSON error body returned by the API.

use serde::{Deserialize, Serialize};

/// Errors produced when a create or update payload fails validation.
///
/// The `Display` text is what the server sends back in the `{error}` body
/// of a `400` response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Task title is missing, not a string, or blank.
    #[error("Title is required")]
    TitleRequired,
    /// `userId` is missing or not an integer.
    #[error("Valid userId is required")]
    UserIdRequired,
    /// User name is missing or empty.
    #[error("Name is required")]
    NameRequired,
    /// User email is missing or empty.
    #[error("Email is required")]
    EmailRequired,
    /// The request body was not a JSON object.
    #[error("Request body must be a JSON object")]
    NotAnObject,
    /// A field was present with the wrong type.
    #[error("Invalid field: {0}")]
    InvalidField(String),
}

/// JSON body carried by every non-2xx API response: `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable error description.
    pub error: String,
}

impl ErrorBody {
    /// Creates an error body from any displayable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_match_api_text() {
        assert_eq!(ValidationError::TitleRequired.to_string(), "Title is required");
        assert_eq!(
            ValidationError::UserIdRequired.to_string(),
            "Valid userId is required"
        );
    }

    #[test]
    fn error_body_json_shape() {
        let body = ErrorBody::new("Task not found");
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"error":"Task not found"}"#);
    }
}
