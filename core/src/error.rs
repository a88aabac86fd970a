//! Error types for the billing API client.
//!
//! # Design
//! Status codes the API uses with a fixed meaning get dedicated variants
//! (`PermissionDenied`, `NotFound`, `Validation`, `Server`). Everything that
//! goes wrong before a request leaves the process (config, input, URL) is
//! distinguished from what goes wrong after, so callers can tell a bad call
//! from a bad response.

use thiserror::Error;

/// Errors returned by the dispatcher and every entity mapper.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Subdomain or API key is missing, or a configured root is unusable.
    #[error("configuration is invalid for chargify: {0}")]
    InvalidConfig(String),

    /// Caller input failed a client-side check; nothing was sent.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A required placeholder of the endpoint template was not supplied.
    #[error("endpoint {endpoint} requires path parameter {{{param}}}")]
    MissingPathParam {
        endpoint: &'static str,
        param: &'static str,
    },

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The request never produced a response.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The server returned 401 or 403.
    #[error("permission denied (HTTP {status})")]
    PermissionDenied { status: u16 },

    /// The server returned 404.
    #[error("not found")]
    NotFound,

    /// The server returned 422 with a list of validation messages.
    #[error("validation failed: {}", errors.join("; "))]
    Validation { errors: Vec<String> },

    /// The server returned 500.
    #[error("chargify server error (HTTP {status})")]
    Server { status: u16, body: String },

    /// A mapper required a specific status and got another one.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The body was valid JSON but not in the expected shape.
    #[error("could not understand server response: {0}")]
    UnexpectedResponse(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound)
    }

    /// HTTP status carried by the error, when it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::PermissionDenied { status }
            | ApiError::Server { status, .. }
            | ApiError::HttpError { status, .. } => Some(*status),
            ApiError::NotFound => Some(404),
            ApiError::Validation { .. } => Some(422),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_joins_errors() {
        let err = ApiError::Validation {
            errors: vec!["Email: cannot be blank.".to_string(), "Last name: cannot be blank.".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "validation failed: Email: cannot be blank.; Last name: cannot be blank."
        );
    }

    #[test]
    fn missing_path_param_names_placeholder() {
        let err = ApiError::MissingPathParam {
            endpoint: "customer_get",
            param: "id",
        };
        assert_eq!(err.to_string(), "endpoint customer_get requires path parameter {id}");
    }

    #[test]
    fn status_reports_response_errors_only() {
        assert_eq!(ApiError::NotFound.status(), Some(404));
        assert_eq!(ApiError::PermissionDenied { status: 403 }.status(), Some(403));
        assert_eq!(ApiError::InvalidInput("x".to_string()).status(), None);
        assert!(ApiError::NotFound.is_not_found());
    }
}
