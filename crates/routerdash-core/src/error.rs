//! Error type shared by every backend and controller operation.

use crate::maintenance::ValidationError;

/// Errors surfaced by backends, configuration, and dialog validation.
///
/// None of these are fatal: the controller turns them into events and the
/// view model confines each one to the widget it affects.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network/transport failure (connection refused, timeout, DNS).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The device answered with a non-success HTTP status.
    #[error("{url} returned HTTP {status}")]
    Status { status: u16, url: String },

    /// The body was not JSON or did not have the expected shape.
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// User input rejected before submission.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// A backend reported failure without a transport error.
    #[error("{0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_names_url_and_code() {
        let e = Error::Status {
            status: 404,
            url: "http://device/api/metrics".to_string(),
        };
        assert_eq!(e.to_string(), "http://device/api/metrics returned HTTP 404");
    }

    #[test]
    fn decode_error_wraps_serde() {
        let err = serde_json::from_str::<u32>("not json").unwrap_err();
        let e: Error = err.into();
        assert!(matches!(e, Error::Decode(_)));
        assert!(e.to_string().starts_with("malformed response"));
    }

    #[test]
    fn validation_error_is_transparent() {
        let e: Error = ValidationError::PasswordMismatch.into();
        assert_eq!(e.to_string(), ValidationError::PasswordMismatch.to_string());
    }
}
