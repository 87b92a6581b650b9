//! Error types for typed requests and providers.
//!
//! Every layer hands its error back to the caller. The variants map one-to-one onto the
//! stages of a call: building the request, encoding the body, reaching the server,
//! classifying the status, decoding the body and, for providers, transforming the value.

use crate::transport::TransportError;
use http::StatusCode;

/// The main error type for typed requests and providers.
///
/// # Examples
///
/// ```no_run
/// use courier::{Client, Error};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder().build()?;
///
/// match client.get::<serde_json::Value>("https://api.example.com/users/1").execute().await {
///     Ok(user) => println!("Found: {:?}", user),
///     Err(Error::NotFound) => println!("No such user"),
///     Err(Error::Decode { raw_response, codec_error, .. }) => {
///         eprintln!("Could not decode {}: {}", raw_response, codec_error);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    /// The client was configured with invalid settings.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The request could not be built (malformed URL, method or header).
    ///
    /// This is terminal and never retried.
    #[error("Failed to construct request: {0}")]
    RequestConstruction(String),

    /// The codec failed to encode the request body.
    ///
    /// This is terminal and never retried.
    #[error("Failed to serialize request: {0}")]
    Serialization(String),

    /// The transport failed before any response arrived.
    ///
    /// These are retried up to the configured count; the last one is surfaced.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server answered `400 Bad Request`.
    #[error("bad request")]
    BadRequest,

    /// The server answered `404 Not Found`.
    #[error("not found")]
    NotFound,

    /// The server answered with a status that is neither a success nor a known sentinel.
    #[error("Unexpected status {status}: {raw_response}")]
    UnknownStatus {
        /// The HTTP status code
        status: StatusCode,
        /// The raw response body
        raw_response: String,
    },

    /// The codec failed to decode a successful response body.
    #[error("Failed to decode response (status {status}): {codec_error}")]
    Decode {
        /// The HTTP status code
        status: StatusCode,
        /// The raw response body that failed to decode
        raw_response: String,
        /// The codec error message
        codec_error: String,
    },

    /// A provider transform rejected the value it was given.
    #[error("Transform failed: {0}")]
    Transform(String),
}

impl Error {
    /// Builds a [`Error::Transform`] from any displayable message.
    ///
    /// ```
    /// use courier::Error;
    ///
    /// let err = Error::transform("id must be positive");
    /// assert_eq!(err.to_string(), "Transform failed: id must be positive");
    /// ```
    pub fn transform(message: impl std::fmt::Display) -> Self {
        Error::Transform(message.to_string())
    }

    /// Returns `true` if another attempt could succeed.
    ///
    /// Only transport failures qualify; any received response stops retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    /// Returns the HTTP status code if this error came from a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::BadRequest => Some(StatusCode::BAD_REQUEST),
            Error::NotFound => Some(StatusCode::NOT_FOUND),
            Error::UnknownStatus { status, .. } => Some(*status),
            Error::Decode { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the raw response body if this error carries one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::UnknownStatus { raw_response, .. } => Some(raw_response),
            Error::Decode { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }
}

/// A specialized `Result` type for typed requests and providers.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportErrorKind;

    #[test]
    fn test_only_transport_errors_are_retryable() {
        let transport = Error::Transport(TransportError::new(
            TransportErrorKind::Connect,
            "connection refused",
        ));
        assert!(transport.is_retryable());
        assert!(!Error::BadRequest.is_retryable());
        assert!(!Error::NotFound.is_retryable());
        assert!(!Error::Serialization("boom".to_string()).is_retryable());
        assert!(!Error::RequestConstruction("bad url".to_string()).is_retryable());
    }

    #[test]
    fn test_status_accessor() {
        assert_eq!(Error::BadRequest.status(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(Error::NotFound.status(), Some(StatusCode::NOT_FOUND));

        let err = Error::UnknownStatus {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            raw_response: "oops".to_string(),
        };
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(err.raw_response(), Some("oops"));

        assert_eq!(Error::transform("nope").status(), None);
    }

    #[test]
    fn test_sentinel_messages() {
        assert_eq!(Error::BadRequest.to_string(), "bad request");
        assert_eq!(Error::NotFound.to_string(), "not found");
    }
}
