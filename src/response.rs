//! Decoded value plus the details of the exchange that produced it.

use http::{HeaderMap, StatusCode};
use std::time::Duration;

/// A successful response, decoded into `T`.
///
/// # Examples
///
/// ```no_run
/// use courier::Client;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Account {
///     name: String,
/// }
///
/// # async fn example() -> Result<(), courier::Error> {
/// let client = Client::builder().build()?;
///
/// let response = client
///     .get::<courier::codec::Resource<Account>>("https://api.example.com/accounts/1")
///     .send()
///     .await?;
///
/// println!("Account: {}", response.data.attributes.name);
/// println!("Took {:?} over {} attempt(s)", response.latency, response.attempts);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The decoded response data.
    pub data: T,

    /// The raw response body as text.
    pub raw_body: String,

    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// Time from the first attempt until the response was classified.
    pub latency: Duration,

    /// Number of attempts made; `1` when the first attempt got a response.
    pub attempts: usize,
}

impl<T> Response<T> {
    /// Creates a response from its parts.
    pub fn new(
        data: T,
        raw_body: String,
        status: StatusCode,
        headers: HeaderMap,
        latency: Duration,
        attempts: usize,
    ) -> Self {
        Self {
            data,
            raw_body,
            status,
            headers,
            latency,
            attempts,
        }
    }

    /// Maps the response data while keeping the metadata.
    ///
    /// ```
    /// # use courier::Response;
    /// # use http::{HeaderMap, StatusCode};
    /// # use std::time::Duration;
    /// let response = Response::new(
    ///     42,
    ///     "42".to_string(),
    ///     StatusCode::OK,
    ///     HeaderMap::new(),
    ///     Duration::from_millis(100),
    ///     1,
    /// );
    ///
    /// let string_response = response.map(|n| n.to_string());
    /// assert_eq!(string_response.data, "42");
    /// ```
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            raw_body: self.raw_body,
            status: self.status,
            headers: self.headers,
            latency: self.latency,
            attempts: self.attempts,
        }
    }

    /// Returns `true` if more than one attempt was needed.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Returns a header value by name, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// Discards the metadata.
    pub fn into_data(self) -> T {
        self.data
    }
}

impl<T> AsRef<T> for Response<T> {
    fn as_ref(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_metadata_accessors() {
        let mut headers = HeaderMap::new();
        headers.insert("x-trace", HeaderValue::from_static("abc"));

        let response = Response::new(
            vec![1, 2],
            "[1,2]".to_string(),
            StatusCode::ACCEPTED,
            headers,
            Duration::from_millis(5),
            3,
        );

        assert!(response.was_retried());
        assert_eq!(response.header("x-trace"), Some("abc"));
        assert_eq!(response.header("x-missing"), None);
        assert_eq!(response.len(), 2);
        assert_eq!(response.into_data(), vec![1, 2]);
    }
}
