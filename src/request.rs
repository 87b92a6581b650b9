//! Typed, deferred HTTP requests.
//!
//! A [`Request`] captures a method, URL, optional body and configurators. Nothing is
//! sent until [`Request::send`] or [`Request::execute`] is awaited, and every call
//! re-issues the exchange from scratch.
//!
//! Execution:
//!
//! 1. Build the [`Configuration`] from the client defaults and the request's own
//!    configurators.
//! 2. Encode the body, if any. Failure is terminal.
//! 3. Attempt the exchange up to `retries` times. Building the request is terminal on
//!    failure; a transport failure is retried; any response stops retrying.
//! 4. Classify the status: `200`/`202` decode, `400` and `404` map to sentinels,
//!    anything else is [`Error::UnknownStatus`]. An empty `200`/`202` body answering a
//!    request built by a write constructor is not decoded; it yields `T::default()`.

use crate::{
    config::{Configuration, Configurator},
    header::decorate,
    retry::{Attempt, Retry},
    Client, Error, Response, Result,
};
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Produces the JSON value of a request body on demand.
pub(crate) type BodyEncoder = Arc<dyn Fn() -> serde_json::Result<Value> + Send + Sync>;

/// Produces the value an empty write response stands for.
pub(crate) type EmptyValue<T> = fn() -> T;

/// A deferred HTTP call bound to the response type `T`.
///
/// # Examples
///
/// ```no_run
/// use courier::codec::Resource;
/// use courier::config::{add_header_decorator, set_retries};
/// use courier::header::bearer_auth;
/// use courier::{Client, Error};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Account {
///     name: String,
/// }
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder().build()?;
///
/// let request = client
///     .get::<Vec<Resource<Account>>>("http://accounts:8080/api/accounts")
///     .configure(set_retries(3))
///     .configure(add_header_decorator(bearer_auth("token")));
///
/// match request.execute().await {
///     Ok(accounts) => println!("{} accounts", accounts.len()),
///     Err(Error::NotFound) => println!("no accounts"),
///     Err(e) => return Err(e),
/// }
/// # Ok(())
/// # }
/// ```
pub struct Request<T> {
    client: Client,
    method: Method,
    url: String,
    body: Option<BodyEncoder>,
    configurators: Vec<Configurator>,
    empty: Option<EmptyValue<T>>,
}

impl<T> Request<T> {
    pub(crate) fn new(
        client: Client,
        method: Method,
        url: String,
        body: Option<BodyEncoder>,
        empty: Option<EmptyValue<T>>,
    ) -> Self {
        Self {
            client,
            method,
            url,
            body,
            configurators: Vec::new(),
            empty,
        }
    }

    /// Appends a configurator, applied after the client defaults.
    pub fn configure(mut self, configurator: Configurator) -> Self {
        self.configurators.push(configurator);
        self
    }

    /// Appends several configurators, in order.
    pub fn configure_all(mut self, configurators: impl IntoIterator<Item = Configurator>) -> Self {
        self.configurators.extend(configurators);
        self
    }

    /// The HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The URL as given, before it is resolved against the client's base URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The configuration a call would use right now.
    pub fn configuration(&self) -> Configuration {
        Configuration::from_configurators(
            self.client
                .default_configurators()
                .iter()
                .chain(self.configurators.iter()),
        )
    }

    fn encode_body(&self) -> Result<Option<Vec<u8>>> {
        let Some(encode) = &self.body else {
            return Ok(None);
        };

        let encoded = encode()
            .map_err(|e| e.to_string())
            .and_then(|value| self.client.codec().encode(value).map_err(|e| e.to_string()));

        match encoded {
            Ok(bytes) => Ok(Some(bytes)),
            Err(message) => {
                tracing::error!(
                    method = %self.method,
                    url = %self.url,
                    error = %message,
                    "Failed to serialize request body"
                );
                Err(Error::Serialization(message))
            }
        }
    }

    fn build(
        &self,
        configuration: &Configuration,
        body: Option<&[u8]>,
    ) -> Result<http::Request<Vec<u8>>> {
        let url = self.client.resolve(&self.url)?;

        let mut request = http::Request::builder()
            .method(self.method.clone())
            .uri(url.as_str())
            .body(body.map(<[u8]>::to_vec).unwrap_or_default())
            .map_err(|e| Error::RequestConstruction(e.to_string()))?;

        if body.is_some() {
            request.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static(self.client.codec().content_type()),
            );
        }
        decorate(request.headers_mut(), configuration.header_decorators());

        Ok(request)
    }

    async fn attempt(
        &self,
        attempt: usize,
        configuration: &Configuration,
        body: Option<&[u8]>,
    ) -> Attempt<http::Response<Vec<u8>>, Error> {
        let request = match self.build(configuration, body) {
            Ok(request) => request,
            Err(e) => {
                tracing::error!(error = %e, url = %self.url, "Error creating request");
                return Attempt::Abort(e);
            }
        };

        tracing::debug!(
            method = %self.method,
            url = %request.uri(),
            attempt = attempt,
            "Issuing request"
        );

        match self.client.transport().send(request).await {
            Ok(response) => Attempt::Done(response),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    method = %self.method,
                    url = %self.url,
                    attempt = attempt,
                    max_attempts = configuration.retries(),
                    "Request failed"
                );
                Attempt::Retry(Error::Transport(e))
            }
        }
    }
}

impl<T> Request<T>
where
    T: DeserializeOwned,
{
    /// Executes the request and returns the decoded value with response metadata.
    pub async fn send(&self) -> Result<Response<T>> {
        let configuration = self.configuration();
        let body = self.encode_body()?;

        let retry = Retry::new(configuration.retries()).backoff(configuration.backoff().clone());
        let start_time = Instant::now();
        let mut attempts = 0;

        let result = {
            let configuration = &configuration;
            let body = body.as_deref();
            retry
                .run(|attempt| {
                    attempts = attempt;
                    self.attempt(attempt, configuration, body)
                })
                .await
        };

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    method = %self.method,
                    url = %self.url,
                    attempts = attempts,
                    "Unable to successfully call"
                );
                return Err(e);
            }
        };

        let latency = start_time.elapsed();
        let (parts, bytes) = response.into_parts();
        let status = parts.status;
        let raw_body = String::from_utf8_lossy(&bytes).into_owned();

        tracing::debug!(
            method = %self.method,
            url = %self.url,
            status = status.as_u16(),
            latency_ms = latency.as_millis(),
            attempts = attempts,
            "Received response"
        );

        match status {
            StatusCode::OK | StatusCode::ACCEPTED => {
                let data = match self.empty {
                    Some(empty) if bytes.is_empty() => empty(),
                    _ => self.decode(&bytes, status, &raw_body)?,
                };
                Ok(Response::new(
                    data,
                    raw_body,
                    status,
                    parts.headers,
                    latency,
                    attempts,
                ))
            }
            StatusCode::BAD_REQUEST => Err(Error::BadRequest),
            StatusCode::NOT_FOUND => Err(Error::NotFound),
            status => {
                tracing::debug!(
                    method = %self.method,
                    url = %self.url,
                    status = status.as_u16(),
                    "Unexpected status"
                );
                Err(Error::UnknownStatus {
                    status,
                    raw_response: raw_body,
                })
            }
        }
    }

    /// Executes the request and returns only the decoded value.
    pub async fn execute(&self) -> Result<T> {
        self.send().await.map(Response::into_data)
    }

    fn decode(&self, bytes: &[u8], status: StatusCode, raw_body: &str) -> Result<T> {
        let decoded = self
            .client
            .codec()
            .decode(bytes)
            .map_err(|e| e.to_string())
            .and_then(|value| serde_json::from_value::<T>(value).map_err(|e| e.to_string()));

        decoded.map_err(|codec_error| {
            tracing::error!(
                error = %codec_error,
                raw_response = %raw_body,
                "Failed to decode response"
            );
            Error::Decode {
                status,
                raw_response: raw_body.to_string(),
                codec_error,
            }
        })
    }
}

impl<T> Clone for Request<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            method: self.method.clone(),
            url: self.url.clone(),
            body: self.body.clone(),
            configurators: self.configurators.clone(),
            empty: self.empty,
        }
    }
}

impl<T> fmt::Debug for Request<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("has_body", &self.body.is_some())
            .field("configurators", &self.configurators.len())
            .finish()
    }
}
