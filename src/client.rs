//! Client holding the injected transport and codec.
//!
//! The [`Client`] type is the entry point for building typed requests. Use
//! [`ClientBuilder`] to pick a transport, codec, base URL and client-wide configurators.

use crate::{
    codec::{Codec, JsonApi},
    config::{self, Configurator},
    header::HeaderDecorator,
    request::{BodyEncoder, Request},
    transport::{ReqwestTransport, Transport},
    Error, Result,
};
use http::Method;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Builds typed requests against an injected [`Transport`].
///
/// The client is cheap to clone and is meant to be shared; the transport underneath is
/// used concurrently by every in-flight request.
///
/// # Examples
///
/// ```no_run
/// use courier::codec::Resource;
/// use courier::config::set_retries;
/// use courier::Client;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Default, Serialize, Deserialize)]
/// struct Account {
///     name: String,
/// }
///
/// # async fn example() -> Result<(), courier::Error> {
/// let client = Client::builder()
///     .base_url("http://accounts:8080/api/")?
///     .build()?;
///
/// // GET, retried up to three times on transport failures
/// let account: Resource<Account> = client
///     .get("accounts/1")
///     .configure(set_retries(3))
///     .execute()
///     .await?;
///
/// // POST a new resource
/// let created: Resource<Account> = client
///     .post("accounts", Resource::new("accounts", Account { name: "main".to_string() }))
///     .execute()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    codec: Arc<dyn Codec>,
    base_url: Option<Url>,
    default_configurators: Vec<Configurator>,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a client over `transport` with the JSON:API codec and no base URL.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport: Arc::new(transport),
                codec: Arc::new(JsonApi),
                base_url: None,
                default_configurators: Vec::new(),
            }),
        }
    }

    /// Builds a request with an explicit method and no body.
    ///
    /// Every `200`/`202` body is decoded, including an empty one.
    pub fn request<T>(&self, method: Method, url: impl Into<String>) -> Request<T> {
        Request::new(self.clone(), method, url.into(), None, None)
    }

    /// Builds a GET request decoding into `T`.
    pub fn get<T>(&self, url: impl Into<String>) -> Request<T> {
        self.request(Method::GET, url)
    }

    /// Builds a POST request sending `body` and decoding into `T`.
    ///
    /// An empty `200`/`202` body resolves to `T::default()`.
    pub fn post<T, B>(&self, url: impl Into<String>, body: B) -> Request<T>
    where
        T: Default,
        B: Serialize + Send + Sync + 'static,
    {
        self.with_body(Method::POST, url, body)
    }

    /// Builds a PATCH request sending `body` and decoding into `T`.
    ///
    /// An empty `200`/`202` body resolves to `T::default()`.
    pub fn patch<T, B>(&self, url: impl Into<String>, body: B) -> Request<T>
    where
        T: Default,
        B: Serialize + Send + Sync + 'static,
    {
        self.with_body(Method::PATCH, url, body)
    }

    /// Builds a PUT request sending `body` and decoding into `T`.
    ///
    /// An empty `200`/`202` body resolves to `T::default()`.
    pub fn put<T, B>(&self, url: impl Into<String>, body: B) -> Request<T>
    where
        T: Default,
        B: Serialize + Send + Sync + 'static,
    {
        self.with_body(Method::PUT, url, body)
    }

    /// Builds a DELETE request; an empty success body resolves to `()`.
    pub fn delete(&self, url: impl Into<String>) -> Request<()> {
        Request::new(self.clone(), Method::DELETE, url.into(), None, Some(<()>::default))
    }

    fn with_body<T, B>(&self, method: Method, url: impl Into<String>, body: B) -> Request<T>
    where
        T: Default,
        B: Serialize + Send + Sync + 'static,
    {
        let encode: BodyEncoder = Arc::new(move || serde_json::to_value(&body));
        Request::new(self.clone(), method, url.into(), Some(encode), Some(T::default))
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.inner.transport.as_ref()
    }

    pub(crate) fn codec(&self) -> &dyn Codec {
        self.inner.codec.as_ref()
    }

    pub(crate) fn default_configurators(&self) -> &[Configurator] {
        &self.inner.default_configurators
    }

    /// Resolves `url` against the base URL, if one is set.
    pub(crate) fn resolve(&self, url: &str) -> Result<Url> {
        let resolved = match &self.inner.base_url {
            Some(base) => base.join(url),
            None => Url::parse(url),
        };
        resolved.map_err(|e| Error::RequestConstruction(format!("invalid url {:?}: {}", url, e)))
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use courier::header::bearer_auth;
/// use courier::ClientBuilder;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), courier::Error> {
/// let client = ClientBuilder::new()
///     .base_url("https://api.example.com/")?
///     .timeout(Duration::from_secs(30))
///     .retries(3)
///     .header_decorator(bearer_auth("token"))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    codec: Arc<dyn Codec>,
    base_url: Option<Url>,
    timeout: Option<Duration>,
    default_configurators: Vec<Configurator>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            transport: None,
            codec: Arc::new(JsonApi),
            base_url: None,
            timeout: None,
            default_configurators: Vec::new(),
        }
    }

    /// Sets the base URL relative request URLs are joined onto.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        let url = Url::parse(url.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid base URL: {}", e)))?;
        self.base_url = Some(url);
        Ok(self)
    }

    /// Uses `transport` instead of the default reqwest-backed one.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Shares an already type-erased transport.
    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the body codec. Defaults to [`JsonApi`].
    pub fn codec(mut self, codec: impl Codec + 'static) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    /// Sets a per-request timeout on the default transport.
    ///
    /// Ignored when a custom transport is supplied.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Adds a configurator applied to every request before its own configurators.
    pub fn configurator(mut self, configurator: Configurator) -> Self {
        self.default_configurators.push(configurator);
        self
    }

    /// Sets the default attempt count for every request.
    pub fn retries(self, retries: usize) -> Self {
        self.configurator(config::set_retries(retries))
    }

    /// Adds a header decorator applied to every request.
    pub fn header_decorator(self, decorator: HeaderDecorator) -> Self {
        self.configurator(config::add_header_decorator(decorator))
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the default HTTP client cannot be created.
    pub fn build(self) -> Result<Client> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let http_client = reqwest::Client::builder().build().map_err(|e| {
                    Error::Configuration(format!("Failed to build HTTP client: {}", e))
                })?;
                let mut transport = ReqwestTransport::from_client(http_client);
                if let Some(timeout) = self.timeout {
                    transport = transport.with_timeout(timeout);
                }
                Arc::new(transport) as Arc<dyn Transport>
            }
        };

        Ok(Client {
            inner: Arc::new(ClientInner {
                transport,
                codec: self.codec,
                base_url: self.base_url,
                default_configurators: self.default_configurators,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_against_base() {
        let client = Client::builder()
            .base_url("http://accounts:8080/api/")
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(
            client.resolve("accounts/1").unwrap().as_str(),
            "http://accounts:8080/api/accounts/1"
        );
        assert_eq!(
            client.resolve("http://other/x").unwrap().as_str(),
            "http://other/x"
        );
    }

    #[test]
    fn test_resolve_without_base_requires_absolute_url() {
        let client = Client::new(ReqwestTransport::new());
        assert!(matches!(
            client.resolve("accounts/1"),
            Err(Error::RequestConstruction(_))
        ));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            Client::builder().base_url("not a url"),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_builder_defaults_are_kept() {
        let client = Client::builder().retries(4).build().unwrap();
        assert_eq!(client.default_configurators().len(), 1);
        assert_eq!(client.codec().content_type(), crate::codec::JSON_API_MEDIA_TYPE);
    }
}
