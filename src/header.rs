//! Header decorators applied to every outgoing request.
//!
//! A decorator mutates the header map in place right before the request is sent.
//! Decorators run in registration order, so for a shared header name the last one wins.

use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;

/// Content type set by [`content_type_json`] and the tenant decorator.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// A function mutating outgoing request headers.
pub type HeaderDecorator = Arc<dyn Fn(&mut HeaderMap) + Send + Sync>;

/// Wraps a closure as a [`HeaderDecorator`].
///
/// # Examples
///
/// ```
/// use courier::header::{decorate, header_decorator};
/// use http::HeaderMap;
///
/// let decorator = header_decorator(|headers| {
///     headers.insert("x-request-source", "billing".parse().unwrap());
/// });
///
/// let mut headers = HeaderMap::new();
/// decorate(&mut headers, &[decorator]);
/// assert_eq!(headers["x-request-source"], "billing");
/// ```
pub fn header_decorator<F>(f: F) -> HeaderDecorator
where
    F: Fn(&mut HeaderMap) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Applies every decorator, in order, to the same header map.
pub fn decorate(headers: &mut HeaderMap, decorators: &[HeaderDecorator]) {
    for decorator in decorators {
        decorator(headers);
    }
}

/// Sets a single header to a fixed value.
///
/// An invalid name or value leaves the headers untouched.
pub fn static_header(name: impl AsRef<str>, value: impl AsRef<str>) -> HeaderDecorator {
    let name = HeaderName::try_from(name.as_ref());
    let value = HeaderValue::try_from(value.as_ref());
    match (name, value) {
        (Ok(name), Ok(value)) => header_decorator(move |headers| {
            headers.insert(name.clone(), value.clone());
        }),
        _ => {
            tracing::warn!("Ignoring invalid static header");
            header_decorator(|_| {})
        }
    }
}

/// Sets `Authorization: Bearer <token>`.
pub fn bearer_auth(token: impl AsRef<str>) -> HeaderDecorator {
    match HeaderValue::try_from(format!("Bearer {}", token.as_ref())) {
        Ok(mut value) => {
            value.set_sensitive(true);
            header_decorator(move |headers| {
                headers.insert(AUTHORIZATION, value.clone());
            })
        }
        Err(_) => {
            tracing::warn!("Ignoring bearer token that is not a valid header value");
            header_decorator(|_| {})
        }
    }
}

/// Sets `Content-Type: application/json; charset=utf-8`.
pub fn content_type_json() -> HeaderDecorator {
    header_decorator(|headers| {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    })
}
