//! Lazy, composable providers over typed requests.
//!
//! A [`Provider`] is a zero-argument deferred computation yielding a value or an error.
//! It is evaluated on every [`Provider::get`] and never caches, so a provider built from a
//! request re-issues the call each time. Composition with [`Provider::map`],
//! [`Provider::slice_map`] and [`Provider::filter`] stays lazy; to transform the same
//! result several ways without re-fetching, [`Provider::materialize`] it first.
//!
//! # Examples
//!
//! ```no_run
//! use courier::codec::Resource;
//! use courier::provider::{filter, slice_provider};
//! use courier::{Client, Error};
//! use serde::Deserialize;
//!
//! #[derive(Clone, Deserialize)]
//! struct AccountAttributes {
//!     name: String,
//!     active: bool,
//! }
//!
//! #[derive(Clone)]
//! struct Account {
//!     id: u32,
//!     name: String,
//!     active: bool,
//! }
//!
//! fn account(resource: Resource<AccountAttributes>) -> Result<Account, Error> {
//!     let id = resource
//!         .id
//!         .as_deref()
//!         .unwrap_or_default()
//!         .parse()
//!         .map_err(Error::transform)?;
//!     Ok(Account {
//!         id,
//!         name: resource.attributes.name,
//!         active: resource.attributes.active,
//!     })
//! }
//!
//! # async fn example() -> Result<(), Error> {
//! let client = Client::builder().build()?;
//! let request = client.get("http://accounts:8080/api/accounts");
//!
//! let active = slice_provider(request, account, vec![filter(|a: &Account| a.active)]);
//!
//! // Fetch once, then derive several views without another call.
//! let accounts = active.materialize().await;
//! let names = accounts.clone().slice_map(|a| Ok(a.name)).get().await?;
//! let first = accounts.first().get().await?;
//! # Ok(())
//! # }
//! ```

use crate::{request::Request, Error, Result};
use serde::de::DeserializeOwned;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Type alias for a boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Keeps a model when it returns `true`.
pub type Filter<M> = Arc<dyn Fn(&M) -> bool + Send + Sync>;

/// Wraps a closure as a [`Filter`].
pub fn filter<M, F>(f: F) -> Filter<M>
where
    F: Fn(&M) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A lazily evaluated, uncached value or error.
pub struct Provider<M> {
    inner: Arc<dyn Fn() -> BoxFuture<'static, Result<M>> + Send + Sync>,
}

impl<M> Clone for Provider<M> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<M> fmt::Debug for Provider<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider").finish_non_exhaustive()
    }
}

impl<M> Provider<M>
where
    M: Send + 'static,
{
    /// Wraps a function producing a fresh future on every evaluation.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<M>> + Send + 'static,
    {
        Self {
            inner: Arc::new(move || Box::pin(f()) as BoxFuture<'static, Result<M>>),
        }
    }

    /// A provider that always yields a clone of `value`.
    pub fn fixed(value: M) -> Self
    where
        M: Clone + Sync,
    {
        Self::new(move || {
            let value = value.clone();
            async move { Ok(value) }
        })
    }

    /// A provider that always fails with `error`.
    pub fn error(error: Error) -> Self {
        Self::new(move || {
            let error = error.clone();
            async move { Err(error) }
        })
    }

    /// A provider replaying an already computed result.
    pub fn from_result(result: Result<M>) -> Self
    where
        M: Clone + Sync,
    {
        match result {
            Ok(value) => Self::fixed(value),
            Err(error) => Self::error(error),
        }
    }

    /// Evaluates the provider.
    pub async fn get(&self) -> Result<M> {
        (self.inner)().await
    }

    /// Evaluates once and returns a provider replaying that result.
    ///
    /// Providers derived from the returned one never re-run the original computation.
    pub async fn materialize(&self) -> Provider<M>
    where
        M: Clone + Sync,
    {
        Provider::from_result(self.get().await)
    }

    /// Pipes the value through `transform`; errors short-circuit and skip the transform.
    pub fn map<N, T>(self, transform: T) -> Provider<N>
    where
        N: Send + 'static,
        T: Fn(M) -> Result<N> + Send + Sync + 'static,
    {
        let transform = Arc::new(transform);
        Provider::new(move || {
            let source = self.clone();
            let transform = transform.clone();
            async move { transform(source.get().await?) }
        })
    }
}

impl<M> Provider<Vec<M>>
where
    M: Send + 'static,
{
    /// Transforms every element, failing as a whole if any element fails.
    pub fn slice_map<N, T>(self, transform: T) -> Provider<Vec<N>>
    where
        N: Send + 'static,
        T: Fn(M) -> Result<N> + Send + Sync + 'static,
    {
        self.map(move |items| items.into_iter().map(&transform).collect::<Result<Vec<N>>>())
    }

    /// Keeps the elements passing every filter, in order.
    pub fn filter(self, filters: Vec<Filter<M>>) -> Provider<Vec<M>> {
        if filters.is_empty() {
            return self;
        }
        self.map(move |items| {
            Ok(items
                .into_iter()
                .filter(|item| filters.iter().all(|f| f(item)))
                .collect())
        })
    }

    /// Yields the first element, or [`Error::NotFound`] when there is none.
    pub fn first(self) -> Provider<M> {
        self.map(|items| items.into_iter().next().ok_or(Error::NotFound))
    }
}

/// Builds a provider that executes `request` and transforms its value.
///
/// The transform is not invoked when the request fails.
pub fn provider<A, M, T>(request: Request<A>, transform: T) -> Provider<M>
where
    A: DeserializeOwned + Send + 'static,
    M: Send + 'static,
    T: Fn(A) -> Result<M> + Send + Sync + 'static,
{
    request_provider(request).map(transform)
}

/// Builds a provider that executes a collection request, transforms each element and
/// keeps those passing every filter.
///
/// If any element fails to transform, the whole provider fails and no partial result is
/// returned.
pub fn slice_provider<A, M, T>(
    request: Request<Vec<A>>,
    transform: T,
    filters: Vec<Filter<M>>,
) -> Provider<Vec<M>>
where
    A: DeserializeOwned + Send + 'static,
    M: Send + 'static,
    T: Fn(A) -> Result<M> + Send + Sync + 'static,
{
    request_provider(request).slice_map(transform).filter(filters)
}

fn request_provider<A>(request: Request<A>) -> Provider<A>
where
    A: DeserializeOwned + Send + 'static,
{
    Provider::new(move || {
        let request = request.clone();
        async move { request.execute().await }
    })
}
