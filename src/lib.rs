//! # Courier - retried, typed HTTP calls as lazy providers
//!
//! Courier builds HTTP calls that are retried on transport failures, decorated with
//! headers (auth, tracing, tenant), encoded as JSON:API documents, and decoded into a
//! declared type. Calls are deferred values: nothing is sent until they are awaited, and
//! they can be wrapped in [`Provider`]s that map and filter the result lazily.
//!
//! ## Quick Start
//!
//! ```no_run
//! use courier::codec::Resource;
//! use courier::config::{add_header_decorator, set_retries};
//! use courier::provider::provider;
//! use courier::tenant::{tenant_header_decorator, Tenant};
//! use courier::{Client, Error};
//! use serde::{Deserialize, Serialize};
//! use uuid::Uuid;
//!
//! #[derive(Serialize, Deserialize)]
//! struct AccountAttributes {
//!     name: String,
//! }
//!
//! struct Account {
//!     id: String,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let client = Client::builder()
//!         .base_url("http://accounts:8080/api/")?
//!         .build()?;
//!
//!     let tenant = Tenant::new(Uuid::new_v4(), "GMS", 83, 1).ok();
//!
//!     let request = client
//!         .get::<Resource<AccountAttributes>>("accounts/1")
//!         .configure(set_retries(3))
//!         .configure(add_header_decorator(tenant_header_decorator(tenant)));
//!
//!     let account = provider(request, |r: Resource<AccountAttributes>| {
//!         Ok(Account {
//!             id: r.id.unwrap_or_default(),
//!             name: r.attributes.name,
//!         })
//!     });
//!
//!     // Each call to `get` issues the request again.
//!     let account = account.get().await?;
//!     println!("{} is {}", account.id, account.name);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! ```no_run
//! use courier::{Client, Error};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = Client::builder().build()?;
//! match client.get::<serde_json::Value>("http://accounts:8080/api/accounts/1").execute().await {
//!     Ok(value) => println!("Success: {:?}", value),
//!     Err(Error::NotFound) => println!("No such account"),
//!     Err(Error::BadRequest) => println!("Rejected"),
//!     Err(Error::Transport(e)) => eprintln!("Unreachable after retries: {}", e),
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//!
//! Every stage logs through `tracing` (`debug` per attempt, `warn` on a failed attempt,
//! `error` when a call gives up or a body cannot be decoded). Install any subscriber to
//! see them. Adding a `tracing_opentelemetry` layer also lets
//! [`tracecontext::current_span_header_decorator`] propagate the active span.

mod client;
pub mod codec;
pub mod config;
mod error;
pub mod header;
pub mod provider;
mod request;
mod response;
pub mod retry;
pub mod service_url;
pub mod tenant;
pub mod tracecontext;
pub mod transport;

pub use client::{Client, ClientBuilder};
pub use error::{Error, Result};
pub use provider::{provider, slice_provider, Provider};
pub use request::Request;
pub use response::Response;
pub use transport::{ReqwestTransport, Transport, TransportError};
