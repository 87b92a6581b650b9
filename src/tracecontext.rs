//! Distributed trace propagation over HTTP headers.
//!
//! Trace context travels through OpenTelemetry propagators. The caller side injects the
//! context of the current `tracing` span with [`current_span_header_decorator`], or an
//! explicit [`Context`] with [`span_header_decorator`]. The receiving side continues the
//! caller's trace with [`set_remote_parent`], or reads it with [`extract_context`].
//!
//! `tracing` spans only carry OpenTelemetry context when the subscriber includes a
//! `tracing_opentelemetry` layer. Without one there is nothing to inject.

use crate::header::{header_decorator, HeaderDecorator};
use http::{HeaderMap, HeaderName, HeaderValue};
use opentelemetry::propagation::{Extractor, Injector, TextMapPropagator};
use opentelemetry::trace::TraceContextExt;
use opentelemetry::Context;
use std::sync::Arc;
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub use opentelemetry_sdk::propagation::TraceContextPropagator;

/// Header carrying the W3C trace context.
pub const TRACEPARENT: &str = "traceparent";

/// A propagator shared by every decorator built from it.
pub type SharedPropagator = Arc<dyn TextMapPropagator + Send + Sync>;

/// The W3C trace context propagator, shared.
pub fn trace_context_propagator() -> SharedPropagator {
    Arc::new(TraceContextPropagator::new())
}

/// Lets a propagator write into a [`HeaderMap`].
pub struct HeaderInjector<'a>(pub &'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        match (HeaderName::try_from(key), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                self.0.insert(name, value);
            }
            _ => tracing::warn!(key, "Propagator produced an invalid header, skipping"),
        }
    }
}

/// Lets a propagator read from a [`HeaderMap`].
pub struct HeaderExtractor<'a>(pub &'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(HeaderName::as_str).collect()
    }
}

/// Injects `context` into outgoing headers through `propagator`.
///
/// A context without a valid span leaves the trace headers untouched.
///
/// # Examples
///
/// ```
/// use courier::header::decorate;
/// use courier::tracecontext::{span_header_decorator, trace_context_propagator};
/// use http::HeaderMap;
/// use opentelemetry::trace::{SpanContext, SpanId, TraceContextExt, TraceFlags, TraceId, TraceState};
/// use opentelemetry::Context;
///
/// let context = Context::new().with_remote_span_context(SpanContext::new(
///     TraceId::from_bytes(1u128.to_be_bytes()),
///     SpanId::from_bytes(2u64.to_be_bytes()),
///     TraceFlags::SAMPLED,
///     true,
///     TraceState::default(),
/// ));
/// let decorator = span_header_decorator(context, trace_context_propagator());
///
/// let mut headers = HeaderMap::new();
/// decorate(&mut headers, &[decorator]);
/// assert_eq!(
///     headers["traceparent"],
///     "00-00000000000000000000000000000001-0000000000000002-01"
/// );
/// ```
pub fn span_header_decorator(context: Context, propagator: SharedPropagator) -> HeaderDecorator {
    header_decorator(move |headers| {
        propagator.inject_context(&context, &mut HeaderInjector(headers));
    })
}

/// Injects the context of the current `tracing` span, captured now.
pub fn current_span_header_decorator(propagator: SharedPropagator) -> HeaderDecorator {
    let context = tracing::Span::current().context();
    if !context.span().span_context().is_valid() {
        tracing::debug!("No active trace context, trace headers will be omitted");
    }
    span_header_decorator(context, propagator)
}

/// Reads the caller's trace context from incoming headers.
pub fn extract_context(headers: &HeaderMap, propagator: &dyn TextMapPropagator) -> Context {
    propagator.extract(&HeaderExtractor(headers))
}

/// Makes `span` a child of the trace carried by `headers`.
///
/// Returns `false`, leaving `span` as it was, when the headers carry no valid context.
pub fn set_remote_parent(
    span: &tracing::Span,
    headers: &HeaderMap,
    propagator: &dyn TextMapPropagator,
) -> bool {
    let context = extract_context(headers, propagator);
    if !context.span().span_context().is_valid() {
        tracing::debug!("No trace context in incoming headers");
        return false;
    }
    span.set_parent(context);
    true
}
