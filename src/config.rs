//! Per-call request configuration.
//!
//! A [`Configuration`] starts from its defaults (one attempt, no backoff, no decorators)
//! and is shaped by a sequence of [`Configurator`]s applied in order. Retry settings are
//! last-write-wins; header decorators accumulate.

use crate::header::HeaderDecorator;
use crate::retry::Backoff;
use std::fmt;
use std::sync::Arc;

/// Settings used for a single execution of a typed request.
#[derive(Clone)]
pub struct Configuration {
    retries: usize,
    backoff: Backoff,
    header_decorators: Vec<HeaderDecorator>,
}

impl Configuration {
    /// Builds a configuration by applying `configurators` in order to the defaults.
    pub fn from_configurators<'a, I>(configurators: I) -> Self
    where
        I: IntoIterator<Item = &'a Configurator>,
    {
        let mut configuration = Self::default();
        for configurator in configurators {
            configurator(&mut configuration);
        }
        configuration
    }

    /// Total number of attempts, always at least 1.
    pub fn retries(&self) -> usize {
        self.retries
    }

    /// Delay inserted between attempts.
    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Header decorators in the order they will be applied.
    pub fn header_decorators(&self) -> &[HeaderDecorator] {
        &self.header_decorators
    }

    /// Sets the attempt count; values below 1 become 1.
    pub fn set_retries(&mut self, retries: usize) {
        self.retries = retries.max(1);
    }

    /// Sets the backoff between attempts.
    pub fn set_backoff(&mut self, backoff: Backoff) {
        self.backoff = backoff;
    }

    /// Appends a header decorator.
    pub fn add_header_decorator(&mut self, decorator: HeaderDecorator) {
        self.header_decorators.push(decorator);
    }

    /// Replaces all header decorators with a single one.
    pub fn set_header_decorator(&mut self, decorator: HeaderDecorator) {
        self.header_decorators.clear();
        self.header_decorators.push(decorator);
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            retries: 1,
            backoff: Backoff::None,
            header_decorators: Vec::new(),
        }
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("retries", &self.retries)
            .field("backoff", &self.backoff)
            .field("header_decorators", &self.header_decorators.len())
            .finish()
    }
}

/// A mutation applied to a [`Configuration`] before a request executes.
///
/// Configurators are shared so the same request can be executed many times.
pub type Configurator = Arc<dyn Fn(&mut Configuration) + Send + Sync>;

/// Sets the total number of attempts.
///
/// # Examples
///
/// ```
/// use courier::config::{set_retries, Configuration};
///
/// let configuration = Configuration::from_configurators(&[set_retries(3)]);
/// assert_eq!(configuration.retries(), 3);
/// ```
pub fn set_retries(retries: usize) -> Configurator {
    Arc::new(move |c| c.set_retries(retries))
}

/// Sets the backoff between attempts.
pub fn set_backoff(backoff: Backoff) -> Configurator {
    Arc::new(move |c| c.set_backoff(backoff.clone()))
}

/// Appends a header decorator.
pub fn add_header_decorator(decorator: HeaderDecorator) -> Configurator {
    Arc::new(move |c| c.add_header_decorator(decorator.clone()))
}

/// Replaces every previously registered header decorator with `decorator`.
pub fn set_header_decorator(decorator: HeaderDecorator) -> Configurator {
    Arc::new(move |c| c.set_header_decorator(decorator.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{decorate, static_header};
    use http::HeaderMap;
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let configuration = Configuration::default();
        assert_eq!(configuration.retries(), 1);
        assert_eq!(configuration.backoff(), &Backoff::None);
        assert!(configuration.header_decorators().is_empty());
    }

    #[test]
    fn test_retries_last_write_wins() {
        let configuration = Configuration::from_configurators(&[set_retries(5), set_retries(2)]);
        assert_eq!(configuration.retries(), 2);
    }

    #[test]
    fn test_retries_never_below_one() {
        let configuration = Configuration::from_configurators(&[set_retries(0)]);
        assert_eq!(configuration.retries(), 1);
    }

    #[test]
    fn test_decorators_accumulate_in_order() {
        let configuration = Configuration::from_configurators(&[
            add_header_decorator(static_header("x-first", "1")),
            set_retries(3),
            add_header_decorator(static_header("x-second", "2")),
        ]);
        assert_eq!(configuration.header_decorators().len(), 2);

        let mut headers = HeaderMap::new();
        decorate(&mut headers, configuration.header_decorators());
        assert_eq!(headers["x-first"], "1");
        assert_eq!(headers["x-second"], "2");
    }

    #[test]
    fn test_set_header_decorator_replaces() {
        let configuration = Configuration::from_configurators(&[
            add_header_decorator(static_header("x-first", "1")),
            set_header_decorator(static_header("x-only", "yes")),
        ]);

        let mut headers = HeaderMap::new();
        decorate(&mut headers, configuration.header_decorators());
        assert!(headers.get("x-first").is_none());
        assert_eq!(headers["x-only"], "yes");
    }

    #[test]
    fn test_set_backoff() {
        let backoff = Backoff::Linear {
            delay: Duration::from_millis(5),
        };
        let configuration = Configuration::from_configurators(&[set_backoff(backoff.clone())]);
        assert_eq!(configuration.backoff(), &backoff);
    }
}
