//! Service root URL resolution from the environment.

use std::env;

/// Suffix appended to the upper-cased domain name.
pub const SERVICE_SUFFIX: &str = "_SERVICE_URL";

/// Fallback variable consulted when no domain-specific one is set.
pub const BASE_SERVICE: &str = "BASE_SERVICE_URL";

/// Returns the root URL for `domain`.
///
/// Reads `<UPPER(domain)>_SERVICE_URL`, falling back to `BASE_SERVICE_URL`, and finally
/// to an empty string.
///
/// # Examples
///
/// ```no_run
/// use courier::service_url::root_url;
///
/// // With ACCOUNTS_SERVICE_URL=http://accounts:8080/api/
/// let url = format!("{}accounts/42", root_url("accounts"));
/// ```
pub fn root_url(domain: &str) -> String {
    root_url_with(domain, |key| env::var(key).ok())
}

/// Same as [`root_url`] but reads variables through `lookup`.
pub fn root_url_with<F>(domain: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let key = format!("{}{}", domain.to_uppercase(), SERVICE_SUFFIX);
    if let Some(url) = lookup(&key) {
        return url;
    }
    tracing::debug!(key = %key, "Service URL not set, using base service URL");
    lookup(BASE_SERVICE).unwrap_or_default()
}
