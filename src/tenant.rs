//! Tenant identity carried between services in request headers.
//!
//! The calling side attaches the tenant with [`tenant_header_decorator`]. The receiving
//! side validates the same four headers with [`Tenant::from_headers`] or
//! [`parse_tenant`], which also stores the tenant in the request extensions for
//! downstream handlers.
//!
//! Versions travel as decimal strings (`"83"`, `"1"`).

use crate::header::{header_decorator, HeaderDecorator, JSON_CONTENT_TYPE};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, StatusCode};
use uuid::Uuid;

/// Header carrying the tenant id.
pub const ID: &str = "tenant_id";
/// Header carrying the tenant region.
pub const REGION: &str = "region";
/// Header carrying the major version.
pub const MAJOR_VERSION: &str = "major_version";
/// Header carrying the minor version.
pub const MINOR_VERSION: &str = "minor_version";

/// A validated tenant identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tenant {
    id: Uuid,
    region: String,
    major_version: u16,
    minor_version: u16,
}

impl Tenant {
    /// Creates a tenant. The region must not be empty.
    pub fn new(
        id: Uuid,
        region: impl Into<String>,
        major_version: u16,
        minor_version: u16,
    ) -> Result<Self, TenantError> {
        let region = region.into();
        if region.is_empty() {
            return Err(TenantError::Missing(REGION));
        }
        Ok(Self {
            id,
            region,
            major_version,
            minor_version,
        })
    }

    /// The tenant identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The region the tenant lives in, such as `GMS`.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Major version the tenant runs.
    pub fn major_version(&self) -> u16 {
        self.major_version
    }

    /// Minor version the tenant runs.
    pub fn minor_version(&self) -> u16 {
        self.minor_version
    }

    /// Reads and validates the four tenant headers.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, TenantError> {
        let id = required(headers, ID)?;
        let id = Uuid::parse_str(id).map_err(|_| TenantError::Malformed(ID))?;

        let region = required(headers, REGION)?;

        let major_version = required(headers, MAJOR_VERSION)?
            .parse::<u16>()
            .map_err(|_| TenantError::Malformed(MAJOR_VERSION))?;
        let minor_version = required(headers, MINOR_VERSION)?
            .parse::<u16>()
            .map_err(|_| TenantError::Malformed(MINOR_VERSION))?;

        Tenant::new(id, region, major_version, minor_version)
    }

    /// Returns the tenant previously stored by [`parse_tenant`].
    pub fn from_extensions(extensions: &http::Extensions) -> Option<&Tenant> {
        extensions.get::<Tenant>()
    }

    fn write_headers(&self, headers: &mut HeaderMap) {
        let values = [
            (ID, self.id.to_string()),
            (REGION, self.region.clone()),
            (MAJOR_VERSION, self.major_version.to_string()),
            (MINOR_VERSION, self.minor_version.to_string()),
        ];
        for (name, value) in values {
            match HeaderValue::try_from(value) {
                Ok(value) => {
                    headers.insert(name, value);
                }
                Err(_) => tracing::warn!(header = name, "Tenant value is not a valid header"),
            }
        }
    }
}

fn required<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, TenantError> {
    let value = headers
        .get(name)
        .ok_or(TenantError::Missing(name))?
        .to_str()
        .map_err(|_| TenantError::Malformed(name))?;
    if value.is_empty() {
        return Err(TenantError::Missing(name));
    }
    Ok(value)
}

/// Why incoming tenant headers were rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TenantError {
    /// A required header is absent or empty.
    #[error("{0} is not supplied")]
    Missing(&'static str),

    /// A header is present but cannot be parsed.
    #[error("{0} is malformed")]
    Malformed(&'static str),
}

impl TenantError {
    /// The status a server should answer with.
    pub fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

/// Sets the content type and, when a tenant is present, the four tenant headers.
///
/// # Examples
///
/// ```
/// use courier::header::decorate;
/// use courier::tenant::{tenant_header_decorator, Tenant};
/// use http::HeaderMap;
/// use uuid::Uuid;
///
/// let tenant = Tenant::new(Uuid::new_v4(), "GMS", 83, 1).unwrap();
///
/// let mut headers = HeaderMap::new();
/// decorate(&mut headers, &[tenant_header_decorator(Some(tenant.clone()))]);
///
/// assert_eq!(Tenant::from_headers(&headers).unwrap(), tenant);
/// ```
pub fn tenant_header_decorator(tenant: Option<Tenant>) -> HeaderDecorator {
    header_decorator(move |headers| {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));

        let Some(tenant) = &tenant else {
            tracing::debug!("No tenant available, skipping tenant headers");
            return;
        };
        tenant.write_headers(headers);
    })
}

/// Validates the tenant headers of an incoming request and stores the tenant in its
/// extensions.
///
/// On failure the request is left untouched and the caller should answer with
/// [`TenantError::status`].
pub fn parse_tenant<B>(request: &mut http::Request<B>) -> Result<Tenant, TenantError> {
    let tenant = match Tenant::from_headers(request.headers()) {
        Ok(tenant) => tenant,
        Err(err) => {
            tracing::error!(error = %err, "Rejecting request with invalid tenant");
            return Err(err);
        }
    };

    let version = format!("{}.{}", tenant.major_version, tenant.minor_version);
    tracing::debug!(
        tenant = %tenant.id,
        region = %tenant.region,
        version = %version,
        "Parsed tenant"
    );
    request.extensions_mut().insert(tenant.clone());
    Ok(tenant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::decorate;

    fn tenant() -> Tenant {
        Tenant::new(Uuid::new_v4(), "GMS", 83, 1).unwrap()
    }

    fn headers_for(tenant: Option<Tenant>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        decorate(&mut headers, &[tenant_header_decorator(tenant)]);
        headers
    }

    #[test]
    fn test_decorator_sets_all_headers() {
        let tenant = tenant();
        let headers = headers_for(Some(tenant.clone()));

        assert_eq!(headers[ID], tenant.id().to_string().as_str());
        assert_eq!(headers[REGION], "GMS");
        assert_eq!(headers[MAJOR_VERSION], "83");
        assert_eq!(headers[MINOR_VERSION], "1");
        assert_eq!(headers[CONTENT_TYPE], JSON_CONTENT_TYPE);
    }

    #[test]
    fn test_missing_tenant_only_sets_content_type() {
        let headers = headers_for(None);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[CONTENT_TYPE], JSON_CONTENT_TYPE);
    }

    #[test]
    fn test_parse_tenant_stores_extension() {
        let tenant = tenant();
        let mut request = http::Request::builder()
            .uri("http://localhost/accounts")
            .body(())
            .unwrap();
        *request.headers_mut() = headers_for(Some(tenant.clone()));

        let parsed = parse_tenant(&mut request).unwrap();
        assert_eq!(parsed, tenant);
        assert_eq!(Tenant::from_extensions(request.extensions()), Some(&tenant));
    }

    #[test]
    fn test_rejects_each_missing_header() {
        for name in [ID, REGION, MAJOR_VERSION, MINOR_VERSION] {
            let mut headers = headers_for(Some(tenant()));
            headers.remove(name);

            let err = Tenant::from_headers(&headers).unwrap_err();
            assert_eq!(err, TenantError::Missing(name));
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_rejects_malformed_values() {
        let cases = [
            (ID, "not-a-uuid"),
            (MAJOR_VERSION, "eighty-three"),
            (MINOR_VERSION, "70000"),
        ];
        for (name, value) in cases {
            let mut headers = headers_for(Some(tenant()));
            headers.insert(name, HeaderValue::from_static(value));
            assert_eq!(
                Tenant::from_headers(&headers).unwrap_err(),
                TenantError::Malformed(name)
            );
        }
    }

    #[test]
    fn test_parse_failure_leaves_extensions_empty() {
        let mut request = http::Request::builder()
            .uri("http://localhost/accounts")
            .body(())
            .unwrap();

        assert!(parse_tenant(&mut request).is_err());
        assert!(Tenant::from_extensions(request.extensions()).is_none());
    }

    #[test]
    fn test_empty_region_rejected() {
        assert_eq!(
            Tenant::new(Uuid::new_v4(), "", 1, 0).unwrap_err(),
            TenantError::Missing(REGION)
        );
    }
}
