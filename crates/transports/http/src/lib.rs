//! Thin HTTP fetch helper shared by all network sources.
//!
//! Wraps `reqwest` with the timeout/cancellation discipline of the sync
//! context and records fetch statistics (URL, status, payload size, latency,
//! content type, auth scheme) for raw-response inspection.

use std::time::{Duration, SystemTime};

use bytes::Bytes;

use crate::starmap_core::error::Error;
use crate::starmap_source::SyncContext;
use crate::starmap_types::{AuthStatus, EndpointType, Provider, ProviderApiKey};

/// How a request authenticated against the upstream API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthScheme {
    None,
    /// Key sent in a header (e.g., `Authorization`, `x-api-key`)
    Header(String),
    /// Key appended as a query parameter (e.g., `key` for Google)
    QueryParam(String),
}

impl AuthScheme {
    pub fn describe(&self) -> String {
        match self {
            AuthScheme::None => "none".to_string(),
            AuthScheme::Header(name) => format!("header:{name}"),
            AuthScheme::QueryParam(name) => format!("query:{name}"),
        }
    }
}

/// Statistics for one fetch, surfaced alongside raw responses.
#[derive(Debug, Clone)]
pub struct FetchStats {
    pub url: String,
    pub status: u16,
    pub bytes: usize,
    pub latency: Duration,
    pub content_type: Option<String>,
    pub auth: AuthScheme,
}

/// Credential material resolved for one request.
#[derive(Debug, Clone)]
pub struct RequestAuth {
    pub scheme: AuthScheme,
    /// The credential value (header value or query value)
    pub value: String,
}

/// Resolve request auth for a provider from its API-key descriptor and the
/// process environment. `Ok(None)` means the provider needs no credentials
/// or none are set; callers decide whether that skips the provider.
pub fn auth_for_provider(provider: &Provider) -> Result<Option<RequestAuth>, Error> {
    let Some(descriptor) = &provider.api_key else {
        return Ok(None);
    };
    descriptor.check_exclusive().map_err(Error::config)?;

    let Ok(raw) = std::env::var(&descriptor.name) else {
        return Ok(None);
    };
    let key = raw.trim();
    if key.is_empty() {
        return Ok(None);
    }
    Ok(Some(build_auth(descriptor, key)))
}

/// Observe how a provider authenticates in the current environment.
///
/// API-key providers report whether the env var is set and whether its
/// value matches the declared pattern; Google-cloud endpoints report the
/// ambient ADC/project/location configuration; endpoints that require auth
/// without a descriptor are `Unsupported`; everything else is `Optional`.
pub fn auth_status(provider: &Provider) -> AuthStatus {
    if let Some(descriptor) = &provider.api_key {
        return AuthStatus::from_api_key(descriptor);
    }
    match provider.catalog.as_ref().and_then(|c| c.endpoint.as_ref()) {
        Some(endpoint) if endpoint.kind == EndpointType::GoogleCloud => google_cloud_status(),
        Some(endpoint) if endpoint.auth_required => AuthStatus::Unsupported,
        _ => AuthStatus::Optional,
    }
}

fn google_cloud_status() -> AuthStatus {
    let adc_path = std::env::var("GOOGLE_APPLICATION_CREDENTIALS")
        .ok()
        .filter(|v| !v.trim().is_empty());
    let (project, project_source) = first_env(&["GOOGLE_CLOUD_PROJECT", "CLOUDSDK_CORE_PROJECT"]);
    let (location, location_source) =
        first_env(&["GOOGLE_CLOUD_LOCATION", "CLOUDSDK_COMPUTE_REGION"]);
    AuthStatus::GoogleCloud {
        kind: if adc_path.is_some() {
            "service-account".to_string()
        } else {
            "application-default".to_string()
        },
        account: None,
        project,
        project_source,
        location,
        location_source,
        adc_path,
        last_auth: None,
    }
}

fn first_env(names: &[&str]) -> (Option<String>, Option<String>) {
    for name in names {
        if let Ok(value) = std::env::var(name) {
            if !value.trim().is_empty() {
                return (Some(value), Some(name.to_string()));
            }
        }
    }
    (None, None)
}

fn build_auth(descriptor: &ProviderApiKey, key: &str) -> RequestAuth {
    if let Some(header) = &descriptor.header {
        let value = match &descriptor.scheme {
            Some(scheme) => format!("{scheme} {key}"),
            None => key.to_string(),
        };
        RequestAuth {
            scheme: AuthScheme::Header(header.clone()),
            value,
        }
    } else {
        let param = descriptor
            .query_param
            .clone()
            .unwrap_or_else(|| "key".to_string());
        RequestAuth {
            scheme: AuthScheme::QueryParam(param),
            value: key.to_string(),
        }
    }
}

/// HTTP client with the sync context's timeout and cancellation discipline.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    pub fn new(connect_timeout: Duration) -> Result<Self, Error> {
        let inner = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!("starmap/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::config(format!("http client: {e}")))?;
        Ok(Self { inner })
    }

    /// GET a URL with optional auth, honoring cancellation and the request
    /// budget derived from the caller's deadline.
    pub async fn get(
        &self,
        ctx: &SyncContext,
        url: &str,
        auth: Option<&RequestAuth>,
    ) -> Result<(Bytes, FetchStats), Error> {
        ctx.ensure_live()?;

        let parsed =
            url::Url::parse(url).map_err(|e| Error::config(format!("bad url {url}: {e}")))?;
        let mut request = self.inner.get(parsed);
        let scheme = match auth {
            Some(RequestAuth {
                scheme: AuthScheme::Header(name),
                value,
            }) => {
                request = request.header(name.as_str(), value.as_str());
                AuthScheme::Header(name.clone())
            }
            Some(RequestAuth {
                scheme: AuthScheme::QueryParam(name),
                value,
            }) => {
                request = request.query(&[(name.as_str(), value.as_str())]);
                AuthScheme::QueryParam(name.clone())
            }
            _ => AuthScheme::None,
        };

        let budget = ctx.request_budget();
        let started = SystemTime::now();

        let response = tokio::select! {
            _ = ctx.cancel.cancelled() => return Err(Error::Canceled),
            result = tokio::time::timeout(budget, request.send()) => match result {
                Err(_) => return Err(Error::Timeout(budget)),
                Ok(Err(e)) => {
                    return Err(Error::sync("http", None, e));
                }
                Ok(Ok(response)) => response,
            },
        };

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let final_url = response.url().to_string();

        let body = tokio::select! {
            _ = ctx.cancel.cancelled() => return Err(Error::Canceled),
            result = tokio::time::timeout(budget, response.bytes()) => match result {
                Err(_) => return Err(Error::Timeout(budget)),
                Ok(Err(e)) => return Err(Error::sync("http", None, e)),
                Ok(Ok(bytes)) => bytes,
            },
        };

        let latency = started.elapsed().unwrap_or_default();
        let stats = FetchStats {
            url: final_url,
            status,
            bytes: body.len(),
            latency,
            content_type,
            auth: scheme,
        };

        if !(200..300).contains(&status) {
            return Err(Error::sync(
                "http",
                None,
                std::io::Error::other(format!("http status {status} from {}", stats.url)),
            ));
        }

        tracing::debug!(
            url = %stats.url,
            status,
            bytes = stats.bytes,
            latency_ms = latency.as_millis() as u64,
            "fetched"
        );
        Ok((body, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::starmap_types::Provider;

    #[test]
    fn header_auth_includes_scheme_prefix() {
        let descriptor = ProviderApiKey {
            name: "X".into(),
            header: Some("Authorization".into()),
            query_param: None,
            scheme: Some("Bearer".into()),
            pattern: None,
        };
        let auth = build_auth(&descriptor, "secret");
        assert_eq!(auth.scheme, AuthScheme::Header("Authorization".into()));
        assert_eq!(auth.value, "Bearer secret");
    }

    #[test]
    fn query_auth_carries_raw_key() {
        let descriptor = ProviderApiKey {
            name: "X".into(),
            header: None,
            query_param: Some("key".into()),
            scheme: None,
            pattern: None,
        };
        let auth = build_auth(&descriptor, "secret");
        assert_eq!(auth.scheme, AuthScheme::QueryParam("key".into()));
        assert_eq!(auth.value, "secret");
    }

    #[test]
    fn providers_without_descriptor_need_no_auth() {
        let provider = Provider::new("p", "P");
        assert!(auth_for_provider(&provider).unwrap().is_none());
    }

    #[test]
    fn auth_status_variants_cover_the_descriptor_space() {
        use crate::starmap_types::{CatalogEndpoint, ProviderCatalogConfig};

        // API-key descriptor with an env var nothing sets.
        let mut keyed = Provider::new("keyed", "Keyed");
        keyed.api_key = Some(ProviderApiKey {
            name: "STARMAP_TEST_UNSET_KEY".into(),
            header: Some("Authorization".into()),
            ..Default::default()
        });
        assert!(matches!(
            auth_status(&keyed),
            AuthStatus::ApiKey { set: false, .. }
        ));

        // Google-cloud endpoint without a key descriptor.
        let mut gcp = Provider::new("vertex", "Vertex");
        gcp.catalog = Some(ProviderCatalogConfig {
            endpoint: Some(CatalogEndpoint {
                url: "https://aiplatform.googleapis.com/v1".into(),
                kind: EndpointType::GoogleCloud,
                auth_required: true,
            }),
            ..Default::default()
        });
        assert!(matches!(auth_status(&gcp), AuthStatus::GoogleCloud { .. }));

        // Auth required, no way to supply it.
        let mut locked = Provider::new("locked", "Locked");
        locked.catalog = Some(ProviderCatalogConfig {
            endpoint: Some(CatalogEndpoint {
                url: "https://example.invalid/v1/models".into(),
                kind: EndpointType::OpenaiCompatible,
                auth_required: true,
            }),
            ..Default::default()
        });
        assert!(matches!(auth_status(&locked), AuthStatus::Unsupported));

        // No endpoint at all.
        assert!(matches!(
            auth_status(&Provider::new("open", "Open")),
            AuthStatus::Optional
        ));
    }

    #[test]
    fn incoherent_descriptor_is_a_config_error() {
        let mut provider = Provider::new("p", "P");
        provider.api_key = Some(ProviderApiKey {
            name: "BOTH_SET".into(),
            header: Some("Authorization".into()),
            query_param: Some("key".into()),
            scheme: None,
            pattern: None,
        });
        assert!(matches!(
            auth_for_provider(&provider),
            Err(Error::Config { .. })
        ));
    }
}
