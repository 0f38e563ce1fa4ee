//! The live provider-API source.
//!
//! One source covers every provider whose descriptor declares a listing
//! endpoint; the endpoint type selects the vendor client. The source is
//! stateless after `configure` and safe to clone per pipeline.

pub mod clients {
    pub mod anthropic;
    pub mod azure_openai;
    pub mod google;
    pub mod openai_compatible;
}

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::http_transport::{auth_for_provider, FetchStats, HttpClient};
use crate::starmap_catalog::store::Catalog;
use crate::starmap_core::error::Error;
use crate::starmap_source::{FieldAuthority, Source, SourceConfig, SourceType, SyncContext};
use crate::starmap_types::{EndpointType, Model, Provider};

pub const SOURCE_NAME: &str = "provider-api";

/// Fetches model listings straight from provider APIs.
#[derive(Clone, Default)]
pub struct ProviderApiSource {
    catalog: Option<Arc<Catalog>>,
    provider_filter: Option<String>,
    http: Option<HttpClient>,
    offline: bool,
}

impl ProviderApiSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn context_provider(&self, provider_id: &str) -> Option<Provider> {
        let catalog = self.catalog.as_ref()?;
        catalog.providers().resolve(provider_id).ok()
    }

    fn http(&self) -> Result<&HttpClient, Error> {
        self.http
            .as_ref()
            .ok_or_else(|| Error::config("provider-api source not configured"))
    }

    fn wrap(&self, provider_id: &str, err: Error) -> Error {
        match err {
            Error::Canceled | Error::Timeout(_) => err,
            other => Error::sync(SOURCE_NAME, Some(provider_id), other),
        }
    }

    /// Fetch the raw listing payload for a provider, with fetch statistics.
    /// `url_override` replaces the descriptor's endpoint URL when set.
    pub async fn fetch_raw_response(
        &self,
        ctx: &SyncContext,
        provider_id: &str,
        url_override: Option<&str>,
    ) -> Result<(Bytes, FetchStats), Error> {
        let provider = self
            .context_provider(provider_id)
            .ok_or_else(|| Error::not_found("provider", provider_id))?;
        let endpoint_url = match url_override {
            Some(url) => url.to_string(),
            None => provider
                .catalog
                .as_ref()
                .and_then(|c| c.endpoint.as_ref())
                .map(|e| e.url.clone())
                .ok_or_else(|| {
                    Error::config(format!("provider '{provider_id}' has no listing endpoint"))
                })?,
        };
        let auth = auth_for_provider(&provider)?;
        self.http()?
            .get(ctx, &endpoint_url, auth.as_ref())
            .await
            .map_err(|e| self.wrap(provider_id, e))
    }

    /// Parse a raw listing payload with the same dialect dispatch as
    /// `fetch_models`, so every endpoint type that can fetch can also parse.
    pub fn parse_raw_models(&self, provider: &Provider, body: &[u8]) -> Result<Vec<Model>, Error> {
        let Some(endpoint) = provider.catalog.as_ref().and_then(|c| c.endpoint.as_ref()) else {
            return Err(Error::config(format!(
                "provider '{}' has no listing endpoint",
                provider.id
            )));
        };
        match endpoint.kind {
            EndpointType::OpenaiCompatible => clients::openai_compatible::parse_models(provider, body),
            EndpointType::AnthropicNative => clients::anthropic::parse_models(provider, body),
            EndpointType::GoogleCloud => clients::google::parse_models(provider, body),
            EndpointType::AzureOpenai => clients::azure_openai::parse_models(provider, body),
        }
        .map_err(|e| self.wrap(&provider.id, e))
    }
}

#[async_trait]
impl Source for ProviderApiSource {
    fn source_type(&self) -> SourceType {
        SourceType::ProviderApi
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn priority(&self) -> i32 {
        10
    }

    fn configure(&mut self, config: &SourceConfig) -> Result<(), Error> {
        self.catalog = Some(Arc::clone(&config.catalog));
        self.provider_filter = config.provider_filter.clone();
        self.offline = config.offline;
        self.http = Some(HttpClient::new(Duration::from_secs(10))?);
        Ok(())
    }

    fn is_available(&self) -> bool {
        !self.offline && self.http.is_some()
    }

    fn clone_source(&self) -> Box<dyn Source> {
        Box::new(self.clone())
    }

    async fn fetch_provider(
        &self,
        _ctx: &SyncContext,
        _provider_id: &str,
    ) -> Result<Option<Provider>, Error> {
        // Listing APIs describe models, not the provider itself; the
        // descriptor lives in the catalog and the community dataset.
        Ok(None)
    }

    async fn fetch_models(
        &self,
        ctx: &SyncContext,
        provider_id: &str,
    ) -> Result<Vec<Model>, Error> {
        if let Some(filter) = &self.provider_filter {
            if !filter.eq_ignore_ascii_case(provider_id) {
                return Ok(Vec::new());
            }
        }
        let Some(provider) = self.context_provider(provider_id) else {
            return Ok(Vec::new());
        };
        let Some(endpoint) = provider.catalog.as_ref().and_then(|c| c.endpoint.as_ref()) else {
            return Ok(Vec::new());
        };

        let http = self.http()?;
        let result = match endpoint.kind {
            EndpointType::OpenaiCompatible => {
                clients::openai_compatible::fetch_models(http, ctx, &provider).await
            }
            EndpointType::AnthropicNative => {
                clients::anthropic::fetch_models(http, ctx, &provider).await
            }
            EndpointType::GoogleCloud => clients::google::fetch_models(http, ctx, &provider).await,
            EndpointType::AzureOpenai => {
                clients::azure_openai::fetch_models(http, ctx, &provider).await
            }
        };
        result.map_err(|e| self.wrap(provider_id, e))
    }

    fn field_authorities(&self) -> Vec<FieldAuthority> {
        vec![
            FieldAuthority::new("name", 0.9),
            FieldAuthority::new("description", 0.7),
            FieldAuthority::new("authors", 0.8),
        ]
    }
}

#[cfg(test)]
#[path = "../tests/api_source_tests.rs"]
mod api_source_tests;
