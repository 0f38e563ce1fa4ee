//! The embedded baseline as a source.
//!
//! The curated YAML files compiled into the binary participate in the merge
//! like any other source, so provider descriptors (API keys, endpoints,
//! aliases) and the author roster carry provenance and survive syncs.

use std::sync::Arc;

use async_trait::async_trait;

use crate::starmap_catalog::embedded;
use crate::starmap_catalog::store::Catalog;
use crate::starmap_core::error::Error;
use crate::starmap_source::{FieldAuthority, Source, SourceConfig, SourceType, SyncContext};
use crate::starmap_types::{Author, Model, Provider};

pub const SOURCE_NAME: &str = "embedded";

/// Serves the compiled-in catalog files.
#[derive(Clone, Default)]
pub struct EmbeddedSource {
    baseline: Option<Arc<Catalog>>,
}

impl EmbeddedSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn baseline(&self) -> Result<&Arc<Catalog>, Error> {
        self.baseline
            .as_ref()
            .ok_or_else(|| Error::config("embedded source not configured"))
    }
}

#[async_trait]
impl Source for EmbeddedSource {
    fn source_type(&self) -> SourceType {
        SourceType::Embedded
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn priority(&self) -> i32 {
        1
    }

    fn configure(&mut self, _config: &SourceConfig) -> Result<(), Error> {
        self.baseline = Some(Arc::new(embedded::load()?));
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.baseline.is_some()
    }

    fn clone_source(&self) -> Box<dyn Source> {
        Box::new(self.clone())
    }

    async fn fetch_provider(
        &self,
        ctx: &SyncContext,
        provider_id: &str,
    ) -> Result<Option<Provider>, Error> {
        ctx.ensure_live()?;
        match self.baseline()?.provider(provider_id) {
            Ok(mut provider) => {
                // Models travel through fetch_models.
                provider.models.clear();
                Ok(Some(provider))
            }
            Err(Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn fetch_models(
        &self,
        ctx: &SyncContext,
        provider_id: &str,
    ) -> Result<Vec<Model>, Error> {
        ctx.ensure_live()?;
        match self.baseline()?.provider(provider_id) {
            Ok(provider) => Ok(provider.models.into_values().collect()),
            Err(Error::NotFound { .. }) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    async fn fetch_authors(&self, ctx: &SyncContext) -> Result<Vec<Author>, Error> {
        ctx.ensure_live()?;
        Ok(self.baseline()?.authors().list())
    }

    fn field_authorities(&self) -> Vec<FieldAuthority> {
        vec![
            FieldAuthority::new("api_key.*", 0.95),
            FieldAuthority::new("catalog.*", 0.9),
            FieldAuthority::new("aliases", 0.9),
            FieldAuthority::new("headquarters", 0.8),
            FieldAuthority::new("status_page_url", 0.8),
            FieldAuthority::new("features.streaming", 0.8),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn ctx() -> SyncContext {
        SyncContext::new(CancellationToken::new(), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn serves_descriptors_models_and_authors() {
        let mut source = EmbeddedSource::new();
        source
            .configure(&SourceConfig::new(Arc::new(Catalog::empty())))
            .unwrap();
        assert!(source.is_available());

        let provider = source
            .fetch_provider(&ctx(), "openai")
            .await
            .unwrap()
            .unwrap();
        assert!(provider.api_key.is_some());
        assert!(provider.models.is_empty());

        let models = source.fetch_models(&ctx(), "openai").await.unwrap();
        assert!(!models.is_empty());

        let authors = source.fetch_authors(&ctx()).await.unwrap();
        assert!(authors.iter().any(|a| a.id == "anthropic"));
    }

    #[tokio::test]
    async fn unknown_provider_is_absence() {
        let mut source = EmbeddedSource::new();
        source
            .configure(&SourceConfig::new(Arc::new(Catalog::empty())))
            .unwrap();
        assert!(source
            .fetch_provider(&ctx(), "not-a-provider")
            .await
            .unwrap()
            .is_none());
    }
}
