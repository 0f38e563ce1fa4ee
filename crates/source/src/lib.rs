//! The source contract and the process-wide source registry.
//!
//! A source is a pluggable producer of partial catalog data: a live provider
//! API, the community dataset, a git checkout. The registry is populated
//! during initialization and read-only afterwards; pipelines clone each
//! registered source so no run shares mutable state with another.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::sync::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::starmap_catalog::store::Catalog;
use crate::starmap_core::error::Error;
use crate::starmap_types::{Author, Model, Provider};

/// Kinds of sources. Registration is keyed by this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceType {
    /// The embedded baseline catalog shipped with the binary
    Embedded,
    /// Live provider listing APIs
    ProviderApi,
    /// models.dev HTTP dataset (with cache + embedded fallback)
    ModelsDevHttp,
    /// models.dev git checkout (provider logos)
    ModelsDevGit,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Embedded => "embedded",
            SourceType::ProviderApi => "provider-api",
            SourceType::ModelsDevHttp => "models-dev-http",
            SourceType::ModelsDevGit => "models-dev-git",
        }
    }
}

/// A field (pattern) a source claims authority over, and how strongly.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldAuthority {
    pub field: String,
    pub score: f64,
}

impl FieldAuthority {
    pub fn new(field: impl Into<String>, score: f64) -> Self {
        Self {
            field: field.into(),
            score,
        }
    }
}

/// Per-pipeline configuration handed to every cloned source.
#[derive(Clone)]
pub struct SourceConfig {
    /// The catalog the pipeline is syncing, for context (endpoints,
    /// author mappings, provider descriptors).
    pub catalog: Arc<Catalog>,
    /// Restrict the sync to a single provider id (or alias)
    pub provider_filter: Option<String>,
    /// Per-request timeout sources should apply to network calls
    pub request_timeout: Duration,
    /// Override for on-disk cache location (tests point this at a tempdir)
    pub cache_dir: Option<PathBuf>,
    /// Whether network access is allowed at all this run
    pub offline: bool,
}

impl SourceConfig {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            provider_filter: None,
            request_timeout: Duration::from_secs(30),
            cache_dir: None,
            offline: false,
        }
    }
}

/// Cancellation and deadline context threaded through every fetch.
#[derive(Debug, Clone)]
pub struct SyncContext {
    pub cancel: CancellationToken,
    /// Top-level deadline for the whole pipeline run
    pub deadline: Option<Instant>,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl SyncContext {
    pub fn new(cancel: CancellationToken, request_timeout: Duration) -> Self {
        Self {
            cancel,
            deadline: None,
            request_timeout,
        }
    }

    /// Error out early if the run is already canceled or past its deadline.
    pub fn ensure_live(&self) -> Result<(), Error> {
        if self.cancel.is_cancelled() {
            return Err(Error::Canceled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(Error::Timeout(self.request_timeout));
            }
        }
        Ok(())
    }

    /// The timeout budget for the next request: the per-request timeout,
    /// clipped to whatever remains of the top-level deadline.
    pub fn request_budget(&self) -> Duration {
        match self.deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                self.request_timeout.min(remaining)
            }
            None => self.request_timeout,
        }
    }
}

/// Contract every source implements.
///
/// Sources are configured per pipeline (after cloning) and must not mutate
/// shared state during fetches. A "not found" answer is `Ok(None)` /
/// `Ok(vec![])`, never an error: absence simply excludes the source from
/// merging for that resource.
#[async_trait]
pub trait Source: Send + Sync {
    fn source_type(&self) -> SourceType;

    /// Stable source id; this is the name the authority table keys on.
    fn name(&self) -> &str;

    /// Higher priority wins authority ties.
    fn priority(&self) -> i32 {
        0
    }

    /// Prepare the source for one pipeline run.
    fn configure(&mut self, config: &SourceConfig) -> Result<(), Error>;

    /// Whether the source can contribute anything this run.
    fn is_available(&self) -> bool;

    /// Clone for safe concurrent use; each pipeline works on its own copy.
    fn clone_source(&self) -> Box<dyn Source>;

    /// Provider-level metadata for one provider, if this source has any.
    async fn fetch_provider(
        &self,
        ctx: &SyncContext,
        provider_id: &str,
    ) -> Result<Option<Provider>, Error>;

    /// Models this source knows for one provider.
    async fn fetch_models(&self, ctx: &SyncContext, provider_id: &str)
        -> Result<Vec<Model>, Error>;

    /// Authors this source knows, if any.
    async fn fetch_authors(&self, ctx: &SyncContext) -> Result<Vec<Author>, Error> {
        let _ = ctx;
        Ok(Vec::new())
    }

    /// The fields this source claims authority over.
    fn field_authorities(&self) -> Vec<FieldAuthority>;

    /// Post-sync hook: copy provider logos into `dest`.
    async fn copy_provider_logos(&self, dest: &Path) -> Result<(), Error> {
        let _ = dest;
        Ok(())
    }

    /// Post-sync hook: release per-run resources.
    async fn cleanup(&self) -> Result<(), Error> {
        Ok(())
    }
}

static REGISTRY: Lazy<RwLock<Vec<Box<dyn Source>>>> = Lazy::new(|| RwLock::new(Vec::new()));

/// Register a source prototype. Registration is keyed by source type;
/// registering the same type twice is a programmer error and panics.
pub fn register(source: Box<dyn Source>) {
    // The duplicate check runs outside the write guard so the expected
    // panic never poisons the registry lock.
    if is_registered(source.source_type()) {
        panic!(
            "source type '{}' registered twice",
            source.source_type().as_str()
        );
    }
    tracing::debug!(source = source.name(), "registered source");
    REGISTRY
        .write()
        .expect("source registry poisoned")
        .push(source);
}

/// Whether a source of this type has been registered.
pub fn is_registered(source_type: SourceType) -> bool {
    REGISTRY
        .read()
        .expect("source registry poisoned")
        .iter()
        .any(|s| s.source_type() == source_type)
}

/// Clone every registered source, preserving registration order. The
/// returned index is the order used for merge tie-breaking.
pub fn clone_registered() -> Vec<(usize, Box<dyn Source>)> {
    REGISTRY
        .read()
        .expect("source registry poisoned")
        .iter()
        .enumerate()
        .map(|(i, s)| (i, s.clone_source()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DummySource;

    #[async_trait]
    impl Source for DummySource {
        fn source_type(&self) -> SourceType {
            SourceType::ModelsDevGit
        }
        fn name(&self) -> &str {
            "dummy"
        }
        fn configure(&mut self, _config: &SourceConfig) -> Result<(), Error> {
            Ok(())
        }
        fn is_available(&self) -> bool {
            true
        }
        fn clone_source(&self) -> Box<dyn Source> {
            Box::new(DummySource)
        }
        async fn fetch_provider(
            &self,
            _ctx: &SyncContext,
            _provider_id: &str,
        ) -> Result<Option<Provider>, Error> {
            Ok(None)
        }
        async fn fetch_models(
            &self,
            _ctx: &SyncContext,
            _provider_id: &str,
        ) -> Result<Vec<Model>, Error> {
            Ok(Vec::new())
        }
        fn field_authorities(&self) -> Vec<FieldAuthority> {
            Vec::new()
        }
    }

    // The registry is process-wide, so one test exercises the whole
    // register/duplicate/clone flow to keep ordering deterministic.
    #[test]
    fn registration_is_type_keyed_and_duplicates_panic() {
        register(Box::new(DummySource));
        assert!(is_registered(SourceType::ModelsDevGit));

        let cloned = clone_registered();
        assert!(cloned.iter().any(|(_, s)| s.name() == "dummy"));

        let result = std::panic::catch_unwind(|| register(Box::new(DummySource)));
        assert!(result.is_err());

        // The expected panic must not poison the registry.
        assert!(is_registered(SourceType::ModelsDevGit));
    }
}
