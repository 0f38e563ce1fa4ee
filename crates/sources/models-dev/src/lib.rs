//! The models.dev community dataset source.
//!
//! Two flavors: an HTTP fetch of the full `api.json` with an on-disk cache
//! and an embedded fallback snapshot, and a git checkout that supplies
//! provider logos. A sync never fails because models.dev is unreachable;
//! the ladder is fresh cache → network → stale cache → embedded snapshot.

pub mod dataset;
pub mod git;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use tokio::sync::{Mutex as AsyncMutex, OnceCell};

use crate::http_transport::HttpClient;
use crate::starmap_core::error::Error;
use crate::starmap_core::retry::{retry, RetryConfig};
use crate::starmap_source::{FieldAuthority, Source, SourceConfig, SourceType, SyncContext};
use crate::starmap_types::{Model, Provider};

pub use crate::source_models_dev::git::ModelsDevGitSource;

pub const SOURCE_NAME: &str = "models.dev";
pub const DEFAULT_ENDPOINT: &str = "https://models.dev/api.json";

/// Cache freshness window.
const CACHE_TTL: Duration = Duration::from_secs(60 * 60);
/// A valid network payload must be at least this large.
const MIN_RESPONSE_BYTES: usize = 2048;
/// A valid payload must describe at least this many providers.
const MIN_PROVIDERS: usize = 5;

/// Fallback snapshot compiled into the binary.
pub const EMBEDDED_SNAPSHOT: &str = include_str!("../embedded/api.json");

/// Per-cache-directory locks so concurrent pipelines in one process never
/// download the dataset twice.
static ENSURE_LOCKS: Lazy<StdMutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>> =
    Lazy::new(|| StdMutex::new(HashMap::new()));

fn ensure_lock(cache_file: &Path) -> Arc<AsyncMutex<()>> {
    let mut locks = ENSURE_LOCKS.lock().expect("cache lock table poisoned");
    Arc::clone(
        locks
            .entry(cache_file.to_path_buf())
            .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
    )
}

/// How the dataset was obtained this run; used by logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    FreshCache,
    Network,
    StaleCache,
    EmbeddedFallback,
}

/// HTTP flavor of the models.dev source.
pub struct ModelsDevHttpSource {
    endpoint: String,
    cache_dir: Option<PathBuf>,
    provider_filter: Option<String>,
    ttl: Duration,
    offline: bool,
    http: Option<HttpClient>,
    loaded: OnceCell<(Arc<dataset::Dataset>, LoadOutcome)>,
}

impl Default for ModelsDevHttpSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelsDevHttpSource {
    pub fn new() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            cache_dir: None,
            provider_filter: None,
            ttl: CACHE_TTL,
            offline: false,
            http: None,
            loaded: OnceCell::new(),
        }
    }

    /// Point the source at a different dataset URL (tests use this).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Override the cache freshness window (tests use this to force the
    /// stale-cache path without touching mtimes).
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    fn cache_file(&self) -> Result<PathBuf, Error> {
        let base = match &self.cache_dir {
            Some(dir) => dir.clone(),
            None => directories::ProjectDirs::from("dev", "agentstation", "starmap")
                .map(|dirs| dirs.cache_dir().to_path_buf())
                .ok_or_else(|| Error::config("no cache directory available"))?,
        };
        Ok(base.join("models.dev").join("api.json"))
    }

    /// Load the dataset once per source instance, through the ladder:
    /// fresh cache → network → stale cache → embedded snapshot.
    async fn ensure(&self, ctx: &SyncContext) -> Result<Arc<dataset::Dataset>, Error> {
        let (data, _) = self
            .loaded
            .get_or_try_init(|| self.load(ctx))
            .await?;
        Ok(Arc::clone(data))
    }

    /// The load outcome, if the dataset has been loaded.
    pub fn load_outcome(&self) -> Option<LoadOutcome> {
        self.loaded.get().map(|(_, outcome)| *outcome)
    }

    async fn load(&self, ctx: &SyncContext) -> Result<(Arc<dataset::Dataset>, LoadOutcome), Error> {
        let cache_file = self.cache_file()?;
        let lock = ensure_lock(&cache_file);
        let _guard = lock.lock().await;

        if let Some(data) = self.read_cache(&cache_file, true).await {
            tracing::debug!(path = %cache_file.display(), "models.dev cache fresh");
            return Ok((Arc::new(data), LoadOutcome::FreshCache));
        }

        if !self.offline {
            match self.fetch_network(ctx).await {
                Ok(data) => {
                    self.write_cache(&cache_file, &data.1).await;
                    return Ok((Arc::new(data.0), LoadOutcome::Network));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "models.dev fetch failed; falling back");
                }
            }
        }

        if let Some(data) = self.read_cache(&cache_file, false).await {
            tracing::warn!(path = %cache_file.display(), "using stale models.dev cache");
            return Ok((Arc::new(data), LoadOutcome::StaleCache));
        }

        let data = dataset::parse(EMBEDDED_SNAPSHOT.as_bytes()).map_err(|e| {
            Error::process(format!("embedded models.dev snapshot unreadable: {e}"))
        })?;
        tracing::warn!("using embedded models.dev snapshot");
        Ok((Arc::new(data), LoadOutcome::EmbeddedFallback))
    }

    /// Read the cache file. With `require_fresh`, a file older than the TTL
    /// reads as a miss. The file's mtime is never touched.
    async fn read_cache(&self, cache_file: &Path, require_fresh: bool) -> Option<dataset::Dataset> {
        let metadata = tokio::fs::metadata(cache_file).await.ok()?;
        if require_fresh {
            let age = metadata.modified().ok()?.elapsed().ok()?;
            if age > self.ttl {
                return None;
            }
        }
        let body = tokio::fs::read(cache_file).await.ok()?;
        match dataset::parse(&body) {
            Ok(data) => Some(data),
            Err(e) => {
                tracing::warn!(error = %e, "models.dev cache unreadable; ignoring");
                None
            }
        }
    }

    async fn write_cache(&self, cache_file: &Path, body: &[u8]) {
        if let Some(parent) = cache_file.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                tracing::warn!(error = %e, "cannot create models.dev cache dir");
                return;
            }
        }
        if let Err(e) = tokio::fs::write(cache_file, body).await {
            tracing::warn!(error = %e, "cannot write models.dev cache");
        }
    }

    /// Fetch and validate the dataset from the network. A response must
    /// parse as JSON, clear the size floor, and describe at least
    /// `MIN_PROVIDERS` providers; anything less is treated as a failure.
    async fn fetch_network(
        &self,
        ctx: &SyncContext,
    ) -> Result<(dataset::Dataset, Vec<u8>), Error> {
        let http = self
            .http
            .as_ref()
            .ok_or_else(|| Error::config("models.dev source not configured"))?;

        let (body, stats) = retry(RetryConfig::network(), || async {
            http.get(ctx, &self.endpoint, None).await.map_err(RetryWrap)
        })
        .await
        .map_err(|RetryWrap(e)| e)?;

        if body.len() < MIN_RESPONSE_BYTES {
            return Err(Error::parse(format!(
                "models.dev payload too small ({} bytes from {})",
                body.len(),
                stats.url
            )));
        }
        let data = dataset::parse(&body)?;
        if data.len() < MIN_PROVIDERS {
            return Err(Error::parse(format!(
                "models.dev payload lists only {} providers",
                data.len()
            )));
        }
        Ok((data, body.to_vec()))
    }
}

/// Adapter so the fallback-ladder errors flow through the retry helper.
struct RetryWrap(Error);

impl crate::starmap_core::retry::Retryable for RetryWrap {
    fn is_retryable(&self) -> bool {
        matches!(self.0, Error::Sync { .. } | Error::Timeout(_))
    }
}

#[async_trait]
impl Source for ModelsDevHttpSource {
    fn source_type(&self) -> SourceType {
        SourceType::ModelsDevHttp
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn priority(&self) -> i32 {
        5
    }

    fn configure(&mut self, config: &SourceConfig) -> Result<(), Error> {
        self.provider_filter = config.provider_filter.clone();
        self.cache_dir = config.cache_dir.clone();
        self.offline = config.offline;
        self.http = Some(HttpClient::new(Duration::from_secs(10))?);
        Ok(())
    }

    /// Always available once configured: the fallback ladder guarantees a
    /// dataset even when the network and cache are both gone.
    fn is_available(&self) -> bool {
        self.http.is_some()
    }

    fn clone_source(&self) -> Box<dyn Source> {
        Box::new(Self {
            endpoint: self.endpoint.clone(),
            cache_dir: self.cache_dir.clone(),
            provider_filter: self.provider_filter.clone(),
            ttl: self.ttl,
            offline: self.offline,
            http: self.http.clone(),
            loaded: OnceCell::new(),
        })
    }

    async fn fetch_provider(
        &self,
        ctx: &SyncContext,
        provider_id: &str,
    ) -> Result<Option<Provider>, Error> {
        ctx.ensure_live()?;
        let data = self.ensure(ctx).await?;
        Ok(data.get(provider_id).map(dataset::to_provider))
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
        ctx.ensure_live()?;
        let data = self.ensure(ctx).await?;
        Ok(data
            .get(provider_id)
            .map(|p| p.models.values().map(dataset::to_model).collect())
            .unwrap_or_default())
    }

    fn field_authorities(&self) -> Vec<FieldAuthority> {
        vec![
            FieldAuthority::new("pricing.*", 0.9),
            FieldAuthority::new("limits.*", 0.9),
            FieldAuthority::new("metadata.*", 0.95),
            FieldAuthority::new("features.tools", 0.85),
            FieldAuthority::new("features.reasoning", 0.85),
            FieldAuthority::new("features.structured_outputs", 0.85),
            FieldAuthority::new("features.modalities.*", 0.85),
            FieldAuthority::new("icon_url", 0.7),
        ]
    }
}

#[cfg(test)]
#[path = "../tests/models_dev_tests.rs"]
mod models_dev_tests;
