//! The sync pipeline orchestrator.
//!
//! A run snapshots the current catalog, clones and configures every
//! registered source, fans per-provider fetches out over a bounded worker
//! pool, merges the results field-by-field, diffs against the baseline, and
//! applies the (strategy-filtered) changeset. Per-task failures land in a
//! side channel; only cancellation, a blown top-level deadline, or "no
//! sources available" abort the run, and an aborted run leaves the catalog
//! untouched.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Once;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::starmap_authority::{AuthorityEntry, AuthorityTable};
use crate::starmap_catalog::store::{Catalog, CatalogHandle};
use crate::starmap_core::clock::{Clock, MonotonicClock, SystemClock};
use crate::starmap_core::error::Error;
use crate::starmap_diff::{apply, diff_catalogs, ApplyStrategy, Changeset, DiffOptions};
use crate::starmap_merge::{MergeEngine, SourceBatch};
use crate::starmap_source::{self as source_registry, Source, SourceConfig, SyncContext};
use crate::starmap_types::{Author, Model, Provider};

/// Default worker-pool width for per-provider fetches.
const DEFAULT_WORKERS: usize = 5;

/// Options for one pipeline run.
#[derive(Clone)]
pub struct SyncOptions {
    /// Restrict the sync to one provider (id or alias)
    pub provider_filter: Option<String>,
    /// Extra authority entries appended to the table
    pub authorities: Vec<AuthorityEntry>,
    /// Worker-pool width
    pub workers: usize,
    /// Timeout for one source's author fetch
    pub source_timeout: Duration,
    /// Timeout for one (source, provider) fetch task
    pub provider_timeout: Duration,
    /// Per-HTTP-request timeout handed to sources
    pub request_timeout: Duration,
    /// Top-level deadline for the whole run
    pub overall_timeout: Option<Duration>,
    /// Field paths the differ never reports
    pub ignore_fields: Vec<String>,
    /// How the changeset is narrowed before being applied
    pub strategy: ApplyStrategy,
    /// Cache directory override for dataset sources
    pub cache_dir: Option<PathBuf>,
    /// Skip all network access
    pub offline: bool,
    /// Copy provider logos here after the merge
    pub logo_dir: Option<PathBuf>,
    /// Compute everything but do not swap the catalog handle
    pub dry_run: bool,
    /// Timestamp source for provenance (tests inject a manual clock)
    pub clock: Option<Arc<dyn Clock>>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            provider_filter: None,
            authorities: Vec::new(),
            workers: DEFAULT_WORKERS,
            source_timeout: Duration::from_secs(60),
            provider_timeout: Duration::from_secs(45),
            request_timeout: Duration::from_secs(30),
            overall_timeout: None,
            ignore_fields: Vec::new(),
            strategy: ApplyStrategy::Additive,
            cache_dir: None,
            offline: false,
            logo_dir: None,
            dry_run: false,
            clock: None,
        }
    }
}

/// A recovered per-source failure.
#[derive(Debug)]
pub struct SourceError {
    pub source: String,
    pub provider: Option<String>,
    pub error: Error,
}

/// Everything a run produces.
#[derive(Debug)]
pub struct SyncResult {
    /// The catalog after applying the filtered changeset
    pub catalog: Catalog,
    /// The filtered changeset that was applied
    pub changeset: Changeset,
    /// Recovered per-source failures
    pub errors: Vec<SourceError>,
}

/// Register the built-in sources. Idempotent; the underlying registry
/// panics if a source type is ever registered twice by other means.
pub fn install_default_sources() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        source_registry::register(Box::new(crate::starmap_source_embedded::EmbeddedSource::new()));
        source_registry::register(Box::new(crate::starmap_source_api::ProviderApiSource::new()));
        source_registry::register(Box::new(
            crate::starmap_source_models_dev::ModelsDevHttpSource::new(),
        ));
        source_registry::register(Box::new(
            crate::starmap_source_models_dev::ModelsDevGitSource::new(),
        ));
    });
}

/// Handle for one configured pipeline run.
pub struct Pipeline<'a> {
    handle: &'a CatalogHandle,
    options: SyncOptions,
    source_override: Option<Vec<Box<dyn Source>>>,
}

/// Build a pipeline over a catalog handle.
pub fn pipeline<'a>(handle: &'a CatalogHandle, options: SyncOptions) -> Pipeline<'a> {
    Pipeline {
        handle,
        options,
        source_override: None,
    }
}

impl<'a> Pipeline<'a> {
    /// Replace the registry with an explicit source list for this run.
    pub fn with_sources(mut self, sources: Vec<Box<dyn Source>>) -> Self {
        self.source_override = Some(sources);
        self
    }
}

/// Run a sync with a fresh cancellation token (the programmatic surface the
/// CLI calls).
pub async fn start_pipeline(
    handle: &CatalogHandle,
    options: SyncOptions,
) -> Result<SyncResult, Error> {
    pipeline(handle, options).run(CancellationToken::new()).await
}

/// One fan-out task's payload.
enum TaskOutput {
    ProviderFetch {
        source_index: usize,
        provider_id: String,
        provider: Option<Provider>,
        models: Vec<Model>,
    },
    Authors {
        source_index: usize,
        authors: Vec<Author>,
    },
    Failed {
        source_index: usize,
        provider_id: Option<String>,
        error: Error,
    },
}

impl Pipeline<'_> {
    pub async fn run(&self, cancel: CancellationToken) -> Result<SyncResult, Error> {
        let baseline = self.handle.snapshot();

        let mut config = SourceConfig::new(Arc::clone(&baseline));
        config.provider_filter = self.options.provider_filter.clone();
        config.request_timeout = self.options.request_timeout;
        config.cache_dir = self.options.cache_dir.clone();
        config.offline = self.options.offline;

        let prototypes: Vec<(usize, Box<dyn Source>)> = match &self.source_override {
            Some(list) => list
                .iter()
                .enumerate()
                .map(|(i, s)| (i, s.clone_source()))
                .collect(),
            None => {
                install_default_sources();
                source_registry::clone_registered()
            }
        };

        let mut errors: Vec<SourceError> = Vec::new();
        let mut sources: Vec<(usize, Arc<dyn Source>)> = Vec::new();
        for (order, mut prototype) in prototypes {
            match prototype.configure(&config) {
                Ok(()) if prototype.is_available() => {
                    sources.push((order, Arc::from(prototype)));
                }
                Ok(()) => {
                    tracing::debug!(source = prototype.name(), "source unavailable; dropped");
                }
                Err(e) => {
                    tracing::warn!(source = prototype.name(), error = %e, "source failed to configure; dropped");
                    errors.push(SourceError {
                        source: prototype.name().to_string(),
                        provider: None,
                        error: e,
                    });
                }
            }
        }
        if sources.is_empty() {
            return Err(Error::process("no sources available"));
        }

        let mut table = AuthorityTable::with_defaults();
        for (_, source) in &sources {
            let name = source.name().to_string();
            table.extend(
                source
                    .field_authorities()
                    .into_iter()
                    .map(|fa| AuthorityEntry::new(fa.field, name.clone(), fa.score)),
            );
        }
        table.extend(self.options.authorities.iter().cloned());

        let provider_ids = self.target_providers(&baseline)?;

        let ctx = SyncContext {
            cancel: cancel.clone(),
            deadline: self.options.overall_timeout.map(|d| Instant::now() + d),
            request_timeout: self.options.request_timeout,
        };

        let (batches, fetch_errors) = self
            .fan_out(&sources, &provider_ids, &ctx)
            .await?;
        errors.extend(fetch_errors);

        // Partial results from a canceled run are dropped, not merged.
        if cancel.is_cancelled() {
            return Err(Error::Canceled);
        }
        if let Some(deadline) = ctx.deadline {
            if Instant::now() >= deadline {
                return Err(Error::Timeout(
                    self.options.overall_timeout.unwrap_or_default(),
                ));
            }
        }

        let clock: Arc<dyn Clock> = self
            .options
            .clock
            .clone()
            .unwrap_or_else(|| Arc::new(SystemClock));
        let engine = MergeEngine::new(table, Arc::new(MonotonicClock::new(clock)));
        let outcome = engine.merge(&baseline, &batches);
        for issue in outcome.issues {
            errors.push(SourceError {
                source: "validation".to_string(),
                provider: None,
                error: issue,
            });
        }

        let diff_options = DiffOptions {
            ignore_fields: self.options.ignore_fields.clone(),
        };
        let changeset = diff_catalogs(&baseline, &outcome.catalog, &diff_options)
            .filter(self.options.strategy);
        let next = apply(&baseline, &changeset, outcome.catalog.provenance());

        if let Some(logo_dir) = &self.options.logo_dir {
            for (_, source) in &sources {
                if let Err(e) = source.copy_provider_logos(logo_dir).await {
                    errors.push(SourceError {
                        source: source.name().to_string(),
                        provider: None,
                        error: e,
                    });
                }
            }
        }
        for (_, source) in &sources {
            if let Err(e) = source.cleanup().await {
                errors.push(SourceError {
                    source: source.name().to_string(),
                    provider: None,
                    error: e,
                });
            }
        }

        tracing::info!(
            providers = next.provider_count(),
            models = next.model_count(),
            changes = changeset.summary.total_changes,
            errors = errors.len(),
            "sync complete"
        );

        if !self.options.dry_run {
            self.handle.swap(next.clone());
        }

        Ok(SyncResult {
            catalog: next,
            changeset,
            errors,
        })
    }

    /// The provider ids this run fetches: the baseline's providers, or the
    /// single resolved provider when a filter is set.
    fn target_providers(&self, baseline: &Catalog) -> Result<Vec<String>, Error> {
        match &self.options.provider_filter {
            Some(filter) => {
                let provider = baseline.providers().resolve(filter)?;
                Ok(vec![provider.id])
            }
            None => Ok(baseline.providers().list().into_iter().map(|p| p.id).collect()),
        }
    }

    /// Fan per-provider fetches out over the worker pool and aggregate the
    /// results per source. Panics inside a task are caught at the join
    /// boundary and converted to errors.
    async fn fan_out(
        &self,
        sources: &[(usize, Arc<dyn Source>)],
        provider_ids: &[String],
        ctx: &SyncContext,
    ) -> Result<(Vec<SourceBatch>, Vec<SourceError>), Error> {
        let semaphore = Arc::new(Semaphore::new(self.options.workers.max(1)));
        let (tx, mut rx) = mpsc::unbounded_channel::<TaskOutput>();
        let mut handles = Vec::new();

        for (index, (_, source)) in sources.iter().enumerate() {
            for provider_id in provider_ids {
                let source = Arc::clone(source);
                let provider_id = provider_id.clone();
                let ctx = ctx.clone();
                let semaphore = Arc::clone(&semaphore);
                let tx = tx.clone();
                let timeout = self.options.provider_timeout;
                handles.push(tokio::spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return;
                    };
                    let work = async {
                        let provider = source.fetch_provider(&ctx, &provider_id).await?;
                        let models = source.fetch_models(&ctx, &provider_id).await?;
                        Ok::<_, Error>((provider, models))
                    };
                    let output = match tokio::time::timeout(timeout, work).await {
                        Ok(Ok((provider, models))) => TaskOutput::ProviderFetch {
                            source_index: index,
                            provider_id,
                            provider,
                            models,
                        },
                        Ok(Err(error)) => TaskOutput::Failed {
                            source_index: index,
                            provider_id: Some(provider_id),
                            error,
                        },
                        Err(_) => TaskOutput::Failed {
                            source_index: index,
                            provider_id: Some(provider_id),
                            error: Error::Timeout(timeout),
                        },
                    };
                    let _ = tx.send(output);
                }));
            }

            let source = Arc::clone(source);
            let ctx = ctx.clone();
            let semaphore = Arc::clone(&semaphore);
            let tx = tx.clone();
            let timeout = self.options.source_timeout;
            handles.push(tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                let output = match tokio::time::timeout(timeout, source.fetch_authors(&ctx)).await {
                    Ok(Ok(authors)) => TaskOutput::Authors {
                        source_index: index,
                        authors,
                    },
                    Ok(Err(error)) => TaskOutput::Failed {
                        source_index: index,
                        provider_id: None,
                        error,
                    },
                    Err(_) => TaskOutput::Failed {
                        source_index: index,
                        provider_id: None,
                        error: Error::Timeout(timeout),
                    },
                };
                let _ = tx.send(output);
            }));
        }
        drop(tx);

        let mut batches: Vec<SourceBatch> = sources
            .iter()
            .map(|(order, source)| SourceBatch {
                source: source.name().to_string(),
                priority: source.priority(),
                order: *order,
                providers: Vec::new(),
                authors: Vec::new(),
            })
            .collect();
        let mut errors = Vec::new();

        while let Some(output) = rx.recv().await {
            match output {
                TaskOutput::ProviderFetch {
                    source_index,
                    provider_id,
                    provider,
                    models,
                } => {
                    let batch = &mut batches[source_index];
                    if provider.is_none() && models.is_empty() {
                        continue;
                    }
                    // A models-only source still needs a carrier provider;
                    // the empty name never competes in the merge.
                    let mut provider = provider.unwrap_or_else(|| Provider::new(&provider_id, ""));
                    provider.id = provider_id;
                    for model in models {
                        provider.models.insert(model.id.clone(), model);
                    }
                    batch.providers.push(provider);
                }
                TaskOutput::Authors {
                    source_index,
                    authors,
                } => {
                    batches[source_index].authors.extend(authors);
                }
                TaskOutput::Failed {
                    source_index,
                    provider_id,
                    error,
                } => {
                    if matches!(error, Error::Canceled) {
                        continue;
                    }
                    errors.push(SourceError {
                        source: batches[source_index].source.clone(),
                        provider: provider_id,
                        error,
                    });
                }
            }
        }

        for join_result in futures_util::future::join_all(handles).await {
            if let Err(join_error) = join_result {
                if join_error.is_panic() {
                    errors.push(SourceError {
                        source: "pipeline".to_string(),
                        provider: None,
                        error: Error::process("fetch task panicked"),
                    });
                }
            }
        }

        Ok((batches, errors))
    }
}

#[cfg(test)]
#[path = "../tests/pipeline_tests.rs"]
mod pipeline_tests;
