//! The in-memory catalog store.
//!
//! Reads always return deep copies: entity types own all their data, so a
//! `clone()` shares nothing with the store. Mutation happens only by
//! swapping in a pipeline-produced snapshot at the catalog granularity;
//! readers take a cheap `Arc` snapshot and never hold the writer lock.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::starmap_catalog::provenance::ProvenanceStore;
use crate::starmap_core::error::Error;
use crate::starmap_types::{Author, Model, Provider, ResourceKind};

/// A model together with its owning provider id (models are unique per
/// provider, not globally).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModelEntry {
    pub provider: String,
    pub model: Model,
}

impl ModelEntry {
    /// Qualified id used as the provenance resource id.
    pub fn qualified_id(&self) -> String {
        format!("{}/{}", self.provider, self.model.id)
    }
}

/// One immutable catalog snapshot.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    providers: BTreeMap<String, Provider>,
    authors: BTreeMap<String, Author>,
    provenance: ProvenanceStore,
}

impl Catalog {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(
        providers: BTreeMap<String, Provider>,
        authors: BTreeMap<String, Author>,
        provenance: ProvenanceStore,
    ) -> Self {
        Self {
            providers,
            authors,
            provenance,
        }
    }

    /// Deep copy of the provider collection.
    pub fn providers(&self) -> ProviderCollection {
        ProviderCollection {
            items: self.providers.clone(),
        }
    }

    /// Deep copy of the author collection.
    pub fn authors(&self) -> AuthorCollection {
        AuthorCollection {
            items: self.authors.clone(),
        }
    }

    /// Flattened model list across providers, ordered by model id ascending
    /// (provider id breaks ties). Deep copies.
    pub fn models(&self) -> Vec<ModelEntry> {
        let mut out: Vec<ModelEntry> = self
            .providers
            .values()
            .flat_map(|p| {
                p.models.values().map(|m| ModelEntry {
                    provider: p.id.clone(),
                    model: m.clone(),
                })
            })
            .collect();
        out.sort_by(|a, b| {
            a.model
                .id
                .cmp(&b.model.id)
                .then_with(|| a.provider.cmp(&b.provider))
        });
        out
    }

    /// Look up one provider by exact id. Deep copy.
    pub fn provider(&self, id: &str) -> Result<Provider, Error> {
        self.providers
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found("provider", id))
    }

    /// Look up one author by exact id. Deep copy.
    pub fn author(&self, id: &str) -> Result<Author, Error> {
        self.authors
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found("author", id))
    }

    /// Copy of the provenance store.
    pub fn provenance(&self) -> ProvenanceStore {
        self.provenance.clone()
    }

    pub(crate) fn provenance_ref(&self) -> &ProvenanceStore {
        &self.provenance
    }

    /// Resolve an author's model references (`provider/model`) against the
    /// providers that own them. Dangling references are skipped here; the
    /// validation pass reports them.
    pub fn models_for_author(&self, author_id: &str) -> Vec<ModelEntry> {
        let Some(author) = self.authors.get(author_id) else {
            return Vec::new();
        };
        author
            .models
            .iter()
            .filter_map(|qualified| {
                let (provider_id, model_id) = qualified.split_once('/')?;
                let provider = self.providers.get(provider_id)?;
                let model = provider.models.get(model_id)?;
                Some(ModelEntry {
                    provider: provider_id.to_string(),
                    model: model.clone(),
                })
            })
            .collect()
    }

    /// Invariant checks over the whole catalog: author cross-references,
    /// URL schemes, nonnegative limits, API-key descriptor coherence.
    /// Violations are collected, never fatal.
    pub fn validate(&self) -> Vec<Error> {
        let mut issues = Vec::new();

        for provider in self.providers.values() {
            if let Some(key) = &provider.api_key {
                if let Err(message) = key.check_exclusive() {
                    issues.push(Error::config(message));
                }
            }
            for field in [&provider.status_page_url, &provider.icon_url] {
                if let Some(url) = field {
                    if url::Url::parse(url).is_err() {
                        issues.push(Error::validation(
                            format!("provider/{}", provider.id),
                            format!("URL without scheme: {url}"),
                        ));
                    }
                }
            }
            if let Some(endpoint) = provider.catalog.as_ref().and_then(|c| c.endpoint.as_ref()) {
                if url::Url::parse(&endpoint.url).is_err() {
                    issues.push(Error::validation(
                        format!("provider/{}", provider.id),
                        format!("catalog endpoint URL without scheme: {}", endpoint.url),
                    ));
                }
            }
            for model in provider.models.values() {
                if let Some(limits) = &model.limits {
                    if limits.context_window.is_some_and(|n| n < 0)
                        || limits.output_tokens.is_some_and(|n| n < 0)
                    {
                        issues.push(Error::validation(
                            format!("model/{}/{}", provider.id, model.id),
                            "negative token limit".to_string(),
                        ));
                    }
                }
                for author_id in &model.authors {
                    if !self.authors.contains_key(author_id) {
                        issues.push(Error::validation(
                            format!("model/{}/{}", provider.id, model.id),
                            format!("unknown author reference '{author_id}'"),
                        ));
                    }
                }
            }
        }

        issues
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    pub fn author_count(&self) -> usize {
        self.authors.len()
    }

    pub fn model_count(&self) -> usize {
        self.providers.values().map(|p| p.models.len()).sum()
    }

    pub(crate) fn providers_ref(&self) -> &BTreeMap<String, Provider> {
        &self.providers
    }

    pub(crate) fn authors_ref(&self) -> &BTreeMap<String, Author> {
        &self.authors
    }
}

/// Deep-copied view over providers.
#[derive(Debug, Clone)]
pub struct ProviderCollection {
    items: BTreeMap<String, Provider>,
}

impl ProviderCollection {
    /// All providers, id ascending.
    pub fn list(&self) -> Vec<Provider> {
        self.items.values().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Result<Provider, Error> {
        self.items
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found("provider", id))
    }

    /// Resolve an id or alias, case-insensitively.
    pub fn resolve(&self, id_or_alias: &str) -> Result<Provider, Error> {
        if let Some(p) = self.items.get(id_or_alias) {
            return Ok(p.clone());
        }
        self.items
            .values()
            .find(|p| p.answers_to(id_or_alias))
            .cloned()
            .ok_or_else(|| Error::not_found("provider", id_or_alias))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Deep-copied view over authors.
#[derive(Debug, Clone)]
pub struct AuthorCollection {
    items: BTreeMap<String, Author>,
}

impl AuthorCollection {
    /// All authors, id ascending.
    pub fn list(&self) -> Vec<Author> {
        self.items.values().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Result<Author, Error> {
        self.items
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found("author", id))
    }

    /// Authors have no aliases; resolve is a case-insensitive id lookup.
    pub fn resolve(&self, id: &str) -> Result<Author, Error> {
        if let Some(a) = self.items.get(id) {
            return Ok(a.clone());
        }
        self.items
            .values()
            .find(|a| a.id.eq_ignore_ascii_case(id))
            .cloned()
            .ok_or_else(|| Error::not_found("author", id))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Shared handle over the current catalog snapshot.
///
/// Readers clone the `Arc` and work against an immutable snapshot; the
/// pipeline swaps in a replacement under the single writer lock.
#[derive(Debug)]
pub struct CatalogHandle {
    inner: RwLock<Arc<Catalog>>,
}

impl CatalogHandle {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            inner: RwLock::new(Arc::new(catalog)),
        }
    }

    /// The current snapshot. Cheap; accessors on the snapshot deep-copy.
    pub fn snapshot(&self) -> Arc<Catalog> {
        Arc::clone(&self.inner.read().expect("catalog lock poisoned"))
    }

    /// Atomically replace the snapshot, returning the previous one.
    pub fn swap(&self, next: Catalog) -> Arc<Catalog> {
        let mut guard = self.inner.write().expect("catalog lock poisoned");
        std::mem::replace(&mut guard, Arc::new(next))
    }

    pub fn providers(&self) -> ProviderCollection {
        self.snapshot().providers()
    }

    pub fn authors(&self) -> AuthorCollection {
        self.snapshot().authors()
    }

    pub fn models(&self) -> Vec<ModelEntry> {
        self.snapshot().models()
    }

    pub fn provider(&self, id: &str) -> Result<Provider, Error> {
        self.snapshot().provider(id)
    }

    pub fn provenance(&self) -> ProvenanceStore {
        self.snapshot().provenance()
    }
}

/// Build the provenance resource id for a kind + entity id.
pub fn resource_id(kind: ResourceKind, provider: Option<&str>, id: &str) -> String {
    match (kind, provider) {
        (ResourceKind::Model, Some(p)) => format!("{p}/{id}"),
        _ => id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_catalog() -> Catalog {
        let mut providers = BTreeMap::new();
        let mut provider = Provider::new("openai", "OpenAI");
        provider.aliases = vec!["oai".into()];
        let mut model = Model::new("gpt-x");
        model.authors = vec!["openai".into()];
        provider.models.insert(model.id.clone(), model);
        providers.insert(provider.id.clone(), provider);

        let mut authors = BTreeMap::new();
        let mut author = Author::new("openai", "OpenAI");
        author.models = vec!["openai/gpt-x".into()];
        authors.insert(author.id.clone(), author);

        Catalog::new(providers, authors, ProvenanceStore::new())
    }

    #[test]
    fn reads_are_deep_copies() {
        let catalog = sample_catalog();
        let mut copy = catalog.provider("openai").unwrap();
        copy.name = "Mutated".into();
        copy.models.clear();
        assert_eq!(catalog.provider("openai").unwrap().name, "OpenAI");
        assert_eq!(catalog.provider("openai").unwrap().models.len(), 1);
    }

    #[test]
    fn resolve_honors_aliases() {
        let catalog = sample_catalog();
        let providers = catalog.providers();
        assert_eq!(providers.resolve("oai").unwrap().id, "openai");
        assert_eq!(providers.resolve("OpenAI").unwrap().id, "openai");
        assert!(providers.resolve("nope").is_err());
    }

    #[test]
    fn author_model_references_resolve() {
        let catalog = sample_catalog();
        let entries = catalog.models_for_author("openai");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].model.id, "gpt-x");
    }

    #[test]
    fn handle_swaps_snapshots_atomically() {
        let handle = CatalogHandle::new(sample_catalog());
        let before = handle.snapshot();
        handle.swap(Catalog::empty());
        assert_eq!(before.provider_count(), 1);
        assert_eq!(handle.snapshot().provider_count(), 0);
    }

    #[test]
    fn validation_flags_dangling_author_reference() {
        let mut catalog = sample_catalog();
        catalog.authors.clear();
        let issues = catalog.validate();
        assert!(issues
            .iter()
            .any(|e| matches!(e, Error::Validation { .. })));
    }
}
