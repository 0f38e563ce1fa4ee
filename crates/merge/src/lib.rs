//! Field-by-field reconciliation of per-source catalog output.
//!
//! For every entity observed by at least one source, the engine walks the
//! entity's schema in stable order, gathers the candidate values each source
//! produced, and selects the winner via the authority table. Ties resolve by
//! source priority, then registration order, so the result is deterministic
//! for any arrival order of the same batches. Every selection (and every
//! superseded candidate) is written to the provenance store.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::starmap_authority::AuthorityTable;
use crate::starmap_catalog::provenance::{ProvenanceRecord, ProvenanceStore};
use crate::starmap_catalog::store::{resource_id, Catalog};
use crate::starmap_core::clock::Clock;
use crate::starmap_core::error::Error;
use crate::starmap_schema::{author_fields, model_fields, provider_fields, FieldKind, FieldSpec};
use crate::starmap_types::{Author, Model, Provider, ResourceKind, Value};

/// Everything one source produced for one sync run.
#[derive(Debug, Clone, Default)]
pub struct SourceBatch {
    /// Source id (matches the authority table's source column)
    pub source: String,
    /// Source priority; higher wins authority ties
    pub priority: i32,
    /// Registration order; earlier wins remaining ties
    pub order: usize,
    pub providers: Vec<Provider>,
    pub authors: Vec<Author>,
}

/// Result of a merge: the reconciled catalog plus non-fatal validation
/// issues found while reconciling.
#[derive(Debug)]
pub struct MergeOutcome {
    pub catalog: Catalog,
    pub issues: Vec<Error>,
}

/// The merge engine. Stateless apart from its configuration; one instance
/// serves one pipeline run.
pub struct MergeEngine {
    table: AuthorityTable,
    clock: Arc<dyn Clock>,
}

/// One candidate value for a field, with the rank inputs attached.
struct Candidate<'a> {
    source: &'a str,
    priority: i32,
    order: usize,
    score: f64,
    declared: bool,
    value: Value,
}

impl MergeEngine {
    pub fn new(table: AuthorityTable, clock: Arc<dyn Clock>) -> Self {
        Self { table, clock }
    }

    /// Merge source batches against a baseline catalog.
    ///
    /// The baseline supplies provenance history and creation timestamps; it
    /// does not contribute field values (sources are the only input to field
    /// selection).
    pub fn merge(&self, baseline: &Catalog, batches: &[SourceBatch]) -> MergeOutcome {
        let mut provenance = baseline.provenance();

        let providers = self.merge_providers(baseline, batches, &mut provenance);
        let authors = self.merge_authors(batches, &mut provenance);

        let catalog = Catalog::new(providers, authors, provenance);
        let issues = catalog.validate();
        tracing::debug!(
            providers = catalog.provider_count(),
            models = catalog.model_count(),
            authors = catalog.author_count(),
            issues = issues.len(),
            "merge complete"
        );
        MergeOutcome { catalog, issues }
    }

    fn merge_providers(
        &self,
        baseline: &Catalog,
        batches: &[SourceBatch],
        provenance: &mut ProvenanceStore,
    ) -> BTreeMap<String, Provider> {
        let mut ids: BTreeSet<&str> = BTreeSet::new();
        for batch in batches {
            for provider in &batch.providers {
                ids.insert(provider.id.as_str());
            }
        }

        let mut merged = BTreeMap::new();
        for id in ids {
            let candidates: Vec<(&SourceBatch, &Provider)> = batches
                .iter()
                .filter_map(|b| {
                    b.providers
                        .iter()
                        .find(|p| p.id == id)
                        .map(|p| (b, p))
                })
                .collect();

            let baseline_provider = baseline.providers_ref().get(id);
            let mut provider = self.merge_entity(
                ResourceKind::Provider,
                &resource_id(ResourceKind::Provider, None, id),
                Provider::new(id, id),
                provider_fields(),
                &candidates,
                provenance,
            );

            provider.models = self.merge_models(id, &candidates, baseline_provider, provenance);
            merged.insert(id.to_string(), provider);
        }
        merged
    }

    fn merge_models(
        &self,
        provider_id: &str,
        provider_candidates: &[(&SourceBatch, &Provider)],
        baseline_provider: Option<&Provider>,
        provenance: &mut ProvenanceStore,
    ) -> BTreeMap<String, Model> {
        let mut ids: BTreeSet<&str> = BTreeSet::new();
        for (_, provider) in provider_candidates {
            for id in provider.models.keys() {
                ids.insert(id.as_str());
            }
        }

        let mut merged = BTreeMap::new();
        for id in ids {
            let candidates: Vec<(&SourceBatch, &Model)> = provider_candidates
                .iter()
                .filter_map(|(b, p)| p.models.get(id).map(|m| (*b, m)))
                .collect();

            let mut model = self.merge_entity(
                ResourceKind::Model,
                &resource_id(ResourceKind::Model, Some(provider_id), id),
                Model::new(id),
                model_fields(),
                &candidates,
                provenance,
            );

            let baseline_model = baseline_provider.and_then(|p| p.models.get(id));
            self.stamp_model(&mut model, baseline_model);
            merged.insert(id.to_string(), model);
        }
        merged
    }

    fn merge_authors(
        &self,
        batches: &[SourceBatch],
        provenance: &mut ProvenanceStore,
    ) -> BTreeMap<String, Author> {
        let mut ids: BTreeSet<&str> = BTreeSet::new();
        for batch in batches {
            for author in &batch.authors {
                ids.insert(author.id.as_str());
            }
        }

        let mut merged = BTreeMap::new();
        for id in ids {
            let candidates: Vec<(&SourceBatch, &Author)> = batches
                .iter()
                .filter_map(|b| b.authors.iter().find(|a| a.id == id).map(|a| (b, a)))
                .collect();

            let author = self.merge_entity(
                ResourceKind::Author,
                &resource_id(ResourceKind::Author, None, id),
                Author::new(id, id),
                author_fields(),
                &candidates,
                provenance,
            );
            merged.insert(id.to_string(), author);
        }
        merged
    }

    /// Walk the entity schema and select a winner for every leaf field.
    fn merge_entity<T: Clone>(
        &self,
        kind: ResourceKind,
        resource: &str,
        seed: T,
        fields: &[FieldSpec<T>],
        candidates: &[(&SourceBatch, &T)],
        provenance: &mut ProvenanceStore,
    ) -> T {
        let mut merged = seed;
        for spec in fields {
            let mut admitted = self.gather(spec, candidates);
            if admitted.is_empty() {
                continue;
            }
            rank(&mut admitted);

            match spec.kind {
                FieldKind::Scalar => {
                    self.select_scalar(kind, resource, spec, &admitted, &mut merged, provenance);
                }
                FieldKind::List => {
                    self.select_list(kind, resource, spec, &admitted, &mut merged, provenance);
                }
            }
        }
        merged
    }

    /// Gather candidate values for one field, applying the empty-value rule:
    /// a zero value is admitted only when the reporting source explicitly
    /// declares authority over the field ("explicitly free" pricing).
    fn gather<'a, T>(
        &self,
        spec: &FieldSpec<T>,
        candidates: &[(&'a SourceBatch, &T)],
    ) -> Vec<Candidate<'a>> {
        let mut admitted = Vec::new();
        for (batch, entity) in candidates {
            let Some(value) = (spec.get)(entity) else {
                continue;
            };
            let authority = self.table.authority(spec.path, &batch.source);
            let numeric_zero = matches!(value, Value::Int(0)) || matches!(value, Value::Float(f) if f == 0.0);
            if value.is_empty() && !(numeric_zero && authority.declared) {
                continue;
            }
            admitted.push(Candidate {
                source: &batch.source,
                priority: batch.priority,
                order: batch.order,
                score: authority.score,
                declared: authority.declared,
                value,
            });
        }
        admitted
    }

    fn select_scalar<T>(
        &self,
        kind: ResourceKind,
        resource: &str,
        spec: &FieldSpec<T>,
        ranked: &[Candidate<'_>],
        merged: &mut T,
        provenance: &mut ProvenanceStore,
    ) {
        let winner = &ranked[0];

        // Losers first so the winner is the newest entry per field.
        for loser in ranked.iter().skip(1).rev() {
            provenance.record(ProvenanceRecord {
                kind,
                resource_id: resource.to_string(),
                field: spec.path.to_string(),
                value: loser.value.clone(),
                source: loser.source.to_string(),
                authority: loser.score,
                confidence: confidence_of(loser),
                timestamp: self.clock.now(),
                reason: Some(format!(
                    "superseded by '{}' (authority {:.2} > {:.2})",
                    winner.source, winner.score, loser.score
                )),
            });
        }

        (spec.set)(merged, &winner.value);
        provenance.record(ProvenanceRecord {
            kind,
            resource_id: resource.to_string(),
            field: spec.path.to_string(),
            value: winner.value.clone(),
            source: winner.source.to_string(),
            authority: winner.score,
            confidence: confidence_of(winner),
            timestamp: self.clock.now(),
            reason: Some(format!(
                "selected (authority {:.2}, {} candidate(s))",
                winner.score,
                ranked.len()
            )),
        });
    }

    /// Lists merge as an ordered union deduped by element identity, in
    /// authority-rank order (so the most trusted source's ordering leads).
    fn select_list<T>(
        &self,
        kind: ResourceKind,
        resource: &str,
        spec: &FieldSpec<T>,
        ranked: &[Candidate<'_>],
        merged: &mut T,
        provenance: &mut ProvenanceStore,
    ) {
        let mut union: Vec<Value> = Vec::new();
        for candidate in ranked {
            if let Value::List(items) = &candidate.value {
                for item in items {
                    if !union.contains(item) {
                        union.push(item.clone());
                    }
                }
            }
        }

        for candidate in ranked.iter().skip(1).rev() {
            provenance.record(ProvenanceRecord {
                kind,
                resource_id: resource.to_string(),
                field: spec.path.to_string(),
                value: candidate.value.clone(),
                source: candidate.source.to_string(),
                authority: candidate.score,
                confidence: confidence_of(candidate),
                timestamp: self.clock.now(),
                reason: Some("merged into ordered union".to_string()),
            });
        }

        let leader = &ranked[0];
        let value = Value::List(union);
        (spec.set)(merged, &value);
        provenance.record(ProvenanceRecord {
            kind,
            resource_id: resource.to_string(),
            field: spec.path.to_string(),
            value,
            source: leader.source.to_string(),
            authority: leader.score,
            confidence: confidence_of(leader),
            timestamp: self.clock.now(),
            reason: Some(format!("ordered union of {} source(s)", ranked.len())),
        });
    }

    /// Creation time survives from the baseline; the update time moves only
    /// when the merged fields actually differ from the baseline record.
    fn stamp_model(&self, model: &mut Model, baseline: Option<&Model>) {
        let now = self.clock.now();
        match baseline {
            Some(existing) => {
                model.created_at = existing.created_at;
                let mut comparable = model.clone();
                comparable.updated_at = existing.updated_at;
                if comparable == *existing {
                    model.updated_at = existing.updated_at;
                } else {
                    model.updated_at = now;
                }
            }
            None => {
                model.created_at = now;
                model.updated_at = now;
            }
        }
    }
}

fn confidence_of(candidate: &Candidate<'_>) -> f64 {
    if candidate.declared {
        1.0
    } else {
        0.5
    }
}

/// Order candidates by authority score, then priority, then registration
/// order. Stable for equal keys, so the full ordering is deterministic.
fn rank(candidates: &mut [Candidate<'_>]) {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.priority.cmp(&a.priority))
            .then_with(|| a.order.cmp(&b.order))
    });
}

#[cfg(test)]
#[path = "../tests/merge_tests.rs"]
mod merge_tests;
