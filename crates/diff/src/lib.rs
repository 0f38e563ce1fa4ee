//! Structural comparison of two catalog snapshots at field granularity.
//!
//! The differ walks the same entity schema as the merge engine, so every
//! reported path is a canonical field path. Values render through
//! `core::render` for stable display strings.

pub mod changeset;

pub use crate::diff::changeset::{
    ApplyStrategy, ChangeGroup, ChangeKind, ChangeSummary, Changeset, FieldChange, KindCounts,
    Update,
};

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::starmap_catalog::provenance::ProvenanceStore;
use crate::starmap_catalog::store::{resource_id, Catalog, ModelEntry};
use crate::starmap_core::fieldpath::any_field_matches;
use crate::starmap_core::render::render_field;
use crate::starmap_schema::{author_fields, model_fields, provider_fields, FieldSpec};
use crate::starmap_types::{Author, Provider, ResourceKind};

/// Per-run differ configuration.
#[derive(Debug, Clone, Default)]
pub struct DiffOptions {
    /// Field paths (glob dialect) never reported as changes
    pub ignore_fields: Vec<String>,
}

/// Compare two catalogs and produce a changeset.
pub fn diff_catalogs(existing: &Catalog, updated: &Catalog, options: &DiffOptions) -> Changeset {
    let provenance = updated.provenance_ref();

    let mut changeset = Changeset {
        providers: diff_providers(existing, updated, options, provenance),
        models: diff_models(existing, updated, options, provenance),
        authors: diff_authors(existing, updated, options, provenance),
        summary: ChangeSummary::default(),
    };
    changeset.recompute_summary();
    changeset
}

fn diff_providers(
    existing: &Catalog,
    updated: &Catalog,
    options: &DiffOptions,
    provenance: &ProvenanceStore,
) -> ChangeGroup<Provider> {
    let old = existing.providers_ref();
    let new = updated.providers_ref();
    let mut group = ChangeGroup::default();

    for (id, provider) in new {
        if !old.contains_key(id) {
            group.added.push(provider.clone());
        }
    }
    for (id, provider) in old {
        if !new.contains_key(id) {
            group.removed.push(provider.clone());
        }
    }
    for (id, after) in new {
        let Some(before) = old.get(id) else { continue };
        let fields = field_changes(
            before,
            after,
            provider_fields(),
            options,
            provenance,
            ResourceKind::Provider,
            &resource_id(ResourceKind::Provider, None, id),
        );
        if !fields.is_empty() {
            group.updated.push(Update {
                before: before.clone(),
                after: after.clone(),
                fields,
            });
        }
    }
    group
}

fn diff_models(
    existing: &Catalog,
    updated: &Catalog,
    options: &DiffOptions,
    provenance: &ProvenanceStore,
) -> ChangeGroup<ModelEntry> {
    let mut group = ChangeGroup::default();
    let old = flatten(existing);
    let new = flatten(updated);
    let keys: BTreeSet<&(String, String)> = old.keys().chain(new.keys()).collect();

    for key in keys {
        let (provider_id, model_id) = key;
        match (old.get(key), new.get(key)) {
            (None, Some(model)) => group.added.push(ModelEntry {
                provider: provider_id.clone(),
                model: (*model).clone(),
            }),
            (Some(model), None) => group.removed.push(ModelEntry {
                provider: provider_id.clone(),
                model: (*model).clone(),
            }),
            (Some(before), Some(after)) => {
                let fields = field_changes(
                    *before,
                    *after,
                    model_fields(),
                    options,
                    provenance,
                    ResourceKind::Model,
                    &resource_id(ResourceKind::Model, Some(provider_id), model_id),
                );
                if !fields.is_empty() {
                    group.updated.push(Update {
                        before: ModelEntry {
                            provider: provider_id.clone(),
                            model: (*before).clone(),
                        },
                        after: ModelEntry {
                            provider: provider_id.clone(),
                            model: (*after).clone(),
                        },
                        fields,
                    });
                }
            }
            (None, None) => unreachable!(),
        }
    }
    group
}

fn diff_authors(
    existing: &Catalog,
    updated: &Catalog,
    options: &DiffOptions,
    provenance: &ProvenanceStore,
) -> ChangeGroup<Author> {
    let old = existing.authors_ref();
    let new = updated.authors_ref();
    let mut group = ChangeGroup::default();

    for (id, author) in new {
        if !old.contains_key(id) {
            group.added.push(author.clone());
        }
    }
    for (id, author) in old {
        if !new.contains_key(id) {
            group.removed.push(author.clone());
        }
    }
    for (id, after) in new {
        let Some(before) = old.get(id) else { continue };
        let fields = field_changes(
            before,
            after,
            author_fields(),
            options,
            provenance,
            ResourceKind::Author,
            &resource_id(ResourceKind::Author, None, id),
        );
        if !fields.is_empty() {
            group.updated.push(Update {
                before: before.clone(),
                after: after.clone(),
                fields,
            });
        }
    }
    group
}

fn flatten(catalog: &Catalog) -> BTreeMap<(String, String), &crate::starmap_types::Model> {
    let mut out = BTreeMap::new();
    for provider in catalog.providers_ref().values() {
        for model in provider.models.values() {
            out.insert((provider.id.clone(), model.id.clone()), model);
        }
    }
    out
}

/// Walk an entity schema and emit a `FieldChange` for every leaf where the
/// two snapshots differ. Composite values compare deeply via their
/// type-erased `Value` form.
fn field_changes<T>(
    before: &T,
    after: &T,
    fields: &[FieldSpec<T>],
    options: &DiffOptions,
    provenance: &ProvenanceStore,
    kind: ResourceKind,
    resource: &str,
) -> Vec<FieldChange> {
    let mut out = Vec::new();
    for spec in fields {
        if any_field_matches(options.ignore_fields.iter().map(String::as_str), spec.path) {
            continue;
        }
        let old_value = (spec.get)(before);
        let new_value = (spec.get)(after);
        if old_value == new_value {
            continue;
        }
        let change_kind = match (&old_value, &new_value) {
            (None, Some(_)) => ChangeKind::Add,
            (Some(_), None) => ChangeKind::Remove,
            _ => ChangeKind::Update,
        };
        let source = provenance
            .latest(kind, resource, spec.path)
            .map(|r| r.source);
        out.push(FieldChange {
            path: spec.path.to_string(),
            old: old_value
                .map(|v| render_field(spec.path, &v))
                .unwrap_or_default(),
            new: new_value
                .map(|v| render_field(spec.path, &v))
                .unwrap_or_default(),
            kind: change_kind,
            source,
        });
    }
    out
}

/// Apply a (possibly filtered) changeset to a baseline catalog, producing
/// the next snapshot. `provenance` is the store the new snapshot carries
/// (typically the merge output's, so history survives the apply).
pub fn apply(baseline: &Catalog, changeset: &Changeset, provenance: ProvenanceStore) -> Catalog {
    let mut providers = baseline.providers_ref().clone();
    let mut authors = baseline.authors_ref().clone();

    for provider in &changeset.providers.added {
        providers.insert(provider.id.clone(), provider.clone());
    }
    for update in &changeset.providers.updated {
        // Preserve the models map the baseline held; model-level changes
        // arrive through the models group.
        let models = providers
            .get(&update.after.id)
            .map(|p| p.models.clone())
            .unwrap_or_default();
        let mut next = update.after.clone();
        next.models = models;
        providers.insert(next.id.clone(), next);
    }
    for provider in &changeset.providers.removed {
        providers.remove(&provider.id);
    }

    for entry in &changeset.models.added {
        providers
            .entry(entry.provider.clone())
            .or_insert_with(|| crate::starmap_types::Provider::new(&entry.provider, &entry.provider))
            .models
            .insert(entry.model.id.clone(), entry.model.clone());
    }
    for update in &changeset.models.updated {
        if let Some(provider) = providers.get_mut(&update.after.provider) {
            provider
                .models
                .insert(update.after.model.id.clone(), update.after.model.clone());
        }
    }
    for entry in &changeset.models.removed {
        if let Some(provider) = providers.get_mut(&entry.provider) {
            provider.models.remove(&entry.model.id);
        }
    }

    for author in &changeset.authors.added {
        authors.insert(author.id.clone(), author.clone());
    }
    for update in &changeset.authors.updated {
        authors.insert(update.after.id.clone(), update.after.clone());
    }
    for author in &changeset.authors.removed {
        authors.remove(&author.id);
    }

    Catalog::new(providers, authors, provenance)
}

#[cfg(test)]
#[path = "../tests/diff_tests.rs"]
mod diff_tests;
