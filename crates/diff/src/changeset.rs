//! Changesets: the structural delta between two catalog snapshots.

use serde::{Deserialize, Serialize};

use crate::starmap_catalog::store::ModelEntry;
use crate::starmap_types::{Author, Provider};

/// What happened to a field between two snapshots.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Add,
    Update,
    Remove,
}

/// One field-level difference inside an updated entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldChange {
    /// Dotted field path
    pub path: String,
    /// Display rendering of the old value ("" when the field was absent)
    pub old: String,
    /// Display rendering of the new value ("" when the field was removed)
    pub new: String,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    /// Source that supplied the new value, when provenance knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// An updated entity: both snapshots plus the per-field changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Update<T> {
    pub before: T,
    pub after: T,
    pub fields: Vec<FieldChange>,
}

/// Added/removed/updated partition for one resource kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeGroup<T> {
    #[serde(default = "Vec::new")]
    pub added: Vec<T>,
    #[serde(default = "Vec::new")]
    pub removed: Vec<T>,
    #[serde(default = "Vec::new")]
    pub updated: Vec<Update<T>>,
}

impl<T> Default for ChangeGroup<T> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            removed: Vec::new(),
            updated: Vec::new(),
        }
    }
}

impl<T: Clone> ChangeGroup<T> {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }

    fn filter(&self, strategy: ApplyStrategy) -> Self {
        match strategy {
            ApplyStrategy::All => self.clone(),
            ApplyStrategy::Additive => Self {
                added: self.added.clone(),
                removed: Vec::new(),
                updated: self.updated.clone(),
            },
            ApplyStrategy::UpdatesOnly => Self {
                added: Vec::new(),
                removed: Vec::new(),
                updated: self.updated.clone(),
            },
            ApplyStrategy::AdditionsOnly => Self {
                added: self.added.clone(),
                removed: Vec::new(),
                updated: Vec::new(),
            },
        }
    }

    fn counts(&self) -> KindCounts {
        KindCounts {
            added: self.added.len(),
            updated: self.updated.len(),
            removed: self.removed.len(),
        }
    }
}

/// How a changeset is narrowed before being applied.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ApplyStrategy {
    #[default]
    All,
    /// Keep additions and updates; drop removals
    Additive,
    UpdatesOnly,
    AdditionsOnly,
}

/// Per-kind change counts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct KindCounts {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
}

impl KindCounts {
    pub fn total(&self) -> usize {
        self.added + self.updated + self.removed
    }
}

/// Aggregate statistics, recomputed whenever a changeset is filtered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ChangeSummary {
    pub providers: KindCounts,
    pub models: KindCounts,
    pub authors: KindCounts,
    pub total_changes: usize,
}

/// The structural delta between two catalog snapshots, partitioned by kind
/// and operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Changeset {
    pub providers: ChangeGroup<Provider>,
    pub models: ChangeGroup<ModelEntry>,
    pub authors: ChangeGroup<Author>,
    pub summary: ChangeSummary,
}

impl Changeset {
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty() && self.models.is_empty() && self.authors.is_empty()
    }

    /// Produce a filtered changeset per the apply strategy. Filtering is
    /// idempotent and always recomputes the summary.
    pub fn filter(&self, strategy: ApplyStrategy) -> Changeset {
        let mut filtered = Changeset {
            providers: self.providers.filter(strategy),
            models: self.models.filter(strategy),
            authors: self.authors.filter(strategy),
            summary: ChangeSummary::default(),
        };
        filtered.recompute_summary();
        filtered
    }

    pub fn recompute_summary(&mut self) {
        let providers = self.providers.counts();
        let models = self.models.counts();
        let authors = self.authors.counts();
        self.summary = ChangeSummary {
            providers,
            models,
            authors,
            total_changes: providers.total() + models.total() + authors.total(),
        };
    }
}
