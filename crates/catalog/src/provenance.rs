//! Per-field provenance: which source supplied which value, when, and why.
//!
//! The store is a multi-level map keyed by `(resource kind, resource id,
//! field path)`; each leaf keeps a bounded history ring, newest first on
//! read. Writes are append-only within a sync; older records are retained
//! across syncs to form history.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::starmap_core::fieldpath::field_matches;
use crate::starmap_types::{ResourceKind, Value};

/// History entries kept per field before the oldest are dropped.
const MAX_HISTORY: usize = 32;

/// One provenance entry: a source's claim about a field value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProvenanceRecord {
    pub kind: ResourceKind,
    /// Resource id; models use the qualified `provider/model` form
    pub resource_id: String,
    /// Dotted field path (e.g., `pricing.tokens.input.per_1m`)
    pub field: String,
    pub value: Value,
    /// Source id that supplied the value
    pub source: String,
    /// Authority score the selection used, in `[0, 1]`
    pub authority: f64,
    /// Confidence in the value itself, in `[0, 1]`
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

type FieldHistory = BTreeMap<String, Vec<ProvenanceRecord>>;

/// Append-only store of provenance records, queryable by resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProvenanceStore {
    records: BTreeMap<(ResourceKind, String), FieldHistory>,
}

impl ProvenanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. History per field is bounded; the oldest entries
    /// fall off once the ring is full.
    pub fn record(&mut self, record: ProvenanceRecord) {
        let history = self
            .records
            .entry((record.kind, record.resource_id.clone()))
            .or_default()
            .entry(record.field.clone())
            .or_default();
        history.push(record);
        if history.len() > MAX_HISTORY {
            let overflow = history.len() - MAX_HISTORY;
            history.drain(..overflow);
        }
    }

    /// All per-field history for one resource, newest first. Returns copies.
    pub fn find_by_resource(
        &self,
        kind: ResourceKind,
        resource_id: &str,
    ) -> BTreeMap<String, Vec<ProvenanceRecord>> {
        self.find_by_resource_fields(kind, resource_id, "*")
    }

    /// Like [`find_by_resource`](Self::find_by_resource) but restricted to
    /// fields matching a glob pattern (case-insensitive; `pricing.*` matches
    /// the whole pricing subtree).
    pub fn find_by_resource_fields(
        &self,
        kind: ResourceKind,
        resource_id: &str,
        field_pattern: &str,
    ) -> BTreeMap<String, Vec<ProvenanceRecord>> {
        let mut out = BTreeMap::new();
        if let Some(fields) = self.records.get(&(kind, resource_id.to_string())) {
            for (field, history) in fields {
                if !field_matches(field_pattern, field) {
                    continue;
                }
                let mut copies = history.clone();
                copies.reverse();
                out.insert(field.clone(), copies);
            }
        }
        out
    }

    /// The most recent record for a single field, if any.
    pub fn latest(
        &self,
        kind: ResourceKind,
        resource_id: &str,
        field: &str,
    ) -> Option<ProvenanceRecord> {
        self.records
            .get(&(kind, resource_id.to_string()))
            .and_then(|fields| fields.get(field))
            .and_then(|history| history.last())
            .cloned()
    }

    /// All records satisfying a predicate, in storage order.
    pub fn query<F>(&self, predicate: F) -> Vec<ProvenanceRecord>
    where
        F: Fn(&ProvenanceRecord) -> bool,
    {
        let mut out = Vec::new();
        for fields in self.records.values() {
            for history in fields.values() {
                for record in history {
                    if predicate(record) {
                        out.push(record.clone());
                    }
                }
            }
        }
        out
    }

    /// Total number of stored records.
    pub fn record_count(&self) -> usize {
        self.records
            .values()
            .flat_map(|fields| fields.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }

    /// Resource keys present in the store.
    pub fn resources(&self) -> Vec<(ResourceKind, String)> {
        self.records.keys().cloned().collect()
    }

    /// Render one resource's history (optionally field-filtered) as YAML
    /// for display.
    pub fn render_resource(
        &self,
        kind: ResourceKind,
        resource_id: &str,
        field_pattern: &str,
    ) -> String {
        let history = self.find_by_resource_fields(kind, resource_id, field_pattern);
        serde_yaml::to_string(&history).unwrap_or_default()
    }
}
