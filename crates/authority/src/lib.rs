//! The authority table: a declarative ranking of which source is trusted
//! for which field.
//!
//! Entries map a field-path pattern and a source id to a score in `[0, 1]`.
//! Lookup picks the most specific matching pattern for a `(field, source)`
//! pair; fields no entry covers fall back to a neutral default so every
//! source can still contribute data it alone observed.

use serde::{Deserialize, Serialize};

use crate::starmap_core::fieldpath::field_matches;

/// Score assigned to `(field, source)` pairs no entry covers.
pub const DEFAULT_AUTHORITY: f64 = 0.5;

/// One row of the authority table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthorityEntry {
    /// Field-path pattern (glob dialect from `core::fieldpath`)
    pub field: String,
    /// Source id the entry applies to
    pub source: String,
    /// Trust score in `[0, 1]`
    pub score: f64,
}

impl AuthorityEntry {
    pub fn new(field: impl Into<String>, source: impl Into<String>, score: f64) -> Self {
        Self {
            field: field.into(),
            source: source.into(),
            score: score.clamp(0.0, 1.0),
        }
    }
}

/// The resolved authority for a `(field, source)` pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Authority {
    pub score: f64,
    /// Whether an explicit entry matched (as opposed to the neutral default).
    /// Declared authority is what lets an explicit numeric zero survive the
    /// merge as "explicitly free".
    pub declared: bool,
}

/// Process-wide declarative mapping `(field pattern, source) -> score`.
#[derive(Debug, Clone, Default)]
pub struct AuthorityTable {
    entries: Vec<AuthorityEntry>,
}

impl AuthorityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in table: the community dataset is trusted for pricing,
    /// limits, and metadata; live provider APIs are trusted for identity
    /// fields of the models they actually serve.
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        table.extend([
            AuthorityEntry::new("pricing.*", "models.dev", 0.9),
            AuthorityEntry::new("limits.*", "models.dev", 0.9),
            AuthorityEntry::new("metadata.*", "models.dev", 0.95),
            AuthorityEntry::new("features.tools", "models.dev", 0.85),
            AuthorityEntry::new("features.reasoning", "models.dev", 0.85),
            AuthorityEntry::new("features.structured_outputs", "models.dev", 0.85),
            AuthorityEntry::new("features.modalities.*", "models.dev", 0.85),
            AuthorityEntry::new("icon_url", "models.dev", 0.7),
            AuthorityEntry::new("name", "provider-api", 0.9),
            AuthorityEntry::new("description", "provider-api", 0.7),
            AuthorityEntry::new("authors", "provider-api", 0.8),
            AuthorityEntry::new("api_key.*", "embedded", 0.95),
            AuthorityEntry::new("catalog.*", "embedded", 0.9),
            AuthorityEntry::new("aliases", "embedded", 0.9),
            AuthorityEntry::new("features.streaming", "embedded", 0.8),
        ]);
        table
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = AuthorityEntry>) {
        self.entries.extend(entries);
    }

    pub fn entries(&self) -> &[AuthorityEntry] {
        &self.entries
    }

    /// Resolve the authority of `source` over `field`.
    ///
    /// Among matching entries the most specific pattern wins (more path
    /// segments beat fewer; an exact pattern beats a glob of equal length);
    /// remaining ties resolve to the higher score.
    pub fn authority(&self, field: &str, source: &str) -> Authority {
        let mut best: Option<(&AuthorityEntry, usize, bool)> = None;
        for entry in &self.entries {
            if !entry.source.eq_ignore_ascii_case(source) {
                continue;
            }
            if !field_matches(&entry.field, field) {
                continue;
            }
            let segments = entry.field.split('.').count();
            let exact = !entry.field.contains('*');
            let better = match best {
                None => true,
                Some((current, cur_segments, cur_exact)) => {
                    (segments, exact, entry.score) > (cur_segments, cur_exact, current.score)
                }
            };
            if better {
                best = Some((entry, segments, exact));
            }
        }
        match best {
            Some((entry, _, _)) => Authority {
                score: entry.score,
                declared: true,
            },
            None => Authority {
                score: DEFAULT_AUTHORITY,
                declared: false,
            },
        }
    }

    /// Whether `source` explicitly declares authority over `field`.
    pub fn declares(&self, field: &str, source: &str) -> bool {
        self.authority(field, source).declared
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn most_specific_pattern_wins() {
        let mut table = AuthorityTable::new();
        table.extend([
            AuthorityEntry::new("pricing.*", "models.dev", 0.9),
            AuthorityEntry::new("pricing.tokens.input.per_1m", "models.dev", 0.4),
        ]);
        let auth = table.authority("pricing.tokens.input.per_1m", "models.dev");
        assert_eq!(auth.score, 0.4);
        let auth = table.authority("pricing.tokens.output.per_1m", "models.dev");
        assert_eq!(auth.score, 0.9);
    }

    #[test]
    fn unmatched_pairs_get_the_neutral_default() {
        let table = AuthorityTable::with_defaults();
        let auth = table.authority("headquarters", "models.dev");
        assert_eq!(auth.score, DEFAULT_AUTHORITY);
        assert!(!auth.declared);
    }

    #[test]
    fn scores_are_clamped() {
        let entry = AuthorityEntry::new("name", "x", 3.5);
        assert_eq!(entry.score, 1.0);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let table = AuthorityTable::with_defaults();
        assert!(table.declares("PRICING.tokens.input.per_1m", "models.dev"));
    }
}
