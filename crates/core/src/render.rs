//! Stable string renderings for changeset display.
//!
//! The differ reports old/new values as strings; these helpers keep the
//! renderings deterministic across runs: token counts compress to `1.2M`,
//! pricing renders as six-decimal USD, dates as ISO-8601, booleans as
//! `true`/`false`, and modality lists comma-joined.

use crate::starmap_core::fieldpath::field_matches;
use crate::starmap_types::Value;

/// Render a token count for display (`128K`, `1.2M`).
pub fn format_tokens(count: i64) -> String {
    const M: i64 = 1_000_000;
    const K: i64 = 1_000;
    if count >= M {
        if count % M == 0 {
            format!("{}M", count / M)
        } else {
            format!("{:.1}M", count as f64 / M as f64)
        }
    } else if count >= K {
        if count % K == 0 {
            format!("{}K", count / K)
        } else {
            format!("{:.1}K", count as f64 / K as f64)
        }
    } else {
        count.to_string()
    }
}

/// Render a price as six-decimal USD.
pub fn format_price(rate: f64) -> String {
    format!("${:.6}", rate)
}

/// Render a leaf value for changeset display, using the field path to pick
/// the right formatting.
pub fn render_field(path: &str, value: &Value) -> String {
    match value {
        Value::Int(n) if field_matches("limits.*", path) => format_tokens(*n),
        Value::Float(f) if field_matches("pricing.*", path) => format_price(*f),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Str(s) => s.clone(),
        Value::Date(d) => d.format("%Y-%m-%d").to_string(),
        Value::Timestamp(t) => t.to_rfc3339(),
        Value::List(items) => items
            .iter()
            .map(|v| render_field(path, v))
            .collect::<Vec<_>>()
            .join(","),
        Value::Map(_) => value.to_yaml(),
    }
}
