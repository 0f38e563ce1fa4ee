//! Dotted field paths and the glob dialect used to filter them.
//!
//! Matching is case-insensitive. A pattern segment of `*` matches exactly
//! one path segment; a trailing `.*` matches the stem itself and any number
//! of segments below it (`pricing.*` matches both `pricing` and
//! `pricing.tokens.input.per_1m`).

/// Match a field path against a glob pattern.
pub fn field_matches(pattern: &str, path: &str) -> bool {
    let pattern = pattern.trim();
    let path = path.trim();
    if pattern.is_empty() || pattern == "*" {
        return true;
    }

    if let Some(stem) = pattern.strip_suffix(".*") {
        let stem_segments: Vec<&str> = stem.split('.').collect();
        let path_segments: Vec<&str> = path.split('.').collect();
        if path_segments.len() < stem_segments.len() {
            return false;
        }
        return stem_segments
            .iter()
            .zip(path_segments.iter())
            .all(|(p, s)| segment_matches(p, s));
    }

    let pattern_segments: Vec<&str> = pattern.split('.').collect();
    let path_segments: Vec<&str> = path.split('.').collect();
    pattern_segments.len() == path_segments.len()
        && pattern_segments
            .iter()
            .zip(path_segments.iter())
            .all(|(p, s)| segment_matches(p, s))
}

fn segment_matches(pattern: &str, segment: &str) -> bool {
    pattern == "*" || pattern.eq_ignore_ascii_case(segment)
}

/// Whether any pattern in `patterns` matches `path`.
pub fn any_field_matches<'a, I>(patterns: I, path: &str) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    patterns.into_iter().any(|p| field_matches(p, path))
}
