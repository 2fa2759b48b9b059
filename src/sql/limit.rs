//! Row limit injection for ad-hoc queries.

use regex::{NoExpand, Regex};
use std::sync::OnceLock;

/// Matches an existing `limit <n>` clause.
fn limit_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\blimit\s+\d+").expect("limit pattern is valid"))
}

/// Rewrites a query so that it returns at most `limit` rows.
///
/// An existing `limit <n>` has its first occurrence replaced. Otherwise a
/// trailing `;` is dropped and ` limit <n>;` appended.
pub fn apply_limit(sql: &str, limit: usize) -> String {
    let pattern = limit_pattern();
    let replacement = format!("limit {limit}");

    if pattern.is_match(sql) {
        return pattern
            .replacen(sql, 1, NoExpand(&replacement))
            .into_owned();
    }

    let trimmed = sql.trim_end();
    let base = trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end();
    format!("{base} {replacement};")
}
