//! Column extraction from filter expressions
//!
//! Filter text comes straight from the engine and may be arbitrarily large, so
//! the input is clipped to a byte budget and matched with the `regex` crate,
//! whose automaton-based engine runs in time linear in the input.

use indexmap::IndexSet;
use regex::Regex;
use std::sync::LazyLock;

// `( [ ( ] ["]name["] [ ) ] [ ::type ] op`, covering PostgreSQL's
// `((status)::text = 'x'::text)` and qualified `(o.user_id = u.id)` shapes.
static PREDICATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\(\s*\(?\s*"?([a-z_][a-z0-9_$]*(?:\.[a-z_][a-z0-9_$]*)*)"?\s*\)?(?:::[a-z_ ]+?(?:\[\])?)?\s*(?:<>|!=|<=|>=|!~~\*?|~~\*?|=|<|>|\b(?:like|ilike|in|is|not)\b)"#,
    )
    .expect("valid regex")
});

// Single-quoted literal with '' escapes; an unterminated one runs to the end
static STRING_LITERAL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'(?:[^']|'')*(?:'|$)").expect("valid regex"));

/// Extracts the column names compared in `(col op ...)` fragments of `filter`
///
/// Only the first `max_len` bytes are examined and quoted literals are ignored.
/// Qualified names keep their last segment and every name is reduced to
/// `[A-Za-z0-9_]`. Order of first
/// appearance is preserved; duplicates are dropped.
pub fn extract_filter_columns(filter: &str, max_len: usize) -> IndexSet<String> {
    let filter = STRING_LITERAL_REGEX.replace_all(clip(filter, max_len), "''");

    PREDICATE_REGEX
        .captures_iter(&filter)
        .filter_map(|caps| caps.get(1))
        .filter_map(|name| sanitize_identifier(last_segment(name.as_str())))
        .collect()
}

/// Reduces `raw` to `[A-Za-z0-9_]`, or `None` if nothing is left
pub fn sanitize_identifier(raw: &str) -> Option<String> {
    let clean: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    (!clean.is_empty()).then_some(clean)
}

/// Returns the longest prefix of `text` no longer than `max_len` bytes
pub(crate) fn clip(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn last_segment(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}
