//! Small text helpers shared by the modules.

pub mod isbn;

/// Escape `%`, `_` and the escape character itself for a `LIKE ... ESCAPE '\'` pattern.
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Trim a free-text query; blank input becomes `None`.
pub fn clean_query(input: Option<&str>) -> Option<String> {
    input
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
}
