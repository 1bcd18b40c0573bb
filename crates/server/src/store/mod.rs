//! Persistence for threads and messages. Every mutation of inbox state goes through here.

pub mod attachments;
pub mod lifecycle;
pub mod messages;
pub mod reactions;
pub mod threads;
pub mod users;

/// `?, ?, ?` for an IN clause of `n` values.
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(",")
}

/// Full Unicode lowercase for the `*_search` columns and the patterns matched against them.
pub(crate) fn fold_case(input: &str) -> String {
    input.to_lowercase()
}

/// Escape `%`, `_` and `\` for use in a LIKE pattern with `ESCAPE '\'`.
pub(crate) fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
