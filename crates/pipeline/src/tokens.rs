//! Literal token replacement and fragment joining shared by the color
//! substitutor and the template renderer.

use std::sync::LazyLock;

use regex::Regex;

/// Separator between prompt fragments.
pub const FRAGMENT_SEPARATOR: &str = ", ";

/// Bracket tokens that look like role placeholders, e.g. `[R1]`.
static BRACKET_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[A-Z0-9_\-]+\]").expect("valid regex"));

/// Replace every occurrence of each `(token, value)` pair in one
/// left-to-right pass.
///
/// Inserted values are never rescanned, so a value containing another
/// token is emitted verbatim. When several tokens match at the same
/// position the longest wins. Empty tokens are ignored.
pub fn replace_tokens(text: &str, bindings: &[(&str, &str)]) -> String {
    if bindings.iter().all(|(token, _)| token.is_empty()) {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(ch) = rest.chars().next() {
        let matched = bindings
            .iter()
            .filter(|(token, _)| !token.is_empty() && rest.starts_with(token))
            .max_by_key(|(token, _)| token.len());

        match matched {
            Some((token, value)) => {
                out.push_str(value);
                rest = &rest[token.len()..];
            }
            None => {
                out.push(ch);
                rest = &rest[ch.len_utf8()..];
            }
        }
    }
    out
}

/// Join fragments with [`FRAGMENT_SEPARATOR`], trimming each and dropping
/// empty ones.
pub fn join_fragments<'a>(fragments: impl IntoIterator<Item = &'a str>) -> String {
    fragments
        .into_iter()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect::<Vec<_>>()
        .join(FRAGMENT_SEPARATOR)
}

/// Distinct bracket tokens in `template`, in order of first appearance.
pub fn bracket_tokens(template: &str) -> Vec<&str> {
    let mut tokens: Vec<&str> = Vec::new();
    for m in BRACKET_TOKEN_RE.find_iter(template) {
        if !tokens.contains(&m.as_str()) {
            tokens.push(m.as_str());
        }
    }
    tokens
}
