//! Recover executable code from free-form text that may carry markdown fencing.

use crate::execution::Language;

const FENCE: &str = "```";

/// Strip surrounding whitespace, one opening fence (tagged with one of the
/// language's aliases, or bare), one closing fence, and any leftover
/// backticks at either end.
///
/// Idempotent: the result never starts or ends with a backtick or whitespace.
pub fn normalize(raw: &str, language: Language) -> String {
    let mut code = raw.trim();

    if let Some(rest) = code.strip_prefix(FENCE) {
        code = strip_language_tag(rest, language).unwrap_or(rest);
    }
    if let Some(rest) = code.strip_suffix(FENCE) {
        code = rest;
    }

    code.trim()
        .trim_matches(|c: char| c == '`' || c.is_whitespace())
        .to_string()
}

/// `rest` with a leading tag for `language` removed, if the tag is a whole word.
fn strip_language_tag(rest: &str, language: Language) -> Option<&str> {
    language.aliases().iter().find_map(|tag| {
        let after = rest.strip_prefix(tag)?;
        match after.chars().next() {
            None => Some(after),
            Some(c) if c.is_whitespace() => Some(after),
            Some(_) => None,
        }
    })
}
