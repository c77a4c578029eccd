//! Placeholder scanning for template text.
//!
//! A placeholder is a name wrapped in double braces, e.g. `{{ coupon }}`.
//! Whitespace inside the braces is trimmed, names are case-sensitive and may
//! not contain braces or line breaks. Anything that does not match is plain
//! text: templates are free-form, so scanning never fails.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{([^{}\r\n]+)\}\}").expect("placeholder pattern is valid")
});

/// Returns the trimmed placeholder name of a match, or `None` when it is blank.
fn placeholder_name<'t>(caps: &Captures<'t>) -> Option<&'t str> {
    let name = caps.get(1)?.as_str().trim();
    (!name.is_empty()).then_some(name)
}

/// Extract the distinct placeholder names referenced by `text`, in order of
/// first occurrence.
pub fn extract_variables(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();

    for caps in PLACEHOLDER.captures_iter(text) {
        if let Some(name) = placeholder_name(&caps)
            && seen.insert(name)
        {
            names.push(name.to_string());
        }
    }

    names
}

/// Replace every placeholder in `text` for which `lookup` yields a value.
///
/// Placeholders without a value are kept verbatim so unresolved markers stay
/// visible in the output.
pub fn substitute<'a, F>(text: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<&'a str>,
{
    PLACEHOLDER
        .replace_all(text, |caps: &Captures<'_>| {
            match placeholder_name(caps).and_then(&lookup) {
                Some(value) => value.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
