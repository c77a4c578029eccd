//! Description rendering.
//!
//! Rendering is pure: the same templates, values and separator always give
//! the same description. The server uses it for previews and the recompute
//! pipeline uses it for the text that is pushed, so the two never disagree.

use std::collections::HashMap;

use crate::placeholder::substitute;

/// One template's content together with the values used to render it.
#[derive(Debug, Clone, Copy)]
pub struct Segment<'a> {
    pub content: &'a str,
    pub values: &'a HashMap<String, String>,
}

/// Render a single template, leaving placeholders without a value verbatim.
pub fn render_template(content: &str, values: &HashMap<String, String>) -> String {
    substitute(content, |name| values.get(name).map(String::as_str))
}

/// Render `templates` in order with a shared value map and join the segments
/// with `separator`.
pub fn build_description<S: AsRef<str>>(
    templates: &[S],
    values: &HashMap<String, String>,
    separator: &str,
) -> String {
    let segments: Vec<Segment<'_>> = templates
        .iter()
        .map(|content| Segment {
            content: content.as_ref(),
            values,
        })
        .collect();
    build_scoped(&segments, separator)
}

/// Render segments that each carry their own value map and join them with
/// `separator`.
///
/// Variables are stored per (template, name), so the same placeholder may
/// resolve differently in two templates of one container.
pub fn build_scoped(segments: &[Segment<'_>], separator: &str) -> String {
    segments
        .iter()
        .map(|segment| render_template(segment.content, segment.values))
        .collect::<Vec<_>>()
        .join(separator)
}
