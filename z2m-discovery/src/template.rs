//! Value template path extraction
//!
//! Discovery payloads carry Jinja-style `value_template`s such as
//! `{{ value_json['state'] }}` or `{{ value_json.color.x }}`. The bridge does not
//! evaluate templates; it only finds which key path under `value_json` the
//! template reads, so the state decoder can pull that value out of a JSON
//! state payload.

const VALUE_JSON_MARKER: &str = "value_json.";

/// Bracket-subscript fragments and their dotted replacements, applied in order
const SUBSCRIPT_REWRITES: [(&str, &str); 8] = [
    ("']['", "."),
    ("'][\"", "."),
    ("\"]['", "."),
    ("\"][\"", "."),
    ("['", "."),
    ("[\"", "."),
    ("']", ""),
    ("\"]", ""),
];

/// Extract the dotted key path a template reads from `value_json`
///
/// Returns an empty string when the template does not reference a nested
/// value (e.g. `{{ value }}`) or is empty.
pub fn value_template_path(template: &str) -> String {
    if template.is_empty() {
        return String::new();
    }

    let mut normalized: String = template.chars().filter(|c| !c.is_whitespace()).collect();
    for (from, to) in SUBSCRIPT_REWRITES {
        normalized = normalized.replace(from, to);
    }

    let Some(index) = normalized.find(VALUE_JSON_MARKER) else {
        return String::new();
    };

    let rest = &normalized[index + VALUE_JSON_MARKER.len()..];
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
        .unwrap_or(rest.len());

    rest[..end].to_string()
}
