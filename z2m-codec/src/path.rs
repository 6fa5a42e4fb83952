//! Dotted path lookup inside JSON state payloads

use serde_json::Value;

/// Walk `value` along a dotted path such as `color.x` or `readings.0`
///
/// Object segments are looked up by key, array segments by numeric index.
/// Returns `None` for an empty path or when any segment is missing.
pub fn extract_path<'a>(value: &'a Value, dotted: &str) -> Option<&'a Value> {
    if dotted.is_empty() {
        return None;
    }

    dotted
        .split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}
