//! Deterministic host identifiers
//!
//! Host ids are derived from hardware keys so the same device always maps to
//! the same id across restarts and repeated discovery.

const UNKNOWN: &str = "unknown";

/// Reduce an arbitrary key to `[a-z0-9-]`, with no leading, trailing or
/// repeated dashes; an empty result becomes `"unknown"`
pub fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            out.push(ch);
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }

    while out.ends_with('-') {
        out.pop();
    }

    if out.is_empty() {
        UNKNOWN.to_string()
    } else {
        out
    }
}

/// Host device id for a device key
pub fn device_id(device_key: &str) -> String {
    format!("device-{}", sanitize(device_key))
}

/// Host entity id for a discovery unique id
pub fn entity_id(unique_id: &str) -> String {
    format!("entity-{}", sanitize(unique_id))
}
