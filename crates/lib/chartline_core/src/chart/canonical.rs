//! Provider drift adapters.
//!
//! Some providers wrap JSON in a fenced code block, and some models answer
//! with snake_case keys. Both are mapped onto the canonical camelCase schema
//! before validation.

use serde_json::{Map, Value};

/// Top-level snake_case aliases and their canonical names.
const TOP_LEVEL_ALIASES: [(&str, &str); 3] = [
    ("chart_type", "chartType"),
    ("chart_config", "chartConfig"),
    ("txt_response", "txtResponse"),
];

/// `config` aliases and their canonical names.
const CONFIG_ALIASES: [(&str, &str); 2] = [("x_axis_key", "xAxisKey"), ("total_label", "totalLabel")];

/// Return the body of a ```json fenced block, or the trimmed input.
///
/// Input that already starts like a JSON document is never unwrapped, since
/// its strings may legitimately contain backticks.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return trimmed;
    }
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };
    let after_fence = &trimmed[start + 3..];
    // Skip the info string ("json", "JSON", ...) up to the end of the line.
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_fence[body_start..];
    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => trimmed,
    }
}

/// Rename snake_case keys to their canonical names.
///
/// A canonical key that is already present wins over its alias.
pub fn canonicalize(value: Value) -> Value {
    let Value::Object(mut obj) = value else {
        return value;
    };
    rename_aliases(&mut obj, &TOP_LEVEL_ALIASES);
    if let Some(Value::Object(config)) = obj.get_mut("config") {
        rename_aliases(config, &CONFIG_ALIASES);
    }
    Value::Object(obj)
}

fn rename_aliases(obj: &mut Map<String, Value>, aliases: &[(&str, &str)]) {
    for (alias, canonical) in aliases {
        if obj.contains_key(*canonical) {
            continue;
        }
        if let Some(v) = obj.shift_remove(*alias) {
            obj.insert((*canonical).to_string(), v);
        }
    }
}
