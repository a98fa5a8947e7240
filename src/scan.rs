//! Depth-first scanning of arbitrarily nested JSON for identifier-shaped
//! strings. The hitlist endpoints return payloads with no fixed schema, so
//! both the resolver and the related-record fetch share this walk instead of
//! each hand-rolling their own.

use serde_json::Value;

/// Returns the first string in depth-first traversal order for which the
/// predicate holds. Object members are visited in payload order, then
/// recursed into; no ranking is applied.
pub fn find_first<'a, P>(value: &'a Value, pred: &P) -> Option<&'a str>
where
    P: Fn(&str) -> bool,
{
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            pred(trimmed).then_some(trimmed)
        }
        Value::Array(items) => items.iter().find_map(|item| find_first(item, pred)),
        Value::Object(map) => map.values().find_map(|item| find_first(item, pred)),
        _ => None,
    }
}

/// Collects every matching string in traversal order, de-duplicating while
/// preserving first-seen order.
pub fn collect_unique<P>(value: &Value, pred: &P) -> Vec<String>
where
    P: Fn(&str) -> bool,
{
    let mut out = Vec::new();
    collect_into(value, pred, &mut out);
    out
}

fn collect_into<P>(value: &Value, pred: &P, out: &mut Vec<String>)
where
    P: Fn(&str) -> bool,
{
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if pred(trimmed) && !out.iter().any(|seen| seen == trimmed) {
                out.push(trimmed.to_string());
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_into(item, pred, out);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_into(item, pred, out);
            }
        }
        _ => {}
    }
}
