// Module: Resolver
// Just-in-time substitution of `{expr}` placeholders inside step params,
// against the evolving execution context. Pure: works on a deep copy, never
// touches its input and never fails -- an unresolvable placeholder stays in
// the output exactly as written.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::context::ExecutionContext;

// A placeholder is a dotted path of segments, each optionally indexed:
// {stepId}, {stepId.output.token}, {stepId.output.items[2]}, {testCaseId}.
// The character class is deliberately narrow so that JSON text embedded by a
// previous resolution round ({"success":true, ...}) can never match again.
static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([A-Za-z0-9_#\-]+(?:\[\d+\])?(?:\.[A-Za-z0-9_#\-]+(?:\[\d+\])?)*)\}")
        .expect("valid placeholder regex")
});

/// Resolves every placeholder inside `value`, recursing through sequences
/// and mappings. Non-string scalars pass through unchanged.
pub fn resolve(value: &Value, context: &ExecutionContext) -> Value {
    match value {
        Value::String(s) => Value::String(resolve_str(s, context)),
        Value::Array(items) => {
            Value::Array(items.iter().map(|item| resolve(item, context)).collect())
        }
        Value::Object(map) => {
            let mut resolved = Map::with_capacity(map.len());
            for (key, item) in map {
                resolved.insert(key.clone(), resolve(item, context));
            }
            Value::Object(resolved)
        }
        other => other.clone(),
    }
}

/// Substitutes placeholders inside a single string.
///
/// Structures embed as their JSON text, scalars as their string form.
/// A placeholder whose path misses is copied through literally.
pub fn resolve_str(input: &str, context: &ExecutionContext) -> String {
    let mut result = String::new();
    let mut last_index = 0;

    for capture in PLACEHOLDER_RE.captures_iter(input) {
        let matched = match capture.get(0) {
            Some(m) => m,
            None => continue,
        };
        result.push_str(&input[last_index..matched.start()]);
        match capture.get(1).and_then(|expr| lookup_path(expr.as_str(), context)) {
            Some(value) => result.push_str(&render(&value)),
            None => result.push_str(matched.as_str()),
        }
        last_index = matched.end();
    }

    result.push_str(&input[last_index..]);
    result
}

/// Walks a dotted/bracketed path against the context.
///
/// The first segment must be `testCaseId`, `testCaseName` or the id of a
/// completed step (which resolves to the JSON form of its full result);
/// later segments descend into that tree. Any miss -- unknown root, absent
/// key, out-of-range index, scalar in the middle -- returns `None`.
///
/// Shared with the assertion evaluator, which uses it for `[var]`
/// references.
pub fn lookup_path(expr: &str, context: &ExecutionContext) -> Option<Value> {
    let mut segments = expr.split('.');

    let (root, root_index) = split_index(segments.next()?)?;
    let mut current = match root {
        "testCaseId" => Value::String(context.test_case_id.clone()),
        "testCaseName" => Value::String(context.test_case_name.clone()),
        step_id => serde_json::to_value(context.result_of(step_id)?).ok()?,
    };
    if let Some(index) = root_index {
        current = current.get(index)?.clone();
    }

    for segment in segments {
        let (key, index) = split_index(segment)?;
        current = current.get(key)?.clone();
        if let Some(index) = index {
            current = current.get(index)?.clone();
        }
    }

    Some(current)
}

// "items[3]" -> ("items", Some(3)); "items" -> ("items", None).
// Anything else (empty key, unclosed bracket, non-numeric index) is a miss.
fn split_index(segment: &str) -> Option<(&str, Option<usize>)> {
    match segment.find('[') {
        None => Some((segment, None)),
        Some(open) => {
            if !segment.ends_with(']') || open == 0 {
                return None;
            }
            let index = segment[open + 1..segment.len() - 1].parse().ok()?;
            Some((&segment[..open], Some(index)))
        }
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
