//! The typed template helpers.
//!
//! Every helper is a plain function over [`minijinja::Value`] so it can be
//! called directly from Rust and registered with the engine unchanged.

use minijinja::value::{Rest, Value, ValueKind};

use crate::rewrite::PLACEHOLDER;

/// Target used for output of the `log` helper.
pub const LOG_TARGET: &str = "plinth::template";

/// `webRoot()`: the deferred web-root placeholder.
///
/// Marked safe so HTML auto-escaping leaves the token intact for the
/// rewriter.
pub fn web_root() -> Value {
    Value::from_safe_string(PLACEHOLDER.to_string())
}

/// `config(data)`: returns its argument unchanged.
pub fn config(data: Value) -> Value {
    data
}

/// `ifEquals(a, b, then, else)`: picks `then` when `a` and `b` are strictly
/// equal, otherwise `else` (an empty string when omitted).
pub fn if_equals(a: Value, b: Value, then: Value, otherwise: Option<Value>) -> Value {
    if strict_equals(&a, &b) {
        then
    } else {
        otherwise.unwrap_or_else(|| Value::from(""))
    }
}

/// `log(data...)`: writes its arguments to the build log. Renders nothing.
pub fn log(args: Rest<Value>) -> String {
    let line = args
        .iter()
        .map(describe)
        .collect::<Vec<_>>()
        .join(" ");

    tracing::info!(target: LOG_TARGET, "{}", line);

    String::new()
}

/// `limit(seq, n)`: the first `n` items of a sequence.
///
/// Anything that is not a sequence yields an empty sequence. A negative `n`
/// counts back from the end, so `limit([1, 2, 3], -1)` is `[1, 2]`.
///
/// `n` is coerced the way a JavaScript slice bound is: a missing, undefined
/// or none count keeps every item, numeric strings and fractional numbers
/// are truncated, `true` is 1, and anything else counts as 0.
pub fn limit(seq: Value, n: Option<Value>) -> Value {
    if !matches!(seq.kind(), ValueKind::Seq | ValueKind::Iterable) {
        return Value::from(Vec::<Value>::new());
    }

    let Ok(iter) = seq.try_iter() else {
        return Value::from(Vec::<Value>::new());
    };

    let items: Vec<Value> = iter.collect();
    let Some(n) = slice_count(n.as_ref()) else {
        return Value::from(items);
    };

    let count = usize::try_from(n.unsigned_abs()).unwrap_or(usize::MAX);
    let end = if n < 0 {
        items.len().saturating_sub(count)
    } else {
        count.min(items.len())
    };

    Value::from(items[..end].to_vec())
}

/// Integer count for [`limit`]; `None` keeps the whole sequence.
fn slice_count(n: Option<&Value>) -> Option<i64> {
    let n = n?;

    match n.kind() {
        ValueKind::Undefined | ValueKind::None => None,
        ValueKind::Bool => Some(i64::from(n.is_true())),
        ValueKind::Number => Some(
            i64::try_from(n.clone())
                .or_else(|_| f64::try_from(n.clone()).map(|f| f as i64))
                .unwrap_or(0),
        ),
        ValueKind::String => {
            let text = n.as_str().unwrap_or_default().trim();
            Some(
                text.parse::<i64>()
                    .or_else(|_| text.parse::<f64>().map(|f| f as i64))
                    .unwrap_or(0),
            )
        }
        _ => Some(0),
    }
}

/// Equality without cross-kind coercion: `5` never equals `"5"` and `true`
/// never equals `1`, at any nesting level.
pub fn strict_equals(a: &Value, b: &Value) -> bool {
    if a.kind() != b.kind() {
        return false;
    }

    match a.kind() {
        ValueKind::Seq | ValueKind::Iterable => {
            let (Ok(left), Ok(right)) = (a.try_iter(), b.try_iter()) else {
                return false;
            };
            let left: Vec<Value> = left.collect();
            let right: Vec<Value> = right.collect();

            left.len() == right.len()
                && left
                    .iter()
                    .zip(right.iter())
                    .all(|(l, r)| strict_equals(l, r))
        }
        ValueKind::Map => {
            if a.len() != b.len() {
                return false;
            }
            let Ok(keys) = a.try_iter() else {
                return false;
            };

            keys.into_iter().all(|key| {
                match (a.get_item(&key), b.get_item(&key)) {
                    (Ok(l), Ok(r)) if !r.is_undefined() => strict_equals(&l, &r),
                    _ => false,
                }
            })
        }
        _ => a == b,
    }
}

fn describe(value: &Value) -> String {
    match value.kind() {
        ValueKind::String => value.as_str().unwrap_or_default().to_string(),
        _ => format!("{value:?}"),
    }
}
