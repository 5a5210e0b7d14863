//! Structural deep merge used when several union members parse the same input.

use crate::value::Value;

/// Merge `b` over `a`.
///
/// Objects merge key-wise, arrays merge index-wise up to the longer length,
/// anything else takes `b`. An `Undefined` on the right never erases the left.
pub fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (a, Value::Undefined) => a,
        (Value::Object(mut left), Value::Object(right)) => {
            for (k, rv) in right {
                match left.get_mut(&k) {
                    Some(slot) => {
                        let lv = std::mem::take(slot);
                        *slot = deep_merge(lv, rv);
                    }
                    None => {
                        left.insert(k, rv);
                    }
                }
            }
            Value::Object(left)
        }
        (Value::Array(left), Value::Array(right)) => {
            let n = left.len().max(right.len());
            let mut left = left.into_iter();
            let mut right = right.into_iter();
            let mut out = Vec::with_capacity(n);
            for _ in 0..n {
                let item = match (left.next(), right.next()) {
                    (Some(l), Some(r)) => deep_merge(l, r),
                    (Some(l), None) => l,
                    (None, Some(r)) => r,
                    (None, None) => Value::Undefined,
                };
                out.push(item);
            }
            Value::Array(out)
        }
        (_, b) => b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn v(j: serde_json::Value) -> Value {
        Value::from(j)
    }

    #[test]
    fn objects_merge_keywise_and_recursively() {
        let out = deep_merge(v(json!({"a": 1, "n": {"x": 1}})), v(json!({"b": 2, "n": {"y": 2}})));
        assert_eq!(out.to_json(), json!({"a": 1, "n": {"x": 1, "y": 2}, "b": 2}));
    }

    #[test]
    fn arrays_merge_by_index_not_concatenation() {
        let out = deep_merge(v(json!([{"a": 1}, 5, 6])), v(json!([{"b": 2}, 9])));
        assert_eq!(out.to_json(), json!([{"a": 1, "b": 2}, 9, 6]));
    }

    #[test]
    fn later_scalar_wins_and_undefined_does_not_erase() {
        assert_eq!(deep_merge(v(json!(1)), v(json!("x"))), v(json!("x")));
        assert_eq!(deep_merge(v(json!({"a": 1})), v(json!([1]))), v(json!([1])));
        assert_eq!(deep_merge(v(json!(1)), Value::Undefined), v(json!(1)));
    }
}
