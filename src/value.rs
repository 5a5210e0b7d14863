//! Untyped runtime values fed into and produced by the runtypes.
//!
//! JSON alone cannot express a missing property, a date or a big integer, so
//! the engine works on its own `Value` and converts at the edges.

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};

pub type Object = IndexMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent property / tuple slot.
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    BigInt(i128),
    String(String),
    Date(DateTime<Utc>),
    Array(Vec<Value>),
    Object(Object),
}

static UNDEFINED: Value = Value::Undefined;

impl Value {
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(xs) => Some(xs),
            _ => None,
        }
    }

    /// Property lookup with JS semantics: non-objects and absent keys read as `Undefined`.
    pub fn get(&self, key: &str) -> &Value {
        match self {
            Value::Object(m) => m.get(key).unwrap_or(&UNDEFINED),
            _ => &UNDEFINED,
        }
    }

    /// Positional lookup; out of range reads as `Undefined`.
    pub fn at(&self, index: usize) -> &Value {
        match self {
            Value::Array(xs) => xs.get(index).unwrap_or(&UNDEFINED),
            _ => &UNDEFINED,
        }
    }

    /// Text used when a value selects a discriminated-union branch
    /// (object keys are strings, so scalar tags are stringified).
    pub fn tag_key(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(format_number(*n)),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as J;
        match self {
            Value::Undefined | Value::Null => J::Null,
            Value::Bool(b) => J::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::BigInt(n) => J::String(n.to_string()),
            Value::String(s) => J::String(s.clone()),
            Value::Date(d) => J::String(d.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Value::Array(xs) => J::Array(xs.iter().map(Value::to_json).collect()),
            Value::Object(m) => J::Object(
                m.iter()
                    .filter(|(_, v)| !v.is_undefined())
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Compact one-line rendering for diagnostics.
    pub fn preview(&self, max_chars: usize) -> String {
        let text = match self {
            Value::Undefined => "undefined".to_string(),
            Value::BigInt(n) => format!("{n}n"),
            Value::Date(d) => format!("Date({})", d.to_rfc3339_opts(SecondsFormat::Millis, true)),
            other => other.to_json().to_string(),
        };
        if text.chars().count() <= max_chars {
            return text;
        }
        let mut cut: String = text.chars().take(max_chars).collect();
        cut.push('…');
        cut
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        serde_json::Value::from(n as i64)
    } else {
        // NaN / ±Infinity have no JSON form; JSON.stringify writes null too
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

/// Render a number the way JS `String(n)` does for the common cases.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value as J;
        match v {
            J::Null => Value::Null,
            J::Bool(b) => Value::Bool(b),
            J::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            J::String(s) => Value::String(s),
            J::Array(xs) => Value::Array(xs.into_iter().map(Value::from).collect()),
            J::Object(m) => Value::Object(m.into_iter().map(|(k, v)| (k, Value::from(v))).collect()),
        }
    }
}

impl From<&serde_json::Value> for Value {
    fn from(v: &serde_json::Value) -> Self {
        Value::from(v.clone())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_keys_read_as_undefined() {
        let v = Value::from(json!({"a": 1}));
        assert_eq!(v.get("a"), &Value::Number(1.0));
        assert!(v.get("b").is_undefined());
        assert!(Value::Null.get("a").is_undefined());
        assert!(Value::from(json!([1])).at(3).is_undefined());
    }

    #[test]
    fn json_output_drops_undefined_members() {
        let mut m = Object::new();
        m.insert("a".into(), Value::Number(2.0));
        m.insert("b".into(), Value::Undefined);
        m.insert("c".into(), Value::Array(vec![Value::Undefined]));
        assert_eq!(Value::Object(m).to_json(), json!({"a": 2, "c": [null]}));
    }

    #[test]
    fn numbers_render_like_js() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(-0.5), "-0.5");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(Value::Number(3.0).to_json(), json!(3));
        assert_eq!(Value::Number(3.25).to_json(), json!(3.25));
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let v = Value::String("αβγδεζηθ".into());
        assert_eq!(v.preview(4), "\"αβγ…");
        assert_eq!(Value::Undefined.preview(80), "undefined");
        assert_eq!(Value::BigInt(12).preview(80), "12n");
    }
}
