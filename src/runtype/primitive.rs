use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{RuntypeOps, error_here, join_describe};
use crate::context::{DescribeCtx, HashCtx, ParseCtx, ReportCtx, SchemaCtx, ValidateCtx};
use crate::error::{CodecError, DecodeError, Result, display_path};
use crate::hash;
use crate::value::{Value, format_number};

// ------------------------------- Typeof ----------------------------------- //

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeofName {
    String,
    Number,
    Boolean,
}

impl TypeofName {
    pub fn as_str(self) -> &'static str {
        match self {
            TypeofName::String => "string",
            TypeofName::Number => "number",
            TypeofName::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TypeofRuntype {
    pub name: TypeofName,
}

impl RuntypeOps for TypeofRuntype {
    fn validate(&self, _ctx: &ValidateCtx<'_>, input: &Value) -> bool {
        matches!(
            (self.name, input),
            (TypeofName::String, Value::String(_))
                | (TypeofName::Number, Value::Number(_))
                | (TypeofName::Boolean, Value::Bool(_))
        )
    }

    fn parse_after_validation(&self, _ctx: &ParseCtx<'_>, input: &Value) -> Result<Value> {
        Ok(input.clone())
    }

    fn report_decode_error(&self, ctx: &mut ReportCtx<'_>, input: &Value) -> Vec<DecodeError> {
        if self.validate(&ctx.validate_ctx(), input) {
            return Vec::new();
        }
        error_here(ctx, format!("expected {}", self.name.as_str()), input)
    }

    fn schema(&self, _ctx: &mut SchemaCtx<'_>) -> Result<serde_json::Value> {
        Ok(json!({ "type": self.name.as_str() }))
    }

    fn describe(&self, _ctx: &mut DescribeCtx<'_>) -> String {
        self.name.as_str().to_string()
    }

    fn hash(&self, _ctx: &mut HashCtx<'_>) -> i32 {
        hash::combine(hash::TYPEOF, hash::hash_str(self.name.as_str()))
    }
}

// ------------------------------- Any / Nullish / Never -------------------- //

#[derive(Debug, Clone, Default)]
pub struct AnyRuntype;

impl RuntypeOps for AnyRuntype {
    fn validate(&self, _ctx: &ValidateCtx<'_>, _input: &Value) -> bool {
        true
    }

    fn parse_after_validation(&self, _ctx: &ParseCtx<'_>, input: &Value) -> Result<Value> {
        Ok(input.clone())
    }

    fn report_decode_error(&self, _ctx: &mut ReportCtx<'_>, _input: &Value) -> Vec<DecodeError> {
        Vec::new()
    }

    fn schema(&self, _ctx: &mut SchemaCtx<'_>) -> Result<serde_json::Value> {
        Ok(json!({}))
    }

    fn describe(&self, _ctx: &mut DescribeCtx<'_>) -> String {
        "any".to_string()
    }

    fn hash(&self, _ctx: &mut HashCtx<'_>) -> i32 {
        hash::ANY
    }
}

/// `null` or `undefined`.
#[derive(Debug, Clone, Default)]
pub struct NullishRuntype;

impl RuntypeOps for NullishRuntype {
    fn validate(&self, _ctx: &ValidateCtx<'_>, input: &Value) -> bool {
        input.is_nullish()
    }

    fn parse_after_validation(&self, _ctx: &ParseCtx<'_>, input: &Value) -> Result<Value> {
        Ok(input.clone())
    }

    fn report_decode_error(&self, ctx: &mut ReportCtx<'_>, input: &Value) -> Vec<DecodeError> {
        if input.is_nullish() {
            return Vec::new();
        }
        error_here(ctx, "expected nullish", input)
    }

    fn schema(&self, _ctx: &mut SchemaCtx<'_>) -> Result<serde_json::Value> {
        Ok(json!({ "type": "null" }))
    }

    fn describe(&self, _ctx: &mut DescribeCtx<'_>) -> String {
        "null".to_string()
    }

    fn hash(&self, _ctx: &mut HashCtx<'_>) -> i32 {
        hash::NULLISH
    }
}

#[derive(Debug, Clone, Default)]
pub struct NeverRuntype;

impl RuntypeOps for NeverRuntype {
    fn validate(&self, _ctx: &ValidateCtx<'_>, _input: &Value) -> bool {
        false
    }

    fn parse_after_validation(&self, _ctx: &ParseCtx<'_>, _input: &Value) -> Result<Value> {
        Err(CodecError::Internal("parse reached a never runtype".into()))
    }

    fn report_decode_error(&self, ctx: &mut ReportCtx<'_>, input: &Value) -> Vec<DecodeError> {
        error_here(ctx, "never", input)
    }

    fn schema(&self, _ctx: &mut SchemaCtx<'_>) -> Result<serde_json::Value> {
        Ok(json!({ "anyOf": [] }))
    }

    fn describe(&self, _ctx: &mut DescribeCtx<'_>) -> String {
        "never".to_string()
    }

    fn hash(&self, _ctx: &mut HashCtx<'_>) -> i32 {
        hash::NEVER
    }
}

// ------------------------------- Const ------------------------------------ //

/// Literal allowed in `const` / `any_of_consts`.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

impl ConstValue {
    pub fn from_json(v: &serde_json::Value) -> Option<Self> {
        match v {
            serde_json::Value::Null => Some(ConstValue::Null),
            serde_json::Value::Bool(b) => Some(ConstValue::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(ConstValue::Number),
            serde_json::Value::String(s) => Some(ConstValue::String(s.clone())),
            _ => None,
        }
    }

    /// `null` matches both `null` and `undefined`.
    pub fn matches(&self, input: &Value) -> bool {
        match (self, input) {
            (ConstValue::Null, v) => v.is_nullish(),
            (ConstValue::Bool(a), Value::Bool(b)) => a == b,
            (ConstValue::Number(a), Value::Number(b)) => a == b,
            (ConstValue::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            ConstValue::Null => Value::Null,
            ConstValue::Bool(b) => Value::Bool(*b),
            ConstValue::Number(n) => Value::Number(*n),
            ConstValue::String(s) => Value::String(s.clone()),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.to_value().to_json()
    }

    /// JSON-style literal text: `"a"`, `1`, `true`, `null`.
    pub fn render(&self) -> String {
        match self {
            ConstValue::Null => "null".to_string(),
            ConstValue::Bool(b) => b.to_string(),
            ConstValue::Number(n) => format_number(*n),
            ConstValue::String(s) => serde_json::Value::from(s.as_str()).to_string(),
        }
    }

    fn sort_key(&self) -> (u8, OrderedFloat<f64>, &str) {
        match self {
            ConstValue::Null => (0, OrderedFloat(0.0), ""),
            ConstValue::Bool(b) => (1, OrderedFloat(f64::from(u8::from(*b))), ""),
            ConstValue::Number(n) => (2, hash::number_key(*n), ""),
            ConstValue::String(s) => (3, OrderedFloat(0.0), s),
        }
    }

    fn hash(&self) -> i32 {
        match self {
            ConstValue::Number(n) => hash::hash_number(*n),
            other => hash::hash_str(&other.render()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConstRuntype {
    pub value: ConstValue,
}

impl RuntypeOps for ConstRuntype {
    fn validate(&self, _ctx: &ValidateCtx<'_>, input: &Value) -> bool {
        self.value.matches(input)
    }

    fn parse_after_validation(&self, _ctx: &ParseCtx<'_>, _input: &Value) -> Result<Value> {
        Ok(self.value.to_value())
    }

    fn report_decode_error(&self, ctx: &mut ReportCtx<'_>, input: &Value) -> Vec<DecodeError> {
        if self.value.matches(input) {
            return Vec::new();
        }
        error_here(ctx, format!("expected {}", self.value.render()), input)
    }

    fn schema(&self, _ctx: &mut SchemaCtx<'_>) -> Result<serde_json::Value> {
        Ok(json!({ "const": self.value.to_json() }))
    }

    fn describe(&self, _ctx: &mut DescribeCtx<'_>) -> String {
        self.value.render()
    }

    fn hash(&self, _ctx: &mut HashCtx<'_>) -> i32 {
        hash::combine(hash::CONST, self.value.hash())
    }
}

#[derive(Debug, Clone)]
pub struct AnyOfConstsRuntype {
    pub values: Vec<ConstValue>,
}

impl AnyOfConstsRuntype {
    fn matching(&self, input: &Value) -> Option<&ConstValue> {
        self.values.iter().find(|v| v.matches(input))
    }
}

impl RuntypeOps for AnyOfConstsRuntype {
    fn validate(&self, _ctx: &ValidateCtx<'_>, input: &Value) -> bool {
        self.matching(input).is_some()
    }

    fn parse_after_validation(&self, _ctx: &ParseCtx<'_>, input: &Value) -> Result<Value> {
        Ok(self.matching(input).map(ConstValue::to_value).unwrap_or_else(|| input.clone()))
    }

    fn report_decode_error(&self, ctx: &mut ReportCtx<'_>, input: &Value) -> Vec<DecodeError> {
        if self.matching(input).is_some() {
            return Vec::new();
        }
        let options = self.values.iter().map(ConstValue::render).collect::<Vec<_>>();
        error_here(ctx, format!("expected one of {}", options.join(", ")), input)
    }

    fn schema(&self, _ctx: &mut SchemaCtx<'_>) -> Result<serde_json::Value> {
        Ok(json!({ "enum": self.values.iter().map(ConstValue::to_json).collect::<Vec<_>>() }))
    }

    fn describe(&self, _ctx: &mut DescribeCtx<'_>) -> String {
        join_describe(self.values.iter().map(ConstValue::render).collect(), " | ", "never")
    }

    fn hash(&self, _ctx: &mut HashCtx<'_>) -> i32 {
        // set semantics: order must not change the hash
        let mut sorted = self.values.iter().collect::<Vec<_>>();
        sorted.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        hash::combine_all(hash::ANY_OF_CONSTS, sorted.into_iter().map(ConstValue::hash))
    }
}

// ------------------------------- Regex ------------------------------------ //

#[derive(Debug, Clone)]
pub struct RegexRuntype {
    pub regex: regex::Regex,
    /// Human label; also emitted as the JSON-Schema `pattern`.
    pub description: String,
}

impl RuntypeOps for RegexRuntype {
    fn validate(&self, _ctx: &ValidateCtx<'_>, input: &Value) -> bool {
        input.as_str().is_some_and(|s| self.regex.is_match(s))
    }

    fn parse_after_validation(&self, _ctx: &ParseCtx<'_>, input: &Value) -> Result<Value> {
        Ok(input.clone())
    }

    fn report_decode_error(&self, ctx: &mut ReportCtx<'_>, input: &Value) -> Vec<DecodeError> {
        if self.validate(&ctx.validate_ctx(), input) {
            return Vec::new();
        }
        error_here(ctx, format!("expected string matching {}", self.description), input)
    }

    fn schema(&self, _ctx: &mut SchemaCtx<'_>) -> Result<serde_json::Value> {
        Ok(json!({ "type": "string", "pattern": self.description }))
    }

    fn describe(&self, _ctx: &mut DescribeCtx<'_>) -> String {
        self.description.clone()
    }

    fn hash(&self, _ctx: &mut HashCtx<'_>) -> i32 {
        hash::combine(hash::REGEX, hash::hash_str(self.regex.as_str()))
    }
}

// ------------------------------- Date / BigInt --------------------------- //

#[derive(Debug, Clone, Default)]
pub struct DateRuntype;

impl RuntypeOps for DateRuntype {
    fn validate(&self, _ctx: &ValidateCtx<'_>, input: &Value) -> bool {
        matches!(input, Value::Date(_))
    }

    fn parse_after_validation(&self, _ctx: &ParseCtx<'_>, input: &Value) -> Result<Value> {
        Ok(input.clone())
    }

    fn report_decode_error(&self, ctx: &mut ReportCtx<'_>, input: &Value) -> Vec<DecodeError> {
        if matches!(input, Value::Date(_)) {
            return Vec::new();
        }
        error_here(ctx, "expected Date", input)
    }

    fn schema(&self, ctx: &mut SchemaCtx<'_>) -> Result<serde_json::Value> {
        Err(CodecError::UnsupportedSchema { kind: "Date", path: display_path(&ctx.path) })
    }

    fn describe(&self, _ctx: &mut DescribeCtx<'_>) -> String {
        "Date".to_string()
    }

    fn hash(&self, _ctx: &mut HashCtx<'_>) -> i32 {
        hash::DATE
    }
}

#[derive(Debug, Clone, Default)]
pub struct BigIntRuntype;

impl RuntypeOps for BigIntRuntype {
    fn validate(&self, _ctx: &ValidateCtx<'_>, input: &Value) -> bool {
        matches!(input, Value::BigInt(_))
    }

    fn parse_after_validation(&self, _ctx: &ParseCtx<'_>, input: &Value) -> Result<Value> {
        Ok(input.clone())
    }

    fn report_decode_error(&self, ctx: &mut ReportCtx<'_>, input: &Value) -> Vec<DecodeError> {
        if matches!(input, Value::BigInt(_)) {
            return Vec::new();
        }
        error_here(ctx, "expected bigint", input)
    }

    fn schema(&self, ctx: &mut SchemaCtx<'_>) -> Result<serde_json::Value> {
        Err(CodecError::UnsupportedSchema { kind: "BigInt", path: display_path(&ctx.path) })
    }

    fn describe(&self, _ctx: &mut DescribeCtx<'_>) -> String {
        "BigInt".to_string()
    }

    fn hash(&self, _ctx: &mut HashCtx<'_>) -> i32 {
        hash::BIGINT
    }
}
