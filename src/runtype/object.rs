use indexmap::IndexMap;
use serde_json::{Map, json};

use super::{Runtype, RuntypeOps, error_here};
use crate::context::{DescribeCtx, HashCtx, ParseCtx, ReportCtx, SchemaCtx, ValidateCtx};
use crate::error::{DecodeError, Result};
use crate::hash;
use crate::value::{Object, Value};

// ------------------------------- OptionalField ---------------------------- //

/// Property wrapper: `null`/`undefined` always pass and are never handed to `inner`.
#[derive(Debug, Clone)]
pub struct OptionalFieldRuntype {
    pub inner: Box<Runtype>,
}

impl RuntypeOps for OptionalFieldRuntype {
    fn validate(&self, ctx: &ValidateCtx<'_>, input: &Value) -> bool {
        input.is_nullish() || self.inner.validate(ctx, input)
    }

    fn parse_after_validation(&self, ctx: &ParseCtx<'_>, input: &Value) -> Result<Value> {
        if input.is_nullish() {
            return Ok(input.clone());
        }
        self.inner.parse_after_validation(ctx, input)
    }

    fn report_decode_error(&self, ctx: &mut ReportCtx<'_>, input: &Value) -> Vec<DecodeError> {
        if input.is_nullish() {
            return Vec::new();
        }
        self.inner.report_decode_error(ctx, input)
    }

    fn schema(&self, ctx: &mut SchemaCtx<'_>) -> Result<serde_json::Value> {
        self.inner.schema(ctx)
    }

    fn describe(&self, ctx: &mut DescribeCtx<'_>) -> String {
        self.inner.describe(ctx)
    }

    fn hash(&self, ctx: &mut HashCtx<'_>) -> i32 {
        hash::combine(hash::OPTIONAL_FIELD, self.inner.hash(ctx))
    }
}

// ------------------------------- Object ----------------------------------- //

/// One index signature: undeclared keys matching `key` must carry a `value`.
#[derive(Debug, Clone)]
pub struct IndexedProperty {
    pub key: Runtype,
    pub value: Runtype,
}

#[derive(Debug, Clone)]
pub struct ObjectRuntype {
    /// Declaration order drives error order.
    pub properties: IndexMap<String, Runtype>,
    pub indexed_properties: Vec<IndexedProperty>,
}

impl ObjectRuntype {
    fn undeclared<'v>(&'v self, input: &'v Object) -> impl Iterator<Item = (&'v String, &'v Value)> + 'v {
        input.iter().filter(|(k, _)| !self.properties.contains_key(k.as_str()))
    }

    /// First index signature accepting this key/value pair.
    fn matching_index(&self, ctx: &ValidateCtx<'_>, key: &str, value: &Value) -> Option<&IndexedProperty> {
        let key = Value::String(key.to_string());
        self.indexed_properties
            .iter()
            .find(|p| p.key.validate(ctx, &key) && p.value.validate(ctx, value))
    }

    fn report_index_miss(&self, ctx: &mut ReportCtx<'_>, key: &str, value: &Value) -> Vec<DecodeError> {
        let key = Value::String(key.to_string());
        let vctx = ctx.validate_ctx();
        let mut errors = Vec::new();
        for pair in &self.indexed_properties {
            if pair.key.validate(&vctx, &key) {
                errors.extend(pair.value.report_decode_error(ctx, value));
            } else {
                errors.extend(pair.key.report_decode_error(ctx, &key));
            }
        }
        errors
    }
}

fn describe_key(key: &str) -> String {
    let mut chars = key.chars();
    let ident = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if ident { key.to_string() } else { serde_json::Value::from(key).to_string() }
}

impl RuntypeOps for ObjectRuntype {
    fn validate(&self, ctx: &ValidateCtx<'_>, input: &Value) -> bool {
        let Some(obj) = input.as_object() else {
            return false;
        };
        for (key, runtype) in &self.properties {
            if !runtype.validate(ctx, input.get(key)) {
                return false;
            }
        }
        if self.indexed_properties.is_empty() {
            return !(ctx.disallow_extra_properties && self.undeclared(obj).next().is_some());
        }
        self.undeclared(obj)
            .all(|(k, v)| self.matching_index(ctx, k, v).is_some())
    }

    fn parse_after_validation(&self, ctx: &ParseCtx<'_>, input: &Value) -> Result<Value> {
        let mut out = Object::new();
        for (key, runtype) in &self.properties {
            let parsed = runtype.parse_after_validation(ctx, input.get(key))?;
            if !parsed.is_undefined() {
                out.insert(key.clone(), parsed);
            }
        }
        if let (Some(obj), false) = (input.as_object(), self.indexed_properties.is_empty()) {
            let vctx = ctx.validate_ctx();
            for (key, value) in self.undeclared(obj) {
                // unmatched keys are dropped
                if let Some(pair) = self.matching_index(&vctx, key, value) {
                    out.insert(key.clone(), pair.value.parse_after_validation(ctx, value)?);
                }
            }
        }
        Ok(Value::Object(out))
    }

    fn report_decode_error(&self, ctx: &mut ReportCtx<'_>, input: &Value) -> Vec<DecodeError> {
        let Some(obj) = input.as_object() else {
            return error_here(ctx, "expected object", input);
        };

        if self.indexed_properties.is_empty() && ctx.disallow_extra_properties {
            let extra = self
                .undeclared(obj)
                .map(|(k, v)| ctx.with_path(k.clone(), |ctx| DecodeError::regular("extra property", ctx.path(), v.clone())))
                .collect::<Vec<_>>();
            if !extra.is_empty() {
                return extra;
            }
        }

        let vctx = ctx.validate_ctx();
        let mut errors = Vec::new();
        for (key, runtype) in &self.properties {
            let value = input.get(key);
            if !runtype.validate(&vctx, value) {
                errors.extend(ctx.with_path(key.clone(), |ctx| runtype.report_decode_error(ctx, value)));
            }
        }
        if !self.indexed_properties.is_empty() {
            for (key, value) in self.undeclared(obj) {
                if self.matching_index(&vctx, key, value).is_none() {
                    errors.extend(ctx.with_path(key.clone(), |ctx| self.report_index_miss(ctx, key, value)));
                }
            }
        }
        errors
    }

    fn schema(&self, ctx: &mut SchemaCtx<'_>) -> Result<serde_json::Value> {
        let mut properties = Map::new();
        for (key, runtype) in &self.properties {
            let schema = ctx.with_path(key.clone(), |ctx| runtype.schema(ctx))?;
            properties.insert(key.clone(), schema);
        }
        // optional fields are listed too
        let required = self.properties.keys().cloned().collect::<Vec<_>>();

        if self.indexed_properties.is_empty() {
            return Ok(json!({
                "type": "object",
                "properties": properties,
                "required": required,
                "additionalProperties": false,
            }));
        }

        let mut parts = vec![json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })];
        for pair in &self.indexed_properties {
            let key_schema = ctx.with_path("[key]", |ctx| pair.key.schema(ctx))?;
            let value_schema = ctx.with_path("[value]", |ctx| pair.value.schema(ctx))?;
            parts.push(json!({
                "additionalProperties": value_schema,
                "propertyNames": key_schema,
            }));
        }
        Ok(json!({ "allOf": parts }))
    }

    fn describe(&self, ctx: &mut DescribeCtx<'_>) -> String {
        let mut keys = self.properties.keys().collect::<Vec<_>>();
        keys.sort();
        let mut parts = Vec::with_capacity(keys.len() + self.indexed_properties.len());
        for key in keys {
            let runtype = &self.properties[key.as_str()];
            let marker = if runtype.is_optional_field() { "?" } else { "" };
            parts.push(format!("{}{marker}: {}", describe_key(key), runtype.describe(ctx)));
        }
        for pair in &self.indexed_properties {
            parts.push(format!("[key: {}]: {}", pair.key.describe(ctx), pair.value.describe(ctx)));
        }
        if parts.is_empty() {
            "{}".to_string()
        } else {
            format!("{{ {} }}", parts.join(", "))
        }
    }

    fn hash(&self, ctx: &mut HashCtx<'_>) -> i32 {
        let mut keys = self.properties.keys().collect::<Vec<_>>();
        keys.sort();
        let mut h = hash::OBJECT;
        for key in keys {
            h = hash::combine(h, hash::hash_str(key));
            h = hash::combine(h, self.properties[key.as_str()].hash(ctx));
        }
        let mut pairs = self
            .indexed_properties
            .iter()
            .map(|p| hash::combine(p.key.hash(ctx), p.value.hash(ctx)))
            .collect::<Vec<_>>();
        pairs.sort_unstable();
        hash::combine_all(h, pairs)
    }
}
