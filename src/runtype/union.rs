use indexmap::IndexMap;
use serde_json::json;

use super::{Runtype, RuntypeOps, error_here, join_describe};
use crate::context::{DescribeCtx, HashCtx, ParseCtx, ReportCtx, SchemaCtx, ValidateCtx};
use crate::error::{CodecError, DecodeError, Result};
use crate::hash;
use crate::merge::deep_merge;
use crate::value::{Object, Value};

fn schemas_of(members: &[Runtype], ctx: &mut SchemaCtx<'_>) -> Result<Vec<serde_json::Value>> {
    members.iter().map(|m| m.schema(ctx)).collect()
}

// ------------------------------- AnyOf ------------------------------------ //

#[derive(Debug, Clone)]
pub struct AnyOfRuntype {
    pub schemas: Vec<Runtype>,
}

impl RuntypeOps for AnyOfRuntype {
    fn validate(&self, ctx: &ValidateCtx<'_>, input: &Value) -> bool {
        self.schemas.iter().any(|s| s.validate(ctx, input))
    }

    /// Every member that accepts the input contributes; results are
    /// deep-merged in declaration order.
    fn parse_after_validation(&self, ctx: &ParseCtx<'_>, input: &Value) -> Result<Value> {
        let vctx = ctx.validate_ctx();
        let mut merged: Option<Value> = None;
        for member in self.schemas.iter().filter(|s| s.validate(&vctx, input)) {
            let parsed = member.parse_after_validation(ctx, input)?;
            merged = Some(match merged {
                None => parsed,
                Some(acc) => deep_merge(acc, parsed),
            });
        }
        merged.ok_or_else(|| CodecError::Internal("any_of parse with no accepting member".into()))
    }

    fn report_decode_error(&self, ctx: &mut ReportCtx<'_>, input: &Value) -> Vec<DecodeError> {
        if self.validate(&ctx.validate_ctx(), input) {
            return Vec::new();
        }
        let errors = ctx.with_detached_path(|ctx| {
            self.schemas
                .iter()
                .flat_map(|s| s.report_decode_error(ctx, input))
                .collect::<Vec<_>>()
        });
        vec![DecodeError::union(ctx.path(), input.clone(), errors)]
    }

    fn schema(&self, ctx: &mut SchemaCtx<'_>) -> Result<serde_json::Value> {
        Ok(json!({ "anyOf": schemas_of(&self.schemas, ctx)? }))
    }

    fn describe(&self, ctx: &mut DescribeCtx<'_>) -> String {
        let parts = self.schemas.iter().map(|s| s.describe(ctx)).collect();
        join_describe(parts, " | ", "never")
    }

    fn hash(&self, ctx: &mut HashCtx<'_>) -> i32 {
        let children = self.schemas.iter().map(|s| s.hash(ctx)).collect::<Vec<_>>();
        hash::combine_all(hash::ANY_OF, children)
    }
}

// ------------------------------- AllOf ------------------------------------ //

#[derive(Debug, Clone)]
pub struct AllOfRuntype {
    pub schemas: Vec<Runtype>,
}

impl RuntypeOps for AllOfRuntype {
    fn validate(&self, ctx: &ValidateCtx<'_>, input: &Value) -> bool {
        // a primitive must not slip through a vacuous intersection; arrays
        // are refused as well since the merged result is always a plain object
        input.as_object().is_some() && self.schemas.iter().all(|s| s.validate(ctx, input))
    }

    fn parse_after_validation(&self, ctx: &ParseCtx<'_>, input: &Value) -> Result<Value> {
        let mut out = Object::new();
        for member in &self.schemas {
            match member.parse_after_validation(ctx, input)? {
                Value::Object(fields) => out.extend(fields),
                other => {
                    return Err(CodecError::Internal(format!(
                        "all_of member `{}` parsed to a non-object: {}",
                        member.kind(),
                        other.preview(40)
                    )));
                }
            }
        }
        Ok(Value::Object(out))
    }

    fn report_decode_error(&self, ctx: &mut ReportCtx<'_>, input: &Value) -> Vec<DecodeError> {
        if input.as_object().is_none() {
            return error_here(ctx, "expected object", input);
        }
        let vctx = ctx.validate_ctx();
        self.schemas
            .iter()
            .filter(|s| !s.validate(&vctx, input))
            .flat_map(|s| s.report_decode_error(ctx, input))
            .collect()
    }

    fn schema(&self, ctx: &mut SchemaCtx<'_>) -> Result<serde_json::Value> {
        Ok(json!({ "allOf": schemas_of(&self.schemas, ctx)? }))
    }

    fn describe(&self, ctx: &mut DescribeCtx<'_>) -> String {
        let parts = self.schemas.iter().map(|s| s.describe(ctx)).collect();
        join_describe(parts, " & ", "unknown")
    }

    fn hash(&self, ctx: &mut HashCtx<'_>) -> i32 {
        let children = self.schemas.iter().map(|s| s.hash(ctx)).collect::<Vec<_>>();
        hash::combine_all(hash::ALL_OF, children)
    }
}

// ------------------------------- AnyOfDiscriminated ----------------------- //

/// Tagged union: `input[discriminator]` picks the branch from `mapping`.
#[derive(Debug, Clone)]
pub struct AnyOfDiscriminatedRuntype {
    pub schemas: Vec<Runtype>,
    pub discriminator: String,
    pub mapping: IndexMap<String, Runtype>,
}

impl AnyOfDiscriminatedRuntype {
    fn branch(&self, input: &Value) -> Option<&Runtype> {
        input.as_object()?;
        let tag = input.get(&self.discriminator).tag_key()?;
        self.mapping.get(&tag)
    }

    /// Declared alternatives; the mapped branches when none were declared.
    fn alternatives(&self) -> Vec<&Runtype> {
        if self.schemas.is_empty() {
            self.mapping.values().collect()
        } else {
            self.schemas.iter().collect()
        }
    }

    fn known_tags(&self) -> String {
        self.mapping
            .keys()
            .map(|k| serde_json::Value::from(k.as_str()).to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl RuntypeOps for AnyOfDiscriminatedRuntype {
    fn validate(&self, ctx: &ValidateCtx<'_>, input: &Value) -> bool {
        self.branch(input).is_some_and(|b| b.validate(ctx, input))
    }

    fn parse_after_validation(&self, ctx: &ParseCtx<'_>, input: &Value) -> Result<Value> {
        let branch = self.branch(input).ok_or_else(|| {
            CodecError::Internal(format!("no `{}` branch for input being parsed", self.discriminator))
        })?;
        // nested discriminated layers may strip the tag, so stamp it back
        match branch.parse_after_validation(ctx, input)? {
            Value::Object(mut fields) => {
                fields.insert(self.discriminator.clone(), input.get(&self.discriminator).clone());
                Ok(Value::Object(fields))
            }
            other => Err(CodecError::Internal(format!(
                "discriminated branch parsed to a non-object: {}",
                other.preview(40)
            ))),
        }
    }

    fn report_decode_error(&self, ctx: &mut ReportCtx<'_>, input: &Value) -> Vec<DecodeError> {
        if input.as_object().is_none() {
            return error_here(ctx, "expected object", input);
        }
        match self.branch(input) {
            Some(branch) => branch.report_decode_error(ctx, input),
            None => {
                let tag = input.get(&self.discriminator);
                let message = format!("expected one of {}", self.known_tags());
                ctx.with_path(self.discriminator.clone(), |ctx| {
                    vec![DecodeError::regular(message, ctx.path(), tag.clone())]
                })
            }
        }
    }

    fn schema(&self, ctx: &mut SchemaCtx<'_>) -> Result<serde_json::Value> {
        let alternatives = self
            .alternatives()
            .into_iter()
            .map(|s| s.schema(ctx))
            .collect::<Result<Vec<_>>>()?;
        Ok(json!({ "anyOf": alternatives }))
    }

    fn describe(&self, ctx: &mut DescribeCtx<'_>) -> String {
        let parts = self.alternatives().into_iter().map(|s| s.describe(ctx)).collect();
        join_describe(parts, " | ", "never")
    }

    fn hash(&self, ctx: &mut HashCtx<'_>) -> i32 {
        let mut tags = self.mapping.keys().collect::<Vec<_>>();
        tags.sort();
        let mut h = hash::combine(hash::ANY_OF_DISCRIMINATED, hash::hash_str(&self.discriminator));
        for tag in tags {
            h = hash::combine(h, hash::hash_str(tag));
            h = hash::combine(h, self.mapping[tag.as_str()].hash(ctx));
        }
        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DecodeOptions;
    use crate::graph::Graph;
    use crate::runtype::TypeofName;
    use crate::runtype::primitive::TypeofRuntype;
    use serde_json::json;
    use std::sync::Arc;

    fn graph(definitions: serde_json::Value) -> Arc<Graph> {
        Graph::from_json(json!({ "definitions": definitions })).unwrap()
    }

    fn object(properties: serde_json::Value) -> serde_json::Value {
        json!({"kind": "object", "properties": properties})
    }

    fn both() -> Arc<Graph> {
        graph(json!({
            "Both": {"kind": "all_of", "schemas": [
                object(json!({"a": {"kind": "typeof", "name": "string"}})),
                object(json!({"b": {"kind": "typeof", "name": "number"}})),
            ]},
            "Empty": {"kind": "all_of", "schemas": []},
        }))
    }

    #[test]
    fn all_of_accepts_only_objects() {
        let g = both();
        let opts = DecodeOptions::default();
        for name in ["Both", "Empty"] {
            let c = g.codec(name).unwrap();
            for input in [json!(1), json!([]), json!(null), json!("x")] {
                assert!(!c.validate(&input.clone().into(), &opts), "{name} accepted {input}");
            }
        }
        assert!(g.codec("Empty").unwrap().validate(&json!({}).into(), &opts));
    }

    #[test]
    fn all_of_merges_member_outputs() {
        let c = both().codec("Both").unwrap();
        let out = c.parse(&json!({"a": "x", "b": 1, "z": true}).into(), &DecodeOptions::default()).unwrap();
        assert_eq!(out.to_json(), json!({"a": "x", "b": 1}));
    }

    #[test]
    fn all_of_merge_is_shallow_and_later_members_win() {
        let inner = object(json!({"x": {"kind": "typeof", "name": "number"}}));
        let g = graph(json!({
            "NarrowFirst": {"kind": "all_of", "schemas": [object(json!({"n": inner.clone()})), object(json!({"n": {"kind": "any"}}))]},
            "NarrowLast": {"kind": "all_of", "schemas": [object(json!({"n": {"kind": "any"}})), object(json!({"n": inner}))]},
        }));
        let input = json!({"n": {"x": 1, "y": 2}}).into();
        let opts = DecodeOptions::default();
        let first = g.codec("NarrowFirst").unwrap().parse(&input, &opts).unwrap();
        let last = g.codec("NarrowLast").unwrap().parse(&input, &opts).unwrap();
        assert_eq!(first.to_json(), json!({"n": {"x": 1, "y": 2}}));
        assert_eq!(last.to_json(), json!({"n": {"x": 1}}));
    }

    #[test]
    fn all_of_reports_each_failing_member() {
        let c = both().codec("Both").unwrap();
        let opts = DecodeOptions::default();
        let errors = c.safe_parse(&json!({"a": 1}).into(), &opts).unwrap_err();
        assert_eq!(
            errors,
            vec![
                DecodeError::regular("expected string", vec!["a".into()], Value::Number(1.0)),
                DecodeError::regular("expected number", vec!["b".into()], Value::Undefined),
            ]
        );
        let errors = c.safe_parse(&json!("x").into(), &opts).unwrap_err();
        assert_eq!(errors[0].message(), Some("expected object"));
    }

    #[test]
    fn all_of_member_parsing_to_non_object_is_internal() {
        let g = Graph::default();
        let all_of = AllOfRuntype {
            schemas: vec![Runtype::Typeof(TypeofRuntype { name: TypeofName::String })],
        };
        let ctx = ParseCtx::new(&g, &DecodeOptions::default());
        let err = all_of.parse_after_validation(&ctx, &Value::from("s")).unwrap_err();
        assert!(matches!(err, CodecError::Internal(_)), "{err}");
    }

    #[test]
    fn discriminated_without_schemas_falls_back_to_mapping() {
        let c = graph(json!({
            "D": {
                "kind": "any_of_discriminated",
                "discriminator": "kind",
                "schemas": [],
                "mapping": {
                    "a": object(json!({"kind": {"kind": "const", "value": "a"}})),
                    "b": object(json!({"kind": {"kind": "const", "value": "b"}})),
                },
            },
        }))
        .codec("D")
        .unwrap();
        assert_eq!(c.describe(), "type CodecD = ({ kind: \"a\" } | { kind: \"b\" });");
        let schema = c.schema().unwrap();
        assert_eq!(schema["anyOf"].as_array().map(Vec::len), Some(2));
        assert!(c.validate(&json!({"kind": "b"}).into(), &DecodeOptions::default()));
    }
}
