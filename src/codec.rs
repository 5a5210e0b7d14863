//! Public decode API for one named definition.

use std::sync::Arc;

use serde::Serialize;

use crate::context::{DecodeOptions, DescribeCtx, HashCtx, ParseCtx, ReportCtx, SchemaCtx, ValidateCtx};
use crate::error::{CodecError, DecodeError, Result};
use crate::graph::Graph;
use crate::printer;
use crate::runtype::{Runtype, RuntypeOps};
use crate::value::Value;

/// Errors past this count are dropped from `safe_parse` results.
pub const MAX_DECODE_ERRORS: usize = 10;

#[derive(Debug, Clone)]
pub struct Codec {
    name: String,
    graph: Arc<Graph>,
    root: Runtype,
}

/// Wire shape of a `safe_parse` result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SafeParseOutcome {
    Success { success: bool, data: Value },
    Failure { success: bool, errors: Vec<DecodeError> },
}

impl From<std::result::Result<Value, Vec<DecodeError>>> for SafeParseOutcome {
    fn from(result: std::result::Result<Value, Vec<DecodeError>>) -> Self {
        match result {
            Ok(data) => SafeParseOutcome::Success { success: true, data },
            Err(errors) => SafeParseOutcome::Failure { success: false, errors },
        }
    }
}

impl Codec {
    pub fn new(name: impl Into<String>, graph: Arc<Graph>, root: Runtype) -> Self {
        Self { name: name.into(), graph, root }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    pub fn validate(&self, input: &Value, options: &DecodeOptions) -> bool {
        self.root.validate(&ValidateCtx::new(&self.graph, options), input)
    }

    /// Canonical value, or at most [`MAX_DECODE_ERRORS`] errors.
    ///
    /// Internal failures during parsing (which only happen on a malformed
    /// graph) are logged and surfaced as a single root error.
    pub fn safe_parse(
        &self,
        input: &Value,
        options: &DecodeOptions,
    ) -> std::result::Result<Value, Vec<DecodeError>> {
        if self.validate(input, options) {
            tracing::trace!(codec = %self.name, "input valid");
            return self.root.parse_after_validation(&ParseCtx::new(&self.graph, options), input).map_err(|e| {
                tracing::error!(codec = %self.name, error = %e, "parse failed after validation");
                vec![DecodeError::regular(e.to_string(), Vec::new(), input.clone())]
            });
        }
        let mut ctx = ReportCtx::new(&self.graph, options);
        let mut errors = self.root.report_decode_error(&mut ctx, input);
        tracing::trace!(codec = %self.name, errors = errors.len(), "input invalid");
        if errors.is_empty() {
            // validate and report disagree; never hand back an empty failure
            errors.push(DecodeError::regular("invalid input", Vec::new(), input.clone()));
        }
        errors.truncate(MAX_DECODE_ERRORS);
        Err(errors)
    }

    /// Like [`Codec::safe_parse`] but fails with the pretty-printed error list.
    pub fn parse(&self, input: &Value, options: &DecodeOptions) -> Result<Value> {
        self.safe_parse(input, options).map_err(|errors| CodecError::Decode {
            message: printer::print_errors(&errors),
            errors,
        })
    }

    /// JSON Schema for the root; `Date`/`BigInt` anywhere inside is an error.
    pub fn schema(&self) -> Result<serde_json::Value> {
        self.root.schema(&mut SchemaCtx::new(&self.graph))
    }

    /// TypeScript-like text. Refs reached more than once get their own
    /// `type Name = ...;` declaration ahead of the root line.
    pub fn describe(&self) -> String {
        let mut ctx = DescribeCtx::new(&self.graph);
        self.root.describe(&mut ctx);
        ctx.measure = false;
        let root = self.root.describe(&mut ctx);

        let mut hoisted = ctx
            .deps
            .iter()
            .filter(|(_, dep)| dep.count > 1)
            .map(|(id, _)| *id)
            .collect::<Vec<_>>();
        // a hoisted ref only reached from another hoisted body may still be pending
        for id in &hoisted {
            let pending = ctx.deps.get(id).is_some_and(|d| d.text.as_deref().is_none_or(str::is_empty));
            if !pending {
                continue;
            }
            if let Some(target) = self.graph.resolve(*id) {
                if let Some(entry) = ctx.deps.get_mut(id) {
                    entry.text = Some(String::new());
                }
                let text = target.describe(&mut ctx);
                if let Some(entry) = ctx.deps.get_mut(id) {
                    entry.text = Some(text);
                }
            }
        }
        hoisted.sort_by_key(|id| self.graph.name_of(*id).unwrap_or_default().to_string());

        let mut blocks = hoisted
            .into_iter()
            .filter_map(|id| {
                let name = self.graph.name_of(id)?;
                let text = ctx.deps.get(&id)?.text.clone()?;
                Some(format!("type {name} = {text};"))
            })
            .collect::<Vec<_>>();
        blocks.push(format!("type Codec{} = {root};", self.name));
        blocks.join("\n\n")
    }

    /// Structural fingerprint; equal shapes under different names collide.
    pub fn hash(&self) -> i32 {
        self.root.hash(&mut HashCtx::new(&self.graph))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphBuilder, RuntypeDef};
    use proptest::prelude::*;
    use serde_json::json;

    fn graph(doc: serde_json::Value) -> Arc<Graph> {
        Graph::from_json(json!({ "definitions": doc })).unwrap()
    }

    fn codec(doc: serde_json::Value, name: &str) -> Codec {
        graph(doc).codec(name).unwrap()
    }

    fn string() -> serde_json::Value {
        json!({"kind": "typeof", "name": "string"})
    }

    fn number() -> serde_json::Value {
        json!({"kind": "typeof", "name": "number"})
    }

    fn ab_object() -> Codec {
        codec(
            json!({"AB": {"kind": "object", "properties": {"a": string(), "b": number()}}}),
            "AB",
        )
    }

    fn tree() -> Codec {
        codec(
            json!({
                "Tree": {"kind": "object", "properties": {
                    "value": number(),
                    "children": {"kind": "array", "item": {"kind": "ref", "name": "Tree"}},
                }},
            }),
            "Tree",
        )
    }

    #[test]
    fn object_parses_declared_fields() {
        let out = ab_object().safe_parse(&json!({"a": "x", "b": 1}).into(), &DecodeOptions::default());
        assert_eq!(out.unwrap().to_json(), json!({"a": "x", "b": 1}));
    }

    #[test]
    fn missing_field_reports_undefined() {
        let errors = ab_object()
            .safe_parse(&json!({"a": "x"}).into(), &DecodeOptions::default())
            .unwrap_err();
        assert_eq!(
            errors,
            vec![DecodeError::regular("expected number", vec!["b".into()], Value::Undefined)]
        );
    }

    #[test]
    fn any_of_consts_lists_every_value() {
        let c = codec(json!({"AB": {"kind": "any_of_consts", "values": ["a", "b"]}}), "AB");
        let errors = c.safe_parse(&json!("c").into(), &DecodeOptions::default()).unwrap_err();
        assert_eq!(errors[0].message(), Some("expected one of \"a\", \"b\""));
    }

    #[test]
    fn tuple_with_rest() {
        let c = codec(
            json!({"T": {"kind": "tuple", "prefix": [number(), number()], "rest": string()}}),
            "T",
        );
        let opts = DecodeOptions::default();
        let out = c.parse(&json!([1, 2, "x", "y"]).into(), &opts).unwrap();
        assert_eq!(out.to_json(), json!([1, 2, "x", "y"]));
        assert!(!c.validate(&json!([1, "x"]).into(), &opts));
    }

    #[test]
    fn recursive_tree_parses_and_schematizes() {
        let c = tree();
        let input = json!({"value": 1, "children": [{"value": 2, "children": []}]});
        let out = c.parse(&input.clone().into(), &DecodeOptions::default()).unwrap();
        assert_eq!(out.to_json(), input);

        let schema = c.schema().unwrap();
        assert_eq!(schema["properties"]["children"]["items"], json!({}));
        assert_eq!(schema["properties"]["value"], json!({"type": "number"}));
    }

    #[test]
    fn recursive_tree_describes() {
        assert_eq!(
            tree().describe(),
            "type Tree = { children: Array<Tree>, value: number };\n\ntype CodecTree = Tree;"
        );
    }

    #[test]
    fn shared_ref_is_hoisted_once() {
        let c = codec(
            json!({
                "Point": {"kind": "object", "properties": {"x": number(), "y": number()}},
                "Line": {"kind": "object", "properties": {
                    "from": {"kind": "ref", "name": "Point"},
                    "to": {"kind": "ref", "name": "Point"},
                }},
                "Single": {"kind": "object", "properties": {"at": {"kind": "ref", "name": "Point"}}},
            }),
            "Line",
        );
        assert_eq!(
            c.describe(),
            "type Point = { x: number, y: number };\n\ntype CodecLine = { from: Point, to: Point };"
        );
        let single = c.graph().codec("Single").unwrap();
        assert_eq!(single.describe(), "type CodecSingle = { at: { x: number, y: number } };");
    }

    #[test]
    fn any_of_merges_disjoint_objects() {
        let c = codec(
            json!({"U": {"kind": "any_of", "schemas": [
                {"kind": "object", "properties": {"a": string()}},
                {"kind": "object", "properties": {"b": number()}},
            ]}}),
            "U",
        );
        let out = c.parse(&json!({"a": "x", "b": 2}).into(), &DecodeOptions::default()).unwrap();
        assert_eq!(out.to_json(), json!({"a": "x", "b": 2}));
    }

    #[test]
    fn any_of_failure_is_a_union_error() {
        let c = codec(json!({"U": {"kind": "any_of", "schemas": [string(), number()]}}), "U");
        let errors = c.safe_parse(&json!(true).into(), &DecodeOptions::default()).unwrap_err();
        assert_eq!(errors.len(), 1);
        let DecodeError::Union { errors: inner, .. } = &errors[0] else {
            panic!("expected union error, got {errors:?}");
        };
        assert_eq!(inner.len(), 2);
        let printed = c.parse(&json!(true).into(), &DecodeOptions::default()).unwrap_err().to_string();
        assert_eq!(printed, "expected string, received true OR expected number, received true");
    }

    #[test]
    fn unknown_discriminator_reports_once() {
        let c = codec(
            json!({"Shape": {
                "kind": "any_of_discriminated",
                "discriminator": "type",
                "schemas": [
                    {"kind": "object", "properties": {"type": {"kind": "const", "value": "a"}}},
                    {"kind": "object", "properties": {"type": {"kind": "const", "value": "b"}}},
                ],
                "mapping": {
                    "a": {"kind": "object", "properties": {"type": {"kind": "const", "value": "a"}}},
                    "b": {"kind": "object", "properties": {"type": {"kind": "const", "value": "b"}}},
                },
            }}),
            "Shape",
        );
        let errors = c.safe_parse(&json!({"type": "z"}).into(), &DecodeOptions::default()).unwrap_err();
        assert_eq!(
            errors,
            vec![DecodeError::regular(
                "expected one of \"a\", \"b\"",
                vec!["type".into()],
                Value::String("z".into())
            )]
        );
    }

    #[test]
    fn date_has_no_schema() {
        let c = codec(
            json!({"E": {"kind": "object", "properties": {"at": {"kind": "date"}}}}),
            "E",
        );
        let err = c.schema().unwrap_err();
        assert_eq!(err.to_string(), "Cannot generate JSON Schema for Date at at");
    }

    #[test]
    fn hash_ignores_declaration_order() {
        let g = graph(json!({
            "A": {"kind": "object", "properties": {"x": number(), "y": string()}},
            "B": {"kind": "object", "properties": {"y": string(), "x": number()}},
            "C": {"kind": "object", "properties": {"x": string(), "y": number()}},
        }));
        let [a, b, c] = ["A", "B", "C"].map(|n| g.codec(n).unwrap().hash());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn recursive_shapes_hash_alike_under_different_names() {
        let recursive = |leaf: serde_json::Value, name: &str| {
            json!({"kind": "object", "properties": {
                "v": leaf,
                "c": {"kind": "array", "item": {"kind": "ref", "name": name}},
            }})
        };
        let g = graph(json!({
            "T1": recursive(number(), "T1"),
            "T2": recursive(number(), "T2"),
            "T3": recursive(string(), "T3"),
        }));
        let [t1, t2, t3] = ["T1", "T2", "T3"].map(|n| g.codec(n).unwrap().hash());
        assert_eq!(t1, t2);
        assert_ne!(t1, t3);
    }

    #[test]
    fn extra_properties_are_opt_in_errors() {
        let c = ab_object();
        let input: Value = json!({"a": "x", "b": 1, "c": true}).into();
        let lax = c.parse(&input, &DecodeOptions::default()).unwrap();
        assert_eq!(lax.to_json(), json!({"a": "x", "b": 1}));

        let strict = DecodeOptions { disallow_extra_properties: true };
        assert!(!c.validate(&input, &strict));
        let errors = c.safe_parse(&input, &strict).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path(), ["c".to_string()]);
    }

    #[test]
    fn errors_are_truncated() {
        let g = GraphBuilder::new()
            .define(
                "Many",
                RuntypeDef::Array { item: Box::new(serde_json::from_value(number()).unwrap()) },
            )
            .build()
            .unwrap();
        let c = g.codec("Many").unwrap();
        let input = Value::from(serde_json::Value::from(vec!["a"; 25]));
        let errors = c.safe_parse(&input, &DecodeOptions::default()).unwrap_err();
        assert_eq!(errors.len(), MAX_DECODE_ERRORS);
        assert_eq!(errors[9].path(), ["[9]".to_string()]);
    }

    #[test]
    fn outcome_serializes_like_the_js_api() {
        let c = ab_object();
        let ok = SafeParseOutcome::from(c.safe_parse(&json!({"a": "x", "b": 1}).into(), &DecodeOptions::default()));
        assert_eq!(serde_json::to_value(&ok).unwrap(), json!({"success": true, "data": {"a": "x", "b": 1}}));
        let bad = SafeParseOutcome::from(c.safe_parse(&json!({"a": "x"}).into(), &DecodeOptions::default()));
        assert_eq!(
            serde_json::to_value(&bad).unwrap(),
            json!({"success": false, "errors": [{"message": "expected number", "path": ["b"], "received": null}]})
        );
    }

    fn arb_json() -> impl Strategy<Value = serde_json::Value> {
        let leaf = prop_oneof![
            Just(serde_json::Value::Null),
            any::<bool>().prop_map(serde_json::Value::from),
            (-1000i32..1000).prop_map(serde_json::Value::from),
            "[a-c]{0,3}".prop_map(serde_json::Value::from),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(serde_json::Value::from),
                prop::collection::btree_map("[a-c]", inner, 0..4)
                    .prop_map(|m| serde_json::Value::Object(m.into_iter().collect())),
            ]
        })
    }

    fn mixed_graph() -> Arc<Graph> {
        graph(json!({
            "Item": {"kind": "object", "properties": {
                "a": {"kind": "optional_field", "inner": string()},
                "b": {"kind": "any_of", "schemas": [number(), {"kind": "array", "item": {"kind": "ref", "name": "Item"}}]},
            }},
            "Pair": {"kind": "tuple", "prefix": [{"kind": "nullish"}, {"kind": "any"}], "rest": {"kind": "typeof", "name": "boolean"}},
            "Keys": {"kind": "any_of_consts", "values": ["a", "b", 1, null]},
            "Rec": {"kind": "object", "properties": {}, "indexed_properties": [
                {"key": {"kind": "regex", "pattern": "^[ab]$", "description": "a or b"}, "value": number()},
            ]},
        }))
    }

    proptest! {
        #[test]
        fn validate_agrees_with_safe_parse(input in arb_json(), strict in any::<bool>()) {
            let g = mixed_graph();
            let options = DecodeOptions { disallow_extra_properties: strict };
            let input = Value::from(input);
            for c in g.codecs() {
                prop_assert_eq!(c.validate(&input, &options), c.safe_parse(&input, &options).is_ok());
            }
        }

        #[test]
        fn structural_parse_is_idempotent(input in arb_json()) {
            let c = mixed_graph().codec("Pair").unwrap();
            let options = DecodeOptions::default();
            let input = Value::from(input);
            if let Ok(once) = c.parse(&input, &options) {
                let twice = c.parse(&once, &options).unwrap();
                prop_assert_eq!(once, twice);
            }
        }
    }
}
