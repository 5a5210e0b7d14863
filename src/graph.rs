//! The runtype graph: named definitions in an arena, refs resolved to indices.
//!
//! The external compiler hands over a JSON document of node records tagged by
//! `"kind"`. Building walks every record once, resolves `ref` names, compiles
//! regexes and checks format registrations, so schema-definition mistakes
//! surface here and not per request.

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::codec::Codec;
use crate::error::{CodecError, Result, display_path};
use crate::runtype::{
    AllOfRuntype, AnyOfConstsRuntype, AnyOfDiscriminatedRuntype, AnyOfRuntype, AnyRuntype,
    ArrayRuntype, BigIntRuntype, ConstRuntype, ConstValue, DateRuntype, IndexedProperty,
    NeverRuntype, NullishRuntype, NumberWithFormatsRuntype, ObjectRuntype, OptionalFieldRuntype,
    RefRuntype, RegexRuntype, Runtype, StringWithFormatsRuntype, TupleRuntype, TypeofName,
    TypeofRuntype,
};

// ————————————————————————————————————————————————————————————————————————————
// INPUT RECORDS
// ————————————————————————————————————————————————————————————————————————————

/// One node record as produced by the type-to-schema compiler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuntypeDef {
    Typeof { name: TypeofName },
    Any,
    Nullish,
    Never,
    Const { value: serde_json::Value },
    Regex { pattern: String, description: String },
    Date,
    #[serde(rename = "bigint")]
    BigInt,
    StringWithFormats { formats: Vec<String> },
    NumberWithFormats { formats: Vec<String> },
    AnyOfConsts { values: Vec<serde_json::Value> },
    Tuple {
        prefix: Vec<RuntypeDef>,
        #[serde(default)]
        rest: Option<Box<RuntypeDef>>,
    },
    AllOf { schemas: Vec<RuntypeDef> },
    AnyOf { schemas: Vec<RuntypeDef> },
    Array { item: Box<RuntypeDef> },
    AnyOfDiscriminated {
        schemas: Vec<RuntypeDef>,
        discriminator: String,
        mapping: IndexMap<String, RuntypeDef>,
    },
    OptionalField { inner: Box<RuntypeDef> },
    Object {
        properties: IndexMap<String, RuntypeDef>,
        #[serde(default)]
        indexed_properties: Vec<IndexedPropertyDef>,
    },
    Ref { name: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedPropertyDef {
    pub key: RuntypeDef,
    pub value: RuntypeDef,
}

/// Top-level document: `{ "definitions": { Name: Node } }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDocument {
    pub definitions: IndexMap<String, RuntypeDef>,
}

// ————————————————————————————————————————————————————————————————————————————
// GRAPH
// ————————————————————————————————————————————————————————————————————————————

/// Arena index of a named definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefId(usize);

/// Immutable once built; share it behind an `Arc`.
#[derive(Debug, Default)]
pub struct Graph {
    definitions: IndexMap<String, Runtype>,
}

impl Graph {
    pub fn from_document(document: GraphDocument) -> Result<Arc<Graph>> {
        let mut builder = GraphBuilder::new();
        for (name, def) in document.definitions {
            builder = builder.define(name, def);
        }
        builder.build()
    }

    /// Load from JSON text; malformed records report their JSON path.
    pub fn from_json_str(src: &str) -> Result<Arc<Graph>> {
        let document = crate::path_de::from_str_with_path::<GraphDocument>(src)?;
        Self::from_document(document)
    }

    pub fn from_json(value: serde_json::Value) -> Result<Arc<Graph>> {
        let document = serde_json::from_value::<GraphDocument>(value)
            .map_err(|e| CodecError::GraphLoad(e.to_string()))?;
        Self::from_document(document)
    }

    pub fn resolve(&self, id: RefId) -> Option<&Runtype> {
        self.definitions.get_index(id.0).map(|(_, r)| r)
    }

    pub fn id_of(&self, name: &str) -> Option<RefId> {
        self.definitions.get_index_of(name).map(RefId)
    }

    pub fn name_of(&self, id: RefId) -> Option<&str> {
        self.definitions.get_index(id.0).map(|(n, _)| n.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Facade for the exported definition `name`.
    pub fn codec(self: &Arc<Self>, name: &str) -> Result<Codec> {
        let id = self.id_of(name).ok_or_else(|| CodecError::UnknownCodec(name.to_string()))?;
        let root = Runtype::Ref(RefRuntype { id, name: name.to_string() });
        Ok(Codec::new(name, Arc::clone(self), root))
    }

    /// Facades for every definition, in declaration order.
    pub fn codecs(self: &Arc<Self>) -> Vec<Codec> {
        self.definitions
            .keys()
            .enumerate()
            .map(|(i, name)| {
                let root = Runtype::Ref(RefRuntype { id: RefId(i), name: name.clone() });
                Codec::new(name, Arc::clone(self), root)
            })
            .collect()
    }

    /// Compile an anonymous node against this graph's definitions.
    pub fn compile(&self, def: &RuntypeDef) -> Result<Runtype> {
        let names = self.definitions.keys().cloned().collect::<IndexSet<_>>();
        Resolver { names: &names }.compile(def, &mut Vec::new())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// BUILDER
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Default)]
pub struct GraphBuilder {
    definitions: IndexMap<String, RuntypeDef>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Redefining a name replaces the earlier record in place.
    pub fn define(mut self, name: impl Into<String>, def: RuntypeDef) -> Self {
        self.definitions.insert(name.into(), def);
        self
    }

    pub fn build(self) -> Result<Arc<Graph>> {
        let names = self.definitions.keys().cloned().collect::<IndexSet<_>>();
        let resolver = Resolver { names: &names };
        let mut definitions = IndexMap::with_capacity(self.definitions.len());
        for (name, def) in &self.definitions {
            let mut path = vec![name.clone()];
            definitions.insert(name.clone(), resolver.compile(def, &mut path)?);
        }
        tracing::debug!(definitions = definitions.len(), "built runtype graph");
        Ok(Arc::new(Graph { definitions }))
    }
}

/// Maps ref names to arena slots while compiling records.
struct Resolver<'n> {
    names: &'n IndexSet<String>,
}

impl Resolver<'_> {
    fn compile(&self, def: &RuntypeDef, path: &mut Vec<String>) -> Result<Runtype> {
        let runtype = match def {
            RuntypeDef::Typeof { name } => Runtype::Typeof(TypeofRuntype { name: *name }),
            RuntypeDef::Any => Runtype::Any(AnyRuntype),
            RuntypeDef::Nullish => Runtype::Nullish(NullishRuntype),
            RuntypeDef::Never => Runtype::Never(NeverRuntype),
            RuntypeDef::Const { value } => Runtype::Const(ConstRuntype { value: const_value(value, path)? }),
            RuntypeDef::Regex { pattern, description } => {
                let regex = regex::Regex::new(pattern).map_err(|e| CodecError::InvalidRegex {
                    pattern: pattern.clone(),
                    path: display_path(path),
                    reason: e.to_string(),
                })?;
                Runtype::Regex(RegexRuntype { regex, description: description.clone() })
            }
            RuntypeDef::Date => Runtype::Date(DateRuntype),
            RuntypeDef::BigInt => Runtype::BigInt(BigIntRuntype),
            RuntypeDef::StringWithFormats { formats } => {
                check_formats("string", formats, path, |n| crate::formats::string_formatter(n).is_some())?;
                Runtype::StringWithFormats(StringWithFormatsRuntype { formats: formats.clone() })
            }
            RuntypeDef::NumberWithFormats { formats } => {
                check_formats("number", formats, path, |n| crate::formats::number_formatter(n).is_some())?;
                Runtype::NumberWithFormats(NumberWithFormatsRuntype { formats: formats.clone() })
            }
            RuntypeDef::AnyOfConsts { values } => Runtype::AnyOfConsts(AnyOfConstsRuntype {
                values: values.iter().map(|v| const_value(v, path)).collect::<Result<_>>()?,
            }),
            RuntypeDef::Tuple { prefix, rest } => {
                let mut compiled = Vec::with_capacity(prefix.len());
                for (i, item) in prefix.iter().enumerate() {
                    compiled.push(self.nested(item, format!("[{i}]"), path)?);
                }
                let rest = match rest {
                    Some(rest) => Some(Box::new(self.nested(rest, "rest", path)?)),
                    None => None,
                };
                Runtype::Tuple(TupleRuntype { prefix: compiled, rest })
            }
            RuntypeDef::AllOf { schemas } => Runtype::AllOf(AllOfRuntype { schemas: self.members(schemas, "allOf", path)? }),
            RuntypeDef::AnyOf { schemas } => Runtype::AnyOf(AnyOfRuntype { schemas: self.members(schemas, "anyOf", path)? }),
            RuntypeDef::Array { item } => Runtype::Array(ArrayRuntype { item: Box::new(self.nested(item, "[]", path)?) }),
            RuntypeDef::AnyOfDiscriminated { schemas, discriminator, mapping } => {
                if mapping.is_empty() {
                    return Err(CodecError::EmptyDiscriminatorMapping {
                        discriminator: discriminator.clone(),
                        path: display_path(path),
                    });
                }
                let mut compiled = IndexMap::with_capacity(mapping.len());
                for (tag, def) in mapping {
                    compiled.insert(tag.clone(), self.nested(def, format!("mapping.{tag}"), path)?);
                }
                Runtype::AnyOfDiscriminated(AnyOfDiscriminatedRuntype {
                    schemas: self.members(schemas, "anyOf", path)?,
                    discriminator: discriminator.clone(),
                    mapping: compiled,
                })
            }
            RuntypeDef::OptionalField { inner } => {
                Runtype::OptionalField(OptionalFieldRuntype { inner: Box::new(self.compile(inner, path)?) })
            }
            RuntypeDef::Object { properties, indexed_properties } => {
                let mut compiled = IndexMap::with_capacity(properties.len());
                for (key, def) in properties {
                    compiled.insert(key.clone(), self.nested(def, key.clone(), path)?);
                }
                let mut indexed = Vec::with_capacity(indexed_properties.len());
                for pair in indexed_properties {
                    indexed.push(IndexedProperty {
                        key: self.nested(&pair.key, "[key]", path)?,
                        value: self.nested(&pair.value, "[value]", path)?,
                    });
                }
                Runtype::Object(ObjectRuntype { properties: compiled, indexed_properties: indexed })
            }
            RuntypeDef::Ref { name } => {
                let index = self.names.get_index_of(name).ok_or_else(|| CodecError::UnknownRef {
                    name: name.clone(),
                    path: display_path(path),
                })?;
                Runtype::Ref(RefRuntype { id: RefId(index), name: name.clone() })
            }
        };
        Ok(runtype)
    }

    fn nested(&self, def: &RuntypeDef, segment: impl Into<String>, path: &mut Vec<String>) -> Result<Runtype> {
        path.push(segment.into());
        let out = self.compile(def, path);
        path.pop();
        out
    }

    fn members(&self, defs: &[RuntypeDef], label: &str, path: &mut Vec<String>) -> Result<Vec<Runtype>> {
        defs.iter()
            .enumerate()
            .map(|(i, def)| self.nested(def, format!("{label}[{i}]"), path))
            .collect()
    }
}

fn const_value(value: &serde_json::Value, path: &[String]) -> Result<ConstValue> {
    ConstValue::from_json(value).ok_or_else(|| {
        CodecError::GraphLoad(format!(
            "const at {} must be a string, number, boolean or null, got {value}",
            display_path(path)
        ))
    })
}

fn check_formats(
    kind: &'static str,
    formats: &[String],
    path: &[String],
    registered: impl Fn(&str) -> bool,
) -> Result<()> {
    if formats.is_empty() {
        return Err(CodecError::EmptyFormats { path: display_path(path) });
    }
    match formats.iter().find(|f| !registered(f.as_str())) {
        Some(missing) => Err(CodecError::UnknownFormat {
            kind,
            name: missing.clone(),
            path: display_path(path),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(definitions: serde_json::Value) -> Result<Arc<Graph>> {
        Graph::from_json(json!({ "definitions": definitions }))
    }

    #[test]
    fn refs_resolve_to_arena_slots() {
        let graph = build(json!({
            "A": {"kind": "ref", "name": "B"},
            "B": {"kind": "any"},
        }))
        .unwrap();
        let Some(Runtype::Ref(r)) = graph.resolve(graph.id_of("A").unwrap()) else {
            panic!("A should compile to a ref");
        };
        assert_eq!(Some(r.id), graph.id_of("B"));
        assert_eq!(graph.name_of(r.id), Some("B"));
        assert_eq!(graph.names().collect::<Vec<_>>(), ["A", "B"]);
    }

    #[test]
    fn unknown_ref_names_its_location() {
        let err = build(json!({
            "A": {"kind": "object", "properties": {"x": {"kind": "array", "item": {"kind": "ref", "name": "Nope"}}}},
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "unknown ref `Nope` at A.x[]");
    }

    #[test]
    fn bad_regex_fails_the_build() {
        let err = build(json!({"R": {"kind": "regex", "pattern": "(", "description": "broken"}})).unwrap_err();
        assert!(matches!(err, CodecError::InvalidRegex { .. }), "{err}");
    }

    #[test]
    fn formats_must_be_registered_and_non_empty() {
        let err = build(json!({"F": {"kind": "string_with_formats", "formats": ["graph-test-missing"]}})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "string formatter `graph-test-missing` is not registered (at F)"
        );
        let err = build(json!({"F": {"kind": "number_with_formats", "formats": []}})).unwrap_err();
        assert!(matches!(err, CodecError::EmptyFormats { .. }));

        crate::formats::register_number_formatter("graph-test-even", |n| n % 2.0 == 0.0);
        assert!(build(json!({"F": {"kind": "number_with_formats", "formats": ["graph-test-even"]}})).is_ok());
    }

    #[test]
    fn empty_discriminator_mapping_is_rejected() {
        let err = build(json!({
            "D": {"kind": "any_of_discriminated", "schemas": [], "discriminator": "t", "mapping": {}},
        }))
        .unwrap_err();
        assert!(matches!(err, CodecError::EmptyDiscriminatorMapping { .. }));
    }

    #[test]
    fn const_rejects_structured_values() {
        let err = build(json!({"C": {"kind": "const", "value": [1]}})).unwrap_err();
        assert!(matches!(err, CodecError::GraphLoad(_)));
    }

    #[test]
    fn malformed_document_reports_json_path() {
        let err = Graph::from_json_str(r#"{"definitions": {"A": {"kind": "tuple"}}}"#).unwrap_err();
        assert!(err.to_string().contains("definitions.A"), "{err}");
    }

    #[test]
    fn unknown_codec() {
        let graph = build(json!({"A": {"kind": "any"}})).unwrap();
        assert!(matches!(graph.codec("B"), Err(CodecError::UnknownCodec(name)) if name == "B"));
        assert_eq!(graph.codecs().len(), 1);
    }

    #[test]
    fn builder_redefinition_replaces_in_place() {
        let graph = GraphBuilder::new()
            .define("A", RuntypeDef::Any)
            .define("B", RuntypeDef::Never)
            .define("A", RuntypeDef::Nullish)
            .build()
            .unwrap();
        assert_eq!(graph.names().collect::<Vec<_>>(), ["A", "B"]);
        assert_eq!(graph.resolve(graph.id_of("A").unwrap()).map(Runtype::kind), Some("nullish"));
    }

    #[test]
    fn compile_anonymous_node_against_graph() {
        let graph = build(json!({"A": {"kind": "typeof", "name": "string"}})).unwrap();
        let def = serde_json::from_value::<RuntypeDef>(json!({"kind": "array", "item": {"kind": "ref", "name": "A"}})).unwrap();
        assert_eq!(graph.compile(&def).unwrap().kind(), "array");
    }
}
