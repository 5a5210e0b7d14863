//! Per-call state threaded through every runtype operation.
//!
//! A context is created fresh for each top-level call and dropped afterwards.
//! None of them are shared across overlapping calls: the report path stack,
//! the schema `seen` set and the hash ref stack are mutated in place.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::graph::{Graph, RefId};

/// The only recognized decode flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodeOptions {
    /// Reject keys not declared on objects without index signatures.
    #[serde(default)]
    pub disallow_extra_properties: bool,
}

#[derive(Clone, Copy)]
pub struct ValidateCtx<'a> {
    pub graph: &'a Graph,
    pub disallow_extra_properties: bool,
}

impl<'a> ValidateCtx<'a> {
    pub fn new(graph: &'a Graph, options: &DecodeOptions) -> Self {
        Self { graph, disallow_extra_properties: options.disallow_extra_properties }
    }
}

#[derive(Clone, Copy)]
pub struct ParseCtx<'a> {
    pub graph: &'a Graph,
    pub disallow_extra_properties: bool,
}

impl<'a> ParseCtx<'a> {
    pub fn new(graph: &'a Graph, options: &DecodeOptions) -> Self {
        Self { graph, disallow_extra_properties: options.disallow_extra_properties }
    }

    /// Unions and index signatures decide what to parse by validating first.
    pub fn validate_ctx(&self) -> ValidateCtx<'a> {
        ValidateCtx { graph: self.graph, disallow_extra_properties: self.disallow_extra_properties }
    }
}

pub struct ReportCtx<'a> {
    pub graph: &'a Graph,
    pub disallow_extra_properties: bool,
    path: Vec<String>,
}

impl<'a> ReportCtx<'a> {
    pub fn new(graph: &'a Graph, options: &DecodeOptions) -> Self {
        Self { graph, disallow_extra_properties: options.disallow_extra_properties, path: Vec::new() }
    }

    pub fn validate_ctx(&self) -> ValidateCtx<'a> {
        ValidateCtx { graph: self.graph, disallow_extra_properties: self.disallow_extra_properties }
    }

    pub fn path(&self) -> Vec<String> {
        self.path.clone()
    }

    pub fn push_path(&mut self, segment: impl Into<String>) {
        self.path.push(segment.into());
    }

    pub fn pop_path(&mut self) {
        self.path.pop();
    }

    /// Run `f` with `segment` pushed; the segment is popped on every exit from `f`.
    pub fn with_path<T>(&mut self, segment: impl Into<String>, f: impl FnOnce(&mut Self) -> T) -> T {
        self.push_path(segment);
        let out = f(self);
        self.pop_path();
        out
    }

    /// Run `f` against an empty path, then restore the current one.
    /// Union branches report relative to the union itself.
    pub fn with_detached_path<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = std::mem::take(&mut self.path);
        let out = f(self);
        self.path = saved;
        out
    }
}

pub struct SchemaCtx<'a> {
    pub graph: &'a Graph,
    pub path: Vec<String>,
    pub seen: HashSet<RefId>,
}

impl<'a> SchemaCtx<'a> {
    pub fn new(graph: &'a Graph) -> Self {
        Self { graph, path: Vec::new(), seen: HashSet::new() }
    }

    pub fn with_path<T>(&mut self, segment: impl Into<String>, f: impl FnOnce(&mut Self) -> T) -> T {
        self.path.push(segment.into());
        let out = f(self);
        self.path.pop();
        out
    }
}

/// How often a named ref was reached while measuring, and its rendered text
/// once it has been hoisted.
#[derive(Debug, Clone, Default)]
pub struct DepEntry {
    pub count: usize,
    pub text: Option<String>,
}

pub struct DescribeCtx<'a> {
    pub graph: &'a Graph,
    /// `true` during the counting pass, `false` while emitting.
    pub measure: bool,
    pub deps: HashMap<RefId, DepEntry>,
}

impl<'a> DescribeCtx<'a> {
    pub fn new(graph: &'a Graph) -> Self {
        Self { graph, measure: true, deps: HashMap::new() }
    }

    pub fn is_hoisted(&self, id: RefId) -> bool {
        self.deps.get(&id).is_some_and(|d| d.count > 1)
    }
}

pub struct HashCtx<'a> {
    pub graph: &'a Graph,
    /// Refs currently being hashed, innermost last.
    pub stack: Vec<RefId>,
}

impl<'a> HashCtx<'a> {
    pub fn new(graph: &'a Graph) -> Self {
        Self { graph, stack: Vec::new() }
    }

    /// How many refs up the stack `id` is already open, if it is.
    pub fn back_distance(&self, id: RefId) -> Option<usize> {
        self.stack.iter().rposition(|open| *open == id).map(|pos| self.stack.len() - pos)
    }
}
