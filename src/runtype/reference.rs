use serde_json::json;

use super::{Runtype, RuntypeOps, error_here};
use crate::context::{DescribeCtx, HashCtx, ParseCtx, ReportCtx, SchemaCtx, ValidateCtx};
use crate::error::{CodecError, DecodeError, Result};
use crate::graph::{Graph, RefId};
use crate::hash;
use crate::value::Value;

/// Indirection to a named definition, resolved to an arena index at build time.
#[derive(Debug, Clone)]
pub struct RefRuntype {
    pub id: RefId,
    pub name: String,
}

impl RefRuntype {
    fn target<'g>(&self, graph: &'g Graph) -> Option<&'g Runtype> {
        let target = graph.resolve(self.id);
        if target.is_none() {
            tracing::error!(name = %self.name, id = ?self.id, "ref does not resolve in this graph");
        }
        target
    }

    fn unresolved(&self) -> CodecError {
        CodecError::Internal(format!("ref `{}` does not resolve in this graph", self.name))
    }
}

impl RuntypeOps for RefRuntype {
    fn validate(&self, ctx: &ValidateCtx<'_>, input: &Value) -> bool {
        self.target(ctx.graph).is_some_and(|t| t.validate(ctx, input))
    }

    fn parse_after_validation(&self, ctx: &ParseCtx<'_>, input: &Value) -> Result<Value> {
        let target = self.target(ctx.graph).ok_or_else(|| self.unresolved())?;
        target.parse_after_validation(ctx, input)
    }

    fn report_decode_error(&self, ctx: &mut ReportCtx<'_>, input: &Value) -> Vec<DecodeError> {
        match self.target(ctx.graph) {
            Some(target) => target.report_decode_error(ctx, input),
            None => error_here(ctx, format!("unresolved ref {}", self.name), input),
        }
    }

    /// A ref already being emitted yields `{}` instead of recursing.
    fn schema(&self, ctx: &mut SchemaCtx<'_>) -> Result<serde_json::Value> {
        if !ctx.seen.insert(self.id) {
            return Ok(json!({}));
        }
        let out = match self.target(ctx.graph) {
            Some(target) => target.schema(ctx),
            None => Err(self.unresolved()),
        };
        ctx.seen.remove(&self.id);
        out
    }

    /// Measuring: count the visit, descend on the first one only.
    /// Emitting: refs seen more than once are hoisted and referenced by name,
    /// the rest are inlined.
    fn describe(&self, ctx: &mut DescribeCtx<'_>) -> String {
        let Some(target) = self.target(ctx.graph) else {
            return self.name.clone();
        };

        if ctx.measure {
            let entry = ctx.deps.entry(self.id).or_default();
            entry.count += 1;
            if entry.count == 1 {
                target.describe(ctx);
            }
            return self.name.clone();
        }

        if !ctx.is_hoisted(self.id) {
            return target.describe(ctx);
        }
        let pending = ctx.deps.get(&self.id).is_some_and(|d| d.text.is_none());
        if pending {
            // placeholder first so a self-reference stops here
            if let Some(entry) = ctx.deps.get_mut(&self.id) {
                entry.text = Some(String::new());
            }
            let text = target.describe(ctx);
            if let Some(entry) = ctx.deps.get_mut(&self.id) {
                entry.text = Some(text);
            }
        }
        self.name.clone()
    }

    /// Transparent to the target so a ref and its inlined shape hash alike.
    /// A back-edge contributes how far up the open refs it points, never
    /// the ref name, so recursive shapes under different names collide.
    fn hash(&self, ctx: &mut HashCtx<'_>) -> i32 {
        if let Some(distance) = ctx.back_distance(self.id) {
            return hash::combine(hash::REF, i32::try_from(distance).unwrap_or(i32::MAX));
        }
        let Some(target) = self.target(ctx.graph) else {
            return hash::combine(hash::REF, hash::hash_str(&self.name));
        };
        ctx.stack.push(self.id);
        let h = target.hash(ctx);
        ctx.stack.pop();
        h
    }
}
