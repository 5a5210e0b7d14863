use serde_json::json;

use super::{Runtype, RuntypeOps, error_here};
use crate::context::{DescribeCtx, HashCtx, ParseCtx, ReportCtx, SchemaCtx, ValidateCtx};
use crate::error::{DecodeError, Result};
use crate::hash;
use crate::value::Value;

fn index_segment(i: usize) -> String {
    format!("[{i}]")
}

// ------------------------------- Array ------------------------------------ //

#[derive(Debug, Clone)]
pub struct ArrayRuntype {
    pub item: Box<Runtype>,
}

impl RuntypeOps for ArrayRuntype {
    fn validate(&self, ctx: &ValidateCtx<'_>, input: &Value) -> bool {
        input
            .as_array()
            .is_some_and(|xs| xs.iter().all(|x| self.item.validate(ctx, x)))
    }

    fn parse_after_validation(&self, ctx: &ParseCtx<'_>, input: &Value) -> Result<Value> {
        let xs = input.as_array().unwrap_or_default();
        let out = xs
            .iter()
            .map(|x| self.item.parse_after_validation(ctx, x))
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::Array(out))
    }

    fn report_decode_error(&self, ctx: &mut ReportCtx<'_>, input: &Value) -> Vec<DecodeError> {
        let Some(xs) = input.as_array() else {
            return error_here(ctx, "expected array", input);
        };
        let vctx = ctx.validate_ctx();
        let mut errors = Vec::new();
        for (i, x) in xs.iter().enumerate() {
            if !self.item.validate(&vctx, x) {
                errors.extend(ctx.with_path(index_segment(i), |ctx| self.item.report_decode_error(ctx, x)));
            }
        }
        errors
    }

    fn schema(&self, ctx: &mut SchemaCtx<'_>) -> Result<serde_json::Value> {
        let items = ctx.with_path("[]", |ctx| self.item.schema(ctx))?;
        Ok(json!({ "type": "array", "items": items }))
    }

    fn describe(&self, ctx: &mut DescribeCtx<'_>) -> String {
        format!("Array<{}>", self.item.describe(ctx))
    }

    fn hash(&self, ctx: &mut HashCtx<'_>) -> i32 {
        hash::combine(hash::ARRAY, self.item.hash(ctx))
    }
}

// ------------------------------- Tuple ------------------------------------ //

/// Fixed positions plus an optional variadic tail.
#[derive(Debug, Clone)]
pub struct TupleRuntype {
    pub prefix: Vec<Runtype>,
    pub rest: Option<Box<Runtype>>,
}

impl RuntypeOps for TupleRuntype {
    fn validate(&self, ctx: &ValidateCtx<'_>, input: &Value) -> bool {
        let Some(xs) = input.as_array() else {
            return false;
        };
        for (i, runtype) in self.prefix.iter().enumerate() {
            if !runtype.validate(ctx, input.at(i)) {
                return false;
            }
        }
        let tail = xs.get(self.prefix.len()..).unwrap_or_default();
        match &self.rest {
            Some(rest) => tail.iter().all(|x| rest.validate(ctx, x)),
            None => tail.is_empty(),
        }
    }

    fn parse_after_validation(&self, ctx: &ParseCtx<'_>, input: &Value) -> Result<Value> {
        let xs = input.as_array().unwrap_or_default();
        let mut out = Vec::with_capacity(xs.len());
        for (i, runtype) in self.prefix.iter().enumerate() {
            let parsed = runtype.parse_after_validation(ctx, input.at(i))?;
            // optional slots past the end stay absent
            if i < xs.len() || !parsed.is_undefined() {
                out.push(parsed);
            }
        }
        if let Some(rest) = &self.rest {
            for x in xs.get(self.prefix.len()..).unwrap_or_default() {
                out.push(rest.parse_after_validation(ctx, x)?);
            }
        }
        Ok(Value::Array(out))
    }

    fn report_decode_error(&self, ctx: &mut ReportCtx<'_>, input: &Value) -> Vec<DecodeError> {
        let Some(xs) = input.as_array() else {
            return error_here(ctx, "expected tuple", input);
        };
        let vctx = ctx.validate_ctx();
        let mut errors = Vec::new();
        for (i, runtype) in self.prefix.iter().enumerate() {
            let x = input.at(i);
            if !runtype.validate(&vctx, x) {
                errors.extend(ctx.with_path(index_segment(i), |ctx| runtype.report_decode_error(ctx, x)));
            }
        }
        let start = self.prefix.len();
        let tail = xs.get(start..).unwrap_or_default();
        match &self.rest {
            Some(rest) => {
                for (offset, x) in tail.iter().enumerate() {
                    if !rest.validate(&vctx, x) {
                        errors.extend(ctx.with_path(index_segment(start + offset), |ctx| rest.report_decode_error(ctx, x)));
                    }
                }
            }
            None if !tail.is_empty() => {
                errors.extend(ctx.with_path(index_segment(start), |ctx| {
                    vec![DecodeError::regular(
                        format!("expected tuple with {start} items"),
                        ctx.path(),
                        tail[0].clone(),
                    )]
                }));
            }
            None => {}
        }
        errors
    }

    fn schema(&self, ctx: &mut SchemaCtx<'_>) -> Result<serde_json::Value> {
        let mut prefix_items = Vec::with_capacity(self.prefix.len());
        for (i, runtype) in self.prefix.iter().enumerate() {
            prefix_items.push(ctx.with_path(index_segment(i), |ctx| runtype.schema(ctx))?);
        }
        let items = match &self.rest {
            Some(rest) => ctx.with_path("[]", |ctx| rest.schema(ctx))?,
            None => serde_json::Value::Bool(false),
        };
        Ok(json!({ "type": "array", "prefixItems": prefix_items, "items": items }))
    }

    fn describe(&self, ctx: &mut DescribeCtx<'_>) -> String {
        let mut parts = self.prefix.iter().map(|r| r.describe(ctx)).collect::<Vec<_>>();
        if let Some(rest) = &self.rest {
            parts.push(format!("...Array<{}>", rest.describe(ctx)));
        }
        format!("[{}]", parts.join(", "))
    }

    fn hash(&self, ctx: &mut HashCtx<'_>) -> i32 {
        let mut h = hash::combine_all(hash::TUPLE, self.prefix.iter().map(|r| r.hash(ctx)).collect::<Vec<_>>());
        if let Some(rest) = &self.rest {
            h = hash::combine(h, rest.hash(ctx));
        }
        h
    }
}
