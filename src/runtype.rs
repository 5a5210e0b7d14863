//! The runtype graph nodes and the six operations every node answers.
//!
//! Each kind lives in its own struct implementing [`RuntypeOps`]; [`Runtype`]
//! is the closed sum over them and forwards with an exhaustive `match`.
//!
//! Invariants shared by all kinds:
//! - `parse_after_validation` is only called on input `validate` accepted.
//! - `report_decode_error` is safe on any input and returns nothing for valid input.
//! - `schema`/`describe` traverse refs with cycle guards; `validate`/`parse`
//!   don't need them since values are finite.
pub mod format;
pub mod object;
pub mod primitive;
pub mod reference;
pub mod sequence;
pub mod union;

use crate::context::{DescribeCtx, HashCtx, ParseCtx, ReportCtx, SchemaCtx, ValidateCtx};
use crate::error::{DecodeError, Result};
use crate::value::Value;

pub use format::{NumberWithFormatsRuntype, StringWithFormatsRuntype};
pub use object::{IndexedProperty, ObjectRuntype, OptionalFieldRuntype};
pub use primitive::{
    AnyOfConstsRuntype, AnyRuntype, BigIntRuntype, ConstRuntype, ConstValue, DateRuntype,
    NeverRuntype, NullishRuntype, RegexRuntype, TypeofName, TypeofRuntype,
};
pub use reference::RefRuntype;
pub use sequence::{ArrayRuntype, TupleRuntype};
pub use union::{AllOfRuntype, AnyOfDiscriminatedRuntype, AnyOfRuntype};

pub trait RuntypeOps {
    fn validate(&self, ctx: &ValidateCtx<'_>, input: &Value) -> bool;

    /// Canonicalize `input`. Precondition: `validate(input)` was `true`.
    fn parse_after_validation(&self, ctx: &ParseCtx<'_>, input: &Value) -> Result<Value>;

    fn report_decode_error(&self, ctx: &mut ReportCtx<'_>, input: &Value) -> Vec<DecodeError>;

    fn schema(&self, ctx: &mut SchemaCtx<'_>) -> Result<serde_json::Value>;

    fn describe(&self, ctx: &mut DescribeCtx<'_>) -> String;

    fn hash(&self, ctx: &mut HashCtx<'_>) -> i32;
}

#[derive(Debug, Clone)]
pub enum Runtype {
    Typeof(TypeofRuntype),
    Any(AnyRuntype),
    Nullish(NullishRuntype),
    Never(NeverRuntype),
    Const(ConstRuntype),
    Regex(RegexRuntype),
    Date(DateRuntype),
    BigInt(BigIntRuntype),
    StringWithFormats(StringWithFormatsRuntype),
    NumberWithFormats(NumberWithFormatsRuntype),
    AnyOfConsts(AnyOfConstsRuntype),
    Tuple(TupleRuntype),
    AllOf(AllOfRuntype),
    AnyOf(AnyOfRuntype),
    Array(ArrayRuntype),
    AnyOfDiscriminated(AnyOfDiscriminatedRuntype),
    OptionalField(OptionalFieldRuntype),
    Object(ObjectRuntype),
    Ref(RefRuntype),
}

macro_rules! dispatch {
    ($self:expr, $node:ident => $call:expr) => {
        match $self {
            Runtype::Typeof($node) => $call,
            Runtype::Any($node) => $call,
            Runtype::Nullish($node) => $call,
            Runtype::Never($node) => $call,
            Runtype::Const($node) => $call,
            Runtype::Regex($node) => $call,
            Runtype::Date($node) => $call,
            Runtype::BigInt($node) => $call,
            Runtype::StringWithFormats($node) => $call,
            Runtype::NumberWithFormats($node) => $call,
            Runtype::AnyOfConsts($node) => $call,
            Runtype::Tuple($node) => $call,
            Runtype::AllOf($node) => $call,
            Runtype::AnyOf($node) => $call,
            Runtype::Array($node) => $call,
            Runtype::AnyOfDiscriminated($node) => $call,
            Runtype::OptionalField($node) => $call,
            Runtype::Object($node) => $call,
            Runtype::Ref($node) => $call,
        }
    };
}

impl RuntypeOps for Runtype {
    fn validate(&self, ctx: &ValidateCtx<'_>, input: &Value) -> bool {
        dispatch!(self, node => node.validate(ctx, input))
    }

    fn parse_after_validation(&self, ctx: &ParseCtx<'_>, input: &Value) -> Result<Value> {
        dispatch!(self, node => node.parse_after_validation(ctx, input))
    }

    fn report_decode_error(&self, ctx: &mut ReportCtx<'_>, input: &Value) -> Vec<DecodeError> {
        dispatch!(self, node => node.report_decode_error(ctx, input))
    }

    fn schema(&self, ctx: &mut SchemaCtx<'_>) -> Result<serde_json::Value> {
        dispatch!(self, node => node.schema(ctx))
    }

    fn describe(&self, ctx: &mut DescribeCtx<'_>) -> String {
        dispatch!(self, node => node.describe(ctx))
    }

    fn hash(&self, ctx: &mut HashCtx<'_>) -> i32 {
        dispatch!(self, node => node.hash(ctx))
    }
}

impl Runtype {
    pub fn kind(&self) -> &'static str {
        match self {
            Runtype::Typeof(_) => "typeof",
            Runtype::Any(_) => "any",
            Runtype::Nullish(_) => "nullish",
            Runtype::Never(_) => "never",
            Runtype::Const(_) => "const",
            Runtype::Regex(_) => "regex",
            Runtype::Date(_) => "date",
            Runtype::BigInt(_) => "bigint",
            Runtype::StringWithFormats(_) => "string_with_formats",
            Runtype::NumberWithFormats(_) => "number_with_formats",
            Runtype::AnyOfConsts(_) => "any_of_consts",
            Runtype::Tuple(_) => "tuple",
            Runtype::AllOf(_) => "all_of",
            Runtype::AnyOf(_) => "any_of",
            Runtype::Array(_) => "array",
            Runtype::AnyOfDiscriminated(_) => "any_of_discriminated",
            Runtype::OptionalField(_) => "optional_field",
            Runtype::Object(_) => "object",
            Runtype::Ref(_) => "ref",
        }
    }

    pub fn is_optional_field(&self) -> bool {
        matches!(self, Runtype::OptionalField(_))
    }
}

/// Regular error at the current report path.
pub(crate) fn error_here(ctx: &ReportCtx<'_>, message: impl Into<String>, input: &Value) -> Vec<DecodeError> {
    vec![DecodeError::regular(message, ctx.path(), input.clone())]
}

/// `(a | b | c)`, the single member bare, `empty` for none.
pub(crate) fn join_describe(parts: Vec<String>, sep: &str, empty: &str) -> String {
    match parts.len() {
        0 => empty.to_string(),
        1 => parts.into_iter().next().unwrap_or_default(),
        _ => format!("({})", parts.join(sep)),
    }
}
