//! Strings and numbers constrained by named predicates from the format registries.
//!
//! Formats are checked for existence when the graph is built; they are looked
//! up again on every validation so late re-registration takes effect.

use serde_json::json;

use super::{RuntypeOps, error_here};
use crate::context::{DescribeCtx, HashCtx, ParseCtx, ReportCtx, SchemaCtx, ValidateCtx};
use crate::error::{DecodeError, Result};
use crate::formats;
use crate::hash;
use crate::value::Value;

fn format_label(formats: &[String]) -> String {
    formats.join(" and ")
}

fn hash_formats(tag: i32, formats: &[String]) -> i32 {
    let mut sorted = formats.iter().map(String::as_str).collect::<Vec<_>>();
    sorted.sort_unstable();
    hash::combine_all(tag, sorted.into_iter().map(hash::hash_str))
}

fn describe_formats(wrapper: &str, formats: &[String]) -> String {
    let parts = formats
        .iter()
        .map(|f| format!("{wrapper}<{}>", serde_json::Value::from(f.as_str())))
        .collect::<Vec<_>>();
    super::join_describe(parts, " & ", wrapper)
}

#[derive(Debug, Clone)]
pub struct StringWithFormatsRuntype {
    pub formats: Vec<String>,
}

impl RuntypeOps for StringWithFormatsRuntype {
    fn validate(&self, _ctx: &ValidateCtx<'_>, input: &Value) -> bool {
        let Some(s) = input.as_str() else {
            return false;
        };
        self.formats.iter().all(|name| match formats::string_formatter(name) {
            Some(predicate) => predicate(s),
            None => {
                tracing::error!(format = %name, "string formatter missing at validation time");
                false
            }
        })
    }

    fn parse_after_validation(&self, _ctx: &ParseCtx<'_>, input: &Value) -> Result<Value> {
        Ok(input.clone())
    }

    fn report_decode_error(&self, ctx: &mut ReportCtx<'_>, input: &Value) -> Vec<DecodeError> {
        if self.validate(&ctx.validate_ctx(), input) {
            return Vec::new();
        }
        let label = serde_json::Value::from(format_label(&self.formats));
        error_here(ctx, format!("expected string with format {label}"), input)
    }

    fn schema(&self, _ctx: &mut SchemaCtx<'_>) -> Result<serde_json::Value> {
        Ok(json!({ "type": "string", "format": format_label(&self.formats) }))
    }

    fn describe(&self, _ctx: &mut DescribeCtx<'_>) -> String {
        describe_formats("StringFormat", &self.formats)
    }

    fn hash(&self, _ctx: &mut HashCtx<'_>) -> i32 {
        hash_formats(hash::STRING_WITH_FORMATS, &self.formats)
    }
}

#[derive(Debug, Clone)]
pub struct NumberWithFormatsRuntype {
    pub formats: Vec<String>,
}

impl RuntypeOps for NumberWithFormatsRuntype {
    fn validate(&self, _ctx: &ValidateCtx<'_>, input: &Value) -> bool {
        let Value::Number(n) = input else {
            return false;
        };
        self.formats.iter().all(|name| match formats::number_formatter(name) {
            Some(predicate) => predicate(*n),
            None => {
                tracing::error!(format = %name, "number formatter missing at validation time");
                false
            }
        })
    }

    fn parse_after_validation(&self, _ctx: &ParseCtx<'_>, input: &Value) -> Result<Value> {
        Ok(input.clone())
    }

    fn report_decode_error(&self, ctx: &mut ReportCtx<'_>, input: &Value) -> Vec<DecodeError> {
        if self.validate(&ctx.validate_ctx(), input) {
            return Vec::new();
        }
        let label = serde_json::Value::from(format_label(&self.formats));
        error_here(ctx, format!("expected number with format {label}"), input)
    }

    fn schema(&self, _ctx: &mut SchemaCtx<'_>) -> Result<serde_json::Value> {
        Ok(json!({ "type": "number", "format": format_label(&self.formats) }))
    }

    fn describe(&self, _ctx: &mut DescribeCtx<'_>) -> String {
        describe_formats("NumberFormat", &self.formats)
    }

    fn hash(&self, _ctx: &mut HashCtx<'_>) -> i32 {
        hash_formats(hash::NUMBER_WITH_FORMATS, &self.formats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DecodeOptions;
    use crate::graph::Graph;
    use serde_json::json;

    #[test]
    fn number_formats_validate_and_report() {
        formats::register_number_formatter("format_test_even", |n| n % 2.0 == 0.0);
        formats::register_number_formatter("format_test_positive", |n| n > 0.0);
        let graph = Graph::from_json(json!({"definitions": {
            "N": {"kind": "number_with_formats", "formats": ["format_test_even", "format_test_positive"]},
        }}))
        .unwrap();
        let c = graph.codec("N").unwrap();
        let opts = DecodeOptions::default();

        assert!(c.validate(&Value::Number(4.0), &opts));
        assert!(!c.validate(&Value::Number(-4.0), &opts));
        assert!(!c.validate(&Value::from("4"), &opts));

        let errors = c.safe_parse(&Value::Number(3.0), &opts).unwrap_err();
        assert_eq!(
            errors[0].message(),
            Some("expected number with format \"format_test_even and format_test_positive\"")
        );
        assert_eq!(
            c.schema().unwrap(),
            json!({"type": "number", "format": "format_test_even and format_test_positive"})
        );
        assert_eq!(
            c.describe(),
            "type CodecN = (NumberFormat<\"format_test_even\"> & NumberFormat<\"format_test_positive\">);"
        );
    }

    #[test]
    fn format_order_does_not_change_hash() {
        let a = NumberWithFormatsRuntype { formats: vec!["x".into(), "y".into()] };
        let b = NumberWithFormatsRuntype { formats: vec!["y".into(), "x".into()] };
        let g = Graph::default();
        assert_eq!(a.hash(&mut HashCtx::new(&g)), b.hash(&mut HashCtx::new(&g)));
    }
}
