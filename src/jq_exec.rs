//! jq pre-filter applied to input documents before decoding.
//!
//! The filter is compiled once per invocation and then run against every
//! selected document.

use anyhow::{Result, anyhow};
use jaq_core::{Compiler, Ctx, Filter, Native, RcIter, compile, load};
use jaq_json::Val;
use serde_json::Value;

pub struct JqSelector {
    source: String,
    filter: Filter<Native<Val>>,
}

impl JqSelector {
    /// Parse and compile `source` with the jq standard library and the JSON
    /// builtins in scope.
    pub fn compile(source: &str) -> Result<Self> {
        let arena = load::Arena::default();
        let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
        let modules = loader
            .load(&arena, load::File { code: source, path: () })
            .map_err(|errors| parse_failure(source, errors))?;
        let filter = Compiler::default()
            .with_funs(jaq_std::funs().chain(jaq_json::funs()))
            .compile(modules)
            .map_err(|errors| compile_failure(source, errors))?;
        tracing::debug!(filter = source, "compiled jq filter");
        Ok(Self { source: source.to_string(), filter })
    }

    /// Every output the filter yields for `document`, in order.
    pub fn select(&self, document: &Value) -> Result<Vec<Value>> {
        let inputs = RcIter::new(core::iter::empty());
        self.filter
            .run((Ctx::new([], &inputs), Val::from(document.clone())))
            .map(|out| out.map(Value::from).map_err(|e| anyhow!("jq `{}` failed: {e}", self.source)))
            .collect()
    }
}

fn parse_failure(source: &str, errors: load::Errors<&str, ()>) -> anyhow::Error {
    let reasons = errors.into_iter().map(|(_, e)| format!("{e:?}")).collect::<Vec<_>>();
    anyhow!("cannot parse jq filter `{source}`: {}", reasons.join("; "))
}

fn compile_failure(source: &str, errors: compile::Errors<&str, ()>) -> anyhow::Error {
    let names = errors
        .into_iter()
        .flat_map(|(_, undefined)| undefined)
        .map(|(name, kind)| format!("`{name}` ({kind:?})"))
        .collect::<Vec<_>>();
    anyhow!("jq filter `{source}` refers to undefined {}", names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compiled_filter_runs_over_many_documents() {
        let selector = JqSelector::compile(".items[] | select(.keep)").unwrap();
        let first = selector.select(&json!({"items": [{"keep": true, "n": 1}, {"keep": false}]})).unwrap();
        assert_eq!(first, vec![json!({"keep": true, "n": 1})]);
        assert!(selector.select(&json!({"items": []})).unwrap().is_empty());
    }

    #[test]
    fn bad_filters_fail_to_compile() {
        let err = JqSelector::compile(".a |").err().unwrap();
        assert!(err.to_string().contains("cannot parse jq filter"));
        let err = JqSelector::compile("no_such_function").err().unwrap();
        assert!(err.to_string().contains("`no_such_function`"));
    }

    #[test]
    fn runtime_errors_name_the_filter() {
        let selector = JqSelector::compile(".a + 1").unwrap();
        let err = selector.select(&json!({"a": "text"})).unwrap_err();
        assert!(err.to_string().starts_with("jq `.a + 1` failed"));
    }
}
