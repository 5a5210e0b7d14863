//! Process-wide custom format registries.
//!
//! Populate once at bootstrap, before the first graph is built or any value is
//! decoded. Registering while decodes are in flight is a precondition
//! violation: lookups will see either the old or the new predicate.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use crate::error::{CodecError, Result};

pub type StringFormatter = Arc<dyn Fn(&str) -> bool + Send + Sync>;
pub type NumberFormatter = Arc<dyn Fn(f64) -> bool + Send + Sync>;

static STRING_FORMATTERS: Lazy<RwLock<HashMap<String, StringFormatter>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

static NUMBER_FORMATTERS: Lazy<RwLock<HashMap<String, NumberFormatter>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Last write wins on duplicate names.
pub fn register_string_formatter<F>(name: impl Into<String>, predicate: F)
where
    F: Fn(&str) -> bool + Send + Sync + 'static,
{
    let name = name.into();
    let mut table = STRING_FORMATTERS.write().unwrap_or_else(|e| e.into_inner());
    if table.insert(name.clone(), Arc::new(predicate)).is_some() {
        tracing::warn!(format = %name, "string formatter re-registered; previous predicate replaced");
    }
}

/// Last write wins on duplicate names.
pub fn register_number_formatter<F>(name: impl Into<String>, predicate: F)
where
    F: Fn(f64) -> bool + Send + Sync + 'static,
{
    let name = name.into();
    let mut table = NUMBER_FORMATTERS.write().unwrap_or_else(|e| e.into_inner());
    if table.insert(name.clone(), Arc::new(predicate)).is_some() {
        tracing::warn!(format = %name, "number formatter re-registered; previous predicate replaced");
    }
}

/// Register a string format whose predicate is "matches `pattern`".
pub fn register_string_regex_formatter(name: impl Into<String>, pattern: &str) -> Result<()> {
    let name = name.into();
    let rx = regex::Regex::new(pattern).map_err(|e| CodecError::InvalidRegex {
        pattern: pattern.to_string(),
        path: format!("format `{name}`"),
        reason: e.to_string(),
    })?;
    register_string_formatter(name, move |s| rx.is_match(s));
    Ok(())
}

pub fn string_formatter(name: &str) -> Option<StringFormatter> {
    let table = STRING_FORMATTERS.read().unwrap_or_else(|e| e.into_inner());
    table.get(name).cloned()
}

pub fn number_formatter(name: &str) -> Option<NumberFormatter> {
    let table = NUMBER_FORMATTERS.read().unwrap_or_else(|e| e.into_inner());
    table.get(name).cloned()
}
