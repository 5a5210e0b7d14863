//! Conformance runner: decodes fixture suites through `json_runtype` and
//! compares validity, canonical output and error lists.
//!
//! `cargo run -p dev-test-runner [GLOB...]` (defaults to `suites/*.json`).
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use colored::Colorize;
use serde::Deserialize;

use json_runtype::{DecodeOptions, Graph, Value};

const DEFAULT_SUITES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/suites/*.json");

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct Suite {
    #[serde(default)]
    description: Option<String>,
    graph: serde_json::Value,
    codec: String,
    #[serde(default)]
    options: DecodeOptions,
    /// `name -> regex`, registered before the graph is built.
    #[serde(default)]
    string_formats: BTreeMap<String, String>,
    #[serde(default)]
    schema: Option<serde_json::Value>,
    #[serde(default)]
    describe: Option<String>,
    cases: Vec<Case>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Case {
    input: serde_json::Value,
    valid: bool,
    #[serde(default)]
    output: Option<serde_json::Value>,
    /// Serialized `DecodeError` list.
    #[serde(default)]
    errors: Option<serde_json::Value>,
    /// Pretty-printed error line.
    #[serde(default)]
    printed: Option<String>,
}

#[derive(Debug, Default)]
struct Tally {
    passed: usize,
    failures: Vec<String>,
}

fn load_suite(path: &Path) -> Result<Suite> {
    let source = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let de = &mut serde_json::Deserializer::from_str(&source);
    serde_path_to_error::deserialize(de).map_err(|err| {
        let at = err.path().to_string();
        anyhow::anyhow!("{}: at JSON path {at} → {}", path.display(), err.into_inner())
    })
}

fn run_suite(path: &Path, suite: &Suite, tally: &mut Tally) -> Result<()> {
    for (name, pattern) in &suite.string_formats {
        json_runtype::register_string_regex_formatter(name, pattern)?;
    }
    let graph = Graph::from_json(suite.graph.clone())?;
    let codec = graph.codec(&suite.codec)?;
    let label = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();

    let mut check = |ok: bool, what: String| {
        if ok {
            tally.passed += 1;
        } else {
            tally.failures.push(format!("{label}: {what}"));
        }
    };

    if let Some(expected) = &suite.schema {
        let actual = codec.schema()?;
        check(&actual == expected, format!("schema\n    expected {expected}\n    actual   {actual}"));
    }
    if let Some(expected) = &suite.describe {
        let actual = codec.describe();
        check(&actual == expected, format!("describe\n    expected {expected:?}\n    actual   {actual:?}"));
    }

    for (i, case) in suite.cases.iter().enumerate() {
        let input = Value::from(&case.input);
        let valid = codec.validate(&input, &suite.options);
        check(valid == case.valid, format!("case {i}: validate = {valid}, expected {}", case.valid));

        match codec.safe_parse(&input, &suite.options) {
            Ok(parsed) => {
                check(case.valid, format!("case {i}: safe_parse succeeded on invalid input"));
                if let Some(expected) = &case.output {
                    let actual = parsed.to_json();
                    check(&actual == expected, format!("case {i}: output {actual}, expected {expected}"));
                }
            }
            Err(errors) => {
                check(!case.valid, format!("case {i}: safe_parse failed: {}", json_runtype::print_errors(&errors)));
                if let Some(expected) = &case.errors {
                    let actual = serde_json::to_value(&errors)?;
                    check(&actual == expected, format!("case {i}: errors {actual}, expected {expected}"));
                }
                if let Some(expected) = &case.printed {
                    let actual = json_runtype::print_errors(&errors);
                    check(&actual == expected, format!("case {i}: printed {actual:?}, expected {expected:?}"));
                }
            }
        }
    }
    Ok(())
}

fn run(patterns: &[String]) -> Result<Tally> {
    let mut paths = Vec::<PathBuf>::new();
    for pattern in patterns {
        for entry in glob::glob(pattern)? {
            paths.push(entry?);
        }
    }
    if paths.is_empty() {
        bail!("no suites matched {patterns:?}");
    }
    paths.sort();

    let mut tally = Tally::default();
    for path in &paths {
        let suite = load_suite(path)?;
        if let Some(description) = &suite.description {
            eprintln!("{} {}", "suite".dimmed(), description);
        }
        run_suite(path, &suite, &mut tally).with_context(|| format!("running {}", path.display()))?;
    }
    Ok(tally)
}

fn main() -> ExitCode {
    let mut patterns = std::env::args().skip(1).collect::<Vec<_>>();
    if patterns.is_empty() {
        patterns.push(DEFAULT_SUITES.to_string());
    }
    match run(&patterns) {
        Ok(tally) => {
            for failure in &tally.failures {
                eprintln!("{} {failure}", "FAIL".red().bold());
            }
            let summary = format!("{} checks passed, {} failed", tally.passed, tally.failures.len());
            if tally.failures.is_empty() {
                eprintln!("{}", summary.green());
                ExitCode::SUCCESS
            } else {
                eprintln!("{}", summary.red());
                ExitCode::FAILURE
            }
        }
        Err(error) => {
            eprintln!("{} {error:#}", "error:".red().bold());
            ExitCode::from(2)
        }
    }
}
