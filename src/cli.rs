//! CLI: load a runtype graph, then check | parse | schema | describe | hash.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indexmap::IndexMap;
use rayon::prelude::*;

use json_runtype::{Codec, DecodeOptions, Graph, Value};

use crate::jq_exec::JqSelector;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// decode JSON documents against a compiled runtype graph, or inspect the graph
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// validate every input document and report decode errors
    Check(CheckOut),
    /// print the canonical parsed form of every input document
    Parse(ParseOut),
    /// print the JSON Schema of one codec
    Schema(CodecOut),
    /// print the TypeScript-like description of one codec
    Describe(CodecOut),
    /// print structural hashes and group definitions that share one
    Hash(HashOut),
}

#[derive(Args, Debug, Clone)]
struct GraphSettings {
    /// runtype graph: `{"definitions": {Name: Node}}`
    #[arg(long, short)]
    graph: PathBuf,

    /// register a string format backed by a regex, as `name=pattern` (repeatable)
    #[arg(long = "string-format", value_name = "NAME=REGEX")]
    string_formats: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct DecodeSettings {
    /// reject keys not declared on objects without index signatures
    #[arg(long, default_value_t = false)]
    disallow_extra_properties: bool,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    graph_settings: GraphSettings,

    /// exported definition to decode with
    #[arg(long, short)]
    codec: String,

    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    decode_settings: DecodeSettings,

    /// only print failing documents
    #[arg(long, short)]
    quiet: bool,
}

#[derive(clap::Parser, Debug)]
struct ParseOut {
    #[command(flatten)]
    graph_settings: GraphSettings,

    /// exported definition to decode with
    #[arg(long, short)]
    codec: String,

    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    decode_settings: DecodeSettings,

    /// output file, one JSON document per line (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct CodecOut {
    #[command(flatten)]
    graph_settings: GraphSettings,

    /// exported definition to inspect
    #[arg(long, short)]
    codec: String,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct HashOut {
    #[command(flatten)]
    graph_settings: GraphSettings,

    /// only print groups of definitions with equal hashes
    #[arg(long)]
    duplicates_only: bool,
}

/// One decoded unit of input: a file, an NDJSON line, or a jq output.
struct Document {
    label: String,
    value: serde_json::Value,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl GraphSettings {
    fn load(&self) -> Result<Arc<Graph>> {
        for entry in &self.string_formats {
            let (name, pattern) = entry
                .split_once('=')
                .ok_or_else(|| anyhow!("--string-format expects NAME=REGEX, got `{entry}`"))?;
            json_runtype::register_string_regex_formatter(name, pattern)?;
        }
        let source = std::fs::read_to_string(&self.graph)
            .with_context(|| format!("failed to read graph file {}", self.graph.display()))?;
        let graph = Graph::from_json_str(&source)
            .with_context(|| format!("invalid graph file {}", self.graph.display()))?;
        tracing::info!(path = %self.graph.display(), definitions = graph.len(), "loaded graph");
        Ok(graph)
    }

    fn codec(&self, name: &str) -> Result<Codec> {
        Ok(self.load()?.codec(name)?)
    }
}

impl DecodeSettings {
    fn options(&self) -> DecodeOptions {
        DecodeOptions { disallow_extra_properties: self.disallow_extra_properties }
    }
}

impl InputSettings {
    fn load_documents(&self) -> Result<Vec<Document>> {
        let source_paths = resolve_file_path_patterns(&self.input)?;
        let selector = self.jq_expr.as_deref().map(JqSelector::compile).transpose()?;
        let mut documents = Vec::new();
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file {source_path_str}"))?;
            if self.ndjson {
                for (line_no, line) in source.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let label = format!("{source_path_str}:{}", line_no + 1);
                    let value = serde_json::from_str::<serde_json::Value>(line)
                        .with_context(|| format!("failed to parse NDJSON line ({label})"))?;
                    self.select(selector.as_ref(), label, value, &mut documents)?;
                }
            } else {
                let value = serde_json::from_str::<serde_json::Value>(&source)
                    .with_context(|| format!("failed to parse JSON source file ({source_path_str})"))?;
                self.select(selector.as_ref(), source_path_str, value, &mut documents)?;
            }
        }
        Ok(documents)
    }

    /// Apply `--json-pointer` then `--jq-expr` to one parsed document.
    fn select(
        &self,
        selector: Option<&JqSelector>,
        label: String,
        value: serde_json::Value,
        out: &mut Vec<Document>,
    ) -> Result<()> {
        let value = match self.json_pointer.as_deref() {
            None => value,
            Some(pointer) => match value.pointer(pointer) {
                Some(found) => found.clone(),
                None => {
                    tracing::warn!(document = %label, pointer, "json pointer matched nothing; skipped");
                    return Ok(());
                }
            },
        };
        match selector {
            None => out.push(Document { label, value }),
            Some(selector) => {
                let results = selector
                    .select(&value)
                    .with_context(|| format!("failed to apply jq expression to {label}"))?;
                let many = results.len() > 1;
                for (i, value) in results.into_iter().enumerate() {
                    let label = if many { format!("{label}#{i}") } else { label.clone() };
                    out.push(Document { label, value });
                }
            }
        }
        Ok(())
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// `Ok(false)` when some input failed to decode.
    pub fn run(&self) -> Result<bool> {
        match &self.cmd {
            Command::Check(target) => {
                let codec = target.graph_settings.codec(&target.codec)?;
                let options = target.decode_settings.options();
                let documents = target.input_settings.load_documents()?;

                let outcomes = documents
                    .par_iter()
                    .map(|doc| codec.safe_parse(&Value::from(&doc.value), &options))
                    .collect::<Vec<_>>();

                let mut failed = 0usize;
                for (doc, outcome) in documents.iter().zip(&outcomes) {
                    match outcome {
                        Ok(_) => {
                            if !target.quiet {
                                println!("{} {}", "✔".green(), doc.label);
                            }
                        }
                        Err(errors) => {
                            failed += 1;
                            println!("{} {}", "✘".red(), doc.label.bold());
                            println!("  {}", json_runtype::print_errors(errors));
                        }
                    }
                }
                let summary = format!("{} of {} documents valid", documents.len() - failed, documents.len());
                if failed == 0 {
                    eprintln!("{}", summary.green());
                } else {
                    eprintln!("{}", summary.red());
                }
                Ok(failed == 0)
            }
            Command::Parse(target) => {
                let codec = target.graph_settings.codec(&target.codec)?;
                let options = target.decode_settings.options();
                let documents = target.input_settings.load_documents()?;

                let mut lines = Vec::with_capacity(documents.len());
                let mut ok = true;
                for doc in &documents {
                    match codec.parse(&Value::from(&doc.value), &options) {
                        Ok(parsed) => lines.push(serde_json::to_string(&parsed)?),
                        Err(error) => {
                            ok = false;
                            eprintln!("{} {}: {error}", "✘".red(), doc.label);
                        }
                    }
                }
                write_output(target.out.as_deref(), &lines.join("\n"))?;
                Ok(ok)
            }
            Command::Schema(target) => {
                let codec = target.graph_settings.codec(&target.codec)?;
                let schema = codec.schema()?;
                write_output(target.out.as_deref(), &serde_json::to_string_pretty(&schema)?)?;
                Ok(true)
            }
            Command::Describe(target) => {
                let codec = target.graph_settings.codec(&target.codec)?;
                write_output(target.out.as_deref(), &codec.describe())?;
                Ok(true)
            }
            Command::Hash(target) => {
                let graph = target.graph_settings.load()?;
                let mut groups = IndexMap::<i32, Vec<String>>::new();
                for codec in graph.codecs() {
                    let hash = codec.hash();
                    if !target.duplicates_only {
                        println!("{hash:>12}  {}", codec.name());
                    }
                    groups.entry(hash).or_default().push(codec.name().to_string());
                }
                for (hash, names) in groups.iter().filter(|(_, names)| names.len() > 1) {
                    println!("{} {hash}: {}", "same shape".yellow(), names.join(", "));
                }
                Ok(true)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn write_output(out: Option<&Path>, text: &str) -> Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, text).with_context(|| format!("failed to write {}", out.display()))?;
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                // Pattern was explicitly a glob but matched nothing -> surface as an error
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
