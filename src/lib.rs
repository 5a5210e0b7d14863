//! Runtime codecs for a graph of runtypes produced by an ahead-of-time
//! type-to-schema compiler.
//!
//! Load a [`Graph`], take a [`Codec`] for an exported name, then validate,
//! parse, report, schematize, describe or hash.
//!
//! ```no_run
//! use json_runtype::{DecodeOptions, Graph, Value};
//!
//! let graph = Graph::from_json_str(r#"{"definitions": {"Name": {"kind": "typeof", "name": "string"}}}"#)?;
//! let codec = graph.codec("Name")?;
//! let out = codec.parse(&Value::from("ada"), &DecodeOptions::default())?;
//! # Ok::<(), json_runtype::CodecError>(())
//! ```
pub mod codec;
pub mod context;
pub mod error;
pub mod formats;
pub mod graph;
pub mod hash;
pub mod merge;
pub mod path_de;
pub mod printer;
pub mod runtype;
pub mod value;

pub use codec::{Codec, MAX_DECODE_ERRORS, SafeParseOutcome};
pub use context::DecodeOptions;
pub use error::{CodecError, DecodeError, Result};
pub use formats::{
    register_number_formatter, register_string_formatter, register_string_regex_formatter,
};
pub use graph::{Graph, GraphBuilder, GraphDocument, RuntypeDef};
pub use merge::deep_merge;
pub use printer::print_errors;
pub use runtype::{Runtype, RuntypeOps};
pub use value::Value;
