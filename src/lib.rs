//! Parser, document model, emitters and JSON Schema validator for UCL,
//! a permissive configuration language that is a strict superset of
//! JSON with an nginx-like relaxed syntax on top.
//!
//! # Examples
//!
//! Parse a relaxed config and emit it as JSON:
//!
//! ```rust
//! let doc = ucl::parse("section {\n    flag = on;\n    timeout = 10min;\n}")?;
//! assert_eq!(
//!     doc.lookup_path("section.flag").and_then(|v| v.as_bool()),
//!     Some(true)
//! );
//! assert_eq!(
//!     ucl::emit(&doc, ucl::EmitKind::JsonCompact),
//!     r#"{"section":{"flag":true,"timeout":600.0}}"#
//! );
//! # Ok::<(), ucl::Error>(())
//! ```
//!
//! Streaming input with the parser handle:
//!
//! ```rust
//! use ucl::Parser;
//!
//! let mut parser = Parser::new();
//! parser.add_string("key = ")?;
//! parser.add_string("\"value\";")?;
//! let doc = parser.get_object()?;
//! assert_eq!(doc.lookup_path("key").and_then(|v| v.as_str()), Some("value"));
//! # Ok::<(), ucl::Error>(())
//! ```
//!
//! Validate against a JSON Schema (draft v4):
//!
//! ```rust
//! let schema = ucl::parse(r#"{"type": "object", "required": ["port"]}"#)?;
//! let good = ucl::parse("port = 80;")?;
//! let bad = ucl::parse("host = example.com;")?;
//! assert!(ucl::validate(&schema, &good).is_ok());
//! assert!(ucl::validate(&schema, &bad).is_err());
//! # Ok::<(), ucl::Error>(())
//! ```

mod chartable;
pub mod decode;
pub mod encode;
pub mod error;
pub mod schema;
pub mod value;

use std::sync::Arc;

pub use decode::{
    Fetcher, FsFetcher, MacroAction, MacroHandler, Parser, ParserFlags, VariableHandler,
};
pub use encode::{emit, emit_full, EmitFuncs, EmitKind, StreamEmitter, WriterFuncs};
pub use error::{Error, ErrorKind, Location, Result};
pub use schema::{validate, SchemaError, SchemaErrorCode};
pub use value::{ObjectMap, UclStr, Userdata, Value, ValueKind};

/// Parse a complete document in one call.
pub fn parse(input: &str) -> Result<Arc<Value>> {
    parse_with_flags(input, ParserFlags::default())
}

pub fn parse_with_flags(input: &str, flags: ParserFlags) -> Result<Arc<Value>> {
    let mut parser = Parser::with_flags(flags);
    parser.add_string(input)?;
    parser.get_object()
}
