//! Multi-format emitters for the document model.

mod emitter;
mod funcs;
mod stream;

use std::fmt;

pub use funcs::{EmitFuncs, WriterFuncs};
pub use stream::StreamEmitter;

use crate::error::Result;
use crate::value::Value;
use emitter::Emitter;

/// The output formats the emitter family produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitKind {
    /// Pretty-printed canonical JSON.
    Json,
    /// JSON without insignificant whitespace.
    JsonCompact,
    /// The nginx-like configuration syntax; duplicate keys round-trip
    /// as repeated key-value lines.
    Config,
    /// YAML-flavored output with bare scalars where possible.
    Yaml,
}

/// Serialize a value tree into a string.
pub fn emit(value: &Value, kind: EmitKind) -> String {
    let mut buf: Vec<u8> = Vec::new();
    emit_full(value, kind, &mut buf).expect("buffer sinks do not fail");
    String::from_utf8(buf).expect("emitter output must be valid UTF-8")
}

/// Serialize a value tree through a caller-supplied output table. A
/// sink failure aborts the emit and surfaces the sink's error.
pub fn emit_full(value: &Value, kind: EmitKind, funcs: &mut dyn EmitFuncs) -> Result<()> {
    Emitter::new(kind, funcs).elt(value, None, true, true)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&emit(self, EmitKind::JsonCompact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ObjectMap;

    fn sample() -> Value {
        let mut map = ObjectMap::new();
        map.insert("key", Value::from("value"));
        Value::object(map)
    }

    #[rstest::rstest]
    fn test_json_pretty_shape() {
        assert_eq!(emit(&sample(), EmitKind::Json), "{\n    \"key\": \"value\"\n}");
    }

    #[rstest::rstest]
    fn test_json_compact_shape() {
        assert_eq!(emit(&sample(), EmitKind::JsonCompact), "{\"key\":\"value\"}");
    }

    #[rstest::rstest]
    fn test_config_shape() {
        assert_eq!(emit(&sample(), EmitKind::Config), "key = \"value\";\n");
    }

    #[rstest::rstest]
    fn test_yaml_shape() {
        assert_eq!(emit(&sample(), EmitKind::Yaml), "key: value");
    }

    #[rstest::rstest]
    fn test_display_is_compact_json() {
        assert_eq!(sample().to_string(), "{\"key\":\"value\"}");
    }

    #[rstest::rstest]
    fn test_nested_config_blocks() {
        let mut inner = ObjectMap::new();
        inner.insert("port", Value::from(80));
        let mut outer = ObjectMap::new();
        outer.insert("server", Value::object(inner));
        let out = emit(&Value::object(outer), EmitKind::Config);
        assert_eq!(out, "server {\n    port = 80;\n}\n");
    }

    #[rstest::rstest]
    fn test_duplicate_keys_per_format() {
        let mut map = ObjectMap::new();
        map.append("a", Value::from(1));
        map.append("a", Value::from(2));
        map.append("a", Value::from(3));
        let value = Value::object(map);
        assert_eq!(
            emit(&value, EmitKind::Config),
            "a = 1;\na = 2;\na = 3;\n"
        );
        assert_eq!(emit(&value, EmitKind::JsonCompact), "{\"a\":[1,2,3]}");
    }

    #[rstest::rstest]
    fn test_empty_containers() {
        let mut map = ObjectMap::new();
        map.insert("arr", Value::array(Vec::new()));
        map.insert("obj", Value::object(ObjectMap::new()));
        assert_eq!(
            emit(&Value::object(map), EmitKind::JsonCompact),
            "{\"arr\":[],\"obj\":{}}"
        );
    }
}
