//! Shared emitter traversal with per-format divergence.

use crate::chartable::{self, JSON_UNSAFE, KEY, KEY_START, WHITESPACE};
use crate::encode::funcs::EmitFuncs;
use crate::encode::EmitKind;
use crate::error::Result;
use crate::value::{Value, ValueKind};

pub(crate) struct Emitter<'a> {
    kind: EmitKind,
    funcs: &'a mut dyn EmitFuncs,
    pub(crate) indent: usize,
}

impl<'a> Emitter<'a> {
    pub fn new(kind: EmitKind, funcs: &'a mut dyn EmitFuncs) -> Self {
        Self {
            kind,
            funcs,
            indent: 0,
        }
    }

    fn compact(&self) -> bool {
        self.kind == EmitKind::JsonCompact
    }

    pub(crate) fn add_tabs(&mut self) -> Result<()> {
        if !self.compact() && self.indent > 0 {
            self.funcs.append_char(b' ', self.indent * 4)?;
        }
        Ok(())
    }

    /// Separator written before every element but the first.
    pub(crate) fn element_separator(&mut self) -> Result<()> {
        match self.kind {
            EmitKind::Json => self.funcs.append_bytes(b",\n"),
            EmitKind::JsonCompact => self.funcs.append_char(b',', 1),
            EmitKind::Yaml => self.funcs.append_char(b'\n', 1),
            EmitKind::Config => Ok(()),
        }
    }

    /// Emit one element: optional key, payload, and the config-format
    /// trailing terminator.
    pub(crate) fn elt(
        &mut self,
        value: &Value,
        key: Option<&str>,
        first: bool,
        is_top: bool,
    ) -> Result<()> {
        if self.kind != EmitKind::Config && !first {
            self.element_separator()?;
        }
        self.add_tabs()?;

        if let Some(key) = key {
            self.write_key(key, value)?;
        }

        let is_container = matches!(value.kind(), ValueKind::Object(_) | ValueKind::Array(_));
        match value.kind() {
            ValueKind::Null => self.funcs.append_bytes(b"null")?,
            ValueKind::Bool(true) => self.funcs.append_bytes(b"true")?,
            ValueKind::Bool(false) => self.funcs.append_bytes(b"false")?,
            ValueKind::Int(v) => self.funcs.append_int(*v)?,
            ValueKind::Float(v) | ValueKind::Time(v) => self.funcs.append_double(*v)?,
            ValueKind::String(s) => self.write_string(s.as_str())?,
            ValueKind::Userdata(u) => self.write_string(&u.emit())?,
            ValueKind::Object(_) => self.object(value, is_top)?,
            ValueKind::Array(items) => self.array(items)?,
        }

        if self.kind == EmitKind::Config && !is_top {
            if !is_container {
                if key.is_some() {
                    self.funcs.append_bytes(b";\n")?;
                } else {
                    self.funcs.append_bytes(b",\n")?;
                }
            } else {
                self.funcs.append_char(b'\n', 1)?;
            }
        }
        Ok(())
    }

    /// Key prefix for a container element, as used by the streaming
    /// emitter when it opens a named container.
    pub(crate) fn write_container_key(&mut self, key: &str) -> Result<()> {
        if self.kind == EmitKind::Config {
            if key_needs_escape(key) {
                self.write_json_string(key)?;
            } else {
                self.funcs.append_bytes(key.as_bytes())?;
            }
            self.funcs.append_char(b' ', 1)
        } else {
            self.write_string(key)?;
            if self.compact() {
                self.funcs.append_char(b':', 1)
            } else {
                self.funcs.append_bytes(b": ")
            }
        }
    }

    fn write_key(&mut self, key: &str, value: &Value) -> Result<()> {
        let is_container = matches!(value.kind(), ValueKind::Object(_) | ValueKind::Array(_));
        if self.kind == EmitKind::Config {
            if key_needs_escape(key) {
                self.write_json_string(key)?;
            } else {
                self.funcs.append_bytes(key.as_bytes())?;
            }
            if is_container {
                self.funcs.append_char(b' ', 1)?;
            } else {
                self.funcs.append_bytes(b" = ")?;
            }
        } else {
            self.write_string(key)?;
            if self.compact() {
                self.funcs.append_char(b':', 1)?;
            } else {
                self.funcs.append_bytes(b": ")?;
            }
        }
        Ok(())
    }

    /// YAML leaves safe scalars bare; every other format always quotes.
    fn write_string(&mut self, s: &str) -> Result<()> {
        if self.kind == EmitKind::Yaml && !yaml_needs_quotes(s) {
            self.funcs.append_bytes(s.as_bytes())
        } else {
            self.write_json_string(s)
        }
    }

    fn write_json_string(&mut self, s: &str) -> Result<()> {
        self.funcs.append_char(b'"', 1)?;
        let bytes = s.as_bytes();
        let mut run_start = 0;
        for (i, &b) in bytes.iter().enumerate() {
            if !chartable::test(b, JSON_UNSAFE) {
                continue;
            }
            if i > run_start {
                self.funcs.append_bytes(&bytes[run_start..i])?;
            }
            match b {
                b'\n' => self.funcs.append_bytes(b"\\n")?,
                b'\r' => self.funcs.append_bytes(b"\\r")?,
                0x08 => self.funcs.append_bytes(b"\\b")?,
                b'\t' => self.funcs.append_bytes(b"\\t")?,
                0x0c => self.funcs.append_bytes(b"\\f")?,
                b'\\' => self.funcs.append_bytes(b"\\\\")?,
                b'"' => self.funcs.append_bytes(b"\\\"")?,
                other => {
                    let hex = format!("\\u{:04x}", other);
                    self.funcs.append_bytes(hex.as_bytes())?;
                }
            }
            run_start = i + 1;
        }
        if bytes.len() > run_start {
            self.funcs.append_bytes(&bytes[run_start..])?;
        }
        self.funcs.append_char(b'"', 1)
    }

    fn object(&mut self, value: &Value, is_top: bool) -> Result<()> {
        let map = value.as_object().expect("object tag carries a map");
        let braces = !(is_top && matches!(self.kind, EmitKind::Config | EmitKind::Yaml));

        if map.is_empty() {
            return if braces {
                self.funcs.append_bytes(b"{}")
            } else {
                Ok(())
            };
        }

        if braces {
            if self.compact() {
                self.funcs.append_char(b'{', 1)?;
            } else {
                self.funcs.append_bytes(b"{\n")?;
            }
            self.indent += 1;
        }

        let mut first = true;
        for (key, chain) in map.iter_chains() {
            if self.kind == EmitKind::Config {
                // Duplicate keys round-trip as repeated key-value lines.
                for item in chain {
                    self.elt(item, Some(key), first, false)?;
                    first = false;
                }
            } else if chain.len() > 1 {
                // An implicit array surfaces as a real array.
                if !first {
                    self.element_separator()?;
                }
                self.add_tabs()?;
                self.write_string(key)?;
                if self.compact() {
                    self.funcs.append_char(b':', 1)?;
                } else {
                    self.funcs.append_bytes(b": ")?;
                }
                self.array(chain)?;
                first = false;
            } else {
                self.elt(&chain[0], Some(key), first, false)?;
                first = false;
            }
        }

        if braces {
            self.indent -= 1;
            if self.compact() {
                self.funcs.append_char(b'}', 1)?;
            } else {
                if self.kind != EmitKind::Config {
                    self.funcs.append_char(b'\n', 1)?;
                }
                self.add_tabs()?;
                self.funcs.append_char(b'}', 1)?;
            }
        }
        Ok(())
    }

    fn array(&mut self, items: &[Value]) -> Result<()> {
        if items.is_empty() {
            return self.funcs.append_bytes(b"[]");
        }
        if self.compact() {
            self.funcs.append_char(b'[', 1)?;
        } else {
            self.funcs.append_bytes(b"[\n")?;
        }
        self.indent += 1;
        let mut first = true;
        for item in items {
            self.elt(item, None, first, false)?;
            first = false;
        }
        self.indent -= 1;
        if self.compact() {
            self.funcs.append_char(b']', 1)?;
        } else {
            if self.kind != EmitKind::Config {
                self.funcs.append_char(b'\n', 1)?;
            }
            self.add_tabs()?;
            self.funcs.append_char(b']', 1)?;
        }
        Ok(())
    }
}

/// A config key goes out bare unless it has bytes outside the bare-key
/// character set.
pub(crate) fn key_needs_escape(key: &str) -> bool {
    let bytes = key.as_bytes();
    match bytes.first() {
        None => true,
        Some(&b) if !chartable::test(b, KEY_START) => true,
        Some(_) => bytes[1..].iter().any(|&b| !chartable::test(b, KEY)),
    }
}

pub(crate) fn yaml_needs_quotes(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.is_empty() {
        return true;
    }
    if chartable::test(bytes[0], WHITESPACE) || chartable::test(bytes[bytes.len() - 1], WHITESPACE)
    {
        return true;
    }
    bytes.iter().any(|&b| chartable::test(b, JSON_UNSAFE))
}
