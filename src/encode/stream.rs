//! Streaming emitter: serialize a document top-down without holding the
//! whole tree, one container or subtree at a time.

use crate::encode::emitter::Emitter;
use crate::encode::funcs::EmitFuncs;
use crate::encode::EmitKind;
use crate::error::{Error, Result};
use crate::value::Value;

struct StreamFrame {
    array: bool,
    braced: bool,
    count: usize,
}

/// Incremental emitter with an internal depth stack. Every
/// `start_container` must be matched by one `end_container`;
/// [`finish`](StreamEmitter::finish) closes whatever is still open.
pub struct StreamEmitter<'a> {
    kind: EmitKind,
    funcs: &'a mut dyn EmitFuncs,
    stack: Vec<StreamFrame>,
}

impl<'a> StreamEmitter<'a> {
    pub fn new(kind: EmitKind, funcs: &'a mut dyn EmitFuncs) -> Self {
        Self {
            kind,
            funcs,
            stack: Vec::new(),
        }
    }

    fn indent(&self) -> usize {
        self.stack.iter().filter(|f| f.braced).count()
    }

    fn compact(&self) -> bool {
        self.kind == EmitKind::JsonCompact
    }

    fn begin_element(&mut self) -> Result<()> {
        let indent = self.indent();
        let Some(frame) = self.stack.last() else { return Ok(()) };
        let mut emitter = Emitter::new(self.kind, self.funcs);
        emitter.indent = indent;
        if self.kind != EmitKind::Config && frame.count > 0 {
            emitter.element_separator()?;
        }
        emitter.add_tabs()
    }

    /// Open a nested container. `key` is required inside objects and
    /// rejected inside arrays; the outermost container takes no key.
    pub fn start_container(&mut self, key: Option<&str>, array: bool) -> Result<()> {
        self.check_key(key)?;
        let is_top = self.stack.is_empty();
        if !is_top {
            self.begin_element()?;
            if let Some(key) = key {
                let indent = self.indent();
                let mut emitter = Emitter::new(self.kind, self.funcs);
                emitter.indent = indent;
                emitter.write_container_key(key)?;
            }
        }
        let braced = !(is_top && matches!(self.kind, EmitKind::Config | EmitKind::Yaml));
        if braced {
            let opener = if array { b'[' } else { b'{' };
            self.funcs.append_char(opener, 1)?;
            if !self.compact() {
                self.funcs.append_char(b'\n', 1)?;
            }
        }
        if let Some(parent) = self.stack.last_mut() {
            parent.count += 1;
        }
        self.stack.push(StreamFrame {
            array,
            braced,
            count: 0,
        });
        Ok(())
    }

    /// Emit a complete value (with its whole subtree) into the open
    /// container.
    pub fn add_object(&mut self, key: Option<&str>, value: &Value) -> Result<()> {
        self.check_key(key)?;
        if self.stack.is_empty() {
            return Err(Error::state("no container has been started"));
        }
        let indent = self.indent();
        let first = self.stack.last().map(|f| f.count == 0).unwrap_or(true);
        let mut emitter = Emitter::new(self.kind, self.funcs);
        emitter.indent = indent;
        emitter.elt(value, key, first, false)?;
        if let Some(frame) = self.stack.last_mut() {
            frame.count += 1;
        }
        Ok(())
    }

    pub fn end_container(&mut self) -> Result<()> {
        let Some(frame) = self.stack.pop() else {
            return Err(Error::state("no container is open"));
        };
        if frame.braced {
            let closer = if frame.array { b']' } else { b'}' };
            if self.compact() {
                self.funcs.append_char(closer, 1)?;
            } else {
                if self.kind != EmitKind::Config && frame.count > 0 {
                    self.funcs.append_char(b'\n', 1)?;
                }
                let indent = self.indent();
                if indent > 0 {
                    self.funcs.append_char(b' ', indent * 4)?;
                }
                self.funcs.append_char(closer, 1)?;
            }
            if self.kind == EmitKind::Config && !self.stack.is_empty() {
                self.funcs.append_char(b'\n', 1)?;
            }
        }
        Ok(())
    }

    /// Close every container still open.
    pub fn finish(&mut self) -> Result<()> {
        while !self.stack.is_empty() {
            self.end_container()?;
        }
        Ok(())
    }

    fn check_key(&self, key: Option<&str>) -> Result<()> {
        match self.stack.last() {
            Some(frame) if frame.array && key.is_some() => {
                Err(Error::state("array elements take no key"))
            }
            Some(frame) if !frame.array && key.is_none() => {
                Err(Error::state("object entries require a key"))
            }
            _ => Ok(()),
        }
    }
}
