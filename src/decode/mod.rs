//! The tolerant UCL parser: chunked input, nginx-style relaxed syntax,
//! macros, variable expansion and include merging.

pub(crate) mod chunk;
pub(crate) mod lexer;
pub(crate) mod macros;
mod state;
pub(crate) mod vars;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

pub use macros::{Fetcher, FsFetcher, MacroAction, MacroHandler};
pub use vars::VariableHandler;

use crate::decode::chunk::{Chunk, MAX_INCLUDE_DEPTH};
use crate::error::{Error, ErrorKind, Result};
use crate::value::{ObjectMap, UclStr, Value, ValueKind, MAX_PRIORITY};
use vars::Variables;

/// Parser behavior toggles.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParserFlags {
    /// Lowercase every key at insertion time.
    pub key_lowercase: bool,
    /// Let string values reference the input buffer instead of copying.
    pub zero_copy: bool,
    /// Disable time suffixes; `10s` becomes the string `"10s"`.
    pub no_time: bool,
}

impl ParserFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key_lowercase(mut self) -> Self {
        self.key_lowercase = true;
        self
    }

    pub fn with_zero_copy(mut self) -> Self {
        self.zero_copy = true;
        self
    }

    pub fn with_no_time(mut self) -> Self {
        self.no_time = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    Init,
    Key,
    Value,
    AfterValue,
    MacroName,
    MacroBody,
    Error,
}

/// A container being built; closed frames fold into their parent.
pub(crate) enum Frame {
    Object {
        map: ObjectMap,
        pending: Option<UclStr>,
    },
    Array(Vec<Value>),
}

impl Frame {
    pub(crate) fn object() -> Self {
        Frame::Object {
            map: ObjectMap::new(),
            pending: None,
        }
    }

    pub(crate) fn array() -> Self {
        Frame::Array(Vec::new())
    }

    pub(crate) fn into_value(self, priority: u8) -> Value {
        match self {
            Frame::Object { map, .. } => Value::object(map).with_priority(priority),
            Frame::Array(items) => Value::array(items).with_priority(priority),
        }
    }
}

/// Streaming UCL parser.
///
/// Feed input with [`add_chunk`](Parser::add_chunk) (possibly more than
/// once; later chunks merge into the same root by priority), then take
/// the document with [`get_object`](Parser::get_object). A parser that
/// reported an error stays in the error state.
pub struct Parser {
    flags: ParserFlags,
    state: State,
    prev_state: State,
    chunks: Vec<Chunk>,
    pub(crate) stack: Vec<Frame>,
    root: Option<Value>,
    frozen: Option<Arc<Value>>,
    error: Option<Error>,
    macros: HashMap<String, MacroHandler>,
    variables: Variables,
    fetcher: Box<dyn Fetcher>,
    generation: u32,
    pending_macro: Option<String>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self::with_flags(ParserFlags::default())
    }

    pub fn with_flags(flags: ParserFlags) -> Self {
        Parser {
            flags,
            state: State::Init,
            prev_state: State::Init,
            chunks: Vec::new(),
            stack: Vec::new(),
            root: None,
            frozen: None,
            error: None,
            macros: HashMap::new(),
            variables: Variables::default(),
            fetcher: Box::new(FsFetcher),
            generation: 0,
            pending_macro: None,
        }
    }

    /// Register a macro handler under `name` (without the leading dot).
    /// Registering `include` or `includes` overrides the built-ins.
    pub fn register_macro(&mut self, name: impl Into<String>, handler: MacroHandler) {
        self.macros.insert(name.into(), handler);
    }

    pub fn register_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.set(name, value);
    }

    pub fn set_variables_handler(&mut self, handler: VariableHandler) {
        self.variables.set_handler(handler);
    }

    pub fn set_fetcher(&mut self, fetcher: Box<dyn Fetcher>) {
        self.fetcher = fetcher;
    }

    /// Install the `FILENAME` and `CURDIR` variables for `path`. With
    /// `expand`, the path is canonicalized first; `CURDIR` falls back
    /// to the process working directory when the path has no parent.
    pub fn set_filevars(&mut self, path: &Path, expand: bool) -> Result<()> {
        let resolved = if expand {
            path.canonicalize().map_err(Error::from)?
        } else {
            path.to_path_buf()
        };
        let curdir = match resolved.parent() {
            Some(dir) if dir.as_os_str().is_empty() => std::env::current_dir()?,
            Some(dir) => dir.to_path_buf(),
            None => std::env::current_dir()?,
        };
        self.variables
            .set("FILENAME", resolved.to_string_lossy().into_owned());
        self.variables
            .set("CURDIR", curdir.to_string_lossy().into_owned());
        Ok(())
    }

    /// Feed a chunk of input at default priority.
    pub fn add_chunk(&mut self, data: &[u8]) -> Result<()> {
        self.add_chunk_priority(data, 0)
    }

    /// Feed a chunk of input; keys it contributes win over earlier
    /// lower-priority values and lose to higher ones.
    pub fn add_chunk_priority(&mut self, data: &[u8], priority: u8) -> Result<()> {
        if self.state == State::Error {
            return Err(Error::state("a parser is in an invalid state"));
        }
        if self.frozen.is_some() {
            return Err(Error::state(
                "the object was already retrieved from this parser",
            ));
        }
        let text = std::str::from_utf8(data).map_err(|_| Error {
            kind: ErrorKind::Syntax,
            message: "input is not valid UTF-8".to_string(),
            location: None,
        })?;

        if self.chunks.last().is_some_and(Chunk::is_exhausted) {
            self.chunks.clear();
        }

        // A completed root reopens so that this chunk merges into it.
        if self.stack.is_empty() {
            if let Some(root) = self.root.take() {
                match root.kind {
                    ValueKind::Object(map) => {
                        self.stack.push(Frame::Object { map, pending: None });
                        self.state = State::Key;
                    }
                    ValueKind::Array(items) => {
                        self.stack.push(Frame::Array(items));
                        self.state = State::Value;
                    }
                    kind => {
                        self.root = Some(Value { kind, priority: root.priority });
                        return Err(Error::state("root value cannot accept more input"));
                    }
                }
            }
        }

        self.generation += 1;
        self.chunks.push(Chunk::new(
            Arc::from(text),
            priority.min(MAX_PRIORITY),
            self.generation,
        ));
        match self.run() {
            Ok(()) => Ok(()),
            Err(err) => {
                self.state = State::Error;
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    pub fn add_string(&mut self, data: &str) -> Result<()> {
        self.add_chunk(data.as_bytes())
    }

    /// Read `path`, set the file variables and parse its content.
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        self.set_filevars(path, true)?;
        self.add_chunk(&data)
    }

    /// Read the remaining content of an open descriptor and parse it.
    #[cfg(unix)]
    pub fn add_fd(&mut self, fd: std::os::fd::BorrowedFd<'_>) -> Result<()> {
        use std::io::Read;
        let mut file = std::fs::File::from(fd.try_clone_to_owned()?);
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        self.add_chunk(&data)
    }

    /// The error that moved the parser into the error state, if any.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Freeze the parsed tree and return it. Every call returns another
    /// reference to the same root; the first call folds any containers
    /// still open at end of input.
    pub fn get_object(&mut self) -> Result<Arc<Value>> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        if let Some(root) = &self.frozen {
            return Ok(Arc::clone(root));
        }

        let mut acc: Option<Value> = None;
        while let Some(mut frame) = self.stack.pop() {
            if let Some(child) = acc.take() {
                match &mut frame {
                    Frame::Object { map, pending } => match pending.take() {
                        Some(key) => map.insert_parsed(key, child, self.generation),
                        None => {
                            return Err(Error::internal("container closed without a key"))
                        }
                    },
                    Frame::Array(items) => items.push(child),
                }
            }
            if let Frame::Object { pending: Some(_), .. } = &frame {
                return Err(Error {
                    kind: ErrorKind::Syntax,
                    message: "unfinished key".to_string(),
                    location: None,
                });
            }
            acc = Some(frame.into_value(0));
        }
        let root = match self.root.take().or(acc) {
            Some(root) => root,
            None => return Err(Error::state("no object has been parsed")),
        };
        let root = Arc::new(root);
        self.frozen = Some(Arc::clone(&root));
        Ok(root)
    }

    /// Splice a macro-produced document in as the next input to parse.
    pub(crate) fn push_include_chunk(&mut self, data: String, priority: u8) -> Result<()> {
        if self.chunks.len() >= MAX_INCLUDE_DEPTH {
            return Err(Error::recursion(format!(
                "maximum include nesting limit is reached: {MAX_INCLUDE_DEPTH}"
            )));
        }
        self.generation += 1;
        self.chunks.push(Chunk::new(
            Arc::from(data.as_str()),
            priority.min(MAX_PRIORITY),
            self.generation,
        ));
        Ok(())
    }
}
