//! The parser state machine: object/array/key/value/after-value/macro
//! states driven over the chunk stack.

use std::sync::Arc;

use crate::chartable::{
    self, DIGIT_START, KEY, KEY_SEP, VALUE_END, VALUE_STR, WHITESPACE, WHITESPACE_UNSAFE,
};
use crate::decode::chunk::Chunk;
use crate::decode::lexer;
use crate::decode::macros::{self, MacroAction};
use crate::decode::{Frame, Parser, State};
use crate::error::{Error, Result};
use crate::value::{UclStr, Value};

impl Parser {
    fn top(&mut self) -> &mut Chunk {
        self.chunks.last_mut().expect("chunk stack is not empty")
    }

    /// Drive the machine until all input is consumed or more is needed.
    pub(crate) fn run(&mut self) -> Result<()> {
        loop {
            while self.chunks.len() > 1
                && self.chunks.last().is_some_and(Chunk::is_exhausted)
            {
                self.chunks.pop();
            }
            match self.chunks.last() {
                Some(chunk) if !chunk.is_exhausted() => {}
                _ => return Ok(()),
            }
            match self.state {
                State::Init => self.state_init()?,
                State::Key => self.state_key()?,
                State::Value => self.state_value()?,
                State::AfterValue => self.state_after_value()?,
                State::MacroName => self.state_macro_name()?,
                State::MacroBody => self.state_macro_body()?,
                State::Error => {
                    return Err(Error::state("a parser is in an invalid state"));
                }
            }
            if self.stack.is_empty() && self.root.is_some() {
                // The top container closed; anything after it is ignored.
                self.chunks.clear();
                return Ok(());
            }
        }
    }

    fn state_init(&mut self) -> Result<()> {
        let first = {
            let chunk = self.top();
            lexer::skip_trivia(chunk)?;
            chunk.peek()
        };
        let Some(first) = first else { return Ok(()) };
        match first {
            b'[' => {
                self.top().advance();
                self.stack.push(Frame::array());
                self.state = State::Value;
            }
            b'{' => {
                self.top().advance();
                self.stack.push(Frame::object());
                self.state = State::Key;
            }
            _ => {
                self.stack.push(Frame::object());
                self.state = State::Key;
            }
        }
        Ok(())
    }

    fn state_key(&mut self) -> Result<()> {
        {
            let chunk = self.top();
            lexer::skip_trivia(chunk)?;
        }
        let Some(first) = self.top().peek() else { return Ok(()) };
        if first == b'}' {
            self.state = State::AfterValue;
            return Ok(());
        }
        if first == b'.' {
            self.top().advance();
            self.prev_state = State::Key;
            self.state = State::MacroName;
            return Ok(());
        }

        let (key_src, start, end, need_unescape) = {
            let chunk = self.top();
            if first == b'"' {
                chunk.advance();
                let (start, end, need_unescape) = lexer::lex_quoted_string(chunk)?;
                (chunk.src().clone(), start, end, need_unescape)
            } else if chartable::test(first, chartable::KEY_START) {
                let start = chunk.pos();
                chunk.advance();
                loop {
                    match chunk.peek() {
                        Some(c) if chartable::test(c, KEY) => chunk.advance(),
                        Some(c) if chartable::test(c, WHITESPACE_UNSAFE | KEY_SEP) => break,
                        Some(b'{') | Some(b'[') => break,
                        Some(c) if chartable::is_comment_start(c, chunk.peek_at(1)) => break,
                        Some(_) => {
                            return Err(Error::syntax(
                                "invalid character in a key",
                                chunk.location(),
                            ))
                        }
                        None => break,
                    }
                }
                (chunk.src().clone(), start, chunk.pos(), false)
            } else {
                return Err(Error::syntax(
                    "key must begin with a letter",
                    chunk.location(),
                ));
            }
        };

        // Consume the key separator: whitespace plus at most one ':' or '='.
        {
            let chunk = self.top();
            let mut got_sep = false;
            loop {
                match chunk.peek() {
                    Some(c) if chartable::test(c, WHITESPACE) => chunk.advance(),
                    Some(b'=') | Some(b':') if !got_sep => {
                        got_sep = true;
                        chunk.advance();
                    }
                    Some(c @ (b'=' | b':')) => {
                        return Err(Error::syntax(
                            format!("unexpected '{}' character", c as char),
                            chunk.location(),
                        ))
                    }
                    Some(c) if chartable::is_comment_start(c, chunk.peek_at(1)) => {
                        lexer::skip_comments(chunk)?;
                    }
                    _ => break,
                }
            }
        }

        let key = if need_unescape || self.flags.key_lowercase {
            let mut s = if need_unescape {
                lexer::unescape_json(&key_src[start..end])
            } else {
                key_src[start..end].to_string()
            };
            if self.flags.key_lowercase {
                s.make_ascii_lowercase();
            }
            UclStr::from(s)
        } else if self.flags.zero_copy {
            UclStr::shared(key_src, start, end)
        } else {
            UclStr::owned(&key_src[start..end])
        };

        match self.stack.last_mut() {
            Some(Frame::Object { pending, .. }) => *pending = Some(key),
            _ => return Err(Error::internal("key parsed outside of an object")),
        }
        self.state = State::Value;
        Ok(())
    }

    fn state_value(&mut self) -> Result<()> {
        {
            let chunk = self.top();
            lexer::skip_trivia(chunk)?;
        }
        let Some(first) = self.top().peek() else { return Ok(()) };

        // A closer right after a separator: the trailing separator rule.
        if first == b']' && matches!(self.stack.last(), Some(Frame::Array(_))) {
            self.state = State::AfterValue;
            return Ok(());
        }

        match first {
            b if chartable::test(b, VALUE_STR) => {
                let (src, start, end, need_unescape) = {
                    let chunk = self.top();
                    chunk.advance();
                    let (start, end, need_unescape) = lexer::lex_quoted_string(chunk)?;
                    (chunk.src().clone(), start, end, need_unescape)
                };
                let value = self.make_string(src, start, end, need_unescape);
                self.attach(value)?;
                self.state = State::AfterValue;
            }
            b'{' => {
                self.top().advance();
                self.stack.push(Frame::object());
                self.state = State::Key;
            }
            b'[' => {
                self.top().advance();
                self.stack.push(Frame::array());
                self.state = State::Value;
            }
            _ => {
                if first == b'<' {
                    let heredoc = {
                        let chunk = self.top();
                        lexer::lex_heredoc(chunk)?
                    };
                    if let Some((start, end)) = heredoc {
                        let src = self.top().src().clone();
                        let value = if self.flags.zero_copy {
                            Value::string(UclStr::shared(src, start, end))
                        } else {
                            Value::string(UclStr::owned(&src[start..end]))
                        };
                        self.attach(value)?;
                        self.state = State::AfterValue;
                        return Ok(());
                    }
                }
                if chartable::test(first, DIGIT_START) {
                    let no_time = self.flags.no_time;
                    let number = {
                        let chunk = self.top();
                        lexer::lex_number(chunk, no_time)?
                    };
                    if let Some(kind) = number {
                        self.attach(kind.into())?;
                        self.state = State::AfterValue;
                        return Ok(());
                    }
                }
                let (src, start, end) = {
                    let chunk = self.top();
                    let (start, end) = lexer::lex_unquoted(chunk);
                    (chunk.src().clone(), start, end)
                };
                if start == end {
                    return Err(Error::syntax(
                        "string value must not be empty",
                        self.top().location(),
                    ));
                }
                let value = if &src[start..end] == "null" {
                    Value::null()
                } else {
                    match lexer::recognize_boolean(&src[start..end]) {
                        Some(flag) => Value::from(flag),
                        None => self.make_string(src, start, end, false),
                    }
                };
                self.attach(value)?;
                self.state = State::AfterValue;
            }
        }
        Ok(())
    }

    fn state_after_value(&mut self) -> Result<()> {
        let mut got_sep = false;
        loop {
            {
                let chunk = self.top();
                lexer::skip_whitespace(chunk);
            }
            let Some(first) = self.top().peek() else {
                // The chunk boundary closes the element like a separator.
                self.state = match self.stack.last() {
                    Some(Frame::Array(_)) => State::Value,
                    _ => State::Key,
                };
                return Ok(());
            };
            if lexer::at_comment(self.top()) {
                let chunk = self.top();
                lexer::skip_comments(chunk)?;
                got_sep = true;
                continue;
            }
            match first {
                b',' | b';' | b'\n' | b'\r' => {
                    self.top().advance();
                    got_sep = true;
                }
                b'}' | b']' => {
                    self.close_container(first)?;
                    if self.stack.is_empty() {
                        return Ok(());
                    }
                    got_sep = true;
                }
                _ => {
                    if !got_sep {
                        return Err(Error::syntax(
                            "delimiter is missing",
                            self.top().location(),
                        ));
                    }
                    self.state = match self.stack.last() {
                        Some(Frame::Array(_)) => State::Value,
                        _ => State::Key,
                    };
                    return Ok(());
                }
            }
        }
    }

    fn close_container(&mut self, closer: u8) -> Result<()> {
        let matches_top = match (self.stack.last(), closer) {
            (Some(Frame::Object { .. }), b'}') | (Some(Frame::Array(_)), b']') => true,
            (Some(_), _) => false,
            (None, _) => {
                return Err(Error::syntax(
                    format!("unexpected '{}' detected", closer as char),
                    self.top().location(),
                ))
            }
        };
        if !matches_top {
            return Err(Error::syntax(
                "unexpected terminating symbol detected",
                self.top().location(),
            ));
        }
        let frame = self.stack.pop().expect("stack is not empty");
        if let Frame::Object { pending: Some(_), .. } = &frame {
            return Err(Error::syntax("unfinished key", self.top().location()));
        }
        self.top().advance();
        let priority = self.top().priority();
        let value = frame.into_value(priority);
        if self.stack.is_empty() {
            self.root = Some(value);
        } else {
            self.attach(value)?;
        }
        Ok(())
    }

    /// Place a finished value into the open container, applying the
    /// chunk priority and duplicate-key semantics.
    fn attach(&mut self, value: Value) -> Result<()> {
        let (priority, generation) = {
            let chunk = self.chunks.last().expect("chunk stack is not empty");
            (chunk.priority(), chunk.generation())
        };
        let value = value.with_priority(priority);
        match self.stack.last_mut() {
            Some(Frame::Array(items)) => items.push(value),
            Some(Frame::Object { map, pending }) => match pending.take() {
                Some(key) => map.insert_parsed(key, value, generation),
                None => return Err(Error::internal("value parsed without a key")),
            },
            None => return Err(Error::internal("no container is open")),
        }
        Ok(())
    }

    fn make_string(
        &mut self,
        src: Arc<str>,
        start: usize,
        end: usize,
        need_unescape: bool,
    ) -> Value {
        let unescaped = if need_unescape {
            Some(lexer::unescape_json(&src[start..end]))
        } else {
            None
        };
        let base = unescaped.as_deref().unwrap_or(&src[start..end]);
        match (self.variables.expand(base), unescaped) {
            (Some(expanded), _) => Value::string(expanded),
            (None, Some(owned)) => Value::string(owned),
            (None, None) if self.flags.zero_copy => {
                Value::string(UclStr::shared(src, start, end))
            }
            (None, None) => Value::string(UclStr::owned(&src[start..end])),
        }
    }

    fn state_macro_name(&mut self) -> Result<()> {
        let (name, location) = {
            let chunk = self.top();
            let start = chunk.pos();
            while let Some(b) = chunk.peek() {
                if chartable::test(b, WHITESPACE_UNSAFE) {
                    break;
                }
                chunk.advance();
            }
            (chunk.slice(start, chunk.pos()).to_string(), chunk.location())
        };
        if name.is_empty() {
            return Err(Error::macro_error("macro name is empty", location));
        }
        let known = self.macros.contains_key(&name) || matches!(name.as_str(), "include" | "includes");
        if !known {
            return Err(Error::macro_error(format!("unknown macro: .{name}"), location));
        }
        {
            let chunk = self.top();
            lexer::skip_trivia(chunk)?;
        }
        self.pending_macro = Some(name);
        self.state = State::MacroBody;
        Ok(())
    }

    fn state_macro_body(&mut self) -> Result<()> {
        let Some(first) = self.top().peek() else { return Ok(()) };
        let body: String = match first {
            b'"' => {
                let chunk = self.top();
                chunk.advance();
                let (start, end, _) = lexer::lex_quoted_string(chunk)?;
                chunk.slice(start, end).to_string()
            }
            b'{' => {
                let chunk = self.top();
                chunk.advance();
                lexer::skip_whitespace_unsafe(chunk);
                let start = chunk.pos();
                while let Some(b) = chunk.peek() {
                    if b == b'}' {
                        break;
                    }
                    chunk.advance();
                }
                if chunk.peek().is_none() {
                    return Err(Error::syntax("unterminated macro body", chunk.location()));
                }
                let body = chunk.slice(start, chunk.pos()).to_string();
                chunk.advance();
                body
            }
            _ => {
                let chunk = self.top();
                let start = chunk.pos();
                while let Some(b) = chunk.peek() {
                    if chartable::test(b, VALUE_END) {
                        break;
                    }
                    chunk.advance();
                }
                chunk.slice(start, chunk.pos()).to_string()
            }
        };
        {
            let chunk = self.top();
            while let Some(b) = chunk.peek() {
                if chartable::test(b, WHITESPACE_UNSAFE) || b == b';' {
                    chunk.advance();
                } else {
                    break;
                }
            }
        }
        let name = self.pending_macro.take().expect("macro name is pending");
        self.state = self.prev_state;
        self.dispatch_macro(&name, &body)
    }

    fn dispatch_macro(&mut self, name: &str, body: &str) -> Result<()> {
        let location = self.top().location();
        if let Some(handler) = self.macros.get_mut(name) {
            let action = handler(body).map_err(|msg| {
                Error::macro_error(format!("macro '.{name}' failed: {msg}"), location)
            })?;
            return match action {
                MacroAction::Nothing => Ok(()),
                MacroAction::PushChunk { data, priority } => {
                    self.push_include_chunk(data, priority)
                }
            };
        }
        match name {
            "include" => self.builtin_include(body, false),
            "includes" => self.builtin_include(body, true),
            _ => Err(Error::macro_error(format!("unknown macro: .{name}"), location)),
        }
    }

    fn builtin_include(&mut self, body: &str, check_signature: bool) -> Result<()> {
        let target = self
            .variables
            .expand(body)
            .unwrap_or_else(|| body.to_string());
        let data = macros::fetch_target(self.fetcher.as_mut(), &target)
            .map_err(|err| Error::io(format!("cannot fetch {target}: {err}")))?;
        if check_signature {
            let signature = macros::fetch_signature(self.fetcher.as_mut(), &target)
                .map_err(|err| Error::io(format!("cannot fetch signature of {target}: {err}")))?;
            self.fetcher
                .verify(&data, &signature)
                .map_err(|msg| Error::signature(format!("{target}: {msg}")))?;
        }
        let text = String::from_utf8(data).map_err(|_| {
            Error::io(format!("included document {target} is not valid UTF-8"))
        })?;
        self.push_include_chunk(text, 0)
    }
}
