use std::sync::Arc;

use crate::error::Location;

/// Include nesting limit; exceeding it aborts the parse.
pub(crate) const MAX_INCLUDE_DEPTH: usize = 16;

/// A contiguous input region being parsed. Chunks form a stack: include
/// macros push a new chunk which is consumed before the outer one
/// resumes.
#[derive(Debug, Clone)]
pub(crate) struct Chunk {
    src: Arc<str>,
    pos: usize,
    line: u32,
    column: u32,
    priority: u8,
    generation: u32,
}

/// Cursor snapshot for backtracking in the number lexer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SavedState {
    pos: usize,
    line: u32,
    column: u32,
}

impl Chunk {
    pub fn new(src: Arc<str>, priority: u8, generation: u32) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            column: 0,
            priority,
            generation,
        }
    }

    pub fn src(&self) -> &Arc<str> {
        &self.src
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    /// Identity of the document this chunk came from; duplicate keys
    /// chain within one generation and merge by priority across them.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn bytes(&self) -> &[u8] {
        self.src.as_bytes()
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.src.len()
    }

    pub fn remaining(&self) -> usize {
        self.src.len() - self.pos
    }

    pub fn peek(&self) -> Option<u8> {
        self.bytes().get(self.pos).copied()
    }

    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes().get(self.pos + offset).copied()
    }

    /// Advance one byte, updating the line and column counters.
    pub fn advance(&mut self) {
        if let Some(&b) = self.bytes().get(self.pos) {
            if b == b'\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
            self.pos += 1;
        }
    }

    pub fn advance_n(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    pub fn slice(&self, start: usize, end: usize) -> &str {
        &self.src[start..end]
    }

    pub fn save(&self) -> SavedState {
        SavedState {
            pos: self.pos,
            line: self.line,
            column: self.column,
        }
    }

    pub fn restore(&mut self, state: SavedState) {
        self.pos = state.pos;
        self.line = state.line;
        self.column = state.column;
    }

    pub fn location(&self) -> Location {
        Location {
            offset: self.pos,
            line: self.line,
            column: self.column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    fn test_advance_tracks_lines_and_columns() {
        let mut chunk = Chunk::new(Arc::from("ab\ncd"), 0, 0);
        assert_eq!(chunk.location().line, 1);
        chunk.advance_n(3);
        let loc = chunk.location();
        assert_eq!(loc.line, 2);
        assert_eq!(loc.column, 0);
        assert_eq!(loc.offset, 3);
        assert_eq!(chunk.peek(), Some(b'c'));
    }

    #[rstest::rstest]
    fn test_save_restore_round_trips() {
        let mut chunk = Chunk::new(Arc::from("12345"), 0, 0);
        chunk.advance_n(2);
        let saved = chunk.save();
        chunk.advance_n(2);
        assert_eq!(chunk.peek(), Some(b'5'));
        chunk.restore(saved);
        assert_eq!(chunk.peek(), Some(b'3'));
    }

    #[rstest::rstest]
    fn test_exhaustion() {
        let mut chunk = Chunk::new(Arc::from("x"), 0, 0);
        assert!(!chunk.is_exhausted());
        chunk.advance();
        assert!(chunk.is_exhausted());
        assert_eq!(chunk.peek(), None);
        chunk.advance();
        assert_eq!(chunk.remaining(), 0);
    }
}
