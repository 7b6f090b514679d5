use std::fmt;

/// Classification of parser and emitter failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Lexical or grammatical problem in the input.
    Syntax,
    /// Failure reported by a host callback (fetcher, output sink).
    Io,
    /// The parser was used while in an invalid state.
    State,
    /// Include nesting went past the limit.
    RecursionTooDeep,
    /// Unknown macro name or a macro handler failure.
    Macro,
    /// A bug in the library itself.
    Internal,
    /// Signature verification of an included document failed.
    Signature,
}

/// Byte offset plus human line/column of an error site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub offset: usize,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    pub location: Option<Location>,
}

impl Error {
    pub fn syntax(message: impl Into<String>, location: Location) -> Self {
        Self {
            kind: ErrorKind::Syntax,
            message: message.into(),
            location: Some(location),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Io,
            message: message.into(),
            location: None,
        }
    }

    pub fn state(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::State,
            message: message.into(),
            location: None,
        }
    }

    pub fn recursion(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::RecursionTooDeep,
            message: message.into(),
            location: None,
        }
    }

    pub fn macro_error(message: impl Into<String>, location: Location) -> Self {
        Self {
            kind: ErrorKind::Macro,
            message: message.into(),
            location: Some(location),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Internal,
            message: message.into(),
            location: None,
        }
    }

    pub fn signature(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Signature,
            message: message.into(),
            location: None,
        }
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "error on line {} at column {}: {}",
                loc.line, loc.column, self.message
            ),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    fn test_display_with_location() {
        let err = Error::syntax(
            "unexpected '}' detected",
            Location {
                offset: 10,
                line: 2,
                column: 5,
            },
        );
        assert_eq!(
            err.to_string(),
            "error on line 2 at column 5: unexpected '}' detected"
        );
    }

    #[rstest::rstest]
    fn test_display_without_location() {
        let err = Error::state("a parser is in an invalid state");
        assert_eq!(err.to_string(), "a parser is in an invalid state");
    }

    #[rstest::rstest]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert_eq!(err.kind, ErrorKind::Io);
        assert!(err.to_string().contains("missing"));
    }
}
