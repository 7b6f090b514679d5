//! Lexer primitives: comments, numbers with suffix multipliers, quoted
//! and unquoted strings, heredocs and boolean literals.

use memchr::memchr;

use crate::chartable::{self, DIGIT, ESCAPE, VALUE_END, WHITESPACE, WHITESPACE_UNSAFE};
use crate::decode::chunk::Chunk;
use crate::error::{Error, Result};
use crate::value::ValueKind;

pub(crate) fn skip_whitespace(chunk: &mut Chunk) {
    while let Some(b) = chunk.peek() {
        if chartable::test(b, WHITESPACE) {
            chunk.advance();
        } else {
            break;
        }
    }
}

pub(crate) fn skip_whitespace_unsafe(chunk: &mut Chunk) {
    while let Some(b) = chunk.peek() {
        if chartable::test(b, WHITESPACE_UNSAFE) {
            chunk.advance();
        } else {
            break;
        }
    }
}

pub(crate) fn at_comment(chunk: &Chunk) -> bool {
    match chunk.peek() {
        Some(b) => chartable::is_comment_start(b, chunk.peek_at(1)),
        None => false,
    }
}

/// Skip interleaved whitespace (newlines included) and comments.
pub(crate) fn skip_trivia(chunk: &mut Chunk) -> Result<()> {
    loop {
        let before = chunk.pos();
        skip_whitespace_unsafe(chunk);
        skip_comments(chunk)?;
        if chunk.pos() == before {
            return Ok(());
        }
    }
}

/// Consume a `#` or `//` line comment, or a `/* */` comment nested to
/// arbitrary depth. An unterminated block comment is a syntax error.
pub(crate) fn skip_comments(chunk: &mut Chunk) -> Result<()> {
    loop {
        match chunk.peek() {
            Some(b'#') => skip_line_comment(chunk),
            Some(b'/') if chunk.peek_at(1) == Some(b'/') => skip_line_comment(chunk),
            Some(b'/') if chunk.peek_at(1) == Some(b'*') => {
                let start = chunk.location();
                chunk.advance_n(2);
                let mut nested = 1usize;
                while nested > 0 {
                    match (chunk.peek(), chunk.peek_at(1)) {
                        (Some(b'*'), Some(b'/')) => {
                            nested -= 1;
                            chunk.advance_n(2);
                        }
                        (Some(b'/'), Some(b'*')) => {
                            nested += 1;
                            chunk.advance_n(2);
                        }
                        (Some(_), _) => chunk.advance(),
                        (None, _) => {
                            return Err(Error::syntax("unterminated comment", start));
                        }
                    }
                }
            }
            _ => return Ok(()),
        }
    }
}

fn skip_line_comment(chunk: &mut Chunk) {
    match memchr(b'\n', &chunk.bytes()[chunk.pos()..]) {
        Some(off) => chunk.advance_n(off + 1),
        None => chunk.advance_n(chunk.remaining()),
    }
}

fn at_atom_end(chunk: &Chunk, offset: usize) -> bool {
    match chunk.peek_at(offset) {
        Some(b) => chartable::test(b, VALUE_END),
        None => true,
    }
}

fn power_multiplier(c: u8, base1024: bool) -> i64 {
    let base: i64 = if base1024 { 1024 } else { 1000 };
    match c.to_ascii_lowercase() {
        b'k' => base,
        b'm' => base * base,
        b'g' => base * base * base,
        _ => 1,
    }
}

fn time_multiplier(c: u8) -> f64 {
    match c.to_ascii_lowercase() {
        b'h' => 3600.0,
        b'd' => 86_400.0,
        b'w' => 604_800.0,
        b'y' => 31_536_000.0,
        _ => 1.0,
    }
}

/// Attempt to lex a numeric literal with optional suffix multipliers.
///
/// Returns `Ok(None)` with the cursor rewound when the atom is not a
/// number after all (the caller then re-reads it as an unquoted
/// string). Out-of-range literals are a hard error.
pub(crate) fn lex_number(chunk: &mut Chunk, no_time: bool) -> Result<Option<ValueKind>> {
    let saved = chunk.save();
    let start = chunk.pos();

    if chunk.peek() == Some(b'-') {
        chunk.advance();
    }
    let digits_from = chunk.pos();
    let mut got_dot = false;
    let mut got_exp = false;
    let mut need_double = false;
    loop {
        match chunk.peek() {
            Some(b) if chartable::test(b, DIGIT) => chunk.advance(),
            Some(b'.') if !got_dot && !got_exp => {
                got_dot = true;
                need_double = true;
                chunk.advance();
            }
            Some(b'e') | Some(b'E') if !got_exp => {
                got_exp = true;
                need_double = true;
                chunk.advance();
                match chunk.peek() {
                    Some(b'+') | Some(b'-') => chunk.advance(),
                    Some(b) if b.is_ascii_digit() => {}
                    _ => {
                        chunk.restore(saved);
                        return Ok(None);
                    }
                }
            }
            _ => break,
        }
    }
    if chunk.pos() == digits_from {
        chunk.restore(saved);
        return Ok(None);
    }

    let literal = chunk.slice(start, chunk.pos());
    let err_loc = chunk.location();
    let range_err = || Error::syntax("numeric value is out of range", err_loc);
    let mut int_val: i64 = 0;
    let mut float_val: f64 = 0.0;
    if need_double {
        float_val = literal.parse::<f64>().map_err(|_| range_err())?;
        if float_val.is_infinite() {
            return Err(range_err());
        }
    } else {
        match literal.parse::<i64>() {
            Ok(v) => int_val = v,
            Err(_) => return Err(range_err()),
        }
    }

    // Suffix dispatch; `done` closures build the final kind.
    let as_time = |v: f64| ValueKind::Time(v);
    let cur = chunk.peek();
    match cur {
        None => {}
        Some(b) if chartable::test(b, VALUE_END) => {}
        Some(c @ (b'm' | b'M' | b'g' | b'G' | b'k' | b'K')) => {
            match chunk.peek_at(1) {
                Some(b's') | Some(b'S') if at_atom_end(chunk, 2) => {
                    // ms is milliseconds; ks and gs scale by the power multiplier
                    if no_time {
                        chunk.restore(saved);
                        return Ok(None);
                    }
                    let base = if need_double { float_val } else { int_val as f64 };
                    let scaled = if c.eq_ignore_ascii_case(&b'm') {
                        base / 1000.0
                    } else {
                        base * power_multiplier(c, false) as f64
                    };
                    chunk.advance_n(2);
                    return Ok(Some(as_time(scaled)));
                }
                Some(b'b') | Some(b'B') if at_atom_end(chunk, 2) => {
                    let mult = power_multiplier(c, true);
                    let v = if need_double {
                        (float_val * mult as f64) as i64
                    } else {
                        int_val.saturating_mul(mult)
                    };
                    chunk.advance_n(2);
                    return Ok(Some(ValueKind::Int(v)));
                }
                _ if at_atom_end(chunk, 1) => {
                    let mult = power_multiplier(c, false);
                    chunk.advance();
                    return Ok(Some(if need_double {
                        ValueKind::Float(float_val * mult as f64)
                    } else {
                        ValueKind::Int(int_val.saturating_mul(mult))
                    }));
                }
                Some(b'i') | Some(b'I')
                    if c.eq_ignore_ascii_case(&b'm')
                        && matches!(chunk.peek_at(2), Some(b'n') | Some(b'N'))
                        && at_atom_end(chunk, 3) =>
                {
                    if no_time {
                        chunk.restore(saved);
                        return Ok(None);
                    }
                    let base = if need_double { float_val } else { int_val as f64 };
                    chunk.advance_n(3);
                    return Ok(Some(as_time(base * 60.0)));
                }
                _ => {
                    chunk.restore(saved);
                    return Ok(None);
                }
            }
        }
        Some(b's') | Some(b'S') if at_atom_end(chunk, 1) => {
            if no_time {
                chunk.restore(saved);
                return Ok(None);
            }
            let base = if need_double { float_val } else { int_val as f64 };
            chunk.advance();
            return Ok(Some(as_time(base)));
        }
        Some(c @ (b'h' | b'H' | b'd' | b'D' | b'w' | b'W' | b'y' | b'Y'))
            if at_atom_end(chunk, 1) =>
        {
            if no_time {
                chunk.restore(saved);
                return Ok(None);
            }
            let base = if need_double { float_val } else { int_val as f64 };
            chunk.advance();
            return Ok(Some(as_time(base * time_multiplier(c))));
        }
        _ => {
            chunk.restore(saved);
            return Ok(None);
        }
    }

    Ok(Some(if need_double {
        ValueKind::Float(float_val)
    } else {
        ValueKind::Int(int_val)
    }))
}

/// Lex the interior of a quoted string; the cursor sits just past the
/// opening quote on entry and just past the closing quote on success.
/// Returns the content byte range and whether escapes were seen.
pub(crate) fn lex_quoted_string(chunk: &mut Chunk) -> Result<(usize, usize, bool)> {
    let start = chunk.pos();
    let mut need_unescape = false;
    loop {
        let Some(b) = chunk.peek() else {
            return Err(Error::syntax("unterminated string", chunk.location()));
        };
        if b < 0x20 {
            let msg = if b == b'\n' {
                "unexpected newline"
            } else {
                "unexpected control character"
            };
            return Err(Error::syntax(msg, chunk.location()));
        }
        match b {
            b'"' => {
                let end = chunk.pos();
                chunk.advance();
                return Ok((start, end, need_unescape));
            }
            b'\\' => {
                chunk.advance();
                let Some(esc) = chunk.peek() else {
                    return Err(Error::syntax("unfinished escape character", chunk.location()));
                };
                if !chartable::test(esc, ESCAPE) {
                    return Err(Error::syntax("invalid escape character", chunk.location()));
                }
                chunk.advance();
                if esc == b'u' {
                    for _ in 0..4 {
                        match chunk.peek() {
                            Some(h) if h.is_ascii_hexdigit() => chunk.advance(),
                            Some(_) => {
                                return Err(Error::syntax(
                                    "invalid utf escape",
                                    chunk.location(),
                                ))
                            }
                            None => {
                                return Err(Error::syntax(
                                    "unfinished escape character",
                                    chunk.location(),
                                ))
                            }
                        }
                    }
                }
                need_unescape = true;
            }
            _ => chunk.advance(),
        }
    }
}

/// Resolve JSON escapes in a validated string slice. `\uXXXX` code
/// points re-encode as UTF-8; unpaired surrogates degrade to `?`.
pub(crate) fn unescape_json(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' {
            let run_start = i;
            while i < bytes.len() && bytes[i] != b'\\' {
                i += 1;
            }
            out.push_str(&input[run_start..i]);
            continue;
        }
        i += 1;
        match bytes.get(i) {
            Some(b'n') => out.push('\n'),
            Some(b'r') => out.push('\r'),
            Some(b'b') => out.push('\u{8}'),
            Some(b't') => out.push('\t'),
            Some(b'f') => out.push('\u{c}'),
            Some(b'\\') => out.push('\\'),
            Some(b'"') => out.push('"'),
            Some(b'/') => out.push('/'),
            Some(b'u') => {
                let hex = &input[i + 1..i + 5];
                i += 4;
                match u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
                    Some(c) => out.push(c),
                    None => out.push('?'),
                }
            }
            _ => out.push('?'),
        }
        i += 1;
    }
    out
}

/// Capture an unquoted string value: everything up to a value
/// terminator or the start of a comment, with balanced `{}` and `[]`
/// pairs allowed inside. Returns the content range with trailing
/// whitespace stripped.
pub(crate) fn lex_unquoted(chunk: &mut Chunk) -> (usize, usize) {
    let start = chunk.pos();
    let mut fig_open = 0usize;
    let mut fig_close = 0usize;
    let mut sq_open = 0usize;
    let mut sq_close = 0usize;

    while let Some(b) = chunk.peek() {
        match b {
            b'{' => fig_open += 1,
            b'}' => {
                fig_close += 1;
                if fig_close == fig_open {
                    chunk.advance();
                    continue;
                }
            }
            b'[' => sq_open += 1,
            b']' => {
                sq_close += 1;
                if sq_close == sq_open {
                    chunk.advance();
                    continue;
                }
            }
            _ => {}
        }
        if chartable::test(b, VALUE_END) || chartable::is_comment_start(b, chunk.peek_at(1)) {
            break;
        }
        chunk.advance();
    }

    let mut end = chunk.pos();
    let bytes = chunk.bytes();
    while end > start && chartable::test(bytes[end - 1], WHITESPACE) {
        end -= 1;
    }
    (start, end)
}

/// Heredoc: `<<TAG\n … \nTAG`. The cursor sits on the first `<`.
/// Returns the verbatim content range, or `None` (rewound) when the
/// bytes do not form a heredoc introducer.
pub(crate) fn lex_heredoc(chunk: &mut Chunk) -> Result<Option<(usize, usize)>> {
    let saved = chunk.save();
    if chunk.peek() != Some(b'<') || chunk.peek_at(1) != Some(b'<') {
        return Ok(None);
    }
    let mut tag_len = 0usize;
    while let Some(b) = chunk.peek_at(2 + tag_len) {
        if b.is_ascii_uppercase() {
            tag_len += 1;
        } else {
            break;
        }
    }
    if tag_len == 0 || chunk.peek_at(2 + tag_len) != Some(b'\n') {
        return Ok(None);
    }

    let tag_start = chunk.pos() + 2;
    chunk.advance_n(2 + tag_len + 1);
    let content_start = chunk.pos();
    let src = chunk.src().clone();
    let tag = &src.as_bytes()[tag_start..tag_start + tag_len];

    let mut search_from = chunk.pos();
    loop {
        let bytes = chunk.bytes();
        let Some(nl) = memchr(b'\n', &bytes[search_from..]) else {
            chunk.restore(saved);
            return Err(Error::syntax("unterminated multiline value", chunk.location()));
        };
        let line_start = search_from + nl + 1;
        let candidate = &bytes[line_start..];
        let terminated = candidate.starts_with(tag)
            && matches!(candidate.get(tag.len()), None | Some(b'\n') | Some(b'\r'));
        if terminated {
            // Content includes the newline preceding the terminator line.
            let content_end = line_start;
            chunk.advance_n(line_start + tag.len() - chunk.pos());
            return Ok(Some((content_start, content_end)));
        }
        search_from = line_start;
    }
}

/// Case-insensitive boolean literal recognition for unquoted atoms.
pub(crate) fn recognize_boolean(s: &str) -> Option<bool> {
    match s.len() {
        2 if s.eq_ignore_ascii_case("no") => Some(false),
        2 if s.eq_ignore_ascii_case("on") => Some(true),
        3 if s.eq_ignore_ascii_case("yes") => Some(true),
        3 if s.eq_ignore_ascii_case("off") => Some(false),
        4 if s.eq_ignore_ascii_case("true") => Some(true),
        5 if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}
