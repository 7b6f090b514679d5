use std::io::Write;

use crate::error::{Error, Result};

/// Output function table for the emitters. Implementations provide the
/// byte-level appends; integer and float formatting have default
/// renderings shared by every format.
pub trait EmitFuncs {
    /// Append `count` copies of a byte.
    fn append_char(&mut self, c: u8, count: usize) -> Result<()>;

    fn append_bytes(&mut self, data: &[u8]) -> Result<()>;

    fn append_int(&mut self, value: i64) -> Result<()> {
        let mut buf = itoa::Buffer::new();
        self.append_bytes(buf.format(value).as_bytes())
    }

    /// Floats emit as `X.0` when integral, in shortest round-trip form
    /// when within 1e-7 of an integer, and with six fractional digits
    /// otherwise.
    fn append_double(&mut self, value: f64) -> Result<()> {
        if value.is_finite()
            && value.fract() == 0.0
            && value >= i64::MIN as f64
            && value <= i64::MAX as f64
        {
            let mut buf = itoa::Buffer::new();
            self.append_bytes(buf.format(value as i64).as_bytes())?;
            return self.append_bytes(b".0");
        }
        if value.is_finite() && (value - value.round()).abs() < 1e-7 {
            let mut buf = ryu::Buffer::new();
            return self.append_bytes(buf.format(value).as_bytes());
        }
        self.append_bytes(format!("{value:.6}").as_bytes())
    }
}

/// In-memory buffer sink.
impl EmitFuncs for Vec<u8> {
    fn append_char(&mut self, c: u8, count: usize) -> Result<()> {
        self.resize(self.len() + count, c);
        Ok(())
    }

    fn append_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.extend_from_slice(data);
        Ok(())
    }
}

/// Adapter emitting through any [`std::io::Write`] (file streams and
/// raw descriptors included). A sink error aborts the emit.
pub struct WriterFuncs<W: Write> {
    writer: W,
}

impl<W: Write> WriterFuncs<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> EmitFuncs for WriterFuncs<W> {
    fn append_char(&mut self, c: u8, count: usize) -> Result<()> {
        let buf = [c; 64];
        let mut left = count;
        while left > 0 {
            let n = left.min(buf.len());
            self.writer.write_all(&buf[..n]).map_err(Error::from)?;
            left -= n;
        }
        Ok(())
    }

    fn append_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data).map_err(Error::from)
    }
}
