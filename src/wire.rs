//! Little-endian framing shared by the server and the client.
//!
//! ```text
//! int     8 bytes, unsigned, little-endian
//! double  8 bytes, IEEE-754, little-endian
//! string  int byte length N, then N bytes of UTF-8
//! vector  int element count N, then N doubles
//! value   int discriminant (1 = double, 2 = string, 3 = vector), then the payload
//! ```
//!
//! Readers never buffer or look ahead: each call consumes exactly the bytes
//! its frame needs.

use crate::value::{DataType, Value};
use std::io::{self, ErrorKind, Read, Write};
use thiserror::Error;

pub const INT_WIDTH: usize = 8;
pub const DOUBLE_WIDTH: usize = 8;

/// Default ceiling for a single length-prefixed payload (256 MiB).
pub const DEFAULT_MAX_FRAME_BYTES: u64 = 256 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("connection closed in the middle of a frame")]
    UnexpectedEof,
    #[error("transport error: {0}")]
    Io(#[source] io::Error),
    #[error("unknown data type discriminant {0}")]
    UnknownDataType(u64),
    #[error("string payload is not valid UTF-8")]
    InvalidUtf8,
    #[error("frame of {requested} bytes exceeds the {limit} byte limit")]
    FrameTooLarge { requested: u64, limit: u64 },
}

impl WireError {
    /// Transport errors come from the socket; everything else is a malformed stream.
    pub fn is_transport(&self) -> bool {
        matches!(self, WireError::UnexpectedEof | WireError::Io(_))
    }
}

impl From<io::Error> for WireError {
    fn from(err: io::Error) -> Self {
        if err.kind() == ErrorKind::UnexpectedEof {
            WireError::UnexpectedEof
        } else {
            WireError::Io(err)
        }
    }
}

pub struct WireReader<R> {
    inner: R,
    max_frame_bytes: u64,
}

impl<R: Read> WireReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_limit(inner, DEFAULT_MAX_FRAME_BYTES)
    }

    pub fn with_limit(inner: R, max_frame_bytes: u64) -> Self {
        Self {
            inner,
            max_frame_bytes,
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Reads a command tag. `Ok(None)` means the peer closed the stream
    /// cleanly before the first byte of the tag.
    pub fn read_tag(&mut self) -> Result<Option<u64>, WireError> {
        let mut buf = [0u8; INT_WIDTH];
        let first = loop {
            match self.inner.read(&mut buf[..1]) {
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        };
        if first == 0 {
            return Ok(None);
        }
        self.inner.read_exact(&mut buf[1..])?;
        Ok(Some(u64::from_le_bytes(buf)))
    }

    pub fn read_int(&mut self) -> Result<u64, WireError> {
        let mut buf = [0u8; INT_WIDTH];
        self.inner.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    pub fn read_double(&mut self) -> Result<f64, WireError> {
        let mut buf = [0u8; DOUBLE_WIDTH];
        self.inner.read_exact(&mut buf)?;
        Ok(f64::from_le_bytes(buf))
    }

    pub fn read_string(&mut self) -> Result<String, WireError> {
        let len = self.read_int()?;
        self.check_frame(len)?;
        let mut buf = vec![0u8; len as usize];
        self.inner.read_exact(&mut buf)?;
        String::from_utf8(buf).map_err(|_| WireError::InvalidUtf8)
    }

    pub fn read_vector(&mut self) -> Result<Vec<f64>, WireError> {
        let count = self.read_int()?;
        let bytes = count.checked_mul(DOUBLE_WIDTH as u64).ok_or(WireError::FrameTooLarge {
            requested: u64::MAX,
            limit: self.max_frame_bytes,
        })?;
        self.check_frame(bytes)?;
        let mut buf = vec![0u8; bytes as usize];
        self.inner.read_exact(&mut buf)?;
        Ok(buf
            .chunks_exact(DOUBLE_WIDTH)
            .map(|chunk| {
                let mut raw = [0u8; DOUBLE_WIDTH];
                raw.copy_from_slice(chunk);
                f64::from_le_bytes(raw)
            })
            .collect())
    }

    pub fn read_value(&mut self) -> Result<Value, WireError> {
        let raw = self.read_int()?;
        match DataType::from_wire(raw) {
            Some(DataType::Double) => Ok(Value::Double(self.read_double()?)),
            Some(DataType::String) => Ok(Value::String(self.read_string()?)),
            Some(DataType::Array) => Ok(Value::Array(self.read_vector()?)),
            None => Err(WireError::UnknownDataType(raw)),
        }
    }

    fn check_frame(&self, requested: u64) -> Result<(), WireError> {
        if requested > self.max_frame_bytes {
            return Err(WireError::FrameTooLarge {
                requested,
                limit: self.max_frame_bytes,
            });
        }
        Ok(())
    }
}

pub struct WireWriter<W> {
    inner: W,
}

impl<W: Write> WireWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Command tags share the integer framing.
    pub fn write_tag(&mut self, tag: u64) -> io::Result<()> {
        self.write_int(tag)
    }

    pub fn write_int(&mut self, value: u64) -> io::Result<()> {
        self.inner.write_all(&value.to_le_bytes())
    }

    pub fn write_double(&mut self, value: f64) -> io::Result<()> {
        self.inner.write_all(&value.to_le_bytes())
    }

    pub fn write_string(&mut self, value: &str) -> io::Result<()> {
        self.write_int(value.len() as u64)?;
        self.inner.write_all(value.as_bytes())
    }

    pub fn write_vector(&mut self, values: &[f64]) -> io::Result<()> {
        self.write_int(values.len() as u64)?;
        let mut buf = Vec::with_capacity(values.len() * DOUBLE_WIDTH);
        for value in values {
            buf.extend_from_slice(&value.to_le_bytes());
        }
        self.inner.write_all(&buf)
    }

    pub fn write_value(&mut self, value: &Value) -> io::Result<()> {
        self.write_int(value.data_type().as_wire())?;
        match value {
            Value::Double(v) => self.write_double(*v),
            Value::String(s) => self.write_string(s),
            Value::Array(values) => self.write_vector(values),
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
