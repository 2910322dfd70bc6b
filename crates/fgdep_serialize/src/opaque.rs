//! A length-prefixed, little-endian byte-buffer `Encoder`/`Decoder`, the
//! same "opaque" format `rustc`'s own dep-graph artifacts use (no
//! self-describing tags beyond what the caller writes explicitly).

use crate::Decoder;
use std::fmt;

#[derive(Debug)]
pub struct OpaqueDecodeError(pub String);

impl fmt::Display for OpaqueDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for OpaqueDecodeError {}

pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Encoder { buf: Vec::new() }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn position(&self) -> usize {
        self.buf.len()
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl crate::Encoder for Encoder {
    type Error = std::convert::Infallible;

    fn emit_u8(&mut self, v: u8) -> Result<(), Self::Error> {
        self.buf.push(v);
        Ok(())
    }
    fn emit_u16(&mut self, v: u16) -> Result<(), Self::Error> {
        self.buf.extend_from_slice(&v.to_le_bytes());
        Ok(())
    }
    fn emit_u32(&mut self, v: u32) -> Result<(), Self::Error> {
        self.buf.extend_from_slice(&v.to_le_bytes());
        Ok(())
    }
    fn emit_u64(&mut self, v: u64) -> Result<(), Self::Error> {
        self.buf.extend_from_slice(&v.to_le_bytes());
        Ok(())
    }
    fn emit_usize(&mut self, v: usize) -> Result<(), Self::Error> {
        self.emit_u64(v as u64)
    }
    fn emit_bool(&mut self, v: bool) -> Result<(), Self::Error> {
        self.emit_u8(v as u8)
    }
    fn emit_raw_bytes(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.buf.extend_from_slice(bytes);
        Ok(())
    }
}

pub struct SliceDecoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceDecoder<'a> {
    pub fn new(data: &'a [u8], start: usize) -> Self {
        SliceDecoder { data, pos: start }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], OpaqueDecodeError> {
        if self.pos + len > self.data.len() {
            return Err(OpaqueDecodeError(format!(
                "unexpected end of artifact: wanted {len} bytes at offset {}, have {}",
                self.pos,
                self.data.len()
            )));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }
}

impl<'a> Decoder for SliceDecoder<'a> {
    type Error = OpaqueDecodeError;

    fn read_u8(&mut self) -> Result<u8, Self::Error> {
        Ok(self.take(1)?[0])
    }
    fn read_u16(&mut self) -> Result<u16, Self::Error> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }
    fn read_u32(&mut self) -> Result<u32, Self::Error> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }
    fn read_u64(&mut self) -> Result<u64, Self::Error> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }
    fn read_usize(&mut self) -> Result<usize, Self::Error> {
        Ok(self.read_u64()? as usize)
    }
    fn read_bool(&mut self) -> Result<bool, Self::Error> {
        Ok(self.read_u8()? != 0)
    }
    fn read_raw_bytes(&mut self, len: usize) -> Result<Vec<u8>, Self::Error> {
        Ok(self.take(len)?.to_vec())
    }
    fn error(&mut self, msg: &str) -> Self::Error {
        OpaqueDecodeError(format!("{msg} (at offset {})", self.pos))
    }
}
