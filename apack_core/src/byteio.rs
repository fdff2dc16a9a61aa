//! Buffered little-endian primitives shared by every format record.
//!
//! `ByteWriter` tracks a monotonic byte count so the archive writer can
//! capture offsets (entry headers, TOC, trailer) as it streams to a sink
//! that may not be seekable. `ByteReader` mirrors each primitive and turns
//! short reads into `ApackError::Format`/`Io`.

use std::io::{Read, Write};

use crate::error::{ApackError, Result};

/// Max length of a u16-length-prefixed string, per the format's name/key
/// byte-length bound.
pub const MAX_U16_STRING_LEN: usize = u16::MAX as usize;

pub struct ByteWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> ByteWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    /// Total bytes written through this wrapper since construction.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.write_bytes(&[v])
    }

    pub fn write_u16(&mut self, v: u16) -> Result<()> {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_u64(&mut self, v: u64) -> Result<()> {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_i32(&mut self, v: i32) -> Result<()> {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_i64(&mut self, v: i64) -> Result<()> {
        self.write_bytes(&v.to_le_bytes())
    }

    /// Raw UTF-8 bytes, no length prefix.
    pub fn write_str_raw(&mut self, s: &str) -> Result<()> {
        self.write_bytes(s.as_bytes())
    }

    /// u16-length-prefixed UTF-8 string. Errors if the encoded length
    /// exceeds `u16::MAX`.
    pub fn write_str_u16(&mut self, s: &str) -> Result<()> {
        let bytes = s.as_bytes();
        if bytes.len() > MAX_U16_STRING_LEN {
            return Err(ApackError::format(format!(
                "string of {} bytes exceeds u16-prefixed limit of {}",
                bytes.len(),
                MAX_U16_STRING_LEN
            )));
        }
        self.write_u16(bytes.len() as u16)?;
        self.write_bytes(bytes)
    }

    /// u32-length-prefixed byte string (used for attribute string/bytes
    /// values, which are wider than names).
    pub fn write_bytes_u32(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_u32(bytes.len() as u32)?;
        self.write_bytes(bytes)
    }

    /// Emit `n` zero bytes.
    pub fn write_padding(&mut self, n: usize) -> Result<()> {
        const ZEROS: [u8; 64] = [0u8; 64];
        let mut remaining = n;
        while remaining > 0 {
            let take = remaining.min(ZEROS.len());
            self.write_bytes(&ZEROS[..take])?;
            remaining -= take;
        }
        Ok(())
    }

    /// Pad with zero bytes until `bytes_written()` is a multiple of the
    /// next power-of-two `>= boundary_hint`.
    pub fn align_to(&mut self, boundary_hint: usize) -> Result<()> {
        let boundary = boundary_hint.next_power_of_two().max(1) as u64;
        let remainder = self.written % boundary;
        if remainder != 0 {
            self.write_padding((boundary - remainder) as usize)?;
        }
        Ok(())
    }
}

pub struct ByteReader<R> {
    inner: R,
}

impl<R: Read> ByteReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                ApackError::format(format!("truncated input: expected {len} more bytes"))
            } else {
                ApackError::Io(e)
            }
        })?;
        Ok(buf)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                ApackError::format(format!("truncated input: expected {N} more bytes"))
            } else {
                ApackError::Io(e)
            }
        })?;
        Ok(buf)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array::<2>()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array::<4>()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array::<8>()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array::<4>()?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_array::<8>()?))
    }

    /// u16-length-prefixed UTF-8 string.
    pub fn read_str_u16(&mut self) -> Result<String> {
        let len = self.read_u16()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes).map_err(|e| ApackError::format(format!("invalid UTF-8 string: {e}")))
    }

    /// u32-length-prefixed byte string.
    pub fn read_bytes_u32(&mut self) -> Result<Vec<u8>> {
        let len = self.read_u32()? as usize;
        self.read_bytes(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip_primitives() {
        let mut w = ByteWriter::new(Vec::new());
        w.write_u8(7).unwrap();
        w.write_u16(1234).unwrap();
        w.write_u32(0xDEAD_BEEF).unwrap();
        w.write_u64(0x0123_4567_89AB_CDEF).unwrap();
        w.write_i32(-42).unwrap();
        w.write_i64(-1).unwrap();
        assert_eq!(w.bytes_written(), 1 + 2 + 4 + 8 + 4 + 8);
        let buf = w.into_inner();

        let mut r = ByteReader::new(Cursor::new(buf));
        assert_eq!(r.read_u8().unwrap(), 7);
        assert_eq!(r.read_u16().unwrap(), 1234);
        assert_eq!(r.read_u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(r.read_u64().unwrap(), 0x0123_4567_89AB_CDEF);
        assert_eq!(r.read_i32().unwrap(), -42);
        assert_eq!(r.read_i64().unwrap(), -1);
    }

    #[test]
    fn roundtrip_strings() {
        let mut w = ByteWriter::new(Vec::new());
        w.write_str_u16("hello.txt").unwrap();
        w.write_bytes_u32(b"attribute value").unwrap();
        let buf = w.into_inner();

        let mut r = ByteReader::new(Cursor::new(buf));
        assert_eq!(r.read_str_u16().unwrap(), "hello.txt");
        assert_eq!(r.read_bytes_u32().unwrap(), b"attribute value");
    }

    #[test]
    fn string_over_u16_limit_errors() {
        let huge = "x".repeat(MAX_U16_STRING_LEN + 1);
        let mut w = ByteWriter::new(Vec::new());
        let err = w.write_str_u16(&huge).unwrap_err();
        assert!(matches!(err, ApackError::Format(_)));
    }

    #[test]
    fn truncated_read_is_format_error() {
        let mut r = ByteReader::new(Cursor::new(vec![1u8, 2]));
        let err = r.read_u32().unwrap_err();
        assert!(matches!(err, ApackError::Format(_)));
    }

    #[test]
    fn align_to_pads_to_power_of_two() {
        let mut w = ByteWriter::new(Vec::new());
        w.write_bytes(&[1, 2, 3]).unwrap();
        w.align_to(8).unwrap();
        assert_eq!(w.bytes_written(), 8);
    }
}
