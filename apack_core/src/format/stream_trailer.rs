use crate::byteio::{ByteReader, ByteWriter};
use crate::error::{ApackError, Result};
use std::io::{Read, Write};

pub const STREAM_TRAILER_MAGIC: [u8; 4] = *b"STRL";

/// magic(4) + reserved:u32(4) + original_size:u64(8) + stored_size:u64(8) +
/// chunk_count:u32(4) + trailer_checksum:u32(4) = 32 bytes.
pub const STREAM_TRAILER_SIZE: u64 = 32;

const CRC_COVERED_LEN: usize = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamTrailer {
    pub original_size: u64,
    pub stored_size: u64,
    pub chunk_count: u32,
}

impl StreamTrailer {
    fn covered_bytes(&self) -> [u8; CRC_COVERED_LEN] {
        let mut buf = [0u8; CRC_COVERED_LEN];
        buf[0..4].copy_from_slice(&STREAM_TRAILER_MAGIC);
        // buf[4..8] reserved, stays zero
        buf[8..16].copy_from_slice(&self.original_size.to_le_bytes());
        buf[16..24].copy_from_slice(&self.stored_size.to_le_bytes());
        buf[24..28].copy_from_slice(&self.chunk_count.to_le_bytes());
        buf
    }

    fn trailer_checksum(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.covered_bytes());
        hasher.finalize()
    }

    pub fn write_to<W: Write>(&self, w: &mut ByteWriter<W>) -> Result<()> {
        w.write_bytes(&self.covered_bytes())?;
        w.write_u32(self.trailer_checksum())?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut ByteReader<R>) -> Result<Self> {
        let magic = r.read_array::<4>()?;
        if magic != STREAM_TRAILER_MAGIC {
            return Err(ApackError::format("bad stream trailer magic"));
        }
        let _reserved = r.read_u32()?;
        let original_size = r.read_u64()?;
        let stored_size = r.read_u64()?;
        let chunk_count = r.read_u32()?;
        let trailer_checksum = r.read_u32()?;

        let trailer = StreamTrailer {
            original_size,
            stored_size,
            chunk_count,
        };
        if trailer.trailer_checksum() != trailer_checksum {
            return Err(ApackError::format("stream trailer checksum mismatch"));
        }
        Ok(trailer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip() {
        let trailer = StreamTrailer {
            original_size: 12345,
            stored_size: 6789,
            chunk_count: 4,
        };
        let mut w = ByteWriter::new(Vec::new());
        trailer.write_to(&mut w).unwrap();
        assert_eq!(w.bytes_written(), STREAM_TRAILER_SIZE);
        let buf = w.into_inner();
        let mut r = ByteReader::new(Cursor::new(buf));
        assert_eq!(StreamTrailer::read_from(&mut r).unwrap(), trailer);
    }
}
