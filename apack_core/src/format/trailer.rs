use crate::byteio::{ByteReader, ByteWriter};
use crate::error::{ApackError, Result};
use std::io::{Read, Write};

pub const TRAILER_MAGIC: [u8; 4] = *b"TRLR";

/// Bytes covered by `trailer_checksum`: magic through `toc_checksum`.
const CRC_COVERED_LEN: usize = 52;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    pub trailer_version: u32,
    pub toc_offset: u64,
    pub toc_size: u64,
    pub entry_count: u64,
    pub total_original_size: u64,
    pub total_stored_size: u64,
    pub toc_checksum: u32,
    pub file_size: u64,
}

impl Trailer {
    fn covered_bytes(&self) -> [u8; CRC_COVERED_LEN] {
        let mut buf = [0u8; CRC_COVERED_LEN];
        buf[0..4].copy_from_slice(&TRAILER_MAGIC);
        buf[4..8].copy_from_slice(&self.trailer_version.to_le_bytes());
        buf[8..16].copy_from_slice(&self.toc_offset.to_le_bytes());
        buf[16..24].copy_from_slice(&self.toc_size.to_le_bytes());
        buf[24..32].copy_from_slice(&self.entry_count.to_le_bytes());
        buf[32..40].copy_from_slice(&self.total_original_size.to_le_bytes());
        buf[40..48].copy_from_slice(&self.total_stored_size.to_le_bytes());
        buf[48..52].copy_from_slice(&self.toc_checksum.to_le_bytes());
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
        w.write_u64(self.file_size)?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut ByteReader<R>) -> Result<Self> {
        let magic = r.read_array::<4>()?;
        if magic != TRAILER_MAGIC {
            return Err(ApackError::format("bad trailer magic"));
        }
        let trailer_version = r.read_u32()?;
        let toc_offset = r.read_u64()?;
        let toc_size = r.read_u64()?;
        let entry_count = r.read_u64()?;
        let total_original_size = r.read_u64()?;
        let total_stored_size = r.read_u64()?;
        let toc_checksum = r.read_u32()?;
        let trailer_checksum = r.read_u32()?;
        let file_size = r.read_u64()?;

        let trailer = Trailer {
            trailer_version,
            toc_offset,
            toc_size,
            entry_count,
            total_original_size,
            total_stored_size,
            toc_checksum,
            file_size,
        };

        if trailer.trailer_checksum() != trailer_checksum {
            return Err(ApackError::format("trailer checksum mismatch"));
        }

        Ok(trailer)
    }

    /// Encoded length of a trailer header: always 64 bytes (the TOC entries
    /// that precede it are not part of this count).
    pub const ENCODED_LEN: u64 = 64;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip() {
        let trailer = Trailer {
            trailer_version: 1,
            toc_offset: 1000,
            toc_size: 400,
            entry_count: 10,
            total_original_size: 123_456,
            total_stored_size: 65_432,
            toc_checksum: 0xAAAA_BBBB,
            file_size: 2000,
        };
        let mut w = ByteWriter::new(Vec::new());
        trailer.write_to(&mut w).unwrap();
        assert_eq!(w.bytes_written(), Trailer::ENCODED_LEN);
        let buf = w.into_inner();
        let mut r = ByteReader::new(Cursor::new(buf));
        assert_eq!(Trailer::read_from(&mut r).unwrap(), trailer);
    }

    #[test]
    fn tampered_trailer_rejected() {
        let trailer = Trailer {
            trailer_version: 1,
            toc_offset: 1000,
            toc_size: 400,
            entry_count: 10,
            total_original_size: 123_456,
            total_stored_size: 65_432,
            toc_checksum: 0xAAAA_BBBB,
            file_size: 2000,
        };
        let mut w = ByteWriter::new(Vec::new());
        trailer.write_to(&mut w).unwrap();
        let mut buf = w.into_inner();
        buf[10] ^= 0xFF;
        let mut r = ByteReader::new(Cursor::new(buf));
        assert!(matches!(Trailer::read_from(&mut r), Err(ApackError::Format(_))));
    }
}
