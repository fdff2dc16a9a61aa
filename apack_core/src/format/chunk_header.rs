use crate::byteio::{ByteReader, ByteWriter};
use crate::error::{ApackError, Result};
use std::io::{Read, Write};

pub const CHUNK_MAGIC: [u8; 4] = *b"CHNK";

/// magic(4) + chunk_index:i32(4) + original_size:i32(4) + stored_size:i32(4)
/// + checksum:u32(4) + flags:u32(4) = 24 bytes.
pub const CHUNK_HEADER_SIZE: u64 = 24;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkFlags {
    pub last: bool,
    pub compressed: bool,
    pub encrypted: bool,
}

impl ChunkFlags {
    const LAST_BIT: u32 = 1 << 0;
    const COMPRESSED_BIT: u32 = 1 << 1;
    const ENCRYPTED_BIT: u32 = 1 << 2;

    fn to_u32(self) -> u32 {
        (self.last as u32 * Self::LAST_BIT)
            | (self.compressed as u32 * Self::COMPRESSED_BIT)
            | (self.encrypted as u32 * Self::ENCRYPTED_BIT)
    }

    /// Reserved bits beyond LAST/COMPRESSED/ENCRYPTED are ignored on read,
    /// for forward compatibility with future flag bits.
    fn from_u32(bits: u32) -> Self {
        Self {
            last: bits & Self::LAST_BIT != 0,
            compressed: bits & Self::COMPRESSED_BIT != 0,
            encrypted: bits & Self::ENCRYPTED_BIT != 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub chunk_index: i32,
    pub original_size: i32,
    pub stored_size: i32,
    pub checksum: u32,
    pub flags: ChunkFlags,
}

impl ChunkHeader {
    pub fn write_to<W: Write>(&self, w: &mut ByteWriter<W>) -> Result<()> {
        w.write_bytes(&CHUNK_MAGIC)?;
        w.write_i32(self.chunk_index)?;
        w.write_i32(self.original_size)?;
        w.write_i32(self.stored_size)?;
        w.write_u32(self.checksum)?;
        w.write_u32(self.flags.to_u32())?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut ByteReader<R>) -> Result<Self> {
        let magic = r.read_array::<4>()?;
        if magic != CHUNK_MAGIC {
            return Err(ApackError::format("bad chunk magic"));
        }
        let chunk_index = r.read_i32()?;
        let original_size = r.read_i32()?;
        let stored_size = r.read_i32()?;
        if original_size < 0 || stored_size < 0 {
            return Err(ApackError::format("chunk header has a negative size field"));
        }
        let checksum = r.read_u32()?;
        let flags = ChunkFlags::from_u32(r.read_u32()?);
        Ok(Self {
            chunk_index,
            original_size,
            stored_size,
            checksum,
            flags,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip() {
        let header = ChunkHeader {
            chunk_index: 3,
            original_size: 4096,
            stored_size: 2048,
            checksum: 0xCAFEBABE,
            flags: ChunkFlags {
                last: true,
                compressed: true,
                encrypted: false,
            },
        };
        let mut w = ByteWriter::new(Vec::new());
        header.write_to(&mut w).unwrap();
        assert_eq!(w.bytes_written(), CHUNK_HEADER_SIZE);
        let buf = w.into_inner();

        let mut r = ByteReader::new(Cursor::new(buf));
        let parsed = ChunkHeader::read_from(&mut r).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn unknown_reserved_bits_ignored() {
        let mut w = ByteWriter::new(Vec::new());
        w.write_bytes(&CHUNK_MAGIC).unwrap();
        w.write_i32(0).unwrap();
        w.write_i32(0).unwrap();
        w.write_i32(0).unwrap();
        w.write_u32(0).unwrap();
        w.write_u32(0xFFFF_FFF8).unwrap(); // all reserved bits set, LAST/COMPRESSED/ENCRYPTED clear
        let buf = w.into_inner();

        let mut r = ByteReader::new(Cursor::new(buf));
        let parsed = ChunkHeader::read_from(&mut r).unwrap();
        assert!(!parsed.flags.last);
        assert!(!parsed.flags.compressed);
        assert!(!parsed.flags.encrypted);
    }
}
