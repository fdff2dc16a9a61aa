use crate::byteio::{ByteReader, ByteWriter};
use crate::error::{ApackError, Result};
use std::io::{Read, Write};

pub const FILE_MAGIC: [u8; 6] = *b"APACK\0";

/// Total on-disk size of the file header: 24-byte head + entry-count:u64 +
/// trailer-offset:u64.
pub const FILE_HEADER_SIZE: u64 = 40;

/// CRC-32 of the header covers exactly this many leading bytes (magic
/// through checksum-algorithm).
const CRC_COVERED_LEN: usize = 16;

/// Byte offsets of the two fields the archive writer back-patches after the
/// body has been written.
pub const ENTRY_COUNT_OFFSET: u64 = 24;
pub const TRAILER_OFFSET_OFFSET: u64 = 32;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeFlags {
    pub stream_mode: bool,
    pub random_access: bool,
    pub encrypted: bool,
    pub compressed: bool,
}

impl ModeFlags {
    fn to_byte(self) -> u8 {
        (self.stream_mode as u8)
            | ((self.random_access as u8) << 1)
            | ((self.encrypted as u8) << 2)
            | ((self.compressed as u8) << 3)
    }

    fn from_byte(b: u8) -> Self {
        Self {
            stream_mode: b & 0b0001 != 0,
            random_access: b & 0b0010 != 0,
            encrypted: b & 0b0100 != 0,
            compressed: b & 0b1000 != 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileHeader {
    pub version_major: u16,
    pub version_minor: u16,
    pub version_patch: u16,
    pub compat_level: u16,
    pub mode_flags: ModeFlags,
    pub checksum_algorithm: u8,
    pub chunk_size: u32,
    /// Zero until the body is fully written and the header is back-patched
    /// (only possible on seekable sinks).
    pub entry_count: u64,
    /// Zero until back-patched; see [`entry_count`](Self::entry_count).
    pub trailer_offset: u64,
}

impl FileHeader {
    pub fn new(chunk_size: u32, checksum_algorithm: u8, mode_flags: ModeFlags) -> Self {
        Self {
            version_major: 1,
            version_minor: 0,
            version_patch: 0,
            compat_level: 1,
            mode_flags,
            checksum_algorithm,
            chunk_size,
            entry_count: 0,
            trailer_offset: 0,
        }
    }

    fn covered_bytes(&self) -> [u8; CRC_COVERED_LEN] {
        let mut buf = [0u8; CRC_COVERED_LEN];
        buf[0..6].copy_from_slice(&FILE_MAGIC);
        buf[6..8].copy_from_slice(&self.version_major.to_le_bytes());
        buf[8..10].copy_from_slice(&self.version_minor.to_le_bytes());
        buf[10..12].copy_from_slice(&self.version_patch.to_le_bytes());
        buf[12..14].copy_from_slice(&self.compat_level.to_le_bytes());
        buf[14] = self.mode_flags.to_byte();
        buf[15] = self.checksum_algorithm;
        buf
    }

    fn header_crc(&self) -> u32 {
        crc32fast_checksum(&self.covered_bytes())
    }

    pub fn write_to<W: Write>(&self, w: &mut ByteWriter<W>) -> Result<()> {
        w.write_bytes(&self.covered_bytes())?;
        w.write_u32(self.chunk_size)?;
        w.write_u32(self.header_crc())?;
        w.write_u64(self.entry_count)?;
        w.write_u64(self.trailer_offset)?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut ByteReader<R>) -> Result<Self> {
        let magic = r.read_array::<6>()?;
        if magic != FILE_MAGIC {
            return Err(ApackError::format("bad file magic: not an APACK archive"));
        }
        let version_major = r.read_u16()?;
        let version_minor = r.read_u16()?;
        let version_patch = r.read_u16()?;
        let compat_level = r.read_u16()?;
        let mode_flags = ModeFlags::from_byte(r.read_u8()?);
        let checksum_algorithm = r.read_u8()?;
        let chunk_size = r.read_u32()?;
        let header_crc = r.read_u32()?;
        let entry_count = r.read_u64()?;
        let trailer_offset = r.read_u64()?;

        let header = FileHeader {
            version_major,
            version_minor,
            version_patch,
            compat_level,
            mode_flags,
            checksum_algorithm,
            chunk_size,
            entry_count,
            trailer_offset,
        };

        if header.header_crc() != header_crc {
            return Err(ApackError::format("file header CRC-32 mismatch"));
        }
        if chunk_size < super::MIN_CHUNK_SIZE || chunk_size > super::MAX_CHUNK_SIZE {
            return Err(ApackError::format(format!(
                "chunk size {chunk_size} outside permitted range [{}, {}]",
                super::MIN_CHUNK_SIZE,
                super::MAX_CHUNK_SIZE
            )));
        }

        Ok(header)
    }
}

/// Local CRC-32 helper so format validation doesn't depend on the provider
/// registry (a corrupt header should fail before any provider is resolved).
fn crc32fast_checksum(bytes: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(bytes);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip() {
        let header = FileHeader::new(
            super::super::DEFAULT_CHUNK_SIZE,
            1,
            ModeFlags {
                stream_mode: false,
                random_access: true,
                encrypted: true,
                compressed: false,
            },
        );
        let mut w = ByteWriter::new(Vec::new());
        header.write_to(&mut w).unwrap();
        assert_eq!(w.bytes_written(), FILE_HEADER_SIZE);
        let buf = w.into_inner();

        let mut r = ByteReader::new(Cursor::new(buf));
        let parsed = FileHeader::read_from(&mut r).unwrap();
        assert_eq!(parsed.chunk_size, super::super::DEFAULT_CHUNK_SIZE);
        assert!(parsed.mode_flags.random_access);
        assert!(parsed.mode_flags.encrypted);
        assert!(!parsed.mode_flags.stream_mode);
    }

    #[test]
    fn bad_magic_rejected() {
        let mut buf = vec![0u8; FILE_HEADER_SIZE as usize];
        buf[0] = b'X';
        let mut r = ByteReader::new(Cursor::new(buf));
        assert!(matches!(FileHeader::read_from(&mut r), Err(ApackError::Format(_))));
    }

    #[test]
    fn corrupted_crc_rejected() {
        let header = FileHeader::new(super::super::DEFAULT_CHUNK_SIZE, 0, ModeFlags::default());
        let mut w = ByteWriter::new(Vec::new());
        header.write_to(&mut w).unwrap();
        let mut buf = w.into_inner();
        buf[7] ^= 0xFF; // flip a byte inside the CRC-covered region
        let mut r = ByteReader::new(Cursor::new(buf));
        assert!(matches!(FileHeader::read_from(&mut r), Err(ApackError::Format(_))));
    }
}
