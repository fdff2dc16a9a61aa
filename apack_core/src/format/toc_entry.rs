use crate::byteio::{ByteReader, ByteWriter};
use crate::error::Result;
use std::io::{Read, Write};

/// entry_id:u64 + entry_offset:u64 + original_size:u64 + stored_size:u64 +
/// name_hash:u32 + entry_checksum:u32 = 40 bytes.
pub const TOC_ENTRY_SIZE: u64 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TocEntry {
    pub entry_id: u64,
    pub entry_offset: u64,
    pub original_size: u64,
    pub stored_size: u64,
    pub name_hash: u32,
    pub entry_checksum: u32,
}

impl TocEntry {
    pub fn write_to<W: Write>(&self, w: &mut ByteWriter<W>) -> Result<()> {
        w.write_u64(self.entry_id)?;
        w.write_u64(self.entry_offset)?;
        w.write_u64(self.original_size)?;
        w.write_u64(self.stored_size)?;
        w.write_u32(self.name_hash)?;
        w.write_u32(self.entry_checksum)?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut ByteReader<R>) -> Result<Self> {
        Ok(Self {
            entry_id: r.read_u64()?,
            entry_offset: r.read_u64()?,
            original_size: r.read_u64()?,
            stored_size: r.read_u64()?,
            name_hash: r.read_u32()?,
            entry_checksum: r.read_u32()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip() {
        let entry = TocEntry {
            entry_id: 7,
            entry_offset: 1024,
            original_size: 4096,
            stored_size: 2048,
            name_hash: 0x1234_5678,
            entry_checksum: 0xABCD_EF01,
        };
        let mut w = ByteWriter::new(Vec::new());
        entry.write_to(&mut w).unwrap();
        assert_eq!(w.bytes_written(), TOC_ENTRY_SIZE);
        let buf = w.into_inner();
        let mut r = ByteReader::new(Cursor::new(buf));
        assert_eq!(TocEntry::read_from(&mut r).unwrap(), entry);
    }
}
