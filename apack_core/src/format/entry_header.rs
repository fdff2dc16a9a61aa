use super::attribute::Attribute;
use crate::byteio::{ByteReader, ByteWriter};
use crate::error::{ApackError, Result};
use std::io::{Read, Write};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryFlags {
    pub compressed: bool,
    pub encrypted: bool,
    pub has_ecc: bool,
}

impl EntryFlags {
    fn to_byte(self) -> u8 {
        (self.compressed as u8) | ((self.encrypted as u8) << 1) | ((self.has_ecc as u8) << 2)
    }

    fn from_byte(b: u8) -> Self {
        Self {
            compressed: b & 0b001 != 0,
            encrypted: b & 0b010 != 0,
            has_ecc: b & 0b100 != 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EntryHeader {
    pub id: u64,
    pub name: String,
    pub mime: String,
    pub attributes: Vec<Attribute>,
    pub compression_id: u8,
    pub encryption_id: u8,
    pub flags: EntryFlags,
}

impl EntryHeader {
    pub fn write_to<W: Write>(&self, w: &mut ByteWriter<W>) -> Result<()> {
        if self.name.len() > u16::MAX as usize {
            return Err(ApackError::format("entry name exceeds 65535 bytes"));
        }
        if self.attributes.len() > u16::MAX as usize {
            return Err(ApackError::format("too many attributes on one entry"));
        }
        w.write_u64(self.id)?;
        w.write_str_u16(&self.name)?;
        w.write_str_u16(&self.mime)?;
        w.write_u16(self.attributes.len() as u16)?;
        for attr in &self.attributes {
            attr.write_to(w)?;
        }
        w.write_u8(self.compression_id)?;
        w.write_u8(self.encryption_id)?;
        w.write_u8(self.flags.to_byte())?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut ByteReader<R>) -> Result<Self> {
        let id = r.read_u64()?;
        let name = r.read_str_u16()?;
        let mime = r.read_str_u16()?;
        let attribute_count = r.read_u16()?;
        let mut attributes = Vec::with_capacity(attribute_count as usize);
        for _ in 0..attribute_count {
            attributes.push(Attribute::read_from(r)?);
        }
        let compression_id = r.read_u8()?;
        let encryption_id = r.read_u8()?;
        let flags = EntryFlags::from_byte(r.read_u8()?);

        Ok(Self {
            id,
            name,
            mime,
            attributes,
            compression_id,
            encryption_id,
            flags,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::attribute::AttributeValue;
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip() {
        let header = EntryHeader {
            id: 42,
            name: "docs/readme.md".into(),
            mime: "text/markdown".into(),
            attributes: vec![Attribute {
                key: "created-by".into(),
                value: AttributeValue::String("apack".into()),
            }],
            compression_id: 1,
            encryption_id: 1,
            flags: EntryFlags {
                compressed: true,
                encrypted: true,
                has_ecc: false,
            },
        };
        let mut w = ByteWriter::new(Vec::new());
        header.write_to(&mut w).unwrap();
        let buf = w.into_inner();

        let mut r = ByteReader::new(Cursor::new(buf));
        let parsed = EntryHeader::read_from(&mut r).unwrap();
        assert_eq!(parsed.id, 42);
        assert_eq!(parsed.name, "docs/readme.md");
        assert_eq!(parsed.attributes.len(), 1);
        assert!(parsed.flags.compressed);
        assert!(parsed.flags.encrypted);
        assert!(!parsed.flags.has_ecc);
    }
}
