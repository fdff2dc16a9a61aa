use crate::byteio::{ByteReader, ByteWriter};
use crate::error::{ApackError, Result};
use std::io::{Read, Write};

pub const ENCRYPTION_BLOCK_MAGIC: [u8; 4] = *b"ENCR";

/// Fixed-size head of the encryption block, before the variable-length
/// salt/wrapped-key/tag bytes.
const FIXED_HEAD_SIZE: usize = 24;

#[derive(Debug, Clone)]
pub struct EncryptionBlock {
    pub kdf_id: u8,
    pub cipher_id: u8,
    pub kdf_iterations: u32,
    pub kdf_memory_kb: u32,
    pub kdf_parallelism: u32,
    pub salt: Vec<u8>,
    pub wrapped_key: Vec<u8>,
    pub wrapped_key_tag: Vec<u8>,
}

impl EncryptionBlock {
    pub fn write_to<W: Write>(&self, w: &mut ByteWriter<W>) -> Result<()> {
        if self.salt.len() > u16::MAX as usize || self.wrapped_key.len() > u16::MAX as usize {
            return Err(ApackError::format("salt/wrapped-key length exceeds u16"));
        }
        w.write_bytes(&ENCRYPTION_BLOCK_MAGIC)?;
        w.write_u8(self.kdf_id)?;
        w.write_u8(self.cipher_id)?;
        w.write_u16(0)?; // reserved
        w.write_u32(self.kdf_iterations)?;
        w.write_u32(self.kdf_memory_kb)?;
        w.write_u32(self.kdf_parallelism)?;
        w.write_u16(self.salt.len() as u16)?;
        w.write_u16(self.wrapped_key.len() as u16)?;
        w.write_bytes(&self.salt)?;
        w.write_bytes(&self.wrapped_key)?;
        w.write_bytes(&self.wrapped_key_tag)?;
        Ok(())
    }

    /// `tag_size_for` is invoked with the just-read `cipher_id` to determine
    /// how many trailing bytes are the AEAD tag; the block has no explicit
    /// tag-length field since it is fixed per cipher.
    pub fn read_from<R: Read>(r: &mut ByteReader<R>, tag_size_for: impl FnOnce(u8) -> Result<usize>) -> Result<Self> {
        let magic = r.read_array::<4>()?;
        if magic != ENCRYPTION_BLOCK_MAGIC {
            return Err(ApackError::format("bad encryption block magic"));
        }
        let kdf_id = r.read_u8()?;
        let cipher_id = r.read_u8()?;
        let _reserved = r.read_u16()?;
        let kdf_iterations = r.read_u32()?;
        let kdf_memory_kb = r.read_u32()?;
        let kdf_parallelism = r.read_u32()?;
        let salt_length = r.read_u16()? as usize;
        let wrapped_key_length = r.read_u16()? as usize;
        let salt = r.read_bytes(salt_length)?;
        let wrapped_key = r.read_bytes(wrapped_key_length)?;
        let tag_size = tag_size_for(cipher_id)?;
        let wrapped_key_tag = r.read_bytes(tag_size)?;

        Ok(Self {
            kdf_id,
            cipher_id,
            kdf_iterations,
            kdf_memory_kb,
            kdf_parallelism,
            salt,
            wrapped_key,
            wrapped_key_tag,
        })
    }

    /// Total encoded size in bytes, including the variable-length tail.
    pub fn encoded_len(&self) -> u64 {
        FIXED_HEAD_SIZE as u64 + self.salt.len() as u64 + self.wrapped_key.len() as u64 + self.wrapped_key_tag.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip() {
        let block = EncryptionBlock {
            kdf_id: 1,
            cipher_id: 1,
            kdf_iterations: 3,
            kdf_memory_kb: 65536,
            kdf_parallelism: 4,
            salt: vec![9u8; 16],
            wrapped_key: vec![7u8; 32],
            wrapped_key_tag: vec![5u8; 16],
        };
        let mut w = ByteWriter::new(Vec::new());
        block.write_to(&mut w).unwrap();
        assert_eq!(w.bytes_written(), block.encoded_len());
        let buf = w.into_inner();

        let mut r = ByteReader::new(Cursor::new(buf));
        let parsed = EncryptionBlock::read_from(&mut r, |_cipher_id| Ok(16)).unwrap();
        assert_eq!(parsed.salt, block.salt);
        assert_eq!(parsed.wrapped_key, block.wrapped_key);
        assert_eq!(parsed.wrapped_key_tag, block.wrapped_key_tag);
        assert_eq!(parsed.kdf_iterations, 3);
    }
}
