//! Sequential, chunk-at-a-time decoder implementing `std::io::Read`.
//!
//! Reads and verifies one `ChunkHeader` + body at a time, decrypting and
//! decompressing through the same [`crate::chunk::ChunkProcessor`] the
//! writer used, and stops once the LAST flag is seen regardless of what
//! follows in the underlying stream (trailing TOC/trailer bytes for
//! archive entries, for instance).

use std::io::{self, Read};

use crate::byteio::ByteReader;
use crate::chunk::ChunkProcessor;
use crate::error::{ApackError, Result};
use crate::format::ChunkHeader;
use crate::providers::ChecksumProvider;
use std::sync::Arc;

pub struct ChunkedReader<R> {
    source: ByteReader<R>,
    processor: ChunkProcessor,
    checksum: Arc<dyn ChecksumProvider>,
    aad: Option<Vec<u8>>,
    current: Vec<u8>,
    cursor: usize,
    next_index: i32,
    done: bool,
    total_original: u64,
    total_stored: u64,
}

impl<R: Read> ChunkedReader<R> {
    pub fn new(source: R, processor: ChunkProcessor, checksum: Arc<dyn ChecksumProvider>, aad: Option<Vec<u8>>) -> Self {
        Self {
            source: ByteReader::new(source),
            processor,
            checksum,
            aad,
            current: Vec::new(),
            cursor: 0,
            next_index: 0,
            done: false,
            total_original: 0,
            total_stored: 0,
        }
    }

    /// Number of chunks decoded so far (the LAST chunk counts once seen).
    pub fn chunks_read(&self) -> i32 {
        self.next_index
    }

    /// Sum of `original_size` across every chunk decoded so far.
    pub fn total_original(&self) -> u64 {
        self.total_original
    }

    /// Sum of `(header size + stored_size)` across every chunk decoded so
    /// far, matching how the writer accumulates `total_stored`.
    pub fn total_stored(&self) -> u64 {
        self.total_stored
    }

    /// True once the LAST chunk has been consumed and every byte has been
    /// handed back through `Read`.
    pub fn is_done(&self) -> bool {
        self.done && self.cursor >= self.current.len()
    }

    /// Recover the underlying source, positioned immediately after the
    /// entry's last chunk body. Only meaningful once [`Self::is_done`].
    pub fn into_inner(self) -> R {
        self.source.into_inner()
    }

    /// Decode the next chunk into `self.current`, or mark `done` once the
    /// LAST chunk has been consumed.
    fn advance(&mut self) -> Result<()> {
        if self.done {
            return Ok(());
        }

        let header = ChunkHeader::read_from(&mut self.source)?;
        if header.chunk_index != self.next_index {
            return Err(ApackError::format(format!(
                "expected chunk index {}, found {}",
                self.next_index, header.chunk_index
            )));
        }

        let body = self.source.read_bytes(header.stored_size as usize)?;
        let data = self.processor.process_for_read(
            &body,
            header.original_size as usize,
            header.flags.compressed,
            header.flags.encrypted,
            self.aad.as_deref(),
        )?;

        if self.checksum.compute(&data) != header.checksum {
            return Err(ApackError::integrity(format!(
                "checksum mismatch in chunk {}",
                header.chunk_index
            )));
        }

        self.total_original += data.len() as u64;
        self.total_stored += crate::format::CHUNK_HEADER_SIZE + header.stored_size as u64;

        self.current = data;
        self.cursor = 0;
        self.next_index += 1;
        self.done = header.flags.last;
        Ok(())
    }
}

impl<R: Read> Read for ChunkedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.cursor < self.current.len() {
                let take = (self.current.len() - self.cursor).min(buf.len());
                buf[..take].copy_from_slice(&self.current[self.cursor..self.cursor + take]);
                self.cursor += take;
                return Ok(take);
            }
            if self.done {
                return Ok(0);
            }
            self.advance().map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::byteio::ByteWriter;
    use crate::chunked_writer::ChunkedWriter;
    use apack_codecs::checksum::Crc32Checksum;

    #[test]
    fn stops_at_last_flag_ignoring_trailing_bytes() {
        let checksum: Arc<dyn ChecksumProvider> = Arc::new(Crc32Checksum);
        let mut buf = ByteWriter::new(Vec::new());
        {
            let mut writer = ChunkedWriter::new(&mut buf, 8, checksum.clone(), ChunkProcessor::new(), None);
            writer.write(b"0123456789").unwrap();
            writer.finish().unwrap();
        }
        let mut bytes = buf.into_inner();
        bytes.extend_from_slice(b"trailing garbage that is not a chunk");

        let mut reader = ChunkedReader::new(io::Cursor::new(bytes), ChunkProcessor::new(), checksum, None);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"0123456789");
    }

    #[test]
    fn detects_tampered_chunk_body() {
        let checksum: Arc<dyn ChecksumProvider> = Arc::new(Crc32Checksum);
        let mut buf = ByteWriter::new(Vec::new());
        {
            let mut writer = ChunkedWriter::new(&mut buf, 16, checksum.clone(), ChunkProcessor::new(), None);
            writer.write(b"hello chunk world").unwrap();
            writer.finish().unwrap();
        }
        let mut bytes = buf.into_inner();
        let tamper_at = bytes.len() - 5;
        bytes[tamper_at] ^= 0xFF;

        let mut reader = ChunkedReader::new(io::Cursor::new(bytes), ChunkProcessor::new(), checksum, None);
        let mut out = Vec::new();
        let err = reader.read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
