//! Bounded-memory per-entry chunk writer.
//!
//! Takes a `&mut W`, not an owned sink: the archive writer keeps the sink
//! for the lifetime of the whole archive, and only lends it to one
//! `ChunkedWriter` at a time for the span of a single entry. Because
//! `finish` consumes `self`, "writes to a closed stream fail" is enforced
//! by the borrow checker at this layer rather than at runtime.

use std::sync::Arc;

use crate::byteio::ByteWriter;
use crate::chunk::ChunkProcessor;
use crate::error::Result;
use crate::format::{ChunkFlags, ChunkHeader};
use crate::providers::ChecksumProvider;

pub struct ChunkedWriteSummary {
    pub chunk_count: u32,
    pub original_size: u64,
    pub stored_size: u64,
    /// Checksum of the entry's full original byte stream, computed with the
    /// same algorithm as each chunk's `checksum32`, used for the entry's
    /// `TocEntry::entry_checksum`.
    pub entry_checksum: u32,
}

pub struct ChunkedWriter<'a, W> {
    sink: &'a mut ByteWriter<W>,
    chunk_size: usize,
    pending: Vec<u8>,
    next_index: i32,
    checksum: Arc<dyn ChecksumProvider>,
    entry_hasher: Box<dyn crate::providers::ChecksumHasher>,
    processor: ChunkProcessor,
    aad: Option<Vec<u8>>,
    total_original: u64,
    total_stored: u64,
    on_chunk: Option<Box<dyn FnMut(i32, &ChunkHeader) + 'a>>,
}

impl<'a, W: std::io::Write> ChunkedWriter<'a, W> {
    pub fn new(
        sink: &'a mut ByteWriter<W>,
        chunk_size: u32,
        checksum: Arc<dyn ChecksumProvider>,
        processor: ChunkProcessor,
        aad: Option<Vec<u8>>,
    ) -> Self {
        let entry_hasher = checksum.hasher();
        Self {
            sink,
            chunk_size: chunk_size as usize,
            pending: Vec::with_capacity(chunk_size as usize),
            next_index: 0,
            checksum,
            entry_hasher,
            processor,
            aad,
            total_original: 0,
            total_stored: 0,
            on_chunk: None,
        }
    }

    /// Register a callback invoked with `(index, header)` right after each
    /// chunk is flushed; the archive writer uses this to build the TOC
    /// entry and accumulate the entry-level checksum.
    pub fn on_chunk(mut self, callback: impl FnMut(i32, &ChunkHeader) + 'a) -> Self {
        self.on_chunk = Some(Box::new(callback));
        self
    }

    /// Buffer `data`, flushing whole chunks of `chunk_size` as they fill.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.pending.extend_from_slice(data);
        while self.pending.len() >= self.chunk_size {
            let chunk: Vec<u8> = self.pending.drain(..self.chunk_size).collect();
            self.flush_chunk(&chunk, false)?;
        }
        Ok(())
    }

    fn flush_chunk(&mut self, raw: &[u8], last: bool) -> Result<()> {
        let checksum = self.checksum.compute(raw);
        self.entry_hasher.update(raw);
        let processed = self.processor.process_for_write(raw, self.aad.as_deref())?;

        let header = ChunkHeader {
            chunk_index: self.next_index,
            original_size: processed.original_size as i32,
            stored_size: processed.stored_size as i32,
            checksum,
            flags: ChunkFlags {
                last,
                compressed: processed.compressed,
                encrypted: processed.encrypted,
            },
        };

        header.write_to(self.sink)?;
        self.sink.write_bytes(&processed.body)?;

        self.total_original += processed.original_size as u64;
        self.total_stored += crate::format::CHUNK_HEADER_SIZE + processed.stored_size as u64;

        if let Some(cb) = self.on_chunk.as_mut() {
            cb(self.next_index, &header);
        }

        self.next_index += 1;
        Ok(())
    }

    /// Flush any remaining buffered bytes as the LAST chunk (a zero-length
    /// LAST chunk if nothing was ever written) and return the totals.
    pub fn finish(mut self) -> Result<ChunkedWriteSummary> {
        let remaining = std::mem::take(&mut self.pending);
        self.flush_chunk(&remaining, true)?;

        Ok(ChunkedWriteSummary {
            chunk_count: self.next_index as u32,
            original_size: self.total_original,
            stored_size: self.total_stored,
            entry_checksum: self.entry_hasher.finalize(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunked_reader::ChunkedReader;
    use apack_codecs::checksum::Crc32Checksum;
    use std::io::Read;

    #[test]
    fn exact_multiple_of_chunk_size_still_emits_terminal_chunk() {
        let mut buf = ByteWriter::new(Vec::new());
        let checksum: Arc<dyn ChecksumProvider> = Arc::new(Crc32Checksum);
        let mut headers = Vec::new();
        {
            let mut writer = ChunkedWriter::new(&mut buf, 4, checksum, ChunkProcessor::new(), None)
                .on_chunk(|idx, header| headers.push((idx, *header)));
            writer.write(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
            let summary = writer.finish().unwrap();
            assert_eq!(summary.chunk_count, 3); // two full + one empty terminal
            assert_eq!(summary.original_size, 8);
        }
        assert_eq!(headers.len(), 3);
        assert!(headers[2].1.flags.last);
        assert_eq!(headers[2].1.original_size, 0);
    }

    #[test]
    fn empty_entry_emits_single_zero_length_last_chunk() {
        let mut buf = ByteWriter::new(Vec::new());
        let checksum: Arc<dyn ChecksumProvider> = Arc::new(Crc32Checksum);
        let writer = ChunkedWriter::new(&mut buf, 16, checksum, ChunkProcessor::new(), None);
        let summary = writer.finish().unwrap();
        assert_eq!(summary.chunk_count, 1);
        assert_eq!(summary.original_size, 0);
    }

    #[test]
    fn roundtrip_through_chunked_reader() {
        let data = b"the quick brown fox jumps over the lazy dog".to_vec();
        let mut buf = ByteWriter::new(Vec::new());
        let checksum: Arc<dyn ChecksumProvider> = Arc::new(Crc32Checksum);
        {
            let mut writer = ChunkedWriter::new(&mut buf, 10, checksum.clone(), ChunkProcessor::new(), None);
            writer.write(&data).unwrap();
            writer.finish().unwrap();
        }
        let bytes = buf.into_inner();

        let mut reader = ChunkedReader::new(std::io::Cursor::new(bytes), ChunkProcessor::new(), checksum, None);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }
}
