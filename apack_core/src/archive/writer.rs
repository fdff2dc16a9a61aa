//! Container-mode archive writer: `FileHeader · [EncryptionBlock] ·
//! (EntryHeader · Chunk*)+ · TocEntry* · Trailer`.
//!
//! Requires `W: Write + Seek` so the header's `entry_count`/`trailer_offset`
//! fields can be back-patched once the body is fully written; `File` and
//! `Cursor<Vec<u8>>` both qualify. `close` must be called explicitly to
//! flush the trailer and back-patch the header: there is no `Drop` impl,
//! since a fallible operation on drop can only log, never report failure
//! to the caller.

use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use tracing::debug;

use super::{entry_aad, name_hash};
use crate::byteio::ByteWriter;
use crate::chunk::ChunkProcessor;
use crate::chunked_writer::ChunkedWriter;
use crate::config::WriterOptions;
use crate::error::{ApackError, Result};
use crate::format::{
    algorithm_ids, Attribute, EncryptionBlock, EntryFlags, EntryHeader, FileHeader, ModeFlags, StreamTrailer, TocEntry,
    Trailer, ENTRY_COUNT_OFFSET, TRAILER_OFFSET_OFFSET,
};
use crate::providers::ProviderSet;
use crate::config::EncryptionConfig;

/// Generate a random DEK, wrap it with a KEK derived from `enc`'s password,
/// and build the on-disk `EncryptionBlock`. Shared by the container and
/// stream writers; the wrap layout is `wrapped_key = nonce ‖ ciphertext`,
/// `wrapped_key_tag` split off the cipher's trailing AEAD tag.
fn establish_encryption(
    providers: &ProviderSet,
    enc: &EncryptionConfig,
) -> Result<(EncryptionBlock, zeroize::Zeroizing<Vec<u8>>)> {
    let cipher = providers.encryption.by_id(enc.cipher_id)?;
    let kdf = providers.kdf.by_id(enc.kdf_id)?;

    let dek = zeroize::Zeroizing::new(cipher.generate_key());
    let mut salt = vec![0u8; 16];
    getrandom(&mut salt);

    let kek = kdf.derive(
        &enc.password,
        &salt,
        enc.kdf_iterations,
        enc.kdf_memory_kb,
        enc.kdf_parallelism,
        cipher.key_size(),
    )?;
    let wrapped = cipher.encrypt_block(&dek, &kek, None)?;
    let tag_size = cipher.tag_size();
    if wrapped.len() < tag_size {
        return Err(ApackError::configuration("cipher produced output shorter than its own tag"));
    }
    let split = wrapped.len() - tag_size;
    let block = EncryptionBlock {
        kdf_id: enc.kdf_id,
        cipher_id: enc.cipher_id,
        kdf_iterations: enc.kdf_iterations,
        kdf_memory_kb: enc.kdf_memory_kb,
        kdf_parallelism: enc.kdf_parallelism,
        salt,
        wrapped_key: wrapped[..split].to_vec(),
        wrapped_key_tag: wrapped[split..].to_vec(),
    };
    debug!(cipher = cipher.name(), kdf = kdf.name(), "encryption block established");
    Ok((block, dek))
}

/// Reject a `chunk_size` outside the format's `[MIN_CHUNK_SIZE,
/// MAX_CHUNK_SIZE]` bound (spec invariant 7) before any bytes are written.
/// `0` in particular would make the chunked writer's fill loop never drain
/// its pending buffer.
fn validate_chunk_size(chunk_size: u32) -> Result<()> {
    if chunk_size < crate::format::MIN_CHUNK_SIZE || chunk_size > crate::format::MAX_CHUNK_SIZE {
        return Err(ApackError::configuration(format!(
            "chunk size {chunk_size} outside permitted range [{}, {}]",
            crate::format::MIN_CHUNK_SIZE,
            crate::format::MAX_CHUNK_SIZE
        )));
    }
    Ok(())
}

fn build_entry_processor(
    providers: &ProviderSet,
    options: &WriterOptions,
    dek: Option<&zeroize::Zeroizing<Vec<u8>>>,
    compression_id: u8,
    encryption_id: u8,
) -> Result<ChunkProcessor> {
    let mut processor = ChunkProcessor::new();
    if compression_id != algorithm_ids::COMPRESSION_NONE {
        let provider = providers.compression.by_id(compression_id)?;
        let level = options
            .compression
            .as_ref()
            .map(|c| c.level)
            .unwrap_or_else(|| provider.default_level());
        processor = processor.with_compression(provider, level);
    }
    if encryption_id != algorithm_ids::ENCRYPTION_NONE {
        let provider = providers.encryption.by_id(encryption_id)?;
        let dek = dek.ok_or_else(|| ApackError::configuration("entry requests encryption but no DEK is available"))?;
        processor = processor.with_encryption(provider, dek.to_vec());
    }
    Ok(processor)
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum State {
    Fresh,
    HeaderWritten,
    Closed,
}

pub struct ArchiveWriter<W: Write + Seek> {
    sink: ByteWriter<W>,
    providers: Arc<ProviderSet>,
    options: WriterOptions,
    state: State,
    toc: Vec<TocEntry>,
    next_entry_id: u64,
    dek: Option<zeroize::Zeroizing<Vec<u8>>>,
    total_original: u64,
    total_stored: u64,
}

impl<W: Write + Seek> ArchiveWriter<W> {
    pub fn create(sink: W, providers: Arc<ProviderSet>, options: WriterOptions) -> Result<Self> {
        validate_chunk_size(options.chunk_size)?;
        Ok(Self {
            sink: ByteWriter::new(sink),
            providers,
            options,
            state: State::Fresh,
            toc: Vec::new(),
            next_entry_id: 1,
            dek: None,
            total_original: 0,
            total_stored: 0,
        })
    }

    fn ensure_header_written(&mut self) -> Result<()> {
        if self.state != State::Fresh {
            return Ok(());
        }

        let mode_flags = ModeFlags {
            stream_mode: false,
            random_access: true,
            encrypted: self.options.encryption.is_some(),
            compressed: self.options.compression.is_some(),
        };
        let header = FileHeader::new(self.options.chunk_size, self.options.checksum_algorithm, mode_flags);
        header.write_to(&mut self.sink)?;

        if let Some(enc) = self.options.encryption.clone() {
            let (block, dek) = establish_encryption(&self.providers, &enc)?;
            block.write_to(&mut self.sink)?;
            self.dek = Some(dek);
        }

        self.state = State::HeaderWritten;
        Ok(())
    }

    /// Add one entry, streaming its content from `reader`. `id == 0` assigns
    /// the next monotonic id. Returns the id actually used.
    pub fn add_entry(&mut self, id: u64, name: &str, mime: &str, attributes: Vec<Attribute>, mut reader: impl Read) -> Result<u64> {
        self.ensure_header_written()?;
        if self.state == State::Closed {
            return Err(ApackError::state("writer is closed"));
        }

        let entry_id = if id != 0 {
            id
        } else {
            let assigned = self.next_entry_id;
            self.next_entry_id += 1;
            assigned
        };
        if entry_id >= self.next_entry_id {
            self.next_entry_id = entry_id + 1;
        }

        let entry_offset = self.sink.bytes_written();
        let compression_id = self
            .options
            .compression
            .as_ref()
            .map(|c| c.algorithm_id)
            .unwrap_or(algorithm_ids::COMPRESSION_NONE);
        let encryption_id = self
            .options
            .encryption
            .as_ref()
            .map(|e| e.cipher_id)
            .unwrap_or(algorithm_ids::ENCRYPTION_NONE);

        let entry_header = EntryHeader {
            id: entry_id,
            name: name.to_string(),
            mime: mime.to_string(),
            attributes,
            compression_id,
            encryption_id,
            flags: EntryFlags {
                compressed: compression_id != algorithm_ids::COMPRESSION_NONE,
                encrypted: encryption_id != algorithm_ids::ENCRYPTION_NONE,
                has_ecc: false,
            },
        };
        entry_header.write_to(&mut self.sink)?;

        let processor = build_entry_processor(&self.providers, &self.options, self.dek.as_ref(), compression_id, encryption_id)?;
        let aad = entry_header.flags.encrypted.then(|| entry_aad(entry_id, name));
        let checksum_provider = self.providers.checksum.by_id(self.options.checksum_algorithm)?;

        let summary = {
            let writer = ChunkedWriter::new(
                &mut self.sink,
                self.options.chunk_size,
                checksum_provider,
                processor,
                aad,
            );
            stream_into_writer(writer, &mut reader)?
        };

        self.total_original += summary.original_size;
        self.total_stored += summary.stored_size;

        self.toc.push(TocEntry {
            entry_id,
            entry_offset,
            original_size: summary.original_size,
            stored_size: summary.stored_size,
            name_hash: name_hash(name),
            entry_checksum: summary.entry_checksum,
        });

        Ok(entry_id)
    }

    /// Write the TOC and trailer, then back-patch the file header's
    /// `entry_count`/`trailer_offset` fields. A no-op if already closed.
    pub fn close(&mut self) -> Result<()> {
        self.close_impl()
    }

    /// Recover the underlying sink after closing (or abandoning) the writer.
    pub fn into_inner(self) -> W {
        self.sink.into_inner()
    }

    fn close_impl(&mut self) -> Result<()> {
        if self.state == State::Closed {
            return Ok(());
        }
        self.ensure_header_written()?;

        let toc_offset = self.sink.bytes_written();
        for entry in &self.toc {
            entry.write_to(&mut self.sink)?;
        }
        let toc_size = self.sink.bytes_written() - toc_offset;

        let toc_checksum = {
            let mut hasher = crc32fast::Hasher::new();
            for entry in &self.toc {
                let mut scratch = ByteWriter::new(Vec::new());
                entry.write_to(&mut scratch)?;
                hasher.update(&scratch.into_inner());
            }
            hasher.finalize()
        };

        let entry_count = self.toc.len() as u64;
        let trailer_offset = self.sink.bytes_written();
        let trailer = Trailer {
            trailer_version: 1,
            toc_offset,
            toc_size,
            entry_count,
            total_original_size: self.total_original,
            total_stored_size: self.total_stored,
            toc_checksum,
            file_size: trailer_offset + Trailer::ENCODED_LEN,
        };
        trailer.write_to(&mut self.sink)?;

        let inner = self.sink.get_mut();
        inner.seek(SeekFrom::Start(ENTRY_COUNT_OFFSET))?;
        inner.write_all(&entry_count.to_le_bytes())?;
        inner.seek(SeekFrom::Start(TRAILER_OFFSET_OFFSET))?;
        inner.write_all(&trailer_offset.to_le_bytes())?;
        inner.flush()?;

        debug!(entry_count, trailer_offset, "archive closed");
        self.state = State::Closed;
        Ok(())
    }
}

fn stream_into_writer<W: Write>(mut writer: ChunkedWriter<'_, W>, reader: &mut impl Read) -> Result<crate::chunked_writer::ChunkedWriteSummary> {
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        writer.write(&buf[..n])?;
    }
    writer.finish()
}

/// Fills `buf` with OS-provided random bytes, used only for the per-archive
/// encryption salt (never for key material itself, which providers generate
/// through their own RNG).
fn getrandom(buf: &mut [u8]) {
    use rand::RngCore;
    rand::rngs::OsRng.fill_bytes(buf);
}

/// Single-entry stream writer: `FileHeader · [EncryptionBlock] · EntryHeader
/// · Chunk* · StreamTrailer`. Works over any `Write`, including sinks that
/// cannot seek, since nothing here is ever back-patched.
pub struct StreamWriter<W: Write> {
    sink: ByteWriter<W>,
    providers: Arc<ProviderSet>,
    options: WriterOptions,
    dek: Option<zeroize::Zeroizing<Vec<u8>>>,
    entry_written: bool,
}

impl<W: Write> StreamWriter<W> {
    pub fn create(sink: W, providers: Arc<ProviderSet>, options: WriterOptions) -> Result<Self> {
        validate_chunk_size(options.chunk_size)?;
        let mut sink = ByteWriter::new(sink);
        let mode_flags = ModeFlags {
            stream_mode: true,
            random_access: false,
            encrypted: options.encryption.is_some(),
            compressed: options.compression.is_some(),
        };
        let header = FileHeader::new(options.chunk_size, options.checksum_algorithm, mode_flags);
        header.write_to(&mut sink)?;

        let dek = if let Some(enc) = &options.encryption {
            let (block, dek) = establish_encryption(&providers, enc)?;
            block.write_to(&mut sink)?;
            Some(dek)
        } else {
            None
        };

        Ok(Self {
            sink,
            providers,
            options,
            dek,
            entry_written: false,
        })
    }

    /// Write the archive's single entry and its `StreamTrailer`. Consumes
    /// `self`: a stream archive has exactly one entry.
    pub fn write_entry(mut self, id: u64, name: &str, mime: &str, attributes: Vec<Attribute>, mut reader: impl Read) -> Result<W> {
        if self.entry_written {
            return Err(ApackError::state("stream writer has already written its entry"));
        }

        let compression_id = self
            .options
            .compression
            .as_ref()
            .map(|c| c.algorithm_id)
            .unwrap_or(algorithm_ids::COMPRESSION_NONE);
        let encryption_id = self
            .options
            .encryption
            .as_ref()
            .map(|e| e.cipher_id)
            .unwrap_or(algorithm_ids::ENCRYPTION_NONE);

        let entry_header = EntryHeader {
            id: if id != 0 { id } else { 1 },
            name: name.to_string(),
            mime: mime.to_string(),
            attributes,
            compression_id,
            encryption_id,
            flags: EntryFlags {
                compressed: compression_id != algorithm_ids::COMPRESSION_NONE,
                encrypted: encryption_id != algorithm_ids::ENCRYPTION_NONE,
                has_ecc: false,
            },
        };
        entry_header.write_to(&mut self.sink)?;

        let processor = build_entry_processor(&self.providers, &self.options, self.dek.as_ref(), compression_id, encryption_id)?;
        let aad = entry_header.flags.encrypted.then(|| entry_aad(entry_header.id, name));
        let checksum_provider = self.providers.checksum.by_id(self.options.checksum_algorithm)?;

        let summary = {
            let writer = ChunkedWriter::new(&mut self.sink, self.options.chunk_size, checksum_provider, processor, aad);
            stream_into_writer(writer, &mut reader)?
        };

        let trailer = StreamTrailer {
            original_size: summary.original_size,
            stored_size: summary.stored_size,
            chunk_count: summary.chunk_count,
        };
        trailer.write_to(&mut self.sink)?;

        self.entry_written = true;
        Ok(self.sink.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::reader::ArchiveReader;
    use crate::config::ReaderOptions;
    use apack_codecs::register_defaults;
    use std::io::Cursor;

    fn providers() -> Arc<ProviderSet> {
        let mut set = ProviderSet::new();
        register_defaults(&mut set).unwrap();
        Arc::new(set)
    }

    #[test]
    fn roundtrip_two_entries_no_options() {
        let providers = providers();
        let mut writer = ArchiveWriter::create(Cursor::new(Vec::new()), providers.clone(), WriterOptions::default()).unwrap();
        writer.add_entry(0, "a.txt", "text/plain", vec![], Cursor::new(b"hello".to_vec())).unwrap();
        writer.add_entry(0, "b.bin", "application/octet-stream", vec![], Cursor::new(vec![7u8; 1024])).unwrap();
        writer.close().unwrap();
        let bytes = writer.into_inner().into_inner();

        let mut reader = ArchiveReader::open(Cursor::new(bytes), providers, ReaderOptions::default()).unwrap();
        assert_eq!(reader.entry_count(), 2);

        let mut out = Vec::new();
        reader.open_entry_by_name("a.txt").unwrap().read_to_end(&mut out).unwrap();
        assert_eq!(out, b"hello");

        let mut out2 = Vec::new();
        reader.open_entry_by_name("b.bin").unwrap().read_to_end(&mut out2).unwrap();
        assert_eq!(out2, vec![7u8; 1024]);
    }

    #[test]
    fn zero_chunk_size_is_rejected_at_create() {
        let options = WriterOptions {
            chunk_size: 0,
            ..WriterOptions::default()
        };
        let err = ArchiveWriter::create(Cursor::new(Vec::new()), providers(), options).unwrap_err();
        assert!(matches!(err, ApackError::Configuration(_)));
    }

    #[test]
    fn oversized_chunk_size_is_rejected_at_create() {
        let options = WriterOptions {
            chunk_size: crate::format::MAX_CHUNK_SIZE + 1,
            ..WriterOptions::default()
        };
        let err = ArchiveWriter::create(Cursor::new(Vec::new()), providers(), options).unwrap_err();
        assert!(matches!(err, ApackError::Configuration(_)));
    }
}
