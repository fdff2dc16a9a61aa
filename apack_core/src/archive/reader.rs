//! Random-access archive reader over a seekable, clonable source.

use std::collections::HashMap;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

use tracing::{debug, warn};

use super::{entry_aad, name_hash};
use crate::byteio::ByteReader;
use crate::chunk::ChunkProcessor;
use crate::chunked_reader::ChunkedReader;
use crate::config::ReaderOptions;
use crate::error::{ApackError, Result};
use crate::format::{algorithm_ids, ChunkHeader, EncryptionBlock, EntryHeader, FileHeader, StreamTrailer, TocEntry, Trailer};
use crate::providers::ProviderSet;

/// A source an `ArchiveReader` can hand out independent, already-positioned
/// copies of, one per open entry stream, so concurrent reads never share a
/// cursor. `File::try_clone` and `Cursor<T>::clone` both satisfy this.
pub trait ClonableSource: Read + Seek + Sized {
    fn clone_source(&self) -> io::Result<Self>;
}

impl ClonableSource for std::fs::File {
    fn clone_source(&self) -> io::Result<Self> {
        self.try_clone()
    }
}

impl<T: Clone + AsRef<[u8]>> ClonableSource for std::io::Cursor<T> {
    fn clone_source(&self) -> io::Result<Self> {
        Ok(self.clone())
    }
}

#[derive(Debug, Clone)]
pub struct EntryInfo {
    pub id: u64,
    pub name: String,
    pub mime: String,
    pub original_size: u64,
    pub stored_size: u64,
    pub chunk_count: u32,
}

pub struct ArchiveReader<R: ClonableSource> {
    source: R,
    providers: Arc<ProviderSet>,
    header: FileHeader,
    dek: Option<zeroize::Zeroizing<Vec<u8>>>,
    trailer: Trailer,
    toc: Vec<TocEntry>,
    by_id: HashMap<u64, usize>,
    by_name_hash: HashMap<u32, Vec<usize>>,
}

/// Read the optional `EncryptionBlock` right after the `FileHeader` and
/// unwrap its DEK with a password-derived KEK. Shared by `ArchiveReader`
/// (container mode) and `StreamReader` (stream mode): both place the block
/// in the same position and unwrap it the same way.
fn read_dek<R: Read>(
    source: &mut R,
    header: &FileHeader,
    providers: &ProviderSet,
    password: Option<Vec<u8>>,
) -> Result<Option<zeroize::Zeroizing<Vec<u8>>>> {
    if !header.mode_flags.encrypted {
        return Ok(None);
    }

    let password = password.ok_or_else(|| ApackError::configuration("archive is encrypted but no password was supplied"))?;
    let block = {
        let mut r = ByteReader::new(&mut *source);
        EncryptionBlock::read_from(&mut r, |cipher_id| providers.encryption.by_id(cipher_id).map(|p| p.tag_size()))?
    };
    let cipher = providers.encryption.by_id(block.cipher_id)?;
    let kdf = providers.kdf.by_id(block.kdf_id)?;
    let kek = kdf.derive(
        &password,
        &block.salt,
        block.kdf_iterations,
        block.kdf_memory_kb,
        block.kdf_parallelism,
        cipher.key_size(),
    )?;
    let mut wrapped = block.wrapped_key.clone();
    wrapped.extend_from_slice(&block.wrapped_key_tag);
    let dek = cipher.decrypt_block(&wrapped, &kek, None).map_err(|_| ApackError::Authentication)?;
    Ok(Some(zeroize::Zeroizing::new(dek)))
}

impl<R: ClonableSource> ArchiveReader<R> {
    pub fn open(mut source: R, providers: Arc<ProviderSet>, options: ReaderOptions) -> Result<Self> {
        source.seek(SeekFrom::Start(0))?;
        let header = {
            let mut r = ByteReader::new(&mut source);
            FileHeader::read_from(&mut r)?
        };

        let dek = read_dek(&mut source, &header, &providers, options.password)?;

        let trailer_offset = header.trailer_offset;
        source.seek(SeekFrom::Start(trailer_offset))?;
        let trailer = {
            let mut r = ByteReader::new(&mut source);
            Trailer::read_from(&mut r)?
        };

        // Per the format's documented source inconsistency: a zero toc_offset
        // means "immediately precedes the trailer by toc_size bytes."
        let toc_offset = if trailer.toc_offset != 0 {
            trailer.toc_offset
        } else {
            warn!("trailer toc_offset is zero, falling back to trailer_offset - toc_size");
            trailer_offset.saturating_sub(trailer.toc_size)
        };

        source.seek(SeekFrom::Start(toc_offset))?;
        let mut toc = Vec::with_capacity(trailer.entry_count as usize);
        {
            let mut r = ByteReader::new(&mut source);
            for _ in 0..trailer.entry_count {
                toc.push(TocEntry::read_from(&mut r)?);
            }
        }

        let mut by_id = HashMap::with_capacity(toc.len());
        let mut by_name_hash: HashMap<u32, Vec<usize>> = HashMap::new();
        for (index, entry) in toc.iter().enumerate() {
            by_id.insert(entry.entry_id, index);
            by_name_hash.entry(entry.name_hash).or_default().push(index);
        }

        debug!(entry_count = toc.len(), "archive opened");
        Ok(Self {
            source,
            providers,
            header,
            dek,
            trailer,
            toc,
            by_id,
            by_name_hash,
        })
    }

    pub fn entry_count(&self) -> u64 {
        self.trailer.entry_count
    }

    pub fn chunk_size(&self) -> u32 {
        self.header.chunk_size
    }

    pub fn total_original_size(&self) -> u64 {
        self.trailer.total_original_size
    }

    pub fn total_stored_size(&self) -> u64 {
        self.trailer.total_stored_size
    }

    pub fn checksum_algorithm(&self) -> u8 {
        self.header.checksum_algorithm
    }

    pub fn list_entries(&self) -> Result<Vec<EntryInfo>> {
        self.toc
            .iter()
            .map(|toc_entry| {
                let header = self.read_entry_header(toc_entry.entry_offset)?;
                let chunk_count = self.count_chunks(toc_entry.entry_offset)?;
                Ok(EntryInfo {
                    id: toc_entry.entry_id,
                    name: header.name,
                    mime: header.mime,
                    original_size: toc_entry.original_size,
                    stored_size: toc_entry.stored_size,
                    chunk_count,
                })
            })
            .collect()
    }

    /// Count an entry's chunks by scanning `ChunkHeader`s only, without
    /// decrypting or decompressing any body.
    fn count_chunks(&self, entry_offset: u64) -> Result<u32> {
        let mut clone = self.source.clone_source()?;
        clone.seek(SeekFrom::Start(entry_offset))?;
        let mut r = ByteReader::new(clone);
        EntryHeader::read_from(&mut r)?;

        let mut count = 0u32;
        loop {
            let header = ChunkHeader::read_from(&mut r)?;
            r.read_bytes(header.stored_size as usize)?;
            count += 1;
            if header.flags.last {
                break;
            }
        }
        Ok(count)
    }

    fn read_entry_header(&self, offset: u64) -> Result<EntryHeader> {
        let mut clone = self.source.clone_source()?;
        clone.seek(SeekFrom::Start(offset))?;
        let mut r = ByteReader::new(clone);
        EntryHeader::read_from(&mut r)
    }

    fn toc_entry_by_id(&self, id: u64) -> Result<&TocEntry> {
        self.by_id
            .get(&id)
            .map(|&index| &self.toc[index])
            .ok_or_else(|| ApackError::format(format!("no entry with id {id}")))
    }

    /// Probe the name-hash bucket, then compare full names byte-for-byte:
    /// hash equality alone is not proof of identity.
    fn toc_entry_by_name(&self, name: &str) -> Result<&TocEntry> {
        let hash = name_hash(name);
        for &index in self.by_name_hash.get(&hash).into_iter().flatten() {
            let candidate = &self.toc[index];
            let header = self.read_entry_header(candidate.entry_offset)?;
            if header.name == name {
                return Ok(candidate);
            }
        }
        Err(ApackError::format(format!("no entry named '{name}'")))
    }

    fn open_toc_entry(&self, toc_entry: &TocEntry) -> Result<EntryStream<R>> {
        let mut clone = self.source.clone_source()?;
        clone.seek(SeekFrom::Start(toc_entry.entry_offset))?;
        let entry_header = {
            let mut r = ByteReader::new(&mut clone);
            EntryHeader::read_from(&mut r)?
        };

        let mut processor = ChunkProcessor::new();
        if entry_header.compression_id != algorithm_ids::COMPRESSION_NONE {
            processor = processor.with_compression(self.providers.compression.by_id(entry_header.compression_id)?, 0);
        }
        let aad = if entry_header.encryption_id != algorithm_ids::ENCRYPTION_NONE {
            let dek = self
                .dek
                .as_ref()
                .ok_or_else(|| ApackError::configuration("entry is encrypted but no DEK is available"))?;
            processor = processor.with_encryption(self.providers.encryption.by_id(entry_header.encryption_id)?, dek.to_vec());
            Some(entry_aad(entry_header.id, &entry_header.name))
        } else {
            None
        };

        let checksum = self.providers.checksum.by_id(self.header.checksum_algorithm)?;
        Ok(EntryStream {
            inner: ChunkedReader::new(clone, processor, checksum, aad),
        })
    }

    pub fn open_entry_by_id(&self, id: u64) -> Result<EntryStream<R>> {
        let toc_entry = self.toc_entry_by_id(id)?;
        self.open_toc_entry(toc_entry)
    }

    pub fn open_entry_by_name(&self, name: &str) -> Result<EntryStream<R>> {
        let toc_entry = self.toc_entry_by_name(name)?;
        self.open_toc_entry(toc_entry)
    }

    /// Validate every chunk's magic, index sequencing, and declared sizes
    /// without decrypting or decompressing any body. Header/TOC/trailer
    /// checksums are already validated by `open`.
    pub fn verify_quick(&self) -> Result<()> {
        for toc_entry in &self.toc {
            let mut clone = self.source.clone_source()?;
            clone.seek(SeekFrom::Start(toc_entry.entry_offset))?;
            let mut r = ByteReader::new(clone);
            let entry_header = EntryHeader::read_from(&mut r)?;

            let mut next_index = 0i32;
            loop {
                let header = ChunkHeader::read_from(&mut r)?;
                if header.chunk_index != next_index {
                    return Err(ApackError::format(format!(
                        "entry '{}': expected chunk index {next_index}, found {}",
                        entry_header.name, header.chunk_index
                    )));
                }
                r.read_bytes(header.stored_size as usize)?;
                next_index += 1;
                if header.flags.last {
                    break;
                }
            }
        }
        Ok(())
    }

    /// Decrypt/decompress every chunk of every entry and recompute its
    /// checksum, discarding the decoded bytes. Slower than `verify_quick`
    /// but detects tampering that only shows up once a chunk is decoded.
    pub fn verify_full(&self) -> Result<()> {
        for toc_entry in self.toc.clone() {
            let mut stream = self.open_toc_entry(&toc_entry)?;
            io::copy(&mut stream, &mut io::sink()).map_err(ApackError::Io)?;
        }
        Ok(())
    }
}

/// A single entry's decoded byte stream, backed by an independently
/// positioned clone of the archive's source.
pub struct EntryStream<R> {
    inner: ChunkedReader<R>,
}

impl<R: Read> Read for EntryStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

/// Sequential reader for the single-entry `FileHeader · [EncryptionBlock] ·
/// EntryHeader · Chunk* · StreamTrailer` layout: the non-seekable, read
/// side of `StreamWriter`. Works over any `Read` (a pipe or socket, not
/// just a file), since nothing here ever seeks.
pub struct StreamReader<R> {
    entry_id: u64,
    entry_name: String,
    entry_mime: String,
    inner: ChunkedReader<R>,
}

impl<R: Read> StreamReader<R> {
    pub fn open(mut source: R, providers: Arc<ProviderSet>, options: ReaderOptions) -> Result<Self> {
        let header = {
            let mut r = ByteReader::new(&mut source);
            FileHeader::read_from(&mut r)?
        };

        let dek = read_dek(&mut source, &header, &providers, options.password)?;

        let entry_header = {
            let mut r = ByteReader::new(&mut source);
            EntryHeader::read_from(&mut r)?
        };

        let mut processor = ChunkProcessor::new();
        if entry_header.compression_id != algorithm_ids::COMPRESSION_NONE {
            processor = processor.with_compression(providers.compression.by_id(entry_header.compression_id)?, 0);
        }
        let aad = if entry_header.encryption_id != algorithm_ids::ENCRYPTION_NONE {
            let dek = dek
                .as_ref()
                .ok_or_else(|| ApackError::configuration("entry is encrypted but no DEK is available"))?;
            processor = processor.with_encryption(providers.encryption.by_id(entry_header.encryption_id)?, dek.to_vec());
            Some(entry_aad(entry_header.id, &entry_header.name))
        } else {
            None
        };

        let checksum = providers.checksum.by_id(header.checksum_algorithm)?;

        Ok(Self {
            entry_id: entry_header.id,
            entry_name: entry_header.name,
            entry_mime: entry_header.mime,
            inner: ChunkedReader::new(source, processor, checksum, aad),
        })
    }

    pub fn entry_id(&self) -> u64 {
        self.entry_id
    }

    pub fn entry_name(&self) -> &str {
        &self.entry_name
    }

    pub fn entry_mime(&self) -> &str {
        &self.entry_mime
    }

    /// Consume the reader once the caller has read the entry to EOF,
    /// reading the `StreamTrailer` that follows and checking its declared
    /// totals against what was actually decoded.
    pub fn finish(self) -> Result<StreamTrailer> {
        if !self.inner.is_done() {
            return Err(ApackError::state("stream entry was not fully read before finish()"));
        }
        let chunk_count = self.inner.chunks_read() as u32;
        let total_original = self.inner.total_original();
        let total_stored = self.inner.total_stored();

        let mut source = self.inner.into_inner();
        let trailer = {
            let mut r = ByteReader::new(&mut source);
            StreamTrailer::read_from(&mut r)?
        };

        if trailer.chunk_count != chunk_count || trailer.original_size != total_original || trailer.stored_size != total_stored {
            return Err(ApackError::integrity("stream trailer totals disagree with the decoded chunk stream"));
        }
        Ok(trailer)
    }
}

impl<R: Read> Read for StreamReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}
