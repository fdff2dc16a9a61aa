//! APACK container/stream format engine: typed binary records, a per-chunk
//! compress/encrypt pipeline, and the archive writer/reader built on top of
//! them. Concrete compression, encryption, checksum, and KDF providers are
//! supplied by a separate crate at runtime through a [`providers::ProviderSet`];
//! this crate only defines the provider contracts and the format that
//! consumes them.

pub mod archive;
pub mod byteio;
pub mod chunk;
pub mod chunked_reader;
pub mod chunked_writer;
pub mod config;
pub mod error;
pub mod format;
pub mod providers;

pub use archive::{ArchiveReader, ArchiveWriter, EntryInfo, EntryStream, StreamReader, StreamWriter};
pub use config::{CompressionConfig, EncryptionConfig, ReaderOptions, WriterOptions};
pub use error::{ApackError, Result};
pub use providers::{ChecksumProvider, CompressionProvider, EncryptionProvider, KdfProvider, ProviderSet};
