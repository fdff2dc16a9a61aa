//! End-to-end archive scenarios: every combination a caller embedding this
//! crate directly (not through the CLI) is expected to exercise.

use std::io::{Cursor, Read};
use std::sync::Arc;

use apack_core::config::{CompressionConfig, EncryptionConfig, ReaderOptions, WriterOptions};
use apack_core::error::ApackError;
use apack_core::format::algorithm_ids;
use apack_core::providers::ProviderSet;
use apack_core::{ArchiveReader, ArchiveWriter, StreamReader, StreamWriter};
use apack_codecs::register_defaults;

fn providers() -> Arc<ProviderSet> {
    let mut set = ProviderSet::new();
    register_defaults(&mut set).unwrap();
    Arc::new(set)
}

fn write_archive(entries: &[(&str, &[u8])], options: WriterOptions) -> Vec<u8> {
    let providers = providers();
    let mut writer = ArchiveWriter::create(Cursor::new(Vec::new()), providers, options).unwrap();
    for (name, data) in entries {
        writer.add_entry(0, name, "application/octet-stream", vec![], Cursor::new(data.to_vec())).unwrap();
    }
    writer.close().unwrap();
    writer.into_inner().into_inner()
}

fn read_all(reader: &mut impl Read) -> Vec<u8> {
    let mut out = Vec::new();
    reader.read_to_end(&mut out).unwrap();
    out
}

#[test]
fn roundtrip_every_compression_and_encryption_combination() {
    let compressions = [None, Some(algorithm_ids::COMPRESSION_ZSTD), Some(algorithm_ids::COMPRESSION_LZ4)];
    let encryptions = [None, Some(algorithm_ids::ENCRYPTION_AES_256_GCM), Some(algorithm_ids::ENCRYPTION_CHACHA20_POLY1305)];

    // Repetitive payload so zstd/lz4 actually shrink it.
    let payload = vec![b'a'; 8192];

    for compression_id in compressions {
        for cipher_id in encryptions {
            let options = WriterOptions {
                chunk_size: 4096,
                checksum_algorithm: algorithm_ids::CHECKSUM_XXH3_64,
                compression: compression_id.map(|algorithm_id| CompressionConfig { algorithm_id, level: 3 }),
                encryption: cipher_id.map(|cipher_id| EncryptionConfig {
                    cipher_id,
                    kdf_id: algorithm_ids::KDF_ARGON2ID,
                    password: b"correct horse battery staple".to_vec(),
                    kdf_iterations: 2,
                    kdf_memory_kb: 8192,
                    kdf_parallelism: 1,
                }),
            };

            let bytes = write_archive(&[("payload.bin", &payload)], options);

            let providers = providers();
            let password = if cipher_id.is_some() {
                Some(b"correct horse battery staple".to_vec())
            } else {
                None
            };
            let mut reader = ArchiveReader::open(Cursor::new(bytes), providers, ReaderOptions { password }).unwrap();
            let mut stream = reader.open_entry_by_name("payload.bin").unwrap();
            assert_eq!(read_all(&mut stream), payload);
        }
    }
}

#[test]
fn random_access_by_id_and_by_name() {
    let options = WriterOptions::default();
    let bytes = write_archive(&[("a.txt", b"one"), ("b.txt", b"two"), ("c.txt", b"three")], options);

    let providers = providers();
    let reader = ArchiveReader::open(Cursor::new(bytes), providers, ReaderOptions::default()).unwrap();
    assert_eq!(reader.entry_count(), 3);

    let mut by_name = reader.open_entry_by_name("b.txt").unwrap();
    assert_eq!(read_all(&mut by_name), b"two");

    let entries = reader.list_entries().unwrap();
    let c_id = entries.iter().find(|e| e.name == "c.txt").unwrap().id;
    let mut by_id = reader.open_entry_by_id(c_id).unwrap();
    assert_eq!(read_all(&mut by_id), b"three");
}

#[test]
fn empty_entry_roundtrips() {
    let bytes = write_archive(&[("empty.bin", b"")], WriterOptions::default());
    let providers = providers();
    let reader = ArchiveReader::open(Cursor::new(bytes), providers, ReaderOptions::default()).unwrap();
    let mut stream = reader.open_entry_by_name("empty.bin").unwrap();
    assert_eq!(read_all(&mut stream), b"");
}

#[test]
fn entry_exactly_aligned_to_chunk_boundary() {
    let chunk_size = 1024u32;
    let data = vec![7u8; (chunk_size * 3) as usize];
    let options = WriterOptions {
        chunk_size,
        ..WriterOptions::default()
    };
    let bytes = write_archive(&[("aligned.bin", &data)], options);

    let providers = providers();
    let reader = ArchiveReader::open(Cursor::new(bytes), providers, ReaderOptions::default()).unwrap();
    let entries = reader.list_entries().unwrap();
    assert_eq!(entries[0].chunk_count, 3);
    let mut stream = reader.open_entry_by_name("aligned.bin").unwrap();
    assert_eq!(read_all(&mut stream), data);
}

#[test]
fn wrong_password_is_rejected_without_detail() {
    let options = WriterOptions {
        encryption: Some(EncryptionConfig {
            cipher_id: algorithm_ids::ENCRYPTION_AES_256_GCM,
            kdf_id: algorithm_ids::KDF_ARGON2ID,
            password: b"right password".to_vec(),
            kdf_iterations: 2,
            kdf_memory_kb: 8192,
            kdf_parallelism: 1,
        }),
        ..WriterOptions::default()
    };
    let bytes = write_archive(&[("secret.bin", b"shh")], options);

    let providers = providers();
    let err = ArchiveReader::open(
        Cursor::new(bytes),
        providers,
        ReaderOptions {
            password: Some(b"wrong password".to_vec()),
        },
    )
    .unwrap_err();
    assert!(matches!(err, ApackError::Authentication));
}

#[test]
fn tampered_chunk_body_fails_full_verify_but_not_quick() {
    let data = vec![b'z'; 5000];
    let options = WriterOptions {
        chunk_size: 1024,
        ..WriterOptions::default()
    };
    let mut bytes = write_archive(&[("payload.bin", &data)], options);

    // Flip a byte well past every header so framing (magic/index/size) still
    // parses but the checksum no longer matches.
    let flip_at = bytes.len() - 10;
    bytes[flip_at] ^= 0xFF;

    let providers = providers();
    let reader = ArchiveReader::open(Cursor::new(bytes), providers, ReaderOptions::default()).unwrap();

    reader.verify_quick().expect("chunk framing is untouched by a body-only bitflip");
    reader.verify_full().expect_err("tampered body must fail once decoded and checksummed");
}

#[test]
fn truncated_chunk_is_caught_by_quick_verify() {
    let data = vec![b'q'; 5000];
    let options = WriterOptions {
        chunk_size: 1024,
        ..WriterOptions::default()
    };
    let bytes = write_archive(&[("payload.bin", &data)], options);
    let truncated = bytes[..bytes.len() - 4096].to_vec();

    let providers = providers();
    // Likely fails during open (TOC/trailer live past the cut); if it somehow
    // survives open, quick verify must still catch the missing tail.
    match ArchiveReader::open(Cursor::new(truncated), providers, ReaderOptions::default()) {
        Ok(reader) => assert!(reader.verify_quick().is_err()),
        Err(_) => {}
    }
}

#[test]
fn stream_writer_single_entry_roundtrip() {
    let providers = providers();
    let writer = StreamWriter::create(Cursor::new(Vec::new()), providers.clone(), WriterOptions::default()).unwrap();
    let payload = b"a single stream entry".to_vec();
    let sink = writer
        .write_entry(0, "solo.bin", "application/octet-stream", vec![], Cursor::new(payload.clone()))
        .unwrap();
    let bytes = sink.into_inner();
    assert!(!bytes.is_empty());

    let mut reader = StreamReader::open(Cursor::new(bytes), providers, ReaderOptions::default()).unwrap();
    assert_eq!(reader.entry_name(), "solo.bin");
    assert_eq!(reader.entry_mime(), "application/octet-stream");
    let restored = read_all(&mut reader);
    assert_eq!(restored, payload);
    reader.finish().unwrap();
}

#[test]
fn duplicate_write_entry_on_stream_writer_is_rejected() {
    // A StreamWriter's `write_entry` consumes `self`, so a caller cannot
    // physically call it twice; this documents that guarantee rather than
    // exercising the (unreachable) guard directly.
    let providers = providers();
    let writer = StreamWriter::create(Cursor::new(Vec::new()), providers, WriterOptions::default()).unwrap();
    let _ = writer.write_entry(0, "one-shot.bin", "text/plain", vec![], Cursor::new(b"x".to_vec())).unwrap();
}
