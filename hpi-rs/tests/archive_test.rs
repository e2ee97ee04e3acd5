mod common;

use common::{build_archive, open_archive, pattern, CHUNK_SIZE};
use hpi_rs::compression_scheme::CompressionScheme;
use hpi_rs::error::HpiError;
use hpi_rs::hpi_archive::HpiArchive;
use std::io::Cursor;

const KEY: u8 = 0x7D;

#[test]
fn open_finds_every_file_with_declared_size() {
    let files: Vec<(&str, &[u8], CompressionScheme)> = vec![
        ("readme.txt", b"hello", CompressionScheme::None),
        ("maps/Coast.tnt", b"tnt bytes here", CompressionScheme::Lz77),
        ("maps/Coast.ota", b"[GlobalHeader]", CompressionScheme::ZLib),
        ("units/deep/core.fbi", b"x", CompressionScheme::None),
    ];
    let archive = open_archive(build_archive(KEY, &files));

    for (path, data, _) in &files {
        let file = archive
            .find_file(path)
            .unwrap_or_else(|| panic!("missing {path}"));
        assert_eq!(file.size as usize, data.len(), "size mismatch for {path}");
    }
    assert!(archive.find_directory("maps").is_some());
    assert!(archive.find_directory("units/deep").is_some());
}

#[test]
fn lookups_are_case_insensitive() {
    let archive = open_archive(build_archive(
        KEY,
        &[("Maps/Coast.TNT", b"payload", CompressionScheme::None)],
    ));

    let upper = archive.find_file("MAPS/COAST.TNT").expect("upper");
    let lower = archive.find_file("maps/coast.tnt").expect("lower");
    assert_eq!(upper, lower);
    assert!(archive.find_directory("mApS").is_some());
}

#[test]
fn missing_paths_are_not_errors() {
    let archive = open_archive(build_archive(
        KEY,
        &[("maps/a.tnt", b"data", CompressionScheme::None)],
    ));

    assert!(archive.find_file("maps/missing.tnt").is_none());
    assert!(archive.find_file("nowhere/a.tnt").is_none());
    assert!(archive.find_directory("nowhere").is_none());
    // A file component used as a directory is also just "not found".
    assert!(archive.find_file("maps/a.tnt/deeper").is_none());
}

#[test]
fn rejects_bad_marker_and_version() {
    let good = build_archive(KEY, &[("a", b"x", CompressionScheme::None)]);

    let mut bad_marker = good.clone();
    bad_marker[0] = b'X';
    match HpiArchive::open(Cursor::new(bad_marker)) {
        Err(HpiError::FormatError(_)) => {}
        other => panic!("expected FormatError, got {other:?}"),
    }

    let mut bad_version = good;
    bad_version[4] = 0xEE;
    match HpiArchive::open(Cursor::new(bad_version)) {
        Err(HpiError::FormatError(_)) => {}
        other => panic!("expected FormatError, got {other:?}"),
    }
}

#[test]
fn rejects_invalid_compression_tag() {
    // Plaintext archive (key 0) with a single root file; the builder lays
    // out root record @20, entry list @28, name @37, file record @39, so
    // the scheme tag byte sits at offset 47.
    let mut bytes = build_archive(0, &[("a", b"xyz", CompressionScheme::None)]);
    bytes[47] = 9;
    match HpiArchive::open(Cursor::new(bytes)) {
        Err(HpiError::FormatError(message)) => {
            assert!(message.contains("compression scheme"), "{message}")
        }
        other => panic!("expected FormatError, got {other:?}"),
    }
}

#[test]
fn runaway_offsets_fail_without_panicking() {
    // Plaintext archive so corrupted u32s land in the decoder unmasked.
    let bytes = build_archive(
        0,
        &[
            ("maps/a.tnt", b"one", CompressionScheme::None),
            ("maps/b.tnt", b"two", CompressionScheme::None),
        ],
    );
    let directory_size = u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize;

    // Every offset field pushed past the buffer must surface as an error,
    // never as an out-of-bounds read.
    for pos in 20..directory_size.saturating_sub(4) {
        let mut corrupt = bytes.clone();
        corrupt[pos..pos + 4].copy_from_slice(&[0xFF; 4]);
        let _ = HpiArchive::open(Cursor::new(corrupt));
    }

    // The root entry-list offset specifically reports a runaway.
    let mut corrupt = bytes.clone();
    corrupt[24..28].copy_from_slice(&[0xFF; 4]);
    match HpiArchive::open(Cursor::new(corrupt)) {
        Err(HpiError::FormatError(message)) => assert!(message.contains("runaway"), "{message}"),
        other => panic!("expected FormatError, got {other:?}"),
    }
}

#[test]
fn truncated_stream_fails_to_open() {
    let bytes = build_archive(KEY, &[("maps/a.tnt", b"payload", CompressionScheme::None)]);
    for len in [0, 4, 12, 25] {
        assert!(HpiArchive::open(Cursor::new(bytes[..len].to_vec())).is_err());
    }
}

#[test]
fn extraction_round_trips_every_scheme() {
    let large = pattern(2 * CHUNK_SIZE + 18_928);
    let cases: Vec<(&str, Vec<u8>)> = vec![
        ("empty", Vec::new()),
        ("single", vec![0x42]),
        ("large", large),
    ];

    for scheme in [
        CompressionScheme::None,
        CompressionScheme::Lz77,
        CompressionScheme::ZLib,
    ] {
        let files: Vec<(&str, &[u8], CompressionScheme)> = cases
            .iter()
            .map(|(name, data)| (*name, data.as_slice(), scheme))
            .collect();
        let mut archive = open_archive(build_archive(KEY, &files));

        for (name, data) in &cases {
            let file = archive.find_file(name).expect("present");
            let extracted = archive.extract_to_vec(&file).expect("extract");
            assert_eq!(&extracted, data, "{scheme:?}/{name} round trip");
        }
    }
}

#[test]
fn extraction_round_trips_on_plaintext_archives() {
    let data = pattern(1000);
    let mut archive = open_archive(build_archive(
        0,
        &[("blob", data.as_slice(), CompressionScheme::ZLib)],
    ));
    let file = archive.find_file("blob").unwrap();
    assert_eq!(archive.extract_to_vec(&file).unwrap(), data);
}

#[test]
fn extract_requires_exact_buffer_size() {
    let mut archive = open_archive(build_archive(
        KEY,
        &[("a", b"four", CompressionScheme::None)],
    ));
    let file = archive.find_file("a").unwrap();
    let mut short = vec![0u8; 3];
    match archive.extract(&file, &mut short) {
        Err(HpiError::FormatError(_)) => {}
        other => panic!("expected FormatError, got {other:?}"),
    }
}

#[test]
fn corrupt_chunk_fails_extraction() {
    let data = pattern(4096);
    let mut bytes = build_archive(KEY, &[("blob", data.as_slice(), CompressionScheme::ZLib)]);
    // Flip a byte of the compressed payload at the tail of the stream; the
    // chunk checksum has to catch it.
    let last = bytes.len() - 1;
    bytes[last] ^= 0xA5;
    let mut archive = open_archive(bytes);
    let file = archive.find_file("blob").unwrap();
    match archive.extract_to_vec(&file) {
        Err(HpiError::FormatError(_)) => {}
        other => panic!("expected FormatError, got {other:?}"),
    }
}

#[test]
fn truncated_payload_fails_extraction() {
    let data = pattern(4096);
    let bytes = build_archive(KEY, &[("blob", data.as_slice(), CompressionScheme::Lz77)]);
    let truncated = bytes[..bytes.len() - 100].to_vec();
    let mut archive = open_archive(truncated);
    let file = archive.find_file("blob").unwrap();
    assert!(archive.extract_to_vec(&file).is_err());
}

#[test]
fn walks_the_tree_in_entry_order() {
    let archive = open_archive(build_archive(
        KEY,
        &[
            ("maps/a.tnt", b"1", CompressionScheme::None),
            ("maps/sub/b.tnt", b"22", CompressionScheme::None),
            ("top.txt", b"333", CompressionScheme::None),
        ],
    ));

    let mut seen = Vec::new();
    archive
        .root()
        .for_each_file(&mut |path, file| seen.push((path.to_string(), file.size)));
    assert_eq!(
        seen,
        vec![
            ("top.txt".to_string(), 3),
            ("maps/a.tnt".to_string(), 1),
            ("maps/sub/b.tnt".to_string(), 2),
        ]
    );
}
