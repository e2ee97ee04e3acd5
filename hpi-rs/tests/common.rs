//! Shared fixtures: a minimal compliant archive encoder.
//!
//! The library deliberately has no packing API, so the tests build their
//! own archives: the same key schedule, directory layout, and chunk framing
//! the reader expects, produced independently so round-trips prove the
//! decoder against the format rather than against itself.

#![allow(dead_code)]

use byteorder::{ByteOrder, LittleEndian};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use hpi_rs::compression_scheme::CompressionScheme;
use hpi_rs::hpi_archive::HpiArchive;
use hpi_rs::key_schedule::{decrypt, transform_key};
use std::io::{Cursor, Write};

/// Decompressed bytes per chunk, fixed by the format.
pub const CHUNK_SIZE: usize = 65536;
/// End of the version + header records; the directory region starts here.
const HEADER_END: usize = 20;

/// A directory being laid out, in insertion order.
#[derive(Default)]
struct Dir {
    files: Vec<(String, Vec<u8>, CompressionScheme)>,
    dirs: Vec<(String, Dir)>,
}

impl Dir {
    fn insert(&mut self, path: &str, data: &[u8], scheme: CompressionScheme) {
        match path.split_once('/') {
            Some((dir_name, rest)) => {
                let index = match self.dirs.iter().position(|(name, _)| name == dir_name) {
                    Some(index) => index,
                    None => {
                        self.dirs.push((dir_name.to_string(), Dir::default()));
                        self.dirs.len() - 1
                    }
                };
                self.dirs[index].1.insert(rest, data, scheme);
            }
            None => self
                .files
                .push((path.to_string(), data.to_vec(), scheme)),
        }
    }
}

/// A file record position waiting for its payload offset.
struct Fixup {
    record_pos: usize,
    data: Vec<u8>,
    scheme: CompressionScheme,
}

/// Builds a complete archive holding the given files (slash-separated
/// paths), encrypted with the given raw header key.
pub fn build_archive(
    header_key: u8,
    files: &[(&str, &[u8], CompressionScheme)],
) -> Vec<u8> {
    let mut root = Dir::default();
    for (path, data, scheme) in files {
        root.insert(path, data, *scheme);
    }

    let mut region = Vec::new();
    let mut fixups = Vec::new();
    write_dir(&mut region, &mut fixups, &root);

    let directory_size = HEADER_END + region.len();
    let mut payloads = Vec::new();
    let key = transform_key(header_key);
    for fixup in fixups {
        let offset = directory_size + payloads.len();
        LittleEndian::write_u32(
            &mut region[fixup.record_pos..fixup.record_pos + 4],
            offset as u32,
        );
        payloads.extend(encode_payload(&fixup.data, fixup.scheme, key, offset as u32));
    }

    // Encryption is the decryption involution, seeded by absolute offset.
    decrypt(key, HEADER_END as u32, &mut region);

    let mut archive = Vec::new();
    archive.extend(u32::to_le_bytes(0x4950_4148)); // "HAPI"
    archive.extend(u32::to_le_bytes(0x0001_0000));
    archive.extend(u32::to_le_bytes(directory_size as u32));
    archive.extend(u32::to_le_bytes(header_key as u32));
    archive.extend(u32::to_le_bytes(HEADER_END as u32));
    archive.extend(region);
    archive.extend(payloads);
    archive
}

/// Opens an in-memory archive.
pub fn open_archive(bytes: Vec<u8>) -> HpiArchive<Cursor<Vec<u8>>> {
    HpiArchive::open(Cursor::new(bytes)).expect("fixture archive should open")
}

/// Serialises one directory into the region buffer, returning the absolute
/// offset of its directory record.
fn write_dir(region: &mut Vec<u8>, fixups: &mut Vec<Fixup>, dir: &Dir) -> u32 {
    let record_pos = region.len();
    region.extend([0u8; 8]);

    let entry_count = dir.files.len() + dir.dirs.len();
    let list_pos = region.len();
    region.extend(vec![0u8; entry_count * 9]);

    let mut entry_index = 0;
    for (name, data, scheme) in &dir.files {
        let name_offset = append_name(region, name);
        let file_record_pos = region.len();
        region.extend([0u8; 9]);
        LittleEndian::write_u32(
            &mut region[file_record_pos + 4..file_record_pos + 8],
            data.len() as u32,
        );
        region[file_record_pos + 8] = scheme.tag();
        fixups.push(Fixup {
            record_pos: file_record_pos,
            data: data.clone(),
            scheme: *scheme,
        });
        patch_entry(
            region,
            list_pos + entry_index * 9,
            name_offset,
            (HEADER_END + file_record_pos) as u32,
            0,
        );
        entry_index += 1;
    }
    for (name, subdir) in &dir.dirs {
        let name_offset = append_name(region, name);
        let data_offset = write_dir(region, fixups, subdir);
        patch_entry(region, list_pos + entry_index * 9, name_offset, data_offset, 1);
        entry_index += 1;
    }

    LittleEndian::write_u32(&mut region[record_pos..record_pos + 4], entry_count as u32);
    LittleEndian::write_u32(
        &mut region[record_pos + 4..record_pos + 8],
        (HEADER_END + list_pos) as u32,
    );
    (HEADER_END + record_pos) as u32
}

fn append_name(region: &mut Vec<u8>, name: &str) -> u32 {
    let offset = (HEADER_END + region.len()) as u32;
    region.extend(name.as_bytes());
    region.push(0);
    offset
}

fn patch_entry(region: &mut [u8], pos: usize, name_offset: u32, data_offset: u32, is_dir: u8) {
    LittleEndian::write_u32(&mut region[pos..pos + 4], name_offset);
    LittleEndian::write_u32(&mut region[pos + 4..pos + 8], data_offset);
    region[pos + 8] = is_dir;
}

/// Encodes a file payload as it appears in the archive stream at `offset`.
fn encode_payload(data: &[u8], scheme: CompressionScheme, key: u8, offset: u32) -> Vec<u8> {
    let mut payload = match scheme {
        CompressionScheme::None => data.to_vec(),
        CompressionScheme::Lz77 | CompressionScheme::ZLib => {
            let chunks: Vec<Vec<u8>> = data
                .chunks(CHUNK_SIZE)
                .map(|chunk| encode_chunk(chunk, scheme))
                .collect();
            let mut out = Vec::new();
            for chunk in &chunks {
                out.extend(u32::to_le_bytes(chunk.len() as u32));
            }
            for chunk in &chunks {
                out.extend(chunk);
            }
            out
        }
    };
    decrypt(key, offset, &mut payload);
    payload
}

/// Encodes one chunk: header, chunk-level encryption, checksum.
fn encode_chunk(data: &[u8], scheme: CompressionScheme) -> Vec<u8> {
    let compressed = match scheme {
        CompressionScheme::Lz77 => lz77_compress(data),
        CompressionScheme::ZLib => zlib_compress(data),
        CompressionScheme::None => unreachable!("raw payloads are not chunked"),
    };

    // The chunk transform's inverse: stored = (plain ^ i) + i.
    let stored: Vec<u8> = compressed
        .iter()
        .enumerate()
        .map(|(i, b)| (b ^ i as u8).wrapping_add(i as u8))
        .collect();
    let checksum: u32 = stored.iter().fold(0u32, |sum, b| sum.wrapping_add(*b as u32));

    let mut chunk = Vec::with_capacity(19 + stored.len());
    chunk.extend(u32::to_le_bytes(0x4853_5153)); // "SQSH"
    chunk.push(0x02);
    chunk.push(scheme.tag());
    chunk.push(1); // chunk-level encryption on
    chunk.extend(u32::to_le_bytes(stored.len() as u32));
    chunk.extend(u32::to_le_bytes(data.len() as u32));
    chunk.extend(u32::to_le_bytes(checksum));
    chunk.extend(stored);
    chunk
}

/// All-literal encoding of the game's LZ77-style stream: tag bytes of eight
/// clear flags, with the terminating pointer pair folded into the last
/// group.
fn lz77_compress(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    for group in data.chunks(8) {
        if group.len() == 8 {
            out.push(0x00);
            out.extend(group);
        } else {
            out.push(1 << group.len());
            out.extend(group);
            out.extend([0u8, 0]);
            return out;
        }
    }
    out.push(0x01);
    out.extend([0u8, 0]);
    out
}

fn zlib_compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// A deterministic pseudo-random byte pattern for multi-chunk payloads.
pub fn pattern(len: usize) -> Vec<u8> {
    let mut state = 0x12345678u32;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            (state >> 16) as u8
        })
        .collect()
}
