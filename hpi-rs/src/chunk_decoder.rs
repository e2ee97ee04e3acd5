//! Decodes the chunked compressed payloads of archive files.
//!
//! A compressed payload is a `u32` size array, one entry per chunk, followed
//! by the chunks themselves; a chunk holds 64 KiB of decompressed data
//! except for the last. Everything including the chunk headers is encrypted
//! with the archive mask, and each chunk may carry an additional positional
//! transform of its own. The output length is always known in advance and
//! the decoder refuses to write a single byte past it.

use crate::chunk_header::{ChunkHeader, CHUNK_MAGIC};
use crate::compression_scheme::CompressionScheme;
use crate::error::HpiError;
use crate::key_schedule::read_and_decrypt;
use byteorder::{ByteOrder, LittleEndian};
use flate2::read::ZlibDecoder;
use std::io::{Read, Seek};

/// Decompressed bytes per chunk, fixed by the format.
pub(crate) const CHUNK_SIZE: usize = 65536;

/// Reads a complete chunked payload from the stream's current position and
/// decodes it into `out`, which must be exactly the file's decompressed size.
pub(crate) fn extract_compressed<R: Read + Seek>(
    stream: &mut R,
    key: u8,
    out: &mut [u8],
) -> Result<(), HpiError> {
    let chunk_count = out.len().div_ceil(CHUNK_SIZE);
    if chunk_count == 0 {
        return Ok(());
    }

    let mut size_array = vec![0u8; chunk_count * 4];
    read_and_decrypt(stream, key, &mut size_array)?;
    let chunk_sizes: Vec<u32> = size_array
        .chunks_exact(4)
        .map(LittleEndian::read_u32)
        .collect();

    let mut written = 0usize;
    for declared_size in chunk_sizes {
        let mut record = [0u8; ChunkHeader::SIZE];
        read_and_decrypt(stream, key, &mut record)?;
        let header = ChunkHeader::parse(&record);

        if header.marker != CHUNK_MAGIC {
            return Err(HpiError::FormatError(format!(
                "invalid chunk marker {:#010X}",
                header.marker
            )));
        }
        if header.compressed_size as usize + ChunkHeader::SIZE != declared_size as usize {
            return Err(HpiError::FormatError(
                "chunk size disagrees with payload size array".into(),
            ));
        }

        let mut payload = Vec::new();
        payload
            .try_reserve_exact(header.compressed_size as usize)
            .map_err(|_| HpiError::FormatError("chunk too large to buffer".into()))?;
        payload.resize(header.compressed_size as usize, 0);
        read_and_decrypt(stream, key, &mut payload)?;

        if checksum(&payload) != header.checksum {
            return Err(HpiError::FormatError("chunk checksum mismatch".into()));
        }
        if header.encrypted != 0 {
            decrypt_chunk(&mut payload);
        }

        let end = written
            .checked_add(header.decompressed_size as usize)
            .filter(|end| *end <= out.len())
            .ok_or_else(|| {
                HpiError::FormatError("decompressed chunk overruns output buffer".into())
            })?;
        let out_slice = &mut out[written..end];

        match CompressionScheme::from_tag(header.compression_tag)? {
            CompressionScheme::Lz77 => {
                let produced = lz77_decompress(&payload, out_slice)?;
                if produced != out_slice.len() {
                    return Err(HpiError::FormatError("truncated compressed chunk".into()));
                }
            }
            CompressionScheme::ZLib => zlib_decompress(&payload, out_slice)?,
            CompressionScheme::None => {
                return Err(HpiError::FormatError(
                    "chunk carries no compression scheme".into(),
                ));
            }
        }
        written = end;
    }

    if written != out.len() {
        return Err(HpiError::FormatError(
            "chunked payload shorter than declared file size".into(),
        ));
    }
    Ok(())
}

/// Wrapping byte-sum checksum over a chunk's stored payload.
pub(crate) fn checksum(payload: &[u8]) -> u32 {
    payload
        .iter()
        .fold(0u32, |sum, b| sum.wrapping_add(*b as u32))
}

/// Undoes the optional per-chunk positional transform.
pub(crate) fn decrypt_chunk(payload: &mut [u8]) {
    for (i, b) in payload.iter_mut().enumerate() {
        let pos = i as u8;
        *b = b.wrapping_sub(pos) ^ pos;
    }
}

/// Decodes the game's LZ77-style stream into `out`, returning how many
/// bytes were produced.
///
/// The codec uses a 4096-byte window with the write pointer starting at
/// index 1. A tag byte supplies eight LSB-first flags: flag 0 is a literal,
/// flag 1 is a little-endian pair whose high 12 bits give the window
/// position to copy from (zero terminates the stream) and whose low 4 bits
/// give the run length minus two.
fn lz77_decompress(input: &[u8], out: &mut [u8]) -> Result<usize, HpiError> {
    let mut window = [0u8; 4096];
    let mut window_pos = 1usize;
    let mut in_pos = 0usize;
    let mut out_pos = 0usize;

    loop {
        let tag = *input
            .get(in_pos)
            .ok_or_else(|| HpiError::FormatError("truncated compressed chunk".into()))?;
        in_pos += 1;

        let mut mask = 1u32;
        while mask < 0x100 {
            if tag as u32 & mask == 0 {
                let byte = *input
                    .get(in_pos)
                    .ok_or_else(|| HpiError::FormatError("truncated compressed chunk".into()))?;
                in_pos += 1;
                if out_pos >= out.len() {
                    return Err(HpiError::FormatError(
                        "decompressed chunk overruns output buffer".into(),
                    ));
                }
                out[out_pos] = byte;
                out_pos += 1;
                window[window_pos] = byte;
                window_pos = (window_pos + 1) & 0xFFF;
            } else {
                if in_pos + 2 > input.len() {
                    return Err(HpiError::FormatError("truncated compressed chunk".into()));
                }
                let pair = LittleEndian::read_u16(&input[in_pos..in_pos + 2]);
                in_pos += 2;
                let mut read_pos = (pair >> 4) as usize;
                if read_pos == 0 {
                    return Ok(out_pos);
                }
                let run = (pair & 0xF) as usize + 2;
                for _ in 0..run {
                    let byte = window[read_pos];
                    if out_pos >= out.len() {
                        return Err(HpiError::FormatError(
                            "decompressed chunk overruns output buffer".into(),
                        ));
                    }
                    out[out_pos] = byte;
                    out_pos += 1;
                    window[window_pos] = byte;
                    read_pos = (read_pos + 1) & 0xFFF;
                    window_pos = (window_pos + 1) & 0xFFF;
                }
            }
            mask <<= 1;
        }
    }
}

/// Decodes a zlib stream into `out`, which must be exactly the chunk's
/// declared decompressed size.
fn zlib_decompress(input: &[u8], out: &mut [u8]) -> Result<(), HpiError> {
    let mut decoder = ZlibDecoder::new(input);
    decoder
        .read_exact(out)
        .map_err(|e| HpiError::FormatError(format!("truncated compressed chunk: {e}")))?;

    let mut probe = [0u8; 1];
    match decoder.read(&mut probe) {
        Ok(0) => Ok(()),
        Ok(_) => Err(HpiError::FormatError(
            "decompressed chunk overruns output buffer".into(),
        )),
        Err(e) => Err(HpiError::FormatError(format!(
            "corrupt compressed chunk: {e}"
        ))),
    }
}
