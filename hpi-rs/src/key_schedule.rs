//! Key derivation and byte-stream decryption for HPI archives.
//!
//! An archive header carries a one-byte key. [`transform_key`] derives the
//! working mask applied to every byte of the directory region and of file
//! payloads. The cipher XORs each byte with its absolute stream offset and
//! the mask, so decryption must always know where in the stream a byte came
//! from. The transform is an involution: applying it twice restores the
//! original bytes, which is how the test encoders produce valid archives.

use crate::error::HpiError;
use std::io::{Read, Seek};

/// Derives the working decryption mask from the header's one-byte key.
///
/// A header key of zero marks a plaintext archive and maps to the identity
/// mask. Every other value is complemented after a two-bit rotate, matching
/// the game's scheme bit for bit.
pub fn transform_key(header_key: u8) -> u8 {
    match header_key {
        0 => 0,
        key => !((key << 2) | (key >> 6)),
    }
}

/// Decrypts `buf` in place with the given mask.
///
/// `seed` is the absolute stream offset of `buf[0]`; each byte is combined
/// with the low eight bits of its own offset. A mask of zero is a no-op.
pub fn decrypt(key: u8, seed: u32, buf: &mut [u8]) {
    if key == 0 {
        return;
    }
    for (i, b) in buf.iter_mut().enumerate() {
        let pos = seed.wrapping_add(i as u32) as u8;
        *b = (pos ^ key) ^ !*b;
    }
}

/// Reads exactly `buf.len()` bytes from the stream's current position and
/// decrypts them, seeding the cipher with that position.
pub fn read_and_decrypt<R: Read + Seek>(
    reader: &mut R,
    key: u8,
    buf: &mut [u8],
) -> Result<(), HpiError> {
    let seed = reader.stream_position()? as u32;
    reader.read_exact(buf)?;
    decrypt(key, seed, buf);
    Ok(())
}
