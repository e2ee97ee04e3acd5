use byteorder::{ByteOrder, LittleEndian};

/// Marker bytes "SQSH" that open every compressed chunk.
pub(crate) const CHUNK_MAGIC: u32 = 0x4853_5153;

/// Represents the header of one compressed chunk within a file payload.
///
/// `checksum` is the wrapping byte-sum of the stored payload as it appears
/// after archive-level decryption, before the per-chunk transform.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ChunkHeader {
    pub(crate) marker: u32,
    pub(crate) version: u8,
    pub(crate) compression_tag: u8,
    pub(crate) encrypted: u8,
    pub(crate) compressed_size: u32,
    pub(crate) decompressed_size: u32,
    pub(crate) checksum: u32,
}

impl ChunkHeader {
    pub(crate) const SIZE: usize = 19;

    /// Decodes a header from an already-decrypted 19-byte record.
    pub(crate) fn parse(record: &[u8; Self::SIZE]) -> Self {
        Self {
            marker: LittleEndian::read_u32(&record[0..4]),
            version: record[4],
            compression_tag: record[5],
            encrypted: record[6],
            compressed_size: LittleEndian::read_u32(&record[7..11]),
            decompressed_size: LittleEndian::read_u32(&record[11..15]),
            checksum: LittleEndian::read_u32(&record[15..19]),
        }
    }
}
