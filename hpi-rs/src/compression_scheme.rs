use crate::error::HpiError;

/// Represents the compression scheme of a file entry or compressed chunk.
///
/// The scheme tag is stored as a single byte in the archive; any value other
/// than the three below means the archive is corrupt and decoding fails
/// rather than falling back to a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionScheme {
    /// Plain raw data, stored without compression.
    None,
    /// The game's LZ77-style sliding-window codec.
    Lz77,
    /// A standard zlib stream.
    ZLib,
}

impl CompressionScheme {
    /// Decodes a scheme tag byte, failing on unknown values.
    pub(crate) fn from_tag(tag: u8) -> Result<Self, HpiError> {
        match tag {
            0 => Ok(CompressionScheme::None),
            1 => Ok(CompressionScheme::Lz77),
            2 => Ok(CompressionScheme::ZLib),
            other => Err(HpiError::FormatError(format!(
                "invalid compression scheme tag {other:#04X}"
            ))),
        }
    }

    /// The tag byte this scheme is stored as.
    pub fn tag(self) -> u8 {
        match self {
            CompressionScheme::None => 0,
            CompressionScheme::Lz77 => 1,
            CompressionScheme::ZLib => 2,
        }
    }
}
