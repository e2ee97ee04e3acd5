use crate::compression_scheme::CompressionScheme;

/// Represents one file's metadata within an archive's directory tree.
///
/// The descriptor is all an extraction needs: where the payload starts in
/// the original stream, how it is compressed, and exactly how many bytes it
/// decompresses to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HpiFileDescriptor {
    /// How the payload is stored.
    pub scheme: CompressionScheme,
    /// Absolute offset of the payload within the archive stream.
    pub offset: u32,
    /// Exact decompressed size in bytes.
    pub size: u32,
}
