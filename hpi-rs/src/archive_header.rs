use byteorder::{LittleEndian, ReadBytesExt};
use std::io;
use std::io::Read;

/// Marker bytes "HAPI" that open every archive.
pub(crate) const HPI_MAGIC: u32 = 0x4950_4148;
/// The only archive format version this reader supports.
pub(crate) const HPI_VERSION: u32 = 0x0001_0000;

/// The fixed-size version record at the very start of an archive.
#[derive(Debug, Clone, Copy)]
pub(crate) struct HpiVersion {
    pub(crate) marker: u32,
    pub(crate) version: u32,
}

impl HpiVersion {
    pub(crate) fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            marker: reader.read_u32::<LittleEndian>()?,
            version: reader.read_u32::<LittleEndian>()?,
        })
    }
}

/// The fixed-size header record immediately following the version record.
///
/// `directory_size` is the absolute end offset of the directory region;
/// `start` is the absolute offset of the root directory record within it.
/// Only the low byte of `header_key` is meaningful.
#[derive(Debug, Clone, Copy)]
pub(crate) struct HpiHeader {
    pub(crate) directory_size: u32,
    pub(crate) header_key: u32,
    pub(crate) start: u32,
}

impl HpiHeader {
    pub(crate) fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            directory_size: reader.read_u32::<LittleEndian>()?,
            header_key: reader.read_u32::<LittleEndian>()?,
            start: reader.read_u32::<LittleEndian>()?,
        })
    }
}
