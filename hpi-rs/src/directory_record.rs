//! Raw records of the decrypted directory region.
//!
//! Every offset in these records comes from untrusted data and is an
//! absolute offset into the decrypted directory buffer. Each `parse` checks
//! its own record bounds; the runaway checks on the offsets a record points
//! at live with the tree decoder.

use crate::error::HpiError;
use byteorder::{ByteOrder, LittleEndian};

/// A raw directory record: an entry count and the offset of the contiguous
/// entry array it owns.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DirectoryRecord {
    pub(crate) entry_count: u32,
    pub(crate) entry_list_offset: u32,
}

impl DirectoryRecord {
    pub(crate) const SIZE: usize = 8;

    pub(crate) fn parse(buffer: &[u8], offset: usize) -> Result<Self, HpiError> {
        let end = offset
            .checked_add(Self::SIZE)
            .filter(|end| *end <= buffer.len())
            .ok_or_else(|| HpiError::FormatError("runaway directory record".into()))?;
        let record = &buffer[offset..end];
        Ok(Self {
            entry_count: LittleEndian::read_u32(&record[0..4]),
            entry_list_offset: LittleEndian::read_u32(&record[4..8]),
        })
    }
}

/// A raw entry record: where the entry's name and data records live, and
/// whether the data record is a directory or a file.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EntryRecord {
    pub(crate) name_offset: u32,
    pub(crate) data_offset: u32,
    pub(crate) is_directory: u8,
}

impl EntryRecord {
    pub(crate) const SIZE: usize = 9;

    pub(crate) fn parse(buffer: &[u8], offset: usize) -> Result<Self, HpiError> {
        let end = offset
            .checked_add(Self::SIZE)
            .filter(|end| *end <= buffer.len())
            .ok_or_else(|| HpiError::FormatError("runaway directory entry record".into()))?;
        let record = &buffer[offset..end];
        Ok(Self {
            name_offset: LittleEndian::read_u32(&record[0..4]),
            data_offset: LittleEndian::read_u32(&record[4..8]),
            is_directory: record[8],
        })
    }
}

/// A raw file record: the payload's absolute offset in the original stream,
/// its decompressed size, and its compression scheme tag.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FileRecord {
    pub(crate) data_offset: u32,
    pub(crate) file_size: u32,
    pub(crate) compression_tag: u8,
}

impl FileRecord {
    pub(crate) const SIZE: usize = 9;

    pub(crate) fn parse(buffer: &[u8], offset: usize) -> Result<Self, HpiError> {
        let end = offset
            .checked_add(Self::SIZE)
            .filter(|end| *end <= buffer.len())
            .ok_or_else(|| HpiError::FormatError("runaway file data offset".into()))?;
        let record = &buffer[offset..end];
        Ok(Self {
            data_offset: LittleEndian::read_u32(&record[0..4]),
            file_size: LittleEndian::read_u32(&record[4..8]),
            compression_tag: record[8],
        })
    }
}
