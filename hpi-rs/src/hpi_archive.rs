use crate::archive_header::{HpiHeader, HpiVersion, HPI_MAGIC, HPI_VERSION};
use crate::chunk_decoder::extract_compressed;
use crate::compression_scheme::CompressionScheme;
use crate::directory_record::{DirectoryRecord, EntryRecord, FileRecord};
use crate::directory_tree::{HpiDirectory, HpiDirectoryEntry, HpiEntryData};
use crate::error::HpiError;
use crate::file_descriptor::HpiFileDescriptor;
use crate::key_schedule::{read_and_decrypt, transform_key};
use std::io::{Read, Seek, SeekFrom};

/// The format has no independent checksum on directory offsets, so a
/// crafted archive can point a directory record back at an ancestor. The
/// cap turns that cycle into a decode error instead of unbounded recursion.
const MAX_DIRECTORY_DEPTH: u32 = 64;

/// Represents one opened archive, providing access to its directory tree
/// and file contents.
///
/// `HpiArchive` owns its byte stream exclusively. Opening validates the
/// version and header records, derives the decryption mask (fixed for the
/// archive's lifetime), and decodes the whole directory tree up front; file
/// payloads are only read when extracted.
///
/// # Usage
///
/// ```no_run
/// use hpi_rs::hpi_archive::HpiArchive;
/// use std::fs::File;
/// use std::io::BufReader;
///
/// let stream = BufReader::new(File::open("totala1.hpi").unwrap());
/// let mut archive = HpiArchive::open(stream).unwrap();
///
/// if let Some(file) = archive.find_file("maps/Coast To Coast.tnt") {
///     let bytes = archive.extract_to_vec(&file).unwrap();
///     println!("{} bytes", bytes.len());
/// }
/// ```
///
/// # Thread Safety
///
/// An `HpiArchive` holds no shared state; it may move between threads, but
/// each instance (and its stream) must be used by one thread at a time.
/// Wrap it in a mutex to share it, as [`HpiCatalogue`](crate::hpi_catalogue::HpiCatalogue) does.
#[derive(Debug)]
pub struct HpiArchive<R> {
    /// The underlying byte stream, exclusively owned.
    stream: R,
    /// The working decryption mask derived at open time.
    key: u8,
    /// The decoded root directory.
    root: HpiDirectory,
}

impl<R: Read + Seek> HpiArchive<R> {
    /// Opens an archive, validating its header and decoding the directory
    /// tree.
    ///
    /// Fails with [`HpiError::FormatError`] on a bad marker, an unsupported
    /// version, or any directory offset that would leave the decrypted
    /// directory region.
    pub fn open(mut stream: R) -> Result<Self, HpiError> {
        stream.seek(SeekFrom::Start(0))?;
        let version = HpiVersion::read(&mut stream)?;
        if version.marker != HPI_MAGIC {
            return Err(HpiError::FormatError(format!(
                "invalid archive marker {:#010X}",
                version.marker
            )));
        }
        if version.version != HPI_VERSION {
            return Err(HpiError::FormatError(format!(
                "unsupported archive version {:#010X}",
                version.version
            )));
        }

        let header = HpiHeader::read(&mut stream)?;
        let key = transform_key(header.header_key as u8);

        let directory_size = header.directory_size as usize;
        let start = header.start as usize;
        if start
            .checked_add(DirectoryRecord::SIZE)
            .map_or(true, |end| end > directory_size)
        {
            return Err(HpiError::FormatError("runaway root directory".into()));
        }

        // The directory buffer is indexed by absolute stream offset; bytes
        // below `start` stay zeroed.
        let mut directory = Vec::new();
        directory
            .try_reserve_exact(directory_size)
            .map_err(|_| HpiError::FormatError("directory region too large to buffer".into()))?;
        directory.resize(directory_size, 0);
        stream.seek(SeekFrom::Start(header.start as u64))?;
        read_and_decrypt(&mut stream, key, &mut directory[start..])?;

        let root = decode_directory(&directory, start, 0)?;
        Ok(HpiArchive { stream, key, root })
    }

    /// The archive's root directory.
    pub fn root(&self) -> &HpiDirectory {
        &self.root
    }

    /// Resolves a slash-separated path to a file descriptor, matching each
    /// component case-insensitively. Returns `None` if any component is
    /// absent or a non-final component is a file.
    pub fn find_file(&self, path: &str) -> Option<HpiFileDescriptor> {
        let (directory_path, file_name) = match path.rsplit_once('/') {
            Some((directory_path, file_name)) => (Some(directory_path), file_name),
            None => (None, path),
        };
        let directory = match directory_path {
            Some(directory_path) => self.find_directory(directory_path)?,
            None => &self.root,
        };
        directory.file(file_name).copied()
    }

    /// Resolves a slash-separated path to a directory, matching each
    /// component case-insensitively.
    pub fn find_directory(&self, path: &str) -> Option<&HpiDirectory> {
        let mut directory = &self.root;
        for component in path.split('/') {
            directory = directory.directory(component)?;
        }
        Some(directory)
    }

    /// Extracts a file's contents into `out`, which must be exactly
    /// `file.size` bytes.
    ///
    /// On failure the buffer's contents are unspecified; callers must
    /// discard it. Partial extraction is not a supported state.
    pub fn extract(&mut self, file: &HpiFileDescriptor, out: &mut [u8]) -> Result<(), HpiError> {
        if out.len() != file.size as usize {
            return Err(HpiError::FormatError(format!(
                "destination buffer is {} bytes, file is {}",
                out.len(),
                file.size
            )));
        }
        self.stream.seek(SeekFrom::Start(file.offset as u64))?;
        match file.scheme {
            CompressionScheme::None => read_and_decrypt(&mut self.stream, self.key, out),
            CompressionScheme::Lz77 | CompressionScheme::ZLib => {
                extract_compressed(&mut self.stream, self.key, out)
            }
        }
    }

    /// Extracts a file's contents into a freshly allocated buffer.
    pub fn extract_to_vec(&mut self, file: &HpiFileDescriptor) -> Result<Vec<u8>, HpiError> {
        let mut out = Vec::new();
        out.try_reserve_exact(file.size as usize)
            .map_err(|_| HpiError::FormatError("file too large to buffer".into()))?;
        out.resize(file.size as usize, 0);
        self.extract(file, &mut out)?;
        Ok(out)
    }
}

fn decode_directory(
    buffer: &[u8],
    offset: usize,
    depth: u32,
) -> Result<HpiDirectory, HpiError> {
    if depth > MAX_DIRECTORY_DEPTH {
        return Err(HpiError::FormatError("runaway directory nesting".into()));
    }

    let record = DirectoryRecord::parse(buffer, offset)?;
    let entry_count = record.entry_count as usize;
    let list_offset = record.entry_list_offset as usize;
    entry_count
        .checked_mul(EntryRecord::SIZE)
        .and_then(|list_size| list_offset.checked_add(list_size))
        .filter(|list_end| *list_end <= buffer.len())
        .ok_or_else(|| HpiError::FormatError("runaway directory entry list".into()))?;

    let mut entries = Vec::with_capacity(entry_count);
    for i in 0..entry_count {
        let entry = EntryRecord::parse(buffer, list_offset + i * EntryRecord::SIZE)?;
        entries.push(decode_entry(buffer, entry, depth)?);
    }
    Ok(HpiDirectory { entries })
}

fn decode_entry(
    buffer: &[u8],
    record: EntryRecord,
    depth: u32,
) -> Result<HpiDirectoryEntry, HpiError> {
    let name = read_name(buffer, record.name_offset as usize)?;
    let data = if record.is_directory != 0 {
        HpiEntryData::Directory(decode_directory(
            buffer,
            record.data_offset as usize,
            depth + 1,
        )?)
    } else {
        let file = FileRecord::parse(buffer, record.data_offset as usize)?;
        HpiEntryData::File(HpiFileDescriptor {
            scheme: CompressionScheme::from_tag(file.compression_tag)?,
            offset: file.data_offset,
            size: file.file_size,
        })
    };
    Ok(HpiDirectoryEntry { name, data })
}

/// Reads a NUL-terminated name out of the decrypted directory buffer.
fn read_name(buffer: &[u8], offset: usize) -> Result<String, HpiError> {
    let tail = buffer
        .get(offset..)
        .ok_or_else(|| HpiError::FormatError("runaway directory entry name".into()))?;
    let len = tail
        .iter()
        .position(|b| *b == 0)
        .ok_or_else(|| HpiError::FormatError("runaway directory entry name".into()))?;
    String::from_utf8(tail[..len].to_vec())
        .map_err(|_| HpiError::FormatError("malformed directory entry name".into()))
}
