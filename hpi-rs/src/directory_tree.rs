//! The decoded, owned directory tree of an archive.
//!
//! Each directory exclusively owns its children; no node is shared between
//! two parents. Names keep the case the archive stored them in and are
//! matched case-insensitively (the format's names are ASCII).

use crate::file_descriptor::HpiFileDescriptor;

/// A directory: an ordered list of named entries.
#[derive(Debug, Default)]
pub struct HpiDirectory {
    pub entries: Vec<HpiDirectoryEntry>,
}

/// One named entry in a directory, either a file or a subdirectory.
#[derive(Debug)]
pub struct HpiDirectoryEntry {
    /// The entry's name in original case.
    pub name: String,
    pub data: HpiEntryData,
}

/// The payload of a directory entry.
#[derive(Debug)]
pub enum HpiEntryData {
    File(HpiFileDescriptor),
    Directory(HpiDirectory),
}

impl HpiDirectoryEntry {
    pub fn is_directory(&self) -> bool {
        matches!(self.data, HpiEntryData::Directory(_))
    }

    pub fn as_file(&self) -> Option<&HpiFileDescriptor> {
        match &self.data {
            HpiEntryData::File(file) => Some(file),
            HpiEntryData::Directory(_) => None,
        }
    }

    pub fn as_directory(&self) -> Option<&HpiDirectory> {
        match &self.data {
            HpiEntryData::File(_) => None,
            HpiEntryData::Directory(directory) => Some(directory),
        }
    }
}

impl HpiDirectory {
    /// Finds an entry by name, case-insensitively.
    pub fn entry(&self, name: &str) -> Option<&HpiDirectoryEntry> {
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }

    /// Finds a file entry by name, case-insensitively.
    pub fn file(&self, name: &str) -> Option<&HpiFileDescriptor> {
        self.entry(name).and_then(HpiDirectoryEntry::as_file)
    }

    /// Finds a subdirectory by name, case-insensitively.
    pub fn directory(&self, name: &str) -> Option<&HpiDirectory> {
        self.entry(name).and_then(HpiDirectoryEntry::as_directory)
    }

    /// Visits every file under this directory, depth first, handing the
    /// visitor each file's slash-separated path relative to this directory
    /// (in original case) and its descriptor.
    pub fn for_each_file<F>(&self, visit: &mut F)
    where
        F: FnMut(&str, &HpiFileDescriptor),
    {
        let mut path = String::with_capacity(255);
        self.walk(&mut path, visit);
    }

    fn walk<F>(&self, path: &mut String, visit: &mut F)
    where
        F: FnMut(&str, &HpiFileDescriptor),
    {
        let parent_len = path.len();
        for entry in &self.entries {
            if !path.is_empty() {
                path.push('/');
            }
            path.push_str(&entry.name);
            match &entry.data {
                HpiEntryData::File(file) => visit(path, file),
                HpiEntryData::Directory(directory) => directory.walk(path, visit),
            }
            path.truncate(parent_len);
        }
    }
}
