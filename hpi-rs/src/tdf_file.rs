//! The hierarchical TDF configuration format: parser, tree model, and
//! binary cache serialisation.
//!
//! TDF is the game's line-oriented text format for map, unit, and feature
//! metadata: `//` comments, `[Name]` section headers, `{`/`}` nesting and
//! `key = value;` assignments. The parser is deliberately permissive —
//! unknown lines are ignored and unterminated nesting is tolerated — because
//! shipped game data relies on that leniency. Parsing terminates; it never
//! fails.

use crate::error::HpiError;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use std::sync::OnceLock;

/// Keeps a malformed cache file from recursing the deserialiser off the
/// stack; real trees are a handful of levels deep.
const MAX_SERIALISED_DEPTH: u32 = 256;
/// Keeps a malformed cache file from demanding absurd string allocations.
const MAX_SERIALISED_STRING: usize = 1 << 24;

static EMPTY: OnceLock<TdfFile> = OnceLock::new();

/// A node in a parsed TDF tree: values and named children, both keyed
/// case-insensitively (keys are lower-cased at insertion, values keep their
/// original case).
///
/// Within a node keys are unique; the last assignment wins when input
/// repeats one. An empty node doubles as the "not found" result of
/// [`get_child`](Self::get_child), so lookups never need a null check.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TdfFile {
    pub values: BTreeMap<String, String>,
    pub children: BTreeMap<String, TdfFile>,
}

impl TdfFile {
    /// Creates an empty node.
    pub fn new() -> Self {
        TdfFile::default()
    }

    /// Parses TDF text into a tree, descending at most `max_depth` levels.
    ///
    /// With `max_depth` 0 the root collects no children; a budget of N
    /// parses only the top N section levels, which callers use to skim
    /// large files cheaply. Parsing stops early when the budget runs out
    /// and at end of text; it never errors.
    pub fn parse(text: &str, max_depth: u32) -> Self {
        let stripped = strip_comments(text);
        let mut root = TdfFile::new();
        root.parse_level(&stripped, 0, max_depth);
        root
    }

    /// Looks up a value case-insensitively, returning a lower-cased copy,
    /// or the default if the key is absent. Values are case-insensitive
    /// tokens game-wide, so the copy is normalised here.
    pub fn get_value(&self, key: &str, default: &str) -> String {
        match self.values.get(&key.to_lowercase()) {
            Some(value) => value.to_lowercase(),
            None => default.to_string(),
        }
    }

    /// Looks up a child node case-insensitively. An absent key yields a
    /// shared empty node, so the result can always be dereferenced and
    /// chained.
    pub fn get_child(&self, key: &str) -> &TdfFile {
        self.children
            .get(&key.to_lowercase())
            .unwrap_or_else(|| TdfFile::empty())
    }

    /// The shared empty sentinel node.
    pub fn empty() -> &'static TdfFile {
        EMPTY.get_or_init(TdfFile::new)
    }

    /// Writes the tree to a binary cache stream: a count of (key, value)
    /// string pairs, then a count of (name, child) pairs with each child
    /// recursively in the same shape; strings carry little-endian u32
    /// length prefixes.
    pub fn serialise<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.values.len() as u32)?;
        for (key, value) in &self.values {
            write_string(writer, key)?;
            write_string(writer, value)?;
        }
        writer.write_u32::<LittleEndian>(self.children.len() as u32)?;
        for (name, child) in &self.children {
            write_string(writer, name)?;
            child.serialise(writer)?;
        }
        Ok(())
    }

    /// Reads a tree back from a binary cache stream, reproducing the key
    /// set, value set, and child structure [`serialise`](Self::serialise)
    /// wrote. Truncation, invalid UTF-8, and absurd nesting fail with
    /// [`HpiError::FormatError`].
    pub fn deserialise<R: Read>(reader: &mut R) -> Result<Self, HpiError> {
        Self::deserialise_level(reader, 0)
    }

    fn deserialise_level<R: Read>(reader: &mut R, depth: u32) -> Result<Self, HpiError> {
        if depth > MAX_SERIALISED_DEPTH {
            return Err(HpiError::FormatError("cache nesting too deep".into()));
        }
        let mut node = TdfFile::new();

        let value_count = reader.read_u32::<LittleEndian>()?;
        for _ in 0..value_count {
            let key = read_string(reader)?;
            let value = read_string(reader)?;
            node.values.insert(key, value);
        }
        let child_count = reader.read_u32::<LittleEndian>()?;
        for _ in 0..child_count {
            let name = read_string(reader)?;
            let child = Self::deserialise_level(reader, depth + 1)?;
            node.children.insert(name, child);
        }
        Ok(node)
    }

    /// Parses one nesting level from `pos`, returning the cursor position
    /// the caller should continue from.
    fn parse_level(&mut self, text: &str, mut pos: usize, max_depth: u32) -> usize {
        let mut brace_depth = 0i32;

        while pos < text.len() {
            let (line, next) = next_line(text, pos);
            pos = next;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if line.len() > 2 && line.starts_with('[') && line.ends_with(']') {
                if max_depth == 0 {
                    // Budget exhausted: stop the whole parse here so the
                    // caller keeps only the levels it asked for.
                    return text.len();
                }
                let name = line[1..line.len() - 1].to_lowercase();
                pos = self
                    .children
                    .entry(name)
                    .or_default()
                    .parse_level(text, pos, max_depth - 1);
            } else if line == "{" {
                brace_depth += 1;
            } else if line == "}" {
                brace_depth -= 1;
                if brace_depth == 0 {
                    return pos;
                }
            } else if let Some((key, value)) = line.split_once('=') {
                let value = value.trim();
                let value = value.strip_suffix(';').unwrap_or(value);
                self.values
                    .insert(key.trim().to_lowercase(), value.to_string());
            }
            // Anything else is an unknown line and is ignored.
        }
        pos
    }
}

/// Removes `//` comments, each running to its end of line.
fn strip_comments(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_comment = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_comment {
            if c == '\n' {
                in_comment = false;
                result.push(c);
            }
        } else if c == '/' && chars.peek() == Some(&'/') {
            in_comment = true;
        } else {
            result.push(c);
        }
    }
    result
}

/// Splits off the line starting at `pos`, returning it together with the
/// position just past its newline.
fn next_line(text: &str, pos: usize) -> (&str, usize) {
    match text[pos..].find('\n') {
        Some(offset) => (&text[pos..pos + offset], pos + offset + 1),
        None => (&text[pos..], text.len()),
    }
}

fn write_string<W: Write>(writer: &mut W, s: &str) -> io::Result<()> {
    writer.write_u32::<LittleEndian>(s.len() as u32)?;
    writer.write_all(s.as_bytes())
}

fn read_string<R: Read>(reader: &mut R) -> Result<String, HpiError> {
    let len = reader.read_u32::<LittleEndian>()? as usize;
    if len > MAX_SERIALISED_STRING {
        return Err(HpiError::FormatError("cache string too large".into()));
    }
    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(len)
        .map_err(|_| HpiError::FormatError("cache string too large".into()))?;
    bytes.resize(len, 0);
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|_| HpiError::FormatError("cache string not UTF-8".into()))
}
