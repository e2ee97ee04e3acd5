use crate::error::HpiError;
use crate::file_descriptor::HpiFileDescriptor;
use crate::hpi_archive::HpiArchive;
use glob::{MatchOptions, Pattern};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

// Type aliases for complex types
type SharedArchive = Arc<Mutex<HpiArchive<BufReader<File>>>>;
type Subtree = Arc<BTreeMap<String, HpiCatalogueEntry>>;

/// How many archives the game itself consults per glob, alphabetically.
pub const GAME_ARCHIVE_LIMIT: usize = 8;

/// Controls how many matching archives contribute to a merge.
///
/// The game historically only consulted the first eight alphabetically
/// sorted archives matching its glob; tooling sometimes wants that
/// truncated "what the game actually sees" view and sometimes the full
/// merge, so the cutoff is an explicit policy rather than a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveLimit {
    /// Reproduce the game's behavior: merge only the first
    /// [`GAME_ARCHIVE_LIMIT`] matching archives.
    FirstEight,
    /// Merge every matching archive.
    All,
}

/// A resolved catalogue entry: which archive owns a file and where the file
/// lives inside it.
#[derive(Debug, Clone)]
pub struct HpiCatalogueEntry {
    /// Path of the archive that won the merge for this file.
    pub archive_path: PathBuf,
    /// The file's path inside the archive, in original case.
    pub file_path: String,
    /// The file's descriptor within that archive.
    pub file: HpiFileDescriptor,
}

/// Represents the merged, case-insensitive view across every archive in a
/// game installation directory.
///
/// A catalogue scans its directory for archives matching a caller-supplied
/// glob spec (a semicolon-separated list of shell-style patterns, e.g.
/// `"*.hpi;*.ufo;*.ccx"`), opens them in ascending alphabetical filename
/// order, and merges the subtree rooted at a requested logical sub-directory
/// ("maps", "features", ...) into one mapping from lower-cased relative path
/// to [`HpiCatalogueEntry`]. Later archives overwrite earlier ones on name
/// collision, which is how the game resolves overlapping assets.
///
/// Archives that fail to open or decode are logged and skipped; a corrupt
/// archive never fails the merge.
///
/// # Usage
///
/// ```no_run
/// use hpi_rs::hpi_catalogue::{ArchiveLimit, HpiCatalogue};
///
/// let catalogue =
///     HpiCatalogue::new("C:/Games/TA", "*.hpi;*.ufo;*.ccx", ArchiveLimit::All).unwrap();
/// if let Some(entry) = catalogue.resolve("maps/Coast To Coast.ota").unwrap() {
///     let bytes = catalogue.load(&entry).unwrap();
///     println!("{} bytes from {}", bytes.len(), entry.archive_path.display());
/// }
/// ```
///
/// # Thread Safety
///
/// Merged subtrees and open archive handles are cached behind mutexes, so a
/// catalogue can be shared between threads; each cached archive handle is
/// itself mutex-guarded because extraction needs exclusive stream access.
#[derive(Debug)]
pub struct HpiCatalogue {
    /// The game installation directory being scanned.
    game_path: PathBuf,
    /// Compiled patterns from the semicolon-separated glob spec.
    patterns: Vec<Pattern>,
    /// Whether the game's first-eight truncation applies.
    archive_limit: ArchiveLimit,
    /// Open archive handles, keyed by archive path.
    archives: Mutex<HashMap<PathBuf, SharedArchive>>,
    /// Merged per-sub-directory views, keyed by lower-cased sub-dir name.
    subtrees: Mutex<HashMap<String, Subtree>>,
}

impl HpiCatalogue {
    /// Creates a catalogue over a game directory.
    ///
    /// Fails with [`HpiError::FormatError`] if any pattern in the glob spec
    /// is malformed. Nothing is scanned until a subtree is first requested.
    pub fn new<P: AsRef<Path>>(
        game_path: P,
        glob_spec: &str,
        archive_limit: ArchiveLimit,
    ) -> Result<Self, HpiError> {
        let mut patterns = Vec::new();
        for spec in glob_spec.split(';') {
            let spec = spec.trim();
            if spec.is_empty() {
                continue;
            }
            let pattern = Pattern::new(spec).map_err(|e| {
                HpiError::FormatError(format!("invalid archive glob pattern '{spec}': {e}"))
            })?;
            patterns.push(pattern);
        }
        Ok(HpiCatalogue {
            game_path: game_path.as_ref().to_path_buf(),
            patterns,
            archive_limit,
            archives: Mutex::new(HashMap::new()),
            subtrees: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the merged view of every archive's subtree rooted at the
    /// given logical sub-directory, building and caching it on first use.
    ///
    /// Keys are lower-cased `"<sub_dir>/<relative path>"` strings. The map
    /// stays valid until [`rebuild`](Self::rebuild).
    pub fn subtree(&self, sub_dir: &str) -> Result<Subtree, HpiError> {
        let cache_key = sub_dir.to_lowercase();
        {
            let subtrees = self.subtrees.lock().expect("subtree cache lock poisoned");
            if let Some(subtree) = subtrees.get(&cache_key) {
                return Ok(Arc::clone(subtree));
            }
        }

        let mut entries = BTreeMap::new();
        for archive_path in self.matching_archives()? {
            let archive = match self.open_archive(&archive_path) {
                Ok(archive) => archive,
                Err(e) => {
                    warn!("skipping archive {}: {e}", archive_path.display());
                    continue;
                }
            };
            let archive = archive.lock().expect("archive lock poisoned");
            for root_entry in &archive.root().entries {
                if !root_entry.name.eq_ignore_ascii_case(sub_dir) {
                    continue;
                }
                let Some(directory) = root_entry.as_directory() else {
                    continue;
                };
                directory.for_each_file(&mut |relative_path, file| {
                    let file_path = format!("{}/{relative_path}", root_entry.name);
                    entries.insert(
                        file_path.to_lowercase(),
                        HpiCatalogueEntry {
                            archive_path: archive_path.clone(),
                            file_path,
                            file: *file,
                        },
                    );
                });
            }
        }
        debug!("merged {} entries under '{sub_dir}'", entries.len());

        let subtree = Arc::new(entries);
        self.subtrees
            .lock()
            .expect("subtree cache lock poisoned")
            .insert(cache_key, Arc::clone(&subtree));
        Ok(subtree)
    }

    /// Resolves a logical path (`"maps/foo.tnt"`) to its merged entry, or
    /// `None` if no archive provides it. The first path component names the
    /// sub-directory whose merged view is consulted.
    pub fn resolve(&self, path: &str) -> Result<Option<HpiCatalogueEntry>, HpiError> {
        let Some((sub_dir, _)) = path.split_once('/') else {
            return Ok(None);
        };
        let subtree = self.subtree(sub_dir)?;
        Ok(subtree.get(&path.to_lowercase()).cloned())
    }

    /// Extracts an entry's bytes, reusing the cached handle for its archive.
    pub fn load(&self, entry: &HpiCatalogueEntry) -> Result<Vec<u8>, HpiError> {
        debug!(
            "loading {}:{}",
            entry.archive_path.display(),
            entry.file_path
        );
        let archive = self.open_archive(&entry.archive_path)?;
        let mut archive = archive.lock().expect("archive lock poisoned");
        archive.extract_to_vec(&entry.file)
    }

    /// Drops every cached subtree and archive handle; the next lookup
    /// rescans the directory.
    pub fn rebuild(&self) {
        self.subtrees
            .lock()
            .expect("subtree cache lock poisoned")
            .clear();
        self.archives
            .lock()
            .expect("archive cache lock poisoned")
            .clear();
    }

    /// Fingerprints a merged sub-directory view: a CRC32 over each entry's
    /// lower-cased path and file size, in map order. Callers use this to
    /// key caches of data derived from the merged files, such as a parsed
    /// feature library.
    pub fn fingerprint(&self, sub_dir: &str) -> Result<u32, HpiError> {
        let subtree = self.subtree(sub_dir)?;
        let mut hasher = crc32fast::Hasher::new();
        for (path, entry) in subtree.iter() {
            hasher.update(path.as_bytes());
            hasher.update(&entry.file.size.to_le_bytes());
        }
        Ok(hasher.finalize())
    }

    /// Lists matching archive files in ascending alphabetical order,
    /// applying the archive-limit policy.
    fn matching_archives(&self) -> Result<Vec<PathBuf>, HpiError> {
        let match_options = MatchOptions {
            case_sensitive: false,
            ..MatchOptions::new()
        };

        let mut matches: Vec<(String, PathBuf)> = Vec::new();
        for entry in fs::read_dir(&self.game_path)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if self
                .patterns
                .iter()
                .any(|p| p.matches_with(&file_name, match_options))
            {
                matches.push((file_name.to_lowercase(), entry.path()));
            }
        }
        matches.sort();

        let limit = match self.archive_limit {
            ArchiveLimit::FirstEight => GAME_ARCHIVE_LIMIT,
            ArchiveLimit::All => matches.len(),
        };
        Ok(matches
            .into_iter()
            .take(limit)
            .map(|(_, path)| path)
            .collect())
    }

    /// Returns the cached handle for an archive, opening it if absent. The
    /// cache lock covers the whole check-open-insert sequence so two
    /// threads never open the same archive twice.
    fn open_archive(&self, path: &Path) -> Result<SharedArchive, HpiError> {
        let mut archives = self.archives.lock().expect("archive cache lock poisoned");
        if let Some(archive) = archives.get(path) {
            return Ok(Arc::clone(archive));
        }
        let stream = BufReader::new(File::open(path)?);
        let archive = Arc::new(Mutex::new(HpiArchive::open(stream)?));
        archives.insert(path.to_path_buf(), Arc::clone(&archive));
        Ok(archive)
    }
}
