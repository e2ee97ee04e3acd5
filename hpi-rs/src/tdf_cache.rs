use crate::error::HpiError;
use crate::tdf_file::TdfFile;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A directory of serialised TDF trees, keyed by a caller-supplied content
/// checksum.
///
/// Some trees are expensive to reparse (the feature library spans hundreds
/// of files across every archive), so callers key a cache by a fingerprint
/// of the inputs — typically
/// [`HpiCatalogue::fingerprint`](crate::hpi_catalogue::HpiCatalogue::fingerprint) —
/// and rebuild only when the fingerprint moves. Cache files that are
/// missing, corrupt, or unwritable are logged and treated as misses; the
/// cache never makes an operation fail.
#[derive(Debug)]
pub struct TdfCache {
    cache_dir: PathBuf,
    prefix: String,
}

impl TdfCache {
    /// Creates a cache over a directory; files are named
    /// `<prefix>.<key in hex>`.
    pub fn new<P: AsRef<Path>>(cache_dir: P, prefix: &str) -> Self {
        TdfCache {
            cache_dir: cache_dir.as_ref().to_path_buf(),
            prefix: prefix.to_string(),
        }
    }

    /// The on-disk path a key maps to.
    pub fn cache_path(&self, key: u32) -> PathBuf {
        self.cache_dir.join(format!("{}.{key:08x}", self.prefix))
    }

    /// Returns the cached tree for `key`, or runs `build`, persists its
    /// result, and returns it.
    pub fn load_or_build<F>(&self, key: u32, build: F) -> Result<TdfFile, HpiError>
    where
        F: FnOnce() -> Result<TdfFile, HpiError>,
    {
        let path = self.cache_path(key);
        if path.exists() {
            let cached = File::open(&path)
                .map_err(HpiError::from)
                .and_then(|file| TdfFile::deserialise(&mut BufReader::new(file)));
            match cached {
                Ok(tree) => {
                    debug!("loaded cached tree from {}", path.display());
                    return Ok(tree);
                }
                Err(e) => warn!("discarding unreadable cache {}: {e}", path.display()),
            }
        }

        let tree = build()?;
        if let Err(e) = Self::persist(&tree, &path) {
            warn!("could not write cache {}: {e}", path.display());
        }
        Ok(tree)
    }

    fn persist(tree: &TdfFile, path: &Path) -> std::io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        tree.serialise(&mut writer)?;
        writer.flush()
    }
}
