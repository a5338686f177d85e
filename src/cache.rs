//! Content-addressed persistence of computed layouts.
//!
//! Deriving a waypoint graph from geometry is the expensive part of state
//! construction, so the first build of a layout writes the enriched layout
//! (graph included) back to disk, keyed by a hash of the layout identifier
//! and the engine version. A graph-algorithm change bumps the version and
//! invalidates old entries automatically.

use crate::error::{Result, StateError};
use crate::layout::Layout;
use log::{debug, info};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// A directory of cached layouts.
pub struct LayoutCache {
    dir: PathBuf,
}

impl LayoutCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The cache filename for a layout identifier: the first ten hex chars
    /// of its hash, scoped by the engine version.
    pub fn filename(layout_name: &str) -> String {
        let digest = format!("{:x}", Sha256::digest(layout_name.as_bytes()));
        format!("{}{}.json", &digest[..10], env!("CARGO_PKG_VERSION"))
    }

    /// The full path a layout would be cached at.
    pub fn path_for(&self, layout_name: &str) -> PathBuf {
        self.dir.join(Self::filename(layout_name))
    }

    /// Loads the cached layout for an identifier, if one exists.
    pub fn lookup(&self, layout_name: &str) -> Result<Option<Layout>> {
        let path = self.path_for(layout_name);
        if !path.exists() {
            debug!("No cached layout at {}", path.display());
            return Ok(None);
        }
        info!("Cached layout found");
        Self::read(&path).map(Some)
    }

    /// Writes an enriched layout into the cache and returns its path.
    pub fn store(&self, layout: &Layout) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|e| StateError::io(&self.dir, e))?;
        let path = self.path_for(&layout.name);
        info!("Caching layout to {}", path.display());
        let file = File::create(&path).map_err(|e| StateError::io(&path, e))?;
        serde_json::to_writer_pretty(BufWriter::new(file), layout)
            .map_err(|e| StateError::format(&path, e))?;
        Ok(path)
    }

    fn read(path: &Path) -> Result<Layout> {
        let file = File::open(path).map_err(|e| StateError::io(path, e))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| StateError::format(path, e))
    }
}
