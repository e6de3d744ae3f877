//! Input entries for the writer.

use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use pack_format::{item_path_from_relative, Error, Result};

/// A file on disk and the path it gets inside the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackEntry {
    pub source: PathBuf,
    pub item_path: String,
}

impl PackEntry {
    pub fn new(source: impl Into<PathBuf>, item_path: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            item_path: item_path.into(),
        }
    }
}

/// Collect every regular file below `root`, named by its `/`-separated
/// path relative to `root` and sorted by that path.
pub fn collect_directory<P: AsRef<Path>>(root: P) -> Result<Vec<PackEntry>> {
    let root = root.as_ref();
    let directory_error = |source: io::Error| Error::FailedToGetDirectory {
        path: root.to_path_buf(),
        source,
    };

    if !root.is_dir() {
        return Err(directory_error(io::Error::new(
            io::ErrorKind::NotFound,
            "not a directory",
        )));
    }

    let mut entries = Vec::new();

    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry.map_err(|e| directory_error(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let item_path = item_path_from_relative(relative)?;
        entries.push(PackEntry::new(entry.into_path(), item_path));
    }

    entries.sort_by(|a, b| a.item_path.cmp(&b.item_path));

    tracing::debug!(root = %root.display(), files = entries.len(), "collected directory");
    Ok(entries)
}
