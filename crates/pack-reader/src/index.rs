//! Archive index: item headers in write order plus a path lookup table.

use std::fs;
use std::hash::BuildHasherDefault;
use std::io;
use std::path::Path;

use hashbrown::HashMap as FastHashMap;
use rustc_hash::FxHasher;
use walkdir::WalkDir;

use pack_format::{
    item_path_from_relative, validate_item_path, ByteCursor, Error, ItemHeader, Result,
};

type FxHashMap<K, V> = FastHashMap<K, V, BuildHasherDefault<FxHasher>>;

/// An item in the index.
#[derive(Debug, Clone)]
pub struct IndexedItem {
    path: Box<str>,
    header: ItemHeader,
}

impl IndexedItem {
    /// Get the item path.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get the item header.
    #[inline]
    pub fn header(&self) -> &ItemHeader {
        &self.header
    }
}

/// Ordered item table with O(1) path lookup.
///
/// Indices follow the order items were written in and stay valid for the
/// lifetime of the reader that owns the index.
#[derive(Debug, Default)]
pub struct ArchiveIndex {
    items: Vec<IndexedItem>,
    lookup: FxHashMap<Box<str>, usize>,
}

impl ArchiveIndex {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            lookup: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Parse `item_count` item headers and the path blob from the cursor.
    ///
    /// The cursor must sit right after the archive header.
    pub(crate) fn parse(cursor: &mut ByteCursor<'_>, item_count: u64) -> Result<Self> {
        // Refuse counts the file cannot hold before allocating for them
        let table_size = usize::try_from(item_count)
            .ok()
            .and_then(|count| count.checked_mul(ItemHeader::SIZE))
            .unwrap_or(usize::MAX);
        cursor.ensure(table_size)?;

        let count = table_size / ItemHeader::SIZE;
        let mut headers = Vec::with_capacity(count);

        for _ in 0..count {
            let header: ItemHeader = cursor.read_struct()?;
            header.validate()?;
            headers.push(header);
        }

        let blob_size = headers.iter().map(|h| h.path_size() as usize).sum();
        let blob = cursor.read_bytes(blob_size)?;

        let mut index = Self::with_capacity(count);
        let mut offset = 0;

        for header in headers {
            let bytes = &blob[offset..offset + header.path_size() as usize];
            offset += bytes.len();

            let path = std::str::from_utf8(bytes).map_err(|_| Error::BadItemPath {
                path: String::from_utf8_lossy(bytes).into_owned(),
                reason: "path is not valid UTF-8",
            })?;
            index.push(path, header)?;
        }

        Ok(index)
    }

    /// Index every regular file below `root` as an uncompressed item.
    ///
    /// Items are ordered by path so repeated opens produce the same indices.
    pub(crate) fn from_directory(root: &Path) -> Result<Self> {
        let directory_error = |source: io::Error| Error::FailedToGetDirectory {
            path: root.to_path_buf(),
            source,
        };

        let metadata = fs::metadata(root).map_err(directory_error)?;
        if !metadata.is_dir() {
            return Err(directory_error(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a directory",
            )));
        }

        let mut index = Self::default();

        for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| directory_error(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            let path = item_path_from_relative(relative)?;
            let size = entry.metadata().map_err(|e| directory_error(e.into()))?.len();

            let data_size = u32::try_from(size).map_err(|_| Error::BadDataSize {
                expected: u32::MAX as u64,
                actual: size,
            })?;
            let path_size = validate_item_path(&path)?;

            index.push(&path, ItemHeader::new(data_size, data_size, path_size, 0))?;
        }

        Ok(index)
    }

    fn push(&mut self, path: &str, header: ItemHeader) -> Result<()> {
        validate_item_path(path)?;

        if self.lookup.contains_key(path) {
            return Err(Error::BadItemPath {
                path: path.to_string(),
                reason: "path appears more than once",
            });
        }

        let path: Box<str> = path.into();
        self.lookup.insert(path.clone(), self.items.len());
        self.items.push(IndexedItem { path, header });
        Ok(())
    }

    /// Get the number of items.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the index has no items.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get an item by index.
    pub fn get(&self, index: usize) -> Result<&IndexedItem> {
        self.items.get(index).ok_or_else(|| {
            Error::FailedToGetItem(format!(
                "index {} out of range ({} items)",
                index,
                self.items.len()
            ))
        })
    }

    /// Find an item index by path.
    #[inline]
    pub fn find(&self, path: &str) -> Option<usize> {
        self.lookup.get(path).copied()
    }

    /// Iterate over items in index order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &IndexedItem> + '_ {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pack_format::{IntoBytes, ResultCode};

    fn table(items: &[(&str, ItemHeader)]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for (_, header) in items {
            bytes.extend_from_slice(header.as_bytes());
        }
        for (path, _) in items {
            bytes.extend_from_slice(path.as_bytes());
        }
        bytes
    }

    #[test]
    fn test_parse_keeps_write_order() {
        let bytes = table(&[
            ("zeta.txt", ItemHeader::new(3, 3, 8, 100)),
            ("alpha.txt", ItemHeader::new(2, 9, 9, 103)),
        ]);
        let mut cursor = ByteCursor::new(&bytes, Path::new("test"));
        let index = ArchiveIndex::parse(&mut cursor, 2).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.get(0).unwrap().path(), "zeta.txt");
        assert_eq!(index.find("alpha.txt"), Some(1));
        assert_eq!(index.find("missing"), None);
        assert_eq!(index.get(1).unwrap().header().data_offset(), 103);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_out_of_range_index() {
        let index = ArchiveIndex::default();
        assert_eq!(index.get(0).unwrap_err().code(), ResultCode::FailedToGetItem);
    }

    #[test]
    fn test_huge_count_fails_before_allocating() {
        let bytes = [0u8; 64];
        let mut cursor = ByteCursor::new(&bytes, Path::new("test"));
        let error = ArchiveIndex::parse(&mut cursor, u64::MAX).unwrap_err();
        assert_eq!(error.code(), ResultCode::FailedToReadFile);
    }

    #[test]
    fn test_truncated_path_blob() {
        let mut bytes = table(&[("abcdef", ItemHeader::new(1, 1, 6, 0))]);
        bytes.truncate(bytes.len() - 2);
        let mut cursor = ByteCursor::new(&bytes, Path::new("test"));
        assert_eq!(
            ArchiveIndex::parse(&mut cursor, 1).unwrap_err().code(),
            ResultCode::FailedToReadFile
        );
    }

    #[test]
    fn test_duplicate_and_empty_paths_rejected() {
        let bytes = table(&[
            ("same", ItemHeader::new(1, 1, 4, 0)),
            ("same", ItemHeader::new(1, 1, 4, 1)),
        ]);
        let mut cursor = ByteCursor::new(&bytes, Path::new("test"));
        assert_eq!(
            ArchiveIndex::parse(&mut cursor, 2).unwrap_err().code(),
            ResultCode::BadItemPath
        );

        let bytes = table(&[("", ItemHeader::new(1, 1, 0, 0))]);
        let mut cursor = ByteCursor::new(&bytes, Path::new("test"));
        assert_eq!(
            ArchiveIndex::parse(&mut cursor, 1).unwrap_err().code(),
            ResultCode::BadItemPath
        );
    }

    #[test]
    fn test_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("b.txt"), b"bee").unwrap();
        fs::write(dir.path().join("sub").join("a.bin"), [1u8, 2, 3, 4]).unwrap();

        let index = ArchiveIndex::from_directory(dir.path()).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get(0).unwrap().path(), "b.txt");

        let item = index.get(index.find("sub/a.bin").unwrap()).unwrap();
        assert_eq!(item.header().data_size(), 4);
        assert!(!item.header().is_compressed());
    }

    #[test]
    fn test_from_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let error = ArchiveIndex::from_directory(&dir.path().join("nope")).unwrap_err();
        assert_eq!(error.code(), ResultCode::FailedToGetDirectory);
    }
}
