//! Random-access reader over a Pack archive or a resource directory.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use pack_format::{ByteCursor, Error, Header, ItemHeader, Result};

use crate::context::ContextPool;
use crate::index::{ArchiveIndex, IndexedItem};

/// Where a reader takes its items from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReaderMode {
    /// A packed archive file.
    #[default]
    Archive,
    /// A plain directory whose files are served as uncompressed items.
    ResourceDirectory,
}

/// Options for [`PackReader::open`].
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Backend to open.
    pub mode: ReaderMode,
    /// Number of thread slots. Every read names one slot in `0..thread_count`.
    pub thread_count: usize,
    /// Expected application data version. Ignored in directory mode.
    pub data_version: u64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            mode: ReaderMode::Archive,
            thread_count: 1,
            data_version: 0,
        }
    }
}

impl ReaderConfig {
    /// Set the backend mode.
    pub fn with_mode(mut self, mode: ReaderMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the number of thread slots.
    pub fn with_thread_count(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count;
        self
    }

    /// Set the expected data version.
    pub fn with_data_version(mut self, data_version: u64) -> Self {
        self.data_version = data_version;
        self
    }
}

enum Backend {
    Archive { mmap: Mmap, header: Header },
    Directory,
}

/// Reader for Pack archives.
///
/// All methods take `&self`; the reader is `Sync` and can be shared between
/// threads as long as each thread passes its own slot index.
///
/// # Example
///
/// ```no_run
/// use pack_reader::{PackReader, ReaderConfig};
///
/// let reader = PackReader::open("assets.pack", &ReaderConfig::default().with_thread_count(4))?;
/// let index = reader.item_index("textures/logo.png").expect("missing item");
/// let mut buffer = vec![0u8; reader.item_data_size(index)? as usize];
/// reader.read_item_data(index, &mut buffer, 0)?;
/// # Ok::<(), pack_reader::Error>(())
/// ```
pub struct PackReader {
    path: PathBuf,
    backend: Backend,
    index: ArchiveIndex,
    contexts: ContextPool,
}

impl PackReader {
    /// Open an archive file or resource directory.
    pub fn open<P: AsRef<Path>>(path: P, config: &ReaderConfig) -> Result<Self> {
        let path = path.as_ref();

        if config.thread_count == 0 {
            return Err(Error::BadThreadSlot { slot: 0, count: 0 });
        }

        let reader = match config.mode {
            ReaderMode::Archive => Self::open_archive(path, config)?,
            ReaderMode::ResourceDirectory => Self::open_directory(path, config)?,
        };

        tracing::debug!(
            path = %path.display(),
            mode = ?config.mode,
            items = reader.index.len(),
            threads = config.thread_count,
            "opened pack reader"
        );

        Ok(reader)
    }

    fn open_archive(path: &Path, config: &ReaderConfig) -> Result<Self> {
        let file = File::open(path).map_err(|source| Error::FailedToOpenFile {
            path: path.to_path_buf(),
            source,
        })?;

        let file_size = file
            .metadata()
            .map_err(|source| Error::FailedToReadFile {
                path: path.to_path_buf(),
                source,
            })?
            .len();

        if file_size < Header::SIZE as u64 {
            return Err(Error::FailedToReadFile {
                path: path.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("file is {} bytes, smaller than the header", file_size),
                ),
            });
        }

        let mmap = unsafe { Mmap::map(&file) }.map_err(|source| Error::FailedToReadFile {
            path: path.to_path_buf(),
            source,
        })?;

        let mut cursor = ByteCursor::new(&mmap, path);
        let header: Header = cursor.read_struct()?;
        header.validate(config.data_version)?;

        let index = ArchiveIndex::parse(&mut cursor, header.item_count())?;
        let contexts = ContextPool::new(config.thread_count, true)?;

        Ok(Self {
            path: path.to_path_buf(),
            backend: Backend::Archive { mmap, header },
            index,
            contexts,
        })
    }

    fn open_directory(path: &Path, config: &ReaderConfig) -> Result<Self> {
        let index = ArchiveIndex::from_directory(path)?;
        let contexts = ContextPool::new(config.thread_count, false)?;

        Ok(Self {
            path: path.to_path_buf(),
            backend: Backend::Directory,
            index,
            contexts,
        })
    }

    /// Get the backend mode.
    #[inline]
    pub fn mode(&self) -> ReaderMode {
        match self.backend {
            Backend::Archive { .. } => ReaderMode::Archive,
            Backend::Directory => ReaderMode::ResourceDirectory,
        }
    }

    /// Get the path the reader was opened from.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the archive header. `None` in directory mode.
    #[inline]
    pub fn header(&self) -> Option<&Header> {
        match &self.backend {
            Backend::Archive { header, .. } => Some(header),
            Backend::Directory => None,
        }
    }

    /// Get the number of thread slots.
    #[inline]
    pub fn thread_count(&self) -> usize {
        self.contexts.len()
    }

    /// Get the number of items.
    #[inline]
    pub fn item_count(&self) -> usize {
        self.index.len()
    }

    /// Find an item index by exact path.
    #[inline]
    pub fn item_index(&self, path: &str) -> Option<usize> {
        self.index.find(path)
    }

    /// Get the full item header.
    #[inline]
    pub fn item_header(&self, index: usize) -> Result<&ItemHeader> {
        Ok(self.index.get(index)?.header())
    }

    /// Get the logical (decompressed) size of an item.
    pub fn item_data_size(&self, index: usize) -> Result<u32> {
        Ok(self.item_header(index)?.data_size())
    }

    /// Get the number of bytes stored for an item.
    pub fn item_zip_size(&self, index: usize) -> Result<u32> {
        Ok(self.item_header(index)?.zip_size())
    }

    /// Get the absolute payload offset of an item.
    pub fn item_file_offset(&self, index: usize) -> Result<u64> {
        Ok(self.item_header(index)?.data_offset())
    }

    /// Check if an item aliases another item's payload.
    pub fn is_item_reference(&self, index: usize) -> Result<bool> {
        Ok(self.item_header(index)?.is_reference())
    }

    /// Get the path of an item.
    pub fn item_path(&self, index: usize) -> Result<&str> {
        Ok(self.index.get(index)?.path())
    }

    /// Iterate over items in index order.
    #[inline]
    pub fn items(&self) -> impl Iterator<Item = &IndexedItem> + '_ {
        self.index.iter()
    }

    /// Read an item into `buffer`, which must be exactly the item's data size.
    ///
    /// `thread_index` picks the decompression context and must be below
    /// [`thread_count`](Self::thread_count).
    pub fn read_item_data(&self, index: usize, buffer: &mut [u8], thread_index: usize) -> Result<()> {
        let item = self.index.get(index)?;
        let header = item.header();

        if buffer.len() as u64 != header.data_size() as u64 {
            return Err(Error::BadDataSize {
                expected: header.data_size() as u64,
                actual: buffer.len() as u64,
            });
        }

        self.contexts.check_slot(thread_index)?;

        match &self.backend {
            Backend::Archive { mmap, .. } => {
                self.read_archive_item(mmap, item, buffer, thread_index)
            }
            Backend::Directory => self.read_directory_item(item, buffer),
        }
    }

    /// Read an item by path into `buffer`.
    pub fn read_item_data_by_path(
        &self,
        path: &str,
        buffer: &mut [u8],
        thread_index: usize,
    ) -> Result<()> {
        let index = self.find_required(path)?;
        self.read_item_data(index, buffer, thread_index)
    }

    /// Read an item into a freshly allocated buffer.
    pub fn read_item(&self, index: usize, thread_index: usize) -> Result<Vec<u8>> {
        let size = self.item_data_size(index)? as usize;

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(size)
            .map_err(|_| Error::FailedToAllocate { size })?;
        buffer.resize(size, 0);

        self.read_item_data(index, &mut buffer, thread_index)?;
        Ok(buffer)
    }

    /// Read an item by path into a freshly allocated buffer.
    pub fn read_item_by_path(&self, path: &str, thread_index: usize) -> Result<Vec<u8>> {
        let index = self.find_required(path)?;
        self.read_item(index, thread_index)
    }

    /// Release every decompression context.
    ///
    /// Safe to call at any time; the next read on a slot recreates its context.
    pub fn free_buffers(&self) {
        self.contexts.release();
        tracing::trace!(path = %self.path.display(), "released decompression contexts");
    }

    fn find_required(&self, path: &str) -> Result<usize> {
        self.index
            .find(path)
            .ok_or_else(|| Error::FailedToGetItem(path.to_string()))
    }

    fn read_archive_item(
        &self,
        mmap: &Mmap,
        item: &IndexedItem,
        buffer: &mut [u8],
        thread_index: usize,
    ) -> Result<()> {
        let header = item.header();
        let mut cursor = ByteCursor::new(mmap, &self.path);

        let offset = usize::try_from(header.data_offset()).unwrap_or(usize::MAX);
        cursor.seek(offset)?;
        let payload = cursor.read_bytes(header.zip_size() as usize)?;

        if header.is_compressed() {
            self.contexts
                .decompress(thread_index, item.path(), payload, buffer)?;
        } else {
            buffer.copy_from_slice(payload);
        }

        tracing::trace!(
            path = item.path(),
            zip_size = header.zip_size(),
            data_size = header.data_size(),
            "read item"
        );

        Ok(())
    }

    fn read_directory_item(&self, item: &IndexedItem, buffer: &mut [u8]) -> Result<()> {
        let file_path = self.path.join(item.path());

        let mut file = File::open(&file_path).map_err(|source| Error::FailedToOpenFile {
            path: file_path.clone(),
            source,
        })?;

        // The file may have changed since the directory was indexed
        let size = file
            .metadata()
            .map_err(|source| Error::FailedToReadFile {
                path: file_path.clone(),
                source,
            })?
            .len();
        if size != buffer.len() as u64 {
            return Err(Error::BadDataSize {
                expected: buffer.len() as u64,
                actual: size,
            });
        }

        file.read_exact(buffer)
            .map_err(|source| Error::FailedToReadFile {
                path: file_path,
                source,
            })
    }
}

impl fmt::Debug for PackReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackReader")
            .field("path", &self.path)
            .field("mode", &self.mode())
            .field("item_count", &self.index.len())
            .field("thread_count", &self.contexts.len())
            .finish()
    }
}
