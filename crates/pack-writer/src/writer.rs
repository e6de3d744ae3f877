//! Archive builder.
//!
//! Payloads are streamed into a temporary file next to the output, starting
//! right after the space reserved for the header, item table and path blob.
//! Once every payload is written the reserved space is filled in and the
//! temporary file is renamed over the output, so a failed build never leaves
//! a file that looks like a complete archive.

use std::fs::File;
use std::hash::BuildHasherDefault;
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use hashbrown::{HashMap, HashSet};
use rustc_hash::FxHasher;
use zstd::bulk::Compressor;

use pack_format::{validate_item_path, Error, Header, IntoBytes, ItemHeader, Result};

use crate::entry::PackEntry;
use crate::options::PackOptions;

type FxHashMap<K, V> = HashMap<K, V, BuildHasherDefault<FxHasher>>;
type FxHashSet<T> = HashSet<T, BuildHasherDefault<FxHasher>>;

/// Summary of a finished build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackStats {
    /// Items in the archive.
    pub item_count: u64,
    /// Items that alias an earlier identical payload.
    pub reference_count: u64,
    /// Payloads stored uncompressed.
    pub raw_count: u64,
    /// Payloads stored as zstd frames.
    pub compressed_count: u64,
    /// Bytes of payload written.
    pub payload_size: u64,
    /// Sum of logical item sizes, references included.
    pub data_size: u64,
}

/// Build an archive at `output` from `entries`, in the given order.
pub fn pack_files<P: AsRef<Path>>(
    output: P,
    entries: &[PackEntry],
    options: &PackOptions,
) -> Result<PackStats> {
    pack_files_with_progress(output, entries, options, |_, _| {})
}

/// Build an archive, calling `progress(index, count)` after each item.
pub fn pack_files_with_progress<P, F>(
    output: P,
    entries: &[PackEntry],
    options: &PackOptions,
    mut progress: F,
) -> Result<PackStats>
where
    P: AsRef<Path>,
    F: FnMut(u64, u64),
{
    let output = output.as_ref();
    options.validate()?;

    let path_sizes = validate_entries(entries)?;
    let payload_start = Header::SIZE as u64
        + (ItemHeader::SIZE as u64) * entries.len() as u64
        + path_sizes.iter().map(|&s| s as u64).sum::<u64>();

    let directory = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut temp = tempfile::Builder::new()
        .prefix(".pack-")
        .suffix(".tmp")
        .tempfile_in(directory)
        .map_err(|source| Error::FailedToCreateFile {
            path: output.to_path_buf(),
            source,
        })?;

    let mut session = WriterSession::new(options, payload_start)?;

    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        seek(&mut writer, output, payload_start)?;

        let count = entries.len() as u64;
        for (index, (entry, &path_size)) in entries.iter().zip(&path_sizes).enumerate() {
            session.add(entry, path_size, &mut writer, output)?;
            progress(index as u64, count);
        }

        seek(&mut writer, output, 0)?;
        let header = Header::new(count, options.data_version);
        write(&mut writer, output, header.as_bytes())?;
        for item in &session.items {
            write(&mut writer, output, item.as_bytes())?;
        }
        for entry in entries {
            write(&mut writer, output, entry.item_path.as_bytes())?;
        }

        writer.flush().map_err(|source| Error::FailedToWriteFile {
            path: output.to_path_buf(),
            source,
        })?;
    }

    temp.as_file()
        .sync_all()
        .map_err(|source| Error::FailedToWriteFile {
            path: output.to_path_buf(),
            source,
        })?;
    temp.persist(output)
        .map_err(|e| Error::FailedToCreateFile {
            path: output.to_path_buf(),
            source: e.error,
        })?;

    let stats = session.stats;
    tracing::debug!(
        output = %output.display(),
        items = stats.item_count,
        references = stats.reference_count,
        compressed = stats.compressed_count,
        raw = stats.raw_count,
        payload_size = stats.payload_size,
        data_size = stats.data_size,
        "packed archive"
    );

    Ok(stats)
}

fn validate_entries(entries: &[PackEntry]) -> Result<Vec<u8>> {
    let mut seen = FxHashSet::with_capacity_and_hasher(entries.len(), Default::default());

    entries
        .iter()
        .map(|entry| {
            let size = validate_item_path(&entry.item_path)?;
            if !seen.insert(entry.item_path.as_str()) {
                return Err(Error::BadItemPath {
                    path: entry.item_path.clone(),
                    reason: "path appears more than once",
                });
            }
            Ok(size)
        })
        .collect()
}

struct WriterSession {
    compressor: Compressor<'static>,
    threshold: f32,
    fingerprints: FxHashMap<[u8; 32], ItemHeader>,
    items: Vec<ItemHeader>,
    next_offset: u64,
    data: Vec<u8>,
    stats: PackStats,
}

impl WriterSession {
    fn new(options: &PackOptions, payload_start: u64) -> Result<Self> {
        let compressor =
            Compressor::new(options.compression_level()).map_err(Error::FailedToCreateZstd)?;

        Ok(Self {
            compressor,
            threshold: options.zip_threshold,
            fingerprints: FxHashMap::default(),
            items: Vec::new(),
            next_offset: payload_start,
            data: Vec::new(),
            stats: PackStats::default(),
        })
    }

    fn add<W: Write>(
        &mut self,
        entry: &PackEntry,
        path_size: u8,
        writer: &mut W,
        output: &Path,
    ) -> Result<()> {
        self.read_source(entry)?;
        let data_size = self.data.len() as u32;

        self.stats.item_count += 1;
        self.stats.data_size += data_size as u64;

        let fingerprint: [u8; 32] = blake3::hash(&self.data).into();

        if let Some(canonical) = self.fingerprints.get(&fingerprint) {
            let item = canonical.to_reference(path_size);
            self.items.push(item);
            self.stats.reference_count += 1;

            tracing::trace!(
                path = entry.item_path.as_str(),
                offset = item.data_offset(),
                "stored as reference"
            );
            return Ok(());
        }

        let compressed = self.compress(entry);
        let payload: &[u8] = compressed.as_deref().unwrap_or(&self.data);

        writer
            .write_all(payload)
            .map_err(|source| Error::FailedToWriteFile {
                path: output.to_path_buf(),
                source,
            })?;

        let item = ItemHeader::new(payload.len() as u32, data_size, path_size, self.next_offset);
        self.next_offset += payload.len() as u64;
        self.stats.payload_size += payload.len() as u64;
        if item.is_compressed() {
            self.stats.compressed_count += 1;
        } else {
            self.stats.raw_count += 1;
        }

        tracing::trace!(
            path = entry.item_path.as_str(),
            data_size,
            zip_size = item.zip_size(),
            "stored item"
        );

        self.fingerprints.insert(fingerprint, item);
        self.items.push(item);
        Ok(())
    }

    fn read_source(&mut self, entry: &PackEntry) -> Result<()> {
        let source = &entry.source;
        let mut file = File::open(source).map_err(|e| Error::FailedToOpenFile {
            path: source.clone(),
            source: e,
        })?;

        let size = file
            .metadata()
            .map_err(|e| Error::FailedToReadFile {
                path: source.clone(),
                source: e,
            })?
            .len();

        if size > u32::MAX as u64 {
            return Err(Error::BadDataSize {
                expected: u32::MAX as u64,
                actual: size,
            });
        }

        self.data.clear();
        self.data
            .try_reserve_exact(size as usize)
            .map_err(|_| Error::FailedToAllocate {
                size: size as usize,
            })?;

        file.read_to_end(&mut self.data)
            .map_err(|e| Error::FailedToReadFile {
                path: source.clone(),
                source: e,
            })?;

        if self.data.len() as u64 > u32::MAX as u64 {
            return Err(Error::BadDataSize {
                expected: u32::MAX as u64,
                actual: self.data.len() as u64,
            });
        }

        Ok(())
    }

    /// Compressed payload, or `None` when the raw bytes should be stored.
    fn compress(&mut self, entry: &PackEntry) -> Option<Vec<u8>> {
        if self.data.is_empty() {
            return None;
        }

        let compressed = match self.compressor.compress(&self.data) {
            Ok(compressed) => compressed,
            Err(e) => {
                tracing::warn!(
                    path = entry.item_path.as_str(),
                    error = %e,
                    "compression failed, storing raw"
                );
                return None;
            }
        };

        if accepts_compressed(compressed.len(), self.data.len(), self.threshold) {
            Some(compressed)
        } else {
            None
        }
    }
}

/// Whether a payload compressed from `raw_len` to `zip_len` bytes meets the threshold.
///
/// The ratio is taken in `f32`, the precision thresholds are given in, so a
/// ratio exactly equal to the threshold is accepted.
fn accepts_compressed(zip_len: usize, raw_len: usize, threshold: f32) -> bool {
    zip_len < raw_len && zip_len as f32 / raw_len as f32 <= threshold
}

fn seek<S: Seek>(stream: &mut S, output: &Path, position: u64) -> Result<()> {
    stream
        .seek(SeekFrom::Start(position))
        .map(|_| ())
        .map_err(|source| Error::FailedToSeekFile {
            path: output.to_path_buf(),
            source,
        })
}

fn write<W: Write>(stream: &mut W, output: &Path, bytes: &[u8]) -> Result<()> {
    stream
        .write_all(bytes)
        .map_err(|source| Error::FailedToWriteFile {
            path: output.to_path_buf(),
            source,
        })
}
