//! Extract every item of an archive to disk.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use pack_format::{output_path, read_header, Error, Result};

use crate::reader::{PackReader, ReaderConfig};

/// Unpack every item of `archive` below `output_dir`.
///
/// Returns the number of files written.
pub fn unpack_files<P, Q>(archive: P, output_dir: Q) -> Result<usize>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    unpack_files_with_progress(archive, output_dir, |_, _| {})
}

/// Unpack every item, calling `progress(index, count)` before each item.
///
/// Stops at the first item that fails; files written before it stay on disk.
pub fn unpack_files_with_progress<P, Q, F>(archive: P, output_dir: Q, mut progress: F) -> Result<usize>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    F: FnMut(u64, u64),
{
    let reader = open_for_unpack(archive.as_ref(), 1)?;
    let output_dir = output_dir.as_ref();
    let count = reader.item_count() as u64;

    let mut buffer = Vec::new();

    for index in 0..reader.item_count() {
        progress(index as u64, count);

        let size = reader.item_data_size(index)? as usize;
        buffer.clear();
        buffer
            .try_reserve_exact(size)
            .map_err(|_| Error::FailedToAllocate { size })?;
        buffer.resize(size, 0);

        reader.read_item_data(index, &mut buffer, 0)?;
        write_item(output_dir, reader.item_path(index)?, &buffer)?;
    }

    tracing::debug!(
        archive = %reader.path().display(),
        output = %output_dir.display(),
        items = count,
        "unpacked archive"
    );

    Ok(reader.item_count())
}

/// Unpack on the rayon pool, one decompression slot per worker thread.
///
/// `progress(done, count)` is called after each item completes.
#[cfg(feature = "parallel")]
pub fn unpack_files_parallel<P, Q, F>(archive: P, output_dir: Q, progress: F) -> Result<usize>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    F: FnMut(u64, u64) + Send,
{
    use parking_lot::Mutex;
    use rayon::prelude::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    let threads = rayon::current_num_threads().max(1);
    let reader = open_for_unpack(archive.as_ref(), threads)?;
    let output_dir = output_dir.as_ref();
    let count = reader.item_count() as u64;

    let done = AtomicU64::new(0);
    let progress = Mutex::new(progress);

    (0..reader.item_count())
        .into_par_iter()
        .try_for_each_init(Vec::new, |buffer, index| -> Result<()> {
            let slot = rayon::current_thread_index().unwrap_or(0) % threads;

            let size = reader.item_data_size(index)? as usize;
            buffer.clear();
            buffer
                .try_reserve_exact(size)
                .map_err(|_| Error::FailedToAllocate { size })?;
            buffer.resize(size, 0);

            reader.read_item_data(index, buffer, slot)?;
            write_item(output_dir, reader.item_path(index)?, &buffer[..])?;

            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
            let mut callback = progress.lock();
            (*callback)(finished, count);
            Ok(())
        })?;

    tracing::debug!(
        archive = %reader.path().display(),
        output = %output_dir.display(),
        items = count,
        threads,
        "unpacked archive in parallel"
    );

    Ok(reader.item_count())
}

fn open_for_unpack(archive: &Path, thread_count: usize) -> Result<PackReader> {
    // Unpacking accepts whatever data version the archive carries
    let header = read_header(archive)?;
    let config = ReaderConfig::default()
        .with_thread_count(thread_count)
        .with_data_version(header.data_version());
    PackReader::open(archive, &config)
}

fn write_item(output_dir: &Path, item_path: &str, data: &[u8]) -> Result<()> {
    let target = output_path(output_dir, item_path)?;

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|source| Error::FailedToCreateFile {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let mut file = File::create(&target).map_err(|source| Error::FailedToCreateFile {
        path: target.clone(),
        source,
    })?;
    file.write_all(data)
        .map_err(|source| Error::FailedToWriteFile {
            path: target.clone(),
            source,
        })?;

    tracing::trace!(path = item_path, size = data.len(), "wrote item");
    Ok(())
}
