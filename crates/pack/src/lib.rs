//! Pack - single-file asset archives.
//!
//! This crate ties the Pack crates together behind one dependency.
//!
//! # Crates
//!
//! - [`pack_format`] - Binary layout, header validation, result codes
//! - [`pack_reader`] - Memory-mapped multithreaded reader and unpacker
//! - [`pack_writer`] - Archive builder with zstd compression and deduplication
//!
//! # Example
//!
//! ```no_run
//! use pack::prelude::*;
//!
//! let entries = collect_directory("assets")?;
//! pack_files("assets.pack", &entries, &PackOptions::default())?;
//!
//! let reader = PackReader::open("assets.pack", &ReaderConfig::default())?;
//! let logo = reader.read_item_by_path("textures/logo.png", 0)?;
//! println!("logo is {} bytes", logo.len());
//! # Ok::<(), pack::Error>(())
//! ```

pub use pack_format as format;
pub use pack_reader as reader;
pub use pack_writer as writer;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use pack_format::{library_version, read_header, Error, Header, ItemHeader, ResultCode};
    pub use pack_reader::{
        unpack_files, unpack_files_with_progress, PackReader, ReaderConfig, ReaderMode,
    };
    pub use pack_writer::{
        collect_directory, pack_files, pack_files_with_progress, PackEntry, PackOptions, PackStats,
    };

    #[cfg(feature = "parallel")]
    pub use pack_reader::unpack_files_parallel;
}

pub use pack_format::{Error, Result, ResultCode};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use std::fs;
    use std::path::{Path, PathBuf};

    /// Deterministic incompressible bytes.
    fn noise(len: usize, mut state: u64) -> Vec<u8> {
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                (state >> 24) as u8
            })
            .collect()
    }

    fn write_tree(root: &Path, files: &[(&str, &[u8])]) {
        for (path, data) in files {
            let target = root.join(path);
            fs::create_dir_all(target.parent().unwrap()).unwrap();
            fs::write(target, data).unwrap();
        }
    }

    fn pack_tree(dir: &Path, files: &[(&str, &[u8])], options: &PackOptions) -> PathBuf {
        let root = dir.join("assets");
        write_tree(&root, files);
        let entries = collect_directory(&root).unwrap();
        let archive = dir.join("assets.pack");
        pack_files(&archive, &entries, options).unwrap();
        archive
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let text = b"The quick brown fox jumps over the lazy dog. ".repeat(40);
        let random = noise(2048, 0x9E37_79B9_7F4A_7C15);
        let files: [(&str, &[u8]); 4] = [
            ("readme.txt", &text),
            ("files/тест", b"unicode path"),
            ("bin/random.dat", &random),
            ("bin/empty", b""),
        ];
        let archive = pack_tree(dir.path(), &files, &PackOptions::default());

        let reader = PackReader::open(&archive, &ReaderConfig::default()).unwrap();
        assert_eq!(reader.item_count(), 4);

        for (path, data) in files {
            let index = reader.item_index(path).unwrap();
            assert_eq!(reader.item_path(index).unwrap(), path);
            assert_eq!(reader.read_item(index, 0).unwrap(), data);
        }

        let readme = reader.item_index("readme.txt").unwrap();
        assert!(reader.item_zip_size(readme).unwrap() < reader.item_data_size(readme).unwrap());
    }

    #[test]
    fn test_duplicate_content_becomes_reference() {
        let dir = tempfile::tempdir().unwrap();
        let letters = [b'a'; 1000];
        let options = PackOptions::default().with_zip_threshold(0.5);
        let files: [(&str, &[u8]); 2] = [("a.txt", &letters), ("b.txt", &letters)];
        let archive = pack_tree(dir.path(), &files, &options);

        let reader = PackReader::open(&archive, &ReaderConfig::default()).unwrap();
        assert_eq!(reader.item_count(), 2);

        let a = reader.item_index("a.txt").unwrap();
        let b = reader.item_index("b.txt").unwrap();
        assert!(!reader.is_item_reference(a).unwrap());
        assert!(reader.is_item_reference(b).unwrap());
        assert!(reader.item_zip_size(a).unwrap() < 100);
        assert_eq!(reader.item_file_offset(a).unwrap(), reader.item_file_offset(b).unwrap());
        assert_eq!(reader.item_zip_size(a).unwrap(), reader.item_zip_size(b).unwrap());
        assert_eq!(reader.item_data_size(b).unwrap(), 1000);

        let out = dir.path().join("out");
        assert_eq!(unpack_files(&archive, &out).unwrap(), 2);
        assert_eq!(fs::read(out.join("a.txt")).unwrap(), letters);
        assert_eq!(fs::read(out.join("b.txt")).unwrap(), letters);
    }

    #[test]
    fn test_incompressible_stored_raw() {
        let dir = tempfile::tempdir().unwrap();
        let random = noise(1000, 0xDEAD_BEEF_CAFE_F00D);
        let options = PackOptions::default().with_zip_threshold(0.9);
        let files: [(&str, &[u8]); 1] = [("random.bin", &random)];
        let archive = pack_tree(dir.path(), &files, &options);

        let reader = PackReader::open(&archive, &ReaderConfig::default()).unwrap();
        assert_eq!(reader.item_zip_size(0).unwrap(), 1000);
        assert_eq!(reader.item_data_size(0).unwrap(), 1000);
        assert_eq!(reader.read_item(0, 0).unwrap(), random);
    }

    #[test]
    fn test_truncated_archive() {
        let dir = tempfile::tempdir().unwrap();
        let random = noise(4000, 42);
        let big = b"0123456789".repeat(100);
        let files: [(&str, &[u8]); 3] = [("a", b"small"), ("b", &random), ("c", &big)];
        let archive = pack_tree(dir.path(), &files, &PackOptions::default());
        let bytes = fs::read(&archive).unwrap();

        // Cut inside the item table
        fs::write(&archive, &bytes[..Header::SIZE + 10]).unwrap();
        let error = PackReader::open(&archive, &ReaderConfig::default()).unwrap_err();
        assert_eq!(error.code(), ResultCode::FailedToReadFile);

        // Cut inside the payload region: opens, but the last item cannot be read
        fs::write(&archive, &bytes[..bytes.len() - 50]).unwrap();
        let reader = PackReader::open(&archive, &ReaderConfig::default()).unwrap();
        let last = reader.item_count() - 1;
        let code = reader.read_item(last, 0).unwrap_err().code();
        assert!(matches!(
            code,
            ResultCode::FailedToReadFile | ResultCode::FailedToSeekFile
        ));
    }

    #[test]
    fn test_bad_magic() {
        let dir = tempfile::tempdir().unwrap();
        let files: [(&str, &[u8]); 1] = [("a", b"abc")];
        let archive = pack_tree(dir.path(), &files, &PackOptions::default());

        let mut bytes = fs::read(&archive).unwrap();
        bytes[..4].copy_from_slice(b"ZIP!");
        fs::write(&archive, &bytes).unwrap();

        let error = PackReader::open(&archive, &ReaderConfig::default()).unwrap_err();
        assert_eq!(error.code(), ResultCode::BadFileType);
        assert_eq!(read_header(&archive).unwrap_err().code(), ResultCode::BadFileType);
    }

    #[test]
    fn test_concurrent_reads_on_distinct_slots() {
        let dir = tempfile::tempdir().unwrap();
        let payloads: Vec<(String, Vec<u8>)> = (0..24)
            .map(|i| {
                let data = if i % 2 == 0 {
                    format!("item {} ", i).repeat(200).into_bytes()
                } else {
                    noise(700 + i, i as u64 + 1)
                };
                (format!("items/{:02}.bin", i), data)
            })
            .collect();
        let files: Vec<(&str, &[u8])> = payloads
            .iter()
            .map(|(p, d)| (p.as_str(), d.as_slice()))
            .collect();
        let archive = pack_tree(dir.path(), &files, &PackOptions::default());

        let threads = 4;
        let config = ReaderConfig::default().with_thread_count(threads);
        let reader = PackReader::open(&archive, &config).unwrap();

        std::thread::scope(|scope| {
            for slot in 0..threads {
                let reader = &reader;
                let payloads = &payloads;
                scope.spawn(move || {
                    for round in 0..3 {
                        for (path, data) in payloads.iter().skip(slot).step_by(threads) {
                            let index = reader.item_index(path).unwrap();
                            let mut buffer = vec![0u8; reader.item_data_size(index).unwrap() as usize];
                            reader.read_item_data(index, &mut buffer, slot).unwrap();
                            assert_eq!(&buffer, data, "round {}", round);
                        }
                        if round == 1 {
                            reader.free_buffers();
                        }
                    }
                });
            }
        });
    }

    #[test]
    fn test_resource_directory_matches_archive() {
        let dir = tempfile::tempdir().unwrap();
        let files: [(&str, &[u8]); 2] = [("x/y.txt", b"yyyy"), ("z.txt", b"zz")];
        let archive = pack_tree(dir.path(), &files, &PackOptions::default());

        let packed = PackReader::open(&archive, &ReaderConfig::default()).unwrap();
        let loose = PackReader::open(
            dir.path().join("assets"),
            &ReaderConfig::default().with_mode(ReaderMode::ResourceDirectory),
        )
        .unwrap();

        assert_eq!(packed.item_count(), loose.item_count());
        for (path, _) in files {
            assert_eq!(
                packed.read_item_by_path(path, 0).unwrap(),
                loose.read_item_by_path(path, 0).unwrap()
            );
        }
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_unpack_matches_sequential() {
        let dir = tempfile::tempdir().unwrap();
        let text = b"parallel ".repeat(300);
        let files: [(&str, &[u8]); 3] = [("p/one", &text), ("p/two", &text), ("q", b"q")];
        let archive = pack_tree(dir.path(), &files, &PackOptions::default());

        let out = dir.path().join("par");
        assert_eq!(unpack_files_parallel(&archive, &out, |_, _| {}).unwrap(), 3);
        assert_eq!(fs::read(out.join("p").join("two")).unwrap(), text);
    }

    #[test]
    fn test_version() {
        assert!(!crate::VERSION.is_empty());
        assert_eq!(library_version(), (1, 0, 0));
    }
}
