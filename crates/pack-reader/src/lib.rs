//! Random-access reader for Pack archives.
//!
//! [`PackReader`] memory-maps an archive, parses its index once and then
//! serves item reads from any number of threads. Each thread passes a slot
//! index that selects its own zstd decompression context.
//!
//! A reader can also be opened over a plain directory
//! ([`ReaderMode::ResourceDirectory`]), exposing the same API during
//! development without packing first.
//!
//! # Example
//!
//! ```no_run
//! use pack_reader::{unpack_files, PackReader, ReaderConfig};
//!
//! let reader = PackReader::open("assets.pack", &ReaderConfig::default())?;
//! for item in reader.items() {
//!     println!("{} ({} bytes)", item.path(), item.header().data_size());
//! }
//!
//! unpack_files("assets.pack", "unpacked")?;
//! # Ok::<(), pack_reader::Error>(())
//! ```
//!
//! # Features
//!
//! - `parallel` - [`unpack_files_parallel`] on the rayon thread pool

mod context;
mod index;
mod reader;
mod unpack;

pub use index::{ArchiveIndex, IndexedItem};
pub use reader::{PackReader, ReaderConfig, ReaderMode};
pub use unpack::{unpack_files, unpack_files_with_progress};

#[cfg(feature = "parallel")]
pub use unpack::unpack_files_parallel;

pub use pack_format::{Error, Result, ResultCode};
