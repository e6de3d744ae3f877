//! Pack archive builder.
//!
//! Takes an ordered list of `(source file, item path)` pairs and writes one
//! archive. Each payload is zstd-compressed when that saves enough space, and
//! files with identical content are stored once and aliased by reference.
//!
//! # Example
//!
//! ```no_run
//! use pack_writer::{collect_directory, pack_files, PackOptions};
//!
//! let entries = collect_directory("assets")?;
//! let stats = pack_files("assets.pack", &entries, &PackOptions::default())?;
//! println!("{} items, {} deduplicated", stats.item_count, stats.reference_count);
//! # Ok::<(), pack_writer::Error>(())
//! ```

mod entry;
mod options;
mod writer;

pub use entry::{collect_directory, PackEntry};
pub use options::{PackOptions, DEFAULT_ZIP_THRESHOLD};
pub use writer::{pack_files, pack_files_with_progress, PackStats};

pub use pack_format::{Error, Result, ResultCode};
