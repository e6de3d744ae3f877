//! Binary format definition for Pack archives.
//!
//! A Pack archive is a single file laid out in a fixed order:
//!
//! ```text
//! [Header][ItemHeader x item_count][path blob][payload bytes]
//! ```
//!
//! - [`Header`] - magic, format version, byte order flag, item count, data version
//! - [`ItemHeader`] - stored size, logical size, path length, reference flag, payload offset
//! - The path blob holds every item path back to back, `path_size` bytes each
//! - Payloads are either raw bytes or a single zstd frame
//!
//! This crate also owns the [`Error`] type and stable [`ResultCode`]s shared by
//! the reader and writer crates.
//!
//! # Example
//!
//! ```no_run
//! use pack_format::read_header;
//!
//! let header = read_header("assets.pack")?;
//! println!("{} items, data version {}", header.item_count(), header.data_version());
//! # Ok::<(), pack_format::Error>(())
//! ```

mod cursor;
mod error;
mod header;
mod path;

pub use cursor::ByteCursor;
pub use error::{Error, Result, ResultCode};
pub use header::{
    host_is_big_endian, library_version, read_header, Header, ItemHeader, FORMAT_VERSION_MAJOR,
    FORMAT_VERSION_MINOR, FORMAT_VERSION_PATCH, MAX_PATH_SIZE, PACK_MAGIC,
};
pub use path::{item_path_from_relative, output_path, validate_item_path};

/// Re-export zerocopy traits for convenience
pub use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};
