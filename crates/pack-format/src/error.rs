//! Error types and result codes shared by every Pack crate.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when reading or writing Pack archives.
///
/// Every variant maps onto a stable [`ResultCode`] through [`Error::code`],
/// which is what binding layers hand to foreign callers.
#[derive(Debug, Error)]
pub enum Error {
    /// A buffer of the requested size could not be reserved.
    #[error("failed to allocate {size} bytes")]
    FailedToAllocate { size: usize },

    /// A zstd compression or decompression context could not be created.
    #[error("failed to create zstd context: {0}")]
    FailedToCreateZstd(#[source] io::Error),

    /// The output file could not be created.
    #[error("failed to create file '{}': {source}", .path.display())]
    FailedToCreateFile { path: PathBuf, source: io::Error },

    /// The input file could not be opened.
    #[error("failed to open file '{}': {source}", .path.display())]
    FailedToOpenFile { path: PathBuf, source: io::Error },

    /// Writing to a file failed.
    #[error("failed to write file '{}': {source}", .path.display())]
    FailedToWriteFile { path: PathBuf, source: io::Error },

    /// Reading from a file failed or the file ended early.
    #[error("failed to read file '{}': {source}", .path.display())]
    FailedToReadFile { path: PathBuf, source: io::Error },

    /// A seek went past the end of the file or was rejected by the OS.
    #[error("failed to seek file '{}': {source}", .path.display())]
    FailedToSeekFile { path: PathBuf, source: io::Error },

    /// A directory could not be enumerated.
    #[error("failed to read directory '{}': {source}", .path.display())]
    FailedToGetDirectory { path: PathBuf, source: io::Error },

    /// Item payload failed to decompress to its declared size.
    #[error("failed to decompress item '{path}': {reason}")]
    FailedToDecompress { path: String, reason: String },

    /// The requested item does not exist.
    #[error("item not found: {0}")]
    FailedToGetItem(String),

    /// A size did not match what the archive declares.
    #[error("bad data size: expected {expected} bytes, got {actual}")]
    BadDataSize { expected: u64, actual: u64 },

    /// The file does not start with the Pack magic.
    #[error("bad file type: expected magic {expected:?}, got {actual:?}")]
    BadFileType { expected: [u8; 4], actual: [u8; 4] },

    /// The archive was written by an incompatible format version.
    #[error("unsupported file version {major}.{minor}.{patch}")]
    BadFileVersion { major: u8, minor: u8, patch: u8 },

    /// The archive byte order differs from the host byte order.
    #[error("bad file endianness: archive big endian flag is {is_big_endian}")]
    BadFileEndianness { is_big_endian: bool },

    /// The application data version tag does not match.
    #[error("bad file data version: expected {expected}, got {actual}")]
    BadFileDataVersion { expected: u64, actual: u64 },

    /// An item path is empty, too long, duplicated, or unsafe to materialize.
    #[error("bad item path '{path}': {reason}")]
    BadItemPath { path: String, reason: &'static str },

    /// A thread slot outside `[0, thread_count)`, or a zero thread count.
    #[error("bad thread slot {slot}: reader has {count} slots")]
    BadThreadSlot { slot: usize, count: usize },

    /// Compression threshold outside `(0, 1]`.
    #[error("bad zip threshold {0}: must be in (0, 1]")]
    BadZipThreshold(f32),
}

impl Error {
    /// Get the stable result code for this error.
    pub fn code(&self) -> ResultCode {
        match self {
            Self::FailedToAllocate { .. } => ResultCode::FailedToAllocate,
            Self::FailedToCreateZstd(_) => ResultCode::FailedToCreateZstd,
            Self::FailedToCreateFile { .. } => ResultCode::FailedToCreateFile,
            Self::FailedToOpenFile { .. } => ResultCode::FailedToOpenFile,
            Self::FailedToWriteFile { .. } => ResultCode::FailedToWriteFile,
            Self::FailedToReadFile { .. } => ResultCode::FailedToReadFile,
            Self::FailedToSeekFile { .. } => ResultCode::FailedToSeekFile,
            Self::FailedToGetDirectory { .. } => ResultCode::FailedToGetDirectory,
            Self::FailedToDecompress { .. } => ResultCode::FailedToDecompress,
            Self::FailedToGetItem(_) => ResultCode::FailedToGetItem,
            Self::BadDataSize { .. } => ResultCode::BadDataSize,
            Self::BadFileType { .. } => ResultCode::BadFileType,
            Self::BadFileVersion { .. } => ResultCode::BadFileVersion,
            Self::BadFileEndianness { .. } => ResultCode::BadFileEndianness,
            Self::BadFileDataVersion { .. } => ResultCode::BadFileDataVersion,
            Self::BadItemPath { .. } => ResultCode::BadItemPath,
            Self::BadThreadSlot { .. } => ResultCode::BadThreadSlot,
            Self::BadZipThreshold(_) => ResultCode::BadZipThreshold,
        }
    }
}

/// Result type for Pack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric result codes, in the order binding layers expect them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResultCode {
    Success = 0,
    FailedToAllocate = 1,
    FailedToCreateZstd = 2,
    FailedToCreateFile = 3,
    FailedToOpenFile = 4,
    FailedToWriteFile = 5,
    FailedToReadFile = 6,
    FailedToSeekFile = 7,
    FailedToGetDirectory = 8,
    FailedToDecompress = 9,
    FailedToGetItem = 10,
    BadDataSize = 11,
    BadFileType = 12,
    BadFileVersion = 13,
    BadFileEndianness = 14,
    BadFileDataVersion = 15,
    BadItemPath = 16,
    BadThreadSlot = 17,
    BadZipThreshold = 18,
}

impl ResultCode {
    /// Number of defined result codes.
    pub const COUNT: usize = 19;

    /// Get the code for an operation result.
    pub fn of<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(error) => error.code(),
        }
    }

    /// Human-readable name of the code.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::FailedToAllocate => "Failed to allocate",
            Self::FailedToCreateZstd => "Failed to create ZSTD",
            Self::FailedToCreateFile => "Failed to create file",
            Self::FailedToOpenFile => "Failed to open file",
            Self::FailedToWriteFile => "Failed to write file",
            Self::FailedToReadFile => "Failed to read file",
            Self::FailedToSeekFile => "Failed to seek file",
            Self::FailedToGetDirectory => "Failed to get directory",
            Self::FailedToDecompress => "Failed to decompress",
            Self::FailedToGetItem => "Failed to get item",
            Self::BadDataSize => "Bad data size",
            Self::BadFileType => "Bad file type",
            Self::BadFileVersion => "Bad file version",
            Self::BadFileEndianness => "Bad file endianness",
            Self::BadFileDataVersion => "Bad file data version",
            Self::BadItemPath => "Bad item path",
            Self::BadThreadSlot => "Bad thread slot",
            Self::BadZipThreshold => "Bad zip threshold",
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<u8> for ResultCode {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Success,
            1 => Self::FailedToAllocate,
            2 => Self::FailedToCreateZstd,
            3 => Self::FailedToCreateFile,
            4 => Self::FailedToOpenFile,
            5 => Self::FailedToWriteFile,
            6 => Self::FailedToReadFile,
            7 => Self::FailedToSeekFile,
            8 => Self::FailedToGetDirectory,
            9 => Self::FailedToDecompress,
            10 => Self::FailedToGetItem,
            11 => Self::BadDataSize,
            12 => Self::BadFileType,
            13 => Self::BadFileVersion,
            14 => Self::BadFileEndianness,
            15 => Self::BadFileDataVersion,
            16 => Self::BadItemPath,
            17 => Self::BadThreadSlot,
            18 => Self::BadZipThreshold,
            other => return Err(other),
        })
    }
}
