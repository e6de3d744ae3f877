//! Archive header and item header layouts.
//!
//! Both structures are stored in host byte order exactly as laid out here;
//! the `is_big_endian` flag records which order the writer used.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{Error, Result};

/// Magic bytes at the start of every archive.
pub const PACK_MAGIC: [u8; 4] = *b"PACK";

/// Major format version written by this library.
pub const FORMAT_VERSION_MAJOR: u8 = 1;

/// Minor format version written by this library.
pub const FORMAT_VERSION_MINOR: u8 = 0;

/// Patch format version written by this library.
pub const FORMAT_VERSION_PATCH: u8 = 0;

/// Longest item path that fits in [`ItemHeader::path_size`].
pub const MAX_PATH_SIZE: usize = u8::MAX as usize;

/// Get the library format version as `(major, minor, patch)`.
#[inline]
pub const fn library_version() -> (u8, u8, u8) {
    (FORMAT_VERSION_MAJOR, FORMAT_VERSION_MINOR, FORMAT_VERSION_PATCH)
}

/// Check whether the host stores integers big endian.
#[inline]
pub const fn host_is_big_endian() -> bool {
    cfg!(target_endian = "big")
}

/// Archive header, found at offset zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct Header {
    /// Format magic, always [`PACK_MAGIC`]
    pub magic: [u8; 4],
    /// Major format version
    pub version_major: u8,
    /// Minor format version
    pub version_minor: u8,
    /// Patch format version
    pub version_patch: u8,
    /// Non-zero if the writer was big endian
    pub is_big_endian: u8,
    /// Number of item headers that follow
    pub item_count: u64,
    /// Application-defined payload schema tag
    pub data_version: u64,
}

impl Header {
    /// Encoded size in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Create a header for the current library version and host byte order.
    pub fn new(item_count: u64, data_version: u64) -> Self {
        Self {
            magic: PACK_MAGIC,
            version_major: FORMAT_VERSION_MAJOR,
            version_minor: FORMAT_VERSION_MINOR,
            version_patch: FORMAT_VERSION_PATCH,
            is_big_endian: host_is_big_endian() as u8,
            item_count,
            data_version,
        }
    }

    /// Get the item count.
    #[inline]
    pub fn item_count(&self) -> u64 {
        self.item_count
    }

    /// Get the data version tag.
    #[inline]
    pub fn data_version(&self) -> u64 {
        self.data_version
    }

    /// Get the format version as `(major, minor, patch)`.
    #[inline]
    pub fn version(&self) -> (u8, u8, u8) {
        (self.version_major, self.version_minor, self.version_patch)
    }

    /// Check if the archive was written big endian.
    #[inline]
    pub fn is_big_endian(&self) -> bool {
        self.is_big_endian != 0
    }

    /// Check only the magic bytes.
    pub fn validate_magic(&self) -> Result<()> {
        if self.magic != PACK_MAGIC {
            return Err(Error::BadFileType {
                expected: PACK_MAGIC,
                actual: self.magic,
            });
        }
        Ok(())
    }

    /// Validate magic, format version, byte order and data version, in that order.
    ///
    /// The major version must match exactly and the minor version may not be
    /// newer than this library's. The patch version is not checked.
    pub fn validate(&self, data_version: u64) -> Result<()> {
        self.validate_magic()?;

        if self.version_major != FORMAT_VERSION_MAJOR || self.version_minor > FORMAT_VERSION_MINOR
        {
            return Err(Error::BadFileVersion {
                major: self.version_major,
                minor: self.version_minor,
                patch: self.version_patch,
            });
        }

        if self.is_big_endian() != host_is_big_endian() {
            return Err(Error::BadFileEndianness {
                is_big_endian: self.is_big_endian(),
            });
        }

        if self.data_version() != data_version {
            return Err(Error::BadFileDataVersion {
                expected: data_version,
                actual: self.data_version(),
            });
        }

        Ok(())
    }
}

/// Per-item header; `item_count` of these follow the [`Header`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct ItemHeader {
    /// Bytes physically stored
    pub zip_size: u32,
    /// Logical (decompressed) size
    pub data_size: u32,
    /// Length of the item path in the path blob
    pub path_size: u8,
    /// Non-zero if the payload aliases an earlier item
    pub is_reference: u8,
    /// Absolute offset of the stored payload
    pub data_offset: u64,
}

impl ItemHeader {
    /// Encoded size in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Create a header for a physically stored payload.
    pub fn new(zip_size: u32, data_size: u32, path_size: u8, data_offset: u64) -> Self {
        Self {
            zip_size,
            data_size,
            path_size,
            is_reference: 0,
            data_offset,
        }
    }

    /// Create a reference header aliasing this item's payload.
    pub fn to_reference(&self, path_size: u8) -> Self {
        Self {
            path_size,
            is_reference: 1,
            ..*self
        }
    }

    /// Get the stored size.
    #[inline]
    pub fn zip_size(&self) -> u32 {
        self.zip_size
    }

    /// Get the logical size.
    #[inline]
    pub fn data_size(&self) -> u32 {
        self.data_size
    }

    /// Get the path length.
    #[inline]
    pub fn path_size(&self) -> u8 {
        self.path_size
    }

    /// Get the payload offset.
    #[inline]
    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }

    /// Check if this item aliases another item's payload.
    #[inline]
    pub fn is_reference(&self) -> bool {
        self.is_reference != 0
    }

    /// Check if the payload is zstd-compressed.
    #[inline]
    pub fn is_compressed(&self) -> bool {
        self.zip_size() != self.data_size()
    }

    /// Check the size invariants of a header read from disk.
    pub fn validate(&self) -> Result<()> {
        if self.zip_size() > self.data_size() {
            return Err(Error::BadDataSize {
                expected: self.data_size() as u64,
                actual: self.zip_size() as u64,
            });
        }
        Ok(())
    }
}

/// Read the archive header without building an index.
///
/// Only the magic is validated, so headers of other format versions or
/// byte orders can still be inspected.
pub fn read_header<P: AsRef<Path>>(path: P) -> Result<Header> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|source| Error::FailedToOpenFile {
        path: path.to_path_buf(),
        source,
    })?;

    let mut bytes = [0u8; Header::SIZE];
    file.read_exact(&mut bytes)
        .map_err(|source| Error::FailedToReadFile {
            path: path.to_path_buf(),
            source,
        })?;

    let header = Header::read_from_bytes(&bytes).map_err(|_| Error::FailedToReadFile {
        path: path.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidData, "malformed header"),
    })?;
    header.validate_magic()?;

    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResultCode;

    #[test]
    fn test_layout_sizes() {
        assert_eq!(Header::SIZE, 24);
        assert_eq!(ItemHeader::SIZE, 18);
    }

    #[test]
    fn test_header_roundtrip_bytes() {
        let header = Header::new(3, 123);
        let bytes = header.as_bytes();

        assert_eq!(&bytes[..4], b"PACK");
        assert_eq!(bytes[4], FORMAT_VERSION_MAJOR);
        assert_eq!(bytes[7], host_is_big_endian() as u8);
        assert_eq!(Header::read_from_bytes(bytes).unwrap(), header);
    }

    #[test]
    fn test_validate_order() {
        let mut header = Header::new(0, 7);
        assert!(header.validate(7).is_ok());
        assert_eq!(
            header.validate(8).unwrap_err().code(),
            ResultCode::BadFileDataVersion
        );

        header.is_big_endian = (!host_is_big_endian()) as u8;
        assert_eq!(
            header.validate(7).unwrap_err().code(),
            ResultCode::BadFileEndianness
        );

        header.version_major = FORMAT_VERSION_MAJOR + 1;
        assert_eq!(
            header.validate(7).unwrap_err().code(),
            ResultCode::BadFileVersion
        );

        header.magic = *b"KCAP";
        assert_eq!(header.validate(7).unwrap_err().code(), ResultCode::BadFileType);
    }

    #[test]
    fn test_newer_minor_is_refused() {
        let mut header = Header::new(0, 0);
        header.version_minor = FORMAT_VERSION_MINOR + 1;
        assert_eq!(
            header.validate(0).unwrap_err().code(),
            ResultCode::BadFileVersion
        );

        header.version_minor = FORMAT_VERSION_MINOR;
        header.version_patch = FORMAT_VERSION_PATCH.wrapping_add(9);
        assert!(header.validate(0).is_ok());
    }

    #[test]
    fn test_reference_copies_payload_fields() {
        let canonical = ItemHeader::new(10, 1000, 5, 4096);
        let reference = canonical.to_reference(7);

        assert!(reference.is_reference());
        assert!(!canonical.is_reference());
        assert_eq!(reference.data_offset(), 4096);
        assert_eq!(reference.zip_size(), 10);
        assert_eq!(reference.data_size(), 1000);
        assert_eq!(reference.path_size(), 7);
        assert!(reference.is_compressed());
    }

    #[test]
    fn test_item_validate() {
        assert!(ItemHeader::new(4, 4, 1, 0).validate().is_ok());
        assert_eq!(
            ItemHeader::new(5, 4, 1, 0).validate().unwrap_err().code(),
            ResultCode::BadDataSize
        );
    }

    #[test]
    fn test_read_header_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.pack");
        std::fs::write(&path, Header::new(2, 99).as_bytes()).unwrap();

        let header = read_header(&path).unwrap();
        assert_eq!(header.item_count(), 2);
        assert_eq!(header.data_version(), 99);
        assert_eq!(header.version(), library_version());
    }

    #[test]
    fn test_read_header_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = read_header(dir.path().join("missing.pack")).unwrap_err();
        assert_eq!(missing.code(), ResultCode::FailedToOpenFile);

        let short = dir.path().join("short.pack");
        std::fs::write(&short, b"PACK").unwrap();
        assert_eq!(
            read_header(&short).unwrap_err().code(),
            ResultCode::FailedToReadFile
        );

        let wrong = dir.path().join("wrong.pack");
        std::fs::write(&wrong, [0xAAu8; Header::SIZE]).unwrap();
        assert_eq!(read_header(&wrong).unwrap_err().code(), ResultCode::BadFileType);
    }
}
