//! Bounds-checked cursor over archive bytes.
//!
//! [`ByteCursor`] walks a byte slice (usually a memory-mapped archive) and
//! turns every out-of-bounds access into [`Error::FailedToReadFile`], so a
//! truncated archive can never cause a read past the end of the mapping.

use std::io;
use std::path::Path;

use zerocopy::FromBytes;

use crate::{Error, Result};

/// A cursor that reads fixed layouts and byte runs from a slice without copying.
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use pack_format::ByteCursor;
///
/// let data = [0x01u8, 0x02, 0x03, 0x04, 0x05];
/// let mut cursor = ByteCursor::new(&data, Path::new("inline"));
///
/// assert_eq!(cursor.read_bytes(2).unwrap(), &[0x01, 0x02]);
/// assert_eq!(cursor.remaining(), 3);
/// assert!(cursor.read_bytes(4).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    position: usize,
    source: &'a Path,
}

impl<'a> ByteCursor<'a> {
    /// Create a cursor at the start of `data`; `source` names the file in errors.
    #[inline]
    pub const fn new(data: &'a [u8], source: &'a Path) -> Self {
        Self {
            data,
            position: 0,
            source,
        }
    }

    /// Get the current position.
    #[inline]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Get the total length of the underlying buffer.
    #[inline]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the underlying buffer is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the number of bytes remaining to read.
    #[inline]
    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Seek to an absolute position.
    ///
    /// Seeking exactly to the end is allowed; past it is a seek error.
    pub fn seek(&mut self, position: usize) -> Result<()> {
        if position > self.data.len() {
            return Err(Error::FailedToSeekFile {
                path: self.source.to_path_buf(),
                source: io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "offset {} is past the end of the file ({} bytes)",
                        position,
                        self.data.len()
                    ),
                ),
            });
        }
        self.position = position;
        Ok(())
    }

    /// Fail unless at least `count` more bytes are available.
    pub fn ensure(&self, count: usize) -> Result<()> {
        if self.remaining() < count {
            return Err(self.eof(count));
        }
        Ok(())
    }

    /// Read bytes and advance the position.
    #[inline]
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        self.ensure(count)?;
        let bytes = &self.data[self.position..self.position + count];
        self.position += count;
        Ok(bytes)
    }

    /// Read a fixed-layout struct.
    #[inline]
    pub fn read_struct<T: FromBytes>(&mut self) -> Result<T> {
        let size = std::mem::size_of::<T>();
        let bytes = self.read_bytes(size)?;
        T::read_from_bytes(bytes).map_err(|_| self.eof(size))
    }

    fn eof(&self, needed: usize) -> Error {
        Error::FailedToReadFile {
            path: self.source.to_path_buf(),
            source: io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "needed {} bytes at offset {} but only {} available",
                    needed,
                    self.position,
                    self.remaining()
                ),
            ),
        }
    }
}
