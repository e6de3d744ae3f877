//! Per-slot zstd decompression contexts.

use parking_lot::Mutex;
use zstd::bulk::Decompressor;

use pack_format::{Error, Result};

type Slot = Mutex<Option<Decompressor<'static>>>;

/// A fixed pool of decompression contexts, one per thread slot.
///
/// Each slot is guarded by its own mutex, so two threads that share a slot
/// take turns instead of corrupting the context.
pub(crate) struct ContextPool {
    slots: Box<[Slot]>,
}

impl ContextPool {
    /// Create `count` slots, allocating the contexts up front when `eager` is set.
    pub fn new(count: usize, eager: bool) -> Result<Self> {
        if count == 0 {
            return Err(Error::BadThreadSlot { slot: 0, count: 0 });
        }

        let slots = (0..count)
            .map(|_| {
                let context = if eager { Some(create()?) } else { None };
                Ok(Mutex::new(context))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            slots: slots.into_boxed_slice(),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn check_slot(&self, slot: usize) -> Result<()> {
        if slot >= self.slots.len() {
            return Err(Error::BadThreadSlot {
                slot,
                count: self.slots.len(),
            });
        }
        Ok(())
    }

    /// Decompress `src` into `dst` using the context of `slot`.
    ///
    /// `dst` must be exactly the declared item size; producing any other
    /// number of bytes is a decompression failure.
    pub fn decompress(&self, slot: usize, path: &str, src: &[u8], dst: &mut [u8]) -> Result<()> {
        self.check_slot(slot)?;

        let mut guard = self.slots[slot].lock();
        let context = match &mut *guard {
            Some(context) => context,
            empty @ None => empty.insert(create()?),
        };

        let written = context
            .decompress_to_buffer(src, dst)
            .map_err(|e| Error::FailedToDecompress {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        if written != dst.len() {
            return Err(Error::FailedToDecompress {
                path: path.to_string(),
                reason: format!("produced {} bytes, expected {}", written, dst.len()),
            });
        }

        Ok(())
    }

    /// Drop every context. Slots recreate them on next use.
    pub fn release(&self) {
        for slot in self.slots.iter() {
            *slot.lock() = None;
        }
    }
}

fn create() -> Result<Decompressor<'static>> {
    Decompressor::new().map_err(Error::FailedToCreateZstd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pack_format::ResultCode;

    #[test]
    fn test_zero_slots_rejected() {
        let error = ContextPool::new(0, true).err().unwrap();
        assert_eq!(error.code(), ResultCode::BadThreadSlot);
    }

    #[test]
    fn test_decompress_and_release() {
        let data = b"hello hello hello hello hello hello".to_vec();
        let frame = zstd::bulk::compress(&data, 3).unwrap();

        let pool = ContextPool::new(2, false).unwrap();
        let mut out = vec![0u8; data.len()];
        pool.decompress(1, "greeting", &frame, &mut out).unwrap();
        assert_eq!(out, data);

        pool.release();
        pool.release();

        let mut out = vec![0u8; data.len()];
        pool.decompress(1, "greeting", &frame, &mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_size_mismatch_is_decompress_error() {
        let data = vec![7u8; 64];
        let frame = zstd::bulk::compress(&data, 3).unwrap();

        let pool = ContextPool::new(1, true).unwrap();
        let mut larger = vec![0u8; 65];
        let error = pool.decompress(0, "x", &frame, &mut larger).unwrap_err();
        assert_eq!(error.code(), ResultCode::FailedToDecompress);

        let mut smaller = vec![0u8; 10];
        let error = pool.decompress(0, "x", &frame, &mut smaller).unwrap_err();
        assert_eq!(error.code(), ResultCode::FailedToDecompress);
    }

    #[test]
    fn test_bad_slot() {
        let pool = ContextPool::new(1, true).unwrap();
        let error = pool.decompress(1, "x", &[], &mut []).unwrap_err();
        assert_eq!(error.code(), ResultCode::BadThreadSlot);
    }
}
