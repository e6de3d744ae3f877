//! Archive build options.

use pack_format::{Error, Result};

/// Default maximum compressed/raw ratio for a payload to be stored compressed.
pub const DEFAULT_ZIP_THRESHOLD: f32 = 0.9;

/// Options for [`pack_files`](crate::pack_files).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackOptions {
    /// A payload is stored compressed only when `zip_size / data_size` is at
    /// most this value. Must be in `(0, 1]`.
    pub zip_threshold: f32,
    /// Application data version written into the header.
    pub data_version: u64,
    /// Trade compression ratio for build speed.
    pub prefer_speed: bool,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            zip_threshold: DEFAULT_ZIP_THRESHOLD,
            data_version: 0,
            prefer_speed: false,
        }
    }
}

impl PackOptions {
    /// Set the compression threshold.
    pub fn with_zip_threshold(mut self, zip_threshold: f32) -> Self {
        self.zip_threshold = zip_threshold;
        self
    }

    /// Set the data version written into the header.
    pub fn with_data_version(mut self, data_version: u64) -> Self {
        self.data_version = data_version;
        self
    }

    /// Prefer build speed over compression ratio.
    pub fn with_prefer_speed(mut self, prefer_speed: bool) -> Self {
        self.prefer_speed = prefer_speed;
        self
    }

    /// Check that the threshold is usable.
    pub fn validate(&self) -> Result<()> {
        let t = self.zip_threshold;
        if !t.is_finite() || t <= 0.0 || t > 1.0 {
            return Err(Error::BadZipThreshold(t));
        }
        Ok(())
    }

    /// zstd level used for payloads.
    pub fn compression_level(&self) -> i32 {
        if self.prefer_speed {
            zstd::DEFAULT_COMPRESSION_LEVEL
        } else {
            *zstd::compression_level_range().end()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pack_format::ResultCode;

    #[test]
    fn test_threshold_bounds() {
        assert!(PackOptions::default().validate().is_ok());
        assert!(PackOptions::default().with_zip_threshold(1.0).validate().is_ok());
        assert!(PackOptions::default().with_zip_threshold(0.01).validate().is_ok());

        for bad in [0.0, -0.5, 1.01, f32::NAN, f32::INFINITY] {
            let error = PackOptions::default()
                .with_zip_threshold(bad)
                .validate()
                .unwrap_err();
            assert_eq!(error.code(), ResultCode::BadZipThreshold);
        }
    }

    #[test]
    fn test_speed_uses_lower_level() {
        let fast = PackOptions::default().with_prefer_speed(true);
        let small = PackOptions::default();
        assert!(fast.compression_level() < small.compression_level());
    }
}
