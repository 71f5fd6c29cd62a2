//! Configuration types for stamping overlays onto a PDF.
//!
//! All save behaviour is controlled through [`StampConfig`], built via its
//! [`StampConfigBuilder`]. The knobs are few; attachments themselves carry
//! every per-overlay setting.

use crate::error::StampError;
use crate::progress::ProgressCallback;
use std::fmt;

/// Configuration for a save.
///
/// Built via [`StampConfig::builder()`] or using [`StampConfig::default()`].
///
/// # Example
/// ```rust
/// use pdfstamp::StampConfig;
///
/// let config = StampConfig::builder()
///     .compress(true)
///     .download_timeout_secs(30)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct StampConfig {
    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Flate-compress uncompressed streams before writing. Default: false.
    ///
    /// Off by default so that saving with no attachments re-serializes the
    /// document without touching its streams.
    pub compress: bool,

    /// Receives save progress events. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for StampConfig {
    fn default() -> Self {
        Self {
            download_timeout_secs: 120,
            compress: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for StampConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StampConfig")
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("compress", &self.compress)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn SaveProgressCallback>"),
            )
            .finish()
    }
}

impl StampConfig {
    /// Create a new builder for `StampConfig`.
    pub fn builder() -> StampConfigBuilder {
        StampConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`StampConfig`].
#[derive(Debug)]
pub struct StampConfigBuilder {
    config: StampConfig,
}

impl StampConfigBuilder {
    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn compress(mut self, v: bool) -> Self {
        self.config.compress = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<StampConfig, StampError> {
        if self.config.download_timeout_secs == 0 {
            return Err(StampError::InvalidConfig(
                "Download timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}
