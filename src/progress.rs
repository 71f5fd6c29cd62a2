//! Progress-callback trait for save events.
//!
//! Inject an [`Arc<dyn SaveProgressCallback>`] via
//! [`crate::config::StampConfigBuilder::progress_callback`] to receive events
//! as attachments are embedded and pages are drawn.
//!
//! # Example
//!
//! ```rust
//! use pdfstamp::{SaveProgressCallback, StampConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     embedded: AtomicUsize,
//! }
//!
//! impl SaveProgressCallback for CountingCallback {
//!     fn on_attachment_embedded(&self, page_num: usize, id: &str) {
//!         let done = self.embedded.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{done}: embedded {id} on page {page_num}");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { embedded: AtomicUsize::new(0) });
//!
//! let config = StampConfig::builder()
//!     .progress_callback(counter as Arc<dyn SaveProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the save pipeline as it works.
///
/// Embeds run concurrently, so `on_attachment_embedded` and `on_embed_error`
/// may fire in any order and from different threads. Draw events fire in
/// page order. All methods default to no-ops.
pub trait SaveProgressCallback: Send + Sync {
    /// Called once, before any embedding starts.
    fn on_save_start(&self, total_attachments: usize) {
        let _ = total_attachments;
    }

    /// An attachment's assets are ready.
    ///
    /// * `page_num`: 1-indexed page number
    fn on_attachment_embedded(&self, page_num: usize, id: &str) {
        let _ = (page_num, id);
    }

    /// An attachment failed to embed; the save will abort.
    fn on_embed_error(&self, page_num: usize, id: &str, error: &str) {
        let _ = (page_num, id, error);
    }

    /// All overlays for a page have been written.
    fn on_page_drawn(&self, page_num: usize, commands: usize) {
        let _ = (page_num, commands);
    }

    /// The document has been serialized and, for [`save_to_file`](crate::save_to_file), written.
    fn on_save_complete(&self, bytes: usize) {
        let _ = bytes;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SaveProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::StampConfig`].
pub type ProgressCallback = Arc<dyn SaveProgressCallback>;
