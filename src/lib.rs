//! # pdfstamp
//!
//! Stamp text, images and freehand drawings onto existing PDF pages.
//!
//! Overlays are placed in screen space (origin top-left, y down), the way a
//! page preview shows them, and converted to PDF user space (origin
//! bottom-left, y up) when the document is saved.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF + attachments
//!  │
//!  ├─ 1. Input   resolve local file or download from URL
//!  ├─ 2. Load    parse with lopdf, read page boxes (spawn_blocking)
//!  ├─ 3. Embed   images / fonts / paths for every attachment, concurrently
//!  ├─ 4. Draw    overlay streams appended page by page
//!  └─ 5. Output  serialized PDF + stats
//! ```
//!
//! Saving is all-or-nothing: if any attachment fails to embed, no draw
//! command runs and no bytes are produced.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfstamp::{save_to_file, Attachment, AttachmentSet, StampConfig, TextAttachment};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut attachments = AttachmentSet::new();
//!     attachments.add(0, Attachment::Text(TextAttachment::new(72.0, 72.0, "Approved")));
//!
//!     let stats = save_to_file("form.pdf", &attachments, "form-stamped.pdf", &StampConfig::default()).await?;
//!     eprintln!("{} overlays on {} pages", stats.draw_commands, stats.stamped_pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfstamp` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdfstamp = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod color;
pub mod config;
pub mod error;
pub mod font;
pub mod geometry;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod save;
pub mod svg_path;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{StampConfig, StampConfigBuilder};
pub use error::StampError;
pub use font::StandardFont;
pub use geometry::{to_pdf_y, PageBox};
pub use model::{
    Attachment, AttachmentSet, DrawingAttachment, ImageAttachment, ImageSource, TextAttachment,
};
pub use output::{DocumentMetadata, SaveOutput, SaveStats};
pub use progress::{NoopProgressCallback, ProgressCallback, SaveProgressCallback};
pub use save::{inspect, save, save_from_bytes, save_sync, save_to_file};
