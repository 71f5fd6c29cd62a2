//! Result types returned by the save and inspect entry points.

use crate::geometry::PageBox;
use serde::{Deserialize, Serialize};

/// The stamped document plus what went into it.
#[derive(Debug, Clone)]
pub struct SaveOutput {
    /// Serialized PDF.
    pub bytes: Vec<u8>,
    pub stats: SaveStats,
}

/// Counters and timings for one save.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveStats {
    /// Pages in the document.
    pub total_pages: usize,
    /// Pages that received at least one overlay.
    pub stamped_pages: usize,
    pub text_count: usize,
    pub image_count: usize,
    pub drawing_count: usize,
    /// Draw commands applied; zero when there were no attachments.
    pub draw_commands: usize,
    pub output_bytes: usize,
    pub embed_duration_ms: u64,
    pub draw_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Document-level facts, available without modifying the PDF.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
    pub is_encrypted: bool,
    /// One box per page, in page order.
    pub pages: Vec<PageBox>,
}
