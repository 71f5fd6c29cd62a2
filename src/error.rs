//! Error types for the pdfstamp library.
//!
//! A save is all-or-nothing, so there is a single fatal error type,
//! [`StampError`]. It is returned from every top-level `save*` function. No
//! partial document is ever produced: an image that fails to decode on page
//! 40 aborts the whole save just as a missing input file does.
//!
//! Embedding problems carry the page index and attachment id through
//! [`StampError::EmbedFailed`], so callers can point the user at the overlay
//! that needs fixing.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pdfstamp library.
#[derive(Debug, Error)]
pub enum StampError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// Encrypted documents cannot be rewritten.
    #[error("PDF '{path}' is encrypted; decrypt it first (e.g. qpdf --decrypt)")]
    Encrypted { path: PathBuf },

    /// The attachment set references a page the document does not have.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    // ── Attachment errors ─────────────────────────────────────────────────
    /// The attachment manifest could not be parsed.
    #[error("Invalid attachments: {0}")]
    InvalidAttachments(String),

    /// Preparing one attachment's assets failed; the save was aborted.
    #[error("Failed to embed {kind} '{id}' on page {page}: {detail}")]
    EmbedFailed {
        /// 1-indexed page number.
        page: usize,
        id: String,
        kind: &'static str,
        detail: String,
    },

    /// The font family is not one of the standard PDF fonts.
    #[error("Unsupported font '{0}'; use one of the standard Helvetica, Times or Courier faces")]
    UnsupportedFont(String),

    /// A character cannot be represented in WinAnsiEncoding.
    #[error("Character {ch:?} (U+{code:04X}) cannot be encoded with font '{font}'")]
    UnencodableText { ch: char, code: u32, font: String },

    /// A CSS colour string could not be parsed.
    #[error("Invalid colour '{0}'")]
    InvalidColor(String),

    /// SVG path data is malformed.
    #[error("Invalid SVG path at offset {offset}: {reason}")]
    InvalidPath { offset: usize, reason: String },

    /// An image, font or path could not be turned into PDF objects.
    #[error("{0}")]
    Asset(String),

    // ── Output errors ─────────────────────────────────────────────────────
    /// lopdf failed while applying overlays or serializing the document.
    #[error("Failed to save PDF: {0}")]
    SaveFailed(String),

    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StampError {
    /// Wrap an asset-level error with the attachment it belongs to.
    ///
    /// `page_index` is 0-based; the stored page number is 1-based to match
    /// what users see in a viewer.
    pub fn embed(page_index: usize, id: &str, kind: &'static str, err: impl std::fmt::Display) -> Self {
        StampError::EmbedFailed {
            page: page_index + 1,
            id: id.to_string(),
            kind,
            detail: err.to_string(),
        }
    }

    /// True for failures that came from preparing a single attachment.
    pub fn is_embed_failure(&self) -> bool {
        matches!(self, StampError::EmbedFailed { .. })
    }
}

impl From<lopdf::Error> for StampError {
    fn from(e: lopdf::Error) -> Self {
        StampError::SaveFailed(e.to_string())
    }
}
