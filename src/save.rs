//! Save entry points.
//!
//! Every variant funnels into one routine: load the document, embed all
//! attachments concurrently, then draw and serialize on the blocking pool.
//! Nothing is returned or written unless every attachment embedded.

use crate::config::StampConfig;
use crate::error::StampError;
use crate::model::{Attachment, AttachmentSet};
use crate::output::{DocumentMetadata, SaveOutput, SaveStats};
use crate::pipeline::{draw, embed, input, load};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Stamp `attachments` onto the PDF at `input` (local path or URL).
///
/// Attachments on pages the document does not have are rejected with
/// [`StampError::PageOutOfRange`] instead of being skipped.
///
/// # Errors
/// Any input, load or embed failure aborts the save. Embed failures arrive
/// as [`StampError::EmbedFailed`] naming the page and attachment.
pub async fn save(
    input_str: impl AsRef<str>,
    attachments: &AttachmentSet,
    config: &StampConfig,
) -> Result<SaveOutput, StampError> {
    let output = stamp_input(input_str.as_ref(), attachments, config).await?;
    report_complete(config, &output);
    Ok(output)
}

/// Stamp a PDF that is already in memory.
///
/// # Example
/// ```rust,no_run
/// use pdfstamp::{save_from_bytes, AttachmentSet, StampConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("form.pdf")?;
/// let attachments = AttachmentSet::from_json(&std::fs::read_to_string("form.json")?)?;
/// let output = save_from_bytes(&bytes, &attachments, &StampConfig::default()).await?;
/// std::fs::write("form-signed.pdf", &output.bytes)?;
/// # Ok(())
/// # }
/// ```
pub async fn save_from_bytes(
    bytes: &[u8],
    attachments: &AttachmentSet,
    config: &StampConfig,
) -> Result<SaveOutput, StampError> {
    let output = stamp(&load::memory_path(), bytes.to_vec(), attachments, config).await?;
    report_complete(config, &output);
    Ok(output)
}

/// Stamp a PDF and write the result to `output_path`.
///
/// Uses atomic write (temp file + rename) so a failed save never leaves a
/// partial or stale-looking output behind. The completion callback fires
/// only once the file is in place.
pub async fn save_to_file(
    input_str: impl AsRef<str>,
    attachments: &AttachmentSet,
    output_path: impl AsRef<Path>,
    config: &StampConfig,
) -> Result<SaveStats, StampError> {
    let output = stamp_input(input_str.as_ref(), attachments, config).await?;
    write_atomic(output_path.as_ref(), &output.bytes).await?;
    report_complete(config, &output);
    Ok(output.stats)
}

/// Synchronous wrapper around [`save`].
///
/// Creates a temporary tokio runtime internally.
pub fn save_sync(
    input_str: impl AsRef<str>,
    attachments: &AttachmentSet,
    config: &StampConfig,
) -> Result<SaveOutput, StampError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| StampError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(save(input_str, attachments, config))
}

/// Read PDF metadata without modifying anything.
///
/// Only `config.download_timeout_secs` is used, for URL inputs.
pub async fn inspect(
    input_str: impl AsRef<str>,
    config: &StampConfig,
) -> Result<DocumentMetadata, StampError> {
    let resolved = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    let bytes = resolved.read().await?;
    let path = resolved.path().to_path_buf();
    input::check_magic(&path, &bytes)?;

    tokio::task::spawn_blocking(move || {
        let doc = load::parse_document(&path, &bytes)?;
        Ok(load::extract_metadata(&doc))
    })
    .await
    .map_err(|e| StampError::Internal(format!("Inspect task panicked: {}", e)))?
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn stamp_input(
    input_str: &str,
    attachments: &AttachmentSet,
    config: &StampConfig,
) -> Result<SaveOutput, StampError> {
    info!("Starting save: {}", input_str);
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let bytes = resolved.read().await?;
    stamp(resolved.path(), bytes, attachments, config).await
}

fn report_complete(config: &StampConfig, output: &SaveOutput) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_save_complete(output.bytes.len());
    }
}

async fn stamp(
    path: &Path,
    bytes: Vec<u8>,
    attachments: &AttachmentSet,
    config: &StampConfig,
) -> Result<SaveOutput, StampError> {
    let total_start = Instant::now();
    input::check_magic(path, &bytes)?;

    let doc = load::load_document(path, bytes).await?;
    let pages = load::page_boxes(&doc);
    let page_ids = load::page_ids(&doc);

    if let Some(last) = attachments.last_used_page() {
        if last >= pages.len() {
            warn!(
                "Attachments reference page {} but the document has {} pages",
                last + 1,
                pages.len()
            );
            return Err(StampError::PageOutOfRange {
                page: last + 1,
                total: pages.len(),
            });
        }
    }

    let total = attachments.total();
    if let Some(ref cb) = config.progress_callback {
        cb.on_save_start(total);
    }

    // ── Embed: concurrent, all-or-nothing ────────────────────────────────
    let embed_start = Instant::now();
    let embedded = embed::embed_all(attachments, &pages, config.progress_callback.as_ref()).await?;
    let embed_duration_ms = embed_start.elapsed().as_millis() as u64;
    debug!("Embedded {} attachments in {}ms", embedded.len(), embed_duration_ms);

    // ── Draw + serialize: single owner of the document ───────────────────
    let progress = config.progress_callback.clone();
    let compress = config.compress;
    let draw_start = Instant::now();
    let (bytes, summary) = tokio::task::spawn_blocking(move || {
        let mut doc = doc;
        let summary = draw::draw_all(&mut doc, &page_ids, embedded, progress.as_ref())?;
        if compress {
            doc.compress();
        }
        let mut out = Vec::new();
        doc.save_to(&mut out)
            .map_err(|e| StampError::SaveFailed(e.to_string()))?;
        Ok::<_, StampError>((out, summary))
    })
    .await
    .map_err(|e| StampError::Internal(format!("Draw task panicked: {}", e)))??;
    let draw_duration_ms = draw_start.elapsed().as_millis() as u64;

    let (text_count, image_count, drawing_count) = count_kinds(attachments);
    let stats = SaveStats {
        total_pages: pages.len(),
        stamped_pages: summary.stamped_pages,
        text_count,
        image_count,
        drawing_count,
        draw_commands: summary.commands,
        output_bytes: bytes.len(),
        embed_duration_ms,
        draw_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Save complete: {} attachments on {}/{} pages, {} bytes, {}ms total",
        total, stats.stamped_pages, stats.total_pages, stats.output_bytes, stats.total_duration_ms
    );

    Ok(SaveOutput { bytes, stats })
}

fn count_kinds(attachments: &AttachmentSet) -> (usize, usize, usize) {
    attachments
        .iter()
        .fold((0, 0, 0), |(t, i, d), (_, attachment)| match attachment {
            Attachment::Text(_) => (t + 1, i, d),
            Attachment::Image(_) => (t, i + 1, d),
            Attachment::Drawing(_) => (t, i, d + 1),
        })
}

/// Write to `<path>.tmp` then rename over `path`.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StampError> {
    let fail = |source| StampError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(fail)?;
    }

    let tmp_path = path.with_extension("pdf.tmp");
    if let Err(e) = tokio::fs::write(&tmp_path, bytes).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(fail(e));
    }
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(fail(e));
    }

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TextAttachment;

    #[test]
    fn counts_each_kind() {
        let mut set = AttachmentSet::new();
        set.add(0, Attachment::Text(TextAttachment::new(0.0, 0.0, "a")));
        set.add(2, Attachment::Text(TextAttachment::new(0.0, 0.0, "b")));
        assert_eq!(count_kinds(&set), (2, 0, 0));
        assert_eq!(count_kinds(&AttachmentSet::new()), (0, 0, 0));
    }

    #[tokio::test]
    async fn atomic_write_creates_parents_and_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/deeper/out.pdf");
        write_atomic(&target, b"%PDF-1.7").await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"%PDF-1.7");
        assert!(!target.with_extension("pdf.tmp").exists());
    }

    #[tokio::test]
    async fn save_from_bytes_rejects_non_pdf() {
        let err = save_from_bytes(b"GIF89a...", &AttachmentSet::new(), &StampConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StampError::NotAPdf { .. }));
    }
}
