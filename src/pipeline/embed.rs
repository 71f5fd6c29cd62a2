//! Embed phase: turn every attachment into a ready-to-draw command.
//!
//! All attachments across all pages are prepared concurrently and joined
//! once with [`try_join_all`], so the first failure cancels the rest and the
//! save aborts with nothing written. Preparation never touches the
//! `lopdf::Document`: each future returns an owned [`DrawCommand`] holding
//! image streams, encoded text lines or path segments, already positioned in
//! PDF space. Registering those assets with the document is the draw phase's
//! job, which keeps the document single-owner and lock-free.
//!
//! Image decoding is CPU-bound and runs on the blocking pool.

use crate::color::{parse_pdf_color, PdfRgb};
use crate::error::StampError;
use crate::font::StandardFont;
use crate::geometry::PageBox;
use crate::model::{
    Attachment, AttachmentSet, DrawingAttachment, ImageAttachment, ImageSource, TextAttachment,
};
use crate::pipeline::layout::wrap_text;
use crate::progress::ProgressCallback;
use crate::svg_path::{self, Segment};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use flate2::{write::ZlibEncoder, Compression};
use futures::future::try_join_all;
use image::{DynamicImage, ImageFormat};
use lopdf::{dictionary, Object, Stream};
use std::io::Write;
use tracing::{debug, error};

/// A placed image XObject, with its soft mask when the source had alpha.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub image: Stream,
    pub smask: Option<Stream>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Wrapped, encoded text with its first baseline in PDF space.
#[derive(Debug, Clone)]
pub struct PreparedText {
    pub font: StandardFont,
    pub size: f32,
    /// Distance between baselines.
    pub leading: f32,
    pub x: f32,
    pub y: f32,
    pub lines: Vec<Vec<u8>>,
}

/// A stroked path anchored at its top-left corner in PDF space.
#[derive(Debug, Clone)]
pub struct PreparedDrawing {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
    pub color: PdfRgb,
    pub stroke_width: f32,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
pub enum DrawCommand {
    Image(PreparedImage),
    Text(PreparedText),
    Drawing(PreparedDrawing),
}

/// One prepared attachment.
#[derive(Debug, Clone)]
pub struct Embedded {
    /// 0-based page index.
    pub page: usize,
    pub id: String,
    pub command: DrawCommand,
}

/// Prepare every attachment concurrently.
///
/// The result is in page order, then attachment order. `pages` must cover
/// every page index the set uses.
pub async fn embed_all(
    set: &AttachmentSet,
    pages: &[PageBox],
    progress: Option<&ProgressCallback>,
) -> Result<Vec<Embedded>, StampError> {
    let jobs = set.iter().map(|(page_idx, attachment)| async move {
        let page = pages.get(page_idx).copied().ok_or(StampError::PageOutOfRange {
            page: page_idx + 1,
            total: pages.len(),
        })?;
        let id = attachment.id();

        match embed_one(attachment, &page).await {
            Ok(command) => {
                debug!("Embedded {} '{}' on page {}", attachment.kind(), id, page_idx + 1);
                if let Some(cb) = progress {
                    cb.on_attachment_embedded(page_idx + 1, id);
                }
                Ok(Embedded {
                    page: page_idx,
                    id: id.to_string(),
                    command,
                })
            }
            Err(e) => {
                let err = match e {
                    already @ StampError::EmbedFailed { .. } => already,
                    other => StampError::embed(page_idx, id, attachment.kind(), other),
                };
                error!("{}", err);
                if let Some(cb) = progress {
                    cb.on_embed_error(page_idx + 1, id, &err.to_string());
                }
                Err(err)
            }
        }
    });

    try_join_all(jobs).await
}

/// Prepare a single attachment against its page.
pub async fn embed_one(attachment: &Attachment, page: &PageBox) -> Result<DrawCommand, StampError> {
    match attachment {
        Attachment::Image(img) => embed_image(img, page).await.map(DrawCommand::Image),
        Attachment::Text(text) => prepare_text(text, page).map(DrawCommand::Text),
        Attachment::Drawing(drawing) => prepare_drawing(drawing, page).map(DrawCommand::Drawing),
    }
}

// ── Images ───────────────────────────────────────────────────────────────

async fn embed_image(img: &ImageAttachment, page: &PageBox) -> Result<PreparedImage, StampError> {
    let bytes = read_image_bytes(&img.file).await?;
    let jpeg = img.is_jpeg();

    let (image, smask) = tokio::task::spawn_blocking(move || {
        if jpeg {
            jpeg_xobject(bytes).map(|s| (s, None))
        } else {
            png_xobject(&bytes)
        }
    })
    .await
    .map_err(|e| StampError::Internal(format!("Image decode task panicked: {}", e)))??;

    Ok(PreparedImage {
        image,
        smask,
        x: page.pdf_x(img.x),
        y: page.box_y(img.y, img.height),
        width: img.width,
        height: img.height,
    })
}

/// Load the raw file bytes behind an image source.
pub async fn read_image_bytes(source: &ImageSource) -> Result<Vec<u8>, StampError> {
    match source {
        ImageSource::Path(path) => tokio::fs::read(path)
            .await
            .map_err(|e| StampError::Asset(format!("cannot read '{}': {}", path.display(), e))),
        ImageSource::DataUri(uri) => decode_data_uri(uri),
    }
}

/// Decode the payload of a `data:` URI.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, StampError> {
    let bad = |why: &str| StampError::Asset(format!("invalid data URI: {why}"));
    let rest = uri.strip_prefix("data:").ok_or_else(|| bad("missing 'data:' prefix"))?;
    let (header, payload) = rest.split_once(',').ok_or_else(|| bad("missing ','"))?;
    if header.split(';').any(|p| p.trim().eq_ignore_ascii_case("base64")) {
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        STANDARD.decode(compact).map_err(|e| bad(&e.to_string()))
    } else {
        Ok(payload.as_bytes().to_vec())
    }
}

/// Frame header fields needed for a `DCTDecode` XObject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegHeader {
    pub width: u16,
    pub height: u16,
    pub components: u8,
    pub bits: u8,
}

/// Scan JPEG markers up to the first start-of-frame.
pub fn parse_jpeg_header(bytes: &[u8]) -> Result<JpegHeader, StampError> {
    let bad = |why: &str| StampError::Asset(format!("not a valid JPEG: {why}"));
    if bytes.len() < 4 || bytes[0] != 0xff || bytes[1] != 0xd8 {
        return Err(bad("missing SOI marker"));
    }
    let mut i = 2;
    while i + 4 <= bytes.len() {
        if bytes[i] != 0xff {
            return Err(bad("marker expected"));
        }
        let marker = bytes[i + 1];
        if marker == 0xff {
            i += 1;
            continue;
        }
        if matches!(marker, 0xd0..=0xd9 | 0x01) {
            i += 2;
            continue;
        }
        let len = u16::from_be_bytes([bytes[i + 2], bytes[i + 3]]) as usize;
        let is_sof = matches!(marker, 0xc0..=0xcf) && !matches!(marker, 0xc4 | 0xc8 | 0xcc);
        if is_sof {
            let seg = bytes
                .get(i + 4..i + 2 + len)
                .filter(|s| s.len() >= 6)
                .ok_or_else(|| bad("truncated frame header"))?;
            let header = JpegHeader {
                bits: seg[0],
                height: u16::from_be_bytes([seg[1], seg[2]]),
                width: u16::from_be_bytes([seg[3], seg[4]]),
                components: seg[5],
            };
            if header.width == 0 || header.height == 0 {
                return Err(bad("zero-sized frame"));
            }
            return Ok(header);
        }
        i += 2 + len;
    }
    Err(bad("no frame header"))
}

/// Wrap JPEG bytes untouched in a `DCTDecode` image XObject.
fn jpeg_xobject(bytes: Vec<u8>) -> Result<Stream, StampError> {
    let header = parse_jpeg_header(&bytes)?;
    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => header.width as i64,
        "Height" => header.height as i64,
        "BitsPerComponent" => header.bits as i64,
        "Filter" => "DCTDecode",
    };
    match header.components {
        1 => dict.set("ColorSpace", "DeviceGray"),
        3 => dict.set("ColorSpace", "DeviceRGB"),
        4 => {
            // Adobe writes CMYK JPEGs inverted.
            dict.set("ColorSpace", "DeviceCMYK");
            dict.set(
                "Decode",
                (0..4).flat_map(|_| [Object::Integer(1), Object::Integer(0)]).collect::<Vec<_>>(),
            );
        }
        n => {
            return Err(StampError::Asset(format!(
                "unsupported JPEG with {n} colour components"
            )))
        }
    }
    Ok(Stream::new(dict, bytes).with_compression(false))
}

/// Decode a PNG and split it into Flate-compressed colour and alpha planes.
fn png_xobject(bytes: &[u8]) -> Result<(Stream, Option<Stream>), StampError> {
    let decoded = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(|e| StampError::Asset(format!("not a valid PNG: {e}")))?;
    let (width, height) = (decoded.width() as i64, decoded.height() as i64);
    let color = decoded.color();

    let (pixels, color_space, alpha) = if color.has_alpha() {
        let rgba = decoded.to_rgba8();
        let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
        let mut alpha = Vec::with_capacity(rgba.len() / 4);
        for px in rgba.pixels() {
            rgb.extend_from_slice(&px.0[..3]);
            alpha.push(px.0[3]);
        }
        let alpha = (!alpha.iter().all(|&a| a == 255)).then_some(alpha);
        (rgb, "DeviceRGB", alpha)
    } else if is_gray(&decoded) {
        (decoded.to_luma8().into_raw(), "DeviceGray", None)
    } else {
        (decoded.to_rgb8().into_raw(), "DeviceRGB", None)
    };

    let image_dict = |space: &str| {
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => Object::Name(space.as_bytes().to_vec()),
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        }
    };

    let image = Stream::new(image_dict(color_space), deflate(&pixels)?).with_compression(false);
    let smask = match alpha {
        Some(alpha) => Some(Stream::new(image_dict("DeviceGray"), deflate(&alpha)?).with_compression(false)),
        None => None,
    };
    Ok((image, smask))
}

fn is_gray(img: &DynamicImage) -> bool {
    matches!(img, DynamicImage::ImageLuma8(_) | DynamicImage::ImageLuma16(_))
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, StampError> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| StampError::Asset(format!("deflate failed: {e}")))
}

// ── Text ─────────────────────────────────────────────────────────────────

fn prepare_text(text: &TextAttachment, page: &PageBox) -> Result<PreparedText, StampError> {
    if !(text.size > 0.0) {
        return Err(StampError::Asset(format!("font size must be positive, got {}", text.size)));
    }
    let font = StandardFont::from_name(&text.font_family)?;
    let lines = wrap_text(&text.text, font, text.size, text.width)?;
    Ok(PreparedText {
        font,
        size: text.size,
        leading: text.line_height * text.size,
        x: page.pdf_x(text.x),
        y: page.baseline_y(text.y, text.size),
        lines,
    })
}

// ── Drawings ─────────────────────────────────────────────────────────────

fn prepare_drawing(drawing: &DrawingAttachment, page: &PageBox) -> Result<PreparedDrawing, StampError> {
    let color = parse_pdf_color(&drawing.stroke)?;
    let segments = svg_path::parse(&drawing.path)?;
    Ok(PreparedDrawing {
        x: page.pdf_x(drawing.x),
        y: page.drawing_y(drawing.y),
        scale: drawing.scale,
        color,
        stroke_width: drawing.stroke_width,
        segments,
    })
}
