//! Attachment data model.
//!
//! An [`Attachment`] is one user-placed overlay: a text box, a raster image
//! or a freehand vector drawing. Positions are in screen space (top-left
//! origin, y down) in PDF points, relative to the page the attachment is
//! stored on. [`AttachmentSet`] indexes attachments by 0-based page.
//!
//! The JSON form uses camelCase field names and a `"type"` tag, so a
//! manifest exported from a browser editor loads as-is:
//!
//! ```json
//! [
//!   [
//!     { "type": "text", "x": 40, "y": 60, "text": "Approved", "fontFamily": "Helvetica-Bold" },
//!     { "type": "image", "x": 300, "y": 700, "width": 120, "height": 40,
//!       "file": { "path": "signature.png" } }
//!   ],
//!   [
//!     { "type": "drawing", "x": 20, "y": 20, "width": 200, "height": 80,
//!       "path": "M0 0 L 100 50", "stroke": "#c00", "strokeWidth": 2 }
//!   ]
//! ]
//! ```

use crate::error::StampError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// MIME type that selects the JPEG embedding path. Anything else is PNG.
pub const JPEG_MIME: &str = "image/jpeg";

/// A positioned overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Attachment {
    Text(TextAttachment),
    Image(ImageAttachment),
    Drawing(DrawingAttachment),
}

/// A wrapped block of text in a standard font.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAttachment {
    #[serde(default)]
    pub id: String,
    pub x: f32,
    pub y: f32,
    /// Wrap width.
    #[serde(default = "TextAttachment::default_width")]
    pub width: f32,
    #[serde(default = "TextAttachment::default_height")]
    pub height: f32,
    pub text: String,
    /// Font size in points.
    #[serde(default = "TextAttachment::default_size")]
    pub size: f32,
    /// Line spacing as a multiple of `size`.
    #[serde(default = "TextAttachment::default_line_height")]
    pub line_height: f32,
    #[serde(default = "TextAttachment::default_font_family")]
    pub font_family: String,
}

impl TextAttachment {
    fn default_width() -> f32 {
        120.0
    }
    fn default_height() -> f32 {
        25.0
    }
    fn default_size() -> f32 {
        16.0
    }
    fn default_line_height() -> f32 {
        1.4
    }
    fn default_font_family() -> String {
        "Times-Roman".to_string()
    }

    /// A text box with the editor's defaults at `(x, y)`.
    pub fn new(x: f32, y: f32, text: impl Into<String>) -> Self {
        TextAttachment {
            id: String::new(),
            x,
            y,
            width: Self::default_width(),
            height: Self::default_height(),
            text: text.into(),
            size: Self::default_size(),
            line_height: Self::default_line_height(),
            font_family: Self::default_font_family(),
        }
    }
}

/// Where an image's bytes come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImageSource {
    /// A file on disk.
    Path(PathBuf),
    /// An RFC 2397 `data:` URI, e.g. `data:image/png;base64,iVBOR…`.
    DataUri(String),
}

/// A raster image scaled into its box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAttachment {
    #[serde(default)]
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub file: ImageSource,
    /// Declared MIME type; derived from the source when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl ImageAttachment {
    /// The MIME type used to pick a decoder.
    ///
    /// Explicit `mime_type` wins, then the data-URI media type, then the
    /// file extension. Unknown sources report `application/octet-stream`,
    /// which takes the PNG path like every other non-JPEG type.
    pub fn effective_mime(&self) -> String {
        if let Some(ref mime) = self.mime_type {
            return mime.trim().to_string();
        }
        match &self.file {
            ImageSource::DataUri(uri) => data_uri_mime(uri)
                .unwrap_or("application/octet-stream")
                .to_string(),
            ImageSource::Path(path) => mime_from_extension(path).to_string(),
        }
    }

    /// True when the image will be embedded as JPEG.
    pub fn is_jpeg(&self) -> bool {
        self.effective_mime() == JPEG_MIME
    }
}

fn data_uri_mime(uri: &str) -> Option<&str> {
    let rest = uri.strip_prefix("data:")?;
    let header = rest.split(',').next()?;
    let mime = header.split(';').next()?.trim();
    (!mime.is_empty()).then_some(mime)
}

fn mime_from_extension(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") | Some("jpe") | Some("jfif") => JPEG_MIME,
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

/// A stroked freehand path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingAttachment {
    #[serde(default)]
    pub id: String,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
    /// SVG path data in the drawing's own coordinates (y down).
    pub path: String,
    #[serde(default = "DrawingAttachment::default_scale")]
    pub scale: f32,
    /// CSS colour.
    #[serde(default = "DrawingAttachment::default_stroke")]
    pub stroke: String,
    #[serde(default = "DrawingAttachment::default_stroke_width")]
    pub stroke_width: f32,
}

impl DrawingAttachment {
    fn default_scale() -> f32 {
        1.0
    }
    fn default_stroke() -> String {
        "black".to_string()
    }
    fn default_stroke_width() -> f32 {
        1.0
    }
}

impl Attachment {
    pub fn id(&self) -> &str {
        match self {
            Attachment::Text(a) => &a.id,
            Attachment::Image(a) => &a.id,
            Attachment::Drawing(a) => &a.id,
        }
    }

    fn id_mut(&mut self) -> &mut String {
        match self {
            Attachment::Text(a) => &mut a.id,
            Attachment::Image(a) => &mut a.id,
            Attachment::Drawing(a) => &mut a.id,
        }
    }

    /// The `"type"` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Attachment::Text(_) => "text",
            Attachment::Image(_) => "image",
            Attachment::Drawing(_) => "drawing",
        }
    }

    /// Top-left corner in screen space.
    pub fn position(&self) -> (f32, f32) {
        match self {
            Attachment::Text(a) => (a.x, a.y),
            Attachment::Image(a) => (a.x, a.y),
            Attachment::Drawing(a) => (a.x, a.y),
        }
    }

    pub fn size(&self) -> (f32, f32) {
        match self {
            Attachment::Text(a) => (a.width, a.height),
            Attachment::Image(a) => (a.width, a.height),
            Attachment::Drawing(a) => (a.width, a.height),
        }
    }
}

/// Attachments grouped by 0-based page index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentSet {
    pages: Vec<Vec<Attachment>>,
}

impl AttachmentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty set with `page_count` pages, as after loading a fresh PDF.
    pub fn with_pages(page_count: usize) -> Self {
        AttachmentSet {
            pages: vec![Vec::new(); page_count],
        }
    }

    /// Parse a JSON manifest (an array of per-page arrays).
    pub fn from_json(json: &str) -> Result<Self, StampError> {
        let mut set: AttachmentSet =
            serde_json::from_str(json).map_err(|e| StampError::InvalidAttachments(e.to_string()))?;
        set.assign_missing_ids();
        Ok(set)
    }

    /// Read and parse a manifest file.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, StampError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            StampError::InvalidAttachments(format!("cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Append an attachment to `page`, growing the page list as needed.
    pub fn add(&mut self, page: usize, mut attachment: Attachment) {
        if self.pages.len() <= page {
            self.pages.resize_with(page + 1, Vec::new);
        }
        if attachment.id().is_empty() {
            *attachment.id_mut() = format!("p{}-{}", page + 1, self.pages[page].len());
        }
        self.pages[page].push(attachment);
    }

    /// Remove the attachment with `id` from `page`; returns it if found.
    pub fn remove(&mut self, page: usize, id: &str) -> Option<Attachment> {
        let list = self.pages.get_mut(page)?;
        let idx = list.iter().position(|a| a.id() == id)?;
        Some(list.remove(idx))
    }

    /// Attachments on `page`; empty for pages without an entry.
    pub fn page(&self, page: usize) -> &[Attachment] {
        self.pages.get(page).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of page slots, including empty ones.
    pub fn page_slots(&self) -> usize {
        self.pages.len()
    }

    /// Highest 0-based page index that holds at least one attachment.
    pub fn last_used_page(&self) -> Option<usize> {
        self.pages.iter().rposition(|p| !p.is_empty())
    }

    pub fn total(&self) -> usize {
        self.pages.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// `(page_index, attachment)` in page order, then insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Attachment)> {
        self.pages
            .iter()
            .enumerate()
            .flat_map(|(page, list)| list.iter().map(move |a| (page, a)))
    }

    fn assign_missing_ids(&mut self) {
        for (page, list) in self.pages.iter_mut().enumerate() {
            for (idx, attachment) in list.iter_mut().enumerate() {
                if attachment.id().is_empty() {
                    *attachment.id_mut() = format!("p{}-{}", page + 1, idx);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r##"[
        [
            { "type": "text", "x": 40, "y": 60, "text": "Approved" },
            { "type": "image", "id": "sig", "x": 300, "y": 700, "width": 120, "height": 40,
              "file": { "path": "scans/signature.JPG" } }
        ],
        [],
        [
            { "type": "drawing", "x": 20, "y": 20, "width": 200, "height": 80,
              "path": "M0 0 L 100 50", "stroke": "#c00", "strokeWidth": 2 }
        ]
    ]"##;

    #[test]
    fn manifest_parses_with_defaults_and_ids() {
        let set = AttachmentSet::from_json(MANIFEST).unwrap();
        assert_eq!(set.page_slots(), 3);
        assert_eq!(set.total(), 3);
        assert_eq!(set.last_used_page(), Some(2));

        let Attachment::Text(text) = &set.page(0)[0] else {
            panic!("expected text");
        };
        assert_eq!(text.id, "p1-0");
        assert_eq!(text.size, 16.0);
        assert_eq!(text.line_height, 1.4);
        assert_eq!(text.font_family, "Times-Roman");
        assert_eq!((text.width, text.height), (120.0, 25.0));

        assert_eq!(set.page(0)[1].id(), "sig");
        assert!(set.page(1).is_empty());

        let Attachment::Drawing(drawing) = &set.page(2)[0] else {
            panic!("expected drawing");
        };
        assert_eq!(drawing.scale, 1.0);
        assert_eq!(drawing.stroke_width, 2.0);
        assert_eq!(drawing.id, "p3-0");
    }

    #[test]
    fn pages_beyond_manifest_are_empty() {
        let set = AttachmentSet::from_json("[]").unwrap();
        assert!(set.page(42).is_empty());
        assert!(set.is_empty());
        assert_eq!(set.last_used_page(), None);
    }

    #[test]
    fn rejects_unknown_type() {
        let err = AttachmentSet::from_json(r#"[[{"type":"video","x":0,"y":0}]]"#).unwrap_err();
        assert!(matches!(err, StampError::InvalidAttachments(_)));
    }

    #[test]
    fn jpeg_is_selected_only_for_exact_mime() {
        let mut img = ImageAttachment {
            id: "i".into(),
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
            file: ImageSource::Path("photo.jpeg".into()),
            mime_type: None,
        };
        assert!(img.is_jpeg());

        for (mime, jpeg) in [
            ("image/jpeg", true),
            ("image/png", false),
            ("image/jpg", false),
            ("image/pjpeg", false),
            ("IMAGE/JPEG", false),
            ("image/gif", false),
        ] {
            img.mime_type = Some(mime.into());
            assert_eq!(img.is_jpeg(), jpeg, "{mime}");
        }
    }

    #[test]
    fn mime_from_data_uri_and_extension() {
        let img = |file: ImageSource| ImageAttachment {
            id: String::new(),
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
            file,
            mime_type: None,
        };
        assert_eq!(
            img(ImageSource::DataUri("data:image/jpeg;base64,/9j/".into())).effective_mime(),
            "image/jpeg"
        );
        assert_eq!(img(ImageSource::DataUri("data:,abc".into())).effective_mime(), "application/octet-stream");
        assert_eq!(img(ImageSource::Path("a/b.PNG".into())).effective_mime(), "image/png");
        assert_eq!(img(ImageSource::Path("a/b".into())).effective_mime(), "application/octet-stream");
    }

    #[test]
    fn add_and_remove() {
        let mut set = AttachmentSet::with_pages(1);
        set.add(3, Attachment::Text(TextAttachment::new(1.0, 2.0, "hi")));
        assert_eq!(set.page_slots(), 4);
        assert_eq!(set.page(3)[0].id(), "p4-0");
        assert_eq!(set.iter().map(|(p, _)| p).collect::<Vec<_>>(), vec![3]);

        let removed = set.remove(3, "p4-0").unwrap();
        assert_eq!(removed.kind(), "text");
        assert_eq!(removed.position(), (1.0, 2.0));
        assert!(set.remove(3, "p4-0").is_none());
        assert!(set.is_empty());
    }

    #[test]
    fn serializes_with_type_tag() {
        let mut set = AttachmentSet::new();
        set.add(0, Attachment::Text(TextAttachment::new(0.0, 0.0, "x")));
        let json = serde_json::to_string(&set).unwrap();
        assert!(json.contains(r#""type":"text""#), "{json}");
        assert!(json.contains(r#""fontFamily":"Times-Roman""#), "{json}");
        assert_eq!(AttachmentSet::from_json(&json).unwrap(), set);
    }
}
