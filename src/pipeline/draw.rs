//! Draw phase: apply prepared commands to the document.
//!
//! Runs after every attachment has been embedded, so it only ever sees a
//! complete batch. Pages are visited in order, commands in attachment order;
//! later commands paint over earlier ones. For each page that receives
//! commands the existing content is bracketed in `q … Q` so whatever graphics
//! state it leaves behind cannot leak into the overlay, then one overlay
//! stream is appended. Pages with no commands are not touched.
//!
//! Resources are copied onto the page before new names are added, so a
//! resource dictionary shared with other pages is never modified.

use crate::error::StampError;
use crate::font::StandardFont;
use crate::pipeline::embed::{
    DrawCommand, Embedded, PreparedDrawing, PreparedImage, PreparedText,
};
use crate::pipeline::load::inherited;
use crate::progress::ProgressCallback;
use crate::svg_path::Segment;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

const FONT_PREFIX: &str = "StampF";
const IMAGE_PREFIX: &str = "StampIm";

/// What the draw phase did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawSummary {
    pub stamped_pages: usize,
    pub commands: usize,
}

/// Apply every prepared command to its page.
pub fn draw_all(
    doc: &mut Document,
    page_ids: &[ObjectId],
    embedded: Vec<Embedded>,
    progress: Option<&ProgressCallback>,
) -> Result<DrawSummary, StampError> {
    let mut by_page: BTreeMap<usize, Vec<DrawCommand>> = BTreeMap::new();
    for item in embedded {
        by_page.entry(item.page).or_default().push(item.command);
    }

    let mut fonts = FontCache::default();
    let mut summary = DrawSummary::default();

    for (page_idx, commands) in by_page {
        let page_id = *page_ids.get(page_idx).ok_or(StampError::PageOutOfRange {
            page: page_idx + 1,
            total: page_ids.len(),
        })?;

        let mut canvas = PageCanvas::open(doc, page_id);
        for command in &commands {
            match command {
                DrawCommand::Image(img) => canvas.draw_image(doc, img),
                DrawCommand::Text(text) => {
                    let font_id = fonts.get_or_add(doc, text.font);
                    canvas.draw_text(font_id, text);
                }
                DrawCommand::Drawing(drawing) => canvas.draw_path(drawing),
            }
        }
        canvas.finish(doc)?;

        debug!("Page {}: applied {} draw commands", page_idx + 1, commands.len());
        if let Some(cb) = progress {
            cb.on_page_drawn(page_idx + 1, commands.len());
        }
        summary.stamped_pages += 1;
        summary.commands += commands.len();
    }

    if summary.commands > 0 {
        info!(
            "Drew {} commands on {} pages ({} fonts)",
            summary.commands,
            summary.stamped_pages,
            fonts.ids.len()
        );
    }
    Ok(summary)
}

/// One font object per standard face, shared by every page.
#[derive(Default)]
struct FontCache {
    ids: HashMap<StandardFont, ObjectId>,
}

impl FontCache {
    fn get_or_add(&mut self, doc: &mut Document, font: StandardFont) -> ObjectId {
        *self
            .ids
            .entry(font)
            .or_insert_with(|| doc.add_object(font.font_dictionary()))
    }
}

/// Overlay being built for one page.
struct PageCanvas {
    page_id: ObjectId,
    resources: Dictionary,
    fonts: Dictionary,
    xobjects: Dictionary,
    names: HashMap<ObjectId, Vec<u8>>,
    ops: Vec<Operation>,
}

impl PageCanvas {
    fn open(doc: &Document, page_id: ObjectId) -> Self {
        let resources = match inherited(doc, page_id, b"Resources") {
            Some(Object::Dictionary(d)) => d.clone(),
            Some(Object::Reference(id)) => doc.get_dictionary(*id).cloned().unwrap_or_default(),
            _ => Dictionary::new(),
        };
        let inline = |category: &[u8]| match resources.get(category) {
            Ok(Object::Dictionary(d)) => d.clone(),
            Ok(Object::Reference(id)) => doc.get_dictionary(*id).cloned().unwrap_or_default(),
            _ => Dictionary::new(),
        };
        PageCanvas {
            page_id,
            fonts: inline(b"Font"),
            xobjects: inline(b"XObject"),
            resources,
            names: HashMap::new(),
            ops: Vec::new(),
        }
    }

    /// Name `id` in a resource category, reusing an earlier name.
    fn register(&mut self, is_font: bool, id: ObjectId) -> Vec<u8> {
        if let Some(name) = self.names.get(&id) {
            return name.clone();
        }
        let (dict, prefix) = if is_font {
            (&mut self.fonts, FONT_PREFIX)
        } else {
            (&mut self.xobjects, IMAGE_PREFIX)
        };
        let name = (1..)
            .map(|n: u32| format!("{prefix}{n}").into_bytes())
            .find(|candidate| !dict.has(candidate))
            .unwrap_or_default();
        dict.set(name.clone(), Object::Reference(id));
        self.names.insert(id, name.clone());
        name
    }

    fn draw_image(&mut self, doc: &mut Document, img: &PreparedImage) {
        let mut image = img.image.clone();
        if let Some(smask) = &img.smask {
            let smask_id = doc.add_object(smask.clone());
            image.dict.set("SMask", Object::Reference(smask_id));
        }
        let image_id = doc.add_object(image);
        let name = self.register(false, image_id);

        self.ops.push(Operation::new("q", vec![]));
        self.ops.push(Operation::new(
            "cm",
            reals(&[img.width, 0.0, 0.0, img.height, img.x, img.y]),
        ));
        self.ops.push(Operation::new("Do", vec![Object::Name(name)]));
        self.ops.push(Operation::new("Q", vec![]));
    }

    fn draw_text(&mut self, font_id: ObjectId, text: &PreparedText) {
        let name = self.register(true, font_id);

        self.ops.push(Operation::new("q", vec![]));
        self.ops.push(Operation::new("BT", vec![]));
        self.ops.push(Operation::new("rg", reals(&[0.0, 0.0, 0.0])));
        self.ops.push(Operation::new(
            "Tf",
            vec![Object::Name(name), Object::Real(text.size)],
        ));
        self.ops.push(Operation::new("TL", reals(&[text.leading])));
        self.ops.push(Operation::new(
            "Tm",
            reals(&[1.0, 0.0, 0.0, 1.0, text.x, text.y]),
        ));
        for (i, line) in text.lines.iter().enumerate() {
            if i > 0 {
                self.ops.push(Operation::new("T*", vec![]));
            }
            self.ops.push(Operation::new(
                "Tj",
                vec![Object::String(line.clone(), StringFormat::Literal)],
            ));
        }
        self.ops.push(Operation::new("ET", vec![]));
        self.ops.push(Operation::new("Q", vec![]));
    }

    fn draw_path(&mut self, drawing: &PreparedDrawing) {
        if drawing.segments.is_empty() {
            return;
        }
        let s = drawing.scale;
        let c = drawing.color;

        self.ops.push(Operation::new("q", vec![]));
        self.ops.push(Operation::new("J", vec![Object::Integer(1)]));
        self.ops.push(Operation::new("j", vec![Object::Integer(1)]));
        // Flip y so path coordinates grow downward from the anchor.
        self.ops.push(Operation::new(
            "cm",
            reals(&[s, 0.0, 0.0, -s, drawing.x, drawing.y]),
        ));
        self.ops.push(Operation::new("RG", reals(&[c.r, c.g, c.b])));
        self.ops.push(Operation::new("w", reals(&[drawing.stroke_width])));
        for segment in &drawing.segments {
            self.ops.push(match *segment {
                Segment::MoveTo(x, y) => Operation::new("m", reals64(&[x, y])),
                Segment::LineTo(x, y) => Operation::new("l", reals64(&[x, y])),
                Segment::CubicTo(x1, y1, x2, y2, x, y) => {
                    Operation::new("c", reals64(&[x1, y1, x2, y2, x, y]))
                }
                Segment::Close => Operation::new("h", vec![]),
            });
        }
        self.ops.push(Operation::new("S", vec![]));
        self.ops.push(Operation::new("Q", vec![]));
    }

    /// Write the overlay stream and the updated resources onto the page.
    fn finish(mut self, doc: &mut Document) -> Result<(), StampError> {
        if !self.fonts.is_empty() {
            self.resources.set("Font", self.fonts);
        }
        if !self.xobjects.is_empty() {
            self.resources.set("XObject", self.xobjects);
        }
        let encoded = Content {
            operations: self.ops,
        }
        .encode()?;

        let page = doc.get_dictionary(self.page_id)?;
        let existing: Vec<Object> = match page.get(b"Contents") {
            Ok(Object::Reference(id)) => match doc.get_object(*id) {
                Ok(Object::Array(arr)) => arr.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Ok(Object::Array(arr)) => arr.clone(),
            _ => Vec::new(),
        };

        let overlay_id = doc.add_object(Stream::new(Dictionary::new(), encoded));
        let contents = if existing.is_empty() {
            vec![Object::Reference(overlay_id)]
        } else {
            let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
            let restore_id = doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
            let mut contents = Vec::with_capacity(existing.len() + 3);
            contents.push(Object::Reference(save_id));
            contents.extend(existing);
            contents.push(Object::Reference(restore_id));
            contents.push(Object::Reference(overlay_id));
            contents
        };

        let page = doc.get_dictionary_mut(self.page_id)?;
        page.set("Contents", contents);
        page.set("Resources", self.resources);
        Ok(())
    }
}

fn reals(values: &[f32]) -> Vec<Object> {
    values.iter().map(|&v| Object::Real(v)).collect()
}

fn reals64(values: &[f64]) -> Vec<Object> {
    values.iter().map(|&v| Object::Real(v as f32)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::PdfRgb;
    use lopdf::dictionary;

    /// Two pages sharing one resource dictionary with an existing font F1.
    fn two_page_doc() -> (Document, Vec<ObjectId>, ObjectId) {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let old_font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let shared = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => old_font },
        });
        let mut ids = Vec::new();
        for _ in 0..2 {
            let content = doc.add_object(Stream::new(
                Dictionary::new(),
                b"BT /F1 12 Tf 72 720 Td (original) Tj ET".to_vec(),
            ));
            ids.push(doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content,
                "Resources" => shared,
            }));
        }
        doc.objects.insert(
            pages_id,
            dictionary! {
                "Type" => "Pages",
                "Count" => 2,
                "Kids" => ids.iter().map(|&id| Object::Reference(id)).collect::<Vec<_>>(),
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }
            .into(),
        );
        let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog);
        (doc, ids, shared)
    }

    fn text(page: usize, lines: &[&str]) -> Embedded {
        Embedded {
            page,
            id: format!("t{page}"),
            command: DrawCommand::Text(PreparedText {
                font: StandardFont::Helvetica,
                size: 12.0,
                leading: 16.8,
                x: 10.0,
                y: 700.0,
                lines: lines.iter().map(|l| l.as_bytes().to_vec()).collect(),
            }),
        }
    }

    fn drawing(page: usize) -> Embedded {
        Embedded {
            page,
            id: "d".into(),
            command: DrawCommand::Drawing(PreparedDrawing {
                x: 5.0,
                y: 600.0,
                scale: 2.0,
                color: PdfRgb { r: 1.0, g: 0.0, b: 0.0 },
                stroke_width: 3.0,
                segments: vec![Segment::MoveTo(0.0, 0.0), Segment::LineTo(4.0, 4.0), Segment::Close],
            }),
        }
    }

    fn image(page: usize, with_mask: bool) -> Embedded {
        let stream = |space: &str| {
            Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => 1,
                    "Height" => 1,
                    "ColorSpace" => Object::Name(space.as_bytes().to_vec()),
                    "BitsPerComponent" => 8,
                },
                vec![0, 0, 0],
            )
        };
        Embedded {
            page,
            id: "i".into(),
            command: DrawCommand::Image(PreparedImage {
                image: stream("DeviceRGB"),
                smask: with_mask.then(|| stream("DeviceGray")),
                x: 1.0,
                y: 2.0,
                width: 30.0,
                height: 40.0,
            }),
        }
    }

    fn contents(doc: &Document, page_id: ObjectId) -> Vec<ObjectId> {
        doc.get_dictionary(page_id)
            .unwrap()
            .get(b"Contents")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o.as_reference().unwrap())
            .collect()
    }

    fn operators(doc: &Document, stream_id: ObjectId) -> Vec<String> {
        let stream = doc.get_object(stream_id).unwrap().as_stream().unwrap();
        Content::decode(&stream.content)
            .unwrap()
            .operations
            .into_iter()
            .map(|op| op.operator)
            .collect()
    }

    fn page_fonts(doc: &Document, page_id: ObjectId) -> Dictionary {
        let resources = doc.get_dictionary(page_id).unwrap().get(b"Resources").unwrap();
        resources.as_dict().unwrap().get(b"Font").unwrap().as_dict().unwrap().clone()
    }

    #[test]
    fn wraps_original_content_and_appends_overlay() {
        let (mut doc, ids, _) = two_page_doc();
        let summary = draw_all(&mut doc, &ids, vec![text(0, &["one", "two"]), drawing(0)], None).unwrap();
        assert_eq!(summary, DrawSummary { stamped_pages: 1, commands: 2 });

        let streams = contents(&doc, ids[0]);
        assert_eq!(streams.len(), 4);
        assert_eq!(operators(&doc, streams[0]), vec!["q"]);
        assert_eq!(operators(&doc, streams[2]), vec!["Q"]);

        let ops = operators(&doc, streams[3]);
        let expected_text = ["q", "BT", "rg", "Tf", "TL", "Tm", "Tj", "T*", "Tj", "ET", "Q"];
        assert_eq!(&ops[..expected_text.len()], &expected_text);
        let expected_path = ["q", "J", "j", "cm", "RG", "w", "m", "l", "h", "S", "Q"];
        assert_eq!(&ops[expected_text.len()..], &expected_path);
    }

    #[test]
    fn untouched_page_keeps_its_content() {
        let (mut doc, ids, shared) = two_page_doc();
        let before = format!("{:?}", doc.get_dictionary(ids[1]).unwrap());
        draw_all(&mut doc, &ids, vec![text(0, &["hi"])], None).unwrap();
        assert_eq!(format!("{:?}", doc.get_dictionary(ids[1]).unwrap()), before);

        // The shared resources still only know F1.
        let shared = doc.get_dictionary(shared).unwrap();
        assert_eq!(shared.get(b"Font").unwrap().as_dict().unwrap().len(), 1);
    }

    #[test]
    fn fonts_are_shared_and_names_do_not_clash() {
        let (mut doc, ids, _) = two_page_doc();
        draw_all(&mut doc, &ids, vec![text(0, &["a"]), text(0, &["b"]), text(1, &["c"])], None).unwrap();

        let first = page_fonts(&doc, ids[0]);
        let second = page_fonts(&doc, ids[1]);
        assert!(first.has(b"F1"));
        assert_eq!(first.len(), 2);
        assert_eq!(
            first.get(b"StampF1").unwrap().as_reference().unwrap(),
            second.get(b"StampF1").unwrap().as_reference().unwrap()
        );

        let helvetica_fonts = doc
            .objects
            .values()
            .filter_map(|o| o.as_dict().ok())
            .filter(|d| d.get(b"BaseFont").and_then(|b| b.as_name()).ok() == Some(&b"Helvetica"[..]))
            .count();
        assert_eq!(helvetica_fonts, 1);
    }

    #[test]
    fn existing_stamp_names_are_skipped() {
        let (mut doc, ids, _) = two_page_doc();
        let old_font = doc.add_object(StandardFont::TimesRoman.font_dictionary());
        let old_image = doc.add_object(Stream::new(dictionary! { "Subtype" => "Image" }, vec![0]));
        let xobjects = doc.add_object(dictionary! { "StampIm1" => old_image });
        doc.get_dictionary_mut(ids[0]).unwrap().set(
            "Resources",
            dictionary! {
                "Font" => dictionary! { "StampF1" => old_font },
                "XObject" => xobjects,
            },
        );

        draw_all(&mut doc, &ids, vec![text(0, &["hi"]), image(0, false)], None).unwrap();

        let resources = doc.get_dictionary(ids[0]).unwrap().get(b"Resources").unwrap().as_dict().unwrap();
        let fonts = resources.get(b"Font").unwrap().as_dict().unwrap();
        let images = resources.get(b"XObject").unwrap().as_dict().unwrap();
        assert_eq!(fonts.get(b"StampF1").unwrap().as_reference().unwrap(), old_font);
        assert_eq!(images.get(b"StampIm1").unwrap().as_reference().unwrap(), old_image);
        assert_ne!(fonts.get(b"StampF2").unwrap().as_reference().unwrap(), old_font);
        assert_ne!(images.get(b"StampIm2").unwrap().as_reference().unwrap(), old_image);
        assert_eq!((fonts.len(), images.len()), (2, 2));

        // The overlay refers to the new names only.
        let overlay = *contents(&doc, ids[0]).last().unwrap();
        let stream = doc.get_object(overlay).unwrap().as_stream().unwrap();
        let names: Vec<Vec<u8>> = Content::decode(&stream.content)
            .unwrap()
            .operations
            .into_iter()
            .filter(|op| op.operator == "Tf" || op.operator == "Do")
            .map(|op| op.operands[0].as_name().unwrap().to_vec())
            .collect();
        assert_eq!(names, vec![b"StampF2".to_vec(), b"StampIm2".to_vec()]);

        // The referenced XObject dictionary itself is left alone.
        assert_eq!(doc.get_dictionary(xobjects).unwrap().len(), 1);
    }

    #[test]
    fn image_is_registered_with_soft_mask() {
        let (mut doc, ids, _) = two_page_doc();
        draw_all(&mut doc, &ids, vec![image(1, true)], None).unwrap();

        let resources = doc.get_dictionary(ids[1]).unwrap().get(b"Resources").unwrap().as_dict().unwrap();
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        let image_id = xobjects.get(b"StampIm1").unwrap().as_reference().unwrap();
        let image = doc.get_object(image_id).unwrap().as_stream().unwrap();
        let mask_id = image.dict.get(b"SMask").unwrap().as_reference().unwrap();
        assert!(doc.get_object(mask_id).unwrap().as_stream().is_ok());

        let streams = contents(&doc, ids[1]);
        assert_eq!(operators(&doc, *streams.last().unwrap()), vec!["q", "cm", "Do", "Q"]);
    }

    #[test]
    fn page_without_content_gets_only_overlay() {
        let (mut doc, ids, _) = two_page_doc();
        doc.get_dictionary_mut(ids[0]).unwrap().remove(b"Contents");
        draw_all(&mut doc, &ids, vec![drawing(0)], None).unwrap();
        assert_eq!(contents(&doc, ids[0]).len(), 1);
    }

    #[test]
    fn no_commands_no_changes() {
        let (mut doc, ids, _) = two_page_doc();
        let objects_before = doc.objects.len();
        let summary = draw_all(&mut doc, &ids, Vec::new(), None).unwrap();
        assert_eq!(summary, DrawSummary::default());
        assert_eq!(doc.objects.len(), objects_before);
    }
}
