//! Screen-space → PDF-space coordinate mapping.
//!
//! Attachments are placed in *screen space*: origin at the top-left corner
//! of the page, y growing downward, units in PDF points. PDF user space has
//! its origin at the bottom-left corner with y growing upward, so every
//! vertical coordinate has to be flipped against the page height:
//!
//! ```text
//! pdf_y = page_height - y - height
//! ```
//!
//! The `height` term moves the anchor from the box's top edge (screen) to its
//! bottom edge (PDF). Text positions its first baseline instead, so the font
//! size takes the place of the box height. Drawings keep the top edge as the
//! anchor and let a negative y scale flip the path itself.

use serde::{Deserialize, Serialize};

/// Flip a box's top edge in screen space to its bottom edge in PDF space.
///
/// Applying it twice with the same `height` and `page_height` returns the
/// original `y`.
pub fn to_pdf_y(y: f32, height: f32, page_height: f32) -> f32 {
    page_height - y - height
}

/// First-line baseline of a text block whose top edge is at screen `y`.
pub fn text_baseline_y(y: f32, font_size: f32, page_height: f32) -> f32 {
    to_pdf_y(y, font_size, page_height)
}

/// Anchor for a drawing: the path's top-left corner in PDF space.
pub fn drawing_origin_y(y: f32, page_height: f32) -> f32 {
    page_height - y
}

/// The visible area of a page, taken from its MediaBox.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageBox {
    pub x0: f32,
    pub y0: f32,
    pub width: f32,
    pub height: f32,
}

impl PageBox {
    /// US Letter, used when a page tree carries no usable MediaBox.
    pub const LETTER: PageBox = PageBox {
        x0: 0.0,
        y0: 0.0,
        width: 612.0,
        height: 792.0,
    };

    /// Build from a `[llx lly urx ury]` rectangle, normalising flipped corners.
    pub fn from_rect(rect: [f32; 4]) -> Self {
        let (llx, urx) = if rect[0] <= rect[2] { (rect[0], rect[2]) } else { (rect[2], rect[0]) };
        let (lly, ury) = if rect[1] <= rect[3] { (rect[1], rect[3]) } else { (rect[3], rect[1]) };
        PageBox {
            x0: llx,
            y0: lly,
            width: urx - llx,
            height: ury - lly,
        }
    }

    /// Screen x → PDF x.
    pub fn pdf_x(&self, x: f32) -> f32 {
        self.x0 + x
    }

    /// Screen box top → PDF box bottom.
    pub fn box_y(&self, y: f32, height: f32) -> f32 {
        self.y0 + to_pdf_y(y, height, self.height)
    }

    /// Screen text top → PDF first baseline.
    pub fn baseline_y(&self, y: f32, font_size: f32) -> f32 {
        self.y0 + text_baseline_y(y, font_size, self.height)
    }

    /// Screen drawing top → PDF drawing anchor.
    pub fn drawing_y(&self, y: f32) -> f32 {
        self.y0 + drawing_origin_y(y, self.height)
    }
}

impl Default for PageBox {
    fn default() -> Self {
        PageBox::LETTER
    }
}
