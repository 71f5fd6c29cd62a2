//! Standard PDF fonts: name resolution, WinAnsi encoding and advance widths.
//!
//! Every conforming reader ships the Helvetica, Times and Courier families,
//! so they can be referenced by name without embedding a font program. Text
//! is encoded with `WinAnsiEncoding`; characters outside that code page are
//! rejected rather than silently replaced.
//!
//! Widths are the AFM advances (1/1000 em) of each face over the whole
//! WinAnsi range. The Helvetica obliques share the upright widths and every
//! Courier face is 600 units wide.

use crate::error::StampError;
use lopdf::{dictionary, Dictionary};

/// One of the twelve Latin standard-14 faces.
///
/// Symbol and ZapfDingbats are not supported: they use their own built-in
/// encodings rather than WinAnsi, so [`StandardFont::from_name`] rejects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
}

impl StandardFont {
    pub const ALL: [StandardFont; 12] = [
        StandardFont::Helvetica,
        StandardFont::HelveticaBold,
        StandardFont::HelveticaOblique,
        StandardFont::HelveticaBoldOblique,
        StandardFont::TimesRoman,
        StandardFont::TimesBold,
        StandardFont::TimesItalic,
        StandardFont::TimesBoldItalic,
        StandardFont::Courier,
        StandardFont::CourierBold,
        StandardFont::CourierOblique,
        StandardFont::CourierBoldOblique,
    ];

    /// PostScript name used as `/BaseFont`.
    pub fn base_font(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::HelveticaOblique => "Helvetica-Oblique",
            StandardFont::HelveticaBoldOblique => "Helvetica-BoldOblique",
            StandardFont::TimesRoman => "Times-Roman",
            StandardFont::TimesBold => "Times-Bold",
            StandardFont::TimesItalic => "Times-Italic",
            StandardFont::TimesBoldItalic => "Times-BoldItalic",
            StandardFont::Courier => "Courier",
            StandardFont::CourierBold => "Courier-Bold",
            StandardFont::CourierOblique => "Courier-Oblique",
            StandardFont::CourierBoldOblique => "Courier-BoldOblique",
        }
    }

    /// Resolve a font family string.
    ///
    /// Accepts the exact PostScript names plus the loose spellings people
    /// type into a font picker (`"times new roman"`, `"Helvetica Bold"`,
    /// `"courier-italic"`). Matching ignores case, spaces, dashes and
    /// underscores.
    pub fn from_name(name: &str) -> Result<Self, StampError> {
        let key: String = name
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();

        let font = match key.as_str() {
            "helvetica" | "arial" | "sansserif" => StandardFont::Helvetica,
            "helveticabold" | "arialbold" => StandardFont::HelveticaBold,
            "helveticaoblique" | "helveticaitalic" | "arialitalic" => StandardFont::HelveticaOblique,
            "helveticaboldoblique" | "helveticabolditalic" | "arialbolditalic" => {
                StandardFont::HelveticaBoldOblique
            }
            "times" | "timesroman" | "timesnewroman" | "serif" => StandardFont::TimesRoman,
            "timesbold" | "timesnewromanbold" => StandardFont::TimesBold,
            "timesitalic" | "timesnewromanitalic" => StandardFont::TimesItalic,
            "timesbolditalic" | "timesnewromanbolditalic" => StandardFont::TimesBoldItalic,
            "courier" | "couriernew" | "monospace" => StandardFont::Courier,
            "courierbold" | "couriernewbold" => StandardFont::CourierBold,
            "courieroblique" | "courieritalic" => StandardFont::CourierOblique,
            "courierboldoblique" | "courierbolditalic" => StandardFont::CourierBoldOblique,
            _ => return Err(StampError::UnsupportedFont(name.to_string())),
        };
        Ok(font)
    }

    /// The `/Font` resource dictionary for this face.
    pub fn font_dictionary(self) -> Dictionary {
        dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => self.base_font(),
            "Encoding" => "WinAnsiEncoding",
        }
    }

    /// Encode `text` as WinAnsi bytes.
    pub fn encode(self, text: &str) -> Result<Vec<u8>, StampError> {
        text.chars()
            .map(|ch| {
                win_ansi_byte(ch).ok_or_else(|| StampError::UnencodableText {
                    ch,
                    code: ch as u32,
                    font: self.base_font().to_string(),
                })
            })
            .collect()
    }

    /// Advance width of one encoded byte in 1/1000 em.
    ///
    /// Bytes the encoding leaves undefined measure as a space.
    pub fn glyph_width(self, byte: u8) -> u16 {
        let table = match self.widths() {
            Some(table) => table,
            None => return 600,
        };
        match byte {
            0x20..=0xff => match table[(byte - 0x20) as usize] {
                0 => table[0],
                w => w,
            },
            _ => table[0],
        }
    }

    /// Width of encoded bytes at `size` points.
    pub fn width_of(self, encoded: &[u8], size: f32) -> f32 {
        let units: u32 = encoded.iter().map(|&b| self.glyph_width(b) as u32).sum();
        units as f32 * size / 1000.0
    }

    /// Per-byte widths from 0x20, or `None` for the monospaced Courier faces.
    fn widths(self) -> Option<&'static [u16; 224]> {
        match self {
            StandardFont::Helvetica | StandardFont::HelveticaOblique => Some(&HELVETICA_WIDTHS),
            StandardFont::HelveticaBold | StandardFont::HelveticaBoldOblique => {
                Some(&HELVETICA_BOLD_WIDTHS)
            }
            StandardFont::TimesRoman => Some(&TIMES_WIDTHS),
            StandardFont::TimesBold => Some(&TIMES_BOLD_WIDTHS),
            StandardFont::TimesItalic => Some(&TIMES_ITALIC_WIDTHS),
            StandardFont::TimesBoldItalic => Some(&TIMES_BOLD_ITALIC_WIDTHS),
            StandardFont::Courier
            | StandardFont::CourierBold
            | StandardFont::CourierOblique
            | StandardFont::CourierBoldOblique => None,
        }
    }
}

/// Map a char to its WinAnsiEncoding code point.
pub fn win_ansi_byte(ch: char) -> Option<u8> {
    let code = ch as u32;
    match code {
        0x20..=0x7e | 0xa0..=0xff => Some(code as u8),
        _ => {
            let byte = match ch {
                '€' => 0x80,
                '‚' => 0x82,
                'ƒ' => 0x83,
                '„' => 0x84,
                '…' => 0x85,
                '†' => 0x86,
                '‡' => 0x87,
                'ˆ' => 0x88,
                '‰' => 0x89,
                'Š' => 0x8a,
                '‹' => 0x8b,
                'Œ' => 0x8c,
                'Ž' => 0x8e,
                '\u{2018}' => 0x91,
                '\u{2019}' => 0x92,
                '\u{201C}' => 0x93,
                '\u{201D}' => 0x94,
                '•' => 0x95,
                '–' => 0x96,
                '—' => 0x97,
                '˜' => 0x98,
                '™' => 0x99,
                'š' => 0x9a,
                '›' => 0x9b,
                'œ' => 0x9c,
                'ž' => 0x9e,
                'Ÿ' => 0x9f,
                _ => return None,
            };
            Some(byte)
        }
    }
}

// AFM advance widths indexed by `byte - 0x20`, covering 0x20..=0xFF.
// Zero marks codes WinAnsiEncoding leaves undefined.

// Helvetica
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 224] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, 0,
    556, 0, 222, 556, 333, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0, 611, 0,
    0, 222, 222, 333, 333, 350, 556, 1000, 333, 1000, 500, 333, 944, 0, 500, 667,
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500,
];

// Helvetica-Bold
#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 224] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, 0,
    556, 0, 278, 556, 500, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0, 611, 0,
    0, 278, 278, 500, 500, 350, 556, 1000, 333, 1000, 556, 333, 944, 0, 500, 667,
    278, 333, 556, 556, 556, 556, 280, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 611, 556, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    722, 722, 722, 722, 722, 722, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 556, 556, 556, 556, 556, 278, 278, 278, 278,
    611, 611, 611, 611, 611, 611, 611, 584, 611, 611, 611, 611, 611, 556, 611, 556,
];

// Times-Roman
#[rustfmt::skip]
const TIMES_WIDTHS: [u16; 224] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541, 0,
    500, 0, 333, 500, 444, 1000, 500, 500, 333, 1000, 556, 333, 889, 0, 611, 0,
    0, 333, 333, 444, 444, 350, 500, 1000, 333, 980, 389, 333, 722, 0, 444, 722,
    250, 333, 500, 500, 500, 500, 200, 500, 333, 760, 276, 500, 564, 333, 760, 333,
    400, 564, 300, 300, 333, 500, 453, 250, 333, 300, 310, 500, 750, 750, 750, 444,
    722, 722, 722, 722, 722, 722, 889, 667, 611, 611, 611, 611, 333, 333, 333, 333,
    722, 722, 722, 722, 722, 722, 722, 564, 722, 722, 722, 722, 722, 722, 556, 500,
    444, 444, 444, 444, 444, 444, 667, 444, 444, 444, 444, 444, 278, 278, 278, 278,
    500, 500, 500, 500, 500, 500, 500, 564, 500, 500, 500, 500, 500, 500, 500, 500,
];

// Times-Bold
#[rustfmt::skip]
const TIMES_BOLD_WIDTHS: [u16; 224] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
    930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778,
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500,
    333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500,
    556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520, 0,
    500, 0, 333, 500, 500, 1000, 500, 500, 333, 1000, 556, 333, 1000, 0, 667, 0,
    0, 333, 333, 500, 500, 350, 500, 1000, 333, 1000, 389, 333, 722, 0, 444, 722,
    250, 333, 500, 500, 500, 500, 220, 500, 333, 747, 300, 500, 570, 333, 747, 333,
    400, 570, 300, 300, 333, 556, 540, 250, 333, 300, 330, 500, 750, 750, 750, 500,
    722, 722, 722, 722, 722, 722, 1000, 722, 667, 667, 667, 667, 389, 389, 389, 389,
    722, 722, 778, 778, 778, 778, 778, 570, 778, 722, 722, 722, 722, 722, 611, 556,
    500, 500, 500, 500, 500, 500, 722, 444, 444, 444, 444, 444, 278, 278, 278, 278,
    500, 556, 500, 500, 500, 500, 500, 570, 500, 556, 556, 556, 556, 500, 556, 500,
];

// Times-Italic
#[rustfmt::skip]
const TIMES_ITALIC_WIDTHS: [u16; 224] = [
    250, 333, 420, 500, 500, 833, 778, 214, 333, 333, 500, 675, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 675, 675, 675, 500,
    920, 611, 611, 667, 722, 611, 611, 722, 722, 333, 444, 667, 556, 833, 667, 722,
    611, 722, 611, 500, 556, 722, 611, 833, 611, 556, 556, 389, 278, 389, 422, 500,
    333, 500, 500, 444, 500, 444, 278, 500, 500, 278, 278, 444, 278, 722, 500, 500,
    500, 500, 389, 389, 278, 500, 444, 667, 444, 444, 389, 400, 275, 400, 541, 0,
    500, 0, 333, 500, 556, 889, 500, 500, 333, 1000, 500, 333, 944, 0, 556, 0,
    0, 333, 333, 556, 556, 350, 500, 889, 333, 980, 389, 333, 667, 0, 389, 556,
    250, 389, 500, 500, 500, 500, 275, 500, 333, 760, 276, 500, 675, 333, 760, 333,
    400, 675, 300, 300, 333, 500, 523, 250, 333, 300, 310, 500, 750, 750, 750, 500,
    611, 611, 611, 611, 611, 611, 889, 667, 611, 611, 611, 611, 333, 333, 333, 333,
    722, 667, 722, 722, 722, 722, 722, 675, 722, 722, 722, 722, 722, 556, 611, 500,
    500, 500, 500, 500, 500, 500, 667, 444, 444, 444, 444, 444, 278, 278, 278, 278,
    500, 500, 500, 500, 500, 500, 500, 675, 500, 500, 500, 500, 500, 444, 500, 444,
];

// Times-BoldItalic
#[rustfmt::skip]
const TIMES_BOLD_ITALIC_WIDTHS: [u16; 224] = [
    250, 389, 555, 500, 500, 833, 778, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
    832, 667, 667, 667, 722, 667, 667, 722, 778, 389, 500, 667, 611, 889, 722, 722,
    611, 722, 667, 556, 611, 722, 667, 889, 667, 611, 611, 333, 278, 333, 570, 500,
    333, 500, 500, 444, 500, 444, 333, 500, 556, 278, 278, 500, 278, 778, 556, 500,
    500, 500, 389, 389, 278, 556, 444, 667, 500, 444, 389, 348, 220, 348, 570, 0,
    500, 0, 333, 500, 500, 1000, 500, 500, 333, 1000, 556, 333, 944, 0, 611, 0,
    0, 333, 333, 500, 500, 350, 500, 1000, 333, 1000, 389, 333, 722, 0, 389, 611,
    250, 389, 500, 500, 500, 500, 220, 500, 333, 747, 266, 500, 606, 333, 747, 333,
    400, 570, 300, 300, 333, 576, 500, 250, 333, 300, 300, 500, 750, 750, 750, 500,
    667, 667, 667, 667, 667, 667, 944, 667, 667, 667, 667, 667, 389, 389, 389, 389,
    722, 722, 722, 722, 722, 722, 722, 570, 722, 722, 722, 722, 722, 611, 611, 500,
    500, 500, 500, 500, 500, 500, 722, 444, 444, 444, 444, 444, 278, 278, 278, 278,
    500, 556, 500, 500, 500, 500, 500, 570, 500, 556, 556, 556, 556, 444, 500, 444,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_postscript_and_loose_names() {
        assert_eq!(StandardFont::from_name("Times-Roman").unwrap(), StandardFont::TimesRoman);
        assert_eq!(StandardFont::from_name("times new roman").unwrap(), StandardFont::TimesRoman);
        assert_eq!(
            StandardFont::from_name("Helvetica-BoldOblique").unwrap(),
            StandardFont::HelveticaBoldOblique
        );
        assert_eq!(StandardFont::from_name("courier_italic").unwrap(), StandardFont::CourierOblique);
        for font in StandardFont::ALL {
            assert_eq!(StandardFont::from_name(font.base_font()).unwrap(), font);
        }
    }

    #[test]
    fn rejects_unknown_fonts() {
        assert!(matches!(
            StandardFont::from_name("Comic Sans"),
            Err(StampError::UnsupportedFont(name)) if name == "Comic Sans"
        ));
    }

    #[test]
    fn encodes_latin1_and_cp1252_specials() {
        let bytes = StandardFont::Helvetica.encode("Café – 5€").unwrap();
        assert_eq!(bytes, vec![b'C', b'a', b'f', 0xe9, b' ', 0x96, b' ', b'5', 0x80]);
    }

    #[test]
    fn rejects_unencodable_characters() {
        let err = StandardFont::TimesRoman.encode("ok 漢").unwrap_err();
        assert!(matches!(err, StampError::UnencodableText { ch: '漢', .. }));
    }

    #[test]
    fn widths_follow_afm_tables() {
        assert_eq!(StandardFont::Helvetica.glyph_width(b' '), 278);
        assert_eq!(StandardFont::Helvetica.glyph_width(b'W'), 944);
        assert_eq!(StandardFont::HelveticaBold.glyph_width(b'i'), 278);
        assert_eq!(StandardFont::TimesRoman.glyph_width(b'a'), 444);
        assert_eq!(StandardFont::CourierBold.glyph_width(b'W'), 600);
        // 12pt Courier: 10 glyphs * 600/1000 * 12
        let w = StandardFont::Courier.width_of(b"0123456789", 12.0);
        assert!((w - 72.0).abs() < 1e-4);
    }

    #[test]
    fn bold_and_italic_faces_have_their_own_widths() {
        assert_eq!(StandardFont::Helvetica.glyph_width(b't'), 278);
        assert_eq!(StandardFont::HelveticaBold.glyph_width(b't'), 333);
        assert_eq!(StandardFont::HelveticaBoldOblique.glyph_width(b't'), 333);
        assert_eq!(StandardFont::HelveticaOblique.glyph_width(b'm'), 833);
        assert_eq!(StandardFont::TimesBold.glyph_width(b'W'), 1000);
        assert_eq!(StandardFont::TimesItalic.glyph_width(b'A'), 611);
        assert_eq!(StandardFont::TimesBoldItalic.glyph_width(b'@'), 832);
        // "tttt" is 13.32pt in bold at 10pt, 11.12pt in regular.
        let bold = StandardFont::HelveticaBold.width_of(b"tttt", 10.0);
        assert!((bold - 13.32).abs() < 1e-4);
    }

    #[test]
    fn high_bytes_use_their_own_widths() {
        let em_dash = win_ansi_byte('—').unwrap();
        assert_eq!(StandardFont::TimesRoman.glyph_width(em_dash), 1000);
        assert_eq!(StandardFont::TimesItalic.glyph_width(em_dash), 889);
        assert_eq!(StandardFont::Helvetica.glyph_width(0x95), 350);
        assert_eq!(StandardFont::Helvetica.glyph_width(0xe9), 556);
        assert_eq!(StandardFont::HelveticaBold.glyph_width(0xc6), 1000);
        assert_eq!(StandardFont::TimesBold.glyph_width(0xdf), 556);
        assert_eq!(StandardFont::Helvetica.glyph_width(0xa0), 278);
        // Undefined code measures as a space.
        assert_eq!(StandardFont::TimesRoman.glyph_width(0x81), 250);
        assert_eq!(StandardFont::CourierOblique.glyph_width(0xe9), 600);
    }

    #[test]
    fn symbolic_fonts_are_rejected() {
        for name in ["Symbol", "ZapfDingbats"] {
            assert!(matches!(
                StandardFont::from_name(name),
                Err(StampError::UnsupportedFont(n)) if n == name
            ));
        }
    }

    #[test]
    fn font_dictionary_names_base_font() {
        let dict = StandardFont::CourierOblique.font_dictionary();
        assert_eq!(dict.get(b"BaseFont").unwrap().as_name().unwrap(), b"Courier-Oblique");
        assert_eq!(dict.get(b"Encoding").unwrap().as_name().unwrap(), b"WinAnsiEncoding");
    }
}
