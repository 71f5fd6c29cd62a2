//! CSS colour strings → normalized PDF RGB.
//!
//! Stroke colours arrive the way a browser would write them: `#1e90ff`,
//! `#f00`, `rgb(255, 0, 0)`, `hsl(120, 100%, 25%)` or a keyword such as
//! `navy`. PDF colour operators take each channel as a real in `0.0..=1.0`,
//! so parsing yields 8-bit channels first and [`normalize`] maps them
//! linearly (0 → 0.0, 255 → 1.0). Alpha is accepted but ignored; strokes
//! are always opaque.

use crate::error::StampError;
use once_cell::sync::Lazy;
use regex::Regex;

/// An 8-bit sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// A colour ready for the `RG`/`rg` operators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfRgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb8 {
    pub const BLACK: Rgb8 = Rgb8 { r: 0, g: 0, b: 0 };

    pub fn to_pdf(self) -> PdfRgb {
        PdfRgb {
            r: normalize(self.r),
            g: normalize(self.g),
            b: normalize(self.b),
        }
    }
}

/// Map an 8-bit channel onto `0.0..=1.0`.
pub fn normalize(channel: u8) -> f32 {
    channel as f32 / 255.0
}

/// Parse a CSS colour and normalize it for PDF output.
pub fn parse_pdf_color(input: &str) -> Result<PdfRgb, StampError> {
    parse_css_color(input).map(Rgb8::to_pdf)
}

static FUNCTIONAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(rgba?|hsla?)\(\s*([^)]*?)\s*\)$").expect("static regex is valid")
});

/// Parse a CSS colour into 8-bit channels.
pub fn parse_css_color(input: &str) -> Result<Rgb8, StampError> {
    let s = input.trim().to_ascii_lowercase();
    let invalid = || StampError::InvalidColor(input.to_string());

    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex).ok_or_else(invalid);
    }

    if let Some(caps) = FUNCTIONAL.captures(&s) {
        let args = split_args(&caps[2]);
        let parsed = if caps[1].starts_with("rgb") {
            parse_rgb_args(&args)
        } else {
            parse_hsl_args(&args)
        };
        return parsed.ok_or_else(invalid);
    }

    named(&s).ok_or_else(invalid)
}

fn parse_hex(hex: &str) -> Option<Rgb8> {
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..=i], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 | 4 => Some(Rgb8 {
            r: nibble(0)?,
            g: nibble(1)?,
            b: nibble(2)?,
        }),
        6 | 8 => Some(Rgb8 {
            r: byte(0)?,
            g: byte(2)?,
            b: byte(4)?,
        }),
        _ => None,
    }
}

/// Split on commas, or on whitespace and `/` for the space-separated syntax.
fn split_args(args: &str) -> Vec<&str> {
    if args.contains(',') {
        args.split(',').map(str::trim).collect()
    } else {
        args.split(|c: char| c.is_whitespace() || c == '/')
            .filter(|s| !s.is_empty())
            .collect()
    }
}

fn parse_rgb_args(args: &[&str]) -> Option<Rgb8> {
    if args.len() != 3 && args.len() != 4 {
        return None;
    }
    let channel = |s: &str| -> Option<u8> {
        let v = if let Some(pct) = s.strip_suffix('%') {
            pct.trim().parse::<f32>().ok()? * 255.0 / 100.0
        } else {
            s.parse::<f32>().ok()?
        };
        Some(v.round().clamp(0.0, 255.0) as u8)
    };
    Some(Rgb8 {
        r: channel(args[0])?,
        g: channel(args[1])?,
        b: channel(args[2])?,
    })
}

fn parse_hsl_args(args: &[&str]) -> Option<Rgb8> {
    if args.len() != 3 && args.len() != 4 {
        return None;
    }
    let hue = args[0].trim_end_matches("deg").parse::<f32>().ok()?;
    let pct = |s: &str| -> Option<f32> {
        Some((s.strip_suffix('%')?.trim().parse::<f32>().ok()? / 100.0).clamp(0.0, 1.0))
    };
    Some(hsl_to_rgb(hue, pct(args[1])?, pct(args[2])?))
}

fn hsl_to_rgb(hue: f32, sat: f32, light: f32) -> Rgb8 {
    let h = hue.rem_euclid(360.0) / 60.0;
    let c = (1.0 - (2.0 * light - 1.0).abs()) * sat;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r1, g1, b1) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = light - c / 2.0;
    let to_u8 = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb8 {
        r: to_u8(r1),
        g: to_u8(g1),
        b: to_u8(b1),
    }
}

fn named(name: &str) -> Option<Rgb8> {
    let (r, g, b) = match name {
        "black" | "transparent" => (0, 0, 0),
        "white" => (255, 255, 255),
        "red" => (255, 0, 0),
        "lime" => (0, 255, 0),
        "green" => (0, 128, 0),
        "blue" => (0, 0, 255),
        "yellow" => (255, 255, 0),
        "cyan" | "aqua" => (0, 255, 255),
        "magenta" | "fuchsia" => (255, 0, 255),
        "silver" => (192, 192, 192),
        "gray" | "grey" => (128, 128, 128),
        "darkgray" | "darkgrey" => (169, 169, 169),
        "lightgray" | "lightgrey" => (211, 211, 211),
        "dimgray" | "dimgrey" => (105, 105, 105),
        "maroon" => (128, 0, 0),
        "olive" => (128, 128, 0),
        "purple" => (128, 0, 128),
        "teal" => (0, 128, 128),
        "navy" => (0, 0, 128),
        "orange" => (255, 165, 0),
        "darkorange" => (255, 140, 0),
        "orangered" => (255, 69, 0),
        "gold" => (255, 215, 0),
        "pink" => (255, 192, 203),
        "hotpink" => (255, 105, 180),
        "deeppink" => (255, 20, 147),
        "brown" => (165, 42, 42),
        "chocolate" => (210, 105, 30),
        "crimson" => (220, 20, 60),
        "darkred" => (139, 0, 0),
        "firebrick" => (178, 34, 34),
        "tomato" => (255, 99, 71),
        "coral" => (255, 127, 80),
        "salmon" => (250, 128, 114),
        "indigo" => (75, 0, 130),
        "violet" => (238, 130, 238),
        "orchid" => (218, 112, 214),
        "darkviolet" => (148, 0, 211),
        "darkblue" => (0, 0, 139),
        "mediumblue" => (0, 0, 205),
        "royalblue" => (65, 105, 225),
        "steelblue" => (70, 130, 180),
        "dodgerblue" => (30, 144, 255),
        "deepskyblue" => (0, 191, 255),
        "skyblue" => (135, 206, 235),
        "lightblue" => (173, 216, 230),
        "darkgreen" => (0, 100, 0),
        "forestgreen" => (34, 139, 34),
        "seagreen" => (46, 139, 87),
        "limegreen" => (50, 205, 50),
        "lightgreen" => (144, 238, 144),
        "darkcyan" => (0, 139, 139),
        "turquoise" => (64, 224, 208),
        "khaki" => (240, 230, 140),
        "beige" => (245, 245, 220),
        "ivory" => (255, 255, 240),
        "tan" => (210, 180, 140),
        "sienna" => (160, 82, 45),
        "slategray" | "slategrey" => (112, 128, 144),
        _ => return None,
    };
    Some(Rgb8 { r, g, b })
}
