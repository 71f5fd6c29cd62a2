//! SVG path data → absolute cubic outline.
//!
//! Freehand drawings are captured as SVG `d` attributes. PDF path operators
//! only know move, line, cubic curve and close, so the parser resolves every
//! relative command to absolute coordinates, expands `H`/`V` to lines,
//! smooth curves to explicit control points, quadratics to cubics and
//! elliptical arcs to at most four cubic segments per quarter turn.
//!
//! The coordinates stay in SVG space (y down). Flipping into PDF space is
//! done by the drawing's transformation matrix, not here.

use crate::error::StampError;
use std::f64::consts::{FRAC_PI_2, PI};

/// One absolute outline segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    MoveTo(f64, f64),
    LineTo(f64, f64),
    CubicTo(f64, f64, f64, f64, f64, f64),
    Close,
}

/// Parse path data into segments.
pub fn parse(data: &str) -> Result<Vec<Segment>, StampError> {
    Parser::new(data).run()
}

#[derive(Clone, Copy, PartialEq)]
enum Prev {
    None,
    Cubic(f64, f64),
    Quad(f64, f64),
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
    out: Vec<Segment>,
    cur: (f64, f64),
    start: (f64, f64),
    prev: Prev,
}

impl<'a> Parser<'a> {
    fn new(data: &'a str) -> Self {
        Parser {
            src: data.as_bytes(),
            pos: 0,
            out: Vec::new(),
            cur: (0.0, 0.0),
            start: (0.0, 0.0),
            prev: Prev::None,
        }
    }

    fn err(&self, reason: impl Into<String>) -> StampError {
        StampError::InvalidPath {
            offset: self.pos,
            reason: reason.into(),
        }
    }

    fn run(mut self) -> Result<Vec<Segment>, StampError> {
        self.skip_separators();
        if self.pos < self.src.len() && !matches!(self.src[self.pos], b'M' | b'm') {
            return Err(self.err("path must start with a moveto"));
        }

        while self.pos < self.src.len() {
            let cmd = self.src[self.pos];
            if !cmd.is_ascii_alphabetic() {
                return Err(self.err(format!("expected command, found {:?}", cmd as char)));
            }
            self.pos += 1;
            self.command(cmd)?;
            self.skip_separators();
        }
        Ok(self.out)
    }

    fn command(&mut self, cmd: u8) -> Result<(), StampError> {
        let rel = cmd.is_ascii_lowercase();
        match cmd.to_ascii_uppercase() {
            b'Z' => {
                self.out.push(Segment::Close);
                self.cur = self.start;
                self.prev = Prev::None;
            }
            b'M' => {
                let (x, y) = self.point(rel)?;
                self.out.push(Segment::MoveTo(x, y));
                self.cur = (x, y);
                self.start = (x, y);
                self.prev = Prev::None;
                // Extra pairs after a moveto are implicit linetos.
                while self.has_number() {
                    let (x, y) = self.point(rel)?;
                    self.line(x, y);
                }
            }
            b'L' => self.repeat(|p| {
                let (x, y) = p.point(rel)?;
                p.line(x, y);
                Ok(())
            })?,
            b'H' => self.repeat(|p| {
                let v = p.number()?;
                let x = if rel { p.cur.0 + v } else { v };
                p.line(x, p.cur.1);
                Ok(())
            })?,
            b'V' => self.repeat(|p| {
                let v = p.number()?;
                let y = if rel { p.cur.1 + v } else { v };
                p.line(p.cur.0, y);
                Ok(())
            })?,
            b'C' => self.repeat(|p| {
                let c1 = p.point(rel)?;
                let c2 = p.point(rel)?;
                let end = p.point(rel)?;
                p.cubic(c1, c2, end);
                Ok(())
            })?,
            b'S' => self.repeat(|p| {
                let c1 = match p.prev {
                    Prev::Cubic(x, y) => (2.0 * p.cur.0 - x, 2.0 * p.cur.1 - y),
                    _ => p.cur,
                };
                let c2 = p.point(rel)?;
                let end = p.point(rel)?;
                p.cubic(c1, c2, end);
                Ok(())
            })?,
            b'Q' => self.repeat(|p| {
                let ctrl = p.point(rel)?;
                let end = p.point(rel)?;
                p.quad(ctrl, end);
                Ok(())
            })?,
            b'T' => self.repeat(|p| {
                let ctrl = match p.prev {
                    Prev::Quad(x, y) => (2.0 * p.cur.0 - x, 2.0 * p.cur.1 - y),
                    _ => p.cur,
                };
                let end = p.point(rel)?;
                p.quad(ctrl, end);
                Ok(())
            })?,
            b'A' => self.repeat(|p| {
                let rx = p.number()?;
                let ry = p.number()?;
                let rotation = p.number()?;
                let large_arc = p.flag()?;
                let sweep = p.flag()?;
                let end = p.point(rel)?;
                p.arc(rx, ry, rotation, large_arc, sweep, end);
                Ok(())
            })?,
            other => return Err(self.err(format!("unknown command {:?}", other as char))),
        }
        Ok(())
    }

    /// Run `f` at least once, then again for every further argument group.
    fn repeat(&mut self, mut f: impl FnMut(&mut Self) -> Result<(), StampError>) -> Result<(), StampError> {
        f(self)?;
        while self.has_number() {
            f(self)?;
        }
        Ok(())
    }

    fn line(&mut self, x: f64, y: f64) {
        self.out.push(Segment::LineTo(x, y));
        self.cur = (x, y);
        self.prev = Prev::None;
    }

    fn cubic(&mut self, c1: (f64, f64), c2: (f64, f64), end: (f64, f64)) {
        self.out.push(Segment::CubicTo(c1.0, c1.1, c2.0, c2.1, end.0, end.1));
        self.cur = end;
        self.prev = Prev::Cubic(c2.0, c2.1);
    }

    fn quad(&mut self, ctrl: (f64, f64), end: (f64, f64)) {
        let (x0, y0) = self.cur;
        let c1 = (x0 + 2.0 / 3.0 * (ctrl.0 - x0), y0 + 2.0 / 3.0 * (ctrl.1 - y0));
        let c2 = (end.0 + 2.0 / 3.0 * (ctrl.0 - end.0), end.1 + 2.0 / 3.0 * (ctrl.1 - end.1));
        self.out.push(Segment::CubicTo(c1.0, c1.1, c2.0, c2.1, end.0, end.1));
        self.cur = end;
        self.prev = Prev::Quad(ctrl.0, ctrl.1);
    }

    fn arc(&mut self, rx: f64, ry: f64, rotation: f64, large_arc: bool, sweep: bool, end: (f64, f64)) {
        let (x1, y1) = self.cur;
        let (x2, y2) = end;
        if (x1 - x2).abs() < f64::EPSILON && (y1 - y2).abs() < f64::EPSILON {
            self.prev = Prev::None;
            return;
        }
        let (mut rx, mut ry) = (rx.abs(), ry.abs());
        if rx == 0.0 || ry == 0.0 {
            self.line(x2, y2);
            return;
        }

        let phi = rotation.to_radians();
        let (sin_phi, cos_phi) = phi.sin_cos();
        let dx = (x1 - x2) / 2.0;
        let dy = (y1 - y2) / 2.0;
        let x1p = cos_phi * dx + sin_phi * dy;
        let y1p = -sin_phi * dx + cos_phi * dy;

        let lambda = (x1p * x1p) / (rx * rx) + (y1p * y1p) / (ry * ry);
        if lambda > 1.0 {
            let s = lambda.sqrt();
            rx *= s;
            ry *= s;
        }

        let num = rx * rx * ry * ry - rx * rx * y1p * y1p - ry * ry * x1p * x1p;
        let den = rx * rx * y1p * y1p + ry * ry * x1p * x1p;
        let mut coef = if den == 0.0 { 0.0 } else { (num / den).max(0.0).sqrt() };
        if large_arc == sweep {
            coef = -coef;
        }
        let cxp = coef * rx * y1p / ry;
        let cyp = -coef * ry * x1p / rx;
        let cx = cos_phi * cxp - sin_phi * cyp + (x1 + x2) / 2.0;
        let cy = sin_phi * cxp + cos_phi * cyp + (y1 + y2) / 2.0;

        let theta1 = angle(1.0, 0.0, (x1p - cxp) / rx, (y1p - cyp) / ry);
        let mut delta = angle(
            (x1p - cxp) / rx,
            (y1p - cyp) / ry,
            (-x1p - cxp) / rx,
            (-y1p - cyp) / ry,
        );
        if !sweep && delta > 0.0 {
            delta -= 2.0 * PI;
        } else if sweep && delta < 0.0 {
            delta += 2.0 * PI;
        }

        let pieces = (delta.abs() / FRAC_PI_2).ceil().max(1.0) as usize;
        let step = delta / pieces as f64;
        let t = 4.0 / 3.0 * (step / 4.0).tan();
        let map = |ux: f64, uy: f64| {
            (
                cx + rx * ux * cos_phi - ry * uy * sin_phi,
                cy + rx * ux * sin_phi + ry * uy * cos_phi,
            )
        };

        let mut a1 = theta1;
        for i in 0..pieces {
            let a2 = a1 + step;
            let (s1, c1) = a1.sin_cos();
            let (s2, c2) = a2.sin_cos();
            let ctrl1 = map(c1 - t * s1, s1 + t * c1);
            let ctrl2 = map(c2 + t * s2, s2 - t * c2);
            // Land exactly on the requested endpoint to avoid drift.
            let to = if i + 1 == pieces { end } else { map(c2, s2) };
            self.out.push(Segment::CubicTo(ctrl1.0, ctrl1.1, ctrl2.0, ctrl2.1, to.0, to.1));
            a1 = a2;
        }
        self.cur = end;
        self.prev = Prev::None;
    }

    fn point(&mut self, rel: bool) -> Result<(f64, f64), StampError> {
        let x = self.number()?;
        let y = self.number()?;
        Ok(if rel { (self.cur.0 + x, self.cur.1 + y) } else { (x, y) })
    }

    fn skip_separators(&mut self) {
        while self.pos < self.src.len() && matches!(self.src[self.pos], b' ' | b'\t' | b'\n' | b'\r' | b'\x0c' | b',') {
            self.pos += 1;
        }
    }

    fn has_number(&mut self) -> bool {
        self.skip_separators();
        self.pos < self.src.len() && matches!(self.src[self.pos], b'0'..=b'9' | b'-' | b'+' | b'.')
    }

    fn flag(&mut self) -> Result<bool, StampError> {
        self.skip_separators();
        match self.src.get(self.pos) {
            Some(b'0') => {
                self.pos += 1;
                Ok(false)
            }
            Some(b'1') => {
                self.pos += 1;
                Ok(true)
            }
            _ => Err(self.err("expected arc flag 0 or 1")),
        }
    }

    /// Scan one number; handles `1.5.5` (two numbers) and `10-5` (two numbers).
    fn number(&mut self) -> Result<f64, StampError> {
        self.skip_separators();
        let begin = self.pos;
        let bytes = self.src;
        let mut i = self.pos;
        if i < bytes.len() && matches!(bytes[i], b'+' | b'-') {
            i += 1;
        }
        let mut digits = 0;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
            digits += 1;
        }
        if i < bytes.len() && bytes[i] == b'.' {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
                digits += 1;
            }
        }
        if digits == 0 {
            return Err(self.err("expected number"));
        }
        if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
            let mut j = i + 1;
            if j < bytes.len() && matches!(bytes[j], b'+' | b'-') {
                j += 1;
            }
            if j < bytes.len() && bytes[j].is_ascii_digit() {
                while j < bytes.len() && bytes[j].is_ascii_digit() {
                    j += 1;
                }
                i = j;
            }
        }
        let text = std::str::from_utf8(&bytes[begin..i]).map_err(|_| self.err("invalid UTF-8"))?;
        let value = text.parse::<f64>().map_err(|_| self.err(format!("bad number {text:?}")))?;
        self.pos = i;
        Ok(value)
    }
}

fn angle(ux: f64, uy: f64, vx: f64, vy: f64) -> f64 {
    (ux * vy - uy * vx).atan2(ux * vx + uy * vy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn end_point(seg: &Segment) -> Option<(f64, f64)> {
        match *seg {
            Segment::MoveTo(x, y) | Segment::LineTo(x, y) => Some((x, y)),
            Segment::CubicTo(_, _, _, _, x, y) => Some((x, y)),
            Segment::Close => None,
        }
    }

    fn assert_close(a: &[Segment], b: &[Segment]) {
        assert_eq!(a.len(), b.len(), "{a:?} vs {b:?}");
        for (sa, sb) in a.iter().zip(b) {
            match (sa, sb) {
                (Segment::Close, Segment::Close) => {}
                _ => {
                    let (ax, ay) = end_point(sa).unwrap();
                    let (bx, by) = end_point(sb).unwrap();
                    assert!((ax - bx).abs() < 1e-9 && (ay - by).abs() < 1e-9, "{sa:?} vs {sb:?}");
                }
            }
        }
    }

    #[test]
    fn freehand_polyline() {
        let segs = parse("M 10 10 L 20 20 L 30 15").unwrap();
        assert_eq!(
            segs,
            vec![
                Segment::MoveTo(10.0, 10.0),
                Segment::LineTo(20.0, 20.0),
                Segment::LineTo(30.0, 15.0),
            ]
        );
    }

    #[test]
    fn implicit_lineto_after_moveto_and_compact_numbers() {
        let segs = parse("m1,2 3-4.5.5,1").unwrap();
        assert_eq!(
            segs,
            vec![Segment::MoveTo(1.0, 2.0), Segment::LineTo(4.0, -2.5), Segment::LineTo(4.5, -1.5)]
        );
    }

    #[test]
    fn relative_and_absolute_agree() {
        let abs = parse("M10 10 H50 V40 C60 40 70 50 70 60 S80 80 90 80 Q100 70 110 80 T130 80 Z").unwrap();
        let rel = parse("m10 10 h40 v30 c10 0 20 10 20 20 s10 20 20 20 q10 -10 20 0 t20 0 z").unwrap();
        assert_close(&abs, &rel);
    }

    #[test]
    fn close_returns_to_subpath_start() {
        let segs = parse("M5 5 l10 0 z l0 10").unwrap();
        assert_eq!(segs.last(), Some(&Segment::LineTo(5.0, 15.0)));
    }

    #[test]
    fn quadratic_becomes_cubic_with_two_thirds_rule() {
        let segs = parse("M0 0 Q30 60 60 0").unwrap();
        let Segment::CubicTo(x1, y1, x2, y2, x, y) = segs[1] else {
            panic!("expected cubic, got {:?}", segs[1]);
        };
        for (got, want) in [(x1, 20.0), (y1, 40.0), (x2, 40.0), (y2, 40.0), (x, 60.0), (y, 0.0)] {
            assert!((got - want).abs() < 1e-9, "{:?}", segs[1]);
        }
    }

    #[test]
    fn arc_half_circle_ends_on_target_and_stays_on_circle() {
        let segs = parse("M0 0 A10 10 0 0 1 20 0").unwrap();
        assert_eq!(segs.len(), 3, "half turn splits into two quarter arcs: {segs:?}");
        assert_eq!(end_point(segs.last().unwrap()), Some((20.0, 0.0)));
        let (mx, my) = end_point(&segs[1]).unwrap();
        let r = ((mx - 10.0).powi(2) + my.powi(2)).sqrt();
        assert!((r - 10.0).abs() < 1e-9, "midpoint radius {r}");
        // sweep=1 in y-down space bends towards negative y
        assert!(my < 0.0);
    }

    #[test]
    fn degenerate_arc_radius_is_a_line() {
        let segs = parse("M0 0 A0 5 0 0 1 10 10").unwrap();
        assert_eq!(segs[1], Segment::LineTo(10.0, 10.0));
    }

    #[test]
    fn empty_path_is_empty() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("   ").unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_paths() {
        assert!(matches!(parse("L 1 2"), Err(StampError::InvalidPath { .. })));
        assert!(matches!(parse("M 1"), Err(StampError::InvalidPath { .. })));
        assert!(matches!(parse("M 1 2 X 3"), Err(StampError::InvalidPath { .. })));
        assert!(matches!(parse("M0 0 A 5 5 0 2 1 3 3"), Err(StampError::InvalidPath { .. })));
    }

    #[test]
    fn exponent_numbers() {
        let segs = parse("M1e1 2E-1").unwrap();
        assert_eq!(segs, vec![Segment::MoveTo(10.0, 0.2)]);
    }
}
