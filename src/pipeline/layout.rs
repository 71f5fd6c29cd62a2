//! Greedy word wrapping for text attachments.
//!
//! Explicit line breaks always start a new line. Within a paragraph words
//! are packed onto a line while the measured width stays within the box
//! width; a single word wider than the box sits on its own line rather than
//! being split. Lines are returned already WinAnsi-encoded so the draw phase
//! can emit them without another pass over the font.

use crate::error::StampError;
use crate::font::StandardFont;

/// Split on every line terminator a text area can produce.
fn paragraphs(text: &str) -> impl Iterator<Item = &str> {
    text.split("\r\n")
        .flat_map(|chunk| chunk.split(['\n', '\r', '\u{0B}', '\u{0C}']))
}

/// Encode and wrap `text` to `max_width` points at `size`.
///
/// A non-positive `max_width` disables wrapping.
pub fn wrap_text(
    text: &str,
    font: StandardFont,
    size: f32,
    max_width: f32,
) -> Result<Vec<Vec<u8>>, StampError> {
    let space = font.width_of(b" ", size);
    let mut lines = Vec::new();

    for paragraph in paragraphs(text) {
        let encoded = font.encode(paragraph)?;
        if max_width <= 0.0 {
            lines.push(encoded);
            continue;
        }

        let mut line: Vec<u8> = Vec::new();
        let mut line_width = 0.0f32;
        for word in encoded.split(|&b| b == b' ').filter(|w| !w.is_empty()) {
            let word_width = font.width_of(word, size);
            if line.is_empty() {
                line.extend_from_slice(word);
                line_width = word_width;
            } else if line_width + space + word_width <= max_width {
                line.push(b' ');
                line.extend_from_slice(word);
                line_width += space + word_width;
            } else {
                lines.push(std::mem::take(&mut line));
                line.extend_from_slice(word);
                line_width = word_width;
            }
        }
        lines.push(line);
    }

    Ok(lines)
}
