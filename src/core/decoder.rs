//! Text decoding
//!
//! Two decoding concerns live here:
//!
//! - [`TextDecoder`]: turns the raw inbound byte stream into characters.
//!   It is stateful so multibyte UTF-8 sequences may straddle chunk
//!   boundaries; malformed input degrades to U+FFFD instead of erroring.
//! - [`PlainTextDecoder`]: turns screen cells back into text, recording
//!   the start offset of every exported line. The history export path and
//!   the scrollback search consume it identically.

use super::chartable::CharTable;
use super::screen::{Cell, CellFlags};

const REPLACEMENT: char = '\u{FFFD}';

/// Inbound byte stream encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// UTF-8, the default for every modern shell.
    #[default]
    Utf8,
    /// Single-byte fallback (Latin-1) for legacy sessions.
    Legacy,
}

/// Stateful byte-to-character decoder.
#[derive(Debug)]
pub struct TextDecoder {
    encoding: Encoding,
    pending: [u8; 4],
    pending_len: usize,
    pending_need: usize,
}

impl TextDecoder {
    pub fn new(encoding: Encoding) -> Self {
        Self {
            encoding,
            pending: [0; 4],
            pending_len: 0,
            pending_need: 0,
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Decodes `bytes`, appending characters to `out`. Any incomplete
    /// UTF-8 sequence at the end of the chunk is held back and resumed on
    /// the next call.
    pub fn decode(&mut self, bytes: &[u8], out: &mut String) {
        match self.encoding {
            Encoding::Legacy => {
                for &b in bytes {
                    out.push(b as char);
                }
            }
            Encoding::Utf8 => self.decode_utf8(bytes, out),
        }
    }

    fn decode_utf8(&mut self, bytes: &[u8], out: &mut String) {
        let mut i = 0;

        // Finish a sequence left over from the previous chunk.
        while self.pending_len > 0 && i < bytes.len() {
            let b = bytes[i];
            if b & 0xC0 != 0x80 {
                out.push(REPLACEMENT);
                self.pending_len = 0;
                break;
            }
            self.pending[self.pending_len] = b;
            self.pending_len += 1;
            i += 1;
            if self.pending_len == self.pending_need {
                match std::str::from_utf8(&self.pending[..self.pending_len]) {
                    Ok(s) => out.push_str(s),
                    Err(_) => out.push(REPLACEMENT),
                }
                self.pending_len = 0;
            }
        }

        while i < bytes.len() {
            let b = bytes[i];
            if b < 0x80 {
                out.push(b as char);
                i += 1;
                continue;
            }

            let need = if b & 0xE0 == 0xC0 {
                2
            } else if b & 0xF0 == 0xE0 {
                3
            } else if b & 0xF8 == 0xF0 {
                4
            } else {
                out.push(REPLACEMENT);
                i += 1;
                continue;
            };

            if i + need <= bytes.len() {
                match std::str::from_utf8(&bytes[i..i + need]) {
                    Ok(s) => {
                        out.push_str(s);
                        i += need;
                    }
                    Err(_) => {
                        out.push(REPLACEMENT);
                        i += 1;
                    }
                }
            } else {
                // Sequence continues in the next chunk.
                let tail = bytes.len() - i;
                self.pending[..tail].copy_from_slice(&bytes[i..]);
                self.pending_len = tail;
                self.pending_need = need;
                i = bytes.len();
            }
        }
    }
}

/// Streams screen lines out as text. `wrapped` marks rows whose content
/// continues onto the next row without a line feed.
pub trait CharacterDecoder {
    fn decode_line(&mut self, cells: &[Cell], wrapped: bool, chars: &CharTable);
}

/// [`CharacterDecoder`] that produces plain text with `\n` separators and
/// records where each exported line starts in the output. No separator is
/// emitted after a wrapped row, so a line that soft-wrapped across rows
/// reads back as one unbroken run.
#[derive(Debug, Default)]
pub struct PlainTextDecoder {
    text: String,
    line_positions: Vec<usize>,
    separator_pending: bool,
}

impl PlainTextDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// Byte offset into [`text`](Self::text) at which each decoded line
    /// begins, one entry per line.
    pub fn line_positions(&self) -> &[usize] {
        &self.line_positions
    }
}

impl CharacterDecoder for PlainTextDecoder {
    fn decode_line(&mut self, cells: &[Cell], wrapped: bool, chars: &CharTable) {
        if self.separator_pending {
            self.text.push('\n');
        }
        self.separator_pending = !wrapped;
        self.line_positions.push(self.text.len());

        let used = cells
            .iter()
            .rposition(|cell| !cell.is_blank())
            .map_or(0, |i| i + 1);

        for cell in &cells[..used] {
            if cell.flags.contains(CellFlags::CONTINUATION) {
                continue;
            }
            if cell.flags.contains(CellFlags::EXTENDED) {
                for &unit in chars.resolve(cell.glyph) {
                    self.text
                        .push(char::from_u32(u32::from(unit)).unwrap_or(REPLACEMENT));
                }
            } else {
                self.text
                    .push(char::from_u32(u32::from(cell.glyph)).unwrap_or(REPLACEMENT));
            }
        }
    }
}
