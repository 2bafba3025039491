//! Screen buffer
//!
//! A fixed grid of glyph cells plus the cursor and scrollback history.
//! Two instances exist per emulation (primary and alternate); the
//! emulation decides which one is active and routes dispatch here.
//!
//! Cells are 16-bit glyphs. Multi-codepoint glyphs (base character plus
//! combining marks) are interned into the shared [`CharTable`] and the
//! cell carries the handle with [`CellFlags::EXTENDED`] set.

use std::collections::VecDeque;

use bitflags::bitflags;
use unicode_width::UnicodeWidthChar;

use super::chartable::CharTable;
use super::decoder::CharacterDecoder;

const BLANK_GLYPH: u16 = b' ' as u16;
const REPLACEMENT_GLYPH: u16 = 0xFFFD;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CellFlags: u8 {
        /// `glyph` is a handle into the intern table, not a code unit.
        const EXTENDED = 0b0000_0001;
        /// Right half of a wide glyph; carries no content of its own.
        const CONTINUATION = 0b0000_0010;
    }
}

/// A single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub glyph: u16,
    pub flags: CellFlags,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            glyph: BLANK_GLYPH,
            flags: CellFlags::empty(),
        }
    }
}

impl Cell {
    fn continuation() -> Self {
        Self {
            glyph: BLANK_GLYPH,
            flags: CellFlags::CONTINUATION,
        }
    }

    pub fn is_continuation(&self) -> bool {
        self.flags.contains(CellFlags::CONTINUATION)
    }

    pub fn is_blank(&self) -> bool {
        self.glyph == BLANK_GLYPH && self.flags.is_empty()
    }
}

#[cfg(test)]
impl Cell {
    /// Builds a row of `columns` cells with `text` at the start.
    pub(crate) fn blank_row(columns: usize, text: &str) -> Vec<Cell> {
        let mut cells = vec![Cell::default(); columns];
        for (i, ch) in text.chars().enumerate() {
            cells[i].glyph = ch as u16;
        }
        cells
    }
}

/// A single grid row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub cells: Vec<Cell>,
    /// Set when the line continued onto the next row instead of ending
    /// with an explicit line feed.
    pub wrapped: bool,
}

impl Row {
    fn new(columns: usize) -> Self {
        Self {
            cells: vec![Cell::default(); columns],
            wrapped: false,
        }
    }

    fn resize(&mut self, columns: usize) {
        self.cells.resize(columns, Cell::default());
    }
}

/// Scrollback retention policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryLimit {
    /// No scrollback; scrolled lines are discarded.
    None,
    /// Keep at most this many lines, dropping the oldest.
    Bounded(usize),
    /// Keep everything.
    Unbounded,
}

impl Default for HistoryLimit {
    fn default() -> Self {
        HistoryLimit::Bounded(10_000)
    }
}

/// Cursor position, 0-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub row: usize,
    pub column: usize,
}

/// Grid, cursor and scrollback for one buffer.
#[derive(Debug)]
pub struct Screen {
    lines: usize,
    columns: usize,
    grid: Vec<Row>,
    cursor: Cursor,
    history: VecDeque<Row>,
    history_limit: HistoryLimit,
    scrolled_lines: usize,
    dropped_lines: usize,
}

impl Screen {
    pub fn new(lines: usize, columns: usize) -> Self {
        Self {
            lines,
            columns,
            grid: (0..lines).map(|_| Row::new(columns)).collect(),
            cursor: Cursor::default(),
            history: VecDeque::new(),
            history_limit: HistoryLimit::default(),
            scrolled_lines: 0,
            dropped_lines: 0,
        }
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn history_lines(&self) -> usize {
        self.history.len()
    }

    /// Visible lines plus scrollback.
    pub fn line_count(&self) -> usize {
        self.lines + self.history.len()
    }

    /// Lines pushed off the top of the grid since the last flush.
    pub fn scrolled_lines(&self) -> usize {
        self.scrolled_lines
    }

    /// Lines lost from scrollback since the last flush.
    pub fn dropped_lines(&self) -> usize {
        self.dropped_lines
    }

    pub fn reset_scrolled_lines(&mut self) {
        self.scrolled_lines = 0;
    }

    pub fn reset_dropped_lines(&mut self) {
        self.dropped_lines = 0;
    }

    pub fn history_limit(&self) -> HistoryLimit {
        self.history_limit
    }

    /// Changes the retention policy, trimming existing scrollback if the
    /// new limit is tighter.
    pub fn set_history_limit(&mut self, limit: HistoryLimit) {
        self.history_limit = limit;
        let keep = match limit {
            HistoryLimit::None => 0,
            HistoryLimit::Bounded(max) => max,
            HistoryLimit::Unbounded => return,
        };
        while self.history.len() > keep {
            self.history.pop_front();
            self.dropped_lines += 1;
        }
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Moves the cursor one column left, stopping at the margin.
    pub fn backspace(&mut self) {
        if self.cursor.column > 0 {
            self.cursor.column -= 1;
        }
    }

    /// Advances the cursor to the next 8-column tab stop.
    pub fn tab(&mut self) {
        self.cursor.column = (self.cursor.column / 8 + 1) * 8;
        if self.cursor.column >= self.columns {
            self.cursor.column = self.columns.saturating_sub(1);
        }
    }

    pub fn to_start_of_line(&mut self) {
        self.cursor.column = 0;
    }

    /// Moves the cursor down one line, scrolling at the bottom.
    pub fn new_line(&mut self) {
        if self.cursor.row + 1 >= self.lines {
            self.scroll_up();
        } else {
            self.cursor.row += 1;
        }
    }

    fn scroll_up(&mut self) {
        if self.grid.is_empty() {
            return;
        }
        let scrolled = self.grid.remove(0);
        self.grid.push(Row::new(self.columns));
        self.scrolled_lines += 1;

        match self.history_limit {
            HistoryLimit::None => self.dropped_lines += 1,
            HistoryLimit::Bounded(max) => {
                self.history.push_back(scrolled);
                while self.history.len() > max {
                    self.history.pop_front();
                    self.dropped_lines += 1;
                }
            }
            HistoryLimit::Unbounded => self.history.push_back(scrolled),
        }
    }

    /// Writes one character at the cursor, advancing it and wrapping or
    /// scrolling as needed. Zero-width characters compose with the glyph
    /// already at the previous cell.
    pub fn display_character(&mut self, ch: char, chars: &mut CharTable) {
        let width = ch.width().unwrap_or(0);
        if width == 0 {
            self.compose_with_previous(glyph_unit(ch), chars);
            return;
        }

        if self.cursor.column >= self.columns {
            self.grid[self.cursor.row].wrapped = true;
            self.cursor.column = 0;
            self.new_line();
        }

        let (row, column) = (self.cursor.row, self.cursor.column);
        self.grid[row].cells[column] = Cell {
            glyph: glyph_unit(ch),
            flags: CellFlags::empty(),
        };
        if width == 2 && column + 1 < self.columns {
            self.grid[row].cells[column + 1] = Cell::continuation();
        }
        self.cursor.column += width;
    }

    /// Appends a combining mark to the glyph left of the cursor by
    /// interning the extended sequence.
    fn compose_with_previous(&mut self, unit: u16, chars: &mut CharTable) {
        let row = self.cursor.row;
        let column = self.cursor.column.min(self.columns);
        if column == 0 {
            return;
        }

        let mut base = column - 1;
        if self.grid[row].cells[base].is_continuation() && base > 0 {
            base -= 1;
        }

        let cell = self.grid[row].cells[base];
        let mut sequence = if cell.flags.contains(CellFlags::EXTENDED) {
            chars.resolve(cell.glyph).to_vec()
        } else {
            vec![cell.glyph]
        };
        sequence.push(unit);

        let handle = chars.intern(&sequence);
        let cell = &mut self.grid[row].cells[base];
        cell.glyph = handle;
        cell.flags.insert(CellFlags::EXTENDED);
    }

    /// Resizes the grid, keeping contents where they still fit. History
    /// rows are resized as well so exports stay rectangular.
    pub fn resize_image(&mut self, lines: usize, columns: usize) {
        while self.grid.len() < lines {
            self.grid.push(Row::new(columns));
        }
        self.grid.truncate(lines);
        for row in &mut self.grid {
            row.resize(columns);
        }
        for row in &mut self.history {
            row.resize(columns);
        }

        self.lines = lines;
        self.columns = columns;
        self.cursor.row = self.cursor.row.min(lines.saturating_sub(1));
        self.cursor.column = self.cursor.column.min(columns.saturating_sub(1));
    }

    /// Cells of the absolute line `index`, where 0 is the oldest
    /// scrollback line and history precedes the visible grid.
    pub fn line_cells(&self, index: usize) -> Option<&[Cell]> {
        self.line(index).map(|row| row.cells.as_slice())
    }

    fn line(&self, index: usize) -> Option<&Row> {
        if index < self.history.len() {
            self.history.get(index)
        } else {
            self.grid.get(index - self.history.len())
        }
    }

    /// Streams the absolute line range `[start, end]` (clamped) through
    /// `decoder`. Rows that soft-wrapped pass their wrap flag along so
    /// the decoder can join them with the following row.
    pub fn write_lines_to_stream(
        &self,
        decoder: &mut dyn CharacterDecoder,
        chars: &CharTable,
        start: usize,
        end: usize,
    ) {
        let count = self.line_count();
        if count == 0 || start > end || start >= count {
            return;
        }
        for index in start..=end.min(count - 1) {
            if let Some(row) = self.line(index) {
                decoder.decode_line(&row.cells, row.wrapped, chars);
            }
        }
    }
}

fn glyph_unit(ch: char) -> u16 {
    // BMP only; astral code points degrade to the replacement character.
    u16::try_from(ch as u32).unwrap_or(REPLACEMENT_GLYPH)
}
