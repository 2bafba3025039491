//! Scrollback search
//!
//! A [`HistorySearch`] is a one-shot task: built for a single request, it
//! scans the emulation's visible-plus-history text for a regex match and
//! is consumed producing exactly one outcome.
//!
//! The scan is split into two halves so the wraparound checks the nearer
//! half first, and each half is read in blocks of at most
//! [`BLOCK_LINES`] lines so peak memory stays bounded no matter how much
//! scrollback the session holds. Blocks are exported through the same
//! [`PlainTextDecoder`] as the history export path; its recorded line
//! start offsets translate match offsets back to (line, column) pairs.

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::core::decoder::PlainTextDecoder;
use crate::core::emulation::Emulation;
use crate::event::EventListener;

/// Upper bound on lines decoded per block.
pub const BLOCK_LINES: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid search pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Location of a match, in absolute (column, line) coordinates with an
/// inclusive end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchHit {
    pub start_column: usize,
    pub start_line: usize,
    pub end_column: usize,
    pub end_line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Match(SearchHit),
    NoMatch,
}

/// One-shot search task over an emulation's history.
#[derive(Debug)]
pub struct HistorySearch {
    pattern: Regex,
    direction: Direction,
    start_column: usize,
    start_line: usize,
}

impl HistorySearch {
    pub fn new(
        pattern: &str,
        direction: Direction,
        start_column: usize,
        start_line: usize,
    ) -> Result<Self, SearchError> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            direction,
            start_column,
            start_line,
        })
    }

    /// Runs the search to completion. An empty pattern is nothing to do
    /// and produces no outcome at all; otherwise exactly one outcome is
    /// returned.
    pub fn run<L: EventListener>(self, emulation: &Emulation<L>) -> Option<SearchOutcome> {
        if self.pattern.as_str().is_empty() {
            return None;
        }

        let total = emulation.line_count();
        if total == 0 {
            return Some(SearchOutcome::NoMatch);
        }
        let last = total - 1;

        // Check the half nearer to the start position first, then wrap.
        let hit = match self.direction {
            Direction::Forward => self
                .scan(emulation, self.start_column, self.start_line, None, last)
                .or_else(|| self.scan(emulation, 0, 0, Some(self.start_column), self.start_line)),
            Direction::Backward => self
                .scan(emulation, 0, 0, Some(self.start_column), self.start_line)
                .or_else(|| {
                    self.scan(emulation, self.start_column, self.start_line, None, last)
                }),
        };

        Some(hit.map_or(SearchOutcome::NoMatch, SearchOutcome::Match))
    }

    /// Scans the absolute line range `[start_line, end_line]` block by
    /// block. `start_column` floors matches in forward scans and backward
    /// scans alike; `end_column`, when supplied, caps them at
    /// last-line-start + column.
    fn scan<L: EventListener>(
        &self,
        emulation: &Emulation<L>,
        start_column: usize,
        start_line: usize,
        end_column: Option<usize>,
        end_line: usize,
    ) -> Option<SearchHit> {
        if start_line > end_line {
            return None;
        }
        debug!(
            start_column,
            start_line,
            ?end_column,
            end_line,
            "scanning half"
        );

        let lines_to_read = end_line - start_line + 1;
        let mut lines_read = 0;

        while lines_read < lines_to_read {
            let block_size = BLOCK_LINES.min(lines_to_read - lines_read);
            let block_start = match self.direction {
                Direction::Forward => start_line + lines_read,
                Direction::Backward => end_line + 1 - lines_read - block_size,
            };
            let block_end = block_start + block_size - 1;

            let mut decoder = PlainTextDecoder::new();
            emulation.write_to_stream(&mut decoder, block_start, block_end);
            let text = decoder.text();
            let positions = decoder.line_positions();

            if let Some(hit) = self.match_block(text, positions, start_column, end_column) {
                let hit = SearchHit {
                    start_line: hit.start_line + block_start,
                    end_line: hit.end_line + block_start,
                    ..hit
                };
                debug!(?hit, "match found");
                return Some(hit);
            }

            lines_read += block_size;
        }

        None
    }

    /// Matches within one decoded block, returning a hit with line
    /// numbers relative to the block.
    fn match_block(
        &self,
        text: &str,
        positions: &[usize],
        start_column: usize,
        end_column: Option<usize>,
    ) -> Option<SearchHit> {
        if positions.is_empty() {
            return None;
        }

        let end_position = match end_column {
            Some(column) if positions.len() > 1 => positions[positions.len() - 1] + column,
            _ => text.len(),
        };

        let matched = match self.direction {
            Direction::Forward => {
                let mut from = start_column.min(text.len());
                while !text.is_char_boundary(from) {
                    from -= 1;
                }
                self.pattern
                    .find_at(text, from)
                    .filter(|m| m.start() < end_position)
            }
            Direction::Backward => {
                // Nearest-from-below: keep the last match that qualifies,
                // stopping at the first one that does not.
                let mut winner = None;
                for m in self.pattern.find_iter(text) {
                    if m.start() < end_position && m.start() >= start_column {
                        winner = Some(m);
                    } else {
                        break;
                    }
                }
                winner
            }
        }?;

        let match_start = matched.start();
        let match_end = matched.end().saturating_sub(1).max(match_start);
        let start_index = line_index_at(positions, match_start);
        let end_index = line_index_at(positions, match_end);

        Some(SearchHit {
            start_column: match_start - positions[start_index],
            start_line: start_index,
            end_column: match_end - positions[end_index],
            end_line: end_index,
        })
    }
}

/// Index of the line owning `offset`: the greatest recorded start ≤ it.
fn line_index_at(positions: &[usize], offset: usize) -> usize {
    let mut line = 0;
    while line + 1 < positions.len() && positions[line + 1] <= offset {
        line += 1;
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::VoidListener;

    /// One visible line; everything typed earlier lands in scrollback.
    fn emulation_with_lines(lines: &[&str]) -> Emulation<VoidListener> {
        let mut emu = Emulation::new(VoidListener);
        emu.set_image_size(1, 20);
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                emu.receive_data(b"\r\n");
            }
            emu.receive_data(line.as_bytes());
        }
        assert_eq!(emu.line_count(), lines.len());
        emu
    }

    fn run(
        emu: &Emulation<VoidListener>,
        pattern: &str,
        direction: Direction,
        start_column: usize,
        start_line: usize,
    ) -> Option<SearchOutcome> {
        HistorySearch::new(pattern, direction, start_column, start_line)
            .unwrap()
            .run(emu)
    }

    #[test]
    fn test_forward_nearer_line_wins() {
        let emu = emulation_with_lines(&["foo", "bar", "foobar"]);
        // Line 1 is scanned before line 2's embedded "bar" at column 3.
        let outcome = run(&emu, "bar", Direction::Forward, 0, 0);
        assert_eq!(
            outcome,
            Some(SearchOutcome::Match(SearchHit {
                start_column: 0,
                start_line: 1,
                end_column: 2,
                end_line: 1,
            }))
        );
    }

    #[test]
    fn test_forward_wraps_past_start_column() {
        let emu = emulation_with_lines(&["foo", "bar", "foobar"]);
        // Line 2's only "foo" is before column 3, so the search wraps.
        let outcome = run(&emu, "foo", Direction::Forward, 3, 2);
        assert_eq!(
            outcome,
            Some(SearchOutcome::Match(SearchHit {
                start_column: 0,
                start_line: 0,
                end_column: 2,
                end_line: 0,
            }))
        );
    }

    #[test]
    fn test_backward_takes_nearest_from_below() {
        let emu = emulation_with_lines(&["ab ab ab"]);
        let outcome = run(&emu, "ab", Direction::Backward, 8, 0);
        assert_eq!(
            outcome,
            Some(SearchOutcome::Match(SearchHit {
                start_column: 6,
                start_line: 0,
                end_column: 7,
                end_line: 0,
            }))
        );
    }

    #[test]
    fn test_backward_wraps_to_end() {
        let emu = emulation_with_lines(&["foo", "bar", "foobar"]);
        // Nothing before (0,0); the wrap half picks the match nearest
        // the end of the buffer.
        let outcome = run(&emu, "bar", Direction::Backward, 0, 0);
        assert_eq!(
            outcome,
            Some(SearchOutcome::Match(SearchHit {
                start_column: 3,
                start_line: 2,
                end_column: 5,
                end_line: 2,
            }))
        );
    }

    #[test]
    fn test_match_spanning_lines() {
        let emu = emulation_with_lines(&["xbar", "foox"]);
        let outcome = run(&emu, "bar\nfoo", Direction::Forward, 0, 0);
        assert_eq!(
            outcome,
            Some(SearchOutcome::Match(SearchHit {
                start_column: 1,
                start_line: 0,
                end_column: 2,
                end_line: 1,
            }))
        );
    }

    #[test]
    fn test_match_across_soft_wrap() {
        let mut emu = Emulation::new(VoidListener);
        emu.set_image_size(2, 4);
        emu.receive_data(b"abcdef");
        // Row 0 soft-wrapped into row 1, so "cdef" reads as one run.
        let outcome = HistorySearch::new("cdef", Direction::Forward, 0, 0)
            .unwrap()
            .run(&emu);
        assert_eq!(
            outcome,
            Some(SearchOutcome::Match(SearchHit {
                start_column: 2,
                start_line: 0,
                end_column: 1,
                end_line: 1,
            }))
        );
    }

    #[test]
    fn test_wrap_half_respects_end_boundary() {
        let emu = emulation_with_lines(&["ab", "ca"]);
        // Forward from (1,1): nothing at or after, wrap half ends at
        // line 1 column 1 and still reaches line 1's leading "c".
        let outcome = run(&emu, "c", Direction::Forward, 1, 1);
        assert_eq!(
            outcome,
            Some(SearchOutcome::Match(SearchHit {
                start_column: 0,
                start_line: 1,
                end_column: 0,
                end_line: 1,
            }))
        );
    }

    #[test]
    fn test_no_match() {
        let emu = emulation_with_lines(&["foo", "bar"]);
        assert_eq!(
            run(&emu, "missing", Direction::Forward, 0, 0),
            Some(SearchOutcome::NoMatch)
        );
        assert_eq!(
            run(&emu, "missing", Direction::Backward, 0, 1),
            Some(SearchOutcome::NoMatch)
        );
    }

    #[test]
    fn test_empty_pattern_is_no_op() {
        let emu = emulation_with_lines(&["foo"]);
        assert_eq!(run(&emu, "", Direction::Forward, 0, 0), None);
    }

    #[test]
    fn test_invalid_pattern_errors() {
        assert!(HistorySearch::new("(unclosed", Direction::Forward, 0, 0).is_err());
    }

    #[test]
    fn test_regex_alternation() {
        let emu = emulation_with_lines(&["alpha", "beta", "gamma"]);
        let outcome = run(&emu, "be(ta|lt)", Direction::Forward, 0, 0);
        assert_eq!(
            outcome,
            Some(SearchOutcome::Match(SearchHit {
                start_column: 0,
                start_line: 1,
                end_column: 3,
                end_line: 1,
            }))
        );
    }
}
