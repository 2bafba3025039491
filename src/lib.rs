//! termstate - terminal session state core
//!
//! This crate is the state container behind a terminal view: it ingests a
//! decoded byte stream, maintains primary and alternate screen buffers
//! with scrollback, interns multi-codepoint glyphs into compact handles,
//! coalesces change notifications under a bounded latency, and runs
//! regex searches over the full visible-plus-history text.
//!
//! It deliberately stops below the escape-sequence layer: only the bare
//! control characters are dispatched here. Protocol parsing, rendering,
//! PTY I/O and key translation live in the embedding application.
//!
//! ```no_run
//! use termstate::{Direction, Emulation, HistorySearch, VoidListener};
//!
//! let mut emulation = Emulation::new(VoidListener);
//! emulation.set_image_size(24, 80);
//! emulation.receive_data(b"hello\r\nworld");
//! emulation.maintain();
//!
//! let search = HistorySearch::new("wor.d?", Direction::Forward, 0, 0).unwrap();
//! let outcome = search.run(&emulation);
//! # let _ = outcome;
//! ```

pub mod config;
pub mod core;
pub mod event;
pub mod keybindings;
pub mod search;

pub use crate::config::{Config, ConfigError};
pub use crate::core::chartable::{CharTable, SharedCharTable};
pub use crate::core::decoder::{CharacterDecoder, Encoding, PlainTextDecoder, TextDecoder};
pub use crate::core::emulation::Emulation;
pub use crate::core::scheduler::{UpdateScheduler, BULK_TIMEOUT_FAST, BULK_TIMEOUT_SLOW};
pub use crate::core::screen::{Cell, CellFlags, Cursor, HistoryLimit, Row, Screen};
pub use crate::core::window::{ScreenWindow, Selection, WindowId};
pub use crate::event::{Activity, CursorShape, Event, EventListener, VoidListener};
pub use crate::keybindings::{KeyBindingProfile, KeyBindingRegistry};
pub use crate::search::{Direction, HistorySearch, SearchError, SearchHit, SearchOutcome};
