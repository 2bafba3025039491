//! Core emulation components.
//!
//! This module contains the session state machine and everything it owns:
//!
//! - **chartable**: glyph intern table for multi-codepoint sequences
//! - **decoder**: stateful byte decoding + cell-to-text export
//! - **screen**: cell grid, cursor and scrollback (two per emulation)
//! - **scheduler**: two-deadline update coalescing
//! - **window**: view observer handles
//! - **emulation**: the controller tying it all together
//!
//! # Architecture
//!
//! ```text
//! Emulation
//! ├── Screen ×2 (primary / alternate, one active)
//! │   └── CharTable (shared, interned glyphs)
//! ├── TextDecoder (stateful bytes → chars)
//! ├── UpdateScheduler (10ms / 40ms deadlines)
//! └── ScreenWindow* (view observers, rebound on switch)
//! ```

pub mod chartable;
pub mod decoder;
pub mod emulation;
pub mod scheduler;
pub mod screen;
pub mod window;
