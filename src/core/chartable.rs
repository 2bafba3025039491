//! Glyph intern table
//!
//! Cells store a single 16-bit value. For plain text that value is the
//! character itself (BMP code unit); for multi-codepoint glyphs (a base
//! character plus combining marks) it is a handle into this table, marked
//! with [`CellFlags::EXTENDED`] on the cell. Handles are produced by a
//! polynomial hash with linear probing, so two distinct sequences never
//! alias and re-interning an existing sequence is free.
//!
//! The table is append-only: entries are never removed or rewritten, and a
//! handle stays valid for as long as the table lives. It is not
//! synchronized; a single emulation thread owns it, shared between the two
//! screens via [`SharedCharTable`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Interned sequences shared between an emulation's screens.
pub type SharedCharTable = Rc<RefCell<CharTable>>;

/// Registry mapping multi-codepoint sequences to 16-bit handles.
#[derive(Debug, Default)]
pub struct CharTable {
    entries: HashMap<u16, Vec<u16>>,
}

impl CharTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_shared() -> SharedCharTable {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Interns `sequence` and returns its handle. An already-present
    /// sequence returns the existing handle; a hash collision with a
    /// different sequence probes forward (wrapping) until a free or
    /// matching slot is found.
    ///
    /// Calling with an empty sequence is a contract violation.
    pub fn intern(&mut self, sequence: &[u16]) -> u16 {
        debug_assert!(!sequence.is_empty(), "interning an empty sequence");

        let mut hash = Self::sequence_hash(sequence);
        loop {
            match self.entries.get(&hash) {
                None => {
                    self.entries.insert(hash, sequence.to_vec());
                    return hash;
                }
                Some(stored) if stored == sequence => return hash,
                Some(_) => hash = hash.wrapping_add(1),
            }
        }
    }

    /// Returns the sequence stored under `handle`, or an empty slice if
    /// nothing was interned there.
    pub fn resolve(&self, handle: u16) -> &[u16] {
        self.entries.get(&handle).map_or(&[], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn sequence_hash(sequence: &[u16]) -> u16 {
        let mut hash: u16 = 0;
        for &unit in sequence {
            hash = hash.wrapping_mul(31).wrapping_add(unit);
        }
        hash
    }
}
