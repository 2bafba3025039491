//! View observers
//!
//! A [`ScreenWindow`] is a lightweight handle a view holds onto one of the
//! emulation's buffers. The emulation owns every window it creates,
//! rebinds them when the active buffer switches, and marks them when
//! coalesced output flushes. Views poll [`take_output_pending`] on their
//! own cadence.
//!
//! [`take_output_pending`]: ScreenWindow::take_output_pending

/// Identifies a window within its owning emulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub(crate) usize);

/// Selected cell range, in absolute (column, line) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub start_column: usize,
    pub start_line: usize,
    pub end_column: usize,
    pub end_line: usize,
}

/// One view's binding onto the active screen buffer.
#[derive(Debug)]
pub struct ScreenWindow {
    screen: usize,
    selection: Option<Selection>,
    output_pending: bool,
}

impl ScreenWindow {
    pub(crate) fn new(screen: usize) -> Self {
        Self {
            screen,
            selection: None,
            output_pending: false,
        }
    }

    /// Index of the buffer this window is bound to (0 primary, 1 alternate).
    pub fn screen(&self) -> usize {
        self.screen
    }

    pub(crate) fn set_screen(&mut self, screen: usize) {
        self.screen = screen;
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub(crate) fn set_selection(&mut self, selection: Option<Selection>) {
        self.selection = selection;
    }

    pub(crate) fn notify_output_changed(&mut self) {
        self.output_pending = true;
    }

    /// True if output changed since the last call; clears the flag.
    pub fn take_output_pending(&mut self) -> bool {
        std::mem::take(&mut self.output_pending)
    }
}
