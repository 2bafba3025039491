//! Notification surface
//!
//! The emulation reports state changes through a single [`EventListener`]
//! supplied at construction time. Delivery is synchronous and happens on
//! the thread that owns the emulation; consumers that need cross-thread
//! delivery can forward events into a channel from their listener.

/// State changes published by the emulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Screen contents changed. Coalesced by the update scheduler, so a
    /// burst of writes produces a single event.
    OutputChanged,
    /// Both screens were resized.
    ImageSizeChanged { lines: usize, columns: usize },
    /// Session activity level changed (bell, fresh output, idle).
    ActivityState(Activity),
    /// Title or title-like metadata reported by the remote program.
    /// `kind` carries the OSC-style selector (0/1/2 for titles, 50 for
    /// the cursor-state report).
    TitleChanged { kind: i32, text: String },
    /// The raw byte stream contained a ZModem transfer marker.
    /// Best-effort sniff, at most once per ingested chunk.
    ZmodemDetected,
    /// The remote program asked for a different cursor shape.
    CursorShapeChanged { shape: CursorShape, blinking: bool },
    /// The remote program changed its interest in mouse events.
    MouseInterestChanged(bool),
    /// The remote program toggled bracketed paste mode.
    PasteModeChanged(bool),
}

/// Activity level reported alongside output processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Normal,
    Bell,
    Active,
}

/// Cursor shape requested via DECSCUSR-style reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorShape {
    #[default]
    Block,
    Underline,
    Bar,
}

/// Receiver for emulation events.
pub trait EventListener {
    fn send_event(&self, event: Event);
}

/// Listener that discards every event. Useful for tests and for sessions
/// that are driven purely through polling.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoidListener;

impl EventListener for VoidListener {
    fn send_event(&self, _event: Event) {}
}
