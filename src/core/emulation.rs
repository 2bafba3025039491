//! Session controller
//!
//! [`Emulation`] owns the full state of one terminal session: the primary
//! and alternate screen buffers, the shared glyph intern table, the
//! stateful byte decoder, the attached view windows and the update
//! scheduler. Raw bytes come in through [`receive_data`], mutate the
//! active screen one character at a time, and leave as coalesced events
//! on the [`EventListener`].
//!
//! The emulation is single-owner: everything here is `!Sync` by design
//! and is driven from one thread. [`receive_data`] runs synchronously to
//! completion; flushing happens when the owner calls [`maintain`].
//!
//! [`receive_data`]: Emulation::receive_data
//! [`maintain`]: Emulation::maintain

use std::time::Instant;

use tracing::{debug, trace};

use crate::config::Config;
use crate::event::{Activity, CursorShape, Event, EventListener};
use crate::keybindings::KeyBindingRegistry;

use super::chartable::{CharTable, SharedCharTable};
use super::decoder::{CharacterDecoder, Encoding, TextDecoder};
use super::scheduler::UpdateScheduler;
use super::screen::{HistoryLimit, Screen};
use super::window::{ScreenWindow, Selection, WindowId};

const DEFAULT_LINES: usize = 40;
const DEFAULT_COLUMNS: usize = 80;

/// ZModem transfers open with CAN followed by "B00".
const ZMODEM_MARKER: u8 = 0x18;
const ZMODEM_TAIL: &[u8] = b"B00";

/// State container for one terminal session.
pub struct Emulation<L: EventListener> {
    screens: [Screen; 2],
    active: usize,
    chars: SharedCharTable,
    decoder: TextDecoder,
    key_bindings: String,
    uses_mouse: bool,
    bracketed_paste: bool,
    windows: Vec<ScreenWindow>,
    scheduler: UpdateScheduler,
    listener: L,
}

impl<L: EventListener> Emulation<L> {
    pub fn new(listener: L) -> Self {
        Self::with_char_table(listener, CharTable::new_shared())
    }

    /// Builds an emulation around an existing intern table, so several
    /// sessions in one process can share interned glyphs.
    pub fn with_char_table(listener: L, chars: SharedCharTable) -> Self {
        Self {
            screens: [
                Screen::new(DEFAULT_LINES, DEFAULT_COLUMNS),
                Screen::new(DEFAULT_LINES, DEFAULT_COLUMNS),
            ],
            active: 0,
            chars,
            decoder: TextDecoder::new(Encoding::Utf8),
            key_bindings: crate::keybindings::DEFAULT_PROFILE.to_string(),
            uses_mouse: false,
            bracketed_paste: false,
            windows: Vec::new(),
            scheduler: UpdateScheduler::new(),
            listener,
        }
    }

    pub fn char_table(&self) -> &SharedCharTable {
        &self.chars
    }

    pub fn current_screen(&self) -> &Screen {
        &self.screens[self.active]
    }

    pub fn screen(&self, index: usize) -> &Screen {
        &self.screens[index & 1]
    }

    /// Selects the active buffer (0 primary, 1 alternate). On an actual
    /// change every attached window is rebound to the new buffer; buffer
    /// contents are never touched.
    pub fn set_screen(&mut self, index: usize) {
        let index = index & 1;
        if index == self.active {
            return;
        }
        self.active = index;
        for window in &mut self.windows {
            window.set_screen(index);
        }
    }

    /// Creates a view window bound to the active buffer. The emulation
    /// owns it for the rest of its life.
    pub fn create_window(&mut self) -> WindowId {
        let id = WindowId(self.windows.len());
        self.windows.push(ScreenWindow::new(self.active));
        id
    }

    pub fn window(&self, id: WindowId) -> Option<&ScreenWindow> {
        self.windows.get(id.0)
    }

    pub fn window_mut(&mut self, id: WindowId) -> Option<&mut ScreenWindow> {
        self.windows.get_mut(id.0)
    }

    /// Updates a window's selection and requests a coalesced update, the
    /// same as any other content change.
    pub fn set_window_selection(&mut self, id: WindowId, selection: Option<Selection>) {
        if let Some(window) = self.windows.get_mut(id.0) {
            window.set_selection(selection);
            self.buffered_update();
        }
    }

    /// Ingests a chunk of the inbound byte stream: decodes it with the
    /// session's stateful decoder and dispatches one character at a time.
    /// Independently of decoding, the raw bytes are sniffed for a ZModem
    /// marker; at most one [`Event::ZmodemDetected`] fires per call.
    pub fn receive_data(&mut self, bytes: &[u8]) {
        self.listener.send_event(Event::ActivityState(Activity::Active));
        self.buffered_update();

        let mut text = String::new();
        self.decoder.decode(bytes, &mut text);
        for ch in text.chars() {
            self.receive_char(ch);
        }

        for (i, &b) in bytes.iter().enumerate() {
            if b == ZMODEM_MARKER && bytes[i + 1..].starts_with(ZMODEM_TAIL) {
                trace!("zmodem marker in inbound stream");
                self.listener.send_event(Event::ZmodemDetected);
                break;
            }
        }
    }

    /// Dispatches a single decoded character to the active buffer.
    pub fn receive_char(&mut self, ch: char) {
        match ch {
            '\x08' => self.screens[self.active].backspace(),
            '\t' => self.screens[self.active].tab(),
            '\n' => self.screens[self.active].new_line(),
            '\r' => self.screens[self.active].to_start_of_line(),
            '\x07' => self.listener.send_event(Event::ActivityState(Activity::Bell)),
            _ => {
                let mut chars = self.chars.borrow_mut();
                self.screens[self.active].display_character(ch, &mut chars);
            }
        }
    }

    /// Resizes both buffers. Non-positive dimensions are silently
    /// ignored; resizing to the current size is a no-op.
    pub fn set_image_size(&mut self, lines: i32, columns: i32) {
        if lines < 1 || columns < 1 {
            return;
        }
        let (lines, columns) = (lines as usize, columns as usize);
        let unchanged = self
            .screens
            .iter()
            .all(|s| s.lines() == lines && s.columns() == columns);
        if unchanged {
            return;
        }

        debug!(lines, columns, "image size changed");
        for screen in &mut self.screens {
            screen.resize_image(lines, columns);
        }
        self.listener
            .send_event(Event::ImageSizeChanged { lines, columns });
        self.buffered_update();
    }

    /// (lines, columns) of the active buffer.
    pub fn image_size(&self) -> (usize, usize) {
        let screen = self.current_screen();
        (screen.lines(), screen.columns())
    }

    /// Visible plus scrollback lines of the active buffer.
    pub fn line_count(&self) -> usize {
        self.current_screen().line_count()
    }

    /// Streams the active buffer's absolute line range `[start, end]`
    /// through `decoder`. The search engine and history export both come
    /// through here.
    pub fn write_to_stream(&self, decoder: &mut dyn CharacterDecoder, start: usize, end: usize) {
        self.current_screen()
            .write_lines_to_stream(decoder, &self.chars.borrow(), start, end);
    }

    /// Streams the entire visible-plus-history contents.
    pub fn write_all_to_stream(&self, decoder: &mut dyn CharacterDecoder) {
        let count = self.line_count();
        if count > 0 {
            self.write_to_stream(decoder, 0, count - 1);
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.decoder.encoding()
    }

    /// Swaps the byte decoder. Any partial sequence from the previous
    /// encoding is discarded.
    pub fn set_encoding(&mut self, encoding: Encoding) {
        debug!(?encoding, "encoding changed");
        self.decoder = TextDecoder::new(encoding);
    }

    /// Looks up `name` in `registry`, falling back to the default profile
    /// when unresolved.
    pub fn set_key_bindings(&mut self, name: &str, registry: &KeyBindingRegistry) {
        let profile = registry
            .find(name)
            .unwrap_or_else(|| registry.default_profile());
        self.key_bindings = profile.name.clone();
    }

    pub fn key_bindings(&self) -> &str {
        &self.key_bindings
    }

    /// Scrollback policy of the primary buffer.
    pub fn history(&self) -> HistoryLimit {
        self.screens[0].history_limit()
    }

    /// Changes the primary buffer's scrollback policy and flushes
    /// immediately so views see the trimmed state.
    pub fn set_history(&mut self, limit: HistoryLimit) {
        self.screens[0].set_history_limit(limit);
        self.show_bulk();
    }

    /// Drops the primary buffer's scrollback and flushes so views see
    /// the shortened history.
    pub fn clear_history(&mut self) {
        self.screens[0].clear_history();
        self.show_bulk();
    }

    pub fn program_uses_mouse(&self) -> bool {
        self.uses_mouse
    }

    /// Stores the remote program's mouse interest and republishes it.
    /// Interpretation is up to the consumer.
    pub fn set_program_uses_mouse(&mut self, uses_mouse: bool) {
        self.uses_mouse = uses_mouse;
        self.listener
            .send_event(Event::MouseInterestChanged(uses_mouse));
    }

    pub fn program_bracketed_paste_mode(&self) -> bool {
        self.bracketed_paste
    }

    pub fn set_bracketed_paste_mode(&mut self, enabled: bool) {
        self.bracketed_paste = enabled;
        self.listener.send_event(Event::PasteModeChanged(enabled));
    }

    /// Republishes a title report from the remote program.
    pub fn report_title(&mut self, kind: i32, text: &str) {
        self.listener.send_event(Event::TitleChanged {
            kind,
            text: text.to_string(),
        });
    }

    /// Republishes a cursor-shape report, mirrored onto the title channel
    /// (kind 50) for consumers that only listen there.
    pub fn report_cursor_change(&mut self, shape: CursorShape, blinking: bool) {
        self.listener
            .send_event(Event::CursorShapeChanged { shape, blinking });
        self.report_title(
            50,
            &format!(
                "CursorShape={};BlinkingCursorEnabled={}",
                shape as i32, blinking
            ),
        );
    }

    /// Byte the remote side should treat as erase.
    pub fn erase_char(&self) -> u8 {
        0x08
    }

    /// Applies session configuration: encoding, key-binding profile and
    /// scrollback limit.
    pub fn apply_config(&mut self, config: &Config, registry: &KeyBindingRegistry) {
        self.set_encoding(config.encoding);
        self.set_key_bindings(&config.key_bindings, registry);
        self.set_history(config.history_limit());
    }

    /// Records a content change with the coalescing scheduler.
    pub fn buffered_update(&mut self) {
        self.scheduler.schedule(Instant::now());
    }

    pub fn update_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Driving call: flushes if a coalescing deadline has expired.
    /// Returns whether a flush happened.
    pub fn maintain(&mut self) -> bool {
        self.maintain_at(Instant::now())
    }

    pub fn maintain_at(&mut self, now: Instant) -> bool {
        if !self.scheduler.expired(now) {
            return false;
        }
        self.show_bulk();
        true
    }

    /// Forces the coalesced flush: one output-changed notification, all
    /// windows marked, per-buffer scroll counters cleared.
    pub fn show_bulk(&mut self) {
        self.scheduler.reset();
        self.listener.send_event(Event::OutputChanged);
        for window in &mut self.windows {
            window.notify_output_changed();
        }
        self.screens[self.active].reset_scrolled_lines();
        self.screens[self.active].reset_dropped_lines();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::decoder::PlainTextDecoder;
    use crate::event::testing::RecordingListener;
    use std::time::Duration;

    fn emulation() -> (Emulation<RecordingListener>, RecordingListener) {
        let listener = RecordingListener::new();
        (Emulation::new(listener.clone()), listener)
    }

    fn current_text(emu: &Emulation<RecordingListener>) -> String {
        let mut decoder = PlainTextDecoder::new();
        emu.write_all_to_stream(&mut decoder);
        decoder.into_text()
    }

    #[test]
    fn test_dispatch_crlf() {
        let (mut emu, _) = emulation();
        emu.receive_data(b"foo\r\nbar");
        assert!(current_text(&emu).starts_with("foo\nbar"));
    }

    #[test]
    fn test_carriage_return_overwrites() {
        let (mut emu, _) = emulation();
        emu.receive_data(b"abc\rX");
        assert!(current_text(&emu).starts_with("Xbc"));
    }

    #[test]
    fn test_bell_raises_activity() {
        let (mut emu, listener) = emulation();
        emu.receive_data(b"\x07");
        assert_eq!(
            listener.count(|e| *e == Event::ActivityState(Activity::Bell)),
            1
        );
    }

    #[test]
    fn test_switch_preserves_contents() {
        let (mut emu, _) = emulation();
        emu.receive_data(b"primary text");
        let before = current_text(&emu);

        emu.set_screen(1);
        emu.receive_data(b"alternate text");
        assert!(current_text(&emu).starts_with("alternate text"));

        emu.set_screen(0);
        assert_eq!(current_text(&emu), before);
    }

    #[test]
    fn test_windows_rebind_on_switch() {
        let (mut emu, _) = emulation();
        let id = emu.create_window();
        assert_eq!(emu.window(id).unwrap().screen(), 0);
        emu.set_screen(1);
        assert_eq!(emu.window(id).unwrap().screen(), 1);
        // Re-selecting the active buffer is not a switch.
        emu.set_screen(1);
        assert_eq!(emu.window(id).unwrap().screen(), 1);
    }

    #[test]
    fn test_zmodem_once_per_ingest() {
        let (mut emu, listener) = emulation();
        emu.receive_data(b"ls\x18B00junk\x18B00more");
        assert_eq!(listener.count(|e| *e == Event::ZmodemDetected), 1);

        // A later chunk with a marker reports again.
        emu.receive_data(b"\x18B00");
        assert_eq!(listener.count(|e| *e == Event::ZmodemDetected), 2);
    }

    #[test]
    fn test_incomplete_zmodem_marker_ignored() {
        let (mut emu, listener) = emulation();
        emu.receive_data(b"\x18B0");
        emu.receive_data(b"\x18Bxx");
        assert_eq!(listener.count(|e| *e == Event::ZmodemDetected), 0);
    }

    #[test]
    fn test_resize_rejects_bad_geometry() {
        let (mut emu, listener) = emulation();
        let before = emu.image_size();
        emu.set_image_size(0, 80);
        emu.set_image_size(24, -1);
        assert_eq!(emu.image_size(), before);
        assert_eq!(
            listener.count(|e| matches!(e, Event::ImageSizeChanged { .. })),
            0
        );
    }

    #[test]
    fn test_resize_same_size_is_noop() {
        let (mut emu, listener) = emulation();
        let (lines, columns) = emu.image_size();
        emu.set_image_size(lines as i32, columns as i32);
        assert_eq!(
            listener.count(|e| matches!(e, Event::ImageSizeChanged { .. })),
            0
        );
    }

    #[test]
    fn test_resize_applies_to_both_screens() {
        let (mut emu, listener) = emulation();
        emu.set_image_size(24, 132);
        assert_eq!(emu.screen(0).lines(), 24);
        assert_eq!(emu.screen(1).columns(), 132);
        assert_eq!(
            listener.events(),
            vec![Event::ImageSizeChanged {
                lines: 24,
                columns: 132
            }]
        );
        assert!(emu.update_pending());
    }

    #[test]
    fn test_coalesced_flush_marks_windows() {
        let (mut emu, listener) = emulation();
        let id = emu.create_window();

        emu.receive_data(b"a");
        emu.receive_data(b"b");
        emu.receive_data(b"c");

        // Nothing flushed yet.
        assert_eq!(listener.count(|e| *e == Event::OutputChanged), 0);

        let flushed = emu.maintain_at(Instant::now() + Duration::from_millis(50));
        assert!(flushed);
        assert_eq!(listener.count(|e| *e == Event::OutputChanged), 1);
        assert!(emu.window_mut(id).unwrap().take_output_pending());
        assert!(!emu.window_mut(id).unwrap().take_output_pending());
        assert!(!emu.update_pending());
    }

    #[test]
    fn test_flush_resets_scroll_counters() {
        let (mut emu, _) = emulation();
        emu.set_image_size(2, 10);
        emu.show_bulk();
        emu.receive_data(b"a\nb\nc\n");
        assert!(emu.current_screen().scrolled_lines() > 0);
        emu.show_bulk();
        assert_eq!(emu.current_screen().scrolled_lines(), 0);
        assert_eq!(emu.current_screen().dropped_lines(), 0);
    }

    #[test]
    fn test_selection_change_schedules_update() {
        let (mut emu, _) = emulation();
        let id = emu.create_window();
        emu.set_window_selection(
            id,
            Some(crate::core::window::Selection {
                start_column: 0,
                start_line: 0,
                end_column: 3,
                end_line: 0,
            }),
        );
        assert!(emu.update_pending());
        assert!(emu.window(id).unwrap().selection().is_some());
    }

    #[test]
    fn test_legacy_encoding() {
        let (mut emu, _) = emulation();
        emu.set_encoding(Encoding::Legacy);
        emu.receive_data(&[0xE9]);
        assert!(current_text(&emu).starts_with("é"));
    }

    #[test]
    fn test_split_utf8_across_chunks() {
        let (mut emu, _) = emulation();
        let bytes = "é".as_bytes();
        emu.receive_data(&bytes[..1]);
        emu.receive_data(&bytes[1..]);
        assert!(current_text(&emu).starts_with("é"));
    }

    #[test]
    fn test_key_bindings_fallback() {
        let (mut emu, _) = emulation();
        let registry = KeyBindingRegistry::new();
        emu.set_key_bindings("does-not-exist", &registry);
        assert_eq!(emu.key_bindings(), crate::keybindings::DEFAULT_PROFILE);
    }

    #[test]
    fn test_mouse_and_paste_flags_republished() {
        let (mut emu, listener) = emulation();
        emu.set_program_uses_mouse(true);
        emu.set_bracketed_paste_mode(true);
        assert!(emu.program_uses_mouse());
        assert!(emu.program_bracketed_paste_mode());
        assert_eq!(
            listener.count(|e| *e == Event::MouseInterestChanged(true)),
            1
        );
        assert_eq!(listener.count(|e| *e == Event::PasteModeChanged(true)), 1);
    }

    #[test]
    fn test_cursor_report_mirrors_title_channel() {
        let (mut emu, listener) = emulation();
        emu.report_cursor_change(CursorShape::Underline, true);
        assert!(listener.events().contains(&Event::TitleChanged {
            kind: 50,
            text: "CursorShape=1;BlinkingCursorEnabled=true".to_string()
        }));
    }

    #[test]
    fn test_set_history_flushes() {
        let (mut emu, listener) = emulation();
        emu.set_history(HistoryLimit::Bounded(100));
        assert_eq!(emu.history(), HistoryLimit::Bounded(100));
        assert_eq!(listener.count(|e| *e == Event::OutputChanged), 1);
    }

    #[test]
    fn test_clear_history_flushes() {
        let (mut emu, listener) = emulation();
        emu.set_image_size(2, 10);
        emu.receive_data(b"a\r\nb\r\nc");
        assert_eq!(emu.line_count(), 3);

        emu.clear_history();
        assert_eq!(emu.line_count(), 2);
        assert_eq!(listener.count(|e| *e == Event::OutputChanged), 1);
        assert!(!emu.update_pending());
    }
}
