//! Display resource manager
//!
//! [`XEngine`] owns the display connection for the lifetime of a selection.
//! It holds the exclusive grabs, caches font cursors, folds the event queue
//! into a small input snapshot once per [`XEngine::tick`], and tracks which
//! window the pointer hovers while ignoring the engine's own overlays.
//!
//! The engine is an explicit context object: create it with
//! [`XEngine::new`] and [`XEngine::init`] (or [`XEngine::attach`] for an
//! already-open connection) and pass it to every overlay and probe call.
//! Dropping it destroys leftover overlays, releases grabs, frees cursors and
//! closes the connection.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use log::{debug, error, info, warn};

use crate::cursor::CursorKind;
use crate::display::{Cursor, DisplayServer, EventMask, GrabReply, ServerEvent, Window};
use crate::error::{classify, ErrorClass, Result, SlopError};

/// Events selected by the pointer grab
///
/// Changing the active grab's cursor resets the grab's event mask, so every
/// cursor change must pass this same mask.
pub fn pointer_events() -> EventMask {
    EventMask::POINTER_MOTION | EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE
}

/// Pressed/released state per pointer button index
///
/// Besides the current state it remembers which buttons went down or up
/// since the last [`ButtonState::clear_edges`], so a click whose press and
/// release arrive in the same tick is not lost.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ButtonState {
    buttons: BTreeMap<u8, bool>,
    pressed: BTreeSet<u8>,
    released: BTreeSet<u8>,
}

impl ButtonState {
    pub fn set(&mut self, button: u8, pressed: bool) {
        self.buttons.insert(button, pressed);
        if pressed {
            self.pressed.insert(button);
        } else {
            self.released.insert(button);
        }
    }

    /// Went down at least once since the edges were cleared
    pub fn was_pressed(&self, button: u8) -> bool {
        self.pressed.contains(&button)
    }

    /// Went up at least once since the edges were cleared
    pub fn was_released(&self, button: u8) -> bool {
        self.released.contains(&button)
    }

    pub fn clear_edges(&mut self) {
        self.pressed.clear();
        self.released.clear();
    }

    /// `false` for buttons never seen
    pub fn is_down(&self, button: u8) -> bool {
        self.buttons.get(&button).copied().unwrap_or(false)
    }

    /// Number of button indices seen so far
    pub fn tracked(&self) -> usize {
        self.buttons.len()
    }

    pub fn any_down(&self) -> bool {
        self.buttons.values().any(|&pressed| pressed)
    }
}

/// Copy of the engine's input state after a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSnapshot {
    pub pointer: (i32, i32),
    pub buttons: ButtonState,
    pub hover: Option<Window>,
    pub any_key: bool,
}

/// Display resource manager
pub struct XEngine<D: DisplayServer> {
    display: Option<D>,
    mouse: (i32, i32),
    buttons: ButtonState,
    hover: Option<Window>,
    /// Font glyph -> cursor, freed on drop
    cursors: HashMap<u16, Cursor>,
    /// Overlay windows; never reported as hover targets
    overlays: HashSet<Window>,
    /// DestroyNotify seen for overlays not yet reaped
    destroyed: HashSet<Window>,
    keyboard_grabbed: bool,
    pointer_grabbed: bool,
}

impl<D: DisplayServer> Default for XEngine<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: DisplayServer> XEngine<D> {
    /// An engine with no connection; everything but `init` is a no-op
    pub fn new() -> Self {
        Self {
            display: None,
            mouse: (-1, -1),
            buttons: ButtonState::default(),
            hover: None,
            cursors: HashMap::new(),
            overlays: HashSet::new(),
            destroyed: HashSet::new(),
            keyboard_grabbed: false,
            pointer_grabbed: false,
        }
    }

    /// Wrap an already-open connection
    pub fn attach(display: D) -> Self {
        let mut engine = Self::new();
        engine.display = Some(display);
        engine
    }

    /// Open the display; on failure the engine stays invalid
    pub fn init(&mut self, display_name: Option<&str>) -> Result<()> {
        if self.display.is_some() {
            warn!("X engine already initialized, keeping the existing connection");
            return Ok(());
        }
        let display = D::open(display_name).map_err(|e| {
            error!("Failed to open X display {}", display_name.unwrap_or(""));
            e
        })?;
        info!("X engine initialized (root window {})", display.root());
        self.display = Some(display);
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.display.is_some()
    }

    pub(crate) fn display(&mut self) -> Result<&mut D> {
        self.display.as_mut().ok_or(SlopError::NotInitialized)
    }

    pub fn root(&self) -> Result<Window> {
        self.display
            .as_ref()
            .map(|d| d.root())
            .ok_or(SlopError::NotInitialized)
    }

    pub fn grab_keyboard(&mut self) -> Result<()> {
        match self.display()?.grab_keyboard() {
            Ok(GrabReply::Granted) => {
                self.keyboard_grabbed = true;
                debug!("Keyboard grabbed");
            }
            Ok(GrabReply::Refused(status)) => {
                warn!(
                    "Keyboard grab refused ({}), continuing without exclusive keyboard input",
                    status
                );
            }
            Err(SlopError::Server(err)) if classify(&err) == ErrorClass::Benign => {
                warn!("Keyboard already grabbed elsewhere, continuing without it");
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    pub fn release_keyboard(&mut self) -> Result<()> {
        self.display()?.ungrab_keyboard()?;
        self.keyboard_grabbed = false;
        Ok(())
    }

    /// Grab the pointer with the cursor for `kind`
    ///
    /// On success the pointer position and hover window are refreshed right
    /// away instead of waiting for the first motion event.
    pub fn grab_pointer(&mut self, kind: CursorKind) -> Result<()> {
        let cursor = self.cursor(kind)?;
        if let GrabReply::Refused(status) = self.display()?.grab_pointer(pointer_events(), cursor)? {
            error!("Failed to grab X cursor ({}).", status);
            error!("This can be caused by launching slop incorrectly.");
            error!("gnome-session launches it fine from keyboard binds.");
            return Err(SlopError::GrabFailed { status });
        }
        self.pointer_grabbed = true;

        let pointer = self.display()?.query_pointer()?;
        self.mouse = (pointer.x, pointer.y);
        self.update_hover(pointer.child);
        debug!("Pointer grabbed at {:?}", self.mouse);
        Ok(())
    }

    pub fn release_pointer(&mut self) -> Result<()> {
        self.display()?.ungrab_pointer()?;
        self.pointer_grabbed = false;
        Ok(())
    }

    /// Swap the cursor of the active pointer grab
    pub fn set_cursor(&mut self, kind: CursorKind) -> Result<()> {
        if !self.is_valid() {
            return Ok(());
        }
        let cursor = self.cursor(kind)?;
        self.display()?
            .change_active_pointer_grab(pointer_events(), cursor)
    }

    /// Cursor for `kind`, created on first use
    pub fn cursor(&mut self, kind: CursorKind) -> Result<Cursor> {
        let glyph = kind.glyph();
        if let Some(&cursor) = self.cursors.get(&glyph) {
            return Ok(cursor);
        }
        let cursor = self.display()?.create_font_cursor(glyph)?;
        self.cursors.insert(glyph, cursor);
        Ok(cursor)
    }

    pub fn cached_cursor_count(&self) -> usize {
        self.cursors.len()
    }

    /// Flush, drain queued events and refresh the hover window
    ///
    /// Button edges from the previous tick are cleared first.
    pub fn tick(&mut self) -> Result<()> {
        if !self.is_valid() {
            return Ok(());
        }
        self.buttons.clear_edges();
        self.display()?.flush()?;
        while let Some(event) = self.display()?.poll_event()? {
            self.fold_event(event)?;
        }
        // Enter/Leave events are not delivered under the grab; ask the server.
        let pointer = self.display()?.query_pointer()?;
        self.update_hover(pointer.child);
        Ok(())
    }

    fn fold_event(&mut self, event: ServerEvent) -> Result<()> {
        match event {
            ServerEvent::Motion { x, y } => self.mouse = (x, y),
            ServerEvent::ButtonPress(button) => self.buttons.set(button, true),
            ServerEvent::ButtonRelease(button) => self.buttons.set(button, false),
            // A grabbed keyboard does not reliably report press/release;
            // callers poll any_key_pressed() instead.
            ServerEvent::KeyPress(_) | ServerEvent::KeyRelease(_) => {}
            ServerEvent::DestroyNotify(window) => {
                if self.overlays.contains(&window) {
                    self.destroyed.insert(window);
                }
            }
            ServerEvent::Error(err) => match classify(&err) {
                ErrorClass::Benign => debug!("Ignoring benign X error: {:?}", err.kind),
                _ => return Err(err.into()),
            },
            ServerEvent::Other => {}
        }
        Ok(())
    }

    fn update_hover(&mut self, child: Option<Window>) {
        if self.hover == child {
            return;
        }
        if child.is_some_and(|w| self.overlays.contains(&w)) {
            return;
        }
        debug!("Hover window {:?} -> {:?}", self.hover, child);
        self.hover = child;
    }

    /// Whether any key on the keyboard is held right now
    pub fn any_key_pressed(&mut self) -> Result<bool> {
        if !self.is_valid() {
            return Ok(false);
        }
        let keys = self.display()?.query_keymap()?;
        Ok(keys.iter().any(|&bits| bits != 0))
    }

    pub fn mouse_down(&self, button: u8) -> bool {
        self.buttons.is_down(button)
    }

    /// `button` went down during the last tick, even if it is up again
    pub fn mouse_pressed(&self, button: u8) -> bool {
        self.buttons.was_pressed(button)
    }

    /// `button` went up during the last tick
    pub fn mouse_released(&self, button: u8) -> bool {
        self.buttons.was_released(button)
    }

    pub fn mouse_position(&self) -> (i32, i32) {
        self.mouse
    }

    pub fn buttons(&self) -> &ButtonState {
        &self.buttons
    }

    pub fn hover_window(&self) -> Option<Window> {
        self.hover
    }

    pub fn snapshot(&mut self) -> Result<InputSnapshot> {
        let any_key = self.any_key_pressed()?;
        Ok(InputSnapshot {
            pointer: self.mouse,
            buttons: self.buttons.clone(),
            hover: self.hover,
            any_key,
        })
    }

    pub fn is_excluded(&self, window: Window) -> bool {
        self.overlays.contains(&window)
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    pub(crate) fn register_overlay(&mut self, window: Window) {
        self.overlays.insert(window);
    }

    /// Destroy an overlay window and block until the server confirms it
    ///
    /// Events that arrive in the meantime are folded like in `tick`.
    pub(crate) fn destroy_overlay(&mut self, window: Window) -> Result<()> {
        let display = self.display()?;
        display.destroy_window(window)?;
        display.flush()?;
        while !self.destroyed.remove(&window) {
            let event = self.display()?.wait_event()?;
            self.fold_event(event)?;
        }
        self.overlays.remove(&window);
        debug!("Overlay window {} destroyed", window);
        Ok(())
    }
}

impl<D: DisplayServer> Drop for XEngine<D> {
    fn drop(&mut self) {
        if !self.is_valid() {
            return;
        }

        let leftover: Vec<Window> = self.overlays.iter().copied().collect();
        for window in leftover {
            if let Err(e) = self.destroy_overlay(window) {
                warn!("Failed to destroy overlay window {}: {}", window, e);
                break;
            }
        }
        if self.pointer_grabbed {
            if let Err(e) = self.release_pointer() {
                warn!("Failed to release pointer: {}", e);
            }
        }
        if self.keyboard_grabbed {
            if let Err(e) = self.release_keyboard() {
                warn!("Failed to release keyboard: {}", e);
            }
        }

        let cursors: Vec<Cursor> = self.cursors.drain().map(|(_, c)| c).collect();
        if let Some(mut display) = self.display.take() {
            for cursor in cursors {
                if let Err(e) = display.free_cursor(cursor) {
                    warn!("Failed to free cursor {}: {}", cursor, e);
                }
            }
            if let Err(e) = display.flush() {
                warn!("Failed to flush X connection: {}", e);
            }
        }
        debug!("X engine closed");
    }
}
