//! In-memory X server for integration tests
//!
//! `FakeDisplay` records every request and replays a script of frames. A
//! frame is what the server delivers before one engine tick: queued events
//! plus the pointer and keyboard state the next queries report. The next
//! frame is loaded each time the pointer is queried, which the engine does
//! once at the end of every tick and once when grabbing the pointer.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use slop::display::{
    Cursor, DisplayServer, EventMask, GrabReply, PointerQuery, RawGeometry, ServerEvent, ShapeOp,
    Window, WindowChange,
};
use slop::error::{Result, ServerError, SlopError};
use slop::Region;
use x11rb::protocol::xproto::{GET_GEOMETRY_REQUEST, QUERY_TREE_REQUEST};
use x11rb::protocol::ErrorKind;

pub const ROOT: Window = 0x100;
const FIRST_ID: u32 = 0x40_0000;
/// Pointer queries allowed after the script ran out
const IDLE_LIMIT: usize = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Flush,
    QueryPointer,
    QueryKeymap,
    GrabKeyboard,
    UngrabKeyboard,
    GrabPointer(Cursor),
    UngrabPointer,
    ChangeActivePointerGrab(Cursor),
    CreateFontCursor(u16),
    FreeCursor(Cursor),
    AllocColor(u16, u16, u16),
    CreateOverlayWindow(Region, u32),
    SetClass(Window, String),
    Shape(Window, ShapeOp, Region),
    MapWindow(Window),
    ConfigureWindow(Window, WindowChange),
    DestroyWindow(Window),
    GetGeometry(Window),
    QueryChildren(Window),
    TranslateCoordinates(Window, Window, i32, i32),
}

impl Request {
    /// Requests that change what is on screen
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Request::CreateOverlayWindow(..)
                | Request::SetClass(..)
                | Request::Shape(..)
                | Request::MapWindow(_)
                | Request::ConfigureWindow(..)
                | Request::DestroyWindow(_)
        )
    }
}

/// Server-side state delivered before one tick
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub events: Vec<ServerEvent>,
    pub pointer: Option<(i32, i32)>,
    pub hover: Option<Option<Window>>,
    pub key_down: Option<bool>,
}

impl Frame {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn motion(x: i32, y: i32) -> Self {
        Self {
            events: vec![ServerEvent::Motion { x, y }],
            pointer: Some((x, y)),
            ..Self::default()
        }
    }

    pub fn press(button: u8) -> Self {
        Self {
            events: vec![ServerEvent::ButtonPress(button)],
            ..Self::default()
        }
    }

    pub fn release(button: u8) -> Self {
        Self {
            events: vec![ServerEvent::ButtonRelease(button)],
            ..Self::default()
        }
    }

    pub fn key() -> Self {
        Self {
            key_down: Some(true),
            ..Self::default()
        }
    }

    pub fn hover(window: Option<Window>) -> Self {
        Self {
            hover: Some(window),
            ..Self::default()
        }
    }

    /// Same frame with the pointer over `window`
    pub fn over(mut self, window: Option<Window>) -> Self {
        self.hover = Some(window);
        self
    }

    pub fn with_event(mut self, event: ServerEvent) -> Self {
        self.events.push(event);
        self
    }
}

#[derive(Debug)]
pub struct FakeState {
    pub requests: Vec<Request>,
    pub events: VecDeque<ServerEvent>,
    pub frames: VecDeque<Frame>,
    pub pointer: (i32, i32),
    pub hover: Option<Window>,
    pub key_down: bool,
    pub keyboard_grab: GrabReply,
    pub keyboard_grab_error: Option<ServerError>,
    pub pointer_grab: GrabReply,
    pub ungrab_pointer_error: Option<ServerError>,
    pub alloc_color_error: Option<ServerError>,
    /// Geometry relative to the parent, as GetGeometry reports it
    pub geometries: HashMap<Window, RawGeometry>,
    /// Absolute origin of each window's inside (border excluded)
    pub origins: HashMap<Window, (i32, i32)>,
    pub children: HashMap<Window, Vec<Window>>,
    pub next_id: u32,
    idle_queries: usize,
}

impl Default for FakeState {
    fn default() -> Self {
        let mut geometries = HashMap::new();
        geometries.insert(
            ROOT,
            RawGeometry {
                root: ROOT,
                x: 0,
                y: 0,
                width: 1920,
                height: 1080,
                border_width: 0,
            },
        );
        let mut origins = HashMap::new();
        origins.insert(ROOT, (0, 0));

        Self {
            requests: Vec::new(),
            events: VecDeque::new(),
            frames: VecDeque::new(),
            pointer: (0, 0),
            hover: None,
            key_down: false,
            keyboard_grab: GrabReply::Granted,
            keyboard_grab_error: None,
            pointer_grab: GrabReply::Granted,
            ungrab_pointer_error: None,
            alloc_color_error: None,
            geometries,
            origins,
            children: HashMap::new(),
            next_id: FIRST_ID,
            idle_queries: 0,
        }
    }
}

impl FakeState {
    fn load_next_frame(&mut self) {
        let Some(frame) = self.frames.pop_front() else {
            self.idle_queries += 1;
            assert!(
                self.idle_queries < IDLE_LIMIT,
                "script exhausted, the selection never finished"
            );
            return;
        };
        self.events.extend(frame.events);
        if let Some(pointer) = frame.pointer {
            self.pointer = pointer;
        }
        if let Some(hover) = frame.hover {
            self.hover = hover;
        }
        if let Some(key_down) = frame.key_down {
            self.key_down = key_down;
        }
    }

    fn bad(kind: ErrorKind, opcode: u8) -> SlopError {
        SlopError::Server(ServerError::new(kind, opcode))
    }

    /// Add a top-level window at an absolute position
    pub fn add_window(&mut self, window: Window, x: i32, y: i32, width: u32, height: u32, border: u32) {
        self.geometries.insert(
            window,
            RawGeometry {
                root: ROOT,
                x,
                y,
                width,
                height,
                border_width: border,
            },
        );
        self.origins
            .insert(window, (x + border as i32, y + border as i32));
        self.children.entry(ROOT).or_default().push(window);
    }

    /// Add a child at `(x, y)` inside `parent`
    pub fn add_child(
        &mut self,
        parent: Window,
        child: Window,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        border: u32,
    ) {
        let (px, py) = self.origins[&parent];
        self.geometries.insert(
            child,
            RawGeometry {
                root: ROOT,
                x,
                y,
                width,
                height,
                border_width: border,
            },
        );
        self.origins
            .insert(child, (px + x + border as i32, py + y + border as i32));
        self.children.entry(parent).or_default().push(child);
    }

    /// Requests recorded since the last call
    pub fn take_requests(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.requests)
    }

    pub fn is_live(&self, window: Window) -> bool {
        self.geometries.contains_key(&window)
    }
}

/// Handle shared between the display and the test
pub type Shared = Rc<RefCell<FakeState>>;

pub struct FakeDisplay {
    state: Shared,
}

impl FakeDisplay {
    pub fn new() -> (Self, Shared) {
        let state = Rc::new(RefCell::new(FakeState::default()));
        (
            Self {
                state: Rc::clone(&state),
            },
            state,
        )
    }

    fn record(&self, request: Request) {
        self.state.borrow_mut().requests.push(request);
    }
}

impl DisplayServer for FakeDisplay {
    fn open(display_name: Option<&str>) -> Result<Self> {
        match display_name {
            Some(name) if name.starts_with("bad") => Err(SlopError::DisplayOpen {
                display: name.to_string(),
                reason: "connection refused".to_string(),
            }),
            _ => Ok(Self::new().0),
        }
    }

    fn root(&self) -> Window {
        ROOT
    }

    fn flush(&mut self) -> Result<()> {
        self.record(Request::Flush);
        Ok(())
    }

    fn poll_event(&mut self) -> Result<Option<ServerEvent>> {
        Ok(self.state.borrow_mut().events.pop_front())
    }

    fn wait_event(&mut self) -> Result<ServerEvent> {
        let event = self.state.borrow_mut().events.pop_front();
        Ok(event.expect("wait_event would block forever"))
    }

    fn query_pointer(&mut self) -> Result<PointerQuery> {
        self.record(Request::QueryPointer);
        let mut state = self.state.borrow_mut();
        let query = PointerQuery {
            x: state.pointer.0,
            y: state.pointer.1,
            child: state.hover,
        };
        state.load_next_frame();
        Ok(query)
    }

    fn query_keymap(&mut self) -> Result<[u8; 32]> {
        self.record(Request::QueryKeymap);
        let mut keys = [0u8; 32];
        if self.state.borrow().key_down {
            // keycode 9, Escape on most layouts
            keys[1] = 0b10;
        }
        Ok(keys)
    }

    fn grab_keyboard(&mut self) -> Result<GrabReply> {
        self.record(Request::GrabKeyboard);
        let state = self.state.borrow();
        match &state.keyboard_grab_error {
            Some(err) => Err(SlopError::Server(err.clone())),
            None => Ok(state.keyboard_grab.clone()),
        }
    }

    fn ungrab_keyboard(&mut self) -> Result<()> {
        self.record(Request::UngrabKeyboard);
        Ok(())
    }

    fn grab_pointer(&mut self, _events: EventMask, cursor: Cursor) -> Result<GrabReply> {
        self.record(Request::GrabPointer(cursor));
        Ok(self.state.borrow().pointer_grab.clone())
    }

    fn ungrab_pointer(&mut self) -> Result<()> {
        self.record(Request::UngrabPointer);
        match &self.state.borrow().ungrab_pointer_error {
            Some(err) => Err(SlopError::Server(err.clone())),
            None => Ok(()),
        }
    }

    fn change_active_pointer_grab(&mut self, _events: EventMask, cursor: Cursor) -> Result<()> {
        self.record(Request::ChangeActivePointerGrab(cursor));
        Ok(())
    }

    fn create_font_cursor(&mut self, glyph: u16) -> Result<Cursor> {
        self.record(Request::CreateFontCursor(glyph));
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        Ok(state.next_id)
    }

    fn free_cursor(&mut self, cursor: Cursor) -> Result<()> {
        self.record(Request::FreeCursor(cursor));
        Ok(())
    }

    fn alloc_color(&mut self, red: u16, green: u16, blue: u16) -> Result<u32> {
        self.record(Request::AllocColor(red, green, blue));
        match &self.state.borrow().alloc_color_error {
            Some(err) => Err(SlopError::Server(err.clone())),
            None => Ok(u32::from(red >> 8) << 16 | u32::from(green >> 8) << 8 | u32::from(blue >> 8)),
        }
    }

    fn create_overlay_window(&mut self, frame: Region, background_pixel: u32) -> Result<Window> {
        self.record(Request::CreateOverlayWindow(frame, background_pixel));
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let window = state.next_id;
        state.geometries.insert(
            window,
            RawGeometry {
                root: ROOT,
                x: frame.x,
                y: frame.y,
                width: frame.width,
                height: frame.height,
                border_width: 0,
            },
        );
        state.origins.insert(window, (frame.x, frame.y));
        Ok(window)
    }

    fn set_class(&mut self, window: Window, class: &str) -> Result<()> {
        self.record(Request::SetClass(window, class.to_string()));
        Ok(())
    }

    fn shape_rectangle(&mut self, window: Window, op: ShapeOp, rect: Region) -> Result<()> {
        self.record(Request::Shape(window, op, rect));
        Ok(())
    }

    fn map_window(&mut self, window: Window) -> Result<()> {
        self.record(Request::MapWindow(window));
        Ok(())
    }

    fn configure_window(&mut self, window: Window, change: WindowChange) -> Result<()> {
        self.record(Request::ConfigureWindow(window, change));
        let mut state = self.state.borrow_mut();
        if let Some(geom) = state.geometries.get_mut(&window) {
            geom.x = change.x.unwrap_or(geom.x);
            geom.y = change.y.unwrap_or(geom.y);
            geom.width = change.width.unwrap_or(geom.width);
            geom.height = change.height.unwrap_or(geom.height);
        }
        Ok(())
    }

    fn destroy_window(&mut self, window: Window) -> Result<()> {
        self.record(Request::DestroyWindow(window));
        let mut state = self.state.borrow_mut();
        state.geometries.remove(&window);
        state.origins.remove(&window);
        // Confirmation arrives behind whatever is already queued
        state.events.push_back(ServerEvent::DestroyNotify(window));
        Ok(())
    }

    fn get_geometry(&mut self, window: Window) -> Result<RawGeometry> {
        self.record(Request::GetGeometry(window));
        self.state
            .borrow()
            .geometries
            .get(&window)
            .copied()
            .ok_or_else(|| FakeState::bad(ErrorKind::Drawable, GET_GEOMETRY_REQUEST))
    }

    fn query_children(&mut self, window: Window) -> Result<Vec<Window>> {
        self.record(Request::QueryChildren(window));
        let state = self.state.borrow();
        if !state.is_live(window) {
            return Err(FakeState::bad(ErrorKind::Window, QUERY_TREE_REQUEST));
        }
        Ok(state.children.get(&window).cloned().unwrap_or_default())
    }

    fn translate_coordinates(
        &mut self,
        src: Window,
        dst: Window,
        x: i32,
        y: i32,
    ) -> Result<(i32, i32)> {
        self.record(Request::TranslateCoordinates(src, dst, x, y));
        let state = self.state.borrow();
        let (sx, sy) = state.origins[&src];
        let (dx, dy) = state.origins[&dst];
        Ok((sx + x - dx, sy + y - dy))
    }
}

/// An initialized engine over a fresh fake server
pub fn engine() -> (slop::XEngine<FakeDisplay>, Shared) {
    let (display, state) = FakeDisplay::new();
    (slop::XEngine::attach(display), state)
}
