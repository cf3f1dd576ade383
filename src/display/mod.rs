//! Connection to the display server
//!
//! [`DisplayServer`] lists the requests the engine issues. The production
//! implementation is [`x11::X11Display`]; the trait exists so the engine,
//! overlays and probes can be driven by a scripted server in tests. It is
//! not meant to abstract over other windowing systems.

pub mod x11;

use crate::error::{Result, ServerError};
use crate::geometry::Region;

pub use x11rb::protocol::xproto::{Cursor, EventMask, Window};

/// Events the engine folds into its state; everything else is `Other`
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Pointer moved, root coordinates
    Motion { x: i32, y: i32 },
    ButtonPress(u8),
    ButtonRelease(u8),
    KeyPress(u8),
    KeyRelease(u8),
    /// A window we selected `StructureNotify` on is gone
    DestroyNotify(Window),
    /// Asynchronous error for an earlier unchecked request
    Error(ServerError),
    Other,
}

/// Result of a pointer query against the root window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerQuery {
    pub x: i32,
    pub y: i32,
    /// Top-level window under the pointer, `None` over the bare root
    pub child: Option<Window>,
}

/// Geometry of a window relative to its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawGeometry {
    pub root: Window,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub border_width: u32,
}

/// Server answer to a grab request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrabReply {
    Granted,
    /// Refused, with the server's status name
    Refused(String),
}

/// How a rectangle combines with a window's bounding shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeOp {
    /// Replace the shape with the rectangle
    Set,
    /// Cut the rectangle out of the shape
    Subtract,
}

/// Move or resize request for an existing window; `None` fields stay as they are
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowChange {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl WindowChange {
    pub fn position(x: i32, y: i32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }
}

/// Requests the selection engine needs from one display connection
///
/// All requests are issued from a single thread; implementations may buffer
/// them until [`DisplayServer::flush`] or the next round trip.
pub trait DisplayServer {
    /// Open a connection; `None` uses `$DISPLAY`
    fn open(display_name: Option<&str>) -> Result<Self>
    where
        Self: Sized;

    fn root(&self) -> Window;

    fn flush(&mut self) -> Result<()>;

    /// Next queued event without blocking
    fn poll_event(&mut self) -> Result<Option<ServerEvent>>;

    /// Next event, blocking until one arrives
    fn wait_event(&mut self) -> Result<ServerEvent>;

    fn query_pointer(&mut self) -> Result<PointerQuery>;

    /// One bit per keycode, set while the key is held
    fn query_keymap(&mut self) -> Result<[u8; 32]>;

    fn grab_keyboard(&mut self) -> Result<GrabReply>;

    fn ungrab_keyboard(&mut self) -> Result<()>;

    fn grab_pointer(&mut self, events: EventMask, cursor: Cursor) -> Result<GrabReply>;

    fn ungrab_pointer(&mut self) -> Result<()>;

    fn change_active_pointer_grab(&mut self, events: EventMask, cursor: Cursor) -> Result<()>;

    /// Create a cursor from the standard `cursor` font
    fn create_font_cursor(&mut self, glyph: u16) -> Result<Cursor>;

    fn free_cursor(&mut self, cursor: Cursor) -> Result<()>;

    /// Allocate a read-only colour in the default colormap, returning its pixel
    fn alloc_color(&mut self, red: u16, green: u16, blue: u16) -> Result<u32>;

    /// Create an unmapped override-redirect frame window on the root window
    fn create_overlay_window(&mut self, frame: Region, background_pixel: u32) -> Result<Window>;

    /// Set `WM_CLASS` (instance and class both `class`)
    fn set_class(&mut self, window: Window, class: &str) -> Result<()>;

    fn shape_rectangle(&mut self, window: Window, op: ShapeOp, rect: Region) -> Result<()>;

    fn map_window(&mut self, window: Window) -> Result<()>;

    fn configure_window(&mut self, window: Window, change: WindowChange) -> Result<()>;

    fn destroy_window(&mut self, window: Window) -> Result<()>;

    fn get_geometry(&mut self, window: Window) -> Result<RawGeometry>;

    fn query_children(&mut self, window: Window) -> Result<Vec<Window>>;

    /// Translate `(x, y)` from `src` coordinates into `dst` coordinates
    fn translate_coordinates(
        &mut self,
        src: Window,
        dst: Window,
        x: i32,
        y: i32,
    ) -> Result<(i32, i32)>;
}
