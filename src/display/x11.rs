//! x11rb implementation of [`DisplayServer`]

use log::{debug, info};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::shape::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{
    self, AtomEnum, ClipOrdering, Colormap, ConfigureWindowAux, ConnectionExt as _,
    CreateWindowAux, GrabMode, GrabStatus, PropMode, WindowClass,
};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;
use x11rb::{COPY_DEPTH_FROM_PARENT, COPY_FROM_PARENT, CURRENT_TIME, NONE};

use super::{
    Cursor, DisplayServer, EventMask, GrabReply, PointerQuery, RawGeometry, ServerEvent, ShapeOp,
    Window, WindowChange,
};
use crate::error::{Result, SlopError};
use crate::geometry::Region;

/// A live connection to an X server plus the default screen's resources
pub struct X11Display {
    conn: RustConnection,
    root: Window,
    colormap: Colormap,
}

impl DisplayServer for X11Display {
    fn open(display_name: Option<&str>) -> Result<Self> {
        let (conn, screen_num) =
            x11rb::connect(display_name).map_err(|e| SlopError::display_open(display_name, e))?;

        // The overlay is a frame cut out with SHAPE; without it there is nothing to draw.
        if conn.extension_information(shape::X11_EXTENSION_NAME)?.is_none() {
            return Err(SlopError::DisplayOpen {
                display: display_name.unwrap_or("").to_string(),
                reason: "the SHAPE extension is not available".to_string(),
            });
        }

        let screen = &conn.setup().roots[screen_num];
        let (root, colormap) = (screen.root, screen.default_colormap);
        info!(
            "Connected to X server, screen {}, root window {} ({}x{})",
            screen_num, root, screen.width_in_pixels, screen.height_in_pixels
        );

        Ok(Self {
            conn,
            root,
            colormap,
        })
    }

    fn root(&self) -> Window {
        self.root
    }

    fn flush(&mut self) -> Result<()> {
        self.conn.flush()?;
        Ok(())
    }

    fn poll_event(&mut self) -> Result<Option<ServerEvent>> {
        Ok(self.conn.poll_for_event()?.map(convert_event))
    }

    fn wait_event(&mut self) -> Result<ServerEvent> {
        Ok(convert_event(self.conn.wait_for_event()?))
    }

    fn query_pointer(&mut self) -> Result<PointerQuery> {
        let reply = self.conn.query_pointer(self.root)?.reply()?;
        Ok(PointerQuery {
            x: reply.root_x.into(),
            y: reply.root_y.into(),
            child: (reply.child != NONE).then_some(reply.child),
        })
    }

    fn query_keymap(&mut self) -> Result<[u8; 32]> {
        Ok(self.conn.query_keymap()?.reply()?.keys)
    }

    fn grab_keyboard(&mut self) -> Result<GrabReply> {
        let reply = self
            .conn
            .grab_keyboard(false, self.root, CURRENT_TIME, GrabMode::ASYNC, GrabMode::ASYNC)?
            .reply()?;
        Ok(grab_reply(reply.status))
    }

    fn ungrab_keyboard(&mut self) -> Result<()> {
        self.conn.ungrab_keyboard(CURRENT_TIME)?;
        Ok(())
    }

    fn grab_pointer(&mut self, events: EventMask, cursor: Cursor) -> Result<GrabReply> {
        let reply = self
            .conn
            .grab_pointer(
                false,
                self.root,
                events,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                self.root,
                cursor,
                CURRENT_TIME,
            )?
            .reply()?;
        Ok(grab_reply(reply.status))
    }

    fn ungrab_pointer(&mut self) -> Result<()> {
        self.conn.ungrab_pointer(CURRENT_TIME)?;
        Ok(())
    }

    fn change_active_pointer_grab(&mut self, events: EventMask, cursor: Cursor) -> Result<()> {
        self.conn
            .change_active_pointer_grab(cursor, CURRENT_TIME, events)?;
        Ok(())
    }

    fn create_font_cursor(&mut self, glyph: u16) -> Result<Cursor> {
        let font = self.conn.generate_id()?;
        self.conn.open_font(font, b"cursor")?;
        let cursor = self.conn.generate_id()?;
        // Black glyph on a white mask, the next glyph in the font is the mask.
        self.conn.create_glyph_cursor(
            cursor,
            font,
            font,
            glyph,
            glyph + 1,
            0,
            0,
            0,
            0xffff,
            0xffff,
            0xffff,
        )?;
        self.conn.close_font(font)?;
        debug!("Created font cursor {} for glyph {}", cursor, glyph);
        Ok(cursor)
    }

    fn free_cursor(&mut self, cursor: Cursor) -> Result<()> {
        self.conn.free_cursor(cursor)?;
        Ok(())
    }

    fn alloc_color(&mut self, red: u16, green: u16, blue: u16) -> Result<u32> {
        Ok(self
            .conn
            .alloc_color(self.colormap, red, green, blue)?
            .reply()?
            .pixel)
    }

    fn create_overlay_window(&mut self, frame: Region, background_pixel: u32) -> Result<Window> {
        let window = self.conn.generate_id()?;
        let values = CreateWindowAux::new()
            .background_pixmap(NONE)
            .background_pixel(background_pixel)
            .override_redirect(1)
            .colormap(self.colormap)
            // DestroyNotify confirms teardown
            .event_mask(EventMask::STRUCTURE_NOTIFY);

        self.conn.create_window(
            COPY_DEPTH_FROM_PARENT,
            window,
            self.root,
            clamp_i16(frame.x),
            clamp_i16(frame.y),
            clamp_u16(frame.width).max(1),
            clamp_u16(frame.height).max(1),
            0,
            WindowClass::INPUT_OUTPUT,
            COPY_FROM_PARENT,
            &values,
        )?;
        Ok(window)
    }

    fn set_class(&mut self, window: Window, class: &str) -> Result<()> {
        let value = format!("{0}\0{0}\0", class);
        self.conn.change_property8(
            PropMode::REPLACE,
            window,
            AtomEnum::WM_CLASS,
            AtomEnum::STRING,
            value.as_bytes(),
        )?;
        Ok(())
    }

    fn shape_rectangle(&mut self, window: Window, op: ShapeOp, rect: Region) -> Result<()> {
        let operation = match op {
            ShapeOp::Set => shape::SO::SET,
            ShapeOp::Subtract => shape::SO::SUBTRACT,
        };
        self.conn.shape_rectangles(
            operation,
            shape::SK::BOUNDING,
            ClipOrdering::UNSORTED,
            window,
            0,
            0,
            &[to_rectangle(rect)],
        )?;
        Ok(())
    }

    fn map_window(&mut self, window: Window) -> Result<()> {
        self.conn.map_window(window)?;
        Ok(())
    }

    fn configure_window(&mut self, window: Window, change: WindowChange) -> Result<()> {
        let values = ConfigureWindowAux::new()
            .x(change.x)
            .y(change.y)
            .width(change.width.map(|w| w.max(1)))
            .height(change.height.map(|h| h.max(1)));
        self.conn.configure_window(window, &values)?;
        Ok(())
    }

    fn destroy_window(&mut self, window: Window) -> Result<()> {
        self.conn.destroy_window(window)?;
        Ok(())
    }

    fn get_geometry(&mut self, window: Window) -> Result<RawGeometry> {
        let reply = self.conn.get_geometry(window)?.reply()?;
        Ok(RawGeometry {
            root: reply.root,
            x: reply.x.into(),
            y: reply.y.into(),
            width: reply.width.into(),
            height: reply.height.into(),
            border_width: reply.border_width.into(),
        })
    }

    fn query_children(&mut self, window: Window) -> Result<Vec<Window>> {
        Ok(self.conn.query_tree(window)?.reply()?.children)
    }

    fn translate_coordinates(
        &mut self,
        src: Window,
        dst: Window,
        x: i32,
        y: i32,
    ) -> Result<(i32, i32)> {
        let reply = self
            .conn
            .translate_coordinates(src, dst, clamp_i16(x), clamp_i16(y))?
            .reply()?;
        Ok((reply.dst_x.into(), reply.dst_y.into()))
    }
}

fn convert_event(event: Event) -> ServerEvent {
    match event {
        Event::MotionNotify(e) => ServerEvent::Motion {
            x: e.root_x.into(),
            y: e.root_y.into(),
        },
        Event::ButtonPress(e) => ServerEvent::ButtonPress(e.detail),
        Event::ButtonRelease(e) => ServerEvent::ButtonRelease(e.detail),
        Event::KeyPress(e) => ServerEvent::KeyPress(e.detail),
        Event::KeyRelease(e) => ServerEvent::KeyRelease(e.detail),
        Event::DestroyNotify(e) => ServerEvent::DestroyNotify(e.window),
        Event::Error(e) => ServerEvent::Error(e.into()),
        _ => ServerEvent::Other,
    }
}

fn grab_reply(status: GrabStatus) -> GrabReply {
    if status == GrabStatus::SUCCESS {
        GrabReply::Granted
    } else {
        GrabReply::Refused(format!("{:?}", status))
    }
}

fn to_rectangle(region: Region) -> xproto::Rectangle {
    xproto::Rectangle {
        x: clamp_i16(region.x),
        y: clamp_i16(region.y),
        width: clamp_u16(region.width),
        height: clamp_u16(region.height),
    }
}

fn clamp_i16(v: i32) -> i16 {
    v.clamp(i16::MIN.into(), i16::MAX.into()) as i16
}

fn clamp_u16(v: u32) -> u16 {
    v.min(u16::MAX.into()) as u16
}
