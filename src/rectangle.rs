//! Selection overlay windows
//!
//! A [`Rectangle`] is a borderless override-redirect window painted in the
//! border colour, with its interior cut away through the SHAPE extension so
//! the screen behind stays visible. Only the frame is ever drawn by the
//! server; moving or resizing never requires a repaint.
//!
//! A rectangle with a zero border is inert: it keeps track of its geometry
//! but never touches the server.

use std::fmt;
use std::str::FromStr;

use log::{debug, error};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::display::{DisplayServer, ShapeOp, Window, WindowChange};
use crate::engine::XEngine;
use crate::error::{ErrorClass, Result, SlopError};
use crate::geometry::{normalize_rect, NormalizedRect, Region};

/// `WM_CLASS` of every overlay, so window managers and compositors can
/// filter them out
pub const OVERLAY_CLASS: &str = "slop";

/// RGB colour with channels in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Default for Color {
    fn default() -> Self {
        Self::new(0.5, 0.5, 0.5)
    }
}

impl Color {
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// 16-bit channels as the X colormap expects them
    pub fn to_rgb16(self) -> (u16, u16, u16) {
        let channel = |c: f32| (c.clamp(0.0, 1.0) * 65535.0).floor() as u16;
        (channel(self.r), channel(self.g), channel(self.b))
    }

    pub fn is_valid(&self) -> bool {
        [self.r, self.g, self.b]
            .iter()
            .all(|c| (0.0..=1.0).contains(c))
    }
}

impl From<[f32; 3]> for Color {
    fn from(c: [f32; 3]) -> Self {
        Self::new(c[0], c[1], c[2])
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.r, self.g, self.b)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseColorError {
    #[error("expected three comma-separated components, got {0}")]
    Components(usize),
    #[error("invalid color component {0:?}")]
    Component(String),
    #[error("color component {0} is outside 0.0..=1.0")]
    Range(String),
}

impl FromStr for Color {
    type Err = ParseColorError;

    /// Parses `r,g,b` with each channel a float in `0.0..=1.0`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(ParseColorError::Components(parts.len()));
        }
        let mut channels = [0f32; 3];
        for (slot, part) in channels.iter_mut().zip(&parts) {
            let value: f32 = part
                .parse()
                .map_err(|_| ParseColorError::Component(part.to_string()))?;
            if !(0.0..=1.0).contains(&value) {
                return Err(ParseColorError::Range(part.to_string()));
            }
            *slot = value;
        }
        Ok(channels.into())
    }
}

/// One selection overlay
///
/// A `Rectangle` is the only owner of its server window, so it cannot be
/// cloned:
///
/// ```compile_fail
/// fn owned_once<T: Clone>() {}
/// owned_once::<slop::Rectangle>();
/// ```
#[derive(Debug)]
pub struct Rectangle {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    normalized: NormalizedRect,
    border: u32,
    padding: i32,
    color: Color,
    pixel: u32,
    window: Option<Window>,
}

impl Rectangle {
    /// Create an overlay anchored at `(x, y)` spanning a signed `(width, height)`
    ///
    /// The window is registered with the engine so it never shows up as a
    /// hover target. Dropping a `Rectangle` without [`Rectangle::destroy`]
    /// leaves the window to the engine's own teardown.
    #[allow(clippy::too_many_arguments)]
    pub fn create<D: DisplayServer>(
        engine: &mut XEngine<D>,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        border: u32,
        padding: i32,
        color: Color,
    ) -> Result<Self> {
        let mut rect = Self {
            x,
            y,
            width,
            height,
            normalized: normalize_rect(width, height, padding),
            border,
            padding,
            color,
            pixel: 0,
            window: None,
        };
        if border == 0 {
            return Ok(rect);
        }

        let (red, green, blue) = color.to_rgb16();
        rect.pixel = match engine.display()?.alloc_color(red, green, blue) {
            Ok(pixel) => pixel,
            Err(e) if e.class() == ErrorClass::Recoverable => {
                let err = SlopError::ColorAllocation {
                    red: color.r,
                    green: color.g,
                    blue: color.b,
                };
                error!("{}!", err);
                0
            }
            Err(e) => return Err(e),
        };

        let frame = rect.frame();
        let window = engine.display()?.create_overlay_window(frame, rect.pixel)?;
        engine.register_overlay(window);
        rect.window = Some(window);

        let display = engine.display()?;
        display.set_class(window, OVERLAY_CLASS)?;
        display.shape_rectangle(window, ShapeOp::Subtract, rect.hole())?;
        display.map_window(window)?;
        debug!("Overlay window {} created at {:?}", window, frame);
        Ok(rect)
    }

    pub fn set_position<D: DisplayServer>(
        &mut self,
        engine: &mut XEngine<D>,
        x: i32,
        y: i32,
    ) -> Result<()> {
        if (self.x, self.y) == (x, y) {
            return Ok(());
        }
        self.x = x;
        self.y = y;
        if let Some(window) = self.window {
            let frame = self.frame();
            engine
                .display()?
                .configure_window(window, WindowChange::position(frame.x, frame.y))?;
        }
        Ok(())
    }

    /// Resize to a signed `(width, height)` from the current anchor
    ///
    /// The stencil is rebuilt from scratch: resizing alone would keep the
    /// old hole.
    pub fn set_dimensions<D: DisplayServer>(
        &mut self,
        engine: &mut XEngine<D>,
        width: i32,
        height: i32,
    ) -> Result<()> {
        if (self.width, self.height) == (width, height) {
            return Ok(());
        }
        self.width = width;
        self.height = height;
        self.normalized = normalize_rect(width, height, self.padding);

        let Some(window) = self.window else {
            return Ok(());
        };
        let frame = self.frame();
        let display = engine.display()?;
        display.configure_window(
            window,
            WindowChange {
                x: Some(frame.x),
                y: Some(frame.y),
                width: Some(frame.width),
                height: Some(frame.height),
            },
        )?;
        display.shape_rectangle(
            window,
            ShapeOp::Set,
            Region::new(0, 0, frame.width, frame.height),
        )?;
        display.shape_rectangle(window, ShapeOp::Subtract, self.hole())?;
        Ok(())
    }

    /// Destroy the overlay, returning once the server confirmed it
    pub fn destroy<D: DisplayServer>(self, engine: &mut XEngine<D>) -> Result<()> {
        match self.window {
            Some(window) => engine.destroy_overlay(window),
            None => Ok(()),
        }
    }

    fn border_i32(&self) -> i32 {
        i32::try_from(self.border).unwrap_or(i32::MAX)
    }

    /// Server-side window geometry: the selection plus the border on each side
    pub fn frame(&self) -> Region {
        let b = self.border_i32();
        let region = self.region();
        Region::new(
            region.x.saturating_sub(b),
            region.y.saturating_sub(b),
            region.width.saturating_add(self.border.saturating_mul(2)),
            region.height.saturating_add(self.border.saturating_mul(2)),
        )
    }

    /// The transparent interior, in window coordinates
    fn hole(&self) -> Region {
        let b = self.border_i32();
        Region::new(b, b, self.normalized_width(), self.normalized_height())
    }

    /// Selected area in root coordinates, padding applied
    pub fn region(&self) -> Region {
        Region::from_drag((self.x, self.y), (self.width, self.height), self.padding)
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    /// Signed width as last given
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Signed height as last given
    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn normalized_width(&self) -> u32 {
        self.normalized.x.extent.max(0) as u32
    }

    pub fn normalized_height(&self) -> u32 {
        self.normalized.y.extent.max(0) as u32
    }

    pub fn offset(&self) -> (i32, i32) {
        (self.normalized.x.offset, self.normalized.y.offset)
    }

    pub fn flipped_x(&self) -> bool {
        self.normalized.x.flipped
    }

    pub fn flipped_y(&self) -> bool {
        self.normalized.y.flipped
    }

    pub fn border(&self) -> u32 {
        self.border
    }

    pub fn padding(&self) -> i32 {
        self.padding
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn window(&self) -> Option<Window> {
        self.window
    }
}
