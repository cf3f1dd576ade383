//! On-screen geometry of existing windows
//!
//! Used when the user clicks instead of dragging: the hovered top-level
//! window becomes the selection, with or without the frame the window
//! manager drew around it.

use log::debug;

use crate::display::{DisplayServer, Window};
use crate::engine::XEngine;
use crate::error::Result;
use crate::geometry::Region;

/// Absolute geometry of a window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowGeometry {
    pub window: Window,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub border: u32,
    /// Whether the geometry includes window-manager decorations
    pub decorations: bool,
}

impl WindowGeometry {
    /// Measure `window`
    ///
    /// With `include_decorations` the window is measured as is, borders
    /// included. Otherwise a reparenting window manager is assumed: if the
    /// window has exactly one child, that child is the client and is measured
    /// instead. Anything else falls back to the window itself.
    pub fn probe<D: DisplayServer>(
        engine: &mut XEngine<D>,
        window: Window,
        include_decorations: bool,
    ) -> Result<Self> {
        let display = engine.display()?;

        if include_decorations {
            let geom = display.get_geometry(window)?;
            return Ok(Self {
                window,
                x: geom.x,
                y: geom.y,
                width: geom.width.saturating_add(geom.border_width.saturating_mul(2)),
                height: geom.height.saturating_add(geom.border_width.saturating_mul(2)),
                border: geom.border_width,
                decorations: true,
            });
        }

        let children = display.query_children(window)?;
        let (target, decorations) = match children.as_slice() {
            [client] => (*client, false),
            _ => {
                debug!(
                    "Window {} has {} children, keeping its decorations",
                    window,
                    children.len()
                );
                (window, true)
            }
        };

        let geom = display.get_geometry(target)?;
        let border = i32::try_from(geom.border_width).unwrap_or(i32::MAX);
        let (x, y) = display.translate_coordinates(target, geom.root, -border, -border)?;
        Ok(Self {
            window: target,
            x,
            y,
            width: geom.width,
            height: geom.height,
            border: geom.border_width,
            decorations,
        })
    }

    pub fn region(&self) -> Region {
        Region::new(self.x, self.y, self.width, self.height)
    }
}
