//! # slop
//!
//! Interactive region selection for X11. The user drags a rectangle on
//! screen (or clicks a window) and the resulting geometry is reported.
//!
//! ## Architecture
//!
//! - `geometry`: normalizing signed drag extents into positive rectangles
//! - `display`: the requests the engine issues, and their x11rb implementation
//! - `engine`: grabs, cursors, per-tick input state and hover tracking
//! - `rectangle`: SHAPE-cut overlay frames that show the selection
//! - `probe`: on-screen geometry of existing windows
//! - `selection`: the interactive loop and output formatting
//! - `config` / `logging`: TOML settings and `env_logger` setup
//!
//! ## Usage
//!
//! ```rust,no_run
//! use slop::{select, SelectOptions, X11Display, XEngine};
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut engine: XEngine<X11Display> = XEngine::new();
//!     engine.init(None)?;
//!     let selection = select(&mut engine, &SelectOptions::default())?;
//!     println!("{:?}", selection.region());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod cursor;
pub mod display;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod probe;
pub mod rectangle;
pub mod selection;

pub use config::SlopConfig;
pub use cursor::CursorKind;
pub use display::x11::X11Display;
pub use display::{DisplayServer, ServerEvent};
pub use engine::{ButtonState, InputSnapshot, XEngine};
pub use error::{ErrorClass, Result, SlopError};
pub use geometry::{normalize, normalize_rect, Normalized, Region};
pub use probe::WindowGeometry;
pub use rectangle::{Color, Rectangle};
pub use selection::{format_selection, select, SelectOptions, Selection};
