//! Interactive selection loop
//!
//! Drives the engine until the user has dragged out a region, clicked a
//! window, or pressed a key to cancel:
//!
//! ```text
//! Idle --press--> Pressed --moved past tolerance--> Dragging --release--> Region
//!   |                |
//!   |                +--release--> Window (hovered window, or the root)
//!   +--any key--> Cancelled
//! ```
//!
//! With `nodrag` the first click starts the drag and the second one ends it.

use std::thread;
use std::time::Duration;

use log::{debug, info};

use crate::config::SlopConfig;
use crate::cursor::CursorKind;
use crate::display::{DisplayServer, Window};
use crate::engine::XEngine;
use crate::error::Result;
use crate::geometry::Region;
use crate::probe::WindowGeometry;
use crate::rectangle::{Color, Rectangle};

/// Button that starts and ends a selection
pub const SELECT_BUTTON: u8 = 1;

/// Default output, one `KEY=value` per line
pub const DEFAULT_FORMAT: &str = "X=%x\\nY=%y\\nW=%w\\nH=%h\\nG=%g\\nID=%i\\n";

/// Knobs of one selection run
#[derive(Debug, Clone, PartialEq)]
pub struct SelectOptions {
    pub border: u32,
    pub padding: i32,
    /// Pixels the pointer may move after a press before it counts as a drag
    pub tolerance: u32,
    pub color: Color,
    /// Frame the hovered window before the press
    pub highlight: bool,
    /// Grab the keyboard and cancel on any key
    pub keyboard: bool,
    /// Keep window-manager decorations when a window is picked
    pub decorations: bool,
    pub nodrag: bool,
    pub poll_interval: Duration,
}

impl Default for SelectOptions {
    fn default() -> Self {
        Self {
            border: 1,
            padding: 0,
            tolerance: 2,
            color: Color::default(),
            highlight: false,
            keyboard: true,
            decorations: true,
            nodrag: false,
            poll_interval: Duration::from_millis(10),
        }
    }
}

impl From<&SlopConfig> for SelectOptions {
    fn from(config: &SlopConfig) -> Self {
        let s = &config.selection;
        Self {
            border: s.border_size,
            padding: s.padding,
            tolerance: s.tolerance,
            color: Color::from(s.color),
            highlight: s.highlight,
            keyboard: !s.no_keyboard,
            decorations: s.decorations,
            nodrag: s.nodrag,
            poll_interval: Duration::from_millis(config.general.poll_interval_ms),
        }
    }
}

/// Outcome of a selection run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// A dragged region, padding applied
    Region(Region),
    /// A window picked with a click
    Window(WindowGeometry),
    Cancelled,
}

impl Selection {
    pub fn region(&self) -> Option<Region> {
        match self {
            Selection::Region(region) => Some(*region),
            Selection::Window(geometry) => Some(geometry.region()),
            Selection::Cancelled => None,
        }
    }

    pub fn window(&self) -> Option<Window> {
        match self {
            Selection::Window(geometry) => Some(geometry.window),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Selection::Cancelled)
    }
}

enum DragState {
    Idle,
    Pressed { anchor: (i32, i32) },
    Dragging { anchor: (i32, i32), rect: Rectangle },
}

/// Frame drawn around the hovered window
struct Highlight {
    target: Window,
    rect: Rectangle,
}

/// State carried between ticks
struct Session {
    options: SelectOptions,
    state: DragState,
    highlight: Option<Highlight>,
    cursor: CursorKind,
}

impl Session {
    fn new(options: &SelectOptions) -> Self {
        Self {
            options: options.clone(),
            state: DragState::Idle,
            highlight: None,
            cursor: CursorKind::Crosshair,
        }
    }

    /// Advance one tick; `Some` once the selection is decided
    fn step<D: DisplayServer>(&mut self, engine: &mut XEngine<D>) -> Result<Option<Selection>> {
        if self.options.keyboard && engine.any_key_pressed()? {
            info!("Key pressed, selection cancelled");
            return Ok(Some(Selection::Cancelled));
        }

        let down = engine.mouse_down(SELECT_BUTTON);
        let pressed = engine.mouse_pressed(SELECT_BUTTON);
        let released = engine.mouse_released(SELECT_BUTTON);
        let (mx, my) = engine.mouse_position();

        match &mut self.state {
            DragState::Idle => {
                if !pressed {
                    self.update_highlight(engine)?;
                    return Ok(None);
                }
                if self.options.nodrag {
                    self.start_drag(engine, (mx, my))?;
                } else if !down {
                    // Pressed and released within one tick
                    debug!("Click at ({}, {})", mx, my);
                    return self.pick_window(engine).map(Some);
                } else {
                    debug!("Button pressed at ({}, {})", mx, my);
                    self.state = DragState::Pressed { anchor: (mx, my) };
                }
            }
            DragState::Pressed { anchor } => {
                let anchor = *anchor;
                if released || !down {
                    return self.pick_window(engine).map(Some);
                }
                let tolerance = i64::from(self.options.tolerance);
                let moved = (i64::from(mx) - i64::from(anchor.0)).abs() > tolerance
                    || (i64::from(my) - i64::from(anchor.1)).abs() > tolerance;
                if moved {
                    self.start_drag(engine, anchor)?;
                }
            }
            DragState::Dragging { anchor, rect } => {
                rect.set_dimensions(
                    engine,
                    mx.saturating_sub(anchor.0),
                    my.saturating_sub(anchor.1),
                )?;
                let region = rect.region();
                let cursor = CursorKind::for_drag(rect.flipped_x(), rect.flipped_y());
                self.set_cursor(engine, cursor)?;

                let finished = if self.options.nodrag { pressed } else { released || !down };
                if finished {
                    info!("Region selected: {}", region.geometry_string());
                    return Ok(Some(Selection::Region(region)));
                }
            }
        }
        Ok(None)
    }

    fn start_drag<D: DisplayServer>(
        &mut self,
        engine: &mut XEngine<D>,
        anchor: (i32, i32),
    ) -> Result<()> {
        self.clear_highlight(engine)?;
        let (mx, my) = engine.mouse_position();
        let rect = Rectangle::create(
            engine,
            anchor.0,
            anchor.1,
            mx.saturating_sub(anchor.0),
            my.saturating_sub(anchor.1),
            self.options.border,
            self.options.padding,
            self.options.color,
        )?;
        self.set_cursor(engine, CursorKind::for_drag(rect.flipped_x(), rect.flipped_y()))?;
        debug!("Drag started at ({}, {})", anchor.0, anchor.1);
        self.state = DragState::Dragging { anchor, rect };
        Ok(())
    }

    fn pick_window<D: DisplayServer>(&mut self, engine: &mut XEngine<D>) -> Result<Selection> {
        let geometry = match engine.hover_window() {
            Some(window) => WindowGeometry::probe(engine, window, self.options.decorations)?,
            None => {
                let root = engine.root()?;
                WindowGeometry::probe(engine, root, true)?
            }
        };
        info!(
            "Window {} selected: {}",
            geometry.window,
            geometry.region().geometry_string()
        );
        Ok(Selection::Window(geometry))
    }

    fn update_highlight<D: DisplayServer>(&mut self, engine: &mut XEngine<D>) -> Result<()> {
        if !self.options.highlight {
            return Ok(());
        }
        let hover = engine.hover_window();
        if self.highlight.as_ref().map(|h| h.target) == hover {
            return Ok(());
        }
        self.clear_highlight(engine)?;
        let Some(target) = hover else {
            return Ok(());
        };
        let geometry = WindowGeometry::probe(engine, target, self.options.decorations)?;
        let rect = Rectangle::create(
            engine,
            geometry.x,
            geometry.y,
            i32::try_from(geometry.width).unwrap_or(i32::MAX),
            i32::try_from(geometry.height).unwrap_or(i32::MAX),
            self.options.border,
            self.options.padding,
            self.options.color,
        )?;
        self.highlight = Some(Highlight { target, rect });
        Ok(())
    }

    fn clear_highlight<D: DisplayServer>(&mut self, engine: &mut XEngine<D>) -> Result<()> {
        match self.highlight.take() {
            Some(highlight) => highlight.rect.destroy(engine),
            None => Ok(()),
        }
    }

    fn set_cursor<D: DisplayServer>(
        &mut self,
        engine: &mut XEngine<D>,
        cursor: CursorKind,
    ) -> Result<()> {
        if self.cursor == cursor {
            return Ok(());
        }
        engine.set_cursor(cursor)?;
        self.cursor = cursor;
        Ok(())
    }

    /// Destroy every overlay still on screen
    fn teardown<D: DisplayServer>(&mut self, engine: &mut XEngine<D>) -> Result<()> {
        self.clear_highlight(engine)?;
        if let DragState::Dragging { rect, .. } = std::mem::replace(&mut self.state, DragState::Idle)
        {
            rect.destroy(engine)?;
        }
        Ok(())
    }
}

/// Run an interactive selection on an initialized engine
///
/// Grabs are taken for the duration of the run and released afterwards;
/// every overlay created along the way is gone when this returns.
pub fn select<D: DisplayServer>(
    engine: &mut XEngine<D>,
    options: &SelectOptions,
) -> Result<Selection> {
    engine.grab_pointer(CursorKind::Crosshair)?;
    if options.keyboard {
        engine.grab_keyboard()?;
    }

    let mut session = Session::new(options);
    let outcome = run(engine, &mut session);
    let cleanup = session.teardown(engine);

    // The selection's own error wins over any failure to let go
    let pointer = engine.release_pointer();
    let keyboard = if options.keyboard { engine.release_keyboard() } else { Ok(()) };
    let selection = outcome?;
    cleanup?;
    pointer?;
    keyboard?;
    Ok(selection)
}

fn run<D: DisplayServer>(engine: &mut XEngine<D>, session: &mut Session) -> Result<Selection> {
    loop {
        engine.tick()?;
        if let Some(selection) = session.step(engine)? {
            return Ok(selection);
        }
        if !session.options.poll_interval.is_zero() {
            thread::sleep(session.options.poll_interval);
        }
    }
}

/// Expand `format` for a selection
///
/// `%x %y %w %h` geometry, `%g` as `WxH+X+Y`, `%i` window id (0 for a
/// region), `%c` 1 if cancelled, `%d` 1 if decorations are included, `%%` a
/// literal percent. The escapes `\n` and `\t` are honoured so formats can be
/// passed on the command line. Unknown sequences are kept verbatim.
pub fn format_selection(selection: &Selection, format: &str) -> String {
    let region = selection.region().unwrap_or_default();
    let window = selection.window().unwrap_or(0);
    let decorations = matches!(selection, Selection::Window(g) if g.decorations);

    let mut out = String::with_capacity(format.len() + 32);
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '%' => match chars.peek().copied() {
                Some(directive) => {
                    let expanded = match directive {
                        'x' => region.x.to_string(),
                        'y' => region.y.to_string(),
                        'w' => region.width.to_string(),
                        'h' => region.height.to_string(),
                        'g' => region.geometry_string(),
                        'i' => window.to_string(),
                        'c' => u8::from(selection.is_cancelled()).to_string(),
                        'd' => u8::from(decorations).to_string(),
                        '%' => "%".to_string(),
                        _ => {
                            out.push('%');
                            continue;
                        }
                    };
                    chars.next();
                    out.push_str(&expanded);
                }
                None => out.push('%'),
            },
            '\\' => match chars.peek().copied() {
                Some('n') => {
                    chars.next();
                    out.push('\n');
                }
                Some('t') => {
                    chars.next();
                    out.push('\t');
                }
                _ => out.push('\\'),
            },
            _ => out.push(c),
        }
    }
    out
}
