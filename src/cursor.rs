//! Logical cursor kinds and their X font-cursor glyphs

/// Cursor shapes the selection uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CursorKind {
    #[default]
    Left,
    Crosshair,
    Cross,
    UpperLeftCorner,
    UpperRightCorner,
    LowerLeftCorner,
    LowerRightCorner,
}

impl CursorKind {
    pub const ALL: [CursorKind; 7] = [
        CursorKind::Left,
        CursorKind::Crosshair,
        CursorKind::Cross,
        CursorKind::UpperLeftCorner,
        CursorKind::UpperRightCorner,
        CursorKind::LowerLeftCorner,
        CursorKind::LowerRightCorner,
    ];

    /// Glyph index in the standard `cursor` font (X11/cursorfont.h)
    pub fn glyph(self) -> u16 {
        match self {
            CursorKind::Left => 68,              // XC_left_ptr
            CursorKind::Crosshair => 34,         // XC_crosshair
            CursorKind::Cross => 30,             // XC_cross
            CursorKind::UpperLeftCorner => 144,  // XC_ul_angle
            CursorKind::UpperRightCorner => 148, // XC_ur_angle
            CursorKind::LowerLeftCorner => 76,   // XC_ll_angle
            CursorKind::LowerRightCorner => 78,  // XC_lr_angle
        }
    }

    /// Corner cursor for the corner under the pointer while dragging
    ///
    /// `flipped_x`/`flipped_y` say the pointer is left of/above the anchor.
    pub fn for_drag(flipped_x: bool, flipped_y: bool) -> Self {
        match (flipped_x, flipped_y) {
            (false, false) => CursorKind::LowerRightCorner,
            (true, false) => CursorKind::LowerLeftCorner,
            (false, true) => CursorKind::UpperRightCorner,
            (true, true) => CursorKind::UpperLeftCorner,
        }
    }
}
