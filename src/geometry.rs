//! Drag geometry normalization
//!
//! A drag can start from any corner, so its extent along each axis may be
//! negative. The overlay window needs a positive size and a true top-left
//! corner; [`normalize`] produces both while remembering which axis was
//! mirrored.

/// One axis of a normalized drag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Normalized {
    /// Added to the drag anchor, gives the top-left edge along this axis
    pub offset: i32,
    /// Always non-negative
    pub extent: i32,
    /// True when the drag extent was negative
    pub flipped: bool,
}

/// Both axes of a normalized drag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NormalizedRect {
    pub x: Normalized,
    pub y: Normalized,
}

/// Normalize a signed drag extent with `padding` added on both sides
///
/// Negative padding shrinks the rectangle inward; when the drag is smaller
/// than twice the shrink the padding is dropped entirely so the result can
/// never turn inside out.
pub fn normalize(extent: i32, padding: i32) -> Normalized {
    let (e, p) = (i64::from(extent), i64::from(padding));
    let pad = if p < 0 && e.abs() < p.abs() * 2 { 0 } else { p };

    let (offset, size) = if e < 0 { (e - pad, -e + pad * 2) } else { (-pad, e + pad * 2) };
    Normalized {
        offset: clamp_i32(offset),
        extent: clamp_i32(size.max(0)),
        flipped: e < 0,
    }
}

fn clamp_i32(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Normalize a width/height pair independently per axis
pub fn normalize_rect(width: i32, height: i32, padding: i32) -> NormalizedRect {
    NormalizedRect {
        x: normalize(width, padding),
        y: normalize(height, padding),
    }
}

/// A positive-extent rectangle in root window coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Region covered by a drag from `anchor` with a signed `extent`
    pub fn from_drag(anchor: (i32, i32), extent: (i32, i32), padding: i32) -> Self {
        let n = normalize_rect(extent.0, extent.1, padding);
        Self {
            x: anchor.0.saturating_add(n.x.offset),
            y: anchor.1.saturating_add(n.y.offset),
            width: n.x.extent.max(0) as u32,
            height: n.y.extent.max(0) as u32,
        }
    }

    /// `WxH+X+Y`, the X geometry string form
    pub fn geometry_string(&self) -> String {
        format!("{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_positive_extent_without_padding() {
        let n = normalize(50, 0);
        assert_eq!(n, Normalized { offset: 0, extent: 50, flipped: false });
    }

    #[test]
    fn test_negative_extent_flips() {
        let n = normalize(-50, 0);
        assert_eq!(n, Normalized { offset: -50, extent: 50, flipped: true });
    }

    #[test]
    fn test_positive_padding_grows_both_sides() {
        assert_eq!(normalize(20, 5), Normalized { offset: -5, extent: 30, flipped: false });
        assert_eq!(normalize(-20, 5), Normalized { offset: -25, extent: 30, flipped: true });
    }

    #[test]
    fn test_shrink_padding_applies_when_room() {
        assert_eq!(normalize(20, -5), Normalized { offset: 5, extent: 10, flipped: false });
        assert_eq!(normalize(-20, -5), Normalized { offset: -15, extent: 10, flipped: true });
    }

    #[test]
    fn test_shrink_padding_dropped_when_drag_too_small() {
        // |e| = 6 < 2 * |p| = 10
        assert_eq!(normalize(6, -5), Normalized { offset: 0, extent: 6, flipped: false });
        assert_eq!(normalize(-6, -5), Normalized { offset: -6, extent: 6, flipped: true });
        // exactly twice the shrink keeps the padding and collapses to zero
        assert_eq!(normalize(10, -5).extent, 0);
    }

    #[test]
    fn test_zero_extent() {
        assert_eq!(normalize(0, 0), Normalized::default());
        assert_eq!(normalize(0, -3), Normalized::default());
    }

    #[test]
    fn test_region_from_drag_any_direction() {
        let expected = Region::new(10, 20, 30, 40);
        assert_eq!(Region::from_drag((10, 20), (30, 40), 0), expected);
        assert_eq!(Region::from_drag((40, 60), (-30, -40), 0), expected);
        assert_eq!(Region::from_drag((40, 20), (-30, 40), 0), expected);
        assert_eq!(Region::from_drag((20, 30), (10, 20), 10), expected);
    }

    #[test]
    fn test_region_geometry_string() {
        assert_eq!(Region::new(-5, 7, 100, 50).geometry_string(), "100x50+-5+7");
    }

    proptest! {
        #[test]
        fn prop_extent_never_negative(e in -100_000i32..100_000, p in -1_000i32..1_000) {
            prop_assert!(normalize(e, p).extent >= 0);
        }

        #[test]
        fn prop_flip_matches_sign(e in -100_000i32..100_000, p in -1_000i32..1_000) {
            prop_assert_eq!(normalize(e, p).flipped, e < 0);
        }

        #[test]
        fn prop_reconstructs_padded_bounding_box(
            ax in -5_000i32..5_000,
            e in -5_000i32..5_000,
            p in 0i32..200,
        ) {
            let n = normalize(e, p);
            let left = ax + n.offset;
            let right = left + n.extent;
            let (lo, hi) = if e < 0 { (ax + e, ax) } else { (ax, ax + e) };
            prop_assert_eq!(left, lo - p);
            prop_assert_eq!(right, hi + p);
        }

        #[test]
        fn prop_shrink_never_inverts(
            ax in -5_000i32..5_000,
            e in -5_000i32..5_000,
            p in -200i32..0,
        ) {
            let n = normalize(e, p);
            let (lo, hi) = if e < 0 { (ax + e, ax) } else { (ax, ax + e) };
            let left = ax + n.offset;
            prop_assert!(left >= lo);
            prop_assert!(left + n.extent <= hi);
        }

        #[test]
        fn prop_extreme_inputs_do_not_overflow(e in any::<i32>(), p in any::<i32>()) {
            let n = normalize(e, p);
            prop_assert!(n.extent >= 0);
            prop_assert_eq!(n.flipped, e < 0);
        }
    }
}
