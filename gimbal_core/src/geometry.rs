// Copyright 2026 the Gimbal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rectangle mapping between landscape and portrait coordinate frames.
//!
//! [`ScreenRect::rotated`] is the pure core of an orientation change: it maps
//! geometry laid out in one frame into the frame the screen is turning to.
//! The mapping is its own inverse under swapped screen dimensions, so a
//! rotation that is backed out reproduces the original layout exactly (no
//! drift from repeated conversions).
//!
//! The [`kurbo`] conversions and [`ScreenRect::blend`] support transition
//! animation: the shell samples a
//! [`KeyframeList`](crate::keyframe::KeyframeList) for a progress value and
//! blends a window's old frame toward its new one.

use kurbo::{Point, Rect};

use crate::display::Orientation;

/// An integer rectangle in screen coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct ScreenRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ScreenRect {
    /// Creates a rectangle.
    #[must_use]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Maps this rectangle into the coordinate frame of a screen with the
    /// given dimensions, turning it a quarter turn.
    ///
    /// `screen_width > screen_height` selects the landscape frame as the
    /// target, anything else the portrait frame; the returned
    /// [`Orientation`] names which one was chosen. Width and height swap in
    /// both directions.
    ///
    /// Applying this twice, the second time with the screen dimensions
    /// swapped, restores the original rectangle exactly.
    #[must_use]
    pub const fn rotated(self, screen_width: u32, screen_height: u32) -> (Self, Orientation) {
        let width = self.height;
        let height = self.width;
        if screen_width > screen_height {
            let x = self.y;
            let y = screen_height as i32 - (self.x + height as i32);
            (
                Self {
                    x,
                    y,
                    width,
                    height,
                },
                Orientation::Landscape,
            )
        } else {
            let y = self.x;
            let x = screen_width as i32 - (self.y + width as i32);
            (
                Self {
                    x,
                    y,
                    width,
                    height,
                },
                Orientation::Portrait,
            )
        }
    }

    /// The same rectangle as a float [`Rect`].
    #[must_use]
    pub fn to_rect(self) -> Rect {
        Rect::from_origin_size(
            (f64::from(self.x), f64::from(self.y)),
            (f64::from(self.width), f64::from(self.height)),
        )
    }

    /// Converts a float rectangle back, rounding every edge to the nearest
    /// pixel. Negative widths/heights (unnormalized rects) are normalized
    /// first.
    #[must_use]
    pub fn from_rect(rect: Rect) -> Self {
        let rect = rect.abs();
        Self {
            x: round_coord(rect.x0),
            y: round_coord(rect.y0),
            width: round_extent(rect.width()),
            height: round_extent(rect.height()),
        }
    }

    /// Linearly interpolates this rectangle toward `to`.
    ///
    /// `t = 0.0` is `self`, `t = 1.0` is `to`; both corner points move on
    /// straight lines, which keeps a blended frame inside the hull of the two
    /// endpoints. Intended to be fed a sampled keyframe progress while a
    /// transition animates.
    #[must_use]
    pub fn blend(self, to: Self, t: f64) -> Self {
        let a = self.to_rect();
        let b = to.to_rect();
        let origin = a.origin().lerp(b.origin(), t);
        let corner = Point::new(a.x1, a.y1).lerp(Point::new(b.x1, b.y1), t);
        Self::from_rect(Rect::from_points(origin, corner))
    }
}

// `f64::round` lives in std, which this crate does not assume.
#[expect(
    clippy::cast_possible_truncation,
    reason = "screen coordinates fit in i32; truncation after the half-offset is the rounding"
)]
fn round_coord(v: f64) -> i32 {
    if v >= 0.0 {
        (v + 0.5) as i32
    } else {
        (v - 0.5) as i32
    }
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "extents are non-negative after normalization and fit in u32"
)]
fn round_extent(v: f64) -> u32 {
    (v + 0.5) as u32
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotate_to_portrait() {
        // 800x480 landscape rect into the 480x800 portrait frame.
        let rect = ScreenRect::new(10, 20, 100, 50);
        let (rotated, orientation) = rect.rotated(480, 800);
        assert_eq!(orientation, Orientation::Portrait);
        // x' = 480 - (20 + 50), y' = 10, dimensions swapped.
        assert_eq!(rotated, ScreenRect::new(410, 10, 50, 100));
    }

    #[test]
    fn rotate_to_landscape() {
        let rect = ScreenRect::new(410, 10, 50, 100);
        let (rotated, orientation) = rect.rotated(800, 480);
        assert_eq!(orientation, Orientation::Landscape);
        assert_eq!(rotated, ScreenRect::new(10, 20, 100, 50));
    }

    #[test]
    fn rotate_round_trips() {
        let cases = [
            ScreenRect::new(0, 0, 800, 480),
            ScreenRect::new(0, 0, 1, 1),
            ScreenRect::new(799, 479, 1, 1),
            ScreenRect::new(10, 20, 100, 50),
            ScreenRect::new(-5, 3, 40, 90),
        ];
        for rect in cases {
            let (portrait, _) = rect.rotated(480, 800);
            let (back, _) = portrait.rotated(800, 480);
            assert_eq!(back, rect, "round trip for {rect:?}");
        }
    }

    #[test]
    fn square_screen_counts_as_portrait_target() {
        let (_, orientation) = ScreenRect::new(0, 0, 10, 10).rotated(600, 600);
        assert_eq!(orientation, Orientation::Portrait);
    }

    #[test]
    fn rect_conversion_rounds_to_nearest() {
        let rect = Rect::new(1.6, 2.4, 11.6, 22.4);
        // Edges round independently of extents: x0 -> 2, width 10.0 -> 10.
        assert_eq!(ScreenRect::from_rect(rect), ScreenRect::new(2, 2, 10, 20));

        let negative = Rect::new(-3.5, -0.4, 1.0, 1.0);
        assert_eq!(
            ScreenRect::from_rect(negative),
            ScreenRect::new(-4, 0, 5, 1)
        );
    }

    #[test]
    fn from_rect_normalizes() {
        // Corners given in the "wrong" order still produce positive extents.
        let flipped = Rect::new(10.0, 20.0, 2.0, 4.0);
        assert_eq!(ScreenRect::from_rect(flipped), ScreenRect::new(2, 4, 8, 16));
    }

    #[test]
    fn to_rect_round_trips() {
        let rect = ScreenRect::new(-7, 3, 120, 45);
        assert_eq!(ScreenRect::from_rect(rect.to_rect()), rect);
    }

    #[test]
    fn blend_endpoints_and_midpoint() {
        let from = ScreenRect::new(0, 0, 100, 200);
        let to = ScreenRect::new(200, 100, 300, 400);
        assert_eq!(from.blend(to, 0.0), from);
        assert_eq!(from.blend(to, 1.0), to);
        assert_eq!(from.blend(to, 0.5), ScreenRect::new(100, 50, 200, 300));
    }

    #[test]
    fn blend_of_equal_rects_is_stable() {
        let rect = ScreenRect::new(5, 5, 10, 10);
        for t in [0.0, 0.25, 0.5, 0.75, 1.0] {
            assert_eq!(rect.blend(rect, t), rect, "t = {t}");
        }
    }
}
