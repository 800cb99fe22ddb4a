// Copyright 2026 the Gimbal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Piecewise-linear transition curves parsed from keyframe strings.
//!
//! Transition timing arrives as a comma-separated list of control points,
//! e.g. `"0.0,0.8,1.0"`. [`KeyframeList::parse`] never fails: malformed input
//! degrades to the identity ramp so a bad configuration value costs the user
//! a fancy curve, never a transition. [`KeyframeList::sample`] maps a
//! normalized progress value onto the curve.

use alloc::vec;
use alloc::vec::Vec;

/// An ordered list of keyframe control points.
///
/// Always holds at least two points; every constructor falls back to
/// [`linear`](Self::linear) rather than producing a shorter list.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyframeList {
    keys: Vec<f32>,
}

impl KeyframeList {
    /// The two-point identity ramp, `{0.0, 1.0}`.
    ///
    /// This is the fallback for malformed input and the [`Default`] value.
    #[must_use]
    pub fn linear() -> Self {
        Self {
            keys: vec![0.0, 1.0],
        }
    }

    /// Parses a comma-separated keyframe string.
    ///
    /// Each segment is parsed best-effort: non-numeric segments yield `0.0`
    /// rather than aborting the parse. A single trailing comma adds no
    /// segment. Inputs of length up to one, or with fewer than two segments,
    /// yield [`linear`](Self::linear).
    #[must_use]
    pub fn parse(spec: &str) -> Self {
        if spec.len() <= 1 {
            return Self::linear();
        }
        let mut segments: Vec<&str> = spec.split(',').collect();
        if segments.last() == Some(&"") {
            segments.pop();
        }
        if segments.len() < 2 {
            return Self::linear();
        }
        let keys = segments
            .iter()
            .map(|segment| segment.trim().parse::<f32>().unwrap_or(0.0))
            .collect();
        Self { keys }
    }

    /// Samples the curve at progress `x`.
    ///
    /// `x` is clamped to `[0.0, 1.0]`, mapped onto the key index range, and
    /// linearly interpolated between the two bracketing keys. Out-of-range
    /// inputs therefore return the first or last key, never an extrapolation.
    #[must_use]
    pub fn sample(&self, x: f32) -> f32 {
        let x = x.clamp(0.0, 1.0);
        let count = self.keys.len();
        let v = x * (count - 1) as f32;
        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "v is clamped to [0, count-1]; truncation selects the bracketing segment"
        )]
        let index = (v as usize).min(count - 2);
        let frac = v - index as f32;
        self.keys[index] * (1.0 - frac) + self.keys[index + 1] * frac
    }

    /// The number of control points (always at least two).
    #[must_use]
    pub fn count(&self) -> usize {
        self.keys.len()
    }

    /// The first control point.
    #[must_use]
    pub fn first(&self) -> f32 {
        self.keys[0]
    }

    /// The last control point.
    #[must_use]
    pub fn last(&self) -> f32 {
        self.keys[self.keys.len() - 1]
    }

    /// All control points, in order.
    #[must_use]
    pub fn keys(&self) -> &[f32] {
        &self.keys
    }
}

impl Default for KeyframeList {
    fn default() -> Self {
        Self::linear()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_inputs_fall_back_to_linear() {
        for spec in ["", "5", ",", "0.3", "no commas here"] {
            let parsed = KeyframeList::parse(spec);
            assert_eq!(parsed, KeyframeList::linear(), "spec {spec:?}");
        }
        assert_eq!(KeyframeList::default(), KeyframeList::linear());
    }

    #[test]
    fn parse_keeps_all_segments() {
        let list = KeyframeList::parse("0.0,0.5,1.0");
        assert_eq!(list.count(), 3);
        assert_eq!(list.keys(), &[0.0, 0.5, 1.0]);
    }

    #[test]
    fn trailing_comma_adds_nothing() {
        let list = KeyframeList::parse("0.0,1.0,");
        assert_eq!(list.count(), 2);
        assert_eq!(list.keys(), &[0.0, 1.0]);
    }

    #[test]
    fn non_numeric_segments_parse_as_zero() {
        let list = KeyframeList::parse("oops,1.0");
        assert_eq!(list.keys(), &[0.0, 1.0]);
        // An interior garbage segment does not abort the rest.
        let list = KeyframeList::parse("0.5,?,1.0");
        assert_eq!(list.keys(), &[0.5, 0.0, 1.0]);
    }

    #[test]
    fn whitespace_around_segments_is_ignored() {
        let list = KeyframeList::parse(" 0.1 , 0.9 ");
        assert_eq!(list.keys(), &[0.1, 0.9]);
    }

    #[test]
    fn sample_hits_endpoints() {
        let list = KeyframeList::parse("0.2,0.4,0.9");
        assert_eq!(list.sample(0.0), list.first());
        assert_eq!(list.sample(1.0), list.last());
    }

    #[test]
    fn sample_clamps_out_of_range_progress() {
        let list = KeyframeList::parse("0.2,0.4,0.9");
        assert_eq!(list.sample(-3.0), list.first());
        assert_eq!(list.sample(7.5), list.last());
    }

    #[test]
    fn sample_interpolates_within_segments() {
        let list = KeyframeList::parse("0.0,0.5,1.0");
        assert_eq!(list.sample(0.5), 0.5);

        // Non-monotonic curves interpolate segment by segment.
        let bounce = KeyframeList::parse("0.0,1.0,0.5");
        // x = 0.25 lands halfway into the first segment.
        assert_eq!(bounce.sample(0.25), 0.5);
        // x = 0.75 lands halfway into the second.
        assert_eq!(bounce.sample(0.75), 0.75);
    }

    #[test]
    fn linear_is_the_identity_ramp() {
        let list = KeyframeList::linear();
        for x in [0.0, 0.25, 0.5, 0.75, 1.0] {
            assert_eq!(list.sample(x), x, "identity at {x}");
        }
    }
}
