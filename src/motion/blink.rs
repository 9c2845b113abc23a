//! Eyelid choreography: staggered two-lid blinks and single-lid winks.
//!
//! The plans here are pure frame generators; [`MotionEngine`](super::MotionEngine)
//! plays them back with the configured per-frame delay.

use super::joint::EyeSide;
use crate::config::ServoConfig;

/// Travel of one eyelid between its open trim and the closed position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LidSpan {
    pub open: i32,
    pub closed: i32,
}

impl LidSpan {
    pub fn for_side(servo: &ServoConfig, side: EyeSide) -> Self {
        Self {
            open: side.eyelid_open(servo),
            closed: servo.blink.max,
        }
    }

    pub fn range(&self) -> i32 {
        self.closed - self.open
    }

    /// Lid angle after `step` frames of closing.
    ///
    /// Progress is linear at one degree per frame; steps past the lid's own
    /// range hold it closed. A lid without travel sits at `closed`.
    pub fn angle_at(&self, step: i32) -> i32 {
        let range = self.range();
        if range <= 0 {
            return self.closed;
        }
        self.open + step.clamp(0, range)
    }
}

/// A two-lid blink where the right lid trails the left by a fixed number of frames.
#[derive(Debug, Clone, Copy)]
pub struct BlinkPlan {
    left: LidSpan,
    right: LidSpan,
    side_offset: i32,
    steps_total: i32,
}

impl BlinkPlan {
    /// Returns `None` when neither lid has any travel.
    pub fn new(servo: &ServoConfig, side_offset_steps: i32) -> Option<Self> {
        let left = LidSpan::for_side(servo, EyeSide::Left);
        let right = LidSpan::for_side(servo, EyeSide::Right);
        let steps_total = left.range().max(right.range());
        if steps_total <= 0 {
            return None;
        }
        Some(Self {
            left,
            right,
            side_offset: side_offset_steps.max(0),
            steps_total,
        })
    }

    pub fn steps_total(&self) -> i32 {
        self.steps_total
    }

    /// `(left, right)` lid angles at closing step `step`.
    pub fn frame(&self, step: i32) -> (i32, i32) {
        let right_step = (step - self.side_offset).max(0);
        (self.left.angle_at(step), self.right.angle_at(right_step))
    }

    /// Frames from open to closed, inclusive of both ends.
    pub fn closing(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        (0..=self.steps_total).map(|s| self.frame(s))
    }

    /// Frames from closed back to open: the closing steps replayed in reverse.
    pub fn opening(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        (0..=self.steps_total).rev().map(|s| self.frame(s))
    }
}

/// Frames of a single-lid wink on `side`: closing frames, then opening frames.
pub fn wink_frames(servo: &ServoConfig, side: EyeSide) -> (Vec<i32>, Vec<i32>) {
    let span = LidSpan::for_side(servo, side);
    let steps = span.range();
    if steps <= 0 {
        return (Vec::new(), Vec::new());
    }
    let closing: Vec<i32> = (0..=steps).map(|s| span.angle_at(s)).collect();
    let opening: Vec<i32> = closing.iter().rev().copied().collect();
    (closing, opening)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> BlinkPlan {
        match BlinkPlan::new(&ServoConfig::default(), 10) {
            Some(p) => p,
            None => unreachable!("default servo config has lid travel"),
        }
    }

    #[test]
    fn steps_total_is_the_longer_lid_range() {
        // Left: -12..40 = 52, right: 0..40 = 40.
        assert_eq!(plan().steps_total(), 52);
    }

    #[test]
    fn closing_starts_open_and_ends_closed() {
        let frames: Vec<_> = plan().closing().collect();
        assert_eq!(frames.first(), Some(&(-12, 0)));
        assert_eq!(frames.last(), Some(&(40, 40)));
        assert_eq!(frames.len(), 53);
    }

    #[test]
    fn opening_mirrors_closing() {
        let p = plan();
        let mut closing: Vec<_> = p.closing().collect();
        closing.reverse();
        let opening: Vec<_> = p.opening().collect();
        assert_eq!(opening, closing);
        assert_eq!(opening.last(), Some(&(-12, 0)));
    }

    #[test]
    fn right_lid_lags_the_left() {
        let p = plan();
        // Right lid holds open for the first ten frames.
        for step in 0..=10 {
            assert_eq!(p.frame(step).1, 0, "step {step}");
        }
        assert_eq!(p.frame(11).1, 1);
        // Left has already moved.
        assert!(p.frame(10).0 > -12);
    }

    #[test]
    fn zero_offset_keeps_lids_in_step() {
        let servo = ServoConfig {
            blink_open_left: 0,
            ..ServoConfig::default()
        };
        let p = match BlinkPlan::new(&servo, 0) {
            Some(p) => p,
            None => unreachable!(),
        };
        for (l, r) in p.closing() {
            assert_eq!(l, r);
        }
    }

    #[test]
    fn no_travel_means_no_plan() {
        let servo = ServoConfig {
            blink_open_left: 40,
            blink_open_right: 40,
            ..ServoConfig::default()
        };
        assert!(BlinkPlan::new(&servo, 10).is_none());
    }

    #[test]
    fn lid_angle_is_clamped_to_its_range() {
        let span = LidSpan { open: -12, closed: 40 };
        assert_eq!(span.angle_at(1), -11);
        assert_eq!(span.angle_at(0), -12);
        assert_eq!(span.angle_at(52), 40);
        assert_eq!(span.angle_at(80), 40);
    }

    #[test]
    fn wink_frames_cover_one_lid() {
        let servo = ServoConfig::default();
        let (closing, opening) = wink_frames(&servo, EyeSide::Right);
        assert_eq!(closing.first(), Some(&0));
        assert_eq!(closing.last(), Some(&40));
        assert_eq!(opening.last(), Some(&0));
        assert_eq!(closing.len(), 41);
    }
}
