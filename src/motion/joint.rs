//! Joint identifiers, servo directions and motion targets.

use crate::config::{JointDirections, ServoConfig};
use serde::{Deserialize, Serialize};

/// One controllable servo axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JointId {
    LeftX,
    LeftY,
    LeftBlink,
    RightX,
    RightY,
    RightBlink,
}

impl JointId {
    /// Every joint, in driver channel order.
    pub const ALL: [JointId; 6] = [
        JointId::LeftX,
        JointId::LeftY,
        JointId::LeftBlink,
        JointId::RightX,
        JointId::RightY,
        JointId::RightBlink,
    ];

    /// Channel on the servo driver board (and index into per-joint arrays).
    pub fn channel(self) -> usize {
        match self {
            JointId::LeftX => 0,
            JointId::LeftY => 1,
            JointId::LeftBlink => 2,
            JointId::RightX => 3,
            JointId::RightY => 4,
            JointId::RightBlink => 5,
        }
    }

    pub fn side(self) -> EyeSide {
        match self {
            JointId::LeftX | JointId::LeftY | JointId::LeftBlink => EyeSide::Left,
            JointId::RightX | JointId::RightY | JointId::RightBlink => EyeSide::Right,
        }
    }

    pub fn is_eyelid(self) -> bool {
        matches!(self, JointId::LeftBlink | JointId::RightBlink)
    }
}

impl std::fmt::Display for JointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JointId::LeftX => "left_x",
            JointId::LeftY => "left_y",
            JointId::LeftBlink => "left_blink",
            JointId::RightX => "right_x",
            JointId::RightY => "right_y",
            JointId::RightBlink => "right_blink",
        };
        f.write_str(name)
    }
}

/// Which eye.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EyeSide {
    Left,
    Right,
}

impl EyeSide {
    pub fn eyelid(self) -> JointId {
        match self {
            EyeSide::Left => JointId::LeftBlink,
            EyeSide::Right => JointId::RightBlink,
        }
    }

    /// Open trim of this side's eyelid.
    pub fn eyelid_open(self, servo: &ServoConfig) -> i32 {
        match self {
            EyeSide::Left => servo.blink_open_left,
            EyeSide::Right => servo.blink_open_right,
        }
    }
}

/// Servo direction.
///
/// Mechanically mirrored joints are `Inverted`: the commanded angle is
/// reflected (`180 - angle`) before it is turned into a pulse.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Normal,
    Inverted,
}

impl Direction {
    /// Reflect `angle` within the actuation range if inverted.
    pub fn apply(self, angle: f64, actuation_range_deg: f64) -> f64 {
        match self {
            Direction::Normal => angle,
            Direction::Inverted => actuation_range_deg - angle,
        }
    }
}

impl JointDirections {
    pub fn get(&self, joint: JointId) -> Direction {
        match joint {
            JointId::LeftX => self.left_x,
            JointId::LeftY => self.left_y,
            JointId::LeftBlink => self.left_blink,
            JointId::RightX => self.right_x,
            JointId::RightY => self.right_y,
            JointId::RightBlink => self.right_blink,
        }
    }
}

/// One joint's part of a synchronized multi-joint move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionTarget {
    pub joint: JointId,
    pub direction: Direction,
    pub angle: i32,
}

/// Build the four gaze targets that point both eyes at `(x, y)`.
pub fn gaze_targets(directions: &JointDirections, x: i32, y: i32) -> Vec<MotionTarget> {
    gaze_targets_split(directions, (x, y), (x, y))
}

/// Gaze targets with independent left and right eye positions.
pub fn gaze_targets_split(
    directions: &JointDirections,
    left: (i32, i32),
    right: (i32, i32),
) -> Vec<MotionTarget> {
    [
        (JointId::LeftX, left.0),
        (JointId::LeftY, left.1),
        (JointId::RightX, right.0),
        (JointId::RightY, right.1),
    ]
    .into_iter()
    .map(|(joint, angle)| MotionTarget {
        joint,
        direction: directions.get(joint),
        angle,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_are_unique_and_ordered() {
        for (i, joint) in JointId::ALL.iter().enumerate() {
            assert_eq!(joint.channel(), i);
        }
    }

    #[test]
    fn inverted_reflects_angle() {
        assert_eq!(Direction::Inverted.apply(30.0, 180.0), 150.0);
        assert_eq!(Direction::Normal.apply(30.0, 180.0), 30.0);
    }

    #[test]
    fn gaze_targets_use_configured_directions() {
        let dirs = JointDirections::default();
        let targets = gaze_targets(&dirs, 80, 100);
        assert_eq!(targets.len(), 4);
        let right_y = targets
            .iter()
            .find(|t| t.joint == JointId::RightY)
            .map(|t| t.direction);
        assert_eq!(right_y, Some(Direction::Inverted));
        assert!(targets.iter().all(|t| !t.joint.is_eyelid()));
    }

    #[test]
    fn eyelid_lookup_per_side() {
        let servo = ServoConfig::default();
        assert_eq!(EyeSide::Left.eyelid(), JointId::LeftBlink);
        assert_eq!(EyeSide::Left.eyelid_open(&servo), -12);
        assert_eq!(EyeSide::Right.eyelid_open(&servo), 0);
        assert_eq!(JointId::RightBlink.side(), EyeSide::Right);
    }
}
