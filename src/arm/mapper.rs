use serde::{Deserialize, Serialize};
use std::fmt;

use crate::gesture::WristPosition;

/// Wrist travel (meters) that maps to one servo degree.
const METERS_PER_DEGREE: f32 = 0.011;
const MAX_DEGREES: f32 = 180.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ArmAxis {
    #[default]
    X,
    Y,
}

impl ArmAxis {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArmAxis::X => "X",
            ArmAxis::Y => "Y",
        }
    }

    fn component(&self, wrist: &WristPosition) -> f32 {
        match self {
            ArmAxis::X => wrist.x,
            ArmAxis::Y => wrist.y,
        }
    }
}

impl fmt::Display for ArmAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Movement on the active axis. X grows to the right, Y grows upward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    None,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DirectionFlags {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl From<Direction> for DirectionFlags {
    fn from(direction: Direction) -> Self {
        let mut flags = Self::default();
        match direction {
            Direction::Up => flags.up = true,
            Direction::Down => flags.down = true,
            Direction::Left => flags.left = true,
            Direction::Right => flags.right = true,
            Direction::None => {}
        }
        flags
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmUpdate {
    pub direction: Direction,
    /// Servo target, clamped to the 0..=180 range.
    pub degrees: f32,
    /// Unclamped conversion result.
    pub raw_degrees: f32,
    pub new_previous: f32,
}

/// Converts a position on one axis into a mirrored servo angle.
pub fn position_to_degrees(position: f32) -> f32 {
    MAX_DEGREES - ((position / METERS_PER_DEGREE) + 90.0)
}

/// Stateless: the only memory is the `previous` the caller threads through.
pub fn update(wrist: WristPosition, axis: ArmAxis, previous: f32) -> ArmUpdate {
    let position = axis.component(&wrist);

    let direction = if position > previous {
        match axis {
            ArmAxis::X => Direction::Right,
            ArmAxis::Y => Direction::Up,
        }
    } else if position < previous {
        match axis {
            ArmAxis::X => Direction::Left,
            ArmAxis::Y => Direction::Down,
        }
    } else {
        Direction::None
    };

    let raw_degrees = position_to_degrees(position);
    ArmUpdate {
        direction,
        degrees: raw_degrees.clamp(0.0, MAX_DEGREES),
        raw_degrees,
        new_previous: position,
    }
}

/// Per teleop session state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmState {
    pub axis: ArmAxis,
    pub previous: f32,
    pub flags: DirectionFlags,
    pub target_degrees: f32,
}

impl ArmState {
    pub fn new(axis: ArmAxis) -> Self {
        Self {
            axis,
            previous: 0.0,
            flags: DirectionFlags::default(),
            target_degrees: 90.0,
        }
    }

    pub fn step(&mut self, wrist: WristPosition) -> ArmUpdate {
        let result = update(wrist, self.axis, self.previous);
        self.previous = result.new_previous;
        self.flags = result.direction.into();
        self.target_degrees = result.degrees;
        result
    }
}
