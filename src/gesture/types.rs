use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Gestures an operator may pick for the unlock sequence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum GestureId {
    #[serde(rename = "Stop_Left")]
    StopLeft,
    #[serde(rename = "Stop_Right")]
    StopRight,
    #[serde(rename = "ThumbUp_Left")]
    ThumbUpLeft,
    #[serde(rename = "ThumbUp_Right")]
    ThumbUpRight,
}

impl GestureId {
    pub const ALL: [GestureId; 4] = [
        GestureId::StopLeft,
        GestureId::StopRight,
        GestureId::ThumbUpLeft,
        GestureId::ThumbUpRight,
    ];

    /// Name used by the gesture database.
    pub fn as_str(&self) -> &'static str {
        match self {
            GestureId::StopLeft => "Stop_Left",
            GestureId::StopRight => "Stop_Right",
            GestureId::ThumbUpLeft => "ThumbUp_Left",
            GestureId::ThumbUpRight => "ThumbUp_Right",
        }
    }
}

impl fmt::Display for GestureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GestureId {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        GestureId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == value)
            .ok_or_else(|| anyhow!("unknown gesture '{value}'"))
    }
}

/// One discrete recognition result from the gesture database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GestureEvent {
    pub name: String,
    pub confidence: f32,
    #[serde(default)]
    pub detected: bool,
}

impl GestureEvent {
    pub fn new(name: impl Into<String>, confidence: f32) -> Self {
        let confidence = confidence.clamp(0.0, 1.0);
        Self {
            name: name.into(),
            confidence,
            detected: confidence > 0.0,
        }
    }
}

/// The three-gesture pin.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnlockSequence([GestureId; 3]);

impl UnlockSequence {
    pub const LEN: usize = 3;

    pub fn new(first: GestureId, second: GestureId, third: GestureId) -> Self {
        Self([first, second, third])
    }

    /// Parses three database names, failing on anything outside [`GestureId::ALL`].
    pub fn parse(first: &str, second: &str, third: &str) -> Result<Self> {
        Ok(Self([first.parse()?, second.parse()?, third.parse()?]))
    }

    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        match names {
            [a, b, c] => Self::parse(a.as_ref(), b.as_ref(), c.as_ref()),
            _ => Err(anyhow!(
                "unlock sequence needs exactly {} gestures, got {}",
                Self::LEN,
                names.len()
            )),
        }
    }

    pub fn get(&self, index: usize) -> Option<GestureId> {
        self.0.get(index).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|id| id.as_str() == name)
    }

    pub fn names(&self) -> [&'static str; 3] {
        [self.0[0].as_str(), self.0[1].as_str(), self.0[2].as_str()]
    }
}

impl Default for UnlockSequence {
    fn default() -> Self {
        Self::new(
            GestureId::StopLeft,
            GestureId::StopRight,
            GestureId::ThumbUpLeft,
        )
    }
}

impl fmt::Display for UnlockSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.0[0], self.0[1], self.0[2])
    }
}

/// Camera-space joint position in meters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct WristPosition {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Latest color image, BGRA8 row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorFrame {
    pub width: u32,
    pub height: u32,
    pub bgra: Vec<u8>,
}

/// Everything the sensor hands over in one polling tick.
#[derive(Debug, Clone, Default)]
pub struct SensorFrame {
    /// Zero means no body is tracked.
    pub tracking_id: u64,
    pub gestures: Vec<GestureEvent>,
    pub wrist: Option<WristPosition>,
    pub color: Option<ColorFrame>,
}

impl SensorFrame {
    pub fn is_tracked(&self) -> bool {
        self.tracking_id != 0
    }
}
