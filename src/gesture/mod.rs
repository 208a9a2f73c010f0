pub mod matcher;
pub mod types;

pub use matcher::{MatchOutcome, MatchState, MatcherConfig, SequenceMatcher};
pub use types::{
    ColorFrame, GestureEvent, GestureId, SensorFrame, UnlockSequence, WristPosition,
};
