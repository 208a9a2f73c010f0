use serde::{Deserialize, Serialize};

use crate::gesture::GestureId;
use crate::transport::ActuatorCommand;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "state")]
pub enum DisplayState {
    NotTracked,
    Locked { matched: usize },
    Unlocked,
}

impl Default for DisplayState {
    fn default() -> Self {
        DisplayState::NotTracked
    }
}

/// Immutable snapshot handed to display and notification adapters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub matched_count: usize,
    pub unlocked: bool,
    pub attempts_used: u32,
    /// Pending one-shot alert; cleared by `UnlockController::take_alert`.
    pub should_alert: bool,
    pub tracked: bool,
    pub expected: Option<GestureId>,
    pub display: DisplayState,
}

/// Something worth recording that happened during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockEvent {
    Advanced { matched: usize },
    Unlocked,
    AttemptFailed { attempts: u32 },
    Lockout,
    TrackingAcquired { tracking_id: u64 },
    TrackingLost,
}

#[derive(Debug, Clone, Default)]
pub struct TickOutput {
    pub commands: Vec<ActuatorCommand>,
    pub events: Vec<LockEvent>,
    /// True on the tick where a lockout raised the alert.
    pub alert_raised: bool,
    pub progress: Progress,
}
