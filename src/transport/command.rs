use serde::Serialize;

use crate::arm::ArmAxis;

/// Text commands understood by the door/arm microcontroller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ActuatorCommand {
    /// Open the door.
    Unlock,
    /// Point the arm servo on `axis` at `degrees`.
    Arm { axis: ArmAxis, degrees: f32 },
}

impl ActuatorCommand {
    pub fn as_line(&self) -> String {
        match self {
            ActuatorCommand::Unlock => "U".to_string(),
            ActuatorCommand::Arm { axis, degrees } => format!("{axis},{degrees:.1}"),
        }
    }
}
