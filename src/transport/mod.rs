pub mod command;
pub mod link;
pub mod worker;

pub use command::ActuatorCommand;
pub use link::{LineLink, RecordingTransport};
pub use worker::TransportHandle;

use anyhow::Result;

/// Anything that can carry actuator commands to the door/arm controller.
pub trait ActuatorTransport: Send {
    fn send(&mut self, command: &ActuatorCommand) -> Result<()>;
}
