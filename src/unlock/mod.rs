pub mod controller;
pub mod state;

pub use controller::{ControllerConfig, UnlockController};
pub use state::{DisplayState, LockEvent, Progress, TickOutput};
