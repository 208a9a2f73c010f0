pub mod replay;
pub mod simulated;

pub use replay::ReplaySource;
pub use simulated::SimulatedSource;

use std::time::Instant;

use crate::gesture::SensorFrame;

/// Per-tick sensor input. `None` means no new frame arrived this tick.
pub trait GestureSource: Send {
    fn poll(&mut self, now: Instant) -> Option<SensorFrame>;

    /// True once the source will never produce another frame.
    fn is_finished(&self) -> bool {
        false
    }
}
