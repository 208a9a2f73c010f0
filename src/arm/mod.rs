pub mod mapper;

pub use mapper::{ArmAxis, ArmState, ArmUpdate, Direction, DirectionFlags};
