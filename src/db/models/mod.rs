pub mod security_event;

pub use security_event::{SecurityEvent, SecurityEventKind};
