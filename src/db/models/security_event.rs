//! Audit records for the lock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SecurityEventKind {
    Unlocked,
    AttemptFailed,
    Lockout,
    Reconfigured,
}

impl SecurityEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEventKind::Unlocked => "Unlocked",
            SecurityEventKind::AttemptFailed => "AttemptFailed",
            SecurityEventKind::Lockout => "Lockout",
            SecurityEventKind::Reconfigured => "Reconfigured",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityEvent {
    pub id: String,
    pub occurred_at: DateTime<Utc>,
    pub kind: SecurityEventKind,
    /// Failed attempts counted at the time of the event.
    pub attempts: u32,
    /// Active pin, comma separated.
    pub sequence: String,
    pub evidence_path: Option<String>,
}

impl SecurityEvent {
    pub fn new(kind: SecurityEventKind, attempts: u32, sequence: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            occurred_at: Utc::now(),
            kind,
            attempts,
            sequence: sequence.into(),
            evidence_path: None,
        }
    }
}
