use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::path::PathBuf;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_warn;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityAlert {
    pub occurred_at: DateTime<Utc>,
    pub attempts: u32,
    pub sequence: String,
    pub evidence_path: Option<PathBuf>,
}

impl SecurityAlert {
    pub fn subject(&self) -> &'static str {
        "KinectSecurity Alert"
    }

    pub fn body(&self) -> String {
        let local = self.occurred_at.with_timezone(&Local);
        format!(
            "A user has attempted to unlock your KinectSecurity System at: {}",
            local.format("%d/%m/%y %-I:%M:%S %p")
        )
    }
}

/// Delivers an alert to whoever should hear about it (mail, chat, pager).
pub trait Notifier: Send + Sync {
    fn notify(&self, alert: &SecurityAlert) -> Result<()>;
}

/// Writes alerts to the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, alert: &SecurityAlert) -> Result<()> {
        match &alert.evidence_path {
            Some(path) => log_warn!(
                "{}: {} ({} failed attempts, evidence: {})",
                alert.subject(),
                alert.body(),
                alert.attempts,
                path.display()
            ),
            None => log_warn!(
                "{}: {} ({} failed attempts)",
                alert.subject(),
                alert.body(),
                alert.attempts
            ),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_matches_the_mailed_alert() {
        let alert = SecurityAlert {
            occurred_at: Utc::now(),
            attempts: 3,
            sequence: "Stop_Left,Stop_Right,ThumbUp_Left".to_string(),
            evidence_path: None,
        };
        assert_eq!(alert.subject(), "KinectSecurity Alert");
        assert!(alert
            .body()
            .starts_with("A user has attempted to unlock your KinectSecurity System at: "));
        assert!(LogNotifier.notify(&alert).is_ok());
    }
}
