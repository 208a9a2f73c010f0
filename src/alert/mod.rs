pub mod evidence;
pub mod notifier;

pub use evidence::save_evidence;
pub use notifier::{LogNotifier, Notifier, SecurityAlert};

use anyhow::Context;
use chrono::Utc;
use std::{path::PathBuf, sync::Arc};

use crate::db::{Database, SecurityEvent, SecurityEventKind};
use crate::gesture::ColorFrame;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

/// Lockout side effects: evidence snapshot, audit row, notification.
/// Every step is best effort; a failing step is logged and the rest still run.
#[derive(Clone)]
pub struct AlertPipeline {
    db: Database,
    alerts_dir: PathBuf,
    notifier: Arc<dyn Notifier>,
}

impl AlertPipeline {
    pub fn new(db: Database, alerts_dir: PathBuf, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            db,
            alerts_dir,
            notifier,
        }
    }

    pub async fn raise(
        &self,
        frame: Option<ColorFrame>,
        attempts: u32,
        sequence: String,
    ) -> SecurityAlert {
        let occurred_at = Utc::now();

        let evidence_path = match frame {
            Some(frame) => {
                let dir = self.alerts_dir.clone();
                let saved = tokio::task::spawn_blocking(move || {
                    save_evidence(&frame, &dir, occurred_at)
                })
                .await
                .context("evidence worker join failed")
                .and_then(|result| result);
                match saved {
                    Ok(path) => {
                        log_info!("Evidence saved in {}", path.display());
                        Some(path)
                    }
                    Err(err) => {
                        log_error!("failed to save alert evidence: {err:#}");
                        None
                    }
                }
            }
            None => None,
        };

        let alert = SecurityAlert {
            occurred_at,
            attempts,
            sequence,
            evidence_path,
        };

        let mut event = SecurityEvent::new(SecurityEventKind::Lockout, attempts, alert.sequence.clone());
        event.occurred_at = occurred_at;
        event.evidence_path = alert
            .evidence_path
            .as_ref()
            .map(|path| path.display().to_string());
        if let Err(err) = self.db.insert_security_event(&event).await {
            log_error!("failed to record lockout: {err:#}");
        }

        let notifier = Arc::clone(&self.notifier);
        let to_send = alert.clone();
        match tokio::task::spawn_blocking(move || notifier.notify(&to_send)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => log_error!("alert notification failed: {err:#}"),
            Err(err) => log_error!("alert notifier worker join failed: {err}"),
        }

        alert
    }
}
