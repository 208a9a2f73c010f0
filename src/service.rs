use std::{sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    alert::AlertPipeline,
    db::{Database, SecurityEvent, SecurityEventKind},
    gesture::ColorFrame,
    settings::SettingsStore,
    source::GestureSource,
    transport::TransportHandle,
    unlock::{LockEvent, Progress, TickOutput, UnlockController},
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Monotonic time that follows tokio's clock, so paused-time tests stay coherent.
fn monotonic_now() -> std::time::Instant {
    time::Instant::now().into_std()
}

/// Runs the polling loop and fans controller output out to the actuator
/// link, the audit store and the alert pipeline.
#[derive(Clone)]
pub struct LockService {
    controller: Arc<Mutex<UnlockController>>,
    db: Database,
    transport: TransportHandle,
    alerts: AlertPipeline,
    settings: Arc<SettingsStore>,
    progress_tx: Arc<watch::Sender<Progress>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    cancel_token: Arc<Mutex<Option<CancellationToken>>>,
    finished: Arc<Mutex<CancellationToken>>,
    tick_interval: Duration,
}

impl LockService {
    pub fn new(
        controller: UnlockController,
        db: Database,
        transport: TransportHandle,
        alerts: AlertPipeline,
        settings: Arc<SettingsStore>,
        tick_interval: Duration,
    ) -> Self {
        let (progress_tx, _) = watch::channel(controller.current_progress());
        // Nothing is running yet, so `finished` resolves immediately.
        let finished = CancellationToken::new();
        finished.cancel();
        Self {
            controller: Arc::new(Mutex::new(controller)),
            db,
            transport,
            alerts,
            settings,
            progress_tx: Arc::new(progress_tx),
            ticker: Arc::new(Mutex::new(None)),
            cancel_token: Arc::new(Mutex::new(None)),
            finished: Arc::new(Mutex::new(finished)),
            tick_interval,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Progress> {
        self.progress_tx.subscribe()
    }

    pub async fn progress(&self) -> Progress {
        self.controller.lock().await.current_progress()
    }

    pub async fn start(&self, source: Box<dyn GestureSource>) -> Result<()> {
        let mut ticker_guard = self.ticker.lock().await;
        if ticker_guard.is_some() {
            bail!("polling loop already running");
        }

        let cancel_token = CancellationToken::new();
        let finished = CancellationToken::new();
        *self.cancel_token.lock().await = Some(cancel_token.clone());
        *self.finished.lock().await = finished.clone();

        let worker = PollWorker {
            controller: self.controller.clone(),
            db: self.db.clone(),
            transport: self.transport.clone(),
            alerts: self.alerts.clone(),
            progress_tx: self.progress_tx.clone(),
        };
        let tick_interval = self.tick_interval;

        let handle = tokio::spawn(async move {
            worker.run(source, tick_interval, cancel_token).await;
            finished.cancel();
        });

        *ticker_guard = Some(handle);
        log_info!("polling loop started ({:?} per tick)", self.tick_interval);
        Ok(())
    }

    /// Resolves once the loop has exited, either because the source ran dry
    /// or because `stop` was called. Resolves at once if it never started.
    pub async fn finished(&self) {
        let token = self.finished.lock().await.clone();
        token.cancelled().await;
    }

    pub async fn stop(&self) -> Result<()> {
        if let Some(token) = self.cancel_token.lock().await.take() {
            token.cancel();
        }

        if let Some(handle) = self.ticker.lock().await.take() {
            handle
                .await
                .context("polling loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }

    /// Installs a new pin, saves it to the settings file and records the change.
    pub async fn set_gestures(&self, first: &str, second: &str, third: &str) -> Result<Progress> {
        let (progress, sequence) = {
            let mut controller = self.controller.lock().await;
            controller.set_gestures(first, second, third, monotonic_now())?;
            (controller.current_progress(), *controller.sequence())
        };

        self.settings
            .update_sequence(&sequence)
            .context("failed to save the new unlock sequence")?;

        self.db
            .insert_security_event(&SecurityEvent::new(
                SecurityEventKind::Reconfigured,
                0,
                sequence.to_string(),
            ))
            .await?;
        self.progress_tx.send_replace(progress.clone());
        Ok(progress)
    }

    /// Operator relock.
    pub async fn lock_door(&self) -> Progress {
        let progress = {
            let mut controller = self.controller.lock().await;
            controller.lock(monotonic_now());
            controller.current_progress()
        };
        self.progress_tx.send_replace(progress.clone());
        progress
    }
}

struct PollWorker {
    controller: Arc<Mutex<UnlockController>>,
    db: Database,
    transport: TransportHandle,
    alerts: AlertPipeline,
    progress_tx: Arc<watch::Sender<Progress>>,
}

impl PollWorker {
    async fn run(
        self,
        mut source: Box<dyn GestureSource>,
        tick_interval: Duration,
        cancel_token: CancellationToken,
    ) {
        let mut interval = time::interval(tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let now = monotonic_now();
                    match source.poll(now) {
                        Some(frame) => {
                            let (output, alert, sequence) = {
                                let mut controller = self.controller.lock().await;
                                let output = controller.tick(&frame, now);
                                let alert = output.alert_raised && controller.take_alert();
                                (output, alert, controller.sequence().to_string())
                            };
                            self.dispatch(output, alert, sequence, frame.color);
                        }
                        None if source.is_finished() => {
                            log_info!("gesture source exhausted");
                            break;
                        }
                        None => {}
                    }
                }
                _ = cancel_token.cancelled() => {
                    log_info!("polling loop shutting down");
                    break;
                }
            }
        }
    }

    fn dispatch(
        &self,
        output: TickOutput,
        alert: bool,
        sequence: String,
        color: Option<ColorFrame>,
    ) {
        for command in &output.commands {
            log_debug!("queueing actuator line {}", command.as_line());
            if let Err(err) = self.transport.dispatch(*command) {
                log_error!("failed to queue {}: {err:#}", command.as_line());
            }
        }

        let mut lockout_attempts = 0;
        for event in &output.events {
            let record = match *event {
                LockEvent::Unlocked => SecurityEvent::new(SecurityEventKind::Unlocked, 0, sequence.clone()),
                LockEvent::AttemptFailed { attempts } => {
                    lockout_attempts = attempts;
                    SecurityEvent::new(SecurityEventKind::AttemptFailed, attempts, sequence.clone())
                }
                // Lockouts are recorded by the alert pipeline together with the evidence.
                _ => continue,
            };
            let db = self.db.clone();
            tokio::spawn(async move {
                if let Err(err) = db.insert_security_event(&record).await {
                    log_warn!("failed to record {}: {err:#}", record.kind.as_str());
                }
            });
        }

        if alert {
            let alerts = self.alerts.clone();
            tokio::spawn(async move {
                alerts.raise(color, lockout_attempts, sequence).await;
            });
        }

        self.progress_tx.send_replace(output.progress);
    }
}
