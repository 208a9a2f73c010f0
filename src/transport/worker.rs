use anyhow::{anyhow, Context, Result};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        mpsc::{self, Sender},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
};

use super::{ActuatorCommand, ActuatorTransport};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

enum LinkCommand {
    Send(ActuatorCommand),
    Shutdown,
}

#[derive(Default)]
struct LinkCounters {
    sent: AtomicU64,
    failed: AtomicU64,
}

/// Owns the actuator transport on its own thread so a slow or broken link
/// never stalls the polling loop.
#[derive(Clone)]
pub struct TransportHandle {
    sender: Sender<LinkCommand>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
    counters: Arc<LinkCounters>,
}

impl TransportHandle {
    pub fn spawn<T>(mut transport: T) -> Result<Self>
    where
        T: ActuatorTransport + 'static,
    {
        let (tx, rx) = mpsc::channel::<LinkCommand>();
        let counters = Arc::new(LinkCounters::default());
        let worker_counters = Arc::clone(&counters);

        let worker = thread::Builder::new()
            .name("gesturelock-link".into())
            .spawn(move || {
                while let Ok(command) = rx.recv() {
                    match command {
                        LinkCommand::Send(command) => match transport.send(&command) {
                            Ok(()) => {
                                worker_counters.sent.fetch_add(1, Ordering::SeqCst);
                            }
                            Err(err) => {
                                worker_counters.failed.fetch_add(1, Ordering::SeqCst);
                                log_error!("actuator command {:?} failed: {err:#}", command.as_line());
                            }
                        },
                        LinkCommand::Shutdown => break,
                    }
                }
                log_info!("Actuator link thread shutting down");
            })
            .context("failed to spawn actuator link thread")?;

        Ok(Self {
            sender: tx,
            worker: Arc::new(Mutex::new(Some(worker))),
            counters,
        })
    }

    /// Queues a command; never blocks on the device.
    pub fn dispatch(&self, command: ActuatorCommand) -> Result<()> {
        self.sender
            .send(LinkCommand::Send(command))
            .map_err(|err| anyhow!("actuator link thread is gone: {err}"))
    }

    pub fn sent_count(&self) -> u64 {
        self.counters.sent.load(Ordering::SeqCst)
    }

    pub fn failed_count(&self) -> u64 {
        self.counters.failed.load(Ordering::SeqCst)
    }

    /// Drains queued commands, then closes the link.
    pub fn shutdown(&self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(LinkCommand::Shutdown) {
                log_error!("Failed to send shutdown to actuator link thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                log_error!("Failed to join actuator link thread: {join_err:?}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::ArmAxis;
    use crate::transport::RecordingTransport;

    struct BrokenLink;

    impl ActuatorTransport for BrokenLink {
        fn send(&mut self, _command: &ActuatorCommand) -> Result<()> {
            Err(anyhow!("port closed"))
        }
    }

    #[test]
    fn delivers_in_order_before_shutdown() {
        let recorder = RecordingTransport::new();
        let handle = TransportHandle::spawn(recorder.clone()).unwrap();
        handle.dispatch(ActuatorCommand::Unlock).unwrap();
        handle
            .dispatch(ActuatorCommand::Arm {
                axis: ArmAxis::X,
                degrees: 45.0,
            })
            .unwrap();
        handle.shutdown();

        assert_eq!(handle.sent_count(), 2);
        assert_eq!(
            recorder.sent(),
            vec![
                ActuatorCommand::Unlock,
                ActuatorCommand::Arm {
                    axis: ArmAxis::X,
                    degrees: 45.0
                }
            ]
        );
    }

    #[test]
    fn failures_are_counted_not_raised() {
        let handle = TransportHandle::spawn(BrokenLink).unwrap();
        handle.dispatch(ActuatorCommand::Unlock).unwrap();
        handle.shutdown();
        assert_eq!(handle.failed_count(), 1);
        assert_eq!(handle.sent_count(), 0);
        assert!(handle.dispatch(ActuatorCommand::Unlock).is_err());
    }
}
