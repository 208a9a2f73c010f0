use anyhow::{bail, Result};
use std::time::{Duration, Instant};

use crate::arm::{ArmAxis, ArmState};
use crate::gesture::{
    MatchOutcome, MatcherConfig, SensorFrame, SequenceMatcher, UnlockSequence,
};
use crate::transport::ActuatorCommand;

use super::{DisplayState, LockEvent, Progress, TickOutput};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub matcher: MatcherConfig,
    pub arm_axis: ArmAxis,
    /// Minimum gap between arm commands; zero relays every tick.
    pub arm_interval: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            matcher: MatcherConfig::default(),
            arm_axis: ArmAxis::X,
            arm_interval: Duration::ZERO,
        }
    }
}

impl ControllerConfig {
    fn validate(&self) -> Result<()> {
        let threshold = self.matcher.confidence_threshold;
        if !(0.0..1.0).contains(&threshold) {
            bail!("confidence threshold must be in [0, 1), got {threshold}");
        }
        if self.matcher.lockout_threshold == 0 {
            bail!("lockout threshold must be at least 1");
        }
        Ok(())
    }
}

/// Drives the pin matcher for whichever body is currently tracked and turns
/// its outcomes into actuator commands and a one-shot security alert.
pub struct UnlockController {
    sequence: UnlockSequence,
    config: ControllerConfig,
    tracking_id: u64,
    /// `None` while no body is tracked; evaluation is paused.
    matcher: Option<SequenceMatcher>,
    arm: Option<ArmState>,
    last_arm_command: Option<Instant>,
    should_alert: bool,
}

impl UnlockController {
    pub fn new(sequence: UnlockSequence, config: ControllerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            sequence,
            config,
            tracking_id: 0,
            matcher: None,
            arm: None,
            last_arm_command: None,
            should_alert: false,
        })
    }

    /// Builds a controller from operator-supplied names, failing on anything
    /// that is not exactly three known gestures.
    pub fn from_names<S: AsRef<str>>(names: &[S], config: ControllerConfig) -> Result<Self> {
        let sequence = UnlockSequence::from_names(names)?;
        Self::new(sequence, config)
    }

    pub fn sequence(&self) -> &UnlockSequence {
        &self.sequence
    }

    pub fn tracking_id(&self) -> u64 {
        self.tracking_id
    }

    pub fn is_paused(&self) -> bool {
        self.matcher.is_none()
    }

    pub fn arm_state(&self) -> Option<&ArmState> {
        self.arm.as_ref()
    }

    /// Replaces the pin. Progress and attempts start over and the next
    /// expected gesture becomes the new first element.
    pub fn set_gestures(&mut self, first: &str, second: &str, third: &str, now: Instant) -> Result<()> {
        let sequence = UnlockSequence::parse(first, second, third)?;
        self.sequence = sequence;
        if let Some(matcher) = self.matcher.as_mut() {
            matcher.reconfigure(sequence, now);
        }
        self.end_teleop();
        log_info!("unlock sequence set to {}", sequence);
        Ok(())
    }

    /// Attaches to a newly valid tracking id or pauses on tracking loss.
    /// Returns the lifecycle event, if any.
    pub fn set_tracking(&mut self, tracking_id: u64, now: Instant) -> Option<LockEvent> {
        if tracking_id == self.tracking_id {
            return None;
        }
        self.tracking_id = tracking_id;
        self.end_teleop();

        if tracking_id == 0 {
            self.matcher = None;
            log_info!("body tracking lost; matcher paused");
            return Some(LockEvent::TrackingLost);
        }

        self.matcher = Some(SequenceMatcher::new(
            self.sequence,
            self.config.matcher.clone(),
            now,
        ));
        log_info!("attached to tracking id {tracking_id}");
        Some(LockEvent::TrackingAcquired { tracking_id })
    }

    /// Processes one polling tick.
    pub fn tick(&mut self, frame: &SensorFrame, now: Instant) -> TickOutput {
        let mut output = TickOutput::default();

        if let Some(event) = self.set_tracking(frame.tracking_id, now) {
            output.events.push(event);
        }

        if let Some(matcher) = self.matcher.as_mut() {
            for gesture in &frame.gestures {
                match matcher.advance(gesture, now) {
                    MatchOutcome::Ignored => {}
                    MatchOutcome::Advanced { matched } => {
                        log_info!("gesture {} matched ({matched}/3)", gesture.name);
                        output.events.push(LockEvent::Advanced { matched });
                    }
                    MatchOutcome::Completed => {
                        log_info!("unlock sequence complete");
                        output.events.push(LockEvent::Unlocked);
                        output.commands.push(ActuatorCommand::Unlock);
                        self.arm = Some(ArmState::new(self.config.arm_axis));
                        self.last_arm_command = None;
                    }
                    MatchOutcome::Reset { attempts, lockout } => {
                        let attempts = if lockout {
                            self.config.matcher.lockout_threshold
                        } else {
                            attempts
                        };
                        log_warn!(
                            "gesture {} out of order; attempt {attempts} failed",
                            gesture.name
                        );
                        output.events.push(LockEvent::AttemptFailed { attempts });
                        if lockout {
                            log_warn!("lockout reached; raising security alert");
                            self.should_alert = true;
                            output.alert_raised = true;
                            output.events.push(LockEvent::Lockout);
                        }
                    }
                }
            }
        }

        if let Some(command) = self.step_arm(frame, now) {
            output.commands.push(command);
        }

        output.progress = self.current_progress();
        output
    }

    fn step_arm(&mut self, frame: &SensorFrame, now: Instant) -> Option<ActuatorCommand> {
        let wrist = frame.wrist?;
        let arm = self.arm.as_mut()?;

        if let Some(last) = self.last_arm_command {
            if now.saturating_duration_since(last) < self.config.arm_interval {
                return None;
            }
        }

        let update = arm.step(wrist);
        self.last_arm_command = Some(now);
        Some(ActuatorCommand::Arm {
            axis: arm.axis,
            degrees: update.degrees,
        })
    }

    fn end_teleop(&mut self) {
        self.arm = None;
        self.last_arm_command = None;
    }

    /// Operator relock: progress restarts, no failure is counted.
    pub fn lock(&mut self, now: Instant) {
        if let Some(matcher) = self.matcher.as_mut() {
            matcher.restart(now);
        }
        self.end_teleop();
    }

    pub fn current_progress(&self) -> Progress {
        let Some(matcher) = self.matcher.as_ref() else {
            return Progress {
                should_alert: self.should_alert,
                ..Progress::default()
            };
        };

        let state = matcher.state();
        let unlocked = state.is_complete();
        Progress {
            matched_count: state.target_index,
            unlocked,
            attempts_used: state.failed_attempts,
            should_alert: self.should_alert,
            tracked: true,
            expected: matcher.expected(),
            display: if unlocked {
                DisplayState::Unlocked
            } else {
                DisplayState::Locked {
                    matched: state.target_index,
                }
            },
        }
    }

    /// Read-and-clear of the one-shot alert flag.
    pub fn take_alert(&mut self) -> bool {
        std::mem::take(&mut self.should_alert)
    }
}
