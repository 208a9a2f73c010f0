use std::time::{Duration, Instant};

use super::{GestureEvent, GestureId, UnlockSequence};

/// Thresholds for accepting gesture events.
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Minimum gap between two accepted events.
    pub debounce: Duration,
    /// Events must be strictly above this to count.
    pub confidence_threshold: f32,
    /// Consecutive failed attempts that raise a lockout.
    pub lockout_threshold: u32,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(2000),
            confidence_threshold: 0.8,
            lockout_threshold: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchState {
    /// Index of the next expected gesture; `UnlockSequence::LEN` once complete.
    pub target_index: usize,
    pub failed_attempts: u32,
    /// Debounce origin. Restarted on attach and on every accepted event.
    pub last_accepted: Instant,
}

impl MatchState {
    pub fn new(now: Instant) -> Self {
        Self {
            target_index: 0,
            failed_attempts: 0,
            last_accepted: now,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.target_index >= UnlockSequence::LEN
    }

    pub fn is_locked(&self) -> bool {
        !self.is_complete()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Below threshold, inside the debounce window, not part of the pin, or already complete.
    Ignored,
    Advanced { matched: usize },
    Completed,
    /// An element of the pin arrived out of order.
    Reset { attempts: u32, lockout: bool },
}

/// Ordered matcher for a three-gesture pin over a noisy event stream.
#[derive(Debug, Clone)]
pub struct SequenceMatcher {
    sequence: UnlockSequence,
    config: MatcherConfig,
    state: MatchState,
}

impl SequenceMatcher {
    pub fn new(sequence: UnlockSequence, config: MatcherConfig, now: Instant) -> Self {
        Self {
            sequence,
            config,
            state: MatchState::new(now),
        }
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    pub fn sequence(&self) -> &UnlockSequence {
        &self.sequence
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Gesture required next, `None` once the pin is complete.
    pub fn expected(&self) -> Option<GestureId> {
        self.sequence.get(self.state.target_index)
    }

    pub fn advance(&mut self, event: &GestureEvent, now: Instant) -> MatchOutcome {
        let Some(expected) = self.expected() else {
            return MatchOutcome::Ignored;
        };

        if event.confidence <= self.config.confidence_threshold {
            return MatchOutcome::Ignored;
        }

        // A clock that went backwards counts as zero elapsed.
        let elapsed = now.saturating_duration_since(self.state.last_accepted);
        if elapsed < self.config.debounce {
            return MatchOutcome::Ignored;
        }

        if event.name == expected.as_str() {
            self.state.target_index += 1;
            self.state.last_accepted = now;
            if self.state.is_complete() {
                self.state.failed_attempts = 0;
                return MatchOutcome::Completed;
            }
            return MatchOutcome::Advanced {
                matched: self.state.target_index,
            };
        }

        // Gestures outside the pin are tolerated as recognition noise.
        if !self.sequence.contains(&event.name) {
            return MatchOutcome::Ignored;
        }

        self.state.last_accepted = now;
        let lockout = self.reset_sequence();
        MatchOutcome::Reset {
            attempts: self.state.failed_attempts,
            lockout,
        }
    }

    /// Counts a failed attempt and rewinds to the first gesture.
    /// Returns true when this attempt reached the lockout threshold; the
    /// counter is cleared so the next attempt starts fresh.
    pub fn reset_sequence(&mut self) -> bool {
        self.state.target_index = 0;
        self.state.failed_attempts += 1;
        if self.state.failed_attempts >= self.config.lockout_threshold {
            self.state.failed_attempts = 0;
            return true;
        }
        false
    }

    /// Installs a new pin. Progress and the attempt counter start over.
    pub fn reconfigure(&mut self, sequence: UnlockSequence, now: Instant) {
        self.sequence = sequence;
        self.state = MatchState::new(now);
    }

    /// Drops progress without counting a failure.
    pub fn restart(&mut self, now: Instant) {
        self.state = MatchState::new(now);
    }
}
