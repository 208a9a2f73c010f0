use rand::{rngs::StdRng, Rng, SeedableRng};
use std::time::{Duration, Instant};

use crate::gesture::{GestureEvent, GestureId, SensorFrame, UnlockSequence, WristPosition};

use super::GestureSource;

/// Name of a gesture present in the database but never part of a pin.
const NOISE_GESTURE: &str = "HandsUp";
const NOISE_CEILING: f32 = 0.6;

/// Bench-test stand-in for the sensor: a single tracked body that performs
/// `sequence` one gesture per `pace`, with low-confidence noise on every
/// other gesture and a wandering wrist.
pub struct SimulatedSource {
    rng: StdRng,
    sequence: UnlockSequence,
    pace: Duration,
    /// Chance that a performed gesture is replaced by a wrong pin element.
    mistake_rate: f64,
    next_index: usize,
    last_performed: Option<Instant>,
    wrist_x: f32,
}

impl SimulatedSource {
    pub fn new(sequence: UnlockSequence, pace: Duration, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            sequence,
            pace,
            mistake_rate: 0.0,
            next_index: 0,
            last_performed: None,
            wrist_x: 0.0,
        }
    }

    pub fn with_mistake_rate(mut self, rate: f64) -> Self {
        self.mistake_rate = rate.clamp(0.0, 1.0);
        self
    }

    fn performed_gesture(&mut self) -> GestureId {
        let index = self.next_index;
        let intended = self.sequence.get(index).unwrap_or(GestureId::StopLeft);
        self.next_index = (index + 1) % UnlockSequence::LEN;

        if self.rng.gen_bool(self.mistake_rate) {
            let offset = self.rng.gen_range(1..UnlockSequence::LEN);
            let wrong = self
                .sequence
                .get((index + offset) % UnlockSequence::LEN)
                .unwrap_or(intended);
            if wrong != intended {
                self.next_index = 0;
                return wrong;
            }
        }
        intended
    }
}

impl GestureSource for SimulatedSource {
    fn poll(&mut self, now: Instant) -> Option<SensorFrame> {
        // The first gesture comes one pace after the body appears.
        let last = *self.last_performed.get_or_insert(now);
        let due = now.saturating_duration_since(last) >= self.pace;
        let performed = if due {
            self.last_performed = Some(now);
            Some(self.performed_gesture())
        } else {
            None
        };

        let mut gestures: Vec<GestureEvent> = GestureId::ALL
            .iter()
            .filter(|id| Some(**id) != performed)
            .map(|id| GestureEvent::new(id.as_str(), self.rng.gen_range(0.0..NOISE_CEILING)))
            .collect();
        gestures.push(GestureEvent::new(
            NOISE_GESTURE,
            self.rng.gen_range(0.0..1.0),
        ));
        if let Some(id) = performed {
            gestures.push(GestureEvent::new(id.as_str(), self.rng.gen_range(0.85..1.0)));
        }

        self.wrist_x = (self.wrist_x + self.rng.gen_range(-0.02..0.02)).clamp(-0.9, 0.9);

        Some(SensorFrame {
            tracking_id: 1,
            gestures,
            wrist: Some(WristPosition {
                x: self.wrist_x,
                y: 0.1,
                z: 1.8,
            }),
            color: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unlock::{ControllerConfig, UnlockController};

    #[test]
    fn careful_operator_unlocks_despite_noise() {
        let sequence = UnlockSequence::default();
        let mut source = SimulatedSource::new(sequence, Duration::from_millis(2500), 42);
        let mut controller =
            UnlockController::new(sequence, ControllerConfig::default()).unwrap();

        let start = Instant::now();
        let mut unlocked_at = None;
        for tick in 0..1000u32 {
            let now = start + Duration::from_millis(16) * tick;
            let frame = source.poll(now).unwrap();
            let out = controller.tick(&frame, now);
            if out.progress.unlocked {
                unlocked_at = Some(tick);
                break;
            }
        }
        assert!(unlocked_at.is_some());
        assert_eq!(controller.current_progress().attempts_used, 0);
    }

    #[test]
    fn clumsy_operator_eventually_trips_lockout() {
        let sequence = UnlockSequence::default();
        let mut source =
            SimulatedSource::new(sequence, Duration::from_millis(2100), 7).with_mistake_rate(1.0);
        let mut controller =
            UnlockController::new(sequence, ControllerConfig::default()).unwrap();

        let start = Instant::now();
        let mut alerts = 0;
        for tick in 0..2000u32 {
            let now = start + Duration::from_millis(16) * tick;
            let frame = source.poll(now).unwrap();
            if controller.tick(&frame, now).alert_raised {
                alerts += 1;
            }
        }
        assert!(alerts >= 1);
        assert!(!controller.current_progress().unlocked);
    }
}
