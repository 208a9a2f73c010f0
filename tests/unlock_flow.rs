//! End-to-end checks of the lock through its public surface: a tracked body
//! performs gestures, the controller emits actuator commands, and the arm
//! follows the wrist once the door is open.

use std::time::{Duration, Instant};

use gesturelock_lib::{
    arm::ArmAxis,
    gesture::{GestureEvent, GestureId, SensorFrame, WristPosition},
    transport::ActuatorCommand,
    unlock::{ControllerConfig, DisplayState, LockEvent, UnlockController},
};

const BODY: u64 = 11;

fn frame(gestures: &[(&str, f32)]) -> SensorFrame {
    SensorFrame {
        tracking_id: BODY,
        gestures: gestures
            .iter()
            .map(|(name, confidence)| GestureEvent::new(*name, *confidence))
            .collect(),
        wrist: None,
        color: None,
    }
}

/// Attaches to the body and returns the first instant a gesture can be accepted.
fn attached(controller: &mut UnlockController) -> Instant {
    let attach = Instant::now();
    let out = controller.tick(&frame(&[]), attach);
    assert_eq!(out.events, vec![LockEvent::TrackingAcquired { tracking_id: BODY }]);
    attach + Duration::from_millis(2000)
}

fn controller() -> UnlockController {
    UnlockController::from_names(
        &["Stop_Left", "Stop_Right", "ThumbUp_Left"],
        ControllerConfig::default(),
    )
    .unwrap()
}

#[test]
fn correct_pin_with_spacing_unlocks() {
    let mut c = controller();
    let t0 = attached(&mut c);

    c.tick(&frame(&[("Stop_Left", 0.95)]), t0);
    c.tick(&frame(&[("Stop_Right", 0.9)]), t0 + Duration::from_millis(2100));
    let out = c.tick(&frame(&[("ThumbUp_Left", 0.99)]), t0 + Duration::from_millis(4300));

    assert!(out.progress.unlocked);
    assert_eq!(out.progress.attempts_used, 0);
    assert_eq!(out.progress.display, DisplayState::Unlocked);
    assert_eq!(out.commands, vec![ActuatorCommand::Unlock]);
}

#[test]
fn out_of_order_gesture_resets_progress() {
    let mut c = controller();
    let t0 = attached(&mut c);

    c.tick(&frame(&[("Stop_Left", 0.95)]), t0);
    let out = c.tick(&frame(&[("ThumbUp_Left", 0.9)]), t0 + Duration::from_millis(2100));

    assert_eq!(out.progress.matched_count, 0);
    assert_eq!(out.progress.attempts_used, 1);
    assert_eq!(out.progress.expected, Some(GestureId::StopLeft));
    assert!(out.commands.is_empty());
}

#[test]
fn lockout_alert_is_delivered_exactly_once() {
    let mut c = controller();
    let mut now = attached(&mut c);

    let mut raised = 0;
    for _ in 0..3 {
        if c.tick(&frame(&[("Stop_Right", 0.95)]), now).alert_raised {
            raised += 1;
        }
        now += Duration::from_millis(2100);
    }

    assert_eq!(raised, 1);
    assert!(c.take_alert());
    assert!(!c.take_alert());
    assert_eq!(c.current_progress().attempts_used, 0);
}

#[test]
fn arm_follows_the_wrist_after_unlock() {
    let mut c = controller();
    let t0 = attached(&mut c);
    for (offset, name) in [(0, "Stop_Left"), (2100, "Stop_Right"), (4300, "ThumbUp_Left")] {
        c.tick(&frame(&[(name, 0.95)]), t0 + Duration::from_millis(offset));
    }

    let mut moving = frame(&[]);
    moving.wrist = Some(WristPosition {
        x: 0.0,
        y: 0.2,
        z: 1.6,
    });
    let out = c.tick(&moving, t0 + Duration::from_millis(4400));
    assert_eq!(
        out.commands,
        vec![ActuatorCommand::Arm {
            axis: ArmAxis::X,
            degrees: 90.0
        }]
    );
    assert_eq!(out.commands[0].as_line(), "X,90.0");

    // Losing the body ends the teleop session.
    let lost = SensorFrame::default();
    let out = c.tick(&lost, t0 + Duration::from_millis(4500));
    assert_eq!(out.events, vec![LockEvent::TrackingLost]);
    assert!(c.arm_state().is_none());
    assert!(!out.progress.tracked);
}
