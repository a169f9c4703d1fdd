//! Finite-state gesture recognizer.
//!
//! Only finger slots 0 and 1 drive the machine; further fingers are tracked in
//! the touch info but produce no events.  Every completed gesture cycles back
//! to [`DetectorState::None`].  An event the current state does not expect
//! aborts the gesture silently; a timer that fires into a state that no longer
//! wants it is dropped.
use log::{debug, warn};
use strum::Display;

use crate::config::Thresholds;
use crate::detector::{DetectorCore, GestureDetector, GestureProcessor, valid_finger};
use crate::timer::SingleShotTimer;
use crate::touch::{
    GestureKind, MAX_FINGERS, RuntimeTouchInfo, TouchPoint, get_trajectory_effective_length,
};
use crate::view::MapView;

/// Input to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ViewEvent {
    FingerDown,
    FingerMove,
    FingerUp,
    Finger2Down,
    Finger2Move,
    Finger2Up,
    TapTimer,
    LongPressTimer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum DetectorState {
    #[default]
    None,
    Pressed,
    Clicked,
    LongPressed,
    SecondPressed,
    SecondClicked,
    SecondLongPressed,
    Moving,
    MovingAfterSecondPress,
    Finger2Moving,
    Finger2Pressed,
    Finger1Pressed,
    TwoFingersPressed,
    TwoFingersClicked,
    TwoFingersMoving,
}

/// Double taps tolerate four times the single-tap click area between the two
/// release points.
const DOUBLE_TAP_AREA_FACTOR: u32 = 4;

#[derive(Debug)]
pub struct StateMachineDetector<V, P> {
    core: DetectorCore<V, P>,
    state: DetectorState,
    tap_timer: SingleShotTimer,
    panning: [bool; MAX_FINGERS],
    two_finger_contact: bool,
}

impl<V: MapView, P: GestureProcessor> StateMachineDetector<V, P> {
    pub fn new(view: V, processor: P, thresholds: Thresholds) -> Self {
        Self {
            core: DetectorCore::new(view, processor, thresholds),
            state: DetectorState::None,
            tap_timer: SingleShotTimer::default(),
            panning: [false; MAX_FINGERS],
            two_finger_contact: false,
        }
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    pub fn history(&self) -> &RuntimeTouchInfo {
        &self.core.info_history
    }

    pub fn view(&self) -> &V {
        &self.core.view
    }

    /// Fire due timers in deadline order.  Firing one may cancel the other.
    fn poll_timers(&mut self, now: u32) {
        let long_press = self.core.long_press_timer.deadline();
        let tap = self.tap_timer.deadline();
        let order = match (long_press, tap) {
            (Some(l), Some(t)) if t < l => [ViewEvent::TapTimer, ViewEvent::LongPressTimer],
            _ => [ViewEvent::LongPressTimer, ViewEvent::TapTimer],
        };
        for event in order {
            let fired = match event {
                ViewEvent::TapTimer => self.tap_timer.fire_if_due(now),
                _ => self.core.long_press_timer.fire_if_due(now),
            };
            if fired {
                self.state_machine_on_event(event, now);
            }
        }
    }

    fn set_state(&mut self, state: DetectorState) {
        if self.state != state {
            debug!("State {} -> {state}", self.state);
        }
        self.state = state;
    }

    fn state_machine_on_event(&mut self, event: ViewEvent, now: u32) {
        use DetectorState as S;
        use ViewEvent as E;

        let click_duration = self.core.thresholds.click_duration;
        let double_click_duration = self.core.thresholds.double_click_duration;

        match (self.state, event) {
            (S::None, E::FingerDown) => {
                self.begin_gesture(now);
                self.set_state(S::Pressed);
            }
            (S::None, E::Finger2Down) => {
                self.core.capture_view_state();
                self.set_state(S::Finger2Pressed);
            }

            (S::Pressed, E::FingerMove) => {
                self.core.stop_long_press_timer();
                if self.core.finger_dragged_enough(0) {
                    self.set_state(S::Moving);
                    self.detected_pan(0);
                }
            }
            (S::Pressed, E::FingerUp) => {
                self.core.stop_long_press_timer();
                if self.core.finger_pressed_enough(0, 0, click_duration) {
                    self.core.archive();
                    self.tap_timer.start(now, double_click_duration);
                    self.set_state(S::Clicked);
                } else {
                    self.finish_gesture();
                }
            }
            (S::Pressed, E::LongPressTimer) => {
                if self.core.info.fingers_pressed == 1 {
                    self.set_state(S::LongPressed);
                    self.detected_long_press();
                }
            }
            (S::Pressed | S::LongPressed | S::SecondLongPressed, E::Finger2Down) => {
                self.enter_two_fingers();
            }

            (S::Clicked, E::FingerDown) => {
                let gap = self.core.info.finger_down[0]
                    .timestamp
                    .saturating_sub(self.core.info_history.finger_up[0].timestamp);
                self.core.capture_view_state();
                self.core.start_long_press_timer(now);
                if gap < double_click_duration {
                    self.tap_timer.start(now, double_click_duration);
                    self.set_state(S::SecondPressed);
                } else {
                    self.tap_timer.cancel();
                    self.set_state(S::Pressed);
                }
            }
            (S::Clicked, E::TapTimer) => {
                self.detected_tap();
                self.finish_gesture();
            }

            (S::SecondPressed, E::FingerUp) => {
                self.core.stop_long_press_timer();
                let info = &self.core.info;
                let close = get_trajectory_effective_length(
                    &self.core.info_history.finger_up[0],
                    &info.finger_up[0],
                ) < DOUBLE_TAP_AREA_FACTOR.saturating_mul(self.core.thresholds.click_area);
                if close && self.core.finger_pressed_enough(0, 0, click_duration) {
                    self.tap_timer.cancel();
                    self.set_state(S::SecondClicked);
                    self.detected_double_tap();
                    self.finish_gesture();
                } else {
                    self.core.archive();
                    self.tap_timer.start(now, double_click_duration);
                    self.set_state(S::Clicked);
                }
            }
            (S::SecondPressed, E::TapTimer) => {
                self.detected_tap();
                self.finish_gesture();
            }
            (S::SecondPressed, E::LongPressTimer) => {
                if self.core.info.fingers_pressed == 1 {
                    self.tap_timer.cancel();
                    self.set_state(S::SecondLongPressed);
                    self.detected_second_long_press();
                }
            }
            (S::SecondPressed, E::FingerMove) => {
                self.core.stop_long_press_timer();
                if self.core.finger_dragged_enough(0) {
                    self.tap_timer.cancel();
                    self.set_state(S::Moving);
                    self.detected_pan(0);
                }
            }
            (S::SecondPressed, E::Finger2Down) => {
                self.tap_timer.cancel();
                self.enter_two_fingers();
            }

            (S::LongPressed, E::FingerMove) => {
                if self.core.finger_dragged_enough(0) {
                    self.set_state(S::Moving);
                    self.detected_pan(0);
                }
            }
            (S::SecondLongPressed, E::FingerMove) => {
                if self.core.finger_dragged_enough(0) {
                    self.set_state(S::MovingAfterSecondPress);
                    self.detected_pan(0);
                }
            }
            (S::LongPressed | S::SecondLongPressed, E::FingerUp) => self.finish_gesture(),

            (S::Moving | S::MovingAfterSecondPress, E::FingerMove) => self.detected_pan(0),
            (S::Moving | S::MovingAfterSecondPress, E::FingerUp) => {
                self.finish_panning(0);
                self.finish_gesture();
            }
            (S::Moving | S::MovingAfterSecondPress, E::Finger2Down) => {
                self.finish_panning(0);
                self.enter_two_fingers();
            }

            (S::TwoFingersPressed, E::FingerMove | E::Finger2Move) => {
                if self.core.finger_dragged_enough(0) || self.core.finger_dragged_enough(1) {
                    self.set_state(S::TwoFingersMoving);
                    self.detected_zoom_rotate();
                }
            }
            (S::TwoFingersPressed, E::FingerUp) => self.set_state(S::Finger2Pressed),
            (S::TwoFingersPressed, E::Finger2Up) => self.set_state(S::Finger1Pressed),

            (S::Finger1Pressed, E::FingerUp) | (S::Finger2Pressed, E::Finger2Up) => {
                if self.two_fingers_clicked() {
                    self.set_state(S::TwoFingersClicked);
                    self.detected_two_finger_tap();
                }
                self.finish_gesture();
            }
            (S::Finger1Pressed, E::Finger2Down) | (S::Finger2Pressed, E::FingerDown) => {
                self.enter_two_fingers();
            }
            (S::Finger1Pressed, E::FingerMove) => {
                if self.core.finger_dragged_enough(0) {
                    self.set_state(S::Moving);
                    self.detected_pan(0);
                }
            }
            (S::Finger2Pressed, E::Finger2Move) => {
                if self.core.finger_dragged_enough(1) {
                    self.set_state(S::Finger2Moving);
                    self.detected_pan(1);
                }
            }

            (S::Finger2Moving, E::Finger2Move) => self.detected_pan(1),
            (S::Finger2Moving, E::Finger2Up) => {
                self.finish_panning(1);
                self.finish_gesture();
            }
            (S::Finger2Moving, E::FingerDown) => {
                self.finish_panning(1);
                self.enter_two_fingers();
            }

            (S::TwoFingersMoving, E::FingerMove | E::Finger2Move) => self.detected_zoom_rotate(),
            (S::TwoFingersMoving, E::FingerUp) => {
                self.finish_zoom_rotate();
                self.set_state(S::Finger2Moving);
            }
            (S::TwoFingersMoving, E::Finger2Up) => {
                self.finish_zoom_rotate();
                self.set_state(S::Moving);
            }

            (state, E::TapTimer | E::LongPressTimer) => {
                debug!("Dropping {event} in state {state}");
            }
            (state, event) => {
                warn!("Unexpected {event} in state {state}, abandoning gesture");
                self.abort_gesture();
            }
        }
    }

    fn begin_gesture(&mut self, now: u32) {
        self.core.capture_view_state();
        self.core.start_long_press_timer(now);
    }

    fn enter_two_fingers(&mut self) {
        self.core.stop_long_press_timer();
        self.two_finger_contact = true;
        self.set_state(DetectorState::TwoFingersPressed);
    }

    /// Gesture complete: clear per-gesture state and return to `None`.
    fn finish_gesture(&mut self) {
        self.tap_timer.cancel();
        self.panning = [false; MAX_FINGERS];
        self.two_finger_contact = false;
        self.core.reset();
        self.set_state(DetectorState::None);
    }

    /// Drop to `None` without touching the recorded fingers.
    fn abort_gesture(&mut self) {
        self.tap_timer.cancel();
        self.core.stop_long_press_timer();
        self.panning = [false; MAX_FINGERS];
        self.two_finger_contact = false;
        self.set_state(DetectorState::None);
    }

    /// Report the end of a pan, if one was reported for `finger`.
    fn finish_panning(&mut self, finger: usize) {
        if !std::mem::take(&mut self.panning[finger]) {
            return;
        }
        self.core
            .notify(GestureKind::Pan, |p, info| p.on_panning_finished(finger, info));
        self.core.capture_view_state();
        self.core.info.rebase_pressed_fingers();
    }

    fn finish_zoom_rotate(&mut self) {
        self.core.capture_view_state();
        self.core.info.rebase_pressed_fingers();
    }

    fn two_fingers_clicked(&self) -> bool {
        let click_area = self.core.thresholds.click_area;
        let click_duration = self.core.thresholds.click_duration;
        let info = &self.core.info;
        self.two_finger_contact
            && (0..2).all(|f| {
                self.core.finger_pressed_enough(f, 0, click_duration)
                    && get_trajectory_effective_length(&info.finger_down[f], &info.finger_up[f])
                        < click_area
            })
    }

    fn detected_tap(&mut self) {
        self.core.notify(GestureKind::Tap, |p, info| p.on_tap(info));
    }

    fn detected_double_tap(&mut self) {
        self.core
            .notify(GestureKind::DoubleTap, |p, info| p.on_double_tap(info));
    }

    fn detected_long_press(&mut self) {
        self.core
            .notify(GestureKind::LongPress, |p, info| p.on_long_press(info));
    }

    fn detected_second_long_press(&mut self) {
        self.core
            .notify(GestureKind::LongPress, |p, info| p.on_second_long_press(info));
    }

    fn detected_pan(&mut self, finger: usize) {
        self.panning[finger] = true;
        self.core
            .notify(GestureKind::Pan, |p, info| p.on_pan(finger, info));
    }

    fn detected_zoom_rotate(&mut self) {
        self.core
            .notify(GestureKind::ZoomRotate, |p, info| p.on_zoom_rotate(info));
    }

    fn detected_two_finger_tap(&mut self) {
        self.core
            .notify(GestureKind::TwoFingerTap, |p, info| p.on_two_finger_tap(info));
    }
}

impl<V: MapView, P: GestureProcessor> GestureDetector for StateMachineDetector<V, P> {
    type Processor = P;

    fn tap(&mut self, finger: usize, tp: TouchPoint) {
        if !valid_finger(finger) {
            return;
        }
        self.poll_timers(tp.timestamp);
        self.core.info.record_down(finger, tp);
        match finger {
            0 => self.state_machine_on_event(ViewEvent::FingerDown, tp.timestamp),
            1 => self.state_machine_on_event(ViewEvent::Finger2Down, tp.timestamp),
            _ => debug!("Finger {finger} down tracked only"),
        }
    }

    fn move_to(&mut self, finger: usize, tp: TouchPoint) {
        if !valid_finger(finger) {
            return;
        }
        self.poll_timers(tp.timestamp);
        self.core.info.record_move(finger, tp);
        match finger {
            0 => self.state_machine_on_event(ViewEvent::FingerMove, tp.timestamp),
            1 => self.state_machine_on_event(ViewEvent::Finger2Move, tp.timestamp),
            _ => {}
        }
    }

    fn up(&mut self, finger: usize, tp: TouchPoint) {
        if !valid_finger(finger) {
            return;
        }
        self.poll_timers(tp.timestamp);
        self.core.info.record_up(finger, tp);
        match finger {
            0 => self.state_machine_on_event(ViewEvent::FingerUp, tp.timestamp),
            1 => self.state_machine_on_event(ViewEvent::Finger2Up, tp.timestamp),
            _ => debug!("Finger {finger} up tracked only"),
        }
    }

    fn halt_gesture(&mut self) {
        if !self.is_busy() {
            return;
        }
        debug!("Halting gesture in state {}", self.state);
        self.finish_gesture();
    }

    fn on_idle(&mut self, now: u32) {
        self.poll_timers(now);
    }

    fn is_busy(&self) -> bool {
        self.state != DetectorState::None
            || self.tap_timer.is_pending()
            || self.core.long_press_timer.is_pending()
    }

    fn info(&self) -> &RuntimeTouchInfo {
        &self.core.info
    }

    fn processor(&self) -> &P {
        &self.core.processor
    }

    fn processor_mut(&mut self) -> &mut P {
        &mut self.core.processor
    }
}
