//! Heuristic recognizer: independent gesture tests evaluated in priority
//! order on every `move`/`up`, first match wins.
//!
//! Cheaper and less precise than [`crate::statemachine`]: taps fire on release
//! without waiting for a possible second tap, and the tests are not mutually
//! exclusive by construction.
use log::debug;

use crate::config::Thresholds;
use crate::detector::{DetectorCore, GestureDetector, GestureProcessor, valid_finger};
use crate::touch::{GestureKind, RuntimeTouchInfo, TouchPoint, get_trajectory_effective_length};
use crate::view::MapView;

const DOUBLE_TAP_AREA_FACTOR: u32 = 4;

#[derive(Debug)]
pub struct ScriptDetector<V, P> {
    core: DetectorCore<V, P>,
    pinch_enabled: bool,
    panning_finger: Option<usize>,
    /// A motion gesture fired during the current contact.
    moved: bool,
}

impl<V: MapView, P: GestureProcessor> ScriptDetector<V, P> {
    pub fn new(view: V, processor: P, thresholds: Thresholds) -> Self {
        Self {
            core: DetectorCore::new(view, processor, thresholds),
            pinch_enabled: false,
            panning_finger: None,
            moved: false,
        }
    }

    /// Pinch (pure distance change) is off unless enabled here.
    pub fn set_pinch_enabled(&mut self, enabled: bool) {
        self.pinch_enabled = enabled;
    }

    pub fn history(&self) -> &RuntimeTouchInfo {
        &self.core.info_history
    }

    fn poll_long_press(&mut self, now: u32) {
        if !self.core.long_press_timer.fire_if_due(now) {
            return;
        }
        let info = &self.core.info;
        if info.fingers_pressed == 1
            && info.current_gesture == GestureKind::None
            && !self.core.finger_dragged_enough(0)
        {
            self.core
                .notify(GestureKind::LongPress, |p, info| p.on_long_press(info));
        }
    }

    fn current_is(&self, gestures: &[GestureKind]) -> bool {
        gestures.contains(&self.core.info.current_gesture)
    }

    fn released_still(&self, finger: usize) -> bool {
        let info = &self.core.info;
        self.core
            .finger_pressed_enough(finger, 0, self.core.thresholds.click_duration)
            && get_trajectory_effective_length(&info.finger_down[finger], &info.finger_up[finger])
                < self.core.thresholds.click_area
    }

    fn is_flick(&self, finger: usize) -> bool {
        let info = &self.core.info;
        let elapsed = info.finger_move[finger]
            .timestamp
            .saturating_sub(info.finger_down[finger].timestamp);
        self.current_is(&[GestureKind::None, GestureKind::Flick])
            && self.core.finger_dragged_enough(finger)
            && elapsed <= self.core.thresholds.flick_duration
    }

    fn is_pan(&self, finger: usize) -> bool {
        self.current_is(&[GestureKind::Pan, GestureKind::Flick])
            || (self.current_is(&[GestureKind::None]) && self.core.finger_dragged_enough(finger))
    }

    fn two_fingers_down(&self) -> bool {
        let pressed = &self.core.info.is_finger_pressed;
        pressed[0] && pressed[1]
    }

    fn is_pinch(&self) -> bool {
        if !self.pinch_enabled
            || !self.two_fingers_down()
            || !self.current_is(&[GestureKind::None, GestureKind::Pinch])
        {
            return false;
        }
        let info = &self.core.info;
        let start = get_trajectory_effective_length(&info.finger_down[0], &info.finger_down[1]);
        let now = get_trajectory_effective_length(&info.finger_move[0], &info.finger_move[1]);
        start.abs_diff(now) >= self.core.thresholds.click_area
    }

    fn is_zoom_rotate(&self) -> bool {
        self.two_fingers_down()
            && (self.current_is(&[GestureKind::ZoomRotate])
                || (self.current_is(&[GestureKind::None])
                    && (self.core.finger_dragged_enough(0) || self.core.finger_dragged_enough(1))))
    }

    fn is_panning_finished(&self, finger: usize) -> bool {
        self.current_is(&[GestureKind::Pan, GestureKind::Flick]) && self.panning_finger == Some(finger)
    }

    fn is_two_finger_tap(&self) -> bool {
        let info = &self.core.info;
        info.fingers_pressed == 0
            && !self.moved
            && self.current_is(&[GestureKind::None])
            && !info.finger_down[1].is_empty()
            && self.released_still(0)
            && self.released_still(1)
    }

    fn is_double_tap(&self, finger: usize) -> bool {
        if !self.is_tap(finger) {
            return false;
        }
        let info = &self.core.info;
        let history = &self.core.info_history;
        let gap = info.finger_down[0]
            .timestamp
            .saturating_sub(history.finger_up[0].timestamp);
        history.current_gesture == GestureKind::Tap
            && gap < self.core.thresholds.double_click_duration
            && get_trajectory_effective_length(&history.finger_up[0], &info.finger_up[0])
                < DOUBLE_TAP_AREA_FACTOR.saturating_mul(self.core.thresholds.click_area)
    }

    fn is_tap(&self, finger: usize) -> bool {
        let info = &self.core.info;
        finger == 0
            && info.fingers_pressed == 0
            && !self.moved
            && self.current_is(&[GestureKind::None])
            && info.finger_down[1].is_empty()
            && self.released_still(0)
    }

    fn finish_phase(&mut self) {
        self.moved = true;
        self.core.capture_view_state();
        self.core.info.rebase_pressed_fingers();
        self.core.info.current_gesture = GestureKind::None;
    }
}

impl<V: MapView, P: GestureProcessor> GestureDetector for ScriptDetector<V, P> {
    type Processor = P;

    fn tap(&mut self, finger: usize, tp: TouchPoint) {
        if !valid_finger(finger) {
            return;
        }
        self.poll_long_press(tp.timestamp);
        self.core.info.record_down(finger, tp);
        if self.core.info.fingers_pressed == 1 {
            self.core.capture_view_state();
            self.core.start_long_press_timer(tp.timestamp);
            return;
        }
        self.core.stop_long_press_timer();
        if let Some(panning) = self.panning_finger.take() {
            self.core
                .notify(GestureKind::Pan, |p, info| p.on_panning_finished(panning, info));
            self.finish_phase();
        }
    }

    fn move_to(&mut self, finger: usize, tp: TouchPoint) {
        if !valid_finger(finger) {
            return;
        }
        self.poll_long_press(tp.timestamp);
        if !self.core.info.is_finger_pressed[finger] {
            debug!("Move for released finger {finger} ignored");
            return;
        }
        self.core.info.record_move(finger, tp);
        self.core.stop_long_press_timer();

        if self.core.info.fingers_pressed == 1 {
            if self.is_flick(finger) {
                self.panning_finger = Some(finger);
                self.core
                    .notify(GestureKind::Flick, |p, info| p.on_flick(finger, info));
            } else if self.is_pan(finger) {
                self.panning_finger = Some(finger);
                self.core
                    .notify(GestureKind::Pan, |p, info| p.on_pan(finger, info));
            }
        } else if self.is_pinch() {
            self.core
                .notify(GestureKind::Pinch, |p, info| p.on_zoom_rotate(info));
        } else if self.is_zoom_rotate() {
            self.core
                .notify(GestureKind::ZoomRotate, |p, info| p.on_zoom_rotate(info));
        }
    }

    fn up(&mut self, finger: usize, tp: TouchPoint) {
        if !valid_finger(finger) {
            return;
        }
        self.poll_long_press(tp.timestamp);
        if !self.core.info.is_finger_pressed[finger] {
            debug!("Up for released finger {finger} ignored");
            return;
        }
        self.core.info.record_up(finger, tp);
        self.core.stop_long_press_timer();

        if self.is_panning_finished(finger) {
            self.panning_finger = None;
            self.core
                .notify(GestureKind::Pan, |p, info| p.on_panning_finished(finger, info));
            self.finish_phase();
        } else if self.is_two_finger_tap() {
            self.core
                .notify(GestureKind::TwoFingerTap, |p, info| p.on_two_finger_tap(info));
        } else if self.is_double_tap(finger) {
            self.core
                .notify(GestureKind::DoubleTap, |p, info| p.on_double_tap(info));
        } else if self.is_tap(finger) {
            self.core.notify(GestureKind::Tap, |p, info| p.on_tap(info));
        }

        if self.current_is(&[GestureKind::ZoomRotate, GestureKind::Pinch])
            && self.core.info.fingers_pressed < 2
        {
            self.finish_phase();
        }
        if self.core.info.fingers_pressed == 0 {
            self.panning_finger = None;
            self.moved = false;
            self.core.reset();
        }
    }

    fn halt_gesture(&mut self) {
        if !self.is_busy() {
            return;
        }
        debug!("Halting gesture {}", self.core.info.current_gesture);
        self.panning_finger = None;
        self.moved = false;
        self.core.reset();
    }

    fn on_idle(&mut self, now: u32) {
        self.poll_long_press(now);
    }

    fn is_busy(&self) -> bool {
        self.core.info.fingers_pressed > 0 || self.core.long_press_timer.is_pending()
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
