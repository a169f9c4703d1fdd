//! Fling decorator: keeps a finger moving after release with decaying
//! velocity, feeding synthetic `move`/`up` events to the wrapped recognizer
//! from the host idle callback.
use log::debug;

use crate::detector::{GestureDetector, GestureProcessor, valid_finger};
use crate::touch::{
    GestureKind, MAX_FINGERS, RuntimeTouchInfo, TouchPoint, get_trajectory_effective_length,
};

/// Velocity multiplier applied to the release speed (px/ms).
const DERIVATIVE_GAIN: f64 = 40.0;
/// Synthetic motion stops once both velocity components are at most this.
const ACCURACY: f64 = 1.0;
const SINGLE_FINGER_DECAY: f64 = 0.9;
const MULTI_FINGER_DECAY: f64 = 0.5;
/// Releases that moved this little are not flings.
const JITTER_TRAJECTORY: u32 = 5;
/// A finger resting longer than this before lifting is not flung.
const MAX_RELEASE_PAUSE: u32 = 100;

#[derive(Debug, Clone, Copy, Default)]
struct FingerFling {
    prev: TouchPoint,
    last: TouchPoint,
    cur_x: f64,
    cur_y: f64,
    derivative_x: f64,
    derivative_y: f64,
    released_at: u32,
    last_step: u32,
    transiting: bool,
}

impl FingerFling {
    fn point(&self, now: u32) -> TouchPoint {
        TouchPoint::new(
            self.cur_x.round() as i32,
            self.cur_y.round() as i32,
            now.max(self.released_at),
        )
    }

    /// Advance the position by the velocity over the time since the last
    /// step, with the velocity taken per second of elapsed time.
    fn advance(&mut self, now: u32) {
        let dt = f64::from(now.saturating_sub(self.last_step)) / 1000.0;
        self.cur_x += self.derivative_x * dt;
        self.cur_y += self.derivative_y * dt;
        self.last_step = self.last_step.max(now);
    }
}

/// Wraps a recognizer and adds momentum to released fingers.
#[derive(Debug)]
pub struct InertialGesture<D> {
    d: D,
    fingers: [FingerFling; MAX_FINGERS],
}

impl<D: GestureDetector> InertialGesture<D> {
    pub fn new(d: D) -> Self {
        Self {
            d,
            fingers: [FingerFling::default(); MAX_FINGERS],
        }
    }

    pub fn inner(&self) -> &D {
        &self.d
    }

    pub fn into_inner(self) -> D {
        self.d
    }

    pub fn is_transiting(&self) -> bool {
        self.fingers.iter().any(|f| f.transiting)
    }

    pub fn is_finger_transiting(&self, finger: usize) -> bool {
        self.fingers.get(finger).is_some_and(|f| f.transiting)
    }

    /// Current synthetic velocity of a finger.
    pub fn derivative(&self, finger: usize) -> (f64, f64) {
        self.fingers
            .get(finger)
            .map_or((0.0, 0.0), |f| (f.derivative_x, f.derivative_y))
    }

    /// Finish every synthetic finger with an `up`, stop the camera and abort
    /// the wrapped gesture.
    fn brake(&mut self, now: u32) {
        debug!("Fling interrupted by a new touch");
        for finger in 0..MAX_FINGERS {
            if !self.fingers[finger].transiting {
                continue;
            }
            self.fingers[finger].transiting = false;
            let tp = self.fingers[finger].point(now);
            self.d.up(finger, tp);
        }
        self.d.processor_mut().halt_transition();
        self.d.halt_gesture();
    }

    fn in_motion_gesture(&self) -> bool {
        matches!(
            self.d.info().current_gesture,
            GestureKind::Pan | GestureKind::Flick | GestureKind::ZoomRotate | GestureKind::Pinch
        )
    }
}

impl<D: GestureDetector> GestureDetector for InertialGesture<D> {
    type Processor = D::Processor;

    fn tap(&mut self, finger: usize, tp: TouchPoint) {
        if !valid_finger(finger) {
            return;
        }
        if self.is_transiting() {
            self.brake(tp.timestamp);
        }
        self.fingers[finger] = FingerFling {
            prev: tp,
            last: tp,
            ..Default::default()
        };
        self.d.tap(finger, tp);
    }

    fn move_to(&mut self, finger: usize, tp: TouchPoint) {
        if !valid_finger(finger) {
            return;
        }
        let fling = &mut self.fingers[finger];
        if fling.transiting {
            debug!("Move for flinging finger {finger} ignored");
            return;
        }
        fling.prev = fling.last;
        fling.last = tp;
        self.d.move_to(finger, tp);
    }

    fn up(&mut self, finger: usize, tp: TouchPoint) {
        if !valid_finger(finger) {
            return;
        }
        let motion = self.in_motion_gesture();
        let fling = &mut self.fingers[finger];
        if fling.transiting {
            return;
        }
        if tp.x != fling.last.x || tp.y != fling.last.y {
            fling.prev = fling.last;
            fling.last = tp;
        }

        let dt = fling.last.timestamp.saturating_sub(fling.prev.timestamp);
        let pause = tp.timestamp.saturating_sub(fling.last.timestamp);
        let trajectory = get_trajectory_effective_length(&fling.prev, &fling.last);
        let (derivative_x, derivative_y) =
            if !motion || dt == 0 || trajectory <= JITTER_TRAJECTORY || pause > MAX_RELEASE_PAUSE {
                (0.0, 0.0)
            } else {
                let dt = f64::from(dt);
                (
                    DERIVATIVE_GAIN * f64::from(fling.last.x - fling.prev.x) / dt,
                    DERIVATIVE_GAIN * f64::from(fling.last.y - fling.prev.y) / dt,
                )
            };

        if derivative_x.abs() <= ACCURACY && derivative_y.abs() <= ACCURACY {
            self.d.up(finger, tp);
            return;
        }

        debug!("Fling finger {finger} at ({derivative_x:.1}, {derivative_y:.1})");
        fling.derivative_x = derivative_x;
        fling.derivative_y = derivative_y;
        fling.cur_x = f64::from(fling.last.x);
        fling.cur_y = f64::from(fling.last.y);
        fling.released_at = tp.timestamp;
        fling.last_step = tp.timestamp;
        fling.transiting = true;
    }

    fn halt_gesture(&mut self) {
        for fling in &mut self.fingers {
            fling.transiting = false;
        }
        self.d.halt_gesture();
    }

    fn on_idle(&mut self, now: u32) {
        let decay = if self.d.info().fingers_pressed == 1 {
            SINGLE_FINGER_DECAY
        } else {
            MULTI_FINGER_DECAY
        };
        for finger in 0..MAX_FINGERS {
            let fling = &mut self.fingers[finger];
            if !fling.transiting {
                continue;
            }
            fling.advance(now);
            let tp = fling.point(now);
            if fling.derivative_x.abs() <= ACCURACY && fling.derivative_y.abs() <= ACCURACY {
                fling.transiting = false;
                self.d.up(finger, tp);
            } else {
                fling.derivative_x *= decay;
                fling.derivative_y *= decay;
                self.d.move_to(finger, tp);
            }
        }
        self.d.on_idle(now);
    }

    fn is_busy(&self) -> bool {
        self.is_transiting() || self.d.is_busy()
    }

    fn info(&self) -> &RuntimeTouchInfo {
        self.d.info()
    }

    fn processor(&self) -> &D::Processor {
        self.d.processor()
    }

    fn processor_mut(&mut self) -> &mut D::Processor {
        self.d.processor_mut()
    }
}
