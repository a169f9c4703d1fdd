//! Plain value types shared by the recognizers and the camera: touch samples,
//! camera poses, and the working state of an in-progress gesture.
use strum::{Display, EnumString};

use crate::view::MapView;

/// Number of finger slots tracked in parallel.
pub const MAX_FINGERS: usize = 10;

/// Gestures a recognizer can classify.  The snake_case names double as
/// configuration keys in `[gestures.<name>]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString)]
pub enum GestureKind {
    #[default]
    #[strum(serialize = "none")]
    None,
    #[strum(serialize = "pan")]
    Pan,
    #[strum(serialize = "flick")]
    Flick,
    #[strum(serialize = "tap")]
    Tap,
    #[strum(serialize = "double_tap")]
    DoubleTap,
    #[strum(serialize = "long_press")]
    LongPress,
    #[strum(serialize = "two_finger_tap")]
    TwoFingerTap,
    #[strum(serialize = "pinch")]
    Pinch,
    #[strum(serialize = "zoom_rotate")]
    ZoomRotate,
}

/// A single touch sample.  Timestamps are milliseconds in the host's clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TouchPoint {
    pub x: i32,
    pub y: i32,
    pub timestamp: u32,
}

impl TouchPoint {
    pub fn new(x: i32, y: i32, timestamp: u32) -> Self {
        Self { x, y, timestamp }
    }

    /// True iff every field is zero (the "never touched" slot value).
    pub fn is_empty(&self) -> bool {
        self.x == 0 && self.y == 0 && self.timestamp == 0
    }
}

/// Rounded Euclidean distance between two touch samples.
pub fn get_trajectory_effective_length(p1: &TouchPoint, p2: &TouchPoint) -> u32 {
    let dx = f64::from(p2.x) - f64::from(p1.x);
    let dy = f64::from(p2.y) - f64::from(p1.y);
    dx.hypot(dy).round() as u32
}

/// Geographic coordinates in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// What the map view shows: centre, zoom factor, rotation and tilt.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CameraPose {
    pub center: Option<Coordinates>,
    pub zoom_factor: f64,
    pub rotation_angle: f64,
    pub tilt: f64,
}

impl CameraPose {
    /// Read a fresh pose from the view, replacing whatever was held before.
    pub fn capture(view: &impl MapView) -> Self {
        Self {
            center: Some(view.center()),
            zoom_factor: view.zoom_factor(),
            rotation_angle: view.orientation(),
            tilt: view.tilt(),
        }
    }
}

/// Working state of the gesture currently being classified.
///
/// All per-finger arrays are indexed by finger slot.  `fingers_pressed` is
/// recomputed from `is_finger_pressed` after every mutation, never adjusted
/// incrementally.
#[derive(Debug, Clone, Default)]
pub struct RuntimeTouchInfo {
    pub finger_down: [TouchPoint; MAX_FINGERS],
    pub finger_move: [TouchPoint; MAX_FINGERS],
    pub prev_finger_down: [TouchPoint; MAX_FINGERS],
    pub finger_up: [TouchPoint; MAX_FINGERS],
    pub is_finger_pressed: [bool; MAX_FINGERS],
    pub fingers_pressed: usize,
    pub current_gesture: GestureKind,
    pub start_view_state: CameraPose,
}

impl RuntimeTouchInfo {
    /// Record a press.  Slots outside `[0, MAX_FINGERS)` are ignored by all
    /// three `record_*` calls.
    pub fn record_down(&mut self, finger: usize, tp: TouchPoint) {
        if finger >= MAX_FINGERS {
            return;
        }
        self.prev_finger_down[finger] = self.finger_down[finger];
        self.finger_down[finger] = tp;
        self.finger_move[finger] = tp;
        self.finger_up[finger] = TouchPoint::default();
        self.is_finger_pressed[finger] = true;
        self.recount();
    }

    pub fn record_move(&mut self, finger: usize, tp: TouchPoint) {
        if let Some(slot) = self.finger_move.get_mut(finger) {
            *slot = tp;
        }
    }

    pub fn record_up(&mut self, finger: usize, tp: TouchPoint) {
        if finger >= MAX_FINGERS {
            return;
        }
        self.finger_move[finger] = tp;
        self.finger_up[finger] = tp;
        self.is_finger_pressed[finger] = false;
        self.recount();
    }

    /// Clear everything but the captured camera pose.
    pub fn clear_preserving_view(&mut self) {
        let view = std::mem::take(&mut self.start_view_state);
        *self = Self {
            start_view_state: view,
            ..Default::default()
        };
    }

    /// Move the down point of every pressed finger to where it is now, so the
    /// next gesture phase measures displacement from here.  Timestamps are
    /// kept so press durations still span the whole contact.
    pub fn rebase_pressed_fingers(&mut self) {
        for finger in 0..MAX_FINGERS {
            if self.is_finger_pressed[finger] {
                self.finger_down[finger].x = self.finger_move[finger].x;
                self.finger_down[finger].y = self.finger_move[finger].y;
            }
        }
    }

    fn recount(&mut self) {
        self.fingers_pressed = self.is_finger_pressed.iter().filter(|p| **p).count();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trajectory_is_rounded_distance() {
        let a = TouchPoint::new(0, 0, 1);
        assert_eq!(get_trajectory_effective_length(&a, &TouchPoint::new(3, 4, 2)), 5);
        assert_eq!(get_trajectory_effective_length(&a, &TouchPoint::new(1, 1, 2)), 1);
    }

    #[test]
    fn rebase_keeps_press_time() {
        let mut info = RuntimeTouchInfo::default();
        info.record_down(0, TouchPoint::new(10, 10, 100));
        info.record_move(0, TouchPoint::new(60, 10, 200));
        info.record_down(1, TouchPoint::new(90, 90, 150));
        info.record_up(1, TouchPoint::new(95, 90, 250));
        info.rebase_pressed_fingers();
        assert_eq!(info.finger_down[0], TouchPoint::new(60, 10, 100));
        assert_eq!(info.finger_down[1], TouchPoint::new(90, 90, 150));
        assert_eq!(info.fingers_pressed, 1);
    }

    #[test]
    fn record_ignores_out_of_range_finger() {
        let mut info = RuntimeTouchInfo::default();
        info.record_down(MAX_FINGERS, TouchPoint::new(1, 1, 1));
        info.record_move(MAX_FINGERS, TouchPoint::new(2, 2, 2));
        info.record_up(MAX_FINGERS + 3, TouchPoint::new(3, 3, 3));
        assert_eq!(info.fingers_pressed, 0);
        assert!(info.finger_move.iter().all(TouchPoint::is_empty));
    }
}
