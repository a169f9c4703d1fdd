//! The map view as seen by the recognizers: a read-only camera pose plus the
//! per-gesture enable table.
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::touch::{CameraPose, Coordinates, GestureKind};

/// Read access to the view the gestures drive.
pub trait MapView {
    fn center(&self) -> Coordinates;
    fn zoom_factor(&self) -> f64;
    fn orientation(&self) -> f64;
    fn tilt(&self) -> f64;
    fn scale_factor(&self) -> f64;

    /// Whether the host has the given gesture enabled.
    fn is_gesture_enabled(&self, gesture: GestureKind) -> bool;
}

/// In-process view state: the current pose and which gestures are enabled.
///
/// Gestures missing from the table are enabled.
#[derive(Debug, Clone)]
pub struct ViewState {
    pub center: Coordinates,
    pub zoom_factor: f64,
    pub rotation_angle: f64,
    pub tilt: f64,
    pub scale_factor: f64,
    pub gestures: HashMap<GestureKind, bool>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            center: Coordinates::default(),
            zoom_factor: 1.0,
            rotation_angle: 0.0,
            tilt: 0.0,
            scale_factor: 1.0,
            gestures: HashMap::new(),
        }
    }
}

impl ViewState {
    pub fn set_gesture_enabled(&mut self, gesture: GestureKind, enabled: bool) {
        self.gestures.insert(gesture, enabled);
    }

    /// Overwrite the displayed pose.  A pose without a centre keeps the
    /// current one.
    pub fn apply_pose(&mut self, pose: &CameraPose) {
        if let Some(center) = pose.center {
            self.center = center;
        }
        self.zoom_factor = pose.zoom_factor;
        self.rotation_angle = pose.rotation_angle;
        self.tilt = pose.tilt;
    }
}

impl MapView for ViewState {
    fn center(&self) -> Coordinates {
        self.center
    }

    fn zoom_factor(&self) -> f64 {
        self.zoom_factor
    }

    fn orientation(&self) -> f64 {
        self.rotation_angle
    }

    fn tilt(&self) -> f64 {
        self.tilt
    }

    fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    fn is_gesture_enabled(&self, gesture: GestureKind) -> bool {
        self.gestures.get(&gesture).copied().unwrap_or(true)
    }
}

/// A view shared between the detector (reads) and the camera (writes).
pub type SharedView = Rc<RefCell<ViewState>>;

impl MapView for SharedView {
    fn center(&self) -> Coordinates {
        self.borrow().center()
    }

    fn zoom_factor(&self) -> f64 {
        self.borrow().zoom_factor()
    }

    fn orientation(&self) -> f64 {
        self.borrow().orientation()
    }

    fn tilt(&self) -> f64 {
        self.borrow().tilt()
    }

    fn scale_factor(&self) -> f64 {
        self.borrow().scale_factor()
    }

    fn is_gesture_enabled(&self, gesture: GestureKind) -> bool {
        self.borrow().is_gesture_enabled(gesture)
    }
}
