//! Eased camera transitions.
//!
//! Each call to [`InertialCamera::next_transition_step`] moves every field a
//! fixed fraction of the remaining distance toward its target and snaps it
//! once within the field's accuracy.  The ratio is per step, not per unit of
//! time, so the host should call it at a steady idle cadence.
use crate::touch::{CameraPose, Coordinates};
use crate::view::MapView;

pub const GEO_ACCURACY: f64 = 1e-5;
pub const ZOOM_ACCURACY: f64 = 0.1;
pub const ROTATE_ACCURACY: f64 = 0.5;
pub const TILT_ACCURACY: f64 = 0.1;

const GEO_STEP_RATIO: f64 = 0.5;
const ZOOM_STEP_RATIO: f64 = 0.2;
const ROTATE_STEP_RATIO: f64 = 0.5;
const TILT_STEP_RATIO: f64 = 0.5;

/// Current and target camera pose plus the transition flag.
///
/// `is_transiting()` is true iff some field is further from its target than
/// its accuracy.
#[derive(Debug, Clone, Default)]
pub struct InertialCamera {
    cur: CameraPose,
    target: CameraPose,
    transiting: bool,
}

impl InertialCamera {
    /// A camera at rest at `pose`.
    pub fn new(pose: CameraPose) -> Self {
        Self {
            cur: pose.clone(),
            target: pose,
            transiting: false,
        }
    }

    pub fn from_view(view: &impl MapView) -> Self {
        Self::new(CameraPose::capture(view))
    }

    pub fn is_transiting(&self) -> bool {
        self.transiting
    }

    pub fn cur(&self) -> &CameraPose {
        &self.cur
    }

    pub fn target(&self) -> &CameraPose {
        &self.target
    }

    pub fn get_cur_center(&self) -> Option<Coordinates> {
        self.cur.center
    }

    pub fn get_cur_zoom_factor(&self) -> f64 {
        self.cur.zoom_factor
    }

    pub fn get_cur_rotation_angle(&self) -> f64 {
        self.cur.rotation_angle
    }

    pub fn get_cur_tilt(&self) -> f64 {
        self.cur.tilt
    }

    /// Set every target at once.
    pub fn set_targets(
        &mut self,
        view: &impl MapView,
        center: Coordinates,
        zoom_factor: f64,
        rotation_angle: f64,
        tilt: f64,
    ) {
        self.begin(view);
        self.target = CameraPose {
            center: Some(center),
            zoom_factor,
            rotation_angle: normalize_angle(rotation_angle),
            tilt,
        };
        self.transiting = !self.converged();
    }

    pub fn set_center_target(&mut self, view: &impl MapView, center: Coordinates) {
        self.begin(view);
        self.target.center = Some(center);
        self.transiting = !self.converged();
    }

    pub fn set_zoom_target(&mut self, view: &impl MapView, zoom_factor: f64) {
        self.begin(view);
        self.target.zoom_factor = zoom_factor;
        self.transiting = !self.converged();
    }

    pub fn set_rotation_target(&mut self, view: &impl MapView, rotation_angle: f64) {
        self.begin(view);
        self.target.rotation_angle = normalize_angle(rotation_angle);
        self.transiting = !self.converged();
    }

    pub fn set_tilt_target(&mut self, view: &impl MapView, tilt: f64) {
        self.begin(view);
        self.target.tilt = tilt;
        self.transiting = !self.converged();
    }

    /// Freeze the camera where it is now.
    pub fn halt(&mut self) {
        self.target = self.cur.clone();
        self.transiting = false;
    }

    /// Advance one step.  Returns whether the camera is still transiting.
    pub fn next_transition_step(&mut self) -> bool {
        if !self.transiting {
            return false;
        }
        let mut done = true;

        if let Some(target) = self.target.center {
            let cur = self.cur.center.unwrap_or(target);
            let (latitude, lat_done) =
                approach(cur.latitude, target.latitude, GEO_STEP_RATIO, GEO_ACCURACY);
            let (longitude, lon_done) =
                approach(cur.longitude, target.longitude, GEO_STEP_RATIO, GEO_ACCURACY);
            self.cur.center = Some(Coordinates::new(latitude, longitude));
            done &= lat_done && lon_done;
        }

        let (zoom, zoom_done) = approach(
            self.cur.zoom_factor,
            self.target.zoom_factor,
            ZOOM_STEP_RATIO,
            ZOOM_ACCURACY,
        );
        self.cur.zoom_factor = zoom;
        done &= zoom_done;

        let (rotation, rotation_done) =
            approach_angle(self.cur.rotation_angle, self.target.rotation_angle);
        self.cur.rotation_angle = rotation;
        done &= rotation_done;

        let (tilt, tilt_done) =
            approach(self.cur.tilt, self.target.tilt, TILT_STEP_RATIO, TILT_ACCURACY);
        self.cur.tilt = tilt;
        done &= tilt_done;

        self.transiting = !done;
        self.transiting
    }

    /// Start a transition from the view's pose unless one is under way.
    fn begin(&mut self, view: &impl MapView) {
        if !self.transiting {
            self.cur = CameraPose::capture(view);
            self.target = self.cur.clone();
        }
    }

    fn converged(&self) -> bool {
        let center_done = match (self.cur.center, self.target.center) {
            (Some(c), Some(t)) => {
                (c.latitude - t.latitude).abs() <= GEO_ACCURACY
                    && (c.longitude - t.longitude).abs() <= GEO_ACCURACY
            }
            (None, Some(_)) => false,
            _ => true,
        };
        center_done
            && (self.cur.zoom_factor - self.target.zoom_factor).abs() <= ZOOM_ACCURACY
            && shortest_arc(self.cur.rotation_angle, self.target.rotation_angle).abs()
                <= ROTATE_ACCURACY
            && (self.cur.tilt - self.target.tilt).abs() <= TILT_ACCURACY
    }
}

/// One fixed-ratio step from `cur` toward `target`, never overshooting.
/// Returns the new value and whether it snapped to the target.
fn approach(cur: f64, target: f64, ratio: f64, accuracy: f64) -> (f64, bool) {
    if (target - cur).abs() <= accuracy {
        return (target, true);
    }
    let next = cur + (target - cur) * ratio;
    let next = if target > cur {
        next.min(target)
    } else {
        next.max(target)
    };
    if (next - target).abs() <= accuracy {
        (target, true)
    } else {
        (next, false)
    }
}

fn approach_angle(cur: f64, target: f64) -> (f64, bool) {
    let diff = shortest_arc(cur, target);
    let (offset, done) = approach(0.0, diff, ROTATE_STEP_RATIO, ROTATE_ACCURACY);
    if done {
        (target, true)
    } else {
        (normalize_angle(cur + offset), false)
    }
}

/// Signed difference `target - cur` folded into `(-180, 180]`.
fn shortest_arc(cur: f64, target: f64) -> f64 {
    let diff = (target - cur).rem_euclid(360.0);
    if diff > 180.0 { diff - 360.0 } else { diff }
}

/// Fold an angle into `[0, 360)`.
pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(360.0);
    if a >= 360.0 { 0.0 } else { a }
}
