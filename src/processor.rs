//! Gesture processors: a recorder, and the camera driver that turns gestures
//! into [`InertialCamera`] targets on a shared view.
use log::debug;

use crate::camera::InertialCamera;
use crate::detector::GestureProcessor;
use crate::touch::{Coordinates, RuntimeTouchInfo, TouchPoint};
use crate::view::{MapView, SharedView};

pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 20.0;
/// Web-mercator latitude limit.
const MAX_LATITUDE: f64 = 85.051_128_78;
/// Pixels spanned by the world at zoom 0.
const TILE_SIZE: f64 = 256.0;

/// One processor notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureEvent {
    Tap,
    DoubleTap,
    LongPress,
    SecondLongPress,
    Pan(usize),
    Flick(usize),
    PanningFinished(usize),
    ZoomRotate,
    TwoFingerTap,
}

/// Records every notification in order.
#[derive(Debug, Clone, Default)]
pub struct GestureLog {
    pub events: Vec<GestureEvent>,
    pub halts: usize,
}

impl GestureLog {
    pub fn count(&self, event: GestureEvent) -> usize {
        self.events.iter().filter(|e| **e == event).count()
    }

    pub fn count_pans(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, GestureEvent::Pan(_) | GestureEvent::Flick(_)))
            .count()
    }
}

impl GestureProcessor for GestureLog {
    fn on_tap(&mut self, _info: &RuntimeTouchInfo) {
        self.events.push(GestureEvent::Tap);
    }

    fn on_double_tap(&mut self, _info: &RuntimeTouchInfo) {
        self.events.push(GestureEvent::DoubleTap);
    }

    fn on_long_press(&mut self, _info: &RuntimeTouchInfo) {
        self.events.push(GestureEvent::LongPress);
    }

    fn on_second_long_press(&mut self, _info: &RuntimeTouchInfo) {
        self.events.push(GestureEvent::SecondLongPress);
    }

    fn on_pan(&mut self, finger: usize, _info: &RuntimeTouchInfo) {
        self.events.push(GestureEvent::Pan(finger));
    }

    fn on_flick(&mut self, finger: usize, _info: &RuntimeTouchInfo) {
        self.events.push(GestureEvent::Flick(finger));
    }

    fn on_panning_finished(&mut self, finger: usize, _info: &RuntimeTouchInfo) {
        self.events.push(GestureEvent::PanningFinished(finger));
    }

    fn on_zoom_rotate(&mut self, _info: &RuntimeTouchInfo) {
        self.events.push(GestureEvent::ZoomRotate);
    }

    fn on_two_finger_tap(&mut self, _info: &RuntimeTouchInfo) {
        self.events.push(GestureEvent::TwoFingerTap);
    }

    fn halt_transition(&mut self) {
        self.halts += 1;
    }
}

/// Drives an [`InertialCamera`] from gestures and mirrors its pose into the
/// shared view on every [`CameraProcessor::step`].
#[derive(Debug)]
pub struct CameraProcessor {
    view: SharedView,
    camera: InertialCamera,
    log: GestureLog,
}

impl CameraProcessor {
    pub fn new(view: SharedView) -> Self {
        let camera = InertialCamera::from_view(&view);
        Self {
            view,
            camera,
            log: GestureLog::default(),
        }
    }

    pub fn camera(&self) -> &InertialCamera {
        &self.camera
    }

    pub fn log(&self) -> &GestureLog {
        &self.log
    }

    pub fn view(&self) -> &SharedView {
        &self.view
    }

    /// Advance the camera one idle step.  Returns whether it is still moving.
    pub fn step(&mut self) -> bool {
        if !self.camera.is_transiting() {
            return false;
        }
        let moving = self.camera.next_transition_step();
        self.view.borrow_mut().apply_pose(self.camera.cur());
        moving
    }

    fn pan_to(&mut self, finger: usize, info: &RuntimeTouchInfo) {
        let start = &info.start_view_state;
        let center = start.center.unwrap_or_else(|| self.view.center());
        let down = info.finger_down[finger];
        let now = info.finger_move[finger];
        let dx = f64::from(now.x - down.x);
        let dy = f64::from(now.y - down.y);

        // Screen offsets are in the rotated frame of the view.
        let (sin, cos) = start.rotation_angle.to_radians().sin_cos();
        let mx = dx * cos - dy * sin;
        let my = dx * sin + dy * cos;

        let degrees_per_px =
            360.0 / (TILE_SIZE * start.zoom_factor.exp2() * self.view.scale_factor());
        let target = Coordinates::new(
            (center.latitude + my * degrees_per_px).clamp(-MAX_LATITUDE, MAX_LATITUDE),
            wrap_longitude(center.longitude - mx * degrees_per_px),
        );
        self.camera.set_center_target(&self.view, target);
    }

    fn zoom_by(&mut self, levels: f64) {
        let zoom = if self.camera.is_transiting() {
            self.camera.target().zoom_factor
        } else {
            self.view.zoom_factor()
        };
        self.camera
            .set_zoom_target(&self.view, (zoom + levels).clamp(MIN_ZOOM, MAX_ZOOM));
    }
}

fn wrap_longitude(longitude: f64) -> f64 {
    (longitude + 180.0).rem_euclid(360.0) - 180.0
}

fn finger_vector(a: &TouchPoint, b: &TouchPoint) -> (f64, f64) {
    (f64::from(b.x - a.x), f64::from(b.y - a.y))
}

impl GestureProcessor for CameraProcessor {
    fn on_tap(&mut self, info: &RuntimeTouchInfo) {
        self.log.on_tap(info);
    }

    fn on_double_tap(&mut self, info: &RuntimeTouchInfo) {
        self.log.on_double_tap(info);
        self.zoom_by(1.0);
    }

    fn on_long_press(&mut self, info: &RuntimeTouchInfo) {
        self.log.on_long_press(info);
    }

    fn on_second_long_press(&mut self, info: &RuntimeTouchInfo) {
        self.log.on_second_long_press(info);
    }

    fn on_pan(&mut self, finger: usize, info: &RuntimeTouchInfo) {
        self.log.on_pan(finger, info);
        self.pan_to(finger, info);
    }

    fn on_flick(&mut self, finger: usize, info: &RuntimeTouchInfo) {
        self.log.on_flick(finger, info);
        self.pan_to(finger, info);
    }

    fn on_panning_finished(&mut self, finger: usize, info: &RuntimeTouchInfo) {
        self.log.on_panning_finished(finger, info);
    }

    fn on_zoom_rotate(&mut self, info: &RuntimeTouchInfo) {
        self.log.on_zoom_rotate(info);

        let (x0, y0) = finger_vector(&info.finger_down[0], &info.finger_down[1]);
        let (x1, y1) = finger_vector(&info.finger_move[0], &info.finger_move[1]);
        let start_distance = x0.hypot(y0);
        if start_distance < 1.0 {
            return;
        }
        let ratio = x1.hypot(y1) / start_distance;
        if ratio <= 0.0 {
            return;
        }

        let start = &info.start_view_state;
        let zoom = (start.zoom_factor + ratio.log2()).clamp(MIN_ZOOM, MAX_ZOOM);
        let turn = (y1.atan2(x1) - y0.atan2(x0)).to_degrees();
        debug!("Zoom/rotate: zoom {zoom:.2}, turn {turn:.1}");

        self.camera.set_zoom_target(&self.view, zoom);
        self.camera
            .set_rotation_target(&self.view, start.rotation_angle + turn);
    }

    fn on_two_finger_tap(&mut self, info: &RuntimeTouchInfo) {
        self.log.on_two_finger_tap(info);
        self.zoom_by(-1.0);
    }

    fn halt_transition(&mut self) {
        self.log.halt_transition();
        self.camera.halt();
    }
}
