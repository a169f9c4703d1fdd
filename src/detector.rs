//! Shared recognizer contract: the processor and detector traits, the common
//! per-gesture bookkeeping, and strategy selection.
use log::{debug, info, warn};
use strum::{Display, EnumString};

use crate::config::Thresholds;
use crate::script::ScriptDetector;
use crate::statemachine::StateMachineDetector;
use crate::timer::SingleShotTimer;
use crate::touch::{
    CameraPose, GestureKind, MAX_FINGERS, RuntimeTouchInfo, TouchPoint,
    get_trajectory_effective_length,
};
use crate::view::MapView;

/// Receives one notification per recognized gesture.
///
/// Every callback gets the detector's live touch info so the processor can
/// read finger positions and the camera pose captured at gesture start.
pub trait GestureProcessor {
    fn on_tap(&mut self, info: &RuntimeTouchInfo);
    fn on_double_tap(&mut self, info: &RuntimeTouchInfo);
    fn on_long_press(&mut self, info: &RuntimeTouchInfo);
    fn on_pan(&mut self, finger: usize, info: &RuntimeTouchInfo);
    fn on_panning_finished(&mut self, finger: usize, info: &RuntimeTouchInfo);
    fn on_zoom_rotate(&mut self, info: &RuntimeTouchInfo);
    fn on_two_finger_tap(&mut self, info: &RuntimeTouchInfo);

    /// Long press following a quick tap.
    fn on_second_long_press(&mut self, info: &RuntimeTouchInfo) {
        self.on_long_press(info);
    }

    fn on_flick(&mut self, finger: usize, info: &RuntimeTouchInfo) {
        self.on_pan(finger, info);
    }

    /// Stop any camera motion the processor has started.
    fn halt_transition(&mut self) {}
}

/// Touch-event entry points shared by every recognizer strategy.
///
/// `finger` is a slot index in `[0, MAX_FINGERS)`; out-of-range slots are
/// dropped.  Timestamps must not go backwards for a given finger.
pub trait GestureDetector {
    type Processor: GestureProcessor;

    fn tap(&mut self, finger: usize, tp: TouchPoint);
    fn move_to(&mut self, finger: usize, tp: TouchPoint);
    fn up(&mut self, finger: usize, tp: TouchPoint);

    /// Abort the gesture in progress without notifying the processor.
    fn halt_gesture(&mut self);

    /// Host idle callback: fire due timers and advance synthetic motion.
    fn on_idle(&mut self, now: u32);

    /// True while a gesture, a timer or synthetic motion is pending.
    fn is_busy(&self) -> bool;

    fn info(&self) -> &RuntimeTouchInfo;
    fn processor(&self) -> &Self::Processor;
    fn processor_mut(&mut self) -> &mut Self::Processor;
}

pub(crate) fn valid_finger(finger: usize) -> bool {
    if finger < MAX_FINGERS {
        true
    } else {
        warn!("Ignoring touch for finger slot {finger} (max {MAX_FINGERS})");
        false
    }
}

/// Bookkeeping common to both strategies: touch info, the previous gesture's
/// info, the long-press timer, and the collaborators.
#[derive(Debug)]
pub struct DetectorCore<V, P> {
    pub view: V,
    pub processor: P,
    pub thresholds: Thresholds,
    pub info: RuntimeTouchInfo,
    pub info_history: RuntimeTouchInfo,
    pub long_press_timer: SingleShotTimer,
}

impl<V: MapView, P: GestureProcessor> DetectorCore<V, P> {
    pub fn new(view: V, processor: P, thresholds: Thresholds) -> Self {
        Self {
            view,
            processor,
            thresholds,
            info: RuntimeTouchInfo::default(),
            info_history: RuntimeTouchInfo::default(),
            long_press_timer: SingleShotTimer::default(),
        }
    }

    /// Snapshot the live info for cross-gesture comparisons.
    pub fn archive(&mut self) {
        self.info_history = self.info.clone();
    }

    /// Archive, then clear the live info (keeping the captured view state)
    /// and cancel the long-press timer.
    pub fn reset(&mut self) {
        self.archive();
        self.info.clear_preserving_view();
        self.long_press_timer.cancel();
    }

    pub fn capture_view_state(&mut self) {
        self.info.start_view_state = CameraPose::capture(&self.view);
    }

    pub fn start_long_press_timer(&mut self, now: u32) {
        self.long_press_timer
            .start(now, self.thresholds.long_press_duration);
    }

    pub fn stop_long_press_timer(&mut self) {
        self.long_press_timer.cancel();
    }

    pub fn is_gesture_available(&self, gesture: GestureKind) -> bool {
        self.view.is_gesture_enabled(gesture)
    }

    pub fn finger_dragged_enough(&self, finger: usize) -> bool {
        get_trajectory_effective_length(&self.info.finger_down[finger], &self.info.finger_move[finger])
            >= self.thresholds.click_area
    }

    /// Press duration of a released finger lies within `[min, max]` ms.
    pub fn finger_pressed_enough(&self, finger: usize, min: u32, max: u32) -> bool {
        let down = self.info.finger_down[finger];
        let up = self.info.finger_up[finger];
        if self.info.is_finger_pressed[finger] || up.is_empty() || up.timestamp < down.timestamp {
            return false;
        }
        let duration = up.timestamp - down.timestamp;
        (min..=max).contains(&duration)
    }

    /// Tag the current gesture and, if the view allows it, hand it to the
    /// processor.
    pub fn notify(
        &mut self,
        gesture: GestureKind,
        callback: impl FnOnce(&mut P, &RuntimeTouchInfo),
    ) {
        self.info.current_gesture = gesture;
        if !self.is_gesture_available(gesture) {
            debug!("Gesture {gesture} recognized but disabled");
            return;
        }
        match gesture {
            GestureKind::Pan | GestureKind::Flick | GestureKind::ZoomRotate | GestureKind::Pinch => {
                debug!("Gesture: {gesture}");
            }
            _ => info!("Gesture: {gesture}"),
        }
        callback(&mut self.processor, &self.info);
    }
}

/// Which recognizer strategy to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
pub enum RecognizerKind {
    #[default]
    #[strum(serialize = "state_machine")]
    StateMachine,
    #[strum(serialize = "script")]
    Script,
}

/// A recognizer whose strategy is picked at construction time.
#[derive(Debug)]
pub enum AnyDetector<V, P> {
    StateMachine(StateMachineDetector<V, P>),
    Script(ScriptDetector<V, P>),
}

impl<V: MapView, P: GestureProcessor> AnyDetector<V, P> {
    pub fn new(
        kind: RecognizerKind,
        view: V,
        processor: P,
        thresholds: Thresholds,
        pinch_enabled: bool,
    ) -> Self {
        match kind {
            RecognizerKind::StateMachine => {
                Self::StateMachine(StateMachineDetector::new(view, processor, thresholds))
            }
            RecognizerKind::Script => {
                let mut d = ScriptDetector::new(view, processor, thresholds);
                d.set_pinch_enabled(pinch_enabled);
                Self::Script(d)
            }
        }
    }
}

macro_rules! delegate {
    ($self:ident, $d:ident => $e:expr) => {
        match $self {
            AnyDetector::StateMachine($d) => $e,
            AnyDetector::Script($d) => $e,
        }
    };
}

impl<V: MapView, P: GestureProcessor> GestureDetector for AnyDetector<V, P> {
    type Processor = P;

    fn tap(&mut self, finger: usize, tp: TouchPoint) {
        delegate!(self, d => d.tap(finger, tp));
    }

    fn move_to(&mut self, finger: usize, tp: TouchPoint) {
        delegate!(self, d => d.move_to(finger, tp));
    }

    fn up(&mut self, finger: usize, tp: TouchPoint) {
        delegate!(self, d => d.up(finger, tp));
    }

    fn halt_gesture(&mut self) {
        delegate!(self, d => d.halt_gesture());
    }

    fn on_idle(&mut self, now: u32) {
        delegate!(self, d => d.on_idle(now));
    }

    fn is_busy(&self) -> bool {
        delegate!(self, d => d.is_busy())
    }

    fn info(&self) -> &RuntimeTouchInfo {
        delegate!(self, d => d.info())
    }

    fn processor(&self) -> &P {
        delegate!(self, d => d.processor())
    }

    fn processor_mut(&mut self) -> &mut P {
        delegate!(self, d => d.processor_mut())
    }
}
