//! Touch input plumbing - no hardware, fully testable.
//!
//! Turns raw evdev multi-touch (protocol B) events into per-finger
//! down/move/up events, and parses scripted touch sequences for replay.

use std::fs;
use std::path::Path;

use log::debug;
use serde::Deserialize;

use crate::config::MapGestrError;
use crate::detector::GestureDetector;
use crate::touch::{MAX_FINGERS, TouchPoint};

// -- TouchEvent -----------------------------------------------

/// Intermediate representation of a relevant evdev event,
/// decoupled from `evdev` types for testability.
#[derive(Debug, Clone, PartialEq)]
pub enum TouchEvent {
    Slot(i32),
    PositionX(i32),
    PositionY(i32),
    TrackingId(i32),
    FingerUp,
    SynReport,
}

/// A per-finger touch event ready for a detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerEvent {
    Down(usize, TouchPoint),
    Move(usize, TouchPoint),
    Up(usize, TouchPoint),
}

/// Deliver a finger event to a detector.
pub fn dispatch<D: GestureDetector + ?Sized>(detector: &mut D, event: FingerEvent) {
    match event {
        FingerEvent::Down(finger, tp) => detector.tap(finger, tp),
        FingerEvent::Move(finger, tp) => detector.move_to(finger, tp),
        FingerEvent::Up(finger, tp) => detector.up(finger, tp),
    }
}

// -- Slot tracking --------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    active: bool,
    x: i32,
    y: i32,
    pending_down: bool,
    pending_up: bool,
    moved: bool,
}

/// Buffers per-slot changes until `SYN_REPORT`, then emits finger events.
/// Slots beyond [`MAX_FINGERS`] are ignored.
#[derive(Debug, Clone)]
pub struct SlotTracker {
    slots: [Slot; MAX_FINGERS],
    current: Option<usize>,
}

impl Default for SlotTracker {
    fn default() -> Self {
        Self {
            slots: [Slot::default(); MAX_FINGERS],
            current: Some(0),
        }
    }
}

impl SlotTracker {
    /// Feed one classified event.  `timestamp` stamps any finger events
    /// flushed by a `SYN_REPORT`.
    pub fn feed(&mut self, event: &TouchEvent, timestamp: u32) -> Vec<FingerEvent> {
        if let TouchEvent::Slot(slot) = event {
            self.current = usize::try_from(*slot).ok().filter(|s| *s < MAX_FINGERS);
            if self.current.is_none() {
                debug!("Ignoring touch slot {slot}");
            }
            return Vec::new();
        }
        if *event == TouchEvent::SynReport {
            return self.flush(timestamp);
        }

        let Some(slot) = self.current.map(|i| &mut self.slots[i]) else {
            return Vec::new();
        };
        match event {
            TouchEvent::PositionX(x) => {
                slot.x = *x;
                slot.moved = true;
            }
            TouchEvent::PositionY(y) => {
                slot.y = *y;
                slot.moved = true;
            }
            TouchEvent::TrackingId(_) => slot.pending_down = true,
            TouchEvent::FingerUp => slot.pending_up = true,
            TouchEvent::Slot(_) | TouchEvent::SynReport => {}
        }
        Vec::new()
    }

    fn flush(&mut self, timestamp: u32) -> Vec<FingerEvent> {
        let mut events = Vec::new();
        for (finger, slot) in self.slots.iter_mut().enumerate() {
            let tp = TouchPoint::new(slot.x, slot.y, timestamp);
            if slot.pending_down {
                slot.active = true;
                events.push(FingerEvent::Down(finger, tp));
            } else if slot.moved && slot.active && !slot.pending_up {
                events.push(FingerEvent::Move(finger, tp));
            }
            if slot.pending_up && slot.active {
                slot.active = false;
                events.push(FingerEvent::Up(finger, tp));
            }
            slot.pending_down = false;
            slot.pending_up = false;
            slot.moved = false;
        }
        events
    }
}

// -- Helpers --------------------------------------------------

/// Parse a USB vendor:product ID string into `(vendor, product)`.
///
/// Accepts formats like `"1234:5678"` or `"USB:1234:5678"` (case-insensitive).
/// Returns `None` if the format is invalid or the hex values cannot be parsed.
pub fn parse_usb_id(raw: &str) -> Option<(u16, u16)> {
    let cleaned = raw.to_lowercase().replace("usb:", "");
    let (vendor_str, product_str) = cleaned.split_once(':')?;
    let vendor = u16::from_str_radix(vendor_str, 16).ok()?;
    let product = u16::from_str_radix(product_str, 16).ok()?;
    Some((vendor, product))
}

/// Classify a single `evdev::InputEvent` into one of the touch-relevant
/// categories the tracker cares about.  Returns `None` for irrelevant events.
pub fn classify_event(event: &evdev::InputEvent) -> Option<TouchEvent> {
    use evdev::{AbsoluteAxisType, InputEventKind};

    match event.kind() {
        InputEventKind::AbsAxis(axis) => match axis {
            AbsoluteAxisType::ABS_MT_SLOT => Some(TouchEvent::Slot(event.value())),
            AbsoluteAxisType::ABS_MT_POSITION_X => Some(TouchEvent::PositionX(event.value())),
            AbsoluteAxisType::ABS_MT_POSITION_Y => Some(TouchEvent::PositionY(event.value())),
            AbsoluteAxisType::ABS_MT_TRACKING_ID => {
                if event.value() == -1 {
                    Some(TouchEvent::FingerUp)
                } else {
                    Some(TouchEvent::TrackingId(event.value()))
                }
            }
            _ => None,
        },
        InputEventKind::Synchronization(evdev::Synchronization::SYN_REPORT) => {
            Some(TouchEvent::SynReport)
        }
        _ => None,
    }
}

// -- Touch scripts --------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TouchKind {
    Down,
    Move,
    Up,
    /// Let time pass without input.
    Idle,
}

/// One line of a replay script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ScriptedTouch {
    pub kind: TouchKind,
    #[serde(default)]
    pub finger: usize,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    pub t: u32,
}

impl ScriptedTouch {
    pub fn to_finger_event(&self) -> Option<FingerEvent> {
        let tp = TouchPoint::new(self.x, self.y, self.t);
        match self.kind {
            TouchKind::Down => Some(FingerEvent::Down(self.finger, tp)),
            TouchKind::Move => Some(FingerEvent::Move(self.finger, tp)),
            TouchKind::Up => Some(FingerEvent::Up(self.finger, tp)),
            TouchKind::Idle => None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawScript {
    touch: Vec<ScriptedTouch>,
}

/// Parse a TOML touch script (`[[touch]]` entries).  Finger slots must be in
/// range and timestamps must not decrease.
pub fn parse_touch_script_str(
    content: &str,
    path: &Path,
) -> Result<Vec<ScriptedTouch>, MapGestrError> {
    let raw: RawScript = toml::from_str(content).map_err(|e| MapGestrError::ScriptParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut last_t = 0;
    for (index, entry) in raw.touch.iter().enumerate() {
        if entry.finger >= MAX_FINGERS {
            return Err(MapGestrError::InvalidScriptEntry {
                index,
                message: format!("finger {} out of range (max {MAX_FINGERS})", entry.finger),
            });
        }
        if entry.t < last_t {
            return Err(MapGestrError::InvalidScriptEntry {
                index,
                message: format!("timestamp {} goes back from {last_t}", entry.t),
            });
        }
        last_t = entry.t;
    }
    Ok(raw.touch)
}

pub fn parse_touch_script(path: &Path) -> Result<Vec<ScriptedTouch>, MapGestrError> {
    let content = fs::read_to_string(path).map_err(|e| MapGestrError::ScriptReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_touch_script_str(&content, path)
}
