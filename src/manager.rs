//! Host loop: wires a detector to the camera, replays scripts, and runs
//! against a live touchscreen (I/O layer).
//!
//! Pure input plumbing lives in [`crate::event`].
use std::cell::RefCell;
use std::process::ExitCode;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use evdev::{AbsoluteAxisType, Device};
use log::{debug, info, warn};

use crate::config::{AppConfig, MapGestrError};
use crate::detector::{AnyDetector, GestureDetector};
use crate::event::{FingerEvent, ScriptedTouch, SlotTracker, classify_event, dispatch, parse_usb_id};
use crate::inertial::InertialGesture;
use crate::processor::{CameraProcessor, GestureEvent};
use crate::touch::CameraPose;
use crate::view::{SharedView, ViewState};

/// Idle callback cadence.
pub const IDLE_INTERVAL_MS: u32 = 16;
/// Upper bound on idle steps spent settling after a replay.
const SETTLE_LIMIT: usize = 10_000;

// -- MapSession -----------------------------------------------

/// One map view with its recognizer and camera, driven by the host loop.
pub struct MapSession {
    detector: Box<dyn GestureDetector<Processor = CameraProcessor>>,
    view: SharedView,
}

impl MapSession {
    pub fn new(config: &AppConfig) -> Self {
        let view: SharedView = Rc::new(RefCell::new(config.initial_view.clone()));
        let processor = CameraProcessor::new(Rc::clone(&view));
        let detector = AnyDetector::new(
            config.recognizer,
            Rc::clone(&view),
            processor,
            config.thresholds.clone(),
            config.pinch,
        );
        let detector: Box<dyn GestureDetector<Processor = CameraProcessor>> = if config.inertia {
            Box::new(InertialGesture::new(detector))
        } else {
            Box::new(detector)
        };
        info!(
            "Session ready: recognizer {}, inertia {}",
            config.recognizer, config.inertia
        );
        Self { detector, view }
    }

    pub fn handle(&mut self, event: FingerEvent) {
        dispatch(self.detector.as_mut(), event);
    }

    /// One idle step.  Returns whether anything is still in motion.
    pub fn idle(&mut self, now: u32) -> bool {
        self.detector.on_idle(now);
        let camera_moving = self.detector.processor_mut().step();
        camera_moving || self.detector.is_busy()
    }

    pub fn pose(&self) -> CameraPose {
        CameraPose::capture(&self.view)
    }

    pub fn view(&self) -> ViewState {
        self.view.borrow().clone()
    }

    pub fn gestures(&self) -> &[GestureEvent] {
        &self.detector.processor().log().events
    }
}

/// Feed a script through the session, idling every [`IDLE_INTERVAL_MS`]
/// between entries, then idle until everything has settled.
pub fn replay(session: &mut MapSession, script: &[ScriptedTouch]) -> Vec<GestureEvent> {
    let mut now = script.first().map_or(0, |entry| entry.t);
    for entry in script {
        while let Some(next) = now.checked_add(IDLE_INTERVAL_MS).filter(|next| *next <= entry.t) {
            now = next;
            session.idle(now);
        }
        now = now.max(entry.t);
        match entry.to_finger_event() {
            Some(event) => session.handle(event),
            None => {
                session.idle(now);
            }
        }
    }

    // The clock saturates at u32::MAX; SETTLE_LIMIT still bounds the loop.
    for _ in 0..SETTLE_LIMIT {
        now = now.saturating_add(IDLE_INTERVAL_MS);
        if !session.idle(now) {
            break;
        }
    }
    debug!("Replay settled at t={now}");
    session.gestures().to_vec()
}

// -- Device I/O -----------------------------------------------

/// Check if a device has multi-touch capabilities.
fn is_touch_device(device: &Device) -> bool {
    let Some(abs_axes) = device.supported_absolute_axes() else {
        return false;
    };
    abs_axes.contains(AbsoluteAxisType::ABS_MT_POSITION_X)
        && abs_axes.contains(AbsoluteAxisType::ABS_MT_POSITION_Y)
}

/// Find a touchscreen device by USB vendor:product ID.
fn find_device(usb_id: &str) -> Result<Device, MapGestrError> {
    let (vendor, product) =
        parse_usb_id(usb_id).ok_or_else(|| MapGestrError::InvalidUsbId(usb_id.to_string()))?;

    for (path, device) in evdev::enumerate() {
        if !is_touch_device(&device) {
            continue;
        }
        let id = device.input_id();
        if id.vendor() == vendor && id.product() == product {
            info!(
                "Found device for USB ID {usb_id}: {} ({})",
                device.name().unwrap_or("unknown"),
                path.display()
            );
            return Ok(device);
        }
    }
    Err(MapGestrError::DeviceNotFound(usb_id.to_string()))
}

/// Blocking reader: classify device events and forward finger events until
/// the device fails or the receiver goes away.
fn read_device(mut device: Device, start: Instant, tx: mpsc::Sender<FingerEvent>) {
    let mut tracker = SlotTracker::default();
    loop {
        let events = match device.fetch_events() {
            Ok(iter) => iter.collect::<Vec<_>>(),
            Err(e) => {
                warn!("Touch device disconnected: {e}");
                return;
            }
        };
        for event in &events {
            let Some(te) = classify_event(event) else {
                continue;
            };
            for finger_event in tracker.feed(&te, elapsed_ms(start)) {
                if tx.send(finger_event).is_err() {
                    return;
                }
            }
        }
    }
}

fn elapsed_ms(start: Instant) -> u32 {
    u32::try_from(start.elapsed().as_millis()).unwrap_or(u32::MAX)
}

/// Run the session against the configured touchscreen until `running`
/// clears or the device goes away.
pub fn run_live(config: &AppConfig, running: &Arc<AtomicBool>) -> Result<(), MapGestrError> {
    let usb_id = config
        .device_usb_id
        .as_deref()
        .ok_or(MapGestrError::NoDeviceConfigured)?;
    let device = find_device(usb_id)?;

    let start = Instant::now();
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("touch-reader".to_string())
        .spawn(move || read_device(device, start, tx))
        .map_err(MapGestrError::ReaderSpawnError)?;

    let mut session = MapSession::new(config);
    let idle_interval = Duration::from_millis(u64::from(IDLE_INTERVAL_MS));
    info!("Listening for touches on {usb_id}");

    while running.load(Ordering::Relaxed) {
        match rx.recv_timeout(idle_interval) {
            Ok(event) => session.handle(event),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                warn!("Touch reader stopped");
                break;
            }
        }
        session.idle(elapsed_ms(start));
    }

    let pose = session.pose();
    info!(
        "Stopped; final camera zoom {:.2}, rotation {:.1}",
        pose.zoom_factor, pose.rotation_angle
    );
    Ok(())
}

/// List all multi-touch capable devices.
pub fn list_touch_devices() -> ExitCode {
    println!("\n=== mapgestr: Available Touchscreen Devices ===\n");
    let mut touch_count = 0;

    for (path, device) in evdev::enumerate() {
        if !is_touch_device(&device) {
            continue;
        }

        touch_count += 1;
        println!(
            "Device {touch_count}:\n\
             \x20 Path:      {}\n\
             \x20 Name:      {}\n\
             \x20 USB ID:    {:04x}:{:04x}\n",
            path.display(),
            device.name().unwrap_or("unknown"),
            device.input_id().vendor(),
            device.input_id().product(),
        );
    }

    if touch_count == 0 {
        println!(
            "No multi-touch devices found.\n\n\
             Troubleshooting:\n\
             \x20 - Check if touchscreen is connected\n\
             \x20 - Run as root if devices are not visible"
        );
        return ExitCode::FAILURE;
    }

    println!(
        "Found {touch_count} touch device(s).\n\n\
         Add the USB ID to your config:\n\
         \x20 [device]\n\
         \x20 usb_id = \"<USB ID>\""
    );
    ExitCode::SUCCESS
}
