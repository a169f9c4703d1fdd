//! Configuration data structures and TOML parsing.
//!
//! Every key is optional.  Example:
//!
//! ```toml
//! [global]
//! log_level = "info"
//! recognizer = "state_machine"   # or "script"
//! inertia = true
//! pinch = false
//!
//! [thresholds]
//! click_area = 50
//! click_duration_ms = 500
//! double_click_duration_ms = 1000
//! long_press_duration_ms = 500
//! flick_duration_ms = 150
//!
//! [camera]
//! latitude = 52.52
//! longitude = 13.405
//! zoom = 12.0
//!
//! [gestures.long_press]
//! enabled = false
//!
//! [device]
//! usb_id = "1234:5678"
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use serde::Deserialize;
use thiserror::Error;

use crate::detector::RecognizerKind;
use crate::touch::{Coordinates, GestureKind};
use crate::view::ViewState;

/// Top-level error type used throughout the crate.
#[derive(Debug, Error)]
pub enum MapGestrError {
    #[error("Failed to read config file {path}: {source}")]
    ConfigReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    #[error("Invalid threshold '{0}': must be greater than zero")]
    InvalidThreshold(&'static str),

    #[error("Unknown recognizer '{0}' (expected 'state_machine' or 'script')")]
    UnknownRecognizer(String),

    #[error("Failed to read touch script {path}: {source}")]
    ScriptReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse touch script {path}: {message}")]
    ScriptParseError { path: PathBuf, message: String },

    #[error("Touch script entry {index}: {message}")]
    InvalidScriptEntry { index: usize, message: String },

    #[error("No [device] usb_id configured")]
    NoDeviceConfigured,

    #[error("Invalid USB ID '{0}' (expected vendor:product)")]
    InvalidUsbId(String),

    #[error("No touch device with USB ID {0} found")]
    DeviceNotFound(String),

    #[error("Failed to start touch reader: {0}")]
    ReaderSpawnError(std::io::Error),
}

/// Root of the TOML config file.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawConfig {
    global: RawGlobal,
    thresholds: RawThresholds,
    camera: RawCamera,
    gestures: HashMap<String, RawGestureConfig>,
    device: RawDevice,
}

/// The `[global]` section.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawGlobal {
    log_level: Option<String>,
    log_file: Option<String>,
    recognizer: Option<String>,
    inertia: Option<bool>,
    pinch: Option<bool>,
}

/// Threshold values - all optional, defaults fill the gaps.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
struct RawThresholds {
    click_area: Option<u32>,
    click_duration_ms: Option<u32>,
    double_click_duration_ms: Option<u32>,
    long_press_duration_ms: Option<u32>,
    flick_duration_ms: Option<u32>,
}

/// Initial camera pose.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawCamera {
    latitude: Option<f64>,
    longitude: Option<f64>,
    zoom: Option<f64>,
    rotation: Option<f64>,
    tilt: Option<f64>,
    scale_factor: Option<f64>,
}

/// A `[gestures.<name>]` entry.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
struct RawGestureConfig {
    enabled: Option<bool>,
}

/// The `[device]` section.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawDevice {
    usb_id: Option<String>,
}

/// Distance (px) and duration (ms) thresholds shared by the recognizers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thresholds {
    /// Minimum trajectory for a finger to count as dragged.
    pub click_area: u32,
    /// Longest press that still counts as a click.
    pub click_duration: u32,
    /// Window in which a second press makes a double tap.
    pub double_click_duration: u32,
    pub long_press_duration: u32,
    /// A drag this soon after touch-down is a flick.
    pub flick_duration: u32,
}

pub const CLICK_AREA: u32 = 50;
pub const CLICK_DURATION: u32 = 500;
pub const DOUBLE_CLICK_DURATION: u32 = 1000;
pub const LONG_PRESS_DURATION: u32 = 500;
pub const FLICK_DURATION: u32 = 150;

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            click_area: CLICK_AREA,
            click_duration: CLICK_DURATION,
            double_click_duration: DOUBLE_CLICK_DURATION,
            long_press_duration: LONG_PRESS_DURATION,
            flick_duration: FLICK_DURATION,
        }
    }
}

/// Generate defaulting and validation for threshold fields.
macro_rules! threshold_fields {
    ($($raw:ident => $field:ident),+ $(,)?) => {
        impl RawThresholds {
            fn into_validated(self) -> Result<Thresholds, MapGestrError> {
                let defaults = Thresholds::default();
                let thresholds = Thresholds {
                    $($field: self.$raw.unwrap_or(defaults.$field),)+
                };
                $(
                    if thresholds.$field == 0 {
                        return Err(MapGestrError::InvalidThreshold(stringify!($raw)));
                    }
                )+
                Ok(thresholds)
            }
        }
    };
}

threshold_fields!(
    click_area => click_area,
    click_duration_ms => click_duration,
    double_click_duration_ms => double_click_duration,
    long_press_duration_ms => long_press_duration,
    flick_duration_ms => flick_duration,
);

/// Top-level parsed configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_file: Option<String>,
    pub recognizer: RecognizerKind,
    pub inertia: bool,
    pub pinch: bool,
    pub thresholds: Thresholds,
    pub initial_view: ViewState,
    pub device_usb_id: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: None,
            recognizer: RecognizerKind::default(),
            inertia: true,
            pinch: false,
            thresholds: Thresholds::default(),
            initial_view: ViewState::default(),
            device_usb_id: None,
        }
    }
}

/// Map `[gestures.<name>]` entries onto the view's enable table.
fn build_gesture_table(raw: &HashMap<String, RawGestureConfig>) -> HashMap<GestureKind, bool> {
    let mut table = HashMap::new();
    for (name, gc) in raw {
        let Ok(gesture) = name.parse::<GestureKind>() else {
            warn!("Unknown gesture '{name}' in config - ignoring.");
            continue;
        };
        if let Some(enabled) = gc.enabled {
            table.insert(gesture, enabled);
        }
    }
    table
}

fn build_view(camera: &RawCamera, gestures: &HashMap<String, RawGestureConfig>) -> ViewState {
    let defaults = ViewState::default();
    ViewState {
        center: Coordinates::new(
            camera.latitude.unwrap_or(defaults.center.latitude),
            camera.longitude.unwrap_or(defaults.center.longitude),
        ),
        zoom_factor: camera.zoom.unwrap_or(defaults.zoom_factor),
        rotation_angle: camera.rotation.unwrap_or(defaults.rotation_angle),
        tilt: camera.tilt.unwrap_or(defaults.tilt),
        scale_factor: camera.scale_factor.unwrap_or(defaults.scale_factor),
        gestures: build_gesture_table(gestures),
    }
}

/// Parse TOML config text.  `path` is only used in error messages.
pub fn parse_config_str(content: &str, path: &Path) -> Result<AppConfig, MapGestrError> {
    let raw: RawConfig = toml::from_str(content).map_err(|e| MapGestrError::ConfigParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let recognizer = match raw.global.recognizer.as_deref() {
        None => RecognizerKind::default(),
        Some(name) => name
            .parse()
            .map_err(|_| MapGestrError::UnknownRecognizer(name.to_string()))?,
    };

    Ok(AppConfig {
        log_level: raw.global.log_level.unwrap_or_else(|| "info".to_string()),
        log_file: raw.global.log_file,
        recognizer,
        inertia: raw.global.inertia.unwrap_or(true),
        pinch: raw.global.pinch.unwrap_or(false),
        thresholds: raw.thresholds.into_validated()?,
        initial_view: build_view(&raw.camera, &raw.gestures),
        device_usb_id: raw.device.usb_id.filter(|s| !s.is_empty()),
    })
}

/// Parse a TOML config file and return the fully resolved `AppConfig`.
pub fn parse_config_file(path: &Path) -> Result<AppConfig, MapGestrError> {
    let content = fs::read_to_string(path).map_err(|e| MapGestrError::ConfigReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_config_str(&content, path)
}
