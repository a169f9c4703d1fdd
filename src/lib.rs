//! mapgestr - touch gesture recognition and inertial camera motion for map
//! views.
//!
//! Two recognizer strategies ([`statemachine`] and [`script`]) classify raw
//! finger events into map gestures; [`inertial`] adds fling momentum on top
//! of either, and [`camera`] animates the view towards gesture targets.

pub mod camera;
pub mod config;
pub mod detector;
pub mod event;
pub mod inertial;
pub mod manager;
pub mod processor;
pub mod script;
pub mod statemachine;
pub mod timer;
pub mod touch;
pub mod view;
