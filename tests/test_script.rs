//! Tests for `mapgestr::script` - the heuristic recognizer.
use mapgestr::config::Thresholds;
use mapgestr::detector::GestureDetector;
use mapgestr::processor::{GestureEvent, GestureLog};
use mapgestr::script::ScriptDetector;
use mapgestr::touch::{GestureKind, TouchPoint};
use mapgestr::view::ViewState;

// -- Helpers --------------------------------------------------

type Detector = ScriptDetector<ViewState, GestureLog>;

fn make_detector() -> Detector {
    ScriptDetector::new(ViewState::default(), GestureLog::default(), Thresholds::default())
}

fn tp(x: i32, y: i32, t: u32) -> TouchPoint {
    TouchPoint::new(x, y, t)
}

fn events(d: &Detector) -> Vec<GestureEvent> {
    d.processor().events.clone()
}

// -- Taps -----------------------------------------------------

#[test]
fn test_tap_fires_on_release() {
    let mut d = make_detector();
    d.tap(0, tp(100, 100, 1000));
    d.up(0, tp(100, 100, 1100));
    assert_eq!(events(&d), vec![GestureEvent::Tap]);
    assert!(!d.is_busy());
}

#[test]
fn test_double_tap_follows_tap() {
    let mut d = make_detector();
    d.tap(0, tp(100, 100, 1000));
    d.up(0, tp(100, 100, 1100));
    d.tap(0, tp(105, 100, 1300));
    d.up(0, tp(105, 100, 1400));
    assert_eq!(events(&d), vec![GestureEvent::Tap, GestureEvent::DoubleTap]);
    assert_eq!(d.history().current_gesture, GestureKind::DoubleTap);
}

#[test]
fn test_huge_click_area_double_tap() {
    let thresholds = Thresholds {
        click_area: 2_000_000_000,
        ..Thresholds::default()
    };
    let mut d = ScriptDetector::new(ViewState::default(), GestureLog::default(), thresholds);
    d.tap(0, tp(100, 100, 1000));
    d.up(0, tp(100, 100, 1100));
    d.tap(0, tp(100, 100, 1300));
    d.up(0, tp(100, 100, 1400));
    assert_eq!(events(&d), vec![GestureEvent::Tap, GestureEvent::DoubleTap]);
}

#[test]
fn test_late_second_tap_is_plain_tap() {
    let mut d = make_detector();
    d.tap(0, tp(100, 100, 1000));
    d.up(0, tp(100, 100, 1100));
    d.tap(0, tp(100, 100, 2500));
    d.up(0, tp(100, 100, 2600));
    assert_eq!(events(&d), vec![GestureEvent::Tap, GestureEvent::Tap]);
}

#[test]
fn test_two_finger_tap() {
    let mut d = make_detector();
    d.tap(0, tp(100, 100, 1000));
    d.tap(1, tp(300, 100, 1020));
    d.up(0, tp(100, 100, 1100));
    d.up(1, tp(300, 100, 1120));
    assert_eq!(events(&d), vec![GestureEvent::TwoFingerTap]);
}

// -- Long press -----------------------------------------------

#[test]
fn test_long_press_suppresses_tap() {
    let mut d = make_detector();
    d.tap(0, tp(100, 100, 1000));
    d.on_idle(1500);
    d.up(0, tp(100, 100, 1600));
    assert_eq!(events(&d), vec![GestureEvent::LongPress]);
}

#[test]
fn test_second_finger_cancels_long_press() {
    let mut d = make_detector();
    d.tap(0, tp(100, 100, 1000));
    d.tap(1, tp(300, 100, 1100));
    d.on_idle(2000);
    assert_eq!(d.processor().count(GestureEvent::LongPress), 0);
}

#[test]
fn test_move_cancels_long_press() {
    let mut d = make_detector();
    d.tap(0, tp(100, 100, 1000));
    d.move_to(0, tp(110, 100, 1100));
    d.on_idle(1500);
    assert!(events(&d).is_empty());
    d.up(0, tp(110, 100, 1600));
    assert!(events(&d).is_empty());
}

// -- Motion ---------------------------------------------------

#[test]
fn test_fast_drag_is_flick() {
    let mut d = make_detector();
    d.tap(0, tp(100, 100, 1000));
    d.move_to(0, tp(100, 200, 1050));
    d.up(0, tp(100, 200, 1080));
    assert_eq!(
        events(&d),
        vec![GestureEvent::Flick(0), GestureEvent::PanningFinished(0)]
    );
}

#[test]
fn test_slow_drag_is_pan() {
    let mut d = make_detector();
    d.tap(0, tp(100, 100, 1000));
    d.move_to(0, tp(100, 130, 1100));
    assert!(events(&d).is_empty());
    d.move_to(0, tp(100, 200, 1300));
    d.move_to(0, tp(100, 210, 1350));
    d.up(0, tp(100, 210, 1400));
    assert_eq!(
        events(&d),
        vec![
            GestureEvent::Pan(0),
            GestureEvent::Pan(0),
            GestureEvent::PanningFinished(0)
        ]
    );
}

#[test]
fn test_zoom_rotate_with_two_fingers() {
    let mut d = make_detector();
    d.tap(0, tp(100, 100, 1000));
    d.tap(1, tp(300, 100, 1020));
    d.move_to(1, tp(400, 150, 1100));
    assert_eq!(d.info().current_gesture, GestureKind::ZoomRotate);
    d.up(1, tp(400, 150, 1200));
    d.up(0, tp(100, 100, 1250));
    assert_eq!(events(&d), vec![GestureEvent::ZoomRotate]);
    assert_eq!(d.processor().count(GestureEvent::TwoFingerTap), 0);
    assert_eq!(d.processor().count(GestureEvent::Tap), 0);
}

#[test]
fn test_pinch_when_enabled() {
    let mut d = make_detector();
    d.set_pinch_enabled(true);
    d.tap(0, tp(100, 100, 1000));
    d.tap(1, tp(300, 100, 1020));
    d.move_to(1, tp(400, 100, 1100));
    assert_eq!(d.info().current_gesture, GestureKind::Pinch);
    assert_eq!(events(&d), vec![GestureEvent::ZoomRotate]);
}

#[test]
fn test_second_finger_ends_pan() {
    let mut d = make_detector();
    d.tap(0, tp(100, 100, 1000));
    d.move_to(0, tp(100, 200, 1300));
    d.tap(1, tp(300, 300, 1400));
    assert_eq!(
        events(&d),
        vec![GestureEvent::Pan(0), GestureEvent::PanningFinished(0)]
    );
}

// -- Robustness -----------------------------------------------

#[test]
fn test_move_for_released_finger_ignored() {
    let mut d = make_detector();
    d.move_to(0, tp(500, 500, 1000));
    assert!(events(&d).is_empty());
    assert!(!d.is_busy());
}

#[test]
fn test_halt_resets_contact() {
    let mut d = make_detector();
    d.tap(0, tp(100, 100, 1000));
    d.halt_gesture();
    assert!(!d.is_busy());
    assert_eq!(d.info().fingers_pressed, 0);
    d.on_idle(3000);
    assert!(events(&d).is_empty());
}

#[test]
fn test_finger_count_matches_pressed_flags() {
    let mut d = make_detector();
    let script: [(usize, bool); 8] = [
        (0, true),
        (1, true),
        (3, true),
        (1, false),
        (0, false),
        (5, true),
        (3, false),
        (5, false),
    ];
    for (i, (finger, down)) in script.iter().enumerate() {
        let t = 1000 + 10 * i as u32;
        if *down {
            d.tap(*finger, tp(100, 100, t));
        } else {
            d.up(*finger, tp(100, 100, t));
        }
        let info = d.info();
        let pressed = info.is_finger_pressed.iter().filter(|p| **p).count();
        assert_eq!(info.fingers_pressed, pressed, "after step {i}");
    }
    assert_eq!(d.info().fingers_pressed, 0);
}
