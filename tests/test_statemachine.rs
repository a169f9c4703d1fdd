//! Tests for `mapgestr::statemachine` - tap, double tap, long press, pan,
//! two-finger gestures, timer ordering and recovery from unexpected input.
use mapgestr::config::Thresholds;
use mapgestr::detector::GestureDetector;
use mapgestr::processor::{GestureEvent, GestureLog};
use mapgestr::statemachine::{DetectorState, StateMachineDetector};
use mapgestr::touch::{GestureKind, MAX_FINGERS, TouchPoint};
use mapgestr::view::ViewState;

// -- Helpers --------------------------------------------------

type Detector = StateMachineDetector<ViewState, GestureLog>;

fn make_detector() -> Detector {
    make_detector_with_view(ViewState::default())
}

fn make_detector_with_view(view: ViewState) -> Detector {
    StateMachineDetector::new(view, GestureLog::default(), Thresholds::default())
}

fn tp(x: i32, y: i32, t: u32) -> TouchPoint {
    TouchPoint::new(x, y, t)
}

fn events(d: &Detector) -> Vec<GestureEvent> {
    d.processor().events.clone()
}

/// Tap at `(100, 100)` held for 100ms starting at `t`.
fn quick_tap(d: &mut Detector, t: u32) {
    d.tap(0, tp(100, 100, t));
    d.up(0, tp(100, 100, t + 100));
}

// -- Taps -----------------------------------------------------

#[test]
fn test_single_tap_fires_after_double_tap_window() {
    let mut d = make_detector();
    quick_tap(&mut d, 1000);
    assert_eq!(d.state(), DetectorState::Clicked);
    assert!(events(&d).is_empty());

    d.on_idle(2099);
    assert!(events(&d).is_empty());
    d.on_idle(2100);
    assert_eq!(events(&d), vec![GestureEvent::Tap]);
    assert_eq!(d.state(), DetectorState::None);
    assert!(!d.is_busy());
}

#[test]
fn test_tap_at_time_zero() {
    let mut d = make_detector();
    d.tap(0, tp(100, 100, 0));
    d.up(0, tp(100, 100, 300));
    d.on_idle(5000);
    assert_eq!(events(&d), vec![GestureEvent::Tap]);
}

#[test]
fn test_tap_keeps_release_point_in_history() {
    let mut d = make_detector();
    d.tap(0, tp(120, 80, 1000));
    d.up(0, tp(121, 81, 1100));
    d.on_idle(3000);
    assert_eq!(d.history().finger_up[0], tp(121, 81, 1100));
}

#[test]
fn test_press_too_long_for_click_is_not_a_tap() {
    let mut d = make_detector();
    d.tap(0, tp(100, 100, 1000));
    // Long-press timer fires first; lifting afterwards does not tap.
    d.up(0, tp(100, 100, 1700));
    d.on_idle(5000);
    assert_eq!(events(&d), vec![GestureEvent::LongPress]);
}

#[test]
fn test_double_tap() {
    let mut d = make_detector();
    quick_tap(&mut d, 1000);
    quick_tap(&mut d, 1300);
    d.on_idle(5000);
    assert_eq!(events(&d), vec![GestureEvent::DoubleTap]);
    assert_eq!(d.state(), DetectorState::None);
}

#[test]
fn test_huge_click_area_double_tap() {
    let thresholds = Thresholds {
        click_area: 2_000_000_000,
        ..Thresholds::default()
    };
    let mut d = StateMachineDetector::new(ViewState::default(), GestureLog::default(), thresholds);
    quick_tap(&mut d, 1000);
    quick_tap(&mut d, 1300);
    assert_eq!(events(&d), vec![GestureEvent::DoubleTap]);
}

#[test]
fn test_slow_second_tap_gives_two_taps() {
    let mut d = make_detector();
    quick_tap(&mut d, 1000);
    quick_tap(&mut d, 2300);
    d.on_idle(5000);
    assert_eq!(events(&d), vec![GestureEvent::Tap, GestureEvent::Tap]);
}

#[test]
fn test_distant_second_tap_is_not_double_tap() {
    let mut d = make_detector();
    quick_tap(&mut d, 1000);
    d.tap(0, tp(400, 100, 1300));
    d.up(0, tp(400, 100, 1400));
    d.on_idle(5000);
    let ev = events(&d);
    assert_eq!(ev.iter().filter(|e| **e == GestureEvent::DoubleTap).count(), 0);
    assert_eq!(ev, vec![GestureEvent::Tap]);
}

// -- Long press -----------------------------------------------

#[test]
fn test_long_press_fires_once() {
    let mut d = make_detector();
    d.tap(0, tp(100, 100, 1000));
    d.on_idle(1499);
    assert!(events(&d).is_empty());
    d.on_idle(1500);
    assert_eq!(d.state(), DetectorState::LongPressed);
    d.on_idle(1600);
    d.up(0, tp(100, 100, 1700));
    d.on_idle(5000);
    assert_eq!(events(&d), vec![GestureEvent::LongPress]);
}

#[test]
fn test_move_cancels_long_press() {
    let mut d = make_detector();
    d.tap(0, tp(100, 100, 1000));
    d.move_to(0, tp(110, 100, 1100));
    d.on_idle(1500);
    assert!(events(&d).is_empty());
    assert_eq!(d.state(), DetectorState::Pressed);

    d.up(0, tp(110, 100, 1600));
    d.on_idle(5000);
    assert_eq!(d.processor().count(GestureEvent::LongPress), 0);
}

#[test]
fn test_small_move_still_taps() {
    let mut d = make_detector();
    d.tap(0, tp(100, 100, 1000));
    d.move_to(0, tp(103, 100, 1050));
    d.up(0, tp(103, 100, 1100));
    d.on_idle(5000);
    assert_eq!(events(&d), vec![GestureEvent::Tap]);
}

#[test]
fn test_move_cancels_second_long_press() {
    let mut d = make_detector();
    quick_tap(&mut d, 1000);
    d.tap(0, tp(100, 100, 1300));
    d.move_to(0, tp(105, 100, 1350));
    d.on_idle(1800);
    assert_eq!(d.state(), DetectorState::SecondPressed);
    assert_eq!(d.processor().count(GestureEvent::SecondLongPress), 0);
}

#[test]
fn test_long_press_then_drag_pans() {
    let mut d = make_detector();
    d.tap(0, tp(100, 100, 1000));
    d.on_idle(1500);
    d.move_to(0, tp(100, 200, 1600));
    d.up(0, tp(100, 200, 1700));
    assert_eq!(
        events(&d),
        vec![
            GestureEvent::LongPress,
            GestureEvent::Pan(0),
            GestureEvent::PanningFinished(0)
        ]
    );
}

#[test]
fn test_second_long_press() {
    let mut d = make_detector();
    quick_tap(&mut d, 1000);
    d.tap(0, tp(100, 100, 1300));
    d.on_idle(1800);
    assert_eq!(d.state(), DetectorState::SecondLongPressed);
    d.up(0, tp(100, 100, 1900));
    d.on_idle(5000);
    assert_eq!(events(&d), vec![GestureEvent::SecondLongPress]);
}

// -- Pan ------------------------------------------------------

#[test]
fn test_pan_threshold_and_hysteresis() {
    let mut d = make_detector();
    d.tap(0, tp(100, 100, 1000));
    d.move_to(0, tp(100, 130, 1050));
    assert!(events(&d).is_empty());

    d.move_to(0, tp(100, 200, 1100));
    assert_eq!(d.state(), DetectorState::Moving);
    // Small follow-up moves keep panning.
    d.move_to(0, tp(100, 205, 1150));
    d.up(0, tp(100, 205, 1200));
    assert_eq!(
        events(&d),
        vec![
            GestureEvent::Pan(0),
            GestureEvent::Pan(0),
            GestureEvent::PanningFinished(0)
        ]
    );
    d.on_idle(5000);
    assert_eq!(d.processor().count(GestureEvent::LongPress), 0);
}

#[test]
fn test_example_drag_pans_once() {
    let mut d = make_detector();
    d.tap(0, tp(100, 100, 0));
    d.move_to(0, tp(200, 100, 200));
    assert_eq!(events(&d), vec![GestureEvent::Pan(0)]);
}

#[test]
fn test_pan_records_gesture_kind() {
    let mut d = make_detector();
    d.tap(0, tp(100, 100, 1000));
    d.move_to(0, tp(100, 200, 1100));
    assert_eq!(d.info().current_gesture, GestureKind::Pan);
}

// -- Two fingers ----------------------------------------------

#[test]
fn test_two_finger_tap() {
    let mut d = make_detector();
    d.tap(0, tp(100, 100, 1000));
    d.tap(1, tp(300, 100, 1050));
    assert_eq!(d.state(), DetectorState::TwoFingersPressed);
    d.up(0, tp(100, 100, 1150));
    d.up(1, tp(300, 100, 1200));
    d.on_idle(5000);
    assert_eq!(events(&d), vec![GestureEvent::TwoFingerTap]);
}

#[test]
fn test_zoom_rotate_then_pan_remaining_finger() {
    let mut d = make_detector();
    d.tap(0, tp(100, 100, 1000));
    d.tap(1, tp(300, 100, 1020));
    d.move_to(1, tp(400, 100, 1050));
    assert_eq!(d.state(), DetectorState::TwoFingersMoving);
    d.move_to(0, tp(50, 100, 1080));

    d.up(1, tp(400, 100, 1200));
    assert_eq!(d.state(), DetectorState::Moving);
    d.move_to(0, tp(40, 100, 1220));
    d.up(0, tp(40, 100, 1250));
    d.on_idle(5000);
    assert_eq!(
        events(&d),
        vec![
            GestureEvent::ZoomRotate,
            GestureEvent::ZoomRotate,
            GestureEvent::Pan(0),
            GestureEvent::PanningFinished(0)
        ]
    );
}

#[test]
fn test_zoom_release_without_pan_skips_panning_finished() {
    // Lift the second finger first, then the first.
    let mut d = make_detector();
    d.tap(0, tp(100, 100, 1000));
    d.tap(1, tp(300, 100, 1020));
    d.move_to(1, tp(400, 100, 1050));
    d.up(1, tp(400, 100, 1200));
    assert_eq!(d.state(), DetectorState::Moving);
    d.up(0, tp(100, 100, 1250));
    assert_eq!(events(&d), vec![GestureEvent::ZoomRotate]);
    assert_eq!(d.state(), DetectorState::None);

    // And the other way round.
    let mut d = make_detector();
    d.tap(0, tp(100, 100, 1000));
    d.tap(1, tp(300, 100, 1020));
    d.move_to(1, tp(400, 100, 1050));
    d.up(0, tp(100, 100, 1200));
    assert_eq!(d.state(), DetectorState::Finger2Moving);
    d.up(1, tp(400, 100, 1250));
    assert_eq!(events(&d), vec![GestureEvent::ZoomRotate]);
    assert_eq!(d.state(), DetectorState::None);
}

#[test]
fn test_zoom_is_not_followed_by_two_finger_tap() {
    let mut d = make_detector();
    d.tap(0, tp(100, 100, 1000));
    d.tap(1, tp(300, 100, 1020));
    d.move_to(1, tp(400, 100, 1050));
    d.up(0, tp(100, 100, 1100));
    d.up(1, tp(400, 100, 1150));
    d.on_idle(5000);
    assert_eq!(d.processor().count(GestureEvent::TwoFingerTap), 0);
}

#[test]
fn test_second_finger_alone_pans() {
    let mut d = make_detector();
    d.tap(1, tp(300, 300, 1000));
    assert_eq!(d.state(), DetectorState::Finger2Pressed);
    d.move_to(1, tp(300, 400, 1100));
    d.up(1, tp(300, 400, 1200));
    assert_eq!(
        events(&d),
        vec![GestureEvent::Pan(1), GestureEvent::PanningFinished(1)]
    );
}

#[test]
fn test_third_finger_is_tracked_only() {
    let mut d = make_detector();
    d.tap(2, tp(500, 500, 1000));
    assert_eq!(d.state(), DetectorState::None);
    assert_eq!(d.info().fingers_pressed, 1);
    d.up(2, tp(500, 500, 1100));
    assert_eq!(d.info().fingers_pressed, 0);
    assert!(events(&d).is_empty());
}

// -- Gesture availability -------------------------------------

#[test]
fn test_disabled_gesture_changes_state_but_not_processor() {
    let mut view = ViewState::default();
    view.set_gesture_enabled(GestureKind::LongPress, false);
    let mut d = make_detector_with_view(view);
    d.tap(0, tp(100, 100, 1000));
    d.on_idle(1500);
    assert_eq!(d.state(), DetectorState::LongPressed);
    assert!(events(&d).is_empty());
}

#[test]
fn test_disabled_tap_is_silent() {
    let mut view = ViewState::default();
    view.set_gesture_enabled(GestureKind::Tap, false);
    let mut d = make_detector_with_view(view);
    quick_tap(&mut d, 1000);
    d.on_idle(5000);
    assert!(events(&d).is_empty());
    assert_eq!(d.state(), DetectorState::None);
}

// -- Robustness -----------------------------------------------

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
}

#[test]
fn test_out_of_range_finger_is_ignored() {
    let mut d = make_detector();
    d.tap(MAX_FINGERS, tp(100, 100, 1000));
    assert_eq!(d.info().fingers_pressed, 0);
    assert_eq!(d.state(), DetectorState::None);
}

#[test]
fn test_unexpected_up_returns_to_none() {
    let mut d = make_detector();
    d.up(0, tp(100, 100, 1000));
    assert_eq!(d.state(), DetectorState::None);
    assert!(events(&d).is_empty());

    // The machine still works afterwards.
    quick_tap(&mut d, 2000);
    d.on_idle(4000);
    assert_eq!(events(&d), vec![GestureEvent::Tap]);
}

#[test]
fn test_halt_at_rest_is_noop() {
    let mut d = make_detector();
    d.halt_gesture();
    d.halt_gesture();
    assert_eq!(d.state(), DetectorState::None);
    assert!(events(&d).is_empty());
}

#[test]
fn test_halt_drops_pending_tap() {
    let mut d = make_detector();
    quick_tap(&mut d, 1000);
    d.halt_gesture();
    d.on_idle(5000);
    assert_eq!(d.state(), DetectorState::None);
    assert!(events(&d).is_empty());
    assert!(!d.is_busy());
}
