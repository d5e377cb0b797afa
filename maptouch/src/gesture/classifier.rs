//! The gesture classifier state machine.

use std::time::Instant;

use tracing::trace;

use super::{GestureConfig, GestureEvent, PointerKind, PointerPhase, PointerSample};
use crate::geo::ScreenPoint;

/// A tap release held back until the double-tap window resolves.
#[derive(Debug, Clone, Copy)]
struct PendingTap {
    position: ScreenPoint,
    released_at: Instant,
    kind: PointerKind,
}

/// Classifier state between samples.
#[derive(Debug, Clone, Copy)]
enum State {
    /// No pointer in contact.
    Idle,

    /// Single pointer down, not yet committed to any gesture.
    Touching {
        down: ScreenPoint,
        down_at: Instant,
        kind: PointerKind,
        /// Cleared once the pointer wanders beyond the tap slop; the
        /// press can then no longer end as a tap or long tap.
        tap_eligible: bool,
    },

    /// Single pointer committed to a pan.
    Panning { last: ScreenPoint },

    /// Two pointers in contact; may become pinch/rotate or a two-pointer
    /// tap.
    TwoPointer {
        initial_span: f64,
        initial_angle: f64,
        centroid: ScreenPoint,
        started_at: Instant,
        pinching: bool,
        rotating: bool,
    },

    /// Gesture already reported (e.g. long tap); ignore until release.
    Consumed,
}

/// Classifies raw pointer samples into semantic gestures.
///
/// The classifier runs synchronously on the input thread and never
/// blocks. Tap vs. double-tap disambiguation is the one deferred
/// decision: a release parks a pending tap which [`poll`](Self::poll)
/// promotes to a [`GestureEvent::Tap`] once the double-tap window has
/// elapsed without a second release.
#[derive(Debug)]
pub struct GestureClassifier {
    config: GestureConfig,
    state: State,
    pending_tap: Option<PendingTap>,
}

impl GestureClassifier {
    /// Creates a classifier with the given thresholds.
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            state: State::Idle,
            pending_tap: None,
        }
    }

    /// Creates a classifier with default thresholds.
    pub fn with_defaults() -> Self {
        Self::new(GestureConfig::default())
    }

    /// Current configuration.
    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// True if no gesture is in progress and no tap is pending.
    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::Idle) && self.pending_tap.is_none()
    }

    /// Feeds one pointer sample through the state machine.
    ///
    /// Returns the gestures recognized by this sample: pan, pinch and
    /// rotate report incrementally (0..N events over a gesture), the tap
    /// family reports at most once per gesture.
    pub fn handle(&mut self, sample: &PointerSample) -> Vec<GestureEvent> {
        let mut events = Vec::new();

        // A new sample can retire a pending tap whose window has lapsed,
        // exactly like a new burst completing the previous one.
        if let Some(tap) = self.take_expired_pending(sample.timestamp) {
            events.push(GestureEvent::Tap(tap.position));
        }

        match sample.phase {
            PointerPhase::Down => self.on_down(sample),
            PointerPhase::Move => self.on_move(sample, &mut events),
            PointerPhase::Up => self.on_up(sample, &mut events),
        }

        if !events.is_empty() {
            trace!(?events, "Classified gestures");
        }
        events
    }

    /// Deferred check for time-driven promotions.
    ///
    /// Call once per dispatch tick. Promotes a pending tap to
    /// [`GestureEvent::Tap`] after the double-tap window, and a held
    /// stationary press to [`GestureEvent::LongTap`] after the long-press
    /// duration. The returned kind is the device that produced the
    /// original press, so hit tolerance stays correct across the deferral.
    pub fn poll(&mut self, now: Instant) -> Option<(GestureEvent, PointerKind)> {
        if let Some(tap) = self.take_expired_pending(now) {
            return Some((GestureEvent::Tap(tap.position), tap.kind));
        }

        if let State::Touching {
            down,
            down_at,
            kind,
            tap_eligible: true,
        } = self.state
        {
            if now.saturating_duration_since(down_at) >= self.config.long_press {
                self.state = State::Consumed;
                return Some((GestureEvent::LongTap(down), kind));
            }
        }

        None
    }

    fn take_expired_pending(&mut self, now: Instant) -> Option<PendingTap> {
        let tap = self.pending_tap?;
        if now.saturating_duration_since(tap.released_at) >= self.config.double_tap_window {
            self.pending_tap.take()
        } else {
            None
        }
    }

    fn on_down(&mut self, sample: &PointerSample) {
        if let Some(secondary) = sample.secondary {
            self.state = self.two_pointer_state(sample, secondary);
        } else {
            self.state = State::Touching {
                down: sample.primary,
                down_at: sample.timestamp,
                kind: sample.kind,
                tap_eligible: true,
            };
        }
    }

    fn on_move(&mut self, sample: &PointerSample, events: &mut Vec<GestureEvent>) {
        match self.state {
            State::Idle | State::Consumed => {}

            State::Touching {
                down,
                down_at,
                kind,
                tap_eligible,
            } => {
                if let Some(secondary) = sample.secondary {
                    self.state = self.two_pointer_state(sample, secondary);
                    return;
                }

                let travel = sample.primary.distance_to(down);
                if travel > self.config.pan_start_px {
                    self.state = State::Panning {
                        last: sample.primary,
                    };
                    events.push(GestureEvent::Pan {
                        from: down,
                        to: sample.primary,
                    });
                } else if travel > self.config.tap_slop_px {
                    // Too much wander for the tap family, not enough for a
                    // pan; the press stays live but can only become a pan.
                    self.state = State::Touching {
                        down,
                        down_at,
                        kind,
                        tap_eligible: false,
                    };
                } else if tap_eligible
                    && sample.timestamp.saturating_duration_since(down_at)
                        >= self.config.long_press
                {
                    self.state = State::Consumed;
                    events.push(GestureEvent::LongTap(down));
                }
            }

            State::Panning { last } => {
                events.push(GestureEvent::Pan {
                    from: last,
                    to: sample.primary,
                });
                self.state = State::Panning {
                    last: sample.primary,
                };
            }

            State::TwoPointer {
                initial_span,
                initial_angle,
                started_at,
                mut pinching,
                mut rotating,
                ..
            } => {
                let Some(secondary) = sample.secondary else {
                    // One finger lifted mid-gesture; hold position until
                    // the release sample arrives.
                    return;
                };

                let span = sample.primary.distance_to(secondary);
                let angle = pointer_angle(sample.primary, secondary);
                let scale = if initial_span > f64::EPSILON {
                    span / initial_span
                } else {
                    1.0
                };
                let degrees = normalize_degrees((angle - initial_angle).to_degrees());

                // Pinch is checked before rotate: converging/diverging
                // distance wins the disambiguation.
                if (scale - 1.0).abs() >= self.config.pinch_start_ratio {
                    pinching = true;
                }
                if degrees.abs() >= self.config.rotate_start_degrees {
                    rotating = true;
                }

                if pinching {
                    events.push(GestureEvent::Pinch { scale });
                }
                if rotating {
                    events.push(GestureEvent::Rotate { degrees });
                }

                self.state = State::TwoPointer {
                    initial_span,
                    initial_angle,
                    centroid: sample.centroid(),
                    started_at,
                    pinching,
                    rotating,
                };
            }
        }
    }

    fn on_up(&mut self, sample: &PointerSample, events: &mut Vec<GestureEvent>) {
        match self.state {
            State::Touching {
                down,
                down_at,
                kind,
                tap_eligible,
            } => {
                if !tap_eligible {
                    // Wandered beyond the slop without ever panning.
                    self.state = State::Idle;
                    return;
                }
                let held = sample.timestamp.saturating_duration_since(down_at);
                if held >= self.config.long_press {
                    events.push(GestureEvent::LongTap(down));
                } else if let Some(first) = self.pending_tap.take() {
                    // Second release inside the window and radius: promote
                    // the pair, demote the pending single tap.
                    let in_window = sample
                        .timestamp
                        .saturating_duration_since(first.released_at)
                        < self.config.double_tap_window;
                    let in_radius = sample.primary.distance_to(first.position)
                        <= self.config.double_tap_radius_px;
                    if in_window && in_radius {
                        events.push(GestureEvent::DoubleTap(sample.primary));
                    } else {
                        // Unrelated release; the first tap stands alone.
                        events.push(GestureEvent::Tap(first.position));
                        self.pending_tap = Some(PendingTap {
                            position: sample.primary,
                            released_at: sample.timestamp,
                            kind,
                        });
                    }
                } else {
                    self.pending_tap = Some(PendingTap {
                        position: sample.primary,
                        released_at: sample.timestamp,
                        kind,
                    });
                }
            }

            State::TwoPointer {
                centroid,
                started_at,
                pinching,
                rotating,
                ..
            } => {
                let brief = sample.timestamp.saturating_duration_since(started_at)
                    < self.config.long_press;
                if !pinching && !rotating && brief {
                    events.push(GestureEvent::DoubleTouch(centroid));
                }
            }

            State::Idle | State::Panning { .. } | State::Consumed => {}
        }

        self.state = State::Idle;
    }

    fn two_pointer_state(&self, sample: &PointerSample, secondary: ScreenPoint) -> State {
        State::TwoPointer {
            initial_span: sample.primary.distance_to(secondary),
            initial_angle: pointer_angle(sample.primary, secondary),
            centroid: sample.centroid(),
            started_at: sample.timestamp,
            pinching: false,
            rotating: false,
        }
    }
}

/// Angle of the segment between two pointers, in radians.
///
/// Screen space has y pointing down, so increasing angle is clockwise,
/// which matches the "clockwise positive" rotation convention.
fn pointer_angle(a: ScreenPoint, b: ScreenPoint) -> f64 {
    (b.y - a.y).atan2(b.x - a.x)
}

/// Normalizes an angle in degrees to (-180, 180].
fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::PointerKind;
    use std::time::Duration;

    fn point(x: f64, y: f64) -> ScreenPoint {
        ScreenPoint::new(x, y)
    }

    fn down(p: ScreenPoint, t: Instant) -> PointerSample {
        PointerSample::new(PointerPhase::Down, PointerKind::Touch, p, t)
    }

    fn moved(p: ScreenPoint, t: Instant) -> PointerSample {
        PointerSample::new(PointerPhase::Move, PointerKind::Touch, p, t)
    }

    fn up(p: ScreenPoint, t: Instant) -> PointerSample {
        PointerSample::new(PointerPhase::Up, PointerKind::Touch, p, t)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// Performs a quick stationary tap at `p`, starting at `t`.
    fn quick_tap(classifier: &mut GestureClassifier, p: ScreenPoint, t: Instant) -> Vec<GestureEvent> {
        let mut events = classifier.handle(&down(p, t));
        events.extend(classifier.handle(&up(p, t + ms(50))));
        events
    }

    mod tap_family {
        use super::*;

        #[test]
        fn test_single_tap_fires_after_window() {
            let mut classifier = GestureClassifier::with_defaults();
            let start = Instant::now();

            let events = quick_tap(&mut classifier, point(100.0, 100.0), start);
            assert!(events.is_empty(), "Tap must be held for the window");

            // Before the window: still pending.
            assert!(classifier.poll(start + ms(200)).is_none());

            // After the window: exactly one Tap, keeping the device kind.
            let promoted = classifier.poll(start + ms(400));
            assert_eq!(
                promoted,
                Some((GestureEvent::Tap(point(100.0, 100.0)), PointerKind::Touch))
            );
            assert!(classifier.poll(start + ms(500)).is_none());
        }

        #[test]
        fn test_promoted_mouse_tap_keeps_mouse_kind() {
            let mut classifier = GestureClassifier::with_defaults();
            let start = Instant::now();
            let p = point(100.0, 100.0);

            classifier.handle(&PointerSample::new(
                PointerPhase::Down,
                PointerKind::Mouse,
                p,
                start,
            ));
            classifier.handle(&PointerSample::new(
                PointerPhase::Up,
                PointerKind::Mouse,
                p,
                start + ms(50),
            ));

            let promoted = classifier.poll(start + ms(400));
            assert_eq!(promoted, Some((GestureEvent::Tap(p), PointerKind::Mouse)));
        }

        #[test]
        fn test_double_tap_fires_once_and_suppresses_taps() {
            let mut classifier = GestureClassifier::with_defaults();
            let start = Instant::now();

            let first = quick_tap(&mut classifier, point(100.0, 100.0), start);
            assert!(first.is_empty());

            let second = quick_tap(&mut classifier, point(105.0, 102.0), start + ms(150));
            assert_eq!(
                second,
                vec![GestureEvent::DoubleTap(point(105.0, 102.0))]
            );

            // No stray Tap afterwards.
            assert!(classifier.poll(start + ms(1000)).is_none());
        }

        #[test]
        fn test_second_tap_outside_radius_is_two_taps() {
            let mut classifier = GestureClassifier::with_defaults();
            let start = Instant::now();

            quick_tap(&mut classifier, point(100.0, 100.0), start);
            let second = quick_tap(&mut classifier, point(300.0, 300.0), start + ms(150));

            // First tap released standalone, second now pending.
            assert_eq!(second, vec![GestureEvent::Tap(point(100.0, 100.0))]);
            let promoted = classifier.poll(start + ms(800));
            assert_eq!(
                promoted,
                Some((GestureEvent::Tap(point(300.0, 300.0)), PointerKind::Touch))
            );
        }

        #[test]
        fn test_slow_second_tap_is_two_single_taps() {
            let mut classifier = GestureClassifier::with_defaults();
            let start = Instant::now();

            quick_tap(&mut classifier, point(100.0, 100.0), start);

            // Second tap arrives after the window: first tap is retired by
            // the down sample, second becomes pending.
            let second = quick_tap(&mut classifier, point(100.0, 100.0), start + ms(500));
            assert_eq!(second, vec![GestureEvent::Tap(point(100.0, 100.0))]);

            let promoted = classifier.poll(start + ms(1200));
            assert_eq!(
                promoted,
                Some((GestureEvent::Tap(point(100.0, 100.0)), PointerKind::Touch))
            );
        }

        #[test]
        fn test_long_tap_on_poll() {
            let mut classifier = GestureClassifier::with_defaults();
            let start = Instant::now();

            classifier.handle(&down(point(100.0, 100.0), start));
            assert!(classifier.poll(start + ms(300)).is_none());

            let held = classifier.poll(start + ms(600));
            assert_eq!(
                held,
                Some((GestureEvent::LongTap(point(100.0, 100.0)), PointerKind::Touch))
            );

            // Release produces nothing further.
            let events = classifier.handle(&up(point(100.0, 100.0), start + ms(700)));
            assert!(events.is_empty());
        }

        #[test]
        fn test_long_tap_on_release_without_poll() {
            let mut classifier = GestureClassifier::with_defaults();
            let start = Instant::now();

            classifier.handle(&down(point(100.0, 100.0), start));
            let events = classifier.handle(&up(point(100.0, 100.0), start + ms(700)));
            assert_eq!(events, vec![GestureEvent::LongTap(point(100.0, 100.0))]);
        }

        #[test]
        fn test_wander_beyond_slop_cancels_tap_and_long_tap() {
            // Slop tighter than the pan threshold so the press can fall
            // out of the tap family without becoming a pan.
            let config = GestureConfig {
                tap_slop_px: 4.0,
                pan_start_px: 8.0,
                ..GestureConfig::default()
            };
            let mut classifier = GestureClassifier::new(config);
            let start = Instant::now();

            classifier.handle(&down(point(100.0, 100.0), start));
            // 6px of travel: beyond the slop, short of a pan.
            let events = classifier.handle(&moved(point(106.0, 100.0), start + ms(50)));
            assert!(events.is_empty());

            // Holding past the long-press duration no longer promotes.
            assert!(classifier.poll(start + ms(600)).is_none());

            // Releasing reports neither a tap nor a pending one.
            let release = classifier.handle(&up(point(106.0, 100.0), start + ms(700)));
            assert!(release.is_empty());
            assert!(classifier.poll(start + ms(1200)).is_none());
            assert!(classifier.is_idle());
        }

        #[test]
        fn test_travel_within_slop_keeps_tap_eligible() {
            let config = GestureConfig {
                tap_slop_px: 4.0,
                pan_start_px: 8.0,
                ..GestureConfig::default()
            };
            let mut classifier = GestureClassifier::new(config);
            let start = Instant::now();

            classifier.handle(&down(point(100.0, 100.0), start));
            classifier.handle(&moved(point(103.0, 100.0), start + ms(30)));
            classifier.handle(&up(point(103.0, 100.0), start + ms(60)));

            let promoted = classifier.poll(start + ms(500));
            assert!(matches!(promoted, Some((GestureEvent::Tap(_), _))));
        }

        #[test]
        fn test_movement_cancels_tap() {
            let mut classifier = GestureClassifier::with_defaults();
            let start = Instant::now();

            classifier.handle(&down(point(100.0, 100.0), start));
            classifier.handle(&moved(point(150.0, 100.0), start + ms(50)));
            classifier.handle(&up(point(150.0, 100.0), start + ms(100)));

            assert!(classifier.poll(start + ms(1000)).is_none());
        }
    }

    mod pan {
        use super::*;

        #[test]
        fn test_pan_reports_incrementally() {
            let mut classifier = GestureClassifier::with_defaults();
            let start = Instant::now();

            classifier.handle(&down(point(100.0, 100.0), start));
            let first = classifier.handle(&moved(point(120.0, 105.0), start + ms(16)));
            assert_eq!(
                first,
                vec![GestureEvent::Pan {
                    from: point(100.0, 100.0),
                    to: point(120.0, 105.0)
                }]
            );

            let second = classifier.handle(&moved(point(150.0, 120.0), start + ms(32)));
            assert_eq!(
                second,
                vec![GestureEvent::Pan {
                    from: point(120.0, 105.0),
                    to: point(150.0, 120.0)
                }]
            );

            let release = classifier.handle(&up(point(150.0, 120.0), start + ms(48)));
            assert!(release.is_empty());
            assert!(classifier.is_idle());
        }

        #[test]
        fn test_small_jitter_does_not_start_pan() {
            let mut classifier = GestureClassifier::with_defaults();
            let start = Instant::now();

            classifier.handle(&down(point(100.0, 100.0), start));
            let events = classifier.handle(&moved(point(103.0, 101.0), start + ms(16)));
            assert!(events.is_empty());
        }

        #[test]
        fn test_random_jitter_within_threshold_never_pans() {
            use rand::rngs::StdRng;
            use rand::{Rng, SeedableRng};

            let mut rng = StdRng::seed_from_u64(42);
            let mut classifier = GestureClassifier::with_defaults();
            let start = Instant::now();
            let threshold = classifier.config().pan_start_px;

            classifier.handle(&down(point(200.0, 200.0), start));
            for step in 1..50u64 {
                // Jitter strictly inside the pan threshold radius.
                let radius = rng.random_range(0.0..threshold * 0.9);
                let angle = rng.random_range(0.0..std::f64::consts::TAU);
                let p = point(200.0 + radius * angle.cos(), 200.0 + radius * angle.sin());
                let events = classifier.handle(&moved(p, start + ms(step * 4)));
                assert!(events.is_empty(), "Jitter at {} started a gesture", p);
            }
        }
    }

    mod multi_pointer {
        use super::*;

        fn two_down(a: ScreenPoint, b: ScreenPoint, t: Instant) -> PointerSample {
            PointerSample::new(PointerPhase::Down, PointerKind::Touch, a, t).with_secondary(b)
        }

        fn two_move(a: ScreenPoint, b: ScreenPoint, t: Instant) -> PointerSample {
            PointerSample::new(PointerPhase::Move, PointerKind::Touch, a, t).with_secondary(b)
        }

        #[test]
        fn test_pinch_scale_tracks_span_ratio() {
            let mut classifier = GestureClassifier::with_defaults();
            let start = Instant::now();

            classifier.handle(&two_down(point(100.0, 100.0), point(200.0, 100.0), start));

            // Spread from 100px to 150px: scale 1.5.
            let events = classifier.handle(&two_move(
                point(75.0, 100.0),
                point(225.0, 100.0),
                start + ms(50),
            ));
            assert_eq!(events.len(), 1);
            match events[0] {
                GestureEvent::Pinch { scale } => assert!((scale - 1.5).abs() < 1e-9),
                ref other => panic!("Expected Pinch, got {:?}", other),
            }
        }

        #[test]
        fn test_pinch_below_threshold_not_reported() {
            let mut classifier = GestureClassifier::with_defaults();
            let start = Instant::now();

            classifier.handle(&two_down(point(100.0, 100.0), point(200.0, 100.0), start));
            let events = classifier.handle(&two_move(
                point(99.0, 100.0),
                point(201.0, 100.0),
                start + ms(50),
            ));
            assert!(events.is_empty());
        }

        #[test]
        fn test_rotate_clockwise_positive() {
            let mut classifier = GestureClassifier::with_defaults();
            let start = Instant::now();

            // Horizontal pair rotated to vertical: 90 degrees clockwise in
            // screen space (y down).
            classifier.handle(&two_down(point(100.0, 100.0), point(200.0, 100.0), start));
            let events = classifier.handle(&two_move(
                point(150.0, 50.0),
                point(150.0, 150.0),
                start + ms(80),
            ));

            let degrees = events
                .iter()
                .find_map(|e| match e {
                    GestureEvent::Rotate { degrees } => Some(*degrees),
                    _ => None,
                })
                .expect("rotation should be reported");
            assert!((degrees - 90.0).abs() < 1e-6);
        }

        #[test]
        fn test_two_pointer_tap_is_double_touch() {
            let mut classifier = GestureClassifier::with_defaults();
            let start = Instant::now();

            classifier.handle(&two_down(point(100.0, 100.0), point(200.0, 100.0), start));
            let events = classifier.handle(&up(point(100.0, 100.0), start + ms(80)));

            assert_eq!(events, vec![GestureEvent::DoubleTouch(point(150.0, 100.0))]);
        }

        #[test]
        fn test_pinch_suppresses_double_touch() {
            let mut classifier = GestureClassifier::with_defaults();
            let start = Instant::now();

            classifier.handle(&two_down(point(100.0, 100.0), point(200.0, 100.0), start));
            classifier.handle(&two_move(
                point(50.0, 100.0),
                point(250.0, 100.0),
                start + ms(40),
            ));
            let events = classifier.handle(&up(point(50.0, 100.0), start + ms(80)));
            assert!(events.is_empty());
        }
    }

    #[test]
    fn test_normalize_degrees() {
        assert!((normalize_degrees(190.0) - (-170.0)).abs() < 1e-9);
        assert!((normalize_degrees(-190.0) - 170.0).abs() < 1e-9);
        assert!((normalize_degrees(180.0) - 180.0).abs() < 1e-9);
        assert!((normalize_degrees(0.0)).abs() < 1e-9);
    }
}
