//! Gesture classification.
//!
//! Consumes raw pointer samples and emits discrete semantic
//! [`GestureEvent`]s: tap, double-tap, long-tap, two-pointer touch, pan,
//! pinch and rotate. Classification is synchronous and non-blocking; the
//! single deferred decision (tap vs. double-tap) is resolved by calling
//! [`GestureClassifier::poll`] from the host's dispatch tick rather than
//! by waiting.

mod classifier;
mod config;

pub use classifier::GestureClassifier;
pub use config::GestureConfig;

use std::time::Instant;

use crate::geo::ScreenPoint;

/// Phase of a raw pointer sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    /// Pointer made contact.
    Down,
    /// Pointer moved while in contact.
    Move,
    /// Pointer released contact.
    Up,
}

/// The kind of pointing device, which selects the hit-test tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    /// Finger on a touch surface (larger hit tolerance).
    Touch,
    /// Precise pointer such as a mouse or stylus.
    Mouse,
}

/// A raw pointer sample delivered by the hosting platform.
///
/// Two-pointer gestures carry the second contact in `secondary`; the
/// classifier derives pinch scale and rotation angle from the pair.
#[derive(Debug, Clone, Copy)]
pub struct PointerSample {
    /// Sample phase.
    pub phase: PointerPhase,
    /// Pointing device kind.
    pub kind: PointerKind,
    /// Position of the primary pointer.
    pub primary: ScreenPoint,
    /// Position of the secondary pointer, if two are in contact.
    pub secondary: Option<ScreenPoint>,
    /// When the sample was taken.
    pub timestamp: Instant,
}

impl PointerSample {
    /// Creates a single-pointer sample.
    pub fn new(
        phase: PointerPhase,
        kind: PointerKind,
        position: ScreenPoint,
        timestamp: Instant,
    ) -> Self {
        Self {
            phase,
            kind,
            primary: position,
            secondary: None,
            timestamp,
        }
    }

    /// Adds a secondary pointer position to the sample.
    pub fn with_secondary(mut self, position: ScreenPoint) -> Self {
        self.secondary = Some(position);
        self
    }

    /// Number of pointers in contact (1 or 2).
    pub fn pointer_count(&self) -> u8 {
        if self.secondary.is_some() {
            2
        } else {
            1
        }
    }

    /// Centroid of the pointer positions.
    pub fn centroid(&self) -> ScreenPoint {
        match self.secondary {
            Some(secondary) => ScreenPoint::new(
                (self.primary.x + secondary.x) / 2.0,
                (self.primary.y + secondary.y) / 2.0,
            ),
            None => self.primary,
        }
    }
}

/// A recognized semantic gesture.
///
/// Transient: constructed by the classifier, dispatched, discarded.
/// Tap-family events carry screen positions; the view attaches geographic
/// coordinates at dispatch time, since it owns the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    /// Single tap, emitted after the double-tap window has passed.
    Tap(ScreenPoint),
    /// Two taps in quick succession at nearby positions.
    DoubleTap(ScreenPoint),
    /// Pointer held in place beyond the long-press duration.
    LongTap(ScreenPoint),
    /// Two-pointer tap (centroid of the two contacts).
    DoubleTouch(ScreenPoint),
    /// Incremental pan movement.
    Pan {
        /// Position at the previous pan increment (or the touch-down point
        /// for the first increment).
        from: ScreenPoint,
        /// Current pointer position.
        to: ScreenPoint,
    },
    /// Pinch update; `scale` is current inter-pointer distance divided by
    /// the initial distance (> 1 zooming in, < 1 zooming out).
    Pinch {
        /// Cumulative scale since the gesture began.
        scale: f64,
    },
    /// Rotation update, clockwise positive.
    Rotate {
        /// Cumulative rotation since the gesture began, in degrees.
        degrees: f64,
    },
}
