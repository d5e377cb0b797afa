//! Gesture recognition thresholds.

use std::time::Duration;

/// Thresholds driving gesture disambiguation.
///
/// All recognition rules are configuration, not hard-coded per event, so
/// hosts can retune for their input hardware.
#[derive(Debug, Clone)]
pub struct GestureConfig {
    /// Maximum pointer travel for a press to still count as a tap, in
    /// pixels.
    pub tap_slop_px: f64,

    /// Pointer travel beyond which a single-pointer drag becomes a pan,
    /// in pixels.
    pub pan_start_px: f64,

    /// Hold duration beyond which a stationary press becomes a long tap.
    pub long_press: Duration,

    /// Window after a tap release during which a second release promotes
    /// the pair to a double tap. A single tap is not reported until this
    /// window has elapsed.
    pub double_tap_window: Duration,

    /// Maximum distance between the two releases of a double tap, in
    /// pixels.
    pub double_tap_radius_px: f64,

    /// Minimum |scale - 1| before pinch updates start being reported.
    pub pinch_start_ratio: f64,

    /// Minimum rotation before rotate updates start being reported, in
    /// degrees.
    pub rotate_start_degrees: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            tap_slop_px: 12.0,
            pan_start_px: 8.0,
            long_press: Duration::from_millis(500),
            double_tap_window: Duration::from_millis(300),
            double_tap_radius_px: 40.0,
            pinch_start_ratio: 0.05,
            rotate_start_degrees: 5.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let config = GestureConfig::default();
        assert_eq!(config.long_press, Duration::from_millis(500));
        assert_eq!(config.double_tap_window, Duration::from_millis(300));
        assert!(config.pan_start_px < config.tap_slop_px + 10.0);
    }
}
