//! Region-change state machine.
//!
//! Tracks the `Idle → Changing → Idle` lifecycle of viewport mutation.
//! During a gesture the region changes at frame rate, so continuous
//! updates are coalesced: `update` only records the latest region (two
//! f64 copies), and [`RegionTracker::flush`], called once per dispatch
//! tick, reports at most the final region of that tick.

use tracing::debug;

use crate::geo::Region;

/// Phase transition produced by the tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegionPhase {
    /// The viewport began changing; carries the pre-change region.
    Started(Region),
    /// The viewport finished changing; carries the final region.
    Ended(Region),
}

/// Tracks begin/continuous/end phases of viewport mutation.
#[derive(Debug)]
pub struct RegionTracker {
    changing: bool,
    /// Latest region recorded during the current tick.
    pending: Option<Region>,
    /// Last region actually reported via flush.
    last_reported: Option<Region>,
}

impl Default for RegionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionTracker {
    /// Creates an idle tracker.
    pub fn new() -> Self {
        Self {
            changing: false,
            pending: None,
            last_reported: None,
        }
    }

    /// True while a change phase is open.
    pub fn is_changing(&self) -> bool {
        self.changing
    }

    /// Opens a change phase.
    ///
    /// Returns `Started` with the pre-change region. If a phase is
    /// already open (a re-entrant mutation, e.g. a programmatic region
    /// set during a gesture), the current phase is restarted: the caller
    /// receives `Ended` for the old phase first via [`restart`](Self::restart).
    ///
    /// # Arguments
    ///
    /// * `current` - The region before any mutation of this phase
    pub fn begin(&mut self, current: Region) -> Option<RegionPhase> {
        if self.changing {
            return None;
        }
        self.changing = true;
        self.pending = None;
        self.last_reported = None;
        debug!(region = %current, "Region change started");
        Some(RegionPhase::Started(current))
    }

    /// Restarts the phase for a re-entrant mutation.
    ///
    /// Closes the open phase (reporting `Ended` with the latest region)
    /// so the caller can immediately `begin` a fresh one. No-op when idle.
    pub fn restart(&mut self, current: Region) -> Option<RegionPhase> {
        if !self.changing {
            return None;
        }
        self.changing = false;
        self.pending = None;
        debug!(region = %current, "Region change restarted");
        Some(RegionPhase::Ended(current))
    }

    /// Records a continuous mutation.
    ///
    /// Called at high frequency; does nothing but store the region.
    /// Multiple updates within one dispatch tick collapse to the last.
    pub fn update(&mut self, region: Region) {
        if self.changing {
            self.pending = Some(region);
        }
    }

    /// Reports the coalesced update for this tick, if any.
    ///
    /// Returns the pending region iff it differs from the last reported
    /// one; repeated flushes without new updates report nothing.
    pub fn flush(&mut self) -> Option<Region> {
        let pending = self.pending.take()?;
        if self.last_reported == Some(pending) {
            return None;
        }
        self.last_reported = Some(pending);
        Some(pending)
    }

    /// Closes the change phase.
    ///
    /// Returns `Ended` with the final region. No-op when idle.
    pub fn end(&mut self, final_region: Region) -> Option<RegionPhase> {
        if !self.changing {
            return None;
        }
        self.changing = false;
        self.pending = None;
        debug!(region = %final_region, "Region change ended");
        Some(RegionPhase::Ended(final_region))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;

    fn region(lat: f64, zoom: f64) -> Region {
        Region::new(Coordinate::new(lat, 10.0).unwrap(), zoom).unwrap()
    }

    #[test]
    fn test_begin_reports_pre_change_region() {
        let mut tracker = RegionTracker::new();
        let initial = region(45.0, 12.0);

        assert_eq!(tracker.begin(initial), Some(RegionPhase::Started(initial)));
        assert!(tracker.is_changing());
    }

    #[test]
    fn test_begin_while_changing_is_noop() {
        let mut tracker = RegionTracker::new();
        tracker.begin(region(45.0, 12.0));
        assert!(tracker.begin(region(45.1, 12.0)).is_none());
    }

    #[test]
    fn test_updates_coalesce_to_final_region() {
        let mut tracker = RegionTracker::new();
        tracker.begin(region(45.0, 12.0));

        tracker.update(region(45.1, 12.0));
        tracker.update(region(45.2, 12.0));
        tracker.update(region(45.3, 12.0));

        // Only the final region of the tick is reported.
        assert_eq!(tracker.flush(), Some(region(45.3, 12.0)));
        assert_eq!(tracker.flush(), None);
    }

    #[test]
    fn test_flush_suppresses_repeated_region() {
        let mut tracker = RegionTracker::new();
        tracker.begin(region(45.0, 12.0));

        tracker.update(region(45.1, 12.0));
        assert!(tracker.flush().is_some());

        // Same region again: no new report.
        tracker.update(region(45.1, 12.0));
        assert_eq!(tracker.flush(), None);

        // Different region: reported.
        tracker.update(region(45.2, 12.0));
        assert_eq!(tracker.flush(), Some(region(45.2, 12.0)));
    }

    #[test]
    fn test_end_reports_final_region_and_idles() {
        let mut tracker = RegionTracker::new();
        tracker.begin(region(45.0, 12.0));
        tracker.update(region(45.5, 12.0));

        let ended = tracker.end(region(45.5, 12.0));
        assert_eq!(ended, Some(RegionPhase::Ended(region(45.5, 12.0))));
        assert!(!tracker.is_changing());

        // Pending update is discarded with the phase.
        assert_eq!(tracker.flush(), None);
    }

    #[test]
    fn test_end_while_idle_is_noop() {
        let mut tracker = RegionTracker::new();
        assert!(tracker.end(region(45.0, 12.0)).is_none());
    }

    #[test]
    fn test_restart_closes_then_allows_fresh_begin() {
        let mut tracker = RegionTracker::new();
        tracker.begin(region(45.0, 12.0));
        tracker.update(region(45.2, 12.0));

        let closed = tracker.restart(region(45.2, 12.0));
        assert_eq!(closed, Some(RegionPhase::Ended(region(45.2, 12.0))));
        assert!(!tracker.is_changing());

        // A fresh phase can start immediately (restart, not nesting).
        let started = tracker.begin(region(45.2, 12.0));
        assert_eq!(started, Some(RegionPhase::Started(region(45.2, 12.0))));
    }

    #[test]
    fn test_full_cycle_start_updates_end() {
        let mut tracker = RegionTracker::new();
        let initial = region(45.0, 12.0);

        let mut notifications = Vec::new();
        if let Some(p) = tracker.begin(initial) {
            notifications.push(format!("{:?}", p));
        }
        for step in 1..=3 {
            tracker.update(region(45.0 + step as f64 * 0.1, 12.0));
            if let Some(r) = tracker.flush() {
                notifications.push(format!("update {:.1}", r.center().lat()));
            }
        }
        if let Some(p) = tracker.end(region(45.3, 12.0)) {
            notifications.push(format!("{:?}", p));
        }

        assert_eq!(notifications.len(), 5); // start + 3 updates + end
    }
}
