//! The observer notification surface.
//!
//! All interactive and asynchronous notifications funnel through one
//! [`EventDispatcher`] per map view, which forwards them to a single
//! observer channel in recognition order. Every notification kind is
//! independently subscribable via [`Subscriptions`]; unsubscribed events
//! are dropped before delivery.

use std::collections::HashSet;

use tokio::sync::mpsc;
use tracing::trace;

use crate::entity::{Cluster, Entity};
use crate::geo::{BoundingBox, Coordinate, Region, ScreenPoint};
use crate::jobs::JobId;

/// Receiving half of the observer channel.
pub type MapEventReceiver = mpsc::UnboundedReceiver<MapEvent>;

/// A notification delivered to the map view's observer.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// The viewport began changing; carries the pre-change region.
    RegionChangeStart(Region),
    /// The viewport changed; coalesced to at most one per dispatch tick.
    RegionChangeUpdate(Region),
    /// The viewport finished changing; carries the final region.
    RegionChangeEnd(Region),

    /// The map was tapped.
    Tap(Coordinate),
    /// The map was long-tapped.
    LongTap(Coordinate),
    /// The map was double-tapped (the view also zooms in).
    DoubleTap(Coordinate),
    /// The map was two-pointer-tapped (the view also zooms out); carries
    /// the centroid of the contacts.
    DoubleTouch(ScreenPoint),
    /// Incremental pan movement.
    Pan {
        /// Previous pointer position.
        from: ScreenPoint,
        /// Current pointer position.
        to: ScreenPoint,
    },
    /// Pinch update; scale > 1 zooms in, < 1 zooms out.
    Pinch {
        /// Cumulative scale since the pinch began.
        scale: f64,
    },
    /// Rotation update, clockwise positive, in degrees.
    Rotate {
        /// Cumulative rotation since the gesture began.
        degrees: f64,
    },

    /// A pan moved the region into untiled territory while offline.
    OfflineStall,

    /// A map-data POI was tapped.
    SelectMapPoi(Entity),
    /// An annotation was tapped.
    SelectAnnotation(Entity),
    /// A custom POI was tapped.
    SelectCustomPoi(Entity),
    /// A POI cluster was tapped.
    SelectCluster(Cluster),
    /// The compass was tapped.
    SelectCompass,
    /// The current-position icon was tapped.
    SelectCurrentPosition,
    /// An overlay was tapped.
    SelectOverlay {
        /// Identifier of the tapped overlay.
        overlay_id: i32,
        /// Where the tap landed.
        location: Coordinate,
    },
    /// The attribution label was tapped.
    AttributionTapped,

    /// An image-render job finished (fire-and-forget; failure carries no
    /// extra payload either).
    RenderFinished {
        /// The finished job.
        job: JobId,
    },
    /// A real-reach computation completed; `bounding_box` is `None` when
    /// the computation failed or was cancelled.
    RealReachCompleted {
        /// The completed job.
        job: JobId,
        /// Extent of the reachability polygon, absent on failure.
        bounding_box: Option<BoundingBox>,
    },
}

impl MapEvent {
    /// The subscription kind this event belongs to.
    pub fn kind(&self) -> EventKind {
        match self {
            MapEvent::RegionChangeStart(_) => EventKind::RegionChangeStart,
            MapEvent::RegionChangeUpdate(_) => EventKind::RegionChangeUpdate,
            MapEvent::RegionChangeEnd(_) => EventKind::RegionChangeEnd,
            MapEvent::Tap(_) => EventKind::Tap,
            MapEvent::LongTap(_) => EventKind::LongTap,
            MapEvent::DoubleTap(_) => EventKind::DoubleTap,
            MapEvent::DoubleTouch(_) => EventKind::DoubleTouch,
            MapEvent::Pan { .. } => EventKind::Pan,
            MapEvent::Pinch { .. } => EventKind::Pinch,
            MapEvent::Rotate { .. } => EventKind::Rotate,
            MapEvent::OfflineStall => EventKind::OfflineStall,
            MapEvent::SelectMapPoi(_) => EventKind::SelectMapPoi,
            MapEvent::SelectAnnotation(_) => EventKind::SelectAnnotation,
            MapEvent::SelectCustomPoi(_) => EventKind::SelectCustomPoi,
            MapEvent::SelectCluster(_) => EventKind::SelectCluster,
            MapEvent::SelectCompass => EventKind::SelectCompass,
            MapEvent::SelectCurrentPosition => EventKind::SelectCurrentPosition,
            MapEvent::SelectOverlay { .. } => EventKind::SelectOverlay,
            MapEvent::AttributionTapped => EventKind::AttributionTapped,
            MapEvent::RenderFinished { .. } => EventKind::RenderFinished,
            MapEvent::RealReachCompleted { .. } => EventKind::RealReachCompleted,
        }
    }
}

/// Discriminant for subscription filtering, one per notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum EventKind {
    RegionChangeStart,
    RegionChangeUpdate,
    RegionChangeEnd,
    Tap,
    LongTap,
    DoubleTap,
    DoubleTouch,
    Pan,
    Pinch,
    Rotate,
    OfflineStall,
    SelectMapPoi,
    SelectAnnotation,
    SelectCustomPoi,
    SelectCluster,
    SelectCompass,
    SelectCurrentPosition,
    SelectOverlay,
    AttributionTapped,
    RenderFinished,
    RealReachCompleted,
}

impl EventKind {
    /// All notification kinds.
    pub const ALL: [EventKind; 21] = [
        EventKind::RegionChangeStart,
        EventKind::RegionChangeUpdate,
        EventKind::RegionChangeEnd,
        EventKind::Tap,
        EventKind::LongTap,
        EventKind::DoubleTap,
        EventKind::DoubleTouch,
        EventKind::Pan,
        EventKind::Pinch,
        EventKind::Rotate,
        EventKind::OfflineStall,
        EventKind::SelectMapPoi,
        EventKind::SelectAnnotation,
        EventKind::SelectCustomPoi,
        EventKind::SelectCluster,
        EventKind::SelectCompass,
        EventKind::SelectCurrentPosition,
        EventKind::SelectOverlay,
        EventKind::AttributionTapped,
        EventKind::RenderFinished,
        EventKind::RealReachCompleted,
    ];
}

/// Which notification kinds the observer wants delivered.
///
/// The generalization of an open-ended listener with optional methods:
/// a set of independently toggleable slots rather than virtual dispatch.
#[derive(Debug, Clone)]
pub struct Subscriptions {
    enabled: HashSet<EventKind>,
}

impl Default for Subscriptions {
    fn default() -> Self {
        Self::all()
    }
}

impl Subscriptions {
    /// Subscribes to every notification kind.
    pub fn all() -> Self {
        Self {
            enabled: EventKind::ALL.into_iter().collect(),
        }
    }

    /// Subscribes to nothing.
    pub fn none() -> Self {
        Self {
            enabled: HashSet::new(),
        }
    }

    /// Adds a subscription.
    pub fn with(mut self, kind: EventKind) -> Self {
        self.enabled.insert(kind);
        self
    }

    /// Removes a subscription.
    pub fn without(mut self, kind: EventKind) -> Self {
        self.enabled.remove(&kind);
        self
    }

    /// True if the kind is subscribed.
    pub fn contains(&self, kind: EventKind) -> bool {
        self.enabled.contains(&kind)
    }
}

/// The single delivery point for all notifications of one map view.
///
/// At most one observer exists per view; only the view's thread calls
/// [`dispatch`](Self::dispatch), so delivery is never reentrant across
/// threads. Sending never blocks.
#[derive(Debug)]
pub struct EventDispatcher {
    sender: mpsc::UnboundedSender<MapEvent>,
    subscriptions: Subscriptions,
}

impl EventDispatcher {
    /// Creates a dispatcher and its observer channel.
    pub fn new(subscriptions: Subscriptions) -> (Self, MapEventReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender,
                subscriptions,
            },
            receiver,
        )
    }

    /// Replaces the subscription set.
    pub fn set_subscriptions(&mut self, subscriptions: Subscriptions) {
        self.subscriptions = subscriptions;
    }

    /// Current subscription set.
    pub fn subscriptions(&self) -> &Subscriptions {
        &self.subscriptions
    }

    /// Delivers an event to the observer, unless unsubscribed.
    ///
    /// A dropped observer is not an error; the event is discarded.
    pub fn dispatch(&self, event: MapEvent) {
        if !self.subscriptions.contains(event.kind()) {
            trace!(kind = ?event.kind(), "Dropping unsubscribed event");
            return;
        }
        if self.sender.send(event).is_err() {
            trace!("Observer channel closed; event discarded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_event_kind_round_trips() {
        // Spot checks that kind() matches the variant.
        assert_eq!(MapEvent::OfflineStall.kind(), EventKind::OfflineStall);
        assert_eq!(MapEvent::SelectCompass.kind(), EventKind::SelectCompass);
        assert_eq!(
            MapEvent::AttributionTapped.kind(),
            EventKind::AttributionTapped
        );
    }

    #[test]
    fn test_subscriptions_all_and_none() {
        let all = Subscriptions::all();
        let none = Subscriptions::none();
        for kind in EventKind::ALL {
            assert!(all.contains(kind));
            assert!(!none.contains(kind));
        }
    }

    #[test]
    fn test_subscriptions_with_without() {
        let subs = Subscriptions::none()
            .with(EventKind::Tap)
            .with(EventKind::Pan)
            .without(EventKind::Pan);
        assert!(subs.contains(EventKind::Tap));
        assert!(!subs.contains(EventKind::Pan));
    }

    #[test]
    fn test_dispatch_delivers_subscribed() {
        let (dispatcher, mut rx) = EventDispatcher::new(Subscriptions::all());
        dispatcher.dispatch(MapEvent::SelectCompass);

        assert_eq!(rx.try_recv().unwrap(), MapEvent::SelectCompass);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dispatch_filters_unsubscribed() {
        let subs = Subscriptions::all().without(EventKind::Pan);
        let (dispatcher, mut rx) = EventDispatcher::new(subs);

        dispatcher.dispatch(MapEvent::Pan {
            from: ScreenPoint::new(0.0, 0.0),
            to: ScreenPoint::new(10.0, 0.0),
        });
        dispatcher.dispatch(MapEvent::SelectCompass);

        // Only the subscribed event arrives.
        assert_eq!(rx.try_recv().unwrap(), MapEvent::SelectCompass);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dispatch_to_dropped_observer_does_not_panic() {
        let (dispatcher, rx) = EventDispatcher::new(Subscriptions::all());
        drop(rx);
        dispatcher.dispatch(MapEvent::SelectCompass);
    }

    #[test]
    fn test_delivery_preserves_order() {
        let (dispatcher, mut rx) = EventDispatcher::new(Subscriptions::all());
        dispatcher.dispatch(MapEvent::SelectCompass);
        dispatcher.dispatch(MapEvent::SelectCurrentPosition);
        dispatcher.dispatch(MapEvent::AttributionTapped);

        assert_eq!(rx.try_recv().unwrap(), MapEvent::SelectCompass);
        assert_eq!(rx.try_recv().unwrap(), MapEvent::SelectCurrentPosition);
        assert_eq!(rx.try_recv().unwrap(), MapEvent::AttributionTapped);
    }
}
