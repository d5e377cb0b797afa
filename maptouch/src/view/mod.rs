//! The interactive map view.
//!
//! [`MapView`] is the coordination surface the hosting platform talks to:
//! it feeds raw pointer samples in, owns the viewport and the spatial
//! index, runs gesture classification, region-change tracking, hit-test
//! resolution and async job submission, and funnels every resulting
//! notification through one [`EventDispatcher`].
//!
//! The view is single-threaded by contract. The host calls
//! [`MapView::handle_pointer`] as input arrives and [`MapView::tick`] once
//! per frame (or timer interval); deferred decisions such as tap
//! promotion, long-press detection, coalesced region updates and job
//! completions are all delivered from the tick.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::entity::{EntityId, EntityKind};
use crate::events::{EventDispatcher, MapEvent, MapEventReceiver, Subscriptions};
use crate::geo::{Coordinate, GeoError, Region, ScreenPoint};
use crate::gesture::{
    GestureClassifier, GestureConfig, GestureEvent, PointerKind, PointerPhase, PointerSample,
};
use crate::hittest::{self, HitTarget, HitTestConfig};
use crate::index::SpatialIndex;
use crate::jobs::{
    ImageRenderRequest, ImageRenderer, JobCoordinator, JobHandle, RealReachEngine,
    RealReachRequest,
};
use crate::region_change::{RegionPhase, RegionTracker};
use crate::viewport::Viewport;

static CALLOUT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Whether the view may assume tile data is reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityMode {
    /// Tiles can be fetched on demand.
    Online,
    /// Only pre-downloaded tiles are available.
    Offline,
}

/// Answers whether tile data exists for a region.
///
/// Consulted after each pan step while offline; panning into territory
/// without tiles raises [`MapEvent::OfflineStall`].
pub trait TileAvailability: Send + Sync {
    /// True if tiles covering the region are locally available.
    fn has_tiles(&self, region: &Region) -> bool;
}

/// What a callout is anchored to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalloutAnchor {
    /// A fixed geographic location.
    Location(Coordinate),
    /// An entity in the spatial index; the callout follows its position.
    Entity(EntityId),
}

/// Identifier of an open callout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CalloutHandle(u64);

impl CalloutHandle {
    fn next() -> Self {
        Self(CALLOUT_SEQUENCE.fetch_add(1, Ordering::Relaxed))
    }
}

/// Renders callout bubbles above the map.
///
/// External collaborator: the view decides when and where a callout
/// opens, the provider owns its visual lifetime.
pub trait CalloutProvider: Send {
    /// Opens a callout at the given geographic position.
    fn show(&mut self, handle: CalloutHandle, position: Coordinate);

    /// Closes a previously opened callout.
    fn hide(&mut self, handle: CalloutHandle);
}

/// Builder for [`MapView`].
pub struct MapViewBuilder {
    width_px: f64,
    height_px: f64,
    region: Region,
    gesture_config: GestureConfig,
    hit_config: HitTestConfig,
    subscriptions: Subscriptions,
    connectivity: ConnectivityMode,
    tile_availability: Option<Arc<dyn TileAvailability>>,
    callout_provider: Option<Box<dyn CalloutProvider>>,
}

impl MapViewBuilder {
    /// Overrides the gesture recognition thresholds.
    pub fn with_gesture_config(mut self, config: GestureConfig) -> Self {
        self.gesture_config = config;
        self
    }

    /// Overrides the hit-test configuration.
    pub fn with_hit_test_config(mut self, config: HitTestConfig) -> Self {
        self.hit_config = config;
        self
    }

    /// Sets the initial subscription set (default: everything).
    pub fn with_subscriptions(mut self, subscriptions: Subscriptions) -> Self {
        self.subscriptions = subscriptions;
        self
    }

    /// Sets the connectivity mode (default: online).
    pub fn with_connectivity(mut self, mode: ConnectivityMode) -> Self {
        self.connectivity = mode;
        self
    }

    /// Attaches a tile-availability oracle for offline stall detection.
    pub fn with_tile_availability(mut self, availability: Arc<dyn TileAvailability>) -> Self {
        self.tile_availability = Some(availability);
        self
    }

    /// Attaches a callout provider.
    pub fn with_callout_provider(mut self, provider: Box<dyn CalloutProvider>) -> Self {
        self.callout_provider = Some(provider);
        self
    }

    /// Builds the view with its async job workers.
    ///
    /// Returns the view together with the observer channel carrying every
    /// notification the view produces.
    pub fn build(
        self,
        renderer: Arc<dyn ImageRenderer>,
        real_reach: Arc<dyn RealReachEngine>,
    ) -> (MapView, MapEventReceiver) {
        let (dispatcher, receiver) = EventDispatcher::new(self.subscriptions);
        let (jobs, completions) = JobCoordinator::new(renderer, real_reach);

        let view = MapView {
            viewport: Viewport::new(self.width_px, self.height_px, self.region),
            index: SpatialIndex::new(),
            classifier: GestureClassifier::new(self.gesture_config),
            tracker: RegionTracker::new(),
            hit_config: self.hit_config,
            connectivity: self.connectivity,
            tile_availability: self.tile_availability,
            callout_provider: self.callout_provider,
            jobs,
            completions,
            dispatcher,
            gesture_active: false,
            pinch_base_zoom: None,
            stalled: false,
        };
        (view, receiver)
    }
}

/// The interactive map view.
pub struct MapView {
    viewport: Viewport,
    index: SpatialIndex,
    classifier: GestureClassifier,
    tracker: RegionTracker,
    hit_config: HitTestConfig,
    connectivity: ConnectivityMode,
    tile_availability: Option<Arc<dyn TileAvailability>>,
    callout_provider: Option<Box<dyn CalloutProvider>>,
    jobs: JobCoordinator,
    completions: MapEventReceiver,
    dispatcher: EventDispatcher,
    /// True while a gesture is mutating the region.
    gesture_active: bool,
    /// Zoom level when the current pinch began.
    pinch_base_zoom: Option<f64>,
    /// Latched after reporting an offline stall, cleared when the region
    /// regains tile coverage.
    stalled: bool,
}

impl MapView {
    /// Starts building a view with the given pixel dimensions and region.
    pub fn builder(width_px: f64, height_px: f64, region: Region) -> MapViewBuilder {
        MapViewBuilder {
            width_px,
            height_px,
            region,
            gesture_config: GestureConfig::default(),
            hit_config: HitTestConfig::default(),
            subscriptions: Subscriptions::all(),
            connectivity: ConnectivityMode::Online,
            tile_availability: None,
            callout_provider: None,
        }
    }

    /// Current visible region.
    pub fn region(&self) -> Region {
        self.viewport.region()
    }

    /// The viewport, for screen/geographic conversions.
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// The spatial index holding entities and overlays.
    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    /// Replaces the subscription set.
    pub fn set_subscriptions(&mut self, subscriptions: Subscriptions) {
        self.dispatcher.set_subscriptions(subscriptions);
    }

    /// Changes the connectivity mode.
    pub fn set_connectivity(&mut self, mode: ConnectivityMode) {
        self.connectivity = mode;
        if mode == ConnectivityMode::Online {
            self.stalled = false;
        }
    }

    // ========================================================================
    // Region mutation
    // ========================================================================

    /// Programmatically moves the viewport.
    ///
    /// Raw input is validated here; out-of-domain values are rejected and
    /// the viewport is left untouched. A valid set runs a full change
    /// phase: start with the old region, one update and end with the new
    /// one. A phase already open (a set landing mid-gesture) is closed
    /// first.
    pub fn set_region(&mut self, lat: f64, lon: f64, zoom: f64) -> Result<(), GeoError> {
        let center = Coordinate::new(lat, lon).inspect_err(|error| {
            warn!(lat, lon, %error, "Rejecting region set");
        })?;
        let region = Region::new(center, zoom).inspect_err(|error| {
            warn!(zoom, %error, "Rejecting region set");
        })?;

        let old = self.viewport.region();
        if let Some(RegionPhase::Ended(r)) = self.tracker.restart(old) {
            self.dispatcher.dispatch(MapEvent::RegionChangeEnd(r));
            self.gesture_active = false;
            self.pinch_base_zoom = None;
        }

        if let Some(RegionPhase::Started(r)) = self.tracker.begin(old) {
            self.dispatcher.dispatch(MapEvent::RegionChangeStart(r));
        }
        self.viewport.set_region(region);
        self.dispatcher.dispatch(MapEvent::RegionChangeUpdate(region));
        if let Some(RegionPhase::Ended(r)) = self.tracker.end(region) {
            self.dispatcher.dispatch(MapEvent::RegionChangeEnd(r));
        }
        debug!(region = %region, "Region set programmatically");
        Ok(())
    }

    /// Applies a gesture-driven region mutation: opens the change phase if
    /// needed, records the update for coalescing, and checks for offline
    /// stalls.
    fn apply_gesture_region(&mut self, region: Region) {
        if !self.gesture_active {
            self.gesture_active = true;
            if let Some(RegionPhase::Started(r)) = self.tracker.begin(self.viewport.region()) {
                self.dispatcher.dispatch(MapEvent::RegionChangeStart(r));
            }
        }
        self.viewport.set_region(region);
        self.tracker.update(region);
        self.check_offline_stall(region);
    }

    fn check_offline_stall(&mut self, region: Region) {
        if self.connectivity != ConnectivityMode::Offline {
            return;
        }
        let Some(availability) = &self.tile_availability else {
            return;
        };
        if availability.has_tiles(&region) {
            self.stalled = false;
        } else if !self.stalled {
            self.stalled = true;
            debug!(region = %region, "Panned into untiled territory while offline");
            self.dispatcher.dispatch(MapEvent::OfflineStall);
        }
    }

    // ========================================================================
    // Input
    // ========================================================================

    /// Feeds a raw pointer sample from the hosting platform.
    ///
    /// Any gestures the sample completes are recognized and dispatched
    /// synchronously; deferred decisions surface on a later
    /// [`tick`](Self::tick).
    pub fn handle_pointer(&mut self, sample: PointerSample) {
        let pointer = sample.kind;
        for event in self.classifier.handle(&sample) {
            self.process_gesture(event, pointer);
        }

        // A release closes any region-mutating gesture.
        if sample.phase == PointerPhase::Up && self.gesture_active {
            self.gesture_active = false;
            self.pinch_base_zoom = None;
            if let Some(RegionPhase::Ended(r)) = self.tracker.end(self.viewport.region()) {
                self.dispatcher.dispatch(MapEvent::RegionChangeEnd(r));
            }
        }
    }

    /// Runs one dispatch tick.
    ///
    /// Resolves time-deferred gestures (tap promotion, long press),
    /// reports the coalesced region update of this tick, and drains job
    /// completions in arrival order.
    pub fn tick(&mut self, now: Instant) {
        if let Some((event, kind)) = self.classifier.poll(now) {
            self.process_gesture(event, kind);
        }

        if let Some(region) = self.tracker.flush() {
            self.dispatcher.dispatch(MapEvent::RegionChangeUpdate(region));
        }

        while let Ok(event) = self.completions.try_recv() {
            self.dispatcher.dispatch(event);
        }
    }

    fn process_gesture(&mut self, event: GestureEvent, pointer: PointerKind) {
        match event {
            GestureEvent::Tap(point) => {
                let coord = self.viewport.screen_to_geo(point);
                self.dispatcher.dispatch(MapEvent::Tap(coord));
                self.resolve_selection(point, pointer);
            }
            GestureEvent::LongTap(point) => {
                let coord = self.viewport.screen_to_geo(point);
                self.dispatcher.dispatch(MapEvent::LongTap(coord));
                self.resolve_selection(point, pointer);
            }
            GestureEvent::DoubleTap(point) => {
                let coord = self.viewport.screen_to_geo(point);
                self.dispatcher.dispatch(MapEvent::DoubleTap(coord));
                self.zoom_step(1.0);
            }
            GestureEvent::DoubleTouch(point) => {
                self.dispatcher.dispatch(MapEvent::DoubleTouch(point));
                self.zoom_step(-1.0);
            }
            GestureEvent::Pan { from, to } => {
                // Dragging content east moves the center west, so the
                // pointer delta is negated.
                let region = self
                    .viewport
                    .region_shifted_by(from.x - to.x, from.y - to.y);
                self.apply_gesture_region(region);
                self.dispatcher.dispatch(MapEvent::Pan { from, to });
            }
            GestureEvent::Pinch { scale } => {
                let base = match self.pinch_base_zoom {
                    Some(zoom) => zoom,
                    None => {
                        let zoom = self.viewport.region().zoom();
                        self.pinch_base_zoom = Some(zoom);
                        zoom
                    }
                };
                let region = self.viewport.region().with_zoom(base + scale.log2());
                self.apply_gesture_region(region);
                self.dispatcher.dispatch(MapEvent::Pinch { scale });
            }
            GestureEvent::Rotate { degrees } => {
                // Rotation is reported but does not mutate the region; the
                // region model carries no bearing.
                self.dispatcher.dispatch(MapEvent::Rotate { degrees });
            }
        }
    }

    /// Zooms by a whole step through a full programmatic change phase.
    fn zoom_step(&mut self, delta: f64) {
        let region = self.viewport.region();
        let target = region.with_zoom(region.zoom() + delta);

        if let Some(RegionPhase::Started(r)) = self.tracker.begin(region) {
            self.dispatcher.dispatch(MapEvent::RegionChangeStart(r));
        }
        self.viewport.set_region(target);
        self.dispatcher.dispatch(MapEvent::RegionChangeUpdate(target));
        if let Some(RegionPhase::Ended(r)) = self.tracker.end(target) {
            self.dispatcher.dispatch(MapEvent::RegionChangeEnd(r));
        }
    }

    /// Resolves a tap to at most one selection notification.
    fn resolve_selection(&mut self, point: ScreenPoint, pointer: PointerKind) {
        let snapshot = self.index.snapshot();
        let hit = hittest::resolve(point, pointer, &self.viewport, &snapshot, &self.hit_config);
        let event = match hit {
            Some(HitTarget::Compass) => MapEvent::SelectCompass,
            Some(HitTarget::CurrentPosition) => MapEvent::SelectCurrentPosition,
            Some(HitTarget::Attribution) => MapEvent::AttributionTapped,
            Some(HitTarget::Cluster(cluster)) => MapEvent::SelectCluster(cluster),
            Some(HitTarget::Poi(entity)) => match entity.kind {
                EntityKind::MapPoi => MapEvent::SelectMapPoi(entity),
                EntityKind::Annotation => MapEvent::SelectAnnotation(entity),
                EntityKind::CustomPoi => MapEvent::SelectCustomPoi(entity),
            },
            Some(HitTarget::Overlay {
                overlay_id,
                location,
            }) => MapEvent::SelectOverlay {
                overlay_id,
                location,
            },
            None => return,
        };
        self.dispatcher.dispatch(event);
    }

    // ========================================================================
    // Async jobs
    // ========================================================================

    /// Submits an off-screen image render.
    ///
    /// Must be called within a tokio runtime. Completion arrives as
    /// [`MapEvent::RenderFinished`] on a later tick.
    pub fn render_image(&self, request: ImageRenderRequest) -> JobHandle {
        self.jobs.submit_image_render(request)
    }

    /// Submits a real-reach computation.
    ///
    /// Must be called within a tokio runtime. Completion arrives as
    /// [`MapEvent::RealReachCompleted`] on a later tick.
    pub fn compute_real_reach(&self, request: RealReachRequest) -> JobHandle {
        self.jobs.submit_real_reach(request)
    }

    /// Number of async jobs currently in flight.
    pub fn jobs_in_flight(&self) -> usize {
        self.jobs.in_flight()
    }

    // ========================================================================
    // Callouts
    // ========================================================================

    /// Opens a callout at the given anchor.
    ///
    /// Returns `None` when no provider is attached or the anchored entity
    /// does not exist.
    pub fn request_callout(&mut self, anchor: CalloutAnchor) -> Option<CalloutHandle> {
        let position = match anchor {
            CalloutAnchor::Location(coord) => coord,
            CalloutAnchor::Entity(id) => self.index.snapshot().entity(id)?.position,
        };
        let provider = self.callout_provider.as_mut()?;
        let handle = CalloutHandle::next();
        provider.show(handle, position);
        debug!(position = %position, "Callout opened");
        Some(handle)
    }

    /// Closes a previously opened callout.
    pub fn dismiss_callout(&mut self, handle: CalloutHandle) {
        if let Some(provider) = self.callout_provider.as_mut() {
            provider.hide(handle);
        }
    }
}
