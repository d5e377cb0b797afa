//! Tap hit-test resolution.
//!
//! Resolves a tap or long-tap position to at most one selectable target,
//! applying a fixed priority order: map chrome (compass, current-position
//! icon, attribution label) first, then clusters, then point entities by
//! kind, then overlays last — a large overlay polygon must not shadow the
//! point features drawn above it. No match is a plain `None`, never an
//! error.

use tracing::trace;

use crate::entity::{Cluster, Entity, EntityKind};
use crate::geo::{Coordinate, ScreenPoint, ScreenRect};
use crate::gesture::PointerKind;
use crate::index::{ClusterConfig, IndexSnapshot};
use crate::viewport::Viewport;

/// Hit-test configuration.
#[derive(Debug, Clone)]
pub struct HitTestConfig {
    /// Hit tolerance for touch input, in pixels.
    pub touch_tolerance_px: f64,

    /// Hit tolerance for precise pointers (mouse/stylus), in pixels.
    pub pointer_tolerance_px: f64,

    /// Cluster aggregation settings (shared with the spatial index).
    pub cluster: ClusterConfig,

    /// Screen area of the compass control, if shown.
    pub compass_rect: Option<ScreenRect>,

    /// Screen area of the current-position icon, if shown.
    pub position_icon_rect: Option<ScreenRect>,

    /// Screen area of the attribution label, if shown.
    pub attribution_rect: Option<ScreenRect>,
}

impl Default for HitTestConfig {
    fn default() -> Self {
        Self {
            touch_tolerance_px: 24.0,
            pointer_tolerance_px: 8.0,
            cluster: ClusterConfig::default(),
            compass_rect: None,
            position_icon_rect: None,
            attribution_rect: None,
        }
    }
}

impl HitTestConfig {
    /// Tolerance for the given pointer kind.
    pub fn tolerance_for(&self, kind: PointerKind) -> f64 {
        match kind {
            PointerKind::Touch => self.touch_tolerance_px,
            PointerKind::Mouse => self.pointer_tolerance_px,
        }
    }
}

/// The single selectable target a tap resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum HitTarget {
    /// The compass control.
    Compass,
    /// The current-position icon.
    CurrentPosition,
    /// The attribution label.
    Attribution,
    /// A POI cluster with at least two members.
    Cluster(Cluster),
    /// An individual point entity (map POI, annotation or custom POI).
    Poi(Entity),
    /// An overlay shape.
    Overlay {
        /// Identifier of the tapped overlay.
        overlay_id: i32,
        /// Where the tap landed.
        location: Coordinate,
    },
}

/// Resolves a tap position against the index snapshot.
///
/// Returns at most one target; `None` means no notification should fire.
///
/// # Arguments
///
/// * `point` - Tap position in view-local pixels
/// * `pointer` - Input device kind (selects hit tolerance)
/// * `viewport` - Current viewport for projections
/// * `snapshot` - Consistent index snapshot for this query
/// * `config` - Tolerances, cluster settings and chrome rectangles
pub fn resolve(
    point: ScreenPoint,
    pointer: PointerKind,
    viewport: &Viewport,
    snapshot: &IndexSnapshot,
    config: &HitTestConfig,
) -> Option<HitTarget> {
    // Chrome sits above all map content.
    if rect_hit(config.compass_rect, point) {
        return Some(HitTarget::Compass);
    }
    if rect_hit(config.position_icon_rect, point) {
        return Some(HitTarget::CurrentPosition);
    }
    if rect_hit(config.attribution_rect, point) {
        return Some(HitTarget::Attribution);
    }

    let tolerance = config.tolerance_for(pointer);
    let location = viewport.screen_to_geo(point);

    // Clusters win over their members so overlapping markers at low zoom
    // never produce an ambiguous selection.
    for cluster in snapshot.clusters(viewport, &config.cluster) {
        if cluster.len() >= 2 && cluster_bounds_hit(&cluster, point, tolerance, viewport, snapshot)
        {
            trace!(members = cluster.len(), "Tap resolved to cluster");
            return Some(HitTarget::Cluster(cluster));
        }
    }

    // Point entities, nearest-first within each kind; custom POIs beat
    // annotations beat map POIs.
    let candidates = snapshot.query_radius(location, tolerance, viewport);
    for kind in [EntityKind::CustomPoi, EntityKind::Annotation, EntityKind::MapPoi] {
        if let Some(entity) = candidates.iter().find(|e| e.kind == kind) {
            trace!(id = %entity.id, ?kind, "Tap resolved to entity");
            return Some(HitTarget::Poi(*entity));
        }
    }

    // Overlays last.
    for overlay in snapshot.overlays() {
        if overlay.contains(location) {
            trace!(overlay_id = overlay.id, "Tap resolved to overlay");
            return Some(HitTarget::Overlay {
                overlay_id: overlay.id,
                location,
            });
        }
    }

    None
}

fn rect_hit(rect: Option<ScreenRect>, point: ScreenPoint) -> bool {
    rect.is_some_and(|r| r.contains(point))
}

/// Tests the tap against the cluster's aggregate screen bounds, expanded
/// by the hit tolerance.
fn cluster_bounds_hit(
    cluster: &Cluster,
    point: ScreenPoint,
    tolerance: f64,
    viewport: &Viewport,
    snapshot: &IndexSnapshot,
) -> bool {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for id in &cluster.members {
        let Some(entity) = snapshot.entity(*id) else {
            continue;
        };
        let px = viewport.geo_to_screen(entity.position);
        min_x = min_x.min(px.x);
        min_y = min_y.min(px.y);
        max_x = max_x.max(px.x);
        max_y = max_y.max(px.y);
    }

    if min_x > max_x {
        return false;
    }

    point.x >= min_x - tolerance
        && point.x <= max_x + tolerance
        && point.y >= min_y - tolerance
        && point.y <= max_y + tolerance
}
