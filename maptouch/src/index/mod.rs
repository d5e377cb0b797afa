//! Spatial index for selectable entities and overlays.
//!
//! The index is shared between the owning application (which registers and
//! removes entities, possibly from another thread) and the hit-test
//! resolver. Every query runs against a consistent [`IndexSnapshot`] taken
//! under a read lock, so an in-progress resolution never observes a
//! half-updated index.
//!
//! Clusters are derived per query from screen-space proximity at the
//! current zoom and never persisted across zoom changes.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::entity::{Cluster, Entity, EntityId, Overlay};
use crate::geo::Coordinate;
use crate::viewport::Viewport;

/// Configuration for cluster aggregation.
///
/// Cluster precedence over individual members is zoom-dependent: above
/// `max_zoom` clustering is skipped entirely and members resolve
/// individually.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Screen-space separation below which entities aggregate, in pixels.
    pub threshold_px: f64,

    /// Zoom level above which clustering is disabled.
    pub max_zoom: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            threshold_px: 40.0,
            max_zoom: 14.0,
        }
    }
}

/// Interior state guarded by the index lock.
#[derive(Debug, Default)]
struct IndexState {
    entities: HashMap<EntityId, Entity>,
    overlays: Vec<Overlay>,
}

/// Shared spatial index handle.
///
/// Cheap to clone; all clones observe the same underlying state.
#[derive(Debug, Clone, Default)]
pub struct SpatialIndex {
    state: Arc<RwLock<IndexState>>,
}

impl SpatialIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity, replacing any previous entity with the same id.
    pub fn insert(&self, entity: Entity) {
        let mut state = self.state.write();
        if state.entities.insert(entity.id, entity).is_some() {
            debug!(id = %entity.id, "Replaced entity in spatial index");
        }
    }

    /// Removes an entity by id.
    pub fn remove(&self, id: EntityId) -> Option<Entity> {
        self.state.write().entities.remove(&id)
    }

    /// Registers an overlay, replacing any previous overlay with the same id.
    pub fn insert_overlay(&self, overlay: Overlay) {
        let mut state = self.state.write();
        state.overlays.retain(|o| o.id != overlay.id);
        state.overlays.push(overlay);
    }

    /// Removes an overlay by id.
    pub fn remove_overlay(&self, id: i32) -> bool {
        let mut state = self.state.write();
        let before = state.overlays.len();
        state.overlays.retain(|o| o.id != id);
        state.overlays.len() != before
    }

    /// Number of registered entities.
    pub fn len(&self) -> usize {
        self.state.read().entities.len()
    }

    /// True if no entities are registered.
    pub fn is_empty(&self) -> bool {
        self.state.read().entities.is_empty()
    }

    /// Takes a consistent point-in-time snapshot for querying.
    ///
    /// Mutations made after the snapshot is taken do not affect queries
    /// against it.
    pub fn snapshot(&self) -> IndexSnapshot {
        let state = self.state.read();
        IndexSnapshot {
            entities: state.entities.values().copied().collect(),
            overlays: state.overlays.clone(),
        }
    }
}

/// A consistent copy of the index contents, safe to query while the live
/// index is mutated concurrently.
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    entities: Vec<Entity>,
    overlays: Vec<Overlay>,
}

impl IndexSnapshot {
    /// All entities in the snapshot, in unspecified order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// All overlays in the snapshot, in registration order.
    pub fn overlays(&self) -> &[Overlay] {
        &self.overlays
    }

    /// Looks up an entity by id.
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// Entities within a pixel radius of a geographic point, nearest first.
    ///
    /// Distance is measured in screen space at the viewport's current zoom,
    /// which is what a tap tolerance means to the user.
    pub fn query_radius(
        &self,
        center: Coordinate,
        radius_px: f64,
        viewport: &Viewport,
    ) -> Vec<Entity> {
        let center_px = viewport.geo_to_screen(center);
        let mut hits: Vec<(f64, Entity)> = self
            .entities
            .iter()
            .filter_map(|entity| {
                let distance = viewport.geo_to_screen(entity.position).distance_to(center_px);
                (distance <= radius_px).then_some((distance, *entity))
            })
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        hits.into_iter().map(|(_, e)| e).collect()
    }

    /// Aggregates entities into clusters by screen-space proximity.
    ///
    /// Greedy single-pass grouping: each unvisited entity seeds a group
    /// of all remaining entities within `threshold_px` of it; groups of
    /// at least two become clusters anchored at the member centroid.
    /// Returns no clusters when the viewport zoom exceeds
    /// `config.max_zoom`.
    pub fn clusters(&self, viewport: &Viewport, config: &ClusterConfig) -> Vec<Cluster> {
        if viewport.region().zoom() > config.max_zoom {
            return Vec::new();
        }

        let mut ordered: Vec<&Entity> = self.entities.iter().collect();
        ordered.sort_by_key(|e| e.id);

        let mut clusters = Vec::new();
        let mut visited = vec![false; ordered.len()];

        for i in 0..ordered.len() {
            if visited[i] {
                continue;
            }
            visited[i] = true;
            let seed_px = viewport.geo_to_screen(ordered[i].position);

            let mut members = vec![ordered[i]];
            for j in (i + 1)..ordered.len() {
                if visited[j] {
                    continue;
                }
                let candidate_px = viewport.geo_to_screen(ordered[j].position);
                if candidate_px.distance_to(seed_px) <= config.threshold_px {
                    visited[j] = true;
                    members.push(ordered[j]);
                }
            }

            if members.len() >= 2 {
                let lat = members.iter().map(|e| e.position.lat()).sum::<f64>()
                    / members.len() as f64;
                let lon = members.iter().map(|e| e.position.lon()).sum::<f64>()
                    / members.len() as f64;
                clusters.push(Cluster {
                    members: members.iter().map(|e| e.id).collect(),
                    anchor: Coordinate::wrapping(lat, lon),
                });
            }
        }

        clusters
    }
}
