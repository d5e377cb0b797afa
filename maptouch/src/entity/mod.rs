//! Selectable map entities.
//!
//! One tagged sum type covers every point feature the hit-test resolver
//! can select (map POIs sourced from map data, application annotations,
//! custom POIs). Overlays are identified drawn shapes and clusters are
//! derived aggregations; both get their own types since they carry
//! different payloads.
//!
//! The spatial index owns entity records; query results carry copies of
//! these small structs, so the interaction core never holds long-term
//! references into application data.

use std::fmt;

use crate::geo::Coordinate;

/// Stable identifier for a registered entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The variant of a selectable point entity.
///
/// Determines hit-test priority: custom POIs win over annotations, which
/// win over map POIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A point of interest sourced from map data.
    MapPoi,
    /// An application-registered annotation.
    Annotation,
    /// An application-registered custom POI.
    CustomPoi,
}

/// A selectable point entity registered in the spatial index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entity {
    /// Stable identifier assigned by the registering application.
    pub id: EntityId,
    /// Entity variant.
    pub kind: EntityKind,
    /// Geographic anchor.
    pub position: Coordinate,
}

impl Entity {
    /// Creates a new entity.
    pub fn new(id: EntityId, kind: EntityKind, position: Coordinate) -> Self {
        Self { id, kind, position }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}{} at {}", self.kind, self.id, self.position)
    }
}

/// An identified drawn shape (polygon) on the map.
///
/// Overlays are hit-tested by polygon containment and resolve at the
/// lowest priority, since a large polygon would otherwise shadow the
/// point features drawn above it.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    /// Application-assigned overlay identifier.
    pub id: i32,
    /// Polygon outline; implicitly closed from last vertex to first.
    pub vertices: Vec<Coordinate>,
}

impl Overlay {
    /// Creates a new overlay from a polygon outline.
    pub fn new(id: i32, vertices: Vec<Coordinate>) -> Self {
        Self { id, vertices }
    }

    /// Returns true if the coordinate lies inside the overlay polygon.
    ///
    /// Even-odd ray casting in lat/lon space. Degenerate polygons with
    /// fewer than three vertices contain nothing.
    pub fn contains(&self, coord: Coordinate) -> bool {
        if self.vertices.len() < 3 {
            return false;
        }

        let (px, py) = (coord.lon(), coord.lat());
        let mut inside = false;
        let mut j = self.vertices.len() - 1;
        for i in 0..self.vertices.len() {
            let (xi, yi) = (self.vertices[i].lon(), self.vertices[i].lat());
            let (xj, yj) = (self.vertices[j].lon(), self.vertices[j].lat());
            if ((yi > py) != (yj > py)) && (px < (xj - xi) * (py - yi) / (yj - yi) + xi) {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

/// A derived aggregation of nearby entities at the current zoom.
///
/// Clusters are recomputed whenever zoom or index membership changes and
/// are never persisted across zoom changes. A cluster always has at least
/// two members; a lone entity is reported as itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Identifiers of the aggregated entities.
    pub members: Vec<EntityId>,
    /// Geographic anchor: the centroid of the member positions.
    pub anchor: Coordinate,
}

impl Cluster {
    /// Number of aggregated entities.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True if the cluster has no members (never produced by the index).
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
