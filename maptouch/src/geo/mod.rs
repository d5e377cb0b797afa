//! Geographic and screen-space primitives.
//!
//! Provides the validated coordinate, region and bounding-box types shared
//! by the viewport, spatial index and hit-test modules, plus the
//! screen-space point/rectangle types used for pointer input and map
//! chrome (compass, current-position icon, attribution label).

mod types;

pub use types::{
    BoundingBox, Coordinate, GeoError, Region, ScreenPoint, ScreenRect, MAX_LAT, MAX_LON,
    MAX_MERCATOR_LAT, MIN_LAT, MIN_LON,
};
