//! Core geographic and screen-space types.

use std::fmt;

use thiserror::Error;

/// Minimum valid latitude in degrees.
pub const MIN_LAT: f64 = -90.0;

/// Maximum valid latitude in degrees.
pub const MAX_LAT: f64 = 90.0;

/// Minimum valid longitude in degrees.
pub const MIN_LON: f64 = -180.0;

/// Maximum valid longitude in degrees.
pub const MAX_LON: f64 = 180.0;

/// Maximum latitude representable in Web Mercator projection.
///
/// Latitudes beyond this are valid geographic coordinates but project to
/// infinity in Mercator space, so viewport math clamps to this value.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

/// Errors produced when constructing geographic values.
#[derive(Debug, Error, PartialEq)]
pub enum GeoError {
    /// Latitude outside [-90, 90] degrees.
    #[error("invalid latitude: {0} (must be within [-90, 90])")]
    InvalidLatitude(f64),

    /// Longitude outside [-180, 180] degrees.
    #[error("invalid longitude: {0} (must be within [-180, 180])")]
    InvalidLongitude(f64),

    /// Zoom level is negative or not finite.
    #[error("invalid zoom level: {0} (must be finite and non-negative)")]
    InvalidZoom(f64),
}

/// A geographic coordinate (WGS84 latitude/longitude).
///
/// Immutable once constructed; [`Coordinate::new`] validates the domain so
/// every `Coordinate` in the system is known to be in range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    lat: f64,
    lon: f64,
}

impl Coordinate {
    /// Creates a validated coordinate.
    ///
    /// # Arguments
    ///
    /// * `lat` - Latitude in degrees, must be within [-90, 90]
    /// * `lon` - Longitude in degrees, must be within [-180, 180]
    pub fn new(lat: f64, lon: f64) -> Result<Self, GeoError> {
        if !(MIN_LAT..=MAX_LAT).contains(&lat) || lat.is_nan() {
            return Err(GeoError::InvalidLatitude(lat));
        }
        if !(MIN_LON..=MAX_LON).contains(&lon) || lon.is_nan() {
            return Err(GeoError::InvalidLongitude(lon));
        }
        Ok(Self { lat, lon })
    }

    /// Creates a coordinate from possibly out-of-range values by clamping
    /// latitude and wrapping longitude into [-180, 180).
    ///
    /// Used by viewport extrapolation, where screen points outside the view
    /// must still produce a mathematically consistent coordinate rather
    /// than an error.
    pub fn wrapping(lat: f64, lon: f64) -> Self {
        let lat = lat.clamp(MIN_LAT, MAX_LAT);
        let lon = (lon - MIN_LON).rem_euclid(360.0) + MIN_LON;
        Self { lat, lon }
    }

    /// Latitude in degrees.
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    pub fn lon(&self) -> f64 {
        self.lon
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

/// The visible geographic viewport: a center coordinate plus a zoom level.
///
/// Zoom follows the Web Mercator convention: at zoom `z` the world is
/// `256 * 2^z` pixels wide. Fractional zoom levels are allowed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    center: Coordinate,
    zoom: f64,
}

impl Region {
    /// Creates a validated region.
    ///
    /// # Arguments
    ///
    /// * `center` - Geographic center of the viewport
    /// * `zoom` - Zoom level, must be finite and non-negative
    pub fn new(center: Coordinate, zoom: f64) -> Result<Self, GeoError> {
        if !zoom.is_finite() || zoom < 0.0 {
            return Err(GeoError::InvalidZoom(zoom));
        }
        Ok(Self { center, zoom })
    }

    /// Geographic center of the region.
    pub fn center(&self) -> Coordinate {
        self.center
    }

    /// Zoom level of the region.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Returns a copy of this region with a different center.
    pub fn with_center(&self, center: Coordinate) -> Self {
        Self {
            center,
            zoom: self.zoom,
        }
    }

    /// Returns a copy of this region with a different zoom level.
    ///
    /// The zoom is clamped at zero rather than rejected, since this is
    /// used on interactive pinch paths where the input is already trusted.
    pub fn with_zoom(&self, zoom: f64) -> Self {
        Self {
            center: self.center,
            zoom: zoom.max(0.0),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@ZL{:.2}", self.center, self.zoom)
    }
}

/// A point in view-local pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    /// Horizontal offset from the view's left edge, in pixels.
    pub x: f64,
    /// Vertical offset from the view's top edge, in pixels.
    pub y: f64,
}

impl ScreenPoint {
    /// Creates a new screen point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another screen point, in pixels.
    pub fn distance_to(&self, other: ScreenPoint) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl fmt::Display for ScreenPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// An axis-aligned rectangle in view-local pixel space.
///
/// Used for map chrome hit areas (compass, current-position icon,
/// attribution label).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenRect {
    /// Left edge, in pixels.
    pub x: f64,
    /// Top edge, in pixels.
    pub y: f64,
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl ScreenRect {
    /// Creates a new screen rectangle.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns true if the point lies inside this rectangle.
    pub fn contains(&self, point: ScreenPoint) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }
}

/// Geographic bounding box.
///
/// Represents the minimum bounding rectangle around a set of coordinates,
/// e.g. the extent of a real-reach polygon or an image-render target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum (southernmost) latitude.
    pub min_lat: f64,
    /// Maximum (northernmost) latitude.
    pub max_lat: f64,
    /// Minimum (westernmost) longitude.
    pub min_lon: f64,
    /// Maximum (easternmost) longitude.
    pub max_lon: f64,
}

impl BoundingBox {
    /// Creates a new bounding box.
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    /// Creates a bounding box containing a single point.
    pub fn from_point(coord: Coordinate) -> Self {
        Self {
            min_lat: coord.lat(),
            max_lat: coord.lat(),
            min_lon: coord.lon(),
            max_lon: coord.lon(),
        }
    }

    /// Expands this bounding box to include a point.
    pub fn expand(&mut self, coord: Coordinate) {
        self.min_lat = self.min_lat.min(coord.lat());
        self.max_lat = self.max_lat.max(coord.lat());
        self.min_lon = self.min_lon.min(coord.lon());
        self.max_lon = self.max_lon.max(coord.lon());
    }

    /// Returns true if the coordinate lies inside the box.
    pub fn contains(&self, coord: Coordinate) -> bool {
        coord.lat() >= self.min_lat
            && coord.lat() <= self.max_lat
            && coord.lon() >= self.min_lon
            && coord.lon() <= self.max_lon
    }

    /// Center point of the bounds.
    pub fn center(&self) -> Coordinate {
        Coordinate::wrapping(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    /// Width of the bounds in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Height of the bounds in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }
}
