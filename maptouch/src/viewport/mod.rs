//! Viewport model and screen↔geographic transforms.
//!
//! The [`Viewport`] owns the current [`Region`] together with the pixel
//! dimensions of the hosting view and provides Web Mercator conversions
//! between view-local screen points and geographic coordinates.
//!
//! Transforms are consistent: `geo_to_screen(screen_to_geo(p))` round-trips
//! within pixel-rounding tolerance for any point inside the viewport. For
//! points outside the viewport the transforms extrapolate mathematically
//! instead of erroring, since gesture tracking may reference off-screen
//! geometry mid-pan.

use std::f64::consts::PI;

use crate::geo::{Coordinate, Region, ScreenPoint, MAX_MERCATOR_LAT};

/// Earth circumference at the equator, in meters (WGS84).
const EARTH_CIRCUMFERENCE_M: f64 = 40_075_016.686;

/// Pixel size of the world map at zoom level 0.
const TILE_SIZE_PX: f64 = 256.0;

/// A point in world pixel space at a given zoom level.
///
/// World space places (0, 0) at the northwest corner of the Mercator
/// projection; the world is `256 * 2^zoom` pixels square.
#[derive(Debug, Clone, Copy, PartialEq)]
struct WorldPoint {
    x: f64,
    y: f64,
}

/// The map viewport: view pixel dimensions plus the visible region.
#[derive(Debug, Clone)]
pub struct Viewport {
    width_px: f64,
    height_px: f64,
    region: Region,
}

impl Viewport {
    /// Creates a viewport with the given pixel dimensions and region.
    pub fn new(width_px: f64, height_px: f64, region: Region) -> Self {
        Self {
            width_px,
            height_px,
            region,
        }
    }

    /// Current visible region.
    pub fn region(&self) -> Region {
        self.region
    }

    /// Replaces the visible region.
    ///
    /// `Region` values are validated at construction, so this cannot
    /// introduce an out-of-domain viewport. Rejection of raw out-of-domain
    /// input happens at the [`MapView`](crate::view::MapView) mutation
    /// boundary.
    pub fn set_region(&mut self, region: Region) {
        self.region = region;
    }

    /// View width in pixels.
    pub fn width_px(&self) -> f64 {
        self.width_px
    }

    /// View height in pixels.
    pub fn height_px(&self) -> f64 {
        self.height_px
    }

    /// Screen point at the center of the view.
    pub fn center_point(&self) -> ScreenPoint {
        ScreenPoint::new(self.width_px / 2.0, self.height_px / 2.0)
    }

    /// Size of the world map in pixels at the current zoom.
    fn world_size(&self) -> f64 {
        TILE_SIZE_PX * 2.0_f64.powf(self.region.zoom())
    }

    /// Projects a coordinate into world pixel space.
    fn project(&self, coord: Coordinate) -> WorldPoint {
        let ws = self.world_size();
        let lat = coord.lat().clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
        let lat_rad = lat * PI / 180.0;

        WorldPoint {
            x: (coord.lon() + 180.0) / 360.0 * ws,
            y: (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * ws,
        }
    }

    /// Unprojects a world pixel point back to a coordinate.
    fn unproject(&self, point: WorldPoint) -> Coordinate {
        let ws = self.world_size();
        let lon = point.x / ws * 360.0 - 180.0;
        let lat = (PI * (1.0 - 2.0 * point.y / ws)).sinh().atan() * 180.0 / PI;
        Coordinate::wrapping(lat, lon)
    }

    /// Converts a view-local screen point to a geographic coordinate.
    ///
    /// Points outside the view bounds are extrapolated, never rejected.
    pub fn screen_to_geo(&self, point: ScreenPoint) -> Coordinate {
        let center = self.project(self.region.center());
        self.unproject(WorldPoint {
            x: center.x + point.x - self.width_px / 2.0,
            y: center.y + point.y - self.height_px / 2.0,
        })
    }

    /// Converts a geographic coordinate to a view-local screen point.
    ///
    /// Coordinates outside the visible region produce off-screen points.
    pub fn geo_to_screen(&self, coord: Coordinate) -> ScreenPoint {
        let center = self.project(self.region.center());
        let world = self.project(coord);
        ScreenPoint::new(
            world.x - center.x + self.width_px / 2.0,
            world.y - center.y + self.height_px / 2.0,
        )
    }

    /// Ground resolution at the region center, in meters per pixel.
    pub fn meters_per_pixel(&self) -> f64 {
        let lat_rad = self.region.center().lat() * PI / 180.0;
        EARTH_CIRCUMFERENCE_M * lat_rad.cos() / self.world_size()
    }

    /// Returns the region shifted by a screen-space pixel delta.
    ///
    /// A positive `dx` moves the viewport east (the center coordinate,
    /// not the map content). Callers translating a drag gesture must
    /// negate the pointer delta: dragging content east moves the center
    /// west.
    pub fn region_shifted_by(&self, dx: f64, dy: f64) -> Region {
        let center = self.project(self.region.center());
        let shifted = self.unproject(WorldPoint {
            x: center.x + dx,
            y: center.y + dy,
        });
        self.region.with_center(shifted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport_at(lat: f64, lon: f64, zoom: f64) -> Viewport {
        let region = Region::new(Coordinate::new(lat, lon).unwrap(), zoom).unwrap();
        Viewport::new(800.0, 600.0, region)
    }

    #[test]
    fn test_center_round_trips_to_view_center() {
        let viewport = viewport_at(45.0, 10.0, 12.0);
        let screen = viewport.geo_to_screen(viewport.region().center());
        assert!((screen.x - 400.0).abs() < 1e-6);
        assert!((screen.y - 300.0).abs() < 1e-6);
    }

    #[test]
    fn test_screen_to_geo_of_view_center_is_region_center() {
        let viewport = viewport_at(45.0, 10.0, 12.0);
        let coord = viewport.screen_to_geo(viewport.center_point());
        assert!((coord.lat() - 45.0).abs() < 1e-9);
        assert!((coord.lon() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_round_trip_within_one_pixel() {
        let viewport = viewport_at(45.0, 10.0, 12.0);
        for &(x, y) in &[
            (0.0, 0.0),
            (800.0, 600.0),
            (100.0, 100.0),
            (423.7, 11.2),
            (799.9, 0.1),
        ] {
            let point = ScreenPoint::new(x, y);
            let round = viewport.geo_to_screen(viewport.screen_to_geo(point));
            assert!(
                point.distance_to(round) < 1.0,
                "Round trip of {} drifted to {}",
                point,
                round
            );
        }
    }

    #[test]
    fn test_off_screen_points_extrapolate() {
        let viewport = viewport_at(45.0, 10.0, 12.0);

        // Well outside the view on both axes; must not panic and must
        // stay consistent with the on-screen mapping direction.
        let west = viewport.screen_to_geo(ScreenPoint::new(-500.0, 300.0));
        let east = viewport.screen_to_geo(ScreenPoint::new(1300.0, 300.0));
        assert!(west.lon() < 10.0);
        assert!(east.lon() > 10.0);

        let north = viewport.screen_to_geo(ScreenPoint::new(400.0, -500.0));
        let south = viewport.screen_to_geo(ScreenPoint::new(400.0, 1100.0));
        assert!(north.lat() > 45.0);
        assert!(south.lat() < 45.0);
    }

    #[test]
    fn test_region_shifted_by_moves_center_east() {
        let viewport = viewport_at(45.0, 10.0, 12.0);
        let shifted = viewport.region_shifted_by(50.0, 0.0);
        assert!(shifted.center().lon() > 10.0);
        assert_eq!(shifted.zoom(), 12.0);
    }

    #[test]
    fn test_region_shifted_by_matches_meters_per_pixel() {
        let viewport = viewport_at(45.0, 10.0, 12.0);
        let mpp = viewport.meters_per_pixel();

        let shifted = viewport.region_shifted_by(50.0, 0.0);
        let lon_delta_deg = shifted.center().lon() - 10.0;

        // Convert the longitude delta to meters at this latitude and
        // compare against 50 px * meters-per-pixel.
        let meters_per_degree =
            EARTH_CIRCUMFERENCE_M * (45.0_f64.to_radians()).cos() / 360.0;
        let shift_m = lon_delta_deg * meters_per_degree;
        let expected_m = 50.0 * mpp;
        assert!(
            (shift_m - expected_m).abs() / expected_m < 0.01,
            "Shift was {:.1}m, expected {:.1}m",
            shift_m,
            expected_m
        );
    }

    #[test]
    fn test_higher_zoom_has_finer_resolution() {
        let coarse = viewport_at(45.0, 10.0, 10.0);
        let fine = viewport_at(45.0, 10.0, 15.0);
        assert!(fine.meters_per_pixel() < coarse.meters_per_pixel() / 16.0);
    }

    #[test]
    fn test_extreme_latitude_clamps_instead_of_diverging() {
        let region = Region::new(Coordinate::new(89.0, 0.0).unwrap(), 3.0).unwrap();
        let viewport = Viewport::new(800.0, 600.0, region);
        let screen = viewport.geo_to_screen(Coordinate::new(90.0, 0.0).unwrap());
        assert!(screen.y.is_finite());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_round_trip_property(
                lat in -80.0..80.0_f64,
                lon in -170.0..170.0_f64,
                zoom in 3.0..18.0_f64,
                x in 0.0..800.0_f64,
                y in 0.0..600.0_f64
            ) {
                let region = Region::new(Coordinate::new(lat, lon).unwrap(), zoom).unwrap();
                let viewport = Viewport::new(800.0, 600.0, region);

                let point = ScreenPoint::new(x, y);
                let round = viewport.geo_to_screen(viewport.screen_to_geo(point));

                prop_assert!(
                    point.distance_to(round) < 1.0,
                    "Round trip of {} drifted to {}",
                    point, round
                );
            }

            #[test]
            fn test_screen_to_geo_always_in_domain(
                lat in -80.0..80.0_f64,
                lon in -179.0..179.0_f64,
                zoom in 0.0..18.0_f64,
                x in -2000.0..2000.0_f64,
                y in -2000.0..2000.0_f64
            ) {
                let region = Region::new(Coordinate::new(lat, lon).unwrap(), zoom).unwrap();
                let viewport = Viewport::new(800.0, 600.0, region);

                let coord = viewport.screen_to_geo(ScreenPoint::new(x, y));
                prop_assert!(coord.lat() >= -90.0 && coord.lat() <= 90.0);
                prop_assert!(coord.lon() >= -180.0 && coord.lon() <= 180.0);
            }

            #[test]
            fn test_shift_preserves_zoom(
                zoom in 1.0..18.0_f64,
                dx in -400.0..400.0_f64,
                dy in -300.0..300.0_f64
            ) {
                let region = Region::new(Coordinate::new(45.0, 10.0).unwrap(), zoom).unwrap();
                let viewport = Viewport::new(800.0, 600.0, region);

                let shifted = viewport.region_shifted_by(dx, dy);
                prop_assert_eq!(shifted.zoom(), zoom);
            }
        }
    }
}
