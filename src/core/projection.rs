//! Web-Mercator helpers shared by the cluster index and the screen-position
//! math of the interaction controller.

use crate::domain::model::{LatLng, ScreenPoint, Viewport, WorldPoint};

/// World size in pixels at zoom 0.
pub const TILE_SIZE: f64 = 256.0;

/// Longitude to normalised mercator x in `[0, 1]`.
pub fn mercator_x(lng: f64) -> f64 {
    lng / 360.0 + 0.5
}

/// Latitude to normalised mercator y in `[0, 1]`, clamped near the poles.
pub fn mercator_y(lat: f64) -> f64 {
    let sin = lat.to_radians().sin();
    let y = 0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / std::f64::consts::PI;
    y.clamp(0.0, 1.0)
}

pub fn longitude_from_x(x: f64) -> f64 {
    (x - 0.5) * 360.0
}

pub fn latitude_from_y(y: f64) -> f64 {
    let y2 = (180.0 - y * 360.0).to_radians();
    360.0 * y2.exp().atan() / std::f64::consts::PI - 90.0
}

pub fn world_point(position: LatLng) -> WorldPoint {
    WorldPoint {
        x: mercator_x(position.lng) * TILE_SIZE,
        y: mercator_y(position.lat) * TILE_SIZE,
    }
}

/// Pixel position of `point` inside the viewport: the world-point offset
/// from the viewport's north-west corner scaled by `2^zoom`.
pub fn pixel_offset(point: WorldPoint, north_west: WorldPoint, zoom: u8) -> ScreenPoint {
    let scale = f64::from(1u32 << zoom.min(30));
    let mut dx = point.x - north_west.x;
    // a viewport crossing the antimeridian starts east of the point
    if dx < 0.0 {
        dx += TILE_SIZE;
    }
    ScreenPoint {
        x: dx * scale,
        y: (point.y - north_west.y) * scale,
    }
}

pub fn north_west(viewport: &Viewport) -> LatLng {
    LatLng::new(viewport.bounds.north, viewport.bounds.west)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mercator_round_trip_at_known_points() {
        assert!((mercator_x(0.0) - 0.5).abs() < 1e-12);
        assert!((mercator_y(0.0) - 0.5).abs() < 1e-12);
        assert!((longitude_from_x(mercator_x(121.5)) - 121.5).abs() < 1e-9);
        assert!((latitude_from_y(mercator_y(25.0)) - 25.0).abs() < 1e-9);
        assert!((latitude_from_y(mercator_y(-60.0)) + 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_poles_are_clamped() {
        assert_eq!(mercator_y(90.0), 0.0);
        assert_eq!(mercator_y(-90.0), 1.0);
    }

    #[test]
    fn test_pixel_offset_scales_with_zoom() {
        let nw = WorldPoint { x: 100.0, y: 50.0 };
        let p = WorldPoint { x: 101.0, y: 52.0 };
        assert_eq!(pixel_offset(p, nw, 0), ScreenPoint { x: 1.0, y: 2.0 });
        assert_eq!(pixel_offset(p, nw, 3), ScreenPoint { x: 8.0, y: 16.0 });
    }
}
