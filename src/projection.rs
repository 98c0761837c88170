//! Local metric plane centered on a query point.
//!
//! Buffering by a distance in meters is only linear and isotropic in a planar
//! metric CRS. Rather than a fixed UTM zone (accurate only near its meridian),
//! this uses an azimuthal-equidistant plane centered on the point itself:
//! forward maps a geographic point to (east, north) meters from the center,
//! inverse walks a geodesic back out. Distances from the center are exact by
//! construction, which is the property ring buffering needs.

use geo::{Bearing, Coord, Destination, Distance, Geodesic, Point};

use crate::models::GeoPoint;

/// Azimuthal-equidistant projection around a fixed center.
#[derive(Debug, Clone, Copy)]
pub struct LocalPlane {
    origin: Point<f64>,
}

impl LocalPlane {
    pub fn new(center: GeoPoint) -> Self {
        Self {
            origin: Point::new(center.lon, center.lat),
        }
    }

    /// Geographic point -> planar (east, north) meters from the center.
    pub fn forward(&self, point: Point<f64>) -> Coord<f64> {
        let distance = Geodesic.distance(self.origin, point);
        if distance == 0.0 {
            return Coord { x: 0.0, y: 0.0 };
        }
        let bearing = Geodesic.bearing(self.origin, point).to_radians();
        Coord {
            x: distance * bearing.sin(),
            y: distance * bearing.cos(),
        }
    }

    /// Planar (east, north) meters -> geographic point.
    pub fn inverse(&self, coord: Coord<f64>) -> Point<f64> {
        let distance = coord.x.hypot(coord.y);
        if distance == 0.0 {
            return self.origin;
        }
        let bearing = coord.x.atan2(coord.y).to_degrees();
        Geodesic.destination(self.origin, bearing, distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn center() -> GeoPoint {
        GeoPoint {
            lat: 42.358628,
            lon: 13.811097,
        }
    }

    #[test]
    fn center_maps_to_plane_origin() {
        let plane = LocalPlane::new(center());
        let c = plane.forward(Point::new(13.811097, 42.358628));
        assert!(c.x.abs() < 1e-6);
        assert!(c.y.abs() < 1e-6);
    }

    #[test]
    fn forward_preserves_distance_from_center() {
        let plane = LocalPlane::new(center());
        // ~0.3 degrees north is roughly 33 km
        let p = Point::new(13.811097, 42.658628);
        let c = plane.forward(p);
        let planar = c.x.hypot(c.y);
        let geodesic = Geodesic.distance(Point::new(13.811097, 42.358628), p);
        assert!((planar - geodesic).abs() < 1e-6);
    }

    #[test]
    fn round_trip_is_stable() {
        let plane = LocalPlane::new(center());
        for (lon, lat) in [
            (13.811097, 42.358628),
            (14.2, 42.1),
            (13.3, 42.7),
            (13.811097, 41.9),
        ] {
            let p = Point::new(lon, lat);
            let back = plane.inverse(plane.forward(p));
            assert!((back.x() - lon).abs() < 1e-8, "lon drift for ({lon}, {lat})");
            assert!((back.y() - lat).abs() < 1e-8, "lat drift for ({lon}, {lat})");
        }
    }

    #[test]
    fn inverse_walks_due_north() {
        let plane = LocalPlane::new(center());
        let p = plane.inverse(Coord { x: 0.0, y: 10_000.0 });
        assert!((p.x() - 13.811097).abs() < 1e-6);
        assert!(p.y() > 42.358628);
    }
}
