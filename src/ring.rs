//! Ring construction: outer disc minus inner disc around a center point.

use geo::{BooleanOps, Coord, LineString, MapCoords, MultiPolygon, Polygon};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::GeoPoint;
use crate::projection::LocalPlane;

/// Vertices per disc. Matches the resolution the map display needs; the
/// segment count is not part of the contract.
const DISC_SEGMENTS: usize = 72;

/// Annular polygon in geographic coordinates. May be empty (degenerate radii)
/// and may be multi-part after the boolean difference.
#[derive(Debug, Clone)]
pub struct Ring {
    geometry: MultiPolygon<f64>,
}

impl Ring {
    pub fn empty() -> Self {
        Self {
            geometry: MultiPolygon::new(vec![]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.0.is_empty()
    }

    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    /// GeoJSON feature for map display.
    pub fn to_feature(&self) -> geojson::Feature {
        geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&self.geometry))),
            id: None,
            properties: None,
            foreign_members: None,
        }
    }
}

/// Build the ring between `min_meters` and `max_meters` around `center`.
///
/// Radii must be finite and non-negative. `min >= max` is not an error: it
/// yields the empty ring, and downstream filtering against it matches nothing.
/// Pure function of its inputs; no I/O.
pub fn build_ring(center: GeoPoint, min_meters: f64, max_meters: f64) -> Result<Ring> {
    GeoPoint::new(center.lat, center.lon)?;

    if !min_meters.is_finite() || !max_meters.is_finite() {
        return Err(Error::invalid(format!(
            "non-finite radius ({min_meters}, {max_meters})"
        )));
    }
    if min_meters < 0.0 || max_meters < 0.0 {
        return Err(Error::invalid(format!(
            "radii must be >= 0, got ({min_meters}, {max_meters})"
        )));
    }

    if min_meters >= max_meters {
        debug!(min_meters, max_meters, "degenerate radii, empty ring");
        return Ok(Ring::empty());
    }

    let plane = LocalPlane::new(center);

    let outer = disc(max_meters);
    let planar = if min_meters > 0.0 {
        outer.difference(&disc(min_meters))
    } else {
        MultiPolygon::new(vec![outer])
    };

    let geometry = planar.map_coords(|c| {
        let p = plane.inverse(c);
        Coord { x: p.x(), y: p.y() }
    });

    Ok(Ring { geometry })
}

/// Regular polygon approximating a disc of `radius` meters at the plane origin.
fn disc(radius: f64) -> Polygon<f64> {
    let step = std::f64::consts::TAU / DISC_SEGMENTS as f64;
    let mut coords: Vec<Coord<f64>> = (0..DISC_SEGMENTS)
        .map(|i| {
            let theta = step * i as f64;
            Coord {
                x: radius * theta.cos(),
                y: radius * theta.sin(),
            }
        })
        .collect();
    coords.push(coords[0]);
    Polygon::new(LineString::new(coords), vec![])
}
