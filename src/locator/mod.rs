//! Municipality lookup against the remote boundary FeatureServer.

use geo::Intersects;
use geojson::FeatureCollection;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{GeoPoint, QueryResult};
use crate::ring::Ring;

/// BDN administrative boundary layer (query endpoint).
pub const DEFAULT_SERVICE_URL: &str = "https://services7.arcgis.com/8tIzt6yXOZrB60gX/ArcGIS/rest/services/Limiti_Amministrativi_BDN/FeatureServer/0/query";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the boundary service. One attempt per call, no retry;
/// retry policy, if any, belongs to the caller.
pub struct BoundaryClient {
    client: Client,
    base_url: String,
}

impl BoundaryClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent("anello/0.1 (municipality ring extraction)")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Fetch all municipalities within `distance_meters` of `center`.
    ///
    /// The request is an ESRI point query with an explicit meter unit for the
    /// search distance; geometry and `inSR` stay in EPSG:4326 to match the
    /// CRS of `center`. The service interprets the distance independently of
    /// the geometry CRS, which is why the unit is spelled out.
    pub async fn query_within(
        &self,
        center: GeoPoint,
        distance_meters: f64,
    ) -> Result<QueryResult> {
        let geometry = json!({
            "x": center.lon,
            "y": center.lat,
            "spatialReference": { "wkid": 4326 }
        });

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("geometryType", "esriGeometryPoint"),
                ("geometry", geometry.to_string().as_str()),
                ("inSR", "4326"),
                ("spatialRel", "esriSpatialRelIntersects"),
                ("distance", distance_meters.to_string().as_str()),
                ("units", "esriSRUnit_Meter"),
                ("outFields", "*"),
                ("returnGeometry", "true"),
                ("f", "geojson"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::remote(format!(
                "query failed with status {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::remote(format!("unreadable response body: {e}")))?;

        // ArcGIS reports service-level failures as 200 with an error object.
        if let Some(err) = body.get("error") {
            return Err(Error::remote(format!("service error: {err}")));
        }

        let collection: FeatureCollection = serde_json::from_value(body)
            .map_err(|e| Error::remote(format!("unexpected response body: {e}")))?;

        QueryResult::from_feature_collection(collection)
    }
}

/// Fetch candidates within `max_meters` of `center`, then keep only those
/// whose boundary intersects `ring`.
///
/// The service query is a coarse radius pre-filter; the ring intersection is
/// the exact predicate. An empty (degenerate) ring matches nothing.
pub async fn find_intersecting(
    client: &BoundaryClient,
    center: GeoPoint,
    max_meters: f64,
    ring: &Ring,
) -> Result<QueryResult> {
    let candidates = client.query_within(center, max_meters).await?;
    debug!(
        candidates = candidates.len(),
        "fetched candidate municipalities"
    );

    Ok(retain_intersecting(candidates, ring))
}

fn retain_intersecting(candidates: QueryResult, ring: &Ring) -> QueryResult {
    let records = candidates
        .records
        .into_iter()
        .filter(|r| r.boundary.intersects(ring.geometry()))
        .collect();
    QueryResult { records }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MunicipalityRecord;
    use crate::ring::build_ring;
    use geo::{polygon, MultiPolygon};

    fn record(istat: &str, lat: f64) -> MunicipalityRecord {
        // Small square straddling the given latitude on the center meridian
        let boundary = MultiPolygon::new(vec![polygon![
            (x: 13.79, y: lat - 0.02),
            (x: 13.83, y: lat - 0.02),
            (x: 13.83, y: lat + 0.02),
            (x: 13.79, y: lat + 0.02),
            (x: 13.79, y: lat - 0.02),
        ]]);
        MunicipalityRecord {
            istat: istat.into(),
            comune: format!("Comune {istat}"),
            provincia: "L'Aquila".into(),
            regione: "Abruzzo".into(),
            boundary,
        }
    }

    #[test]
    fn retains_only_records_inside_the_ring() {
        let center = GeoPoint {
            lat: 42.358628,
            lon: 13.811097,
        };
        let ring = build_ring(center, 20_000.0, 50_000.0).unwrap();

        // ~10 km north: inside the inner disc, outside the ring.
        let near = record("001", center.lat + 0.09);
        // ~35 km north: inside the ring.
        let mid = record("002", center.lat + 0.315);

        let candidates = QueryResult {
            records: vec![near, mid],
        };
        let kept = retain_intersecting(candidates, &ring);
        assert_eq!(
            kept.istat_codes().into_iter().collect::<Vec<_>>(),
            vec!["002"]
        );
    }

    #[test]
    fn empty_ring_matches_nothing() {
        let center = GeoPoint {
            lat: 42.358628,
            lon: 13.811097,
        };
        let ring = build_ring(center, 50_000.0, 20_000.0).unwrap();
        assert!(ring.is_empty());

        let candidates = QueryResult {
            records: vec![record("001", center.lat + 0.3)],
        };
        assert!(retain_intersecting(candidates, &ring).is_empty());
    }
}
