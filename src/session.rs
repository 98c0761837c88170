//! Caller-owned session state and the query/reset command handlers.

use tracing::debug;

use crate::error::Result;
use crate::locator::{find_intersecting, BoundaryClient};
use crate::models::{GeoPoint, QueryResult};
use crate::ring::{build_ring, Ring};

/// One query's inputs. Distances arrive in kilometers, as users enter them,
/// and are converted to meters once here.
#[derive(Debug, Clone, Copy)]
pub struct QueryParams {
    pub lat: f64,
    pub lon: f64,
    pub min_km: f64,
    pub max_km: f64,
}

impl QueryParams {
    pub fn center(&self) -> Result<GeoPoint> {
        GeoPoint::new(self.lat, self.lon)
    }

    pub fn min_meters(&self) -> f64 {
        self.min_km * 1000.0
    }

    pub fn max_meters(&self) -> f64 {
        self.max_km * 1000.0
    }
}

/// Session state owned by the orchestrating layer.
///
/// The core computes fresh values per query and stores nothing of its own.
/// Only a fully successful query replaces what is held here, so after a
/// failure the previous ring/result remain visible to the caller.
#[derive(Debug, Default)]
pub struct Session {
    ring: Option<Ring>,
    result: Option<QueryResult>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ring(&self) -> Option<&Ring> {
        self.ring.as_ref()
    }

    pub fn result(&self) -> Option<&QueryResult> {
        self.result.as_ref()
    }

    /// Run one query end to end. Returns the number of municipalities kept.
    pub async fn run_query(
        &mut self,
        client: &BoundaryClient,
        params: QueryParams,
    ) -> Result<usize> {
        let center = params.center()?;
        let ring = build_ring(center, params.min_meters(), params.max_meters())?;

        // An empty ring matches nothing regardless of what the service would
        // return, so the fetch is skipped entirely.
        let result = if ring.is_empty() {
            debug!("degenerate ring, skipping service query");
            QueryResult::default()
        } else {
            find_intersecting(client, center, params.max_meters(), &ring).await?
        };

        let count = result.len();
        self.ring = Some(ring);
        self.result = Some(result);
        Ok(count)
    }

    /// Clear stored ring and result.
    pub fn reset(&mut self) {
        self.ring = None;
        self.result = None;
    }
}
