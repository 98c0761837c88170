//! HTTP server for municipality ring extraction.
//!
//! Exposes the ring query and reset commands plus the current session state
//! (ring and matched municipalities) as GeoJSON for map display and as flat
//! rows for tabular display.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use anello::locator::{DEFAULT_SERVICE_URL, DEFAULT_TIMEOUT};
use anello::models::MunicipalityRow;
use anello::{BoundaryClient, Error, QueryParams, Session};

mod config;
use config::Config;

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Municipality ring extraction server")]
struct Args {
    /// Listen address
    #[arg(short, long)]
    listen: Option<String>,

    /// Boundary service query URL
    #[arg(long)]
    service_url: Option<String>,

    /// Boundary service request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Optional TOML config file (flags win over file values)
    #[arg(long)]
    config: Option<std::path::PathBuf>,
}

/// Application state shared across handlers.
///
/// The session sits behind a mutex so queries serialize: one runs start to
/// finish before the next may begin.
struct AppState {
    client: BoundaryClient,
    session: Mutex<Session>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let file = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };

    let listen = args
        .listen
        .or(file.listen)
        .unwrap_or_else(|| "0.0.0.0:3000".to_string());
    let service_url = args
        .service_url
        .or(file.service_url)
        .unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string());
    let timeout = args
        .timeout_secs
        .or(file.timeout_secs)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TIMEOUT);

    info!("Anello server");
    info!("Boundary service: {}", service_url);

    let client = BoundaryClient::new(service_url, timeout)?;

    let state = Arc::new(AppState {
        client,
        session: Mutex::new(Session::new()),
    });

    // Build router
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/v1/query", get(query_handler))
        .route("/v1/reset", post(reset_handler))
        .route("/v1/ring", get(ring_handler))
        .route("/v1/municipalities", get(municipalities_handler))
        .route("/v1/table", get(table_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Starting server on {}", listen);

    let listener = tokio::net::TcpListener::bind(&listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Run a ring query and replace the session state on success.
async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(request): Query<QueryRequest>,
) -> Result<Json<QueryResponse>, (StatusCode, String)> {
    let params = QueryParams {
        lat: request.lat,
        lon: request.lon,
        min_km: request.min_km,
        max_km: request.max_km,
    };

    let mut session = state.session.lock().await;
    let count = session
        .run_query(&state.client, params)
        .await
        .map_err(map_error)?;

    info!(
        "Found {} municipalities in the {}-{} km ring",
        count, params.min_km, params.max_km
    );

    let municipalities = session
        .result()
        .map(|r| r.table_rows())
        .unwrap_or_default();

    Ok(Json(QueryResponse {
        count,
        municipalities,
    }))
}

/// Clear the stored ring and result.
async fn reset_handler(State(state): State<Arc<AppState>>) -> StatusCode {
    state.session.lock().await.reset();
    StatusCode::NO_CONTENT
}

/// Current ring as a GeoJSON feature (404 until a query has run).
async fn ring_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<geojson::Feature>, StatusCode> {
    let session = state.session.lock().await;
    session
        .ring()
        .map(|r| Json(r.to_feature()))
        .ok_or(StatusCode::NOT_FOUND)
}

/// Current result as a GeoJSON feature collection (404 until a query has run).
async fn municipalities_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<geojson::FeatureCollection>, StatusCode> {
    let session = state.session.lock().await;
    session
        .result()
        .map(|r| Json(r.to_feature_collection()))
        .ok_or(StatusCode::NOT_FOUND)
}

/// Current result as flat attribute rows (404 until a query has run).
async fn table_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<MunicipalityRow>>, StatusCode> {
    let session = state.session.lock().await;
    session
        .result()
        .map(|r| Json(r.table_rows()))
        .ok_or(StatusCode::NOT_FOUND)
}

fn map_error(e: Error) -> (StatusCode, String) {
    tracing::error!("Query failed: {}", e);
    let status = match &e {
        Error::InvalidParameter(_) => StatusCode::BAD_REQUEST,
        Error::RemoteService(_) => StatusCode::BAD_GATEWAY,
    };
    (status, e.to_string())
}

#[derive(Deserialize)]
struct QueryRequest {
    /// Center latitude
    lat: f64,
    /// Center longitude
    lon: f64,
    /// Inner radius in kilometers
    min_km: f64,
    /// Outer radius in kilometers
    max_km: f64,
}

#[derive(Serialize)]
struct QueryResponse {
    count: usize,
    municipalities: Vec<MunicipalityRow>,
}
