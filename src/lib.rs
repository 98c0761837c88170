//! Anello - municipality ring extraction
//!
//! Builds an annular region (ring) around a geographic point and finds all
//! administrative municipalities whose boundaries intersect it, using a remote
//! ESRI FeatureServer layer as the boundary source.

pub mod error;
pub mod locator;
pub mod models;
pub mod projection;
pub mod ring;
pub mod session;

pub use error::{Error, Result};
pub use locator::BoundaryClient;
pub use models::{GeoPoint, MunicipalityRecord, QueryResult};
pub use ring::Ring;
pub use session::{QueryParams, Session};
