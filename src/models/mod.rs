pub mod municipality;

pub use municipality::{GeoPoint, MunicipalityRecord, MunicipalityRow, QueryResult};
