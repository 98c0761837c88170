//! Municipality records and the query result collection.

use geo::MultiPolygon;
use geojson::{Feature, FeatureCollection};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::error::{Error, Result};

/// Geographic point (lat/lon, EPSG:4326)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// Construct a point, rejecting non-finite coordinates.
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(Error::invalid(format!(
                "non-finite coordinates ({lat}, {lon})"
            )));
        }
        Ok(Self { lat, lon })
    }
}

/// One administrative municipality with its boundary polygon.
#[derive(Debug, Clone)]
pub struct MunicipalityRecord {
    /// National statistical code
    pub istat: String,
    /// Municipality name
    pub comune: String,
    pub provincia: String,
    pub regione: String,
    /// Boundary in geographic coordinates (may be multi-part)
    pub boundary: MultiPolygon<f64>,
}

impl MunicipalityRecord {
    /// Build a record from one GeoJSON feature of the service response.
    ///
    /// All four attribute fields must be present; a feature without them is
    /// treated as a malformed response rather than silently skipped.
    pub fn from_feature(feature: Feature) -> Result<Self> {
        let props = feature
            .properties
            .ok_or_else(|| Error::remote("feature without properties"))?;

        let istat = attribute(&props, "ISTAT")?;
        let comune = attribute(&props, "COMUNE")?;
        let provincia = attribute(&props, "PROVINCIA")?;
        let regione = attribute(&props, "REGIONE")?;

        let geometry = feature
            .geometry
            .ok_or_else(|| Error::remote(format!("feature {istat} without geometry")))?;

        let geometry = geo_types::Geometry::<f64>::try_from(geometry)
            .map_err(|e| Error::remote(format!("feature {istat}: bad geometry: {e}")))?;

        let boundary = match geometry {
            geo_types::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
            geo_types::Geometry::MultiPolygon(mp) => mp,
            other => {
                return Err(Error::remote(format!(
                    "feature {istat}: expected polygonal geometry, got {other:?}"
                )))
            }
        };

        Ok(Self {
            istat,
            comune,
            provincia,
            regione,
            boundary,
        })
    }

    fn to_feature(&self) -> Feature {
        let mut props = Map::new();
        props.insert("ISTAT".into(), Value::String(self.istat.clone()));
        props.insert("COMUNE".into(), Value::String(self.comune.clone()));
        props.insert("PROVINCIA".into(), Value::String(self.provincia.clone()));
        props.insert("REGIONE".into(), Value::String(self.regione.clone()));

        Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&self.boundary))),
            id: None,
            properties: Some(props),
            foreign_members: None,
        }
    }
}

/// Read a required attribute, accepting string or numeric JSON values.
/// ArcGIS layers are inconsistent about encoding codes like ISTAT.
fn attribute(props: &Map<String, Value>, key: &str) -> Result<String> {
    match props.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(Error::remote(format!(
            "field {key} has unexpected type: {other}"
        ))),
        None => Err(Error::remote(format!("feature missing field {key}"))),
    }
}

/// Flat attribute row for tabular display/export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MunicipalityRow {
    pub istat: String,
    pub comune: String,
    pub provincia: String,
    pub regione: String,
}

/// The municipalities retained by one query. Replaced wholesale per query.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub records: Vec<MunicipalityRecord>,
}

impl QueryResult {
    /// Parse a service response body (GeoJSON feature collection).
    pub fn from_feature_collection(collection: FeatureCollection) -> Result<Self> {
        let records = collection
            .features
            .into_iter()
            .map(MunicipalityRecord::from_feature)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Set of ISTAT codes, for comparing results across queries.
    pub fn istat_codes(&self) -> BTreeSet<String> {
        self.records.iter().map(|r| r.istat.clone()).collect()
    }

    /// Attribute rows sorted by municipality name.
    pub fn table_rows(&self) -> Vec<MunicipalityRow> {
        let mut rows: Vec<MunicipalityRow> = self
            .records
            .iter()
            .map(|r| MunicipalityRow {
                istat: r.istat.clone(),
                comune: r.comune.clone(),
                provincia: r.provincia.clone(),
                regione: r.regione.clone(),
            })
            .collect();
        rows.sort_by(|a, b| a.comune.cmp(&b.comune));
        rows
    }

    /// GeoJSON feature collection (geometry + attributes) for map display.
    pub fn to_feature_collection(&self) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: self.records.iter().map(|r| r.to_feature()).collect(),
            foreign_members: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_feature(istat: Value, name: &str) -> Value {
        serde_json::json!({
            "type": "Feature",
            "properties": {
                "ISTAT": istat,
                "COMUNE": name,
                "PROVINCIA": "L'Aquila",
                "REGIONE": "Abruzzo"
            },
            "geometry": {
                "type": "Polygon",
                "coordinates": [[
                    [13.0, 42.0], [13.1, 42.0], [13.1, 42.1], [13.0, 42.1], [13.0, 42.0]
                ]]
            }
        })
    }

    fn parse(features: Vec<Value>) -> Result<QueryResult> {
        let body = serde_json::json!({ "type": "FeatureCollection", "features": features });
        let collection: FeatureCollection = serde_json::from_value(body).unwrap();
        QueryResult::from_feature_collection(collection)
    }

    #[test]
    fn parses_string_and_numeric_istat() {
        let result = parse(vec![
            sample_feature(Value::String("066049".into()), "L'Aquila"),
            sample_feature(serde_json::json!(66095), "Scoppito"),
        ])
        .unwrap();

        assert_eq!(result.len(), 2);
        let codes = result.istat_codes();
        assert!(codes.contains("066049"));
        assert!(codes.contains("66095"));
    }

    #[test]
    fn missing_field_is_remote_error() {
        let mut feature = sample_feature(Value::String("066049".into()), "L'Aquila");
        feature["properties"]
            .as_object_mut()
            .unwrap()
            .remove("PROVINCIA");

        let err = parse(vec![feature]).unwrap_err();
        assert!(matches!(err, Error::RemoteService(_)));
        assert!(err.to_string().contains("PROVINCIA"));
    }

    #[test]
    fn missing_geometry_is_remote_error() {
        let mut feature = sample_feature(Value::String("066049".into()), "L'Aquila");
        feature["geometry"] = Value::Null;

        let err = parse(vec![feature]).unwrap_err();
        assert!(matches!(err, Error::RemoteService(_)));
    }

    #[test]
    fn table_rows_sorted_by_name() {
        let result = parse(vec![
            sample_feature(Value::String("2".into()), "Teramo"),
            sample_feature(Value::String("1".into()), "Avezzano"),
            sample_feature(Value::String("3".into()), "Pescara"),
        ])
        .unwrap();

        let rows = result.table_rows();
        let names: Vec<&str> = rows.iter().map(|r| r.comune.as_str()).collect();
        assert_eq!(names, vec!["Avezzano", "Pescara", "Teramo"]);
    }

    #[test]
    fn feature_collection_round_trips_attributes() {
        let result = parse(vec![sample_feature(Value::String("066049".into()), "L'Aquila")]).unwrap();
        let fc = result.to_feature_collection();
        assert_eq!(fc.features.len(), 1);
        let props = fc.features[0].properties.as_ref().unwrap();
        assert_eq!(props["COMUNE"], "L'Aquila");
        assert!(fc.features[0].geometry.is_some());
    }

    #[test]
    fn non_finite_point_rejected() {
        assert!(matches!(
            GeoPoint::new(f64::NAN, 13.0),
            Err(Error::InvalidParameter(_))
        ));
        assert!(GeoPoint::new(42.3, 13.8).is_ok());
    }
}
