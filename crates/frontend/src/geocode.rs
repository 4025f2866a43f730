//! Public open-data lookups: commune geocoding and IRIS micro-zone polygons.
//! Both services are queried directly, unauthenticated.

use serde::Deserialize;

use retailscope_shared::geo::{BBox, LatLng};
use retailscope_shared::models::{Geometry, IrisFeature};

use crate::api::ApiError;

const GEO_API_BASE: &str = "https://geo.api.gouv.fr";

const IRIS_CATALOG_BASE: &str =
    "https://public.opendatasoft.com/api/explore/v2.1/catalog/datasets/georef-france-iris/records";

/// Row cap per IRIS catalog request; features past the cap appear once the
/// user zooms in and the bbox shrinks.
pub const IRIS_FETCH_LIMIT: u32 = 200;

// --- Commune geocoder ---

#[derive(Debug, Clone, Deserialize)]
pub struct CommuneRecord {
    pub nom: String,
    pub code: String,
    pub centre: PointGeometry,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PointGeometry {
    /// GeoJSON point, `[lng, lat]`.
    pub coordinates: [f64; 2],
}

impl CommuneRecord {
    pub fn centroid(&self) -> LatLng {
        LatLng::new(self.centre.coordinates[1], self.centre.coordinates[0])
    }
}

/// A French postal code: exactly five ASCII digits.
pub fn valid_postal_code(code: &str) -> bool {
    code.len() == 5 && code.bytes().all(|b| b.is_ascii_digit())
}

pub fn communes_by_postal_url(postal_code: &str) -> String {
    format!("{GEO_API_BASE}/communes?codePostal={postal_code}&fields=nom,code,centre")
}

/// Resolve a postal code to the centroid of its first commune.
/// `Ok(None)` when the code exists but matches nothing.
pub async fn geocode_postal(postal_code: &str) -> Result<Option<LatLng>, ApiError> {
    let resp = reqwest::Client::new()
        .get(communes_by_postal_url(postal_code))
        .send()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;
    if !resp.status().is_success() {
        return Err(ApiError::Http {
            status: resp.status().as_u16(),
        });
    }
    let records: Vec<CommuneRecord> = resp
        .json()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))?;
    Ok(records.first().map(|r| r.centroid()))
}

// --- IRIS polygon catalog ---

#[derive(Debug, Deserialize)]
struct IrisRecordsResponse {
    results: Vec<IrisRecord>,
}

#[derive(Debug, Deserialize)]
struct IrisRecord {
    iris_code: String,
    iris_name: String,
    com_name: String,
    geo_shape: GeoShape,
}

#[derive(Debug, Deserialize)]
struct GeoShape {
    geometry: Geometry,
}

/// ODSQL filter selecting shapes intersecting the viewport bbox.
pub fn iris_where_clause(bbox: &BBox) -> String {
    format!(
        "in_bbox(geo_shape, {}, {}, {}, {})",
        bbox.south, bbox.west, bbox.north, bbox.east
    )
}

/// Fetch IRIS polygons intersecting `bbox` from the open-data catalog.
pub async fn fetch_iris_features(bbox: &BBox) -> Result<Vec<IrisFeature>, ApiError> {
    let resp = reqwest::Client::new()
        .get(IRIS_CATALOG_BASE)
        .query(&[
            ("where", iris_where_clause(bbox)),
            ("limit", IRIS_FETCH_LIMIT.to_string()),
            (
                "select",
                "iris_code,iris_name,com_name,geo_shape".to_string(),
            ),
        ])
        .send()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;
    if !resp.status().is_success() {
        return Err(ApiError::Http {
            status: resp.status().as_u16(),
        });
    }
    let parsed: IrisRecordsResponse = resp
        .json()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))?;
    Ok(parsed
        .results
        .into_iter()
        .map(|r| IrisFeature {
            code: r.iris_code,
            name: r.iris_name,
            commune: r.com_name,
            geometry: r.geo_shape.geometry,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_postal_code() {
        assert!(valid_postal_code("75001"));
        assert!(valid_postal_code("01000"));
        assert!(!valid_postal_code("7500"));
        assert!(!valid_postal_code("750011"));
        assert!(!valid_postal_code("7500a"));
        assert!(!valid_postal_code(""));
    }

    #[test]
    fn test_communes_by_postal_url() {
        assert_eq!(
            communes_by_postal_url("75001"),
            "https://geo.api.gouv.fr/communes?codePostal=75001&fields=nom,code,centre"
        );
    }

    #[test]
    fn test_commune_record_centroid_swaps_axes() {
        let json = r#"{"nom":"Paris","code":"75056","centre":{"type":"Point","coordinates":[2.3522,48.8566]}}"#;
        let rec: CommuneRecord = serde_json::from_str(json).unwrap();
        let c = rec.centroid();
        assert!((c.lat - 48.8566).abs() < 1e-9);
        assert!((c.lng - 2.3522).abs() < 1e-9);
    }

    #[test]
    fn test_iris_where_clause() {
        let bbox = BBox {
            south: 48.8,
            west: 2.2,
            north: 48.9,
            east: 2.4,
        };
        assert_eq!(
            iris_where_clause(&bbox),
            "in_bbox(geo_shape, 48.8, 2.2, 48.9, 2.4)"
        );
    }

    #[test]
    fn test_iris_records_parse_into_features() {
        let json = r#"{"results":[{"iris_code":"751010101","iris_name":"Palais-Royal","com_name":"Paris 1er","geo_shape":{"type":"Feature","geometry":{"type":"Polygon","coordinates":[[[2.33,48.86],[2.34,48.86],[2.34,48.87],[2.33,48.87]]]}}}]}"#;
        let parsed: IrisRecordsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.results.len(), 1);
        let r = &parsed.results[0];
        assert_eq!(r.iris_code, "751010101");
        assert_eq!(r.com_name, "Paris 1er");
    }
}
