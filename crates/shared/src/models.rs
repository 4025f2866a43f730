use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::{self, LatLng};

/// A single point of sale. Immutable once fetched; owned by the layer handle
/// that rendered it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: Uuid,
    pub name: String,
    pub city: String,
    pub postal_code: String,
    pub lat: f64,
    pub lng: f64,
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
}

impl Store {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// One competitor brand with its store list. Replaced wholesale on
/// re-enrichment, never partially mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorGroup {
    pub id: String,
    pub name: String,
    pub color: String,
    pub logo_url: Option<String>,
    pub avg_rating: Option<f64>,
    pub total_reviews: u32,
    #[serde(default)]
    pub stores: Vec<Store>,
}

impl CompetitorGroup {
    /// First letter of the name, used as the marker glyph when no logo is
    /// available or its image failed to load.
    pub fn initial(&self) -> char {
        self.name.chars().next().unwrap_or('?')
    }
}

// ---------------------------------------------------------------------------
// Zone analysis
// ---------------------------------------------------------------------------

/// Body of `POST /geo/zone/analyze-enriched`. Field names are the wire
/// contract; do not rename.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneAnalyzeRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobilityMix {
    pub car_pct: f64,
    pub transit_pct: f64,
    pub bike_pct: f64,
    pub walk_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeBands {
    pub under_25_pct: f64,
    pub from_25_to_64_pct: f64,
    pub over_64_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocioDemographics {
    pub median_income: Option<f64>,
    pub unemployment_pct: Option<f64>,
    pub age_bands: AgeBands,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommuneSummary {
    pub code: String,
    pub name: String,
    pub population: u64,
    pub distance_km: f64,
}

/// Result of a zone query. Replaced entirely on each new query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneAnalysis {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
    pub population: u64,
    pub density_per_km2: f64,
    pub average_rent_sqm: Option<f64>,
    pub mobility: MobilityMix,
    pub socio: SocioDemographics,
    #[serde(default)]
    pub communes: Vec<CommuneSummary>,
}

impl ZoneAnalysis {
    pub fn anchor(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }
}

// ---------------------------------------------------------------------------
// Catchment zones
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorCoverage {
    pub competitor_id: String,
    pub competitor_name: String,
    pub coverage_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatchmentOverlap {
    pub competitor_a: String,
    pub competitor_b: String,
    pub shared_population: u64,
    pub shared_communes: u32,
}

/// Per-competitor population coverage and pairwise overlaps for one radius.
/// All numbers are server-computed and displayed verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatchmentData {
    pub radius_km: u32,
    #[serde(default)]
    pub coverage: Vec<CompetitorCoverage>,
    #[serde(default)]
    pub overlaps: Vec<CatchmentOverlap>,
}

// ---------------------------------------------------------------------------
// Point layers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrveStation {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub power_kw: Option<f64>,
    pub operator: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrveStats {
    pub station_count: u32,
    pub total_power_kw: f64,
    pub avg_power_kw: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poi {
    pub id: String,
    pub name: String,
    pub category: String,
    pub lat: f64,
    pub lng: f64,
}

// ---------------------------------------------------------------------------
// Polygons: administrative boundaries and IRIS micro-zones
// ---------------------------------------------------------------------------

/// GeoJSON geometry subset carried by boundary and IRIS payloads.
/// Coordinates are `[lng, lat]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<[f64; 2]>>> },
}

impl Geometry {
    /// Outer rings only; holes are ignored for hit testing and centroids.
    pub fn outer_rings(&self) -> Vec<&Vec<[f64; 2]>> {
        match self {
            Geometry::Polygon { coordinates } => coordinates.first().into_iter().collect(),
            Geometry::MultiPolygon { coordinates } => {
                coordinates.iter().filter_map(|poly| poly.first()).collect()
            }
        }
    }

    pub fn contains(&self, p: LatLng) -> bool {
        self.outer_rings()
            .iter()
            .any(|ring| geo::point_in_ring(p, ring))
    }

    /// Arithmetic mean of all outer-ring vertices.
    pub fn vertex_centroid(&self) -> Option<LatLng> {
        let rings = self.outer_rings();
        let all: Vec<[f64; 2]> = rings.iter().flat_map(|r| r.iter().copied()).collect();
        geo::ring_centroid(&all)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryLevel {
    Regions,
    Departements,
    Communes,
    Academies,
}

impl BoundaryLevel {
    pub const ALL: [BoundaryLevel; 4] = [
        BoundaryLevel::Regions,
        BoundaryLevel::Departements,
        BoundaryLevel::Communes,
        BoundaryLevel::Academies,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BoundaryLevel::Regions => "regions",
            BoundaryLevel::Departements => "departements",
            BoundaryLevel::Communes => "communes",
            BoundaryLevel::Academies => "academies",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BoundaryLevel::Regions => "Régions",
            BoundaryLevel::Departements => "Départements",
            BoundaryLevel::Communes => "Communes",
            BoundaryLevel::Academies => "Académies",
        }
    }
}

impl std::fmt::Display for BoundaryLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryFeature {
    pub code: String,
    pub name: String,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryCollection {
    pub level: BoundaryLevel,
    #[serde(default)]
    pub features: Vec<BoundaryFeature>,
}

/// A selectable census micro-zone polygon, cached by `code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrisFeature {
    pub code: String,
    pub name: String,
    pub commune: String,
    pub geometry: Geometry,
}

/// Result of a rating-enrichment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentSummary {
    pub updated: u32,
    pub provider: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_polygon_outer_ring_only() {
        let g = Geometry::Polygon {
            coordinates: vec![
                vec![[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]],
                // hole, must be ignored
                vec![[0.5, 0.5], [1.5, 0.5], [1.5, 1.5], [0.5, 1.5]],
            ],
        };
        assert_eq!(g.outer_rings().len(), 1);
        assert!(g.contains(LatLng::new(1.0, 1.0)));
        assert!(!g.contains(LatLng::new(3.0, 3.0)));
    }

    #[test]
    fn test_geometry_multipolygon_centroid() {
        let g = Geometry::MultiPolygon {
            coordinates: vec![
                vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]],
                vec![vec![[2.0, 2.0], [3.0, 2.0], [3.0, 3.0], [2.0, 3.0]]],
            ],
        };
        let c = g.vertex_centroid().unwrap();
        assert!((c.lng - 1.5).abs() < 1e-9);
        assert!((c.lat - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_geometry_deserializes_from_geojson_tag() {
        let json = r#"{"type":"Polygon","coordinates":[[[2.0,48.0],[2.1,48.0],[2.1,48.1],[2.0,48.1]]]}"#;
        let g: Geometry = serde_json::from_str(json).unwrap();
        assert!(g.contains(LatLng::new(48.05, 2.05)));
    }

    #[test]
    fn test_competitor_initial_glyph() {
        let g = CompetitorGroup {
            id: "bricorama".into(),
            name: "Bricorama".into(),
            color: "#e67e22".into(),
            logo_url: None,
            avg_rating: None,
            total_reviews: 0,
            stores: vec![],
        };
        assert_eq!(g.initial(), 'B');
    }

    #[test]
    fn test_zone_analyze_request_wire_names() {
        let req = ZoneAnalyzeRequest {
            latitude: 48.8566,
            longitude: 2.3522,
            radius_km: 15.0,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["latitude"], 48.8566);
        assert_eq!(v["longitude"], 2.3522);
        assert_eq!(v["radius_km"], 15.0);
    }

    #[test]
    fn test_boundary_level_paths() {
        assert_eq!(BoundaryLevel::Departements.as_str(), "departements");
        assert_eq!(BoundaryLevel::Academies.to_string(), "academies");
    }
}
