//! IRIS micro-zone layer state: a code-keyed polygon cache refreshed per
//! viewport, a zoom gate, and click hit-testing.

use std::collections::HashMap;

use retailscope_shared::geo::LatLng;
use retailscope_shared::models::IrisFeature;

/// Below this zoom the polygons are removed and no fetch is issued.
pub const IRIS_MIN_ZOOM: f64 = 10.0;

/// Fixed analysis radius when a zone query is triggered from an IRIS
/// polygon click.
pub const IRIS_ANALYSIS_RADIUS_KM: f64 = 1.0;

pub fn iris_zoom_visible(zoom: f64) -> bool {
    zoom >= IRIS_MIN_ZOOM
}

#[derive(Debug, Clone, Default)]
pub struct IrisLayerData {
    features: HashMap<String, IrisFeature>,
    /// Affects rendering style only, never the cached data.
    pub selected: Option<String>,
}

impl IrisLayerData {
    /// Merge a viewport fetch into the cache; features are keyed by code so
    /// repeated pans never duplicate polygons. Returns how many were new.
    pub fn merge(&mut self, fresh: Vec<IrisFeature>) -> usize {
        let mut inserted = 0;
        for f in fresh {
            if self.features.insert(f.code.clone(), f).is_none() {
                inserted += 1;
            }
        }
        inserted
    }

    /// Drop the polygons (zoom gate crossed downward). The selection code is
    /// kept; it re-applies if the same polygon is fetched again.
    pub fn clear_features(&mut self) {
        self.features.clear();
    }

    pub fn features(&self) -> impl Iterator<Item = &IrisFeature> {
        self.features.values()
    }

    pub fn get(&self, code: &str) -> Option<&IrisFeature> {
        self.features.get(code)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// First polygon containing the point, if any.
    pub fn hit_test(&self, p: LatLng) -> Option<&IrisFeature> {
        self.features.values().find(|f| f.geometry.contains(p))
    }

    pub fn select(&mut self, code: impl Into<String>) {
        self.selected = Some(code.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retailscope_shared::models::Geometry;

    fn square(code: &str, lng0: f64, lat0: f64) -> IrisFeature {
        IrisFeature {
            code: code.to_string(),
            name: format!("Zone {code}"),
            commune: "Testville".to_string(),
            geometry: Geometry::Polygon {
                coordinates: vec![vec![
                    [lng0, lat0],
                    [lng0 + 0.1, lat0],
                    [lng0 + 0.1, lat0 + 0.1],
                    [lng0, lat0 + 0.1],
                ]],
            },
        }
    }

    #[test]
    fn test_zoom_gate() {
        assert!(!iris_zoom_visible(9.9));
        assert!(iris_zoom_visible(10.0));
        assert!(iris_zoom_visible(14.0));
    }

    #[test]
    fn test_merge_dedupes_by_code() {
        let mut data = IrisLayerData::default();
        assert_eq!(data.merge(vec![square("A", 2.0, 48.0), square("B", 2.2, 48.0)]), 2);
        // Re-fetching an overlapping viewport brings "B" again
        assert_eq!(data.merge(vec![square("B", 2.2, 48.0), square("C", 2.4, 48.0)]), 1);
        assert_eq!(data.len(), 3);
    }

    #[test]
    fn test_clear_features_keeps_selection() {
        let mut data = IrisLayerData::default();
        data.merge(vec![square("A", 2.0, 48.0)]);
        data.select("A");
        data.clear_features();
        assert!(data.is_empty());
        assert_eq!(data.selected.as_deref(), Some("A"));
    }

    #[test]
    fn test_hit_test() {
        let mut data = IrisLayerData::default();
        data.merge(vec![square("A", 2.0, 48.0), square("B", 2.2, 48.0)]);
        let hit = data.hit_test(LatLng::new(48.05, 2.25)).unwrap();
        assert_eq!(hit.code, "B");
        assert!(data.hit_test(LatLng::new(50.0, 2.0)).is_none());
    }
}
