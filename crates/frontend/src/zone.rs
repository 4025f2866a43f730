//! Zone analysis: a three-mode controller (radius click, postal-code
//! search, IRIS polygon select) resolving a geographic anchor into one
//! statistics request. All modes write the same result slot.

use retailscope_shared::geo::{zoom_for_radius, LatLng};
use retailscope_shared::models::ZoneAnalyzeRequest;

use crate::iris::IRIS_ANALYSIS_RADIUS_KM;

/// Fixed analysis radius for postal-code mode, independent of the slider.
pub const POSTAL_ANALYSIS_RADIUS_KM: f64 = 5.0;

pub const MIN_ZONE_RADIUS_KM: f64 = 1.0;
pub const MAX_ZONE_RADIUS_KM: f64 = 50.0;
pub const DEFAULT_ZONE_RADIUS_KM: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneMode {
    Radius,
    Postal,
    Iris,
}

impl ZoneMode {
    pub fn label(&self) -> &'static str {
        match self {
            ZoneMode::Radius => "Rayon",
            ZoneMode::Postal => "Code postal",
            ZoneMode::Iris => "IRIS",
        }
    }
}

/// Results panel tabs; every completed query lands on the overview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelTab {
    Overview,
    Communes,
}

/// A resolved anchor + radius, ready to be drawn and sent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneQuery {
    pub anchor: LatLng,
    pub radius_km: f64,
}

impl ZoneQuery {
    pub fn request(&self) -> ZoneAnalyzeRequest {
        ZoneAnalyzeRequest {
            latitude: self.anchor.lat,
            longitude: self.anchor.lng,
            radius_km: self.radius_km,
        }
    }

    /// Zoom applied when focusing the queried zone.
    pub fn target_zoom(&self) -> f64 {
        zoom_for_radius(self.radius_km)
    }
}

/// Radius mode: the clicked point with the slider radius.
pub fn radius_query(anchor: LatLng, slider_radius_km: f64) -> ZoneQuery {
    ZoneQuery {
        anchor,
        radius_km: slider_radius_km.clamp(MIN_ZONE_RADIUS_KM, MAX_ZONE_RADIUS_KM),
    }
}

/// Postal mode: the geocoded commune centroid with a fixed 5 km radius.
pub fn postal_query(centroid: LatLng) -> ZoneQuery {
    ZoneQuery {
        anchor: centroid,
        radius_km: POSTAL_ANALYSIS_RADIUS_KM,
    }
}

/// IRIS mode: the polygon's vertex centroid with a fixed 1 km radius.
pub fn iris_query(centroid: LatLng) -> ZoneQuery {
    ZoneQuery {
        anchor: centroid,
        radius_km: IRIS_ANALYSIS_RADIUS_KM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paris_radius_scenario() {
        // Click Paris with the slider at 15 km: exact request payload and a
        // zoom clamped down to 10.
        let q = radius_query(LatLng::new(48.8566, 2.3522), 15.0);
        let req = q.request();
        assert_eq!(req.latitude, 48.8566);
        assert_eq!(req.longitude, 2.3522);
        assert_eq!(req.radius_km, 15.0);
        assert!((q.target_zoom() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_radius_one_km_zooms_to_14() {
        let q = radius_query(LatLng::new(45.76, 4.84), 1.0);
        assert!((q.target_zoom() - 14.0).abs() < 1e-9);
    }

    #[test]
    fn test_radius_clamps_slider_range() {
        assert_eq!(radius_query(LatLng::new(45.0, 3.0), 0.2).radius_km, 1.0);
        assert_eq!(radius_query(LatLng::new(45.0, 3.0), 80.0).radius_km, 50.0);
    }

    #[test]
    fn test_postal_mode_ignores_slider_radius() {
        // The slider value never reaches postal queries
        let q = postal_query(LatLng::new(48.862, 2.336));
        assert_eq!(q.request().radius_km, 5.0);
    }

    #[test]
    fn test_iris_mode_uses_one_km() {
        let q = iris_query(LatLng::new(48.87, 2.35));
        assert_eq!(q.request().radius_km, 1.0);
        assert!((q.target_zoom() - 14.0).abs() < 1e-9);
    }
}
