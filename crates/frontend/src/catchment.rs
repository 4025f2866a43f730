//! Trade-area visualization: per-store radius buffers culled to the padded
//! viewport, with coverage/overlap statistics displayed verbatim from the
//! statistics service.

use retailscope_shared::geo::{meters_per_pixel, BBox, LatLng, DEG_PER_KM};
use retailscope_shared::models::{CatchmentData, CompetitorGroup};

pub const CATCHMENT_RADII_KM: [u32; 3] = [5, 10, 15];
pub const DEFAULT_CATCHMENT_RADIUS_KM: u32 = 10;

/// One circle center with its competitor's brand color.
#[derive(Debug, Clone, PartialEq)]
pub struct CatchmentCenter {
    pub position: LatLng,
    pub color: String,
}

/// Everything the catchment layer owns while enabled: the server-computed
/// coverage/overlap statistics plus the circle centers derived from the
/// competitor store dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct CatchmentLayerData {
    pub stats: CatchmentData,
    pub centers: Vec<CatchmentCenter>,
}

impl CatchmentLayerData {
    pub fn from_groups(stats: CatchmentData, groups: &[CompetitorGroup]) -> Self {
        let centers = groups
            .iter()
            .flat_map(|g| {
                g.stores.iter().map(|s| CatchmentCenter {
                    position: s.position(),
                    color: g.color.clone(),
                })
            })
            .collect();
        Self { stats, centers }
    }
}

/// Viewport bounds padded by the catchment radius in approximate degrees,
/// so a circle whose center sits just off-screen still shows its visible arc.
pub fn padded_viewport_bbox(view: &BBox, radius_km: f64) -> BBox {
    view.padded(radius_km * DEG_PER_KM)
}

/// Indices of circle centers worth drawing for the current viewport.
pub fn visible_circle_centers(centers: &[LatLng], view: &BBox, radius_km: f64) -> Vec<usize> {
    let padded = padded_viewport_bbox(view, radius_km);
    centers
        .iter()
        .enumerate()
        .filter(|(_, c)| padded.contains(**c))
        .map(|(i, _)| i)
        .collect()
}

/// On-screen circle radius for a geographic radius at the circle's latitude.
pub fn circle_radius_px(lat: f64, zoom: f64, radius_km: f64) -> f64 {
    radius_km * 1000.0 / meters_per_pixel(lat, zoom)
}
