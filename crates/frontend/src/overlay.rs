//! SVG overlay assembly. Circles and polygons are drawn into one SVG string
//! injected above the tile layer; markers are separate DOM elements.

use retailscope_shared::geo::Viewport;
use retailscope_shared::models::BoundaryCollection;

use crate::iris::IrisLayerData;

const IRIS_STROKE: &str = "#2c3e50";
const IRIS_SELECTED_STROKE: &str = "#f39c12";
const ZONE_STROKE: &str = "#e74c3c";

/// Wrap overlay content in the positioned `<svg>` element. Pointer events
/// stay off; clicks are resolved by the container's own hit testing.
pub fn wrap_svg(content: &str, width: f64, height: f64) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {width} {height}" style="position:absolute;top:0;left:0;width:100%;height:100%;pointer-events:none;z-index:5;">{content}</svg>"#
    )
}

/// Project a polygon ring (GeoJSON `[lng, lat]`) into an SVG `points`
/// attribute in container pixels.
pub fn ring_points_attr(ring: &[[f64; 2]], vp: &Viewport) -> String {
    let mut attr = String::with_capacity(ring.len() * 12);
    for (i, c) in ring.iter().enumerate() {
        let (x, y) = vp.to_container_px(retailscope_shared::geo::LatLng::new(c[1], c[0]));
        if i > 0 {
            attr.push(' ');
        }
        attr.push_str(&format!("{x:.1},{y:.1}"));
    }
    attr
}

/// One trade-area circle, already projected to container pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct CatchmentCircle {
    pub cx: f64,
    pub cy: f64,
    pub radius_px: f64,
    pub color: String,
}

pub fn build_catchment_circles(svg: &mut String, circles: &[CatchmentCircle]) {
    for c in circles {
        let (cx, cy, r, color) = (c.cx, c.cy, c.radius_px, &c.color);
        svg.push_str(&format!(
            r##"<circle cx="{cx:.1}" cy="{cy:.1}" r="{r:.1}" fill="none" stroke="{color}" stroke-width="1.5" stroke-opacity="0.55"/>"##
        ));
    }
}

/// The active zone-analysis circle (one at most).
pub fn build_zone_circle(svg: &mut String, cx: f64, cy: f64, radius_px: f64) {
    svg.push_str(&format!(
        r##"<circle cx="{cx:.1}" cy="{cy:.1}" r="{radius_px:.1}" fill="rgba(231,76,60,0.08)" stroke="{ZONE_STROKE}" stroke-width="2" stroke-dasharray="8 6"/>"##
    ));
}

pub fn build_iris_polygons(svg: &mut String, iris: &IrisLayerData, vp: &Viewport) {
    for f in iris.features() {
        let selected = iris.selected.as_deref() == Some(f.code.as_str());
        let (stroke, width, fill) = if selected {
            (IRIS_SELECTED_STROKE, 3.5, "rgba(243,156,18,0.15)")
        } else {
            (IRIS_STROKE, 1.2, "rgba(44,62,80,0.06)")
        };
        for ring in f.geometry.outer_rings() {
            let points = ring_points_attr(ring, vp);
            svg.push_str(&format!(
                r##"<polygon points="{points}" fill="{fill}" stroke="{stroke}" stroke-width="{width}"/>"##
            ));
        }
    }
}

pub fn build_boundary_polygons(
    svg: &mut String,
    boundaries: &BoundaryCollection,
    vp: &Viewport,
    color: &str,
) {
    for f in &boundaries.features {
        for ring in f.geometry.outer_rings() {
            let points = ring_points_attr(ring, vp);
            svg.push_str(&format!(
                r##"<polygon points="{points}" fill="none" stroke="{color}" stroke-width="1.5" stroke-opacity="0.8"/>"##
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retailscope_shared::geo::LatLng;
    use retailscope_shared::models::{BoundaryFeature, BoundaryLevel, Geometry, IrisFeature};

    fn vp() -> Viewport {
        Viewport::new(LatLng::new(48.86, 2.35), 12.0, 800.0, 600.0)
    }

    #[test]
    fn test_wrap_svg_viewbox_and_layering() {
        let out = wrap_svg("<circle/>", 800.0, 600.0);
        assert!(out.contains(r#"viewBox="0 0 800 600""#));
        assert!(out.contains("pointer-events:none"));
        assert!(out.contains("<circle/>"));
    }

    #[test]
    fn test_ring_points_attr_centers_viewport_center() {
        let ring = [[2.35, 48.86]]; // [lng, lat] of the viewport center
        let attr = ring_points_attr(&ring, &vp());
        assert_eq!(attr, "400.0,300.0");
    }

    #[test]
    fn test_catchment_circles_one_element_per_center() {
        let circles = vec![
            CatchmentCircle {
                cx: 100.0,
                cy: 100.0,
                radius_px: 40.0,
                color: "#0078d4".into(),
            },
            CatchmentCircle {
                cx: 300.0,
                cy: 250.0,
                radius_px: 40.0,
                color: "#c0392b".into(),
            },
        ];
        let mut svg = String::new();
        build_catchment_circles(&mut svg, &circles);
        assert_eq!(svg.matches("<circle").count(), 2);
        assert!(svg.contains(r##"stroke="#0078d4""##));
        assert!(svg.contains("fill=\"none\""));
    }

    #[test]
    fn test_zone_circle_is_dashed() {
        let mut svg = String::new();
        build_zone_circle(&mut svg, 400.0, 300.0, 120.0);
        assert!(svg.contains(r#"r="120.0""#));
        assert!(svg.contains("stroke-dasharray"));
    }

    #[test]
    fn test_iris_selected_polygon_highlighted() {
        let mut iris = IrisLayerData::default();
        iris.merge(vec![
            IrisFeature {
                code: "A".into(),
                name: "Zone A".into(),
                commune: "Paris".into(),
                geometry: Geometry::Polygon {
                    coordinates: vec![vec![[2.34, 48.85], [2.36, 48.85], [2.36, 48.87]]],
                },
            },
            IrisFeature {
                code: "B".into(),
                name: "Zone B".into(),
                commune: "Paris".into(),
                geometry: Geometry::Polygon {
                    coordinates: vec![vec![[2.30, 48.85], [2.32, 48.85], [2.32, 48.87]]],
                },
            },
        ]);
        iris.select("A");
        let mut svg = String::new();
        build_iris_polygons(&mut svg, &iris, &vp());
        assert_eq!(svg.matches("<polygon").count(), 2);
        // Exactly one polygon carries the highlight stroke
        assert_eq!(svg.matches(IRIS_SELECTED_STROKE).count(), 1);
        assert_eq!(svg.matches(r#"stroke-width="3.5""#).count(), 1);
    }

    #[test]
    fn test_boundary_polygons_unfilled() {
        let coll = BoundaryCollection {
            level: BoundaryLevel::Departements,
            features: vec![BoundaryFeature {
                code: "75".into(),
                name: "Paris".into(),
                geometry: Geometry::MultiPolygon {
                    coordinates: vec![
                        vec![vec![[2.25, 48.82], [2.42, 48.82], [2.42, 48.90]]],
                        vec![vec![[2.10, 48.70], [2.15, 48.70], [2.15, 48.75]]],
                    ],
                },
            }],
        };
        let mut svg = String::new();
        build_boundary_polygons(&mut svg, &coll, &vp(), "#7f8c8d");
        // One polygon per outer ring of the multipolygon
        assert_eq!(svg.matches("<polygon").count(), 2);
        assert!(svg.contains(r#"fill="none""#));
    }
}
