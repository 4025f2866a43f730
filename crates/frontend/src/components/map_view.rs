use std::collections::HashSet;

use dioxus::html::geometry::WheelDelta;
use dioxus::html::input_data::MouseButton;
use dioxus::prelude::*;

use retailscope_shared::geo::{self, LatLng, Viewport};
use retailscope_shared::models::{IrveStation, Poi, Store};

use crate::catchment::{circle_radius_px, visible_circle_centers};
use crate::cluster::{
    build_clusters, cluster_tier, marker_border_px, marker_size_px, rating_border_color,
    ClusterNode, CompetitorLayerData,
};
use crate::iris::iris_zoom_visible;
use crate::overlay::{self, CatchmentCircle};
use crate::session::{LayerHandle, LayerId, LayerRegistry, MapSession};
use crate::zone::ZoneQuery;

pub const MAP_CONTAINER_ID: &str = "retailscope-map";

/// Drag threshold in pixels; movement below this is treated as a click.
const DRAG_THRESHOLD: f64 = 3.0;

/// Zoom applied when expanding a cluster by clicking it.
const CLUSTER_EXPAND_STEP: f64 = 2.0;

// ---------------------------------------------------------------------------
// DOM helpers
// ---------------------------------------------------------------------------

/// Get the bounding client rect of the map container element.
fn container_rect() -> Option<web_sys::DomRect> {
    let document = web_sys::window()?.document()?;
    let element = document.get_element_by_id(MAP_CONTAINER_ID)?;
    Some(element.get_bounding_client_rect())
}

/// Convert a wheel delta (pixels / lines / pages) to a uniform pixel-like value.
fn wheel_delta_y(delta: WheelDelta) -> f64 {
    match delta {
        WheelDelta::Pixels(d) => d.y,
        WheelDelta::Lines(d) => d.y * 40.0,
        WheelDelta::Pages(d) => d.y * 400.0,
    }
}

// ---------------------------------------------------------------------------
// Marker view building (pure functions, easily testable)
// ---------------------------------------------------------------------------

fn on_screen(cx: f64, cy: f64, vp: &Viewport, margin: f64) -> bool {
    cx >= -margin && cx <= vp.width + margin && cy >= -margin && cy <= vp.height + margin
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ClusterIconView {
    pub cx: f64,
    pub cy: f64,
    pub size: u32,
    pub color: &'static str,
    pub count: usize,
    pub lat: f64,
    pub lng: f64,
}

impl ClusterIconView {
    fn style(&self) -> String {
        let half = self.size as f64 / 2.0;
        format!(
            "left:{:.1}px;top:{:.1}px;width:{}px;height:{}px;background:{};",
            self.cx - half,
            self.cy - half,
            self.size,
            self.size,
            self.color
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum MarkerBody {
    Logo(String),
    Glyph { letter: char, bg: String },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StoreMarkerView {
    pub cx: f64,
    pub cy: f64,
    pub size: u32,
    pub border_px: u32,
    pub border_color: String,
    pub body: MarkerBody,
    pub title: String,
    pub group_id: String,
}

impl StoreMarkerView {
    fn style(&self) -> String {
        let half = self.size as f64 / 2.0;
        format!(
            "left:{:.1}px;top:{:.1}px;width:{}px;height:{}px;border:{}px solid {};",
            self.cx - half,
            self.cy - half,
            self.size,
            self.size,
            self.border_px,
            self.border_color
        )
    }
}

/// Small uniform dot marker (own stores, charging stations, POI).
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DotView {
    pub cx: f64,
    pub cy: f64,
    pub size: u32,
    pub color: String,
    pub title: String,
}

impl DotView {
    fn style(&self) -> String {
        let half = self.size as f64 / 2.0;
        format!(
            "left:{:.1}px;top:{:.1}px;width:{}px;height:{}px;background:{};",
            self.cx - half,
            self.cy - half,
            self.size,
            self.size,
            self.color
        )
    }
}

/// Build cluster icons and individual store markers from the competitor
/// layer's visible set.
fn competitor_views(
    data: &CompetitorLayerData,
    vp: &Viewport,
    failed_logos: &HashSet<String>,
) -> (Vec<ClusterIconView>, Vec<StoreMarkerView>) {
    let nodes = build_clusters(&data.points, data.visible.iter(), vp);
    let mut clusters = Vec::new();
    let mut singles = Vec::new();
    for node in nodes {
        match node {
            ClusterNode::Cluster { lat, lng, count } => {
                let tier = cluster_tier(count);
                let (cx, cy) = vp.to_container_px(LatLng::new(lat, lng));
                clusters.push(ClusterIconView {
                    cx,
                    cy,
                    size: tier.size_px,
                    color: tier.color,
                    count,
                    lat,
                    lng,
                });
            }
            ClusterNode::Single { point_idx } => {
                let p = &data.points[point_idx];
                let group = &data.groups[p.group_idx];
                let store = &group.stores[p.store_idx];
                let (cx, cy) = vp.to_container_px(LatLng::new(p.lat, p.lng));
                let body = match (&group.logo_url, failed_logos.contains(&group.id)) {
                    (Some(url), false) => MarkerBody::Logo(url.clone()),
                    _ => MarkerBody::Glyph {
                        letter: group.initial(),
                        bg: group.color.clone(),
                    },
                };
                let title = match store.rating {
                    Some(r) => format!("{} — {} ({r:.1}★)", group.name, store.city),
                    None => format!("{} — {}", group.name, store.city),
                };
                singles.push(StoreMarkerView {
                    cx,
                    cy,
                    size: marker_size_px(vp.zoom),
                    border_px: marker_border_px(vp.zoom),
                    border_color: rating_border_color(p.rating, &group.color),
                    body,
                    title,
                    group_id: group.id.clone(),
                });
            }
        }
    }
    (clusters, singles)
}

/// Cluster under a container-relative click position, if any.
fn cluster_hit(nodes: &[ClusterNode], vp: &Viewport, x: f64, y: f64) -> Option<LatLng> {
    for node in nodes {
        if let ClusterNode::Cluster { lat, lng, count } = node {
            let (cx, cy) = vp.to_container_px(LatLng::new(*lat, *lng));
            let r = cluster_tier(*count).size_px as f64 / 2.0;
            if ((cx - x).powi(2) + (cy - y).powi(2)).sqrt() <= r {
                return Some(LatLng::new(*lat, *lng));
            }
        }
    }
    None
}

fn own_store_views(stores: &[Store], vp: &Viewport, color: &str) -> Vec<DotView> {
    stores
        .iter()
        .filter_map(|s| {
            let (cx, cy) = vp.to_container_px(s.position());
            on_screen(cx, cy, vp, 16.0).then(|| DotView {
                cx,
                cy,
                size: 12,
                color: color.to_string(),
                title: format!("{} — {}", s.name, s.city),
            })
        })
        .collect()
}

fn irve_views(stations: &[IrveStation], vp: &Viewport, color: &str) -> Vec<DotView> {
    stations
        .iter()
        .filter_map(|st| {
            let (cx, cy) = vp.to_container_px(LatLng::new(st.lat, st.lng));
            on_screen(cx, cy, vp, 16.0).then(|| DotView {
                cx,
                cy,
                size: 14,
                color: color.to_string(),
                title: match st.power_kw {
                    Some(p) => format!("{} ({p} kW)", st.name),
                    None => st.name.clone(),
                },
            })
        })
        .collect()
}

fn poi_views(pois: &[Poi], vp: &Viewport, color: &str) -> Vec<DotView> {
    pois.iter()
        .filter_map(|p| {
            let (cx, cy) = vp.to_container_px(LatLng::new(p.lat, p.lng));
            on_screen(cx, cy, vp, 16.0).then(|| DotView {
                cx,
                cy,
                size: 10,
                color: color.to_string(),
                title: format!("{} ({})", p.name, p.category),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

#[component]
pub fn MapView(
    session: Signal<MapSession>,
    registry: Signal<LayerRegistry>,
    catchment_radius: Signal<u32>,
    zone_circle: Signal<Option<ZoneQuery>>,
    failed_logos: Signal<HashSet<String>>,
    on_map_click: EventHandler<LatLng>,
    on_viewport_settled: EventHandler<()>,
) -> Element {
    // Measure the container once it exists; loaders wait on the ready flag.
    use_effect(move || {
        if let Some(rect) = container_rect() {
            session.write().init(rect.width(), rect.height());
        }
    });

    // Drag state
    let mut is_dragging = use_signal(|| false);
    let mut did_drag = use_signal(|| false);
    let mut drag_start = use_signal(|| (0.0_f64, 0.0_f64));
    let mut drag_last = use_signal(|| (0.0_f64, 0.0_f64));

    // Snapshot the session for rendering; handlers re-read at event time.
    let (vp, ready) = {
        let s = session.read();
        (s.viewport, s.ready)
    };

    let tiles = if ready { geo::visible_tiles(&vp) } else { Vec::new() };

    // Vector overlay (circles + polygons) as one SVG string.
    let svg_html = {
        let s = session.read();
        let mut content = String::new();
        if let Some(LayerHandle::Boundaries(b)) = s.handle(LayerId::Boundaries) {
            let color = registry.read().get(LayerId::Boundaries).color;
            overlay::build_boundary_polygons(&mut content, b, &vp, color);
        }
        if let Some(LayerHandle::Catchment(c)) = s.handle(LayerId::Catchment) {
            let radius_km = *catchment_radius.read() as f64;
            let view_bounds = vp.bounds();
            let centers: Vec<LatLng> = c.centers.iter().map(|cc| cc.position).collect();
            let circles: Vec<CatchmentCircle> = visible_circle_centers(&centers, &view_bounds, radius_km)
                .into_iter()
                .map(|i| {
                    let (cx, cy) = vp.to_container_px(centers[i]);
                    CatchmentCircle {
                        cx,
                        cy,
                        radius_px: circle_radius_px(centers[i].lat, vp.zoom, radius_km),
                        color: c.centers[i].color.clone(),
                    }
                })
                .collect();
            overlay::build_catchment_circles(&mut content, &circles);
        }
        if let Some(LayerHandle::Iris(d)) = s.handle(LayerId::Iris) {
            if iris_zoom_visible(vp.zoom) {
                overlay::build_iris_polygons(&mut content, d, &vp);
            }
        }
        if let Some(q) = &*zone_circle.read() {
            let (cx, cy) = vp.to_container_px(q.anchor);
            overlay::build_zone_circle(
                &mut content,
                cx,
                cy,
                circle_radius_px(q.anchor.lat, vp.zoom, q.radius_km),
            );
        }
        overlay::wrap_svg(&content, vp.width, vp.height)
    };

    // Marker views
    let (clusters, store_markers) = {
        let s = session.read();
        let failed = failed_logos.read();
        match s.handle(LayerId::Competitors) {
            Some(LayerHandle::Competitors(d)) => competitor_views(d, &vp, &failed),
            _ => (Vec::new(), Vec::new()),
        }
    };
    let (own_dots, irve_dots, poi_dots) = {
        let s = session.read();
        let reg = registry.read();
        let own = match s.handle(LayerId::OwnStores) {
            Some(LayerHandle::OwnStores(stores)) => {
                own_store_views(stores, &vp, reg.get(LayerId::OwnStores).color)
            }
            _ => Vec::new(),
        };
        let irve = match s.handle(LayerId::Irve) {
            Some(LayerHandle::Irve { stations, .. }) => {
                irve_views(stations, &vp, reg.get(LayerId::Irve).color)
            }
            _ => Vec::new(),
        };
        let poi = match s.handle(LayerId::Poi) {
            Some(LayerHandle::Poi(pois)) => poi_views(pois, &vp, reg.get(LayerId::Poi).color),
            _ => Vec::new(),
        };
        (own, irve, poi)
    };

    let container_class = if *is_dragging.read() {
        "map-container dragging"
    } else {
        "map-container"
    };

    rsx! {
        div {
            id: MAP_CONTAINER_ID,
            class: "{container_class}",

            onmousedown: move |evt: Event<MouseData>| {
                if evt.trigger_button() != Some(MouseButton::Primary) {
                    return;
                }
                let client = evt.client_coordinates();
                is_dragging.set(true);
                did_drag.set(false);
                drag_start.set((client.x, client.y));
                drag_last.set((client.x, client.y));
            },

            onmousemove: move |evt: Event<MouseData>| {
                if !*is_dragging.read() {
                    return;
                }
                let client = evt.client_coordinates();
                let (sx, sy) = *drag_start.read();
                if !*did_drag.read()
                    && ((client.x - sx).abs() > DRAG_THRESHOLD
                        || (client.y - sy).abs() > DRAG_THRESHOLD)
                {
                    did_drag.set(true);
                }
                if *did_drag.read() {
                    let (lx, ly) = *drag_last.read();
                    session.write().viewport.pan_by(client.x - lx, client.y - ly);
                }
                drag_last.set((client.x, client.y));
            },

            onmouseup: move |evt: Event<MouseData>| {
                let was_dragging = *is_dragging.read();
                let was_drag = *did_drag.read();
                is_dragging.set(false);
                if !was_dragging {
                    return;
                }
                if was_drag {
                    // Drag finished: this is the moveend for pan gestures
                    on_viewport_settled.call(());
                    return;
                }
                // A mouseup without movement = a click
                let Some(rect) = container_rect() else { return };
                let client = evt.client_coordinates();
                let cx = client.x - rect.left();
                let cy = client.y - rect.top();

                // Cluster expansion takes priority over zone clicks
                let hit = {
                    let s = session.read();
                    match s.handle(LayerId::Competitors) {
                        Some(LayerHandle::Competitors(d)) => {
                            let nodes = build_clusters(&d.points, d.visible.iter(), &s.viewport);
                            cluster_hit(&nodes, &s.viewport, cx, cy)
                        }
                        _ => None,
                    }
                };
                if let Some(center) = hit {
                    {
                        let mut s = session.write();
                        let new_zoom = (s.viewport.zoom + CLUSTER_EXPAND_STEP).min(geo::MAX_ZOOM);
                        s.viewport.center = center;
                        s.viewport.zoom = new_zoom;
                    }
                    on_viewport_settled.call(());
                } else {
                    let point = session.read().viewport.container_px_to_latlng(cx, cy);
                    on_map_click.call(point);
                }
            },

            onmouseleave: move |_| {
                let was_drag = *is_dragging.read() && *did_drag.read();
                is_dragging.set(false);
                if was_drag {
                    on_viewport_settled.call(());
                }
            },

            onwheel: move |evt: Event<WheelData>| {
                evt.prevent_default();
                let Some(rect) = container_rect() else { return };
                let client = evt.data().client_coordinates();
                let cx = client.x - rect.left();
                let cy = client.y - rect.top();
                let step = if wheel_delta_y(evt.data().delta()) < 0.0 { 1.0 } else { -1.0 };
                {
                    let mut s = session.write();
                    let new_zoom = s.viewport.zoom + step;
                    s.viewport.zoom_about(new_zoom, cx, cy);
                }
                // Every zoom step settles immediately; not debounced
                on_viewport_settled.call(());
            },

            ondoubleclick: move |evt: Event<MouseData>| {
                evt.prevent_default();
                let Some(rect) = container_rect() else { return };
                let client = evt.client_coordinates();
                {
                    let mut s = session.write();
                    let new_zoom = s.viewport.zoom + 1.0;
                    s.viewport.zoom_about(new_zoom, client.x - rect.left(), client.y - rect.top());
                }
                on_viewport_settled.call(());
            },

            // Base tile layer
            for t in tiles {
                img {
                    key: "{t.z}/{t.x}/{t.y}",
                    class: "map-tile",
                    src: geo::tile_url(t.z, t.x, t.y),
                    style: "left:{t.left}px;top:{t.top}px;",
                    draggable: "false",
                }
            }

            // Vector overlay: catchment circles, zone circle, polygons
            div {
                dangerous_inner_html: "{svg_html}",
                style: "position:absolute;top:0;left:0;width:100%;height:100%;pointer-events:none;",
            }

            // Point markers
            for d in own_dots {
                div { class: "dot-marker", title: "{d.title}", style: "{d.style()}" }
            }
            for d in irve_dots {
                div { class: "dot-marker", title: "{d.title}", style: "{d.style()}" }
            }
            for d in poi_dots {
                div { class: "dot-marker", title: "{d.title}", style: "{d.style()}" }
            }

            // Competitor clusters and individual stores
            for c in clusters {
                div { class: "cluster-icon", style: "{c.style()}", "{c.count}" }
            }
            for m in store_markers {
                div {
                    class: "store-marker",
                    title: "{m.title}",
                    style: "{m.style()}",
                    {
                        match &m.body {
                            MarkerBody::Logo(url) => {
                                let gid = m.group_id.clone();
                                let url = url.clone();
                                rsx! {
                                    img {
                                        src: "{url}",
                                        draggable: "false",
                                        onerror: move |_| {
                                            failed_logos.write().insert(gid.clone());
                                        },
                                    }
                                }
                            }
                            MarkerBody::Glyph { letter, bg } => rsx! {
                                span { class: "marker-glyph", style: "background:{bg};", "{letter}" }
                            },
                        }
                    }
                }
            }

            div { class: "map-attribution", "© OpenStreetMap" }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retailscope_shared::models::CompetitorGroup;
    use uuid::Uuid;

    fn group(id: &str, color: &str, logo: Option<&str>, stores: Vec<Store>) -> CompetitorGroup {
        CompetitorGroup {
            id: id.to_string(),
            name: id.to_string(),
            color: color.to_string(),
            logo_url: logo.map(|s| s.to_string()),
            avg_rating: None,
            total_reviews: 0,
            stores,
        }
    }

    fn store(lat: f64, lng: f64, rating: Option<f64>) -> Store {
        Store {
            id: Uuid::nil(),
            name: "Magasin".into(),
            city: "Paris".into(),
            postal_code: "75001".into(),
            lat,
            lng,
            rating,
            review_count: None,
        }
    }

    fn vp(zoom: f64) -> Viewport {
        Viewport::new(LatLng::new(48.8566, 2.3522), zoom, 800.0, 600.0)
    }

    fn layer(groups: Vec<CompetitorGroup>, view: &Viewport) -> CompetitorLayerData {
        let mut data = CompetitorLayerData::new(groups);
        data.refresh_visible(&view.bounds());
        data
    }

    #[test]
    fn test_single_marker_uses_logo_when_present() {
        let view = vp(14.0);
        let data = layer(
            vec![group(
                "casto",
                "#0078d4",
                Some("https://cdn.example.com/c.png"),
                vec![store(48.8566, 2.3522, Some(4.2))],
            )],
            &view,
        );
        let (clusters, singles) = competitor_views(&data, &view, &HashSet::new());
        assert!(clusters.is_empty());
        assert_eq!(singles.len(), 1);
        assert_eq!(
            singles[0].body,
            MarkerBody::Logo("https://cdn.example.com/c.png".into())
        );
        // rating 4.2 -> green border
        assert_eq!(singles[0].border_color, "#2ecc71");
    }

    #[test]
    fn test_failed_logo_falls_back_to_glyph() {
        let view = vp(14.0);
        let data = layer(
            vec![group(
                "casto",
                "#0078d4",
                Some("https://cdn.example.com/c.png"),
                vec![store(48.8566, 2.3522, None)],
            )],
            &view,
        );
        let mut failed = HashSet::new();
        failed.insert("casto".to_string());
        let (_, singles) = competitor_views(&data, &view, &failed);
        assert_eq!(
            singles[0].body,
            MarkerBody::Glyph {
                letter: 'c',
                bg: "#0078d4".into()
            }
        );
        // no rating -> brand-color border
        assert_eq!(singles[0].border_color, "#0078d4");
    }

    #[test]
    fn test_low_zoom_produces_cluster_views() {
        let view = vp(6.0);
        let stores: Vec<Store> = (0..40)
            .map(|i| store(48.85 + 0.001 * i as f64, 2.35, None))
            .collect();
        let data = layer(vec![group("casto", "#0078d4", None, stores)], &view);
        let (clusters, singles) = competitor_views(&data, &view, &HashSet::new());
        assert_eq!(clusters.len(), 1);
        assert!(singles.is_empty());
        // 40 children -> 36 px blue tier
        assert_eq!(clusters[0].size, 36);
        assert_eq!(clusters[0].count, 40);
    }

    #[test]
    fn test_cluster_hit_inside_icon_radius() {
        let view = vp(6.0);
        let nodes = vec![ClusterNode::Cluster {
            lat: 48.8566,
            lng: 2.3522,
            count: 50,
        }];
        // Cluster at viewport center (400, 300); 36 px icon -> 18 px radius
        assert!(cluster_hit(&nodes, &view, 405.0, 305.0).is_some());
        assert!(cluster_hit(&nodes, &view, 430.0, 300.0).is_none());
    }

    #[test]
    fn test_dot_views_cull_offscreen_points() {
        let view = vp(12.0);
        let stations = vec![
            IrveStation {
                id: "a".into(),
                name: "In view".into(),
                lat: 48.8566,
                lng: 2.3522,
                power_kw: Some(22.0),
                operator: None,
            },
            IrveStation {
                id: "b".into(),
                name: "Marseille".into(),
                lat: 43.2965,
                lng: 5.3698,
                power_kw: None,
                operator: None,
            },
        ];
        let dots = irve_views(&stations, &view, "#27ae60");
        assert_eq!(dots.len(), 1);
        assert_eq!(dots[0].title, "In view (22 kW)");
    }

    #[test]
    fn test_marker_style_centers_on_position() {
        let m = StoreMarkerView {
            cx: 100.0,
            cy: 60.0,
            size: 40,
            border_px: 4,
            border_color: "#2ecc71".into(),
            body: MarkerBody::Glyph {
                letter: 'C',
                bg: "#000".into(),
            },
            title: String::new(),
            group_id: "g".into(),
        };
        let style = m.style();
        assert!(style.contains("left:80.0px"));
        assert!(style.contains("top:40.0px"));
        assert!(style.contains("border:4px solid #2ecc71"));
    }
}
