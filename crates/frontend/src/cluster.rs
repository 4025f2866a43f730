//! Competitor-store rendering engine: a grid spatial index over the full
//! dataset, an incremental visible-set diff per viewport change, and
//! zoom-dependent clustering of what remains on screen.

use std::collections::{BTreeSet, HashMap};

use uuid::Uuid;

use retailscope_shared::geo::{BBox, LatLng, Viewport};
use retailscope_shared::models::CompetitorGroup;

/// Clustering switches off entirely at this zoom; markers render one by one.
pub const CLUSTERING_MAX_ZOOM: f64 = 13.0;

/// Flattened store point; `group_idx`/`store_idx` index back into the
/// owning competitor group and its store list.
#[derive(Debug, Clone, PartialEq)]
pub struct StorePoint {
    pub id: Uuid,
    pub group_idx: usize,
    pub store_idx: usize,
    pub lat: f64,
    pub lng: f64,
    pub rating: Option<f64>,
}

pub fn flatten_groups(groups: &[CompetitorGroup]) -> Vec<StorePoint> {
    groups
        .iter()
        .enumerate()
        .flat_map(|(group_idx, g)| {
            g.stores.iter().enumerate().map(move |(store_idx, s)| StorePoint {
                id: s.id,
                group_idx,
                store_idx,
                lat: s.lat,
                lng: s.lng,
                rating: s.rating,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Grid spatial index
// ---------------------------------------------------------------------------

/// Fixed-cell grid over geographic coordinates. Built once per dataset;
/// queried with the viewport bbox on every move.
#[derive(Debug, Clone, Default)]
pub struct GridIndex {
    cell_deg: f64,
    cells: HashMap<(i64, i64), Vec<usize>>,
}

impl GridIndex {
    pub const DEFAULT_CELL_DEG: f64 = 0.25;

    pub fn build(points: &[StorePoint], cell_deg: f64) -> Self {
        let mut cells: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        for (i, p) in points.iter().enumerate() {
            cells
                .entry(Self::cell_of(p.lat, p.lng, cell_deg))
                .or_default()
                .push(i);
        }
        Self { cell_deg, cells }
    }

    fn cell_of(lat: f64, lng: f64, cell_deg: f64) -> (i64, i64) {
        ((lat / cell_deg).floor() as i64, (lng / cell_deg).floor() as i64)
    }

    /// Candidate point indices for a bbox. Cells overlapping the box are
    /// scanned whole, so callers still filter by exact containment.
    pub fn query(&self, bbox: &BBox) -> Vec<usize> {
        let (r0, c0) = Self::cell_of(bbox.south, bbox.west, self.cell_deg);
        let (r1, c1) = Self::cell_of(bbox.north, bbox.east, self.cell_deg);
        let mut out = Vec::new();
        for r in r0..=r1 {
            for c in c0..=c1 {
                if let Some(ids) = self.cells.get(&(r, c)) {
                    out.extend_from_slice(ids);
                }
            }
        }
        out.sort_unstable();
        out
    }
}

// ---------------------------------------------------------------------------
// Visible-set diffing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct VisibleSet {
    current: BTreeSet<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisibleDiff {
    pub added: Vec<usize>,
    pub removed: Vec<usize>,
}

impl VisibleSet {
    /// Replace the visible set, returning only what changed since the last
    /// viewport. Pan frames touching no cell boundary produce an empty diff.
    pub fn update(&mut self, visible: impl IntoIterator<Item = usize>) -> VisibleDiff {
        let next: BTreeSet<usize> = visible.into_iter().collect();
        let added = next.difference(&self.current).copied().collect();
        let removed = self.current.difference(&next).copied().collect();
        self.current = next;
        VisibleDiff { added, removed }
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.current.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}

/// Everything the competitor layer owns while enabled.
#[derive(Debug, Clone, Default)]
pub struct CompetitorLayerData {
    pub groups: Vec<CompetitorGroup>,
    pub points: Vec<StorePoint>,
    pub index: GridIndex,
    pub visible: VisibleSet,
}

impl CompetitorLayerData {
    pub fn new(groups: Vec<CompetitorGroup>) -> Self {
        let points = flatten_groups(&groups);
        let index = GridIndex::build(&points, GridIndex::DEFAULT_CELL_DEG);
        Self {
            groups,
            points,
            index,
            visible: VisibleSet::default(),
        }
    }

    /// Recompute the visible set for a viewport bbox; returns the diff.
    pub fn refresh_visible(&mut self, bbox: &BBox) -> VisibleDiff {
        let candidates = self.index.query(bbox);
        let points = &self.points;
        let exact = candidates
            .into_iter()
            .filter(|&i| bbox.contains(LatLng::new(points[i].lat, points[i].lng)));
        self.visible.update(exact)
    }

    pub fn any_rating(&self) -> bool {
        self.points.iter().any(|p| p.rating.is_some())
    }
}

// ---------------------------------------------------------------------------
// Clustering
// ---------------------------------------------------------------------------

/// Cluster radius in screen pixels for a zoom level; `None` disables
/// clustering (zoom >= 13).
pub fn cluster_radius_px(zoom: f64) -> Option<f64> {
    if zoom >= CLUSTERING_MAX_ZOOM {
        None
    } else if zoom >= 10.0 {
        Some(30.0)
    } else if zoom >= 8.0 {
        Some(50.0)
    } else {
        Some(80.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClusterNode {
    /// Aggregated icon at the mean position of its children.
    Cluster { lat: f64, lng: f64, count: usize },
    /// Individually rendered store, index into the layer's point list.
    Single { point_idx: usize },
}

/// Group the visible points into clusters by screen-space grid cell.
pub fn build_clusters(
    points: &[StorePoint],
    visible: impl Iterator<Item = usize>,
    vp: &Viewport,
) -> Vec<ClusterNode> {
    let Some(radius) = cluster_radius_px(vp.zoom) else {
        return visible.map(|point_idx| ClusterNode::Single { point_idx }).collect();
    };

    let mut buckets: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    for i in visible {
        let p = &points[i];
        let (sx, sy) = vp.to_container_px(LatLng::new(p.lat, p.lng));
        let key = ((sx / radius).floor() as i64, (sy / radius).floor() as i64);
        buckets.entry(key).or_default().push(i);
    }

    let mut keys: Vec<(i64, i64)> = buckets.keys().copied().collect();
    keys.sort_unstable();

    let mut nodes = Vec::with_capacity(keys.len());
    for key in keys {
        let members = &buckets[&key];
        if members.len() == 1 {
            nodes.push(ClusterNode::Single {
                point_idx: members[0],
            });
        } else {
            let n = members.len() as f64;
            let (lat, lng) = members.iter().fold((0.0, 0.0), |(la, lo), &i| {
                (la + points[i].lat, lo + points[i].lng)
            });
            nodes.push(ClusterNode::Cluster {
                lat: lat / n,
                lng: lng / n,
                count: members.len(),
            });
        }
    }
    nodes
}

// ---------------------------------------------------------------------------
// Icon styling rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterStyle {
    pub size_px: u32,
    pub color: &'static str,
}

/// Cluster icon tier by child count.
pub fn cluster_tier(count: usize) -> ClusterStyle {
    if count > 100 {
        ClusterStyle {
            size_px: 44,
            color: "#8e44ad",
        }
    } else if count > 30 {
        ClusterStyle {
            size_px: 36,
            color: "#2980b9",
        }
    } else {
        ClusterStyle {
            size_px: 28,
            color: "#00bcd4",
        }
    }
}

/// Individual marker diameter by zoom.
pub fn marker_size_px(zoom: f64) -> u32 {
    if zoom >= 12.0 {
        48
    } else if zoom >= 10.0 {
        40
    } else if zoom >= 8.0 {
        32
    } else {
        24
    }
}

pub fn marker_border_px(zoom: f64) -> u32 {
    if zoom >= 10.0 {
        4
    } else {
        3
    }
}

/// Marker border color encodes the store rating; no rating falls back to
/// the competitor's brand color.
pub fn rating_border_color(rating: Option<f64>, brand_color: &str) -> String {
    match rating {
        Some(r) if r >= 4.0 => "#2ecc71".to_string(),
        Some(r) if r >= 3.5 => "#f1c40f".to_string(),
        Some(r) if r >= 3.0 => "#e67e22".to_string(),
        Some(_) => "#e74c3c".to_string(),
        None => brand_color.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retailscope_shared::geo::LatLng;

    fn point(id_byte: u8, group_idx: usize, lat: f64, lng: f64, rating: Option<f64>) -> StorePoint {
        let mut bytes = [0u8; 16];
        bytes[15] = id_byte;
        StorePoint {
            id: Uuid::from_bytes(bytes),
            group_idx,
            store_idx: 0,
            lat,
            lng,
            rating,
        }
    }

    fn paris_viewport(zoom: f64) -> Viewport {
        Viewport::new(LatLng::new(48.8566, 2.3522), zoom, 800.0, 600.0)
    }

    // --- grid index ---

    #[test]
    fn test_grid_index_query_filters_far_points() {
        let points = vec![
            point(1, 0, 48.85, 2.35, None),
            point(2, 0, 48.86, 2.36, None),
            point(3, 0, 43.29, 5.37, None), // Marseille
        ];
        let index = GridIndex::build(&points, GridIndex::DEFAULT_CELL_DEG);
        let bbox = BBox {
            south: 48.7,
            west: 2.2,
            north: 49.0,
            east: 2.5,
        };
        let hits = index.query(&bbox);
        assert!(hits.contains(&0));
        assert!(hits.contains(&1));
        assert!(!hits.contains(&2));
    }

    // --- visible-set diff ---

    #[test]
    fn test_visible_set_diff_adds_and_removes() {
        let mut set = VisibleSet::default();
        let d1 = set.update([0, 1, 2]);
        assert_eq!(d1.added, vec![0, 1, 2]);
        assert!(d1.removed.is_empty());

        let d2 = set.update([1, 2, 3]);
        assert_eq!(d2.added, vec![3]);
        assert_eq!(d2.removed, vec![0]);
    }

    #[test]
    fn test_visible_set_unchanged_viewport_is_empty_diff() {
        let mut set = VisibleSet::default();
        set.update([4, 5]);
        let d = set.update([4, 5]);
        assert!(d.added.is_empty());
        assert!(d.removed.is_empty());
        assert_eq!(set.len(), 2);
    }

    // --- cluster radius by zoom ---

    #[test]
    fn test_cluster_radius_tiers() {
        assert_eq!(cluster_radius_px(13.0), None);
        assert_eq!(cluster_radius_px(14.5), None);
        assert_eq!(cluster_radius_px(10.0), Some(30.0));
        assert_eq!(cluster_radius_px(12.9), Some(30.0));
        assert_eq!(cluster_radius_px(8.0), Some(50.0));
        assert_eq!(cluster_radius_px(9.9), Some(50.0));
        assert_eq!(cluster_radius_px(7.9), Some(80.0));
        assert_eq!(cluster_radius_px(5.0), Some(80.0));
    }

    // --- clustering ---

    #[test]
    fn test_build_clusters_merges_nearby_points_at_low_zoom() {
        // Two stores ~1 km apart collapse into one cluster at country zoom
        let points = vec![
            point(1, 0, 48.8566, 2.3522, None),
            point(2, 0, 48.8610, 2.3522, None),
        ];
        let vp = paris_viewport(6.0);
        let nodes = build_clusters(&points, [0usize, 1].into_iter(), &vp);
        assert_eq!(nodes.len(), 1);
        match &nodes[0] {
            ClusterNode::Cluster { count, lat, .. } => {
                assert_eq!(*count, 2);
                assert!((lat - 48.8588).abs() < 1e-3);
            }
            other => panic!("expected cluster, got {other:?}"),
        }
    }

    #[test]
    fn test_build_clusters_disabled_at_high_zoom() {
        let points = vec![
            point(1, 0, 48.8566, 2.3522, None),
            point(2, 0, 48.8567, 2.3523, None),
        ];
        let vp = paris_viewport(13.0);
        let nodes = build_clusters(&points, [0usize, 1].into_iter(), &vp);
        assert_eq!(
            nodes,
            vec![
                ClusterNode::Single { point_idx: 0 },
                ClusterNode::Single { point_idx: 1 }
            ]
        );
    }

    #[test]
    fn test_build_clusters_keeps_distant_points_single() {
        // Paris and Marseille never share a 80 px bucket at zoom 6
        let points = vec![
            point(1, 0, 48.8566, 2.3522, None),
            point(2, 0, 43.2965, 5.3698, None),
        ];
        let vp = Viewport::new(LatLng::new(46.0, 4.0), 6.0, 800.0, 600.0);
        let nodes = build_clusters(&points, [0usize, 1].into_iter(), &vp);
        let singles = nodes
            .iter()
            .filter(|n| matches!(n, ClusterNode::Single { .. }))
            .count();
        assert_eq!(singles, 2);
    }

    // --- layer data plumbing ---

    #[test]
    fn test_refresh_visible_uses_exact_containment() {
        let group = CompetitorGroup {
            id: "g".into(),
            name: "G".into(),
            color: "#000".into(),
            logo_url: None,
            avg_rating: None,
            total_reviews: 0,
            stores: vec![],
        };
        let mut data = CompetitorLayerData::new(vec![group]);
        data.points = vec![
            point(1, 0, 48.85, 2.35, None),
            point(2, 0, 48.99, 2.35, None), // same grid cell band, outside bbox
        ];
        data.index = GridIndex::build(&data.points, GridIndex::DEFAULT_CELL_DEG);
        let bbox = BBox {
            south: 48.80,
            west: 2.30,
            north: 48.90,
            east: 2.40,
        };
        let diff = data.refresh_visible(&bbox);
        assert_eq!(diff.added, vec![0]);
        assert_eq!(data.visible.len(), 1);
    }

    #[test]
    fn test_any_rating() {
        let mut data = CompetitorLayerData::default();
        data.points = vec![point(1, 0, 48.0, 2.0, None)];
        assert!(!data.any_rating());
        data.points.push(point(2, 0, 48.0, 2.0, Some(4.1)));
        assert!(data.any_rating());
    }

    // --- icon styling ---

    #[test]
    fn test_cluster_tiering() {
        assert_eq!(
            cluster_tier(150),
            ClusterStyle {
                size_px: 44,
                color: "#8e44ad"
            }
        );
        assert_eq!(
            cluster_tier(50),
            ClusterStyle {
                size_px: 36,
                color: "#2980b9"
            }
        );
        assert_eq!(
            cluster_tier(10),
            ClusterStyle {
                size_px: 28,
                color: "#00bcd4"
            }
        );
        // boundary values
        assert_eq!(cluster_tier(101).size_px, 44);
        assert_eq!(cluster_tier(100).size_px, 36);
        assert_eq!(cluster_tier(31).size_px, 36);
        assert_eq!(cluster_tier(30).size_px, 28);
    }

    #[test]
    fn test_marker_size_by_zoom() {
        assert_eq!(marker_size_px(12.0), 48);
        assert_eq!(marker_size_px(10.0), 40);
        assert_eq!(marker_size_px(8.0), 32);
        assert_eq!(marker_size_px(6.0), 24);
    }

    #[test]
    fn test_marker_border_by_zoom() {
        assert_eq!(marker_border_px(10.0), 4);
        assert_eq!(marker_border_px(9.9), 3);
    }

    #[test]
    fn test_rating_border_colors() {
        assert_eq!(rating_border_color(Some(4.2), "#123456"), "#2ecc71");
        assert_eq!(rating_border_color(Some(4.0), "#123456"), "#2ecc71");
        assert_eq!(rating_border_color(Some(3.6), "#123456"), "#f1c40f");
        assert_eq!(rating_border_color(Some(3.1), "#123456"), "#e67e22");
        assert_eq!(rating_border_color(Some(2.0), "#123456"), "#e74c3c");
        assert_eq!(rating_border_color(None, "#123456"), "#123456");
    }
}
