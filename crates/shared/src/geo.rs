/// Web Mercator map geometry.
///
/// The map surface is a standard slippy-tile plane: at zoom `z` the world is
/// `256 * 2^z` pixels square. All screen math here is pure and runs in native
/// unit tests; the frontend only adds DOM glue on top.
use serde::{Deserialize, Serialize};

/// Tile edge length in pixels.
pub const TILE_SIZE: f64 = 256.0;

pub const MIN_ZOOM: f64 = 4.0;
pub const MAX_ZOOM: f64 = 18.0;

/// Web Mercator latitude limit.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Equator circumference in meters (WGS84).
pub const EQUATOR_M: f64 = 40_075_016.686;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Approximate degrees of latitude per kilometer.
pub const DEG_PER_KM: f64 = 1.0 / 111.0;

/// Metropolitan France, roughly centered.
pub const FRANCE_CENTER: LatLng = LatLng {
    lat: 46.6,
    lng: 2.4,
};
pub const FRANCE_DEFAULT_ZOOM: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Geographic bounding box. `south <= north`, `west <= east`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BBox {
    pub fn contains(&self, p: LatLng) -> bool {
        p.lat >= self.south && p.lat <= self.north && p.lng >= self.west && p.lng <= self.east
    }

    /// Grow the box by `deg` degrees on every side.
    pub fn padded(&self, deg: f64) -> BBox {
        BBox {
            south: self.south - deg,
            west: self.west - deg,
            north: self.north + deg,
            east: self.east + deg,
        }
    }
}

/// World size in pixels at the given zoom.
pub fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * 2.0_f64.powf(zoom)
}

/// Project a geographic point to world pixel coordinates at `zoom`.
pub fn project(p: LatLng, zoom: f64) -> (f64, f64) {
    let size = world_size(zoom);
    let lat = p.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = (p.lng + 180.0) / 360.0 * size;
    let lat_rad = lat.to_radians();
    let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0 * size;
    (x, y)
}

/// Inverse of [`project`].
pub fn unproject(x: f64, y: f64, zoom: f64) -> LatLng {
    let size = world_size(zoom);
    let lng = x / size * 360.0 - 180.0;
    let n = std::f64::consts::PI * (1.0 - 2.0 * y / size);
    let lat = n.sinh().atan().to_degrees();
    LatLng { lat, lng }
}

/// Ground resolution in meters per screen pixel at a latitude and zoom.
pub fn meters_per_pixel(lat: f64, zoom: f64) -> f64 {
    EQUATOR_M * lat.to_radians().cos() / world_size(zoom)
}

/// Great-circle distance in kilometers.
pub fn haversine_km(a: LatLng, b: LatLng) -> f64 {
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();
    let h = (dlat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Arithmetic mean of ring vertices. Ring coordinates are GeoJSON order
/// (`[lng, lat]`). Returns `None` for an empty ring.
pub fn ring_centroid(ring: &[[f64; 2]]) -> Option<LatLng> {
    if ring.is_empty() {
        return None;
    }
    let n = ring.len() as f64;
    let (sum_lng, sum_lat) = ring
        .iter()
        .fold((0.0, 0.0), |(sx, sy), c| (sx + c[0], sy + c[1]));
    Some(LatLng {
        lat: sum_lat / n,
        lng: sum_lng / n,
    })
}

/// Even-odd ray cast against a single ring (GeoJSON `[lng, lat]` order).
pub fn point_in_ring(p: LatLng, ring: &[[f64; 2]]) -> bool {
    let mut inside = false;
    let mut j = match ring.len() {
        0 => return false,
        n => n - 1,
    };
    for i in 0..ring.len() {
        let (xi, yi) = (ring[i][0], ring[i][1]);
        let (xj, yj) = (ring[j][0], ring[j][1]);
        let crosses = (yi > p.lat) != (yj > p.lat)
            && p.lng < (xj - xi) * (p.lat - yi) / (yj - yi) + xi;
        if crosses {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Target zoom when focusing a zone of `radius_km`: larger radius, further
/// out, floored at 10.
pub fn zoom_for_radius(radius_km: f64) -> f64 {
    (14.0 - radius_km.log2()).round().max(10.0).min(MAX_ZOOM)
}

// ---------------------------------------------------------------------------
// Viewport
// ---------------------------------------------------------------------------

/// The visible window onto the map: geographic center, zoom, and container
/// size in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: LatLng,
    pub zoom: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(center: LatLng, zoom: f64, width: f64, height: f64) -> Self {
        Self {
            center,
            zoom,
            width,
            height,
        }
    }

    pub fn bounds(&self) -> BBox {
        let (cx, cy) = project(self.center, self.zoom);
        let nw = unproject(cx - self.width / 2.0, cy - self.height / 2.0, self.zoom);
        let se = unproject(cx + self.width / 2.0, cy + self.height / 2.0, self.zoom);
        BBox {
            south: se.lat,
            west: nw.lng,
            north: nw.lat,
            east: se.lng,
        }
    }

    /// Container-relative pixel position of a geographic point. May fall
    /// outside `[0, width] x [0, height]` for off-screen points.
    pub fn to_container_px(&self, p: LatLng) -> (f64, f64) {
        let (cx, cy) = project(self.center, self.zoom);
        let (px, py) = project(p, self.zoom);
        (px - cx + self.width / 2.0, py - cy + self.height / 2.0)
    }

    /// Geographic point under a container-relative pixel position.
    pub fn container_px_to_latlng(&self, x: f64, y: f64) -> LatLng {
        let (cx, cy) = project(self.center, self.zoom);
        unproject(cx + x - self.width / 2.0, cy + y - self.height / 2.0, self.zoom)
    }

    /// Shift the view by a screen-pixel delta (drag): dragging the surface
    /// right moves the center west.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        let (cx, cy) = project(self.center, self.zoom);
        self.center = unproject(cx - dx, cy - dy, self.zoom);
    }

    /// Change zoom while keeping the geographic point under the cursor
    /// (container coordinates) fixed on screen.
    pub fn zoom_about(&mut self, new_zoom: f64, cursor_x: f64, cursor_y: f64) {
        let new_zoom = new_zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        if (new_zoom - self.zoom).abs() < 1e-9 {
            return;
        }
        let anchor = self.container_px_to_latlng(cursor_x, cursor_y);
        let (ax, ay) = project(anchor, new_zoom);
        let cx = ax - (cursor_x - self.width / 2.0);
        let cy = ay - (cursor_y - self.height / 2.0);
        self.center = unproject(cx, cy, new_zoom);
        self.zoom = new_zoom;
    }
}

// ---------------------------------------------------------------------------
// Base tile layer
// ---------------------------------------------------------------------------

/// One base-layer tile with its on-screen placement.
#[derive(Debug, Clone, PartialEq)]
pub struct TilePlacement {
    pub z: u8,
    pub x: u32,
    pub y: u32,
    /// Container-relative position of the tile's top-left corner.
    pub left: f64,
    pub top: f64,
}

/// Enumerate the tiles covering the viewport, clamped to the world edges.
pub fn visible_tiles(vp: &Viewport) -> Vec<TilePlacement> {
    let z = vp.zoom.round() as u8;
    let max_index = (1u32 << z) - 1;
    let (cx, cy) = project(vp.center, vp.zoom);
    let left_px = cx - vp.width / 2.0;
    let top_px = cy - vp.height / 2.0;

    let tx0 = (left_px / TILE_SIZE).floor().max(0.0) as u32;
    let ty0 = (top_px / TILE_SIZE).floor().max(0.0) as u32;
    let tx1 = (((left_px + vp.width) / TILE_SIZE).floor() as i64).clamp(0, max_index as i64) as u32;
    let ty1 = (((top_px + vp.height) / TILE_SIZE).floor() as i64).clamp(0, max_index as i64) as u32;

    let mut tiles = Vec::new();
    for tx in tx0..=tx1 {
        for ty in ty0..=ty1 {
            tiles.push(TilePlacement {
                z,
                x: tx,
                y: ty,
                left: tx as f64 * TILE_SIZE - left_px,
                top: ty as f64 * TILE_SIZE - top_px,
            });
        }
    }
    tiles
}

const TILE_SUBDOMAINS: [char; 3] = ['a', 'b', 'c'];

/// OSM-style tile URL with subdomain rotation.
pub fn tile_url(z: u8, x: u32, y: u32) -> String {
    let s = TILE_SUBDOMAINS[((x + y) % 3) as usize];
    format!("https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png")
}
