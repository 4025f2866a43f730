//! Map session and layer lifecycle.
//!
//! `MapSession` owns the viewport, the typed map from layer id to live
//! render handle, and a per-layer generation counter used to drop stale
//! fetch responses. `LayerRegistry` is the single source of truth for layer
//! visibility state and drives the enable/disable state machine.

use std::collections::HashMap;

use retailscope_shared::geo::{Viewport, FRANCE_CENTER, FRANCE_DEFAULT_ZOOM};
use retailscope_shared::models::{BoundaryCollection, IrveStation, IrveStats, Poi, Store};

use crate::catchment::CatchmentLayerData;
use crate::cluster::CompetitorLayerData;
use crate::iris::IrisLayerData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerId {
    OwnStores,
    Competitors,
    Catchment,
    Irve,
    Poi,
    Boundaries,
    Iris,
}

impl LayerId {
    pub const ALL: [LayerId; 7] = [
        LayerId::OwnStores,
        LayerId::Competitors,
        LayerId::Catchment,
        LayerId::Irve,
        LayerId::Poi,
        LayerId::Boundaries,
        LayerId::Iris,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LayerId::OwnStores => "own-stores",
            LayerId::Competitors => "competitors",
            LayerId::Catchment => "catchment",
            LayerId::Irve => "irve",
            LayerId::Poi => "poi",
            LayerId::Boundaries => "boundaries",
            LayerId::Iris => "iris",
        }
    }
}

/// One registry entry: static catalog fields plus the live toggle state.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerMeta {
    pub id: LayerId,
    pub label: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
    pub description: &'static str,
    pub enabled: bool,
    pub loading: bool,
}

/// Canonical togglable-layer list and its enable/disable state machine:
/// `disabled -> loading -> enabled -> disabled`.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerRegistry {
    layers: Vec<LayerMeta>,
}

impl Default for LayerRegistry {
    fn default() -> Self {
        Self::catalog()
    }
}

impl LayerRegistry {
    pub fn catalog() -> Self {
        let entry = |id, label, icon, color, description| LayerMeta {
            id,
            label,
            icon,
            color,
            description,
            enabled: false,
            loading: false,
        };
        Self {
            layers: vec![
                entry(
                    LayerId::OwnStores,
                    "Notre réseau",
                    "🏠",
                    "#1a6ee0",
                    "Implantations de l'enseigne",
                ),
                entry(
                    LayerId::Competitors,
                    "Concurrents",
                    "🏪",
                    "#c0392b",
                    "Magasins concurrents, regroupés par enseigne",
                ),
                entry(
                    LayerId::Catchment,
                    "Zones de chalandise",
                    "⭕",
                    "#8e44ad",
                    "Rayons de chalandise et recouvrements de population",
                ),
                entry(
                    LayerId::Irve,
                    "Bornes de recharge",
                    "🔌",
                    "#27ae60",
                    "Stations IRVE autour du centre de la carte",
                ),
                entry(
                    LayerId::Poi,
                    "Points d'intérêt",
                    "📍",
                    "#d35400",
                    "Commerces et services de proximité",
                ),
                entry(
                    LayerId::Boundaries,
                    "Limites administratives",
                    "🗺",
                    "#7f8c8d",
                    "Contours régions / départements / communes / académies",
                ),
                entry(
                    LayerId::Iris,
                    "Zones IRIS",
                    "🧩",
                    "#2c3e50",
                    "Micro-zones censitaires sélectionnables (zoom 10+)",
                ),
            ],
        }
    }

    pub fn layers(&self) -> &[LayerMeta] {
        &self.layers
    }

    pub fn get(&self, id: LayerId) -> &LayerMeta {
        self.layers
            .iter()
            .find(|l| l.id == id)
            .expect("catalog covers every LayerId")
    }

    fn get_mut(&mut self, id: LayerId) -> &mut LayerMeta {
        self.layers
            .iter_mut()
            .find(|l| l.id == id)
            .expect("catalog covers every LayerId")
    }

    pub fn is_enabled(&self, id: LayerId) -> bool {
        self.get(id).enabled
    }

    pub fn is_loading(&self, id: LayerId) -> bool {
        self.get(id).loading
    }

    /// `disabled -> loading`.
    pub fn begin_load(&mut self, id: LayerId) {
        let layer = self.get_mut(id);
        layer.loading = true;
    }

    /// `loading -> enabled` on success, `loading -> disabled` on failure.
    pub fn finish_load(&mut self, id: LayerId, ok: bool) {
        let layer = self.get_mut(id);
        layer.loading = false;
        layer.enabled = ok;
    }

    /// `enabled -> disabled`.
    pub fn disable(&mut self, id: LayerId) {
        let layer = self.get_mut(id);
        layer.enabled = false;
        layer.loading = false;
    }
}

/// Data owned by a live layer. Exactly one handle per enabled layer;
/// dropping the handle releases everything the layer rendered.
#[derive(Debug, Clone)]
pub enum LayerHandle {
    OwnStores(Vec<Store>),
    Competitors(CompetitorLayerData),
    Catchment(CatchmentLayerData),
    Irve {
        stations: Vec<IrveStation>,
        stats: Option<IrveStats>,
    },
    Poi(Vec<Poi>),
    Boundaries(BoundaryCollection),
    Iris(IrisLayerData),
}

/// Owns the map surface state for the lifetime of the dashboard page.
#[derive(Debug, Clone)]
pub struct MapSession {
    /// Set once the container element has been measured; loaders must not
    /// run before this.
    pub ready: bool,
    pub viewport: Viewport,
    handles: HashMap<LayerId, LayerHandle>,
    generations: HashMap<LayerId, u64>,
}

impl Default for MapSession {
    fn default() -> Self {
        Self::new()
    }
}

impl MapSession {
    pub fn new() -> Self {
        Self {
            ready: false,
            viewport: Viewport::new(FRANCE_CENTER, FRANCE_DEFAULT_ZOOM, 0.0, 0.0),
            handles: HashMap::new(),
            generations: HashMap::new(),
        }
    }

    /// Record the measured surface size and mark the session ready.
    /// Idempotent: a second call only refreshes the size.
    pub fn init(&mut self, width: f64, height: f64) {
        self.viewport.width = width;
        self.viewport.height = height;
        self.ready = true;
    }

    /// Remove every handle and reset readiness. Idempotent.
    pub fn teardown(&mut self) {
        self.handles.clear();
        self.ready = false;
    }

    /// Bump and return the layer's generation. Every fetch captures the
    /// value; a response resolving under an older generation is stale.
    pub fn begin_load(&mut self, id: LayerId) -> u64 {
        let counter = self.generations.entry(id).or_insert(0);
        *counter += 1;
        *counter
    }

    pub fn is_current(&self, id: LayerId, generation: u64) -> bool {
        self.generations.get(&id).copied() == Some(generation)
    }

    /// Attach a render handle. Returns the handle it replaced, which callers
    /// treat as a bug upstream (detach must come first) but which keeps the
    /// one-handle-per-id invariant regardless.
    pub fn attach(&mut self, id: LayerId, handle: LayerHandle) -> Option<LayerHandle> {
        self.handles.insert(id, handle)
    }

    pub fn detach(&mut self, id: LayerId) -> Option<LayerHandle> {
        self.handles.remove(&id)
    }

    pub fn handle(&self, id: LayerId) -> Option<&LayerHandle> {
        self.handles.get(&id)
    }

    pub fn handle_mut(&mut self, id: LayerId) -> Option<&mut LayerHandle> {
        self.handles.get_mut(&id)
    }

    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_covers_all_ids_disabled() {
        let reg = LayerRegistry::catalog();
        assert_eq!(reg.layers().len(), LayerId::ALL.len());
        for id in LayerId::ALL {
            assert!(!reg.is_enabled(id));
            assert!(!reg.is_loading(id));
        }
    }

    #[test]
    fn test_toggle_state_machine_success_path() {
        let mut reg = LayerRegistry::catalog();
        reg.begin_load(LayerId::Irve);
        assert!(reg.is_loading(LayerId::Irve));
        assert!(!reg.is_enabled(LayerId::Irve));

        reg.finish_load(LayerId::Irve, true);
        assert!(reg.is_enabled(LayerId::Irve));
        assert!(!reg.is_loading(LayerId::Irve));

        reg.disable(LayerId::Irve);
        assert!(!reg.is_enabled(LayerId::Irve));
    }

    #[test]
    fn test_toggle_state_machine_failure_reverts() {
        let mut reg = LayerRegistry::catalog();
        reg.begin_load(LayerId::Competitors);
        reg.finish_load(LayerId::Competitors, false);
        assert!(!reg.is_enabled(LayerId::Competitors));
        assert!(!reg.is_loading(LayerId::Competitors));
    }

    #[test]
    fn test_session_init_idempotent() {
        let mut s = MapSession::new();
        assert!(!s.ready);
        s.init(800.0, 600.0);
        assert!(s.ready);
        s.attach(LayerId::Poi, LayerHandle::Poi(vec![]));
        // Second init must not drop handles
        s.init(1024.0, 768.0);
        assert_eq!(s.handle_count(), 1);
        assert!((s.viewport.width - 1024.0).abs() < 1e-9);
    }

    #[test]
    fn test_teardown_clears_everything() {
        let mut s = MapSession::new();
        s.init(800.0, 600.0);
        s.attach(LayerId::Poi, LayerHandle::Poi(vec![]));
        s.teardown();
        assert!(!s.ready);
        assert_eq!(s.handle_count(), 0);
        // Idempotent
        s.teardown();
        assert_eq!(s.handle_count(), 0);
    }

    #[test]
    fn test_attach_detach_single_handle_invariant() {
        let mut s = MapSession::new();
        s.init(800.0, 600.0);

        // off -> on -> off -> on: exactly one handle at the end
        assert!(s.attach(LayerId::Irve, LayerHandle::Irve { stations: vec![], stats: None }).is_none());
        assert!(s.detach(LayerId::Irve).is_some());
        assert!(s.attach(LayerId::Irve, LayerHandle::Irve { stations: vec![], stats: None }).is_none());
        assert_eq!(s.handle_count(), 1);

        // attach over a live handle still leaves exactly one
        let replaced = s.attach(LayerId::Irve, LayerHandle::Irve { stations: vec![], stats: None });
        assert!(replaced.is_some());
        assert_eq!(s.handle_count(), 1);
    }

    #[test]
    fn test_generation_guard_discards_stale_response() {
        let mut s = MapSession::new();
        let g1 = s.begin_load(LayerId::Competitors);
        // User toggles off and on again before the first fetch resolves
        let g2 = s.begin_load(LayerId::Competitors);
        assert!(g2 > g1);
        assert!(!s.is_current(LayerId::Competitors, g1));
        assert!(s.is_current(LayerId::Competitors, g2));
    }

    #[test]
    fn test_generations_independent_per_layer() {
        let mut s = MapSession::new();
        let g_comp = s.begin_load(LayerId::Competitors);
        let _ = s.begin_load(LayerId::Iris);
        assert!(s.is_current(LayerId::Competitors, g_comp));
    }
}
