use std::collections::HashSet;

use dioxus::logger::tracing::{debug, warn};
use dioxus::prelude::*;

use retailscope_shared::geo::{LatLng, Viewport};
use retailscope_shared::models::{BoundaryLevel, ZoneAnalysis};

use crate::api::{ApiClient, ApiError};
use crate::auth::AuthContext;
use crate::catchment::{CatchmentLayerData, DEFAULT_CATCHMENT_RADIUS_KM};
use crate::cluster::CompetitorLayerData;
use crate::components::layer_panel::LayerPanel;
use crate::components::map_view::MapView;
use crate::components::zone_panel::ZonePanel;
use crate::geocode;
use crate::iris::{iris_zoom_visible, IrisLayerData};
use crate::session::{LayerHandle, LayerId, LayerRegistry, MapSession};
use crate::zone::{self, PanelTab, ZoneMode, ZoneQuery, DEFAULT_ZONE_RADIUS_KM};

/// Charging stations are fetched around the map center with this scope.
const IRVE_FETCH_RADIUS_KM: f64 = 25.0;
const IRVE_FETCH_LIMIT: u32 = 500;

const POI_FETCH_RADIUS_M: f64 = 1500.0;
const POI_CATEGORIES: [&str; 4] = ["restaurant", "parking", "transport", "education"];

/// Server-side batch cap passed to the enrichment endpoints.
const ENRICH_MAX_PER_RUN: u32 = 50;

const STATUS_MESSAGE_MS: u32 = 4000;

// ---------------------------------------------------------------------------
// Layer loaders
// ---------------------------------------------------------------------------

/// One fetch per layer kind, scoped to the current viewport and tenant.
/// The caller owns the generation check; this function only produces the
/// handle.
async fn load_layer(
    api: &ApiClient,
    id: LayerId,
    vp: Viewport,
    catchment_radius_km: u32,
    level: BoundaryLevel,
    session: Signal<MapSession>,
) -> Result<LayerHandle, ApiError> {
    match id {
        LayerId::OwnStores => Ok(LayerHandle::OwnStores(api.fetch_own_stores().await?)),
        LayerId::Competitors => {
            let groups = api.fetch_competitor_groups(true).await?;
            let mut data = CompetitorLayerData::new(groups);
            data.refresh_visible(&vp.bounds());
            Ok(LayerHandle::Competitors(data))
        }
        LayerId::Catchment => {
            let stats = api.fetch_catchment(catchment_radius_km).await?;
            // Reuse the competitor dataset when that layer is live
            let groups = {
                let s = session.read();
                match s.handle(LayerId::Competitors) {
                    Some(LayerHandle::Competitors(d)) => Some(d.groups.clone()),
                    _ => None,
                }
            };
            let groups = match groups {
                Some(g) => g,
                None => api.fetch_competitor_groups(true).await?,
            };
            Ok(LayerHandle::Catchment(CatchmentLayerData::from_groups(
                stats, &groups,
            )))
        }
        LayerId::Irve => {
            let stations = api
                .fetch_irve(
                    vp.center.lat,
                    vp.center.lng,
                    IRVE_FETCH_RADIUS_KM,
                    IRVE_FETCH_LIMIT,
                )
                .await?;
            // Stats are cosmetic; their failure must not fail the layer
            let stats = api.fetch_irve_stats().await.ok();
            Ok(LayerHandle::Irve { stations, stats })
        }
        LayerId::Poi => {
            let pois = api
                .fetch_poi(
                    vp.center.lat,
                    vp.center.lng,
                    POI_FETCH_RADIUS_M,
                    &POI_CATEGORIES,
                )
                .await?;
            Ok(LayerHandle::Poi(pois))
        }
        LayerId::Boundaries => Ok(LayerHandle::Boundaries(api.fetch_boundaries(level).await?)),
        LayerId::Iris => {
            if !iris_zoom_visible(vp.zoom) {
                // Enabled below the gate: starts empty, fills once the user
                // zooms past 10
                return Ok(LayerHandle::Iris(IrisLayerData::default()));
            }
            let features = geocode::fetch_iris_features(&vp.bounds()).await?;
            let mut data = IrisLayerData::default();
            data.merge(features);
            Ok(LayerHandle::Iris(data))
        }
    }
}

/// Drive the toggle state machine for one layer. Responses resolving under
/// a stale generation are discarded.
#[allow(clippy::too_many_arguments)]
fn toggle_layer(
    api: ApiClient,
    id: LayerId,
    mut session: Signal<MapSession>,
    mut registry: Signal<LayerRegistry>,
    catchment_radius: Signal<u32>,
    boundary_level: Signal<BoundaryLevel>,
    mut enrichment_attempted: Signal<bool>,
    status_message: Signal<Option<String>>,
) {
    // The surface must exist before any loader runs
    if !session.read().ready {
        return;
    }
    let currently_on =
        registry.read().is_enabled(id) || registry.read().is_loading(id);
    if currently_on {
        registry.write().disable(id);
        session.write().detach(id);
        // Invalidate any fetch still in flight for this layer
        session.write().begin_load(id);
        return;
    }

    registry.write().begin_load(id);
    let generation = session.write().begin_load(id);
    spawn(async move {
        let vp = session.read().viewport;
        let result = load_layer(
            &api,
            id,
            vp,
            *catchment_radius.read(),
            *boundary_level.read(),
            session,
        )
        .await;
        if !session.read().is_current(id, generation) {
            debug!("discarding stale {} response", id.as_str());
            return;
        }
        match result {
            Ok(handle) => {
                let needs_enrichment =
                    matches!(&handle, LayerHandle::Competitors(d) if !d.any_rating());
                session.write().attach(id, handle);
                registry.write().finish_load(id, true);
                if id == LayerId::Competitors
                    && needs_enrichment
                    && !*enrichment_attempted.read()
                {
                    // One-shot per session; the manual refresh ignores this
                    enrichment_attempted.set(true);
                    run_enrichment(api.clone(), false, session, status_message);
                }
            }
            Err(e) => {
                warn!("{} layer load failed: {e}", id.as_str());
                registry.write().finish_load(id, false);
            }
        }
    });
}

/// Request rating enrichment, then replace the competitor dataset wholesale
/// once results land. Failure leaves the brand-color borders in place.
fn run_enrichment(
    api: ApiClient,
    force: bool,
    mut session: Signal<MapSession>,
    mut status_message: Signal<Option<String>>,
) {
    spawn(async move {
        match api.enrich_ratings(force, ENRICH_MAX_PER_RUN).await {
            Ok(summary) => {
                debug!(
                    "enrichment updated {} stores via {}",
                    summary.updated, summary.provider
                );
                match api.fetch_competitor_groups(true).await {
                    Ok(groups) => {
                        let mut s = session.write();
                        // Skip silently if the layer was toggled off meanwhile
                        if matches!(
                            s.handle(LayerId::Competitors),
                            Some(LayerHandle::Competitors(_))
                        ) {
                            let mut data = CompetitorLayerData::new(groups);
                            let bounds = s.viewport.bounds();
                            data.refresh_visible(&bounds);
                            s.attach(LayerId::Competitors, LayerHandle::Competitors(data));
                        }
                    }
                    Err(e) => warn!("post-enrichment reload failed: {e}"),
                }
                status_message.set(Some(format!(
                    "Notes mises à jour ({} fiches via {})",
                    summary.updated, summary.provider
                )));
                gloo_timers::future::TimeoutFuture::new(STATUS_MESSAGE_MS).await;
                status_message.set(None);
            }
            Err(e) => {
                warn!("rating enrichment failed: {e}");
            }
        }
    });
}

/// Work owed after every viewport settle: refresh the competitor visible
/// set incrementally and refetch IRIS polygons above the zoom gate.
fn after_viewport_change(mut session: Signal<MapSession>, registry: Signal<LayerRegistry>) {
    let vp = session.read().viewport;
    {
        let mut s = session.write();
        if let Some(LayerHandle::Competitors(data)) = s.handle_mut(LayerId::Competitors) {
            let diff = data.refresh_visible(&vp.bounds());
            debug!(
                "competitor visible set: +{} -{}",
                diff.added.len(),
                diff.removed.len()
            );
        }
    }
    if registry.read().is_enabled(LayerId::Iris) {
        if !iris_zoom_visible(vp.zoom) {
            let mut s = session.write();
            if let Some(LayerHandle::Iris(data)) = s.handle_mut(LayerId::Iris) {
                data.clear_features();
            }
        } else {
            let generation = session.write().begin_load(LayerId::Iris);
            spawn(async move {
                match geocode::fetch_iris_features(&vp.bounds()).await {
                    Ok(features) => {
                        if !session.read().is_current(LayerId::Iris, generation) {
                            return;
                        }
                        let mut s = session.write();
                        if let Some(LayerHandle::Iris(data)) = s.handle_mut(LayerId::Iris) {
                            let fresh = data.merge(features);
                            debug!("iris cache grew by {fresh}");
                        }
                    }
                    Err(e) => warn!("iris viewport fetch failed: {e}"),
                }
            });
        }
    }
}

/// Draw the query circle and issue the statistics request. On failure the
/// previous result stays; no retry, no banner.
fn run_zone_query(
    api: ApiClient,
    q: ZoneQuery,
    mut zone_circle: Signal<Option<ZoneQuery>>,
    mut analysis: Signal<Option<ZoneAnalysis>>,
    mut panel_tab: Signal<PanelTab>,
) {
    zone_circle.set(Some(q));
    spawn(async move {
        match api.analyze_zone(&q.request()).await {
            Ok(result) => {
                analysis.set(Some(result));
                panel_tab.set(PanelTab::Overview);
            }
            Err(e) => warn!("zone analysis failed: {e}"),
        }
    });
}

/// Recenter on the query anchor at the radius-derived zoom, then run the
/// usual post-move work.
fn focus_zone(mut session: Signal<MapSession>, registry: Signal<LayerRegistry>, q: &ZoneQuery) {
    {
        let mut s = session.write();
        s.viewport.center = q.anchor;
        s.viewport.zoom = q.target_zoom();
    }
    after_viewport_change(session, registry);
}

// ---------------------------------------------------------------------------
// Page component
// ---------------------------------------------------------------------------

#[component]
pub fn Dashboard(initial_postal: Option<String>) -> Element {
    let api = use_hook(|| ApiClient::from_origin(AuthContext::load()));

    let session = use_signal(MapSession::new);
    let registry = use_signal(LayerRegistry::catalog);
    let mut catchment_radius = use_signal(|| DEFAULT_CATCHMENT_RADIUS_KM);
    let mut boundary_level = use_signal(|| BoundaryLevel::Departements);
    let mut zone_mode = use_signal(|| ZoneMode::Radius);
    let zone_radius = use_signal(|| DEFAULT_ZONE_RADIUS_KM);
    let mut postal_input = use_signal(String::new);
    let analysis = use_signal(|| None::<ZoneAnalysis>);
    let panel_tab = use_signal(|| PanelTab::Overview);
    let zone_circle = use_signal(|| None::<ZoneQuery>);
    let failed_logos = use_signal(HashSet::<String>::new);
    let enrichment_attempted = use_signal(|| false);
    let status_message = use_signal(|| None::<String>);

    // Deep link: /zone/:postal prefills postal mode and runs the analysis
    use_hook(|| {
        if let Some(code) = initial_postal.clone() {
            if geocode::valid_postal_code(&code) {
                zone_mode.set(ZoneMode::Postal);
                postal_input.set(code.clone());
                let api = api.clone();
                spawn(async move {
                    match geocode::geocode_postal(&code).await {
                        Ok(Some(centroid)) => {
                            let q = zone::postal_query(centroid);
                            focus_zone(session, registry, &q);
                            run_zone_query(api, q, zone_circle, analysis, panel_tab);
                        }
                        Ok(None) => warn!("postal code {code} matched no commune"),
                        Err(e) => warn!("postal geocoding failed: {e}"),
                    }
                });
            }
        }
    });

    // Idempotent teardown when the page unmounts
    use_drop(move || {
        let mut session = session;
        session.write().teardown();
    });

    let on_toggle = {
        let api = api.clone();
        move |id: LayerId| {
            toggle_layer(
                api.clone(),
                id,
                session,
                registry,
                catchment_radius,
                boundary_level,
                enrichment_attempted,
                status_message,
            );
        }
    };

    let on_map_click = {
        let api = api.clone();
        move |point: LatLng| {
            // A click on an IRIS polygon switches to IRIS mode
            if registry.read().is_enabled(LayerId::Iris) {
                let hit = {
                    let s = session.read();
                    match s.handle(LayerId::Iris) {
                        Some(LayerHandle::Iris(d)) => d.hit_test(point).and_then(|f| {
                            f.geometry.vertex_centroid().map(|c| (f.code.clone(), c))
                        }),
                        _ => None,
                    }
                };
                if let Some((code, centroid)) = hit {
                    zone_mode.set(ZoneMode::Iris);
                    {
                        let mut sess = session;
                        let mut s = sess.write();
                        if let Some(LayerHandle::Iris(d)) = s.handle_mut(LayerId::Iris) {
                            d.select(code);
                        }
                    }
                    run_zone_query(
                        api.clone(),
                        zone::iris_query(centroid),
                        zone_circle,
                        analysis,
                        panel_tab,
                    );
                    return;
                }
            }
            if *zone_mode.read() == ZoneMode::Radius {
                let q = zone::radius_query(point, *zone_radius.read());
                focus_zone(session, registry, &q);
                run_zone_query(api.clone(), q, zone_circle, analysis, panel_tab);
            }
            // Postal mode ignores map clicks
        }
    };

    let on_postal_submit = {
        let api = api.clone();
        move |_| {
            let code = postal_input.read().trim().to_string();
            if !geocode::valid_postal_code(&code) {
                return;
            }
            let api = api.clone();
            spawn(async move {
                match geocode::geocode_postal(&code).await {
                    Ok(Some(centroid)) => {
                        let q = zone::postal_query(centroid);
                        focus_zone(session, registry, &q);
                        run_zone_query(api, q, zone_circle, analysis, panel_tab);
                    }
                    Ok(None) => warn!("postal code {code} matched no commune"),
                    Err(e) => warn!("postal geocoding failed: {e}"),
                }
            });
        }
    };

    let on_catchment_radius = {
        let api = api.clone();
        move |r: u32| {
            catchment_radius.set(r);
            if !registry.read().is_enabled(LayerId::Catchment) {
                return;
            }
            // Radius change re-issues both the redraw and the statistics
            // request; the circles pick the new radius up on next render
            let mut session = session;
            let generation = session.write().begin_load(LayerId::Catchment);
            let api = api.clone();
            spawn(async move {
                let vp = session.read().viewport;
                match load_layer(
                    &api,
                    LayerId::Catchment,
                    vp,
                    r,
                    *boundary_level.read(),
                    session,
                )
                .await
                {
                    Ok(handle) => {
                        if session.read().is_current(LayerId::Catchment, generation) {
                            session.write().attach(LayerId::Catchment, handle);
                        }
                    }
                    Err(e) => warn!("catchment radius change failed: {e}"),
                }
            });
        }
    };

    let on_boundary_level = {
        let api = api.clone();
        move |lvl: BoundaryLevel| {
            boundary_level.set(lvl);
            if registry.read().is_enabled(LayerId::Boundaries)
                || registry.read().is_loading(LayerId::Boundaries)
            {
                // Reload through the normal lifecycle: off, then on again
                for _ in 0..2 {
                    toggle_layer(
                        api.clone(),
                        LayerId::Boundaries,
                        session,
                        registry,
                        catchment_radius,
                        boundary_level,
                        enrichment_attempted,
                        status_message,
                    );
                }
            }
        }
    };

    let on_refresh_ratings = {
        let api = api.clone();
        move |_| run_enrichment(api.clone(), true, session, status_message)
    };

    let on_viewport_settled = move |_| after_viewport_change(session, registry);

    rsx! {
        div { class: "dashboard",
            div { class: "sidebar",
                LayerPanel {
                    session: session,
                    registry: registry,
                    catchment_radius: catchment_radius,
                    boundary_level: boundary_level,
                    status_message: status_message,
                    on_toggle: on_toggle,
                    on_catchment_radius: on_catchment_radius,
                    on_boundary_level: on_boundary_level,
                    on_refresh_ratings: on_refresh_ratings,
                }
                ZonePanel {
                    mode: zone_mode,
                    zone_radius: zone_radius,
                    postal_input: postal_input,
                    analysis: analysis,
                    panel_tab: panel_tab,
                    on_postal_submit: on_postal_submit,
                }
            }
            MapView {
                session: session,
                registry: registry,
                catchment_radius: catchment_radius,
                zone_circle: zone_circle,
                failed_logos: failed_logos,
                on_map_click: on_map_click,
                on_viewport_settled: on_viewport_settled,
            }
        }
    }
}
