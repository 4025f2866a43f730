use dioxus::prelude::*;

use retailscope_shared::models::BoundaryLevel;

use crate::catchment::CATCHMENT_RADII_KM;
use crate::session::{LayerHandle, LayerId, LayerRegistry, MapSession};

/// Layer toggle list with per-layer extras: catchment radius + coverage
/// table, charging-station stats, boundary level selector, rating refresh.
#[component]
pub fn LayerPanel(
    session: Signal<MapSession>,
    registry: Signal<LayerRegistry>,
    catchment_radius: Signal<u32>,
    boundary_level: Signal<BoundaryLevel>,
    status_message: Signal<Option<String>>,
    on_toggle: EventHandler<LayerId>,
    on_catchment_radius: EventHandler<u32>,
    on_boundary_level: EventHandler<BoundaryLevel>,
    on_refresh_ratings: EventHandler<()>,
) -> Element {
    let layers = registry.read().layers().to_vec();

    rsx! {
        div { class: "panel",
            h3 { "Couches" }
            for layer in layers {
                {
                    let id = layer.id;
                    let row_class = if layer.enabled { "layer-row enabled" } else { "layer-row" };
                    rsx! {
                        div { class: "{row_class}",
                            button {
                                class: "layer-toggle",
                                title: "{layer.description}",
                                onclick: move |_| on_toggle.call(id),
                                span { class: "layer-icon", "{layer.icon}" }
                                span { class: "layer-label", "{layer.label}" }
                                if layer.loading {
                                    span { class: "layer-spinner", "…" }
                                }
                            }

                            // Per-layer extras, only while the layer is active
                            if layer.id == LayerId::Catchment && layer.enabled {
                                CatchmentDetails {
                                    session: session,
                                    catchment_radius: catchment_radius,
                                    on_catchment_radius: on_catchment_radius,
                                }
                            }
                            if layer.id == LayerId::Irve && layer.enabled {
                                IrveDetails { session: session }
                            }
                            if layer.id == LayerId::Boundaries {
                                select {
                                    class: "boundary-level",
                                    onchange: move |evt: Event<FormData>| {
                                        if let Some(lvl) = BoundaryLevel::ALL
                                            .into_iter()
                                            .find(|l| l.as_str() == evt.value())
                                        {
                                            on_boundary_level.call(lvl);
                                        }
                                    },
                                    for lvl in BoundaryLevel::ALL {
                                        option {
                                            value: "{lvl.as_str()}",
                                            selected: *boundary_level.read() == lvl,
                                            "{lvl.label()}"
                                        }
                                    }
                                }
                            }
                            if layer.id == LayerId::Competitors && layer.enabled {
                                div { class: "enrichment-row",
                                    button {
                                        class: "secondary",
                                        onclick: move |_| on_refresh_ratings.call(()),
                                        "Actualiser les notes"
                                    }
                                    if let Some(msg) = &*status_message.read() {
                                        span { class: "status-message", "{msg}" }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

#[component]
fn CatchmentDetails(
    session: Signal<MapSession>,
    catchment_radius: Signal<u32>,
    on_catchment_radius: EventHandler<u32>,
) -> Element {
    let (coverage, overlaps) = match session.read().handle(LayerId::Catchment) {
        Some(LayerHandle::Catchment(data)) => {
            (data.stats.coverage.clone(), data.stats.overlaps.clone())
        }
        _ => (Vec::new(), Vec::new()),
    };
    let has_overlaps = !overlaps.is_empty();

    rsx! {
        div { class: "catchment-details",
            div { class: "radius-row",
                label { "Rayon :" }
                for r in CATCHMENT_RADII_KM {
                    button {
                        class: if *catchment_radius.read() == r { "radius-choice active" } else { "radius-choice" },
                        onclick: move |_| on_catchment_radius.call(r),
                        "{r} km"
                    }
                }
            }
            if !coverage.is_empty() {
                table { class: "coverage-table",
                    thead {
                        tr {
                            th { "Enseigne" }
                            th { "Couverture" }
                        }
                    }
                    tbody {
                        for c in coverage {
                            tr {
                                td { "{c.competitor_name}" }
                                td { "{c.coverage_pct:.1} %" }
                            }
                        }
                    }
                }
            }
            if has_overlaps {
                h4 { "Recouvrements" }
                ul { class: "overlap-list",
                    for o in overlaps {
                        li {
                            "{o.competitor_a} ∩ {o.competitor_b} : "
                            "{o.shared_population} hab., {o.shared_communes} communes"
                        }
                    }
                }
            }
        }
    }
}

#[component]
fn IrveDetails(session: Signal<MapSession>) -> Element {
    let stats = match session.read().handle(LayerId::Irve) {
        Some(LayerHandle::Irve { stats, .. }) => stats.clone(),
        _ => None,
    };

    rsx! {
        if let Some(stats) = stats {
            p { class: "irve-stats",
                "{stats.station_count} bornes — {stats.avg_power_kw:.0} kW en moyenne"
            }
        }
    }
}
