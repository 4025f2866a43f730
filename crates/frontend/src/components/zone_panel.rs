use dioxus::prelude::*;

use retailscope_shared::models::ZoneAnalysis;

use crate::geocode::valid_postal_code;
use crate::zone::{PanelTab, ZoneMode, MAX_ZONE_RADIUS_KM, MIN_ZONE_RADIUS_KM};

/// Zone-analysis controls and results. The three query modes share one
/// result slot; every completed query lands on the overview tab.
#[component]
pub fn ZonePanel(
    mode: Signal<ZoneMode>,
    zone_radius: Signal<f64>,
    postal_input: Signal<String>,
    analysis: Signal<Option<ZoneAnalysis>>,
    panel_tab: Signal<PanelTab>,
    on_postal_submit: EventHandler<()>,
) -> Element {
    let current_mode = *mode.read();
    let current_radius = *zone_radius.read();
    let postal_ok = valid_postal_code(postal_input.read().trim());

    rsx! {
        div { class: "panel",
            h3 { "Analyse de zone" }
            div { class: "mode-row",
                for m in [ZoneMode::Radius, ZoneMode::Postal, ZoneMode::Iris] {
                    button {
                        class: if current_mode == m { "mode-choice active" } else { "mode-choice" },
                        onclick: move |_| mode.set(m),
                        "{m.label()}"
                    }
                }
            }

            {match current_mode {
                ZoneMode::Radius => rsx! {
                    div { class: "radius-slider",
                        label { "Rayon : {current_radius:.0} km" }
                        input {
                            r#type: "range",
                            min: "{MIN_ZONE_RADIUS_KM}",
                            max: "{MAX_ZONE_RADIUS_KM}",
                            value: "{current_radius}",
                            onchange: move |evt: Event<FormData>| {
                                if let Ok(v) = evt.value().parse::<f64>() {
                                    zone_radius.set(v);
                                }
                            },
                        }
                        p { class: "hint", "Cliquez sur la carte pour analyser la zone." }
                    }
                },
                ZoneMode::Postal => rsx! {
                    div { class: "postal-row",
                        input {
                            r#type: "text",
                            maxlength: "5",
                            placeholder: "Code postal (ex. 75001)",
                            value: "{postal_input}",
                            oninput: move |evt: Event<FormData>| {
                                postal_input.set(evt.value().to_string());
                            },
                        }
                        button {
                            disabled: !postal_ok,
                            onclick: move |_| on_postal_submit.call(()),
                            "Analyser"
                        }
                    }
                },
                ZoneMode::Iris => rsx! {
                    p { class: "hint",
                        "Activez la couche IRIS et cliquez une micro-zone sur la carte."
                    }
                },
            }}

            if let Some(result) = &*analysis.read() {
                div { class: "zone-results",
                    div { class: "tab-row",
                        button {
                            class: if *panel_tab.read() == PanelTab::Overview { "tab active" } else { "tab" },
                            onclick: move |_| panel_tab.set(PanelTab::Overview),
                            "Synthèse"
                        }
                        button {
                            class: if *panel_tab.read() == PanelTab::Communes { "tab active" } else { "tab" },
                            onclick: move |_| panel_tab.set(PanelTab::Communes),
                            "Communes"
                        }
                    }
                    {match *panel_tab.read() {
                        PanelTab::Overview => rsx! {
                            dl { class: "zone-overview",
                                dt { "Zone" }
                                dd { "{result.radius_km:.0} km autour de ({result.latitude:.4}, {result.longitude:.4})" }
                                dt { "Population" }
                                dd { "{result.population} hab." }
                                dt { "Densité" }
                                dd { "{result.density_per_km2:.0} hab./km²" }
                                if let Some(rent) = result.average_rent_sqm {
                                    dt { "Loyer moyen" }
                                    dd { "{rent:.1} €/m²" }
                                }
                                dt { "Mobilité" }
                                dd {
                                    "voiture {result.mobility.car_pct:.0} % · TC {result.mobility.transit_pct:.0} % · "
                                    "vélo {result.mobility.bike_pct:.0} % · marche {result.mobility.walk_pct:.0} %"
                                }
                                if let Some(income) = result.socio.median_income {
                                    dt { "Revenu médian" }
                                    dd { "{income:.0} €" }
                                }
                                if let Some(unemployment) = result.socio.unemployment_pct {
                                    dt { "Chômage" }
                                    dd { "{unemployment:.1} %" }
                                }
                                dt { "Âges" }
                                dd {
                                    "<25 : {result.socio.age_bands.under_25_pct:.0} % · "
                                    "25-64 : {result.socio.age_bands.from_25_to_64_pct:.0} % · "
                                    "65+ : {result.socio.age_bands.over_64_pct:.0} %"
                                }
                            }
                        },
                        PanelTab::Communes => rsx! {
                            ul { class: "commune-list",
                                for c in &result.communes {
                                    li { key: "{c.code}",
                                        "{c.name} — {c.population} hab. ({c.distance_km:.1} km)"
                                    }
                                }
                                if result.communes.is_empty() {
                                    li { class: "hint", "Aucune commune dans la zone." }
                                }
                            }
                        },
                    }}
                }
            }
        }
    }
}
