mod api;
mod auth;
mod catchment;
mod cluster;
mod components;
mod geocode;
mod iris;
mod overlay;
mod pages;
mod session;
mod zone;

use dioxus::prelude::*;

#[derive(Routable, Clone, PartialEq)]
enum Route {
    #[route("/")]
    Home {},
    #[route("/zone/:postal")]
    ZoneView { postal: String },
}

#[component]
fn Home() -> Element {
    rsx! {
        pages::dashboard::Dashboard { initial_postal: None::<String> }
    }
}

#[component]
fn ZoneView(postal: String) -> Element {
    rsx! {
        pages::dashboard::Dashboard { initial_postal: Some(postal) }
    }
}

const CSS: Asset = asset!("/assets/main.css");
const FAVICON: Asset = asset!("/assets/favicon.svg");

#[allow(non_snake_case)]
fn App() -> Element {
    rsx! {
        document::Link { rel: "icon", r#type: "image/svg+xml", href: FAVICON }
        document::Stylesheet { href: CSS }
        Router::<Route> {}
    }
}

fn main() {
    launch(App);
}
