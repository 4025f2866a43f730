pub mod layer_panel;
pub mod map_view;
pub mod zone_panel;
