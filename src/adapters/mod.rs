// Adapters layer: concrete collaborators for the map surface, routing and
// icon output.

pub mod headless_map;
pub mod http_routing;
pub mod svg;
