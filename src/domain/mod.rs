// Domain layer: models, visual descriptors, interaction state and ports to the
// map and routing services.

pub mod model;
pub mod ports;
pub mod state;
pub mod visual;
