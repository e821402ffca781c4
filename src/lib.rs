pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{headless_map::HeadlessMap, http_routing::HttpRoutingService};
pub use config::EngineConfig;
pub use core::{
    cluster::{ClusterIndex, Clusterer},
    directions::DirectionsAdapter,
    engine::{EngineInput, MapEngine},
    features::{FeatureBuilder, FeatureSet},
    interaction::InteractionController,
    marker::MarkerRenderer,
};
pub use domain::model::{BoundingBox, Cluster, Feature, LatLng, Listing, MarkerKey, RouteOutcome};
pub use domain::ports::{MapEvent, MapService, RoutingService};
pub use domain::state::InteractionState;
pub use utils::error::{EngineError, Result};
