pub mod arena;
pub mod cluster;
pub mod directions;
pub mod engine;
pub mod features;
pub mod geo;
pub mod interaction;
pub mod marker;
pub mod projection;

pub use crate::domain::model::{Cluster, Feature, Listing, ProviderGroup};
pub use crate::domain::ports::{MapService, RoutingService};
pub use crate::utils::error::Result;
