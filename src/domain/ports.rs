use crate::domain::model::{BoundingBox, LatLng, Viewport, WorldPoint};
use crate::domain::visual::MarkerVisual;
use crate::utils::error::Result;
use async_trait::async_trait;

/// Opaque handle of a marker living on the host map surface.
pub type MarkerHandle = u64;

/// Notifications delivered by the map surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapEvent {
    Click(MarkerHandle),
    MouseOver(MarkerHandle),
    MouseOut(MarkerHandle),
    ZoomChanged,
    Idle,
}

pub type MapEventSink = Box<dyn Fn(MapEvent) + Send + Sync>;

/// Primitives of the external map rendering service.
pub trait MapService {
    /// Fails with `MapUnavailable` when the surface could not initialise.
    fn ensure_ready(&self) -> Result<()>;

    fn viewport(&self) -> Viewport;

    fn zoom(&self) -> u8;

    fn set_zoom(&mut self, zoom: u8);

    /// Geographic position to zoom-0 world coordinates.
    fn project(&self, position: LatLng) -> WorldPoint;

    fn add_marker(&mut self, position: LatLng, visual: &MarkerVisual) -> MarkerHandle;

    fn remove_marker(&mut self, handle: MarkerHandle);

    fn set_icon(&mut self, handle: MarkerHandle, visual: &MarkerVisual);

    fn set_z_index(&mut self, handle: MarkerHandle, z_index: i32);

    fn fit_bounds(&mut self, bounds: BoundingBox, padding_px: u32);

    fn subscribe(&mut self, sink: MapEventSink);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteLeg {
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

/// External routing primitive.
#[async_trait]
pub trait RoutingService: Send + Sync {
    async fn route(&self, origin: LatLng, destination: LatLng) -> Result<RouteLeg>;
}
