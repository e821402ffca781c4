//! In-process map surface with real Web-Mercator math. It keeps markers in
//! memory and forwards synthetic events, which is all the CLI and the test
//! suite need from a map.

use crate::core::projection::{
    latitude_from_y, longitude_from_x, mercator_x, mercator_y, world_point, TILE_SIZE,
};
use crate::domain::model::{BoundingBox, LatLng, Viewport, WorldPoint};
use crate::domain::ports::{MapEvent, MapEventSink, MapService, MarkerHandle};
use crate::domain::visual::MarkerVisual;
use crate::utils::error::{EngineError, Result};
use std::cell::Cell;
use std::collections::BTreeMap;

pub const MAX_ZOOM: u8 = 22;

#[derive(Debug, Clone)]
pub struct HeadlessMarker {
    pub position: LatLng,
    pub visual: MarkerVisual,
    pub z_index: i32,
}

pub struct HeadlessMap {
    center: LatLng,
    zoom: u8,
    width: u32,
    height: u32,
    markers: BTreeMap<MarkerHandle, HeadlessMarker>,
    next_handle: MarkerHandle,
    sink: Option<MapEventSink>,
    project_calls: Cell<usize>,
    failure: Option<String>,
}

fn wrap_longitude(lng: f64) -> f64 {
    if (-180.0..=180.0).contains(&lng) {
        lng
    } else {
        (lng + 180.0).rem_euclid(360.0) - 180.0
    }
}

impl HeadlessMap {
    pub fn new(center: LatLng, zoom: u8, width: u32, height: u32) -> Self {
        Self {
            center,
            zoom: zoom.min(MAX_ZOOM),
            width: width.max(1),
            height: height.max(1),
            markers: BTreeMap::new(),
            next_handle: 1,
            sink: None,
            project_calls: Cell::new(0),
            failure: None,
        }
    }

    /// A surface whose initialisation failed.
    pub fn unavailable(reason: &str) -> Self {
        let mut map = Self::new(LatLng::new(0.0, 0.0), 0, 1, 1);
        map.failure = Some(reason.to_string());
        map
    }

    pub fn center(&self) -> LatLng {
        self.center
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn marker(&self, handle: MarkerHandle) -> Option<&HeadlessMarker> {
        self.markers.get(&handle)
    }

    pub fn markers(&self) -> impl Iterator<Item = (&MarkerHandle, &HeadlessMarker)> {
        self.markers.iter()
    }

    pub fn project_calls(&self) -> usize {
        self.project_calls.get()
    }

    /// Deliver an event to the subscriber, as a pointer or camera change would.
    pub fn emit(&self, event: MapEvent) {
        if let Some(sink) = &self.sink {
            sink(event);
        }
    }

    pub fn pan_to(&mut self, center: LatLng) {
        self.center = center;
        self.emit(MapEvent::Idle);
    }

    fn set_camera(&mut self, center: LatLng, zoom: u8) {
        let zoom_changed = zoom != self.zoom;
        self.center = center;
        self.zoom = zoom;
        if zoom_changed {
            self.emit(MapEvent::ZoomChanged);
        }
        self.emit(MapEvent::Idle);
    }

    fn scale(&self) -> f64 {
        f64::from(1u32 << self.zoom)
    }
}

impl MapService for HeadlessMap {
    fn ensure_ready(&self) -> Result<()> {
        match &self.failure {
            Some(reason) => Err(EngineError::MapUnavailable {
                message: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    fn viewport(&self) -> Viewport {
        let c = world_point(self.center);
        let scale = self.scale();
        let half_w = f64::from(self.width) / 2.0 / scale;
        let half_h = f64::from(self.height) / 2.0 / scale;

        let (west, east) = if half_w * 2.0 >= TILE_SIZE {
            (-180.0, 180.0)
        } else {
            (
                wrap_longitude(longitude_from_x((c.x - half_w) / TILE_SIZE)),
                wrap_longitude(longitude_from_x((c.x + half_w) / TILE_SIZE)),
            )
        };
        let north = latitude_from_y(((c.y - half_h) / TILE_SIZE).clamp(0.0, 1.0));
        let south = latitude_from_y(((c.y + half_h) / TILE_SIZE).clamp(0.0, 1.0));

        Viewport {
            bounds: BoundingBox::new(south, west, north, east),
            zoom: self.zoom,
        }
    }

    fn zoom(&self) -> u8 {
        self.zoom
    }

    fn set_zoom(&mut self, zoom: u8) {
        let center = self.center;
        self.set_camera(center, zoom.min(MAX_ZOOM));
    }

    fn project(&self, position: LatLng) -> WorldPoint {
        self.project_calls.set(self.project_calls.get() + 1);
        world_point(position)
    }

    fn add_marker(&mut self, position: LatLng, visual: &MarkerVisual) -> MarkerHandle {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.markers.insert(
            handle,
            HeadlessMarker {
                position,
                visual: visual.clone(),
                z_index: visual.z_index,
            },
        );
        handle
    }

    fn remove_marker(&mut self, handle: MarkerHandle) {
        self.markers.remove(&handle);
    }

    fn set_icon(&mut self, handle: MarkerHandle, visual: &MarkerVisual) {
        if let Some(marker) = self.markers.get_mut(&handle) {
            marker.visual = visual.clone();
        }
    }

    fn set_z_index(&mut self, handle: MarkerHandle, z_index: i32) {
        if let Some(marker) = self.markers.get_mut(&handle) {
            marker.z_index = z_index;
        }
    }

    fn fit_bounds(&mut self, bounds: BoundingBox, padding_px: u32) {
        let x_west = mercator_x(bounds.west);
        let mut x_east = mercator_x(bounds.east);
        if bounds.crosses_antimeridian() {
            x_east += 1.0;
        }
        let y_north = mercator_y(bounds.north);
        let y_south = mercator_y(bounds.south);

        let span_x = (x_east - x_west) * TILE_SIZE;
        let span_y = (y_south - y_north) * TILE_SIZE;
        let avail_w = (f64::from(self.width) - 2.0 * f64::from(padding_px)).max(1.0);
        let avail_h = (f64::from(self.height) - 2.0 * f64::from(padding_px)).max(1.0);

        let fit = |avail: f64, span: f64| {
            if span <= 0.0 {
                f64::INFINITY
            } else {
                avail / span
            }
        };
        let ratio = fit(avail_w, span_x).min(fit(avail_h, span_y));
        let zoom = if ratio.is_finite() {
            ratio.log2().floor().clamp(0.0, f64::from(MAX_ZOOM)) as u8
        } else {
            MAX_ZOOM
        };

        let center = LatLng::new(
            latitude_from_y((y_north + y_south) / 2.0),
            wrap_longitude(longitude_from_x((x_west + x_east) / 2.0)),
        );
        tracing::debug!("Fitting bounds {:?} at zoom {}", bounds, zoom);
        self.set_camera(center, zoom);
    }

    fn subscribe(&mut self, sink: MapEventSink) {
        self.sink = Some(sink);
    }
}
