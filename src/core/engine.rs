use crate::config::EngineConfig;
use crate::core::arena::MarkerArena;
use crate::core::cluster::{ClusterIndex, Clusterer};
use crate::core::directions::DirectionsAdapter;
use crate::core::features::{FeatureBuilder, FeatureSet};
use crate::core::interaction::{InteractionController, Transition};
use crate::core::marker::MarkerRenderer;
use crate::domain::model::{
    BoundingBox, Cluster, Feature, FeatureId, LatLng, Listing, MarkerKey, RouteOutcome,
};
use crate::domain::ports::{MapEvent, MapService, MarkerHandle};
use crate::domain::state::InteractionState;
use crate::domain::visual::MarkerVisual;
use crate::utils::error::Result;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Everything the engine reacts to. Map events arrive through the sink the
/// engine registers with the map service; the rest come from the
/// presentation layer through [`MapEngine::sender`].
#[derive(Debug, Clone)]
pub enum EngineInput {
    Map(MapEvent),
    Ingest(Vec<Listing>),
    SetBoundingBox(BoundingBox),
    CloseSelected,
    ShowDirections,
    RouteResolved {
        feature_id: FeatureId,
        outcome: RouteOutcome,
    },
    Shutdown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub ingestions: usize,
    pub refresh_passes: usize,
    pub markers_added: usize,
    pub markers_removed: usize,
    pub icon_updates: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarkerSnapshot {
    pub key: MarkerKey,
    pub handle: MarkerHandle,
    pub position: LatLng,
    pub count: usize,
    pub visual: MarkerVisual,
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineSnapshot {
    pub zoom: u8,
    pub features: usize,
    pub providers: usize,
    pub state: InteractionState,
    pub stats: EngineStats,
    pub markers: Vec<MarkerSnapshot>,
}

type FeatureCallback = Box<dyn FnMut(&Feature)>;
type ClusterCallback = Box<dyn FnMut(&[Arc<Feature>])>;

pub struct MapEngine<M: MapService> {
    map: M,
    config: EngineConfig,
    clusterer: Clusterer,
    renderer: MarkerRenderer,
    controller: InteractionController,
    feature_set: FeatureSet,
    index: ClusterIndex,
    arena: MarkerArena,
    directions: Option<DirectionsAdapter>,
    feature_selected: Vec<FeatureCallback>,
    cluster_activated: Vec<ClusterCallback>,
    sender: mpsc::UnboundedSender<EngineInput>,
    receiver: Option<mpsc::UnboundedReceiver<EngineInput>>,
    stats: EngineStats,
    last_refresh_at: Option<Instant>,
}

impl<M: MapService> MapEngine<M> {
    /// Attach to a map surface. A surface that failed to initialise is
    /// terminal for the session and is not retried.
    pub fn new(mut map: M, config: EngineConfig) -> Result<Self> {
        map.ensure_ready()?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let sink = sender.clone();
        map.subscribe(Box::new(move |event| {
            // the loop may already be gone during teardown
            let _ = sink.send(EngineInput::Map(event));
        }));

        let clusterer = Clusterer::new(config.cluster.clone());
        let index = clusterer.index(&[]);

        Ok(Self {
            map,
            renderer: MarkerRenderer::new(config.markers.clone()),
            controller: InteractionController::new(config.interaction.clone()),
            clusterer,
            config,
            feature_set: FeatureSet::default(),
            index,
            arena: MarkerArena::new(),
            directions: None,
            feature_selected: Vec::new(),
            cluster_activated: Vec::new(),
            sender,
            receiver: Some(receiver),
            stats: EngineStats::default(),
            last_refresh_at: None,
        })
    }

    pub fn with_directions(mut self, directions: DirectionsAdapter) -> Self {
        self.directions = Some(directions);
        self
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<EngineInput> {
        self.sender.clone()
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    pub fn state(&self) -> &InteractionState {
        self.controller.state()
    }

    pub fn feature_set(&self) -> &FeatureSet {
        &self.feature_set
    }

    pub fn index(&self) -> &ClusterIndex {
        &self.index
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn last_refresh_at(&self) -> Option<Instant> {
        self.last_refresh_at
    }

    pub fn marker_handle(&self, key: &MarkerKey) -> Option<MarkerHandle> {
        self.arena.get(key).map(|entry| entry.handle)
    }

    pub fn visible_clusters(&self) -> Vec<Cluster> {
        self.arena.entries().map(|(_, e)| e.cluster.clone()).collect()
    }

    pub fn on_feature_selected(&mut self, callback: impl FnMut(&Feature) + 'static) {
        self.feature_selected.push(Box::new(callback));
    }

    pub fn on_cluster_activated(&mut self, callback: impl FnMut(&[Arc<Feature>]) + 'static) {
        self.cluster_activated.push(Box::new(callback));
    }

    /// Replace the whole listing set.
    pub fn ingest(&mut self, listings: &[Listing]) {
        let released = self.arena.release_all(&mut self.map);
        self.stats.markers_removed += released;
        self.controller.reset();

        self.feature_set = FeatureBuilder::build(listings);
        self.index = self.clusterer.index(&self.feature_set.features);
        self.stats.ingestions += 1;

        tracing::info!(
            "Ingested {} features from {} listings across {} providers",
            self.feature_set.len(),
            listings.len(),
            self.feature_set.groups_by_provider.len()
        );
        self.refresh_markers();
    }

    /// Fit the viewport to an externally chosen region, never zooming in
    /// past `max_fit_zoom`.
    pub fn set_bounding_box(&mut self, bbox: BoundingBox) {
        self.map.fit_bounds(bbox, 0);
        let max_zoom = self.config.interaction.max_fit_zoom;
        if self.map.zoom() > max_zoom {
            tracing::debug!("Clamping fitted zoom {} to {}", self.map.zoom(), max_zoom);
            self.map.set_zoom(max_zoom);
        }
    }

    /// Recluster for the current viewport and restyle every marker.
    pub fn refresh_markers(&mut self) {
        let viewport = self.map.viewport();
        let state = self.controller.state();
        let desired: Vec<(Cluster, MarkerVisual)> = self
            .index
            .clusters(&viewport.bounds, viewport.zoom)
            .into_iter()
            .filter_map(|cluster| {
                let visual = self.renderer.render(&cluster, &self.feature_set, state)?;
                Some((cluster, visual))
            })
            .collect();

        let reconciled = self.arena.reconcile(&mut self.map, desired);
        self.stats.refresh_passes += 1;
        self.last_refresh_at = Some(Instant::now());
        self.stats.markers_added += reconciled.added;
        self.stats.markers_removed += reconciled.removed;
        self.stats.icon_updates += reconciled.updated;
        self.reposition_cards();

        tracing::debug!(
            "Refreshed markers at zoom {}: {} visible (+{} -{} ~{})",
            viewport.zoom,
            self.arena.len(),
            reconciled.added,
            reconciled.removed,
            reconciled.updated
        );
    }

    fn reposition_cards(&mut self) {
        let position_of = |id: &Option<FeatureId>| {
            id.as_deref()
                .and_then(|id| self.feature_set.get(id))
                .map(|f| f.position)
        };
        let hovered = position_of(&self.controller.state().hovered_feature_id);
        let selected = position_of(&self.controller.state().selected_feature_id);
        self.controller.reposition_cards(hovered, selected, &self.map);
    }

    fn restyle_feature(&mut self, feature_id: &str) {
        if self.controller.state().is_zooming {
            return;
        }
        let Some(feature) = self.feature_set.get(feature_id).cloned() else {
            return;
        };
        let visual = self
            .renderer
            .render_feature(&feature, &self.feature_set, self.controller.state());
        if self
            .arena
            .restyle(&mut self.map, &MarkerKey::Feature(feature_id.to_string()), visual)
        {
            self.stats.icon_updates += 1;
        }
    }

    pub fn select_feature(&mut self, feature_id: &str) {
        let Some(feature) = self.feature_set.get(feature_id).cloned() else {
            tracing::debug!("Ignoring selection of unknown feature {}", feature_id);
            return;
        };

        if let Transition::Selected { previous, .. } = self.controller.select(&feature, &self.map) {
            if let Some(previous) = previous {
                self.restyle_feature(&previous);
            }
            self.restyle_feature(&feature.id);
            for callback in self.feature_selected.iter_mut() {
                callback(&feature);
            }
        }
    }

    pub fn close_selected(&mut self) {
        if let Transition::Deselected { feature_id } = self.controller.deselect() {
            self.restyle_feature(&feature_id);
        }
    }

    /// Open a cluster: hand its members to the presentation layer and zoom
    /// the map onto them.
    pub fn activate_cluster(&mut self, cluster_id: u64) {
        let Some(entry) = self.arena.get(&MarkerKey::Cluster(cluster_id)) else {
            tracing::debug!("Ignoring activation of unknown cluster {}", cluster_id);
            return;
        };
        let Some(activation) = self.index.activate(&entry.cluster) else {
            return;
        };

        self.controller.cluster_activated();
        tracing::debug!(
            "Activated cluster {} with {} features",
            cluster_id,
            activation.features.len()
        );
        for callback in self.cluster_activated.iter_mut() {
            callback(&activation.features);
        }
        self.map
            .fit_bounds(activation.bounds, self.config.interaction.cluster_fit_padding_px);
    }

    /// Ask for a route from the reference point to the selected feature.
    /// The lookup runs in the background and its result comes back as
    /// [`EngineInput::RouteResolved`].
    pub fn show_directions(&mut self) {
        let Some(directions) = self.directions.clone() else {
            tracing::debug!("Directions requested but no routing service is configured");
            return;
        };
        let Some(feature) = self
            .controller
            .state()
            .selected_feature_id
            .as_deref()
            .and_then(|id| self.feature_set.get(id))
            .cloned()
        else {
            return;
        };
        let Some(origin) = self.config.interaction.reference_point else {
            tracing::debug!("Directions requested without a reference point");
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("Directions requested outside of a runtime");
            return;
        };

        let sender = self.sender.clone();
        runtime.spawn(async move {
            let outcome = directions.get_route(origin, feature.position).await;
            let _ = sender.send(EngineInput::RouteResolved {
                feature_id: feature.id.clone(),
                outcome,
            });
        });
    }

    fn handle_map_event(&mut self, event: MapEvent, now: Instant) {
        match event {
            MapEvent::MouseOver(handle) => {
                if let Some(MarkerKey::Feature(id)) = self.arena.key_for(handle).cloned() {
                    if let Some(feature) = self.feature_set.get(&id).cloned() {
                        self.controller.hover_enter(&feature, &self.map);
                    }
                }
            }
            MapEvent::MouseOut(handle) => {
                if let Some(MarkerKey::Feature(id)) = self.arena.key_for(handle) {
                    let id = id.clone();
                    self.controller.hover_leave(&id);
                }
            }
            MapEvent::Click(handle) => match self.arena.key_for(handle).cloned() {
                Some(MarkerKey::Feature(id)) => self.select_feature(&id),
                Some(MarkerKey::Cluster(id)) => self.activate_cluster(id),
                None => tracing::debug!("Click on unknown marker {}", handle),
            },
            MapEvent::ZoomChanged => {
                self.controller.zoom_changed(now);
            }
            MapEvent::Idle => {
                if !self.controller.state().is_zooming {
                    self.refresh_markers();
                }
            }
        }
    }

    /// Apply one input. Returns `false` once the engine should stop.
    pub fn handle(&mut self, input: EngineInput, now: Instant) -> bool {
        match input {
            EngineInput::Map(event) => self.handle_map_event(event, now),
            EngineInput::Ingest(listings) => self.ingest(&listings),
            EngineInput::SetBoundingBox(bbox) => self.set_bounding_box(bbox),
            EngineInput::CloseSelected => self.close_selected(),
            EngineInput::ShowDirections => self.show_directions(),
            EngineInput::RouteResolved {
                feature_id,
                outcome,
            } => {
                self.controller.route_resolved(&feature_id, outcome);
            }
            EngineInput::Shutdown => return false,
        }
        true
    }

    /// End a zoom burst if its quiescence deadline has passed, recomputing
    /// every visible marker exactly once.
    pub fn settle(&mut self, now: Instant) -> bool {
        if self.controller.poll_quiescence(now) == Transition::ZoomSettled {
            tracing::debug!("Zoom settled at {}", self.map.zoom());
            self.refresh_markers();
            true
        } else {
            false
        }
    }

    /// Process inputs until `Shutdown` arrives, debouncing zoom bursts.
    pub async fn run(&mut self) {
        let Some(mut receiver) = self.receiver.take() else {
            tracing::warn!("Engine loop is already running");
            return;
        };

        loop {
            let deadline = self.controller.quiescence_deadline();
            let quiescence = async move {
                match deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                input = receiver.recv() => match input {
                    Some(input) => {
                        if !self.handle(input, Instant::now()) {
                            break;
                        }
                    }
                    None => break,
                },
                _ = quiescence => {
                    self.settle(Instant::now());
                }
            }
        }

        self.receiver = Some(receiver);
    }

    /// Release every host marker, e.g. before the map surface goes away.
    pub fn teardown(&mut self) {
        let released = self.arena.release_all(&mut self.map);
        self.stats.markers_removed += released;
        self.controller.reset();
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            zoom: self.map.zoom(),
            features: self.feature_set.len(),
            providers: self.feature_set.groups_by_provider.len(),
            state: self.controller.state().clone(),
            stats: self.stats,
            markers: self
                .arena
                .entries()
                .map(|(key, entry)| MarkerSnapshot {
                    key: key.clone(),
                    handle: entry.handle,
                    position: entry.cluster.position,
                    count: entry.cluster.count,
                    visual: entry.visual.clone(),
                })
                .collect(),
        }
    }
}
