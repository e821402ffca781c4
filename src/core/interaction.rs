//! Hover, selection and zoom-transition state machine.
//!
//! ```text
//!   Idle ──hover──▶ Hovering ──leave──▶ Idle
//!     │                │
//!     └────click───────┴──▶ Selected ──close──▶ Idle
//!
//!   Zooming(false) ──zoom_changed──▶ Zooming(true) ──quiescence──▶ Zooming(false)
//! ```
//!
//! Hover and selection are independent: hovering another marker while one is
//! selected keeps the selection. Re-entering the current state is a no-op.

use crate::config::InteractionConfig;
use crate::core::geo::distance_between;
use crate::core::projection::{north_west, pixel_offset};
use crate::domain::model::{Feature, FeatureId, LatLng, RouteOutcome, ScreenPoint};
use crate::domain::ports::MapService;
use crate::domain::state::{InteractionState, RouteRecord};
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Ignored,
    HoverEntered {
        feature_id: FeatureId,
        card_position: ScreenPoint,
    },
    HoverLeft {
        feature_id: FeatureId,
    },
    Selected {
        previous: Option<FeatureId>,
        feature_id: FeatureId,
        distance_km: Option<f64>,
    },
    Deselected {
        feature_id: FeatureId,
    },
    ClusterActivated {
        cleared_hover: Option<FeatureId>,
    },
    ZoomStarted,
    ZoomExtended,
    ZoomSettled,
    RouteApplied {
        feature_id: FeatureId,
    },
}

/// On-screen pixel position of a geographic point in the current viewport.
pub fn screen_position<M: MapService + ?Sized>(map: &M, position: LatLng) -> ScreenPoint {
    let viewport = map.viewport();
    let origin = map.project(north_west(&viewport));
    pixel_offset(map.project(position), origin, viewport.zoom)
}

#[derive(Debug)]
pub struct InteractionController {
    config: InteractionConfig,
    state: InteractionState,
    quiescence_deadline: Option<Instant>,
}

impl InteractionController {
    pub fn new(config: InteractionConfig) -> Self {
        Self {
            config,
            state: InteractionState::default(),
            quiescence_deadline: None,
        }
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn quiescence_deadline(&self) -> Option<Instant> {
        self.quiescence_deadline
    }

    pub fn reset(&mut self) {
        self.state = InteractionState::default();
        self.quiescence_deadline = None;
    }

    pub fn hover_enter<M: MapService + ?Sized>(&mut self, feature: &Feature, map: &M) -> Transition {
        if self.config.mobile || self.state.is_zooming || self.state.is_hovered(&feature.id) {
            return Transition::Ignored;
        }

        let card_position =
            screen_position(map, feature.position).offset_by(self.config.hover_card_offset);
        self.state.hovered_feature_id = Some(feature.id.clone());
        self.state.hover_card_position = Some(card_position);

        tracing::debug!("Hover entered {} at {:?}", feature.id, card_position);
        Transition::HoverEntered {
            feature_id: feature.id.clone(),
            card_position,
        }
    }

    pub fn hover_leave(&mut self, feature_id: &str) -> Transition {
        if !self.state.is_hovered(feature_id) {
            return Transition::Ignored;
        }
        self.clear_hover()
            .map(|feature_id| Transition::HoverLeft { feature_id })
            .unwrap_or(Transition::Ignored)
    }

    fn clear_hover(&mut self) -> Option<FeatureId> {
        self.state.hover_card_position = None;
        self.state.hovered_feature_id.take()
    }

    pub fn select<M: MapService + ?Sized>(&mut self, feature: &Feature, map: &M) -> Transition {
        if self.state.is_selected(&feature.id) {
            return Transition::Ignored;
        }

        self.clear_hover();

        let distance_km = self
            .config
            .reference_point
            .map(|reference| distance_between(reference, feature.position))
            .filter(|d| d.is_finite());

        let previous = self.state.selected_feature_id.replace(feature.id.clone());
        self.state.selected_distance_km = distance_km;
        self.state.selected_card_position =
            Some(screen_position(map, feature.position).offset_by(self.config.selected_card_offset));

        tracing::debug!("Selected {} (distance {:?} km)", feature.id, distance_km);
        Transition::Selected {
            previous,
            feature_id: feature.id.clone(),
            distance_km,
        }
    }

    pub fn deselect(&mut self) -> Transition {
        match self.state.selected_feature_id.take() {
            Some(feature_id) => {
                self.state.selected_card_position = None;
                self.state.selected_distance_km = None;
                Transition::Deselected { feature_id }
            }
            None => Transition::Ignored,
        }
    }

    pub fn cluster_activated(&mut self) -> Transition {
        Transition::ClusterActivated {
            cleared_hover: self.clear_hover(),
        }
    }

    /// Starts or extends a zoom burst; the quiescence deadline restarts on
    /// every call.
    pub fn zoom_changed(&mut self, now: Instant) -> Transition {
        self.quiescence_deadline = Some(now + self.config.zoom_debounce());
        if self.state.is_zooming {
            return Transition::ZoomExtended;
        }

        self.state.is_zooming = true;
        // the hover card would float at a stale position during the transform
        self.clear_hover();
        Transition::ZoomStarted
    }

    /// Ends the zoom burst once the deadline has passed.
    pub fn poll_quiescence(&mut self, now: Instant) -> Transition {
        match self.quiescence_deadline {
            Some(deadline) if now >= deadline => {
                self.quiescence_deadline = None;
                self.state.is_zooming = false;
                Transition::ZoomSettled
            }
            _ => Transition::Ignored,
        }
    }

    /// Recompute card positions after the viewport moved.
    pub fn reposition_cards<M: MapService + ?Sized>(
        &mut self,
        hovered_position: Option<LatLng>,
        selected_position: Option<LatLng>,
        map: &M,
    ) {
        if let (Some(_), Some(position)) = (&self.state.hovered_feature_id, hovered_position) {
            self.state.hover_card_position =
                Some(screen_position(map, position).offset_by(self.config.hover_card_offset));
        }
        if let (Some(_), Some(position)) = (&self.state.selected_feature_id, selected_position) {
            self.state.selected_card_position =
                Some(screen_position(map, position).offset_by(self.config.selected_card_offset));
        }
    }

    /// Store a route result if it still belongs to the current selection.
    pub fn route_resolved(&mut self, feature_id: &str, outcome: RouteOutcome) -> Transition {
        if !self.state.is_selected(feature_id) {
            tracing::debug!("Discarding route for {}, selection changed", feature_id);
            return Transition::Ignored;
        }

        self.state.last_route_result = Some(RouteRecord {
            feature_id: feature_id.to_string(),
            outcome,
            resolved_at: chrono::Utc::now(),
        });
        Transition::RouteApplied {
            feature_id: feature_id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::headless_map::HeadlessMap;
    use crate::domain::model::Feature;
    use std::time::Duration;

    fn feature(id: &str, lat: f64, lng: f64) -> Feature {
        Feature {
            id: id.to_string(),
            provider_id: "p1".to_string(),
            price: 100.0,
            position: LatLng::new(lat, lng),
            payload: serde_json::Map::new(),
        }
    }

    fn map() -> HeadlessMap {
        HeadlessMap::new(LatLng::new(25.0330, 121.5654), 14, 800, 600)
    }

    fn controller() -> InteractionController {
        InteractionController::new(InteractionConfig::default())
    }

    #[test]
    fn test_hover_and_selection_coexist() {
        let map = map();
        let mut c = controller();
        let f = feature("F", 25.0330, 121.5654);
        let g = feature("G", 25.0340, 121.5664);

        assert!(matches!(c.select(&f, &map), Transition::Selected { .. }));
        assert!(matches!(c.hover_enter(&g, &map), Transition::HoverEntered { .. }));

        assert_eq!(c.state().selected_feature_id.as_deref(), Some("F"));
        assert_eq!(c.state().hovered_feature_id.as_deref(), Some("G"));
    }

    #[test]
    fn test_repeated_hover_does_not_reproject() {
        let map = map();
        let mut c = controller();
        let f = feature("F", 25.0330, 121.5654);

        c.hover_enter(&f, &map);
        let calls = map.project_calls();
        assert!(calls > 0);

        assert_eq!(c.hover_enter(&f, &map), Transition::Ignored);
        assert_eq!(map.project_calls(), calls);
    }

    #[test]
    fn test_hover_card_offset_from_anchor() {
        let map = map();
        let mut c = controller();
        // the map centre sits in the middle of the 800x600 viewport
        let f = feature("F", 25.0330, 121.5654);

        let Transition::HoverEntered { card_position, .. } = c.hover_enter(&f, &map) else {
            panic!("expected hover");
        };
        assert!((card_position.x - 400.0).abs() < 1e-6, "{:?}", card_position);
        assert!((card_position.y - (300.0 - 44.0)).abs() < 1e-6, "{:?}", card_position);
    }

    #[test]
    fn test_hover_leave_only_for_hovered() {
        let map = map();
        let mut c = controller();
        c.hover_enter(&feature("F", 25.0, 121.5), &map);

        assert_eq!(c.hover_leave("other"), Transition::Ignored);
        assert_eq!(
            c.hover_leave("F"),
            Transition::HoverLeft {
                feature_id: "F".to_string()
            }
        );
        assert!(c.state().is_idle());
        assert!(c.state().hover_card_position.is_none());
    }

    #[test]
    fn test_mobile_never_hovers() {
        let map = map();
        let mut c = InteractionController::new(InteractionConfig {
            mobile: true,
            ..Default::default()
        });
        assert_eq!(c.hover_enter(&feature("F", 25.0, 121.5), &map), Transition::Ignored);
        assert!(c.state().hovered_feature_id.is_none());
    }

    #[test]
    fn test_select_clears_hover_and_measures_distance() {
        let map = map();
        let mut c = InteractionController::new(InteractionConfig {
            reference_point: Some(LatLng::new(25.0478, 121.5170)),
            ..Default::default()
        });
        let f = feature("F", 25.0330, 121.5654);

        c.hover_enter(&f, &map);
        let Transition::Selected { distance_km, .. } = c.select(&f, &map) else {
            panic!("expected selection");
        };

        assert!(c.state().hovered_feature_id.is_none());
        let d = distance_km.unwrap();
        assert!(d > 4.0 && d < 6.0, "got {}", d);
        assert_eq!(c.state().selected_distance_km, distance_km);
        assert!(c.state().selected_card_position.is_some());
    }

    #[test]
    fn test_select_without_reference_leaves_distance_unset() {
        let map = map();
        let mut c = controller();
        c.select(&feature("F", 25.0, 121.5), &map);
        assert_eq!(c.state().selected_distance_km, None);
    }

    #[test]
    fn test_reselect_is_ignored_and_switch_reports_previous() {
        let map = map();
        let mut c = controller();
        let f = feature("F", 25.0, 121.5);
        let g = feature("G", 25.1, 121.6);

        c.select(&f, &map);
        assert_eq!(c.select(&f, &map), Transition::Ignored);

        let Transition::Selected { previous, .. } = c.select(&g, &map) else {
            panic!("expected selection");
        };
        assert_eq!(previous.as_deref(), Some("F"));
    }

    #[test]
    fn test_deselect() {
        let map = map();
        let mut c = controller();
        assert_eq!(c.deselect(), Transition::Ignored);

        c.select(&feature("F", 25.0, 121.5), &map);
        assert_eq!(
            c.deselect(),
            Transition::Deselected {
                feature_id: "F".to_string()
            }
        );
        assert!(c.state().selected_card_position.is_none());
    }

    #[test]
    fn test_zoom_burst_settles_once_after_last_event() {
        let mut c = controller();
        let start = Instant::now();

        assert_eq!(c.zoom_changed(start), Transition::ZoomStarted);
        for i in 1..5 {
            let at = start + Duration::from_millis(10 * i);
            assert_eq!(c.zoom_changed(at), Transition::ZoomExtended);
        }
        let last = start + Duration::from_millis(40);
        assert_eq!(c.quiescence_deadline(), Some(last + Duration::from_millis(250)));

        assert_eq!(c.poll_quiescence(last + Duration::from_millis(249)), Transition::Ignored);
        assert!(c.state().is_zooming);
        assert_eq!(c.poll_quiescence(last + Duration::from_millis(250)), Transition::ZoomSettled);
        assert!(!c.state().is_zooming);
        assert_eq!(c.poll_quiescence(last + Duration::from_millis(500)), Transition::Ignored);
    }

    #[test]
    fn test_no_hover_while_zooming() {
        let map = map();
        let mut c = controller();
        c.zoom_changed(Instant::now());
        assert_eq!(c.hover_enter(&feature("F", 25.0, 121.5), &map), Transition::Ignored);
    }

    #[test]
    fn test_route_applies_only_to_current_selection() {
        let map = map();
        let mut c = controller();
        c.select(&feature("F", 25.0, 121.5), &map);

        let outcome = RouteOutcome::Success {
            distance_text: "5.2 km".to_string(),
            duration_text: "14 mins".to_string(),
        };
        assert_eq!(c.route_resolved("G", outcome.clone()), Transition::Ignored);
        assert!(c.state().last_route_result.is_none());

        assert!(matches!(c.route_resolved("F", outcome.clone()), Transition::RouteApplied { .. }));
        assert_eq!(c.state().last_route_result.as_ref().unwrap().outcome, outcome);
    }

    #[test]
    fn test_reset_clears_everything() {
        let map = map();
        let mut c = controller();
        c.select(&feature("F", 25.0, 121.5), &map);
        c.zoom_changed(Instant::now());

        c.reset();
        assert_eq!(c.state(), &InteractionState::default());
        assert!(c.quiescence_deadline().is_none());
    }
}
