use crate::domain::model::{FeatureId, RouteOutcome, ScreenPoint};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteRecord {
    pub feature_id: FeatureId,
    pub outcome: RouteOutcome,
    pub resolved_at: DateTime<Utc>,
}

/// Interaction state of one map surface. Written only by the
/// interaction controller; everything else reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InteractionState {
    pub hovered_feature_id: Option<FeatureId>,
    pub selected_feature_id: Option<FeatureId>,
    pub is_zooming: bool,
    pub last_route_result: Option<RouteRecord>,
    pub hover_card_position: Option<ScreenPoint>,
    pub selected_card_position: Option<ScreenPoint>,
    /// Straight-line distance from the reference point to the selection.
    pub selected_distance_km: Option<f64>,
}

impl InteractionState {
    pub fn is_selected(&self, feature_id: &str) -> bool {
        self.selected_feature_id.as_deref() == Some(feature_id)
    }

    pub fn is_hovered(&self, feature_id: &str) -> bool {
        self.hovered_feature_id.as_deref() == Some(feature_id)
    }

    pub fn is_idle(&self) -> bool {
        self.hovered_feature_id.is_none() && self.selected_feature_id.is_none()
    }
}
