use crate::config::MarkerConfig;
use crate::core::features::FeatureSet;
use crate::core::geo::format_price;
use crate::domain::model::{Cluster, Feature};
use crate::domain::state::InteractionState;
use crate::domain::visual::{
    AnchorPoint, FeatureVisualState, MarkerGeometry, MarkerKind, MarkerVisual,
};

pub const Z_INDEX_SELECTED: i32 = 1000;
pub const Z_INDEX_LOWEST_PRICE: i32 = 500;
pub const Z_INDEX_DEFAULT: i32 = 100;

const BUBBLE_RADII: [f64; 3] = [18.0, 22.0, 28.0];

/// Builds marker descriptors from features, clusters and the interaction
/// state. Holds configuration only.
#[derive(Debug, Clone)]
pub struct MarkerRenderer {
    config: MarkerConfig,
}

impl MarkerRenderer {
    pub fn new(config: MarkerConfig) -> Self {
        Self { config }
    }

    pub fn visual_state(
        feature: &Feature,
        feature_set: &FeatureSet,
        state: &InteractionState,
    ) -> FeatureVisualState {
        if state.is_selected(&feature.id) {
            FeatureVisualState::Selected
        } else if feature_set.is_lowest_price(&feature.id) {
            FeatureVisualState::LowestPrice
        } else {
            FeatureVisualState::Default
        }
    }

    /// Pill width for a label; grows with the text, never below the base width.
    pub fn pill_width(&self, label: &str) -> f64 {
        let text_width = label.chars().count() as f64 * self.config.per_char_width
            + self.config.horizontal_padding;
        text_width.max(self.config.base_width)
    }

    pub fn render_feature(
        &self,
        feature: &Feature,
        feature_set: &FeatureSet,
        state: &InteractionState,
    ) -> MarkerVisual {
        let visual_state = Self::visual_state(feature, feature_set, state);
        let (palette, z_index) = match visual_state {
            FeatureVisualState::Selected => (&self.config.selected, Z_INDEX_SELECTED),
            FeatureVisualState::LowestPrice => (&self.config.lowest_price, Z_INDEX_LOWEST_PRICE),
            FeatureVisualState::Default => (&self.config.default, Z_INDEX_DEFAULT),
        };

        let label = format_price(feature.price, &self.config.currency);
        let width = self.pill_width(&label);
        let height = self.config.height;

        MarkerVisual {
            kind: MarkerKind::Feature,
            state: Some(visual_state),
            geometry: MarkerGeometry::Pill {
                width,
                height,
                corner_radius: height / 2.0,
                label,
                font_size: self.config.font_size,
                palette: palette.clone(),
            },
            // bottom centre sits on the listing position
            anchor: AnchorPoint {
                x: width / 2.0,
                y: height,
            },
            z_index,
        }
    }

    pub fn bubble_radius(count: usize) -> f64 {
        match count {
            0..=9 => BUBBLE_RADII[0],
            10..=99 => BUBBLE_RADII[1],
            _ => BUBBLE_RADII[2],
        }
    }

    pub fn render_cluster(&self, cluster: &Cluster) -> MarkerVisual {
        let radius = Self::bubble_radius(cluster.count);
        MarkerVisual {
            kind: MarkerKind::Cluster,
            state: None,
            geometry: MarkerGeometry::Bubble {
                radius,
                label: cluster.count.to_string(),
                font_size: self.config.font_size,
                palette: self.config.cluster.clone(),
            },
            anchor: AnchorPoint {
                x: radius,
                y: radius,
            },
            z_index: Z_INDEX_DEFAULT,
        }
    }

    /// Singletons render as their feature, larger clusters as bubbles.
    /// `None` when a singleton's feature is not in the set.
    pub fn render(
        &self,
        cluster: &Cluster,
        feature_set: &FeatureSet,
        state: &InteractionState,
    ) -> Option<MarkerVisual> {
        if cluster.is_singleton() {
            let feature = feature_set.get(cluster.member_feature_ids.first()?)?;
            Some(self.render_feature(feature, feature_set, state))
        } else {
            Some(self.render_cluster(cluster))
        }
    }
}
