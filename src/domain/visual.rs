use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Feature,
    Cluster,
}

/// Visual state of a feature marker, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureVisualState {
    Selected,
    LowestPrice,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub fill: String,
    pub border: String,
    pub text: String,
}

impl Palette {
    pub fn new(fill: &str, border: &str, text: &str) -> Self {
        Self {
            fill: fill.to_string(),
            border: border.to_string(),
            text: text.to_string(),
        }
    }
}

/// Vector description of a marker icon, independent of any output format.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum MarkerGeometry {
    Pill {
        width: f64,
        height: f64,
        corner_radius: f64,
        label: String,
        font_size: f64,
        palette: Palette,
    },
    Bubble {
        radius: f64,
        label: String,
        font_size: f64,
        palette: Palette,
    },
}

impl MarkerGeometry {
    pub fn width(&self) -> f64 {
        match self {
            MarkerGeometry::Pill { width, .. } => *width,
            MarkerGeometry::Bubble { radius, .. } => radius * 2.0,
        }
    }

    pub fn height(&self) -> f64 {
        match self {
            MarkerGeometry::Pill { height, .. } => *height,
            MarkerGeometry::Bubble { radius, .. } => radius * 2.0,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            MarkerGeometry::Pill { label, .. } | MarkerGeometry::Bubble { label, .. } => label,
        }
    }
}

/// Anchor offset in icon pixels, measured from the icon's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnchorPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerVisual {
    pub kind: MarkerKind,
    pub state: Option<FeatureVisualState>,
    pub geometry: MarkerGeometry,
    pub anchor: AnchorPoint,
    pub z_index: i32,
}
