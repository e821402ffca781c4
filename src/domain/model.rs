use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub type FeatureId = String;

/// Provider group used for listings that carry no provider id.
pub const UNKNOWN_PROVIDER: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Geographic rectangle. `west > east` means the box crosses the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    pub fn world() -> Self {
        Self::new(-90.0, -180.0, 90.0, 180.0)
    }

    /// Smallest box covering every position, `None` for an empty input.
    pub fn covering<'a, I>(positions: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a LatLng>,
    {
        let mut iter = positions.into_iter();
        let first = iter.next()?;
        let mut bbox = Self::new(first.lat, first.lng, first.lat, first.lng);
        for p in iter {
            bbox.south = bbox.south.min(p.lat);
            bbox.north = bbox.north.max(p.lat);
            bbox.west = bbox.west.min(p.lng);
            bbox.east = bbox.east.max(p.lng);
        }
        Some(bbox)
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    pub fn contains(&self, p: LatLng) -> bool {
        let lat_ok = p.lat >= self.south && p.lat <= self.north;
        let lng_ok = if self.crosses_antimeridian() {
            p.lng >= self.west || p.lng <= self.east
        } else {
            p.lng >= self.west && p.lng <= self.east
        };
        lat_ok && lng_ok
    }

    pub fn center(&self) -> LatLng {
        let lng = if self.crosses_antimeridian() {
            let mid = (self.west + self.east + 360.0) / 2.0;
            if mid > 180.0 {
                mid - 360.0
            } else {
                mid
            }
        } else {
            (self.west + self.east) / 2.0
        };
        LatLng::new((self.south + self.north) / 2.0, lng)
    }
}

/// Point in the map service's zoom-0 world coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldPoint {
    pub x: f64,
    pub y: f64,
}

/// Pixel position relative to the top-left corner of the visible map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn offset_by(self, offset: ScreenPoint) -> ScreenPoint {
        ScreenPoint {
            x: self.x + offset.x,
            y: self.y + offset.y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub bounds: BoundingBox,
    pub zoom: u8,
}

/// Position as delivered by upstream sources: `"lat,lng"` text or an object
/// with `lat`/`lng` fields holding numbers or numeric strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPosition {
    Text(String),
    Structured {
        #[serde(default, alias = "latitude")]
        lat: Value,
        #[serde(default, alias = "lon", alias = "long", alias = "longitude")]
        lng: Value,
    },
    Other(Value),
}

impl RawPosition {
    /// Resolve to a valid coordinate pair, `None` when anything is off.
    pub fn resolve(&self) -> Option<LatLng> {
        let position = match self {
            RawPosition::Text(text) => {
                let (lat, lng) = text.split_once(',')?;
                LatLng::new(lat.trim().parse().ok()?, lng.trim().parse().ok()?)
            }
            RawPosition::Structured { lat, lng } => {
                LatLng::new(coordinate_from_value(lat)?, coordinate_from_value(lng)?)
            }
            RawPosition::Other(_) => return None,
        };
        position.is_valid().then_some(position)
    }
}

fn coordinate_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Listing record as supplied by the marketplace. Fields the engine does not
/// interpret stay in `payload` untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    #[serde(deserialize_with = "id_from_value")]
    pub id: String,
    #[serde(default, alias = "provider_id", alias = "agencyId")]
    pub provider_id: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub position: Option<RawPosition>,
    #[serde(flatten)]
    pub payload: serde_json::Map<String, Value>,
}

fn id_from_value<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "listing id must be a string or number, got {}",
            other
        ))),
    }
}

impl Listing {
    pub fn new(id: impl Into<String>, provider_id: Option<&str>, price: f64, position: LatLng) -> Self {
        Self {
            id: id.into(),
            provider_id: provider_id.map(str::to_string),
            price,
            position: Some(RawPosition::Text(format!("{},{}", position.lat, position.lng))),
            payload: serde_json::Map::new(),
        }
    }
}

/// One listing resolved to a position and provider. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    pub id: FeatureId,
    pub provider_id: String,
    pub price: f64,
    pub position: LatLng,
    #[serde(skip)]
    pub payload: serde_json::Map<String, Value>,
}

/// Features of a single provider, ascending by price.
#[derive(Debug, Clone)]
pub struct ProviderGroup {
    pub provider_id: String,
    pub features: Vec<Arc<Feature>>,
}

impl ProviderGroup {
    pub fn lowest_price(&self) -> Option<&Arc<Feature>> {
        self.features.first()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MarkerKey {
    Feature(FeatureId),
    Cluster(u64),
}

/// Spatial group of features at one zoom level. A count of 1 is a singleton
/// and is keyed by its feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    pub key: MarkerKey,
    pub position: LatLng,
    pub count: usize,
    pub member_feature_ids: Vec<FeatureId>,
}

impl Cluster {
    pub fn is_singleton(&self) -> bool {
        self.count == 1
    }
}

/// Result of a directions lookup. Failures are values, never panics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RouteOutcome {
    Success {
        distance_text: String,
        duration_text: String,
    },
    Failure {
        error: String,
    },
}

impl RouteOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RouteOutcome::Success { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_position_text_and_structured() {
        let text: RawPosition = serde_json::from_value(serde_json::json!("25.03, 121.56")).unwrap();
        assert_eq!(text.resolve(), Some(LatLng::new(25.03, 121.56)));

        let structured: RawPosition =
            serde_json::from_value(serde_json::json!({"lat": "25.03", "lng": 121.56})).unwrap();
        assert_eq!(structured.resolve(), Some(LatLng::new(25.03, 121.56)));

        let long_names: RawPosition =
            serde_json::from_value(serde_json::json!({"latitude": 1.5, "longitude": 2.5})).unwrap();
        assert_eq!(long_names.resolve(), Some(LatLng::new(1.5, 2.5)));
    }

    #[test]
    fn test_raw_position_rejects_garbage() {
        for raw in [
            serde_json::json!("not a position"),
            serde_json::json!("12.5"),
            serde_json::json!({"lat": "abc", "lng": 1.0}),
            serde_json::json!({"lng": 1.0}),
            serde_json::json!({"lat": 95.0, "lng": 1.0}),
            serde_json::json!(42),
        ] {
            let position: RawPosition = serde_json::from_value(raw.clone()).unwrap();
            assert_eq!(position.resolve(), None, "{} should not resolve", raw);
        }
    }

    #[test]
    fn test_listing_keeps_payload() {
        let listing: Listing = serde_json::from_value(serde_json::json!({
            "id": 17,
            "providerId": "p1",
            "price": 800.0,
            "position": "10.0,20.0",
            "title": "Sea view loft",
            "rating": 4.5
        }))
        .unwrap();

        assert_eq!(listing.id, "17");
        assert_eq!(listing.provider_id.as_deref(), Some("p1"));
        assert_eq!(listing.payload["title"], "Sea view loft");
        assert!(!listing.payload.contains_key("price"));
    }

    #[test]
    fn test_bbox_antimeridian_contains() {
        let bbox = BoundingBox::new(-10.0, 170.0, 10.0, -170.0);
        assert!(bbox.crosses_antimeridian());
        assert!(bbox.contains(LatLng::new(0.0, 175.0)));
        assert!(bbox.contains(LatLng::new(0.0, -175.0)));
        assert!(!bbox.contains(LatLng::new(0.0, 0.0)));
    }
}
