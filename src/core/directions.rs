use crate::domain::model::{LatLng, RouteOutcome};
use crate::domain::ports::RoutingService;
use std::sync::Arc;

/// Single-attempt route lookup that reports failures as values.
#[derive(Clone)]
pub struct DirectionsAdapter {
    routing: Arc<dyn RoutingService>,
}

impl DirectionsAdapter {
    pub fn new(routing: Arc<dyn RoutingService>) -> Self {
        Self { routing }
    }

    pub async fn get_route(&self, origin: LatLng, destination: LatLng) -> RouteOutcome {
        match self.routing.route(origin, destination).await {
            Ok(leg) if leg.distance_meters.is_finite() && leg.duration_seconds.is_finite() => {
                RouteOutcome::Success {
                    distance_text: format_distance(leg.distance_meters),
                    duration_text: format_duration(leg.duration_seconds),
                }
            }
            Ok(leg) => RouteOutcome::Failure {
                error: format!("Routing service returned an unusable leg: {:?}", leg),
            },
            Err(e) => {
                tracing::warn!("Directions lookup failed: {}", e);
                RouteOutcome::Failure {
                    error: e.user_friendly_message(),
                }
            }
        }
    }
}

pub fn format_distance(meters: f64) -> String {
    let rounded = meters.max(0.0).round();
    if rounded < 1000.0 {
        format!("{} m", rounded as u64)
    } else {
        format!("{:.1} km", meters / 1000.0)
    }
}

pub fn format_duration(seconds: f64) -> String {
    let minutes = ((seconds.max(0.0) / 60.0).round() as u64).max(1);
    let plural = |n: u64, unit: &str| {
        if n == 1 {
            format!("1 {}", unit)
        } else {
            format!("{} {}s", n, unit)
        }
    };

    if minutes < 60 {
        return plural(minutes, "min");
    }
    let hours = minutes / 60;
    let rest = minutes % 60;
    if rest == 0 {
        plural(hours, "hour")
    } else {
        format!("{} {}", plural(hours, "hour"), plural(rest, "min"))
    }
}
