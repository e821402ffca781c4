use crate::config::RoutingConfig;
use crate::domain::model::LatLng;
use crate::domain::ports::{RouteLeg, RoutingService};
use crate::utils::error::{EngineError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct RouteResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<RouteBody>,
}

#[derive(Debug, Deserialize)]
struct RouteBody {
    distance: f64,
    duration: f64,
}

/// Client for an OSRM-compatible `/route/v1` HTTP API.
pub struct HttpRoutingService {
    client: Client,
    endpoint: String,
    profile: String,
}

impl HttpRoutingService {
    pub fn new(config: &RoutingConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| EngineError::MissingConfigError {
                field: "routing.endpoint".to_string(),
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            profile: config.profile.clone(),
        })
    }

    fn route_url(&self, origin: LatLng, destination: LatLng) -> String {
        format!(
            "{}/route/v1/{}/{},{};{},{}",
            self.endpoint, self.profile, origin.lng, origin.lat, destination.lng, destination.lat
        )
    }
}

#[async_trait]
impl RoutingService for HttpRoutingService {
    async fn route(&self, origin: LatLng, destination: LatLng) -> Result<RouteLeg> {
        let url = self.route_url(origin, destination);
        tracing::debug!("Requesting route: {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("overview", "false")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::RoutingError {
                message: format!("Routing service returned {}", status),
            });
        }

        let body: RouteResponse = response.json().await?;
        if body.code != "Ok" {
            return Err(EngineError::RoutingError {
                message: body.message.unwrap_or(body.code),
            });
        }

        let route = body.routes.first().ok_or_else(|| EngineError::RoutingError {
            message: "No route found".to_string(),
        })?;

        Ok(RouteLeg {
            distance_meters: route.distance,
            duration_seconds: route.duration,
        })
    }
}

/// Stand-in used when no routing endpoint is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRouting;

#[async_trait]
impl RoutingService for NoRouting {
    async fn route(&self, _origin: LatLng, _destination: LatLng) -> Result<RouteLeg> {
        Err(EngineError::RoutingError {
            message: "No routing endpoint configured".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_endpoint() {
        let result = HttpRoutingService::new(&RoutingConfig::default());
        assert!(matches!(result, Err(EngineError::MissingConfigError { .. })));
    }

    #[test]
    fn test_route_url_is_lng_lat_ordered() {
        let service = HttpRoutingService::new(&RoutingConfig {
            endpoint: Some("http://router.local/".to_string()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(
            service.route_url(LatLng::new(25.5, 121.25), LatLng::new(25.75, 121.5)),
            "http://router.local/route/v1/driving/121.25,25.5;121.5,25.75"
        );
    }

    #[tokio::test]
    async fn test_no_routing_fails() {
        let result = NoRouting.route(LatLng::new(0.0, 0.0), LatLng::new(1.0, 1.0)).await;
        tokio_test::assert_err!(result);
    }
}
