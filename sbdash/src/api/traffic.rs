use super::{HttpRequest, HttpResponse};
use crate::traffic::{aggregate_traffic, TrafficWindow};
use crate::upstream::UpstreamClient;
use log::debug;

/// 流量图表 API handler
#[derive(Clone)]
pub struct TrafficApiHandler {
    upstream: UpstreamClient,
}

impl TrafficApiHandler {
    pub fn new(upstream: UpstreamClient) -> Self {
        Self { upstream }
    }

    pub fn supported_routes(&self) -> Vec<&'static str> {
        vec!["/api/traffic"]
    }

    pub async fn handle_request(
        &self,
        request: &HttpRequest,
    ) -> Result<HttpResponse, anyhow::Error> {
        match request.path.as_str() {
            "/api/traffic" => self.handle_traffic(request).await,
            _ => Ok(HttpResponse::not_found()),
        }
    }

    /// 处理 /api/traffic?user=..&limit=.. endpoint
    async fn handle_traffic(&self, request: &HttpRequest) -> Result<HttpResponse, anyhow::Error> {
        let Some(user) = request.param("user") else {
            return Ok(HttpResponse::not_found());
        };

        let window = TrafficWindow::from_selector(request.param("limit").unwrap_or_default());

        let samples = match self.upstream.user_stats(user, window.hours()).await {
            Ok(samples) => samples,
            Err(e) => return Ok(HttpResponse::error(500, e.to_string())),
        };

        let points = aggregate_traffic(&samples);
        debug!(
            "Aggregated {} samples into {} points for {} ({}h)",
            samples.len(),
            points.len(),
            user,
            window.hours()
        );

        let body = serde_json::to_string(&points)?;
        Ok(HttpResponse::json(body))
    }
}
