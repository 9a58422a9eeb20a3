use super::{HttpRequest, HttpResponse};
use crate::upstream::UpstreamClient;
use crate::usage::UsageView;
use askama::Template;

#[derive(Template)]
#[template(path = "usage.html")]
struct UsagePage<'a> {
    view: &'a UsageView,
}

/// 用户用量页面 handler
#[derive(Clone)]
pub struct UsageApiHandler {
    upstream: UpstreamClient,
}

impl UsageApiHandler {
    pub fn new(upstream: UpstreamClient) -> Self {
        Self { upstream }
    }

    pub fn supported_routes(&self) -> Vec<&'static str> {
        vec!["/"]
    }

    pub async fn handle_request(
        &self,
        request: &HttpRequest,
    ) -> Result<HttpResponse, anyhow::Error> {
        match request.path.as_str() {
            "/" => self.handle_page(request).await,
            _ => Ok(HttpResponse::not_found()),
        }
    }

    /// Fetch status and clients, then build the view for `user`.
    /// `Ok(None)` when the user is missing or unknown.
    pub async fn usage_view(
        &self,
        request: &HttpRequest,
    ) -> Result<Option<UsageView>, crate::upstream::UpstreamError> {
        let Some(user) = request.param("user") else {
            return Ok(None);
        };

        let status = self.upstream.status().await?;
        let clients = self.upstream.clients().await?;

        Ok(clients
            .find(user)
            .map(|client| UsageView::build(&status, client)))
    }

    /// 处理 /?user=.. 页面
    async fn handle_page(&self, request: &HttpRequest) -> Result<HttpResponse, anyhow::Error> {
        let view = match self.usage_view(request).await {
            Ok(Some(view)) => view,
            Ok(None) => return Ok(HttpResponse::not_found()),
            Err(e) => return Ok(HttpResponse::error(500, e.to_string())),
        };

        let html = UsagePage { view: &view }.render()?;
        Ok(HttpResponse::html(html))
    }
}
