use super::{HttpRequest, HttpResponse};
use log::debug;
use std::path::{Component, Path, PathBuf};

/// Serves files under `/static/` from a directory on disk.
#[derive(Clone)]
pub struct AssetsHandler {
    root: PathBuf,
}

impl AssetsHandler {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn supported_routes(&self) -> Vec<&'static str> {
        vec!["/static/"]
    }

    pub async fn handle_request(
        &self,
        request: &HttpRequest,
    ) -> Result<HttpResponse, anyhow::Error> {
        let Some(relative) = request.path.strip_prefix("/static/") else {
            return Ok(HttpResponse::not_found());
        };
        let Some(file) = resolve(&self.root, relative) else {
            debug!("Rejected static path {}", request.path);
            return Ok(HttpResponse::not_found());
        };

        match tokio::fs::read(&file).await {
            Ok(bytes) => Ok(HttpResponse::ok(content_type(&file), bytes)),
            Err(_) => Ok(HttpResponse::not_found()),
        }
    }
}

// Only plain path segments are allowed; `..`, absolute paths and empty names are rejected.
fn resolve(root: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    if relative.as_os_str().is_empty() {
        return None;
    }
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(relative))
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "application/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("ico") => "image/x-icon",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}
