pub mod assets;
pub mod traffic;
pub mod usage;

use crate::utils::query_utils::parse_query;
use std::collections::HashMap;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// HTTP 请求信息
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub query_params: HashMap<String, String>,
}

impl HttpRequest {
    #[cfg(test)]
    pub fn get(path_with_query: &str) -> Self {
        let (path, query_params) = split_target(path_with_query);
        Self {
            method: "GET".to_string(),
            path,
            query_params,
        }
    }

    /// Query parameter value; an empty value counts as absent.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query_params
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// HTTP 响应
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn ok(content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            content_type: content_type.to_string(),
            body: body.into(),
        }
    }

    pub fn json(body: String) -> Self {
        Self::ok("application/json", body)
    }

    pub fn html(body: String) -> Self {
        Self::ok("text/html; charset=utf-8", body)
    }

    pub fn error(status: u16, message: String) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8".to_string(),
            body: message.into_bytes(),
        }
    }

    pub fn not_found() -> Self {
        Self::error(404, "Not Found".to_string())
    }

    pub fn method_not_allowed() -> Self {
        Self::error(405, "Method Not Allowed".to_string())
    }

    #[cfg(test)]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// 不同模块的 API 处理程序枚举
#[derive(Clone)]
pub enum ApiHandler {
    Usage(crate::api::usage::UsageApiHandler),
    Traffic(crate::api::traffic::TrafficApiHandler),
    Assets(crate::api::assets::AssetsHandler),
}

impl ApiHandler {
    pub fn module_name(&self) -> &'static str {
        match self {
            ApiHandler::Usage(_) => "usage",
            ApiHandler::Traffic(_) => "traffic",
            ApiHandler::Assets(_) => "assets",
        }
    }

    /// Routes ending in `/` match by prefix, all others exactly.
    pub fn supported_routes(&self) -> Vec<&'static str> {
        match self {
            ApiHandler::Usage(handler) => handler.supported_routes(),
            ApiHandler::Traffic(handler) => handler.supported_routes(),
            ApiHandler::Assets(handler) => handler.supported_routes(),
        }
    }

    pub async fn handle_request(
        &self,
        request: &HttpRequest,
    ) -> Result<HttpResponse, anyhow::Error> {
        match self {
            ApiHandler::Usage(handler) => handler.handle_request(request).await,
            ApiHandler::Traffic(handler) => handler.handle_request(request).await,
            ApiHandler::Assets(handler) => handler.handle_request(request).await,
        }
    }
}

fn route_matches(route: &str, path: &str) -> bool {
    if route.len() > 1 && route.ends_with('/') {
        path.starts_with(route)
    } else {
        path == route
    }
}

/// API 路由器，用于管理模块 API 处理程序
#[derive(Clone)]
pub struct ApiRouter {
    handlers: HashMap<String, ApiHandler>,
}

impl ApiRouter {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register an API handler for a module
    pub fn register_handler(&mut self, handler: ApiHandler) {
        self.handlers
            .insert(handler.module_name().to_string(), handler);
    }

    /// Route a request to the appropriate handler
    pub async fn route_request(
        &self,
        request: &HttpRequest,
    ) -> Result<HttpResponse, anyhow::Error> {
        for handler in self.handlers.values() {
            for route in handler.supported_routes() {
                if route_matches(route, &request.path) {
                    if request.method != "GET" {
                        return Ok(HttpResponse::method_not_allowed());
                    }
                    return handler.handle_request(request).await;
                }
            }
        }

        Ok(HttpResponse::not_found())
    }
}

fn split_target(target: &str) -> (String, HashMap<String, String>) {
    match target.split_once('?') {
        Some((path, query)) => (path.to_string(), parse_query(query)),
        None => (target.to_string(), HashMap::new()),
    }
}

/// 从原始字节解析 HTTP 请求头
pub fn parse_http_request(request_bytes: &[u8]) -> Result<HttpRequest, anyhow::Error> {
    let request_str = String::from_utf8_lossy(request_bytes);
    let request_line = request_str
        .lines()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Empty request"))?;

    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 2 {
        return Err(anyhow::anyhow!("Invalid request line"));
    }

    let (path, query_params) = split_target(parts[1]);

    Ok(HttpRequest {
        method: parts[0].to_string(),
        path,
        query_params,
    })
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// 向客户端发送 HTTP 响应
pub async fn send_http_response(
    stream: &mut TcpStream,
    response: &HttpResponse,
) -> Result<(), anyhow::Error> {
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        status_text(response.status),
        response.content_type,
        response.body.len(),
    );

    stream.write_all(head.as_bytes()).await?;
    stream.write_all(&response.body).await?;
    stream.flush().await?;
    Ok(())
}
