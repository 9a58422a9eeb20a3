use crate::api::{parse_http_request, send_http_response, ApiRouter, HttpResponse};
use crate::command::Options;
use log::{debug, error, info};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

const MAX_HEADER_BYTES: usize = 16 * 1024;

// 简单的HTTP服务器，仅依赖于tokio
pub async fn start_server(
    options: Options,
    api_router: ApiRouter,
    shutdown_notify: Arc<tokio::sync::Notify>,
) -> Result<(), anyhow::Error> {
    let addr = format!("0.0.0.0:{}", options.port());
    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);

    serve(listener, options, api_router, shutdown_notify).await
}

pub async fn serve(
    listener: TcpListener,
    options: Options,
    api_router: ApiRouter,
    shutdown_notify: Arc<tokio::sync::Notify>,
) -> Result<(), anyhow::Error> {
    // 只创建一次，循环间隙到达的关闭信号也不会丢失
    let shutdown = shutdown_notify.notified();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                let api_router = api_router.clone();
                let options = options.clone();

                // 每个请求独立处理，互不共享可变状态
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, &options, &api_router).await {
                        error!("Error handling connection from {}: {}", peer, e);
                    }
                });
            }
            _ = &mut shutdown => {
                info!("Web server received shutdown signal, stopping...");
                break;
            }
        }
    }

    Ok(())
}

// Read until the end of the request head, bounded by size.
async fn read_request_head(stream: &mut TcpStream) -> Result<Vec<u8>, anyhow::Error> {
    let mut buffer = Vec::with_capacity(4096);
    let mut chunk = [0u8; 4096];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
        if buffer.windows(4).any(|w| w == b"\r\n\r\n") || buffer.len() >= MAX_HEADER_BYTES {
            break;
        }
    }

    Ok(buffer)
}

async fn handle_connection(
    mut stream: TcpStream,
    options: &Options,
    api_router: &ApiRouter,
) -> Result<(), anyhow::Error> {
    let started = Instant::now();
    let read_timeout = Duration::from_secs(options.read_timeout_secs());
    let write_timeout = Duration::from_secs(options.write_timeout_secs());

    let raw = match timeout(read_timeout, read_request_head(&mut stream)).await {
        Ok(result) => result?,
        Err(_) => {
            debug!("Request read timed out after {:?}", read_timeout);
            let response = HttpResponse::error(408, "Request Timeout".to_string());
            let _ = timeout(write_timeout, send_http_response(&mut stream, &response)).await;
            return Ok(());
        }
    };
    if raw.is_empty() {
        return Ok(());
    }

    let (summary, response) = match parse_http_request(&raw) {
        Ok(request) => {
            let summary = format!("{} {}", request.method, request.path);
            let response = match api_router.route_request(&request).await {
                Ok(response) => response,
                Err(e) => {
                    error!("Handler error for {}: {}", summary, e);
                    HttpResponse::error(500, e.to_string())
                }
            };
            (summary, response)
        }
        Err(e) => (
            "<invalid>".to_string(),
            HttpResponse::error(400, e.to_string()),
        ),
    };

    timeout(write_timeout, send_http_response(&mut stream, &response))
        .await
        .map_err(|_| anyhow::anyhow!("response write timed out after {:?}", write_timeout))??;

    if options.web_log() {
        info!(
            "{} -> {} ({} bytes, {} ms)",
            summary,
            response.status,
            response.body.len(),
            started.elapsed().as_millis()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::assets::AssetsHandler;
    use crate::api::traffic::TrafficApiHandler;
    use crate::api::usage::UsageApiHandler;
    use crate::api::ApiHandler;
    use crate::upstream::{UpstreamClient, UpstreamConfig};
    use clap::Parser;
    use tokio::io::AsyncWriteExt;

    async fn spawn_server(upstream_url: &str) -> (std::net::SocketAddr, Arc<tokio::sync::Notify>) {
        let options = Options::parse_from(["sbdash", "--upstream-token", "secret"]);
        let upstream = UpstreamClient::new(&UpstreamConfig::new(upstream_url, "secret")).unwrap();

        let mut router = ApiRouter::new();
        router.register_handler(ApiHandler::Usage(UsageApiHandler::new(upstream.clone())));
        router.register_handler(ApiHandler::Traffic(TrafficApiHandler::new(upstream)));
        router.register_handler(ApiHandler::Assets(AssetsHandler::new(
            std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("static"),
        )));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(tokio::sync::Notify::new());
        let shutdown_for_server = shutdown.clone();
        tokio::spawn(async move {
            serve(listener, options, router, shutdown_for_server)
                .await
                .unwrap();
        });
        (addr, shutdown)
    }

    async fn raw_request(addr: std::net::SocketAddr, request: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        String::from_utf8_lossy(&response).into_owned()
    }

    #[tokio::test]
    async fn test_end_to_end_routes() {
        // Nothing listens upstream; only routes that never reach it are exercised.
        let (addr, shutdown) = spawn_server("http://127.0.0.1:9").await;

        let response = raw_request(addr, "GET /api/traffic HTTP/1.1\r\nHost: x\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 404"), "{response}");

        let response = raw_request(addr, "GET / HTTP/1.1\r\nHost: x\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 404"), "{response}");

        let response = raw_request(addr, "POST /api/traffic?user=a HTTP/1.1\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 405"), "{response}");

        let response = raw_request(addr, "GET /static/style.css HTTP/1.1\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert!(response.contains("Content-Type: text/css"));

        let response = raw_request(addr, "GET /api/traffic?user=alice HTTP/1.1\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 500"), "{response}");

        shutdown.notify_one();
    }

    #[tokio::test]
    async fn test_shutdown_before_first_accept_stops_server() {
        let options = Options::parse_from(["sbdash", "--upstream-token", "secret"]);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let shutdown = Arc::new(tokio::sync::Notify::new());

        // Signal lands before the accept loop has polled anything.
        shutdown.notify_one();
        let server = tokio::spawn(serve(listener, options, ApiRouter::new(), shutdown.clone()));

        let result = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server did not stop")
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_between_connections_stops_server() {
        let (addr, shutdown) = spawn_server("http://127.0.0.1:9").await;

        let response = raw_request(addr, "GET /nope HTTP/1.1\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 404"), "{response}");

        shutdown.notify_one();
        tokio::time::sleep(Duration::from_millis(200)).await;

        // The accept loop has exited and dropped the listener.
        assert!(TcpStream::connect(addr).await.is_err());
    }
}
