use crate::api::assets::AssetsHandler;
use crate::api::traffic::TrafficApiHandler;
use crate::api::usage::UsageApiHandler;
use crate::api::{ApiHandler, ApiRouter};
use crate::system::log_startup_info;
use crate::upstream::{UpstreamClient, UpstreamConfig};
use crate::web;
use clap::{Args, Parser};
use log::info;
use log::LevelFilter;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

/// Common arguments for the web server
#[derive(Debug, Args, Clone)]
pub struct CommonArgs {
    #[clap(long, default_value = "2097", help = "Web server listening port")]
    pub port: u16,

    #[clap(
        long,
        default_value = "static",
        help = "Directory served under /static/"
    )]
    pub static_dir: String,

    #[clap(
        long,
        default_value = "false",
        help = "Enable web request logging (per-HTTP-request line)"
    )]
    pub web_log: bool,

    #[clap(
        long,
        default_value = "5",
        help = "Seconds allowed for reading a request"
    )]
    pub read_timeout_secs: u64,

    #[clap(
        long,
        default_value = "5",
        help = "Seconds allowed for writing a response"
    )]
    pub write_timeout_secs: u64,
}

/// Upstream panel API arguments
#[derive(Debug, Args, Clone)]
pub struct UpstreamArgs {
    #[clap(
        long,
        default_value = "http://127.0.0.1:2095/app/apiv2",
        help = "Base URL of the panel API"
    )]
    pub upstream_url: String,

    #[clap(
        long,
        env = "SBDASH_TOKEN",
        hide_env_values = true,
        help = "API token sent in the `Token` header (required)"
    )]
    pub upstream_token: String,

    #[clap(
        long,
        default_value = "10",
        help = "Timeout (seconds) for each upstream request"
    )]
    pub upstream_timeout_secs: u64,
}

#[derive(Debug, Parser, Clone)]
#[clap(name = "sbdash")]
#[clap(version = env!("CARGO_PKG_VERSION"))]
#[clap(about = "Per-user usage page and traffic chart backed by the panel API")]
pub struct Options {
    #[clap(flatten)]
    pub common: CommonArgs,

    #[clap(flatten)]
    pub upstream: UpstreamArgs,
}

impl Options {
    /// Get port from common args
    pub fn port(&self) -> u16 {
        self.common.port
    }

    /// Get static_dir from common args
    pub fn static_dir(&self) -> &str {
        &self.common.static_dir
    }

    /// Get web_log from common args
    pub fn web_log(&self) -> bool {
        self.common.web_log
    }

    pub fn read_timeout_secs(&self) -> u64 {
        self.common.read_timeout_secs
    }

    pub fn write_timeout_secs(&self) -> u64 {
        self.common.write_timeout_secs
    }

    /// Get upstream_url from upstream args
    pub fn upstream_url(&self) -> &str {
        &self.upstream.upstream_url
    }

    pub fn upstream_token(&self) -> &str {
        &self.upstream.upstream_token
    }

    pub fn upstream_timeout_secs(&self) -> u64 {
        self.upstream.upstream_timeout_secs
    }

    pub fn upstream_config(&self) -> UpstreamConfig {
        UpstreamConfig::new(self.upstream_url(), self.upstream_token())
            .with_timeout(Duration::from_secs(self.upstream_timeout_secs()))
    }
}

// Validate arguments
fn validate_arguments(opt: &Options) -> Result<(), anyhow::Error> {
    if opt.port() == 0 {
        return Err(anyhow::anyhow!("Port number cannot be 0"));
    }

    if opt.read_timeout_secs() == 0 || opt.write_timeout_secs() == 0 {
        return Err(anyhow::anyhow!(
            "read_timeout_secs and write_timeout_secs must be greater than 0"
        ));
    }

    if opt.upstream_timeout_secs() == 0 {
        return Err(anyhow::anyhow!(
            "upstream_timeout_secs must be greater than 0"
        ));
    }

    let url = url::Url::parse(opt.upstream_url())
        .map_err(|e| anyhow::anyhow!("Invalid upstream URL '{}': {}", opt.upstream_url(), e))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(anyhow::anyhow!(
            "Upstream URL must use http or https, got '{}'",
            url.scheme()
        ));
    }

    if opt.upstream_token().trim().is_empty() {
        return Err(anyhow::anyhow!("Upstream token cannot be empty"));
    }

    Ok(())
}

// Build the router: usage page, traffic series and static assets
fn build_api_router(options: &Options) -> Result<ApiRouter, anyhow::Error> {
    let upstream = UpstreamClient::new(&options.upstream_config())?;

    let mut api_router = ApiRouter::new();
    api_router.register_handler(ApiHandler::Usage(UsageApiHandler::new(upstream.clone())));
    api_router.register_handler(ApiHandler::Traffic(TrafficApiHandler::new(upstream)));
    api_router.register_handler(ApiHandler::Assets(AssetsHandler::new(
        options.static_dir(),
    )));

    Ok(api_router)
}

// Run service: start web server and wait for shutdown
async fn run_service(options: &Options) -> Result<(), anyhow::Error> {
    // Use Notify for graceful shutdown
    let shutdown_notify = Arc::new(tokio::sync::Notify::new());
    let shutdown_notify_clone = shutdown_notify.clone();

    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, gracefully shutting down...");
            shutdown_notify_clone.notify_one();
        }
    });

    let api_router = build_api_router(options)?;

    web::start_server(options.clone(), api_router, shutdown_notify).await?;

    info!("Web server stopped, program exiting");

    Ok(())
}

pub async fn run(options: Options) -> Result<(), anyhow::Error> {
    // Validate arguments
    validate_arguments(&options)?;

    // Set up logging
    env_logger::Builder::new()
        .filter(None, LevelFilter::Info)
        .parse_default_env()
        .target(env_logger::Target::Stdout)
        .init();

    // Startup diagnostics
    log_startup_info(&options);

    run_service(&options).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Options {
        let mut argv = vec!["sbdash"];
        argv.extend_from_slice(args);
        Options::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let opt = parse(&["--upstream-token", "t"]);
        assert_eq!(opt.port(), 2097);
        assert_eq!(opt.static_dir(), "static");
        assert_eq!(opt.read_timeout_secs(), 5);
        assert_eq!(opt.write_timeout_secs(), 5);
        assert_eq!(opt.upstream_url(), "http://127.0.0.1:2095/app/apiv2");
        assert!(!opt.web_log());
        assert!(validate_arguments(&opt).is_ok());

        let config = opt.upstream_config();
        assert_eq!(config.token, "t");
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_validation_failures() {
        for args in [
            &["--upstream-token", "t", "--port", "0"][..],
            &["--upstream-token", "t", "--read-timeout-secs", "0"][..],
            &["--upstream-token", "t", "--upstream-timeout-secs", "0"][..],
            &["--upstream-token", "t", "--upstream-url", "ftp://host/api"][..],
            &["--upstream-token", "t", "--upstream-url", "no scheme"][..],
            &["--upstream-token", "  "][..],
        ] {
            assert!(validate_arguments(&parse(args)).is_err(), "{args:?}");
        }
    }

    #[test]
    fn test_router_registers_all_modules() {
        let opt = parse(&["--upstream-token", "t"]);
        assert!(build_api_router(&opt).is_ok());
    }
}
