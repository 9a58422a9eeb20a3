use crate::command::Options;
use log::{info, warn};
use std::env;
use std::fs;
use std::path::Path;

// ---- 启动诊断信息 ----
fn read_first_line(path: &str) -> Option<String> {
    fs::read_to_string(path)
        .ok()
        .and_then(|s| s.lines().next().map(|l| l.trim().to_string()))
}

fn hostname() -> Option<String> {
    if let Some(h) = read_first_line("/proc/sys/kernel/hostname") {
        return Some(h);
    }
    read_first_line("/etc/hostname")
}

// Strip any userinfo so credentials embedded in the URL never reach the log.
fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut url) => {
            let _ = url.set_username("");
            let _ = url.set_password(None);
            url.to_string()
        }
        Err(_) => raw.to_string(),
    }
}

pub fn log_startup_info(options: &Options) {
    let app_version = env!("CARGO_PKG_VERSION");
    let cwd = env::current_dir()
        .ok()
        .and_then(|p| p.to_str().map(|s| s.to_string()))
        .unwrap_or_default();
    let host = hostname().unwrap_or_else(|| "unknown".to_string());

    info!("sbdash v{} started (pid {})", app_version, std::process::id());
    info!("Host: {}", host);
    info!("OS: {} / {}", env::consts::OS, env::consts::ARCH);
    info!("Working directory: {}", cwd);
    info!("Listening port: {}", options.port());
    info!(
        "Timeouts: read {}s, write {}s, upstream {}s",
        options.read_timeout_secs(),
        options.write_timeout_secs(),
        options.upstream_timeout_secs()
    );
    info!("Upstream API: {}", redact_url(options.upstream_url()));
    info!("Static directory: {}", options.static_dir());

    if !Path::new(options.static_dir()).is_dir() {
        warn!(
            "Static directory does not exist, /static/ requests will return 404: {}",
            options.static_dir()
        );
    }
}
