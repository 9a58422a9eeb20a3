use crate::utils::format_utils::{bytes_to_gb, format_gb};
use chrono::{DateTime, Local, TimeZone};
use log::warn;
use sbdash_common::{ClientUsage, SystemStatus};

pub const UNLIMITED: &str = "Unlimited";

const EXPIRY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 配额显示字段
#[derive(Debug, Clone, PartialEq)]
pub struct QuotaView {
    pub remaining: String,
    pub total: String,
    pub expiry: String,
    /// Share of the quota already consumed; `None` for unlimited clients.
    pub used_pct: Option<f64>,
}

impl QuotaView {
    pub fn unlimited() -> Self {
        Self {
            remaining: UNLIMITED.to_string(),
            total: UNLIMITED.to_string(),
            expiry: UNLIMITED.to_string(),
            used_pct: None,
        }
    }
}

/// Everything the usage page shows, computed fresh per request.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageView {
    pub user: String,
    pub remaining: String,
    pub total: String,
    pub expiry: String,
    pub quota_used_pct: Option<f64>,
    pub runtime: String,
    pub host_uptime: String,
    pub core_running: bool,
    pub mem_used_mb: i64,
    pub mem_pct: f64,
    pub net_rx_gb: f64,
    pub net_tx_gb: f64,
    pub up_gb: f64,
    pub down_gb: f64,
}

impl UsageView {
    pub fn build(status: &SystemStatus, client: &ClientUsage) -> Self {
        let quota = quota_view(client);
        Self {
            user: client.name.clone(),
            remaining: quota.remaining,
            total: quota.total,
            expiry: quota.expiry,
            quota_used_pct: quota.used_pct,
            runtime: format_runtime(status.sbd.stats.uptime),
            host_uptime: format_runtime(status.uptime),
            core_running: status.sbd.running,
            mem_used_mb: status.mem.current / 1024 / 1024,
            mem_pct: memory_percent(status.mem.current, status.mem.total),
            net_rx_gb: bytes_to_gb(status.net.recv),
            net_tx_gb: bytes_to_gb(status.net.sent),
            up_gb: bytes_to_gb(client.up),
            down_gb: bytes_to_gb(client.down),
        }
    }
}

/// Quota strings in the server's local time zone.
pub fn quota_view(client: &ClientUsage) -> QuotaView {
    quota_view_in(client, &Local)
}

pub fn quota_view_in<Tz>(client: &ClientUsage, tz: &Tz) -> QuotaView
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    if client.is_unlimited() {
        return QuotaView::unlimited();
    }

    // 超额时剩余量为负数，按原样显示；计数器异常大时饱和而不是溢出
    let used = client.down.saturating_add(client.up);
    let remaining_gb = bytes_to_gb(client.volume.saturating_sub(used));
    let total_gb = bytes_to_gb(client.volume);

    QuotaView {
        remaining: format_gb(remaining_gb),
        total: format_gb(total_gb),
        expiry: format_expiry_in(client.expiry, tz),
        used_pct: Some(used as f64 / client.volume as f64 * 100.0),
    }
}

pub fn format_expiry_in<Tz>(epoch_secs: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    match DateTime::from_timestamp(epoch_secs, 0) {
        Some(utc) => utc.with_timezone(tz).format(EXPIRY_FORMAT).to_string(),
        None => {
            warn!("Expiry timestamp {} is out of range, showing it unformatted", epoch_secs);
            epoch_secs.to_string()
        }
    }
}

/// Memory usage in percent. A zero (or negative) total reports 0%.
pub fn memory_percent(current: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    current as f64 / total as f64 * 100.0
}

pub fn format_runtime(seconds: i64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    format!("{} days {} hours", days, hours)
}
