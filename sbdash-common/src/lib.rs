//! Wire types shared between the upstream client and the dashboard handlers.
//!
//! Field names follow the upstream panel API; every struct tolerates missing
//! fields the same way the panel's own frontend does (zero values).

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize};

// The panel sends `null` for empty nested objects and lists.
#[cfg(feature = "serde")]
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// `GET /status?r=sys,sbd` payload (`obj`).
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SystemStatus {
    #[cfg_attr(feature = "serde", serde(deserialize_with = "null_default"))]
    pub sbd: CoreStatus,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "null_default"))]
    pub mem: MemoryStatus,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "null_default"))]
    pub net: NetworkStatus,
    pub uptime: i64, // 主机运行时间（秒）
}

/// Proxy core process state.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CoreStatus {
    pub running: bool,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "null_default"))]
    pub stats: CoreStats,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "PascalCase"))]
pub struct CoreStats {
    pub alloc: i64,
    pub num_goroutine: i64,
    pub uptime: i64, // 核心运行时间（秒）
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MemoryStatus {
    pub current: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NetworkStatus {
    pub recv: i64,
    pub sent: i64,
}

/// `GET /clients` payload (`obj`).
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClientList {
    #[cfg_attr(feature = "serde", serde(deserialize_with = "null_default"))]
    pub clients: Vec<ClientUsage>,
}

impl ClientList {
    /// Exact, case-sensitive lookup by client name.
    pub fn find(&self, name: &str) -> Option<&ClientUsage> {
        self.clients.iter().find(|c| c.name == name)
    }
}

/// Per-client cumulative usage snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClientUsage {
    pub name: String,
    pub down: i64,   // 累计下载字节数
    pub up: i64,     // 累计上传字节数
    pub volume: i64, // 流量配额（字节），<= 0 表示无限制
    pub expiry: i64, // 到期时间（秒），仅在有配额时有意义
}

impl ClientUsage {
    pub fn is_unlimited(&self) -> bool {
        self.volume <= 0
    }
}

/// One row of `GET /stats?resource=user&tag=..&limit=..`.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct TrafficSample {
    pub id: i64,
    pub date_time: i64,
    pub resource: String,
    pub tag: String,
    pub direction: bool, // true = 上传
    pub traffic: i64,    // 字节
}

/// Chart point: megabytes transferred in one timestamp bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrafficPoint {
    pub time: i64,
    pub up: f64,
    pub down: f64,
}
