// Client for the upstream panel API (status, clients, stats).
//
// One GET per call: no retries, no caching. Every request carries the
// panel token in the `Token` header.

use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use sbdash_common::{ClientList, SystemStatus, TrafficSample};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

const TOKEN_HEADER: &str = "token";
const BODY_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Connection refused, DNS failure, timeout, broken body stream.
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid upstream URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("invalid upstream token")]
    InvalidToken,

    /// 401/403 from the panel.
    #[error("upstream rejected the token (HTTP {status})")]
    Unauthorized { status: u16 },

    /// `{"success": false, "msg": ...}` envelope.
    #[error("upstream error: {0}")]
    Rejected(String),

    #[error("malformed upstream response: {message}")]
    Deserialization { message: String, body: String },
}

impl UpstreamError {
    /// Leading part of the raw body for a `Deserialization` error.
    pub fn body_preview(&self) -> Option<String> {
        match self {
            UpstreamError::Deserialization { body, .. } => {
                Some(body.chars().take(BODY_PREVIEW_CHARS).collect())
            }
            _ => None,
        }
    }
}

/// Base URL, credential and timeout, fixed at process startup.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub token: String,
    pub timeout: Duration,
}

impl UpstreamConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// `{ success, msg, obj }` wrapper used by every panel endpoint.
#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    obj: Option<T>,
}

#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        // Validate once here so request URLs can be built infallibly later.
        Url::parse(&config.base_url)?;

        let mut headers = HeaderMap::new();
        let token =
            HeaderValue::from_str(&config.token).map_err(|_| UpstreamError::InvalidToken)?;
        headers.insert(HeaderName::from_static(TOKEN_HEADER), token);

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("sbdash/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// `GET {base}/status?r=sys,sbd`
    pub async fn status(&self) -> Result<SystemStatus, UpstreamError> {
        self.get("status", &[("r", "sys,sbd")]).await
    }

    /// `GET {base}/clients`
    pub async fn clients(&self) -> Result<ClientList, UpstreamError> {
        self.get("clients", &[]).await
    }

    /// `GET {base}/stats?resource=user&tag={user}&limit={hours}`
    pub async fn user_stats(
        &self,
        user: &str,
        limit_hours: u32,
    ) -> Result<Vec<TrafficSample>, UpstreamError> {
        let limit = limit_hours.to_string();
        self.get(
            "stats",
            &[("resource", "user"), ("tag", user), ("limit", limit.as_str())],
        )
        .await
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, UpstreamError> {
        let mut url = Url::parse(&format!("{}/{}", self.base_url, path))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Send a GET request and unwrap the panel envelope. A null or missing
    /// `obj` decodes as `T::default()`.
    async fn get<T>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, UpstreamError>
    where
        T: DeserializeOwned + Default,
    {
        let url = self.url(path, query)?;
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(|e| {
            warn!("Upstream {} unreachable: {}", path, e);
            UpstreamError::Transport(e)
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            warn!("Upstream {} refused token (HTTP {})", path, status.as_u16());
            return Err(UpstreamError::Unauthorized {
                status: status.as_u16(),
            });
        }

        let body = resp.text().await?;
        let envelope: Envelope<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(e) => {
                let err = UpstreamError::Deserialization {
                    message: e.to_string(),
                    body,
                };
                warn!(
                    "Upstream {} returned undecodable body: {} (body: {:?})",
                    path,
                    err,
                    err.body_preview().unwrap_or_default()
                );
                return Err(err);
            }
        };

        if envelope.success == Some(false) {
            return Err(UpstreamError::Rejected(envelope.msg));
        }

        Ok(envelope.obj.unwrap_or_default())
    }
}
