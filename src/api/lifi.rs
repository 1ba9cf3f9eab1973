use log::{error, info};
use reqwest::{Client, Method};
use serde_json::Value;
use std::time::{Duration, Instant};

use crate::api::ProxyError;
use crate::config::LiFiConfig;
use crate::error::Result;
use crate::metrics;

#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Value,
}

/// Single-hop forwarder to the Li.Fi REST API. No retries, no caching.
#[derive(Debug, Clone)]
pub struct LiFiClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl LiFiClient {
    pub fn new(config: &LiFiConfig) -> Result<Self> {
        Self::with_timeout(&config.base_url, config.timeout())
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn target_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn forward(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> std::result::Result<UpstreamResponse, ProxyError> {
        metrics::PROXY_REQUESTS.inc();
        let started = Instant::now();

        let result = self.send(method, path, query, body).await;

        metrics::UPSTREAM_LATENCY.observe(started.elapsed().as_secs_f64());
        if let Err(e) = &result {
            metrics::record_proxy_error(e.status_code());
        }
        result
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> std::result::Result<UpstreamResponse, ProxyError> {
        let url = self.target_url(path);
        info!("Proxying {} request to: {}", method, url);

        let mut request = self.client
            .request(method, &url)
            .header("Content-Type", "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            error!("Proxy error: {}", e);
            ProxyError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(
                "Error from Li.Fi API: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            );
            let bytes = response.bytes().await.unwrap_or_default();
            return Err(ProxyError::Upstream {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("").to_string(),
                detail: error_detail(&bytes),
            });
        }

        let body = response.json::<Value>().await.map_err(|e| {
            error!("Failed to parse Li.Fi response: {}", e);
            ProxyError::from(e)
        })?;

        Ok(UpstreamResponse {
            status: status.as_u16(),
            body,
        })
    }

    pub async fn quote(
        &self,
        params: &[(String, String)],
    ) -> std::result::Result<UpstreamResponse, ProxyError> {
        self.forward(Method::GET, "quote", params, None).await
    }

    pub async fn tokens(&self) -> std::result::Result<UpstreamResponse, ProxyError> {
        self.forward(Method::GET, "tokens", &[], None).await
    }
}

/// Best-effort detail from an upstream error body: its `message`, else the raw JSON, else empty.
fn error_detail(bytes: &[u8]) -> String {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(value) => match value.get("message").and_then(Value::as_str) {
            Some(message) => message.to_string(),
            None => value.to_string(),
        },
        Err(_) => String::new(),
    }
}
