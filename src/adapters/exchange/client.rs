//! Exchange JSON-RPC Client - Retrying Transport
//!
//! Wraps reqwest with the exchange's authentication headers and a
//! bounded retry loop. Network failures, 429 and 503 responses are
//! retried with a linearly growing delay; anything else fails at once.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::types::{JsonRpcRequest, JsonRpcResponse};
use crate::ports::metrics::MetricsSink;

/// Default exchange JSON-RPC endpoint.
pub const DEFAULT_JSON_RPC_URL: &str = "https://api.betfair.com/exchange/betting/json-rpc/v1";

/// Configuration for the exchange client.
#[derive(Debug, Clone)]
pub struct ExchangeClientConfig {
  pub url: String,
  /// Application key sent as `X-Application`.
  pub app_key: String,
  /// Session token sent as `X-Authentication`.
  pub session_token: String,
  pub timeout: Duration,
  /// Total attempts per call, including the first.
  pub max_attempts: u32,
  /// Delay before retry `n` is `retry_base_delay * n`.
  pub retry_base_delay: Duration,
}

impl Default for ExchangeClientConfig {
  fn default() -> Self {
    Self {
      url: DEFAULT_JSON_RPC_URL.to_string(),
      app_key: String::new(),
      session_token: String::new(),
      timeout: Duration::from_secs(10),
      max_attempts: 3,
      retry_base_delay: Duration::from_millis(500),
    }
  }
}

/// Authenticated JSON-RPC client shared by the order gateway and the
/// cleared-order feed.
pub struct ExchangeClient {
  http: Client,
  config: ExchangeClientConfig,
  metrics: Arc<dyn MetricsSink>,
}

impl ExchangeClient {
  pub fn new(config: ExchangeClientConfig, metrics: Arc<dyn MetricsSink>) -> Result<Self> {
    let http = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(2)
      .build()
      .context("Failed to build HTTP client")?;

    Ok(Self {
      http,
      config,
      metrics,
    })
  }

  /// Invoke `method` with `params` and decode the JSON-RPC envelope.
  ///
  /// # Errors
  /// Returns the last transport error once all attempts are used, or
  /// immediately on a non-retryable HTTP status or an undecodable body.
  pub async fn call<P, R>(&self, method: &str, params: &P) -> Result<JsonRpcResponse<R>>
  where
    P: Serialize + Sync,
    R: DeserializeOwned + Send,
  {
    let body = JsonRpcRequest {
      jsonrpc: "2.0",
      method,
      params,
      id: 1,
    };
    let attempts = self.config.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 0..attempts {
      let is_last = attempt + 1 == attempts;

      let sent = self
        .http
        .post(&self.config.url)
        .header("X-Application", &self.config.app_key)
        .header("X-Authentication", &self.config.session_token)
        .header("Accept", "application/json")
        .json(&body)
        .send()
        .await;

      match sent {
        Ok(response) => match response.status() {
          StatusCode::OK => {
            let decoded = response.json::<JsonRpcResponse<R>>().await;
            return decoded.map_err(|e| {
              self.metrics.transport_error(method);
              anyhow::anyhow!("Failed to decode {method} response: {e}")
            });
          }
          status @ (StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE) => {
            warn!(method, status = %status, attempt, "Exchange throttled request");
            last_error = Some(anyhow::anyhow!("{method} returned {status}"));
          }
          status => {
            self.metrics.transport_error(method);
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("{method} failed with {status}: {text}"));
          }
        },
        Err(e) => {
          warn!(method, error = %e, attempt, "Exchange request failed");
          last_error = Some(anyhow::Error::new(e).context(format!("{method} request failed")));
        }
      }

      if !is_last {
        self.metrics.transport_retry(method);
        let delay = self.config.retry_base_delay * (attempt + 1);
        debug!(method, delay_ms = delay.as_millis() as u64, "Retrying exchange call");
        sleep(delay).await;
      }
    }

    self.metrics.transport_error(method);
    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("{method}: retries exhausted")))
  }
}
