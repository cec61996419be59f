//! Alerts Port - Operator Notifications
//!
//! Delivery is best-effort: an alert that cannot be sent is logged and
//! dropped, never surfaced as an error to the trading loop.

use async_trait::async_trait;
use serde::Serialize;

/// Alert severity, serialized uppercase on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
  Info,
  Warning,
  Critical,
}

impl std::fmt::Display for AlertLevel {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Info => write!(f, "INFO"),
      Self::Warning => write!(f, "WARNING"),
      Self::Critical => write!(f, "CRITICAL"),
    }
  }
}

/// Trait for alert delivery.
#[async_trait]
pub trait AlertSink: Send + Sync + 'static {
  async fn send(&self, level: AlertLevel, message: &str);
}
