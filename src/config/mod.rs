//! Configuration Module - TOML-based Bot Configuration
//!
//! Loads and validates configuration from `config.toml`. Secrets (the
//! exchange app key, session token and operator token) are never read
//! from the file: the file names the environment variables that hold them.
//! Every section has defaults, so an empty file runs the simulator.

pub mod loader;

use serde::Deserialize;

use crate::domain::stake::SizingStrategy;

/// Top-level bot configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before the bot begins operation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
  /// Bot identity and run mode.
  #[serde(default)]
  pub bot: BotConfig,
  /// Edge detection and sizing parameters.
  #[serde(default)]
  pub strategy: StrategyConfig,
  /// Cleared-order reconciliation.
  #[serde(default)]
  pub reconciliation: ReconciliationConfig,
  /// Exchange JSON-RPC endpoint and credentials.
  #[serde(default)]
  pub exchange: ExchangeConfig,
  /// Simulated table parameters.
  #[serde(default)]
  pub simulator: SimulatorConfig,
  /// Metrics and monitoring.
  #[serde(default)]
  pub metrics: MetricsConfig,
  /// Operator alert delivery.
  #[serde(default)]
  pub alerts: AlertsConfig,
  /// Rate limiting configuration.
  #[serde(default)]
  pub rate_limits: RateLimitConfig,
}

/// Bot identity and run mode.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
  /// Human-readable bot name.
  #[serde(default = "default_bot_name")]
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Run against the simulated table instead of the exchange.
  #[serde(default = "default_true")]
  pub simulate: bool,
  /// Place bets on the simulated table; when false the simulator is
  /// observed only.
  #[serde(default = "default_true")]
  pub place_bets: bool,
  /// Allow live orders (still subject to the operator token).
  #[serde(default)]
  pub live_enabled: bool,
  /// Environment variable holding the operator token.
  #[serde(default = "default_operator_token_env")]
  pub operator_token_env: String,
  /// Lowercase hex SHA-256 of the operator token.
  #[serde(default)]
  pub operator_token_hash: Option<String>,
  /// Delay between polling iterations (milliseconds).
  #[serde(default = "default_poll_interval_ms")]
  pub poll_interval_ms: u64,
  /// Stop after this many iterations; unbounded when absent.
  #[serde(default)]
  pub iterations: Option<u64>,
}

impl Default for BotConfig {
  fn default() -> Self {
    Self {
      name: default_bot_name(),
      log_level: default_log_level(),
      simulate: true,
      place_bets: true,
      live_enabled: false,
      operator_token_env: default_operator_token_env(),
      operator_token_hash: None,
      poll_interval_ms: default_poll_interval_ms(),
      iterations: None,
    }
  }
}

/// Edge detection and stake sizing.
#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
  /// Minimum edge for an opportunity to qualify.
  #[serde(default = "default_min_edge")]
  pub min_edge: f64,
  /// Sizing strategy (kelly, proportional).
  #[serde(default)]
  pub strategy: SizingStrategy,
  /// Kelly shrink multiplier (0.5 = half-Kelly).
  #[serde(default = "default_kelly_shrink")]
  pub kelly_shrink: f64,
  /// Exposure cap as a fraction of the starting balance.
  #[serde(default = "default_max_exposure_pct")]
  pub max_exposure_pct: f64,
  /// Starting balance of the ledger.
  #[serde(default = "default_start_balance")]
  pub start_balance: f64,
  /// Fixed per-bet stake cap; the balance-tiered cap applies when absent.
  #[serde(default)]
  pub max_stake_pct: Option<f64>,
  /// Also evaluate LAY at the best lay price.
  #[serde(default)]
  pub allow_lay: bool,
}

impl Default for StrategyConfig {
  fn default() -> Self {
    Self {
      min_edge: default_min_edge(),
      strategy: SizingStrategy::default(),
      kelly_shrink: default_kelly_shrink(),
      max_exposure_pct: default_max_exposure_pct(),
      start_balance: default_start_balance(),
      max_stake_pct: None,
      allow_lay: false,
    }
  }
}

/// Cleared-order reconciliation.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconciliationConfig {
  /// Run reconciliation at all (live mode only).
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Seconds between reconciliation runs.
  #[serde(default = "default_reconcile_interval")]
  pub poll_interval_secs: u64,
  /// Window length when no cursor is stored (seconds).
  #[serde(default = "default_lookback")]
  pub lookback_secs: i64,
  /// Most recent processed bet IDs to keep.
  #[serde(default = "default_max_processed")]
  pub max_processed: usize,
  /// Reconciliation state file.
  #[serde(default = "default_state_file")]
  pub state_file: String,
  /// CSV audit trail of cleared orders.
  #[serde(default = "default_audit_csv")]
  pub audit_csv: String,
}

impl Default for ReconciliationConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      poll_interval_secs: default_reconcile_interval(),
      lookback_secs: default_lookback(),
      max_processed: default_max_processed(),
      state_file: default_state_file(),
      audit_csv: default_audit_csv(),
    }
  }
}

/// Exchange JSON-RPC endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
  /// JSON-RPC endpoint URL.
  #[serde(default = "default_json_rpc_url")]
  pub json_rpc_url: String,
  /// Environment variable holding the application key.
  #[serde(default = "default_app_key_env")]
  pub app_key_env: String,
  /// Environment variable holding the session token.
  #[serde(default = "default_session_token_env")]
  pub session_token_env: String,
  /// Request timeout (milliseconds).
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
  /// Attempts per request, including the first.
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
  /// Base retry delay; attempt `n` waits `base * (n + 1)` (milliseconds).
  #[serde(default = "default_retry_base_delay_ms")]
  pub retry_base_delay_ms: u64,
  /// Market the side bets are placed on.
  #[serde(default)]
  pub market_id: String,
  /// Account currency, informational.
  #[serde(default = "default_currency")]
  pub currency: String,
}

impl Default for ExchangeConfig {
  fn default() -> Self {
    Self {
      json_rpc_url: default_json_rpc_url(),
      app_key_env: default_app_key_env(),
      session_token_env: default_session_token_env(),
      timeout_ms: default_timeout_ms(),
      max_retries: default_max_retries(),
      retry_base_delay_ms: default_retry_base_delay_ms(),
      market_id: String::new(),
      currency: default_currency(),
    }
  }
}

/// Simulated table parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulatorConfig {
  /// Cards in a fresh shoe.
  #[serde(default = "default_start_cards")]
  pub start_cards: u32,
  /// Cards dealt per poll.
  #[serde(default = "default_decrement")]
  pub decrement: u32,
  /// Reset the shoe after this many polls.
  #[serde(default)]
  pub reset_after: Option<u64>,
  /// Polls between placement and settlement.
  #[serde(default = "default_settle_delay")]
  pub settle_delay: u64,
  /// RNG seed; drawn from entropy when absent.
  #[serde(default)]
  pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
  fn default() -> Self {
    Self {
      start_cards: default_start_cards(),
      decrement: default_decrement(),
      reset_after: None,
      settle_delay: default_settle_delay(),
      seed: None,
    }
  }
}

/// Metrics and monitoring.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Enable the Prometheus endpoint.
  #[serde(default)]
  pub enabled: bool,
  /// Prometheus bind address.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: false,
      bind_address: default_metrics_addr(),
    }
  }
}

/// Operator alerts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertsConfig {
  /// Deliver alerts to the webhook; log only when false.
  #[serde(default)]
  pub enabled: bool,
  /// Webhook receiving `{"level", "message"}` JSON.
  #[serde(default)]
  pub webhook_url: Option<String>,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
  /// Maximum orders per minute; 0 disables the limit.
  #[serde(default = "default_max_orders")]
  pub max_orders_per_minute: u32,
}

impl Default for RateLimitConfig {
  fn default() -> Self {
    Self {
      max_orders_per_minute: default_max_orders(),
    }
  }
}

// Default value functions for serde

fn default_bot_name() -> String {
  "sidebet-bot".to_string()
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_true() -> bool {
  true
}

fn default_operator_token_env() -> String {
  crate::usecases::operator_gate::DEFAULT_TOKEN_ENV.to_string()
}

fn default_poll_interval_ms() -> u64 {
  1_000
}

fn default_min_edge() -> f64 {
  crate::domain::edge::DEFAULT_MIN_EDGE
}

fn default_kelly_shrink() -> f64 {
  0.5
}

fn default_max_exposure_pct() -> f64 {
  0.1
}

fn default_start_balance() -> f64 {
  1_000.0
}

fn default_reconcile_interval() -> u64 {
  60
}

fn default_lookback() -> i64 {
  3_600
}

fn default_max_processed() -> usize {
  10_000
}

fn default_state_file() -> String {
  "data/reconcile_state.json".to_string()
}

fn default_audit_csv() -> String {
  "data/cleared_orders.csv".to_string()
}

fn default_json_rpc_url() -> String {
  crate::adapters::exchange::client::DEFAULT_JSON_RPC_URL.to_string()
}

fn default_app_key_env() -> String {
  "EXCHANGE_APP_KEY".to_string()
}

fn default_session_token_env() -> String {
  "EXCHANGE_SESSION_TOKEN".to_string()
}

fn default_timeout_ms() -> u64 {
  10_000
}

fn default_max_retries() -> u32 {
  3
}

fn default_retry_base_delay_ms() -> u64 {
  500
}

fn default_currency() -> String {
  "GBP".to_string()
}

fn default_start_cards() -> u32 {
  crate::domain::shoe::FULL_SHOE_CARDS
}

fn default_decrement() -> u32 {
  4
}

fn default_settle_delay() -> u64 {
  2
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}

fn default_max_orders() -> u32 {
  60
}
