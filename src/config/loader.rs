//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Arguments
/// * `path` - Path to the config.toml file
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    simulate = config.bot.simulate,
    live_enabled = config.bot.live_enabled,
    strategy = %config.strategy.strategy,
    min_edge = config.strategy.min_edge,
    start_balance = config.strategy.start_balance,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig = toml::from_str(content).with_context(|| "Failed to parse config.toml")?;
  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Fractions within (0, 1]
/// - Positive balances, intervals and retry counts
/// - Exchange settings present when trading live
pub fn validate_config(config: &AppConfig) -> Result<()> {
  let strategy = &config.strategy;

  // Strategy validation
  anyhow::ensure!(
    strategy.min_edge.is_finite() && strategy.min_edge >= 0.0,
    "min_edge must be a non-negative number, got {}",
    strategy.min_edge
  );
  anyhow::ensure!(
    strategy.kelly_shrink > 0.0 && strategy.kelly_shrink <= 1.0,
    "kelly_shrink must be in (0, 1], got {}",
    strategy.kelly_shrink
  );
  anyhow::ensure!(
    strategy.max_exposure_pct > 0.0 && strategy.max_exposure_pct <= 1.0,
    "max_exposure_pct must be in (0, 1], got {}",
    strategy.max_exposure_pct
  );
  anyhow::ensure!(
    strategy.start_balance.is_finite() && strategy.start_balance > 0.0,
    "start_balance must be positive, got {}",
    strategy.start_balance
  );
  if let Some(pct) = strategy.max_stake_pct {
    anyhow::ensure!(
      pct > 0.0 && pct <= 1.0,
      "max_stake_pct must be in (0, 1], got {}",
      pct
    );
  }

  // Loop validation
  anyhow::ensure!(
    config.bot.poll_interval_ms > 0,
    "poll_interval_ms must be positive"
  );
  if let Some(hash) = &config.bot.operator_token_hash {
    anyhow::ensure!(
      hash.len() == 64 && hash.chars().all(|c| c.is_ascii_hexdigit()),
      "operator_token_hash must be a 64-character hex SHA-256 digest"
    );
  }

  // Reconciliation validation
  anyhow::ensure!(
    config.reconciliation.poll_interval_secs > 0,
    "reconciliation.poll_interval_secs must be positive"
  );
  anyhow::ensure!(
    config.reconciliation.lookback_secs > 0,
    "reconciliation.lookback_secs must be positive"
  );
  anyhow::ensure!(
    config.reconciliation.max_processed > 0,
    "reconciliation.max_processed must be positive"
  );

  // Exchange validation
  anyhow::ensure!(
    config.exchange.max_retries >= 1,
    "exchange.max_retries must be at least 1"
  );
  anyhow::ensure!(
    !config.exchange.json_rpc_url.is_empty(),
    "Exchange JSON-RPC URL must not be empty"
  );
  if !config.bot.simulate && config.bot.live_enabled {
    anyhow::ensure!(
      !config.exchange.market_id.is_empty(),
      "exchange.market_id is required for live trading"
    );
  }

  // Simulator validation
  anyhow::ensure!(
    config.simulator.decrement > 0,
    "simulator.decrement must be positive"
  );

  Ok(())
}
