//! Operator Gate - Live Placement Authorization
//!
//! Live orders are only sent when all of the following hold:
//! - the bot is not running against the simulator
//! - `live_enabled` is set in configuration
//! - the SHA-256 hex digest of the operator token found in the
//!   configured environment variable equals the configured hash
//!
//! The raw token is hashed on read and never stored.

use tracing::{info, warn};

/// Default environment variable holding the operator token.
pub const DEFAULT_TOKEN_ENV: &str = "BOT_OPERATOR_TOKEN";

/// Lowercase hex SHA-256 of `input`.
pub fn sha256_hex(input: &str) -> String {
  hex::encode(hmac_sha256::Hash::hash(input.as_bytes()))
}

/// Why live placement is or is not allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
  Allowed,
  Simulating,
  LiveDisabled,
  NoTokenHash,
  NoToken,
  TokenMismatch,
}

/// Evaluated operator gate.
#[derive(Debug, Clone)]
pub struct OperatorGate {
  simulate: bool,
  live_enabled: bool,
  expected_hash: Option<String>,
  token_digest: Option<String>,
}

impl OperatorGate {
  pub fn new(simulate: bool, live_enabled: bool, expected_hash: Option<String>, token: Option<&str>) -> Self {
    Self {
      simulate,
      live_enabled,
      expected_hash: expected_hash.filter(|h| !h.is_empty()),
      token_digest: token.filter(|t| !t.is_empty()).map(sha256_hex),
    }
  }

  /// Gate reading the operator token from `token_env`.
  pub fn from_env(simulate: bool, live_enabled: bool, token_env: &str, expected_hash: Option<String>) -> Self {
    let token = std::env::var(token_env).ok();
    Self::new(simulate, live_enabled, expected_hash, token.as_deref())
  }

  /// Whether the operator token matches, regardless of mode.
  pub fn operator_enabled(&self) -> bool {
    matches!(
      (&self.expected_hash, &self.token_digest),
      (Some(expected), Some(actual)) if expected == actual
    )
  }

  pub fn status(&self) -> GateStatus {
    if self.simulate {
      return GateStatus::Simulating;
    }
    if !self.live_enabled {
      return GateStatus::LiveDisabled;
    }
    match (&self.expected_hash, &self.token_digest) {
      (None, _) => GateStatus::NoTokenHash,
      (Some(_), None) => GateStatus::NoToken,
      (Some(expected), Some(actual)) if expected == actual => GateStatus::Allowed,
      _ => GateStatus::TokenMismatch,
    }
  }

  pub fn live_allowed(&self) -> bool {
    self.status() == GateStatus::Allowed
  }

  /// Log the gate decision once at startup.
  pub fn log_status(&self) {
    match self.status() {
      GateStatus::Allowed => info!("Live placement authorized by operator token"),
      GateStatus::Simulating => info!("Simulation mode; live placement disabled"),
      status => warn!(?status, "Live placement blocked by operator gate"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const TOKEN: &str = "let-me-bet";

  fn gate(simulate: bool, live: bool, token: Option<&str>) -> OperatorGate {
    OperatorGate::new(simulate, live, Some(sha256_hex(TOKEN)), token)
  }

  #[test]
  fn test_sha256_hex_known_vector() {
    assert_eq!(
      sha256_hex("abc"),
      "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
  }

  #[test]
  fn test_allowed_only_with_matching_token() {
    assert_eq!(gate(false, true, Some(TOKEN)).status(), GateStatus::Allowed);
    assert!(gate(false, true, Some(TOKEN)).live_allowed());
    assert_eq!(gate(false, true, Some("wrong")).status(), GateStatus::TokenMismatch);
    assert_eq!(gate(false, true, None).status(), GateStatus::NoToken);
    assert_eq!(gate(false, true, Some("")).status(), GateStatus::NoToken);
  }

  #[test]
  fn test_simulate_and_live_flag_block() {
    assert_eq!(gate(true, true, Some(TOKEN)).status(), GateStatus::Simulating);
    assert_eq!(gate(false, false, Some(TOKEN)).status(), GateStatus::LiveDisabled);
    // the token itself still checks out
    assert!(gate(true, true, Some(TOKEN)).operator_enabled());
  }

  #[test]
  fn test_missing_hash_blocks() {
    let g = OperatorGate::new(false, true, None, Some(TOKEN));
    assert_eq!(g.status(), GateStatus::NoTokenHash);
    assert!(!g.operator_enabled());
  }
}
