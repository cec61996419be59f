//! Metrics Port - Injected Observability Sink
//!
//! Use cases and adapters report counters and gauges through this trait
//! instead of touching a global registry, so tests can pass `NoopMetrics`.

/// Counters and gauges the bot reports.
pub trait MetricsSink: Send + Sync + 'static {
  /// An order was submitted to the gateway.
  fn bet_placed(&self, selection: &str);

  /// The gateway accepted an order.
  fn bet_accepted(&self, selection: &str);

  /// A bet was settled through either settlement path.
  fn settlement(&self, won: bool);

  /// The ledger refused a stake for lack of capacity.
  fn capacity_rejection(&self);

  /// A transport call is being retried.
  fn transport_retry(&self, method: &str);

  /// A transport call failed for good.
  fn transport_error(&self, method: &str);

  /// The shoe was replaced with a fresh one.
  fn shoe_reset(&self);

  /// Current ledger figures.
  fn ledger(&self, balance: f64, exposure: f64, pnl: f64);
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
  fn bet_placed(&self, _selection: &str) {}
  fn bet_accepted(&self, _selection: &str) {}
  fn settlement(&self, _won: bool) {}
  fn capacity_rejection(&self) {}
  fn transport_retry(&self, _method: &str) {}
  fn transport_error(&self, _method: &str) {}
  fn shoe_reset(&self) {}
  fn ledger(&self, _balance: f64, _exposure: f64, _pnl: f64) {}
}
