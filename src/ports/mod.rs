//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) the trading loop needs from the outside
//! world. Adapters implement these traits; tests mock them.
//!
//! Port categories:
//! - `MarketDataSource`: shoe composition, quoted prices and settlements
//! - `OrderGateway`: order submission to the exchange (or the simulator)
//! - `ClearedOrderFeed`: settled bets reported asynchronously
//! - `ReconciliationStore` / `AuditLog`: reconciliation persistence
//! - `MetricsSink` / `AlertSink`: observability side channels

pub mod alerts;
pub mod cleared_orders;
pub mod execution;
pub mod market_data;
pub mod metrics;
pub mod repository;

pub use alerts::{AlertLevel, AlertSink};
pub use cleared_orders::{ClearedOrderFeed, TimeRange};
pub use execution::{OrderGateway, OrderReceipt, OrderRequest};
pub use market_data::MarketDataSource;
pub use metrics::{MetricsSink, NoopMetrics};
pub use repository::{AuditLog, ReconciliationState, ReconciliationStore};
