//! Exchange JSON-RPC Adapter
//!
//! Talks to the betting exchange over JSON-RPC 2.0 for order placement
//! and settled-bet queries. Market data comes from elsewhere.
//!
//! Sub-modules:
//! - `client`: authenticated HTTP client with bounded retries
//! - `orders`: `OrderGateway` via `placeOrders`
//! - `cleared`: `ClearedOrderFeed` via `listClearedOrders`
//! - `types`: request/response wire types

pub mod cleared;
pub mod client;
pub mod orders;
pub mod types;

pub use cleared::ExchangeClearedOrders;
pub use client::{ExchangeClient, ExchangeClientConfig};
pub use orders::ExchangeOrderGateway;
