//! Simulated Table Adapter
//!
//! An in-process stand-in for the live table and the exchange, used for
//! dry runs and tests. Implements both `MarketDataSource` and
//! `OrderGateway` over one shared shoe.

pub mod table;

pub use table::{SimulatedTable, TableSettings};
