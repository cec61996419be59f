//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement
//! the bot's core workflows. Each use case is a self-contained
//! business operation.
//!
//! Use cases:
//! - `ExposureLedger`: Capital reservation and settlement
//! - `ReconciliationService`: Cleared-order catch-up with dedup
//! - `BetExecutor`: Capacity check, rate limit, submission, booking
//! - `OperatorGate`: Live placement authorization
//! - `TradingLoop`: Snapshot polling, pricing and placement

pub mod executor;
pub mod ledger;
pub mod operator_gate;
pub mod reconciliation;
pub mod trading_loop;
