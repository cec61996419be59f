//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (HTTP clients, file I/O, random sources).
//! Each sub-module groups adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `alerts`: webhook operator alerts
//! - `exchange`: betting exchange JSON-RPC client, orders, cleared orders
//! - `metrics`: Prometheus metrics export
//! - `persistence`: reconciliation state file and CSV audit trail
//! - `simulated`: in-process table for dry runs

pub mod alerts;
pub mod exchange;
pub mod metrics;
pub mod persistence;
pub mod simulated;
