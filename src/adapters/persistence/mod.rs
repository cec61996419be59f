//! Persistence Adapters - File Storage
//!
//! Implements the reconciliation repository ports with an atomic JSON
//! state file and an append-only CSV audit trail.
//! No database dependency.

pub mod audit;
pub mod state;

pub use audit::CsvAuditLog;
pub use state::JsonStateStore;
