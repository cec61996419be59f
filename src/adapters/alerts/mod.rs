//! Alert Adapters
//!
//! Operator notifications over a one-way JSON webhook.

pub mod webhook;

pub use webhook::WebhookAlerts;
