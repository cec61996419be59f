//! Exchange Cleared Orders - Adapter for Settled Bets
//!
//! Implements the `ClearedOrderFeed` port with `listClearedOrders`.
//! Records are decoded leniently: the exchange has used several field
//! names for the outcome, commission and settlement time over the years.

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::SecondsFormat;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::client::ExchangeClient;
use super::types::{ClearedOrderSummary, DateRange, ListClearedOrdersParams, LIST_CLEARED_ORDERS};
use crate::domain::market::{parse_settled_timestamp, BetOutcome, ClearedOrder};
use crate::ports::cleared_orders::{ClearedOrderFeed, TimeRange};

/// Cleared-order feed backed by the shared JSON-RPC client.
pub struct ExchangeClearedOrders {
    client: Arc<ExchangeClient>,
}

impl ExchangeClearedOrders {
    pub fn new(client: Arc<ExchangeClient>) -> Self {
        Self { client }
    }
}

fn first_str<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| record.get(*k).and_then(Value::as_str))
}

fn first_f64(record: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| record.get(*k).and_then(Value::as_f64))
}

/// Decode one cleared-order record. Records without a bet ID are useless
/// for reconciliation and yield `None`.
pub fn decode_cleared_order(record: &Value) -> Option<ClearedOrder> {
    let bet_id = match record.get("betId")? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };

    let outcome = first_str(record, &["betOutcome", "status"]).unwrap_or("UNKNOWN");
    let settled_raw = first_str(record, &["settledDate", "settled", "settledDateUtc"]).map(str::to_string);

    Some(ClearedOrder {
        bet_id,
        outcome: BetOutcome::parse(outcome),
        profit: first_f64(record, &["profit"]),
        commission: first_f64(record, &["commissionPaid", "commission"]),
        settled_at: settled_raw.as_deref().and_then(parse_settled_timestamp),
        settled_raw,
        raw: record.to_string(),
    })
}

#[async_trait]
impl ClearedOrderFeed for ExchangeClearedOrders {
    #[instrument(skip(self), fields(from = %range.from, to = %range.to))]
    async fn query(&self, range: TimeRange) -> Result<Vec<ClearedOrder>> {
        let params = ListClearedOrdersParams {
            settled_date_range: DateRange {
                from: range.from.to_rfc3339_opts(SecondsFormat::Millis, true),
                to: range.to.to_rfc3339_opts(SecondsFormat::Millis, true),
            },
            bet_status: "SETTLED",
        };

        let response = self
            .client
            .call::<_, ClearedOrderSummary>(LIST_CLEARED_ORDERS, &params)
            .await?;

        if let Some(error) = response.error {
            bail!("listClearedOrders returned an error: {error}");
        }

        let summary = response.result.unwrap_or_default();
        let orders: Vec<ClearedOrder> = summary
            .cleared_orders
            .iter()
            .filter_map(|record| {
                let decoded = decode_cleared_order(record);
                if decoded.is_none() {
                    warn!(record = %record, "Skipping cleared order without betId");
                }
                decoded
            })
            .collect();

        debug!(count = orders.len(), "Cleared orders fetched");
        Ok(orders)
    }
}
