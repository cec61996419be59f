//! Exchange Order Gateway - Adapter for Side-Bet Placement
//!
//! Implements the `OrderGateway` port with the exchange's `placeOrders`
//! method. Every bet is a single LIMIT instruction that lapses when the
//! market turns in-play.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::client::ExchangeClient;
use super::types::{
    LimitOrder, PlaceExecutionReport, PlaceInstruction, PlaceOrdersParams, PLACE_ORDERS,
};
use crate::domain::market::OrderStatus;
use crate::domain::stake::to_exchange_stake;
use crate::ports::execution::{OrderGateway, OrderReceipt, OrderRequest};

/// Order gateway backed by the shared JSON-RPC client.
pub struct ExchangeOrderGateway {
    client: Arc<ExchangeClient>,
    market_id: String,
}

impl ExchangeOrderGateway {
    pub fn new(client: Arc<ExchangeClient>, market_id: impl Into<String>) -> Self {
        Self {
            client,
            market_id: market_id.into(),
        }
    }

    /// Build the wire instruction, or explain why the request cannot be sent.
    fn instruction(request: &OrderRequest) -> Result<PlaceInstruction, String> {
        let selection_id = request
            .selection_id
            .parse::<i64>()
            .map_err(|_| format!("non-numeric selection id '{}'", request.selection_id))?;

        let size = to_exchange_stake(request.stake)
            .and_then(|d| d.to_f64())
            .ok_or_else(|| format!("stake {} rounds to nothing", request.stake))?;

        Ok(PlaceInstruction {
            selection_id,
            handicap: 0.0,
            side: request.action,
            order_type: "LIMIT",
            limit_order: LimitOrder {
                size,
                price: request.price,
                persistence_type: "LAPSE",
            },
        })
    }
}

/// Map an execution report onto the port's receipt.
fn receipt_from_report(report: PlaceExecutionReport) -> OrderReceipt {
    if report.status != "SUCCESS" {
        let reason = report
            .instruction_reports
            .iter()
            .find_map(|r| r.error_code.clone())
            .or(report.error_code)
            .unwrap_or(report.status);
        return OrderReceipt::rejected(reason);
    }

    match report
        .instruction_reports
        .into_iter()
        .find_map(|r| r.bet_id)
    {
        Some(bet_id) => OrderReceipt::accepted(bet_id),
        None => OrderReceipt {
            status: OrderStatus::Accepted,
            bet_id: None,
            message: Some("accepted without bet id".to_string()),
        },
    }
}

#[async_trait]
impl OrderGateway for ExchangeOrderGateway {
    #[instrument(skip(self, request), fields(selection = %request.selection_id, action = %request.action))]
    async fn submit(&self, request: &OrderRequest) -> Result<OrderReceipt> {
        let instruction = match Self::instruction(request) {
            Ok(instruction) => instruction,
            Err(reason) => {
                warn!(reason = %reason, "Order not sent");
                return Ok(OrderReceipt::rejected(reason));
            }
        };

        let params = PlaceOrdersParams {
            market_id: self.market_id.clone(),
            instructions: vec![instruction],
            // Exchange-side idempotency key, at most 32 characters.
            customer_ref: Some(Uuid::new_v4().simple().to_string()),
        };

        let response = self
            .client
            .call::<_, PlaceExecutionReport>(PLACE_ORDERS, &params)
            .await?;

        if let Some(error) = response.error {
            warn!(error = %error, "placeOrders returned an error");
            return Ok(OrderReceipt::rejected(error.to_string()));
        }

        let receipt = match response.result {
            Some(report) => receipt_from_report(report),
            None => OrderReceipt::rejected("empty placeOrders result"),
        };

        info!(
            status = ?receipt.status,
            bet_id = ?receipt.bet_id,
            price = request.price,
            stake = request.stake,
            "Order submitted"
        );
        Ok(receipt)
    }
}
