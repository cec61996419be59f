//! Exchange JSON-RPC Request/Response Types
//!
//! Serialization types for the betting and account JSON-RPC methods the
//! bot calls. Field names follow the exchange's camelCase wire format.

use serde::{Deserialize, Serialize};

use crate::domain::market::Action;

/// Betting method used to place side bets.
pub const PLACE_ORDERS: &str = "SportsAPING/v1.0/placeOrders";

/// Account method used to read settled bets.
pub const LIST_CLEARED_ORDERS: &str = "AccountAPING/v1.0/listClearedOrders";

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a, P> {
  pub jsonrpc: &'static str,
  pub method: &'a str,
  pub params: &'a P,
  pub id: u32,
}

/// JSON-RPC 2.0 response envelope. Exactly one of the fields is set.
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse<R> {
  pub result: Option<R>,
  #[serde(default)]
  pub error: Option<serde_json::Value>,
}

// ── placeOrders ──

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrdersParams {
  pub market_id: String,
  pub instructions: Vec<PlaceInstruction>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub customer_ref: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceInstruction {
  pub selection_id: i64,
  pub handicap: f64,
  pub side: Action,
  /// Always `"LIMIT"`.
  pub order_type: &'static str,
  pub limit_order: LimitOrder,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitOrder {
  /// Stake, already truncated to two decimals.
  pub size: f64,
  pub price: f64,
  /// Always `"LAPSE"`: unmatched remainder is cancelled at turn in-play.
  pub persistence_type: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceExecutionReport {
  /// `"SUCCESS"` or `"FAILURE"`.
  pub status: String,
  #[serde(default)]
  pub error_code: Option<String>,
  #[serde(default)]
  pub instruction_reports: Vec<InstructionReport>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionReport {
  pub status: String,
  #[serde(default)]
  pub error_code: Option<String>,
  #[serde(default)]
  pub bet_id: Option<String>,
}

// ── listClearedOrders ──

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListClearedOrdersParams {
  pub settled_date_range: DateRange,
  /// Always `"SETTLED"`.
  pub bet_status: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct DateRange {
  pub from: String,
  pub to: String,
}

/// Cleared orders are kept as raw JSON so the audit trail can record
/// exactly what the exchange sent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearedOrderSummary {
  #[serde(default)]
  pub cleared_orders: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_place_instruction_wire_format() {
    let params = PlaceOrdersParams {
      market_id: "1.234".to_string(),
      instructions: vec![PlaceInstruction {
        selection_id: 1,
        handicap: 0.0,
        side: Action::Back,
        order_type: "LIMIT",
        limit_order: LimitOrder {
          size: 31.25,
          price: 5.0,
          persistence_type: "LAPSE",
        },
      }],
      customer_ref: None,
    };
    let json = serde_json::to_value(&params).unwrap();
    assert_eq!(json["marketId"], "1.234");
    assert_eq!(json["instructions"][0]["side"], "BACK");
    assert_eq!(json["instructions"][0]["limitOrder"]["persistenceType"], "LAPSE");
    assert_eq!(json["instructions"][0]["limitOrder"]["size"], 31.25);
    assert!(json.get("customerRef").is_none());
  }

  #[test]
  fn test_execution_report_parses() {
    let raw = r#"{"result":{"status":"SUCCESS","instructionReports":[{"status":"SUCCESS","betId":"987"}]},"id":1,"jsonrpc":"2.0"}"#;
    let resp: JsonRpcResponse<PlaceExecutionReport> = serde_json::from_str(raw).unwrap();
    let report = resp.result.unwrap();
    assert_eq!(report.status, "SUCCESS");
    assert_eq!(report.instruction_reports[0].bet_id.as_deref(), Some("987"));
    assert!(resp.error.is_none());
  }
}
