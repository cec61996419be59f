//! Integration Tests - End-to-end Bot Component Testing
//!
//! Tests the interaction between usecases, ports, and mock adapters.
//! Uses mockall for trait mocking and tokio::test for async tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use mockall::mock;
use mockall::predicate::*;

use baccarat_sidebet_bot::adapters::persistence::{CsvAuditLog, JsonStateStore};
use baccarat_sidebet_bot::domain::error::LedgerError;
use baccarat_sidebet_bot::domain::market::{
    Action, BetOutcome, ClearedOrder, MarketSelection, MarketSnapshot, Opportunity,
    SelectionStatus, SettlementEvent,
};
use baccarat_sidebet_bot::domain::shoe::ShoeState;
use baccarat_sidebet_bot::domain::stake::{SizingStrategy, StakeSizer};
use baccarat_sidebet_bot::ports::alerts::{AlertLevel, AlertSink};
use baccarat_sidebet_bot::ports::cleared_orders::{ClearedOrderFeed, TimeRange};
use baccarat_sidebet_bot::ports::execution::{OrderGateway, OrderReceipt, OrderRequest};
use baccarat_sidebet_bot::ports::market_data::MarketDataSource;
use baccarat_sidebet_bot::ports::metrics::NoopMetrics;
use baccarat_sidebet_bot::ports::repository::{ReconciliationState, ReconciliationStore};
use baccarat_sidebet_bot::usecases::executor::{BetExecutor, ExecutionOutcome};
use baccarat_sidebet_bot::usecases::ledger::ExposureLedger;
use baccarat_sidebet_bot::usecases::operator_gate::OperatorGate;
use baccarat_sidebet_bot::usecases::reconciliation::{ReconcileSettings, ReconciliationService};
use baccarat_sidebet_bot::usecases::trading_loop::{
    LoopSettings, Placement, StrategySettings, TradingLoop,
};

// ---- Mock Definitions ----

mock! {
    pub Gateway {}

    #[async_trait]
    impl OrderGateway for Gateway {
        async fn submit(&self, request: &OrderRequest) -> anyhow::Result<OrderReceipt>;
    }
}

mock! {
    pub Feed {}

    #[async_trait]
    impl ClearedOrderFeed for Feed {
        async fn query(&self, range: TimeRange) -> anyhow::Result<Vec<ClearedOrder>>;
    }
}

mock! {
    pub Store {}

    #[async_trait]
    impl ReconciliationStore for Store {
        async fn load(&self) -> anyhow::Result<ReconciliationState>;
        async fn save(&self, state: &ReconciliationState) -> anyhow::Result<()>;
    }
}

mock! {
    pub Source {}

    #[async_trait]
    impl MarketDataSource for Source {
        async fn get_snapshot(&self) -> anyhow::Result<MarketSnapshot>;
    }
}

/// Alert sink that remembers what it was asked to send.
#[derive(Default)]
struct RecordingAlerts {
    sent: Mutex<Vec<(AlertLevel, String)>>,
}

#[async_trait]
impl AlertSink for RecordingAlerts {
    async fn send(&self, level: AlertLevel, message: &str) {
        self.sent.lock().unwrap().push((level, message.to_string()));
    }
}

// ---- Fixtures ----

const POCKET_PAIR: &str = "Pocket Pair In Any Hand";

fn selection(back: f64) -> MarketSelection {
    MarketSelection {
        selection_id: "1".to_string(),
        name: POCKET_PAIR.to_string(),
        status: SelectionStatus::InPlay,
        best_back_price: Some(back),
        best_lay_price: None,
    }
}

fn opportunity(stake: f64, price: f64) -> Opportunity {
    Opportunity {
        selection: selection(price),
        true_prob: 0.25,
        market_price: price,
        edge: 0.025,
        action: Action::Back,
        stake,
    }
}

fn snapshot(back: f64, settlements: Vec<SettlementEvent>) -> MarketSnapshot {
    MarketSnapshot {
        shoe: ShoeState::full(8),
        selections: vec![selection(back)],
        settlements,
    }
}

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, h, m, 0).unwrap()
}

fn cleared(bet_id: &str, outcome: &str, profit: Option<f64>, settled: DateTime<Utc>) -> ClearedOrder {
    ClearedOrder {
        bet_id: bet_id.to_string(),
        outcome: BetOutcome::parse(outcome),
        profit,
        commission: None,
        settled_at: Some(settled),
        settled_raw: Some(settled.to_rfc3339()),
        raw: format!(r#"{{"betId":"{bet_id}"}}"#),
    }
}

fn accepting_gateway() -> MockGateway {
    let counter = AtomicU32::new(0);
    let mut gateway = MockGateway::new();
    gateway.expect_submit().returning(move |_| {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(OrderReceipt::accepted(format!("b{n}")))
    });
    gateway
}

fn executor(gateway: MockGateway, max_orders_per_minute: u32) -> BetExecutor {
    BetExecutor::new(Arc::new(gateway), Arc::new(NoopMetrics), max_orders_per_minute)
}

fn trading_loop(source: MockSource, placement: Placement, alerts: Arc<RecordingAlerts>) -> TradingLoop {
    TradingLoop::new(
        ExposureLedger::with_exposure_pct(1000.0, 0.1),
        StakeSizer::new(SizingStrategy::Kelly, 0.5, 0.1, None),
        StrategySettings::default(),
        LoopSettings::default(),
        Arc::new(NoopMetrics),
        alerts,
    )
    .with_source(Arc::new(source))
    .with_placement(placement)
}

// ---- Integration Tests ----

#[tokio::test]
async fn test_end_to_end_kelly_accept_and_settle() {
    let sizer = StakeSizer::new(SizingStrategy::Kelly, 0.5, 0.1, None);
    let stake = sizer.size(1000.0, 0.025, Some(5.0), Some(0.25));
    assert_eq!(stake, 31.25);

    let mut gateway = MockGateway::new();
    gateway
        .expect_submit()
        .withf(|req| req.selection_id == "1" && req.action == Action::Back && req.stake == 31.25)
        .times(1)
        .returning(|_| Ok(OrderReceipt::accepted("b1")));

    let mut ledger = ExposureLedger::new(1000.0, 100.0);
    let outcome = executor(gateway, 0)
        .execute(&opportunity(stake, 5.0), &mut ledger)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        ExecutionOutcome::Recorded {
            bet_id: "b1".to_string(),
            stake: 31.25
        }
    );
    assert_eq!(ledger.balance(), 968.75);
    assert_eq!(ledger.current_exposure(), 31.25);

    assert_eq!(ledger.process_settlement("b1", &BetOutcome::Won, 125.0), Some(125.0));
    assert_eq!(ledger.balance(), 1125.0);
    assert_eq!(ledger.current_exposure(), 0.0);
    assert_eq!(ledger.pnl(), 125.0);
}

#[tokio::test]
async fn test_capacity_rejection_never_reaches_gateway() {
    let mut gateway = MockGateway::new();
    gateway.expect_submit().never();

    let mut ledger = ExposureLedger::new(1000.0, 10.0);
    let outcome = executor(gateway, 0)
        .execute(&opportunity(31.25, 5.0), &mut ledger)
        .await
        .unwrap();

    assert_eq!(outcome, ExecutionOutcome::CapacityRejected);
    assert_eq!(ledger.balance(), 1000.0);
    assert_eq!(ledger.active_bets(), 0);
}

#[tokio::test]
async fn test_ledger_books_the_submitted_stake() {
    let mut gateway = MockGateway::new();
    gateway
        .expect_submit()
        .withf(|req| req.stake == 31.25)
        .times(1)
        .returning(|_| Ok(OrderReceipt::accepted("b1")));

    let mut ledger = ExposureLedger::new(1000.0, 100.0);
    let outcome = executor(gateway, 0)
        .execute(&opportunity(31.259, 5.0), &mut ledger)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        ExecutionOutcome::Recorded {
            bet_id: "b1".to_string(),
            stake: 31.25
        }
    );
    assert_eq!(ledger.active_bet("b1").unwrap().stake, 31.25);
    assert_eq!(ledger.current_exposure(), 31.25);
    assert_eq!(ledger.balance(), 968.75);

    // A loss costs what the exchange held, not the unrounded size.
    assert_eq!(ledger.process_settlement("b1", &BetOutcome::Lost, 0.0), Some(-31.25));
    assert_eq!(ledger.balance(), 968.75);
}

#[tokio::test]
async fn test_sub_cent_stake_is_never_sent() {
    let mut gateway = MockGateway::new();
    gateway.expect_submit().never();

    let mut ledger = ExposureLedger::new(1000.0, 100.0);
    let outcome = executor(gateway, 0)
        .execute(&opportunity(0.004, 5.0), &mut ledger)
        .await
        .unwrap();

    assert_eq!(outcome, ExecutionOutcome::StakeTooSmall);
    assert_eq!(ledger.active_bets(), 0);
}

#[tokio::test]
async fn test_executor_outcomes() {
    let mut gateway = MockGateway::new();
    let mut seq = mockall::Sequence::new();
    gateway
        .expect_submit()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(OrderReceipt::rejected("MARKET_SUSPENDED")));
    gateway
        .expect_submit()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| {
            Ok(OrderReceipt {
                bet_id: None,
                ..OrderReceipt::accepted("ignored")
            })
        });
    gateway
        .expect_submit()
        .times(2)
        .in_sequence(&mut seq)
        .returning(|_| Ok(OrderReceipt::accepted("dup")));
    gateway
        .expect_submit()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Err(anyhow::anyhow!("connection reset")));

    let exec = executor(gateway, 0);
    let mut ledger = ExposureLedger::new(1000.0, 100.0);
    let opp = opportunity(10.0, 5.0);

    assert_eq!(
        exec.execute(&opp, &mut ledger).await.unwrap(),
        ExecutionOutcome::Rejected {
            reason: Some("MARKET_SUSPENDED".to_string())
        }
    );
    assert_eq!(
        exec.execute(&opp, &mut ledger).await.unwrap(),
        ExecutionOutcome::AcceptedUntracked
    );
    assert!(matches!(
        exec.execute(&opp, &mut ledger).await.unwrap(),
        ExecutionOutcome::Recorded { .. }
    ));
    assert_eq!(
        exec.execute(&opp, &mut ledger).await.unwrap(),
        ExecutionOutcome::LedgerRefused(LedgerError::DuplicateBet("dup".to_string()))
    );
    assert!(exec.execute(&opp, &mut ledger).await.is_err());

    // Only the first "dup" was booked.
    assert_eq!(ledger.active_bets(), 1);
    assert_eq!(ledger.balance(), 990.0);
}

#[tokio::test]
async fn test_rate_limit_throttles_second_order() {
    let exec = executor(accepting_gateway(), 1);
    let mut ledger = ExposureLedger::new(1000.0, 100.0);

    let first = exec.execute(&opportunity(5.0, 5.0), &mut ledger).await.unwrap();
    let second = exec.execute(&opportunity(5.0, 5.0), &mut ledger).await.unwrap();

    assert!(matches!(first, ExecutionOutcome::Recorded { .. }));
    assert_eq!(second, ExecutionOutcome::Throttled);
    assert_eq!(ledger.active_bets(), 1);
}

#[tokio::test]
async fn test_reconciliation_dedups_overlapping_windows() {
    let mut feed = MockFeed::new();
    let mut seq = mockall::Sequence::new();
    feed.expect_query()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| {
            Ok(vec![
                cleared("b1", "WON", Some(40.0), at(10, 5)),
                cleared("b9", "LOST", None, at(10, 7)),
            ])
        });
    feed.expect_query()
        .times(1)
        .in_sequence(&mut seq)
        .withf(|range| range.from == at(10, 7))
        .returning(|_| {
            Ok(vec![
                cleared("b1", "WON", Some(40.0), at(10, 5)),
                cleared("b9", "LOST", None, at(10, 7)),
                cleared("b2", "LOST", None, at(10, 30)),
            ])
        });

    let mut store = MockStore::new();
    store.expect_save().times(2).returning(|_| Ok(()));

    let service = ReconciliationService::new(
        Arc::new(feed),
        Arc::new(store),
        Arc::new(NoopMetrics),
        ReconcileSettings::default(),
    );

    let mut ledger = ExposureLedger::new(1000.0, 100.0);
    ledger.record_accepted("b1", opportunity(10.0, 5.0)).unwrap();
    ledger.record_accepted("b2", opportunity(20.0, 5.0)).unwrap();

    let (state, first) = service
        .reconcile(&mut ledger, ReconciliationState::default(), at(11, 0))
        .await
        .unwrap();
    assert_eq!(first.fetched, 2);
    assert_eq!(first.processed, 2);
    assert_eq!(first.applied, 1);
    assert_eq!(first.profit, 40.0);
    assert_eq!(state.last_cleared_timestamp.as_deref(), Some("2024-05-01T10:07:00.000Z"));
    // Unknown IDs are remembered too.
    assert_eq!(state.processed_bet_ids, vec!["b1", "b9"]);

    let (state, second) = service.reconcile(&mut ledger, state, at(11, 0)).await.unwrap();
    assert_eq!(second.duplicates, 2);
    assert_eq!(second.processed, 1);
    assert_eq!(second.applied, 1);
    assert_eq!(second.profit, -20.0);
    assert_eq!(state.last_cleared_timestamp.as_deref(), Some("2024-05-01T10:30:00.000Z"));

    assert_eq!(ledger.balance(), 1020.0);
    assert_eq!(ledger.current_exposure(), 0.0);
    assert_eq!(ledger.pnl(), 20.0);
}

#[tokio::test]
async fn test_reconciliation_feed_failure_persists_nothing() {
    let mut feed = MockFeed::new();
    feed.expect_query()
        .returning(|_| Err(anyhow::anyhow!("503 Service Unavailable")));
    let mut store = MockStore::new();
    store.expect_save().never();

    let service = ReconciliationService::new(
        Arc::new(feed),
        Arc::new(store),
        Arc::new(NoopMetrics),
        ReconcileSettings::default(),
    );

    let mut ledger = ExposureLedger::new(1000.0, 100.0);
    ledger.record_accepted("b1", opportunity(10.0, 5.0)).unwrap();

    let result = service
        .reconcile(&mut ledger, ReconciliationState::default(), at(11, 0))
        .await;
    assert!(result.is_err());
    assert!(ledger.is_active("b1"));
    assert_eq!(ledger.balance(), 990.0);
}

#[tokio::test]
async fn test_snapshot_and_cleared_paths_settle_once() {
    let mut feed = MockFeed::new();
    feed.expect_query()
        .returning(|_| Ok(vec![cleared("b1", "WON", Some(40.0), at(10, 5))]));
    let mut store = MockStore::new();
    store.expect_save().returning(|_| Ok(()));

    let service = ReconciliationService::new(
        Arc::new(feed),
        Arc::new(store),
        Arc::new(NoopMetrics),
        ReconcileSettings::default(),
    );

    let mut ledger = ExposureLedger::new(1000.0, 100.0);
    ledger.record_accepted("b1", opportunity(10.0, 5.0)).unwrap();
    assert_eq!(ledger.process_settlement("b1", &BetOutcome::Won, 40.0), Some(40.0));

    let (_, report) = service
        .reconcile(&mut ledger, ReconciliationState::default(), at(11, 0))
        .await
        .unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(report.applied, 0);
    assert_eq!(ledger.balance(), 1040.0);
    assert_eq!(ledger.trade_history().len(), 1);
}

#[tokio::test]
async fn test_reconciliation_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state").join("reconcile.json");
    let audit_path = dir.path().join("cleared.csv");

    let build = || {
        let mut feed = MockFeed::new();
        feed.expect_query()
            .returning(|_| Ok(vec![cleared("b1", "WON", Some(40.0), at(10, 5))]));
        ReconciliationService::new(
            Arc::new(feed),
            Arc::new(JsonStateStore::new(&state_path)),
            Arc::new(NoopMetrics),
            ReconcileSettings::default(),
        )
        .with_audit(Arc::new(CsvAuditLog::new(&audit_path)))
    };

    let mut ledger = ExposureLedger::new(1000.0, 100.0);
    ledger.record_accepted("b1", opportunity(10.0, 5.0)).unwrap();

    let first = build().run_once(&mut ledger, at(11, 0)).await.unwrap();
    assert_eq!(first.applied, 1);

    // A restarted service reads the persisted IDs and skips the repeat.
    let second = build().run_once(&mut ledger, at(11, 1)).await.unwrap();
    assert_eq!(second.duplicates, 1);
    assert_eq!(second.processed, 0);
    assert_eq!(ledger.balance(), 1040.0);

    let stored = JsonStateStore::new(&state_path).load().await.unwrap();
    assert_eq!(stored.processed_bet_ids, vec!["b1"]);

    let audit = std::fs::read_to_string(&audit_path).unwrap();
    let lines: Vec<&str> = audit.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("betId,settledDate,betOutcome,profit,commission,raw"));
    assert!(lines[1].starts_with("b1,"));
}

#[tokio::test]
async fn test_trading_loop_places_then_settles_from_snapshot() {
    let mut source = MockSource::new();
    let mut seq = mockall::Sequence::new();
    source
        .expect_get_snapshot()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(snapshot(20.0, vec![])));
    source
        .expect_get_snapshot()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| {
            Ok(snapshot(
                1.01,
                vec![
                    SettlementEvent {
                        bet_id: None,
                        selection_id: Some("1".to_string()),
                        status: BetOutcome::Won,
                        payout: 999.0,
                    },
                    SettlementEvent {
                        bet_id: Some("b1".to_string()),
                        selection_id: Some("1".to_string()),
                        status: BetOutcome::Won,
                        payout: 100.0,
                    },
                ],
            ))
        });

    let mut gateway = MockGateway::new();
    gateway
        .expect_submit()
        .with(function(|req: &OrderRequest| req.price == 20.0 && req.action == Action::Back))
        .times(1)
        .returning(|_| Ok(OrderReceipt::accepted("b1")));

    let alerts = Arc::new(RecordingAlerts::default());
    let mut bot = trading_loop(source, Placement::Direct(executor(gateway, 0)), Arc::clone(&alerts));

    let first = bot.run_iteration().await.unwrap();
    assert_eq!(first.opportunities, 1);
    assert_eq!(first.bets_recorded, 1);
    let stake = bot.ledger().active_bet("b1").unwrap().stake;
    assert!(stake > 0.0 && stake <= 50.0);
    assert_eq!(bot.ledger().balance(), 1000.0 - stake);

    let second = bot.run_iteration().await.unwrap();
    assert_eq!(second.opportunities, 0);
    assert_eq!(second.settlements_applied, 1);
    assert!((bot.ledger().balance() - 1100.0).abs() < 1e-9);
    assert_eq!(bot.ledger().current_exposure(), 0.0);
    assert!(alerts.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_trading_loop_gate_blocks_and_alerts_once() {
    let mut source = MockSource::new();
    source
        .expect_get_snapshot()
        .times(2)
        .returning(|| Ok(snapshot(20.0, vec![])));

    let mut gateway = MockGateway::new();
    gateway.expect_submit().never();

    let gate = OperatorGate::new(false, true, None, Some("token"));
    let alerts = Arc::new(RecordingAlerts::default());
    let mut bot = trading_loop(
        source,
        Placement::Gated {
            executor: executor(gateway, 0),
            gate,
        },
        Arc::clone(&alerts),
    );

    assert_eq!(bot.run_iteration().await.unwrap().gate_blocked, 1);
    assert_eq!(bot.run_iteration().await.unwrap().gate_blocked, 1);

    let sent = alerts.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, AlertLevel::Warning);
    assert_eq!(bot.ledger().active_bets(), 0);
}

#[tokio::test]
async fn test_trading_loop_survives_bad_snapshot() {
    let mut source = MockSource::new();
    let mut seq = mockall::Sequence::new();
    source
        .expect_get_snapshot()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Err(anyhow::anyhow!("timeout")));
    source
        .expect_get_snapshot()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| {
            Ok(MarketSnapshot {
                shoe: ShoeState::full(8),
                selections: vec![],
                settlements: vec![],
            })
        });
    source
        .expect_get_snapshot()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(snapshot(20.0, vec![])));

    let mut bot = TradingLoop::new(
        ExposureLedger::with_exposure_pct(1000.0, 0.1),
        StakeSizer::new(SizingStrategy::Kelly, 0.5, 0.1, None),
        StrategySettings::default(),
        LoopSettings {
            poll_interval: Duration::from_millis(1),
            iterations: Some(3),
            ..LoopSettings::default()
        },
        Arc::new(NoopMetrics),
        Arc::new(RecordingAlerts::default()),
    )
    .with_source(Arc::new(source))
    .with_placement(Placement::Direct(executor(accepting_gateway(), 0)));

    // Keep the sender alive so the loop is bounded by iterations only.
    let (_shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
    let summary = bot.run(shutdown_rx).await;

    assert_eq!(summary.iterations, 3);
    assert_eq!(summary.failed_iterations, 2);
    assert_eq!(summary.bets_recorded, 1);
}

#[tokio::test]
async fn test_capacity_rejection_raises_alert() {
    let mut source = MockSource::new();
    source
        .expect_get_snapshot()
        .returning(|| Ok(snapshot(20.0, vec![])));

    let mut gateway = MockGateway::new();
    gateway.expect_submit().never();

    let alerts = Arc::new(RecordingAlerts::default());
    let mut bot = TradingLoop::new(
        ExposureLedger::new(1000.0, 1.0),
        StakeSizer::new(SizingStrategy::Kelly, 0.5, 0.1, None),
        StrategySettings::default(),
        LoopSettings::default(),
        Arc::new(NoopMetrics),
        alerts.clone(),
    )
    .with_source(Arc::new(source))
    .with_placement(Placement::Direct(executor(gateway, 0)));

    let report = bot.run_iteration().await.unwrap();
    assert_eq!(report.capacity_rejections, 1);

    let sent = alerts.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.contains("exposure/balance limits"));
}
