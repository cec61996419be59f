//! Baccarat Side-Bet Bot - Entry Point
//!
//! Initializes configuration, logging and adapters, then runs the
//! trading loop until the iteration budget is spent or SIGINT arrives.
//!
//! Wiring sequence:
//! 1. Parse CLI flags, load config.toml + validate, apply overrides
//! 2. Init tracing (JSON structured logging)
//! 3. Metrics sink (Prometheus on `metrics.bind_address` when enabled)
//! 4. Alert sink (webhook or log-only)
//! 5. Simulation: simulated table as snapshot source and order gateway
//! 6. Live: exchange client, gated order gateway, cleared-order
//!    reconciliation with state file + CSV audit
//! 7. Spawn the trading loop
//! 8. Wait for loop completion or SIGINT -> broadcast shutdown -> exit

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use baccarat_sidebet_bot::adapters::alerts::WebhookAlerts;
use baccarat_sidebet_bot::adapters::exchange::{
    ExchangeClearedOrders, ExchangeClient, ExchangeClientConfig, ExchangeOrderGateway,
};
use baccarat_sidebet_bot::adapters::metrics::PrometheusMetrics;
use baccarat_sidebet_bot::adapters::persistence::{CsvAuditLog, JsonStateStore};
use baccarat_sidebet_bot::adapters::simulated::{SimulatedTable, TableSettings};
use baccarat_sidebet_bot::config::{self, AppConfig};
use baccarat_sidebet_bot::domain::stake::StakeSizer;
use baccarat_sidebet_bot::ports::metrics::{MetricsSink, NoopMetrics};
use baccarat_sidebet_bot::usecases::executor::BetExecutor;
use baccarat_sidebet_bot::usecases::ledger::ExposureLedger;
use baccarat_sidebet_bot::usecases::operator_gate::OperatorGate;
use baccarat_sidebet_bot::usecases::reconciliation::{ReconcileSettings, ReconciliationService};
use baccarat_sidebet_bot::usecases::trading_loop::{
    LoopSettings, Placement, StrategySettings, TradingLoop,
};

/// Baccarat side-bet edge bot.
#[derive(Debug, Parser)]
#[command(name = "sidebet-bot", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config.toml")]
    config: String,
    /// Stop after this many iterations.
    #[arg(long)]
    iterations: Option<u64>,
    /// Delay between iterations in milliseconds.
    #[arg(long)]
    poll_interval_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. CLI + configuration ──────────────────────────────
    let cli = Cli::parse();
    let mut config = config::loader::load_config(&cli.config)
        .context("Failed to load configuration")?;
    if let Some(iterations) = cli.iterations {
        config.bot.iterations = Some(iterations);
    }
    if let Some(poll_ms) = cli.poll_interval_ms {
        config.bot.poll_interval_ms = poll_ms.max(1);
    }

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.bot.log_level)),
        )
        .json()
        .init();

    info!(
        name = %config.bot.name,
        version = env!("CARGO_PKG_VERSION"),
        simulate = config.bot.simulate,
        place_bets = config.bot.place_bets,
        live_enabled = config.bot.live_enabled,
        iterations = ?config.bot.iterations,
        "Starting baccarat side-bet bot"
    );

    // ── 3. Shutdown channel + metrics ───────────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);
    let metrics = build_metrics(&config, &shutdown_tx)?;

    // ── 4. Alerts ───────────────────────────────────────────
    let alerts = Arc::new(
        WebhookAlerts::new(config.alerts.enabled, config.alerts.webhook_url.clone())
            .context("Failed to create alert sink")?,
    );
    if !alerts.is_delivering() {
        info!("Alerts are logged only");
    }

    // ── 5/6. Trading loop for the configured mode ───────────
    let strategy = &config.strategy;
    let ledger = ExposureLedger::with_exposure_pct(strategy.start_balance, strategy.max_exposure_pct);
    let sizer = StakeSizer::new(
        strategy.strategy,
        strategy.kelly_shrink,
        strategy.max_exposure_pct,
        strategy.max_stake_pct,
    );
    let loop_settings = LoopSettings {
        poll_interval: Duration::from_millis(config.bot.poll_interval_ms),
        iterations: config.bot.iterations,
        reconcile_interval: Duration::from_secs(config.reconciliation.poll_interval_secs),
    };
    let trading = TradingLoop::new(
        ledger,
        sizer,
        StrategySettings {
            min_edge: strategy.min_edge,
            allow_lay: strategy.allow_lay,
        },
        loop_settings,
        Arc::clone(&metrics),
        alerts,
    );

    let gate = OperatorGate::from_env(
        config.bot.simulate,
        config.bot.live_enabled,
        &config.bot.operator_token_env,
        config.bot.operator_token_hash.clone(),
    );
    gate.log_status();

    let mut trading = if config.bot.simulate {
        simulated_loop(trading, &config, &metrics, gate)
    } else {
        live_loop(trading, &config, &metrics, gate)?
    };

    // ── 7. Spawn the trading loop ───────────────────────────
    let loop_shutdown = shutdown_tx.subscribe();
    let engine = tokio::spawn(async move { trading.run(loop_shutdown).await });

    info!("Trading loop spawned - bot is running");

    // ── 8. SIGINT -> broadcast shutdown, then wait for the loop ─
    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("SIGINT received, initiating graceful shutdown");
            let _ = signal_tx.send(());
        }
    });

    let summary = engine.await.context("Trading loop task failed")?;

    // Stops the metrics server too.
    let _ = shutdown_tx.send(());

    info!(
        iterations = summary.iterations,
        failed = summary.failed_iterations,
        bets = summary.bets_recorded,
        balance = summary.balance,
        exposure = summary.exposure,
        pnl = summary.pnl,
        "Shutdown complete"
    );
    Ok(())
}

/// Prometheus sink served in the background, or a no-op sink.
fn build_metrics(config: &AppConfig, shutdown_tx: &broadcast::Sender<()>) -> Result<Arc<dyn MetricsSink>> {
    if !config.metrics.enabled {
        return Ok(Arc::new(NoopMetrics));
    }

    let prometheus = Arc::new(PrometheusMetrics::new().context("Failed to create metrics registry")?);
    let server = Arc::clone(&prometheus);
    let bind_address = config.metrics.bind_address.clone();
    let shutdown_rx = shutdown_tx.subscribe();
    tokio::spawn(async move {
        if let Err(e) = server.serve(bind_address, shutdown_rx).await {
            error!(error = ?e, "Metrics server failed");
        }
    });
    Ok(prometheus)
}

/// Simulated table as both snapshot source and order gateway.
///
/// With `place_bets = false` orders go through the operator gate, which
/// never authorizes in simulation, so the table is only observed.
fn simulated_loop(
    trading: TradingLoop,
    config: &AppConfig,
    metrics: &Arc<dyn MetricsSink>,
    gate: OperatorGate,
) -> TradingLoop {
    let sim = &config.simulator;
    let settings = TableSettings {
        start_cards: sim.start_cards,
        decrement: sim.decrement,
        reset_after: sim.reset_after,
        settle_delay: sim.settle_delay,
    };
    let table = Arc::new(match sim.seed {
        Some(seed) => SimulatedTable::seeded(settings, seed),
        None => SimulatedTable::from_entropy(settings),
    });

    let executor = BetExecutor::new(
        table.clone(),
        Arc::clone(metrics),
        config.rate_limits.max_orders_per_minute,
    );
    let placement = if config.bot.place_bets {
        Placement::Direct(executor)
    } else {
        Placement::Gated { executor, gate }
    };

    trading.with_source(table).with_placement(placement)
}

/// Exchange gateway behind the operator gate, plus reconciliation.
fn live_loop(
    trading: TradingLoop,
    config: &AppConfig,
    metrics: &Arc<dyn MetricsSink>,
    gate: OperatorGate,
) -> Result<TradingLoop> {
    let exchange = &config.exchange;
    let client_config = ExchangeClientConfig {
        url: exchange.json_rpc_url.clone(),
        app_key: read_env(&exchange.app_key_env)?,
        session_token: read_env(&exchange.session_token_env)?,
        timeout: Duration::from_millis(exchange.timeout_ms),
        max_attempts: exchange.max_retries,
        retry_base_delay: Duration::from_millis(exchange.retry_base_delay_ms),
    };
    let client = Arc::new(
        ExchangeClient::new(client_config, Arc::clone(metrics))
            .context("Failed to create exchange client")?,
    );

    let gateway = Arc::new(ExchangeOrderGateway::new(
        Arc::clone(&client),
        exchange.market_id.clone(),
    ));
    let executor = BetExecutor::new(
        gateway,
        Arc::clone(metrics),
        config.rate_limits.max_orders_per_minute,
    );
    let mut trading = trading.with_placement(Placement::Gated { executor, gate });

    // TODO: wire a live table snapshot source once its transport exists;
    // until then the live loop only reconciles.
    warn!("No live snapshot source configured; opportunities will not be priced");

    let recon = &config.reconciliation;
    if recon.enabled {
        let service = ReconciliationService::new(
            Arc::new(ExchangeClearedOrders::new(client)),
            Arc::new(JsonStateStore::new(&recon.state_file)),
            Arc::clone(metrics),
            ReconcileSettings {
                lookback: chrono::Duration::seconds(recon.lookback_secs),
                max_processed: recon.max_processed,
            },
        )
        .with_audit(Arc::new(CsvAuditLog::new(&recon.audit_csv)));
        trading = trading.with_reconciliation(service);
        info!(
            state_file = %recon.state_file,
            audit_csv = %recon.audit_csv,
            every_secs = recon.poll_interval_secs,
            "Cleared-order reconciliation enabled"
        );
    }

    Ok(trading)
}

fn read_env(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("Environment variable {name} is not set"))
}
