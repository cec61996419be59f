//! Prometheus Metrics Registry - Bot Observability
//!
//! Registers the bot's counters and gauges and exposes them on
//! `/metrics` for scraping. Implements the `MetricsSink` port so the
//! rest of the crate never touches the registry directly.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, Gauge, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tokio::sync::broadcast;
use tracing::{error, info, instrument};

use crate::ports::metrics::MetricsSink;

/// Prometheus-backed metrics, all named `sidebet_bot_*`.
pub struct PrometheusMetrics {
    registry: Registry,
    /// Orders submitted, by selection.
    pub bets_placed: IntCounterVec,
    /// Orders accepted, by selection.
    pub bets_accepted: IntCounterVec,
    /// Settlements applied, by outcome (`won` / `lost`).
    pub settlements: IntCounterVec,
    pub capacity_rejections: IntCounter,
    /// Transport retries, by RPC method.
    pub transport_retries: IntCounterVec,
    /// Transport failures, by RPC method.
    pub transport_errors: IntCounterVec,
    pub shoe_resets: IntCounter,
    pub balance: Gauge,
    pub exposure: Gauge,
    pub pnl: Gauge,
}

impl PrometheusMetrics {
    /// Create and register all metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let bets_placed = IntCounterVec::new(
            Opts::new("sidebet_bot_bets_placed_total", "Orders submitted to the gateway"),
            &["selection"],
        )?;

        let bets_accepted = IntCounterVec::new(
            Opts::new("sidebet_bot_bets_accepted_total", "Orders accepted by the gateway"),
            &["selection"],
        )?;

        let settlements = IntCounterVec::new(
            Opts::new("sidebet_bot_settlements_total", "Settlements applied to the ledger"),
            &["outcome"],
        )?;

        let capacity_rejections = IntCounter::new(
            "sidebet_bot_capacity_rejections_total",
            "Stakes refused for lack of balance or exposure headroom",
        )?;

        let transport_retries = IntCounterVec::new(
            Opts::new("sidebet_bot_rpc_retries_total", "Exchange RPC retries"),
            &["method"],
        )?;

        let transport_errors = IntCounterVec::new(
            Opts::new("sidebet_bot_rpc_errors_total", "Exchange RPC failures"),
            &["method"],
        )?;

        let shoe_resets = IntCounter::new("sidebet_bot_shoe_resets_total", "Shoe replacements observed")?;

        let balance = Gauge::new("sidebet_bot_balance", "Free balance")?;
        let exposure = Gauge::new("sidebet_bot_exposure", "Capital reserved by live bets")?;
        let pnl = Gauge::new("sidebet_bot_pnl", "Realized profit and loss")?;

        registry.register(Box::new(bets_placed.clone()))?;
        registry.register(Box::new(bets_accepted.clone()))?;
        registry.register(Box::new(settlements.clone()))?;
        registry.register(Box::new(capacity_rejections.clone()))?;
        registry.register(Box::new(transport_retries.clone()))?;
        registry.register(Box::new(transport_errors.clone()))?;
        registry.register(Box::new(shoe_resets.clone()))?;
        registry.register(Box::new(balance.clone()))?;
        registry.register(Box::new(exposure.clone()))?;
        registry.register(Box::new(pnl.clone()))?;

        Ok(Self {
            registry,
            bets_placed,
            bets_accepted,
            settlements,
            capacity_rejections,
            transport_retries,
            transport_errors,
            shoe_resets,
            balance,
            exposure,
            pnl,
        })
    }

    /// Text exposition of every registered metric.
    pub fn render(&self) -> String {
        render_registry(&self.registry)
    }

    /// Serve `/metrics` until the shutdown signal fires.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let registry = self.registry.clone();
        let app = Router::new().route(
            "/metrics",
            get(move || {
                let registry = registry.clone();
                async move { render_registry(&registry) }
            }),
        );

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Prometheus metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}

fn render_registry(registry: &Registry) -> String {
    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&registry.gather(), &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

impl MetricsSink for PrometheusMetrics {
    fn bet_placed(&self, selection: &str) {
        self.bets_placed.with_label_values(&[selection]).inc();
    }

    fn bet_accepted(&self, selection: &str) {
        self.bets_accepted.with_label_values(&[selection]).inc();
    }

    fn settlement(&self, won: bool) {
        let outcome = if won { "won" } else { "lost" };
        self.settlements.with_label_values(&[outcome]).inc();
    }

    fn capacity_rejection(&self) {
        self.capacity_rejections.inc();
    }

    fn transport_retry(&self, method: &str) {
        self.transport_retries.with_label_values(&[method]).inc();
    }

    fn transport_error(&self, method: &str) {
        self.transport_errors.with_label_values(&[method]).inc();
    }

    fn shoe_reset(&self) {
        self.shoe_resets.inc();
    }

    fn ledger(&self, balance: f64, exposure: f64, pnl: f64) {
        self.balance.set(balance);
        self.exposure.set(exposure);
        self.pnl.set(pnl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_updates_registry() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.bet_placed("Natural Win");
        metrics.bet_placed("Natural Win");
        metrics.settlement(true);
        metrics.settlement(false);
        metrics.transport_retry("SportsAPING/v1.0/placeOrders");
        metrics.ledger(968.75, 31.25, 0.0);

        assert_eq!(metrics.bets_placed.with_label_values(&["Natural Win"]).get(), 2);
        assert_eq!(metrics.settlements.with_label_values(&["won"]).get(), 1);
        assert_eq!(metrics.exposure.get(), 31.25);

        let text = metrics.render();
        assert!(text.contains("sidebet_bot_bets_placed_total"));
        assert!(text.contains("sidebet_bot_balance 968.75"));
    }
}
