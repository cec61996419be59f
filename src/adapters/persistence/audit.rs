//! Audit Trail - Append-only CSV of Applied Cleared Orders
//!
//! One row per cleared order applied to the ledger, with the feed's raw
//! record kept verbatim in the last column. The header is written when
//! the file is first created.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::instrument;

use crate::domain::market::ClearedOrder;
use crate::ports::repository::AuditLog;

/// CSV column names, in order.
pub const AUDIT_HEADER: [&str; 6] = ["betId", "settledDate", "betOutcome", "profit", "commission", "raw"];

/// CSV-backed [`AuditLog`].
pub struct CsvAuditLog {
    path: PathBuf,
    /// Serializes appends so rows never interleave.
    write_lock: Mutex<()>,
}

impl CsvAuditLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }
}

fn encode_row(order: &ClearedOrder, with_header: bool) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    if with_header {
        writer.write_record(AUDIT_HEADER)?;
    }

    let fmt_opt = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
    let outcome = order.outcome.to_string();
    let profit = fmt_opt(order.profit);
    let commission = fmt_opt(order.commission);
    writer.write_record([
        order.bet_id.as_str(),
        order.settled_raw.as_deref().unwrap_or(""),
        outcome.as_str(),
        profit.as_str(),
        commission.as_str(),
        order.raw.as_str(),
    ])?;

    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush audit row: {e}"))
}

#[async_trait]
impl AuditLog for CsvAuditLog {
    #[instrument(skip(self, order), fields(bet_id = %order.bet_id))]
    async fn append(&self, order: &ClearedOrder) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .context("Failed to create audit directory")?;
        }

        let is_new = fs::metadata(&self.path)
            .await
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let bytes = encode_row(order, is_new)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .context("Failed to open audit CSV")?;

        file.write_all(&bytes)
            .await
            .context("Failed to write audit row")?;
        file.flush().await.context("Failed to flush audit CSV")?;

        Ok(())
    }
}
