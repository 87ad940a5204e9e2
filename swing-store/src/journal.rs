//! Append-only audit files: the recovery log and the CSV trade journal.
//!
//! Writes are synchronous file appends run on tokio's blocking pool, so the
//! async entry points never stall the decision loop.

use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use swing_domain::{ExchangeHoldings, Position, TradeRecord};

async fn run_blocking<F>(write: F) -> StoreResult<()>
where
    F: FnOnce() -> StoreResult<()> + Send + 'static,
{
    tokio::task::spawn_blocking(write)
        .await
        .map_err(|e| StoreError::Background(e.to_string()))?
}

fn ensure_parent(path: &Path) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

// =============================================================================
// Recovery log
// =============================================================================

/// One line per recovered position.
#[derive(Debug, Clone)]
pub struct RecoveryLog {
    path: PathBuf,
}

impl RecoveryLog {
    /// Log backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Log file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a recovery event.
    pub async fn append(&self, holdings: &ExchangeHoldings, at: DateTime<Utc>) -> StoreResult<()> {
        let path = self.path.clone();
        let line = format!(
            "{} - recovered position: {} {} @ {}",
            at.to_rfc3339(),
            holdings.side,
            holdings.quantity,
            holdings.reference_price
        );
        run_blocking(move || {
            ensure_parent(&path)?;
            let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
            writeln!(file, "{}", line)?;
            Ok(())
        })
        .await
    }
}

// =============================================================================
// Trade journal
// =============================================================================

#[derive(Debug, Serialize)]
struct JournalRow {
    timestamp: String,
    action: &'static str,
    side: String,
    price: Decimal,
    quantity: Decimal,
    stop_loss: Option<Decimal>,
    take_profit: Option<Decimal>,
    reason: String,
    pnl_pct: Option<Decimal>,
    duration_hours: Option<Decimal>,
    recovered: bool,
    simulated: bool,
}

/// CSV journal of opens and closes.
#[derive(Debug, Clone)]
pub struct TradeJournal {
    path: PathBuf,
}

impl TradeJournal {
    /// Journal backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Journal file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record an opened position.
    pub async fn record_open(&self, position: &Position) -> StoreResult<()> {
        self.append(JournalRow {
            timestamp: position.entry_time.to_rfc3339(),
            action: "OPEN",
            side: position.side.to_string(),
            price: position.entry_price.as_decimal().normalize(),
            quantity: position.quantity.as_decimal().normalize(),
            stop_loss: Some(position.stop_loss.as_decimal().normalize()),
            take_profit: Some(position.take_profit.as_decimal().normalize()),
            reason: if position.recovered { "recovered".into() } else { "signal confirmed".into() },
            pnl_pct: None,
            duration_hours: None,
            recovered: position.recovered,
            simulated: position.simulated_entry,
        })
        .await
    }

    /// Record a closed trade.
    pub async fn record_close(&self, trade: &TradeRecord) -> StoreResult<()> {
        self.append(JournalRow {
            timestamp: trade.exit_time.to_rfc3339(),
            action: "CLOSE",
            side: trade.side.to_string(),
            price: trade.exit_price.as_decimal().normalize(),
            quantity: trade.quantity.as_decimal().normalize(),
            stop_loss: None,
            take_profit: None,
            reason: trade.reason.clone(),
            pnl_pct: Some(trade.pnl_pct.round_dp(4).normalize()),
            duration_hours: Some(trade.duration_hours.normalize()),
            recovered: trade.recovered,
            simulated: trade.simulated_exit,
        })
        .await
    }

    async fn append(&self, row: JournalRow) -> StoreResult<()> {
        let path = self.path.clone();
        run_blocking(move || write_row(&path, &row)).await
    }
}

fn write_row(path: &Path, row: &JournalRow) -> StoreResult<()> {
    ensure_parent(path)?;
    let file_has_data = fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(!file_has_data)
        .from_writer(file);
    writer.serialize(row)?;
    writer.flush()?;
    Ok(())
}
