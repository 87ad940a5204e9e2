//! Performance Metrics
//!
//! Running counters over every signal and trade the daemon has seen.
//! Persisted with the rest of the state so they survive restarts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cumulative trading performance.
///
/// # Invariants
/// - `winning_trades + losing_trades == total_trades`
/// - `max_consecutive_losses >= consecutive_losses`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceMetrics {
    /// Signals raised by the detector
    pub signals_detected: u64,
    /// Signals that passed confirmation
    pub signals_confirmed: u64,
    /// Signals that expired or were cancelled by a trend flip
    pub signals_expired: u64,
    /// Closed trades
    pub total_trades: u64,
    /// Trades with P&L > 0
    pub winning_trades: u64,
    /// Trades with P&L <= 0
    pub losing_trades: u64,
    /// Current losing streak
    pub consecutive_losses: u32,
    /// Longest losing streak seen
    pub max_consecutive_losses: u32,
    /// Sum of leveraged P&L percentages
    pub total_pnl_pct: Decimal,
    /// Positions rebuilt from exchange holdings
    pub recoveries_performed: u64,
}

impl PerformanceMetrics {
    /// Fold a closed trade's P&L into the counters.
    ///
    /// Zero P&L counts as a loss.
    ///
    /// ```
    /// # use swing_domain::PerformanceMetrics;
    /// # use rust_decimal_macros::dec;
    /// let mut metrics = PerformanceMetrics::default();
    /// metrics.record_trade(dec!(-3));
    /// metrics.record_trade(dec!(-3));
    /// metrics.record_trade(dec!(6));
    /// assert_eq!(metrics.consecutive_losses, 0);
    /// assert_eq!(metrics.max_consecutive_losses, 2);
    /// assert_eq!(metrics.total_pnl_pct, dec!(0));
    /// ```
    pub fn record_trade(&mut self, pnl_pct: Decimal) {
        self.total_trades += 1;
        self.total_pnl_pct += pnl_pct;

        if pnl_pct > Decimal::ZERO {
            self.winning_trades += 1;
            self.consecutive_losses = 0;
        } else {
            self.losing_trades += 1;
            self.consecutive_losses += 1;
            self.max_consecutive_losses = self.max_consecutive_losses.max(self.consecutive_losses);
        }
    }

    /// Win rate in percent, 0 with no trades.
    pub fn win_rate(&self) -> Decimal {
        if self.total_trades == 0 {
            return Decimal::ZERO;
        }
        (Decimal::from(self.winning_trades) / Decimal::from(self.total_trades)
            * Decimal::ONE_HUNDRED)
            .round_dp(2)
    }

    /// Average P&L per trade in percent, 0 with no trades.
    pub fn average_pnl_pct(&self) -> Decimal {
        if self.total_trades == 0 {
            return Decimal::ZERO;
        }
        (self.total_pnl_pct / Decimal::from(self.total_trades)).round_dp(2)
    }

    /// One-line summary for periodic logging.
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PerformanceMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "signals {}/{}/{} (detected/confirmed/expired), trades {} (W {} / L {}), \
             win rate {}%, total pnl {}%, losing streak {} (max {}), recoveries {}",
            self.signals_detected,
            self.signals_confirmed,
            self.signals_expired,
            self.total_trades,
            self.winning_trades,
            self.losing_trades,
            self.win_rate(),
            self.total_pnl_pct.round_dp(2),
            self.consecutive_losses,
            self.max_consecutive_losses,
            self.recoveries_performed,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_zero_pnl_is_a_loss() {
        let mut metrics = PerformanceMetrics::default();
        metrics.record_trade(Decimal::ZERO);
        assert_eq!(metrics.losing_trades, 1);
        assert_eq!(metrics.consecutive_losses, 1);
    }

    #[test]
    fn test_counters_stay_consistent() {
        let mut metrics = PerformanceMetrics::default();
        for pnl in [dec!(2), dec!(-1), dec!(-1), dec!(-1), dec!(4), dec!(-2)] {
            metrics.record_trade(pnl);
            assert_eq!(metrics.winning_trades + metrics.losing_trades, metrics.total_trades);
            assert!(metrics.max_consecutive_losses >= metrics.consecutive_losses);
        }
        assert_eq!(metrics.total_trades, 6);
        assert_eq!(metrics.max_consecutive_losses, 3);
        assert_eq!(metrics.consecutive_losses, 1);
        assert_eq!(metrics.total_pnl_pct, dec!(1));
    }

    #[test]
    fn test_win_rate() {
        let mut metrics = PerformanceMetrics::default();
        assert_eq!(metrics.win_rate(), dec!(0));
        metrics.record_trade(dec!(1));
        metrics.record_trade(dec!(-1));
        metrics.record_trade(dec!(1));
        assert_eq!(metrics.win_rate(), dec!(66.67));
        assert_eq!(metrics.average_pnl_pct(), dec!(0.33));
    }

    #[test]
    fn test_missing_fields_default_on_load() {
        let metrics: PerformanceMetrics =
            serde_json::from_str(r#"{"total_trades": 2, "winning_trades": 2}"#).unwrap();
        assert_eq!(metrics.total_trades, 2);
        assert_eq!(metrics.recoveries_performed, 0);
    }

    #[test]
    fn test_summary_mentions_win_rate() {
        let mut metrics = PerformanceMetrics::default();
        metrics.record_trade(dec!(5));
        assert!(metrics.summary().contains("win rate 100%"));
    }
}
