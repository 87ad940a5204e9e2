//! Domain Entities
//!
//! The pending signal, the open position and the closed-trade record.
//! Entities carry identity and enough context to be persisted and replayed.

use crate::holdings::ExchangeHoldings;
use crate::value_objects::{DomainError, Price, Quantity, Side, Symbol};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// IDs
// =============================================================================

/// Unique identifier for a Position
pub type PositionId = Uuid;

// =============================================================================
// Signal
// =============================================================================

/// A detected entry opportunity awaiting confirmation.
///
/// At most one signal exists at a time, and never while a position is open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Direction the position would take
    pub direction: Side,
    /// Price at detection time
    pub trigger_price: Price,
    /// Detection time
    pub trigger_time: DateTime<Utc>,
    /// Oscillator at detection time
    #[serde(default)]
    pub trigger_oscillator: Decimal,
    /// Confirmation checks performed so far
    pub wait_count: u32,
    /// Open attempts that failed after confirmation
    #[serde(default)]
    pub open_attempts: u32,
}

impl Signal {
    /// Create a fresh signal.
    pub fn new(
        direction: Side,
        trigger_price: Price,
        trigger_oscillator: Decimal,
        trigger_time: DateTime<Utc>,
    ) -> Self {
        Self {
            direction,
            trigger_price,
            trigger_time,
            trigger_oscillator,
            wait_count: 0,
            open_attempts: 0,
        }
    }

    /// Percent move from the trigger price in the signal's favor.
    pub fn favorable_move_pct(&self, current: Price) -> Decimal {
        self.direction.favorable_move_pct(self.trigger_price, current)
    }
}

// =============================================================================
// Position
// =============================================================================

/// An open exposure managed by the daemon.
///
/// # Invariants
/// - LONG: `stop_loss < entry_price < take_profit`; SHORT mirrored
/// - `trailing_stop` only moves in the position's favor
/// - `extreme_price` is the best price seen since entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Unique identifier
    pub id: PositionId,
    /// Trading symbol
    pub symbol: Symbol,
    /// Direction
    pub side: Side,
    /// Fill price of the entry
    pub entry_price: Price,
    /// Entry time
    pub entry_time: DateTime<Utc>,
    /// Size
    pub quantity: Quantity,
    /// Hard stop
    pub stop_loss: Price,
    /// Profit target
    pub take_profit: Price,
    /// Trailing stop (starts at the hard stop)
    pub trailing_stop: Price,
    /// Best price since entry (peak for Long, low for Short)
    pub extreme_price: Price,
    /// Breakeven latch
    #[serde(default)]
    pub breakeven_moved: bool,
    /// Rebuilt from exchange holdings instead of opened by a signal
    #[serde(default)]
    pub recovered: bool,
    /// Exchange order id of the entry (or the simulated id)
    #[serde(default)]
    pub entry_order_id: String,
    /// Entry was simulated after the exchange rejected or timed out
    #[serde(default)]
    pub simulated_entry: bool,
}

impl Position {
    /// Open a position at `entry_price` with percentage-based protection.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPrice` when a percentage would put the
    /// stop loss or take profit at or below zero.
    ///
    /// # Examples
    ///
    /// ```
    /// # use swing_domain::{Position, Price, Quantity, Side, Symbol};
    /// # use rust_decimal_macros::dec;
    /// # use chrono::Utc;
    /// let position = Position::open(
    ///     Symbol::from_pair("BTCUSDT").unwrap(),
    ///     Side::Long,
    ///     Price::new(dec!(100)).unwrap(),
    ///     Quantity::new(dec!(0.5)).unwrap(),
    ///     dec!(3),
    ///     dec!(6),
    ///     Utc::now(),
    /// )
    /// .unwrap();
    /// assert_eq!(position.stop_loss.as_decimal(), dec!(97));
    /// assert_eq!(position.take_profit.as_decimal(), dec!(106));
    /// assert_eq!(position.trailing_stop, position.stop_loss);
    /// ```
    pub fn open(
        symbol: Symbol,
        side: Side,
        entry_price: Price,
        quantity: Quantity,
        stop_loss_pct: Decimal,
        take_profit_pct: Decimal,
        entry_time: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let stop_loss = side.adverse_level(entry_price, stop_loss_pct)?;
        let take_profit = side.favorable_level(entry_price, take_profit_pct)?;

        Ok(Self {
            id: Uuid::now_v7(),
            symbol,
            side,
            entry_price,
            entry_time,
            quantity,
            stop_loss,
            take_profit,
            trailing_stop: stop_loss,
            extreme_price: entry_price,
            breakeven_moved: false,
            recovered: false,
            entry_order_id: String::new(),
            simulated_entry: false,
        })
    }

    /// Attach the entry order identity.
    pub fn with_entry_order(mut self, order_id: impl Into<String>, simulated: bool) -> Self {
        self.entry_order_id = order_id.into();
        self.simulated_entry = simulated;
        self
    }

    /// Rebuild a position from exchange holdings.
    ///
    /// The true entry price is unknown, so the reference price becomes the
    /// entry and protection levels are computed from it.
    pub fn recover(
        holdings: &ExchangeHoldings,
        stop_loss_pct: Decimal,
        take_profit_pct: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let mut position = Self::open(
            holdings.symbol.clone(),
            holdings.side,
            holdings.reference_price,
            holdings.quantity,
            stop_loss_pct,
            take_profit_pct,
            now,
        )?;
        position.recovered = true;
        position.entry_order_id = format!("recovered-{}", now.timestamp());
        Ok(position)
    }

    /// Leveraged P&L percent if the position exited at `exit_price`.
    ///
    /// ```
    /// # use swing_domain::{Position, Price, Quantity, Side, Symbol};
    /// # use rust_decimal_macros::dec;
    /// # use chrono::Utc;
    /// let position = Position::open(
    ///     Symbol::from_pair("BTCUSDT").unwrap(),
    ///     Side::Short,
    ///     Price::new(dec!(100)).unwrap(),
    ///     Quantity::new(dec!(1)).unwrap(),
    ///     dec!(3),
    ///     dec!(6),
    ///     Utc::now(),
    /// )
    /// .unwrap();
    /// assert_eq!(position.pnl_pct(Price::new(dec!(98)).unwrap(), dec!(2)), dec!(4));
    /// ```
    pub fn pnl_pct(&self, exit_price: Price, leverage: Decimal) -> Decimal {
        self.side.favorable_move_pct(self.entry_price, exit_price) * leverage
    }

    /// Percent the price has retraced from the best price seen (always >= 0).
    pub fn retracement_from_extreme_pct(&self, current: Price) -> Decimal {
        let adverse = -self.side.favorable_move_pct(self.extreme_price, current);
        adverse.max(Decimal::ZERO)
    }

    /// Build the closed-trade record for an exit at `exit_price`.
    pub fn close(
        &self,
        exit_price: Price,
        reason: &ExitReason,
        leverage: Decimal,
        closed_at: DateTime<Utc>,
        simulated_exit: bool,
    ) -> TradeRecord {
        let held_secs = (closed_at - self.entry_time).num_seconds().max(0);
        let duration_hours = (Decimal::from(held_secs) / Decimal::from(3600)).round_dp(2);

        TradeRecord {
            position_id: self.id,
            symbol: self.symbol.clone(),
            side: self.side,
            entry_price: self.entry_price,
            exit_price,
            quantity: self.quantity,
            pnl_pct: self.pnl_pct(exit_price, leverage),
            reason: reason.to_string(),
            entry_time: self.entry_time,
            exit_time: closed_at,
            duration_hours,
            recovered: self.recovered,
            simulated_entry: self.simulated_entry,
            simulated_exit,
        }
    }
}

// =============================================================================
// Exit Reason
// =============================================================================

/// Why a position was closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExitReason {
    /// Hard stop breached
    StopLoss,
    /// Profit target reached
    TakeProfit,
    /// Trailing stop breached; carries the retracement from the extreme
    TrailingStop {
        /// Percent given back from the best price seen
        retracement_pct: Decimal,
    },
    /// Trend flipped against the position with a confirming signal
    TrendReversal,
    /// Oscillator at an extreme with price broken through the fast EMA
    ExtremeOscillator,
    /// Daemon shutting down
    Shutdown,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::StopLoss => write!(f, "Stop Loss Emergency"),
            ExitReason::TakeProfit => write!(f, "Take Profit Target"),
            ExitReason::TrailingStop { retracement_pct } => {
                write!(f, "Trailing Stop (-{}%)", retracement_pct.round_dp(1))
            }
            ExitReason::TrendReversal => write!(f, "Trend Reversal + confirming signal"),
            ExitReason::ExtremeOscillator => {
                write!(f, "Extreme oscillator + technical breakdown")
            }
            ExitReason::Shutdown => write!(f, "shutdown"),
        }
    }
}

// =============================================================================
// Trade Record
// =============================================================================

/// A completed round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Position that was closed
    pub position_id: PositionId,
    /// Trading symbol
    pub symbol: Symbol,
    /// Direction
    pub side: Side,
    /// Entry price
    pub entry_price: Price,
    /// Exit price
    pub exit_price: Price,
    /// Size
    pub quantity: Quantity,
    /// Leveraged P&L in percent
    pub pnl_pct: Decimal,
    /// Human-readable exit reason
    pub reason: String,
    /// Entry time
    pub entry_time: DateTime<Utc>,
    /// Exit time
    pub exit_time: DateTime<Utc>,
    /// Holding time in hours
    pub duration_hours: Decimal,
    /// Position had been recovered from the exchange
    pub recovered: bool,
    /// Entry fill was simulated
    pub simulated_entry: bool,
    /// Exit fill was simulated
    pub simulated_exit: bool,
}

impl TradeRecord {
    /// A trade with strictly positive P&L.
    pub fn is_win(&self) -> bool {
        self.pnl_pct > Decimal::ZERO
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn btc() -> Symbol {
        Symbol::from_pair("BTCUSDT").unwrap()
    }

    fn long_at(entry: Decimal) -> Position {
        Position::open(
            btc(),
            Side::Long,
            Price::new(entry).unwrap(),
            Quantity::new(dec!(0.1)).unwrap(),
            dec!(3),
            dec!(6),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_short_protection_levels() {
        let position = Position::open(
            btc(),
            Side::Short,
            Price::new(dec!(100)).unwrap(),
            Quantity::new(dec!(1)).unwrap(),
            dec!(3),
            dec!(6),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(position.stop_loss.as_decimal(), dec!(103));
        assert_eq!(position.take_profit.as_decimal(), dec!(94));
        assert_eq!(position.extreme_price.as_decimal(), dec!(100));
        assert!(!position.recovered);
    }

    #[test]
    fn test_open_rejects_non_positive_stop() {
        let result = Position::open(
            btc(),
            Side::Long,
            Price::new(dec!(100)).unwrap(),
            Quantity::new(dec!(1)).unwrap(),
            dec!(150),
            dec!(6),
            Utc::now(),
        );
        assert!(matches!(result, Err(DomainError::InvalidPrice(_))));

        // Short take profit 100% below entry would be zero
        let result = Position::open(
            btc(),
            Side::Short,
            Price::new(dec!(100)).unwrap(),
            Quantity::new(dec!(1)).unwrap(),
            dec!(3),
            dec!(100),
            Utc::now(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_recover_uses_reference_price() {
        let holdings = ExchangeHoldings::new(
            btc(),
            Side::Long,
            Quantity::new(dec!(0.05)).unwrap(),
            Price::new(dec!(60000)).unwrap(),
        );
        let position = Position::recover(&holdings, dec!(3), dec!(6), Utc::now()).unwrap();

        assert!(position.recovered);
        assert_eq!(position.entry_price.as_decimal(), dec!(60000));
        assert_eq!(position.stop_loss.as_decimal(), dec!(58200));
        assert_eq!(position.take_profit.as_decimal(), dec!(63600));
        assert!(position.entry_order_id.starts_with("recovered-"));
    }

    #[test]
    fn test_pnl_is_leveraged() {
        let position = long_at(dec!(100));
        assert_eq!(position.pnl_pct(Price::new(dec!(103)).unwrap(), dec!(1)), dec!(3));
        assert_eq!(position.pnl_pct(Price::new(dec!(97)).unwrap(), dec!(3)), dec!(-9));
    }

    #[test]
    fn test_retracement_from_extreme() {
        let mut position = long_at(dec!(100));
        position.extreme_price = Price::new(dec!(110)).unwrap();
        assert_eq!(position.retracement_from_extreme_pct(Price::new(dec!(99)).unwrap()), dec!(10));
        assert_eq!(position.retracement_from_extreme_pct(Price::new(dec!(111)).unwrap()), dec!(0));
    }

    #[test]
    fn test_close_builds_record() {
        let position = long_at(dec!(100)).with_entry_order("42", false);
        let closed_at = position.entry_time + Duration::minutes(90);
        let record = position.close(
            Price::new(dec!(106)).unwrap(),
            &ExitReason::TakeProfit,
            dec!(1),
            closed_at,
            true,
        );

        assert_eq!(record.position_id, position.id);
        assert_eq!(record.pnl_pct, dec!(6));
        assert_eq!(record.reason, "Take Profit Target");
        assert_eq!(record.duration_hours, dec!(1.5));
        assert!(record.is_win());
        assert!(record.simulated_exit);
        assert!(!record.simulated_entry);
    }

    #[test]
    fn test_exit_reason_text() {
        assert_eq!(ExitReason::StopLoss.to_string(), "Stop Loss Emergency");
        assert_eq!(
            ExitReason::TrailingStop { retracement_pct: dec!(2.54) }.to_string(),
            "Trailing Stop (-2.5%)"
        );
        assert_eq!(ExitReason::Shutdown.to_string(), "shutdown");
    }

    #[test]
    fn test_signal_favorable_move() {
        let signal = Signal::new(Side::Short, Price::new(dec!(200)).unwrap(), dec!(75), Utc::now());
        assert_eq!(signal.favorable_move_pct(Price::new(dec!(199)).unwrap()), dec!(0.5));
        assert_eq!(signal.wait_count, 0);
    }
}
