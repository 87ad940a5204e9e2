//! Risk Evaluator
//!
//! Runs once per cycle while a position is open:
//! 1. Update the trailing stop (breakeven latch, then trail behind new extremes)
//! 2. Evaluate exits in priority order; first match wins

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use swing_domain::{
    is_trailing_stop_hit, update_trailing_stop, ExitReason, MarketSnapshot, Position, Price, Side,
    TrailingParams, TrailingStopChange, TrailingStopUpdate, TrendDirection,
};
use tracing::{debug, info};

/// Exit thresholds and trailing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Breakeven latch and trailing distances
    pub trailing: TrailingParams,
    /// Oscillator above this corroborates a bearish reversal for longs
    pub reversal_overbought: Decimal,
    /// Oscillator below this corroborates a bullish reversal for shorts
    pub reversal_oversold: Decimal,
    /// Oscillator above this plus price under the fast EMA exits longs
    pub extreme_overbought: Decimal,
    /// Oscillator below this plus price over the fast EMA exits shorts
    pub extreme_oversold: Decimal,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            trailing: TrailingParams {
                breakeven_threshold_pct: dec!(1.5),
                breakeven_buffer_pct: dec!(0.1),
                trailing_distance_pct: dec!(2.5),
            },
            reversal_overbought: dec!(70),
            reversal_oversold: dec!(30),
            extreme_overbought: dec!(80),
            extreme_oversold: dec!(20),
        }
    }
}

/// Stateless evaluator over the caller-owned position.
#[derive(Debug, Clone)]
pub struct RiskEvaluator {
    config: RiskConfig,
}

impl RiskEvaluator {
    /// Create an evaluator.
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// Evaluator configuration.
    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Apply one price observation to the position's trailing state.
    ///
    /// Returns the update when price made a new favorable extreme.
    pub fn update_trailing_stop(
        &self,
        position: &mut Position,
        price: Price,
    ) -> Option<TrailingStopUpdate> {
        let update = update_trailing_stop(
            position.side,
            position.entry_price,
            price,
            position.extreme_price,
            position.trailing_stop,
            position.breakeven_moved,
            &self.config.trailing,
        )?;

        let previous_stop = position.trailing_stop;
        position.extreme_price = update.new_favorable_extreme;
        position.trailing_stop = update.new_stop;

        match update.change {
            TrailingStopChange::BreakevenLatched => {
                position.breakeven_moved = true;
                info!(
                    position_id = %position.id,
                    side = %position.side,
                    entry = %position.entry_price,
                    stop = %position.trailing_stop,
                    "Breakeven latched"
                );
            }
            TrailingStopChange::Tightened => {
                info!(
                    position_id = %position.id,
                    from = %previous_stop,
                    to = %position.trailing_stop,
                    extreme = %position.extreme_price,
                    "Trailing stop tightened"
                );
            }
            TrailingStopChange::ExtremeOnly => {
                debug!(position_id = %position.id, extreme = %position.extreme_price, "New extreme");
            }
        }

        Some(update)
    }

    /// First matching exit condition, if any.
    ///
    /// Priority: stop loss, take profit, trailing stop, trend reversal with a
    /// confirming signal, extreme oscillator with a technical breakdown.
    pub fn evaluate_exit(&self, position: &Position, snapshot: &MarketSnapshot) -> Option<ExitReason> {
        let price = snapshot.price;
        let osc = snapshot.oscillator;

        let (stop_hit, target_hit) = match position.side {
            Side::Long => (price <= position.stop_loss, price >= position.take_profit),
            Side::Short => (price >= position.stop_loss, price <= position.take_profit),
        };

        if stop_hit {
            return Some(ExitReason::StopLoss);
        }
        if target_hit {
            return Some(ExitReason::TakeProfit);
        }
        if is_trailing_stop_hit(position.side, price, position.trailing_stop) {
            return Some(ExitReason::TrailingStop {
                retracement_pct: position.retracement_from_extreme_pct(price),
            });
        }

        let (reversal, extreme) = match position.side {
            Side::Long => (
                snapshot.trend == TrendDirection::Bearish
                    && (osc > self.config.reversal_overbought || snapshot.is_below_fast_ema()),
                osc > self.config.extreme_overbought && snapshot.is_below_fast_ema(),
            ),
            Side::Short => (
                snapshot.trend == TrendDirection::Bullish
                    && (osc < self.config.reversal_oversold || snapshot.is_above_fast_ema()),
                osc < self.config.extreme_oversold && snapshot.is_above_fast_ema(),
            ),
        };

        if reversal {
            return Some(ExitReason::TrendReversal);
        }
        if extreme {
            return Some(ExitReason::ExtremeOscillator);
        }
        None
    }
}
