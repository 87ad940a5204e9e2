//! Trailing Stop Logic (Pure Functions)
//!
//! This module contains pure functions for calculating and updating trailing stops.
//! All functions are deterministic and have no side effects.
//!
//! # Algorithm (breakeven latch, then percentage trail)
//!
//! On every new favorable extreme:
//! 1. Before the latch: once the gain from entry reaches the breakeven threshold,
//!    move the stop to entry ± a small buffer and latch. Nothing else happens
//!    on that tick.
//! 2. After the latch: candidate stop = extreme ∓ trailing distance %, accepted
//!    only when it tightens the stop.
//!
//! Key invariants:
//! - Stop is monotonic (never moves against us)
//! - Favorable extreme is monotonic (peak only rises, low only falls)
//! - Stop is only updated when price makes a new favorable extreme

use crate::value_objects::{Price, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Parameters of the breakeven + trailing algorithm, all in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailingParams {
    /// Gain from entry (%) that triggers the breakeven latch
    pub breakeven_threshold_pct: Decimal,
    /// Distance beyond entry (%) the stop is placed at when latching
    pub breakeven_buffer_pct: Decimal,
    /// Distance (%) the stop trails behind each new extreme after the latch
    pub trailing_distance_pct: Decimal,
}

/// What an update changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailingStopChange {
    /// New extreme recorded, stop unchanged
    ExtremeOnly,
    /// Breakeven latch engaged
    BreakevenLatched,
    /// Stop tightened behind the new extreme
    Tightened,
}

/// Result of a trailing stop update
///
/// Returns `None` from [`update_trailing_stop`] when price didn't make a new extreme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailingStopUpdate {
    /// Trailing stop after the update (may equal the previous stop)
    pub new_stop: Price,
    /// New favorable extreme (peak for Long, low for Short)
    pub new_favorable_extreme: Price,
    /// Kind of change
    pub change: TrailingStopChange,
}

/// Update the trailing stop for one price observation.
///
/// # Arguments
///
/// * `side` - Position side (Long or Short)
/// * `entry_price` - Position entry price
/// * `current_price` - Current market price
/// * `favorable_extreme` - Best price seen so far (peak for Long, low for Short)
/// * `current_trailing_stop` - Current trailing stop price
/// * `breakeven_moved` - Whether the breakeven latch is already engaged
/// * `params` - Thresholds and distances
///
/// # Examples
///
/// ```
/// # use swing_domain::trailing::{update_trailing_stop, TrailingParams, TrailingStopChange};
/// # use swing_domain::value_objects::{Price, Side};
/// # use rust_decimal_macros::dec;
/// let params = TrailingParams {
///     breakeven_threshold_pct: dec!(1.5),
///     breakeven_buffer_pct: dec!(0.1),
///     trailing_distance_pct: dec!(2.5),
/// };
/// let entry = Price::new(dec!(100)).unwrap();
/// let stop = Price::new(dec!(97)).unwrap();
///
/// // +3% from entry: stop jumps to breakeven + 0.1%
/// let update = update_trailing_stop(
///     Side::Long,
///     entry,
///     Price::new(dec!(103)).unwrap(),
///     entry,
///     stop,
///     false,
///     &params,
/// )
/// .unwrap();
/// assert_eq!(update.change, TrailingStopChange::BreakevenLatched);
/// assert_eq!(update.new_stop.as_decimal(), dec!(100.1));
///
/// // Dip to 102 is not a new high: nothing changes
/// assert!(update_trailing_stop(
///     Side::Long,
///     entry,
///     Price::new(dec!(102)).unwrap(),
///     update.new_favorable_extreme,
///     update.new_stop,
///     true,
///     &params,
/// )
/// .is_none());
/// ```
pub fn update_trailing_stop(
    side: Side,
    entry_price: Price,
    current_price: Price,
    favorable_extreme: Price,
    current_trailing_stop: Price,
    breakeven_moved: bool,
    params: &TrailingParams,
) -> Option<TrailingStopUpdate> {
    if !side.is_better(current_price, favorable_extreme) {
        return None;
    }

    if !breakeven_moved {
        let gain_pct = side.favorable_move_pct(entry_price, current_price);
        if gain_pct >= params.breakeven_threshold_pct {
            // Latch even if the stop already sits past breakeven; never loosen it.
            let new_stop = match side.favorable_level(entry_price, params.breakeven_buffer_pct) {
                Ok(breakeven) if side.is_better(breakeven, current_trailing_stop) => breakeven,
                _ => current_trailing_stop,
            };
            return Some(TrailingStopUpdate {
                new_stop,
                new_favorable_extreme: current_price,
                change: TrailingStopChange::BreakevenLatched,
            });
        }

        return Some(TrailingStopUpdate {
            new_stop: current_trailing_stop,
            new_favorable_extreme: current_price,
            change: TrailingStopChange::ExtremeOnly,
        });
    }

    match side.adverse_level(current_price, params.trailing_distance_pct) {
        Ok(candidate) if side.is_better(candidate, current_trailing_stop) => Some(TrailingStopUpdate {
            new_stop: candidate,
            new_favorable_extreme: current_price,
            change: TrailingStopChange::Tightened,
        }),
        _ => Some(TrailingStopUpdate {
            new_stop: current_trailing_stop,
            new_favorable_extreme: current_price,
            change: TrailingStopChange::ExtremeOnly,
        }),
    }
}

/// Check if trailing stop is hit (should exit)
///
/// # Examples
///
/// ```
/// # use swing_domain::trailing::is_trailing_stop_hit;
/// # use swing_domain::value_objects::{Price, Side};
/// # use rust_decimal_macros::dec;
/// // LONG: Exit when price drops TO or BELOW stop
/// assert!(is_trailing_stop_hit(
///     Side::Long,
///     Price::new(dec!(95000)).unwrap(),
///     Price::new(dec!(95000)).unwrap(),
/// ));
///
/// // SHORT: Exit when price rises TO or ABOVE stop
/// assert!(!is_trailing_stop_hit(
///     Side::Short,
///     Price::new(dec!(94900)).unwrap(),
///     Price::new(dec!(95000)).unwrap(),
/// ));
/// ```
pub fn is_trailing_stop_hit(side: Side, current_price: Price, trailing_stop: Price) -> bool {
    match side {
        // LONG: Exit when price <= stop
        Side::Long => current_price.as_decimal() <= trailing_stop.as_decimal(),
        // SHORT: Exit when price >= stop
        Side::Short => current_price.as_decimal() >= trailing_stop.as_decimal(),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn params() -> TrailingParams {
        TrailingParams {
            breakeven_threshold_pct: dec!(1.5),
            breakeven_buffer_pct: dec!(0.1),
            trailing_distance_pct: dec!(2.5),
        }
    }

    fn p(value: Decimal) -> Price {
        Price::new(value).unwrap()
    }

    // =========================================================================
    // LONG Position Tests
    // =========================================================================

    #[test]
    fn test_long_new_high_below_threshold_only_moves_extreme() {
        let update =
            update_trailing_stop(Side::Long, p(dec!(100)), p(dec!(101)), p(dec!(100)), p(dec!(97)), false, &params())
                .unwrap();

        assert_eq!(update.change, TrailingStopChange::ExtremeOnly);
        assert_eq!(update.new_stop, p(dec!(97)));
        assert_eq!(update.new_favorable_extreme, p(dec!(101)));
    }

    #[test]
    fn test_long_breakeven_latch_once() {
        let update =
            update_trailing_stop(Side::Long, p(dec!(100)), p(dec!(103)), p(dec!(100)), p(dec!(97)), false, &params())
                .unwrap();

        assert_eq!(update.change, TrailingStopChange::BreakevenLatched);
        assert_eq!(update.new_stop.as_decimal(), dec!(100.1));

        // Dip does not loosen
        let dip = update_trailing_stop(
            Side::Long,
            p(dec!(100)),
            p(dec!(102)),
            update.new_favorable_extreme,
            update.new_stop,
            true,
            &params(),
        );
        assert!(dip.is_none());
    }

    #[test]
    fn test_long_trails_after_latch() {
        // Extreme 103, stop at breakeven 100.1; price prints 110
        let update = update_trailing_stop(
            Side::Long,
            p(dec!(100)),
            p(dec!(110)),
            p(dec!(103)),
            p(dec!(100.1)),
            true,
            &params(),
        )
        .unwrap();

        assert_eq!(update.change, TrailingStopChange::Tightened);
        assert_eq!(update.new_stop.as_decimal(), dec!(107.25)); // 110 * 0.975
    }

    #[test]
    fn test_long_trail_never_loosens() {
        // New high at 103.5 but 2.5% behind it (100.9125) is below the 101 stop
        let update = update_trailing_stop(
            Side::Long,
            p(dec!(100)),
            p(dec!(103.5)),
            p(dec!(103)),
            p(dec!(101)),
            true,
            &params(),
        )
        .unwrap();

        assert_eq!(update.change, TrailingStopChange::ExtremeOnly);
        assert_eq!(update.new_stop, p(dec!(101)));
    }

    #[test]
    fn test_long_monotonic_over_sequence() {
        let prices = [dec!(101), dec!(103), dec!(102), dec!(106), dec!(104), dec!(108), dec!(99)];
        let entry = p(dec!(100));
        let mut stop = p(dec!(97));
        let mut extreme = entry;
        let mut latched = false;

        for price in prices {
            if let Some(update) =
                update_trailing_stop(Side::Long, entry, p(price), extreme, stop, latched, &params())
            {
                if latched {
                    assert!(update.new_stop >= stop, "stop loosened at {}", price);
                }
                latched |= update.change == TrailingStopChange::BreakevenLatched;
                stop = update.new_stop;
                extreme = update.new_favorable_extreme;
            }
        }

        assert!(latched);
        assert_eq!(extreme, p(dec!(108)));
        assert_eq!(stop.as_decimal(), dec!(105.3)); // 108 * 0.975
    }

    // =========================================================================
    // SHORT Position Tests
    // =========================================================================

    #[test]
    fn test_short_breakeven_latch() {
        let update =
            update_trailing_stop(Side::Short, p(dec!(100)), p(dec!(98)), p(dec!(100)), p(dec!(103)), false, &params())
                .unwrap();

        assert_eq!(update.change, TrailingStopChange::BreakevenLatched);
        assert_eq!(update.new_stop.as_decimal(), dec!(99.9));
    }

    #[test]
    fn test_short_trails_down_after_latch() {
        let update = update_trailing_stop(
            Side::Short,
            p(dec!(100)),
            p(dec!(90)),
            p(dec!(98)),
            p(dec!(99.9)),
            true,
            &params(),
        )
        .unwrap();

        assert_eq!(update.change, TrailingStopChange::Tightened);
        assert_eq!(update.new_stop.as_decimal(), dec!(92.25)); // 90 * 1.025
    }

    #[test]
    fn test_short_rise_is_not_new_extreme() {
        let update = update_trailing_stop(
            Side::Short,
            p(dec!(100)),
            p(dec!(99)),
            p(dec!(98)),
            p(dec!(99.9)),
            true,
            &params(),
        );
        assert!(update.is_none());
    }

    // =========================================================================
    // Edge Cases
    // =========================================================================

    #[test]
    fn test_breakeven_never_loosens_existing_stop() {
        // Stop already above breakeven (e.g. hand-tuned after recovery)
        let update =
            update_trailing_stop(Side::Long, p(dec!(100)), p(dec!(103)), p(dec!(100)), p(dec!(101)), false, &params())
                .unwrap();

        assert_eq!(update.change, TrailingStopChange::BreakevenLatched);
        assert_eq!(update.new_stop, p(dec!(101)));
    }

    #[test]
    fn test_stop_hit_boundaries() {
        assert!(is_trailing_stop_hit(Side::Long, p(dec!(100)), p(dec!(100))));
        assert!(!is_trailing_stop_hit(Side::Long, p(dec!(100.01)), p(dec!(100))));
        assert!(is_trailing_stop_hit(Side::Short, p(dec!(100)), p(dec!(100))));
        assert!(!is_trailing_stop_hit(Side::Short, p(dec!(99.99)), p(dec!(100))));
    }
}
