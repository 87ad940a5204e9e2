//! Indicator math over close prices.
//!
//! Plain functions over slices, oldest value first.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Neutral oscillator reading used when there is not enough history.
pub const NEUTRAL_RSI: Decimal = dec!(50);

/// Exponential moving average of `values` using span smoothing
/// (`alpha = 2 / (period + 1)`), seeded with the first value.
///
/// Returns `None` for an empty series or a zero period.
///
/// ```
/// # use swing_engine::indicators::ema;
/// # use rust_decimal_macros::dec;
/// // alpha = 2/3: 10 -> 10 + (13 - 10) * 2/3 = 12
/// assert_eq!(ema(&[dec!(10), dec!(13)], 2).unwrap().round_dp(8), dec!(12));
/// ```
pub fn ema(values: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 {
        return None;
    }
    let (first, rest) = values.split_first()?;
    let alpha = dec!(2) / Decimal::from(period as u64 + 1);

    Some(rest.iter().fold(*first, |prev, value| prev + alpha * (*value - prev)))
}

/// Relative Strength Index with simple rolling means over the last `period`
/// price changes.
///
/// Returns 50 when fewer than `period + 1` values are available or the window
/// is flat, and 100 when the window has gains but no losses.
pub fn rsi(values: &[Decimal], period: usize) -> Decimal {
    if period == 0 || values.len() < period + 1 {
        return NEUTRAL_RSI;
    }

    let window = &values[values.len() - (period + 1)..];
    let (gains, losses) = window
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .fold((Decimal::ZERO, Decimal::ZERO), |(gain, loss), delta| {
            if delta > Decimal::ZERO {
                (gain + delta, loss)
            } else {
                (gain, loss - delta)
            }
        });

    let n = Decimal::from(period as u64);
    let avg_gain = gains / n;
    let avg_loss = losses / n;

    if avg_loss.is_zero() {
        return if avg_gain.is_zero() { NEUTRAL_RSI } else { Decimal::ONE_HUNDRED };
    }

    let rs = avg_gain / avg_loss;
    Decimal::ONE_HUNDRED - Decimal::ONE_HUNDRED / (Decimal::ONE + rs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ema_single_value_is_seed() {
        assert_eq!(ema(&[dec!(42)], 21), Some(dec!(42)));
        assert_eq!(ema(&[], 21), None);
        assert_eq!(ema(&[dec!(1)], 0), None);
    }

    #[test]
    fn test_ema_constant_series() {
        let values = [dec!(100); 60];
        assert_eq!(ema(&values, 21), Some(dec!(100)));
    }

    #[test]
    fn test_ema_tracks_rising_series_from_below() {
        let values: Vec<Decimal> = (1..=50).map(Decimal::from).collect();
        let fast = ema(&values, 5).unwrap();
        let slow = ema(&values, 20).unwrap();
        assert!(fast > slow);
        assert!(fast < dec!(50));
    }

    #[test]
    fn test_rsi_insufficient_data_is_neutral() {
        assert_eq!(rsi(&[dec!(1), dec!(2)], 14), NEUTRAL_RSI);
    }

    #[test]
    fn test_rsi_only_gains_is_100() {
        let values: Vec<Decimal> = (1..=15).map(Decimal::from).collect();
        assert_eq!(rsi(&values, 14), dec!(100));
    }

    #[test]
    fn test_rsi_flat_is_neutral() {
        assert_eq!(rsi(&[dec!(7); 20], 14), NEUTRAL_RSI);
    }

    #[test]
    fn test_rsi_balanced_moves() {
        // +2, -1 alternating over 4 changes: gains 4, losses 2 -> RS 2 -> RSI 66.66..
        let values = [dec!(10), dec!(12), dec!(11), dec!(13), dec!(12)];
        assert_eq!(rsi(&values, 4).round_dp(2), dec!(66.67));
    }

    #[test]
    fn test_rsi_uses_only_trailing_window() {
        // Early crash must not affect a window of pure gains
        let mut values = vec![dec!(100), dec!(50)];
        values.extend((51..=55).map(Decimal::from));
        assert_eq!(rsi(&values, 4), dec!(100));
    }
}
