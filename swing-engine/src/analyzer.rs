//! Market Analyzer
//!
//! Turns a candle series into the per-cycle `MarketSnapshot`:
//! RSI, three EMAs and a trend classification derived from the EMA stack.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use swing_domain::{Candle, MarketSnapshot, Price, TrendDirection};

use crate::error::{EngineError, EngineResult};
use crate::indicators::{ema, rsi};

/// Maximum distance (%) from an EMA that still counts as touching it.
pub const EMA_TOUCH_PCT: Decimal = dec!(0.5);

/// Slack around the slow EMA when checking whether price holds the trend.
const SLOW_EMA_SLACK: Decimal = dec!(0.005);

/// Indicator periods and trend thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// RSI lookback
    pub rsi_period: usize,
    /// Fast EMA period
    pub ema_fast_period: usize,
    /// Slow EMA period
    pub ema_slow_period: usize,
    /// Long-horizon trend EMA period
    pub ema_trend_period: usize,
    /// Minimum fast/slow EMA separation (%) for a full trend
    pub ema_separation_min: Decimal,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            ema_fast_period: 21,
            ema_slow_period: 50,
            ema_trend_period: 200,
            ema_separation_min: dec!(0.2),
        }
    }
}

impl AnalyzerConfig {
    /// Check periods are usable.
    pub fn validate(&self) -> EngineResult<()> {
        if self.rsi_period < 2 {
            return Err(EngineError::InvalidConfig(format!(
                "RSI period must be at least 2, got {}",
                self.rsi_period
            )));
        }
        if !(self.ema_fast_period < self.ema_slow_period
            && self.ema_slow_period < self.ema_trend_period)
        {
            return Err(EngineError::InvalidConfig(format!(
                "EMA periods must be increasing: {}/{}/{}",
                self.ema_fast_period, self.ema_slow_period, self.ema_trend_period
            )));
        }
        Ok(())
    }
}

/// Builds snapshots from candles.
#[derive(Debug, Clone)]
pub struct MarketAnalyzer {
    config: AnalyzerConfig,
}

impl MarketAnalyzer {
    /// Create an analyzer.
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    /// Analyzer configuration.
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Compute the snapshot for the most recent candle, observed at `observed_at`.
    ///
    /// The last candle may still be forming, so its close time can lie in the
    /// future; the snapshot is stamped no later than `observed_at`.
    ///
    /// # Errors
    ///
    /// `EngineError::InsufficientData` when `candles` is empty and
    /// `EngineError::Domain` when the last close is not a valid price.
    pub fn analyze(
        &self,
        candles: &[Candle],
        observed_at: DateTime<Utc>,
    ) -> EngineResult<MarketSnapshot> {
        let last = candles
            .last()
            .ok_or(EngineError::InsufficientData { needed: 1, got: 0 })?;
        let closes: Vec<Decimal> = candles.iter().map(|c| c.close).collect();

        let price = Price::new(last.close)?;
        let oscillator = rsi(&closes, self.config.rsi_period);
        let ema_fast = ema(&closes, self.config.ema_fast_period).unwrap_or(last.close);
        let ema_slow = ema(&closes, self.config.ema_slow_period).unwrap_or(last.close);
        let ema_trend = ema(&closes, self.config.ema_trend_period).unwrap_or(last.close);

        let trend = classify_trend(
            last.close,
            ema_fast,
            ema_slow,
            ema_trend,
            self.config.ema_separation_min,
        );

        Ok(MarketSnapshot {
            price,
            oscillator,
            ema_fast,
            ema_slow,
            ema_trend,
            trend,
            timestamp: last.close_time.min(observed_at),
        })
    }
}

/// Classify the trend from the EMA stack and where price sits in it.
///
/// ```
/// # use swing_engine::analyzer::classify_trend;
/// # use swing_domain::TrendDirection;
/// # use rust_decimal_macros::dec;
/// let trend = classify_trend(dec!(110), dec!(108), dec!(105), dec!(100), dec!(0.2));
/// assert_eq!(trend, TrendDirection::Bullish);
/// ```
pub fn classify_trend(
    price: Decimal,
    ema_fast: Decimal,
    ema_slow: Decimal,
    ema_trend: Decimal,
    separation_min: Decimal,
) -> TrendDirection {
    let separation = if ema_slow > Decimal::ZERO {
        (ema_fast - ema_slow) / ema_slow * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };

    if ema_fast > ema_slow && ema_slow > ema_trend {
        if price > ema_slow * (Decimal::ONE - SLOW_EMA_SLACK) && separation >= separation_min {
            TrendDirection::Bullish
        } else if price > ema_trend {
            TrendDirection::WeakBullish
        } else {
            TrendDirection::Neutral
        }
    } else if ema_fast < ema_slow && ema_slow < ema_trend {
        if price < ema_slow * (Decimal::ONE + SLOW_EMA_SLACK) && separation.abs() >= separation_min
        {
            TrendDirection::Bearish
        } else if price < ema_trend {
            TrendDirection::WeakBearish
        } else {
            TrendDirection::Neutral
        }
    } else if price > ema_trend && ema_fast > ema_slow {
        TrendDirection::WeakBullish
    } else if price < ema_trend && ema_fast < ema_slow {
        TrendDirection::WeakBearish
    } else {
        TrendDirection::Neutral
    }
}

/// True when price is pulling back into the EMA zone: within
/// [`EMA_TOUCH_PCT`] of either EMA, or between them.
pub fn is_pullback_to_ema(price: Decimal, ema_fast: Decimal, ema_slow: Decimal) -> bool {
    let near = |level: Decimal| {
        !level.is_zero() && ((price - level) / level * Decimal::ONE_HUNDRED).abs() <= EMA_TOUCH_PCT
    };

    near(ema_fast)
        || near(ema_slow)
        || (ema_slow <= price && price <= ema_fast)
        || (ema_fast <= price && price <= ema_slow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn candles(closes: &[Decimal]) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| Candle::flat(*close, start + Duration::hours(4 * i as i64)))
            .collect()
    }

    #[test]
    fn test_bearish_needs_price_under_slow_and_separation() {
        assert_eq!(
            classify_trend(dec!(90), dec!(92), dec!(95), dec!(100), dec!(0.2)),
            TrendDirection::Bearish
        );
        // Separation too small -> weak
        assert_eq!(
            classify_trend(dec!(90), dec!(94.99), dec!(95), dec!(100), dec!(0.2)),
            TrendDirection::WeakBearish
        );
        // Price above trend EMA with bearish stack -> neutral
        assert_eq!(
            classify_trend(dec!(101), dec!(92), dec!(95), dec!(100), dec!(0.2)),
            TrendDirection::Neutral
        );
    }

    #[test]
    fn test_bullish_stack_with_lagging_price() {
        // Price under slow EMA but above trend EMA
        assert_eq!(
            classify_trend(dec!(102), dec!(108), dec!(105), dec!(100), dec!(0.2)),
            TrendDirection::WeakBullish
        );
        // Price under trend EMA
        assert_eq!(
            classify_trend(dec!(99), dec!(108), dec!(105), dec!(100), dec!(0.2)),
            TrendDirection::Neutral
        );
    }

    #[test]
    fn test_mixed_stack() {
        // fast > slow but slow < trend
        assert_eq!(
            classify_trend(dec!(101), dec!(99), dec!(98), dec!(100), dec!(0.2)),
            TrendDirection::WeakBullish
        );
        assert_eq!(
            classify_trend(dec!(99), dec!(101), dec!(102), dec!(100), dec!(0.2)),
            TrendDirection::WeakBearish
        );
        assert_eq!(
            classify_trend(dec!(100), dec!(100), dec!(100), dec!(100), dec!(0.2)),
            TrendDirection::Neutral
        );
    }

    #[test]
    fn test_pullback_detection() {
        // Within 0.5% of fast EMA
        assert!(is_pullback_to_ema(dec!(100.4), dec!(100), dec!(95)));
        // Between EMAs
        assert!(is_pullback_to_ema(dec!(97), dec!(100), dec!(95)));
        // Far above both
        assert!(!is_pullback_to_ema(dec!(110), dec!(100), dec!(95)));
    }

    #[test]
    fn test_analyze_uses_last_candle() {
        let closes: Vec<Decimal> = (1..=30).map(|i| Decimal::from(100 + i)).collect();
        let series = candles(&closes);
        let analyzer = MarketAnalyzer::new(AnalyzerConfig::default());

        let observed_at = series.last().unwrap().close_time + Duration::minutes(5);
        let snapshot = analyzer.analyze(&series, observed_at).unwrap();

        assert_eq!(snapshot.price.as_decimal(), dec!(130));
        assert_eq!(snapshot.timestamp, series.last().unwrap().close_time);
        assert_eq!(snapshot.oscillator, dec!(100));
        assert!(snapshot.ema_fast > snapshot.ema_slow);
        assert!(snapshot.ema_slow > snapshot.ema_trend);
    }

    #[test]
    fn test_forming_candle_is_stamped_at_observation() {
        let closes: Vec<Decimal> = (1..=30).map(|i| Decimal::from(100 + i)).collect();
        let series = candles(&closes);
        let close_time = series.last().unwrap().close_time;
        let observed_at = close_time - Duration::hours(3);
        let analyzer = MarketAnalyzer::new(AnalyzerConfig::default());

        let snapshot = analyzer.analyze(&series, observed_at).unwrap();

        assert_eq!(snapshot.timestamp, observed_at);
        assert!(snapshot.timestamp < close_time);
    }

    #[test]
    fn test_analyze_empty_series() {
        let analyzer = MarketAnalyzer::new(AnalyzerConfig::default());
        assert_eq!(
            analyzer.analyze(&[], Utc::now()),
            Err(EngineError::InsufficientData { needed: 1, got: 0 })
        );
    }

    #[test]
    fn test_config_validation() {
        assert!(AnalyzerConfig::default().validate().is_ok());
        let bad = AnalyzerConfig {
            ema_fast_period: 60,
            ..AnalyzerConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
