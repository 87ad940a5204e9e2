//! Market Data Types
//!
//! Exchange-agnostic market data: raw candles as delivered by the exchange and
//! the per-cycle `MarketSnapshot` the decision engine consumes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{DomainError, Price, Side};

// =============================================================================
// Candle
// =============================================================================

/// OHLCV candlestick data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Open price
    pub open: Decimal,
    /// High price
    pub high: Decimal,
    /// Low price
    pub low: Decimal,
    /// Close price
    pub close: Decimal,
    /// Total volume traded
    pub volume: Decimal,
    /// Candle open time
    pub open_time: DateTime<Utc>,
    /// Candle close time
    pub close_time: DateTime<Utc>,
}

impl Candle {
    /// Create a flat candle where every price equals `close` (handy for tests and replays).
    pub fn flat(close: Decimal, close_time: DateTime<Utc>) -> Self {
        Self {
            open: close,
            high: close,
            low: close,
            close,
            volume: Decimal::ZERO,
            open_time: close_time,
            close_time,
        }
    }
}

// =============================================================================
// Trend Direction
// =============================================================================

/// Trend classification derived from the EMA stack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    /// Fast > slow > trend with price holding above the slow EMA
    Bullish,
    /// Bullish structure without full confirmation
    WeakBullish,
    /// No usable structure
    #[default]
    Neutral,
    /// Bearish structure without full confirmation
    WeakBearish,
    /// Fast < slow < trend with price holding below the slow EMA
    Bearish,
}

impl TrendDirection {
    /// Whether a new signal in `side` direction may be raised under this trend.
    ///
    /// Long entries are allowed in bullish, weak bullish and neutral markets;
    /// short entries mirror that.
    pub fn permits_entry(&self, side: Side) -> bool {
        match side {
            Side::Long => matches!(
                self,
                TrendDirection::Bullish | TrendDirection::WeakBullish | TrendDirection::Neutral
            ),
            Side::Short => matches!(
                self,
                TrendDirection::Bearish | TrendDirection::WeakBearish | TrendDirection::Neutral
            ),
        }
    }

    /// Whether the trend has flipped decisively against `side`.
    pub fn is_hard_against(&self, side: Side) -> bool {
        match side {
            Side::Long => *self == TrendDirection::Bearish,
            Side::Short => *self == TrendDirection::Bullish,
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TrendDirection::Bullish => "bullish",
            TrendDirection::WeakBullish => "weak_bullish",
            TrendDirection::Neutral => "neutral",
            TrendDirection::WeakBearish => "weak_bearish",
            TrendDirection::Bearish => "bearish",
        };
        write!(f, "{}", label)
    }
}

impl FromStr for TrendDirection {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bullish" => Ok(TrendDirection::Bullish),
            "weak_bullish" => Ok(TrendDirection::WeakBullish),
            "neutral" => Ok(TrendDirection::Neutral),
            "weak_bearish" => Ok(TrendDirection::WeakBearish),
            "bearish" => Ok(TrendDirection::Bearish),
            other => Err(DomainError::InvalidTrend(other.to_string())),
        }
    }
}

// =============================================================================
// Market Snapshot
// =============================================================================

/// Immutable per-cycle view of the market.
///
/// Produced by the market analyzer once per decision cycle and consumed by the
/// signal detector and the risk evaluator. The last snapshot seen is also
/// persisted so indicator context survives restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Last close price
    pub price: Price,
    /// Oscillator value (RSI, 0-100)
    pub oscillator: Decimal,
    /// Fast EMA
    pub ema_fast: Decimal,
    /// Slow EMA
    pub ema_slow: Decimal,
    /// Long-horizon trend EMA
    pub ema_trend: Decimal,
    /// Trend classification
    pub trend: TrendDirection,
    /// Snapshot time
    pub timestamp: DateTime<Utc>,
}

impl MarketSnapshot {
    /// Snapshot with EMAs pinned to the price (tests and bootstrapping).
    pub fn at_price(
        price: Price,
        oscillator: Decimal,
        trend: TrendDirection,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            price,
            oscillator,
            ema_fast: price.as_decimal(),
            ema_slow: price.as_decimal(),
            ema_trend: price.as_decimal(),
            trend,
            timestamp,
        }
    }

    /// True when price trades below the fast EMA.
    pub fn is_below_fast_ema(&self) -> bool {
        self.price.as_decimal() < self.ema_fast
    }

    /// True when price trades above the fast EMA.
    pub fn is_above_fast_ema(&self) -> bool {
        self.price.as_decimal() > self.ema_fast
    }
}

// =============================================================================
// Tests
// =============================================================================
