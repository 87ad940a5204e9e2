//! Market feed: candles in, one `MarketSnapshot` out per cycle.

use std::sync::Arc;

use chrono::Utc;
use swing_domain::{MarketSnapshot, Symbol};
use swing_engine::MarketAnalyzer;
use swing_exec::MarketDataPort;
use tracing::debug;

use crate::error::DaemonResult;

/// Fetches candle history and turns it into snapshots.
pub struct MarketFeed<M: MarketDataPort + 'static> {
    source: Arc<M>,
    analyzer: MarketAnalyzer,
    symbol: Symbol,
    interval: String,
    lookback: usize,
}

impl<M: MarketDataPort + 'static> MarketFeed<M> {
    /// Create a feed for `symbol` at `interval`.
    pub fn new(
        source: Arc<M>,
        analyzer: MarketAnalyzer,
        symbol: Symbol,
        interval: impl Into<String>,
        lookback: usize,
    ) -> Self {
        Self {
            source,
            analyzer,
            symbol,
            interval: interval.into(),
            lookback,
        }
    }

    /// Fetch candles and compute the current snapshot, stamped no later than now.
    pub async fn snapshot(&self) -> DaemonResult<MarketSnapshot> {
        let candles = self
            .source
            .fetch_candles(&self.symbol, &self.interval, self.lookback)
            .await?;
        let snapshot = self.analyzer.analyze(&candles, Utc::now())?;

        debug!(
            symbol = %self.symbol,
            candles = candles.len(),
            price = %snapshot.price,
            oscillator = %snapshot.oscillator.round_dp(2),
            trend = %snapshot.trend,
            "Market snapshot"
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use swing_domain::{Candle, TrendDirection};
    use swing_engine::AnalyzerConfig;
    use swing_exec::StubMarketData;

    fn feed(source: Arc<StubMarketData>) -> MarketFeed<StubMarketData> {
        MarketFeed::new(
            source,
            MarketAnalyzer::new(AnalyzerConfig::default()),
            Symbol::from_pair("BTCUSDT").unwrap(),
            "4h",
            250,
        )
    }

    #[tokio::test]
    async fn test_flat_series_is_neutral() {
        let source = Arc::new(StubMarketData::new());
        let start = Utc::now() - Duration::hours(4 * 250);
        let candles = (0..250)
            .map(|i| Candle::flat(dec!(100), start + Duration::hours(4 * i)))
            .collect();
        source.push_series(candles);

        let snapshot = feed(source).snapshot().await.unwrap();
        assert_eq!(snapshot.price.as_decimal(), dec!(100));
        assert_eq!(snapshot.trend, TrendDirection::Neutral);
        assert_eq!(snapshot.timestamp, start + Duration::hours(4 * 249));
    }

    #[tokio::test]
    async fn test_rising_series_is_bullish() {
        let source = Arc::new(StubMarketData::new());
        let start = Utc::now();
        let candles = (0..250)
            .map(|i| Candle::flat(dec!(100) + Decimal::from(i), start + Duration::hours(4 * i)))
            .collect();
        source.push_series(candles);

        let snapshot = feed(source).snapshot().await.unwrap();
        assert_eq!(snapshot.trend, TrendDirection::Bullish);
    }

    #[tokio::test]
    async fn test_forming_candle_never_stamps_the_future() {
        let source = Arc::new(StubMarketData::new());
        // last candle closes four hours from now
        let start = Utc::now() - Duration::hours(4 * 248);
        let candles = (0..250)
            .map(|i| Candle::flat(dec!(100), start + Duration::hours(4 * i)))
            .collect();
        source.push_series(candles);

        let before = Utc::now();
        let snapshot = feed(source).snapshot().await.unwrap();
        assert!(snapshot.timestamp >= before);
        assert!(snapshot.timestamp <= Utc::now());
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates() {
        let source = Arc::new(StubMarketData::new());
        assert!(feed(source).snapshot().await.is_err());
    }
}
