//! Position Manager: owns the single position and its lifecycle.
//!
//! - Sizing from the quote-asset balance
//! - Opening with fixed stop loss / take profit
//! - Closing with realized P&L, metrics and a journal row
//!
//! Order submission never fails from the manager's point of view: the
//! executor returns a simulated fill when the exchange call errors, and the
//! position records which kind of fill it got.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use swing_domain::{ExitReason, PerformanceMetrics, Position, Price, Side, Symbol, TradeRecord};
use swing_engine::{size_position, PositionSize};
use swing_exec::{ExchangePort, OrderExecutor};
use swing_store::TradeJournal;

use crate::config::PositionConfig;
use crate::error::{DaemonError, DaemonResult};

// =============================================================================
// Position Manager
// =============================================================================

/// Owns the active position (0 or 1).
pub struct PositionManager<E: ExchangePort + 'static> {
    /// Order executor
    executor: Arc<OrderExecutor<E>>,
    /// Traded pair
    symbol: Symbol,
    /// Sizing and protection levels
    config: PositionConfig,
    /// CSV journal (None disables journaling)
    journal: Option<TradeJournal>,
    /// The active position
    position: Option<Position>,
}

impl<E: ExchangePort + 'static> PositionManager<E> {
    /// Create a manager with no position.
    pub fn new(
        executor: Arc<OrderExecutor<E>>,
        symbol: Symbol,
        config: PositionConfig,
        journal: Option<TradeJournal>,
    ) -> Self {
        Self {
            executor,
            symbol,
            config,
            journal,
            position: None,
        }
    }

    /// The active position.
    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    /// Mutable access for trailing stop updates.
    pub fn position_mut(&mut self) -> Option<&mut Position> {
        self.position.as_mut()
    }

    /// Whether a position is open.
    pub fn is_open(&self) -> bool {
        self.position.is_some()
    }

    /// Replace the active position with the reconciled one.
    pub fn restore(&mut self, position: Option<Position>) {
        self.position = position;
    }

    /// Sizing and protection settings.
    pub fn config(&self) -> &PositionConfig {
        &self.config
    }

    /// Size an order at `price` from the current quote-asset balance.
    pub async fn size_position(&self, price: Price) -> DaemonResult<PositionSize> {
        let balances = self.executor.fetch_balance().await?;
        let balance = balances.available(self.symbol.quote());

        size_position(balance, price, &self.config.sizing).map_err(|e| {
            warn!(
                symbol = %self.symbol,
                asset = self.symbol.quote(),
                %balance,
                %price,
                error = %e,
                "Position sizing failed"
            );
            DaemonError::from(e)
        })
    }

    /// Open a position in `side` at `price`.
    ///
    /// Fails on sizing failure or a balance query error; no position is
    /// created and the caller keeps its signal.
    pub async fn open(&mut self, side: Side, price: Price, at: DateTime<Utc>) -> DaemonResult<&Position> {
        if let Some(existing) = &self.position {
            return Err(DaemonError::PositionAlreadyOpen(existing.id));
        }

        let size = self.size_position(price).await?;
        let fill = self
            .executor
            .submit_market_order(&self.symbol, side.entry_action(), size.quantity, price)
            .await;

        let position = Position::open(
            self.symbol.clone(),
            side,
            fill.price(),
            fill.quantity(),
            self.config.stop_loss_pct,
            self.config.take_profit_pct,
            at,
        )?
        .with_entry_order(fill.order_id(), fill.is_simulated());

        info!(
            position_id = %position.id,
            %side,
            entry = %position.entry_price,
            quantity = %position.quantity,
            notional = %size.notional.round_dp(2),
            stop_loss = %position.stop_loss,
            take_profit = %position.take_profit,
            order_id = %position.entry_order_id,
            simulated = position.simulated_entry,
            "Position opened"
        );

        if let Some(journal) = &self.journal {
            if let Err(e) = journal.record_open(&position).await {
                warn!(error = %e, path = %journal.path().display(), "Trade journal write failed");
            }
        }

        Ok(self.position.insert(position))
    }

    /// Close the active position at `price`.
    ///
    /// Records the trade in `metrics` and the journal, then clears the position.
    pub async fn close(
        &mut self,
        reason: &ExitReason,
        price: Price,
        at: DateTime<Utc>,
        metrics: &mut PerformanceMetrics,
    ) -> DaemonResult<TradeRecord> {
        let position = self.position.as_ref().ok_or(DaemonError::NoOpenPosition)?;

        let fill = self
            .executor
            .submit_market_order(
                &self.symbol,
                position.side.exit_action(),
                position.quantity,
                price,
            )
            .await;

        let trade = position.close(
            fill.price(),
            reason,
            self.config.sizing.leverage,
            at,
            fill.is_simulated(),
        );
        metrics.record_trade(trade.pnl_pct);

        info!(
            position_id = %trade.position_id,
            side = %trade.side,
            entry = %trade.entry_price,
            exit = %trade.exit_price,
            pnl_pct = %trade.pnl_pct.round_dp(2),
            duration_hours = %trade.duration_hours,
            reason = %trade.reason,
            recovered = trade.recovered,
            simulated = trade.simulated_exit,
            "Position closed"
        );

        if let Some(journal) = &self.journal {
            if let Err(e) = journal.record_close(&trade).await {
                warn!(error = %e, path = %journal.path().display(), "Trade journal write failed");
            }
        }

        self.position = None;
        Ok(trade)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use swing_engine::EngineError;
    use swing_exec::{StubExchange, DEFAULT_REQUEST_TIMEOUT};

    fn p(value: rust_decimal::Decimal) -> Price {
        Price::new(value).unwrap()
    }

    fn setup(balance: rust_decimal::Decimal) -> (Arc<StubExchange>, PositionManager<StubExchange>) {
        let exchange = Arc::new(StubExchange::new(dec!(100)));
        exchange.set_balance("USDT", balance);
        let executor = Arc::new(OrderExecutor::new(exchange.clone(), DEFAULT_REQUEST_TIMEOUT));
        let manager = PositionManager::new(
            executor,
            Symbol::from_pair("BTCUSDT").unwrap(),
            PositionConfig::default(),
            None,
        );
        (exchange, manager)
    }

    #[tokio::test]
    async fn test_open_sets_protection_levels() {
        let (exchange, mut manager) = setup(dec!(1000));

        let position = manager.open(Side::Long, p(dec!(100)), Utc::now()).await.unwrap().clone();

        assert_eq!(position.quantity.as_decimal(), dec!(0.3));
        assert_eq!(position.stop_loss.as_decimal(), dec!(97));
        assert_eq!(position.take_profit.as_decimal(), dec!(106));
        assert_eq!(position.trailing_stop, position.stop_loss);
        assert_eq!(position.extreme_price, position.entry_price);
        assert!(!position.breakeven_moved);
        assert!(!position.simulated_entry);
        assert_eq!(exchange.net_holdings("BTCUSDT"), dec!(0.3));
    }

    #[tokio::test]
    async fn test_open_fails_below_min_balance() {
        let (exchange, mut manager) = setup(dec!(10));

        let err = manager.open(Side::Long, p(dec!(100)), Utc::now()).await.unwrap_err();
        assert!(matches!(err, DaemonError::Engine(EngineError::InsufficientBalance { .. })));
        assert!(!manager.is_open());
        assert!(exchange.submitted_orders().is_empty());
    }

    #[tokio::test]
    async fn test_open_falls_back_to_simulated_fill() {
        let (exchange, mut manager) = setup(dec!(1000));
        exchange.set_reject_orders(true);

        let position = manager.open(Side::Short, p(dec!(100)), Utc::now()).await.unwrap();
        assert!(position.simulated_entry);
        assert!(position.entry_order_id.starts_with("simulated-"));
        assert_eq!(position.entry_price.as_decimal(), dec!(100));
    }

    #[tokio::test]
    async fn test_cannot_open_twice() {
        let (_exchange, mut manager) = setup(dec!(1000));
        manager.open(Side::Long, p(dec!(100)), Utc::now()).await.unwrap();

        let err = manager.open(Side::Long, p(dec!(100)), Utc::now()).await.unwrap_err();
        assert!(matches!(err, DaemonError::PositionAlreadyOpen(_)));
    }

    #[tokio::test]
    async fn test_close_records_trade_and_clears() {
        let (exchange, mut manager) = setup(dec!(1000));
        let mut metrics = PerformanceMetrics::default();

        manager.open(Side::Long, p(dec!(100)), Utc::now()).await.unwrap();
        exchange.set_price("BTCUSDT", dec!(106));

        let trade = manager
            .close(&ExitReason::TakeProfit, p(dec!(106)), Utc::now(), &mut metrics)
            .await
            .unwrap();

        assert_eq!(trade.pnl_pct, dec!(6));
        assert_eq!(trade.reason, "Take Profit Target");
        assert!(!manager.is_open());
        assert_eq!(metrics.total_trades, 1);
        assert_eq!(metrics.winning_trades, 1);
        assert_eq!(exchange.net_holdings("BTCUSDT"), dec!(0));
    }

    #[tokio::test]
    async fn test_close_without_position() {
        let (_exchange, mut manager) = setup(dec!(1000));
        let mut metrics = PerformanceMetrics::default();

        let err = manager
            .close(&ExitReason::Shutdown, p(dec!(100)), Utc::now(), &mut metrics)
            .await
            .unwrap_err();
        assert!(matches!(err, DaemonError::NoOpenPosition));
    }
}
