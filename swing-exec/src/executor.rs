//! Order Executor: bounded exchange calls with a simulated-fill fallback.
//!
//! Every call to the exchange goes through a timeout. Order submissions
//! never fail from the caller's point of view: a rejected, failed or timed
//! out order becomes `OrderResult::SimulatedFilled` so position bookkeeping
//! stays consistent. Read-only queries return errors for the caller to log.
//!
//! # Flow
//!
//! ```text
//! PositionManager → OrderExecutor → timeout(ExchangePort) → OrderResult
//!                                          │ error / timeout / nothing filled
//!                                          └──────────────► SimulatedFilled
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use swing_domain::{ExchangeHoldings, OrderSide, Price, Quantity, Symbol};

use crate::error::{ExecError, ExecResult};
use crate::ports::{Balances, ExchangePort, OrderAck, OrderResult};

const FILLED: &str = "FILLED";
const PARTIALLY_FILLED: &str = "PARTIALLY_FILLED";

/// Default bound on any single exchange call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Executes orders and queries against an exchange port.
pub struct OrderExecutor<E: ExchangePort> {
    exchange: Arc<E>,
    timeout: Duration,
}

impl<E: ExchangePort> OrderExecutor<E> {
    /// Create an executor with the given per-call timeout.
    pub fn new(exchange: Arc<E>, timeout: Duration) -> Self {
        Self { exchange, timeout }
    }

    /// Underlying exchange.
    pub fn exchange(&self) -> &Arc<E> {
        &self.exchange
    }

    /// Submit a market order, falling back to a simulated fill on any failure.
    ///
    /// `reference_price` is the price the decision was made at; it is used as
    /// the fill price when the exchange reports none and for simulated fills.
    pub async fn submit_market_order(
        &self,
        symbol: &Symbol,
        side: OrderSide,
        quantity: Quantity,
        reference_price: Price,
    ) -> OrderResult {
        let result = self
            .bounded(
                "submit_market_order",
                self.exchange.submit_market_order(symbol, side, quantity),
            )
            .await
            .and_then(|ack| {
                let filled = executed_quantity(&ack)?;
                Ok((ack, filled))
            });

        match result {
            Ok((ack, filled)) => {
                let price = ack.average_price.unwrap_or(reference_price);
                info!(
                    symbol = %symbol,
                    %side,
                    order_id = %ack.id,
                    quantity = %filled,
                    price = %price,
                    status = %ack.status,
                    "Order filled"
                );
                OrderResult::Filled {
                    order_id: ack.id,
                    quantity: filled,
                    price,
                    status: ack.status,
                }
            }
            Err(e) => {
                let order_id = format!("simulated-{}", Uuid::now_v7());
                warn!(
                    symbol = %symbol,
                    %side,
                    %order_id,
                    quantity = %quantity,
                    price = %reference_price,
                    error = %e,
                    "Order submission failed, recording simulated fill"
                );
                OrderResult::SimulatedFilled {
                    order_id,
                    quantity,
                    price: reference_price,
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Free balances.
    pub async fn fetch_balance(&self) -> ExecResult<Balances> {
        self.bounded("fetch_balance", self.exchange.fetch_balance()).await
    }

    /// Current exchange exposure in `symbol`.
    pub async fn fetch_open_holdings(&self, symbol: &Symbol) -> ExecResult<Option<ExchangeHoldings>> {
        self.bounded("fetch_open_holdings", self.exchange.fetch_open_holdings(symbol))
            .await
    }

    /// Last traded price.
    pub async fn fetch_last_price(&self, symbol: &Symbol) -> ExecResult<Price> {
        self.bounded("fetch_last_price", self.exchange.fetch_last_price(symbol))
            .await
    }

    /// Connectivity check.
    pub async fn health_check(&self) -> ExecResult<()> {
        self.bounded("health_check", self.exchange.health_check()).await
    }

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> ExecResult<T>
    where
        F: Future<Output = ExecResult<T>>,
    {
        debug!(operation, timeout_ms = self.timeout.as_millis() as u64, "Exchange call");
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ExecError::Timeout(format!(
                "{} exceeded {}s",
                operation,
                self.timeout.as_secs_f64()
            ))),
        }
    }
}

/// Quantity the exchange actually executed.
///
/// An acknowledgement that filled nothing (e.g. an `EXPIRED` market order) is
/// a rejection, not a fill.
fn executed_quantity(ack: &OrderAck) -> ExecResult<Quantity> {
    let status_ok = matches!(ack.status.as_str(), FILLED | PARTIALLY_FILLED);
    match Quantity::new(ack.filled_quantity) {
        Ok(filled) if status_ok => Ok(filled),
        _ => Err(ExecError::OrderRejected(format!(
            "order {} {} with {} filled",
            ack.id, ack.status, ack.filled_quantity
        ))),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StubExchange;
    use rust_decimal_macros::dec;

    fn setup() -> (Arc<StubExchange>, OrderExecutor<StubExchange>) {
        let exchange = Arc::new(StubExchange::new(dec!(95000)));
        let executor = OrderExecutor::new(exchange.clone(), DEFAULT_REQUEST_TIMEOUT);
        (exchange, executor)
    }

    fn btc() -> Symbol {
        Symbol::from_pair("BTCUSDT").unwrap()
    }

    #[tokio::test]
    async fn test_real_fill() {
        let (_exchange, executor) = setup();

        let result = executor
            .submit_market_order(
                &btc(),
                OrderSide::Buy,
                Quantity::new(dec!(0.01)).unwrap(),
                Price::new(dec!(94000)).unwrap(),
            )
            .await;

        assert!(!result.is_simulated());
        assert_eq!(result.order_id(), "STUB-1");
        // Stub reports its own fill price
        assert_eq!(result.price().as_decimal(), dec!(95000));
    }

    #[tokio::test]
    async fn test_failure_becomes_simulated_fill() {
        let (exchange, executor) = setup();
        exchange.set_fail_next(true);

        let result = executor
            .submit_market_order(
                &btc(),
                OrderSide::Sell,
                Quantity::new(dec!(0.01)).unwrap(),
                Price::new(dec!(94000)).unwrap(),
            )
            .await;

        match result {
            OrderResult::SimulatedFilled { order_id, quantity, price, reason } => {
                assert!(order_id.starts_with("simulated-"));
                assert_eq!(quantity.as_decimal(), dec!(0.01));
                assert_eq!(price.as_decimal(), dec!(94000));
                assert!(reason.contains("Simulated exchange failure"));
            }
            other => panic!("expected simulated fill, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_simulated_fill() {
        let exchange = Arc::new(StubExchange::new(dec!(95000)));
        exchange.set_order_delay(Some(Duration::from_secs(30)));
        let executor = OrderExecutor::new(exchange.clone(), Duration::from_secs(1));

        let result = executor
            .submit_market_order(
                &btc(),
                OrderSide::Buy,
                Quantity::new(dec!(0.01)).unwrap(),
                Price::new(dec!(94000)).unwrap(),
            )
            .await;

        assert!(result.is_simulated());
        assert!(exchange.submitted_orders().is_empty());
    }

    /// Exchange that acknowledges every order without executing it.
    struct UnfilledExchange {
        status: &'static str,
        filled: rust_decimal::Decimal,
    }

    #[async_trait::async_trait]
    impl ExchangePort for UnfilledExchange {
        async fn fetch_balance(&self) -> Result<Balances, ExecError> {
            Ok(Balances::default())
        }

        async fn fetch_open_holdings(&self, _symbol: &Symbol) -> Result<Option<ExchangeHoldings>, ExecError> {
            Ok(None)
        }

        async fn submit_market_order(
            &self,
            _symbol: &Symbol,
            _side: OrderSide,
            _quantity: Quantity,
        ) -> Result<OrderAck, ExecError> {
            Ok(OrderAck {
                id: "42".to_string(),
                filled_quantity: self.filled,
                status: self.status.to_string(),
                average_price: None,
            })
        }

        async fn fetch_last_price(&self, _symbol: &Symbol) -> Result<Price, ExecError> {
            Price::new(dec!(100)).map_err(ExecError::from)
        }

        async fn health_check(&self) -> Result<(), ExecError> {
            Ok(())
        }
    }

    async fn submit_to(exchange: UnfilledExchange) -> OrderResult {
        OrderExecutor::new(Arc::new(exchange), DEFAULT_REQUEST_TIMEOUT)
            .submit_market_order(
                &btc(),
                OrderSide::Buy,
                Quantity::new(dec!(0.5)).unwrap(),
                Price::new(dec!(100)).unwrap(),
            )
            .await
    }

    #[tokio::test]
    async fn test_expired_zero_fill_is_simulated() {
        let result = submit_to(UnfilledExchange {
            status: "EXPIRED",
            filled: dec!(0),
        })
        .await;

        assert!(result.is_simulated());
        assert_eq!(result.quantity().as_decimal(), dec!(0.5));
        match result {
            OrderResult::SimulatedFilled { reason, .. } => assert!(reason.contains("EXPIRED")),
            other => panic!("expected simulated fill, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_partial_fill_books_executed_quantity() {
        let result = submit_to(UnfilledExchange {
            status: "PARTIALLY_FILLED",
            filled: dec!(0.2),
        })
        .await;

        assert!(!result.is_simulated());
        assert_eq!(result.quantity().as_decimal(), dec!(0.2));
        assert_eq!(result.price().as_decimal(), dec!(100));
    }

    #[tokio::test]
    async fn test_read_errors_propagate() {
        let (exchange, executor) = setup();
        exchange.set_fail_next(true);
        assert!(executor.fetch_last_price(&btc()).await.is_err());
        assert!(executor.fetch_last_price(&btc()).await.is_ok());
    }
}
