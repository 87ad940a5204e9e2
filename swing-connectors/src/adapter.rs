//! Binance spot adapter for the execution ports.
//!
//! Spot accounts cannot be short, so open holdings are always long: a base
//! asset balance above the dust threshold, valued at the last ticker price.

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::debug;

use swing_domain::{Candle, ExchangeHoldings, OrderSide, Price, Quantity, Symbol, DEFAULT_MIN_HOLDING_QTY};
use swing_exec::{Balances, ExchangePort, ExecError, MarketDataPort, OrderAck};

use crate::binance_rest::{BinanceRestClient, BinanceRestError, MAX_KLINE_LIMIT};

/// `ExchangePort` + `MarketDataPort` over the Binance spot REST API.
pub struct BinanceExchange {
    client: BinanceRestClient,
    min_holding_qty: Decimal,
}

impl BinanceExchange {
    /// Wrap a REST client.
    pub fn new(client: BinanceRestClient) -> Self {
        Self {
            client,
            min_holding_qty: DEFAULT_MIN_HOLDING_QTY,
        }
    }

    /// Override the dust threshold for holdings detection.
    pub fn with_min_holding_qty(mut self, min_holding_qty: Decimal) -> Self {
        self.min_holding_qty = min_holding_qty;
        self
    }
}

impl From<BinanceRestError> for ExecError {
    fn from(err: BinanceRestError) -> Self {
        match err {
            BinanceRestError::Timeout => ExecError::Timeout("Binance request timed out".to_string()),
            BinanceRestError::ApiError { code, msg } => {
                ExecError::OrderRejected(format!("Binance {}: {}", code, msg))
            }
            other => ExecError::Exchange(other.to_string()),
        }
    }
}

#[async_trait]
impl ExchangePort for BinanceExchange {
    async fn fetch_balance(&self) -> Result<Balances, ExecError> {
        let account = self.client.get_account().await?;

        let available = account
            .balances
            .into_iter()
            .filter(|b| !b.free.is_zero())
            .map(|b| (b.asset, b.free))
            .collect();

        Ok(Balances { available })
    }

    async fn fetch_open_holdings(&self, symbol: &Symbol) -> Result<Option<ExchangeHoldings>, ExecError> {
        let account = self.client.get_account().await?;
        let held = account
            .balance(symbol.base())
            .map(|b| b.total())
            .unwrap_or(Decimal::ZERO);

        debug!(asset = symbol.base(), held = %held, "Spot holdings");

        if held <= self.min_holding_qty {
            return Ok(None);
        }

        let price = self.client.get_price(&symbol.as_pair()).await?;
        Ok(ExchangeHoldings::from_spot_balance(
            symbol.clone(),
            held,
            price,
            self.min_holding_qty,
        ))
    }

    async fn submit_market_order(
        &self,
        symbol: &Symbol,
        side: OrderSide,
        quantity: Quantity,
    ) -> Result<OrderAck, ExecError> {
        let response = self
            .client
            .place_market_order(&symbol.as_pair(), side, quantity.as_decimal())
            .await?;

        Ok(OrderAck {
            id: response.order_id.to_string(),
            filled_quantity: response.executed_qty,
            average_price: response.average_price(),
            status: response.status,
        })
    }

    async fn fetch_last_price(&self, symbol: &Symbol) -> Result<Price, ExecError> {
        Ok(self.client.get_price(&symbol.as_pair()).await?)
    }

    async fn health_check(&self) -> Result<(), ExecError> {
        Ok(self.client.ping().await?)
    }
}

#[async_trait]
impl MarketDataPort for BinanceExchange {
    async fn fetch_candles(
        &self,
        symbol: &Symbol,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, ExecError> {
        let limit = limit.min(MAX_KLINE_LIMIT);
        Ok(self.client.get_klines(&symbol.as_pair(), interval, limit).await?)
    }
}
