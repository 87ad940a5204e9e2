//! Exchange Holdings
//!
//! What the exchange says we hold, independent of what local state believes.
//! Used by startup reconciliation to recover positions that exist on the
//! exchange but were lost locally (crash, deleted state file, manual buy).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Price, Quantity, Side, Symbol};

/// Minimum base-asset balance treated as an open spot position.
///
/// Anything below is dust left over from rounding and fees.
pub const DEFAULT_MIN_HOLDING_QTY: Decimal = Decimal::from_parts(1, 0, 0, false, 3);

/// An open exposure reported by the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeHoldings {
    /// Trading symbol
    pub symbol: Symbol,
    /// Exposure direction
    pub side: Side,
    /// Size held
    pub quantity: Quantity,
    /// Price the exchange reported alongside the holdings (last trade/ticker)
    pub reference_price: Price,
    /// When the holdings were observed
    pub detected_at: DateTime<Utc>,
}

impl ExchangeHoldings {
    /// Create holdings observed now.
    pub fn new(symbol: Symbol, side: Side, quantity: Quantity, reference_price: Price) -> Self {
        Self {
            symbol,
            side,
            quantity,
            reference_price,
            detected_at: Utc::now(),
        }
    }

    /// Interpret a spot base-asset balance as holdings.
    ///
    /// Spot accounts can only be long; balances at or below `min_qty` are dust
    /// and yield `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use swing_domain::{ExchangeHoldings, Price, Side, Symbol};
    /// # use rust_decimal_macros::dec;
    /// let symbol = Symbol::from_pair("BTCUSDT").unwrap();
    /// let price = Price::new(dec!(65000)).unwrap();
    ///
    /// let held = ExchangeHoldings::from_spot_balance(symbol.clone(), dec!(0.05), price, dec!(0.001));
    /// assert_eq!(held.unwrap().side, Side::Long);
    ///
    /// assert!(ExchangeHoldings::from_spot_balance(symbol, dec!(0.0004), price, dec!(0.001)).is_none());
    /// ```
    pub fn from_spot_balance(
        symbol: Symbol,
        base_balance: Decimal,
        reference_price: Price,
        min_qty: Decimal,
    ) -> Option<Self> {
        if base_balance <= min_qty {
            return None;
        }
        let quantity = Quantity::new(base_balance).ok()?;
        Some(Self::new(symbol, Side::Long, quantity, reference_price))
    }

    /// Notional value of the holdings at the reference price.
    pub fn notional(&self) -> Decimal {
        self.quantity.notional_at(self.reference_price)
    }
}
