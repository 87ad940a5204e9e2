//! Position sizing.
//!
//! Balance-percentage sizing with a two-stage minimum notional check:
//! clamp up before rounding, re-check after rounding to the lot precision.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use swing_domain::{Price, Quantity};

use crate::error::{EngineError, EngineResult};

/// Sizing inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizingParams {
    /// Share of the available balance committed (%)
    pub position_size_pct: Decimal,
    /// Leverage multiplier
    pub leverage: Decimal,
    /// Balance floor below which no position is opened
    pub min_balance: Decimal,
    /// Exchange minimum order notional
    pub min_notional: Decimal,
    /// Decimal places allowed in the order quantity
    pub lot_precision: u32,
}

impl Default for SizingParams {
    fn default() -> Self {
        Self {
            position_size_pct: dec!(3),
            leverage: Decimal::ONE,
            min_balance: dec!(50),
            min_notional: dec!(12),
            lot_precision: 6,
        }
    }
}

/// Order size ready for submission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSize {
    /// Rounded order quantity
    pub quantity: Quantity,
    /// Notional of the rounded quantity at the sizing price
    pub notional: Decimal,
}

/// Size a position for `balance` at `price`.
///
/// # Errors
///
/// - `EngineError::InsufficientBalance` when `balance < min_balance`
/// - `EngineError::BelowMinNotional` when rounding pushes the notional under the minimum
///
/// # Examples
///
/// ```
/// # use swing_engine::sizing::{size_position, SizingParams};
/// # use swing_domain::Price;
/// # use rust_decimal_macros::dec;
/// let size = size_position(dec!(1000), Price::new(dec!(50000)).unwrap(), &SizingParams::default()).unwrap();
/// // 3% of 1000 = 30 USDT -> 0.0006 BTC
/// assert_eq!(size.quantity.as_decimal(), dec!(0.0006));
/// assert_eq!(size.notional, dec!(30));
/// ```
pub fn size_position(balance: Decimal, price: Price, params: &SizingParams) -> EngineResult<PositionSize> {
    if balance < params.min_balance {
        return Err(EngineError::InsufficientBalance {
            balance,
            minimum: params.min_balance,
        });
    }

    let mut notional = balance * params.position_size_pct / Decimal::ONE_HUNDRED * params.leverage;
    if notional < params.min_notional {
        notional = params.min_notional;
    }

    let raw_quantity = (notional / price.as_decimal()).round_dp(params.lot_precision);
    let rounded_notional = raw_quantity * price.as_decimal();

    if raw_quantity.is_zero() || rounded_notional < params.min_notional {
        return Err(EngineError::BelowMinNotional {
            notional: rounded_notional,
            minimum: params.min_notional,
        });
    }

    Ok(PositionSize {
        quantity: Quantity::new(raw_quantity)?,
        notional: rounded_notional,
    })
}
