//! Value Objects for the Swing Domain
//!
//! Immutable, validated domain primitives.
//! All value objects enforce invariants at construction time.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain errors for value object validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Price must be positive
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    /// Quantity must be positive
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Symbol must be valid trading pair
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Trend label could not be parsed
    #[error("Invalid trend direction: {0}")]
    InvalidTrend(String),

    /// Position sizing error
    #[error("Position sizing error: {0}")]
    PositionSizingError(String),

    /// Invalid state transition
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),
}

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

// =============================================================================
// Price
// =============================================================================

/// Price represents a positive decimal price
///
/// # Invariants
/// - Must be > 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Price(Decimal);

impl Price {
    /// Create a new Price with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPrice` if value <= 0
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value <= Decimal::ZERO {
            return Err(DomainError::InvalidPrice(format!("Price must be positive, got {}", value)));
        }
        Ok(Self(value))
    }

    /// Get the underlying Decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Percentage change from `reference` to `self` (positive when `self` is higher).
    ///
    /// ```
    /// # use swing_domain::value_objects::Price;
    /// # use rust_decimal_macros::dec;
    /// let reference = Price::new(dec!(100)).unwrap();
    /// let current = Price::new(dec!(100.5)).unwrap();
    /// assert_eq!(current.pct_change_from(reference), dec!(0.5));
    /// ```
    pub fn pct_change_from(&self, reference: Price) -> Decimal {
        (self.0 - reference.0) / reference.0 * HUNDRED
    }

    /// Scale the price by `(1 + pct / 100)`. Negative `pct` scales down.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPrice` when `pct <= -100`.
    pub fn scaled_by_pct(&self, pct: Decimal) -> Result<Price, DomainError> {
        Price::new(self.0 * (HUNDRED + pct) / HUNDRED)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Quantity
// =============================================================================

/// Quantity represents a positive decimal quantity
///
/// # Invariants
/// - Must be > 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quantity(Decimal);

impl Quantity {
    /// Create a new Quantity with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidQuantity` if value <= 0
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value <= Decimal::ZERO {
            return Err(DomainError::InvalidQuantity(format!(
                "Quantity must be positive, got {}",
                value
            )));
        }
        Ok(Self(value))
    }

    /// Get the underlying Decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Notional value of this quantity at `price`
    pub fn notional_at(&self, price: Price) -> Decimal {
        self.0 * price.as_decimal()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Symbol
// =============================================================================

/// Symbol represents a trading pair (e.g., BTCUSDT)
///
/// # Invariants
/// - Must be valid format (base + quote)
/// - Base and quote must be non-empty
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    base: String,
    quote: String,
}

impl Symbol {
    /// Create a Symbol from a trading pair string
    ///
    /// Accepts both `BTCUSDT` and `BTC/USDT`.
    ///
    /// # Examples
    /// ```
    /// # use swing_domain::value_objects::Symbol;
    /// let symbol = Symbol::from_pair("BTCUSDT").unwrap();
    /// assert_eq!(symbol.base(), "BTC");
    /// assert_eq!(symbol.quote(), "USDT");
    ///
    /// let slashed = Symbol::from_pair("ETH/USDT").unwrap();
    /// assert_eq!(slashed.as_pair(), "ETHUSDT");
    /// ```
    ///
    /// # Errors
    /// Returns `DomainError::InvalidSymbol` if format is invalid
    pub fn from_pair(pair: &str) -> Result<Self, DomainError> {
        if let Some((base, quote)) = pair.split_once('/') {
            return Self::new(base.to_uppercase(), quote.to_uppercase());
        }

        // Common quote currencies (extend as needed)
        const QUOTE_CURRENCIES: &[&str] = &["USDT", "USDC", "FDUSD", "BUSD", "BTC", "ETH", "BNB"];

        let upper = pair.to_uppercase();
        for quote in QUOTE_CURRENCIES {
            if let Some(base) = upper.strip_suffix(quote) {
                if !base.is_empty() {
                    return Ok(Self {
                        base: base.to_string(),
                        quote: quote.to_string(),
                    });
                }
            }
        }

        Err(DomainError::InvalidSymbol(format!("Cannot parse trading pair: {}", pair)))
    }

    /// Create a Symbol from explicit base and quote
    pub fn new(base: String, quote: String) -> Result<Self, DomainError> {
        if base.is_empty() || quote.is_empty() {
            return Err(DomainError::InvalidSymbol("Base and quote must be non-empty".to_string()));
        }
        Ok(Self { base, quote })
    }

    /// Get the base currency
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Get the quote currency
    pub fn quote(&self) -> &str {
        &self.quote
    }

    /// Get the trading pair as string (e.g., "BTCUSDT")
    pub fn as_pair(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_pair())
    }
}

// =============================================================================
// Side
// =============================================================================

/// Side represents the position (or signal) direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Long position (buy low, sell high)
    Long,
    /// Short position (sell high, buy low)
    Short,
}

impl Side {
    /// Get the entry action for this side
    ///
    /// Long → Buy, Short → Sell
    pub fn entry_action(&self) -> OrderSide {
        match self {
            Side::Long => OrderSide::Buy,
            Side::Short => OrderSide::Sell,
        }
    }

    /// Get the exit action for this side
    ///
    /// Long → Sell, Short → Buy
    pub fn exit_action(&self) -> OrderSide {
        match self {
            Side::Long => OrderSide::Sell,
            Side::Short => OrderSide::Buy,
        }
    }

    /// Percentage move from `reference` to `current`, signed so that a move
    /// in this side's favor is positive.
    ///
    /// ```
    /// # use swing_domain::value_objects::{Price, Side};
    /// # use rust_decimal_macros::dec;
    /// let reference = Price::new(dec!(100)).unwrap();
    /// let current = Price::new(dec!(99)).unwrap();
    /// assert_eq!(Side::Long.favorable_move_pct(reference, current), dec!(-1));
    /// assert_eq!(Side::Short.favorable_move_pct(reference, current), dec!(1));
    /// ```
    pub fn favorable_move_pct(&self, reference: Price, current: Price) -> Decimal {
        let change = current.pct_change_from(reference);
        match self {
            Side::Long => change,
            Side::Short => -change,
        }
    }

    /// Level `pct` percent away from `price` in this side's favor
    /// (above for Long, below for Short).
    pub fn favorable_level(&self, price: Price, pct: Decimal) -> Result<Price, DomainError> {
        match self {
            Side::Long => price.scaled_by_pct(pct),
            Side::Short => price.scaled_by_pct(-pct),
        }
    }

    /// Level `pct` percent away from `price` against this side
    /// (below for Long, above for Short).
    pub fn adverse_level(&self, price: Price, pct: Decimal) -> Result<Price, DomainError> {
        match self {
            Side::Long => price.scaled_by_pct(-pct),
            Side::Short => price.scaled_by_pct(pct),
        }
    }

    /// True when `a` is strictly better than `b` for this side
    /// (higher for Long, lower for Short).
    pub fn is_better(&self, a: Price, b: Price) -> bool {
        match self {
            Side::Long => a > b,
            Side::Short => a < b,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

/// OrderSide represents the order direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    /// Buy order
    Buy,
    /// Sell order
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
