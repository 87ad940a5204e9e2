//! Binance REST API Client for Spot Trading
//!
//! Provides REST API integration for:
//! - Account balances
//! - Kline (candle) history and last price
//! - Market orders
//! - Authentication via HMAC SHA256 signatures
//!
//! # Authentication
//!
//! Binance uses API key + secret with HMAC SHA256 signatures.
//! All signed requests require:
//! - `X-MBX-APIKEY` header
//! - `signature` query parameter (HMAC SHA256 of query string)
//! - `timestamp` query parameter

use chrono::{TimeZone, Utc};
use reqwest::{Client, Method};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::debug;

use swing_domain::{Candle, OrderSide, Price};

// =============================================================================
// Constants
// =============================================================================

/// Binance REST API base URL (Spot)
const BINANCE_API_URL: &str = "https://api.binance.com";

/// Binance spot testnet base URL
const BINANCE_TESTNET_URL: &str = "https://testnet.binance.vision";

/// Default request timeout in seconds
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Kline intervals accepted by Binance.
pub const VALID_INTERVALS: &[&str] = &[
    "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "8h", "12h", "1d", "3d", "1w", "1M",
];

/// Largest kline page Binance serves.
pub const MAX_KLINE_LIMIT: usize = 1000;

// =============================================================================
// Errors
// =============================================================================

/// Errors that can occur in the Binance REST client.
#[derive(Debug, Clone, Error)]
pub enum BinanceRestError {
    /// Failed to build request signature
    #[error("Failed to build signature: {0}")]
    SignatureError(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// API returned error
    #[error("Binance API error: {code} - {msg}")]
    ApiError {
        /// Binance error code
        code: i64,
        /// Binance error message
        msg: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Request timed out
    #[error("Request timed out")]
    Timeout,

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

// =============================================================================
// Binance REST Client
// =============================================================================

/// Binance REST API client for spot trading.
pub struct BinanceRestClient {
    /// HTTP client
    client: Client,
    /// API key
    api_key: String,
    /// API secret
    api_secret: String,
    /// Use testnet
    testnet: bool,
    /// Per-request timeout
    request_timeout: Duration,
}

impl BinanceRestClient {
    /// Create a new Binance REST client.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Binance API key
    /// * `api_secret` - Binance API secret
    pub fn new(api_key: String, api_secret: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_secret,
            testnet: false,
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }

    /// Create a client for the spot testnet.
    pub fn testnet(api_key: String, api_secret: String) -> Self {
        Self {
            testnet: true,
            ..Self::new(api_key, api_secret)
        }
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Get the base URL for API requests.
    fn base_url(&self) -> &str {
        if self.testnet {
            BINANCE_TESTNET_URL
        } else {
            BINANCE_API_URL
        }
    }

    /// Build query string with signature for signed requests.
    ///
    /// Binance requires:
    /// 1. All parameters in query string
    /// 2. HMAC SHA256 signature of query string
    /// 3. signature and timestamp as query parameters
    fn build_signed_query(&self, mut params: Vec<(&str, String)>) -> Result<String, BinanceRestError> {
        let timestamp = Utc::now().timestamp_millis().to_string();
        params.push(("timestamp", timestamp));

        // Sort parameters (deterministic signature input)
        params.sort_by(|a, b| a.0.cmp(b.0));

        let query_string = encode_query(&params);
        let signature = sign(&self.api_secret, &query_string)?;

        Ok(format!("{}&signature={}", query_string, signature))
    }

    /// Send a request and return the body of a successful response.
    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        params: Vec<(&str, String)>,
        signed: bool,
    ) -> Result<String, BinanceRestError> {
        let query = if signed {
            self.build_signed_query(params)?
        } else {
            encode_query(&params)
        };

        let url = if query.is_empty() {
            format!("{}{}", self.base_url(), endpoint)
        } else {
            format!("{}{}?{}", self.base_url(), endpoint, query)
        };

        debug!(%method, endpoint, signed, "Binance request");

        let mut request = self.client.request(method, &url);
        if signed {
            request = request.header("X-MBX-APIKEY", &self.api_key);
        }

        let response = timeout(self.request_timeout, request.send())
            .await
            .map_err(|_| BinanceRestError::Timeout)?
            .map_err(|e| BinanceRestError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| BinanceRestError::ParseError(e.to_string()))?;

        if !status.is_success() {
            // Try to parse Binance error response
            if let Ok(err) = serde_json::from_str::<BinanceErrorResponse>(&body) {
                return Err(BinanceRestError::ApiError { code: err.code, msg: err.msg });
            }
            return Err(BinanceRestError::RequestFailed(format!("HTTP {}: {}", status, body)));
        }

        Ok(body)
    }

    // =========================================================================
    // Account API
    // =========================================================================

    /// Get spot account information.
    ///
    /// # Endpoint
    ///
    /// `GET /api/v3/account` (signed)
    pub async fn get_account(&self) -> Result<SpotAccount, BinanceRestError> {
        let body = self.send(Method::GET, "/api/v3/account", vec![], true).await?;
        parse_json(&body)
    }

    // =========================================================================
    // Market Data API
    // =========================================================================

    /// Get the most recent `limit` klines, oldest first.
    ///
    /// # Endpoint
    ///
    /// `GET /api/v3/klines`
    pub async fn get_klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, BinanceRestError> {
        if !VALID_INTERVALS.contains(&interval) {
            return Err(BinanceRestError::InvalidParameter(format!(
                "Unsupported kline interval: {}",
                interval
            )));
        }
        if limit == 0 || limit > MAX_KLINE_LIMIT {
            return Err(BinanceRestError::InvalidParameter(format!(
                "Kline limit must be 1..={}, got {}",
                MAX_KLINE_LIMIT, limit
            )));
        }

        let params = vec![
            ("symbol", symbol.to_string()),
            ("interval", interval.to_string()),
            ("limit", limit.to_string()),
        ];
        let body = self.send(Method::GET, "/api/v3/klines", params, false).await?;

        parse_klines(&body)
    }

    /// Get current price for a symbol.
    ///
    /// Uses public endpoint, no signature required.
    pub async fn get_price(&self, symbol: &str) -> Result<Price, BinanceRestError> {
        let params = vec![("symbol", symbol.to_string())];
        let body = self.send(Method::GET, "/api/v3/ticker/price", params, false).await?;

        let response: PriceResponse = parse_json(&body)?;

        Price::new(response.price)
            .map_err(|e| BinanceRestError::ParseError(format!("Invalid price in response: {}", e)))
    }

    // =========================================================================
    // Order API
    // =========================================================================

    /// Place a spot market order.
    ///
    /// # Endpoint
    ///
    /// `POST /api/v3/order` (signed)
    pub async fn place_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
    ) -> Result<BinanceOrderResponse, BinanceRestError> {
        let params = vec![
            ("symbol", symbol.to_string()),
            ("side", side.to_string()),
            ("type", "MARKET".to_string()),
            ("quantity", quantity.normalize().to_string()),
            ("newOrderRespType", "RESULT".to_string()),
        ];

        let body = self.send(Method::POST, "/api/v3/order", params, true).await?;
        parse_json(&body)
    }

    /// Ping Binance API to check connectivity.
    ///
    /// Uses public endpoint, no authentication required.
    pub async fn ping(&self) -> Result<(), BinanceRestError> {
        let body = self.send(Method::GET, "/api/v3/ping", vec![], false).await?;

        // Ping returns empty JSON object {}
        if body.trim() == "{}" {
            Ok(())
        } else {
            Err(BinanceRestError::ParseError(format!("Unexpected ping response: {}", body)))
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn encode_query(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// HMAC SHA256 of `payload` keyed by `secret`, hex encoded.
fn sign(secret: &str, payload: &str) -> Result<String, BinanceRestError> {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| BinanceRestError::SignatureError(format!("HMAC error: {}", e)))?;
    mac.update(payload.as_bytes());

    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn parse_json<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, BinanceRestError> {
    serde_json::from_str(body).map_err(|e| BinanceRestError::ParseError(e.to_string()))
}

/// Parse the kline array-of-arrays payload.
///
/// Each row: `[openTime, open, high, low, close, volume, closeTime, ...]`
/// with prices as strings and times in epoch milliseconds.
fn parse_klines(body: &str) -> Result<Vec<Candle>, BinanceRestError> {
    let rows: Vec<Vec<Value>> = parse_json(body)?;

    rows.iter()
        .map(|row| {
            if row.len() < 7 {
                return Err(BinanceRestError::ParseError(format!(
                    "Kline row has {} fields, expected at least 7",
                    row.len()
                )));
            }
            Ok(Candle {
                open: decimal_field(&row[1])?,
                high: decimal_field(&row[2])?,
                low: decimal_field(&row[3])?,
                close: decimal_field(&row[4])?,
                volume: decimal_field(&row[5])?,
                open_time: millis_field(&row[0])?,
                close_time: millis_field(&row[6])?,
            })
        })
        .collect()
}

fn decimal_field(value: &Value) -> Result<Decimal, BinanceRestError> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => {
            return Err(BinanceRestError::ParseError(format!("Expected decimal, got {}", other)))
        }
    };
    text.parse::<Decimal>()
        .map_err(|e| BinanceRestError::ParseError(format!("Invalid decimal {}: {}", text, e)))
}

fn millis_field(value: &Value) -> Result<chrono::DateTime<Utc>, BinanceRestError> {
    let millis = value
        .as_i64()
        .ok_or_else(|| BinanceRestError::ParseError(format!("Expected epoch millis, got {}", value)))?;
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| BinanceRestError::ParseError(format!("Timestamp out of range: {}", millis)))
}

// =============================================================================
// Binance Types (from API responses)
// =============================================================================

/// Binance error response.
#[derive(Debug, Deserialize)]
struct BinanceErrorResponse {
    code: i64,
    msg: String,
}

/// Spot account information.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotAccount {
    /// Balances for every asset the account has touched
    pub balances: Vec<SpotBalance>,
}

impl SpotAccount {
    /// Balance entry for `asset`, if present.
    pub fn balance(&self, asset: &str) -> Option<&SpotBalance> {
        self.balances.iter().find(|b| b.asset == asset)
    }
}

/// Balance of one asset.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotBalance {
    /// Asset symbol (e.g., "BTC", "USDT")
    pub asset: String,
    /// Free amount
    pub free: Decimal,
    /// Locked amount (open orders)
    pub locked: Decimal,
}

impl SpotBalance {
    /// Free plus locked.
    pub fn total(&self) -> Decimal {
        self.free + self.locked
    }
}

/// Binance order response (`newOrderRespType=RESULT`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinanceOrderResponse {
    /// Symbol
    pub symbol: String,
    /// Order ID
    pub order_id: u64,
    /// Client order ID
    pub client_order_id: String,
    /// Transaction time
    pub transact_time: i64,
    /// Original quantity
    pub orig_qty: Decimal,
    /// Executed quantity
    pub executed_qty: Decimal,
    /// Cumulative quote quantity (spelling follows the API)
    pub cummulative_quote_qty: Decimal,
    /// Status
    pub status: String,
    /// Side
    pub side: String,
    /// Type
    #[serde(rename = "type")]
    pub order_type: String,
}

impl BinanceOrderResponse {
    /// Average fill price, when anything executed.
    pub fn average_price(&self) -> Option<Price> {
        if self.executed_qty.is_zero() {
            return None;
        }
        Price::new(self.cummulative_quote_qty / self.executed_qty).ok()
    }
}

/// Price ticker response.
#[derive(Debug, Deserialize)]
struct PriceResponse {
    price: Decimal,
}

// =============================================================================
// Tests
// =============================================================================
