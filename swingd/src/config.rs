//! Daemon configuration.
//!
//! Loads configuration from `SWING_*` environment variables (and an optional
//! `.env` file) with defaults matching the live strategy.

use crate::error::{DaemonError, DaemonResult};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use swing_domain::{Symbol, TrailingParams, DEFAULT_MIN_HOLDING_QTY};
use swing_engine::{AnalyzerConfig, DetectorConfig, RiskConfig, SizingParams};

// =============================================================================
// Configuration
// =============================================================================

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment (test, development, production)
    pub environment: Environment,
    /// Exchange connection
    pub exchange: ExchangeConfig,
    /// Indicator periods
    pub analyzer: AnalyzerConfig,
    /// Signal thresholds
    pub detector: DetectorConfig,
    /// Exit thresholds and trailing stop
    pub risk: RiskConfig,
    /// Sizing and fixed protection levels
    pub position: PositionConfig,
    /// State, recovery log and trade journal locations
    pub persistence: PersistenceConfig,
    /// Decision loop cadence
    pub schedule: ScheduleConfig,
}

/// Exchange connection settings.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    /// Traded pair (e.g. BTCUSDT)
    pub symbol: String,
    /// Candle interval (e.g. 4h)
    pub interval: String,
    /// Candles fetched per cycle
    pub candle_lookback: usize,
    /// Use the spot testnet
    pub testnet: bool,
    /// Per-call timeout
    pub request_timeout_secs: u64,
    /// Base-asset balances at or below this are dust, not holdings
    pub min_holding_qty: Decimal,
    /// API key
    pub api_key: Option<String>,
    /// API secret
    pub api_secret: Option<String>,
}

/// Position sizing and fixed protection levels.
#[derive(Debug, Clone)]
pub struct PositionConfig {
    /// Balance-percentage sizing
    pub sizing: SizingParams,
    /// Stop loss distance from entry (%)
    pub stop_loss_pct: Decimal,
    /// Take profit distance from entry (%)
    pub take_profit_pct: Decimal,
}

/// Persistence locations.
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    /// Directory holding every file below
    pub data_dir: PathBuf,
    /// State snapshot file name
    pub state_file: String,
    /// Recovery log file name
    pub recovery_log: String,
    /// Trade journal file name
    pub trade_journal: String,
    /// Snapshots older than this are ignored at startup
    pub max_state_age_hours: i64,
}

/// Decision loop cadence.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Seconds between cycles
    pub check_interval_secs: u64,
    /// Persist at least every N cycles
    pub persist_every: u64,
    /// Log the performance summary every N cycles
    pub summary_every: u64,
}

/// Environment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Test environment (uses stubs)
    Test,
    /// Development environment
    Development,
    /// Production environment
    Production,
}

impl ExchangeConfig {
    /// Parsed trading pair.
    pub fn symbol(&self) -> DaemonResult<Symbol> {
        Ok(Symbol::from_pair(&self.symbol)?)
    }

    /// Per-call timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl PersistenceConfig {
    /// State snapshot path.
    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join(&self.state_file)
    }

    /// Recovery log path.
    pub fn recovery_log_path(&self) -> PathBuf {
        self.data_dir.join(&self.recovery_log)
    }

    /// Trade journal path.
    pub fn trade_journal_path(&self) -> PathBuf {
        self.data_dir.join(&self.trade_journal)
    }

    /// Staleness window.
    pub fn max_state_age(&self) -> chrono::Duration {
        chrono::Duration::hours(self.max_state_age_hours)
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> DaemonResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        let environment = Self::load_environment()?;
        let config = Self {
            environment,
            exchange: Self::load_exchange_config()?,
            analyzer: Self::load_analyzer_config()?,
            detector: Self::load_detector_config()?,
            risk: Self::load_risk_config()?,
            position: Self::load_position_config()?,
            persistence: Self::load_persistence_config()?,
            schedule: Self::load_schedule_config()?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create test configuration.
    pub fn test() -> Self {
        Self {
            environment: Environment::Test,
            schedule: ScheduleConfig {
                check_interval_secs: 1,
                persist_every: 3,
                summary_every: 9,
            },
            ..Self::default()
        }
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> DaemonResult<()> {
        let leverage = self.position.sizing.leverage;
        if leverage < Decimal::ONE || leverage > dec!(125) {
            return Err(DaemonError::Config(format!(
                "Leverage must be between 1 and 125, got {}",
                leverage
            )));
        }

        let size_pct = self.position.sizing.position_size_pct;
        if size_pct <= Decimal::ZERO || size_pct > Decimal::ONE_HUNDRED {
            return Err(DaemonError::Config(format!(
                "Position size must be in (0, 100]%, got {}",
                size_pct
            )));
        }

        let trailing = &self.risk.trailing;
        for (name, pct) in [
            ("Stop loss", self.position.stop_loss_pct),
            ("Take profit", self.position.take_profit_pct),
            ("Breakeven buffer", trailing.breakeven_buffer_pct),
            ("Trailing distance", trailing.trailing_distance_pct),
        ] {
            // Any level priced at 100% or more away from entry is zero or negative
            if pct <= Decimal::ZERO || pct >= Decimal::ONE_HUNDRED {
                return Err(DaemonError::Config(format!(
                    "{} percentage must be in (0, 100), got {}",
                    name, pct
                )));
            }
        }

        if self.risk.trailing.breakeven_threshold_pct <= Decimal::ZERO {
            return Err(DaemonError::Config(
                "Breakeven threshold must be positive".to_string(),
            ));
        }

        self.detector
            .validate()
            .map_err(|e| DaemonError::Config(e.to_string()))?;
        self.analyzer
            .validate()
            .map_err(|e| DaemonError::Config(e.to_string()))?;
        self.exchange.symbol()?;

        if self.exchange.min_holding_qty < Decimal::ZERO {
            return Err(DaemonError::Config(
                "Minimum holding quantity cannot be negative".to_string(),
            ));
        }

        if self.schedule.check_interval_secs == 0
            || self.schedule.persist_every == 0
            || self.schedule.summary_every == 0
        {
            return Err(DaemonError::Config(
                "Check interval and cycle cadences must be at least 1".to_string(),
            ));
        }

        if self.environment != Environment::Test
            && (self.exchange.api_key.is_none() || self.exchange.api_secret.is_none())
        {
            return Err(DaemonError::Config(
                "BINANCE_API_KEY and BINANCE_API_SECRET are required outside the test environment"
                    .to_string(),
            ));
        }

        Ok(())
    }

    fn load_environment() -> DaemonResult<Environment> {
        let env_str = env::var("SWING_ENV").unwrap_or_else(|_| "development".to_string());

        match env_str.to_lowercase().as_str() {
            "test" => Ok(Environment::Test),
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(DaemonError::Config(format!(
                "Invalid SWING_ENV: {}. Expected: test, development, production",
                other
            ))),
        }
    }

    fn load_exchange_config() -> DaemonResult<ExchangeConfig> {
        let defaults = ExchangeConfig::default();
        Ok(ExchangeConfig {
            symbol: Self::load_env("SWING_SYMBOL", defaults.symbol)?,
            interval: Self::load_env("SWING_INTERVAL", defaults.interval)?,
            candle_lookback: Self::load_env("SWING_CANDLE_LOOKBACK", defaults.candle_lookback)?,
            testnet: Self::load_bool_env("SWING_TESTNET", defaults.testnet)?,
            request_timeout_secs: Self::load_env(
                "SWING_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            )?,
            min_holding_qty: Self::load_env("SWING_MIN_HOLDING_QTY", defaults.min_holding_qty)?,
            api_key: env::var("BINANCE_API_KEY").ok().filter(|v| !v.is_empty()),
            api_secret: env::var("BINANCE_API_SECRET").ok().filter(|v| !v.is_empty()),
        })
    }

    fn load_analyzer_config() -> DaemonResult<AnalyzerConfig> {
        let defaults = AnalyzerConfig::default();
        Ok(AnalyzerConfig {
            rsi_period: Self::load_env("SWING_RSI_PERIOD", defaults.rsi_period)?,
            ema_fast_period: Self::load_env("SWING_EMA_FAST", defaults.ema_fast_period)?,
            ema_slow_period: Self::load_env("SWING_EMA_SLOW", defaults.ema_slow_period)?,
            ema_trend_period: Self::load_env("SWING_EMA_TREND", defaults.ema_trend_period)?,
            ema_separation_min: Self::load_env(
                "SWING_EMA_SEPARATION_MIN",
                defaults.ema_separation_min,
            )?,
        })
    }

    fn load_detector_config() -> DaemonResult<DetectorConfig> {
        let defaults = DetectorConfig::default();
        Ok(DetectorConfig {
            oversold: Self::load_env("SWING_RSI_OVERSOLD", defaults.oversold)?,
            overbought: Self::load_env("SWING_RSI_OVERBOUGHT", defaults.overbought)?,
            neutral_low: Self::load_env("SWING_RSI_NEUTRAL_LOW", defaults.neutral_low)?,
            neutral_high: Self::load_env("SWING_RSI_NEUTRAL_HIGH", defaults.neutral_high)?,
            pullback_ema_touch: Self::load_bool_env(
                "SWING_PULLBACK_EMA_TOUCH",
                defaults.pullback_ema_touch,
            )?,
            pullback_bypass_low: Self::load_env(
                "SWING_PULLBACK_BYPASS_LOW",
                defaults.pullback_bypass_low,
            )?,
            pullback_bypass_high: Self::load_env(
                "SWING_PULLBACK_BYPASS_HIGH",
                defaults.pullback_bypass_high,
            )?,
            confirmation_threshold_pct: Self::load_env(
                "SWING_CONFIRMATION_THRESHOLD_PCT",
                defaults.confirmation_threshold_pct,
            )?,
            max_swing_wait: Self::load_env("SWING_MAX_SWING_WAIT", defaults.max_swing_wait)?,
            min_signal_interval_secs: Self::load_env(
                "SWING_MIN_SIGNAL_INTERVAL_SECS",
                defaults.min_signal_interval_secs,
            )?,
            max_consecutive_losses: Self::load_env(
                "SWING_MAX_CONSECUTIVE_LOSSES",
                defaults.max_consecutive_losses,
            )?,
        })
    }

    fn load_risk_config() -> DaemonResult<RiskConfig> {
        let defaults = RiskConfig::default();
        Ok(RiskConfig {
            trailing: TrailingParams {
                breakeven_threshold_pct: Self::load_env(
                    "SWING_BREAKEVEN_THRESHOLD_PCT",
                    defaults.trailing.breakeven_threshold_pct,
                )?,
                breakeven_buffer_pct: Self::load_env(
                    "SWING_BREAKEVEN_BUFFER_PCT",
                    defaults.trailing.breakeven_buffer_pct,
                )?,
                trailing_distance_pct: Self::load_env(
                    "SWING_TRAILING_DISTANCE_PCT",
                    defaults.trailing.trailing_distance_pct,
                )?,
            },
            ..defaults
        })
    }

    fn load_position_config() -> DaemonResult<PositionConfig> {
        let defaults = PositionConfig::default();
        Ok(PositionConfig {
            sizing: SizingParams {
                position_size_pct: Self::load_env(
                    "SWING_POSITION_SIZE_PCT",
                    defaults.sizing.position_size_pct,
                )?,
                leverage: Self::load_env("SWING_LEVERAGE", defaults.sizing.leverage)?,
                min_balance: Self::load_env("SWING_MIN_BALANCE", defaults.sizing.min_balance)?,
                min_notional: Self::load_env("SWING_MIN_NOTIONAL", defaults.sizing.min_notional)?,
                lot_precision: Self::load_env("SWING_LOT_PRECISION", defaults.sizing.lot_precision)?,
            },
            stop_loss_pct: Self::load_env("SWING_STOP_LOSS_PCT", defaults.stop_loss_pct)?,
            take_profit_pct: Self::load_env("SWING_TAKE_PROFIT_PCT", defaults.take_profit_pct)?,
        })
    }

    fn load_persistence_config() -> DaemonResult<PersistenceConfig> {
        let defaults = PersistenceConfig::default();
        Ok(PersistenceConfig {
            data_dir: Self::load_env("SWING_DATA_DIR", defaults.data_dir)?,
            state_file: Self::load_env("SWING_STATE_FILE", defaults.state_file)?,
            recovery_log: Self::load_env("SWING_RECOVERY_LOG", defaults.recovery_log)?,
            trade_journal: Self::load_env("SWING_TRADE_JOURNAL", defaults.trade_journal)?,
            max_state_age_hours: Self::load_env(
                "SWING_STATE_MAX_AGE_HOURS",
                defaults.max_state_age_hours,
            )?,
        })
    }

    fn load_schedule_config() -> DaemonResult<ScheduleConfig> {
        let defaults = ScheduleConfig::default();
        Ok(ScheduleConfig {
            check_interval_secs: Self::load_env(
                "SWING_CHECK_INTERVAL_SECS",
                defaults.check_interval_secs,
            )?,
            persist_every: Self::load_env("SWING_PERSIST_EVERY", defaults.persist_every)?,
            summary_every: Self::load_env("SWING_SUMMARY_EVERY", defaults.summary_every)?,
        })
    }

    fn load_env<T: FromStr>(key: &str, default: T) -> DaemonResult<T> {
        match env::var(key) {
            Ok(val) => T::from_str(val.trim())
                .map_err(|_| DaemonError::Config(format!("Invalid {} value: {}", key, val))),
            Err(_) => Ok(default),
        }
    }

    fn load_bool_env(key: &str, default: bool) -> DaemonResult<bool> {
        match env::var(key) {
            Ok(val) => match val.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                _ => Err(DaemonError::Config(format!("Invalid {} value: {}", key, val))),
            },
            Err(_) => Ok(default),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            exchange: ExchangeConfig::default(),
            analyzer: AnalyzerConfig::default(),
            detector: DetectorConfig::default(),
            risk: RiskConfig::default(),
            position: PositionConfig::default(),
            persistence: PersistenceConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            interval: "4h".to_string(),
            candle_lookback: 250,
            testnet: true,
            request_timeout_secs: 10,
            min_holding_qty: DEFAULT_MIN_HOLDING_QTY,
            api_key: None,
            api_secret: None,
        }
    }
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            sizing: SizingParams::default(),
            stop_loss_pct: dec!(3),
            take_profit_pct: dec!(6),
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            state_file: "swing_state.json".to_string(),
            recovery_log: "recovery.log".to_string(),
            trade_journal: "trades.csv".to_string(),
            max_state_age_hours: 48,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 1200,
            persist_every: 3,
            summary_every: 9,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Test => write!(f, "test"),
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.exchange.symbol, "BTCUSDT");
        assert_eq!(config.exchange.interval, "4h");
        assert_eq!(config.schedule.check_interval_secs, 1200);
        assert_eq!(
            config.persistence.state_path(),
            PathBuf::from("data").join("swing_state.json")
        );
    }

    #[test]
    fn test_strategy_defaults() {
        let config = Config::default();

        assert_eq!(config.detector.oversold, dec!(30));
        assert_eq!(config.detector.max_swing_wait, 6);
        assert_eq!(config.detector.pullback_bypass_low, dec!(25));
        assert_eq!(config.detector.pullback_bypass_high, dec!(85));
        assert_eq!(config.position.stop_loss_pct, dec!(3));
        assert_eq!(config.position.take_profit_pct, dec!(6));
        assert_eq!(config.risk.trailing.breakeven_threshold_pct, dec!(1.5));
        assert_eq!(config.persistence.max_state_age(), chrono::Duration::hours(48));
    }

    #[test]
    fn test_test_config_validates_without_credentials() {
        let config = Config::test();

        assert_eq!(config.environment, Environment::Test);
        config.validate().unwrap();
    }

    #[test]
    fn test_credentials_required_outside_test() {
        let config = Config::default();
        assert!(matches!(config.validate(), Err(DaemonError::Config(_))));

        let mut config = Config::default();
        config.exchange.api_key = Some("key".to_string());
        config.exchange.api_secret = Some("secret".to_string());
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::test();
        config.position.sizing.leverage = dec!(200);
        assert!(config.validate().is_err());

        let mut config = Config::test();
        config.position.sizing.position_size_pct = Decimal::ZERO;
        assert!(config.validate().is_err());

        let mut config = Config::test();
        config.detector.oversold = dec!(80);
        assert!(config.validate().is_err());

        let mut config = Config::test();
        config.detector.max_swing_wait = 0;
        assert!(config.validate().is_err());

        let mut config = Config::test();
        config.position.take_profit_pct = Decimal::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_levels_at_or_past_zero() {
        let mut config = Config::test();
        config.position.stop_loss_pct = dec!(150);
        assert!(matches!(config.validate(), Err(DaemonError::Config(_))));

        let mut config = Config::test();
        config.position.take_profit_pct = dec!(100);
        assert!(config.validate().is_err());

        let mut config = Config::test();
        config.risk.trailing.breakeven_buffer_pct = Decimal::ZERO;
        assert!(config.validate().is_err());

        let mut config = Config::test();
        config.risk.trailing.trailing_distance_pct = dec!(120);
        assert!(config.validate().is_err());

        let mut config = Config::test();
        config.position.stop_loss_pct = dec!(99.9);
        config.risk.trailing.trailing_distance_pct = dec!(0.5);
        config.validate().unwrap();
    }

    #[test]
    fn test_load_env_parses_and_rejects() {
        env::set_var("SWING_TEST_ONLY_DECIMAL", "2.5");
        let value: Decimal = Config::load_env("SWING_TEST_ONLY_DECIMAL", dec!(1)).unwrap();
        assert_eq!(value, dec!(2.5));

        env::set_var("SWING_TEST_ONLY_BAD", "abc");
        assert!(Config::load_env::<u32>("SWING_TEST_ONLY_BAD", 1).is_err());

        let missing: u64 = Config::load_env("SWING_TEST_ONLY_MISSING", 7).unwrap();
        assert_eq!(missing, 7);
    }

    #[test]
    fn test_environment_display() {
        assert_eq!(Environment::Test.to_string(), "test");
        assert_eq!(Environment::Development.to_string(), "development");
        assert_eq!(Environment::Production.to_string(), "production");
    }
}
