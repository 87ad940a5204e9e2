//! Signal Detector
//!
//! Pending-signal state machine:
//!
//! ```text
//! Idle ──detect()──► Pending(Long|Short)
//!                       │ check_confirmation() each cycle
//!                       ├─► Confirmed  (price moved our way, oscillator recovering, trend ok)
//!                       ├─► Expired    (wait_count reached max_swing_wait)
//!                       └─► Cancelled  (trend flipped hard against the signal)
//! ```
//!
//! Confirmation is checked before expiry, so a signal that qualifies on its
//! last allowed cycle confirms. Every resolution returns the detector to Idle
//! and restarts the cooldown clock.
//!
//! The detector is pure: time comes from the snapshot, counters live in the
//! caller-owned `PerformanceMetrics`.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use swing_domain::{MarketSnapshot, PerformanceMetrics, Side, Signal};
use tracing::{debug, info, warn};

use crate::analyzer::is_pullback_to_ema;
use crate::error::{EngineError, EngineResult};

/// Oscillator improvement (points) that counts as recovering toward neutral
/// even when still beyond the neutral band.
const OSCILLATOR_RECOVERY_STEP: Decimal = dec!(5);

// =============================================================================
// Detector Configuration
// =============================================================================

/// Thresholds for raising and confirming signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Oscillator below this raises a long signal
    pub oversold: Decimal,
    /// Oscillator above this raises a short signal
    pub overbought: Decimal,
    /// Long confirmation: oscillator recovered above this
    pub neutral_low: Decimal,
    /// Short confirmation: oscillator recovered below this
    pub neutral_high: Decimal,
    /// Require a pullback into the EMA zone before raising a signal
    pub pullback_ema_touch: bool,
    /// Long signals skip the pullback gate below this oscillator level
    pub pullback_bypass_low: Decimal,
    /// Short signals skip the pullback gate above this oscillator level
    pub pullback_bypass_high: Decimal,
    /// Favorable move (%) from the trigger price required to confirm
    pub confirmation_threshold_pct: Decimal,
    /// Confirmation checks before a signal expires
    pub max_swing_wait: u32,
    /// Cooldown after a signal resolves, in seconds
    pub min_signal_interval_secs: i64,
    /// Trading pause once this many losses happen in a row
    pub max_consecutive_losses: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            oversold: dec!(30),
            overbought: dec!(70),
            neutral_low: dec!(35),
            neutral_high: dec!(65),
            pullback_ema_touch: true,
            pullback_bypass_low: dec!(25),
            pullback_bypass_high: dec!(85),
            confirmation_threshold_pct: dec!(0.3),
            max_swing_wait: 6,
            min_signal_interval_secs: 7200,
            max_consecutive_losses: 3,
        }
    }
}

impl DetectorConfig {
    /// Validate threshold ordering.
    pub fn validate(&self) -> EngineResult<()> {
        if self.oversold >= self.overbought {
            return Err(EngineError::InvalidConfig(format!(
                "Oversold ({}) must be below overbought ({})",
                self.oversold, self.overbought
            )));
        }
        if self.neutral_low >= self.neutral_high {
            return Err(EngineError::InvalidConfig(format!(
                "Neutral low ({}) must be below neutral high ({})",
                self.neutral_low, self.neutral_high
            )));
        }
        if self.max_swing_wait == 0 {
            return Err(EngineError::InvalidConfig("max_swing_wait must be at least 1".to_string()));
        }
        if self.confirmation_threshold_pct < Decimal::ZERO || self.min_signal_interval_secs < 0 {
            return Err(EngineError::InvalidConfig(
                "Confirmation threshold and signal interval must be non-negative".to_string(),
            ));
        }
        Ok(())
    }

    fn cooldown(&self) -> Duration {
        Duration::seconds(self.min_signal_interval_secs)
    }
}

// =============================================================================
// Outcome
// =============================================================================

/// Result of a confirmation check.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalOutcome {
    /// No signal pending
    Idle,
    /// Still waiting
    Pending {
        /// Checks performed so far
        wait_count: u32,
    },
    /// Signal confirmed; the caller should open a position
    Confirmed(Signal),
    /// Signal timed out
    Expired(Signal),
    /// Trend flipped against the signal
    Cancelled(Signal),
}

impl SignalOutcome {
    /// Whether the detector returned to Idle because of this outcome.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            SignalOutcome::Confirmed(_) | SignalOutcome::Expired(_) | SignalOutcome::Cancelled(_)
        )
    }
}

// =============================================================================
// Signal Detector
// =============================================================================

/// Owns the single pending signal and the cooldown clock.
#[derive(Debug, Clone)]
pub struct SignalDetector {
    config: DetectorConfig,
    signal: Option<Signal>,
    last_signal_time: Option<DateTime<Utc>>,
    previous_oscillator: Option<Decimal>,
}

impl SignalDetector {
    /// Create an idle detector.
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            signal: None,
            last_signal_time: None,
            previous_oscillator: None,
        }
    }

    /// Restore persisted detector state.
    pub fn restore(
        &mut self,
        signal: Option<Signal>,
        last_signal_time: Option<DateTime<Utc>>,
        previous_oscillator: Option<Decimal>,
    ) {
        self.signal = signal;
        self.last_signal_time = last_signal_time;
        self.previous_oscillator = previous_oscillator;
    }

    /// The pending signal, if any.
    pub fn pending(&self) -> Option<&Signal> {
        self.signal.as_ref()
    }

    /// When the last signal resolved.
    pub fn last_signal_time(&self) -> Option<DateTime<Utc>> {
        self.last_signal_time
    }

    /// Oscillator seen on the previous cycle.
    pub fn previous_oscillator(&self) -> Option<Decimal> {
        self.previous_oscillator
    }

    /// Detector configuration.
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Remember this cycle's oscillator for the next confirmation check.
    pub fn observe(&mut self, snapshot: &MarketSnapshot) {
        self.previous_oscillator = Some(snapshot.oscillator);
    }

    /// Put a confirmed signal back after its position failed to open.
    ///
    /// Keeps `wait_count` so the signal still expires on schedule.
    pub fn reinstate(&mut self, mut signal: Signal) {
        signal.open_attempts += 1;
        warn!(
            direction = %signal.direction,
            trigger_price = %signal.trigger_price,
            open_attempts = signal.open_attempts,
            "Position open failed, signal reinstated"
        );
        self.signal = Some(signal);
    }

    /// Try to raise a new signal.
    ///
    /// No-op when a position is open, a signal is pending, the cooldown has
    /// not elapsed, or trading is paused after too many losses in a row.
    pub fn detect(
        &mut self,
        snapshot: &MarketSnapshot,
        in_position: bool,
        metrics: &mut PerformanceMetrics,
    ) -> bool {
        if in_position || self.signal.is_some() {
            return false;
        }

        if let Some(last) = self.last_signal_time {
            if snapshot.timestamp - last < self.config.cooldown() {
                debug!(last_signal_time = %last, "Signal cooldown active");
                return false;
            }
        }

        if metrics.consecutive_losses >= self.config.max_consecutive_losses {
            warn!(
                consecutive_losses = metrics.consecutive_losses,
                max = self.config.max_consecutive_losses,
                "Trading paused after consecutive losses"
            );
            return false;
        }

        let Some(direction) = self.candidate_direction(snapshot) else {
            return false;
        };

        let signal = Signal::new(
            direction,
            snapshot.price,
            snapshot.oscillator,
            snapshot.timestamp,
        );
        metrics.signals_detected += 1;

        info!(
            %direction,
            price = %snapshot.price,
            oscillator = %snapshot.oscillator.round_dp(2),
            trend = %snapshot.trend,
            "Signal detected"
        );

        self.signal = Some(signal);
        true
    }

    /// Advance the pending signal by one cycle.
    pub fn check_confirmation(
        &mut self,
        snapshot: &MarketSnapshot,
        metrics: &mut PerformanceMetrics,
    ) -> SignalOutcome {
        let Some(mut signal) = self.signal.take() else {
            return SignalOutcome::Idle;
        };

        signal.wait_count += 1;

        let direction = signal.direction;
        let wait_count = signal.wait_count;
        let move_pct = signal.favorable_move_pct(snapshot.price);
        let price_ok = move_pct >= self.config.confirmation_threshold_pct;
        let oscillator_ok = self.oscillator_recovering(direction, snapshot.oscillator);
        let trend_against = snapshot.trend.is_hard_against(direction);

        if price_ok && oscillator_ok && !trend_against {
            self.last_signal_time = Some(snapshot.timestamp);
            if signal.open_attempts == 0 {
                metrics.signals_confirmed += 1;
            }
            info!(
                %direction,
                move_pct = %move_pct.round_dp(2),
                oscillator = %snapshot.oscillator.round_dp(2),
                wait_count,
                "Signal confirmed"
            );
            return SignalOutcome::Confirmed(signal);
        }

        if wait_count >= self.config.max_swing_wait {
            self.last_signal_time = Some(snapshot.timestamp);
            metrics.signals_expired += 1;
            warn!(%direction, wait_count, "Signal expired");
            return SignalOutcome::Expired(signal);
        }

        if trend_against {
            self.last_signal_time = Some(snapshot.timestamp);
            metrics.signals_expired += 1;
            warn!(%direction, trend = %snapshot.trend, "Signal cancelled by trend reversal");
            return SignalOutcome::Cancelled(signal);
        }

        debug!(%direction, wait_count, move_pct = %move_pct.round_dp(2), "Signal pending");
        self.signal = Some(signal);
        SignalOutcome::Pending { wait_count }
    }

    fn candidate_direction(&self, snapshot: &MarketSnapshot) -> Option<Side> {
        let osc = snapshot.oscillator;

        let side = if osc < self.config.oversold {
            Side::Long
        } else if osc > self.config.overbought {
            Side::Short
        } else {
            return None;
        };

        if !snapshot.trend.permits_entry(side) {
            debug!(%side, trend = %snapshot.trend, "Trend blocks signal");
            return None;
        }

        let bypass = match side {
            Side::Long => osc < self.config.pullback_bypass_low,
            Side::Short => osc > self.config.pullback_bypass_high,
        };
        let pullback = is_pullback_to_ema(
            snapshot.price.as_decimal(),
            snapshot.ema_fast,
            snapshot.ema_slow,
        );

        if pullback || !self.config.pullback_ema_touch || bypass {
            Some(side)
        } else {
            debug!(%side, "No pullback to EMA, signal skipped");
            None
        }
    }

    fn oscillator_recovering(&self, direction: Side, oscillator: Decimal) -> bool {
        match direction {
            Side::Long => {
                oscillator > self.config.neutral_low
                    || self
                        .previous_oscillator
                        .is_some_and(|prev| oscillator > prev + OSCILLATOR_RECOVERY_STEP)
            }
            Side::Short => {
                oscillator < self.config.neutral_high
                    || self
                        .previous_oscillator
                        .is_some_and(|prev| oscillator < prev - OSCILLATOR_RECOVERY_STEP)
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
