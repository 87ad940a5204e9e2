//! State Reconciler: startup agreement between local state and the exchange.
//!
//! | Local state  | Exchange      | Outcome                                   |
//! |--------------|---------------|-------------------------------------------|
//! | in position  | holds         | `Matched`: keep local state               |
//! | none / flat  | holds         | `Recovered`: synthesize from holdings     |
//! | in position  | flat          | `Cleared`: drop local position            |
//! | none / flat  | flat          | `CleanStart`                              |
//!
//! The reconciled state is always persisted before the decision loop starts.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use swing_domain::{Position, Symbol};
use swing_exec::{ExchangePort, OrderExecutor};
use swing_store::{PersistedState, RecoveryLog, StateStore};

use crate::error::DaemonResult;

/// How startup state was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Local position confirmed by exchange holdings
    Matched,
    /// Position rebuilt from exchange holdings
    Recovered,
    /// Local position dropped; the exchange is flat
    Cleared,
    /// Nothing local, nothing on the exchange
    CleanStart,
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReconcileOutcome::Matched => "matched",
            ReconcileOutcome::Recovered => "recovered",
            ReconcileOutcome::Cleared => "cleared",
            ReconcileOutcome::CleanStart => "clean_start",
        };
        write!(f, "{}", label)
    }
}

/// Reconciled state ready to seed the decision loop.
#[derive(Debug, Clone)]
pub struct Reconciled {
    /// Which case applied
    pub outcome: ReconcileOutcome,
    /// The persisted result
    pub state: PersistedState,
}

/// Loads, reconciles and persists startup state.
pub struct Reconciler<E: ExchangePort + 'static, S: StateStore + 'static> {
    executor: Arc<OrderExecutor<E>>,
    store: Arc<S>,
    recovery_log: Option<RecoveryLog>,
    symbol: Symbol,
    stop_loss_pct: Decimal,
    take_profit_pct: Decimal,
    max_state_age: Duration,
}

impl<E: ExchangePort + 'static, S: StateStore + 'static> Reconciler<E, S> {
    /// Create a reconciler.
    pub fn new(
        executor: Arc<OrderExecutor<E>>,
        store: Arc<S>,
        symbol: Symbol,
        stop_loss_pct: Decimal,
        take_profit_pct: Decimal,
        max_state_age: Duration,
    ) -> Self {
        Self {
            executor,
            store,
            recovery_log: None,
            symbol,
            stop_loss_pct,
            take_profit_pct,
            max_state_age,
        }
    }

    /// Append recovery events to `log`.
    pub fn with_recovery_log(mut self, log: RecoveryLog) -> Self {
        self.recovery_log = Some(log);
        self
    }

    /// Load the freshest usable snapshot, treating unreadable or stale files as absent.
    pub async fn load(&self, now: DateTime<Utc>) -> Option<PersistedState> {
        match self.store.load_fresh(now, self.max_state_age).await {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "Persisted state unusable, starting without it");
                None
            }
        }
    }

    /// Resolve local state against exchange holdings and persist the result.
    ///
    /// Fails when the exchange or the store cannot be reached, or when the
    /// protection percentages cannot produce valid levels.
    pub async fn reconcile(&self, now: DateTime<Utc>) -> DaemonResult<Reconciled> {
        let mut state = self.load(now).await.unwrap_or_default();
        let holdings = self.executor.fetch_open_holdings(&self.symbol).await?;

        if state.in_position && state.position.is_none() {
            warn!("Persisted state flagged in_position without a position, treating as flat");
        }

        let outcome = match (state.position.take(), holdings) {
            (Some(position), Some(holdings)) => {
                if position.side != holdings.side {
                    warn!(
                        local_side = %position.side,
                        exchange_side = %holdings.side,
                        "Exchange holdings side differs from local position"
                    );
                }
                info!(
                    position_id = %position.id,
                    side = %position.side,
                    entry = %position.entry_price,
                    quantity = %position.quantity,
                    exchange_quantity = %holdings.quantity,
                    "Local position matches exchange holdings"
                );
                state.position = Some(position);
                ReconcileOutcome::Matched
            }
            (None, Some(holdings)) => {
                let position =
                    Position::recover(&holdings, self.stop_loss_pct, self.take_profit_pct, now)?;
                warn!(
                    position_id = %position.id,
                    side = %position.side,
                    quantity = %position.quantity,
                    price = %position.entry_price,
                    notional = %holdings.notional().round_dp(2),
                    stop_loss = %position.stop_loss,
                    take_profit = %position.take_profit,
                    "Recovering position from exchange holdings"
                );

                if let Some(log) = &self.recovery_log {
                    if let Err(e) = log.append(&holdings, now).await {
                        warn!(error = %e, path = %log.path().display(), "Recovery log write failed");
                    }
                }

                state.metrics.recoveries_performed += 1;
                state.position = Some(position);
                ReconcileOutcome::Recovered
            }
            (Some(position), None) => {
                error!(
                    position_id = %position.id,
                    side = %position.side,
                    entry = %position.entry_price,
                    quantity = %position.quantity,
                    "Inconsistency: local position not found on exchange, clearing"
                );
                ReconcileOutcome::Cleared
            }
            (None, None) => {
                info!("No local position and no exchange holdings, clean start");
                ReconcileOutcome::CleanStart
            }
        };

        if state.position.is_some() {
            if let Some(signal) = state.signal.take() {
                info!(direction = %signal.direction, "Dropping pending signal, position is open");
            }
        }
        state.in_position = state.position.is_some();
        state.timestamp = now;

        self.store.save(&state).await?;
        info!(%outcome, in_position = state.in_position, "Startup reconciliation complete");

        Ok(Reconciled { outcome, state })
    }
}

// =============================================================================
// Tests
// =============================================================================
