//! Daemon: the decision loop.
//!
//! One cycle at a time, each driven by a fresh `MarketSnapshot`:
//!
//! ```text
//! snapshot ─► [position open]  trailing stop update ─► exit check ─► close?
//!          ─► [no position]    pending signal? confirm / expire / cancel ─► open?
//!                              otherwise try to raise a new signal
//!          ─► persist (after any transition, and every N cycles)
//! ```
//!
//! # Lifecycle
//!
//! 1. Connectivity check (fatal on failure)
//! 2. Reconcile persisted state against exchange holdings
//! 3. Decision loop on a fixed interval
//! 4. Graceful shutdown: close at market, persist, final summary

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use swing_domain::{
    ExitReason, MarketSnapshot, PerformanceMetrics, Position, Price, Signal, Symbol, TradeRecord,
    TrailingStopChange,
};
use swing_engine::{MarketAnalyzer, RiskEvaluator, SignalDetector, SignalOutcome};
use swing_exec::{ExchangePort, MarketDataPort, OrderExecutor};
use swing_store::{PersistedState, RecoveryLog, StateStore, TradeJournal};

use crate::config::Config;
use crate::error::{DaemonError, DaemonResult};
use crate::market_data::MarketFeed;
use crate::position_manager::PositionManager;
use crate::reconciler::{ReconcileOutcome, Reconciler};

// =============================================================================
// Reports
// =============================================================================

/// What happened during one decision cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Cycle number (1-based)
    pub cycle: u64,
    /// Trade closed this cycle
    pub closed: Option<TradeRecord>,
    /// Position opened this cycle
    pub opened: Option<Position>,
    /// Result of checking the pending signal
    pub signal: Option<SignalOutcome>,
    /// A new signal was raised
    pub signal_detected: bool,
    /// State was written to the store
    pub persisted: bool,
}

/// Result of a graceful shutdown.
#[derive(Debug, Clone)]
pub struct ShutdownReport {
    /// Trade closed at shutdown
    pub closed: Option<TradeRecord>,
    /// Final metrics
    pub metrics: PerformanceMetrics,
}

// =============================================================================
// Daemon
// =============================================================================

/// The swing trading daemon.
pub struct Daemon<E, M, S>
where
    E: ExchangePort + 'static,
    M: MarketDataPort + 'static,
    S: StateStore + 'static,
{
    config: Config,
    symbol: Symbol,
    executor: Arc<OrderExecutor<E>>,
    feed: MarketFeed<M>,
    detector: SignalDetector,
    risk: RiskEvaluator,
    positions: PositionManager<E>,
    reconciler: Reconciler<E, S>,
    store: Arc<S>,
    metrics: PerformanceMetrics,
    last_market: Option<MarketSnapshot>,
    cycles: u64,
}

impl<E, M, S> Daemon<E, M, S>
where
    E: ExchangePort + 'static,
    M: MarketDataPort + 'static,
    S: StateStore + 'static,
{
    /// Wire up a daemon over the given exchange, candle source and store.
    pub fn new(config: Config, exchange: Arc<E>, market: Arc<M>, store: Arc<S>) -> DaemonResult<Self> {
        config.validate()?;

        let symbol = config.exchange.symbol()?;
        let executor = Arc::new(OrderExecutor::new(exchange, config.exchange.request_timeout()));

        let feed = MarketFeed::new(
            market,
            MarketAnalyzer::new(config.analyzer.clone()),
            symbol.clone(),
            config.exchange.interval.clone(),
            config.exchange.candle_lookback,
        );

        let positions = PositionManager::new(
            executor.clone(),
            symbol.clone(),
            config.position.clone(),
            Some(TradeJournal::new(config.persistence.trade_journal_path())),
        );

        let reconciler = Reconciler::new(
            executor.clone(),
            store.clone(),
            symbol.clone(),
            config.position.stop_loss_pct,
            config.position.take_profit_pct,
            config.persistence.max_state_age(),
        )
        .with_recovery_log(RecoveryLog::new(config.persistence.recovery_log_path()));

        Ok(Self {
            detector: SignalDetector::new(config.detector.clone()),
            risk: RiskEvaluator::new(config.risk.clone()),
            config,
            symbol,
            executor,
            feed,
            positions,
            reconciler,
            store,
            metrics: PerformanceMetrics::default(),
            last_market: None,
            cycles: 0,
        })
    }

    /// Configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Cumulative metrics.
    pub fn metrics(&self) -> &PerformanceMetrics {
        &self.metrics
    }

    /// The open position.
    pub fn position(&self) -> Option<&Position> {
        self.positions.position()
    }

    /// The pending signal.
    pub fn pending_signal(&self) -> Option<&Signal> {
        self.detector.pending()
    }

    /// Cycles run since start.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Last snapshot processed.
    pub fn last_market(&self) -> Option<&MarketSnapshot> {
        self.last_market.as_ref()
    }

    /// Check connectivity, reconcile, and seed in-memory state.
    ///
    /// Any failure here is fatal.
    pub async fn startup(&mut self) -> DaemonResult<ReconcileOutcome> {
        if let Err(e) = self.executor.health_check().await {
            error!(error = %e, "Exchange connectivity check failed");
            return Err(DaemonError::Startup(format!("exchange unreachable: {}", e)));
        }

        let reconciled = self.reconciler.reconcile(Utc::now()).await?;
        let state = reconciled.state;

        let previous_oscillator = state.last_market.as_ref().map(|m| m.oscillator);
        self.detector
            .restore(state.signal, state.last_signal_time, previous_oscillator);
        self.positions.restore(state.position);
        self.metrics = state.metrics;
        self.last_market = state.last_market;

        info!(
            outcome = %reconciled.outcome,
            in_position = self.positions.is_open(),
            pending_signal = self.detector.pending().is_some(),
            summary = %self.metrics,
            "Daemon state restored"
        );

        Ok(reconciled.outcome)
    }

    /// Run one decision cycle against `snapshot`.
    pub async fn run_cycle(&mut self, snapshot: MarketSnapshot) -> DaemonResult<CycleReport> {
        self.cycles += 1;
        let mut report = CycleReport {
            cycle: self.cycles,
            ..CycleReport::default()
        };
        let mut changed = false;

        // 1. Trailing stop, then exits
        if let Some(position) = self.positions.position_mut() {
            if let Some(update) = self.risk.update_trailing_stop(position, snapshot.price) {
                changed |= update.change != TrailingStopChange::ExtremeOnly;
            }
        }

        let exit = self
            .positions
            .position()
            .and_then(|position| self.risk.evaluate_exit(position, &snapshot));
        if let Some(reason) = exit {
            let trade = self
                .positions
                .close(&reason, snapshot.price, snapshot.timestamp, &mut self.metrics)
                .await?;
            report.closed = Some(trade);
            changed = true;
        }

        // 2. Signals
        if !self.positions.is_open() {
            if self.detector.pending().is_some() {
                let outcome = self.detector.check_confirmation(&snapshot, &mut self.metrics);
                changed |= outcome.is_resolution();

                if let SignalOutcome::Confirmed(signal) = &outcome {
                    match self
                        .positions
                        .open(signal.direction, snapshot.price, snapshot.timestamp)
                        .await
                    {
                        Ok(position) => report.opened = Some(position.clone()),
                        Err(e) => {
                            warn!(
                                error = %e,
                                direction = %signal.direction,
                                price = %snapshot.price,
                                "Position open failed"
                            );
                            self.detector.reinstate(signal.clone());
                        }
                    }
                }
                report.signal = Some(outcome);
            } else if self.detector.detect(&snapshot, false, &mut self.metrics) {
                report.signal_detected = true;
                changed = true;
            }
        }

        debug_assert!(
            !(self.positions.is_open() && self.detector.pending().is_some()),
            "position and pending signal must not coexist"
        );

        self.detector.observe(&snapshot);
        self.last_market = Some(snapshot);

        // 3. Persist and report
        if changed || self.cycles % self.config.schedule.persist_every == 0 {
            self.persist().await?;
            report.persisted = true;
        }

        if self.cycles % self.config.schedule.summary_every == 0 {
            info!(cycle = self.cycles, summary = %self.metrics, "Performance summary");
        }

        Ok(report)
    }

    /// Fetch a snapshot and run one cycle.
    pub async fn tick(&mut self) -> DaemonResult<CycleReport> {
        let snapshot = self.feed.snapshot().await?;
        self.run_cycle(snapshot).await
    }

    /// Current decision state as a persistable snapshot.
    pub fn state(&self) -> PersistedState {
        PersistedState::capture(
            Utc::now(),
            self.positions.position().cloned(),
            self.detector.pending().cloned(),
            self.detector.last_signal_time(),
            self.metrics.clone(),
            self.last_market.clone(),
        )
    }

    /// Write the current state to the store.
    pub async fn persist(&self) -> DaemonResult<()> {
        let state = self.state();
        self.store.save(&state).await?;
        debug!(
            in_position = state.in_position,
            pending_signal = state.signal.is_some(),
            "State persisted"
        );
        Ok(())
    }

    /// Close any open position at market, persist, then log the final summary.
    pub async fn shutdown(&mut self) -> DaemonResult<ShutdownReport> {
        info!("Initiating graceful shutdown");

        let mut closed = None;
        if self.positions.is_open() {
            match self.exit_price().await {
                Some(price) => {
                    let trade = self
                        .positions
                        .close(&ExitReason::Shutdown, price, Utc::now(), &mut self.metrics)
                        .await?;
                    closed = Some(trade);
                }
                None => {
                    error!("No price available, leaving position open for reconciliation");
                }
            }
        }

        self.persist().await?;
        info!(summary = %self.metrics, "Final performance summary");

        Ok(ShutdownReport {
            closed,
            metrics: self.metrics.clone(),
        })
    }

    /// Start up, run cycles until `shutdown` resolves, then shut down gracefully.
    pub async fn run_until<F>(mut self, shutdown: F) -> DaemonResult<ShutdownReport>
    where
        F: Future<Output = ()>,
    {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            environment = %self.config.environment,
            symbol = %self.symbol,
            interval = %self.config.exchange.interval,
            check_interval_secs = self.config.schedule.check_interval_secs,
            "Starting swing daemon"
        );

        self.startup().await?;

        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(
            self.config.schedule.check_interval_secs,
        ));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!("Entering decision loop");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        error!(cycle = self.cycles, error = %e, "Cycle aborted");
                    }
                }

                _ = &mut shutdown => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        self.shutdown().await
    }

    async fn exit_price(&self) -> Option<Price> {
        match self.executor.fetch_last_price(&self.symbol).await {
            Ok(price) => Some(price),
            Err(e) => {
                warn!(symbol = %self.symbol, error = %e, "Last price unavailable, using cached snapshot");
                self.last_market.as_ref().map(|m| m.price)
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
