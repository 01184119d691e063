//! One bot run: gate, lock, purchase, notify, release.

use std::time::Duration;

use chrono::Local;
use tracing::{error, info, instrument, warn};

use crate::config::Config;
use crate::error::Result;
use crate::exchange::Exchange;
use crate::lock::{LockHandle, RunGuard};
use crate::metrics;
use crate::notify::{deliver, MessageFormatter, Notifier};
use crate::purchase::{PurchaseExecutor, PurchaseOutcome};
use crate::scheduler::Sleeper;

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    /// Execution switched off; nothing was done.
    Disabled,
    /// Another run holds the lock; nothing was done.
    AlreadyRunning,
    /// The purchase flow reached a terminal outcome.
    Completed(PurchaseOutcome),
    /// An unexpected error interrupted the flow and was reported.
    Faulted(String),
}

impl RunStatus {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            RunStatus::Disabled => "disabled",
            RunStatus::AlreadyRunning => "already_running",
            RunStatus::Completed(outcome) if outcome.is_success() => "purchased",
            RunStatus::Completed(PurchaseOutcome::DryRun { .. }) => "dry_run",
            RunStatus::Completed(_) => "purchase_failed",
            RunStatus::Faulted(_) => "faulted",
        }
    }
}

/// Wires the purchase flow to its collaborators.
pub struct Runner<'a> {
    config: &'a Config,
    exchange: &'a dyn Exchange,
    sleeper: &'a dyn Sleeper,
    lock: &'a dyn RunGuard,
    notifier: &'a dyn Notifier,
    formatter: MessageFormatter,
    dry_run: bool,
}

impl<'a> Runner<'a> {
    /// Create a new runner.
    pub fn new(
        config: &'a Config,
        exchange: &'a dyn Exchange,
        sleeper: &'a dyn Sleeper,
        lock: &'a dyn RunGuard,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            config,
            exchange,
            sleeper,
            lock,
            notifier,
            formatter: MessageFormatter::from_config(config),
            dry_run: false,
        }
    }

    /// Compute the order without submitting it.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run once.
    ///
    /// Only lock failures are returned as errors. Everything after the lock
    /// is acquired ends in a `RunStatus`, and the lock is released on every
    /// path out.
    #[instrument(skip_all, fields(pair = %self.config.trading_pair, dry_run = self.dry_run))]
    pub async fn run(&self) -> Result<RunStatus> {
        if !self.config.execute_bot {
            info!("Execution disabled (EXECUTE_BOT=false), exiting");
            return Ok(RunStatus::Disabled);
        }

        metrics::inc_runs();

        self.sleeper
            .sleep(Duration::from_secs(self.config.startup_delay_secs))
            .await;

        let Some(handle) = LockHandle::acquire(self.lock)? else {
            warn!("Bot is already running, cancelling this instance");
            return Ok(RunStatus::AlreadyRunning);
        };

        let status = self.purchase().await;

        if let Err(e) = handle.release() {
            warn!(error = %e, "Failed to release run lock");
        }

        info!(status = status.label(), "Run finished");
        Ok(status)
    }

    async fn purchase(&self) -> RunStatus {
        info!(
            invest = %self.config.invest_amount,
            quote = %self.config.quote_asset,
            "Attempting purchase"
        );

        let mut executor = PurchaseExecutor::new(self.config).with_dry_run(self.dry_run);

        match executor.execute(self.exchange, self.sleeper).await {
            Ok(outcome) => {
                if let Some(notification) = self.formatter.outcome(&outcome) {
                    deliver(self.notifier, &notification).await;
                }
                RunStatus::Completed(outcome)
            }
            Err(e) => {
                error!(error = %e, "Run faulted");
                let notification = self.formatter.fault(&e.to_string(), Local::now());
                deliver(self.notifier, &notification).await;
                RunStatus::Faulted(e.to_string())
            }
        }
    }
}
