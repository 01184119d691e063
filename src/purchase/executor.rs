//! Purchase orchestration: compute, submit, retry, settle.

use chrono::Local;
use rust_decimal::Decimal;
use strum::Display;
use tracing::{debug, error, info, instrument, warn};

use super::calculator::{is_transient, plan_purchase, PurchaseParams};
use super::outcome::PurchaseOutcome;
use crate::config::Config;
use crate::error::{ExchangeError, PurchaseError, Result};
use crate::exchange::{AddOrderResult, Exchange};
use crate::metrics;
use crate::scheduler::{RetryPolicy, Sleeper};
use crate::trading::poll_order_details;

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PurchaseState {
    /// Not started.
    Idle,
    /// Fetching the ask and computing the order.
    Computing,
    /// Order sent, waiting for the exchange.
    Submitting,
    /// Waiting out a transient rejection.
    Retrying,
    /// Order accepted.
    Success,
    /// Gave up.
    Failed,
}

/// Drives one purchase from price lookup to a terminal outcome.
#[derive(Debug)]
pub struct PurchaseExecutor {
    params: PurchaseParams,
    submit_policy: RetryPolicy,
    poll_policy: RetryPolicy,
    dry_run: bool,
    state: PurchaseState,
}

impl PurchaseExecutor {
    /// Create a new executor from config.
    pub fn new(config: &Config) -> Self {
        Self::with_params(
            PurchaseParams::from_config(config),
            config.submit_policy(),
            config.poll_policy(),
        )
    }

    /// Create an executor from explicit parameters.
    pub fn with_params(
        params: PurchaseParams,
        submit_policy: RetryPolicy,
        poll_policy: RetryPolicy,
    ) -> Self {
        Self {
            params,
            submit_policy,
            poll_policy,
            dry_run: false,
            state: PurchaseState::Idle,
        }
    }

    /// Compute the order but never submit it.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Current state.
    pub fn state(&self) -> PurchaseState {
        self.state
    }

    fn transition(&mut self, next: PurchaseState) {
        debug!(from = %self.state, to = %next, "Purchase state transition");
        self.state = next;
    }

    /// Run the purchase to a terminal outcome.
    ///
    /// Rejections and validation failures end in `PurchaseOutcome::Failed`.
    /// Transport and ticker failures are returned as errors and are never
    /// retried.
    #[instrument(skip_all, fields(pair = %self.params.pair, invest = %self.params.invest_amount))]
    pub async fn execute(
        &mut self,
        exchange: &dyn Exchange,
        sleeper: &dyn Sleeper,
    ) -> Result<PurchaseOutcome> {
        let mut submissions: u32 = 0;
        debug!(
            max_attempts = self.submit_policy.max_attempts,
            max_wait_secs = self.submit_policy.max_wait().as_secs(),
            "Starting purchase"
        );

        loop {
            self.transition(PurchaseState::Computing);
            let ask_price = exchange.ask_price(&self.params.pair).await?;
            info!(ask = %ask_price, "Fetched ask price");

            let plan = match plan_purchase(&self.params, ask_price) {
                Ok(plan) => plan,
                Err(e) => return Ok(self.fail(e, Some(ask_price), submissions)),
            };

            info!(
                quantity = %plan.quantity,
                order_type = %plan.order.order_type,
                limit_price = ?plan.limit_price(),
                "Computed order"
            );

            if self.dry_run {
                info!("DRY RUN - order not submitted");
                self.transition(PurchaseState::Success);
                return Ok(PurchaseOutcome::DryRun {
                    order: plan.order,
                    ask_price,
                    at: Local::now(),
                });
            }

            self.transition(PurchaseState::Submitting);
            submissions += 1;
            metrics::inc_order_attempts();

            let rejection = match exchange.add_order(&plan.order).await {
                Ok(AddOrderResult::Placed { txid, .. }) => {
                    metrics::inc_orders_placed();
                    info!(txid = %txid, attempt = submissions, "Order placed");

                    let details =
                        poll_order_details(exchange, sleeper, &txid, self.poll_policy).await;
                    self.transition(PurchaseState::Success);

                    return Ok(PurchaseOutcome::Success {
                        pair: self.params.pair.clone(),
                        txid,
                        order: plan.order,
                        ask_price,
                        details,
                        attempts: submissions,
                        at: Local::now(),
                    });
                }
                Ok(AddOrderResult::Rejected(errors)) => PurchaseError::Rejected {
                    transient: is_transient(&errors),
                    errors,
                },
                Err(ExchangeError::MalformedResponse { reason, .. }) => {
                    PurchaseError::Malformed(reason)
                }
                Err(e) => return Err(e.into()),
            };

            if rejection.is_transient() && self.submit_policy.has_next(submissions) {
                self.transition(PurchaseState::Retrying);
                metrics::inc_order_retries();
                warn!(
                    error = %rejection,
                    attempt = submissions,
                    max_attempts = self.submit_policy.max_attempts,
                    retry_in_secs = self.submit_policy.interval.as_secs(),
                    "Transient rejection, retrying later"
                );
                sleeper.sleep(self.submit_policy.interval).await;
                continue;
            }

            return Ok(self.fail(rejection, Some(ask_price), submissions));
        }
    }

    fn fail(
        &mut self,
        error: PurchaseError,
        ask_price: Option<Decimal>,
        attempts: u32,
    ) -> PurchaseOutcome {
        self.transition(PurchaseState::Failed);
        metrics::inc_orders_failed();
        error!(error = %error, attempts, "Purchase failed");

        PurchaseOutcome::Failed {
            pair: self.params.pair.clone(),
            invest_amount: self.params.invest_amount,
            ask_price,
            error,
            attempts,
            at: Local::now(),
        }
    }
}
