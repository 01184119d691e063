//! Terminal results of a purchase run.

use chrono::{DateTime, Local};
use rust_decimal::Decimal;

use crate::error::PurchaseError;
use crate::exchange::OrderDetails;
use crate::trading::OrderRequest;

/// Terminal result of one purchase run.
#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseOutcome {
    /// The exchange accepted the order.
    Success {
        /// Pair bought.
        pair: String,
        /// Transaction ID.
        txid: String,
        /// The submitted order.
        order: OrderRequest,
        /// Ask price at submission.
        ask_price: Decimal,
        /// Settlement details, if the exchange reported them in time.
        details: Option<OrderDetails>,
        /// Submission attempts used.
        attempts: u32,
        /// When the run finished.
        at: DateTime<Local>,
    },
    /// The purchase did not happen.
    Failed {
        /// Pair attempted.
        pair: String,
        /// Quote amount attempted.
        invest_amount: Decimal,
        /// Last ask price seen, if any.
        ask_price: Option<Decimal>,
        /// Why it failed.
        error: PurchaseError,
        /// Submission attempts used.
        attempts: u32,
        /// When the run finished.
        at: DateTime<Local>,
    },
    /// Dry run: the order was computed but not sent.
    DryRun {
        /// Order that would have been submitted.
        order: OrderRequest,
        /// Ask price used.
        ask_price: Decimal,
        /// When the run finished.
        at: DateTime<Local>,
    },
}

impl PurchaseOutcome {
    /// Whether an order was accepted.
    pub fn is_success(&self) -> bool {
        matches!(self, PurchaseOutcome::Success { .. })
    }

    /// Submission attempts used (zero for dry runs).
    pub fn attempts(&self) -> u32 {
        match self {
            PurchaseOutcome::Success { attempts, .. } | PurchaseOutcome::Failed { attempts, .. } => {
                *attempts
            }
            PurchaseOutcome::DryRun { .. } => 0,
        }
    }

    /// Quote-currency total for a success: the exchange's reported cost when
    /// available, otherwise volume times the ask.
    pub fn total_cost(&self) -> Option<Decimal> {
        match self {
            PurchaseOutcome::Success {
                details: Some(details),
                ask_price,
                ..
            } => {
                if details.cost > Decimal::ZERO {
                    Some(details.cost)
                } else {
                    Some(details.reported_volume() * *ask_price)
                }
            }
            PurchaseOutcome::Success {
                order, ask_price, ..
            } => Some(order.volume * *ask_price),
            _ => None,
        }
    }
}
