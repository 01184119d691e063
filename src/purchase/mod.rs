//! Purchase module for the DCA buy cycle.
//!
//! This module handles:
//! - Investment-to-volume conversion against exchange minimums
//! - The submit/retry state machine
//! - Terminal outcomes handed to the notifier

pub mod calculator;
pub mod executor;
pub mod outcome;

pub use calculator::{compute_quantity, is_transient, limit_price, plan_purchase, PurchaseParams, PurchasePlan};
pub use executor::{PurchaseExecutor, PurchaseState};
pub use outcome::PurchaseOutcome;
