//! Trading module for order construction and settlement.
//!
//! This module handles:
//! - Order types and form encoding
//! - Polling for order settlement details

pub mod execution;
pub mod order;

pub use execution::poll_order_details;
pub use order::{OrderFlag, OrderRequest, OrderStatus, OrderType, Side};
