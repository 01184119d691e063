//! Exchange module for the Kraken REST API.
//!
//! This module handles:
//! - Typed endpoint responses
//! - The authenticated Kraken client
//! - Mock exchange for testing

pub mod client;
pub mod mock;
pub mod types;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::ExchangeError;
use crate::trading::OrderRequest;

pub use client::KrakenClient;
pub use mock::{MockCall, MockExchange};
pub use types::{AddOrderResult, OrderDetails, QueryOrderResult, Ticker};

/// Operations the purchase flow needs from an exchange.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Current ticker for `pair` (unauthenticated).
    async fn ticker(&self, pair: &str) -> Result<Ticker, ExchangeError>;

    /// Best ask for `pair`.
    async fn ask_price(&self, pair: &str) -> Result<Decimal, ExchangeError> {
        Ok(self.ticker(pair).await?.ask)
    }

    /// Submit an order.
    async fn add_order(&self, order: &OrderRequest) -> Result<AddOrderResult, ExchangeError>;

    /// Query a single order by transaction ID.
    async fn query_order(&self, txid: &str) -> Result<QueryOrderResult, ExchangeError>;
}
