//! Typed Kraken REST responses.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::trading::OrderStatus;

/// Kraken response envelope: `{"error": [...], "result": ...}`.
#[derive(Debug, Clone, Deserialize)]
pub struct KrakenResponse<T> {
    /// Error strings; empty on success.
    #[serde(default)]
    pub error: Vec<String>,
    /// Payload, absent on error.
    pub result: Option<T>,
}

/// One entry of the public Ticker result.
#[derive(Debug, Clone, Deserialize)]
pub struct TickerEntry {
    /// Ask `[price, whole lot volume, lot volume]`.
    pub a: Vec<Decimal>,
    /// Bid `[price, whole lot volume, lot volume]`.
    #[serde(default)]
    pub b: Vec<Decimal>,
    /// Last trade `[price, lot volume]`.
    #[serde(default)]
    pub c: Vec<Decimal>,
}

/// Current ticker for a pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticker {
    /// Pair key as returned by Kraken.
    pub pair: String,
    /// Best ask.
    pub ask: Decimal,
    /// Best bid.
    pub bid: Option<Decimal>,
    /// Last trade price.
    pub last: Option<Decimal>,
}

/// `AddOrder` result payload.
#[derive(Debug, Clone, Deserialize)]
pub struct AddOrderPayload {
    /// Order description.
    pub descr: Option<AddOrderDescription>,
    /// Transaction IDs.
    #[serde(default)]
    pub txid: Vec<String>,
}

/// `AddOrder` description block.
#[derive(Debug, Clone, Deserialize)]
pub struct AddOrderDescription {
    /// Human-readable order summary.
    pub order: Option<String>,
}

/// Outcome of an order submission.
#[derive(Debug, Clone, PartialEq)]
pub enum AddOrderResult {
    /// Accepted with exactly one transaction ID.
    Placed {
        /// Transaction ID.
        txid: String,
        /// Kraken's order summary, if provided.
        description: Option<String>,
    },
    /// Rejected with a non-empty error list.
    Rejected(Vec<String>),
}

/// One order as returned by `QueryOrders`.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderInfo {
    /// Order status.
    pub status: OrderStatus,
    /// Ordered volume.
    #[serde(default)]
    pub vol: Decimal,
    /// Executed volume.
    #[serde(default)]
    pub vol_exec: Decimal,
    /// Total cost in quote currency.
    #[serde(default)]
    pub cost: Decimal,
    /// Total fee in quote currency.
    #[serde(default)]
    pub fee: Decimal,
    /// Average execution price.
    #[serde(default)]
    pub price: Decimal,
    /// Order description.
    #[serde(default)]
    pub descr: OrderInfoDescription,
}

/// `QueryOrders` description block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderInfoDescription {
    /// Pair.
    pub pair: Option<String>,
    /// Side.
    #[serde(rename = "type")]
    pub side: Option<String>,
    /// Order type.
    pub ordertype: Option<String>,
}

/// Settlement details of a submitted order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDetails {
    /// Transaction ID.
    pub txid: String,
    /// Order status.
    pub status: OrderStatus,
    /// Order type reported by the exchange.
    pub order_type: String,
    /// Ordered volume.
    pub volume: Decimal,
    /// Executed volume.
    pub executed_volume: Decimal,
    /// Total cost.
    pub cost: Decimal,
    /// Total fee.
    pub fee: Decimal,
    /// Average execution price.
    pub average_price: Decimal,
}

impl OrderDetails {
    /// Build from a `QueryOrders` entry.
    pub fn from_info(txid: impl Into<String>, info: OrderInfo) -> Self {
        Self {
            txid: txid.into(),
            status: info.status,
            order_type: info
                .descr
                .ordertype
                .unwrap_or_else(|| "unknown".to_string()),
            volume: info.vol,
            executed_volume: info.vol_exec,
            cost: info.cost,
            fee: info.fee,
            average_price: info.price,
        }
    }

    /// Volume to report: executed if anything executed, ordered otherwise.
    pub fn reported_volume(&self) -> Decimal {
        if self.executed_volume > Decimal::ZERO {
            self.executed_volume
        } else {
            self.volume
        }
    }
}

/// Outcome of an order query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOrderResult {
    /// The order is known to the exchange.
    Found(OrderDetails),
    /// The exchange does not (yet) report the order.
    NotFound,
    /// The query itself was rejected.
    Rejected(Vec<String>),
}

/// `QueryOrders` result payload.
pub type QueryOrdersPayload = HashMap<String, OrderInfo>;

/// Ticker result payload.
pub type TickerPayload = HashMap<String, TickerEntry>;
