//! Order types and creation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy order.
    #[strum(serialize = "buy", serialize = "BUY")]
    Buy,
}

impl Side {
    /// Kraken `type` field value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
        }
    }
}

/// Order type as sent in Kraken's `ordertype` field.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OrderType {
    /// Market order: executes immediately at the best available price.
    #[serde(alias = "MARKET", alias = "Market")]
    Market,
    /// Post-only limit order priced just under the ask.
    #[default]
    #[serde(alias = "LIMIT", alias = "Limit")]
    Limit,
}

impl OrderType {
    /// Kraken `ordertype` field value.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "market",
            OrderType::Limit => "limit",
        }
    }
}

/// Order flags (`oflags`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum OrderFlag {
    /// Post-only: rejected instead of taking liquidity.
    #[strum(serialize = "post")]
    Post,
}

/// Order status as reported by `QueryOrders`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order pending book entry.
    #[strum(serialize = "pending")]
    Pending,
    /// Open order.
    #[strum(serialize = "open")]
    Open,
    /// Closed (filled) order.
    #[strum(serialize = "closed")]
    Closed,
    /// Order canceled.
    #[strum(serialize = "canceled", serialize = "cancelled")]
    Canceled,
    /// Order expired.
    #[strum(serialize = "expired")]
    Expired,
    /// Status string this version does not know about.
    #[serde(other)]
    #[strum(serialize = "unknown")]
    Unknown,
}

impl OrderStatus {
    /// Check if order was filled.
    pub fn is_filled(&self) -> bool {
        matches!(self, OrderStatus::Closed)
    }
}

/// A buy order ready for submission to `AddOrder`.
///
/// The nonce is not part of the request; the client attaches a fresh one
/// every time the order is sent.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    /// Kraken pair symbol.
    pub pair: String,
    /// Order side.
    pub side: Side,
    /// Order type.
    pub order_type: OrderType,
    /// Volume in base units, already rounded to 8 decimals.
    pub volume: Decimal,
    /// Limit price (limit orders only).
    pub price: Option<Decimal>,
    /// Order flags.
    pub flags: Vec<OrderFlag>,
}

impl OrderRequest {
    /// Create a market buy order.
    pub fn market_buy(pair: impl Into<String>, volume: Decimal) -> Self {
        Self {
            pair: pair.into(),
            side: Side::Buy,
            order_type: OrderType::Market,
            volume,
            price: None,
            flags: Vec::new(),
        }
    }

    /// Create a post-only limit buy order.
    pub fn post_only_buy(pair: impl Into<String>, volume: Decimal, price: Decimal) -> Self {
        Self {
            pair: pair.into(),
            side: Side::Buy,
            order_type: OrderType::Limit,
            volume,
            price: Some(price),
            flags: vec![OrderFlag::Post],
        }
    }

    /// Validate order parameters.
    pub fn validate(&self) -> Result<(), String> {
        if self.pair.is_empty() {
            return Err("pair is required".to_string());
        }
        if self.volume <= Decimal::ZERO {
            return Err("volume must be positive".to_string());
        }
        match (self.order_type, self.price) {
            (OrderType::Limit, None) => return Err("limit order requires a price".to_string()),
            (OrderType::Limit, Some(p)) if p <= Decimal::ZERO => {
                return Err("price must be positive".to_string())
            }
            _ => {}
        }
        Ok(())
    }

    /// Form fields for `AddOrder`, in wire order, without the nonce.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("ordertype", self.order_type.as_str().to_string()),
            ("type", self.side.as_str().to_string()),
            ("volume", format!("{:.8}", self.volume)),
            ("pair", self.pair.clone()),
        ];
        if let Some(price) = self.price {
            fields.push(("price", price.normalize().to_string()));
        }
        if !self.flags.is_empty() {
            let flags: Vec<String> = self.flags.iter().map(|f| f.to_string()).collect();
            fields.push(("oflags", flags.join(",")));
        }
        fields
    }
}
