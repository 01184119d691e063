//! Quantity and price calculations for a DCA purchase.

use rust_decimal::Decimal;

use crate::config::Config;
use crate::error::PurchaseError;
use crate::trading::{OrderRequest, OrderType};

/// Decimal places Kraken accepts for base volume.
pub const VOLUME_DECIMALS: u32 = 8;

/// Error fragments that mark a rejection as worth retrying later.
pub const TRANSIENT_ERRORS: &[&str] = &["cancel_only mode", "EService:Unavailable", "EService:Busy"];

/// Static purchase parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseParams {
    /// Kraken pair symbol.
    pub pair: String,
    /// Quote amount to invest.
    pub invest_amount: Decimal,
    /// Exchange minimum volume.
    pub min_volume: Decimal,
    /// Order type to place.
    pub order_type: OrderType,
    /// Fraction below the ask for limit orders.
    pub limit_price_offset: Decimal,
    /// Limit price precision.
    pub price_decimals: u32,
}

impl PurchaseParams {
    /// Extract purchase parameters from config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            pair: config.trading_pair.clone(),
            invest_amount: config.invest_amount,
            min_volume: config.min_volume,
            order_type: config.order_type,
            limit_price_offset: config.limit_price_offset,
            price_decimals: config.price_decimals,
        }
    }
}

/// An order computed from the current ask.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchasePlan {
    /// Ask price the plan was computed from.
    pub ask_price: Decimal,
    /// Volume to buy.
    pub quantity: Decimal,
    /// Order to submit.
    pub order: OrderRequest,
}

impl PurchasePlan {
    /// Limit price, if this is a limit order.
    pub fn limit_price(&self) -> Option<Decimal> {
        self.order.price
    }
}

/// Convert a quote amount into a base volume.
///
/// Fails with `InsufficientAmount` when the amount cannot pay for the
/// minimum volume, and with `BelowMinVolume` when rounding to 8 decimals
/// pushes the volume under the minimum.
pub fn compute_quantity(
    invest_amount: Decimal,
    ask_price: Decimal,
    min_volume: Decimal,
) -> Result<Decimal, PurchaseError> {
    if ask_price <= Decimal::ZERO {
        return Err(PurchaseError::Malformed(format!(
            "non-positive ask price {}",
            ask_price
        )));
    }

    let min_invest = min_volume * ask_price;
    if invest_amount < min_invest {
        return Err(PurchaseError::InsufficientAmount {
            invest_amount,
            min_invest,
        });
    }

    let quantity = (invest_amount / ask_price).round_dp(VOLUME_DECIMALS);
    if quantity < min_volume {
        return Err(PurchaseError::BelowMinVolume {
            quantity,
            min_volume,
        });
    }

    Ok(quantity)
}

/// Limit price just under the ask, rounded to `decimals` places.
pub fn limit_price(ask_price: Decimal, offset: Decimal, decimals: u32) -> Decimal {
    (ask_price * (Decimal::ONE - offset)).round_dp(decimals)
}

/// Build the order for the current ask.
pub fn plan_purchase(
    params: &PurchaseParams,
    ask_price: Decimal,
) -> Result<PurchasePlan, PurchaseError> {
    let quantity = compute_quantity(params.invest_amount, ask_price, params.min_volume)?;

    let order = match params.order_type {
        OrderType::Market => OrderRequest::market_buy(&params.pair, quantity),
        OrderType::Limit => {
            let price = limit_price(ask_price, params.limit_price_offset, params.price_decimals);
            OrderRequest::post_only_buy(&params.pair, quantity, price)
        }
    };

    Ok(PurchasePlan {
        ask_price,
        quantity,
        order,
    })
}

/// Whether any of the exchange errors is a known transient condition.
pub fn is_transient(errors: &[String]) -> bool {
    errors
        .iter()
        .any(|e| TRANSIENT_ERRORS.iter().any(|marker| e.contains(marker)))
}
