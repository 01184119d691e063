//! Plain-text notification layouts.

use chrono::{DateTime, Local};

use super::Notification;
use crate::config::Config;
use crate::purchase::PurchaseOutcome;

/// Subject for a completed purchase.
pub const SUBJECT_SUCCESS: &str = "DCA-KRAKEN";
/// Subject for a failed purchase.
pub const SUBJECT_FAILURE: &str = "DCA-KRAKEN - Purchase status";
/// Subject for an unexpected fault.
pub const SUBJECT_FAULT: &str = "DCA-KRAKEN - General error";

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Formats outcomes into emails, labelling amounts with the configured assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFormatter {
    base_asset: String,
    quote_asset: String,
}

impl MessageFormatter {
    /// Create a formatter with explicit asset labels.
    pub fn new(base_asset: impl Into<String>, quote_asset: impl Into<String>) -> Self {
        Self {
            base_asset: base_asset.into(),
            quote_asset: quote_asset.into(),
        }
    }

    /// Create a formatter from config.
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.base_asset, &config.quote_asset)
    }

    /// Email for a terminal purchase outcome. Dry runs produce none.
    pub fn outcome(&self, outcome: &PurchaseOutcome) -> Option<Notification> {
        match outcome {
            PurchaseOutcome::Success {
                pair,
                txid,
                ask_price,
                details: Some(details),
                at,
                ..
            } => {
                let total = outcome.total_cost().unwrap_or_default().round_dp(2);
                let body = format!(
                    "Purchase completed:\n\
                     Pair: {pair}\n\
                     Order type: {order_type}\n\
                     Quantity bought: {qty:.8} {base}\n\
                     Unit price: {price:.2} {quote}\n\
                     Total invested: {total:.2} {quote}\n\
                     Fee: {fee:.2} {quote}\n\
                     Status: {status}\n\
                     TXID: {txid}\n\
                     Date: {date}",
                    order_type = details.order_type,
                    qty = details.reported_volume().round_dp(8),
                    base = self.base_asset,
                    price = ask_price.round_dp(2),
                    quote = self.quote_asset,
                    fee = details.fee.round_dp(2),
                    status = details.status,
                    date = timestamp(at),
                );
                Some(Notification::new(SUBJECT_SUCCESS, body))
            }
            PurchaseOutcome::Success {
                pair,
                txid,
                details: None,
                at,
                ..
            } => {
                let body = format!(
                    "Purchase completed:\n\
                     Pair: {pair}\n\
                     TXID: {txid}\n\
                     Order details could not be retrieved.\n\
                     Date: {}",
                    timestamp(at)
                );
                Some(Notification::new(SUBJECT_SUCCESS, body))
            }
            PurchaseOutcome::Failed {
                pair,
                invest_amount,
                ask_price,
                error,
                attempts,
                at,
            } => {
                let price = match ask_price {
                    Some(p) => format!("{:.2} {}", p.round_dp(2), self.quote_asset),
                    None => "unavailable".to_string(),
                };
                let body = format!(
                    "PURCHASE ERROR\n\n\
                     Pair: {pair}\n\
                     Attempted amount: {amount:.2} {quote}\n\
                     Estimated unit price: {price}\n\
                     Error: {error}\n\
                     Attempts: {attempts}\n\
                     Date: {date}",
                    amount = invest_amount.round_dp(2),
                    quote = self.quote_asset,
                    date = timestamp(at),
                );
                Some(Notification::new(SUBJECT_FAILURE, body))
            }
            PurchaseOutcome::DryRun { .. } => None,
        }
    }

    /// Email for a fault that escaped the purchase flow.
    pub fn fault(&self, error: &str, at: DateTime<Local>) -> Notification {
        let body = format!(
            "GENERAL BOT ERROR\n\nError: {error}\nDate: {}",
            timestamp(&at)
        );
        Notification::new(SUBJECT_FAULT, body)
    }
}

fn timestamp(at: &DateTime<Local>) -> String {
    at.format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PurchaseError;
    use crate::exchange::OrderDetails;
    use crate::trading::{OrderRequest, OrderStatus};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
    }

    fn formatter() -> MessageFormatter {
        MessageFormatter::new("BTC", "EUR")
    }

    #[test]
    fn success_layout() {
        let outcome = PurchaseOutcome::Success {
            pair: "XXBTZEUR".to_string(),
            txid: "OABC-123".to_string(),
            order: OrderRequest::post_only_buy("XXBTZEUR", dec!(0.0007332), dec!(49950.0)),
            ask_price: dec!(50000),
            details: Some(OrderDetails {
                txid: "OABC-123".to_string(),
                status: OrderStatus::Closed,
                order_type: "limit".to_string(),
                volume: dec!(0.0007332),
                executed_volume: dec!(0.0007332),
                cost: dec!(36.62),
                fee: dec!(0.0952),
                average_price: dec!(49950),
            }),
            attempts: 1,
            at: at(),
        };

        let email = formatter().outcome(&outcome).unwrap();

        assert_eq!(email.subject, SUBJECT_SUCCESS);
        assert_eq!(
            email.body,
            "Purchase completed:\n\
             Pair: XXBTZEUR\n\
             Order type: limit\n\
             Quantity bought: 0.00073320 BTC\n\
             Unit price: 50000.00 EUR\n\
             Total invested: 36.62 EUR\n\
             Fee: 0.10 EUR\n\
             Status: closed\n\
             TXID: OABC-123\n\
             Date: 2024-03-01 09:30:00"
        );
    }

    #[test]
    fn amounts_are_rounded_not_truncated() {
        let outcome = PurchaseOutcome::Failed {
            pair: "XXBTZEUR".to_string(),
            invest_amount: dec!(36.666),
            ask_price: Some(dec!(50000.999)),
            error: PurchaseError::Malformed("x".to_string()),
            attempts: 1,
            at: at(),
        };

        let email = formatter().outcome(&outcome).unwrap();

        assert!(email.body.contains("Attempted amount: 36.67 EUR"));
        assert!(email.body.contains("Estimated unit price: 50001.00 EUR"));
    }

    #[test]
    fn success_without_details_shows_txid() {
        let outcome = PurchaseOutcome::Success {
            pair: "XXBTZEUR".to_string(),
            txid: "OABC-123".to_string(),
            order: OrderRequest::market_buy("XXBTZEUR", dec!(0.0007332)),
            ask_price: dec!(50000),
            details: None,
            attempts: 3,
            at: at(),
        };

        let email = formatter().outcome(&outcome).unwrap();

        assert_eq!(email.subject, SUBJECT_SUCCESS);
        assert!(email.body.contains("TXID: OABC-123"));
        assert!(email.body.contains("could not be retrieved"));
    }

    #[test]
    fn failure_layout() {
        let outcome = PurchaseOutcome::Failed {
            pair: "XXBTZEUR".to_string(),
            invest_amount: dec!(1),
            ask_price: Some(dec!(50000)),
            error: PurchaseError::InsufficientAmount {
                invest_amount: dec!(1),
                min_invest: dec!(2.5),
            },
            attempts: 0,
            at: at(),
        };

        let email = formatter().outcome(&outcome).unwrap();

        assert_eq!(email.subject, SUBJECT_FAILURE);
        assert_eq!(
            email.body,
            "PURCHASE ERROR\n\n\
             Pair: XXBTZEUR\n\
             Attempted amount: 1.00 EUR\n\
             Estimated unit price: 50000.00 EUR\n\
             Error: insufficient amount: minimum for this pair is 2.50, got 1.00\n\
             Attempts: 0\n\
             Date: 2024-03-01 09:30:00"
        );
    }

    #[test]
    fn dry_run_sends_nothing() {
        let outcome = PurchaseOutcome::DryRun {
            order: OrderRequest::market_buy("XXBTZEUR", dec!(0.001)),
            ask_price: dec!(50000),
            at: at(),
        };
        assert_eq!(formatter().outcome(&outcome), None);
    }

    #[test]
    fn fault_layout() {
        let email = formatter().fault("exchange error: boom", at());
        assert_eq!(email.subject, SUBJECT_FAULT);
        assert_eq!(
            email.body,
            "GENERAL BOT ERROR\n\nError: exchange error: boom\nDate: 2024-03-01 09:30:00"
        );
    }
}
