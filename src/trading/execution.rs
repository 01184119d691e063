//! Order settlement polling.

use tracing::{debug, info, instrument, warn};

use crate::exchange::{Exchange, OrderDetails, QueryOrderResult};
use crate::scheduler::{RetryPolicy, Sleeper};

/// Poll `QueryOrders` until the order shows up or attempts run out.
///
/// Query rejections and transport failures count as a missed attempt.
/// Waits `policy.interval` between attempts, never after the last one.
#[instrument(skip_all, fields(txid = %txid))]
pub async fn poll_order_details(
    exchange: &dyn Exchange,
    sleeper: &dyn Sleeper,
    txid: &str,
    policy: RetryPolicy,
) -> Option<OrderDetails> {
    for attempt in 1..=policy.max_attempts {
        match exchange.query_order(txid).await {
            Ok(QueryOrderResult::Found(details)) => {
                info!(
                    attempt,
                    status = %details.status,
                    filled = details.status.is_filled(),
                    order_type = %details.order_type,
                    "Order details retrieved"
                );
                return Some(details);
            }
            Ok(QueryOrderResult::NotFound) => {
                debug!(attempt, max = policy.max_attempts, "Order not visible yet");
            }
            Ok(QueryOrderResult::Rejected(errors)) => {
                warn!(attempt, ?errors, "Order query rejected");
            }
            Err(e) => {
                warn!(attempt, error = %e, "Order query failed");
            }
        }

        if policy.has_next(attempt) {
            sleeper.sleep(policy.interval).await;
        }
    }

    warn!(
        attempts = policy.max_attempts,
        "No order details after exhausting attempts"
    );
    None
}
