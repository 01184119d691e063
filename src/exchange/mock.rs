//! Scripted exchange for unit and scenario testing.
//!
//! Responses are queued per endpoint and consumed in order; once a queue
//! runs dry the last configured fallback is returned. Every call is
//! recorded so tests can assert on what was (or was not) sent.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::types::{AddOrderResult, OrderDetails, QueryOrderResult, Ticker};
use super::Exchange;
use crate::error::ExchangeError;
use crate::trading::{OrderRequest, OrderStatus};

/// A call made against the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    /// `ticker(pair)`.
    Ticker(String),
    /// `add_order(order)`.
    AddOrder(OrderRequest),
    /// `query_order(txid)`.
    QueryOrder(String),
}

/// Scripted response for an endpoint; `Err` variants carry a message that
/// is turned into a malformed-response error.
type Scripted<T> = std::result::Result<T, String>;

#[derive(Debug, Default)]
struct MockState {
    ask: Option<Decimal>,
    fail_ticker: bool,
    add_orders: VecDeque<Scripted<AddOrderResult>>,
    queries: VecDeque<QueryOrderResult>,
    calls: Vec<MockCall>,
}

/// Mock exchange for testing.
#[derive(Debug, Clone, Default)]
pub struct MockExchange {
    state: Arc<Mutex<MockState>>,
}

impl MockExchange {
    /// Create a mock quoting `ask` for every pair.
    pub fn new(ask: Decimal) -> Self {
        let mock = Self::default();
        mock.set_ask(ask);
        mock
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut state)
    }

    /// Set the ask price.
    pub fn set_ask(&self, ask: Decimal) {
        self.with_state(|s| s.ask = Some(ask));
    }

    /// Make ticker requests fail.
    pub fn fail_ticker(&self) {
        self.with_state(|s| s.fail_ticker = true);
    }

    /// Queue an accepted order.
    pub fn push_placed(&self, txid: impl Into<String>) -> &Self {
        let result = AddOrderResult::Placed {
            txid: txid.into(),
            description: None,
        };
        self.with_state(|s| s.add_orders.push_back(Ok(result)));
        self
    }

    /// Queue a rejection.
    pub fn push_rejected(&self, error: impl Into<String>) -> &Self {
        let result = AddOrderResult::Rejected(vec![error.into()]);
        self.with_state(|s| s.add_orders.push_back(Ok(result)));
        self
    }

    /// Queue a malformed `AddOrder` response.
    pub fn push_malformed(&self, reason: impl Into<String>) -> &Self {
        let reason = reason.into();
        self.with_state(|s| s.add_orders.push_back(Err(reason)));
        self
    }

    /// Queue an order-query response.
    pub fn push_query(&self, result: QueryOrderResult) -> &Self {
        self.with_state(|s| s.queries.push_back(result));
        self
    }

    /// Queue a found order with the given fee and volume.
    pub fn push_found(&self, txid: &str, volume: Decimal, fee: Decimal) -> &Self {
        self.push_query(QueryOrderResult::Found(OrderDetails {
            txid: txid.to_string(),
            status: OrderStatus::Closed,
            order_type: "limit".to_string(),
            volume,
            executed_volume: volume,
            cost: Decimal::ZERO,
            fee,
            average_price: Decimal::ZERO,
        }))
    }

    /// All recorded calls.
    pub fn calls(&self) -> Vec<MockCall> {
        self.with_state(|s| s.calls.clone())
    }

    /// Orders submitted so far.
    pub fn submitted_orders(&self) -> Vec<OrderRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::AddOrder(order) => Some(order),
                _ => None,
            })
            .collect()
    }

    /// Number of calls of any kind.
    pub fn request_count(&self) -> usize {
        self.with_state(|s| s.calls.len())
    }
}

#[async_trait]
impl Exchange for MockExchange {
    async fn ticker(&self, pair: &str) -> Result<Ticker, ExchangeError> {
        self.with_state(|s| {
            s.calls.push(MockCall::Ticker(pair.to_string()));
            if s.fail_ticker {
                return Err(ExchangeError::MalformedResponse {
                    path: super::client::TICKER_PATH.to_string(),
                    reason: "mock ticker failure".to_string(),
                });
            }
            let ask = s.ask.ok_or_else(|| ExchangeError::UnknownPair {
                pair: pair.to_string(),
            })?;
            Ok(Ticker {
                pair: pair.to_string(),
                ask,
                bid: None,
                last: None,
            })
        })
    }

    async fn add_order(&self, order: &OrderRequest) -> Result<AddOrderResult, ExchangeError> {
        self.with_state(|s| {
            s.calls.push(MockCall::AddOrder(order.clone()));
            match s.add_orders.pop_front() {
                Some(Ok(result)) => Ok(result),
                Some(Err(reason)) => Err(ExchangeError::MalformedResponse {
                    path: super::client::ADD_ORDER_PATH.to_string(),
                    reason,
                }),
                None => Ok(AddOrderResult::Placed {
                    txid: format!("MOCK-{}", s.calls.len()),
                    description: None,
                }),
            }
        })
    }

    async fn query_order(&self, txid: &str) -> Result<QueryOrderResult, ExchangeError> {
        self.with_state(|s| {
            s.calls.push(MockCall::QueryOrder(txid.to_string()));
            Ok(s.queries.pop_front().unwrap_or(QueryOrderResult::NotFound))
        })
    }
}
