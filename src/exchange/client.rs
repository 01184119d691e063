//! Kraken REST API client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use super::types::{
    AddOrderPayload, AddOrderResult, KrakenResponse, OrderDetails, QueryOrderResult,
    QueryOrdersPayload, Ticker, TickerPayload,
};
use super::Exchange;
use crate::config::Config;
use crate::error::ExchangeError;
use crate::metrics;
use crate::signing::{self, NonceGenerator};
use crate::trading::OrderRequest;

/// Public ticker endpoint.
pub const TICKER_PATH: &str = "/0/public/Ticker";
/// Order placement endpoint.
pub const ADD_ORDER_PATH: &str = "/0/private/AddOrder";
/// Order query endpoint.
pub const QUERY_ORDERS_PATH: &str = "/0/private/QueryOrders";

/// Kraken REST API client.
#[derive(Debug)]
pub struct KrakenClient {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// Base URL, without trailing slash.
    base_url: String,
    /// API key.
    api_key: String,
    /// API secret (base64).
    api_secret: String,
    /// Nonce source shared by every private request of this client.
    nonces: NonceGenerator,
}

impl KrakenClient {
    /// Create a new Kraken client from config.
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.http_timeout_ms))
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("kraken-dca/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.kraken_api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            nonces: NonceGenerator::new(),
        })
    }

    /// Send an authenticated form-encoded POST.
    ///
    /// A body that is not JSON is turned into a synthetic
    /// `{"error": [...]}` value so every caller handles one shape.
    #[instrument(skip(self, params))]
    pub async fn private_request(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value, ExchangeError> {
        let nonce = self.nonces.next().to_string();

        let postdata = signing::encode_form(
            std::iter::once(("nonce", nonce.as_str()))
                .chain(params.iter().map(|(k, v)| (*k, v.as_str()))),
        );

        let sign_start = Instant::now();
        let signature = signing::sign(path, &nonce, &postdata, &self.api_secret)?;
        metrics::record_signing_latency(sign_start);

        let url = format!("{}{}", self.base_url, path);
        let start = Instant::now();

        let response = self
            .http
            .post(&url)
            .header("API-Key", &self.api_key)
            .header("API-Sign", signature)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded; charset=utf-8")
            .body(postdata)
            .send()
            .await
            .map_err(|source| ExchangeError::Transport {
                path: path.to_string(),
                source,
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| ExchangeError::Transport {
                path: path.to_string(),
                source,
            })?;

        metrics::record_http_latency(start, path);
        debug!(status = %status, body = %body, "Raw exchange response");

        Ok(private_body_to_json(status, &body))
    }

    /// Decode a JSON value into a Kraken envelope.
    fn decode<T: DeserializeOwned>(
        path: &str,
        json: serde_json::Value,
    ) -> Result<KrakenResponse<T>, ExchangeError> {
        serde_json::from_value(json).map_err(|e| ExchangeError::MalformedResponse {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl Exchange for KrakenClient {
    #[instrument(skip(self))]
    async fn ticker(&self, pair: &str) -> Result<Ticker, ExchangeError> {
        let url = format!("{}{}", self.base_url, TICKER_PATH);
        let start = Instant::now();

        let response = self
            .http
            .get(&url)
            .query(&[("pair", pair)])
            .send()
            .await
            .map_err(|source| ExchangeError::Transport {
                path: TICKER_PATH.to_string(),
                source,
            })?;

        let body = response
            .text()
            .await
            .map_err(|source| ExchangeError::Transport {
                path: TICKER_PATH.to_string(),
                source,
            })?;
        metrics::record_http_latency(start, TICKER_PATH);

        let json: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| ExchangeError::MalformedResponse {
                path: TICKER_PATH.to_string(),
                reason: e.to_string(),
            })?;

        let resp: KrakenResponse<TickerPayload> = Self::decode(TICKER_PATH, json)?;
        ticker_from_response(pair, resp)
    }

    #[instrument(skip(self, order), fields(pair = %order.pair, ordertype = %order.order_type))]
    async fn add_order(&self, order: &OrderRequest) -> Result<AddOrderResult, ExchangeError> {
        order.validate().map_err(ExchangeError::InvalidOrder)?;

        debug!(volume = %order.volume, price = ?order.price, "Submitting order");

        let json = self
            .private_request(ADD_ORDER_PATH, &order.form_fields())
            .await?;
        let resp: KrakenResponse<AddOrderPayload> = Self::decode(ADD_ORDER_PATH, json)?;
        let result = add_order_from_response(resp)?;

        if let AddOrderResult::Placed { txid, description } = &result {
            info!(txid = %txid, description = ?description, "Order accepted by exchange");
        }

        Ok(result)
    }

    #[instrument(skip(self))]
    async fn query_order(&self, txid: &str) -> Result<QueryOrderResult, ExchangeError> {
        let json = self
            .private_request(QUERY_ORDERS_PATH, &[("txid", txid.to_string())])
            .await?;
        let resp: KrakenResponse<QueryOrdersPayload> = Self::decode(QUERY_ORDERS_PATH, json)?;
        Ok(query_order_from_response(txid, resp))
    }
}

/// Extract the ticker for `pair` from a Ticker response.
///
/// Kraken may key the result by its canonical pair name (`XXBTZEUR` for a
/// `BTCEUR` request); a single-entry result is accepted under any key.
pub fn ticker_from_response(
    pair: &str,
    resp: KrakenResponse<TickerPayload>,
) -> Result<Ticker, ExchangeError> {
    if !resp.error.is_empty() {
        return Err(ExchangeError::Api {
            path: TICKER_PATH.to_string(),
            errors: resp.error,
        });
    }

    let mut result = resp.result.unwrap_or_default();
    let (key, entry) = match result.remove_entry(pair) {
        Some(found) => found,
        None if result.len() == 1 => result
            .into_iter()
            .next()
            .ok_or_else(|| ExchangeError::UnknownPair {
                pair: pair.to_string(),
            })?,
        None => {
            return Err(ExchangeError::UnknownPair {
                pair: pair.to_string(),
            })
        }
    };

    let ask = entry
        .a
        .first()
        .copied()
        .filter(|p| *p > Decimal::ZERO)
        .ok_or_else(|| ExchangeError::MalformedResponse {
            path: TICKER_PATH.to_string(),
            reason: format!("missing ask price for {}", key),
        })?;

    Ok(Ticker {
        pair: key,
        ask,
        bid: entry.b.first().copied(),
        last: entry.c.first().copied(),
    })
}

/// Parse a private endpoint body.
///
/// A body that is not JSON becomes `{"error": ["EGeneral:Invalid response ..."]}`
/// so callers see it as an ordinary exchange rejection.
pub fn private_body_to_json(status: StatusCode, body: &str) -> serde_json::Value {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => json,
        Err(e) => {
            warn!(status = %status, error = %e, "Exchange response is not JSON");
            serde_json::json!({
                "error": [format!("EGeneral:Invalid response (HTTP {}): {}", status, e)]
            })
        }
    }
}

/// Interpret an `AddOrder` envelope.
///
/// Errors and a transaction ID are mutually exclusive: a response with no
/// errors must carry exactly one txid.
pub fn add_order_from_response(
    resp: KrakenResponse<AddOrderPayload>,
) -> Result<AddOrderResult, ExchangeError> {
    if !resp.error.is_empty() {
        return Ok(AddOrderResult::Rejected(resp.error));
    }

    let payload = resp.result.ok_or_else(|| ExchangeError::MalformedResponse {
        path: ADD_ORDER_PATH.to_string(),
        reason: "no errors and no result".to_string(),
    })?;

    match payload.txid.as_slice() {
        [txid] => Ok(AddOrderResult::Placed {
            txid: txid.clone(),
            description: payload.descr.and_then(|d| d.order),
        }),
        other => Err(ExchangeError::MalformedResponse {
            path: ADD_ORDER_PATH.to_string(),
            reason: format!("expected exactly one txid, got {}", other.len()),
        }),
    }
}

/// Interpret a `QueryOrders` envelope for a single txid.
pub fn query_order_from_response(
    txid: &str,
    resp: KrakenResponse<QueryOrdersPayload>,
) -> QueryOrderResult {
    if !resp.error.is_empty() {
        return QueryOrderResult::Rejected(resp.error);
    }

    match resp.result.and_then(|mut orders| orders.remove(txid)) {
        Some(info) => QueryOrderResult::Found(OrderDetails::from_info(txid, info)),
        None => QueryOrderResult::NotFound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trading::OrderStatus;
    use rust_decimal_macros::dec;

    fn decode<T: DeserializeOwned>(json: serde_json::Value) -> KrakenResponse<T> {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn client_creation_works() {
        let config = Config {
            kraken_api_url: "https://api.kraken.com/".to_string(),
            ..Default::default()
        };
        let client = KrakenClient::new(&config).unwrap();
        assert_eq!(client.base_url, "https://api.kraken.com");
    }

    #[test]
    fn ticker_by_requested_pair() {
        let resp = decode(serde_json::json!({
            "error": [],
            "result": {"XXBTZEUR": {"a": ["50000.0", "1", "1.000"], "b": ["49999.9", "1", "1.000"]}}
        }));
        let ticker = ticker_from_response("XXBTZEUR", resp).unwrap();
        assert_eq!(ticker.ask, dec!(50000));
        assert_eq!(ticker.bid, Some(dec!(49999.9)));
        assert_eq!(ticker.last, None);
    }

    #[test]
    fn ticker_single_entry_under_canonical_name() {
        let resp = decode(serde_json::json!({
            "error": [],
            "result": {"XXBTZEUR": {"a": ["50000.0", "1", "1.000"]}}
        }));
        let ticker = ticker_from_response("BTCEUR", resp).unwrap();
        assert_eq!(ticker.pair, "XXBTZEUR");
    }

    #[test]
    fn ticker_errors() {
        let resp = decode(serde_json::json!({"error": ["EQuery:Unknown asset pair"]}));
        assert!(matches!(
            ticker_from_response("NOPE", resp),
            Err(ExchangeError::Api { .. })
        ));

        let resp = decode(serde_json::json!({"error": [], "result": {}}));
        assert!(matches!(
            ticker_from_response("XXBTZEUR", resp),
            Err(ExchangeError::UnknownPair { .. })
        ));

        let resp = decode(serde_json::json!({"error": [], "result": {"XXBTZEUR": {"a": []}}}));
        assert!(matches!(
            ticker_from_response("XXBTZEUR", resp),
            Err(ExchangeError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn add_order_placed() {
        let resp = decode(serde_json::json!({
            "error": [],
            "result": {"descr": {"order": "buy 0.00073320 XBTEUR @ market"}, "txid": ["TX1"]}
        }));
        assert_eq!(
            add_order_from_response(resp).unwrap(),
            AddOrderResult::Placed {
                txid: "TX1".to_string(),
                description: Some("buy 0.00073320 XBTEUR @ market".to_string()),
            }
        );
    }

    #[test]
    fn non_json_body_becomes_error_envelope() {
        let json = private_body_to_json(StatusCode::BAD_GATEWAY, "<html>Bad Gateway</html>");
        let errors = json["error"].as_array().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0]
            .as_str()
            .unwrap()
            .starts_with("EGeneral:Invalid response (HTTP 502 Bad Gateway)"));
    }

    #[test]
    fn json_body_passes_through() {
        let json = private_body_to_json(StatusCode::OK, r#"{"error":[],"result":{"txid":["TX1"]}}"#);
        assert_eq!(json["result"]["txid"][0], "TX1");
    }

    #[test]
    fn non_json_add_order_is_a_permanent_rejection() {
        let json = private_body_to_json(StatusCode::SERVICE_UNAVAILABLE, "");
        let resp: KrakenResponse<AddOrderPayload> = decode(json);

        match add_order_from_response(resp).unwrap() {
            AddOrderResult::Rejected(errors) => {
                assert!(errors[0].starts_with("EGeneral:Invalid response"));
                assert!(!crate::purchase::is_transient(&errors));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn add_order_rejected() {
        let resp = decode(serde_json::json!({"error": ["EOrder:cancel_only mode"]}));
        assert_eq!(
            add_order_from_response(resp).unwrap(),
            AddOrderResult::Rejected(vec!["EOrder:cancel_only mode".to_string()])
        );
    }

    #[test]
    fn add_order_needs_exactly_one_txid() {
        let none = decode(serde_json::json!({"error": [], "result": {"txid": []}}));
        assert!(add_order_from_response(none).is_err());

        let two = decode(serde_json::json!({"error": [], "result": {"txid": ["A", "B"]}}));
        assert!(add_order_from_response(two).is_err());

        let missing = decode(serde_json::json!({"error": []}));
        assert!(add_order_from_response(missing).is_err());
    }

    #[test]
    fn query_order_variants() {
        let found = decode(serde_json::json!({
            "error": [],
            "result": {"TX1": {"status": "closed", "vol": "0.001", "vol_exec": "0.001", "fee": "0.1"}}
        }));
        match query_order_from_response("TX1", found) {
            QueryOrderResult::Found(details) => {
                assert_eq!(details.status, OrderStatus::Closed);
                assert_eq!(details.fee, dec!(0.1));
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let missing = decode(serde_json::json!({"error": [], "result": {}}));
        assert_eq!(
            query_order_from_response("TX1", missing),
            QueryOrderResult::NotFound
        );

        let rejected = decode(serde_json::json!({"error": ["EOrder:Invalid order"]}));
        assert!(matches!(
            query_order_from_response("TX1", rejected),
            QueryOrderResult::Rejected(_)
        ));
    }
}
