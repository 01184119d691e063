//! Integration tests for the Kraken DCA bot.
//!
//! Scenario tests drive a full run against the mock exchange, an in-memory
//! or temp-dir lock, and a recording notifier.
//!
//! Live tests hit the real Kraken API and are ignored by default.
//! Run with: cargo test --test integration -- --ignored

use std::time::Duration;

use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

use kraken_dca::config::Config;
use kraken_dca::exchange::{Exchange, KrakenClient, MockExchange};
use kraken_dca::lock::{FileLock, MemoryLock, RunGuard};
use kraken_dca::notify::{RecordingNotifier, SUBJECT_FAILURE, SUBJECT_FAULT, SUBJECT_SUCCESS};
use kraken_dca::purchase::PurchaseOutcome;
use kraken_dca::scheduler::RecordingSleeper;
use kraken_dca::trading::{OrderFlag, OrderType};
use kraken_dca::{RunStatus, Runner};

const RETRY_INTERVAL: Duration = Duration::from_secs(3600);

fn enabled_config() -> Config {
    Config {
        execute_bot: true,
        api_key: "test-key".to_string(),
        api_secret: "dGVzdC1zZWNyZXQ=".to_string(),
        ..Config::default()
    }
}

struct Harness {
    config: Config,
    exchange: MockExchange,
    sleeper: RecordingSleeper,
    lock: MemoryLock,
    notifier: RecordingNotifier,
}

impl Harness {
    fn new(config: Config) -> Self {
        Self {
            config,
            exchange: MockExchange::new(dec!(50000)),
            sleeper: RecordingSleeper::new(),
            lock: MemoryLock::new(),
            notifier: RecordingNotifier::new(),
        }
    }

    async fn run(&self) -> RunStatus {
        Runner::new(
            &self.config,
            &self.exchange,
            &self.sleeper,
            &self.lock,
            &self.notifier,
        )
        .run()
        .await
        .expect("run should not fail on lock")
    }
}

/// Ask 50000, invest 36.66: a post-only limit for 0.00073320 just under the ask.
#[tokio::test]
async fn test_scenario_a_successful_purchase() {
    let h = Harness::new(enabled_config());
    h.exchange
        .push_placed("OQCLML-BW3P3-BUCMWZ")
        .push_found("OQCLML-BW3P3-BUCMWZ", dec!(0.0007332), dec!(0.0952));

    let status = h.run().await;

    let orders = h.exchange.submitted_orders();
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order.pair, "XXBTZEUR");
    assert_eq!(order.order_type, OrderType::Limit);
    assert_eq!(order.price, Some(dec!(49950.0)));
    assert_eq!(order.flags, vec![OrderFlag::Post]);

    let fields = order.form_fields();
    assert!(fields.contains(&("volume", "0.00073320".to_string())));

    assert_eq!(status.label(), "purchased");
    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, SUBJECT_SUCCESS);
    assert!(sent[0].body.contains("Quantity bought: 0.00073320 BTC"));
    assert!(sent[0].body.contains("Unit price: 50000.00 EUR"));
    assert!(!h.lock.is_held());
}

/// Invest 1.00 at 50000 cannot cover the 0.00005 minimum (2.50 EUR).
#[tokio::test]
async fn test_scenario_b_insufficient_amount() {
    let h = Harness::new(Config {
        invest_amount: dec!(1.00),
        ..enabled_config()
    });

    let status = h.run().await;

    assert!(h.exchange.submitted_orders().is_empty());
    match status {
        RunStatus::Completed(PurchaseOutcome::Failed { attempts, .. }) => assert_eq!(attempts, 0),
        other => panic!("unexpected status: {:?}", other),
    }
    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, SUBJECT_FAILURE);
    assert!(sent[0].body.contains("2.50"));
}

/// Two cancel_only rejections, then acceptance.
#[tokio::test]
async fn test_scenario_c_transient_retry() {
    let h = Harness::new(enabled_config());
    h.exchange
        .push_rejected("EOrder:cancel_only mode")
        .push_rejected("EOrder:cancel_only mode")
        .push_placed("TX-3");

    let status = h.run().await;

    assert_eq!(h.exchange.submitted_orders().len(), 3);
    assert_eq!(h.sleeper.count_of(RETRY_INTERVAL), 2);
    match status {
        RunStatus::Completed(outcome @ PurchaseOutcome::Success { .. }) => {
            assert_eq!(outcome.attempts(), 3);
        }
        other => panic!("unexpected status: {:?}", other),
    }
    assert_eq!(h.notifier.subjects(), vec![SUBJECT_SUCCESS.to_string()]);
}

/// Lock already held: nothing reaches the exchange or the mailbox.
#[tokio::test]
async fn test_scenario_d_already_running() {
    let mut h = Harness::new(enabled_config());
    h.lock = MemoryLock::held();

    let status = h.run().await;

    assert_eq!(status, RunStatus::AlreadyRunning);
    assert_eq!(h.exchange.request_count(), 0);
    assert!(h.notifier.sent().is_empty());
    assert!(h.lock.is_held());
}

#[tokio::test]
async fn test_disabled_run_touches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let lock = FileLock::new(dir.path().join("bot.lock"));
    let config = Config {
        execute_bot: false,
        ..Config::default()
    };
    let exchange = MockExchange::new(dec!(50000));
    let sleeper = RecordingSleeper::new();
    let notifier = RecordingNotifier::new();

    let status = Runner::new(&config, &exchange, &sleeper, &lock, &notifier)
        .run()
        .await
        .unwrap();

    assert_eq!(status, RunStatus::Disabled);
    assert_eq!(exchange.request_count(), 0);
    assert!(sleeper.sleeps().is_empty());
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn test_permanent_rejection_is_reported_once() {
    let h = Harness::new(enabled_config());
    h.exchange.push_rejected("EOrder:Insufficient funds");

    let status = h.run().await;

    assert_eq!(h.exchange.submitted_orders().len(), 1);
    assert_eq!(h.sleeper.count_of(RETRY_INTERVAL), 0);
    assert_eq!(status.label(), "purchase_failed");
    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].body.contains("EOrder:Insufficient funds"));
}

#[tokio::test]
async fn test_fault_releases_file_lock_and_sends_one_email() {
    let dir = tempfile::tempdir().unwrap();
    let lock_path = dir.path().join("bot.lock");
    let lock = FileLock::new(&lock_path);
    let config = enabled_config();
    let exchange = MockExchange::new(dec!(50000));
    exchange.fail_ticker();
    let sleeper = RecordingSleeper::new();
    let notifier = RecordingNotifier::new();

    let status = Runner::new(&config, &exchange, &sleeper, &lock, &notifier)
        .run()
        .await
        .unwrap();

    assert!(matches!(status, RunStatus::Faulted(_)));
    assert!(!lock_path.exists());
    assert_eq!(notifier.subjects(), vec![SUBJECT_FAULT.to_string()]);

    // Next run can take the lock.
    assert!(lock.try_acquire().unwrap());
}

#[tokio::test]
async fn test_notification_failure_keeps_status() {
    let mut h = Harness::new(enabled_config());
    h.notifier = RecordingNotifier::failing();
    h.exchange.push_placed("TX1");

    let status = h.run().await;

    assert_eq!(status.label(), "purchased");
    assert_eq!(h.notifier.sent().len(), 1);
    assert!(!h.lock.is_held());
}

#[tokio::test]
async fn test_market_order_has_no_price() {
    let h = Harness::new(Config {
        order_type: OrderType::Market,
        ..enabled_config()
    });

    h.run().await;

    let orders = h.exchange.submitted_orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].price, None);
    assert!(orders[0].flags.is_empty());
}

/// Fetch a real ticker from Kraken.
#[tokio::test]
#[ignore = "requires network access"]
async fn test_live_ticker() {
    let config = Config::default();
    let client = KrakenClient::new(&config).expect("http client");

    let ticker = client.ticker(&config.trading_pair).await.expect("ticker");

    println!("{} ask: {}", ticker.pair, ticker.ask);
    assert!(ticker.ask > rust_decimal::Decimal::ZERO);
}
