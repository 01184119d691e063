//! Scheduled dollar-cost-averaging purchase bot for Kraken.
//!
//! Each invocation buys a fixed quote amount of one asset, retries while
//! the exchange reports a transient condition, and emails the result.
//! An external scheduler (cron, systemd timer) provides the cadence.
//!
//! # Flow
//!
//! ```text
//! config ─► EXECUTE_BOT? ─► run lock ─► ask price ─► volume ─► AddOrder
//!                                                      ▲          │
//!                                                      └─ retry ◄─┤ transient
//!                                                                 ▼
//!                                         release ◄─ email ◄─ QueryOrders
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`signing`]: Kraken request signing and nonces
//! - [`exchange`]: Kraken REST client and mock
//! - [`trading`]: Order types and settlement polling
//! - [`purchase`]: Volume calculation and the retry state machine
//! - [`lock`]: Single-instance run lock
//! - [`notify`]: Email notifications
//! - [`runner`]: One complete run
//! - [`scheduler`]: Retry policies and injectable sleeping
//! - [`metrics`]: Counters and latency histograms

pub mod config;
pub mod error;
pub mod exchange;
pub mod lock;
pub mod metrics;
pub mod notify;
pub mod purchase;
pub mod runner;
pub mod scheduler;
pub mod signing;
pub mod trading;

pub use config::Config;
pub use error::{BotError, Result};
pub use runner::{RunStatus, Runner};
