//! Unified error types for the DCA bot.

use rust_decimal::Decimal;
use thiserror::Error;

/// Unified error type for the DCA bot.
#[derive(Error, Debug)]
pub enum BotError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration is present but invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Exchange communication error.
    #[error("exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    /// Run lock error.
    #[error("lock error: {0}")]
    Lock(#[from] LockError),
}

/// Errors talking to the Kraken REST API.
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// Transport-level failure (DNS, TLS, timeout, connection reset).
    #[error("http request to {path} failed: {source}")]
    Transport {
        /// Endpoint path.
        path: String,
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// The exchange answered with an error list.
    #[error("exchange returned errors on {path}: {errors:?}")]
    Api {
        /// Endpoint path.
        path: String,
        /// Error strings as reported by Kraken.
        errors: Vec<String>,
    },

    /// The response was JSON but not the expected shape.
    #[error("malformed response from {path}: {reason}")]
    MalformedResponse {
        /// Endpoint path.
        path: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The ticker did not contain the requested pair.
    #[error("pair {pair} not found in ticker response")]
    UnknownPair {
        /// Requested pair.
        pair: String,
    },

    /// Order parameters failed local validation.
    #[error("invalid order parameters: {0}")]
    InvalidOrder(String),

    /// Request could not be signed.
    #[error(transparent)]
    Signing(#[from] SigningError),
}

/// Request signing errors.
#[derive(Error, Debug)]
pub enum SigningError {
    /// The API secret is not valid base64.
    #[error("api secret is not valid base64: {0}")]
    InvalidSecret(#[from] base64::DecodeError),

    /// HMAC could not be keyed.
    #[error("invalid hmac key length")]
    InvalidKeyLength,
}

/// Purchase computation and submission errors.
///
/// These never propagate past the orchestrator: each one becomes a failed
/// purchase outcome that is reported by email.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PurchaseError {
    /// Investment is below the cost of the minimum order volume.
    #[error(
        "insufficient amount: minimum for this pair is {:.2}, got {:.2}",
        .min_invest.round_dp(2),
        .invest_amount.round_dp(2)
    )]
    InsufficientAmount {
        /// Configured investment.
        invest_amount: Decimal,
        /// `min_volume * ask_price`.
        min_invest: Decimal,
    },

    /// Rounded quantity fell under the exchange minimum volume.
    #[error("computed volume {quantity} is below the minimum {min_volume}")]
    BelowMinVolume {
        /// Rounded quantity.
        quantity: Decimal,
        /// Exchange minimum.
        min_volume: Decimal,
    },

    /// The exchange rejected the order.
    #[error("order rejected: {}", errors.join(", "))]
    Rejected {
        /// Error strings from the exchange.
        errors: Vec<String>,
        /// Whether the rejection matched a known transient condition.
        transient: bool,
    },

    /// The exchange answered with something we could not interpret.
    #[error("malformed exchange response: {0}")]
    Malformed(String),
}

impl PurchaseError {
    /// Whether another submission attempt may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, PurchaseError::Rejected { transient: true, .. })
    }
}

/// Run lock errors.
#[derive(Error, Debug)]
pub enum LockError {
    /// Filesystem failure while creating or removing the marker.
    #[error("lock file {path}: {source}")]
    Io {
        /// Marker path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Notification transport errors. Logged, never escalated.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Sender or recipient address did not parse.
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// Message could not be built.
    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    /// SMTP transport failure.
    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// Transport refused the message for another reason.
    #[error("notification transport unavailable: {0}")]
    Unavailable(String),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, BotError>;
