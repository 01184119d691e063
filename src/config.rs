//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

use crate::error::BotError;
use crate::scheduler::RetryPolicy;
use crate::trading::OrderType;

/// Application configuration loaded from environment variables.
///
/// Built once in `main` and passed by reference to every component.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Execution Control ===
    /// Master switch. When false the process exits before doing anything.
    /// Only a case-insensitive `true` enables execution.
    #[serde(default, deserialize_with = "deserialize_execute_flag")]
    pub execute_bot: bool,

    // === Kraken Credentials ===
    /// Kraken API key.
    #[serde(default)]
    pub api_key: String,

    /// Kraken API secret (base64, as issued by Kraken).
    #[serde(default)]
    pub api_secret: String,

    /// Kraken REST base URL.
    #[serde(default = "default_api_url")]
    pub kraken_api_url: String,

    // === Mail ===
    /// SMTP username, also used as sender address.
    #[serde(default)]
    pub gmail_user: Option<String>,

    /// SMTP password (app password for Gmail).
    #[serde(default)]
    pub gmail_password: Option<String>,

    /// Notification recipient. Defaults to the sender.
    #[serde(default)]
    pub notify_email: Option<String>,

    /// SMTP relay host.
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,

    /// SMTP port (implicit TLS).
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    // === Purchase Parameters ===
    /// Kraken pair symbol (e.g., XXBTZEUR).
    #[serde(default = "default_pair")]
    pub trading_pair: String,

    /// Quote-currency amount to invest per run.
    #[serde(default = "default_invest_amount")]
    pub invest_amount: Decimal,

    /// Quote asset label for notifications.
    #[serde(default = "default_quote_asset")]
    pub quote_asset: String,

    /// Base asset label for notifications.
    #[serde(default = "default_base_asset")]
    pub base_asset: String,

    /// Exchange minimum order volume in base units.
    #[serde(default = "default_min_volume")]
    pub min_volume: Decimal,

    /// Order type: market or limit (post-only). Case-insensitive.
    #[serde(default, deserialize_with = "deserialize_order_type")]
    pub order_type: OrderType,

    /// Fraction below the ask at which post-only limit orders are priced.
    #[serde(default = "default_limit_offset")]
    pub limit_price_offset: Decimal,

    /// Decimal places for the limit price.
    #[serde(default = "default_price_decimals")]
    pub price_decimals: u32,

    // === Retry & Polling ===
    /// Maximum order submission attempts.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Seconds to wait between submission attempts.
    #[serde(default = "default_retry_interval")]
    pub retry_interval_secs: u64,

    /// Order status queries after submission.
    #[serde(default = "default_poll_attempts")]
    pub order_poll_attempts: u32,

    /// Seconds between order status queries.
    #[serde(default = "default_poll_delay")]
    pub order_poll_delay_secs: u64,

    // === Process ===
    /// Lock marker path.
    #[serde(default = "default_lock_file")]
    pub lock_file: PathBuf,

    /// Seconds to wait before the run starts.
    #[serde(default = "default_startup_delay")]
    pub startup_delay_secs: u64,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Log output format: text or json.
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

/// Interpret an `EXECUTE_BOT` value. Anything but `true` (any case) is off.
pub fn execute_flag(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("true")
}

/// Read `EXECUTE_BOT` straight from the environment, for when the rest of
/// the configuration does not load.
pub fn execute_flag_from_env() -> bool {
    std::env::var("EXECUTE_BOT")
        .map(|v| execute_flag(&v))
        .unwrap_or(false)
}

fn deserialize_execute_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(execute_flag(&raw))
}

fn deserialize_order_type<'de, D>(deserializer: D) -> Result<OrderType, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.trim()
        .parse()
        .map_err(|_| serde::de::Error::custom(format!("unknown order type {:?}", raw)))
}

fn default_api_url() -> String {
    "https://api.kraken.com".to_string()
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    465
}

fn default_pair() -> String {
    "XXBTZEUR".to_string()
}

fn default_invest_amount() -> Decimal {
    Decimal::new(3666, 2) // 36.66
}

fn default_quote_asset() -> String {
    "EUR".to_string()
}

fn default_base_asset() -> String {
    "BTC".to_string()
}

fn default_min_volume() -> Decimal {
    Decimal::new(5, 5) // 0.00005
}

fn default_limit_offset() -> Decimal {
    Decimal::new(1, 3) // 0.001
}

fn default_price_decimals() -> u32 {
    1
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_interval() -> u64 {
    3600
}

fn default_poll_attempts() -> u32 {
    10
}

fn default_poll_delay() -> u64 {
    10
}

fn default_lock_file() -> PathBuf {
    PathBuf::from("bot.lock")
}

fn default_startup_delay() -> u64 {
    5
}

fn default_http_timeout_ms() -> u64 {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            execute_bot: false,
            api_key: String::new(),
            api_secret: String::new(),
            kraken_api_url: default_api_url(),
            gmail_user: None,
            gmail_password: None,
            notify_email: None,
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            trading_pair: default_pair(),
            invest_amount: default_invest_amount(),
            quote_asset: default_quote_asset(),
            base_asset: default_base_asset(),
            min_volume: default_min_volume(),
            order_type: OrderType::default(),
            limit_price_offset: default_limit_offset(),
            price_decimals: default_price_decimals(),
            max_retries: default_max_retries(),
            retry_interval_secs: default_retry_interval(),
            order_poll_attempts: default_poll_attempts(),
            order_poll_delay_secs: default_poll_delay(),
            lock_file: default_lock_file(),
            startup_delay_secs: default_startup_delay(),
            http_timeout_ms: default_http_timeout_ms(),
            rust_log: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    ///
    /// Credentials are only required when execution is enabled.
    pub fn validate(&self) -> Result<(), String> {
        if self.execute_bot {
            if self.api_key.is_empty() {
                return Err("API_KEY is required".to_string());
            }
            if self.api_secret.is_empty() {
                return Err("API_SECRET is required".to_string());
            }
        }

        if self.trading_pair.is_empty() {
            return Err("TRADING_PAIR must not be empty".to_string());
        }

        if self.invest_amount <= Decimal::ZERO {
            return Err("INVEST_AMOUNT must be positive".to_string());
        }

        if self.min_volume <= Decimal::ZERO {
            return Err("MIN_VOLUME must be positive".to_string());
        }

        if self.limit_price_offset < Decimal::ZERO || self.limit_price_offset >= Decimal::ONE {
            return Err("LIMIT_PRICE_OFFSET must be in [0, 1)".to_string());
        }

        if self.max_retries == 0 {
            return Err("MAX_RETRIES must be at least 1".to_string());
        }

        if self.order_poll_attempts == 0 {
            return Err("ORDER_POLL_ATTEMPTS must be at least 1".to_string());
        }

        if self.gmail_user.is_some() != self.gmail_password.is_some() {
            return Err("GMAIL_USER and GMAIL_PASSWORD must be set together".to_string());
        }

        Ok(())
    }

    /// Retry policy for order submission.
    pub fn submit_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.max_retries, Duration::from_secs(self.retry_interval_secs))
    }

    /// Retry policy for order detail polling.
    pub fn poll_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(
            self.order_poll_attempts,
            Duration::from_secs(self.order_poll_delay_secs),
        )
    }

    /// Notification recipient, falling back to the sender.
    pub fn recipient(&self) -> Option<&str> {
        self.notify_email.as_deref().or(self.gmail_user.as_deref())
    }

    /// Whether SMTP credentials are configured.
    pub fn has_mail_credentials(&self) -> bool {
        self.gmail_user.is_some() && self.gmail_password.is_some()
    }

    /// Whether logs should be emitted as JSON.
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

/// Decide whether a run should proceed.
///
/// `Ok(None)` means execution is off and the caller should exit quietly.
/// The flag is checked before anything else, so a disabled bot never fails
/// on the rest of its configuration. `env_flag` is the raw `EXECUTE_BOT`
/// reading, consulted when the configuration itself does not load.
pub fn gate_execution(
    loaded: Result<Config, envy::Error>,
    env_flag: bool,
) -> Result<Option<Config>, BotError> {
    let config = match loaded {
        Ok(config) => config,
        Err(_) if !env_flag => return Ok(None),
        Err(e) => return Err(BotError::Config(e)),
    };

    if !config.execute_bot {
        return Ok(None);
    }

    config.validate().map_err(BotError::InvalidConfig)?;
    Ok(Some(config))
}

/// Mask a secret for display, keeping only the first four characters.
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return "<unset>".to_string();
    }
    let visible: String = secret.chars().take(4).collect();
    format!("{}****", visible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn enabled_config() -> Config {
        Config {
            execute_bot: true,
            api_key: "key".to_string(),
            api_secret: "c2VjcmV0".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn default_values_are_sensible() {
        assert_eq!(default_invest_amount(), dec!(36.66));
        assert_eq!(default_min_volume(), dec!(0.00005));
        assert_eq!(default_limit_offset(), dec!(0.001));
        assert_eq!(default_max_retries(), 5);
        assert_eq!(default_retry_interval(), 3600);
        assert_eq!(default_pair(), "XXBTZEUR");
    }

    fn from_vars(vars: &[(&str, &str)]) -> Result<Config, envy::Error> {
        envy::from_iter(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn execute_flag_is_lenient() {
        for (raw, expected) in [
            ("true", true),
            ("True", true),
            ("TRUE", true),
            (" true ", true),
            ("false", false),
            ("False", false),
            ("0", false),
            ("1", false),
            ("yes", false),
            ("", false),
        ] {
            let config = from_vars(&[("EXECUTE_BOT", raw)]).unwrap();
            assert_eq!(config.execute_bot, expected, "EXECUTE_BOT={:?}", raw);
        }
    }

    #[test]
    fn missing_execute_flag_is_off() {
        let config = from_vars(&[]).unwrap();
        assert!(!config.execute_bot);
    }

    #[test]
    fn order_type_accepts_any_case() {
        let config = from_vars(&[("ORDER_TYPE", "LIMIT")]).unwrap();
        assert_eq!(config.order_type, OrderType::Limit);
        let config = from_vars(&[("ORDER_TYPE", "Market")]).unwrap();
        assert_eq!(config.order_type, OrderType::Market);
        assert!(from_vars(&[("ORDER_TYPE", "stop-loss")]).is_err());
    }

    #[test]
    fn disabled_run_ignores_invalid_config() {
        let half_mail = Config {
            gmail_user: Some("bot@example.com".to_string()),
            ..Config::default()
        };
        assert!(half_mail.validate().is_err());
        assert!(gate_execution(Ok(half_mail), false).unwrap().is_none());

        let unloadable = from_vars(&[("EXECUTE_BOT", "False"), ("INVEST_AMOUNT", "lots")]);
        assert!(unloadable.is_err());
        assert!(gate_execution(unloadable, execute_flag("False")).unwrap().is_none());
    }

    #[test]
    fn enabled_run_requires_valid_config() {
        let unloadable = from_vars(&[("EXECUTE_BOT", "true"), ("INVEST_AMOUNT", "lots")]);
        assert!(matches!(
            gate_execution(unloadable, true),
            Err(BotError::Config(_))
        ));

        let no_secret = Config {
            api_secret: String::new(),
            ..enabled_config()
        };
        assert!(matches!(
            gate_execution(Ok(no_secret), true),
            Err(BotError::InvalidConfig(_))
        ));

        let config = gate_execution(Ok(enabled_config()), true).unwrap();
        assert!(config.is_some_and(|c| c.execute_bot));
    }

    #[test]
    fn disabled_config_needs_no_credentials() {
        let config = Config::default();
        assert!(!config.execute_bot);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_credentials_when_enabled() {
        let config = Config {
            api_secret: String::new(),
            ..enabled_config()
        };
        assert!(config.validate().is_err());

        let config = Config {
            api_key: String::new(),
            ..enabled_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_amounts() {
        let config = Config {
            invest_amount: dec!(0),
            ..enabled_config()
        };
        assert!(config.validate().is_err());

        let config = Config {
            limit_price_offset: dec!(1),
            ..enabled_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_half_configured_mail() {
        let config = Config {
            gmail_user: Some("bot@example.com".to_string()),
            ..enabled_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn recipient_falls_back_to_sender() {
        let mut config = Config {
            gmail_user: Some("bot@example.com".to_string()),
            gmail_password: Some("pw".to_string()),
            ..enabled_config()
        };
        assert_eq!(config.recipient(), Some("bot@example.com"));

        config.notify_email = Some("me@example.com".to_string());
        assert_eq!(config.recipient(), Some("me@example.com"));
    }

    #[test]
    fn policies_follow_config() {
        let config = enabled_config();
        let submit = config.submit_policy();
        assert_eq!(submit.max_attempts, 5);
        assert_eq!(submit.interval, Duration::from_secs(3600));

        let poll = config.poll_policy();
        assert_eq!(poll.max_attempts, 10);
        assert_eq!(poll.interval, Duration::from_secs(10));
    }

    #[test]
    fn mask_secret_hides_tail() {
        assert_eq!(mask_secret(""), "<unset>");
        assert_eq!(mask_secret("abcdefgh"), "abcd****");
    }
}
