//! Kraken DCA bot entry point.

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kraken_dca::config::{execute_flag_from_env, gate_execution, mask_secret, Config};
use kraken_dca::error::BotError;
use kraken_dca::exchange::{Exchange, KrakenClient};
use kraken_dca::lock::FileLock;
use kraken_dca::metrics;
use kraken_dca::notify::{LogNotifier, Notifier, SmtpNotifier};
use kraken_dca::scheduler::TokioSleeper;
use kraken_dca::Runner;

/// Scheduled DCA purchase bot for Kraken.
#[derive(Parser, Debug)]
#[command(name = "kraken-dca")]
#[command(about = "Buys a fixed amount on Kraken and emails the result")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// Compute the order without submitting it.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one purchase (default).
    Run {
        /// Compute the order without submitting it.
        #[arg(long)]
        dry_run: bool,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Print the current ask for the configured pair.
    Price,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration (also reads .env)
    let config = Config::load();

    // Initialize logging
    let (default_filter, json) = match &config {
        Ok(c) => (c.rust_log.clone(), c.json_logs()),
        Err(_) => ("info".to_string(), false),
    };
    init_logging(args.verbose, &default_filter, json);

    // Initialize metrics
    metrics::init_metrics();

    // Handle subcommands
    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(config),
        Some(Command::Price) => cmd_price(config.map_err(BotError::Config)?).await,
        Some(Command::Run { dry_run }) => cmd_run(config, dry_run).await,
        None => cmd_run(config, args.dry_run).await,
    }
}

fn init_logging(verbose: bool, default_filter: &str, json: bool) {
    let filter = if verbose {
        EnvFilter::new("kraken_dca=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_filter))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

/// Run one purchase.
async fn cmd_run(config: Result<Config, envy::Error>, dry_run: bool) -> anyhow::Result<()> {
    let Some(config) = gate_execution(config, execute_flag_from_env())? else {
        info!("Execution disabled (EXECUTE_BOT is not true), exiting");
        return Ok(());
    };

    info!(
        pair = %config.trading_pair,
        dry_run,
        "Kraken DCA bot started"
    );

    let exchange = KrakenClient::new(&config).context("failed to build HTTP client")?;

    let notifier: Box<dyn Notifier> =
        match SmtpNotifier::from_config(&config).context("failed to set up email")? {
            Some(smtp) => Box::new(smtp),
            None => {
                warn!("Mail credentials not configured, notifications go to the log only");
                Box::new(LogNotifier)
            }
        };

    let lock = FileLock::new(&config.lock_file);
    let sleeper = TokioSleeper;

    let runner = Runner::new(&config, &exchange, &sleeper, &lock, notifier.as_ref())
        .with_dry_run(dry_run);

    tokio::select! {
        status = runner.run() => {
            let status = status.context("run lock unavailable")?;
            info!(status = status.label(), "Kraken DCA bot finished");
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, abandoning run");
        }
    }

    Ok(())
}

/// Print the current ask.
async fn cmd_price(config: Config) -> anyhow::Result<()> {
    let exchange = KrakenClient::new(&config).context("failed to build HTTP client")?;
    let ticker = exchange.ticker(&config.trading_pair).await?;

    println!("Pair: {}", ticker.pair);
    println!("  Ask:  {} {}", ticker.ask, config.quote_asset);
    if let Some(bid) = ticker.bid {
        println!("  Bid:  {} {}", bid, config.quote_asset);
    }
    if let Some(last) = ticker.last {
        println!("  Last: {} {}", last, config.quote_asset);
    }

    Ok(())
}

/// Check configuration validity.
fn cmd_check_config(config: Result<Config, envy::Error>) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("KRAKEN DCA BOT - CONFIGURATION CHECK");
    println!("======================================================================");

    // Load configuration
    print!("Loading configuration... ");
    let config = match config {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(BotError::Config(e).into());
        }
    };

    // Validate configuration
    print!("Validating configuration... ");
    if let Err(e) = config.validate() {
        println!("FAILED");
        println!("  Error: {}", e);
        return Err(BotError::InvalidConfig(e).into());
    }
    println!("OK");

    // Show configuration summary
    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Execute Bot: {}", config.execute_bot);
    println!("  API URL: {}", config.kraken_api_url);
    println!("  API Key: {}", mask_secret(&config.api_key));
    println!("  API Secret: {}", mask_secret(&config.api_secret));
    println!("  Pair: {}", config.trading_pair);
    println!("  Invest Amount: {} {}", config.invest_amount, config.quote_asset);
    println!("  Min Volume: {} {}", config.min_volume, config.base_asset);
    println!("  Order Type: {}", config.order_type);
    if config.order_type == kraken_dca::trading::OrderType::Limit {
        println!(
            "  Limit Offset: {} ({} decimals)",
            config.limit_price_offset, config.price_decimals
        );
    }
    println!(
        "  Retries: {} every {}s",
        config.max_retries, config.retry_interval_secs
    );
    println!(
        "  Order Polling: {} x {}s",
        config.order_poll_attempts, config.order_poll_delay_secs
    );
    println!("  Lock File: {}", config.lock_file.display());
    match (&config.gmail_user, config.recipient()) {
        (Some(user), Some(to)) => println!(
            "  Email: {} -> {} via {}:{} (password {})",
            user,
            to,
            config.smtp_host,
            config.smtp_port,
            mask_secret(config.gmail_password.as_deref().unwrap_or_default())
        ),
        _ => println!("  Email: not configured (log only)"),
    }
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}
