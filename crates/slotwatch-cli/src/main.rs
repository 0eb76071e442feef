mod dry_run;
mod schedule;

use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use slotwatch_core::{Config, Notifier, QueryMode, SeenSessionStore, Watcher, parser_for};
use slotwatch_net::{Backoff, SlotClient, TelegramNotifier};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Watch the vaccination appointment API and announce newly opened slots.
#[derive(Parser, Debug)]
#[command(name = "slotwatch", version)]
struct Cli {
    /// YAML config file.
    #[arg(short, long, env = "SLOTWATCH_CONFIG", default_value = "config.yml")]
    config: PathBuf,

    /// Override `query.mode` from the config file.
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Run a single poll cycle and exit.
    #[arg(long)]
    once: bool,

    /// Day to query with --once, as dd-mm-yyyy (defaults to today).
    #[arg(long, requires = "once", value_parser = parse_date)]
    date: Option<NaiveDate>,

    /// Print notifications to stdout instead of sending them.
    #[arg(long)]
    dry_run: bool,

    /// Telegram bot token; overrides `telegram.token`.
    #[arg(long, env = "SLOTWATCH_TELEGRAM_TOKEN", hide_env_values = true)]
    telegram_token: Option<String>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    /// Query by district id.
    Area,
    /// Query by postal code.
    Postal,
}

impl From<ModeArg> for QueryMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Area => QueryMode::ByArea,
            ModeArg::Postal => QueryMode::ByPostalCode,
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%d-%m-%Y")
        .or_else(|_| NaiveDate::parse_from_str(s.trim(), "%d/%m/%Y"))
        .map_err(|_| format!("expected dd-mm-yyyy, got {s:?}"))
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::read(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(mode) = cli.mode {
        config.query.mode = mode.into();
    }
    if let Some(token) = &cli.telegram_token {
        config.telegram.token = token.clone();
    }
    config.validate()?;
    Ok(config)
}

fn build_watcher(config: &Config, dry_run: bool) -> anyhow::Result<Watcher> {
    let source = SlotClient::new(config.query.api_root.clone(), config.poll.request_timeout())?
        .with_backoff(Backoff::new(
            config.poll.backoff_base_ms,
            config.poll.backoff_max_ms,
            config.poll.max_attempts,
        ));

    let notifier: Box<dyn Notifier> = if dry_run {
        Box::new(dry_run::StdoutNotifier::stdout())
    } else {
        Box::new(TelegramNotifier::new(
            &config.telegram.api_base,
            config.telegram.token()?,
            config.poll.request_timeout(),
        )?)
    };

    Ok(Watcher::new(
        Box::new(source),
        notifier,
        parser_for(config),
        SeenSessionStore::new(config.dedup.eviction_policy()),
        config.channels(),
        config.area_code()?,
    ))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    info!("slotwatch v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;
    let area = config.area_code()?.to_string();
    info!(
        mode = %config.query.mode,
        area = %area,
        interval_secs = config.poll.interval_secs,
        dry_run = cli.dry_run,
        "starting"
    );
    let mut watcher = build_watcher(&config, cli.dry_run)?;

    if cli.once {
        let date = cli.date.unwrap_or_else(schedule::today);
        let report = watcher
            .poll(date)
            .await
            .with_context(|| format!("poll for {} failed", date.format("%d-%m-%Y")))?;
        info!(
            slots = report.slots,
            delivered = report.delivered,
            failed = report.failed,
            "cycle complete"
        );
        return Ok(());
    }

    schedule::run(&mut watcher, config.poll.interval()).await;
    Ok(())
}
