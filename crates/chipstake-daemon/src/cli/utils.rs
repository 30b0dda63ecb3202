use super::commands::Cli;
use chipstake_daemon::config::LoggingConfig;
use chipstake_daemon::{DaemonConfig, LedgerService, LedgerStore};
use chipstake_types::{ChipstakeError, ChipstakeResult, TokenAmount};
use serde::Serialize;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const BUILD_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn init_logging(cli: &Cli, config: &LoggingConfig) {
    let level = if cli.quiet {
        "warn".to_string()
    } else {
        match cli.verbose {
            0 => config.filter_directive(),
            1 => "info,chipstake_daemon=debug,chipstake_ledger=debug".to_string(),
            2 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let log_file = cli.log_file.as_ref().or(config.file.as_ref());
    let file = log_file.and_then(|path| {
        match std::fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("Failed to open log file {:?}: {}. Logging to stdout.", path, e);
                None
            }
        }
    });

    let layer = match (file, config.json) {
        (Some(file), true) => fmt::layer()
            .json()
            .with_writer(std::sync::Mutex::new(file))
            .boxed(),
        (Some(file), false) => fmt::layer()
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .with_file(config.source_location)
            .with_line_number(config.source_location)
            .boxed(),
        (None, true) => fmt::layer().json().boxed(),
        (None, false) if config.timestamps => fmt::layer()
            .with_target(cli.verbose >= 2)
            .with_file(config.source_location)
            .with_line_number(config.source_location)
            .boxed(),
        (None, false) => fmt::layer()
            .without_time()
            .with_target(cli.verbose >= 2)
            .boxed(),
    };

    tracing_subscriber::registry().with(env_filter).with(layer).init();
}

pub fn print_banner() {
    println!("\x1b[38;5;214m");
    println!(r#"
     ██████╗██╗  ██╗██╗██████╗ ███████╗████████╗ █████╗ ██╗  ██╗███████╗
    ██╔════╝██║  ██║██║██╔══██╗██╔════╝╚══██╔══╝██╔══██╗██║ ██╔╝██╔════╝
    ██║     ███████║██║██████╔╝███████╗   ██║   ███████║█████╔╝ █████╗
    ██║     ██╔══██║██║██╔═══╝ ╚════██║   ██║   ██╔══██║██╔═██╗ ██╔══╝
    ╚██████╗██║  ██║██║██║     ███████║   ██║   ██║  ██║██║  ██╗███████╗
     ╚═════╝╚═╝  ╚═╝╚═╝╚═╝     ╚══════╝   ╚═╝   ╚═╝  ╚═╝╚═╝  ╚═╝╚══════╝"#);
    println!("\x1b[0m");
    println!("        \x1b[38;5;245mStaking and Reward Ledger - v{}\x1b[0m", BUILD_VERSION);
    println!();
}

pub fn print_json<T: Serialize>(value: &T) -> ChipstakeResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| ChipstakeError::Serialization(format!("Failed to encode output: {}", e)))?;
    println!("{}", text);
    Ok(())
}

/// Raw 18-decimal amount rendered as `1234.5 (1234500000000000000000 wei)`.
pub fn fmt_tokens(raw: u128) -> String {
    format!("{} ({} wei)", TokenAmount::wei(raw).to_decimal(), raw)
}

pub fn section(title: &str) {
    println!("\x1b[1;38;5;214m{}\x1b[0m", title);
    println!("\x1b[38;5;245m{}\x1b[0m", "═".repeat(50));
}

pub fn field(label: &str, value: impl std::fmt::Display) {
    println!("  {:<22} \x1b[38;5;51m{}\x1b[0m", label, value);
}

/// Opens the configured store and loads the persisted ledger.
pub fn open_service(config: &DaemonConfig) -> ChipstakeResult<LedgerService> {
    let store = LedgerStore::open(config.storage_config())?;
    LedgerService::open(store)
}
