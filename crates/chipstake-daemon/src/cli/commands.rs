use chipstake_types::EthAddress;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const BUILD_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "chipstake")]
#[command(version = BUILD_VERSION)]
#[command(about = "CHIPSTAKE - Staking and reward ledger for node operators and chip holders")]
#[command(long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(short, long, global = true, value_name = "FILE", help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[arg(short = 'd', long, global = true, value_name = "DIR", env = "CHIPSTAKE_DATA_DIR", help = "Data directory path")]
    pub data_dir: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase verbosity (-v, -vv, -vvv)")]
    pub verbose: u8,

    #[arg(short, long, global = true, help = "Suppress non-error output")]
    pub quiet: bool,

    #[arg(long, global = true, value_name = "FILE", help = "Write logs to file")]
    pub log_file: Option<PathBuf>,

    #[arg(long, global = true, default_value = "text", help = "Output format")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Create the configuration and the genesis ledger")]
    #[command(long_about = "Write config.toml and initialize the ledger store.\n\nFlags override the genesis section of an existing config file.")]
    Init {
        #[arg(short, long, help = "Overwrite an existing configuration file")]
        force: bool,
        #[arg(long, value_name = "ADDRESS", help = "Holder of the default admin role")]
        admin: Option<EthAddress>,
        #[arg(long, value_name = "ADDRESS", help = "Receiver of tax and slashed tokens")]
        treasury: Option<EthAddress>,
        #[arg(long = "oracle", value_name = "ADDRESS", help = "Oracle role holder (repeatable)")]
        oracles: Vec<EthAddress>,
        #[arg(long = "pauser", value_name = "ADDRESS", help = "Pause role holder (repeatable)")]
        pausers: Vec<EthAddress>,
        #[arg(long, value_name = "BP", help = "Tax rate of the public pool in basis points")]
        public_pool_tax_rate: Option<u64>,
        #[arg(long = "balance", value_name = "ADDRESS=TOKENS", help = "Initial token balance (repeatable)")]
        balances: Vec<String>,
    },

    #[command(about = "Apply a file of transactions")]
    #[command(long_about = "Apply transactions from a JSON array file, or one JSON object per line for .jsonl files.")]
    Apply {
        #[arg(short, long, value_name = "FILE")]
        file: PathBuf,
        #[arg(long, help = "Continue after a rejected transaction")]
        keep_going: bool,
    },

    #[command(about = "Inspect registered nodes")]
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },

    #[command(about = "Inspect chips")]
    Chip {
        #[command(subcommand)]
        action: ChipAction,
    },

    #[command(about = "Show balance, chips and pending requests of an account")]
    Account {
        address: EthAddress,
    },

    #[command(about = "Show global pool summary")]
    Pool,

    #[command(about = "Show the current epoch")]
    Epoch,

    #[command(about = "Read the event log")]
    Events {
        #[arg(long, default_value = "0", help = "First sequence number")]
        from: u64,
        #[arg(long, default_value = "100")]
        limit: usize,
        #[arg(long = "kind", value_name = "NAME", help = "Only events of this kind (repeatable)")]
        kinds: Vec<String>,
    },

    #[command(about = "Check share, escrow and supply consistency")]
    Audit,

    #[command(about = "Serve the HTTP API")]
    Serve {
        #[arg(long, help = "Log every committed event")]
        log_events: bool,
    },

    #[command(about = "Manage configuration")]
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
pub enum NodeAction {
    #[command(about = "Show one node")]
    Get {
        address: EthAddress,
    },
    #[command(about = "List nodes in registration order")]
    List {
        #[arg(long, default_value = "0")]
        offset: usize,
        #[arg(long, default_value = "50")]
        limit: usize,
    },
}

#[derive(Subcommand)]
pub enum ChipAction {
    #[command(about = "Show the backing of a chip")]
    Info {
        token_id: u64,
    },
    #[command(about = "List chips owned by an account")]
    Owned {
        address: EthAddress,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    #[command(about = "Show current configuration")]
    Show,
    #[command(about = "Validate configuration")]
    Validate,
}
