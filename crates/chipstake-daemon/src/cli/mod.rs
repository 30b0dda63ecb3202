mod apply;
mod commands;
mod config_cmd;
mod init;
mod query;
mod serve;
mod utils;

pub use apply::apply_file;
pub use commands::{Cli, Commands};
pub use config_cmd::handle_config;
pub use init::{init_ledger, GenesisOverrides};
pub use query::{show_account, show_audit, show_chip, show_epoch, show_events, show_node, show_pool};
pub use serve::serve;
pub use utils::init_logging;
