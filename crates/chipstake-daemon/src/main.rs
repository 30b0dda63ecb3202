mod cli;

use chipstake_daemon::config::{default_data_dir, CONFIG_FILE_NAME};
use chipstake_daemon::DaemonConfig;
use chipstake_types::ChipstakeResult;
use clap::Parser;
use cli::{
    apply_file, handle_config, init_ledger, init_logging, serve, show_account, show_audit,
    show_chip, show_epoch, show_events, show_node, show_pool, Cli, Commands, GenesisOverrides,
};

#[tokio::main]
async fn main() -> ChipstakeResult<()> {
    let cli = Cli::parse();

    let data_dir = cli.data_dir.clone().unwrap_or_else(default_data_dir);
    let config_path = cli.config.clone().unwrap_or_else(|| data_dir.join(CONFIG_FILE_NAME));

    let mut config = DaemonConfig::load(&config_path)?;
    if cli.data_dir.is_some() || !config_path.exists() {
        config.data_dir = data_dir;
    }

    init_logging(&cli, &config.logging);

    let format = cli.format;
    match cli.command {
        Commands::Init {
            force,
            admin,
            treasury,
            oracles,
            pausers,
            public_pool_tax_rate,
            balances,
        } => {
            let overrides = GenesisOverrides {
                admin,
                treasury,
                oracles,
                pausers,
                public_pool_tax_rate,
                balances,
            };
            init_ledger(&config_path, config, force, overrides)?;
        }
        Commands::Apply { file, keep_going } => {
            apply_file(&config, &file, keep_going, format).await?;
        }
        Commands::Node { action } => {
            show_node(&config, action, format).await?;
        }
        Commands::Chip { action } => {
            show_chip(&config, action, format).await?;
        }
        Commands::Account { address } => {
            show_account(&config, address, format).await?;
        }
        Commands::Pool => {
            show_pool(&config, format).await?;
        }
        Commands::Epoch => {
            show_epoch(&config, format).await?;
        }
        Commands::Events { from, limit, kinds } => {
            show_events(&config, from, limit, kinds, format).await?;
        }
        Commands::Audit => {
            show_audit(&config, format).await?;
        }
        Commands::Serve { log_events } => {
            serve(&config, log_events).await?;
        }
        Commands::Config { action } => {
            handle_config(&config_path, &config, action, format)?;
        }
    }

    Ok(())
}
