use super::commands::{ConfigAction, OutputFormat};
use super::utils::{field, print_json, section};
use chipstake_daemon::DaemonConfig;
use chipstake_types::{ChipstakeError, ChipstakeResult};
use std::path::Path;

pub fn handle_config(
    config_path: &Path,
    config: &DaemonConfig,
    action: Option<ConfigAction>,
    format: OutputFormat,
) -> ChipstakeResult<()> {
    match action {
        Some(ConfigAction::Show) | None => match format {
            OutputFormat::Json => print_json(config)?,
            OutputFormat::Text => {
                if config_path.exists() {
                    let content = std::fs::read_to_string(config_path)
                        .map_err(|e| ChipstakeError::Config(format!("Failed to read config: {}", e)))?;
                    println!("{}", content);
                } else {
                    println!("\x1b[38;5;245mNo configuration file found at {:?}\x1b[0m", config_path);
                    println!("Run '\x1b[38;5;51mchipstake init\x1b[0m' to create one");
                }
            }
        },
        Some(ConfigAction::Validate) => {
            let genesis = config.validate_genesis();
            match format {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "path": config_path,
                    "exists": config_path.exists(),
                    "valid": true,
                    "genesis_error": genesis.as_ref().err().map(|e| e.to_string()),
                }))?,
                OutputFormat::Text => {
                    section("Configuration");
                    field("Path", config_path.display());
                    field("Data directory", config.data_dir.display());
                    field("API", config.api_socket_addr());
                    println!("\x1b[38;5;46m[+]\x1b[0m Configuration is valid");
                    if let Err(e) = genesis {
                        println!("\x1b[38;5;226m[!]\x1b[0m Genesis section incomplete: {}", e);
                    }
                }
            }
        }
    }
    Ok(())
}
