use super::commands::OutputFormat;
use super::utils::{open_service, print_json};
use chipstake_daemon::DaemonConfig;
use chipstake_ledger::{Receipt, Transaction};
use chipstake_types::{ChipstakeError, ChipstakeResult};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

#[derive(Serialize)]
struct AppliedEntry<'a> {
    index: usize,
    command: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    receipt: Option<&'a Receipt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Reads transactions from a JSON array, or from JSON lines when the file
/// ends in `.jsonl`.
pub fn read_transactions(path: &Path) -> ChipstakeResult<Vec<Transaction>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ChipstakeError::Config(format!("Failed to read {:?}: {}", path, e)))?;

    let is_lines = path.extension().map(|ext| ext == "jsonl").unwrap_or(false);
    if !is_lines {
        return serde_json::from_str(&content)
            .map_err(|e| ChipstakeError::Serialization(format!("Invalid transaction file: {}", e)));
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).map_err(|e| {
                ChipstakeError::Serialization(format!("Invalid transaction on line {}: {}", n + 1, e))
            })
        })
        .collect()
}

pub async fn apply_file(
    config: &DaemonConfig,
    file: &Path,
    keep_going: bool,
    format: OutputFormat,
) -> ChipstakeResult<()> {
    let txs = read_transactions(file)?;
    info!("Applying {} transactions from {:?}", txs.len(), file);

    let service = open_service(config)?;
    let total = txs.len();
    let mut entries = service.submit_batch(txs, keep_going).await;
    service.store().flush()?;

    match format {
        OutputFormat::Json => {
            let report: Vec<AppliedEntry> = entries
                .iter()
                .map(|entry| AppliedEntry {
                    index: entry.index,
                    command: entry.command,
                    receipt: entry.result.as_ref().ok(),
                    error: entry.result.as_ref().err().map(|e| e.to_string()),
                })
                .collect();
            print_json(&report)?;
        }
        OutputFormat::Text => {
            for entry in &entries {
                match &entry.result {
                    Ok(receipt) => println!(
                        "\x1b[38;5;46m[+]\x1b[0m #{:<4} {:<28} {} events",
                        entry.index,
                        entry.command,
                        receipt.events.len()
                    ),
                    Err(e) => println!(
                        "\x1b[38;5;196m[-]\x1b[0m #{:<4} {:<28} {}",
                        entry.index, entry.command, e
                    ),
                }
            }
            let accepted = entries.iter().filter(|e| e.result.is_ok()).count();
            println!();
            println!(
                "Applied {}/{} transactions ({} skipped)",
                accepted,
                total,
                total - entries.len()
            );
        }
    }

    if keep_going {
        return Ok(());
    }
    match entries.pop() {
        Some(last) if last.result.is_err() => {
            warn!("Stopped at transaction #{}", last.index);
            last.result.map(|_| ())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chipstake_ledger::Command;

    fn temp_file(name: &str, content: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("chipstake-apply-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_reads_json_array() {
        let path = temp_file(
            "batch.json",
            r#"[{"sender":"0x00000000000000000000000000000000000000a0","timestamp":1,"command":"pause"}]"#,
        );
        let txs = read_transactions(&path).unwrap();
        assert_eq!(txs.len(), 1);
        assert!(matches!(txs[0].command, Command::Pause));
    }

    #[test]
    fn test_reads_json_lines_and_reports_line() {
        let path = temp_file(
            "batch.jsonl",
            "{\"sender\":\"0x00000000000000000000000000000000000000a0\",\"timestamp\":1,\"command\":\"pause\"}\n\nnot json\n",
        );
        match read_transactions(&path) {
            Err(ChipstakeError::Serialization(msg)) => assert!(msg.contains("line 3")),
            other => panic!("unexpected result: {:?}", other.map(|t| t.len())),
        }
    }
}
