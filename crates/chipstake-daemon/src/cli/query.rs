use super::commands::{ChipAction, NodeAction, OutputFormat};
use super::utils::{field, fmt_tokens, open_service, print_json, section};
use chipstake_daemon::api::{AccountResponse, EpochResponse, EventsResponse, NodePageResponse, NodeResponse};
use chipstake_daemon::storage::{AuditLogEntry, TreeSizes};
use chipstake_daemon::DaemonConfig;
use chipstake_ledger::requests::PendingClaim;
use chipstake_ledger::{ChipInfo, EventFilter, Node};
use chipstake_types::{ChipId, ChipstakeResult, EthAddress};
use serde::Serialize;

fn print_node(node: &Node, min_tokens_to_stake: Option<u128>) {
    section(&format!("Node {}", node.account));
    field("Node ID", node.node_id);
    field("Name", &node.name);
    if !node.description.is_empty() {
        field("Description", &node.description);
    }
    field("Tax rate", format!("{} bp", node.tax_rate_basis_points));
    field("Public good", node.public_good);
    field("Alpha", node.alpha);
    field("Staking pool", fmt_tokens(node.staking_pool_tokens));
    field("Operation pool", fmt_tokens(node.operation_pool_tokens));
    field("Total shares", node.total_shares);
    field("Slashed", fmt_tokens(node.slashed_tokens));
    match min_tokens_to_stake {
        Some(amount) => field("Min stake", fmt_tokens(amount)),
        None => field("Min stake", "unavailable (staking pool slashed to zero)"),
    }
    field("Created at", node.created_at);
}

fn print_chip(chip: &ChipInfo) {
    println!(
        "  {:<10} node {}  owner {}  {} shares  {}",
        chip.token_id,
        chip.node_addr,
        chip.owner,
        chip.shares,
        fmt_tokens(chip.tokens)
    );
}

pub async fn show_node(config: &DaemonConfig, action: NodeAction, format: OutputFormat) -> ChipstakeResult<()> {
    let service = open_service(config)?;
    let ledger = service.read().await;

    match action {
        NodeAction::Get { address } => {
            let response = NodeResponse::from_ledger(&ledger, &address)?;
            match format {
                OutputFormat::Json => print_json(&response)?,
                OutputFormat::Text => print_node(&response.node, response.min_tokens_to_stake),
            }
        }
        NodeAction::List { offset, limit } => {
            let response = NodePageResponse {
                total: ledger.get_node_count(),
                offset,
                nodes: ledger
                    .get_nodes_with_pagination(offset, limit)
                    .into_iter()
                    .cloned()
                    .collect(),
            };
            match format {
                OutputFormat::Json => print_json(&response)?,
                OutputFormat::Text => {
                    section(&format!("Nodes ({} registered)", response.total));
                    for node in &response.nodes {
                        println!(
                            "  {:<6} {}  {:<20} {:>6} bp  {}",
                            node.node_id,
                            node.account,
                            node.name,
                            node.tax_rate_basis_points,
                            fmt_tokens(node.staking_pool_tokens)
                        );
                    }
                }
            }
        }
    }
    Ok(())
}

pub async fn show_chip(config: &DaemonConfig, action: ChipAction, format: OutputFormat) -> ChipstakeResult<()> {
    let service = open_service(config)?;
    let ledger = service.read().await;

    let chips = match action {
        ChipAction::Info { token_id } => vec![ledger.get_chips_info(ChipId(token_id))?],
        ChipAction::Owned { address } => ledger
            .chips_of(&address)
            .into_iter()
            .map(|id| ledger.get_chips_info(id))
            .collect::<Result<Vec<_>, _>>()?,
    };

    match format {
        OutputFormat::Json => print_json(&chips)?,
        OutputFormat::Text => {
            section("Chips");
            if chips.is_empty() {
                println!("  \x1b[38;5;245mNo chips\x1b[0m");
            }
            chips.iter().for_each(print_chip);
        }
    }
    Ok(())
}

pub async fn show_account(config: &DaemonConfig, account: EthAddress, format: OutputFormat) -> ChipstakeResult<()> {
    let service = open_service(config)?;
    let ledger = service.read().await;

    let chips = ledger
        .chips_of(&account)
        .into_iter()
        .map(|id| ledger.get_chips_info(id))
        .collect::<Result<Vec<_>, _>>()?;
    let response = AccountResponse {
        account,
        balance: ledger.balance_of(&account),
        is_node: ledger.get_node(&account).is_ok(),
        chips,
        unstake_requests: ledger.unstake_requests_of(&account),
        withdrawal_requests: ledger.withdrawal_requests_of(&account),
    };

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Text => {
            section(&format!("Account {}", account));
            field("Balance", fmt_tokens(response.balance));
            field("Registered node", response.is_node);
            field("Chips", response.chips.len());
            response.chips.iter().for_each(print_chip);

            let params = ledger.params();
            for id in &response.unstake_requests {
                let request = ledger.unstake_request(*id)?;
                field(
                    &format!("Unstake {}", id),
                    format!(
                        "{} ready at {}{}",
                        fmt_tokens(request.unstake_amount),
                        request.ready_at(params),
                        if request.claimed { " (claimed)" } else { "" }
                    ),
                );
            }
            for id in &response.withdrawal_requests {
                let request = ledger.withdrawal_request(*id)?;
                field(
                    &format!("Withdrawal {}", id),
                    format!(
                        "{} ready at {}{}",
                        fmt_tokens(request.amount),
                        request.ready_at(params),
                        if request.claimed { " (claimed)" } else { "" }
                    ),
                );
            }
        }
    }
    Ok(())
}

pub async fn show_pool(config: &DaemonConfig, format: OutputFormat) -> ChipstakeResult<()> {
    let service = open_service(config)?;
    let info = service.read().await.pool_info();

    match format {
        OutputFormat::Json => print_json(&info)?,
        OutputFormat::Text => {
            section("Pool");
            field("Current epoch", info.current_epoch);
            field("Paused", info.paused);
            field("Nodes", info.node_count);
            field("Chips", info.chip_count);
            field("Public pool stake", fmt_tokens(info.public_pool.staking_pool_tokens));
            field("Public pool tax", format!("{} bp", info.public_pool.tax_rate_basis_points));
            field("Escrow", fmt_tokens(info.escrow));
            field("Treasury", info.treasury);
            field("Treasury balance", fmt_tokens(info.treasury_balance));
            field("Initial supply", fmt_tokens(info.initial_supply));
            field("Total minted", fmt_tokens(info.total_minted));
            field("Next event", info.next_event_seq);
        }
    }
    Ok(())
}

pub async fn show_epoch(config: &DaemonConfig, format: OutputFormat) -> ChipstakeResult<()> {
    let service = open_service(config)?;
    let ledger = service.read().await;
    let current = ledger.current_epoch();
    let response = EpochResponse {
        current_epoch: current,
        next_epoch: current.next(),
        last_timestamp: ledger.last_timestamp(),
    };

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Text => {
            section("Epoch");
            field("Current", response.current_epoch);
            field("Next reward batch", response.next_epoch);
            field("Last timestamp", response.last_timestamp);
        }
    }
    Ok(())
}

pub async fn show_events(
    config: &DaemonConfig,
    from: u64,
    limit: usize,
    kinds: Vec<String>,
    format: OutputFormat,
) -> ChipstakeResult<()> {
    let service = open_service(config)?;
    let ledger = service.read().await;

    let filter = kinds.into_iter().fold(EventFilter::default(), |f, kind| f.kind(kind));
    let events: Vec<_> = ledger
        .filter_events(&filter, from, config.api.event_page(Some(limit)))
        .into_iter()
        .cloned()
        .collect();
    let next = events
        .last()
        .map(|r| r.seq + 1)
        .unwrap_or_else(|| from.max(ledger.events().next_seq()));
    let response = EventsResponse { from, next, events };

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Text => {
            for record in &response.events {
                println!(
                    "\x1b[38;5;245m{:>8}\x1b[0m  t={:<12} {:<28} by {}",
                    record.seq,
                    record.timestamp,
                    record.event.name(),
                    record.sender
                );
            }
            println!("\x1b[38;5;245mnext: {}\x1b[0m", response.next);
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct AuditOutput {
    ledger: chipstake_ledger::AuditReport,
    schema_version: u32,
    event_count: usize,
    size_on_disk: u64,
    trees: TreeSizes,
    recent_maintenance: Vec<AuditLogEntry>,
}

pub async fn show_audit(config: &DaemonConfig, format: OutputFormat) -> ChipstakeResult<()> {
    let service = open_service(config)?;
    let report = service.read().await.audit()?;
    let store = service.store();
    let output = AuditOutput {
        schema_version: store.schema_version()?,
        event_count: store.event_count(),
        size_on_disk: store.size_on_disk()?,
        trees: store.tree_sizes(),
        recent_maintenance: store.audit_entries(5)?,
        ledger: report,
    };

    match format {
        OutputFormat::Json => print_json(&output)?,
        OutputFormat::Text => {
            section("Audit");
            let report = &output.ledger;
            field("Pooled tokens", fmt_tokens(report.pooled_tokens));
            field("Pending unstakes", fmt_tokens(report.outstanding_unstakes));
            field("Pending withdrawals", fmt_tokens(report.outstanding_withdrawals));
            field("Escrow", fmt_tokens(report.escrow));
            field("Circulating", fmt_tokens(report.circulating));
            field("Expected supply", fmt_tokens(report.expected_supply));
            field("Schema version", output.schema_version);
            field("Persisted events", output.event_count);
            field("Size on disk", format!("{} bytes", output.size_on_disk));
            field(
                "Tree entries",
                format!(
                    "snapshot {}, events {}, audit log {}",
                    output.trees.snapshot, output.trees.events, output.trees.audit_log
                ),
            );
            for entry in &output.recent_maintenance {
                field(&entry.operation, format!("{} at {}", entry.tree, entry.timestamp));
            }
            println!();
            if report.is_consistent() {
                println!("\x1b[38;5;46m[+]\x1b[0m Ledger is consistent");
            } else {
                for issue in &report.issues {
                    println!("\x1b[38;5;196m[-]\x1b[0m {}", issue);
                }
            }
        }
    }
    Ok(())
}
