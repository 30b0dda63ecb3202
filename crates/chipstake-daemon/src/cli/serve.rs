use super::utils::{open_service, print_banner};
use chipstake_daemon::supervisor::{CancellationToken, EventFollower, DEFAULT_FOLLOW_CAPACITY};
use chipstake_daemon::{ApiServer, DaemonConfig};
use chipstake_types::{ChipstakeError, ChipstakeResult};
use std::sync::Arc;
use tracing::{debug, error, info};

pub async fn serve(config: &DaemonConfig, log_events: bool) -> ChipstakeResult<()> {
    if !config.api.enabled {
        return Err(ChipstakeError::Config("API is disabled in the configuration".into()));
    }

    print_banner();
    info!("Starting CHIPSTAKE v{}", env!("CARGO_PKG_VERSION"));
    info!("Data directory: {:?}", config.data_dir);

    let service = Arc::new(open_service(config)?);
    {
        let ledger = service.read().await;
        info!(
            "Ledger loaded: {} nodes, epoch {}, next event {}",
            ledger.get_node_count(),
            ledger.current_epoch(),
            ledger.events().next_seq()
        );
    }

    let (cancel, token) = CancellationToken::new();
    let addr = config.api_socket_addr();
    let server = ApiServer::new(addr, config.api.clone(), Arc::clone(&service), token.clone());
    let mut server_task = tokio::spawn(server.serve(token.clone()));

    let follower = if log_events || config.logging.log_events {
        let from = service.read().await.events().next_seq();
        let (mut rx, task) = EventFollower::new(Arc::clone(&service), from).spawn(DEFAULT_FOLLOW_CAPACITY, token);
        tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                info!(seq = record.seq, sender = %record.sender, "{}", record.event.name());
            }
        });
        Some(task)
    } else {
        None
    };

    print_ready_message(addr, config.api.submit_enabled);

    let server_result = tokio::select! {
        _ = wait_for_shutdown() => {
            info!("Shutting down...");
            cancel.cancel();
            (&mut server_task).await
        }
        result = &mut server_task => {
            cancel.cancel();
            result
        }
    };

    if let Some(task) = follower {
        match task.await {
            Ok(exit) => debug!("Event follower stopped: {:?}", exit),
            Err(e) => error!("Event follower panicked: {}", e),
        }
    }

    service.store().flush_async().await?;
    info!("Shutdown complete");

    match server_result {
        Ok(result) => result,
        Err(e) => Err(ChipstakeError::Internal(format!("API server task failed: {}", e))),
    }
}

fn print_ready_message(addr: std::net::SocketAddr, submit_enabled: bool) {
    println!();
    println!("\x1b[38;5;214m╔══════════════════════════════════════════════════════════════╗\x1b[0m");
    println!("\x1b[38;5;214m║\x1b[0m  \x1b[1;38;5;214mCHIPSTAKE is now serving\x1b[0m                                    \x1b[38;5;214m║\x1b[0m");
    println!("\x1b[38;5;214m╠══════════════════════════════════════════════════════════════╣\x1b[0m");
    println!("\x1b[38;5;214m║\x1b[0m  API: \x1b[38;5;51mhttp://{:<40}\x1b[0m         \x1b[38;5;214m║\x1b[0m", addr);
    println!(
        "\x1b[38;5;214m║\x1b[0m  Submission: \x1b[38;5;51m{:<47}\x1b[0m \x1b[38;5;214m║\x1b[0m",
        if submit_enabled { "POST /tx enabled" } else { "read-only" }
    );
    println!("\x1b[38;5;214m╠══════════════════════════════════════════════════════════════╣\x1b[0m");
    println!("\x1b[38;5;214m║\x1b[0m  Press \x1b[38;5;226mCtrl+C\x1b[0m to stop                                        \x1b[38;5;214m║\x1b[0m");
    println!("\x1b[38;5;214m╚══════════════════════════════════════════════════════════════╝\x1b[0m");
    println!();
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => { info!("Received SIGTERM"); }
                    _ = sigint.recv() => { info!("Received SIGINT"); }
                }
                return;
            }
            (Err(e), _) | (_, Err(e)) => {
                error!("Failed to install signal handlers: {}; falling back to Ctrl+C", e);
            }
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C");
}
