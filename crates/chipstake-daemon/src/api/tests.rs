use super::*;
use crate::service::LedgerService;
use crate::supervisor::CancellationToken;
use crate::testing::*;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chipstake_ledger::{ChipInfo, Command, CommandOutput, Receipt, Transaction};
use chipstake_types::{ChipId, ONE_TOKEN};
use serde::de::DeserializeOwned;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tower::ServiceExt;

fn app_with(service: Arc<LedgerService>, submit_enabled: bool) -> Router {
    let (_handle, token) = CancellationToken::new();
    let config = crate::config::ApiConfig {
        submit_enabled,
        ..Default::default()
    };
    ApiServer::new("127.0.0.1:0".parse().unwrap(), config, service, token).router()
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn post_tx(app: &Router, tx: &Transaction) -> (StatusCode, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/tx")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(tx).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

fn parse<T: DeserializeOwned>(body: &[u8]) -> T {
    serde_json::from_slice(body).unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = app_with(service(), true);
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);

    let health: HealthResponse = parse(&body);
    assert!(health.healthy);
    assert!(!health.paused);
    assert_eq!(health.next_event_seq, 0);
}

#[tokio::test]
async fn test_health_reports_halted_service() {
    let service = service();
    service.store().faults.commits.store(1, Ordering::SeqCst);
    service.store().faults.loads.store(1, Ordering::SeqCst);
    let app = app_with(Arc::clone(&service), true);

    let (status, _) = post_tx(&app, &tx(ADMIN, 1, create_node(OPERATOR, 500))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (_, body) = get(&app, "/health").await;
    let health: HealthResponse = parse(&body);
    assert!(!health.healthy);
    assert_eq!(health.status, "halted");
}

#[tokio::test]
async fn test_submit_and_read_node() {
    let app = app_with(service(), true);
    let (status, body) = post_tx(&app, &tx(ADMIN, 1, create_node(OPERATOR, 500))).await;
    assert_eq!(status, StatusCode::OK);
    let receipt: Receipt = parse(&body);
    assert_eq!(receipt.command, "create_node");
    assert_eq!(receipt.events.len(), 1);

    let (status, body) = get(&app, &format!("/nodes/{}", addr(OPERATOR))).await;
    assert_eq!(status, StatusCode::OK);
    let node: NodeResponse = parse(&body);
    assert_eq!(node.node.tax_rate_basis_points, 500);
    assert_eq!(node.min_tokens_to_stake, Some(1_000 * ONE_TOKEN));

    let (status, body) = get(&app, "/nodes?offset=0&limit=10").await;
    assert_eq!(status, StatusCode::OK);
    let page: NodePageResponse = parse(&body);
    assert_eq!(page.total, 1);
    assert_eq!(page.nodes[0].account, addr(OPERATOR));
}

#[tokio::test]
async fn test_node_with_drained_staking_pool_is_still_readable() {
    let mut config = config();
    config.protocol.user_slash_rate_basis_points = 10_000;
    let store = crate::storage::LedgerStore::in_memory().unwrap();
    let service = Arc::new(LedgerService::initialize(&config, store).unwrap());
    let app = app_with(service, true);

    let node = addr(OPERATOR);
    for (status, _) in [
        post_tx(&app, &tx(ADMIN, 1, create_node(OPERATOR, 500))).await,
        post_tx(&app, &tx(ALICE, 2, Command::Stake { node, amount: 1_000 * ONE_TOKEN })).await,
        post_tx(&app, &tx(OPERATOR, 3, Command::Deposit { node, amount: 1_000 * ONE_TOKEN })).await,
        post_tx(&app, &tx(ORACLE, 4, Command::SlashNodes { node_addrs: vec![node] })).await,
    ] {
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = get(&app, &format!("/nodes/{}", node)).await;
    assert_eq!(status, StatusCode::OK);
    let response: NodeResponse = parse(&body);
    assert_eq!(response.node.staking_pool_tokens, 0);
    assert!(response.node.total_shares > 0);
    assert_eq!(response.min_tokens_to_stake, None);
}

#[tokio::test]
async fn test_stake_then_read_chip_and_unstake() {
    let service = service();
    let app = app_with(service.clone(), true);
    post_tx(&app, &tx(ADMIN, 1, create_node(OPERATOR, 500))).await;

    let stake = tx(ALICE, 2, Command::Stake { node: addr(OPERATOR), amount: 1_000 * ONE_TOKEN });
    let (status, body) = post_tx(&app, &stake).await;
    assert_eq!(status, StatusCode::OK);
    let receipt: Receipt = parse(&body);
    assert!(matches!(receipt.output, CommandOutput::Staked { start_token_id: ChipId(1), .. }));

    let (status, body) = get(&app, "/chips/1").await;
    assert_eq!(status, StatusCode::OK);
    let chip: ChipInfo = parse(&body);
    assert_eq!(chip.owner, addr(ALICE));
    assert_eq!(chip.tokens, 1_000 * ONE_TOKEN);

    let unstake = tx(ALICE, 3, Command::RequestUnstake { node: addr(OPERATOR), chip_ids: vec![ChipId(1)] });
    assert_eq!(post_tx(&app, &unstake).await.0, StatusCode::OK);

    let (status, body) = get(&app, "/unstake/1").await;
    assert_eq!(status, StatusCode::OK);
    let request: UnstakeResponse = parse(&body);
    let period = service.read().await.params().stake_unbonding_period;
    assert_eq!(request.ready_at, 3 + period);
    assert!(!request.request.claimed);

    let (status, body) = get(&app, &format!("/accounts/{}", addr(ALICE))).await;
    assert_eq!(status, StatusCode::OK);
    let account: AccountResponse = parse(&body);
    assert!(account.chips.is_empty());
    assert_eq!(account.unstake_requests.len(), 1);
}

#[tokio::test]
async fn test_ledger_errors_map_to_status_codes() {
    let app = app_with(service(), true);

    let (status, body) = post_tx(&app, &tx(ALICE, 1, Command::Pause)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let error: ErrorBody = parse(&body);
    assert_eq!(error.error, "AccessControlUnauthorizedAccount");

    let (status, body) = post_tx(&app, &tx(ALICE, 1, Command::Stake { node: addr(OPERATOR), amount: 1 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(parse::<ErrorBody>(&body).error, "NodeNotExists");

    let (status, _) = get(&app, "/chips/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get(&app, "/nodes/not-an-address").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(parse::<ErrorBody>(&body).error, "BAD_REQUEST");
}

#[tokio::test]
async fn test_read_only_mode_rejects_submission() {
    let service = service();
    let app = app_with(service.clone(), false);
    let (status, body) = post_tx(&app, &tx(ADMIN, 1, create_node(OPERATOR, 500))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(parse::<ErrorBody>(&body).error, "FORBIDDEN");
    assert_eq!(service.read().await.get_node_count(), 0);
}

#[tokio::test]
async fn test_events_paging_and_filter() {
    let app = app_with(service(), true);
    post_tx(&app, &tx(ADMIN, 1, create_node(OPERATOR, 500))).await;
    post_tx(&app, &tx(ALICE, 2, Command::Transfer { to: addr(BOB), amount: ONE_TOKEN })).await;
    post_tx(&app, &tx(ADMIN, 3, create_node(BOB, 900))).await;

    let (status, body) = get(&app, "/events?from=0&limit=2").await;
    assert_eq!(status, StatusCode::OK);
    let page: EventsResponse = parse(&body);
    assert_eq!(page.events.len(), 2);
    assert_eq!(page.next, 2);

    let (_, body) = get(&app, "/events?kind=NodeCreated").await;
    let page: EventsResponse = parse(&body);
    assert_eq!(page.events.iter().map(|r| r.seq).collect::<Vec<_>>(), vec![0, 2]);
    assert_eq!(page.next, 3);
}

#[tokio::test]
async fn test_epoch_and_pool_views() {
    let app = app_with(service(), true);
    let (status, body) = get(&app, "/epoch").await;
    assert_eq!(status, StatusCode::OK);
    let epoch: EpochResponse = parse(&body);
    assert_eq!(epoch.current_epoch.0, 0);
    assert_eq!(epoch.next_epoch.0, 1);

    let (status, body) = get(&app, "/audit").await;
    assert_eq!(status, StatusCode::OK);
    let report: chipstake_ledger::AuditReport = parse(&body);
    assert!(report.is_consistent());

    let (status, body) = get(&app, "/pool").await;
    assert_eq!(status, StatusCode::OK);
    let pool: chipstake_ledger::PoolInfo = parse(&body);
    assert_eq!(pool.treasury, addr(TREASURY));
}
