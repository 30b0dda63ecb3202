use super::responses::*;
use super::server::ApiState;
use crate::supervisor::{EventFollower, DEFAULT_FOLLOW_CAPACITY};
use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use chipstake_ledger::requests::PendingClaim;
use chipstake_ledger::{AuditReport, ChipInfo, EventFilter, PoolInfo, Receipt, Transaction};
use chipstake_types::{ChipId, EthAddress, RequestId};
use futures::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

type SharedState = State<Arc<ApiState>>;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub from: Option<u64>,
    pub limit: Option<usize>,
    /// Comma separated event names.
    pub kind: Option<String>,
}

impl EventsQuery {
    fn filter(&self) -> EventFilter {
        let mut filter = EventFilter::default();
        if let Some(kinds) = &self.kind {
            for kind in kinds.split(',').map(str::trim).filter(|k| !k.is_empty()) {
                filter = filter.kind(kind);
            }
        }
        filter
    }
}

fn parse_address(raw: &str) -> Result<EthAddress, ApiError> {
    raw.parse().map_err(|_| ApiError::invalid_address(raw))
}

pub async fn health(State(state): SharedState) -> ApiResult<HealthResponse> {
    let ledger = state.service.read().await;
    let halted = state.service.is_halted();
    Ok(Json(HealthResponse {
        healthy: !halted,
        status: if halted { "halted" } else { "ok" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started.elapsed().as_secs(),
        schema_version: state.service.store().schema_version()?,
        paused: ledger.is_paused(),
        next_event_seq: ledger.events().next_seq(),
    }))
}

pub async fn epoch(State(state): SharedState) -> ApiResult<EpochResponse> {
    let ledger = state.service.read().await;
    let current = ledger.current_epoch();
    Ok(Json(EpochResponse {
        current_epoch: current,
        next_epoch: current.next(),
        last_timestamp: ledger.last_timestamp(),
    }))
}

pub async fn pool(State(state): SharedState) -> ApiResult<PoolInfo> {
    Ok(Json(state.service.read().await.pool_info()))
}

pub async fn audit(State(state): SharedState) -> ApiResult<AuditReport> {
    Ok(Json(state.service.read().await.audit()?))
}

pub async fn list_nodes(State(state): SharedState, Query(page): Query<PageQuery>) -> ApiResult<NodePageResponse> {
    let offset = page.offset.unwrap_or(0);
    let limit = state.config.node_page(page.limit);
    let ledger = state.service.read().await;
    Ok(Json(NodePageResponse {
        total: ledger.get_node_count(),
        offset,
        nodes: ledger
            .get_nodes_with_pagination(offset, limit)
            .into_iter()
            .cloned()
            .collect(),
    }))
}

pub async fn get_node(State(state): SharedState, Path(raw): Path<String>) -> ApiResult<NodeResponse> {
    let account = parse_address(&raw)?;
    let ledger = state.service.read().await;
    Ok(Json(NodeResponse::from_ledger(&ledger, &account)?))
}

pub async fn get_account(State(state): SharedState, Path(raw): Path<String>) -> ApiResult<AccountResponse> {
    let account = parse_address(&raw)?;
    let ledger = state.service.read().await;
    let chips = ledger
        .chips_of(&account)
        .into_iter()
        .map(|id| ledger.get_chips_info(id))
        .collect::<Result<Vec<ChipInfo>, _>>()?;
    Ok(Json(AccountResponse {
        account,
        balance: ledger.balance_of(&account),
        is_node: ledger.get_node(&account).is_ok(),
        chips,
        unstake_requests: ledger.unstake_requests_of(&account),
        withdrawal_requests: ledger.withdrawal_requests_of(&account),
    }))
}

pub async fn get_chip(State(state): SharedState, Path(id): Path<u64>) -> ApiResult<ChipInfo> {
    let ledger = state.service.read().await;
    let info = ledger.get_chips_info(ChipId(id)).map_err(ApiError::chip(id))?;
    Ok(Json(info))
}

pub async fn get_unstake(State(state): SharedState, Path(id): Path<u64>) -> ApiResult<UnstakeResponse> {
    let ledger = state.service.read().await;
    let request = ledger.unstake_request(RequestId(id))?.clone();
    Ok(Json(UnstakeResponse {
        request_id: RequestId(id),
        ready_at: request.ready_at(ledger.params()),
        request,
    }))
}

pub async fn get_withdrawal(State(state): SharedState, Path(id): Path<u64>) -> ApiResult<WithdrawalResponse> {
    let ledger = state.service.read().await;
    let request = ledger.withdrawal_request(RequestId(id))?.clone();
    Ok(Json(WithdrawalResponse {
        request_id: RequestId(id),
        ready_at: request.ready_at(ledger.params()),
        request,
    }))
}

pub async fn list_events(State(state): SharedState, Query(query): Query<EventsQuery>) -> ApiResult<EventsResponse> {
    let from = query.from.unwrap_or(0);
    let limit = state.config.event_page(query.limit);
    let filter = query.filter();
    let ledger = state.service.read().await;

    let events: Vec<_> = ledger
        .filter_events(&filter, from, limit)
        .into_iter()
        .cloned()
        .collect();
    let next = events
        .last()
        .map(|r| r.seq + 1)
        .unwrap_or_else(|| from.max(ledger.events().next_seq()));

    Ok(Json(EventsResponse { from, next, events }))
}

/// Server-sent events tail of the log, starting at `from`.
pub async fn stream_events(
    State(state): SharedState,
    Query(query): Query<EventsQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let from = query.from.unwrap_or(0);
    debug!("Event stream opened at seq {}", from);

    let follower = EventFollower::new(Arc::clone(&state.service), from)
        .with_filter(query.filter())
        .with_batch(state.config.max_event_page);
    let (rx, _task) = follower.spawn(DEFAULT_FOLLOW_CAPACITY, state.cancel.clone());

    let stream = futures::stream::unfold(rx, |mut rx| async move {
        let record = rx.recv().await?;
        let event = Event::default()
            .id(record.seq.to_string())
            .event(record.event.name())
            .json_data(&record)
            .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()));
        Some((Ok(event), rx))
    });

    let keep_alive = KeepAlive::new().interval(Duration::from_secs(state.config.stream_keep_alive_secs));
    Sse::new(stream).keep_alive(keep_alive)
}

pub async fn submit_tx(State(state): SharedState, Json(tx): Json<Transaction>) -> ApiResult<Receipt> {
    if !state.config.submit_enabled {
        return Err(ApiError::Forbidden("transaction submission is disabled".into()));
    }
    let command = tx.command.name();
    let sender = tx.sender;
    let receipt = state.service.submit(tx).await?;
    info!("Accepted {} from {} ({} events)", command, sender, receipt.events.len());
    Ok(Json(receipt))
}
