use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chipstake_ledger::{ChipInfo, EventRecord, Ledger, Node, UnstakeRequest, WithdrawalRequest};
use chipstake_types::{ChipId, ChipstakeError, EpochNumber, EthAddress, LedgerError, RequestId};
use serde::{Deserialize, Serialize};

pub const API_VERSION: &str = "v1";

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub schema_version: u32,
    pub paused: bool,
    pub next_event_seq: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EpochResponse {
    pub current_epoch: EpochNumber,
    pub next_epoch: EpochNumber,
    pub last_timestamp: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NodePageResponse {
    pub total: usize,
    pub offset: usize,
    pub nodes: Vec<Node>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NodeResponse {
    pub node: Node,
    /// `None` while the staking pool is slashed to zero with shares outstanding.
    pub min_tokens_to_stake: Option<u128>,
}

impl NodeResponse {
    pub fn from_ledger(ledger: &Ledger, account: &EthAddress) -> Result<Self, LedgerError> {
        let node = if account.is_public_pool() {
            ledger.public_pool().clone()
        } else {
            ledger.get_node(account)?.clone()
        };
        let min_tokens_to_stake = match ledger.min_tokens_to_stake(account) {
            Ok(amount) => Some(amount),
            Err(LedgerError::DepositedTokensSlashedAll(_)) => None,
            Err(e) => return Err(e),
        };
        Ok(Self { node, min_tokens_to_stake })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub account: EthAddress,
    pub balance: u128,
    pub is_node: bool,
    pub chips: Vec<ChipInfo>,
    pub unstake_requests: Vec<RequestId>,
    pub withdrawal_requests: Vec<RequestId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnstakeResponse {
    pub request_id: RequestId,
    pub request: UnstakeRequest,
    pub ready_at: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WithdrawalResponse {
    pub request_id: RequestId,
    pub request: WithdrawalRequest,
    pub ready_at: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventsResponse {
    pub from: u64,
    pub next: u64,
    pub events: Vec<EventRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn invalid_address(raw: &str) -> Self {
        ApiError::BadRequest(format!("invalid address: {}", raw))
    }

    pub fn chip(id: u64) -> impl FnOnce(LedgerError) -> ApiError {
        move |e| match e {
            LedgerError::ChipNotExists(_) => ApiError::NotFound(format!("{} does not exist", ChipId(id))),
            other => ApiError::Ledger(other),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Ledger(e) => match e {
                LedgerError::NodeNotExists(_)
                | LedgerError::ChipNotExists(_)
                | LedgerError::ClaimIdNotExists(_) => StatusCode::NOT_FOUND,
                LedgerError::AccessControlUnauthorizedAccount { .. }
                | LedgerError::ChipNotAuthorized(_) => StatusCode::FORBIDDEN,
                LedgerError::EnforcedPause
                | LedgerError::ExpectedPause
                | LedgerError::TimestampRegression { .. } => StatusCode::CONFLICT,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Ledger(e) => e.code(),
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<ChipstakeError> for ApiError {
    fn from(e: ChipstakeError) -> Self {
        match e {
            ChipstakeError::Ledger(e) => ApiError::Ledger(e),
            ChipstakeError::InvalidAddress(msg) | ChipstakeError::InvalidAmount(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.code().to_string(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;
