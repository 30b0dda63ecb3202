use crate::address::EthAddress;
use crate::ids::{ChipId, RequestId};
use crate::role::Role;
use thiserror::Error;

/// A precondition violation. Each variant aborts the transaction that raised
/// it and leaves ledger state untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("account {account} is missing role {role}")]
    AccessControlUnauthorizedAccount { account: EthAddress, role: Role },

    #[error("ledger is paused")]
    EnforcedPause,

    #[error("ledger is not paused")]
    ExpectedPause,

    #[error("cannot create a node for the zero address")]
    CreateNodeToZeroAddress,

    #[error("node {0} already exists")]
    NodeExists(EthAddress),

    #[error("node {0} does not exist")]
    NodeNotExists(EthAddress),

    #[error("node {0} still holds staked or deposited tokens")]
    NodeStakedOrDeposited(EthAddress),

    #[error("tax rate {0}bp exceeds 10000")]
    TaxRateBasisPointsTooLarge(u64),

    #[error("tax rate {rate}bp is below the minimum {min}bp")]
    TaxRateBasisPointsTooSmall { rate: u64, min: u64 },

    #[error("amount is too small")]
    AmountTooSmall,

    #[error("withdrawal of {requested} exceeds available {available}")]
    WithdrawalAmountTooLarge { requested: u128, available: u128 },

    #[error("account {account} has {available}, needs {required}")]
    InsufficientBalance { account: EthAddress, required: u128, available: u128 },

    #[error("node {0} is a public good node and cannot be staked directly")]
    StakeToPublicGoodNode(EthAddress),

    #[error("node {0} is not the public good pool")]
    NodeNotPublicGood(EthAddress),

    #[error("public good pool has no stake to reward")]
    PublicGoodNodeNotStaked,

    #[error("chip {0} does not exist")]
    ChipNotExists(ChipId),

    #[error("caller does not own chip {0}")]
    ChipNotAuthorized(ChipId),

    #[error("chip {token_id} does not belong to node {node}")]
    ChipNotValid { token_id: ChipId, node: EthAddress },

    #[error("chip {0} listed more than once")]
    DuplicateChip(ChipId),

    #[error("stake would mint {requested} chips, limit is {max}")]
    ChipBatchTooLarge { requested: u128, max: u64 },

    #[error("cannot transfer to the zero address")]
    TransferToZeroAddress,

    #[error("request {0} does not exist")]
    ClaimIdNotExists(RequestId),

    #[error("request {0} already claimed")]
    AlreadyClaimed(RequestId),

    #[error("request {id} claimable at {ready_at}, now {now}")]
    ClaimTimeNotReady { id: RequestId, ready_at: u64, now: u64 },

    #[error("batch is empty")]
    BatchSizeZero,

    #[error("parallel arrays have mismatched lengths")]
    InvalidArrayLength,

    #[error("invalid epoch: expected {expected}, got {actual}")]
    InvalidEpoch { expected: u64, actual: u64 },

    #[error("epoch start {start} is after end {end}")]
    InvalidEpochTimestamps { start: u64, end: u64 },

    #[error("reward distribution failed: {0}")]
    RewardDistributionFailed(String),

    #[error("node list is empty")]
    EmptyNodeList,

    #[error("deposited tokens of node {0} are already slashed in full")]
    DepositedTokensSlashedAll(EthAddress),

    #[error("timestamp {now} precedes last applied timestamp {last}")]
    TimestampRegression { last: u64, now: u64 },

    #[error("timestamp {0} does not fit in 40 bits")]
    TimestampOverflow(u64),

    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    #[error("invalid protocol parameters: {0}")]
    InvalidParams(String),
}

impl LedgerError {
    /// The contract-style error name, stable across message wording changes.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::AccessControlUnauthorizedAccount { .. } => "AccessControlUnauthorizedAccount",
            LedgerError::EnforcedPause => "EnforcedPause",
            LedgerError::ExpectedPause => "ExpectedPause",
            LedgerError::CreateNodeToZeroAddress => "CreateNodeToZeroAddress",
            LedgerError::NodeExists(_) => "NodeExists",
            LedgerError::NodeNotExists(_) => "NodeNotExists",
            LedgerError::NodeStakedOrDeposited(_) => "NodeStakedOrDeposited",
            LedgerError::TaxRateBasisPointsTooLarge(_) => "TaxRateBasisPointsTooLarge",
            LedgerError::TaxRateBasisPointsTooSmall { .. } => "TaxRateBasisPointsTooSmall",
            LedgerError::AmountTooSmall => "AmountTooSmall",
            LedgerError::WithdrawalAmountTooLarge { .. } => "WithdrawalAmountTooLarge",
            LedgerError::InsufficientBalance { .. } => "InsufficientBalance",
            LedgerError::StakeToPublicGoodNode(_) => "StakeToPublicGoodNode",
            LedgerError::NodeNotPublicGood(_) => "NodeNotPublicGood",
            LedgerError::PublicGoodNodeNotStaked => "PublicGoodNodeNotStaked",
            LedgerError::ChipNotExists(_) => "ChipNotExists",
            LedgerError::ChipNotAuthorized(_) => "ChipNotAuthorized",
            LedgerError::ChipNotValid { .. } => "ChipNotValid",
            LedgerError::DuplicateChip(_) => "DuplicateChip",
            LedgerError::ChipBatchTooLarge { .. } => "ChipBatchTooLarge",
            LedgerError::TransferToZeroAddress => "TransferToZeroAddress",
            LedgerError::ClaimIdNotExists(_) => "ClaimIdNotExists",
            LedgerError::AlreadyClaimed(_) => "AlreadyClaimed",
            LedgerError::ClaimTimeNotReady { .. } => "ClaimTimeNotReady",
            LedgerError::BatchSizeZero => "BatchSizeZero",
            LedgerError::InvalidArrayLength => "InvalidArrayLength",
            LedgerError::InvalidEpoch { .. } => "InvalidEpoch",
            LedgerError::InvalidEpochTimestamps { .. } => "InvalidEpochTimestamps",
            LedgerError::RewardDistributionFailed(_) => "RewardDistributionFailed",
            LedgerError::EmptyNodeList => "EmptyNodeList",
            LedgerError::DepositedTokensSlashedAll(_) => "DepositedTokensSlashedAll",
            LedgerError::TimestampRegression { .. } => "TimestampRegression",
            LedgerError::TimestampOverflow(_) => "TimestampOverflow",
            LedgerError::ArithmeticOverflow => "ArithmeticOverflow",
            LedgerError::InvalidParams(_) => "InvalidParams",
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Error, Debug)]
pub enum ChipstakeError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ChipstakeResult<T> = Result<T, ChipstakeError>;
