//! Typed transaction dispatch.

use crate::events::EventRecord;
use crate::ledger::Ledger;
use crate::node::NewNode;
use crate::rewards::RewardBatch;
use chipstake_types::{ChipId, EpochNumber, EthAddress, LedgerError, LedgerResult, NodeId, RequestId, Role};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Who submits a transaction and when it executes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxContext {
    pub sender: EthAddress,
    pub timestamp: u64,
}

impl TxContext {
    pub fn new(sender: EthAddress, timestamp: u64) -> Self {
        Self { sender, timestamp }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    CreateNode(NewNode),
    DeleteNode { account: EthAddress },
    SetTaxRateBasisPoints4Node { account: EthAddress, tax_rate_basis_points: u64 },
    SetTaxRateBasisPoints4PublicPool { tax_rate_basis_points: u64 },
    Deposit { node: EthAddress, amount: u128 },
    Stake { node: EthAddress, amount: u128 },
    StakeToPublicPool { amount: u128 },
    TransferChip { to: EthAddress, token_id: ChipId },
    RequestUnstake { node: EthAddress, chip_ids: Vec<ChipId> },
    RequestUnstakeFromPublicPool { chip_ids: Vec<ChipId> },
    ClaimUnstake { request_ids: Vec<RequestId> },
    RequestWithdrawal { amount: u128 },
    ClaimWithdrawal { request_ids: Vec<RequestId> },
    DistributeRewards(RewardBatch),
    SlashNodes { node_addrs: Vec<EthAddress> },
    Pause,
    Unpause,
    GrantRole { role: Role, account: EthAddress },
    RevokeRole { role: Role, account: EthAddress },
    Transfer { to: EthAddress, amount: u128 },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateNode(_) => "create_node",
            Command::DeleteNode { .. } => "delete_node",
            Command::SetTaxRateBasisPoints4Node { .. } => "set_tax_rate_basis_points_4_node",
            Command::SetTaxRateBasisPoints4PublicPool { .. } => "set_tax_rate_basis_points_4_public_pool",
            Command::Deposit { .. } => "deposit",
            Command::Stake { .. } => "stake",
            Command::StakeToPublicPool { .. } => "stake_to_public_pool",
            Command::TransferChip { .. } => "transfer_chip",
            Command::RequestUnstake { .. } => "request_unstake",
            Command::RequestUnstakeFromPublicPool { .. } => "request_unstake_from_public_pool",
            Command::ClaimUnstake { .. } => "claim_unstake",
            Command::RequestWithdrawal { .. } => "request_withdrawal",
            Command::ClaimWithdrawal { .. } => "claim_withdrawal",
            Command::DistributeRewards(_) => "distribute_rewards",
            Command::SlashNodes { .. } => "slash_nodes",
            Command::Pause => "pause",
            Command::Unpause => "unpause",
            Command::GrantRole { .. } => "grant_role",
            Command::RevokeRole { .. } => "revoke_role",
            Command::Transfer { .. } => "transfer",
        }
    }
}

/// A command bound to its context, as submitted from files or the API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: EthAddress,
    pub timestamp: u64,
    pub command: Command,
}

impl Transaction {
    pub fn context(&self) -> TxContext {
        TxContext::new(self.sender, self.timestamp)
    }
}

/// Value returned by a successful command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandOutput {
    None,
    NodeCreated { node_id: NodeId },
    Staked { start_token_id: ChipId, end_token_id: ChipId, charged: u128 },
    UnstakeRequested { request_id: RequestId, amount: u128 },
    WithdrawalRequested { request_id: RequestId },
    Claimed { total: u128 },
    RewardsDistributed { epoch: EpochNumber },
    Slashed { total: u128 },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub command: String,
    pub output: CommandOutput,
    pub events: Vec<EventRecord>,
}

impl Ledger {
    /// Applies one command atomically. On error nothing is written and no
    /// event is logged.
    pub fn apply(&mut self, ctx: &TxContext, command: Command) -> LedgerResult<Receipt> {
        if ctx.timestamp < self.last_timestamp {
            return Err(LedgerError::TimestampRegression {
                last: self.last_timestamp,
                now: ctx.timestamp,
            });
        }
        let name = command.name();
        debug!("Applying {} from {} at {}", name, ctx.sender, ctx.timestamp);

        match self.dispatch(ctx, command) {
            Ok(output) => {
                self.last_timestamp = ctx.timestamp;
                let events = self.flush_events(ctx);
                Ok(Receipt {
                    command: name.to_string(),
                    output,
                    events,
                })
            }
            Err(e) => {
                self.discard_events();
                warn!("{} from {} rejected: {}", name, ctx.sender, e);
                Err(e)
            }
        }
    }

    pub fn apply_transaction(&mut self, tx: Transaction) -> LedgerResult<Receipt> {
        let ctx = tx.context();
        self.apply(&ctx, tx.command)
    }

    fn dispatch(&mut self, ctx: &TxContext, command: Command) -> LedgerResult<CommandOutput> {
        let output = match command {
            Command::CreateNode(new) => CommandOutput::NodeCreated {
                node_id: self.create_node(ctx, new)?,
            },
            Command::DeleteNode { account } => {
                self.delete_node(ctx, account)?;
                CommandOutput::None
            }
            Command::SetTaxRateBasisPoints4Node { account, tax_rate_basis_points } => {
                self.set_node_tax_rate(ctx, account, tax_rate_basis_points)?;
                CommandOutput::None
            }
            Command::SetTaxRateBasisPoints4PublicPool { tax_rate_basis_points } => {
                self.set_public_pool_tax_rate(ctx, tax_rate_basis_points)?;
                CommandOutput::None
            }
            Command::Deposit { node, amount } => {
                self.deposit(ctx, node, amount)?;
                CommandOutput::None
            }
            Command::Stake { node, amount } => {
                let r = self.stake(ctx, node, amount)?;
                CommandOutput::Staked {
                    start_token_id: r.start_token_id,
                    end_token_id: r.end_token_id,
                    charged: r.charged,
                }
            }
            Command::StakeToPublicPool { amount } => {
                let r = self.stake_to_public_pool(ctx, amount)?;
                CommandOutput::Staked {
                    start_token_id: r.start_token_id,
                    end_token_id: r.end_token_id,
                    charged: r.charged,
                }
            }
            Command::TransferChip { to, token_id } => {
                self.transfer_chip(ctx, to, token_id)?;
                CommandOutput::None
            }
            Command::RequestUnstake { node, chip_ids } => {
                let (request_id, amount) = self.request_unstake(ctx, node, &chip_ids)?;
                CommandOutput::UnstakeRequested { request_id, amount }
            }
            Command::RequestUnstakeFromPublicPool { chip_ids } => {
                let (request_id, amount) = self.request_unstake_from_public_pool(ctx, &chip_ids)?;
                CommandOutput::UnstakeRequested { request_id, amount }
            }
            Command::ClaimUnstake { request_ids } => CommandOutput::Claimed {
                total: self.claim_unstake(ctx, &request_ids)?,
            },
            Command::RequestWithdrawal { amount } => CommandOutput::WithdrawalRequested {
                request_id: self.request_withdrawal(ctx, amount)?,
            },
            Command::ClaimWithdrawal { request_ids } => CommandOutput::Claimed {
                total: self.claim_withdrawal(ctx, &request_ids)?,
            },
            Command::DistributeRewards(batch) => CommandOutput::RewardsDistributed {
                epoch: self.distribute_rewards(ctx, &batch)?,
            },
            Command::SlashNodes { node_addrs } => {
                let outcomes = self.slash_nodes(ctx, &node_addrs)?;
                let total = outcomes
                    .iter()
                    .map(|o| o.operation_pool + o.staking_pool)
                    .sum();
                CommandOutput::Slashed { total }
            }
            Command::Pause => {
                self.pause(ctx)?;
                CommandOutput::None
            }
            Command::Unpause => {
                self.unpause(ctx)?;
                CommandOutput::None
            }
            Command::GrantRole { role, account } => {
                self.grant_role(ctx, role, account)?;
                CommandOutput::None
            }
            Command::RevokeRole { role, account } => {
                self.revoke_role(ctx, role, account)?;
                CommandOutput::None
            }
            Command::Transfer { to, amount } => {
                self.transfer(ctx, to, amount)?;
                CommandOutput::None
            }
        };
        Ok(output)
    }
}
