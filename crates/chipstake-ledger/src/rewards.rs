//! Epoch-gated reward distribution.

use crate::command::TxContext;
use crate::events::LedgerEvent;
use crate::ledger::Ledger;
use crate::math;
use chipstake_types::{BasisPoints, EpochNumber, EthAddress, LedgerError, LedgerResult, Role};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// One oracle report. `epoch_info` is `[epoch, start_timestamp, end_timestamp]`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardBatch {
    pub epoch_info: [u64; 3],
    pub node_addrs: Vec<EthAddress>,
    pub request_counts: Vec<u64>,
    pub operation_rewards: Vec<u128>,
    pub staking_rewards: Vec<u128>,
    pub public_pool_reward: u128,
}

/// Per-node credits, computed before anything is written.
struct StagedCredit {
    node: EthAddress,
    operation_pool: u128,
    staking_pool: u128,
    tax: u128,
}

fn overflow(what: &str) -> LedgerError {
    LedgerError::RewardDistributionFailed(format!("{} overflow", what))
}

fn checked_add(a: u128, b: u128, what: &str) -> LedgerResult<u128> {
    a.checked_add(b).ok_or_else(|| overflow(what))
}

fn split(rate: BasisPoints, gross: u128, what: &str) -> LedgerResult<(u128, u128)> {
    math::split_rate(rate, gross).map_err(|_| overflow(what))
}

impl Ledger {
    pub(crate) fn distribute_rewards(&mut self, ctx: &TxContext, batch: &RewardBatch) -> LedgerResult<EpochNumber> {
        self.roles.require(Role::Oracle, &ctx.sender)?;
        self.require_not_paused()?;

        let [epoch, start, end] = batch.epoch_info;
        let expected = self.current_epoch.next();
        if epoch != expected.0 {
            return Err(LedgerError::InvalidEpoch {
                expected: expected.0,
                actual: epoch,
            });
        }
        if start > end {
            return Err(LedgerError::InvalidEpochTimestamps { start, end });
        }
        let n = batch.node_addrs.len();
        if batch.request_counts.len() != n
            || batch.operation_rewards.len() != n
            || batch.staking_rewards.len() != n
        {
            return Err(LedgerError::InvalidArrayLength);
        }

        let mut seen = BTreeSet::new();
        let mut staged = Vec::with_capacity(n);
        let mut credit_total = 0u128;
        let mut tax_total = 0u128;
        for i in 0..n {
            let addr = batch.node_addrs[i];
            if !seen.insert(addr) {
                return Err(LedgerError::RewardDistributionFailed(format!(
                    "node {} listed more than once",
                    addr
                )));
            }
            let node = self.registry.get(&addr)?;
            let rate = node.tax_rate();
            let (op_tax, op_credit) = split(rate, batch.operation_rewards[i], "operation reward")?;
            let (st_tax, st_credit) = split(rate, batch.staking_rewards[i], "staking reward")?;

            // With no stakers the staking reward has no owner; it goes to the operator.
            let (op_credit, st_credit) = if node.total_shares == 0 {
                (checked_add(op_credit, st_credit, "operation pool")?, 0)
            } else {
                (op_credit, st_credit)
            };
            let tax = checked_add(op_tax, st_tax, "tax")?;
            credit_total = checked_add(credit_total, checked_add(op_credit, st_credit, "credit")?, "credit")?;
            tax_total = checked_add(tax_total, tax, "tax")?;
            staged.push(StagedCredit {
                node: addr,
                operation_pool: checked_add(node.operation_pool_tokens, op_credit, "operation pool")?,
                staking_pool: checked_add(node.staking_pool_tokens, st_credit, "staking pool")?,
                tax,
            });
        }

        let public_reward = batch.public_pool_reward;
        if public_reward > 0 && self.public_pool.total_shares == 0 {
            return Err(LedgerError::PublicGoodNodeNotStaked);
        }
        let (public_tax, public_credit) = split(self.public_pool.tax_rate(), public_reward, "public pool reward")?;
        let public_pool_tokens = checked_add(self.public_pool.staking_pool_tokens, public_credit, "public pool")?;
        credit_total = checked_add(credit_total, public_credit, "credit")?;
        tax_total = checked_add(tax_total, public_tax, "tax")?;

        self.tokens
            .mint(credit_total, tax_total)
            .map_err(|_| overflow("token supply"))?;

        let mut tax_amounts = Vec::with_capacity(n);
        for credit in staged {
            let node = self.registry.get_mut(&credit.node)?;
            node.operation_pool_tokens = credit.operation_pool;
            node.staking_pool_tokens = credit.staking_pool;
            tax_amounts.push(credit.tax);
        }
        self.public_pool.staking_pool_tokens = public_pool_tokens;
        self.current_epoch = expected;

        self.emit(LedgerEvent::RewardDistributed {
            epoch: expected,
            start_timestamp: start,
            end_timestamp: end,
            nodes: batch.node_addrs.clone(),
            request_counts: batch.request_counts.clone(),
            operation_rewards: batch.operation_rewards.clone(),
            staking_rewards: batch.staking_rewards.clone(),
            tax_amounts,
        });
        self.emit(LedgerEvent::PublicGoodRewardDistributed {
            epoch: expected,
            reward: public_reward,
            tax: public_tax,
        });

        info!(
            "{} distributed to {} nodes: credited {}, taxed {}",
            expected, n, credit_total, tax_total
        );
        debug!("Public pool received {} (tax {})", public_credit, public_tax);
        Ok(expected)
    }

    pub fn current_epoch(&self) -> EpochNumber {
        self.current_epoch
    }
}
