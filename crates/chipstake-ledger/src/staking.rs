//! Stake, request-unstake and claim-unstake.

use crate::chip::{quote_stake, value_of_shares};
use crate::command::TxContext;
use crate::events::LedgerEvent;
use crate::ledger::Ledger;
use crate::math;
use crate::requests::UnstakeRequest;
use chipstake_types::{ChipId, EthAddress, LedgerError, LedgerResult, RequestId};
use std::collections::BTreeSet;
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct StakeReceipt {
    pub start_token_id: ChipId,
    pub end_token_id: ChipId,
    pub charged: u128,
}

impl Ledger {
    pub(crate) fn stake(&mut self, ctx: &TxContext, node: EthAddress, amount: u128) -> LedgerResult<StakeReceipt> {
        self.require_not_paused()?;
        let target = self.pool(&node)?;
        if target.public_good && !node.is_public_pool() {
            return Err(LedgerError::StakeToPublicGoodNode(node));
        }
        self.stake_into(ctx, node, amount)
    }

    pub(crate) fn stake_to_public_pool(&mut self, ctx: &TxContext, amount: u128) -> LedgerResult<StakeReceipt> {
        self.require_not_paused()?;
        self.stake_into(ctx, EthAddress::public_pool(), amount)
    }

    fn stake_into(&mut self, ctx: &TxContext, node: EthAddress, amount: u128) -> LedgerResult<StakeReceipt> {
        let quote = quote_stake(self.pool(&node)?, amount, &self.params)?;
        self.tokens.ensure_balance(&ctx.sender, quote.cost)?;

        let target = self.pool(&node)?;
        let pool_tokens = math::add(target.staking_pool_tokens, quote.cost)?;
        let total_shares = math::add(target.total_shares, quote.shares)?;

        self.tokens.pull(&ctx.sender, quote.cost)?;
        let target = self.pool_mut(&node)?;
        target.staking_pool_tokens = pool_tokens;
        target.total_shares = total_shares;
        let (start, end) = self
            .chips
            .mint(ctx.sender, node, quote.chips, self.params.shares_per_chip);

        self.emit(LedgerEvent::Staked {
            user: ctx.sender,
            node,
            amount: quote.cost,
            start_token_id: start,
            end_token_id: end,
        });
        info!(
            "{} staked {} into {} for chips {}..={}",
            ctx.sender, quote.cost, node, start, end
        );
        Ok(StakeReceipt {
            start_token_id: start,
            end_token_id: end,
            charged: quote.cost,
        })
    }

    pub(crate) fn request_unstake(
        &mut self,
        ctx: &TxContext,
        node: EthAddress,
        chip_ids: &[ChipId],
    ) -> LedgerResult<(RequestId, u128)> {
        self.require_not_paused()?;
        if chip_ids.is_empty() {
            return Err(LedgerError::BatchSizeZero);
        }
        self.pool(&node)?;
        let burned = self.check_chips(ctx, chip_ids, |chip| {
            if chip.node == node {
                Ok(())
            } else {
                Err(LedgerError::ChipNotValid { token_id: chip.token_id, node })
            }
        })?;
        self.unstake_from(ctx, node, chip_ids, burned)
    }

    pub(crate) fn request_unstake_from_public_pool(
        &mut self,
        ctx: &TxContext,
        chip_ids: &[ChipId],
    ) -> LedgerResult<(RequestId, u128)> {
        self.require_not_paused()?;
        if chip_ids.is_empty() {
            return Err(LedgerError::BatchSizeZero);
        }
        let burned = self.check_chips(ctx, chip_ids, |chip| {
            if chip.node.is_public_pool() {
                Ok(())
            } else {
                Err(LedgerError::NodeNotPublicGood(chip.node))
            }
        })?;
        self.unstake_from(ctx, EthAddress::public_pool(), chip_ids, burned)
    }

    /// Validates ownership and uniqueness of `chip_ids` and returns the sum
    /// of their shares.
    fn check_chips<F>(&self, ctx: &TxContext, chip_ids: &[ChipId], belongs: F) -> LedgerResult<u128>
    where
        F: Fn(&crate::chip::Chip) -> LedgerResult<()>,
    {
        let mut seen = BTreeSet::new();
        let mut burned = 0u128;
        for &id in chip_ids {
            let chip = self.chips.get(id)?;
            if !seen.insert(id) {
                return Err(LedgerError::DuplicateChip(id));
            }
            if chip.owner != ctx.sender {
                return Err(LedgerError::ChipNotAuthorized(id));
            }
            belongs(chip)?;
            burned = math::add(burned, chip.shares)?;
        }
        Ok(burned)
    }

    fn unstake_from(
        &mut self,
        ctx: &TxContext,
        node: EthAddress,
        chip_ids: &[ChipId],
        burned: u128,
    ) -> LedgerResult<(RequestId, u128)> {
        let target = self.pool(&node)?;
        let amount = value_of_shares(target, burned)?;
        let pool_tokens = math::sub(target.staking_pool_tokens, amount)?;
        let total_shares = math::sub(target.total_shares, burned)?;

        for id in chip_ids {
            self.chips.burn(*id);
        }
        let target = self.pool_mut(&node)?;
        target.staking_pool_tokens = pool_tokens;
        target.total_shares = total_shares;

        let request_id = self.unstake_requests.push(UnstakeRequest {
            owner: ctx.sender,
            node_addr: node,
            timestamp: ctx.timestamp,
            unstake_amount: amount,
            claimed: false,
        });
        self.emit(LedgerEvent::UnstakeRequested {
            request_id,
            owner: ctx.sender,
            node,
            chip_ids: chip_ids.to_vec(),
            amount,
        });
        info!(
            "{} requested unstake of {} chips from {} worth {} ({})",
            ctx.sender,
            chip_ids.len(),
            node,
            amount,
            request_id
        );
        Ok((request_id, amount))
    }

    pub(crate) fn claim_unstake(&mut self, ctx: &TxContext, request_ids: &[RequestId]) -> LedgerResult<u128> {
        self.require_not_paused()?;
        let payouts = self
            .unstake_requests
            .validate_claims(request_ids, ctx.timestamp, &self.params)?;
        let total = self
            .tokens
            .pay_all(payouts.iter().map(|(_, owner, amount)| (*owner, *amount)))?;

        for (request_id, owner, amount) in payouts {
            self.unstake_requests.mark_claimed(request_id);
            self.emit(LedgerEvent::UnstakeClaimed { request_id, owner, amount });
            debug!("{} claimed {} for {}", request_id, amount, owner);
        }
        Ok(total)
    }

    pub fn unstake_request(&self, id: RequestId) -> LedgerResult<&UnstakeRequest> {
        self.unstake_requests.get(id)
    }

    pub fn unstake_requests_of(&self, owner: &EthAddress) -> Vec<RequestId> {
        self.unstake_requests.of_owner(owner)
    }
}
