//! Operation pool deposits and time-locked withdrawals.

use crate::command::TxContext;
use crate::events::LedgerEvent;
use crate::ledger::Ledger;
use crate::math;
use crate::requests::WithdrawalRequest;
use chipstake_types::{EthAddress, LedgerError, LedgerResult, RequestId, MAX_TIMESTAMP_40};
use tracing::{debug, info};

impl Ledger {
    /// Funds `node`'s operation pool from the sender's balance.
    pub(crate) fn deposit(&mut self, ctx: &TxContext, node: EthAddress, amount: u128) -> LedgerResult<()> {
        self.require_not_paused()?;
        if amount == 0 {
            return Err(LedgerError::AmountTooSmall);
        }
        let target = self.registry.get(&node)?;
        let operation_pool = math::add(target.operation_pool_tokens, amount)?;

        self.tokens.pull(&ctx.sender, amount)?;
        self.registry.get_mut(&node)?.operation_pool_tokens = operation_pool;
        self.emit(LedgerEvent::Deposited {
            node,
            from: ctx.sender,
            amount,
        });
        info!("{} deposited {} into operation pool of {}", ctx.sender, amount, node);
        Ok(())
    }

    pub(crate) fn request_withdrawal(&mut self, ctx: &TxContext, amount: u128) -> LedgerResult<RequestId> {
        self.require_not_paused()?;
        let node = self.registry.get(&ctx.sender)?;
        if amount == 0 {
            return Err(LedgerError::AmountTooSmall);
        }
        if amount > node.operation_pool_tokens {
            return Err(LedgerError::WithdrawalAmountTooLarge {
                requested: amount,
                available: node.operation_pool_tokens,
            });
        }
        if ctx.timestamp > MAX_TIMESTAMP_40 {
            return Err(LedgerError::TimestampOverflow(ctx.timestamp));
        }
        let alpha = node.alpha;

        let node = self.registry.get_mut(&ctx.sender)?;
        node.operation_pool_tokens -= amount;
        let request_id = self.withdrawal_requests.push(WithdrawalRequest {
            owner: ctx.sender,
            timestamp: ctx.timestamp,
            amount,
            claimed: false,
            alpha,
        });
        self.emit(LedgerEvent::WithdrawRequested {
            request_id,
            node: ctx.sender,
            amount,
        });
        info!("{} requested withdrawal of {} ({})", ctx.sender, amount, request_id);
        Ok(request_id)
    }

    pub(crate) fn claim_withdrawal(&mut self, ctx: &TxContext, request_ids: &[RequestId]) -> LedgerResult<u128> {
        self.require_not_paused()?;
        let payouts = self
            .withdrawal_requests
            .validate_claims(request_ids, ctx.timestamp, &self.params)?;
        let total = self
            .tokens
            .pay_all(payouts.iter().map(|(_, owner, amount)| (*owner, *amount)))?;

        for (request_id, owner, amount) in payouts {
            self.withdrawal_requests.mark_claimed(request_id);
            self.emit(LedgerEvent::WithdrawalClaimed { request_id, owner, amount });
            debug!("{} claimed {} for {}", request_id, amount, owner);
        }
        Ok(total)
    }

    pub fn withdrawal_request(&self, id: RequestId) -> LedgerResult<&WithdrawalRequest> {
        self.withdrawal_requests.get(id)
    }

    pub fn withdrawal_requests_of(&self, owner: &EthAddress) -> Vec<RequestId> {
        self.withdrawal_requests.of_owner(owner)
    }
}
