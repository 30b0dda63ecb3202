use chipstake_types::{EthAddress, LedgerError, LedgerResult, RequestId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A time-locked payout waiting out its unbonding period.
pub trait PendingClaim {
    fn owner(&self) -> EthAddress;
    fn amount(&self) -> u128;
    fn claimed(&self) -> bool;
    fn mark_claimed(&mut self);
    /// Earliest timestamp at which the request may be claimed.
    fn ready_at(&self, params: &crate::ProtocolParams) -> u64;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnstakeRequest {
    pub owner: EthAddress,
    pub node_addr: EthAddress,
    pub timestamp: u64,
    pub unstake_amount: u128,
    pub claimed: bool,
}

impl PendingClaim for UnstakeRequest {
    fn owner(&self) -> EthAddress {
        self.owner
    }

    fn amount(&self) -> u128 {
        self.unstake_amount
    }

    fn claimed(&self) -> bool {
        self.claimed
    }

    fn mark_claimed(&mut self) {
        self.claimed = true;
    }

    fn ready_at(&self, params: &crate::ProtocolParams) -> u64 {
        self.timestamp.saturating_add(params.stake_unbonding_period)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub owner: EthAddress,
    /// Fits in 40 bits.
    pub timestamp: u64,
    pub amount: u128,
    pub claimed: bool,
    /// Owner was an alpha node when the request was made.
    pub alpha: bool,
}

impl PendingClaim for WithdrawalRequest {
    fn owner(&self) -> EthAddress {
        self.owner
    }

    fn amount(&self) -> u128 {
        self.amount
    }

    fn claimed(&self) -> bool {
        self.claimed
    }

    fn mark_claimed(&mut self) {
        self.claimed = true;
    }

    fn ready_at(&self, params: &crate::ProtocolParams) -> u64 {
        self.timestamp
            .saturating_add(params.deposit_unbonding_for(self.alpha))
    }
}

/// Requests keyed by a sequential id starting at 1.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestQueue<T> {
    requests: BTreeMap<RequestId, T>,
    next_id: RequestId,
}

impl<T> Default for RequestQueue<T> {
    fn default() -> Self {
        Self {
            requests: BTreeMap::new(),
            next_id: RequestId(1),
        }
    }
}

impl<T: PendingClaim> RequestQueue<T> {
    pub fn get(&self, id: RequestId) -> LedgerResult<&T> {
        self.requests.get(&id).ok_or(LedgerError::ClaimIdNotExists(id))
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn push(&mut self, request: T) -> RequestId {
        let id = self.next_id;
        self.requests.insert(id, request);
        self.next_id = id.next();
        id
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RequestId, &T)> {
        self.requests.iter()
    }

    pub fn of_owner(&self, owner: &EthAddress) -> Vec<RequestId> {
        self.requests
            .iter()
            .filter(|(_, r)| r.owner() == *owner)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Sum of amounts not yet paid out.
    pub fn outstanding(&self) -> LedgerResult<u128> {
        crate::math::sum(
            self.requests
                .values()
                .filter(|r| !r.claimed())
                .map(|r| r.amount()),
        )
    }

    /// Checks every id in the batch and returns `(id, owner, amount)` per
    /// claim. Fails on the first id that cannot be settled at `now`.
    pub fn validate_claims(
        &self,
        ids: &[RequestId],
        now: u64,
        params: &crate::ProtocolParams,
    ) -> LedgerResult<Vec<(RequestId, EthAddress, u128)>> {
        if ids.is_empty() {
            return Err(LedgerError::BatchSizeZero);
        }
        let mut seen = BTreeSet::new();
        let mut payouts = Vec::with_capacity(ids.len());
        for &id in ids {
            let request = self.get(id)?;
            if request.claimed() || !seen.insert(id) {
                return Err(LedgerError::AlreadyClaimed(id));
            }
            let ready_at = request.ready_at(params);
            if now < ready_at {
                return Err(LedgerError::ClaimTimeNotReady { id, ready_at, now });
            }
            payouts.push((id, request.owner(), request.amount()));
        }
        Ok(payouts)
    }

    pub fn mark_claimed(&mut self, id: RequestId) {
        if let Some(request) = self.requests.get_mut(&id) {
            request.mark_claimed();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProtocolParams;

    fn unstake(owner: u64, timestamp: u64, amount: u128) -> UnstakeRequest {
        UnstakeRequest {
            owner: EthAddress::from_low_u64(owner),
            node_addr: EthAddress::from_low_u64(100),
            timestamp,
            unstake_amount: amount,
            claimed: false,
        }
    }

    #[test]
    fn test_ids_start_at_one() {
        let mut queue = RequestQueue::default();
        assert_eq!(queue.push(unstake(1, 0, 10)), RequestId(1));
        assert_eq!(queue.push(unstake(1, 0, 10)), RequestId(2));
        assert_eq!(queue.outstanding().unwrap(), 20);
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let params = ProtocolParams::default();
        let mut queue = RequestQueue::default();
        let id = queue.push(unstake(1, 1_000, 10));
        let ready = 1_000 + params.stake_unbonding_period;

        assert_eq!(
            queue.validate_claims(&[id], ready - 1, &params),
            Err(LedgerError::ClaimTimeNotReady { id, ready_at: ready, now: ready - 1 })
        );
        assert!(queue.validate_claims(&[id], ready, &params).is_ok());
    }

    #[test]
    fn test_duplicate_and_claimed_ids() {
        let params = ProtocolParams::default();
        let mut queue = RequestQueue::default();
        let id = queue.push(unstake(1, 0, 10));
        let later = params.stake_unbonding_period;

        assert_eq!(
            queue.validate_claims(&[id, id], later, &params),
            Err(LedgerError::AlreadyClaimed(id))
        );
        queue.mark_claimed(id);
        assert_eq!(queue.validate_claims(&[id], later, &params), Err(LedgerError::AlreadyClaimed(id)));
        assert_eq!(queue.outstanding().unwrap(), 0);
        assert_eq!(queue.validate_claims(&[], later, &params), Err(LedgerError::BatchSizeZero));
        assert_eq!(
            queue.validate_claims(&[RequestId(42)], later, &params),
            Err(LedgerError::ClaimIdNotExists(RequestId(42)))
        );
    }

    #[test]
    fn test_alpha_withdrawal_uses_relaxed_period() {
        let params = ProtocolParams::default();
        let base = WithdrawalRequest {
            owner: EthAddress::from_low_u64(1),
            timestamp: 0,
            amount: 1,
            claimed: false,
            alpha: false,
        };
        let alpha = WithdrawalRequest { alpha: true, ..base.clone() };
        assert_eq!(base.ready_at(&params), params.deposit_unbonding_period);
        assert_eq!(alpha.ready_at(&params), params.alpha_deposit_unbonding_period);
    }
}
