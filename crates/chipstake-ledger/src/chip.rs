//! Chips and the share/token exchange rate of a node pool.
//!
//! All conversions round in favour of the pool:
//!
//! * shares issued for a deposit: `floor(amount * total_shares / pool)`, or
//!   `amount * stake_ratio` while the pool has no shares;
//! * tokens charged for minted shares: `ceil(shares * pool / total_shares)`,
//!   or `ceil(shares / stake_ratio)` for an empty pool;
//! * tokens paid for burned shares: `floor(shares * pool / total_shares)`.

use crate::command::TxContext;
use crate::events::LedgerEvent;
use crate::ledger::Ledger;
use crate::math;
use crate::node::Node;
use crate::params::ProtocolParams;
use chipstake_types::{ChipId, EthAddress, LedgerError, LedgerResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chip {
    pub token_id: ChipId,
    pub owner: EthAddress,
    pub node: EthAddress,
    pub shares: u128,
}

/// Current backing of a chip.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipInfo {
    pub token_id: ChipId,
    pub owner: EthAddress,
    pub node_addr: EthAddress,
    pub shares: u128,
    pub tokens: u128,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChipLedger {
    chips: BTreeMap<ChipId, Chip>,
    next_id: ChipId,
}

impl Default for ChipLedger {
    fn default() -> Self {
        Self {
            chips: BTreeMap::new(),
            next_id: ChipId(1),
        }
    }
}

impl ChipLedger {
    pub fn get(&self, id: ChipId) -> LedgerResult<&Chip> {
        self.chips.get(&id).ok_or(LedgerError::ChipNotExists(id))
    }

    pub fn len(&self) -> usize {
        self.chips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chips.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chip> {
        self.chips.values()
    }

    /// Mints `count` chips and returns the inclusive id range.
    pub(crate) fn mint(
        &mut self,
        owner: EthAddress,
        node: EthAddress,
        count: u64,
        shares_per_chip: u128,
    ) -> (ChipId, ChipId) {
        let start = self.next_id;
        for offset in 0..count {
            let token_id = ChipId(start.0 + offset);
            self.chips.insert(
                token_id,
                Chip {
                    token_id,
                    owner,
                    node,
                    shares: shares_per_chip,
                },
            );
        }
        self.next_id = ChipId(start.0 + count);
        (start, ChipId(start.0 + count - 1))
    }

    pub(crate) fn burn(&mut self, id: ChipId) -> Option<Chip> {
        self.chips.remove(&id)
    }

    pub(crate) fn set_owner(&mut self, id: ChipId, owner: EthAddress) {
        if let Some(chip) = self.chips.get_mut(&id) {
            chip.owner = owner;
        }
    }
}

/// Outcome of converting a stake amount into whole chips.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StakeQuote {
    pub chips: u64,
    pub shares: u128,
    pub cost: u128,
}

fn ensure_backed(node: &Node) -> LedgerResult<()> {
    if node.total_shares > 0 && node.staking_pool_tokens == 0 {
        return Err(LedgerError::DepositedTokensSlashedAll(node.account));
    }
    Ok(())
}

/// Tokens required to mint `shares` new shares in `node`'s pool.
pub fn cost_of_shares(node: &Node, shares: u128, params: &ProtocolParams) -> LedgerResult<u128> {
    ensure_backed(node)?;
    if node.total_shares == 0 {
        math::div_ceil(shares, params.stake_ratio)
    } else {
        math::mul_div_ceil(shares, node.staking_pool_tokens, node.total_shares)
    }
}

/// Tokens paid out for burning `shares` from `node`'s pool.
pub fn value_of_shares(node: &Node, shares: u128) -> LedgerResult<u128> {
    if node.total_shares == 0 {
        return Ok(0);
    }
    math::mul_div_floor(shares, node.staking_pool_tokens, node.total_shares)
}

pub fn quote_stake(node: &Node, amount: u128, params: &ProtocolParams) -> LedgerResult<StakeQuote> {
    if amount == 0 {
        return Err(LedgerError::AmountTooSmall);
    }
    ensure_backed(node)?;
    let raw_shares = if node.total_shares == 0 {
        amount
            .checked_mul(params.stake_ratio)
            .ok_or(LedgerError::ArithmeticOverflow)?
    } else {
        math::mul_div_floor(amount, node.total_shares, node.staking_pool_tokens)?
    };

    let chips = raw_shares / params.shares_per_chip;
    if chips == 0 {
        return Err(LedgerError::AmountTooSmall);
    }
    if chips > params.max_chips_per_stake as u128 {
        return Err(LedgerError::ChipBatchTooLarge {
            requested: chips,
            max: params.max_chips_per_stake,
        });
    }
    let shares = chips * params.shares_per_chip;
    let cost = cost_of_shares(node, shares, params)?;
    Ok(StakeQuote {
        chips: chips as u64,
        shares,
        cost,
    })
}

impl Ledger {
    pub(crate) fn transfer_chip(&mut self, ctx: &TxContext, to: EthAddress, token_id: ChipId) -> LedgerResult<()> {
        self.require_not_paused()?;
        let chip = self.chips.get(token_id)?;
        if chip.owner != ctx.sender {
            return Err(LedgerError::ChipNotAuthorized(token_id));
        }
        if to.is_zero() {
            return Err(LedgerError::TransferToZeroAddress);
        }

        self.chips.set_owner(token_id, to);
        self.emit(LedgerEvent::ChipTransferred {
            from: ctx.sender,
            to,
            token_id,
        });
        debug!("{} transferred from {} to {}", token_id, ctx.sender, to);
        Ok(())
    }

    pub fn get_chips_info(&self, token_id: ChipId) -> LedgerResult<ChipInfo> {
        let chip = self.chips.get(token_id)?;
        let node = self.pool(&chip.node)?;
        Ok(ChipInfo {
            token_id,
            owner: chip.owner,
            node_addr: chip.node,
            shares: chip.shares,
            tokens: value_of_shares(node, chip.shares)?,
        })
    }

    pub fn owner_of(&self, token_id: ChipId) -> LedgerResult<EthAddress> {
        Ok(self.chips.get(token_id)?.owner)
    }

    pub fn chips_of(&self, owner: &EthAddress) -> Vec<ChipId> {
        self.chips
            .iter()
            .filter(|c| c.owner == *owner)
            .map(|c| c.token_id)
            .collect()
    }

    /// Tokens needed to mint exactly one chip in `node`'s pool.
    pub fn min_tokens_to_stake(&self, node: &EthAddress) -> LedgerResult<u128> {
        let pool = self.pool(node)?;
        cost_of_shares(pool, self.params.shares_per_chip, &self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chipstake_types::ONE_TOKEN;

    fn pool(tokens: u128, shares: u128) -> Node {
        let mut node = Node::public_pool(0);
        node.staking_pool_tokens = tokens;
        node.total_shares = shares;
        node
    }

    #[test]
    fn test_first_stake_uses_stake_ratio() {
        let params = ProtocolParams::default();
        let quote = quote_stake(&pool(0, 0), 1000 * ONE_TOKEN, &params).unwrap();
        assert_eq!(quote.chips, 1);
        assert_eq!(quote.shares, params.shares_per_chip);
        assert_eq!(quote.cost, 1000 * ONE_TOKEN);
    }

    #[test]
    fn test_partial_chip_is_not_charged() {
        let params = ProtocolParams::default();
        let quote = quote_stake(&pool(0, 0), 2500 * ONE_TOKEN, &params).unwrap();
        assert_eq!(quote.chips, 2);
        assert_eq!(quote.cost, 2000 * ONE_TOKEN);
    }

    #[test]
    fn test_cost_rounds_up_after_growth() {
        let params = ProtocolParams { shares_per_chip: 3, ..Default::default() };
        // 3 shares backed by 10 tokens: one chip costs ceil(3 * 10 / 3) = 10.
        let grown = pool(10, 3);
        assert_eq!(cost_of_shares(&grown, 3, &params).unwrap(), 10);
        // 7 shares backed by 10 tokens: ceil(3 * 10 / 7) = 5.
        let odd = pool(10, 7);
        assert_eq!(cost_of_shares(&odd, 3, &params).unwrap(), 5);
        assert_eq!(value_of_shares(&odd, 3).unwrap(), 4);
    }

    #[test]
    fn test_quote_never_charges_more_than_amount() {
        let params = ProtocolParams { shares_per_chip: 3, ..Default::default() };
        let odd = pool(10, 7);
        let quote = quote_stake(&odd, 5, &params).unwrap();
        // floor(5 * 7 / 10) = 3 shares, one chip.
        assert_eq!(quote.chips, 1);
        assert!(quote.cost <= 5);
    }

    #[test]
    fn test_amount_too_small() {
        let params = ProtocolParams::default();
        assert_eq!(quote_stake(&pool(0, 0), 0, &params), Err(LedgerError::AmountTooSmall));
        assert_eq!(
            quote_stake(&pool(0, 0), 999 * ONE_TOKEN, &params),
            Err(LedgerError::AmountTooSmall)
        );
    }

    #[test]
    fn test_batch_limit() {
        let params = ProtocolParams {
            shares_per_chip: 1,
            max_chips_per_stake: 10,
            ..Default::default()
        };
        assert_eq!(
            quote_stake(&pool(0, 0), 11, &params),
            Err(LedgerError::ChipBatchTooLarge { requested: 11, max: 10 })
        );
    }

    #[test]
    fn test_drained_pool_rejects_stake() {
        let params = ProtocolParams::default();
        let drained = pool(0, params.shares_per_chip);
        assert!(matches!(
            quote_stake(&drained, ONE_TOKEN, &params),
            Err(LedgerError::DepositedTokensSlashedAll(_))
        ));
    }

    #[test]
    fn test_mint_contiguous_range() {
        let mut chips = ChipLedger::default();
        let owner = EthAddress::from_low_u64(5);
        let node = EthAddress::from_low_u64(6);
        assert_eq!(chips.mint(owner, node, 3, 10), (ChipId(1), ChipId(3)));
        assert_eq!(chips.mint(owner, node, 1, 10), (ChipId(4), ChipId(4)));
        assert_eq!(chips.len(), 4);
        assert!(chips.burn(ChipId(2)).is_some());
        assert_eq!(chips.get(ChipId(2)), Err(LedgerError::ChipNotExists(ChipId(2))));
    }
}
