use crate::math;
use chipstake_types::{EthAddress, LedgerError, LedgerResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Balance table of the staking asset.
///
/// Tokens held on behalf of node pools and pending claims sit in `escrow`.
/// Taxes and slashed tokens are paid to the `treasury` account.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TokenBalances {
    balances: BTreeMap<EthAddress, u128>,
    escrow: u128,
    treasury: EthAddress,
    initial_supply: u128,
    total_minted: u128,
}

impl TokenBalances {
    pub fn new(treasury: EthAddress) -> Self {
        Self {
            treasury,
            ..Default::default()
        }
    }

    pub fn credit_genesis(&mut self, account: EthAddress, amount: u128) -> LedgerResult<()> {
        let balance = self.balances.entry(account).or_insert(0);
        *balance = math::add(*balance, amount)?;
        self.initial_supply = math::add(self.initial_supply, amount)?;
        Ok(())
    }

    pub fn balance_of(&self, account: &EthAddress) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn escrow(&self) -> u128 {
        self.escrow
    }

    pub fn treasury(&self) -> EthAddress {
        self.treasury
    }

    pub fn initial_supply(&self) -> u128 {
        self.initial_supply
    }

    pub fn total_minted(&self) -> u128 {
        self.total_minted
    }

    pub fn circulating(&self) -> LedgerResult<u128> {
        math::sum(self.balances.values().copied())
    }

    pub fn ensure_balance(&self, account: &EthAddress, required: u128) -> LedgerResult<()> {
        let available = self.balance_of(account);
        if available < required {
            return Err(LedgerError::InsufficientBalance {
                account: *account,
                required,
                available,
            });
        }
        Ok(())
    }

    pub fn transfer(&mut self, from: &EthAddress, to: &EthAddress, amount: u128) -> LedgerResult<()> {
        if to.is_zero() {
            return Err(LedgerError::TransferToZeroAddress);
        }
        self.ensure_balance(from, amount)?;
        let credited = math::add(self.balance_of(to), amount)?;
        self.debit(from, amount)?;
        self.balances.insert(*to, credited);
        Ok(())
    }

    /// Moves `amount` from `account` into escrow.
    pub fn pull(&mut self, account: &EthAddress, amount: u128) -> LedgerResult<()> {
        self.ensure_balance(account, amount)?;
        let escrow = math::add(self.escrow, amount)?;
        self.debit(account, amount)?;
        self.escrow = escrow;
        Ok(())
    }

    /// Releases `amount` from escrow to `account`.
    pub fn pay(&mut self, account: &EthAddress, amount: u128) -> LedgerResult<()> {
        let escrow = math::sub(self.escrow, amount)?;
        let credited = math::add(self.balance_of(account), amount)?;
        self.escrow = escrow;
        self.balances.insert(*account, credited);
        Ok(())
    }

    /// Releases a batch of payouts from escrow. Either every payout is
    /// credited or none is.
    pub fn pay_all<I>(&mut self, payouts: I) -> LedgerResult<u128>
    where
        I: IntoIterator<Item = (EthAddress, u128)>,
    {
        let mut credited: BTreeMap<EthAddress, u128> = BTreeMap::new();
        let mut total = 0u128;
        for (account, amount) in payouts {
            total = math::add(total, amount)?;
            let current = match credited.get(&account) {
                Some(balance) => *balance,
                None => self.balance_of(&account),
            };
            credited.insert(account, math::add(current, amount)?);
        }
        self.escrow = math::sub(self.escrow, total)?;
        self.balances.extend(credited);
        Ok(total)
    }

    pub fn pay_treasury(&mut self, amount: u128) -> LedgerResult<()> {
        let treasury = self.treasury;
        self.pay(&treasury, amount)
    }

    /// Mints freshly issued reward tokens: `to_escrow` backs pool credits,
    /// `to_treasury` is the tax cut.
    pub fn mint(&mut self, to_escrow: u128, to_treasury: u128) -> LedgerResult<()> {
        let gross = math::add(to_escrow, to_treasury)?;
        let total_minted = math::add(self.total_minted, gross)?;
        let escrow = math::add(self.escrow, to_escrow)?;
        let treasury_balance = math::add(self.balance_of(&self.treasury), to_treasury)?;

        self.total_minted = total_minted;
        self.escrow = escrow;
        if to_treasury > 0 {
            self.balances.insert(self.treasury, treasury_balance);
        }
        Ok(())
    }

    fn debit(&mut self, account: &EthAddress, amount: u128) -> LedgerResult<()> {
        let remaining = math::sub(self.balance_of(account), amount)?;
        if remaining == 0 {
            self.balances.remove(account);
        } else {
            self.balances.insert(*account, remaining);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u64) -> EthAddress {
        EthAddress::from_low_u64(n)
    }

    #[test]
    fn test_pull_and_pay_move_through_escrow() {
        let mut tokens = TokenBalances::new(addr(99));
        tokens.credit_genesis(addr(10), 500).unwrap();

        tokens.pull(&addr(10), 200).unwrap();
        assert_eq!(tokens.balance_of(&addr(10)), 300);
        assert_eq!(tokens.escrow(), 200);

        tokens.pay(&addr(11), 150).unwrap();
        assert_eq!(tokens.balance_of(&addr(11)), 150);
        assert_eq!(tokens.escrow(), 50);
        assert_eq!(tokens.circulating().unwrap() + tokens.escrow(), 500);
    }

    #[test]
    fn test_pay_all_is_all_or_nothing() {
        let mut tokens = TokenBalances::new(addr(99));
        tokens.mint(100, 0).unwrap();

        assert_eq!(tokens.pay_all([(addr(1), 60), (addr(2), 60)]), Err(LedgerError::ArithmeticOverflow));
        assert_eq!(tokens.escrow(), 100);
        assert_eq!(tokens.balance_of(&addr(1)), 0);

        tokens.credit_genesis(addr(2), u128::MAX - 10).unwrap();
        assert_eq!(tokens.pay_all([(addr(1), 5), (addr(2), 20)]), Err(LedgerError::ArithmeticOverflow));
        assert_eq!(tokens.balance_of(&addr(1)), 0);
        assert_eq!(tokens.escrow(), 100);

        assert_eq!(tokens.pay_all([(addr(1), 30), (addr(1), 20), (addr(3), 50)]), Ok(100));
        assert_eq!(tokens.balance_of(&addr(1)), 50);
        assert_eq!(tokens.balance_of(&addr(3)), 50);
        assert_eq!(tokens.escrow(), 0);
    }

    #[test]
    fn test_pull_rejects_insufficient_balance() {
        let mut tokens = TokenBalances::new(addr(99));
        tokens.credit_genesis(addr(10), 5).unwrap();
        let err = tokens.pull(&addr(10), 6).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientBalance { account: addr(10), required: 6, available: 5 }
        );
        assert_eq!(tokens.escrow(), 0);
    }

    #[test]
    fn test_transfer() {
        let mut tokens = TokenBalances::new(addr(99));
        tokens.credit_genesis(addr(1), 10).unwrap();
        tokens.transfer(&addr(1), &addr(2), 10).unwrap();
        assert_eq!(tokens.balance_of(&addr(1)), 0);
        assert_eq!(tokens.balance_of(&addr(2)), 10);
        assert_eq!(
            tokens.transfer(&addr(2), &EthAddress::zero(), 1),
            Err(LedgerError::TransferToZeroAddress)
        );
    }

    #[test]
    fn test_mint_tracks_supply() {
        let mut tokens = TokenBalances::new(addr(99));
        tokens.mint(95, 5).unwrap();
        assert_eq!(tokens.total_minted(), 100);
        assert_eq!(tokens.escrow(), 95);
        assert_eq!(tokens.balance_of(&addr(99)), 5);
    }
}
