use chipstake_types::{
    BasisPoints, EthAddress, LedgerError, LedgerResult, DEFAULT_ALPHA_DEPOSIT_UNBONDING_PERIOD_SECS,
    DEFAULT_DEPOSIT_UNBONDING_PERIOD_SECS, DEFAULT_MIN_TAX_RATE_BASIS_POINTS,
    DEFAULT_NODE_SLASH_RATE_BASIS_POINTS, DEFAULT_PUBLIC_POOL_TAX_RATE_BASIS_POINTS,
    DEFAULT_SHARES_PER_CHIP, DEFAULT_STAKE_RATIO, DEFAULT_STAKE_UNBONDING_PERIOD_SECS,
    DEFAULT_USER_SLASH_RATE_BASIS_POINTS,
};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

const DEFAULT_MAX_CHIPS_PER_STAKE: u64 = 10_000;

/// Protocol constants. Fixed when the ledger is constructed.
///
/// The u128 fields are written as decimal strings so they survive toml.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolParams {
    #[serde_as(as = "DisplayFromStr")]
    pub shares_per_chip: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub stake_ratio: u128,
    pub min_tax_rate_basis_points: u64,
    pub stake_unbonding_period: u64,
    pub deposit_unbonding_period: u64,
    pub alpha_deposit_unbonding_period: u64,
    pub node_slash_rate_basis_points: u64,
    pub user_slash_rate_basis_points: u64,
    pub max_chips_per_stake: u64,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            shares_per_chip: DEFAULT_SHARES_PER_CHIP,
            stake_ratio: DEFAULT_STAKE_RATIO,
            min_tax_rate_basis_points: DEFAULT_MIN_TAX_RATE_BASIS_POINTS,
            stake_unbonding_period: DEFAULT_STAKE_UNBONDING_PERIOD_SECS,
            deposit_unbonding_period: DEFAULT_DEPOSIT_UNBONDING_PERIOD_SECS,
            alpha_deposit_unbonding_period: DEFAULT_ALPHA_DEPOSIT_UNBONDING_PERIOD_SECS,
            node_slash_rate_basis_points: DEFAULT_NODE_SLASH_RATE_BASIS_POINTS,
            user_slash_rate_basis_points: DEFAULT_USER_SLASH_RATE_BASIS_POINTS,
            max_chips_per_stake: DEFAULT_MAX_CHIPS_PER_STAKE,
        }
    }
}

impl ProtocolParams {
    pub fn validate(&self) -> LedgerResult<()> {
        if self.shares_per_chip == 0 {
            return Err(LedgerError::InvalidParams("shares_per_chip must be positive".into()));
        }
        if self.stake_ratio == 0 {
            return Err(LedgerError::InvalidParams("stake_ratio must be positive".into()));
        }
        if self.max_chips_per_stake == 0 {
            return Err(LedgerError::InvalidParams("max_chips_per_stake must be positive".into()));
        }
        for (name, bp) in [
            ("min_tax_rate_basis_points", self.min_tax_rate_basis_points),
            ("node_slash_rate_basis_points", self.node_slash_rate_basis_points),
            ("user_slash_rate_basis_points", self.user_slash_rate_basis_points),
        ] {
            if !BasisPoints(bp).is_valid() {
                return Err(LedgerError::InvalidParams(format!("{} exceeds 10000", name)));
            }
        }
        if self.alpha_deposit_unbonding_period > self.deposit_unbonding_period {
            return Err(LedgerError::InvalidParams(
                "alpha_deposit_unbonding_period cannot exceed deposit_unbonding_period".into(),
            ));
        }
        Ok(())
    }

    pub fn node_slash_rate(&self) -> BasisPoints {
        BasisPoints(self.node_slash_rate_basis_points)
    }

    pub fn user_slash_rate(&self) -> BasisPoints {
        BasisPoints(self.user_slash_rate_basis_points)
    }

    pub fn deposit_unbonding_for(&self, alpha: bool) -> u64 {
        if alpha {
            self.alpha_deposit_unbonding_period
        } else {
            self.deposit_unbonding_period
        }
    }
}

/// Initial role holders, treasury and token balances.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Genesis {
    pub admin: EthAddress,
    pub oracles: Vec<EthAddress>,
    pub pausers: Vec<EthAddress>,
    pub treasury: EthAddress,
    pub public_pool_tax_rate_basis_points: Option<u64>,
    pub balances: Vec<GenesisBalance>,
}

#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisBalance {
    pub account: EthAddress,
    #[serde_as(as = "DisplayFromStr")]
    pub amount: u128,
}

impl Genesis {
    pub fn public_pool_tax_rate(&self) -> BasisPoints {
        BasisPoints(
            self.public_pool_tax_rate_basis_points
                .unwrap_or(DEFAULT_PUBLIC_POOL_TAX_RATE_BASIS_POINTS),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_validate() {
        assert!(ProtocolParams::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_shares_per_chip() {
        let params = ProtocolParams { shares_per_chip: 0, ..Default::default() };
        assert!(matches!(params.validate(), Err(LedgerError::InvalidParams(_))));
    }

    #[test]
    fn test_rejects_slash_rate_above_denominator() {
        let params = ProtocolParams { user_slash_rate_basis_points: 10_001, ..Default::default() };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_alpha_period_is_relaxed() {
        let params = ProtocolParams::default();
        assert!(params.deposit_unbonding_for(true) <= params.deposit_unbonding_for(false));

        let inverted = ProtocolParams {
            alpha_deposit_unbonding_period: params.deposit_unbonding_period + 1,
            ..params
        };
        assert!(inverted.validate().is_err());
    }
}
