//! Consistency checks over the full ledger state.

use crate::ledger::Ledger;
use crate::math;
use chipstake_types::{EthAddress, LedgerResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub pooled_tokens: u128,
    pub outstanding_unstakes: u128,
    pub outstanding_withdrawals: u128,
    pub escrow: u128,
    pub circulating: u128,
    pub expected_supply: u128,
    pub issues: Vec<String>,
}

impl AuditReport {
    pub fn is_consistent(&self) -> bool {
        self.issues.is_empty()
    }
}

impl Ledger {
    /// Checks share accounting, escrow backing and token conservation.
    pub fn audit(&self) -> LedgerResult<AuditReport> {
        let mut report = AuditReport::default();

        let mut chip_shares: BTreeMap<EthAddress, u128> = BTreeMap::new();
        for chip in self.chips.iter() {
            let entry = chip_shares.entry(chip.node).or_insert(0);
            *entry = math::add(*entry, chip.shares)?;
            if self.pool(&chip.node).is_err() {
                report
                    .issues
                    .push(format!("{} references missing node {}", chip.token_id, chip.node));
            }
        }

        let mut pooled = 0u128;
        for node in self.registry.iter().chain(std::iter::once(&self.public_pool)) {
            let issued = chip_shares.get(&node.account).copied().unwrap_or(0);
            if issued != node.total_shares {
                report.issues.push(format!(
                    "node {} records {} shares but chips carry {}",
                    node.account, node.total_shares, issued
                ));
            }
            pooled = math::add(pooled, math::add(node.operation_pool_tokens, node.staking_pool_tokens)?)?;
        }

        report.pooled_tokens = pooled;
        report.outstanding_unstakes = self.unstake_requests.outstanding()?;
        report.outstanding_withdrawals = self.withdrawal_requests.outstanding()?;
        report.escrow = self.tokens.escrow();
        let backing = math::sum([
            pooled,
            report.outstanding_unstakes,
            report.outstanding_withdrawals,
        ])?;
        if backing != report.escrow {
            report.issues.push(format!(
                "escrow {} does not match pooled and pending tokens {}",
                report.escrow, backing
            ));
        }

        report.circulating = self.tokens.circulating()?;
        report.expected_supply = math::add(self.tokens.initial_supply(), self.tokens.total_minted())?;
        let actual_supply = math::add(report.circulating, report.escrow)?;
        if actual_supply != report.expected_supply {
            report.issues.push(format!(
                "supply {} differs from genesis plus minted {}",
                actual_supply, report.expected_supply
            ));
        }

        Ok(report)
    }
}
