use crate::command::TxContext;
use crate::events::LedgerEvent;
use crate::ledger::Ledger;
use crate::math;
use chipstake_types::{EthAddress, LedgerError, LedgerResult, Role};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Debited amounts for one entry of a slash batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlashOutcome {
    pub node: EthAddress,
    pub operation_pool: u128,
    pub staking_pool: u128,
}

impl Ledger {
    /// Listing a node twice slashes it twice, the second time against the
    /// already reduced pools.
    pub(crate) fn slash_nodes(&mut self, ctx: &TxContext, node_addrs: &[EthAddress]) -> LedgerResult<Vec<SlashOutcome>> {
        self.roles.require(Role::Oracle, &ctx.sender)?;
        self.require_not_paused()?;
        if node_addrs.is_empty() {
            return Err(LedgerError::EmptyNodeList);
        }

        let node_rate = self.params.node_slash_rate();
        let user_rate = self.params.user_slash_rate();
        let mut pools: BTreeMap<EthAddress, (u128, u128, u128)> = BTreeMap::new();
        let mut outcomes = Vec::with_capacity(node_addrs.len());
        let mut total = 0u128;

        for addr in node_addrs {
            let entry = match pools.get(addr) {
                Some(entry) => *entry,
                None => {
                    let node = self.registry.get(addr)?;
                    (node.operation_pool_tokens, node.staking_pool_tokens, node.slashed_tokens)
                }
            };
            let (op_pool, st_pool, slashed) = entry;
            if op_pool == 0 {
                return Err(LedgerError::DepositedTokensSlashedAll(*addr));
            }
            let op_cut = math::apply_rate(node_rate, op_pool)?.min(op_pool);
            let st_cut = math::apply_rate(user_rate, st_pool)?.min(st_pool);
            let cut = math::add(op_cut, st_cut)?;

            pools.insert(*addr, (op_pool - op_cut, st_pool - st_cut, math::add(slashed, cut)?));
            total = math::add(total, cut)?;
            outcomes.push(SlashOutcome {
                node: *addr,
                operation_pool: op_cut,
                staking_pool: st_cut,
            });
        }
        math::sub(self.tokens.escrow(), total)?;

        for (addr, (op_pool, st_pool, slashed)) in pools {
            let node = self.registry.get_mut(&addr)?;
            node.operation_pool_tokens = op_pool;
            node.staking_pool_tokens = st_pool;
            node.slashed_tokens = slashed;
        }
        self.tokens.pay_treasury(total)?;

        for outcome in &outcomes {
            self.emit(LedgerEvent::NodeSlashed {
                node: outcome.node,
                operation_pool: outcome.operation_pool,
                staking_pool: outcome.staking_pool,
            });
            warn!(
                "Node {} slashed: operation pool -{}, staking pool -{}",
                outcome.node, outcome.operation_pool, outcome.staking_pool
            );
        }
        info!("Slashed {} nodes for {} tokens total", outcomes.len(), total);
        Ok(outcomes)
    }
}
