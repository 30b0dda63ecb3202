//! Node registry: creation, deletion, tax rates and paginated reads.

use crate::command::TxContext;
use crate::events::LedgerEvent;
use crate::ledger::Ledger;
use chipstake_types::{
    BasisPoints, EthAddress, LedgerError, LedgerResult, NodeId, Role, BASIS_POINTS_DENOMINATOR,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub node_id: NodeId,
    pub account: EthAddress,
    pub name: String,
    pub description: String,
    pub tax_rate_basis_points: u64,
    pub public_good: bool,
    pub alpha: bool,
    pub operation_pool_tokens: u128,
    pub staking_pool_tokens: u128,
    pub total_shares: u128,
    pub slashed_tokens: u128,
    pub created_at: u64,
}

impl Node {
    /// The public-good pool pseudo-node. It never appears in the registry.
    pub fn public_pool(tax_rate_basis_points: u64) -> Self {
        Self {
            node_id: NodeId(0),
            account: EthAddress::public_pool(),
            name: "public-pool".to_string(),
            description: String::new(),
            tax_rate_basis_points,
            public_good: true,
            alpha: false,
            operation_pool_tokens: 0,
            staking_pool_tokens: 0,
            total_shares: 0,
            slashed_tokens: 0,
            created_at: 0,
        }
    }

    pub fn tax_rate(&self) -> BasisPoints {
        BasisPoints(self.tax_rate_basis_points)
    }

    pub fn is_vacant(&self) -> bool {
        self.operation_pool_tokens == 0 && self.staking_pool_tokens == 0 && self.total_shares == 0
    }
}

/// Nodes keyed by account, plus insertion order for stable pagination.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeRegistry {
    nodes: BTreeMap<EthAddress, Node>,
    order: Vec<EthAddress>,
    next_id: NodeId,
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self {
            nodes: BTreeMap::new(),
            order: Vec::new(),
            next_id: NodeId(1),
        }
    }
}

impl NodeRegistry {
    pub fn get(&self, account: &EthAddress) -> LedgerResult<&Node> {
        self.nodes.get(account).ok_or(LedgerError::NodeNotExists(*account))
    }

    pub fn get_mut(&mut self, account: &EthAddress) -> LedgerResult<&mut Node> {
        self.nodes.get_mut(account).ok_or(LedgerError::NodeNotExists(*account))
    }

    pub fn contains(&self, account: &EthAddress) -> bool {
        self.nodes.contains_key(account)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn page(&self, offset: usize, limit: usize) -> Vec<&Node> {
        self.order
            .iter()
            .skip(offset)
            .take(limit)
            .filter_map(|account| self.nodes.get(account))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(|account| self.nodes.get(account))
    }

    fn insert(&mut self, mut node: Node) -> NodeId {
        let id = self.next_id;
        node.node_id = id;
        self.order.push(node.account);
        self.nodes.insert(node.account, node);
        self.next_id = id.next();
        id
    }

    fn remove(&mut self, account: &EthAddress) -> Option<Node> {
        let node = self.nodes.remove(account)?;
        self.order.retain(|a| a != account);
        Some(node)
    }
}

/// Arguments of `create_node`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNode {
    pub account: EthAddress,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub tax_rate_basis_points: u64,
    #[serde(default)]
    pub public_good: bool,
    #[serde(default)]
    pub alpha: bool,
}

impl Ledger {
    pub(crate) fn check_tax_rate(&self, rate: u64) -> LedgerResult<()> {
        if rate > BASIS_POINTS_DENOMINATOR {
            return Err(LedgerError::TaxRateBasisPointsTooLarge(rate));
        }
        let min = self.params.min_tax_rate_basis_points;
        if rate < min {
            return Err(LedgerError::TaxRateBasisPointsTooSmall { rate, min });
        }
        Ok(())
    }

    /// The sender must be `account` itself or an admin.
    fn require_self_or_admin(&self, sender: &EthAddress, account: &EthAddress) -> LedgerResult<()> {
        if sender == account {
            return Ok(());
        }
        self.roles.require(Role::DefaultAdmin, sender)
    }

    pub(crate) fn create_node(&mut self, ctx: &TxContext, new: NewNode) -> LedgerResult<NodeId> {
        self.require_self_or_admin(&ctx.sender, &new.account)?;
        if new.alpha || new.public_good {
            self.roles.require(Role::DefaultAdmin, &ctx.sender)?;
        }
        self.require_not_paused()?;

        if new.account.is_zero() {
            return Err(LedgerError::CreateNodeToZeroAddress);
        }
        if new.account.is_public_pool() || self.registry.contains(&new.account) {
            return Err(LedgerError::NodeExists(new.account));
        }
        self.check_tax_rate(new.tax_rate_basis_points)?;

        let node = Node {
            node_id: NodeId(0),
            account: new.account,
            name: new.name,
            description: new.description,
            tax_rate_basis_points: new.tax_rate_basis_points,
            public_good: new.public_good,
            alpha: new.alpha,
            operation_pool_tokens: 0,
            staking_pool_tokens: 0,
            total_shares: 0,
            slashed_tokens: 0,
            created_at: ctx.timestamp,
        };
        let event = LedgerEvent::NodeCreated {
            node_id: self.registry.next_id,
            account: node.account,
            name: node.name.clone(),
            tax_rate_basis_points: node.tax_rate_basis_points,
            public_good: node.public_good,
            alpha: node.alpha,
        };
        let node_id = self.registry.insert(node);
        self.emit(event);

        info!("Node {} created for {}", node_id, new.account);
        Ok(node_id)
    }

    pub(crate) fn delete_node(&mut self, ctx: &TxContext, account: EthAddress) -> LedgerResult<()> {
        self.require_self_or_admin(&ctx.sender, &account)?;
        self.require_not_paused()?;

        let node = self.registry.get(&account)?;
        if !node.is_vacant() {
            return Err(LedgerError::NodeStakedOrDeposited(account));
        }
        let node_id = node.node_id;
        self.registry.remove(&account);
        self.emit(LedgerEvent::NodeDeleted { node_id, account });

        info!("Node {} ({}) deleted", node_id, account);
        Ok(())
    }

    pub(crate) fn set_node_tax_rate(
        &mut self,
        ctx: &TxContext,
        account: EthAddress,
        rate: u64,
    ) -> LedgerResult<()> {
        self.require_self_or_admin(&ctx.sender, &account)?;
        self.require_not_paused()?;
        self.registry.get(&account)?;
        self.check_tax_rate(rate)?;

        self.registry.get_mut(&account)?.tax_rate_basis_points = rate;
        self.emit(LedgerEvent::NodeTaxRateBasisPointsSet {
            account,
            tax_rate_basis_points: rate,
        });
        debug!("Tax rate of {} set to {}bp", account, rate);
        Ok(())
    }

    pub(crate) fn set_public_pool_tax_rate(&mut self, ctx: &TxContext, rate: u64) -> LedgerResult<()> {
        self.roles.require(Role::DefaultAdmin, &ctx.sender)?;
        self.require_not_paused()?;
        self.check_tax_rate(rate)?;

        self.public_pool.tax_rate_basis_points = rate;
        self.emit(LedgerEvent::PublicPoolTaxRateBasisPointsSet {
            tax_rate_basis_points: rate,
        });
        debug!("Public pool tax rate set to {}bp", rate);
        Ok(())
    }

    pub fn get_node(&self, account: &EthAddress) -> LedgerResult<&Node> {
        self.registry.get(account)
    }

    pub fn get_nodes(&self, accounts: &[EthAddress]) -> LedgerResult<Vec<&Node>> {
        accounts.iter().map(|a| self.registry.get(a)).collect()
    }

    pub fn get_node_count(&self) -> usize {
        self.registry.len()
    }

    /// Insertion-ordered slice. An offset past the end yields an empty page.
    pub fn get_nodes_with_pagination(&self, offset: usize, limit: usize) -> Vec<&Node> {
        self.registry.page(offset, limit)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.registry.iter()
    }

    /// Registry nodes and the public pool, resolved by address.
    pub(crate) fn pool(&self, account: &EthAddress) -> LedgerResult<&Node> {
        if account.is_public_pool() {
            Ok(&self.public_pool)
        } else {
            self.registry.get(account)
        }
    }

    pub(crate) fn pool_mut(&mut self, account: &EthAddress) -> LedgerResult<&mut Node> {
        if account.is_public_pool() {
            Ok(&mut self.public_pool)
        } else {
            self.registry.get_mut(account)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(n: u64) -> Node {
        let mut node = Node::public_pool(0);
        node.account = EthAddress::from_low_u64(n);
        node.public_good = false;
        node
    }

    #[test]
    fn test_registry_keeps_insertion_order() {
        let mut registry = NodeRegistry::default();
        for n in [30, 10, 20] {
            registry.insert(node(n));
        }
        let accounts: Vec<_> = registry.page(0, 10).iter().map(|n| n.account).collect();
        assert_eq!(
            accounts,
            vec![
                EthAddress::from_low_u64(30),
                EthAddress::from_low_u64(10),
                EthAddress::from_low_u64(20)
            ]
        );
        assert_eq!(registry.page(1, 1)[0].node_id, NodeId(2));
        assert!(registry.page(3, 10).is_empty());
        assert!(registry.page(100, 10).is_empty());
    }

    #[test]
    fn test_node_ids_are_not_reused() {
        let mut registry = NodeRegistry::default();
        registry.insert(node(1));
        registry.remove(&EthAddress::from_low_u64(1));
        assert_eq!(registry.insert(node(1)), NodeId(2));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_vacancy() {
        let mut n = node(1);
        assert!(n.is_vacant());
        n.operation_pool_tokens = 1;
        assert!(!n.is_vacant());
    }
}
