use chipstake_types::{EthAddress, LedgerError, LedgerResult, Role};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Role id to principals.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles {
    members: BTreeMap<Role, BTreeSet<EthAddress>>,
}

impl Roles {
    pub fn has(&self, role: Role, account: &EthAddress) -> bool {
        self.members
            .get(&role)
            .map(|set| set.contains(account))
            .unwrap_or(false)
    }

    pub fn require(&self, role: Role, account: &EthAddress) -> LedgerResult<()> {
        if self.has(role, account) {
            Ok(())
        } else {
            Err(LedgerError::AccessControlUnauthorizedAccount { account: *account, role })
        }
    }

    /// Returns `true` if the account did not already hold the role.
    pub fn grant(&mut self, role: Role, account: EthAddress) -> bool {
        self.members.entry(role).or_default().insert(account)
    }

    /// Returns `true` if the account held the role.
    pub fn revoke(&mut self, role: Role, account: &EthAddress) -> bool {
        let removed = self
            .members
            .get_mut(&role)
            .map(|set| set.remove(account))
            .unwrap_or(false);
        if self.members.get(&role).is_some_and(|set| set.is_empty()) {
            self.members.remove(&role);
        }
        removed
    }

    pub fn members(&self, role: Role) -> Vec<EthAddress> {
        self.members
            .get(&role)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_and_revoke() {
        let mut roles = Roles::default();
        let oracle = EthAddress::from_low_u64(7);

        assert!(roles.grant(Role::Oracle, oracle));
        assert!(!roles.grant(Role::Oracle, oracle));
        assert!(roles.has(Role::Oracle, &oracle));
        assert!(!roles.has(Role::Pause, &oracle));
        assert_eq!(roles.members(Role::Oracle), vec![oracle]);

        assert!(roles.revoke(Role::Oracle, &oracle));
        assert!(!roles.revoke(Role::Oracle, &oracle));
        assert!(roles.members(Role::Oracle).is_empty());
    }

    #[test]
    fn test_require_reports_missing_role() {
        let roles = Roles::default();
        let account = EthAddress::from_low_u64(3);
        assert_eq!(
            roles.require(Role::Pause, &account),
            Err(LedgerError::AccessControlUnauthorizedAccount { account, role: Role::Pause })
        );
    }
}
