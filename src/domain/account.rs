//! Account entity and its back-references.

use crate::domain::{Address, Entity, EntityKind, PoolId, Timestamp};
use serde::{Deserialize, Serialize};

/// A chain address seen by any handler. Never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Address,
    /// Balance ids (`{vault}-{account}`).
    #[serde(default)]
    pub balances: Vec<String>,
    #[serde(default)]
    pub created_curators: Vec<Address>,
    #[serde(default)]
    pub created_pools: Vec<PoolId>,
    pub first_seen_at: Timestamp,
}

impl Account {
    pub fn new(id: Address, first_seen_at: Timestamp) -> Self {
        Self {
            id,
            balances: Vec::new(),
            created_curators: Vec::new(),
            created_pools: Vec::new(),
            first_seen_at,
        }
    }

    /// Returns true when the reference was newly added.
    pub fn link_balance(&mut self, balance_id: &str) -> bool {
        push_unique(&mut self.balances, balance_id.to_string())
    }

    pub fn link_curator(&mut self, curator: &Address) -> bool {
        push_unique(&mut self.created_curators, curator.clone())
    }

    pub fn link_pool(&mut self, pool: &PoolId) -> bool {
        push_unique(&mut self.created_pools, pool.clone())
    }
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) -> bool {
    if items.contains(&item) {
        false
    } else {
        items.push(item);
        true
    }
}

impl Entity for Account {
    const KIND: EntityKind = EntityKind::Account;

    fn id(&self) -> String {
        self.id.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_back_references_are_deduplicated() {
        let mut account = Account::new(Address::new("0xa"), Timestamp::new(1));
        assert!(account.link_balance("0xv-0xa"));
        assert!(!account.link_balance("0xv-0xa"));
        assert!(account.link_pool(&PoolId::new("0x01")));
        assert!(!account.link_pool(&PoolId::new("0x01")));
        assert_eq!(account.balances.len(), 1);
        assert_eq!(account.created_pools.len(), 1);
    }
}
