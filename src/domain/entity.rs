//! Entity kinds and the trait every stored entity implements.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Entity table discriminator in the keyed store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Account,
    Balance,
    Curator,
    Pool,
    PoolAllocation,
    CuratorLendApr,
    BridgeTransaction,
    Erc721BridgeRequest,
    Erc721BridgeTransaction,
    BridgeCorrelation,
}

impl EntityKind {
    pub const ALL: [EntityKind; 10] = [
        EntityKind::Account,
        EntityKind::Balance,
        EntityKind::Curator,
        EntityKind::Pool,
        EntityKind::PoolAllocation,
        EntityKind::CuratorLendApr,
        EntityKind::BridgeTransaction,
        EntityKind::Erc721BridgeRequest,
        EntityKind::Erc721BridgeTransaction,
        EntityKind::BridgeCorrelation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Account => "account",
            EntityKind::Balance => "balance",
            EntityKind::Curator => "curator",
            EntityKind::Pool => "pool",
            EntityKind::PoolAllocation => "pool_allocation",
            EntityKind::CuratorLendApr => "curator_lend_apr",
            EntityKind::BridgeTransaction => "bridge_transaction",
            EntityKind::Erc721BridgeRequest => "erc721_bridge_request",
            EntityKind::Erc721BridgeTransaction => "erc721_bridge_transaction",
            EntityKind::BridgeCorrelation => "bridge_correlation",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown entity kind: {}", s))
    }
}

/// A derived entity persisted in the keyed store.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    const KIND: EntityKind;

    /// Store key, unique within `KIND`.
    fn id(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrips_through_str() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_str(kind.as_str()).unwrap(), kind);
        }
        assert!(EntityKind::from_str("fill").is_err());
    }

    #[test]
    fn test_kind_serde_matches_as_str() {
        let json = serde_json::to_string(&EntityKind::CuratorLendApr).unwrap();
        assert_eq!(json, "\"curator_lend_apr\"");
    }
}
