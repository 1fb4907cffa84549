//! Read-through access to authoritative on-chain contract state.
//!
//! Handlers use this to refresh curator totals and to read per-pool
//! allocations for the weighted APR. A failed read is never fatal: callers
//! treat it as "value absent" and log.

use crate::domain::{Address, Amount, PoolId};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub mod mock;
pub mod rpc;

pub use mock::MockChainReader;
pub use rpc::RpcChainReader;

/// Contract view calls consumed by the projector.
#[async_trait]
pub trait ChainReader: Send + Sync + fmt::Debug {
    /// `totalAssets()` of an ERC-4626 style vault.
    async fn total_assets(&self, vault: &Address) -> Result<Amount, ChainReadError>;

    /// `totalSupply()` of the vault share token.
    async fn total_supply(&self, vault: &Address) -> Result<Amount, ChainReadError>;

    /// `poolAllocations(poolId)` on the curator contract.
    async fn pool_allocations(
        &self,
        curator: &Address,
        pool_id: &PoolId,
    ) -> Result<Amount, ChainReadError>;
}

/// Error type for chain read operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainReadError {
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("call reverted or unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_read_error_display() {
        let err = ChainReadError::Http {
            status: 503,
            message: "Server error".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP error 503: Server error");

        let err = ChainReadError::Rpc {
            code: 3,
            message: "execution reverted".to_string(),
        };
        assert_eq!(err.to_string(), "RPC error 3: execution reverted");
    }
}
