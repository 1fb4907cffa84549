//! JSON-RPC `eth_call` client for vault and curator view functions.

use super::{ChainReadError, ChainReader};
use crate::domain::{Address, Amount, PoolId};
use alloy_primitives::keccak256;
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// First four bytes of the keccak256 of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Calldata for a call with no arguments.
pub fn encode_call(signature: &str) -> String {
    format!("0x{}", hex::encode(selector(signature)))
}

/// Calldata for a call with a single `bytes32` argument.
pub fn encode_call_bytes32(signature: &str, word: &[u8; 32]) -> String {
    format!(
        "0x{}{}",
        hex::encode(selector(signature)),
        hex::encode(word)
    )
}

/// Decode the first 32-byte word of a hex `eth_call` result as uint256.
pub fn decode_uint256(result: &str) -> Result<Amount, ChainReadError> {
    let digits = result.trim_start_matches("0x");
    let bytes = hex::decode(digits).map_err(|e| ChainReadError::Decode(e.to_string()))?;
    if bytes.len() < 32 {
        return Err(ChainReadError::Unavailable(format!(
            "short return data ({} bytes)",
            bytes.len()
        )));
    }
    Amount::from_be_word(&bytes[..32])
        .ok_or_else(|| ChainReadError::Decode("word does not fit uint256".to_string()))
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Chain reader backed by an Ethereum JSON-RPC endpoint.
#[derive(Debug, Clone)]
pub struct RpcChainReader {
    client: Client,
    rpc_url: String,
    max_elapsed: Duration,
}

impl RpcChainReader {
    /// Create a new reader for the given endpoint.
    pub fn new(rpc_url: String) -> Self {
        Self {
            client: Client::new(),
            rpc_url,
            max_elapsed: Duration::from_secs(30),
        }
    }

    /// Cap the total time spent retrying one call.
    pub fn with_max_elapsed(mut self, max_elapsed: Duration) -> Self {
        self.max_elapsed = max_elapsed;
        self
    }

    async fn eth_call(&self, to: &Address, data: String) -> Result<Amount, ChainReadError> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [{ "to": to.as_str(), "data": data }, "latest"]
        });
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(self.max_elapsed),
            ..Default::default()
        };

        let response: RpcResponse = retry(backoff, || async {
            let response = self
                .client
                .post(&self.rpc_url)
                .json(&payload)
                .send()
                .await
                .map_err(|e| backoff::Error::transient(ChainReadError::Network(e.to_string())))?;

            let status = response.status();
            if status == 429 || status.is_server_error() {
                return Err(backoff::Error::transient(ChainReadError::Http {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(ChainReadError::Http {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<RpcResponse>()
                .await
                .map_err(|e| backoff::Error::permanent(ChainReadError::Decode(e.to_string())))
        })
        .await?;

        if let Some(err) = response.error {
            debug!(to = %to, code = err.code, message = %err.message, "eth_call failed");
            return Err(ChainReadError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        let result = response
            .result
            .ok_or_else(|| ChainReadError::Decode("missing result".to_string()))?;
        decode_uint256(&result)
    }
}

#[async_trait]
impl ChainReader for RpcChainReader {
    async fn total_assets(&self, vault: &Address) -> Result<Amount, ChainReadError> {
        self.eth_call(vault, encode_call("totalAssets()")).await
    }

    async fn total_supply(&self, vault: &Address) -> Result<Amount, ChainReadError> {
        self.eth_call(vault, encode_call("totalSupply()")).await
    }

    async fn pool_allocations(
        &self,
        curator: &Address,
        pool_id: &PoolId,
    ) -> Result<Amount, ChainReadError> {
        let word = pool_id
            .to_abi_word()
            .map_err(|e| ChainReadError::Decode(e.to_string()))?;
        self.eth_call(curator, encode_call_bytes32("poolAllocations(bytes32)", &word))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_selectors() {
        assert_eq!(encode_call("totalSupply()"), "0x18160ddd");
        assert_eq!(encode_call("totalAssets()"), "0x01e1d114");
    }

    #[test]
    fn test_encode_bytes32_argument() {
        let word = PoolId::new("0x01").to_abi_word().unwrap();
        let data = encode_call_bytes32("poolAllocations(bytes32)", &word);
        assert_eq!(data.len(), 2 + 8 + 64);
        assert!(data.ends_with("01"));
        assert!(data.starts_with(&encode_call("poolAllocations(bytes32)")));
    }

    #[test]
    fn test_decode_uint256() {
        let result = format!("0x{:064x}", 1000u64);
        assert_eq!(decode_uint256(&result).unwrap(), Amount::from_u64(1000));
    }

    #[test]
    fn test_decode_empty_return_is_unavailable() {
        assert!(matches!(
            decode_uint256("0x"),
            Err(ChainReadError::Unavailable(_))
        ));
        assert!(matches!(
            decode_uint256("0xzz"),
            Err(ChainReadError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_gives_up_within_budget() {
        let reader = RpcChainReader::new("http://127.0.0.1:1".to_string())
            .with_max_elapsed(Duration::from_millis(200));

        let started = std::time::Instant::now();
        let result = reader.total_assets(&Address::new("0xv")).await;
        assert!(matches!(result, Err(ChainReadError::Network(_))));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
