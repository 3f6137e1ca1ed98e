//! Configuration for a peerswap session.
//!
//! Every section has defaults from [`constants`](crate::constants), so a
//! config file only needs the fields it changes.

use std::path::Path;
use std::time::Duration;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::wire::lower_address;
use crate::{PeerswapError, Result, constants};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerswapConfig {
    pub directory: DirectoryConfig,
    pub negotiation: NegotiationConfig,
    pub settlement: SettlementConfig,
}

impl PeerswapConfig {
    /// Parse a JSON config document.
    ///
    /// # Errors
    /// `Configuration` if the document is not valid JSON for this schema.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| PeerswapError::Configuration(e.to_string()))
    }

    /// Read and parse a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PeerswapError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&raw)
    }
}

/// Router / indexer connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// WebSocket endpoint of the router.
    pub url: String,
    /// Address the indexer answers on.
    #[serde(with = "lower_address")]
    pub indexer_address: Address,
    pub connect_timeout_ms: u64,
    pub discovery_timeout_ms: u64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            url: constants::DEFAULT_ROUTER_URL.to_string(),
            indexer_address: constants::DEFAULT_INDEXER_ADDRESS,
            connect_timeout_ms: constants::DEFAULT_CONNECT_TIMEOUT_MS,
            discovery_timeout_ms: constants::DEFAULT_DISCOVERY_TIMEOUT_MS,
        }
    }
}

impl DirectoryConfig {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    #[must_use]
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }
}

/// Per-peer request settings (taker side) and quoting settings (maker side).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiationConfig {
    pub peer_timeout_ms: u64,
    /// Lifetime of orders this identity signs as a maker.
    pub order_ttl_secs: u64,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            peer_timeout_ms: constants::DEFAULT_PEER_TIMEOUT_MS,
            order_ttl_secs: constants::DEFAULT_ORDER_TTL_SECS,
        }
    }
}

impl NegotiationConfig {
    #[must_use]
    pub fn peer_timeout(&self) -> Duration {
        Duration::from_millis(self.peer_timeout_ms)
    }
}

/// Settlement submission settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
    /// The swap contract fills are sent to.
    #[serde(with = "lower_address")]
    pub swap_contract: Address,
    /// How many filled `(maker, nonce)` pairs to remember.
    pub fill_guard_size: usize,
    pub retry: RetryConfig,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            swap_contract: Address::ZERO,
            fill_guard_size: constants::DEFAULT_FILL_GUARD_SIZE,
            retry: RetryConfig::default(),
        }
    }
}

/// Backoff for retrying fills that failed in transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first try).
    pub max_attempts: u32,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: constants::DEFAULT_FILL_MAX_ATTEMPTS,
            min_delay_ms: constants::DEFAULT_FILL_RETRY_MIN_DELAY_MS,
            max_delay_ms: constants::DEFAULT_FILL_RETRY_MAX_DELAY_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_come_from_constants() {
        let cfg = PeerswapConfig::default();
        assert_eq!(cfg.directory.discovery_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.negotiation.peer_timeout(), Duration::from_secs(12));
        assert_eq!(cfg.settlement.retry.max_attempts, 3);
        assert_eq!(cfg.directory.indexer_address, Address::ZERO);
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let cfg = PeerswapConfig::from_json_str(
            r#"{ "negotiation": { "peer_timeout_ms": 250 },
                 "settlement": { "swap_contract": "0x8fd3121013a07c57f0d69646e86e7a4880b467b7" } }"#,
        )
        .unwrap();
        assert_eq!(cfg.negotiation.peer_timeout_ms, 250);
        assert_eq!(cfg.negotiation.order_ttl_secs, constants::DEFAULT_ORDER_TTL_SECS);
        assert_eq!(cfg.directory, DirectoryConfig::default());
        assert_eq!(
            crate::wire::to_lower_hex(&cfg.settlement.swap_contract),
            "0x8fd3121013a07c57f0d69646e86e7a4880b467b7"
        );
        assert_eq!(cfg.settlement.fill_guard_size, constants::DEFAULT_FILL_GUARD_SIZE);
    }

    #[test]
    fn malformed_document_is_configuration_error() {
        let err = PeerswapConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, PeerswapError::Configuration(_)));
        let err = PeerswapConfig::from_json_str(r#"{ "directory": { "indexer_address": "0x12" } }"#)
            .unwrap_err();
        assert!(matches!(err, PeerswapError::Configuration(_)));
    }

    #[test]
    fn missing_file_is_configuration_error() {
        let err = PeerswapConfig::from_path("/nonexistent/peerswap.json").unwrap_err();
        assert!(matches!(err, PeerswapError::Configuration(msg) if msg.contains("cannot read")));
    }
}
