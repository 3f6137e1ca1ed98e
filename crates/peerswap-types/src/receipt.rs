//! Settlement receipts returned after a fill is submitted.

use alloy_primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How far the fill transaction got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FillStatus {
    /// Accepted by the network, not yet included.
    Submitted,
    /// Included and executed successfully.
    Confirmed,
}

impl std::fmt::Display for FillStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Submitted => write!(f, "SUBMITTED"),
            Self::Confirmed => write!(f, "CONFIRMED"),
        }
    }
}

/// Proof that a signed order was handed to the settlement network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillReceipt {
    /// Hash of the submitted transaction.
    pub transaction_hash: B256,
    /// `keccak256` of the canonical order encoding.
    pub order_hash: B256,
    pub maker: Address,
    pub taker: Address,
    pub nonce: U256,
    pub status: FillStatus,
    /// Block the fill landed in, once confirmed.
    pub block_number: Option<u64>,
    pub submitted_at: DateTime<Utc>,
}

impl FillReceipt {
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.status == FillStatus::Confirmed
    }
}
