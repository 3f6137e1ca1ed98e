//! The execution network seam.
//!
//! The submitter never talks to a node directly. It builds a
//! [`FillTransaction`], has the taker sign it, and hands the result to a
//! [`SettlementNetwork`].

use alloy_primitives::{Address, B256, U256, keccak256};
use async_trait::async_trait;
use peerswap_types::constants::DEFAULT_FILL_GAS_LIMIT;
use peerswap_types::{FillReceipt, OrderSignature, SubmissionError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fee parameters, passed through to the network untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasParams {
    pub gas_limit: u64,
    /// Wei per gas; `0` lets the network choose.
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

impl Default for GasParams {
    fn default() -> Self {
        Self {
            gas_limit: DEFAULT_FILL_GAS_LIMIT,
            max_fee_per_gas: 0,
            max_priority_fee_per_gas: 0,
        }
    }
}

/// An unsigned call to the swap contract's `fill`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillTransaction {
    /// The taker, who pays for and signs the call.
    pub from: Address,
    /// The swap contract.
    pub to: Address,
    /// Wei attached; the taker amount when the taker pays in ETH.
    pub value: U256,
    pub data: Vec<u8>,
    pub gas: GasParams,
}

impl FillTransaction {
    /// Digest the taker signs: `keccak256(from ‖ to ‖ value ‖ gas ‖ keccak256(data))`.
    #[must_use]
    pub fn signing_hash(&self) -> B256 {
        let mut preimage = Vec::with_capacity(20 + 20 + 32 + 8 + 16 + 16 + 32);
        preimage.extend_from_slice(self.from.as_slice());
        preimage.extend_from_slice(self.to.as_slice());
        preimage.extend_from_slice(&self.value.to_be_bytes::<32>());
        preimage.extend_from_slice(&self.gas.gas_limit.to_be_bytes());
        preimage.extend_from_slice(&self.gas.max_fee_per_gas.to_be_bytes());
        preimage.extend_from_slice(&self.gas.max_priority_fee_per_gas.to_be_bytes());
        preimage.extend_from_slice(keccak256(&self.data).as_slice());
        keccak256(preimage)
    }
}

/// A fill transaction with the taker's signature over its signing hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedFillTransaction {
    pub transaction: FillTransaction,
    pub signature: OrderSignature,
}

impl SignedFillTransaction {
    /// Identifier of the signed transaction.
    #[must_use]
    pub fn hash(&self) -> B256 {
        let mut preimage = Vec::with_capacity(32 + 65);
        preimage.extend_from_slice(self.transaction.signing_hash().as_slice());
        preimage.extend_from_slice(&self.signature.to_bytes());
        keccak256(preimage)
    }
}

/// Why the network did not accept a fill.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// The contract (or node) refused the call; resubmitting will not help.
    #[error("rejected: {0}")]
    Rejected(String),
    /// The network could not be reached.
    #[error("transport: {0}")]
    Transport(String),
}

impl From<NetworkError> for SubmissionError {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::Rejected(reason) => Self::Rejected { reason },
            NetworkError::Transport(reason) => Self::Transport { reason },
        }
    }
}

/// Somewhere signed fills can be sent.
#[async_trait]
pub trait SettlementNetwork: Send + Sync {
    async fn submit(&self, transaction: SignedFillTransaction) -> Result<FillReceipt, NetworkError>;
}
