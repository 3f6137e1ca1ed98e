//! In-process swap contract for local runs and tests.
//!
//! Applies the same checks the legacy swap contract applies on `fill`, in the
//! same order, and keeps the per-maker nonce set in memory. Fills land in a
//! new block immediately.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use chrono::Utc;
use peerswap_codec::codec::unix_now;
use peerswap_codec::signer::recover_signer;
use peerswap_codec::{order_hash, verify_signed};
use peerswap_types::{FillReceipt, FillStatus};
use tracing::{info, warn};

use crate::calldata::decode_fill;
use crate::network::{NetworkError, SettlementNetwork, SignedFillTransaction};

#[derive(Default)]
struct Ledger {
    /// `(maker, nonce)` pairs that were filled or cancelled.
    used: HashSet<(Address, U256)>,
    block: u64,
    submissions: u64,
    transport_failures: u32,
}

/// A swap contract at `address`, executed in memory.
pub struct SimulatedSwap {
    address: Address,
    ledger: Mutex<Ledger>,
}

impl SimulatedSwap {
    #[must_use]
    pub fn new(address: Address) -> Self {
        Self {
            address,
            ledger: Mutex::new(Ledger::default()),
        }
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    fn ledger(&self) -> std::sync::MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next `count` submissions fail as unreachable.
    pub fn fail_transport(&self, count: u32) {
        self.ledger().transport_failures = count;
    }

    /// Invalidate a maker's nonce so orders carrying it can no longer fill.
    pub fn cancel(&self, maker: Address, nonce: U256) {
        self.ledger().used.insert((maker, nonce));
    }

    #[must_use]
    pub fn is_used(&self, maker: Address, nonce: U256) -> bool {
        self.ledger().used.contains(&(maker, nonce))
    }

    /// Submissions received, including failed ones.
    #[must_use]
    pub fn submissions(&self) -> u64 {
        self.ledger().submissions
    }

    #[must_use]
    pub fn block_number(&self) -> u64 {
        self.ledger().block
    }
}

#[async_trait]
impl SettlementNetwork for SimulatedSwap {
    async fn submit(&self, tx: SignedFillTransaction) -> Result<FillReceipt, NetworkError> {
        let mut ledger = self.ledger();
        ledger.submissions += 1;
        if ledger.transport_failures > 0 {
            ledger.transport_failures -= 1;
            warn!(contract = %self.address, "Simulated swap: dropping submission");
            return Err(NetworkError::Transport("node unreachable".to_string()));
        }

        let reject = |reason: &str| {
            warn!(contract = %self.address, reason, "Simulated swap: fill reverted");
            Err(NetworkError::Rejected(reason.to_string()))
        };

        if tx.transaction.to != self.address {
            return reject("transaction is not addressed to this contract");
        }
        let sender = recover_signer(tx.transaction.signing_hash().as_slice(), &tx.signature);
        if sender != Some(tx.transaction.from) {
            return reject("transaction signature does not match sender");
        }
        let Ok(signed) = decode_fill(&tx.transaction.data) else {
            return reject("malformed fill calldata");
        };
        let order = signed.order();

        if order.taker_address != Address::ZERO && order.taker_address != tx.transaction.from {
            return reject("sender is not the order's taker");
        }
        if order.is_expired_at(unix_now()) {
            return reject("order expired");
        }
        if !verify_signed(&signed) {
            return reject("order signature invalid");
        }
        let expected_value = if order.pays_eth() {
            order.taker_amount
        } else {
            U256::ZERO
        };
        if tx.transaction.value != expected_value {
            return reject("value does not match takerAmount");
        }
        if !ledger.used.insert(order.replay_key()) {
            return reject("nonce already used");
        }

        ledger.block += 1;
        let receipt = FillReceipt {
            transaction_hash: tx.hash(),
            order_hash: order_hash(order),
            maker: order.maker_address,
            taker: tx.transaction.from,
            nonce: order.nonce,
            status: FillStatus::Confirmed,
            block_number: Some(ledger.block),
            submitted_at: Utc::now(),
        };
        info!(
            contract = %self.address,
            maker = %receipt.maker,
            nonce = %receipt.nonce,
            block = ledger.block,
            "Simulated swap: filled"
        );
        Ok(receipt)
    }
}
