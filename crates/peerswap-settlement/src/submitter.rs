//! Settlement submitter: turns a chosen signed order into a fill.
//!
//! Local checks run before anything leaves the process:
//! 1. Shape (amounts, tokens, maker), then expiry
//! 2. Maker signature
//! 3. Taker identity (the order must name the taker filling it)
//! 4. Fill guard (no second fill of the same `(maker, nonce)`)
//!
//! Only then is the `fill` transaction built, signed by the taker and sent.

use std::sync::{Arc, Mutex, PoisonError};

use alloy_primitives::{Address, U256};
use peerswap_codec::codec::unix_now;
use peerswap_codec::{SigningCapability, validate_shape_at, verify_signed};
use peerswap_types::{
    FillReceipt, Order, SettlementConfig, SignedOrder, SubmissionError, ValidationError,
};
use tracing::{info, warn};

use crate::calldata::encode_fill;
use crate::fill_guard::FillGuard;
use crate::network::{FillTransaction, GasParams, SettlementNetwork, SignedFillTransaction};
use crate::retry::RetryPolicy;

/// Submits fills for one swap contract.
pub struct SettlementSubmitter {
    network: Arc<dyn SettlementNetwork>,
    swap_contract: Address,
    guard: Mutex<FillGuard>,
    retry: RetryPolicy,
}

impl SettlementSubmitter {
    #[must_use]
    pub fn new(network: Arc<dyn SettlementNetwork>, config: &SettlementConfig) -> Self {
        Self {
            network,
            swap_contract: config.swap_contract,
            guard: Mutex::new(FillGuard::new(config.fill_guard_size.max(1))),
            retry: RetryPolicy::from(&config.retry),
        }
    }

    #[must_use]
    pub fn swap_contract(&self) -> Address {
        self.swap_contract
    }

    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, FillGuard> {
        self.guard.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether this submitter has already filled `order`.
    #[must_use]
    pub fn is_filled(&self, order: &Order) -> bool {
        self.guard().is_filled(order)
    }

    /// Run the local checks and build the unsigned `fill` transaction.
    ///
    /// # Errors
    /// `OrderExpired` or `Invalid`; see the module docs for the order of checks.
    pub fn prepare(
        &self,
        signed: &SignedOrder,
        taker: Address,
        gas: &GasParams,
    ) -> Result<FillTransaction, SubmissionError> {
        self.prepare_at(signed, taker, gas, unix_now())
    }

    fn prepare_at(
        &self,
        signed: &SignedOrder,
        taker: Address,
        gas: &GasParams,
        now: u64,
    ) -> Result<FillTransaction, SubmissionError> {
        let order = signed.order();
        match validate_shape_at(order, now) {
            Ok(()) => {}
            Err(ValidationError::Expired { expiration, now }) => {
                return Err(SubmissionError::OrderExpired { expiration, now });
            }
            Err(e) => {
                return Err(SubmissionError::Invalid {
                    reason: e.to_string(),
                });
            }
        }
        if !verify_signed(signed) {
            return Err(SubmissionError::Invalid {
                reason: format!("signature does not recover to maker {}", order.maker_address),
            });
        }
        if order.taker_address == Address::ZERO {
            return Err(SubmissionError::Invalid {
                reason: "order names no taker".to_string(),
            });
        }
        if order.taker_address != taker {
            return Err(SubmissionError::Invalid {
                reason: format!("order is for taker {}, not {taker}", order.taker_address),
            });
        }

        Ok(FillTransaction {
            from: taker,
            to: self.swap_contract,
            value: if order.pays_eth() {
                order.taker_amount
            } else {
                U256::ZERO
            },
            data: encode_fill(signed),
            gas: *gas,
        })
    }

    /// Fill `signed` once, as `taker`.
    ///
    /// # Errors
    /// - `OrderExpired` / `Invalid` from the local checks
    /// - `Rejected` if already filled here or refused by the network
    /// - `Signer` if the taker will not sign the transaction
    /// - `Transport` if the network is unreachable
    pub async fn fill(
        &self,
        signed: &SignedOrder,
        taker: &dyn SigningCapability,
        gas: &GasParams,
    ) -> Result<FillReceipt, SubmissionError> {
        let order = signed.order();
        let transaction = self.prepare(signed, taker.address(), gas)?;
        self.guard().claim(order)?;

        let outcome = self.sign_and_submit(transaction, taker).await;
        match &outcome {
            Ok(receipt) => info!(
                maker = %receipt.maker,
                taker = %receipt.taker,
                nonce = %receipt.nonce,
                tx = %receipt.transaction_hash,
                status = %receipt.status,
                "Settlement: order filled"
            ),
            Err(e) => {
                self.guard().release(order);
                warn!(maker = %order.maker_address, nonce = %order.nonce, error = %e, "Settlement: fill failed");
            }
        }
        outcome
    }

    async fn sign_and_submit(
        &self,
        transaction: FillTransaction,
        taker: &dyn SigningCapability,
    ) -> Result<FillReceipt, SubmissionError> {
        let signature = taker
            .sign_message(transaction.signing_hash().as_slice())
            .await?;
        let receipt = self
            .network
            .submit(SignedFillTransaction {
                transaction,
                signature,
            })
            .await?;
        Ok(receipt)
    }

    /// [`fill`](Self::fill), retrying transport failures with `policy`.
    ///
    /// Expiry is re-checked before every attempt, so a retry never submits a
    /// stale order.
    ///
    /// # Errors
    /// The first non-retryable error, or the last transport error once
    /// attempts run out.
    pub async fn fill_with_retry(
        &self,
        signed: &SignedOrder,
        taker: &dyn SigningCapability,
        gas: &GasParams,
        policy: &RetryPolicy,
    ) -> Result<FillReceipt, SubmissionError> {
        let max = policy.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            let now = unix_now();
            if signed.order().is_expired_at(now) {
                return Err(SubmissionError::OrderExpired {
                    expiration: signed.order().expiration,
                    now,
                });
            }
            match self.fill(signed, taker, gas).await {
                Err(e) if e.is_retryable() && attempt + 1 < max => {
                    let delay = policy.backoff(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = max,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "Settlement: retrying fill"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use peerswap_codec::{LocalWallet, sign};

    use super::*;
    use crate::simulated::SimulatedSwap;

    const NOW: u64 = 1_700_000_000;

    fn submitter() -> SettlementSubmitter {
        let network = Arc::new(SimulatedSwap::new(Address::repeat_byte(0x5a)));
        let config = SettlementConfig {
            swap_contract: Address::repeat_byte(0x5a),
            ..SettlementConfig::default()
        };
        SettlementSubmitter::new(network, &config)
    }

    async fn signed_for(taker: Address) -> SignedOrder {
        let maker = LocalWallet::random();
        sign(Order::dummy(maker.address(), taker, NOW), &maker)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn prepare_pays_eth_value_and_encodes_calldata() {
        let taker = Address::repeat_byte(0x22);
        let signed = signed_for(taker).await;
        let tx = submitter()
            .prepare_at(&signed, taker, &GasParams::default(), NOW)
            .unwrap();
        assert_eq!(tx.to, Address::repeat_byte(0x5a));
        assert_eq!(tx.value, U256::from(1_000_000u64));
        assert_eq!(tx.data, encode_fill(&signed));
    }

    #[tokio::test]
    async fn prepare_checks_expiry_signature_and_taker() {
        let taker = Address::repeat_byte(0x22);
        let signed = signed_for(taker).await;
        let s = submitter();
        let gas = GasParams::default();

        assert!(matches!(
            s.prepare_at(&signed, taker, &gas, NOW + 3600),
            Err(SubmissionError::OrderExpired { .. })
        ));
        assert!(matches!(
            s.prepare_at(&signed, Address::repeat_byte(0x33), &gas, NOW),
            Err(SubmissionError::Invalid { .. })
        ));

        let (mut order, signature) = signed.into_parts();
        order.taker_amount = U256::from(1u64);
        let tampered = SignedOrder::new(order, signature);
        let err = s.prepare_at(&tampered, taker, &gas, NOW).unwrap_err();
        assert!(err.to_string().contains("signature"), "{err}");
    }

    #[tokio::test]
    async fn open_orders_are_refused() {
        let signed = signed_for(Address::ZERO).await;
        let err = submitter()
            .prepare_at(&signed, Address::repeat_byte(0x22), &GasParams::default(), NOW)
            .unwrap_err();
        assert_eq!(
            err,
            SubmissionError::Invalid {
                reason: "order names no taker".to_string()
            }
        );
    }
}
