//! Order signing and verification.
//!
//! Signing goes through [`SigningCapability`], which may be an in-process key
//! ([`LocalWallet`]) or a wallet that waits on a human. Verification never
//! needs a capability: it recovers the signer from the signature and compares
//! it with the claimed address.

use std::time::Duration;

use alloy_primitives::{Address, B256, Signature, U256};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use peerswap_types::{Order, OrderSignature, PeerswapError, SignedOrder, SignerError};
use rand::RngCore;

use crate::codec::order_hash;

/// Something that holds an identity and can sign on its behalf.
///
/// Signatures are EIP-191 personal-sign over the given bytes. Implementations
/// may block on user approval; callers bound that with [`sign_within`] or by
/// dropping the future.
#[async_trait]
pub trait SigningCapability: Send + Sync {
    /// The identity this capability signs for.
    fn address(&self) -> Address;

    /// Personal-sign arbitrary bytes.
    async fn sign_message(&self, message: &[u8]) -> Result<OrderSignature, SignerError>;

    /// Sign an order's canonical hash.
    async fn sign_order(&self, order: &Order) -> Result<OrderSignature, SignerError> {
        self.sign_message(order_hash(order).as_slice()).await
    }
}

/// In-process secp256k1 key.
#[derive(Clone)]
pub struct LocalWallet {
    inner: PrivateKeySigner,
}

impl LocalWallet {
    /// Wrap an existing key.
    #[must_use]
    pub fn new(inner: PrivateKeySigner) -> Self {
        Self { inner }
    }

    /// Build from a 32-byte secret.
    ///
    /// # Errors
    /// `Failed` if the bytes are not a valid secp256k1 scalar.
    pub fn from_secret(secret: &B256) -> Result<Self, SignerError> {
        PrivateKeySigner::from_bytes(secret)
            .map(Self::new)
            .map_err(|e| SignerError::Failed {
                reason: e.to_string(),
            })
    }

    /// Build from a hex secret (with or without `0x`).
    pub fn from_hex(secret: &str) -> Result<Self, SignerError> {
        let digits = secret.trim().trim_start_matches("0x");
        let bytes = hex::decode(digits)
            .ok()
            .filter(|b| b.len() == 32)
            .ok_or_else(|| SignerError::Failed {
                reason: "secret must be 32 bytes of hex".to_string(),
            })?;
        Self::from_secret(&B256::from_slice(&bytes))
    }

    /// A fresh random key.
    #[must_use]
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        loop {
            let mut secret = B256::ZERO;
            rng.fill_bytes(secret.as_mut_slice());
            // Out-of-range scalars are astronomically rare; draw again.
            if let Ok(wallet) = Self::from_secret(&secret) {
                return wallet;
            }
        }
    }
}

impl std::fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalWallet")
            .field("address", &self.inner.address())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SigningCapability for LocalWallet {
    fn address(&self) -> Address {
        self.inner.address()
    }

    async fn sign_message(&self, message: &[u8]) -> Result<OrderSignature, SignerError> {
        let signature = self
            .inner
            .sign_message(message)
            .await
            .map_err(|e| SignerError::Failed {
                reason: e.to_string(),
            })?;
        Ok(to_order_signature(&signature))
    }
}

/// Split an alloy signature into the `v`/`r`/`s` form orders carry.
#[must_use]
pub fn to_order_signature(signature: &Signature) -> OrderSignature {
    OrderSignature {
        v: if signature.v() { 28 } else { 27 },
        r: B256::from(signature.r().to_be_bytes::<32>()),
        s: B256::from(signature.s().to_be_bytes::<32>()),
    }
}

fn to_alloy_signature(signature: &OrderSignature) -> Signature {
    Signature::new(
        U256::from_be_bytes(signature.r.0),
        U256::from_be_bytes(signature.s.0),
        signature.y_parity(),
    )
}

/// Recover the personal-sign signer of `message`, if the signature is valid.
#[must_use]
pub fn recover_signer(message: &[u8], signature: &OrderSignature) -> Option<Address> {
    to_alloy_signature(signature)
        .recover_address_from_msg(message)
        .ok()
}

/// Sign an order with the given capability.
///
/// # Errors
/// Whatever the capability reports (`Declined`, `Unavailable`, `Failed`).
pub async fn sign(
    order: Order,
    capability: &dyn SigningCapability,
) -> Result<SignedOrder, SignerError> {
    let signature = capability.sign_order(&order).await?;
    tracing::debug!(
        maker = %order.maker_address,
        nonce = %order.nonce,
        v = signature.v,
        "Order signed"
    );
    Ok(SignedOrder::new(order, signature))
}

/// [`sign`] bounded by a deadline.
///
/// # Errors
/// `TimedOut` if the capability has not produced a signature within
/// `deadline`; the pending signing call is dropped.
pub async fn sign_within(
    order: Order,
    capability: &dyn SigningCapability,
    deadline: Duration,
) -> Result<SignedOrder, SignerError> {
    let timeout_ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX);
    tokio::time::timeout(deadline, sign(order, capability))
        .await
        .map_err(|_| SignerError::TimedOut { timeout_ms })?
}

/// `true` iff `signature` over `order_hash(order)` recovers to `claimed_signer`.
///
/// Recovery errors are reported as `false`, never as a fault.
#[must_use]
pub fn verify(order: &Order, signature: &OrderSignature, claimed_signer: Address) -> bool {
    recover_signer(order_hash(order).as_slice(), signature) == Some(claimed_signer)
}

/// Verify a signed order against its own `maker_address`.
#[must_use]
pub fn verify_signed(signed: &SignedOrder) -> bool {
    verify(signed.order(), signed.signature(), signed.order().maker_address)
}

/// Construct a [`SignedOrder`] only if the signature belongs to the maker.
///
/// # Errors
/// `SignatureInvalid` when recovery does not yield `order.maker_address`.
pub fn verified(order: Order, signature: OrderSignature) -> Result<SignedOrder, PeerswapError> {
    if verify(&order, &signature, order.maker_address) {
        Ok(SignedOrder::new(order, signature))
    } else {
        Err(PeerswapError::SignatureInvalid {
            claimed: order.maker_address,
        })
    }
}
