//! Transport seam between the directory client and a router.

use async_trait::async_trait;
use peerswap_codec::SigningCapability;
use peerswap_codec::signer::recover_signer;
use peerswap_types::{Address, OrderSignature, PeerswapError, Result};
use tokio::sync::mpsc;

use crate::protocol::Envelope;

/// An authenticated, bidirectional envelope channel to the router.
///
/// Dropping `outbound` tells the router the client went away; `inbound`
/// yielding `None` means the router side is gone.
#[derive(Debug)]
pub struct Link {
    pub outbound: mpsc::Sender<Envelope>,
    pub inbound: mpsc::Receiver<Envelope>,
}

impl Link {
    /// Two connected channel pairs: `(client side, router side)`.
    #[must_use]
    pub fn pair(buffer: usize) -> (Self, Self) {
        let (to_router, from_client) = mpsc::channel(buffer);
        let (to_client, from_router) = mpsc::channel(buffer);
        (
            Self {
                outbound: to_router,
                inbound: from_router,
            },
            Self {
                outbound: to_client,
                inbound: from_client,
            },
        )
    }
}

/// Opens an authenticated [`Link`] for an identity.
///
/// Implementations run the full handshake: receive a challenge, have
/// `identity` personal-sign it, and wait for the router's verdict.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, identity: &dyn SigningCapability) -> Result<Link>;
}

/// A fresh random challenge text.
#[must_use]
pub fn new_challenge() -> String {
    let bytes: [u8; 32] = rand::random();
    format!("peerswap:{}", hex::encode(bytes))
}

/// Encode a handshake signature for the `auth` frame.
#[must_use]
pub fn encode_signature(signature: &OrderSignature) -> String {
    format!("0x{}", hex::encode(signature.to_bytes()))
}

/// Check an `auth` answer against the challenge the router issued.
///
/// # Errors
/// `Connection` if the signature is malformed or recovers to another address.
pub fn verify_auth(challenge: &str, address: Address, signature: &str) -> Result<()> {
    let rejected = |reason: &str| PeerswapError::Connection {
        reason: format!("authentication failed for {address}: {reason}"),
    };
    let bytes = hex::decode(signature.trim_start_matches("0x"))
        .map_err(|_| rejected("signature is not hex"))?;
    let signature = OrderSignature::from_bytes(&bytes).map_err(|e| rejected(&e.to_string()))?;
    match recover_signer(challenge.as_bytes(), &signature) {
        Some(signer) if signer == address => Ok(()),
        _ => Err(rejected("signature does not match address")),
    }
}

#[cfg(test)]
mod tests {
    use peerswap_codec::LocalWallet;

    use super::*;

    #[tokio::test]
    async fn auth_roundtrip() {
        let wallet = LocalWallet::random();
        let challenge = new_challenge();
        let signature = wallet.sign_message(challenge.as_bytes()).await.unwrap();
        let encoded = encode_signature(&signature);
        assert!(verify_auth(&challenge, wallet.address(), &encoded).is_ok());
    }

    #[tokio::test]
    async fn auth_rejects_wrong_address_and_stale_challenge() {
        let wallet = LocalWallet::random();
        let challenge = new_challenge();
        let encoded = encode_signature(&wallet.sign_message(challenge.as_bytes()).await.unwrap());

        let err = verify_auth(&challenge, Address::repeat_byte(9), &encoded).unwrap_err();
        assert!(matches!(err, PeerswapError::Connection { .. }));
        assert!(verify_auth(&new_challenge(), wallet.address(), &encoded).is_err());
        assert!(verify_auth(&challenge, wallet.address(), "0xnothex").is_err());
    }

    #[tokio::test]
    async fn link_pair_is_crossed() {
        let (mut client, mut router) = Link::pair(4);
        let envelope = Envelope::new(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            crate::protocol::RpcMessage::request(
                peerswap_types::RequestId::new(),
                "ping",
                serde_json::Value::Null,
            ),
        );
        client.outbound.send(envelope.clone()).await.unwrap();
        assert_eq!(router.inbound.recv().await.unwrap(), envelope);
        router.outbound.send(envelope.clone()).await.unwrap();
        assert_eq!(client.inbound.recv().await.unwrap(), envelope);
    }
}
