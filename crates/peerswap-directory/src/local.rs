//! In-process router and intent indexer.
//!
//! `LocalRouter` is the directory service in miniature: it authenticates
//! identities, routes envelopes by receiver address and answers the indexer
//! methods itself. It backs in-process tests and simulations directly (as a
//! [`Connector`]) and can be exposed over WebSocket with
//! [`serve_router`](crate::ws::serve_router).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use peerswap_codec::SigningCapability;
use peerswap_types::constants::{DEFAULT_INDEXER_ADDRESS, LINK_BUFFER};
use peerswap_types::{Address, Intent, PeerswapError, Result, TradingPair};
use serde_json::Value;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

use crate::connector::{Connector, Link, encode_signature, new_challenge, verify_auth};
use crate::protocol::{
    Envelope, FindIntentsParams, GetIntentsParams, RpcError, RpcMessage, RpcRequest,
    SetIntentsParams, codes, methods,
};

/// Cloneable handle to one router instance.
#[derive(Clone)]
pub struct LocalRouter {
    inner: Arc<RouterState>,
}

struct RouterState {
    indexer: Address,
    /// Live connections by authenticated address.
    peers: RwLock<HashMap<Address, mpsc::Sender<Envelope>>>,
    /// Registered intents in registration order.
    intents: RwLock<Vec<Intent>>,
}

impl Default for LocalRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_indexer(DEFAULT_INDEXER_ADDRESS)
    }

    #[must_use]
    pub fn with_indexer(indexer: Address) -> Self {
        Self {
            inner: Arc::new(RouterState {
                indexer,
                peers: RwLock::new(HashMap::new()),
                intents: RwLock::new(Vec::new()),
            }),
        }
    }

    #[must_use]
    pub fn indexer_address(&self) -> Address {
        self.inner.indexer
    }

    /// Is `address` currently connected?
    pub async fn is_connected(&self, address: &Address) -> bool {
        self.inner
            .peers
            .read()
            .await
            .get(address)
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Register an authenticated address and return the client side of its link.
    ///
    /// A second attach for the same address replaces the first connection.
    pub async fn attach(&self, address: Address) -> Link {
        let (client, mut router_side) = Link::pair(LINK_BUFFER);
        self.inner
            .peers
            .write()
            .await
            .insert(address, router_side.outbound.clone());
        info!(peer = %address, "Router: peer attached");

        let router = self.clone();
        let delivery = router_side.outbound.clone();
        tokio::spawn(async move {
            while let Some(envelope) = router_side.inbound.recv().await {
                router.route(address, envelope).await;
            }
            router.detach(address, &delivery).await;
        });

        client
    }

    async fn detach(&self, address: Address, delivery: &mpsc::Sender<Envelope>) {
        let mut peers = self.inner.peers.write().await;
        if peers.get(&address).is_some_and(|tx| tx.same_channel(delivery)) {
            peers.remove(&address);
            info!(peer = %address, "Router: peer detached");
        }
    }

    async fn route(&self, from: Address, mut envelope: Envelope) {
        // The router, not the client, vouches for the sender.
        envelope.sender = from;

        if envelope.receiver == self.inner.indexer {
            if let RpcMessage::Request(request) = &envelope.message {
                let outcome = self.handle_indexer(from, request).await;
                let reply = envelope.reply(request.id, outcome);
                self.deliver(reply).await;
            }
            return;
        }

        let receiver = envelope.receiver;
        let target = self.inner.peers.read().await.get(&receiver).cloned();
        let delivered = match target {
            Some(tx) => tx.send(envelope.clone()).await.is_ok(),
            None => false,
        };
        if delivered {
            debug!(from = %from, to = %receiver, "Router: envelope delivered");
        } else {
            warn!(from = %from, to = %receiver, "Router: receiver unavailable");
            if let RpcMessage::Request(request) = &envelope.message {
                let reply = envelope.reply(
                    request.id,
                    Err(RpcError::new(
                        codes::PEER_UNAVAILABLE,
                        format!("peer {receiver} is not connected"),
                    )),
                );
                self.deliver(reply).await;
            }
        }
    }

    async fn deliver(&self, envelope: Envelope) {
        let target = self.inner.peers.read().await.get(&envelope.receiver).cloned();
        if let Some(tx) = target {
            let _ = tx.send(envelope).await;
        }
    }

    async fn handle_indexer(
        &self,
        from: Address,
        request: &RpcRequest,
    ) -> std::result::Result<Value, RpcError> {
        match request.method.as_str() {
            methods::FIND_INTENTS => {
                let params: FindIntentsParams = parse_params(&request.params)?;
                let found: Vec<Intent> = self
                    .inner
                    .intents
                    .read()
                    .await
                    .iter()
                    .filter(|i| i.matches(&params.maker_tokens, &params.taker_tokens))
                    .cloned()
                    .collect();
                debug!(from = %from, count = found.len(), "Indexer: findIntents");
                to_value(&found)
            }
            methods::SET_INTENTS => {
                let params: SetIntentsParams = parse_params(&request.params)?;
                self.set_intents(from, &params.intents).await;
                Ok(Value::Bool(true))
            }
            methods::GET_INTENTS => {
                let params: GetIntentsParams = parse_params(&request.params)?;
                let found: Vec<Intent> = self
                    .inner
                    .intents
                    .read()
                    .await
                    .iter()
                    .filter(|i| i.peer_address == params.address)
                    .cloned()
                    .collect();
                to_value(&found)
            }
            other => Err(RpcError::method_not_found(other)),
        }
    }

    /// Replace the intents registered for `peer`.
    pub async fn set_intents(&self, peer: Address, pairs: &[TradingPair]) {
        let mut intents = self.inner.intents.write().await;
        intents.retain(|i| i.peer_address != peer);
        intents.extend(pairs.iter().map(|p| p.for_peer(peer)));
        info!(peer = %peer, count = pairs.len(), "Indexer: intents set");
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(params: &Value) -> std::result::Result<T, RpcError> {
    serde_json::from_value(params.clone()).map_err(|e| RpcError::invalid_params(e.to_string()))
}

fn to_value<T: serde::Serialize>(value: &T) -> std::result::Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::new(codes::INTERNAL_ERROR, e.to_string()))
}

#[async_trait]
impl Connector for LocalRouter {
    async fn connect(&self, identity: &dyn SigningCapability) -> Result<Link> {
        let challenge = new_challenge();
        let signature = identity
            .sign_message(challenge.as_bytes())
            .await
            .map_err(|e| PeerswapError::Connection {
                reason: format!("could not sign challenge: {e}"),
            })?;
        let address = identity.address();
        verify_auth(&challenge, address, &encode_signature(&signature))?;
        Ok(self.attach(address).await)
    }
}

#[cfg(test)]
mod tests {
    use peerswap_codec::LocalWallet;
    use peerswap_types::RequestId;

    use super::*;

    fn request(method: &str, params: Value) -> RpcMessage {
        RpcMessage::request(RequestId::new(), method, params)
    }

    async fn reply(link: &mut Link) -> std::result::Result<Value, RpcError> {
        match link.inbound.recv().await.unwrap().message {
            RpcMessage::Response(r) => r.into_outcome(),
            RpcMessage::Request(r) => panic!("unexpected request {r:?}"),
        }
    }

    #[tokio::test]
    async fn connect_registers_identity() {
        let router = LocalRouter::new();
        let wallet = LocalWallet::random();
        let _link = router.connect(&wallet).await.unwrap();
        assert!(router.is_connected(&wallet.address()).await);
    }

    #[tokio::test]
    async fn indexer_sets_and_finds_intents() {
        let router = LocalRouter::new();
        let maker = LocalWallet::random();
        let dai = Address::repeat_byte(0xda);
        let mut link = router.connect(&maker).await.unwrap();

        let set = request(
            methods::SET_INTENTS,
            serde_json::to_value(SetIntentsParams {
                intents: vec![TradingPair::new(dai, Address::ZERO)],
            })
            .unwrap(),
        );
        link.outbound
            .send(Envelope::new(maker.address(), router.indexer_address(), set))
            .await
            .unwrap();
        assert_eq!(reply(&mut link).await, Ok(Value::Bool(true)));

        let find = request(
            methods::FIND_INTENTS,
            serde_json::to_value(FindIntentsParams {
                maker_tokens: vec![dai],
                taker_tokens: vec![Address::ZERO],
            })
            .unwrap(),
        );
        link.outbound
            .send(Envelope::new(maker.address(), router.indexer_address(), find))
            .await
            .unwrap();
        let found: Vec<Intent> = serde_json::from_value(reply(&mut link).await.unwrap()).unwrap();
        assert_eq!(found, vec![Intent::new(maker.address(), dai, Address::ZERO)]);
    }

    #[tokio::test]
    async fn sender_is_overwritten_with_authenticated_address() {
        let router = LocalRouter::new();
        let a = LocalWallet::random();
        let b = LocalWallet::random();
        let mut link_a = router.connect(&a).await.unwrap();
        let mut link_b = router.connect(&b).await.unwrap();

        let spoofed = Envelope::new(
            Address::repeat_byte(0x66),
            b.address(),
            request(methods::GET_ORDER, Value::Null),
        );
        link_a.outbound.send(spoofed).await.unwrap();
        let received = link_b.inbound.recv().await.unwrap();
        assert_eq!(received.sender, a.address());
        assert!(link_a.inbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn unknown_receiver_gets_error_reply() {
        let router = LocalRouter::new();
        let a = LocalWallet::random();
        let mut link = router.connect(&a).await.unwrap();
        link.outbound
            .send(Envelope::new(
                a.address(),
                Address::repeat_byte(0x77),
                request(methods::GET_ORDER, Value::Null),
            ))
            .await
            .unwrap();
        let err = reply(&mut link).await.unwrap_err();
        assert_eq!(err.code, codes::PEER_UNAVAILABLE);
    }

    #[tokio::test]
    async fn unknown_method_and_bad_params() {
        let router = LocalRouter::new();
        let a = LocalWallet::random();
        let mut link = router.connect(&a).await.unwrap();
        let indexer = router.indexer_address();

        link.outbound
            .send(Envelope::new(a.address(), indexer, request("bogus", Value::Null)))
            .await
            .unwrap();
        assert_eq!(reply(&mut link).await.unwrap_err().code, codes::METHOD_NOT_FOUND);

        link.outbound
            .send(Envelope::new(
                a.address(),
                indexer,
                request(methods::FIND_INTENTS, serde_json::json!({ "makerTokens": 3 })),
            ))
            .await
            .unwrap();
        assert_eq!(reply(&mut link).await.unwrap_err().code, codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn dropping_link_detaches_peer() {
        let router = LocalRouter::new();
        let a = LocalWallet::random();
        let link = router.connect(&a).await.unwrap();
        drop(link);
        for _ in 0..50 {
            if !router.is_connected(&a.address()).await {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("peer still attached after link drop");
    }
}
