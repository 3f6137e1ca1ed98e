//! Scripted peers for negotiation tests.

use std::sync::Arc;

use peerswap_codec::codec::unix_now;
use peerswap_codec::{LocalWallet, SigningCapability};
use peerswap_types::{
    DirectoryConfig, NegotiationConfig, Order, OrderRequest, SignedOrder,
    TradingPair, U256, WireOrder, WireOrderRequest,
};
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::client::DirectoryClient;
use crate::connector::Connector;
use crate::maker::{MakerService, OrderQuoter};
use crate::protocol::RpcError;

/// How a scripted peer answers `getOrder`.
pub enum PeerScript {
    /// Quote honestly through a [`MakerService`].
    Honest(Arc<dyn OrderQuoter>),
    /// Never answer.
    Silent,
    /// Answer with a JSON-RPC error.
    Decline(String),
    /// Quote correctly but sign with a key other than the maker's.
    WrongSigner(LocalWallet),
    /// Answer with an arbitrary result value.
    Raw(Value),
}

/// A connected peer running a script. Dropping it does not stop the script;
/// abort `task` or close `client` to take the peer offline.
pub struct ScriptedPeer {
    pub client: Arc<DirectoryClient>,
    pub task: JoinHandle<()>,
}

impl ScriptedPeer {
    /// Connect a fresh identity, register `pairs` and start answering.
    pub async fn spawn(
        connector: Arc<dyn Connector>,
        pairs: Vec<TradingPair>,
        script: PeerScript,
    ) -> peerswap_types::Result<Self> {
        let wallet = LocalWallet::random();
        let client = Arc::new(DirectoryClient::new(
            Arc::new(wallet),
            connector,
            DirectoryConfig::default(),
        ));
        client.connect().await?;
        client.set_intents(pairs).await?;
        let mut incoming = client.incoming().ok_or(peerswap_types::PeerswapError::Internal(
            "incoming requests already taken".to_string(),
        ))?;

        let task = match script {
            PeerScript::Honest(quoter) => {
                let service = Arc::new(MakerService::new(
                    Arc::clone(&client),
                    quoter,
                    &NegotiationConfig::default(),
                ));
                tokio::spawn(service.run(incoming))
            }
            PeerScript::Silent => tokio::spawn(async move {
                while incoming.recv().await.is_some() {}
            }),
            PeerScript::Decline(reason) => {
                let peer = Arc::clone(&client);
                tokio::spawn(async move {
                    while let Some(request) = incoming.recv().await {
                        let _ = peer
                            .respond(&request, Err(RpcError::declined(reason.clone())))
                            .await;
                    }
                })
            }
            PeerScript::WrongSigner(impostor) => {
                let peer = Arc::clone(&client);
                tokio::spawn(async move {
                    while let Some(request) = incoming.recv().await {
                        let outcome = match serde_json::from_value::<WireOrderRequest>(request.params.clone())
                            .ok()
                            .and_then(|w| OrderRequest::try_from(w).ok())
                        {
                            Some(order_request) => {
                                let order = mirror_order(peer.address(), &order_request);
                                match impostor.sign_order(&order).await {
                                    Ok(signature) => serde_json::to_value(WireOrder::from(
                                        &SignedOrder::new(order, signature),
                                    ))
                                    .map_err(|e| RpcError::invalid_params(e.to_string())),
                                    Err(e) => Err(RpcError::declined(e.to_string())),
                                }
                            }
                            None => Err(RpcError::invalid_params("bad request")),
                        };
                        let _ = peer.respond(&request, outcome).await;
                    }
                })
            }
            PeerScript::Raw(value) => {
                let peer = Arc::clone(&client);
                tokio::spawn(async move {
                    while let Some(request) = incoming.recv().await {
                        let _ = peer.respond(&request, Ok(value.clone())).await;
                    }
                })
            }
        };

        Ok(Self { client, task })
    }

    #[must_use]
    pub fn address(&self) -> peerswap_types::Address {
        self.client.address()
    }
}

/// An order answering `request` one-for-one, made by `maker`.
#[must_use]
pub fn mirror_order(maker: peerswap_types::Address, request: &OrderRequest) -> Order {
    let amount = request.amount.value();
    Order {
        maker_address: maker,
        maker_amount: amount,
        maker_token: request.maker_token,
        taker_address: request.taker_address,
        taker_amount: amount,
        taker_token: request.taker_token,
        expiration: unix_now() + 300,
        nonce: U256::from(1u64),
    }
}
