//! Peer directory client.
//!
//! One authenticated link per identity, multiplexing every JSON-RPC call the
//! identity makes. Responses are matched to callers through a correlation
//! table keyed by request id; requests from other peers are handed out on
//! [`DirectoryClient::incoming`].
//!
//! ## Connection lifecycle
//!
//! ```text
//! Disconnected ──connect()──▶ Connecting ──handshake ok──▶ Connected
//!      ▲                          │                            │
//!      └────── handshake failed ──┘     link lost / close() ───┘
//! ```
//!
//! The current state is published on a `watch` channel, so losing the link
//! is observable without making a call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use peerswap_codec::SigningCapability;
use peerswap_types::constants::LINK_BUFFER;
use peerswap_types::{
    Address, DirectoryConfig, Intent, PeerswapError, RequestId, Result, TradingPair,
};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::connector::{Connector, Link};
use crate::protocol::{
    Envelope, FindIntentsParams, GetIntentsParams, IntentList, RpcError, RpcMessage,
    SetIntentsParams, methods,
};

/// Link state as seen by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "DISCONNECTED"),
            Self::Connecting => write!(f, "CONNECTING"),
            Self::Connected => write!(f, "CONNECTED"),
        }
    }
}

/// A JSON-RPC request another peer sent to this identity.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundRequest {
    pub from: Address,
    pub id: RequestId,
    pub method: String,
    pub params: Value,
}

type Reply = std::result::Result<Value, RpcError>;

/// Request id → the peer it was sent to and the waiting caller.
#[derive(Default)]
struct PendingTable {
    waiters: Mutex<HashMap<RequestId, (Address, oneshot::Sender<Reply>)>>,
}

impl PendingTable {
    fn lock(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<RequestId, (Address, oneshot::Sender<Reply>)>> {
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, id: RequestId, peer: Address, tx: oneshot::Sender<Reply>) {
        self.lock().insert(id, (peer, tx));
    }

    /// The waiter for `id`, only if `sender` is the peer it was addressed to.
    fn take_from(&self, id: &RequestId, sender: &Address) -> Option<oneshot::Sender<Reply>> {
        let mut waiters = self.lock();
        match waiters.get(id) {
            Some((peer, _)) if peer == sender => waiters.remove(id).map(|(_, tx)| tx),
            _ => None,
        }
    }

    fn remove(&self, id: &RequestId) {
        self.lock().remove(id);
    }

    /// Drop every waiter; their receivers observe `ConnectionLost`.
    fn fail_all(&self) -> usize {
        let mut waiters = self.lock();
        let count = waiters.len();
        waiters.clear();
        count
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

/// Removes a pending entry when the call finishes or is abandoned.
struct PendingGuard<'a> {
    table: &'a PendingTable,
    id: RequestId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.table.remove(&self.id);
    }
}

struct ActiveLink {
    outbound: mpsc::Sender<Envelope>,
    reader: JoinHandle<()>,
}

/// Client for the router / indexer and for peer-to-peer calls.
pub struct DirectoryClient {
    identity: Arc<dyn SigningCapability>,
    connector: Arc<dyn Connector>,
    config: DirectoryConfig,
    status: Arc<watch::Sender<ConnectionStatus>>,
    link: tokio::sync::Mutex<Option<ActiveLink>>,
    pending: Arc<PendingTable>,
    incoming_tx: mpsc::Sender<InboundRequest>,
    incoming_rx: Mutex<Option<mpsc::Receiver<InboundRequest>>>,
}

impl DirectoryClient {
    #[must_use]
    pub fn new(
        identity: Arc<dyn SigningCapability>,
        connector: Arc<dyn Connector>,
        config: DirectoryConfig,
    ) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Disconnected);
        let (incoming_tx, incoming_rx) = mpsc::channel(LINK_BUFFER);
        Self {
            identity,
            connector,
            config,
            status: Arc::new(status),
            link: tokio::sync::Mutex::new(None),
            pending: Arc::new(PendingTable::default()),
            incoming_tx,
            incoming_rx: Mutex::new(Some(incoming_rx)),
        }
    }

    /// The identity this client authenticates as.
    #[must_use]
    pub fn address(&self) -> Address {
        self.identity.address()
    }

    #[must_use]
    pub fn identity(&self) -> &Arc<dyn SigningCapability> {
        &self.identity
    }

    #[must_use]
    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// Subscribe to connection state changes.
    #[must_use]
    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    #[must_use]
    pub fn current_status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Number of calls waiting for a response.
    #[must_use]
    pub fn pending_calls(&self) -> usize {
        self.pending.len()
    }

    /// Requests other peers send to this identity. Yields the receiver once.
    pub fn incoming(&self) -> Option<mpsc::Receiver<InboundRequest>> {
        self.incoming_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Open and authenticate the link. A no-op when already connected.
    ///
    /// # Errors
    /// `Connection` if the router is unreachable, rejects the handshake, or
    /// does not complete it within the connect timeout.
    pub async fn connect(&self) -> Result<()> {
        let mut link = self.link.lock().await;
        if self.current_status() == ConnectionStatus::Connected && link.is_some() {
            return Ok(());
        }
        if let Some(stale) = link.take() {
            stale.reader.abort();
        }
        self.status.send_replace(ConnectionStatus::Connecting);

        let timeout = self.config.connect_timeout();
        let attempt = tokio::time::timeout(timeout, self.connector.connect(self.identity.as_ref())).await;
        let Link { outbound, inbound } = match attempt {
            Ok(Ok(link)) => link,
            Ok(Err(e)) => {
                self.status.send_replace(ConnectionStatus::Disconnected);
                warn!(url = %self.config.url, error = %e, "Directory: connect failed");
                return Err(match e {
                    e @ PeerswapError::Connection { .. } => e,
                    other => PeerswapError::Connection {
                        reason: other.to_string(),
                    },
                });
            }
            Err(_) => {
                self.status.send_replace(ConnectionStatus::Disconnected);
                return Err(PeerswapError::Connection {
                    reason: format!("handshake not completed within {}ms", timeout.as_millis()),
                });
            }
        };

        let reader = tokio::spawn(read_loop(
            inbound,
            Arc::clone(&self.pending),
            self.incoming_tx.clone(),
            Arc::clone(&self.status),
        ));
        *link = Some(ActiveLink { outbound, reader });
        self.status.send_replace(ConnectionStatus::Connected);
        info!(address = %self.address(), url = %self.config.url, "Directory: connected");
        Ok(())
    }

    /// Disconnect. Every pending call resolves to `ConnectionLost`.
    pub async fn close(&self) {
        if let Some(active) = self.link.lock().await.take() {
            active.reader.abort();
        }
        let failed = self.pending.fail_all();
        self.status.send_replace(ConnectionStatus::Disconnected);
        info!(address = %self.address(), failed_calls = failed, "Directory: closed");
    }

    async fn outbound(&self) -> Result<mpsc::Sender<Envelope>> {
        if self.current_status() != ConnectionStatus::Connected {
            return Err(PeerswapError::NotConnected);
        }
        self.link
            .lock()
            .await
            .as_ref()
            .map(|active| active.outbound.clone())
            .ok_or(PeerswapError::NotConnected)
    }

    /// Send a JSON-RPC request to `peer` and wait up to `timeout` for the reply.
    ///
    /// `timeout` bounds the whole call, including waiting for room on a
    /// congested link. Only a response sent by `peer` completes the call.
    /// Dropping the returned future abandons the call and clears its entry in
    /// the correlation table; a reply arriving later is discarded.
    ///
    /// # Errors
    /// - `NotConnected` before `connect()` or after the link went away
    /// - `CallTimeout` if the request cannot be sent or answered in time
    /// - `ConnectionLost` if the link drops while waiting
    /// - `Remote` if the peer answers with a JSON-RPC error
    pub async fn call(
        &self,
        peer: Address,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value> {
        let id = RequestId::new();
        let exchange = async {
            let outbound = self.outbound().await?;
            let (tx, rx) = oneshot::channel();
            self.pending.insert(id, peer, tx);
            let _guard = PendingGuard {
                table: &self.pending,
                id,
            };

            let envelope = Envelope::new(
                self.address(),
                peer,
                RpcMessage::request(id, method, params),
            );
            outbound
                .send(envelope)
                .await
                .map_err(|_| PeerswapError::ConnectionLost)?;
            debug!(%id, %peer, method, "Directory: call sent");
            rx.await.map_err(|_| PeerswapError::ConnectionLost)
        };

        match tokio::time::timeout(timeout, exchange).await {
            Err(_) => Err(PeerswapError::CallTimeout {
                method: method.to_string(),
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
            Ok(Err(e)) => Err(e),
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(error))) => Err(PeerswapError::Remote {
                code: error.code,
                message: error.message,
            }),
        }
    }

    /// Answer a request received on [`incoming`](Self::incoming).
    pub async fn respond(&self, request: &InboundRequest, outcome: Reply) -> Result<()> {
        let outbound = self.outbound().await?;
        let envelope = Envelope::new(
            self.address(),
            request.from,
            RpcMessage::response(request.id, outcome),
        );
        outbound
            .send(envelope)
            .await
            .map_err(|_| PeerswapError::ConnectionLost)
    }

    async fn indexer_call(&self, method: &str, params: Value) -> Result<Value> {
        let timeout = self.config.discovery_timeout();
        self.call(self.config.indexer_address, method, params, timeout)
            .await
            .map_err(|e| match e {
                PeerswapError::CallTimeout { timeout_ms, .. } => {
                    PeerswapError::DiscoveryTimeout { timeout_ms }
                }
                other => other,
            })
    }

    /// Find intents for any `(maker, taker)` pair from the two token sets.
    ///
    /// An empty result is not an error.
    ///
    /// # Errors
    /// `DiscoveryTimeout` if the indexer does not answer within the
    /// discovery timeout; `Protocol` if its answer is not an intent list.
    pub async fn find_intents(
        &self,
        maker_tokens: &[Address],
        taker_tokens: &[Address],
    ) -> Result<Vec<Intent>> {
        let params = serde_json::to_value(FindIntentsParams {
            maker_tokens: maker_tokens.to_vec(),
            taker_tokens: taker_tokens.to_vec(),
        })?;
        let value = self.indexer_call(methods::FIND_INTENTS, params).await?;
        let intents: IntentList = parse_result(value)?;
        let intents: Vec<Intent> = intents
            .into_iter()
            .filter(|i| i.matches(maker_tokens, taker_tokens))
            .collect();
        info!(
            maker_tokens = maker_tokens.len(),
            taker_tokens = taker_tokens.len(),
            found = intents.len(),
            "Directory: intents discovered"
        );
        Ok(intents)
    }

    /// Register the pairs this identity makes markets in.
    pub async fn set_intents(&self, pairs: Vec<TradingPair>) -> Result<()> {
        let params = serde_json::to_value(SetIntentsParams { intents: pairs })?;
        self.indexer_call(methods::SET_INTENTS, params).await?;
        Ok(())
    }

    /// Intents registered by `address`.
    pub async fn get_intents(&self, address: Address) -> Result<Vec<Intent>> {
        let params = serde_json::to_value(GetIntentsParams { address })?;
        let value = self.indexer_call(methods::GET_INTENTS, params).await?;
        parse_result(value)
    }
}

impl Drop for DirectoryClient {
    fn drop(&mut self) {
        if let Some(active) = self.link.get_mut().take() {
            active.reader.abort();
        }
    }
}

fn parse_result<T: serde::de::DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| PeerswapError::Protocol {
        reason: format!("unexpected result shape: {e}"),
    })
}

async fn read_loop(
    mut inbound: mpsc::Receiver<Envelope>,
    pending: Arc<PendingTable>,
    incoming: mpsc::Sender<InboundRequest>,
    status: Arc<watch::Sender<ConnectionStatus>>,
) {
    while let Some(envelope) = inbound.recv().await {
        match envelope.message {
            RpcMessage::Response(response) => {
                let id = response.id;
                match pending.take_from(&id, &envelope.sender) {
                    Some(waiter) => {
                        let _ = waiter.send(response.into_outcome());
                    }
                    None => debug!(
                        %id,
                        from = %envelope.sender,
                        "Directory: dropping response for unknown request or from another peer"
                    ),
                }
            }
            RpcMessage::Request(request) => {
                let inbound_request = InboundRequest {
                    from: envelope.sender,
                    id: request.id,
                    method: request.method,
                    params: request.params,
                };
                if incoming.try_send(inbound_request).is_err() {
                    warn!(from = %envelope.sender, "Directory: inbound request dropped");
                }
            }
        }
    }
    let failed = pending.fail_all();
    status.send_replace(ConnectionStatus::Disconnected);
    warn!(failed_calls = failed, "Directory: link lost");
}
