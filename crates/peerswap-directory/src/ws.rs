//! WebSocket transport.
//!
//! Frames from [`protocol`](crate::protocol) travel as text messages, one
//! JSON object per message.

use std::fmt::Display;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Sink, SinkExt, Stream, StreamExt};
use peerswap_codec::SigningCapability;
use peerswap_types::constants::{DEFAULT_CONNECT_TIMEOUT_MS, LINK_BUFFER};
use peerswap_types::{PeerswapError, Result};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, info, warn};

use crate::connector::{Connector, Link, encode_signature, new_challenge, verify_auth};
use crate::local::LocalRouter;
use crate::protocol::Frame;

/// Connects to a router over `ws://` or `wss://`.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, identity: &dyn SigningCapability) -> Result<Link> {
        let (socket, _) = tokio_tungstenite::connect_async(&self.url)
            .await
            .map_err(|e| PeerswapError::Connection {
                reason: format!("{}: {e}", self.url),
            })?;
        let (mut sink, mut stream) = socket.split();

        let challenge = match next_frame(&mut stream).await? {
            Frame::Challenge { challenge } => challenge,
            other => return Err(unexpected("challenge", &other)),
        };
        let signature = identity
            .sign_message(challenge.as_bytes())
            .await
            .map_err(|e| PeerswapError::Connection {
                reason: format!("could not sign challenge: {e}"),
            })?;
        send_frame(
            &mut sink,
            &Frame::Auth {
                address: identity.address(),
                signature: encode_signature(&signature),
            },
        )
        .await?;

        match next_frame(&mut stream).await? {
            Frame::Ready { .. } => {}
            Frame::Rejected { reason } => return Err(PeerswapError::Connection { reason }),
            other => return Err(unexpected("ready", &other)),
        }
        info!(url = %self.url, address = %identity.address(), "Directory: websocket link ready");

        let (client, pump) = Link::pair(LINK_BUFFER);
        let Link {
            outbound: to_client,
            inbound: mut from_client,
        } = pump;

        tokio::spawn(async move {
            while let Some(envelope) = from_client.recv().await {
                if send_frame(&mut sink, &Frame::Envelope(envelope)).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        tokio::spawn(async move {
            loop {
                match next_frame(&mut stream).await {
                    Ok(Frame::Envelope(envelope)) => {
                        if to_client.send(envelope).await.is_err() {
                            break;
                        }
                    }
                    Ok(other) => debug!(frame = ?other, "Directory: ignoring non-envelope frame"),
                    Err(e) => {
                        debug!(error = %e, "Directory: websocket reader stopped");
                        break;
                    }
                }
            }
        });

        Ok(client)
    }
}

/// Accept WebSocket connections and attach them to `router`.
///
/// Runs until the listener fails permanently; spawn it.
pub async fn serve_router(listener: TcpListener, router: LocalRouter) {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Router: listening for websocket peers");
    }
    loop {
        match listener.accept().await {
            Ok((tcp, addr)) => {
                let router = router.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_socket(tcp, router).await {
                        debug!(%addr, error = %e, "Router: websocket session ended");
                    }
                });
            }
            Err(e) => {
                warn!(error = %e, "Router: accept failed");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}

async fn handle_socket(tcp: TcpStream, router: LocalRouter) -> Result<()> {
    let socket = tokio_tungstenite::accept_async(tcp)
        .await
        .map_err(|e| PeerswapError::Connection {
            reason: e.to_string(),
        })?;
    let (mut sink, mut stream) = socket.split();

    let challenge = new_challenge();
    send_frame(
        &mut sink,
        &Frame::Challenge {
            challenge: challenge.clone(),
        },
    )
    .await?;

    let auth = tokio::time::timeout(
        Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
        next_frame(&mut stream),
    )
    .await
    .map_err(|_| PeerswapError::Connection {
        reason: "no auth before deadline".to_string(),
    })??;
    let Frame::Auth { address, signature } = auth else {
        return Err(unexpected("auth", &auth));
    };
    if let Err(e) = verify_auth(&challenge, address, &signature) {
        let _ = send_frame(
            &mut sink,
            &Frame::Rejected {
                reason: e.to_string(),
            },
        )
        .await;
        return Err(e);
    }
    send_frame(&mut sink, &Frame::Ready { address }).await?;

    let Link {
        outbound: to_router,
        inbound: mut deliveries,
    } = router.attach(address).await;

    let writer = tokio::spawn(async move {
        while let Some(envelope) = deliveries.recv().await {
            if send_frame(&mut sink, &Frame::Envelope(envelope)).await.is_err() {
                break;
            }
        }
    });

    let result = loop {
        match next_frame(&mut stream).await {
            Ok(Frame::Envelope(envelope)) => {
                if to_router.send(envelope).await.is_err() {
                    break Ok(());
                }
            }
            Ok(other) => debug!(frame = ?other, "Router: ignoring non-envelope frame"),
            Err(PeerswapError::ConnectionLost) => break Ok(()),
            Err(e) => break Err(e),
        }
    };
    writer.abort();
    result
}

async fn send_frame<S>(sink: &mut S, frame: &Frame) -> Result<()>
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let text = serde_json::to_string(frame)?;
    sink.send(Message::Text(text))
        .await
        .map_err(|e| PeerswapError::Connection {
            reason: e.to_string(),
        })
}

/// Next protocol frame; `ConnectionLost` once the socket closes.
async fn next_frame<S>(stream: &mut S) -> Result<Frame>
where
    S: Stream<Item = std::result::Result<Message, WsError>> + Unpin,
{
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                return serde_json::from_str(&text).map_err(|e| PeerswapError::Protocol {
                    reason: format!("bad frame: {e}"),
                });
            }
            Some(Ok(Message::Close(_))) | None => return Err(PeerswapError::ConnectionLost),
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                return Err(PeerswapError::Connection {
                    reason: e.to_string(),
                });
            }
        }
    }
}

fn unexpected(wanted: &str, got: &Frame) -> PeerswapError {
    PeerswapError::Protocol {
        reason: format!("expected {wanted} frame, got {got:?}"),
    }
}
