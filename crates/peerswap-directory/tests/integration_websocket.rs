//! The same negotiation, over a real WebSocket router.

use std::sync::Arc;
use std::time::Duration;

use peerswap_codec::{LocalWallet, verify_signed};
use peerswap_directory::testing::{PeerScript, ScriptedPeer};
use peerswap_directory::{
    ConnectionStatus, DirectoryClient, LocalRouter, NegotiationSession, RateQuoter, WsConnector,
    serve_router,
};
use peerswap_types::{
    Address, DirectoryConfig, NegotiationConfig, OrderRequest, PeerFailure, TradingPair, U256,
};
use tokio::net::TcpListener;

fn dai() -> Address {
    Address::repeat_byte(0xda)
}

async fn start_router() -> (LocalRouter, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let router = LocalRouter::new();
    tokio::spawn(serve_router(listener, router.clone()));
    (router, url)
}

fn client(url: &str) -> Arc<DirectoryClient> {
    Arc::new(DirectoryClient::new(
        Arc::new(LocalWallet::random()),
        Arc::new(WsConnector::new(url)),
        DirectoryConfig::default(),
    ))
}

#[tokio::test]
async fn intents_round_trip_over_websocket() {
    let (router, url) = start_router().await;
    let maker = client(&url);
    maker.connect().await.unwrap();
    assert_eq!(maker.current_status(), ConnectionStatus::Connected);
    assert!(router.is_connected(&maker.address()).await);

    maker
        .set_intents(vec![TradingPair::new(dai(), Address::ZERO)])
        .await
        .unwrap();

    let taker = client(&url);
    taker.connect().await.unwrap();
    let found = taker.find_intents(&[dai()], &[Address::ZERO]).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].peer_address, maker.address());

    let listed = taker.get_intents(maker.address()).await.unwrap();
    assert_eq!(listed, found);
}

#[tokio::test]
async fn negotiation_over_websocket() {
    let (_router, url) = start_router().await;
    let quoter = RateQuoter::new().with_rate(dai(), Address::ZERO, U256::from(1u64), U256::from(2u64));
    let honest = ScriptedPeer::spawn(
        Arc::new(WsConnector::new(url.as_str())),
        vec![TradingPair::new(dai(), Address::ZERO)],
        PeerScript::Honest(Arc::new(quoter)),
    )
    .await
    .unwrap();
    let silent = ScriptedPeer::spawn(
        Arc::new(WsConnector::new(url.as_str())),
        vec![TradingPair::new(dai(), Address::ZERO)],
        PeerScript::Silent,
    )
    .await
    .unwrap();

    let taker = client(&url);
    taker.connect().await.unwrap();
    let session = NegotiationSession::new(Arc::clone(&taker), &NegotiationConfig::default())
        .with_peer_timeout(Duration::from_millis(300));
    let request =
        OrderRequest::for_maker_amount(dai(), Address::ZERO, taker.address(), U256::from(500u64));

    let result = session.get_orders(&request).await.unwrap();
    assert_eq!(result.len(), 2);

    let Some(Ok(signed)) = result.outcome_for(&honest.address()) else {
        panic!("honest peer did not quote: {result:?}");
    };
    assert!(verify_signed(signed));
    assert_eq!(signed.order().taker_amount, U256::from(1_000u64));
    assert_eq!(
        result.outcome_for(&silent.address()),
        Some(&Err(PeerFailure::Timeout { timeout_ms: 300 }))
    );
}

#[tokio::test]
async fn closed_socket_is_observed_as_disconnect() {
    let (router, url) = start_router().await;
    let peer = client(&url);
    peer.connect().await.unwrap();
    let mut status = peer.status();

    peer.close().await;
    status
        .wait_for(|s| *s == ConnectionStatus::Disconnected)
        .await
        .unwrap();

    for _ in 0..50 {
        if !router.is_connected(&peer.address()).await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("router still routes to a closed socket");
}

#[tokio::test]
async fn unreachable_router_is_a_connection_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    drop(listener);

    let peer = client(&url);
    let err = peer.connect().await.unwrap_err();
    assert!(err.to_string().contains("PS_ERR_"), "got {err}");
    assert_eq!(peer.current_status(), ConnectionStatus::Disconnected);
}
