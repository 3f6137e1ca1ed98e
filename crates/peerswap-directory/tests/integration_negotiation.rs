//! Negotiation against scripted peers on an in-process router.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use peerswap_codec::{LocalWallet, SigningCapability, verify_signed};
use peerswap_directory::testing::{PeerScript, ScriptedPeer};
use peerswap_directory::{
    Connector, DirectoryClient, Link, LocalRouter, NegotiationSession, RateQuoter,
};
use peerswap_types::{
    Address, DirectoryConfig, NegotiationConfig, OrderRequest, PeerFailure, QuoteLimit,
    Result, TradingPair, U256,
};

const PEER_TIMEOUT: Duration = Duration::from_millis(300);

fn dai() -> Address {
    Address::repeat_byte(0xda)
}

fn pair() -> Vec<TradingPair> {
    vec![TradingPair::new(dai(), Address::ZERO)]
}

fn honest() -> PeerScript {
    PeerScript::Honest(Arc::new(RateQuoter::new().with_rate(
        dai(),
        Address::ZERO,
        U256::from(1u64),
        U256::from(2u64),
    )))
}

async fn taker(router: &LocalRouter) -> (Arc<DirectoryClient>, NegotiationSession) {
    let client = Arc::new(DirectoryClient::new(
        Arc::new(LocalWallet::random()),
        Arc::new(router.clone()),
        DirectoryConfig::default(),
    ));
    client.connect().await.unwrap();
    let session = NegotiationSession::new(Arc::clone(&client), &NegotiationConfig::default())
        .with_peer_timeout(PEER_TIMEOUT);
    (client, session)
}

fn request(taker: Address) -> OrderRequest {
    OrderRequest::for_maker_amount(dai(), Address::ZERO, taker, U256::from(500u64))
}

async fn spawn(router: &LocalRouter, script: PeerScript) -> ScriptedPeer {
    ScriptedPeer::spawn(Arc::new(router.clone()), pair(), script)
        .await
        .unwrap()
}

#[tokio::test]
async fn one_outcome_per_intent_in_intent_order() {
    let router = LocalRouter::new();
    let a = spawn(&router, honest()).await;
    let b = spawn(&router, PeerScript::Silent).await;
    let c = spawn(&router, PeerScript::WrongSigner(LocalWallet::random())).await;
    let (client, session) = taker(&router).await;

    let started = Instant::now();
    let result = session.get_orders(&request(client.address())).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(result.len(), 3);
    let peers: Vec<Address> = result.entries.iter().map(|e| e.intent.peer_address).collect();
    assert_eq!(peers, vec![a.address(), b.address(), c.address()]);

    let signed = result.entries[0].signed_order().expect("A quotes");
    assert_eq!(signed.order().maker_address, a.address());
    assert_eq!(signed.order().maker_amount, U256::from(500u64));
    assert_eq!(signed.order().taker_amount, U256::from(1_000u64));
    assert!(verify_signed(signed));

    assert_eq!(result.entries[1].failure(), Some(&PeerFailure::Timeout { timeout_ms: 300 }));
    assert_eq!(result.entries[2].failure(), Some(&PeerFailure::SignatureInvalid));

    // Bounded by one peer timeout, not the sum.
    assert!(elapsed < PEER_TIMEOUT * 3, "took {elapsed:?}");
    assert_eq!(client.pending_calls(), 0);
    assert_eq!(result.best().unwrap().order().maker_address, a.address());
}

#[tokio::test]
async fn declines_and_garbage_are_classified() {
    let router = LocalRouter::new();
    let declining = spawn(&router, PeerScript::Decline("out of inventory".into())).await;
    let garbage = spawn(&router, PeerScript::Raw(serde_json::json!({ "hello": "world" }))).await;
    let (client, session) = taker(&router).await;

    let result = session.get_orders(&request(client.address())).await.unwrap();
    assert_eq!(
        result.outcome_for(&declining.address()),
        Some(&Err(PeerFailure::Declined {
            reason: "out of inventory".into()
        }))
    );
    assert!(matches!(
        result.outcome_for(&garbage.address()),
        Some(Err(PeerFailure::InvalidResponse { .. }))
    ));
    assert!(result.best().is_none());
}

#[tokio::test]
async fn order_for_wrong_amount_is_invalid_response() {
    let router = LocalRouter::new();
    let maker = LocalWallet::random();
    let (client, session) = taker(&router).await;

    // Properly signed, but quotes 499 when 500 was fixed.
    let mut order =
        peerswap_directory::testing::mirror_order(maker.address(), &request(client.address()));
    order.maker_amount = U256::from(499u64);
    let signature = maker.sign_order(&order).await.unwrap();
    let body = serde_json::to_value(peerswap_types::SignedOrder::new(order, signature)).unwrap();
    let peer = spawn(&router, PeerScript::Raw(body)).await;

    let outcome = session.request_order(peer.address(), &request(client.address())).await;
    assert!(
        matches!(&outcome, Err(PeerFailure::InvalidResponse { reason }) if reason.contains("PS_ERR_115")),
        "got {outcome:?}"
    );
}

#[tokio::test]
async fn quote_limit_rejects_expensive_quotes() {
    let router = LocalRouter::new();
    let _a = spawn(&router, honest()).await;
    let (client, session) = taker(&router).await;
    let session = session.with_quote_limit(QuoteLimit::MaxTakerAmount(U256::from(999u64)));

    let result = session.get_orders(&request(client.address())).await.unwrap();
    assert!(matches!(
        result.entries[0].failure(),
        Some(PeerFailure::QuoteOutOfBounds { .. })
    ));
}

#[tokio::test]
async fn no_intents_is_an_empty_result() {
    let router = LocalRouter::new();
    let (client, session) = taker(&router).await;
    let result = session.get_orders(&request(client.address())).await.unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn cancellation_returns_none_and_leaks_nothing() {
    let router = LocalRouter::new();
    let _b = spawn(&router, PeerScript::Silent).await;
    let _c = spawn(&router, PeerScript::Silent).await;
    let (client, session) = taker(&router).await;
    let intents = client.find_intents(&[dai()], &[Address::ZERO]).await.unwrap();
    assert_eq!(intents.len(), 2);

    let session = session.with_peer_timeout(Duration::from_secs(30));
    let outcome = session
        .request_orders_until(
            intents,
            &request(client.address()),
            tokio::time::sleep(Duration::from_millis(50)),
        )
        .await;
    assert!(outcome.is_none());

    // Aborted tasks drop their guards as the runtime reaps them.
    for _ in 0..50 {
        if client.pending_calls() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("pending calls leaked after cancellation");
}

#[tokio::test]
async fn offline_peer_is_declined_by_router() {
    let router = LocalRouter::new();
    let gone = spawn(&router, honest()).await;
    gone.client.close().await;
    gone.task.abort();
    while router.is_connected(&gone.address()).await {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let (client, session) = taker(&router).await;

    let outcome = session.request_order(gone.address(), &request(client.address())).await;
    assert!(matches!(outcome, Err(PeerFailure::Declined { .. })), "got {outcome:?}");
}

/// Accepts the link, then never reads what the client sends.
struct StalledRouter {
    held: Mutex<Vec<Link>>,
}

#[async_trait::async_trait]
impl Connector for StalledRouter {
    async fn connect(&self, _identity: &dyn SigningCapability) -> Result<Link> {
        let (client, router_side) = Link::pair(1);
        self.held.lock().unwrap().push(router_side);
        Ok(client)
    }
}

#[tokio::test]
async fn stalled_link_still_times_out_every_peer() {
    let client = Arc::new(DirectoryClient::new(
        Arc::new(LocalWallet::random()),
        Arc::new(StalledRouter {
            held: Mutex::new(Vec::new()),
        }),
        DirectoryConfig::default(),
    ));
    client.connect().await.unwrap();
    let session = NegotiationSession::new(Arc::clone(&client), &NegotiationConfig::default())
        .with_peer_timeout(Duration::from_millis(100));
    let intents = (1..=5u8)
        .map(|byte| pair()[0].for_peer(Address::repeat_byte(byte)))
        .collect();

    let result = tokio::time::timeout(
        Duration::from_secs(2),
        session.request_orders(intents, &request(client.address())),
    )
    .await
    .expect("negotiation must finish within the peer timeout");

    assert_eq!(result.len(), 5);
    for entry in &result.entries {
        assert_eq!(entry.failure(), Some(&PeerFailure::Timeout { timeout_ms: 100 }));
    }
    assert_eq!(client.pending_calls(), 0);
}
