//! Maker signs, order travels as JSON, taker decodes and verifies.

use peerswap_codec::{
    LocalWallet, NonceSource, SigningCapability, decode_signed_json, encode, order_hash, sign,
    validate_shape_at, verified, verify_signed,
};
use peerswap_types::{Address, B256, Order, OrderSignature, U256};

const NOW: u64 = 1_700_000_000;

fn maker_order(maker: Address, nonce: U256) -> Order {
    let mut order = Order::dummy(maker, Address::repeat_byte(0x22), NOW);
    order.nonce = nonce;
    order
}

#[tokio::test]
async fn signed_order_survives_json_transmission() {
    let maker = LocalWallet::random();
    let nonces = NonceSource::new();
    let signed = sign(maker_order(maker.address(), nonces.next_nonce()), &maker)
        .await
        .unwrap();

    let json = signed.to_json().unwrap();
    assert!(json.contains(r#""makerAmount":"500""#));

    let received = decode_signed_json(&json).unwrap();
    assert_eq!(received, signed);
    assert!(verify_signed(&received));
    assert!(validate_shape_at(received.order(), NOW).is_ok());
    assert_eq!(encode(received.order()), encode(signed.order()));
}

#[tokio::test]
async fn tampered_json_fails_verification() {
    let maker = LocalWallet::random();
    let signed = sign(maker_order(maker.address(), U256::from(7u64)), &maker)
        .await
        .unwrap();

    let mut json: serde_json::Value = serde_json::from_str(&signed.to_json().unwrap()).unwrap();
    json["takerAmount"] = "1".into();
    let received = decode_signed_json(&json.to_string()).unwrap();
    assert!(!verify_signed(&received));
}

#[tokio::test]
async fn distinct_nonces_give_distinct_hashes() {
    let maker = LocalWallet::random();
    let nonces = NonceSource::new();
    let a = maker_order(maker.address(), nonces.next_nonce());
    let b = maker_order(maker.address(), nonces.next_nonce());
    assert_ne!(order_hash(&a), order_hash(&b));
}

#[tokio::test]
async fn verified_rejects_signature_from_another_key() {
    let maker = LocalWallet::from_secret(&B256::repeat_byte(0x01)).unwrap();
    let other = LocalWallet::from_secret(&B256::repeat_byte(0x02)).unwrap();
    let order = maker_order(maker.address(), U256::from(1u64));
    let signature: OrderSignature = other.sign_order(&order).await.unwrap();
    assert!(verified(order, signature).is_err());
}
