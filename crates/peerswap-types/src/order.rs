//! Order types for peer-to-peer swaps.
//!
//! A taker sends an [`OrderRequest`] fixing exactly one side's amount; the
//! maker answers with a [`SignedOrder`] whose other amount is the quote.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::wire::{WireOrder, WireOrderRequest};
use crate::{DecodeError, constants};

/// Which direction the caller trades the token in, relative to a base asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Side {
    /// Receive the token, pay the base asset.
    Buy,
    /// Give the token, receive the base asset.
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// The one amount a request pins down; the counterparty fills in the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FixedAmount {
    /// "I want exactly this many maker tokens."
    Maker(U256),
    /// "I will pay exactly this many taker tokens."
    Taker(U256),
}

impl FixedAmount {
    #[must_use]
    pub fn value(&self) -> U256 {
        match self {
            Self::Maker(v) | Self::Taker(v) => *v,
        }
    }
}

/// A request for a priced order from one maker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireOrderRequest", into = "WireOrderRequest")]
pub struct OrderRequest {
    pub maker_token: Address,
    pub taker_token: Address,
    pub taker_address: Address,
    pub amount: FixedAmount,
}

impl OrderRequest {
    /// Request that fixes the maker amount.
    #[must_use]
    pub fn for_maker_amount(
        maker_token: Address,
        taker_token: Address,
        taker_address: Address,
        maker_amount: U256,
    ) -> Self {
        Self {
            maker_token,
            taker_token,
            taker_address,
            amount: FixedAmount::Maker(maker_amount),
        }
    }

    /// Request that fixes the taker amount.
    #[must_use]
    pub fn for_taker_amount(
        maker_token: Address,
        taker_token: Address,
        taker_address: Address,
        taker_amount: U256,
    ) -> Self {
        Self {
            maker_token,
            taker_token,
            taker_address,
            amount: FixedAmount::Taker(taker_amount),
        }
    }
}

/// A fully specified bilateral trade, before or without its signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "WireOrder", into = "WireOrder")]
pub struct Order {
    pub maker_address: Address,
    pub maker_amount: U256,
    pub maker_token: Address,
    pub taker_address: Address,
    pub taker_amount: U256,
    pub taker_token: Address,
    /// Unix seconds.
    pub expiration: u64,
    /// Unique per maker.
    pub nonce: U256,
}

impl Order {
    /// Returns `true` if `now` (unix seconds) is at or past the expiration.
    #[must_use]
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expiration <= now
    }

    /// The replay key: a maker may use each nonce once.
    #[must_use]
    pub fn replay_key(&self) -> (Address, U256) {
        (self.maker_address, self.nonce)
    }

    /// Returns `true` if the taker side is native ETH.
    #[must_use]
    pub fn pays_eth(&self) -> bool {
        self.taker_token == constants::ETH_ADDRESS
    }
}

/// A 65-byte recoverable secp256k1 signature split the way the swap contract takes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderSignature {
    /// Recovery id, 27 or 28.
    pub v: u8,
    pub r: B256,
    pub s: B256,
}

impl OrderSignature {
    /// Build from parts, normalising `v` of 0/1 to 27/28.
    pub fn from_parts(v: u8, r: B256, s: B256) -> Result<Self, DecodeError> {
        let v = match v {
            0 | 1 => v + 27,
            27 | 28 => v,
            other => {
                return Err(DecodeError::MalformedSignature {
                    reason: format!("v must be 27 or 28, got {other}"),
                });
            }
        };
        Ok(Self { v, r, s })
    }

    /// `r || s || v`.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(self.r.as_slice());
        out[32..64].copy_from_slice(self.s.as_slice());
        out[64] = self.v;
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() != 65 {
            return Err(DecodeError::MalformedSignature {
                reason: format!("expected 65 bytes, got {}", bytes.len()),
            });
        }
        Self::from_parts(
            bytes[64],
            B256::from_slice(&bytes[..32]),
            B256::from_slice(&bytes[32..64]),
        )
    }

    /// `true` for odd y-parity (v = 28).
    #[must_use]
    pub fn y_parity(&self) -> bool {
        self.v == 28
    }
}

/// An [`Order`] together with the maker's signature over its canonical encoding.
///
/// Fields are private: once signed, an order cannot be edited in place. A
/// `SignedOrder` read off the wire is not trusted until its signature has been
/// verified against `maker_address`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "WireOrder", into = "WireOrder")]
pub struct SignedOrder {
    order: Order,
    signature: OrderSignature,
}

impl SignedOrder {
    /// Pair an order with a signature without checking it. Use
    /// `peerswap_codec::verified` to get a checked value.
    #[must_use]
    pub fn new(order: Order, signature: OrderSignature) -> Self {
        Self { order, signature }
    }

    #[must_use]
    pub fn order(&self) -> &Order {
        &self.order
    }

    #[must_use]
    pub fn signature(&self) -> &OrderSignature {
        &self.signature
    }

    #[must_use]
    pub fn into_parts(self) -> (Order, OrderSignature) {
        (self.order, self.signature)
    }

    /// The JSON form for manual transmission.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse the JSON form. Well-formed is not the same as verified.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    /// A well-formed order expiring an hour after `now`.
    pub fn dummy(maker_address: Address, taker_address: Address, now: u64) -> Self {
        Self {
            maker_address,
            maker_amount: U256::from(500u64),
            maker_token: Address::repeat_byte(0xda),
            taker_address,
            taker_amount: U256::from(1_000_000u64),
            taker_token: constants::ETH_ADDRESS,
            expiration: now + 3600,
            nonce: U256::from(1u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Order {
        Order::dummy(
            Address::repeat_byte(0x11),
            Address::repeat_byte(0x22),
            1_700_000_000,
        )
    }

    #[test]
    fn side_display() {
        assert_eq!(format!("{}", Side::Buy), "BUY");
        assert_eq!(format!("{}", Side::Sell), "SELL");
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let o = order();
        assert!(!o.is_expired_at(o.expiration - 1));
        assert!(o.is_expired_at(o.expiration));
    }

    #[test]
    fn signature_v_normalisation() {
        let sig = OrderSignature::from_parts(1, B256::ZERO, B256::ZERO).unwrap();
        assert_eq!(sig.v, 28);
        assert!(sig.y_parity());
        assert!(OrderSignature::from_parts(29, B256::ZERO, B256::ZERO).is_err());
    }

    #[test]
    fn signature_bytes_layout() {
        let sig = OrderSignature::from_parts(27, B256::repeat_byte(1), B256::repeat_byte(2)).unwrap();
        let bytes = sig.to_bytes();
        assert_eq!(bytes[0], 1);
        assert_eq!(bytes[32], 2);
        assert_eq!(bytes[64], 27);
        assert_eq!(OrderSignature::from_bytes(&bytes).unwrap(), sig);
        assert!(OrderSignature::from_bytes(&bytes[..64]).is_err());
    }

    #[test]
    fn order_json_uses_wire_form() {
        let o = order();
        let json = serde_json::to_value(&o).unwrap();
        assert_eq!(json["makerAmount"], "500");
        assert_eq!(json["takerToken"], "0x0000000000000000000000000000000000000000");
        assert_eq!(json["expiration"], o.expiration);
        assert!(json.get("v").is_none());
    }

    #[test]
    fn signed_order_json_roundtrip() {
        let sig = OrderSignature::from_parts(28, B256::repeat_byte(7), B256::repeat_byte(9)).unwrap();
        let signed = SignedOrder::new(order(), sig);
        let json = signed.to_json().unwrap();
        let back = SignedOrder::from_json(&json).unwrap();
        assert_eq!(back, signed);
    }

    #[test]
    fn signed_order_json_without_signature_is_rejected() {
        let json = serde_json::to_string(&order()).unwrap();
        assert!(serde_json::from_str::<SignedOrder>(&json).is_err());
    }

    #[test]
    fn fixed_amount_value() {
        assert_eq!(FixedAmount::Taker(U256::from(3u64)).value(), U256::from(3u64));
    }
}
