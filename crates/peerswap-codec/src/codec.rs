//! Canonical order codec.
//!
//! `encode` is the only definition of "the bytes that get signed". Field
//! order and widths match the legacy swap contract's hash preimage, so a
//! hash computed here equals the hash the contract recomputes on fill.

use alloy_primitives::{Address, B256, U256, keccak256};
use peerswap_types::constants::{ADDRESS_WIDTH, ORDER_ENCODING_LEN, WORD_WIDTH};
use peerswap_types::{DecodeError, Order, SignedOrder, ValidationError, WireOrder};

/// Packed canonical encoding of an order.
#[must_use]
pub fn encode(order: &Order) -> [u8; ORDER_ENCODING_LEN] {
    let mut out = [0u8; ORDER_ENCODING_LEN];
    let mut writer = Writer {
        buf: &mut out,
        pos: 0,
    };
    writer.address(&order.maker_address);
    writer.word(order.maker_amount);
    writer.address(&order.maker_token);
    writer.address(&order.taker_address);
    writer.word(order.taker_amount);
    writer.address(&order.taker_token);
    writer.word(U256::from(order.expiration));
    writer.word(order.nonce);
    debug_assert_eq!(writer.pos, ORDER_ENCODING_LEN);
    out
}

/// `keccak256(encode(order))`.
#[must_use]
pub fn order_hash(order: &Order) -> B256 {
    keccak256(encode(order))
}

/// Decode the canonical encoding back into an order.
///
/// # Errors
/// - `Truncated` / `TrailingBytes` if `bytes` is not exactly 208 bytes
/// - `IntegerOutOfRange` if the expiration word does not fit 64 bits
pub fn decode(bytes: &[u8]) -> Result<Order, DecodeError> {
    if bytes.len() < ORDER_ENCODING_LEN {
        return Err(DecodeError::Truncated {
            expected: ORDER_ENCODING_LEN,
            actual: bytes.len(),
        });
    }
    if bytes.len() > ORDER_ENCODING_LEN {
        return Err(DecodeError::TrailingBytes {
            expected: ORDER_ENCODING_LEN,
            actual: bytes.len(),
        });
    }

    let mut reader = Reader { buf: bytes, pos: 0 };
    let maker_address = reader.address();
    let maker_amount = reader.word();
    let maker_token = reader.address();
    let taker_address = reader.address();
    let taker_amount = reader.word();
    let taker_token = reader.address();
    let expiration = u64::try_from(reader.word()).map_err(|_| DecodeError::IntegerOutOfRange {
        field: "expiration",
    })?;
    let nonce = reader.word();

    Ok(Order {
        maker_address,
        maker_amount,
        maker_token,
        taker_address,
        taker_amount,
        taker_token,
        expiration,
        nonce,
    })
}

/// Parse an unsigned order from its JSON wire form.
pub fn decode_json(raw: &str) -> Result<Order, DecodeError> {
    let wire: WireOrder = serde_json::from_str(raw).map_err(|e| DecodeError::Json(e.to_string()))?;
    wire.to_order()
}

/// Parse a signed order from its JSON wire form.
///
/// The result is *not* verified; pass it through
/// [`verify_signed`](crate::verify_signed) before trusting it.
pub fn decode_signed_json(raw: &str) -> Result<SignedOrder, DecodeError> {
    let wire: WireOrder = serde_json::from_str(raw).map_err(|e| DecodeError::Json(e.to_string()))?;
    SignedOrder::try_from(wire)
}

/// Structural checks against the wall clock.
pub fn validate_shape(order: &Order) -> Result<(), ValidationError> {
    validate_shape_at(order, unix_now())
}

/// Structural checks against a caller-supplied clock (unix seconds).
///
/// Checks run in a fixed order so the first failing invariant is the one
/// reported.
pub fn validate_shape_at(order: &Order, now: u64) -> Result<(), ValidationError> {
    if order.maker_amount.is_zero() {
        return Err(ValidationError::ZeroMakerAmount);
    }
    if order.taker_amount.is_zero() {
        return Err(ValidationError::ZeroTakerAmount);
    }
    if order.maker_token == order.taker_token {
        return Err(ValidationError::IdenticalTokens {
            token: order.maker_token,
        });
    }
    if order.maker_address == Address::ZERO {
        return Err(ValidationError::ZeroMakerAddress);
    }
    if order.is_expired_at(now) {
        return Err(ValidationError::Expired {
            expiration: order.expiration,
            now,
        });
    }
    Ok(())
}

/// Current unix time in seconds.
#[must_use]
pub fn unix_now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl Writer<'_> {
    fn address(&mut self, address: &Address) {
        self.buf[self.pos..self.pos + ADDRESS_WIDTH].copy_from_slice(address.as_slice());
        self.pos += ADDRESS_WIDTH;
    }

    fn word(&mut self, value: U256) {
        self.buf[self.pos..self.pos + WORD_WIDTH].copy_from_slice(&value.to_be_bytes::<WORD_WIDTH>());
        self.pos += WORD_WIDTH;
    }
}

// Length is checked once up front, so slicing cannot go out of bounds.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn address(&mut self) -> Address {
        let out = Address::from_slice(&self.buf[self.pos..self.pos + ADDRESS_WIDTH]);
        self.pos += ADDRESS_WIDTH;
        out
    }

    fn word(&mut self) -> U256 {
        let out = U256::from_be_slice(&self.buf[self.pos..self.pos + WORD_WIDTH]);
        self.pos += WORD_WIDTH;
        out
    }
}
