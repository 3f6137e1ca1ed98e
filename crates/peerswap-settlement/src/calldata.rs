//! ABI calldata for the legacy swap contract's `fill` entry point.
//!
//! Every argument is static, so the encoding is the 4-byte selector followed
//! by eleven 32-byte words in declaration order.

use alloy_primitives::{Address, B256, U256, keccak256};
use peerswap_types::{DecodeError, Order, OrderSignature, SignedOrder};

/// Solidity signature of the fill function.
pub const FILL_SIGNATURE: &str = "fill(address,uint256,address,address,uint256,address,uint256,uint256,uint8,bytes32,bytes32)";

const WORD: usize = 32;
const ARGS: usize = 11;

/// Length of `fill` calldata: selector plus eleven words.
pub const FILL_CALLDATA_LEN: usize = 4 + ARGS * WORD;

/// First four bytes of `keccak256(FILL_SIGNATURE)`.
#[must_use]
pub fn fill_selector() -> [u8; 4] {
    let hash = keccak256(FILL_SIGNATURE.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Calldata filling `signed` exactly as signed.
#[must_use]
pub fn encode_fill(signed: &SignedOrder) -> Vec<u8> {
    let order = signed.order();
    let signature = signed.signature();
    let mut out = Vec::with_capacity(FILL_CALLDATA_LEN);
    out.extend_from_slice(&fill_selector());
    push_address(&mut out, order.maker_address);
    push_uint(&mut out, order.maker_amount);
    push_address(&mut out, order.maker_token);
    push_address(&mut out, order.taker_address);
    push_uint(&mut out, order.taker_amount);
    push_address(&mut out, order.taker_token);
    push_uint(&mut out, U256::from(order.expiration));
    push_uint(&mut out, order.nonce);
    push_uint(&mut out, U256::from(signature.v));
    out.extend_from_slice(signature.r.as_slice());
    out.extend_from_slice(signature.s.as_slice());
    out
}

/// Parse `fill` calldata back into the order and signature it carries.
///
/// Address words must be left-padded with zeros and `v` must be 27 or 28.
///
/// # Errors
/// `Truncated` / `TrailingBytes` on a length mismatch, `MalformedSignature`
/// on a foreign selector or bad `v`, and range errors for over-wide words.
pub fn decode_fill(data: &[u8]) -> Result<SignedOrder, DecodeError> {
    if data.len() < FILL_CALLDATA_LEN {
        return Err(DecodeError::Truncated {
            expected: FILL_CALLDATA_LEN,
            actual: data.len(),
        });
    }
    if data.len() > FILL_CALLDATA_LEN {
        return Err(DecodeError::TrailingBytes {
            expected: FILL_CALLDATA_LEN,
            actual: data.len(),
        });
    }
    if data[..4] != fill_selector() {
        return Err(DecodeError::MalformedSignature {
            reason: format!("unknown selector 0x{}", alloy_primitives::hex::encode(&data[..4])),
        });
    }

    let words: Vec<&[u8]> = data[4..].chunks_exact(WORD).collect();
    let order = Order {
        maker_address: address_word(words[0], "makerAddress")?,
        maker_amount: U256::from_be_slice(words[1]),
        maker_token: address_word(words[2], "makerToken")?,
        taker_address: address_word(words[3], "takerAddress")?,
        taker_amount: U256::from_be_slice(words[4]),
        taker_token: address_word(words[5], "takerToken")?,
        expiration: u64::try_from(U256::from_be_slice(words[6])).map_err(|_| {
            DecodeError::IntegerOutOfRange {
                field: "expiration",
            }
        })?,
        nonce: U256::from_be_slice(words[7]),
    };
    let v = u8::try_from(U256::from_be_slice(words[8]))
        .map_err(|_| DecodeError::IntegerOutOfRange { field: "v" })?;
    let signature = OrderSignature::from_parts(v, B256::from_slice(words[9]), B256::from_slice(words[10]))?;
    Ok(SignedOrder::new(order, signature))
}

fn push_address(out: &mut Vec<u8>, address: Address) {
    out.extend_from_slice(&[0u8; 12]);
    out.extend_from_slice(address.as_slice());
}

fn push_uint(out: &mut Vec<u8>, value: U256) {
    out.extend_from_slice(&value.to_be_bytes::<32>());
}

fn address_word(word: &[u8], field: &'static str) -> Result<Address, DecodeError> {
    if word[..12].iter().any(|b| *b != 0) {
        return Err(DecodeError::MalformedAddress {
            field,
            value: alloy_primitives::hex::encode(word),
        });
    }
    Ok(Address::from_slice(&word[12..]))
}
