//! # peerswap-codec
//!
//! The byte-level contract every other component relies on:
//!
//! - [`codec`]: canonical 208-byte order encoding, `keccak256` order hash,
//!   decoding (fail closed) and structural validation
//! - [`signer`]: the [`SigningCapability`] seam, an in-process [`LocalWallet`],
//!   order signing and signature recovery
//! - [`nonce`]: time-derived monotonic nonces for makers
//!
//! ## Hash preimage
//!
//! ```text
//! makerAddress(20) makerAmount(32) makerToken(20) takerAddress(20)
//! takerAmount(32)  takerToken(20)  expiration(32) nonce(32)
//! ```
//!
//! Integers are big-endian. The signature is an EIP-191 personal-sign over
//! the 32-byte hash, so `v` is 27 or 28.

pub mod codec;
pub mod nonce;
pub mod signer;

pub use codec::{
    decode, decode_json, decode_signed_json, encode, order_hash, validate_shape,
    validate_shape_at,
};
pub use nonce::NonceSource;
pub use signer::{LocalWallet, SigningCapability, sign, sign_within, verified, verify, verify_signed};
