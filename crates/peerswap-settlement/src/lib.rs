//! # peerswap-settlement
//!
//! Executes a chosen signed order against the legacy swap contract.
//!
//! ## Architecture
//!
//! [`SettlementSubmitter::fill`] takes a [`SignedOrder`](peerswap_types::SignedOrder)
//! and the taker's signing capability and:
//! 1. Re-validates the order shape and expiry
//! 2. Verifies the maker's signature
//! 3. Checks the taker is the one the order names
//! 4. Claims the order in the [`FillGuard`] (no double fill)
//! 5. Builds `fill(...)` calldata, has the taker sign the transaction
//! 6. Submits it through a [`SettlementNetwork`]
//!
//! Transport failures are the only retryable outcome; see
//! [`SettlementSubmitter::fill_with_retry`].

pub mod calldata;
pub mod fill_guard;
pub mod network;
pub mod retry;
pub mod simulated;
pub mod submitter;

pub use calldata::{decode_fill, encode_fill, fill_selector};
pub use fill_guard::FillGuard;
pub use network::{FillTransaction, GasParams, NetworkError, SettlementNetwork, SignedFillTransaction};
pub use retry::RetryPolicy;
pub use simulated::SimulatedSwap;
pub use submitter::SettlementSubmitter;
