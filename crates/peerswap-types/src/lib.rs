//! # peerswap-types
//!
//! Shared types, errors, and configuration for **peerswap** negotiation.
//!
//! This crate is the leaf dependency of the workspace. It defines:
//!
//! - **Identifiers**: [`RequestId`]
//! - **Token model**: [`TokenRef`] with atomic/human conversion
//! - **Discovery model**: [`Intent`]
//! - **Order model**: [`OrderRequest`], [`FixedAmount`], [`Order`], [`OrderSignature`], [`SignedOrder`], [`Side`]
//! - **Negotiation model**: [`NegotiationResult`], [`NegotiationEntry`], [`QuoteLimit`]
//! - **Receipt model**: [`FillReceipt`], [`FillStatus`]
//! - **Wire forms**: [`WireOrder`], [`WireOrderRequest`] and the lowercase address codecs
//! - **Configuration**: [`PeerswapConfig`], [`DirectoryConfig`], [`NegotiationConfig`], [`SettlementConfig`]
//! - **Errors**: [`PeerswapError`], [`DecodeError`], [`ValidationError`], [`SignerError`],
//!   [`PeerFailure`], [`SubmissionError`] with `PS_ERR_` prefix codes
//! - **Constants**: protocol widths, timeouts and defaults

pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod intent;
pub mod negotiation;
pub mod order;
pub mod receipt;
pub mod token;
pub mod wire;

pub use config::*;
pub use error::*;
pub use ids::*;
pub use intent::*;
pub use negotiation::*;
pub use order::*;
pub use receipt::*;
pub use token::*;
pub use wire::{WireInt, WireOrder, WireOrderRequest};

// Primitive types re-exported so downstream crates agree on one version.
pub use alloy_primitives::{Address, B256, U256};
