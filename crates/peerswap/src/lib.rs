//! # peerswap
//!
//! Peer-to-peer swap negotiation in the AirSwap style, without a central
//! order book:
//!
//! 1. **Discover**: ask the router's indexer which makers trade a pair
//! 2. **Negotiate**: request a priced, signed order from each maker at once
//! 3. **Verify**: decode, shape-check and signature-check every answer
//! 4. **Settle**: submit the chosen order to the swap contract
//!
//! This crate ties the workspace together: token metadata, the [`Taker`]
//! flow, and tracing setup. The building blocks are re-exported as modules:
//!
//! - [`types`]: orders, intents, results, configuration and errors
//! - [`codec`]: canonical encoding, hashing, signing and verification
//! - [`directory`]: router transports, directory client, negotiation, maker service
//! - [`settlement`]: fill calldata, replay guard and submitter
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use peerswap::{LocalWallet, Taker, TokenCatalog, WsConnector, DirectoryClient};
//! use peerswap::types::{PeerswapConfig, Side};
//! use rust_decimal::Decimal;
//!
//! # async fn run() -> peerswap::types::Result<()> {
//! let config = PeerswapConfig::default();
//! let client = Arc::new(DirectoryClient::new(
//!     Arc::new(LocalWallet::random()),
//!     Arc::new(WsConnector::new(config.directory.url.clone())),
//!     config.directory.clone(),
//! ));
//! let taker = Taker::new(client, Arc::new(TokenCatalog::mainnet()), &config);
//! taker.connect().await?;
//! let result = taker.get_eth_orders(Decimal::from(500), "DAI", Side::Buy).await?;
//! if let Some(best) = result.best() {
//!     println!("{}", taker.describe(best).await?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod taker;
pub mod telemetry;
pub mod tokens;

pub use peerswap_codec as codec;
pub use peerswap_directory as directory;
pub use peerswap_settlement as settlement;
pub use peerswap_types as types;

pub use peerswap_codec::{LocalWallet, SigningCapability};
pub use peerswap_directory::{
    DirectoryClient, LocalRouter, MakerService, NegotiationSession, OrderQuoter, RateQuoter,
    WsConnector, serve_router,
};
pub use peerswap_settlement::{GasParams, SettlementNetwork, SettlementSubmitter, SimulatedSwap};
pub use taker::Taker;
pub use telemetry::{LogFormat, init_tracing};
pub use tokens::{TokenCatalog, TokenMetadata};
