//! # peerswap-directory
//!
//! Everything that talks to other peers:
//!
//! - [`protocol`]: handshake frames and JSON-RPC envelopes
//! - [`Connector`]: transport seam, with [`LocalRouter`] (in-process router
//!   and intent indexer) and [`WsConnector`] (WebSocket)
//! - [`DirectoryClient`]: authenticated link, intent discovery, correlated calls
//! - [`NegotiationSession`]: concurrent `getOrder` fan-out with per-peer
//!   timeouts and response classification
//! - [`MakerService`]: answers `getOrder` with signed orders
//!
//! ## Negotiation flow
//!
//! ```text
//! taker ──findIntents──▶ indexer          (one call, discovery timeout)
//! taker ──getOrder─────▶ maker A ┐
//! taker ──getOrder─────▶ maker B ├─ concurrent, one peer timeout each
//! taker ──getOrder─────▶ maker C ┘
//!        ◀── SignedOrder | error | nothing
//! ```

pub mod client;
pub mod connector;
pub mod local;
pub mod maker;
pub mod protocol;
pub mod session;
#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;
pub mod ws;

pub use client::{ConnectionStatus, DirectoryClient, InboundRequest};
pub use connector::{Connector, Link};
pub use local::LocalRouter;
pub use maker::{MakerService, OrderQuoter, QuoteDeclined, RateQuoter};
pub use session::NegotiationSession;
pub use ws::{WsConnector, serve_router};
