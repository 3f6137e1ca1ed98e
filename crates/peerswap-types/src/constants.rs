//! System-wide constants for peerswap negotiation.

use alloy_primitives::Address;

/// Width of an address in the canonical order encoding.
pub const ADDRESS_WIDTH: usize = 20;

/// Width of an integer word (amounts, expiration, nonce) in the canonical encoding.
pub const WORD_WIDTH: usize = 32;

/// Total length of the canonical order encoding:
/// 4 addresses + 4 words.
pub const ORDER_ENCODING_LEN: usize = 4 * ADDRESS_WIDTH + 4 * WORD_WIDTH;

/// The zero address stands for native ETH in token positions.
pub const ETH_ADDRESS: Address = Address::ZERO;

/// Default indexer address on the router.
pub const DEFAULT_INDEXER_ADDRESS: Address = Address::ZERO;

/// Default router WebSocket endpoint.
pub const DEFAULT_ROUTER_URL: &str = "ws://127.0.0.1:5555/websocket";

/// Default router handshake timeout in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Default `findIntents` round-trip timeout in milliseconds.
pub const DEFAULT_DISCOVERY_TIMEOUT_MS: u64 = 10_000;

/// Default per-peer `getOrder` timeout in milliseconds.
pub const DEFAULT_PEER_TIMEOUT_MS: u64 = 12_000;

/// Default lifetime of an order built by a maker, in seconds.
pub const DEFAULT_ORDER_TTL_SECS: u64 = 300;

/// Capacity of each direction of a directory link.
pub const LINK_BUFFER: usize = 256;

/// Number of filled `(maker, nonce)` pairs a submitter remembers.
pub const DEFAULT_FILL_GUARD_SIZE: usize = 10_000;

/// Default maximum fill attempts (including the first).
pub const DEFAULT_FILL_MAX_ATTEMPTS: u32 = 3;

/// Default first retry delay for fills in milliseconds.
pub const DEFAULT_FILL_RETRY_MIN_DELAY_MS: u64 = 500;

/// Default retry delay cap for fills in milliseconds.
pub const DEFAULT_FILL_RETRY_MAX_DELAY_MS: u64 = 8_000;

/// Default gas limit for a swap fill.
pub const DEFAULT_FILL_GAS_LIMIT: u64 = 160_000;

/// JSON-RPC protocol version tag.
pub const JSONRPC_VERSION: &str = "2.0";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
