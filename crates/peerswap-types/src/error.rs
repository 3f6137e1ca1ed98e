//! Error types for peerswap negotiation.
//!
//! All errors use the `PS_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Codec / validation errors
//! - 2xx: Signing errors
//! - 3xx: Directory errors
//! - 4xx: Per-peer negotiation outcomes
//! - 5xx: Settlement errors
//! - 9xx: General / internal errors

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =================================================================
// Codec (10x)
// =================================================================

/// A byte or JSON order representation could not be turned into an order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Fewer bytes than the fixed encoding width.
    #[error("PS_ERR_100: Truncated order encoding: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// More bytes than the fixed encoding width.
    #[error("PS_ERR_101: Trailing bytes after order encoding: expected {expected} bytes, got {actual}")]
    TrailingBytes { expected: usize, actual: usize },

    /// An integer does not fit the protocol width of its field.
    #[error("PS_ERR_102: Integer out of range in field {field}")]
    IntegerOutOfRange { field: &'static str },

    /// Wrong length or non-hex address.
    #[error("PS_ERR_103: Malformed address in field {field}: {value:?}")]
    MalformedAddress { field: &'static str, value: String },

    /// Not a non-negative decimal integer.
    #[error("PS_ERR_104: Malformed integer in field {field}: {value:?}")]
    MalformedInteger { field: &'static str, value: String },

    /// Missing or unparseable `v`/`r`/`s`.
    #[error("PS_ERR_105: Malformed signature: {reason}")]
    MalformedSignature { reason: String },

    /// The JSON document itself is invalid.
    #[error("PS_ERR_106: Malformed JSON: {0}")]
    Json(String),

    /// An order request carried both or neither of the amounts.
    #[error("PS_ERR_107: Order request must fix exactly one of makerAmount or takerAmount")]
    AmountSpecification,
}

// =================================================================
// Shape validation (11x)
// =================================================================

/// Structural invariant violated by an order, independent of its signature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("PS_ERR_110: makerAmount must be positive")]
    ZeroMakerAmount,

    #[error("PS_ERR_111: takerAmount must be positive")]
    ZeroTakerAmount,

    #[error("PS_ERR_112: makerToken and takerToken are identical ({token})")]
    IdenticalTokens { token: Address },

    #[error("PS_ERR_113: makerAddress is the zero address")]
    ZeroMakerAddress,

    #[error("PS_ERR_114: Order expired at {expiration} (now {now})")]
    Expired { expiration: u64, now: u64 },

    /// The order is well formed but is not an answer to the request sent.
    #[error("PS_ERR_115: Order does not answer the request: {reason}")]
    RequestMismatch { reason: String },
}

// =================================================================
// Signing (20x)
// =================================================================

/// Failure of an external signing capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    /// A human (or policy) refused to sign.
    #[error("PS_ERR_200: Signing declined: {reason}")]
    Declined { reason: String },

    /// The wallet / key provider could not be reached.
    #[error("PS_ERR_201: Signer unavailable: {reason}")]
    Unavailable { reason: String },

    /// The signer ran but produced an error.
    #[error("PS_ERR_202: Signing failed: {reason}")]
    Failed { reason: String },

    /// Approval did not arrive before the caller's deadline.
    #[error("PS_ERR_203: Signing not approved within {timeout_ms}ms")]
    TimedOut { timeout_ms: u64 },
}

// =================================================================
// Per-peer outcomes (4xx)
// =================================================================

/// Why a single peer did not produce a usable signed order.
///
/// These are outcome values recorded in a
/// [`NegotiationResult`](crate::NegotiationResult); they never abort a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PeerFailure {
    #[error("PS_ERR_400: Peer did not respond within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The peer answered with an error instead of an order.
    #[error("PS_ERR_401: Peer declined: {reason}")]
    Declined { reason: String },

    /// Undecodable, malformed, or mismatched order.
    #[error("PS_ERR_402: Invalid response: {reason}")]
    InvalidResponse { reason: String },

    #[error("PS_ERR_403: Order signature does not recover to makerAddress")]
    SignatureInvalid,

    /// The quote is valid but outside the caller's acceptable bound.
    #[error("PS_ERR_404: Quote outside acceptable bound: {reason}")]
    QuoteOutOfBounds { reason: String },

    #[error("PS_ERR_405: Directory connection lost before the peer responded")]
    ConnectionLost,
}

impl PeerFailure {
    /// Short machine-friendly label for logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Declined { .. } => "declined",
            Self::InvalidResponse { .. } => "invalid_response",
            Self::SignatureInvalid => "signature_invalid",
            Self::QuoteOutOfBounds { .. } => "quote_out_of_bounds",
            Self::ConnectionLost => "connection_lost",
        }
    }
}

impl From<DecodeError> for PeerFailure {
    fn from(err: DecodeError) -> Self {
        Self::InvalidResponse {
            reason: err.to_string(),
        }
    }
}

impl From<ValidationError> for PeerFailure {
    fn from(err: ValidationError) -> Self {
        Self::InvalidResponse {
            reason: err.to_string(),
        }
    }
}

// =================================================================
// Settlement (5xx)
// =================================================================

/// Failure to fill a signed order.
///
/// Only [`SubmissionError::Transport`] is worth retrying; everything else is
/// either detected locally before submission or refused by settlement logic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// Staleness detected before anything was submitted.
    #[error("PS_ERR_500: Order expired at {expiration} (now {now})")]
    OrderExpired { expiration: u64, now: u64 },

    /// Local checks failed (shape, signature, taker identity).
    #[error("PS_ERR_501: Order cannot be filled: {reason}")]
    Invalid { reason: String },

    /// Settlement logic refused it (already filled, bad signature on-chain, ...).
    #[error("PS_ERR_502: Settlement rejected: {reason}")]
    Rejected { reason: String },

    /// The execution network could not be reached.
    #[error("PS_ERR_503: Settlement transport error: {reason}")]
    Transport { reason: String },

    #[error("PS_ERR_504: Taker could not sign the fill: {0}")]
    Signer(#[from] SignerError),
}

impl SubmissionError {
    /// `true` only for transport failures.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

// =================================================================
// Central error enum
// =================================================================

/// Central error enum for caller-facing peerswap operations.
#[derive(Debug, Error)]
pub enum PeerswapError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Amount conversion between human and atomic units failed.
    #[error("PS_ERR_120: Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// Token symbol or address unknown to the metadata source.
    #[error("PS_ERR_121: Unknown token: {0}")]
    UnknownToken(String),

    #[error(transparent)]
    Signer(#[from] SignerError),

    /// A signature did not recover to the claimed address.
    #[error("PS_ERR_210: Signature does not recover to {claimed}")]
    SignatureInvalid { claimed: Address },

    // =================================================================
    // Directory Errors (3xx)
    // =================================================================
    /// Router unreachable or handshake failed. Retryable by the caller.
    #[error("PS_ERR_300: Directory connection failed: {reason}")]
    Connection { reason: String },

    #[error("PS_ERR_301: Not connected to the directory")]
    NotConnected,

    #[error("PS_ERR_302: Intent discovery timed out after {timeout_ms}ms")]
    DiscoveryTimeout { timeout_ms: u64 },

    #[error("PS_ERR_303: Directory connection lost")]
    ConnectionLost,

    /// The remote end answered a call with a JSON-RPC error.
    #[error("PS_ERR_304: Remote error {code}: {message}")]
    Remote { code: i64, message: String },

    /// Unexpected frame or message shape.
    #[error("PS_ERR_305: Protocol error: {reason}")]
    Protocol { reason: String },

    #[error("PS_ERR_306: Call {method} timed out after {timeout_ms}ms")]
    CallTimeout { method: String, timeout_ms: u64 },

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    #[error("PS_ERR_900: Internal error: {0}")]
    Internal(String),

    #[error("PS_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("PS_ERR_902: Configuration error: {0}")]
    Configuration(String),

    #[error("PS_ERR_903: I/O error: {0}")]
    Io(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, PeerswapError>;

impl From<std::io::Error> for PeerswapError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for PeerswapError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
