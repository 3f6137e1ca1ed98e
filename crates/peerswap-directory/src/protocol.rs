//! Directory wire protocol.
//!
//! Every frame is one JSON object tagged by `type`. A connection opens with
//! the router's `challenge`, the client's `auth` (personal-sign of the
//! challenge text) and the router's `ready` or `rejected`. After that only
//! `envelope` frames flow: JSON-RPC 2.0 messages addressed by account.

use peerswap_types::constants::JSONRPC_VERSION;
use peerswap_types::wire::{lower_address, lower_address_vec};
use peerswap_types::{Address, Intent, RequestId, TradingPair};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC method names.
pub mod methods {
    pub const FIND_INTENTS: &str = "findIntents";
    pub const SET_INTENTS: &str = "setIntents";
    pub const GET_INTENTS: &str = "getIntents";
    pub const GET_ORDER: &str = "getOrder";
}

/// JSON-RPC error codes.
pub mod codes {
    pub const INVALID_PARAMS: i64 = -32602;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INTERNAL_ERROR: i64 = -32603;
    /// The router has no live connection for the receiver.
    pub const PEER_UNAVAILABLE: i64 = -32000;
    /// The maker will not quote this request.
    pub const ORDER_DECLINED: i64 = -33601;
}

/// One frame on a directory connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// Router → client: sign this text to prove your address.
    Challenge { challenge: String },
    /// Client → router: answer to the challenge.
    Auth {
        #[serde(with = "lower_address")]
        address: Address,
        /// `0x` hex of `r || s || v`.
        signature: String,
    },
    /// Router → client: authenticated, envelopes may flow.
    Ready {
        #[serde(with = "lower_address")]
        address: Address,
    },
    /// Router → client: handshake refused, connection will close.
    Rejected { reason: String },
    Envelope(Envelope),
}

/// A routed JSON-RPC message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(with = "lower_address")]
    pub sender: Address,
    #[serde(with = "lower_address")]
    pub receiver: Address,
    pub message: RpcMessage,
}

impl Envelope {
    #[must_use]
    pub fn new(sender: Address, receiver: Address, message: RpcMessage) -> Self {
        Self {
            sender,
            receiver,
            message,
        }
    }

    /// Build the reply to `self` carrying `outcome`.
    #[must_use]
    pub fn reply(&self, id: RequestId, outcome: std::result::Result<Value, RpcError>) -> Self {
        Self::new(self.receiver, self.sender, RpcMessage::response(id, outcome))
    }
}

/// JSON-RPC 2.0 request or response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcMessage {
    Request(RpcRequest),
    Response(RpcResponse),
}

impl RpcMessage {
    #[must_use]
    pub fn request(id: RequestId, method: &str, params: Value) -> Self {
        Self::Request(RpcRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.to_string(),
            params,
        })
    }

    #[must_use]
    pub fn response(id: RequestId, outcome: std::result::Result<Value, RpcError>) -> Self {
        let (result, error) = match outcome {
            Ok(value) => (Some(value), None),
            Err(error) => (None, Some(error)),
        };
        Self::Response(RpcResponse {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result,
            error,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: RequestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    /// The response as a `Result`. A response with neither field is `null`.
    #[must_use]
    pub fn into_outcome(self) -> std::result::Result<Value, RpcError> {
        match (self.result, self.error) {
            (_, Some(error)) => Err(error),
            (Some(value), None) => Ok(value),
            (None, None) => Ok(Value::Null),
        }
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(codes::INVALID_PARAMS, message)
    }

    #[must_use]
    pub fn method_not_found(method: &str) -> Self {
        Self::new(codes::METHOD_NOT_FOUND, format!("method not found: {method}"))
    }

    #[must_use]
    pub fn declined(reason: impl Into<String>) -> Self {
        Self::new(codes::ORDER_DECLINED, reason)
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

// ---------------------------------------------------------------------------
// Indexer method parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindIntentsParams {
    #[serde(with = "lower_address_vec")]
    pub maker_tokens: Vec<Address>,
    #[serde(with = "lower_address_vec")]
    pub taker_tokens: Vec<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetIntentsParams {
    pub intents: Vec<TradingPair>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetIntentsParams {
    #[serde(with = "lower_address")]
    pub address: Address,
}

/// Result of `findIntents` / `getIntents`.
pub type IntentList = Vec<Intent>;
