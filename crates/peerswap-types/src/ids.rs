//! Identifiers used on the directory channel.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation id of a JSON-RPC call. Uses UUIDv7 for time-ordered sorting.
///
/// Serialized as the bare UUID string so it can sit in the JSON-RPC `id` slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub Uuid);

impl RequestId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
