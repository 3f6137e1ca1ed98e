//! Maker nonce source.
//!
//! Nonces are milliseconds since the epoch, bumped past the previous value
//! when two orders are built in the same millisecond. They stay unique per
//! maker across restarts as long as the clock does not go backwards.
//!
//! The counter is 256 bits wide while floors and clock readings are 64 bits,
//! so bumping past the previous value can never saturate.

use std::sync::{Mutex, PoisonError};

use alloy_primitives::U256;

/// Strictly monotonic, time-derived nonce issuer.
#[derive(Debug, Default)]
pub struct NonceSource {
    last: Mutex<U256>,
}

impl NonceSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start above `floor`, e.g. the highest nonce seen before a restart.
    #[must_use]
    pub fn starting_after(floor: u64) -> Self {
        Self {
            last: Mutex::new(U256::from(floor)),
        }
    }

    /// Issue the next nonce.
    pub fn next_nonce(&self) -> U256 {
        let now = U256::from(u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0));
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let next = now.max(*last + U256::from(1u64));
        *last = next;
        next
    }
}
