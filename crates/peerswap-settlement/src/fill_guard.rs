//! Fill guard: stops one submitter from filling the same order twice.
//!
//! A maker uses each nonce once, so `(maker, nonce)` identifies an order for
//! replay purposes. The guard keeps a bounded FIFO of keys this submitter has
//! filled or is filling; the oldest key is evicted when the set is full.

use std::collections::{HashSet, VecDeque};

use alloy_primitives::{Address, U256};
use peerswap_types::{Order, SubmissionError};

/// Bounded set of `(maker, nonce)` pairs already handed to the network.
pub struct FillGuard {
    filled: HashSet<(Address, U256)>,
    /// Insertion order, front = oldest.
    order: VecDeque<(Address, U256)>,
    max_size: usize,
}

impl FillGuard {
    /// # Panics
    /// Panics if `max_size` is zero.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        assert!(max_size > 0, "FillGuard max_size must be > 0");
        Self {
            filled: HashSet::with_capacity(max_size.min(1024)),
            order: VecDeque::with_capacity(max_size.min(1024)),
            max_size,
        }
    }

    /// Claim `order` for filling.
    ///
    /// # Errors
    /// `Rejected` if this guard already holds the order's replay key.
    pub fn claim(&mut self, order: &Order) -> Result<(), SubmissionError> {
        let key = order.replay_key();
        if self.filled.contains(&key) {
            return Err(SubmissionError::Rejected {
                reason: format!("nonce {} of maker {} already filled", key.1, key.0),
            });
        }

        if self.filled.len() >= self.max_size {
            if let Some(oldest) = self.order.pop_front() {
                self.filled.remove(&oldest);
            }
        }

        self.filled.insert(key);
        self.order.push_back(key);
        Ok(())
    }

    /// Give back a claim whose fill did not go through.
    pub fn release(&mut self, order: &Order) {
        let key = order.replay_key();
        if self.filled.remove(&key) {
            self.order.retain(|k| *k != key);
        }
    }

    #[must_use]
    pub fn is_filled(&self, order: &Order) -> bool {
        self.filled.contains(&order.replay_key())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.filled.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filled.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(nonce: u64) -> Order {
        let mut o = Order::dummy(Address::repeat_byte(0x11), Address::repeat_byte(0x22), 1_700_000_000);
        o.nonce = U256::from(nonce);
        o
    }

    #[test]
    fn first_claim_ok() {
        let mut guard = FillGuard::new(100);
        assert!(guard.claim(&order(1)).is_ok());
        assert!(guard.is_filled(&order(1)));
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn second_claim_rejected() {
        let mut guard = FillGuard::new(100);
        guard.claim(&order(1)).unwrap();

        let err = guard.claim(&order(1)).unwrap_err();
        assert!(
            matches!(err, SubmissionError::Rejected { .. }),
            "Expected Rejected, got: {err:?}"
        );
    }

    #[test]
    fn same_nonce_other_maker_is_distinct() {
        let mut guard = FillGuard::new(100);
        guard.claim(&order(1)).unwrap();
        let mut other = order(1);
        other.maker_address = Address::repeat_byte(0x33);
        assert!(guard.claim(&other).is_ok());
    }

    #[test]
    fn evicts_oldest() {
        let mut guard = FillGuard::new(3);
        for n in 1..=3 {
            guard.claim(&order(n)).unwrap();
        }
        guard.claim(&order(4)).unwrap();
        assert_eq!(guard.len(), 3);
        assert!(!guard.is_filled(&order(1)), "nonce 1 should have been evicted");
        assert!(guard.is_filled(&order(2)));
        assert!(guard.is_filled(&order(4)));
    }

    #[test]
    fn release_allows_a_retry() {
        let mut guard = FillGuard::new(10);
        guard.claim(&order(7)).unwrap();
        guard.release(&order(7));
        assert!(guard.is_empty());
        assert!(guard.claim(&order(7)).is_ok());
    }

    #[test]
    #[should_panic(expected = "max_size must be > 0")]
    fn zero_max_size_panics() {
        let _ = FillGuard::new(0);
    }
}
