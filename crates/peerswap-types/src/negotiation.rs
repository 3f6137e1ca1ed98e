//! Negotiation results: one outcome per queried intent.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::{FixedAmount, Intent, Order, OrderRequest, PeerFailure, SignedOrder};

/// What one peer produced: a usable signed order or the reason it did not.
pub type PeerOutcome = std::result::Result<SignedOrder, PeerFailure>;

/// Caller-supplied bound on the amount a maker fills in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteLimit {
    /// Taker amount fixed: the maker must give at least this much.
    MinMakerAmount(U256),
    /// Maker amount fixed: the taker must pay at most this much.
    MaxTakerAmount(U256),
}

impl QuoteLimit {
    /// Check a quoted order against the bound.
    ///
    /// # Errors
    /// `PeerFailure::QuoteOutOfBounds` when the quote is outside the bound.
    pub fn check(&self, order: &Order) -> std::result::Result<(), PeerFailure> {
        match *self {
            Self::MinMakerAmount(min) if order.maker_amount < min => {
                Err(PeerFailure::QuoteOutOfBounds {
                    reason: format!("makerAmount {} below minimum {min}", order.maker_amount),
                })
            }
            Self::MaxTakerAmount(max) if order.taker_amount > max => {
                Err(PeerFailure::QuoteOutOfBounds {
                    reason: format!("takerAmount {} above maximum {max}", order.taker_amount),
                })
            }
            _ => Ok(()),
        }
    }
}

/// One queried intent and its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiationEntry {
    pub intent: Intent,
    pub outcome: PeerOutcome,
}

impl NegotiationEntry {
    #[must_use]
    pub fn signed_order(&self) -> Option<&SignedOrder> {
        self.outcome.as_ref().ok()
    }

    #[must_use]
    pub fn failure(&self) -> Option<&PeerFailure> {
        self.outcome.as_ref().err()
    }
}

/// Every queried intent paired with exactly one outcome, in intent order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiationResult {
    pub request: OrderRequest,
    pub entries: Vec<NegotiationEntry>,
}

impl NegotiationResult {
    #[must_use]
    pub fn new(request: OrderRequest, entries: Vec<NegotiationEntry>) -> Self {
        Self { request, entries }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Usable signed orders with the intent that produced them.
    pub fn usable(&self) -> impl Iterator<Item = (&Intent, &SignedOrder)> {
        self.entries
            .iter()
            .filter_map(|e| e.signed_order().map(|o| (&e.intent, o)))
    }

    /// Failed intents with their reasons.
    pub fn failures(&self) -> impl Iterator<Item = (&Intent, &PeerFailure)> {
        self.entries
            .iter()
            .filter_map(|e| e.failure().map(|f| (&e.intent, f)))
    }

    #[must_use]
    pub fn usable_count(&self) -> usize {
        self.usable().count()
    }

    /// The outcome recorded for a peer, if it was queried.
    #[must_use]
    pub fn outcome_for(&self, peer: &alloy_primitives::Address) -> Option<&PeerOutcome> {
        self.entries
            .iter()
            .find(|e| &e.intent.peer_address == peer)
            .map(|e| &e.outcome)
    }

    /// The best usable order for the taker.
    ///
    /// With the maker amount fixed the cheapest order (lowest taker amount)
    /// wins; with the taker amount fixed the most generous (highest maker
    /// amount) wins. Ties go to the earliest entry.
    #[must_use]
    pub fn best(&self) -> Option<&SignedOrder> {
        let mut best: Option<&SignedOrder> = None;
        for (_, candidate) in self.usable() {
            let better = match best {
                None => true,
                Some(current) => match self.request.amount {
                    FixedAmount::Maker(_) => {
                        candidate.order().taker_amount < current.order().taker_amount
                    }
                    FixedAmount::Taker(_) => {
                        candidate.order().maker_amount > current.order().maker_amount
                    }
                },
            };
            if better {
                best = Some(candidate);
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{Address, B256};

    use super::*;
    use crate::OrderSignature;

    fn signed(peer: u8, maker_amount: u64, taker_amount: u64) -> SignedOrder {
        let mut order = Order::dummy(Address::repeat_byte(peer), Address::repeat_byte(0x22), 1_000);
        order.maker_amount = U256::from(maker_amount);
        order.taker_amount = U256::from(taker_amount);
        let sig = OrderSignature::from_parts(27, B256::ZERO, B256::ZERO).unwrap();
        SignedOrder::new(order, sig)
    }

    fn entry(peer: u8, outcome: PeerOutcome) -> NegotiationEntry {
        NegotiationEntry {
            intent: Intent::new(Address::repeat_byte(peer), Address::repeat_byte(0xda), Address::ZERO),
            outcome,
        }
    }

    fn request(amount: FixedAmount) -> OrderRequest {
        OrderRequest {
            maker_token: Address::repeat_byte(0xda),
            taker_token: Address::ZERO,
            taker_address: Address::repeat_byte(0x22),
            amount,
        }
    }

    #[test]
    fn best_prefers_cheapest_when_maker_amount_fixed() {
        let result = NegotiationResult::new(
            request(FixedAmount::Maker(U256::from(500u64))),
            vec![
                entry(1, Ok(signed(1, 500, 300))),
                entry(2, Err(PeerFailure::Timeout { timeout_ms: 10 })),
                entry(3, Ok(signed(3, 500, 200))),
                entry(4, Ok(signed(4, 500, 200))),
            ],
        );
        let best = result.best().unwrap();
        assert_eq!(best.order().maker_address, Address::repeat_byte(3));
        assert_eq!(result.usable_count(), 3);
        assert_eq!(result.failures().count(), 1);
    }

    #[test]
    fn best_prefers_most_generous_when_taker_amount_fixed() {
        let result = NegotiationResult::new(
            request(FixedAmount::Taker(U256::from(100u64))),
            vec![entry(1, Ok(signed(1, 40, 100))), entry(2, Ok(signed(2, 45, 100)))],
        );
        assert_eq!(result.best().unwrap().order().maker_address, Address::repeat_byte(2));
    }

    #[test]
    fn best_is_none_without_usable_orders() {
        let result = NegotiationResult::new(
            request(FixedAmount::Maker(U256::from(1u64))),
            vec![entry(1, Err(PeerFailure::SignatureInvalid))],
        );
        assert!(result.best().is_none());
        assert_eq!(
            result.outcome_for(&Address::repeat_byte(1)),
            Some(&Err(PeerFailure::SignatureInvalid))
        );
    }

    #[test]
    fn quote_limit_checks() {
        let order = signed(1, 40, 100).into_parts().0;
        assert!(QuoteLimit::MinMakerAmount(U256::from(40u64)).check(&order).is_ok());
        assert!(matches!(
            QuoteLimit::MinMakerAmount(U256::from(41u64)).check(&order),
            Err(PeerFailure::QuoteOutOfBounds { .. })
        ));
        assert!(QuoteLimit::MaxTakerAmount(U256::from(100u64)).check(&order).is_ok());
        assert!(QuoteLimit::MaxTakerAmount(U256::from(99u64)).check(&order).is_err());
    }

    #[test]
    fn result_serializes_for_collaborators() {
        let result = NegotiationResult::new(
            request(FixedAmount::Maker(U256::from(500u64))),
            vec![entry(1, Ok(signed(1, 500, 300))), entry(2, Err(PeerFailure::SignatureInvalid))],
        );
        let json = serde_json::to_string(&result).unwrap();
        let back: NegotiationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }
}
