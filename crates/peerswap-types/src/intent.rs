//! Intents: a peer's advertised willingness to trade a directed pair.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::wire::lower_address;

/// One counterparty's willingness to make `maker_token` for `taker_token`.
///
/// Produced from a discovery response; carries no lifecycle of its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    #[serde(rename = "address", with = "lower_address")]
    pub peer_address: Address,
    #[serde(with = "lower_address")]
    pub maker_token: Address,
    #[serde(with = "lower_address")]
    pub taker_token: Address,
}

impl Intent {
    #[must_use]
    pub fn new(peer_address: Address, maker_token: Address, taker_token: Address) -> Self {
        Self {
            peer_address,
            maker_token,
            taker_token,
        }
    }

    /// Does this intent cover any `(maker, taker)` pair from the two sets?
    #[must_use]
    pub fn matches(&self, maker_tokens: &[Address], taker_tokens: &[Address]) -> bool {
        maker_tokens.contains(&self.maker_token) && taker_tokens.contains(&self.taker_token)
    }
}

/// A pair a maker registers with the indexer (the peer is the registering identity).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingPair {
    #[serde(with = "lower_address")]
    pub maker_token: Address,
    #[serde(with = "lower_address")]
    pub taker_token: Address,
}

impl TradingPair {
    #[must_use]
    pub fn new(maker_token: Address, taker_token: Address) -> Self {
        Self {
            maker_token,
            taker_token,
        }
    }

    #[must_use]
    pub fn for_peer(&self, peer_address: Address) -> Intent {
        Intent::new(peer_address, self.maker_token, self.taker_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_matches_cross_product() {
        let dai = Address::repeat_byte(0xda);
        let weth = Address::repeat_byte(0xee);
        let intent = Intent::new(Address::repeat_byte(1), dai, Address::ZERO);
        assert!(intent.matches(&[dai, weth], &[Address::ZERO]));
        assert!(!intent.matches(&[weth], &[Address::ZERO]));
        assert!(!intent.matches(&[dai], &[weth]));
    }

    #[test]
    fn intent_wire_keys() {
        let intent = Intent::new(Address::repeat_byte(0xab), Address::repeat_byte(0xda), Address::ZERO);
        let json = serde_json::to_value(&intent).unwrap();
        assert_eq!(json["address"], "0xabababababababababababababababababababab");
        assert_eq!(json["takerToken"], "0x0000000000000000000000000000000000000000");
        let back: Intent = serde_json::from_value(json).unwrap();
        assert_eq!(back, intent);
    }
}
