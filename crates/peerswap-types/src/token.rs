//! Token references and atomic/human amount conversion.
//!
//! Amounts cross the protocol boundary as `U256` atomic units. Human units
//! only exist at the caller boundary, as [`Decimal`].

use alloy_primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{PeerswapError, Result, constants};

/// An address-and-decimals pair identifying a fungible asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenRef {
    #[serde(with = "crate::wire::lower_address")]
    pub address: Address,
    pub decimals: u8,
    pub symbol: String,
}

impl TokenRef {
    #[must_use]
    pub fn new(address: Address, decimals: u8, symbol: impl Into<String>) -> Self {
        Self {
            address,
            decimals,
            symbol: symbol.into(),
        }
    }

    /// Native ETH (zero address, 18 decimals).
    #[must_use]
    pub fn eth() -> Self {
        Self::new(constants::ETH_ADDRESS, 18, "ETH")
    }

    #[must_use]
    pub fn is_eth(&self) -> bool {
        self.address == constants::ETH_ADDRESS
    }

    /// Convert a human amount to atomic units.
    ///
    /// # Errors
    /// `InvalidAmount` if `human` is negative, has more fractional digits
    /// than the token supports, or does not fit 256 bits.
    pub fn to_atomic(&self, human: Decimal) -> Result<U256> {
        if human.is_sign_negative() && !human.is_zero() {
            return Err(PeerswapError::InvalidAmount {
                reason: format!("{human} {} is negative", self.symbol),
            });
        }
        let human = human.normalize();
        let scale = human.scale();
        if scale > u32::from(self.decimals) {
            return Err(PeerswapError::InvalidAmount {
                reason: format!(
                    "{human} {} has {scale} fractional digits, token supports {}",
                    self.symbol, self.decimals
                ),
            });
        }
        let mantissa = human.mantissa().unsigned_abs();
        let shift = u32::from(self.decimals) - scale;
        U256::from(10u8)
            .checked_pow(U256::from(shift))
            .and_then(|factor| U256::from(mantissa).checked_mul(factor))
            .ok_or_else(|| PeerswapError::InvalidAmount {
                reason: format!("{human} {} overflows 256 bits", self.symbol),
            })
    }

    /// Render atomic units as a human decimal string without trailing zeros.
    #[must_use]
    pub fn to_human(&self, atomic: U256) -> String {
        let digits = atomic.to_string();
        let decimals = usize::from(self.decimals);
        if decimals == 0 {
            return digits;
        }
        let padded = if digits.len() <= decimals {
            format!("{}{digits}", "0".repeat(decimals - digits.len() + 1))
        } else {
            digits
        };
        let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
        let frac_part = frac_part.trim_end_matches('0');
        if frac_part.is_empty() {
            int_part.to_string()
        } else {
            format!("{int_part}.{frac_part}")
        }
    }
}

impl std::fmt::Display for TokenRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.symbol, crate::wire::to_lower_hex(&self.address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dai() -> TokenRef {
        TokenRef::new(Address::repeat_byte(0xda), 18, "DAI")
    }

    #[test]
    fn to_atomic_scales_by_decimals() {
        assert_eq!(
            dai().to_atomic(Decimal::new(500, 0)).unwrap(),
            U256::from(500u64) * U256::from(10u64).pow(U256::from(18u64))
        );
        assert_eq!(
            dai().to_atomic(Decimal::new(15, 1)).unwrap(),
            U256::from(15u64) * U256::from(10u64).pow(U256::from(17u64))
        );
    }

    #[test]
    fn to_atomic_rejects_negative_and_excess_precision() {
        assert!(dai().to_atomic(Decimal::new(-1, 0)).is_err());
        let usdc = TokenRef::new(Address::repeat_byte(0xa0), 6, "USDC");
        assert!(usdc.to_atomic(Decimal::new(1, 7)).is_err());
        // Trailing zeros beyond the token precision are fine.
        assert_eq!(
            usdc.to_atomic(Decimal::new(1_500_000_000, 9)).unwrap(),
            U256::from(1_500_000u64)
        );
    }

    #[test]
    fn to_human_trims_and_pads() {
        let one_and_half = U256::from(15u64) * U256::from(10u64).pow(U256::from(17u64));
        assert_eq!(dai().to_human(one_and_half), "1.5");
        assert_eq!(dai().to_human(U256::from(1u64)), "0.000000000000000001");
        assert_eq!(dai().to_human(U256::ZERO), "0");
        let whole = TokenRef::new(Address::repeat_byte(1), 0, "WHOLE");
        assert_eq!(whole.to_human(U256::from(42u64)), "42");
    }

    #[test]
    fn human_atomic_roundtrip_is_lossless() {
        let amount = Decimal::new(123_456_789, 4);
        let atomic = dai().to_atomic(amount).unwrap();
        assert_eq!(dai().to_human(atomic), amount.normalize().to_string());
    }

    #[test]
    fn eth_is_zero_address() {
        assert!(TokenRef::eth().is_eth());
        assert!(!dai().is_eth());
    }
}
