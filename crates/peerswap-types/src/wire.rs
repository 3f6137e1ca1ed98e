//! JSON wire forms exchanged with peers and handed to collaborators.
//!
//! Peers send orders as flat JSON objects with camelCase keys, amounts as
//! decimal strings, addresses as lowercase `0x` hex and the signature split
//! into `v`/`r`/`s`. Everything entering from the wire is parsed here and
//! fails closed with a [`DecodeError`].

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{DecodeError, FixedAmount, Order, OrderRequest, OrderSignature, SignedOrder};

// ---------------------------------------------------------------------------
// Scalar helpers
// ---------------------------------------------------------------------------

/// Lowercase `0x`-prefixed hex of an address (the wire form).
#[must_use]
pub fn to_lower_hex(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_slice()))
}

/// Lowercase `0x`-prefixed hex of a 32-byte word.
#[must_use]
pub fn word_to_hex(word: &B256) -> String {
    format!("0x{}", hex::encode(word.as_slice()))
}

fn strip_hex_prefix(raw: &str) -> &str {
    raw.strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw)
}

/// Parse a 20-byte hex address. Checksums are not enforced; case is ignored.
pub fn parse_address(field: &'static str, raw: &str) -> Result<Address, DecodeError> {
    let digits = strip_hex_prefix(raw.trim());
    let malformed = || DecodeError::MalformedAddress {
        field,
        value: raw.to_string(),
    };
    if digits.len() != 2 * crate::constants::ADDRESS_WIDTH {
        return Err(malformed());
    }
    let bytes = hex::decode(digits).map_err(|_| malformed())?;
    Ok(Address::from_slice(&bytes))
}

/// Parse a 32-byte hex word (signature `r` / `s`).
pub fn parse_word(field: &'static str, raw: &str) -> Result<B256, DecodeError> {
    let digits = strip_hex_prefix(raw.trim());
    let malformed = || DecodeError::MalformedSignature {
        reason: format!("{field} is not 32 bytes of hex: {raw:?}"),
    };
    if digits.len() != 2 * crate::constants::WORD_WIDTH {
        return Err(malformed());
    }
    let bytes = hex::decode(digits).map_err(|_| malformed())?;
    Ok(B256::from_slice(&bytes))
}

/// Parse a non-negative decimal integer that must fit 256 bits.
pub fn parse_u256(field: &'static str, raw: &str) -> Result<U256, DecodeError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DecodeError::MalformedInteger {
            field,
            value: raw.to_string(),
        });
    }
    U256::from_str_radix(raw, 10).map_err(|_| DecodeError::IntegerOutOfRange { field })
}

/// Parse a non-negative decimal integer that must fit 64 bits.
pub fn parse_u64(field: &'static str, raw: &str) -> Result<u64, DecodeError> {
    let wide = parse_u256(field, raw)?;
    u64::try_from(wide).map_err(|_| DecodeError::IntegerOutOfRange { field })
}

/// Serde adapter writing an [`Address`] as lowercase hex.
pub mod lower_address {
    use super::{Address, Deserialize, Deserializer, Serializer, parse_address, to_lower_hex};

    pub fn serialize<S: Serializer>(address: &Address, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_lower_hex(address))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Address, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_address("address", &raw).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter writing a list of addresses as lowercase hex.
pub mod lower_address_vec {
    use super::{Address, Deserialize, Deserializer, Serializer, parse_address, to_lower_hex};
    use serde::ser::SerializeSeq;

    pub fn serialize<S: Serializer>(
        addresses: &[Address],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(addresses.len()))?;
        for address in addresses {
            seq.serialize_element(&to_lower_hex(address))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Address>, D::Error> {
        let raw = Vec::<String>::deserialize(deserializer)?;
        raw.iter()
            .map(|s| parse_address("address", s).map_err(serde::de::Error::custom))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// WireInt
// ---------------------------------------------------------------------------

/// An integer that peers send either as a JSON number or a decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireInt {
    Number(u64),
    Text(String),
}

impl WireInt {
    pub fn to_u64(&self, field: &'static str) -> Result<u64, DecodeError> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => parse_u64(field, s),
        }
    }

    pub fn to_u256(&self, field: &'static str) -> Result<U256, DecodeError> {
        match self {
            Self::Number(n) => Ok(U256::from(*n)),
            Self::Text(s) => parse_u256(field, s),
        }
    }
}

// ---------------------------------------------------------------------------
// WireOrder
// ---------------------------------------------------------------------------

/// Flat JSON order as exchanged with peers, optionally carrying `v`/`r`/`s`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireOrder {
    pub maker_address: String,
    pub maker_amount: String,
    pub maker_token: String,
    pub taker_address: String,
    pub taker_amount: String,
    pub taker_token: String,
    pub expiration: WireInt,
    pub nonce: WireInt,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<String>,
}

impl WireOrder {
    /// Parse the order fields, ignoring any signature.
    pub fn to_order(&self) -> Result<Order, DecodeError> {
        Ok(Order {
            maker_address: parse_address("makerAddress", &self.maker_address)?,
            maker_amount: parse_u256("makerAmount", &self.maker_amount)?,
            maker_token: parse_address("makerToken", &self.maker_token)?,
            taker_address: parse_address("takerAddress", &self.taker_address)?,
            taker_amount: parse_u256("takerAmount", &self.taker_amount)?,
            taker_token: parse_address("takerToken", &self.taker_token)?,
            expiration: self.expiration.to_u64("expiration")?,
            nonce: self.nonce.to_u256("nonce")?,
        })
    }

    /// Parse `v`/`r`/`s`; all three must be present.
    pub fn to_signature(&self) -> Result<OrderSignature, DecodeError> {
        let (Some(v), Some(r), Some(s)) = (self.v, self.r.as_deref(), self.s.as_deref()) else {
            return Err(DecodeError::MalformedSignature {
                reason: "v, r and s are all required".to_string(),
            });
        };
        OrderSignature::from_parts(v, parse_word("r", r)?, parse_word("s", s)?)
    }
}

impl From<&Order> for WireOrder {
    fn from(order: &Order) -> Self {
        Self {
            maker_address: to_lower_hex(&order.maker_address),
            maker_amount: order.maker_amount.to_string(),
            maker_token: to_lower_hex(&order.maker_token),
            taker_address: to_lower_hex(&order.taker_address),
            taker_amount: order.taker_amount.to_string(),
            taker_token: to_lower_hex(&order.taker_token),
            expiration: WireInt::Number(order.expiration),
            nonce: WireInt::Text(order.nonce.to_string()),
            v: None,
            r: None,
            s: None,
        }
    }
}

impl From<Order> for WireOrder {
    fn from(order: Order) -> Self {
        Self::from(&order)
    }
}

impl From<&SignedOrder> for WireOrder {
    fn from(signed: &SignedOrder) -> Self {
        let signature = signed.signature();
        Self {
            v: Some(signature.v),
            r: Some(word_to_hex(&signature.r)),
            s: Some(word_to_hex(&signature.s)),
            ..Self::from(signed.order())
        }
    }
}

impl From<SignedOrder> for WireOrder {
    fn from(signed: SignedOrder) -> Self {
        Self::from(&signed)
    }
}

impl TryFrom<WireOrder> for Order {
    type Error = DecodeError;

    fn try_from(wire: WireOrder) -> Result<Self, Self::Error> {
        wire.to_order()
    }
}

impl TryFrom<WireOrder> for SignedOrder {
    type Error = DecodeError;

    fn try_from(wire: WireOrder) -> Result<Self, Self::Error> {
        Ok(SignedOrder::new(wire.to_order()?, wire.to_signature()?))
    }
}

// ---------------------------------------------------------------------------
// WireOrderRequest
// ---------------------------------------------------------------------------

/// JSON `getOrder` parameters: exactly one of `makerAmount` / `takerAmount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireOrderRequest {
    pub maker_token: String,
    pub taker_token: String,
    pub taker_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maker_amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taker_amount: Option<String>,
}

impl TryFrom<WireOrderRequest> for OrderRequest {
    type Error = DecodeError;

    fn try_from(wire: WireOrderRequest) -> Result<Self, Self::Error> {
        let amount = match (wire.maker_amount.as_deref(), wire.taker_amount.as_deref()) {
            (Some(maker), None) => FixedAmount::Maker(parse_u256("makerAmount", maker)?),
            (None, Some(taker)) => FixedAmount::Taker(parse_u256("takerAmount", taker)?),
            _ => return Err(DecodeError::AmountSpecification),
        };
        Ok(OrderRequest {
            maker_token: parse_address("makerToken", &wire.maker_token)?,
            taker_token: parse_address("takerToken", &wire.taker_token)?,
            taker_address: parse_address("takerAddress", &wire.taker_address)?,
            amount,
        })
    }
}

impl From<OrderRequest> for WireOrderRequest {
    fn from(request: OrderRequest) -> Self {
        let (maker_amount, taker_amount) = match request.amount {
            FixedAmount::Maker(amount) => (Some(amount.to_string()), None),
            FixedAmount::Taker(amount) => (None, Some(amount.to_string())),
        };
        Self {
            maker_token: to_lower_hex(&request.maker_token),
            taker_token: to_lower_hex(&request.taker_token),
            taker_address: to_lower_hex(&request.taker_address),
            maker_amount,
            taker_amount,
        }
    }
}
