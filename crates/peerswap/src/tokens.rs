//! Token metadata: symbols, addresses and decimals.
//!
//! Negotiation works in atomic units only. Callers speak in symbols and human
//! amounts; a [`TokenMetadata`] source bridges the two.

use std::collections::HashMap;

use alloy_primitives::{Address, U256, address};
use async_trait::async_trait;
use peerswap_types::{PeerswapError, Result, TokenRef};
use rust_decimal::Decimal;

/// Canonical wrapped-ether contract on mainnet.
pub const MAINNET_WETH: Address = address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");
/// Dai stablecoin on mainnet.
pub const MAINNET_DAI: Address = address!("6b175474e89094c44da98b954eedeac495271d0f");
/// USD Coin on mainnet.
pub const MAINNET_USDC: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");

/// Looks up tokens by symbol or address.
#[async_trait]
pub trait TokenMetadata: Send + Sync {
    /// Resolve a symbol, case-insensitively.
    ///
    /// # Errors
    /// `UnknownToken` if the symbol is not listed.
    async fn resolve(&self, symbol: &str) -> Result<TokenRef>;

    /// # Errors
    /// `UnknownToken` if the address is not listed.
    async fn by_address(&self, address: Address) -> Result<TokenRef>;

    /// Human amount of `token` in atomic units.
    fn to_atomic(&self, token: &TokenRef, human: Decimal) -> Result<U256> {
        token.to_atomic(human)
    }

    /// Atomic amount of `token` as a human decimal string.
    fn to_human(&self, token: &TokenRef, atomic: U256) -> String {
        token.to_human(atomic)
    }
}

/// A fixed in-memory token list.
#[derive(Debug, Clone, Default)]
pub struct TokenCatalog {
    by_symbol: HashMap<String, TokenRef>,
    by_address: HashMap<Address, TokenRef>,
}

impl TokenCatalog {
    /// ETH only.
    #[must_use]
    pub fn new() -> Self {
        Self::default().with_token(TokenRef::eth())
    }

    /// ETH, WETH, DAI and USDC at their mainnet addresses.
    #[must_use]
    pub fn mainnet() -> Self {
        Self::new()
            .with_token(TokenRef::new(MAINNET_WETH, 18, "WETH"))
            .with_token(TokenRef::new(MAINNET_DAI, 18, "DAI"))
            .with_token(TokenRef::new(MAINNET_USDC, 6, "USDC"))
    }

    /// Add or replace a token. A later token with the same symbol or address wins.
    #[must_use]
    pub fn with_token(mut self, token: TokenRef) -> Self {
        self.by_address.insert(token.address, token.clone());
        self.by_symbol.insert(token.symbol.to_ascii_uppercase(), token);
        self
    }

    /// Parse a JSON array of tokens and add them to ETH.
    ///
    /// ```json
    /// [{ "address": "0x6b17...", "decimals": 18, "symbol": "DAI" }]
    /// ```
    ///
    /// # Errors
    /// `Configuration` if the document is not a token list.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let tokens: Vec<TokenRef> =
            serde_json::from_str(raw).map_err(|e| PeerswapError::Configuration(e.to_string()))?;
        Ok(tokens.into_iter().fold(Self::new(), Self::with_token))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}

#[async_trait]
impl TokenMetadata for TokenCatalog {
    async fn resolve(&self, symbol: &str) -> Result<TokenRef> {
        self.by_symbol
            .get(&symbol.to_ascii_uppercase())
            .cloned()
            .ok_or_else(|| PeerswapError::UnknownToken(symbol.to_string()))
    }

    async fn by_address(&self, address: Address) -> Result<TokenRef> {
        self.by_address
            .get(&address)
            .cloned()
            .ok_or_else(|| PeerswapError::UnknownToken(peerswap_types::wire::to_lower_hex(&address)))
    }
}
