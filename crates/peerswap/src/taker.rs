//! Taker flow: price an amount in ETH against every maker, then fill.
//!
//! Buying a token pays ETH: the maker gives the token, the taker fixes how
//! much of it they want. Selling a token is quoted in WETH: the maker gives
//! WETH, the taker fixes how much of the token they give.

use std::sync::Arc;

use peerswap_directory::{DirectoryClient, NegotiationSession};
use peerswap_settlement::{GasParams, SettlementSubmitter};
use peerswap_types::{
    FillReceipt, NegotiationResult, OrderRequest, PeerswapConfig, PeerswapError, QuoteLimit,
    Result, Side, SignedOrder,
};
use rust_decimal::Decimal;
use tracing::info;

use crate::tokens::TokenMetadata;

/// One taker identity: negotiates through its directory link and fills
/// through an optional settlement submitter.
pub struct Taker {
    session: NegotiationSession,
    tokens: Arc<dyn TokenMetadata>,
    submitter: Option<Arc<SettlementSubmitter>>,
    gas: GasParams,
}

impl Taker {
    #[must_use]
    pub fn new(
        client: Arc<DirectoryClient>,
        tokens: Arc<dyn TokenMetadata>,
        config: &PeerswapConfig,
    ) -> Self {
        Self {
            session: NegotiationSession::new(client, &config.negotiation),
            tokens,
            submitter: None,
            gas: GasParams::default(),
        }
    }

    #[must_use]
    pub fn with_submitter(mut self, submitter: Arc<SettlementSubmitter>) -> Self {
        self.submitter = Some(submitter);
        self
    }

    #[must_use]
    pub fn with_gas(mut self, gas: GasParams) -> Self {
        self.gas = gas;
        self
    }

    #[must_use]
    pub fn with_quote_limit(mut self, limit: QuoteLimit) -> Self {
        self.session = self.session.with_quote_limit(limit);
        self
    }

    #[must_use]
    pub fn session(&self) -> &NegotiationSession {
        &self.session
    }

    fn client(&self) -> &Arc<DirectoryClient> {
        self.session.client()
    }

    /// Connect the directory link.
    ///
    /// # Errors
    /// `Connection` if the router cannot be reached.
    pub async fn connect(&self) -> Result<()> {
        self.client().connect().await
    }

    /// The request [`get_eth_orders`](Self::get_eth_orders) would send.
    ///
    /// # Errors
    /// `UnknownToken` for an unlisted symbol (or a catalog without WETH when
    /// selling), `InvalidAmount` if `amount` does not fit the token.
    pub async fn eth_order_request(
        &self,
        amount: Decimal,
        symbol: &str,
        side: Side,
    ) -> Result<OrderRequest> {
        let token = self.tokens.resolve(symbol).await?;
        let atomic = self.tokens.to_atomic(&token, amount)?;
        if atomic.is_zero() {
            return Err(PeerswapError::InvalidAmount {
                reason: format!("{amount} {} is zero in atomic units", token.symbol),
            });
        }
        let taker = self.client().address();
        let request = match side {
            Side::Buy => {
                let eth = self.tokens.resolve("ETH").await?;
                OrderRequest::for_maker_amount(token.address, eth.address, taker, atomic)
            }
            Side::Sell => {
                let weth = self.tokens.resolve("WETH").await?;
                OrderRequest::for_taker_amount(weth.address, token.address, taker, atomic)
            }
        };
        Ok(request)
    }

    /// Ask every maker with a matching intent for an order.
    ///
    /// # Errors
    /// Token errors from [`eth_order_request`](Self::eth_order_request) and
    /// discovery errors. Per-maker failures are outcomes in the result.
    pub async fn get_eth_orders(
        &self,
        amount: Decimal,
        symbol: &str,
        side: Side,
    ) -> Result<NegotiationResult> {
        let request = self.eth_order_request(amount, symbol, side).await?;
        info!(%amount, symbol, %side, "Taker: requesting orders");
        self.session.get_orders(&request).await
    }

    /// One line per order, in human units: `"500 DAI for 1 ETH from 0x…"`.
    ///
    /// # Errors
    /// `UnknownToken` if either token is not in the catalog.
    pub async fn describe(&self, signed: &SignedOrder) -> Result<String> {
        let order = signed.order();
        let maker_token = self.tokens.by_address(order.maker_token).await?;
        let taker_token = self.tokens.by_address(order.taker_token).await?;
        Ok(format!(
            "{} {} for {} {} from {}",
            self.tokens.to_human(&maker_token, order.maker_amount),
            maker_token.symbol,
            self.tokens.to_human(&taker_token, order.taker_amount),
            taker_token.symbol,
            peerswap_types::wire::to_lower_hex(&order.maker_address),
        ))
    }

    /// Fill `signed` as this taker, retrying transport failures.
    ///
    /// # Errors
    /// `Configuration` without a submitter, otherwise `Submission`.
    pub async fn fill(&self, signed: &SignedOrder) -> Result<FillReceipt> {
        let submitter = self.submitter.as_ref().ok_or_else(|| {
            PeerswapError::Configuration("no settlement submitter configured".to_string())
        })?;
        let identity = self.client().identity();
        let receipt = submitter
            .fill_with_retry(signed, identity.as_ref(), &self.gas, submitter.retry_policy())
            .await?;
        Ok(receipt)
    }

    /// Fill the best usable order in `result`, if any.
    ///
    /// # Errors
    /// As [`fill`](Self::fill).
    pub async fn fill_best(&self, result: &NegotiationResult) -> Result<Option<FillReceipt>> {
        match result.best() {
            Some(best) => self.fill(best).await.map(Some),
            None => Ok(None),
        }
    }
}
