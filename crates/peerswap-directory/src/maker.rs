//! Maker-side responder: answers `getOrder` requests with signed orders.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use peerswap_codec::codec::unix_now;
use peerswap_codec::{NonceSource, SigningCapability, sign};
use peerswap_types::{
    Address, FixedAmount, NegotiationConfig, Order, OrderRequest, SignedOrder, U256, WireOrder,
    WireOrderRequest,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::client::{DirectoryClient, InboundRequest};
use crate::protocol::{RpcError, codes, methods};

/// Why a quoter will not price a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteDeclined(pub String);

impl std::fmt::Display for QuoteDeclined {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Prices order requests.
///
/// Given the fixed side of a request, returns the amount for the other side:
/// the taker amount when the maker amount is fixed, and vice versa.
#[async_trait]
pub trait OrderQuoter: Send + Sync {
    async fn quote(&self, request: &OrderRequest) -> Result<U256, QuoteDeclined>;
}

/// Quotes a fixed rate per pair: `maker = taker * numerator / denominator`.
#[derive(Debug, Clone, Default)]
pub struct RateQuoter {
    rates: HashMap<(Address, Address), (U256, U256)>,
}

impl RateQuoter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Quote `numerator / denominator` maker atomic units per taker atomic unit.
    #[must_use]
    pub fn with_rate(
        mut self,
        maker_token: Address,
        taker_token: Address,
        numerator: U256,
        denominator: U256,
    ) -> Self {
        self.rates
            .insert((maker_token, taker_token), (numerator, denominator));
        self
    }
}

#[async_trait]
impl OrderQuoter for RateQuoter {
    async fn quote(&self, request: &OrderRequest) -> Result<U256, QuoteDeclined> {
        let &(num, den) = self
            .rates
            .get(&(request.maker_token, request.taker_token))
            .ok_or_else(|| QuoteDeclined("pair not supported".to_string()))?;
        if num.is_zero() || den.is_zero() {
            return Err(QuoteDeclined("pair not priced".to_string()));
        }
        let overflow = || QuoteDeclined("amount too large".to_string());
        let counter = match request.amount {
            // Round in the maker's favour: give down, take up.
            FixedAmount::Taker(taker) => taker.checked_mul(num).ok_or_else(overflow)? / den,
            FixedAmount::Maker(maker) => {
                let scaled = maker.checked_mul(den).ok_or_else(overflow)?;
                scaled.div_ceil(num)
            }
        };
        if counter.is_zero() {
            return Err(QuoteDeclined("amount too small".to_string()));
        }
        Ok(counter)
    }
}

/// Serves `getOrder` for one maker identity.
pub struct MakerService {
    client: Arc<DirectoryClient>,
    quoter: Arc<dyn OrderQuoter>,
    nonces: NonceSource,
    order_ttl: Duration,
}

impl MakerService {
    #[must_use]
    pub fn new(
        client: Arc<DirectoryClient>,
        quoter: Arc<dyn OrderQuoter>,
        config: &NegotiationConfig,
    ) -> Self {
        Self {
            client,
            quoter,
            nonces: NonceSource::new(),
            order_ttl: Duration::from_secs(config.order_ttl_secs),
        }
    }

    #[must_use]
    pub fn with_nonces(mut self, nonces: NonceSource) -> Self {
        self.nonces = nonces;
        self
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.client.address()
    }

    fn signer(&self) -> &dyn SigningCapability {
        self.client.identity().as_ref()
    }

    /// Answer requests until `incoming` closes. Each request runs on its own task.
    pub async fn run(self: Arc<Self>, mut incoming: mpsc::Receiver<InboundRequest>) {
        info!(maker = %self.address(), "Maker: serving getOrder");
        while let Some(request) = incoming.recv().await {
            let service = Arc::clone(&self);
            tokio::spawn(async move {
                let outcome = service.handle(&request).await;
                if let Err(e) = service.client.respond(&request, outcome).await {
                    warn!(to = %request.from, error = %e, "Maker: could not send reply");
                }
            });
        }
        info!(maker = %self.address(), "Maker: request stream closed");
    }

    async fn handle(&self, request: &InboundRequest) -> Result<Value, RpcError> {
        if request.method != methods::GET_ORDER {
            return Err(RpcError::method_not_found(&request.method));
        }
        let wire: WireOrderRequest = serde_json::from_value(request.params.clone())
            .map_err(|e| RpcError::invalid_params(e.to_string()))?;
        let order_request =
            OrderRequest::try_from(wire).map_err(|e| RpcError::invalid_params(e.to_string()))?;
        if order_request.taker_address != request.from {
            return Err(RpcError::invalid_params("takerAddress must be the requester"));
        }

        let signed = self.build_order(&order_request).await?;
        serde_json::to_value(WireOrder::from(&signed))
            .map_err(|e| RpcError::new(codes::INTERNAL_ERROR, e.to_string()))
    }

    /// Quote, build and sign an order answering `request`.
    ///
    /// # Errors
    /// `ORDER_DECLINED` if the quoter refuses or signing fails.
    pub async fn build_order(&self, request: &OrderRequest) -> Result<SignedOrder, RpcError> {
        let counter = self.quoter.quote(request).await.map_err(|declined| {
            debug!(taker = %request.taker_address, reason = %declined, "Maker: declined");
            RpcError::declined(declined.0)
        })?;
        let (maker_amount, taker_amount) = match request.amount {
            FixedAmount::Maker(maker) => (maker, counter),
            FixedAmount::Taker(taker) => (counter, taker),
        };
        let order = Order {
            maker_address: self.address(),
            maker_amount,
            maker_token: request.maker_token,
            taker_address: request.taker_address,
            taker_amount,
            taker_token: request.taker_token,
            expiration: unix_now() + self.order_ttl.as_secs(),
            nonce: self.nonces.next_nonce(),
        };
        let signed = sign(order, self.signer())
            .await
            .map_err(|e| RpcError::declined(e.to_string()))?;
        info!(
            taker = %request.taker_address,
            maker_amount = %signed.order().maker_amount,
            taker_amount = %signed.order().taker_amount,
            "Maker: order signed"
        );
        Ok(signed)
    }
}
