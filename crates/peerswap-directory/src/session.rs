//! Order negotiation: fan one request out to every intent, collect one
//! outcome per intent.
//!
//! Each peer gets its own task and its own timeout, so total latency is
//! bounded by a single peer timeout regardless of how many peers answer late.
//! A failing peer never aborts the batch; its failure is recorded as the
//! outcome for its intent.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use peerswap_codec::{validate_shape, verify_signed};
use peerswap_types::{
    Address, FixedAmount, Intent, NegotiationConfig, NegotiationEntry, NegotiationResult, Order,
    OrderRequest, PeerFailure, PeerOutcome, PeerswapError, QuoteLimit, Result, SignedOrder,
    ValidationError, WireOrder, WireOrderRequest,
};
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::client::DirectoryClient;
use crate::protocol::methods;

/// Requests priced, signed orders from discovered peers.
#[derive(Clone)]
pub struct NegotiationSession {
    client: Arc<DirectoryClient>,
    peer_timeout: Duration,
    limit: Option<QuoteLimit>,
}

impl NegotiationSession {
    #[must_use]
    pub fn new(client: Arc<DirectoryClient>, config: &NegotiationConfig) -> Self {
        Self {
            client,
            peer_timeout: config.peer_timeout(),
            limit: None,
        }
    }

    #[must_use]
    pub fn with_peer_timeout(mut self, peer_timeout: Duration) -> Self {
        self.peer_timeout = peer_timeout;
        self
    }

    /// Reject quotes outside `limit` with `QuoteOutOfBounds`.
    #[must_use]
    pub fn with_quote_limit(mut self, limit: QuoteLimit) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn client(&self) -> &Arc<DirectoryClient> {
        &self.client
    }

    /// Discover intents for the request's pair, then query all of them.
    ///
    /// # Errors
    /// Discovery errors (`NotConnected`, `DiscoveryTimeout`, ...). Per-peer
    /// failures are outcomes in the result, never errors.
    pub async fn get_orders(&self, request: &OrderRequest) -> Result<NegotiationResult> {
        let intents = self
            .client
            .find_intents(&[request.maker_token], &[request.taker_token])
            .await?;
        Ok(self.request_orders(intents, request).await)
    }

    /// Ask one peer for an order and classify what comes back.
    pub async fn request_order(&self, peer: Address, request: &OrderRequest) -> PeerOutcome {
        request_one(
            &self.client,
            peer,
            request,
            self.peer_timeout,
            self.limit.as_ref(),
        )
        .await
    }

    /// Query every intent concurrently. Entries come back in intent order,
    /// one per intent.
    pub async fn request_orders(
        &self,
        intents: Vec<Intent>,
        request: &OrderRequest,
    ) -> NegotiationResult {
        let mut tasks = JoinSet::new();
        let mut slots: HashMap<tokio::task::Id, usize> = HashMap::with_capacity(intents.len());

        for (index, intent) in intents.iter().enumerate() {
            let client = Arc::clone(&self.client);
            let peer = intent.peer_address;
            let request = request.clone();
            let timeout = self.peer_timeout;
            let limit = self.limit;
            let handle = tasks.spawn(async move {
                request_one(&client, peer, &request, timeout, limit.as_ref()).await
            });
            slots.insert(handle.id(), index);
        }

        let mut outcomes: Vec<Option<PeerOutcome>> = vec![None; intents.len()];
        while let Some(joined) = tasks.join_next_with_id().await {
            let (id, outcome) = match joined {
                Ok((id, outcome)) => (id, outcome),
                Err(e) => (
                    e.id(),
                    Err(PeerFailure::InvalidResponse {
                        reason: format!("negotiation task failed: {e}"),
                    }),
                ),
            };
            if let Some(&index) = slots.get(&id) {
                outcomes[index] = Some(outcome);
            }
        }

        let entries: Vec<NegotiationEntry> = intents
            .into_iter()
            .zip(outcomes)
            .map(|(intent, outcome)| NegotiationEntry {
                intent,
                // Every spawned task reports exactly once.
                outcome: outcome.unwrap_or(Err(PeerFailure::ConnectionLost)),
            })
            .collect();

        let result = NegotiationResult::new(request.clone(), entries);
        info!(
            peers = result.len(),
            usable = result.usable_count(),
            failed = result.len() - result.usable_count(),
            "Negotiation complete"
        );
        result
    }

    /// [`request_orders`](Self::request_orders), abandoned when `cancel`
    /// resolves first.
    ///
    /// Returns `None` on cancellation. Outstanding peer calls are aborted and
    /// their correlation entries cleared.
    pub async fn request_orders_until<C>(
        &self,
        intents: Vec<Intent>,
        request: &OrderRequest,
        cancel: C,
    ) -> Option<NegotiationResult>
    where
        C: Future<Output = ()>,
    {
        tokio::select! {
            result = self.request_orders(intents, request) => Some(result),
            () = cancel => {
                info!("Negotiation cancelled");
                None
            }
        }
    }
}

async fn request_one(
    client: &DirectoryClient,
    peer: Address,
    request: &OrderRequest,
    timeout: Duration,
    limit: Option<&QuoteLimit>,
) -> PeerOutcome {
    let outcome = fetch_and_check(client, peer, request, timeout, limit).await;
    match &outcome {
        Ok(order) => debug!(%peer, nonce = %order.order().nonce, "Peer quoted"),
        Err(failure) => debug!(%peer, outcome = failure.label(), %failure, "Peer failed"),
    }
    outcome
}

async fn fetch_and_check(
    client: &DirectoryClient,
    peer: Address,
    request: &OrderRequest,
    timeout: Duration,
    limit: Option<&QuoteLimit>,
) -> PeerOutcome {
    let params = serde_json::to_value(WireOrderRequest::from(request.clone())).map_err(|e| {
        PeerFailure::InvalidResponse {
            reason: e.to_string(),
        }
    })?;
    let value = client
        .call(peer, methods::GET_ORDER, params, timeout)
        .await
        .map_err(classify_call_error)?;

    let wire: WireOrder =
        serde_json::from_value(value).map_err(|e| PeerFailure::InvalidResponse {
            reason: format!("undecodable order: {e}"),
        })?;
    let signed = SignedOrder::try_from(wire)?;

    validate_shape(signed.order())?;
    check_answers(request, signed.order())?;
    if !verify_signed(&signed) {
        return Err(PeerFailure::SignatureInvalid);
    }
    if let Some(limit) = limit {
        limit.check(signed.order())?;
    }
    Ok(signed)
}

fn classify_call_error(err: PeerswapError) -> PeerFailure {
    match err {
        PeerswapError::CallTimeout { timeout_ms, .. } => PeerFailure::Timeout { timeout_ms },
        PeerswapError::Remote { message, .. } => PeerFailure::Declined { reason: message },
        PeerswapError::ConnectionLost | PeerswapError::NotConnected => PeerFailure::ConnectionLost,
        other => PeerFailure::InvalidResponse {
            reason: other.to_string(),
        },
    }
}

/// The order must be for the pair, taker and fixed amount that were asked for.
fn check_answers(request: &OrderRequest, order: &Order) -> std::result::Result<(), ValidationError> {
    let mismatch = |reason: String| Err(ValidationError::RequestMismatch { reason });
    if order.maker_token != request.maker_token || order.taker_token != request.taker_token {
        return mismatch(format!(
            "pair {}/{} was not requested",
            order.maker_token, order.taker_token
        ));
    }
    if order.taker_address != request.taker_address {
        return mismatch(format!("takerAddress {} is not the requester", order.taker_address));
    }
    match request.amount {
        FixedAmount::Maker(amount) if order.maker_amount != amount => mismatch(format!(
            "makerAmount {} differs from requested {amount}",
            order.maker_amount
        )),
        FixedAmount::Taker(amount) if order.taker_amount != amount => mismatch(format!(
            "takerAmount {} differs from requested {amount}",
            order.taker_amount
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use peerswap_types::U256;

    use super::*;

    fn request() -> OrderRequest {
        OrderRequest::for_maker_amount(
            Address::repeat_byte(0xda),
            Address::ZERO,
            Address::repeat_byte(0x22),
            U256::from(500u64),
        )
    }

    fn answer() -> Order {
        Order::dummy(Address::repeat_byte(0x11), Address::repeat_byte(0x22), 1_700_000_000)
    }

    #[test]
    fn matching_answer_passes() {
        assert!(check_answers(&request(), &answer()).is_ok());
    }

    #[test]
    fn wrong_pair_taker_or_amount_is_mismatch() {
        let mut o = answer();
        o.maker_token = Address::repeat_byte(0xee);
        assert!(matches!(
            check_answers(&request(), &o),
            Err(ValidationError::RequestMismatch { .. })
        ));

        let mut o = answer();
        o.taker_address = Address::repeat_byte(0x33);
        assert!(check_answers(&request(), &o).is_err());

        let mut o = answer();
        o.maker_amount = U256::from(499u64);
        assert!(check_answers(&request(), &o).is_err());
    }

    #[test]
    fn taker_fixed_amount_is_checked_on_taker_side() {
        let req = OrderRequest::for_taker_amount(
            Address::repeat_byte(0xda),
            Address::ZERO,
            Address::repeat_byte(0x22),
            U256::from(1_000_000u64),
        );
        let mut o = answer();
        o.maker_amount = U256::from(7u64);
        assert!(check_answers(&req, &o).is_ok());
        o.taker_amount = U256::from(1u64);
        assert!(check_answers(&req, &o).is_err());
    }

    #[test]
    fn call_errors_classify() {
        assert_eq!(
            classify_call_error(PeerswapError::CallTimeout {
                method: "getOrder".into(),
                timeout_ms: 12
            }),
            PeerFailure::Timeout { timeout_ms: 12 }
        );
        assert_eq!(
            classify_call_error(PeerswapError::Remote {
                code: -33601,
                message: "no".into()
            }),
            PeerFailure::Declined {
                reason: "no".into()
            }
        );
        assert_eq!(
            classify_call_error(PeerswapError::ConnectionLost),
            PeerFailure::ConnectionLost
        );
    }
}
