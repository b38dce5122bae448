//! Typed Dispatcher
//!
//! Routes decoded push envelopes to the handlers registered for their topic.
//! Per-message failures never propagate: a payload that fails to narrow, or
//! a discriminator no route claims, is logged and dropped so unaffected
//! streams keep flowing.

use std::sync::Arc;

use crate::domain::event::{DispatchOutcome, PushEnvelope};
use crate::domain::subscription::SubscriptionRegistry;

/// Resolves subscriptions for inbound envelopes and drives their dispatch
/// tables.
///
/// Invoked from the transport's message pump; the dispatcher owns no threads
/// and never suspends. Handlers for distinct subscriptions may run
/// concurrently when the pump delivers frames concurrently; each
/// subscription's delivery gate serializes its own events.
#[derive(Debug, Clone)]
pub struct TypedDispatcher {
    registry: Arc<SubscriptionRegistry>,
}

impl TypedDispatcher {
    /// Create a dispatcher over a registry.
    #[must_use]
    pub const fn new(registry: Arc<SubscriptionRegistry>) -> Self {
        Self { registry }
    }

    /// Dispatch one envelope to every matching subscription, in resolution
    /// order (most-specific symbol match first, then registration order).
    ///
    /// Envelopes matching no active subscription are dropped without error.
    pub fn dispatch(&self, envelope: &PushEnvelope) {
        let subscriptions = self.registry.resolve(&envelope.topic);
        if subscriptions.is_empty() {
            tracing::trace!(topic = %envelope.topic, "no active subscription for envelope");
            return;
        }

        for subscription in subscriptions {
            match subscription.deliver(envelope) {
                Some(DispatchOutcome::Delivered) => {}
                Some(DispatchOutcome::Skipped) => {
                    tracing::trace!(
                        topic = %envelope.topic,
                        subscription_id = %subscription.id(),
                        "benign empty payload skipped"
                    );
                }
                Some(DispatchOutcome::DecodeFailed(reason)) => {
                    tracing::debug!(
                        topic = %envelope.topic,
                        subscription_id = %subscription.id(),
                        %reason,
                        "payload failed to deserialize; message dropped"
                    );
                }
                None => {
                    tracing::warn!(
                        topic = %envelope.topic,
                        subject = envelope.subject.as_deref().unwrap_or(""),
                        subscription_id = %subscription.id(),
                        "no handler for subject; message dropped"
                    );
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::domain::event::DispatchTable;
    use crate::domain::topic::Topic;

    fn counting_table(counter: &Arc<AtomicUsize>) -> DispatchTable {
        let counter = Arc::clone(counter);
        DispatchTable::single::<serde_json::Value, _>(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn envelope_reaches_only_matching_subscription() {
        let registry = Arc::new(SubscriptionRegistry::new(false));
        let dispatcher = TypedDispatcher::new(Arc::clone(&registry));

        let ticker_count = Arc::new(AtomicUsize::new(0));
        let match_count = Arc::new(AtomicUsize::new(0));

        registry
            .register(
                Topic::with_symbol("/market/ticker", "BTC-USDT"),
                false,
                counting_table(&ticker_count),
            )
            .unwrap();
        registry
            .register(
                Topic::with_symbol("/market/match", "BTC-USDT"),
                false,
                counting_table(&match_count),
            )
            .unwrap();

        dispatcher.dispatch(&PushEnvelope::new(
            "/market/ticker:BTC-USDT",
            Some("trade.ticker".to_owned()),
            json!({"price": "1"}),
        ));

        assert_eq!(ticker_count.load(Ordering::SeqCst), 1);
        assert_eq!(match_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unmatched_envelope_is_dropped_silently() {
        let registry = Arc::new(SubscriptionRegistry::new(false));
        let dispatcher = TypedDispatcher::new(Arc::clone(&registry));

        let count = Arc::new(AtomicUsize::new(0));
        registry
            .register(
                Topic::with_symbol("/market/ticker", "BTC-USDT"),
                false,
                counting_table(&count),
            )
            .unwrap();

        dispatcher.dispatch(&PushEnvelope::new(
            "/market/ticker:ETH-USDT",
            None,
            json!({}),
        ));

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn decode_failure_does_not_disturb_other_subscriptions() {
        let registry = Arc::new(SubscriptionRegistry::new(false));
        let dispatcher = TypedDispatcher::new(Arc::clone(&registry));

        #[derive(Debug, serde::Deserialize)]
        struct Strict {
            #[allow(dead_code)]
            sequence: u64,
        }

        let strict_count = Arc::new(AtomicUsize::new(0));
        let loose_count = Arc::new(AtomicUsize::new(0));

        let strict = Arc::clone(&strict_count);
        registry
            .register(
                Topic::with_symbol("/market/ticker", "BTC-USDT"),
                false,
                DispatchTable::single::<Strict, _>(move |_| {
                    strict.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();
        registry
            .register(
                Topic::with_symbol("/market/match", "BTC-USDT"),
                false,
                counting_table(&loose_count),
            )
            .unwrap();

        // Poison payload for the strict subscription.
        dispatcher.dispatch(&PushEnvelope::new(
            "/market/ticker:BTC-USDT",
            None,
            json!({"sequence": "not a number"}),
        ));
        // The unrelated stream keeps flowing.
        dispatcher.dispatch(&PushEnvelope::new(
            "/market/match:BTC-USDT",
            None,
            json!({"any": true}),
        ));

        assert_eq!(strict_count.load(Ordering::SeqCst), 0);
        assert_eq!(loose_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn all_symbol_subscription_sees_every_symbol() {
        let registry = Arc::new(SubscriptionRegistry::new(true));
        let dispatcher = TypedDispatcher::new(Arc::clone(&registry));

        let count = Arc::new(AtomicUsize::new(0));
        registry
            .register(
                Topic::channel("/contractMarket/tradeOrders"),
                true,
                counting_table(&count),
            )
            .unwrap();

        dispatcher.dispatch(&PushEnvelope::new(
            "/contractMarket/tradeOrders:XBTUSDM",
            Some("orderChange".to_owned()),
            json!({"symbol": "XBTUSDM"}),
        ));
        dispatcher.dispatch(&PushEnvelope::new(
            "/contractMarket/tradeOrders:ETHUSDM",
            Some("orderChange".to_owned()),
            json!({"symbol": "ETHUSDM"}),
        ));

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
