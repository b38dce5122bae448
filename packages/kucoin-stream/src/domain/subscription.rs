//! Subscription Registry
//!
//! The registry is the single piece of mutable shared state in the SDK. It
//! owns every active subscription, allocates correlation ids for outbound
//! subscribe/unsubscribe requests, and enforces the authentication flag
//! before any request is built.
//!
//! Mutation is returned to the caller as wire requests to send, rather than
//! performed inline: registering yields the subscribe request, unregistering
//! yields the unsubscribe request. The transport round-trip (and its
//! cancellation handling) belongs to the client layer.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use serde::{Serialize, Serializer};

use super::event::{DispatchOutcome, DispatchTable, PushEnvelope};
use super::topic::Topic;

// =============================================================================
// Identifiers
// =============================================================================

/// Opaque identifier for a registered subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Wire Requests
// =============================================================================

/// Request action literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestAction {
    /// Open a stream.
    Subscribe,
    /// Close a stream.
    Unsubscribe,
}

/// Outbound subscribe/unsubscribe request.
///
/// # Wire Format (JSON)
/// ```json
/// {
///   "id": "3",
///   "type": "subscribe",
///   "topic": "/contractMarket/level2Depth20:XBTUSDM",
///   "privateChannel": false,
///   "response": true
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscribeRequest {
    /// Correlation id; the server echoes it in the matching ack/error frame.
    /// Sent as a string on the wire.
    #[serde(serialize_with = "id_as_string")]
    pub id: u64,

    /// Request action.
    #[serde(rename = "type")]
    pub action: RequestAction,

    /// Composed wire topic.
    pub topic: String,

    /// Whether the stream requires signed/private access.
    #[serde(rename = "privateChannel")]
    pub private_channel: bool,

    /// Always `true`: the server must acknowledge the request.
    pub response: bool,
}

impl SubscribeRequest {
    fn new(id: u64, action: RequestAction, topic: &Topic, private_channel: bool) -> Self {
        Self {
            id,
            action,
            topic: topic.to_wire(),
            private_channel,
            response: true,
        }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn id_as_string<S: Serializer>(id: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&id.to_string())
}

// =============================================================================
// Errors
// =============================================================================

/// Registration-time failures, surfaced synchronously before any I/O.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    /// The stream requires signed access but no credentials were configured
    /// at client construction.
    #[error("subscription to {topic} requires API credentials, but none were configured")]
    AuthenticationRequired {
        /// Topic the registration was for.
        topic: String,
    },
}

// =============================================================================
// Subscription
// =============================================================================

/// One active subscription: topic, auth flag, and its dispatch table.
///
/// Owned exclusively by the registry for its lifetime; handed out as `Arc`
/// so in-flight dispatches complete normally after unregistration.
pub struct Subscription {
    id: SubscriptionId,
    topic: Topic,
    requires_auth: bool,
    table: DispatchTable,
    // Serializes dispatch per subscription: envelope N's handler set
    // completes before N+1 begins for the same subscription. Distinct
    // subscriptions are not mutually excluded.
    delivery_gate: Mutex<()>,
}

impl Subscription {
    /// The registry-assigned id.
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// The subscribed topic.
    #[must_use]
    pub const fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Whether the stream requires signed/private access.
    #[must_use]
    pub const fn requires_auth(&self) -> bool {
        self.requires_auth
    }

    /// Offer an envelope to this subscription's dispatch table.
    ///
    /// Returns `None` when no route accepts the envelope's subject.
    pub(crate) fn deliver(&self, envelope: &PushEnvelope) -> Option<DispatchOutcome> {
        let _ordered = self.delivery_gate.lock();
        self.table.dispatch(envelope, self.topic.symbol())
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .field("requires_auth", &self.requires_auth)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Subscription Registry
// =============================================================================

/// Thread-safe registry of active subscriptions.
///
/// Correlation ids are monotonically increasing per registry instance and
/// never reused while the client is alive. Concurrent registrations never
/// double-allocate an id.
pub struct SubscriptionRegistry {
    has_credentials: bool,
    next_correlation_id: AtomicU64,
    next_subscription_id: AtomicU64,
    active: RwLock<BTreeMap<u64, Arc<Subscription>>>,
}

impl SubscriptionRegistry {
    /// Create a registry.
    ///
    /// `has_credentials` reflects whether API credentials were configured at
    /// client construction; it gates registration of private streams.
    #[must_use]
    pub fn new(has_credentials: bool) -> Self {
        Self {
            has_credentials,
            next_correlation_id: AtomicU64::new(1),
            next_subscription_id: AtomicU64::new(1),
            active: RwLock::new(BTreeMap::new()),
        }
    }

    /// Register a subscription and build its subscribe request.
    ///
    /// The subscription is live (resolvable) as soon as this returns, so
    /// pushes that race the acknowledgement are delivered. The caller sends
    /// the returned request and rolls back with [`Self::remove`] if the
    /// round-trip fails.
    ///
    /// # Errors
    ///
    /// `AuthenticationRequired` when `requires_auth` is set and the client
    /// was built without credentials. No request is built in that case.
    pub fn register(
        &self,
        topic: Topic,
        requires_auth: bool,
        table: DispatchTable,
    ) -> Result<(SubscriptionId, SubscribeRequest), RegistryError> {
        if requires_auth && !self.has_credentials {
            return Err(RegistryError::AuthenticationRequired {
                topic: topic.to_wire(),
            });
        }

        let id = SubscriptionId(self.next_subscription_id.fetch_add(1, Ordering::Relaxed));
        let request = SubscribeRequest::new(
            self.next_correlation_id(),
            RequestAction::Subscribe,
            &topic,
            requires_auth,
        );

        let subscription = Arc::new(Subscription {
            id,
            topic,
            requires_auth,
            table,
            delivery_gate: Mutex::new(()),
        });

        self.active.write().insert(id.0, subscription);
        tracing::debug!(subscription_id = %id, topic = %request.topic, "subscription registered");

        Ok((id, request))
    }

    /// Resolve all active subscriptions matching a wire topic, most-specific
    /// symbol match first. Empty when nothing matches.
    #[must_use]
    pub fn resolve(&self, wire_topic: &str) -> Vec<Arc<Subscription>> {
        let incoming = Topic::parse(wire_topic);
        let mut matches: Vec<_> = self
            .active
            .read()
            .values()
            .filter(|sub| sub.topic.matches(&incoming))
            .cloned()
            .collect();
        // Stable: registration order is preserved within a specificity class.
        matches.sort_by(|a, b| b.topic.specificity().cmp(&a.topic.specificity()));
        matches
    }

    /// Remove a subscription and build its unsubscribe request.
    ///
    /// In-flight dispatches already handed to a handler complete normally.
    /// Returns `None` for ids that are not (or no longer) registered.
    #[must_use]
    pub fn unregister(&self, id: SubscriptionId) -> Option<SubscribeRequest> {
        let subscription = self.remove(id)?;
        Some(SubscribeRequest::new(
            self.next_correlation_id(),
            RequestAction::Unsubscribe,
            &subscription.topic,
            subscription.requires_auth,
        ))
    }

    /// Remove a subscription without building a request (registration
    /// rollback).
    pub(crate) fn remove(&self, id: SubscriptionId) -> Option<Arc<Subscription>> {
        let removed = self.active.write().remove(&id.0);
        if removed.is_some() {
            tracing::debug!(subscription_id = %id, "subscription removed");
        }
        removed
    }

    /// Fresh subscribe requests for every active subscription, in
    /// registration order. Used to re-issue subscriptions after a reconnect.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SubscribeRequest> {
        self.active
            .read()
            .values()
            .map(|sub| {
                SubscribeRequest::new(
                    self.next_correlation_id(),
                    RequestAction::Subscribe,
                    &sub.topic,
                    sub.requires_auth,
                )
            })
            .collect()
    }

    /// Number of active subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.read().len()
    }

    /// Whether no subscriptions are active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.read().is_empty()
    }

    fn next_correlation_id(&self) -> u64 {
        self.next_correlation_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("has_credentials", &self.has_credentials)
            .field("active", &self.active.read().len())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn empty_table() -> DispatchTable {
        DispatchTable::single::<serde_json::Value, _>(|_| {})
    }

    #[test]
    fn register_builds_subscribe_request() {
        let registry = SubscriptionRegistry::new(false);

        let (_, request) = registry
            .register(
                Topic::with_symbol("/contractMarket/execution", "XBTUSDM"),
                false,
                empty_table(),
            )
            .unwrap();

        assert_eq!(request.action, RequestAction::Subscribe);
        assert_eq!(request.topic, "/contractMarket/execution:XBTUSDM");
        assert!(!request.private_channel);
        assert!(request.response);
    }

    #[test]
    fn wire_request_serializes_id_as_string() {
        let registry = SubscriptionRegistry::new(false);
        let (_, request) = registry
            .register(Topic::channel("/contract/announcement"), false, empty_table())
            .unwrap();

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "1",
                "type": "subscribe",
                "topic": "/contract/announcement",
                "privateChannel": false,
                "response": true,
            })
        );
    }

    #[test]
    fn private_stream_without_credentials_rejected() {
        let registry = SubscriptionRegistry::new(false);

        let result = registry.register(
            Topic::channel("/contractAccount/wallet"),
            true,
            empty_table(),
        );

        assert!(matches!(
            result,
            Err(RegistryError::AuthenticationRequired { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn private_stream_with_credentials_accepted() {
        let registry = SubscriptionRegistry::new(true);

        let (_, request) = registry
            .register(
                Topic::channel("/contractAccount/wallet"),
                true,
                empty_table(),
            )
            .unwrap();

        assert!(request.private_channel);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn correlation_ids_are_monotonic() {
        let registry = SubscriptionRegistry::new(false);

        let (_, first) = registry
            .register(Topic::channel("/a"), false, empty_table())
            .unwrap();
        let (_, second) = registry
            .register(Topic::channel("/b"), false, empty_table())
            .unwrap();

        assert!(second.id > first.id);
    }

    #[test]
    fn concurrent_registrations_get_distinct_ids() {
        use std::collections::HashSet;
        use std::thread;

        let registry = Arc::new(SubscriptionRegistry::new(false));
        let mut handles = vec![];

        for i in 0..16 {
            let r = Arc::clone(&registry);
            handles.push(thread::spawn(move || {
                let (_, request) = r
                    .register(
                        Topic::with_symbol("/contractMarket/execution", format!("SYM{i}")),
                        false,
                        DispatchTable::single::<serde_json::Value, _>(|_| {}),
                    )
                    .unwrap();
                request.id
            }));
        }

        let ids: HashSet<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(ids.len(), 16);
        assert_eq!(registry.len(), 16);
    }

    #[test]
    fn resolve_orders_exact_symbol_first() {
        let registry = SubscriptionRegistry::new(true);

        let (all_id, _) = registry
            .register(Topic::channel("/contractMarket/tradeOrders"), true, empty_table())
            .unwrap();
        let (exact_id, _) = registry
            .register(
                Topic::with_symbol("/contractMarket/tradeOrders", "XBTUSDM"),
                true,
                empty_table(),
            )
            .unwrap();

        let resolved = registry.resolve("/contractMarket/tradeOrders:XBTUSDM");
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].id(), exact_id);
        assert_eq!(resolved[1].id(), all_id);
    }

    #[test]
    fn resolve_unmatched_topic_is_empty() {
        let registry = SubscriptionRegistry::new(false);
        let _ = registry
            .register(
                Topic::with_symbol("/market/ticker", "BTC-USDT"),
                false,
                empty_table(),
            )
            .unwrap();

        assert!(registry.resolve("/market/ticker:ETH-USDT").is_empty());
        assert!(registry.resolve("/market/match:BTC-USDT").is_empty());
    }

    #[test]
    fn unregister_builds_unsubscribe_with_fresh_id() {
        let registry = SubscriptionRegistry::new(false);
        let (id, subscribe) = registry
            .register(
                Topic::with_symbol("/market/ticker", "BTC-USDT"),
                false,
                empty_table(),
            )
            .unwrap();

        let unsubscribe = registry.unregister(id).unwrap();
        assert_eq!(unsubscribe.action, RequestAction::Unsubscribe);
        assert_eq!(unsubscribe.topic, "/market/ticker:BTC-USDT");
        assert!(unsubscribe.id > subscribe.id);
        assert!(registry.is_empty());

        // Second unregister is a no-op.
        assert!(registry.unregister(id).is_none());
    }

    #[test]
    fn snapshot_reissues_all_active() {
        let registry = SubscriptionRegistry::new(true);
        let _ = registry
            .register(
                Topic::with_symbol("/contractMarket/execution", "XBTUSDM"),
                false,
                empty_table(),
            )
            .unwrap();
        let _ = registry
            .register(Topic::channel("/contractAccount/wallet"), true, empty_table())
            .unwrap();

        let requests = registry.snapshot();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.action == RequestAction::Subscribe));
        assert_eq!(requests[0].topic, "/contractMarket/execution:XBTUSDM");
        assert_eq!(requests[1].topic, "/contractAccount/wallet");
        assert!(requests[1].private_channel);
        // Fresh correlation ids, still monotonic.
        assert!(requests[0].id < requests[1].id);
    }
}
