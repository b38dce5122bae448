//! Stream Client
//!
//! Wires the subscription registry, typed dispatcher, and the external
//! transport together. The client owns no connection: the transport
//! collaborator pumps inbound frames into [`KucoinStreamClient::handle_frame`]
//! and reports connection-state changes through
//! [`KucoinStreamClient::handle_connection_event`].
//!
//! # Data Flow
//!
//! ```text
//! caller ──► SpotStreams/FuturesStreams ──► SubscriptionRegistry
//!                                              │ subscribe request
//!                                              ▼
//!                                     StreamTransport (external)
//!                                              │ inbound frames
//!                                              ▼
//! handler ◄── TypedDispatcher ◄── handle_frame (ack/error/push)
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{ConnectionEvent, StreamTransport, TransportError};
use crate::application::services::dispatcher::TypedDispatcher;
use crate::application::services::{FuturesStreams, SpotStreams};
use crate::domain::event::DispatchTable;
use crate::domain::subscription::{
    RegistryError, SubscriptionId, SubscriptionRegistry,
};
use crate::domain::topic::Topic;
use crate::infrastructure::config::ClientOptions;
use crate::infrastructure::kucoin::envelope::{InboundFrame, decode_frame};

// =============================================================================
// Errors
// =============================================================================

/// Failures surfaced synchronously from subscribe/unsubscribe calls.
#[derive(Debug, thiserror::Error)]
pub enum SubscribeError {
    /// A facade parameter was rejected before any network interaction.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The stream requires credentials, and none were configured.
    #[error("subscription requires API credentials, but none were configured")]
    AuthenticationRequired,

    /// The server rejected the request.
    #[error("subscription rejected by server (code {code}): {message}")]
    SubscriptionFailed {
        /// Numeric error code from the server.
        code: i64,
        /// Error message from the server.
        message: String,
    },

    /// The transport could not deliver the request.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server did not acknowledge the request in time.
    #[error("timed out waiting for request acknowledgement")]
    AckTimeout,

    /// The operation was cancelled before acknowledgement.
    #[error("request cancelled before acknowledgement")]
    Cancelled,
}

impl From<RegistryError> for SubscribeError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::AuthenticationRequired { .. } => Self::AuthenticationRequired,
        }
    }
}

// =============================================================================
// Client Core
// =============================================================================

/// A request rejection echoed by the server.
#[derive(Debug)]
struct ServerRejection {
    code: i64,
    message: String,
}

type AckSender = oneshot::Sender<Result<(), ServerRejection>>;

/// Shared client state: registry, dispatcher, transport, and the pending
/// acknowledgement waiters keyed by correlation id.
pub(crate) struct ClientCore {
    registry: Arc<SubscriptionRegistry>,
    dispatcher: TypedDispatcher,
    transport: Arc<dyn StreamTransport>,
    waiters: Mutex<HashMap<u64, AckSender>>,
    options: ClientOptions,
}

impl ClientCore {
    fn new(transport: Arc<dyn StreamTransport>, options: ClientOptions) -> Self {
        let registry = Arc::new(SubscriptionRegistry::new(options.credentials.is_some()));
        Self {
            dispatcher: TypedDispatcher::new(Arc::clone(&registry)),
            registry,
            transport,
            waiters: Mutex::new(HashMap::new()),
            options,
        }
    }

    /// Register, send the subscribe request, and await the acknowledgement.
    ///
    /// The subscription is resolvable as soon as it is registered, so pushes
    /// racing the acknowledgement are not lost. Any failure (transport,
    /// rejection, timeout, cancellation) rolls the registration back fully.
    pub(crate) async fn subscribe(
        self: Arc<Self>,
        topic: Topic,
        requires_auth: bool,
        table: DispatchTable,
        cancel: CancellationToken,
    ) -> Result<SubscriptionHandle, SubscribeError> {
        let (id, request) = self.registry.register(topic.clone(), requires_auth, table)?;
        let correlation_id = request.id;
        let ack = self.track_waiter(correlation_id);

        if let Err(e) = self.transport.send(request).await {
            self.roll_back(id, correlation_id);
            return Err(e.into());
        }

        match self.await_ack(ack, &cancel).await {
            Ok(()) => {
                tracing::info!(subscription_id = %id, %topic, "subscription acknowledged");
                Ok(SubscriptionHandle {
                    id,
                    topic,
                    core: self,
                })
            }
            Err(e) => {
                self.roll_back(id, correlation_id);
                Err(e)
            }
        }
    }

    /// Remove the subscription and confirm the removal with the server.
    ///
    /// Dispatch to the handler stops as soon as the registry entry is gone;
    /// the round-trip only confirms server-side teardown.
    async fn unsubscribe(
        &self,
        id: SubscriptionId,
        cancel: CancellationToken,
    ) -> Result<(), SubscribeError> {
        let Some(request) = self.registry.unregister(id) else {
            return Ok(());
        };
        let correlation_id = request.id;
        let ack = self.track_waiter(correlation_id);

        if let Err(e) = self.transport.send(request).await {
            self.forget_waiter(correlation_id);
            return Err(e.into());
        }

        let result = self.await_ack(ack, &cancel).await;
        if result.is_err() {
            self.forget_waiter(correlation_id);
        }
        result
    }

    /// Process one inbound frame from the transport's message pump.
    ///
    /// Never suspends and never fails: malformed frames are logged and
    /// dropped so one poison frame cannot disturb the pump.
    pub(crate) fn handle_frame(&self, raw: &str) {
        match decode_frame(raw) {
            Ok(InboundFrame::Push(envelope)) => self.dispatcher.dispatch(&envelope),
            Ok(InboundFrame::Ack { correlation_id }) => {
                if let Some(waiter) = self.forget_waiter(correlation_id) {
                    let _ = waiter.send(Ok(()));
                } else {
                    // Expected for subscriptions re-issued after a reconnect.
                    tracing::trace!(correlation_id, "acknowledgement for untracked request");
                }
            }
            Ok(InboundFrame::Error {
                correlation_id,
                code,
                message,
            }) => {
                let waiter = correlation_id.and_then(|id| self.forget_waiter(id));
                if let Some(waiter) = waiter {
                    let _ = waiter.send(Err(ServerRejection { code, message }));
                } else {
                    tracing::warn!(code, %message, "server error frame");
                }
            }
            Ok(InboundFrame::Welcome { connect_id }) => {
                tracing::debug!(
                    connect_id = connect_id.as_deref().unwrap_or(""),
                    "connection welcomed"
                );
            }
            Ok(InboundFrame::Pong) => tracing::trace!("heartbeat pong"),
            Ok(InboundFrame::Other(frame_type)) => {
                tracing::trace!(%frame_type, "ignoring unknown frame type");
            }
            Err(e) => tracing::debug!(error = %e, "dropping malformed frame"),
        }
    }

    /// React to a connection-state change from the transport.
    pub(crate) async fn handle_connection_event(&self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Connected => tracing::info!("transport connected"),
            ConnectionEvent::Disconnected => tracing::warn!("transport disconnected"),
            ConnectionEvent::Reconnected => {
                let requests = self.registry.snapshot();
                tracing::info!(
                    count = requests.len(),
                    "re-issuing subscriptions after reconnect"
                );
                for request in requests {
                    let topic = request.topic.clone();
                    if let Err(e) = self.transport.send(request).await {
                        tracing::warn!(%topic, error = %e, "failed to re-issue subscription");
                    }
                }
            }
        }
    }

    async fn await_ack(
        &self,
        ack: oneshot::Receiver<Result<(), ServerRejection>>,
        cancel: &CancellationToken,
    ) -> Result<(), SubscribeError> {
        let outcome = tokio::select! {
            () = cancel.cancelled() => return Err(SubscribeError::Cancelled),
            outcome = tokio::time::timeout(self.options.ack_timeout, ack) => outcome,
        };

        match outcome {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(rejection))) => Err(SubscribeError::SubscriptionFailed {
                code: rejection.code,
                message: rejection.message,
            }),
            Ok(Err(_closed)) => Err(SubscribeError::SubscriptionFailed {
                code: 0,
                message: "acknowledgement channel closed".to_owned(),
            }),
            Err(_elapsed) => Err(SubscribeError::AckTimeout),
        }
    }

    fn track_waiter(&self, correlation_id: u64) -> oneshot::Receiver<Result<(), ServerRejection>> {
        let (tx, rx) = oneshot::channel();
        self.waiters.lock().insert(correlation_id, tx);
        rx
    }

    fn forget_waiter(&self, correlation_id: u64) -> Option<AckSender> {
        self.waiters.lock().remove(&correlation_id)
    }

    fn roll_back(&self, id: SubscriptionId, correlation_id: u64) {
        let _ = self.registry.remove(id);
        self.forget_waiter(correlation_id);
        tracing::debug!(subscription_id = %id, "subscription rolled back");
    }
}

// =============================================================================
// Subscription Handle
// =============================================================================

/// Handle to a live subscription, usable to tear it down.
pub struct SubscriptionHandle {
    id: SubscriptionId,
    topic: Topic,
    core: Arc<ClientCore>,
}

impl SubscriptionHandle {
    /// The registry-assigned subscription id.
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// The subscribed topic.
    #[must_use]
    pub const fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Unsubscribe from the stream.
    ///
    /// Dispatch to this subscription's handlers stops immediately; the call
    /// then suspends until the server confirms the teardown. Other
    /// subscriptions are unaffected.
    ///
    /// # Errors
    ///
    /// Returns a [`SubscribeError`] when the unsubscribe round-trip fails;
    /// the local subscription is removed regardless.
    pub async fn unsubscribe(self, cancel: CancellationToken) -> Result<(), SubscribeError> {
        self.core.unsubscribe(self.id, cancel).await
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Client
// =============================================================================

/// Typed subscription client for KuCoin push streams.
///
/// # Example
///
/// ```ignore
/// let client = KucoinStreamClient::new(transport, ClientOptions::default());
///
/// let handle = client
///     .futures()
///     .subscribe_to_trades("XBTUSDM", |event| {
///         println!("{} @ {}", event.data.size, event.data.price);
///     }, CancellationToken::new())
///     .await?;
/// ```
#[derive(Clone)]
pub struct KucoinStreamClient {
    core: Arc<ClientCore>,
}

impl KucoinStreamClient {
    /// Create a client over an external transport.
    #[must_use]
    pub fn new(transport: Arc<dyn StreamTransport>, options: ClientOptions) -> Self {
        Self {
            core: Arc::new(ClientCore::new(transport, options)),
        }
    }

    /// Spot market subscriptions.
    #[must_use]
    pub fn spot(&self) -> SpotStreams {
        SpotStreams::new(Arc::clone(&self.core))
    }

    /// Futures market subscriptions.
    #[must_use]
    pub fn futures(&self) -> FuturesStreams {
        FuturesStreams::new(Arc::clone(&self.core))
    }

    /// Feed one raw inbound frame from the transport's message pump.
    pub fn handle_frame(&self, raw: &str) {
        self.core.handle_frame(raw);
    }

    /// Feed a connection-state notification from the transport. On
    /// `Reconnected`, every active subscription's subscribe request is
    /// re-issued.
    pub async fn handle_connection_event(&self, event: ConnectionEvent) {
        self.core.handle_connection_event(event).await;
    }

    /// Number of active subscriptions.
    #[must_use]
    pub fn active_subscriptions(&self) -> usize {
        self.core.registry.len()
    }
}

impl std::fmt::Debug for KucoinStreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KucoinStreamClient")
            .field("active_subscriptions", &self.core.registry.len())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::application::ports::MockStreamTransport;
    use crate::domain::subscription::SubscribeRequest;

    fn client_with(
        transport: MockStreamTransport,
        options: ClientOptions,
    ) -> KucoinStreamClient {
        KucoinStreamClient::new(Arc::new(transport), options)
    }

    fn short_timeout() -> ClientOptions {
        ClientOptions {
            ack_timeout: Duration::from_millis(50),
            ..ClientOptions::default()
        }
    }

    fn table() -> DispatchTable {
        DispatchTable::single::<serde_json::Value, _>(|_| {})
    }

    #[tokio::test]
    async fn subscribe_completes_on_ack() {
        let mut transport = MockStreamTransport::new();
        transport.expect_send().times(1).returning(|_| Ok(()));
        let client = client_with(transport, short_timeout());

        let acker = client.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            acker.handle_frame(r#"{"id":"1","type":"ack"}"#);
        });

        let handle = Arc::clone(&client.core)
            .subscribe(
                Topic::with_symbol("/market/ticker", "BTC-USDT"),
                false,
                table(),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(handle.topic().to_wire(), "/market/ticker:BTC-USDT");
        assert_eq!(client.active_subscriptions(), 1);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn server_rejection_rolls_back() {
        let mut transport = MockStreamTransport::new();
        transport.expect_send().times(1).returning(|_| Ok(()));
        let client = client_with(transport, short_timeout());

        let acker = client.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            acker.handle_frame(r#"{"id":"1","type":"error","code":404,"data":"topic not found"}"#);
        });

        let result = Arc::clone(&client.core)
            .subscribe(
                Topic::channel("/bad/topic"),
                false,
                table(),
                CancellationToken::new(),
            )
            .await;

        assert!(matches!(
            result,
            Err(SubscribeError::SubscriptionFailed { code: 404, .. })
        ));
        assert_eq!(client.active_subscriptions(), 0);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn transport_failure_rolls_back() {
        let mut transport = MockStreamTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Err(TransportError::NotConnected));
        let client = client_with(transport, short_timeout());

        let result = Arc::clone(&client.core)
            .subscribe(
                Topic::with_symbol("/market/ticker", "BTC-USDT"),
                false,
                table(),
                CancellationToken::new(),
            )
            .await;

        assert!(matches!(result, Err(SubscribeError::Transport(_))));
        assert_eq!(client.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn missing_ack_times_out_and_rolls_back() {
        let mut transport = MockStreamTransport::new();
        transport.expect_send().times(1).returning(|_| Ok(()));
        let client = client_with(transport, short_timeout());

        let result = Arc::clone(&client.core)
            .subscribe(
                Topic::with_symbol("/market/ticker", "BTC-USDT"),
                false,
                table(),
                CancellationToken::new(),
            )
            .await;

        assert!(matches!(result, Err(SubscribeError::AckTimeout)));
        assert_eq!(client.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn cancellation_rolls_back_pending_subscribe() {
        let mut transport = MockStreamTransport::new();
        transport.expect_send().times(1).returning(|_| Ok(()));
        let client = client_with(
            transport,
            ClientOptions {
                ack_timeout: Duration::from_secs(30),
                ..ClientOptions::default()
            },
        );

        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            canceller.cancel();
        });

        let result = Arc::clone(&client.core)
            .subscribe(
                Topic::with_symbol("/market/ticker", "BTC-USDT"),
                false,
                table(),
                cancel,
            )
            .await;

        assert!(matches!(result, Err(SubscribeError::Cancelled)));
        assert_eq!(client.active_subscriptions(), 0);
        assert!(client.core.waiters.lock().is_empty());
        task.await.unwrap();
    }

    #[tokio::test]
    async fn reconnect_reissues_active_subscriptions() {
        let sent: Arc<Mutex<Vec<SubscribeRequest>>> = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&sent);

        let mut transport = MockStreamTransport::new();
        transport.expect_send().returning(move |request| {
            recorded.lock().push(request);
            Ok(())
        });
        let client = client_with(transport, short_timeout());

        let acker = client.clone();
        let task = tokio::spawn(async move {
            for id in 1..=2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
                acker.handle_frame(&format!(r#"{{"id":"{id}","type":"ack"}}"#));
            }
        });

        let _first = Arc::clone(&client.core)
            .subscribe(
                Topic::with_symbol("/market/ticker", "BTC-USDT"),
                false,
                table(),
                CancellationToken::new(),
            )
            .await
            .unwrap();
        let _second = Arc::clone(&client.core)
            .subscribe(
                Topic::with_symbol("/market/match", "BTC-USDT"),
                false,
                table(),
                CancellationToken::new(),
            )
            .await
            .unwrap();
        task.await.unwrap();

        client
            .handle_connection_event(ConnectionEvent::Reconnected)
            .await;

        let requests = sent.lock();
        assert_eq!(requests.len(), 4);
        let reissued: Vec<&str> = requests[2..].iter().map(|r| r.topic.as_str()).collect();
        assert_eq!(
            reissued,
            vec!["/market/ticker:BTC-USDT", "/market/match:BTC-USDT"]
        );
        // Correlation ids are never reused.
        assert!(requests[2].id > requests[1].id);
    }

    #[tokio::test]
    async fn malformed_frame_is_swallowed() {
        let transport = MockStreamTransport::new();
        let client = client_with(transport, short_timeout());

        client.handle_frame("not json");
        client.handle_frame(r#"{"type":"message"}"#);
        client.handle_frame(r#"{"type":"pong"}"#);
        assert_eq!(client.active_subscriptions(), 0);
    }
}
