//! Typed Events and Dispatch Tables
//!
//! The dispatch table is the heart of the SDK: at registration time each
//! subscription binds one or more routes, keyed by the push message's
//! `subject` discriminator, to type-erased sinks. A sink deserializes the
//! opaque payload into its bound model, stamps the originating symbol and
//! receipt time, and invokes the caller's handler.
//!
//! Several KuCoin topics multiplex logically distinct event kinds over one
//! stream (e.g. `/contract/instrument` carries both mark-price and
//! funding-rate updates, distinguished by `subject`). Routes are mutually
//! exclusive: the first route whose discriminator matches fires, and a
//! fallback route (no discriminator) matches any subject.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

// =============================================================================
// Push Envelope
// =============================================================================

/// A decoded inbound push message, prior to typed deserialization.
///
/// Envelopes live for a single dispatch call and are never persisted.
#[derive(Debug, Clone)]
pub struct PushEnvelope {
    /// Raw wire topic the message arrived under.
    pub topic: String,

    /// Secondary discriminator distinguishing event kinds within one topic.
    pub subject: Option<String>,

    /// Opaque payload, deserialized lazily by the selected route.
    pub payload: serde_json::Value,

    /// When the frame was received.
    pub received_at: DateTime<Utc>,
}

impl PushEnvelope {
    /// Create an envelope stamped with the current time.
    #[must_use]
    pub fn new(topic: impl Into<String>, subject: Option<String>, payload: serde_json::Value) -> Self {
        Self {
            topic: topic.into(),
            subject,
            payload,
            received_at: Utc::now(),
        }
    }
}

// =============================================================================
// Typed Event
// =============================================================================

/// The caller-visible result of a dispatch: a typed payload tagged with its
/// origin. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct StreamEvent<T> {
    /// Wire topic the event arrived under.
    pub topic: String,

    /// The envelope's discriminator, when the topic carries one.
    pub subject: Option<String>,

    /// Originating symbol: the subscription's symbol, or extracted from the
    /// payload for symbol-agnostic streams.
    pub symbol: Option<String>,

    /// When the underlying frame was received.
    pub received_at: DateTime<Utc>,

    /// The deserialized payload.
    pub data: T,
}

// =============================================================================
// Dispatch Outcome
// =============================================================================

/// Result of offering an envelope to a route's sink.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Payload deserialized and handler invoked.
    Delivered,

    /// Benign no-op payload (e.g. an empty order-book change heartbeat);
    /// dropped without invoking the handler and without raising an error.
    Skipped,

    /// Payload did not deserialize into the bound model; dropped.
    DecodeFailed(String),
}

// =============================================================================
// Routes
// =============================================================================

/// Type-erased payload sink. Receives the envelope and the subscription's
/// symbol (if any) and performs the typed narrowing + handler invocation.
type Sink = Box<dyn Fn(&PushEnvelope, Option<&str>) -> DispatchOutcome + Send + Sync>;

/// Extracts the originating symbol from a deserialized payload, for streams
/// whose topic carries no symbol (order updates embed it in the payload).
type SymbolExtractor<T> = fn(&T) -> Option<String>;

struct Route {
    subject: Option<String>,
    sink: Sink,
}

impl Route {
    fn accepts(&self, subject: Option<&str>) -> bool {
        match &self.subject {
            Some(own) => subject == Some(own.as_str()),
            None => true,
        }
    }
}

// =============================================================================
// Dispatch Table
// =============================================================================

/// Ordered route set bound to one subscription, resolved once at
/// registration time.
pub struct DispatchTable {
    routes: Vec<Route>,
}

impl std::fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subjects: Vec<_> = self.routes.iter().map(|r| r.subject.as_deref()).collect();
        f.debug_struct("DispatchTable")
            .field("routes", &subjects)
            .finish()
    }
}

impl DispatchTable {
    /// Start building a multi-route table.
    #[must_use]
    pub fn builder() -> DispatchTableBuilder {
        DispatchTableBuilder { routes: Vec::new() }
    }

    /// Build a table with a single typed route matching any subject.
    ///
    /// This is the common case: most topics carry exactly one event kind.
    #[must_use]
    pub fn single<T, F>(handler: F) -> Self
    where
        T: DeserializeOwned + 'static,
        F: Fn(StreamEvent<T>) + Send + Sync + 'static,
    {
        Self::builder().fallback(handler).build()
    }

    /// Offer an envelope to the table.
    ///
    /// Returns `None` when no route accepts the envelope's subject (the
    /// unknown-discriminator case), otherwise the selected sink's outcome.
    /// Routes are mutually exclusive: only the first match fires.
    pub(crate) fn dispatch(
        &self,
        envelope: &PushEnvelope,
        symbol: Option<&str>,
    ) -> Option<DispatchOutcome> {
        self.routes
            .iter()
            .find(|route| route.accepts(envelope.subject.as_deref()))
            .map(|route| (route.sink)(envelope, symbol))
    }
}

/// Builder assembling a [`DispatchTable`] route by route.
pub struct DispatchTableBuilder {
    routes: Vec<Route>,
}

impl DispatchTableBuilder {
    /// Bind a typed handler to one discriminator value.
    #[must_use]
    pub fn on_subject<T, F>(self, subject: &str, handler: F) -> Self
    where
        T: DeserializeOwned + 'static,
        F: Fn(StreamEvent<T>) + Send + Sync + 'static,
    {
        self.push(Some(subject.to_owned()), typed_sink(None, handler))
    }

    /// Bind a typed handler to one discriminator value, extracting the
    /// event's symbol from the deserialized payload.
    #[must_use]
    pub fn on_subject_extracting<T, F>(
        self,
        subject: &str,
        extract_symbol: SymbolExtractor<T>,
        handler: F,
    ) -> Self
    where
        T: DeserializeOwned + 'static,
        F: Fn(StreamEvent<T>) + Send + Sync + 'static,
    {
        self.push(
            Some(subject.to_owned()),
            typed_sink(Some(extract_symbol), handler),
        )
    }

    /// Bind a typed handler matching any subject not claimed by an earlier
    /// route.
    #[must_use]
    pub fn fallback<T, F>(self, handler: F) -> Self
    where
        T: DeserializeOwned + 'static,
        F: Fn(StreamEvent<T>) + Send + Sync + 'static,
    {
        self.push(None, typed_sink(None, handler))
    }

    /// Like [`Self::fallback`], with a payload symbol extractor.
    #[must_use]
    pub fn fallback_extracting<T, F>(self, extract_symbol: SymbolExtractor<T>, handler: F) -> Self
    where
        T: DeserializeOwned + 'static,
        F: Fn(StreamEvent<T>) + Send + Sync + 'static,
    {
        self.push(None, typed_sink(Some(extract_symbol), handler))
    }

    /// Bind a raw sink, for payloads that need hand-rolled narrowing (the
    /// futures order-book diff compound string, subject-stamped
    /// announcements).
    #[must_use]
    pub fn raw(
        self,
        subject: Option<&str>,
        sink: impl Fn(&PushEnvelope, Option<&str>) -> DispatchOutcome + Send + Sync + 'static,
    ) -> Self {
        self.push(subject.map(ToOwned::to_owned), Box::new(sink))
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> DispatchTable {
        DispatchTable {
            routes: self.routes,
        }
    }

    fn push(mut self, subject: Option<String>, sink: Sink) -> Self {
        self.routes.push(Route { subject, sink });
        self
    }
}

/// Build a sink that narrows the payload into `T` and forwards a
/// [`StreamEvent`] to the handler.
///
/// The subscription's symbol wins over the payload extractor: a
/// symbol-parameterized topic already knows its instrument.
fn typed_sink<T, F>(extract_symbol: Option<SymbolExtractor<T>>, handler: F) -> Sink
where
    T: DeserializeOwned + 'static,
    F: Fn(StreamEvent<T>) + Send + Sync + 'static,
{
    Box::new(move |envelope, subscription_symbol| {
        match serde_json::from_value::<T>(envelope.payload.clone()) {
            Ok(data) => {
                let symbol = subscription_symbol.map(ToOwned::to_owned).or_else(|| {
                    extract_symbol.and_then(|extract| extract(&data))
                });
                handler(StreamEvent {
                    topic: envelope.topic.clone(),
                    subject: envelope.subject.clone(),
                    symbol,
                    received_at: envelope.received_at,
                    data,
                });
                DispatchOutcome::Delivered
            }
            Err(e) => DispatchOutcome::DecodeFailed(e.to_string()),
        }
    })
}

// =============================================================================
// Tests
// =============================================================================
