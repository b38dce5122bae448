//! Spot Subscription Facade
//!
//! One method per spot data stream. Each call validates its parameters,
//! composes the topic string, registers a dispatch table, and returns a
//! handle for the live subscription.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{require_symbol, validate_depth_limit};
use crate::client::{ClientCore, SubscribeError, SubscriptionHandle};
use crate::domain::event::{DispatchTable, StreamEvent};
use crate::domain::topic::Topic;
use crate::infrastructure::kucoin::spot::{
    SpotBalanceUpdate, SpotMatch, SpotOrderBookUpdate, SpotOrderUpdate, SpotPartialOrderBook,
    SpotStopOrderUpdate, SpotTicker,
};

/// Spot market subscriptions.
///
/// Obtained from `KucoinStreamClient::spot`.
pub struct SpotStreams {
    core: Arc<ClientCore>,
}

impl SpotStreams {
    pub(crate) const fn new(core: Arc<ClientCore>) -> Self {
        Self { core }
    }

    /// Subscribe to trade matches for a trading pair.
    ///
    /// Topic: `/market/match:{symbol}`
    ///
    /// # Errors
    ///
    /// See [`SubscribeError`].
    pub async fn subscribe_to_trades(
        &self,
        symbol: &str,
        handler: impl Fn(StreamEvent<SpotMatch>) + Send + Sync + 'static,
        cancel: CancellationToken,
    ) -> Result<SubscriptionHandle, SubscribeError> {
        let symbol = require_symbol(symbol)?;
        let topic = Topic::with_symbol("/market/match", symbol);
        Arc::clone(&self.core)
            .subscribe(topic, false, DispatchTable::single(handler), cancel)
            .await
    }

    /// Subscribe to best bid/ask ticker updates for a trading pair.
    ///
    /// Topic: `/market/ticker:{symbol}`
    ///
    /// # Errors
    ///
    /// See [`SubscribeError`].
    pub async fn subscribe_to_ticker(
        &self,
        symbol: &str,
        handler: impl Fn(StreamEvent<SpotTicker>) + Send + Sync + 'static,
        cancel: CancellationToken,
    ) -> Result<SubscriptionHandle, SubscribeError> {
        let symbol = require_symbol(symbol)?;
        let topic = Topic::with_symbol("/market/ticker", symbol);
        Arc::clone(&self.core)
            .subscribe(topic, false, DispatchTable::single(handler), cancel)
            .await
    }

    /// Subscribe to order book diffs for a trading pair.
    ///
    /// Topic: `/market/level2:{symbol}`
    ///
    /// # Errors
    ///
    /// See [`SubscribeError`].
    pub async fn subscribe_to_order_book_updates(
        &self,
        symbol: &str,
        handler: impl Fn(StreamEvent<SpotOrderBookUpdate>) + Send + Sync + 'static,
        cancel: CancellationToken,
    ) -> Result<SubscriptionHandle, SubscribeError> {
        let symbol = require_symbol(symbol)?;
        let topic = Topic::with_symbol("/market/level2", symbol);
        Arc::clone(&self.core)
            .subscribe(topic, false, DispatchTable::single(handler), cancel)
            .await
    }

    /// Subscribe to partial order book snapshots for a trading pair.
    ///
    /// Topic: `/spotMarket/level2Depth{limit}:{symbol}`
    ///
    /// # Errors
    ///
    /// `InvalidParameter` when `limit` is not 5, 20, or 50; otherwise see
    /// [`SubscribeError`].
    pub async fn subscribe_to_partial_order_book(
        &self,
        symbol: &str,
        limit: u32,
        handler: impl Fn(StreamEvent<SpotPartialOrderBook>) + Send + Sync + 'static,
        cancel: CancellationToken,
    ) -> Result<SubscriptionHandle, SubscribeError> {
        let symbol = require_symbol(symbol)?;
        validate_depth_limit(limit)?;
        let topic = Topic::with_symbol(format!("/spotMarket/level2Depth{limit}"), symbol);
        Arc::clone(&self.core)
            .subscribe(topic, false, DispatchTable::single(handler), cancel)
            .await
    }

    /// Subscribe to order updates for all symbols. Requires credentials.
    ///
    /// Topic: `/spotMarket/tradeOrders`
    ///
    /// The event's symbol is taken from the payload.
    ///
    /// # Errors
    ///
    /// See [`SubscribeError`].
    pub async fn subscribe_to_order_updates(
        &self,
        handler: impl Fn(StreamEvent<SpotOrderUpdate>) + Send + Sync + 'static,
        cancel: CancellationToken,
    ) -> Result<SubscriptionHandle, SubscribeError> {
        let topic = Topic::channel("/spotMarket/tradeOrders");

        let table = DispatchTable::builder()
            .fallback_extracting::<SpotOrderUpdate, _>(
                |update| Some(update.symbol.clone()),
                handler,
            )
            .build();

        Arc::clone(&self.core).subscribe(topic, true, table, cancel).await
    }

    /// Subscribe to stop order updates for all symbols. Requires
    /// credentials.
    ///
    /// Topic: `/spotMarket/advancedOrders`
    ///
    /// # Errors
    ///
    /// See [`SubscribeError`].
    pub async fn subscribe_to_stop_order_updates(
        &self,
        handler: impl Fn(StreamEvent<SpotStopOrderUpdate>) + Send + Sync + 'static,
        cancel: CancellationToken,
    ) -> Result<SubscriptionHandle, SubscribeError> {
        let topic = Topic::channel("/spotMarket/advancedOrders");

        let table = DispatchTable::builder()
            .fallback_extracting::<SpotStopOrderUpdate, _>(
                |update| Some(update.symbol.clone()),
                handler,
            )
            .build();

        Arc::clone(&self.core).subscribe(topic, true, table, cancel).await
    }

    /// Subscribe to account balance updates. Requires credentials.
    ///
    /// Topic: `/account/balance`
    ///
    /// Events are tagged with the payload's currency.
    ///
    /// # Errors
    ///
    /// See [`SubscribeError`].
    pub async fn subscribe_to_balance_updates(
        &self,
        handler: impl Fn(StreamEvent<SpotBalanceUpdate>) + Send + Sync + 'static,
        cancel: CancellationToken,
    ) -> Result<SubscriptionHandle, SubscribeError> {
        let topic = Topic::channel("/account/balance");

        let table = DispatchTable::builder()
            .fallback_extracting::<SpotBalanceUpdate, _>(
                |update| Some(update.currency.clone()),
                handler,
            )
            .build();

        Arc::clone(&self.core).subscribe(topic, true, table, cancel).await
    }
}
