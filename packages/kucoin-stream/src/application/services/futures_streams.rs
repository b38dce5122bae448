//! Futures Subscription Facade
//!
//! One method per futures data stream. Each call validates its parameters,
//! composes the topic string, registers a dispatch table, and returns a
//! handle for the live subscription; no business logic lives here.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{require_symbol, validate_depth_limit};
use crate::client::{ClientCore, SubscribeError, SubscriptionHandle};
use crate::domain::event::{DispatchOutcome, DispatchTable, StreamEvent};
use crate::domain::topic::Topic;
use crate::infrastructure::kucoin::futures::{
    AvailableBalanceUpdate, ContractAnnouncement, FundingRate, FuturesMatch,
    FuturesOrderBookChange, FuturesOrderUpdate, FuturesPartialOrderBook, FuturesStopOrderUpdate,
    FuturesTicker, MarkIndexPrice, OrderMarginUpdate, PositionUpdate, StopOrderUpdate,
    TransactionStatistics, WithdrawableUpdate,
};

/// Futures market subscriptions.
///
/// Obtained from `KucoinStreamClient::futures`.
pub struct FuturesStreams {
    core: Arc<ClientCore>,
}

impl FuturesStreams {
    pub(crate) const fn new(core: Arc<ClientCore>) -> Self {
        Self { core }
    }

    /// Subscribe to trade executions for a contract.
    ///
    /// Topic: `/contractMarket/execution:{symbol}`
    ///
    /// # Errors
    ///
    /// See [`SubscribeError`].
    pub async fn subscribe_to_trades(
        &self,
        symbol: &str,
        handler: impl Fn(StreamEvent<FuturesMatch>) + Send + Sync + 'static,
        cancel: CancellationToken,
    ) -> Result<SubscriptionHandle, SubscribeError> {
        let symbol = require_symbol(symbol)?;
        let topic = Topic::with_symbol("/contractMarket/execution", symbol);
        Arc::clone(&self.core)
            .subscribe(topic, false, DispatchTable::single(handler), cancel)
            .await
    }

    /// Subscribe to best bid/ask ticker updates for a contract.
    ///
    /// Topic: `/contractMarket/tickerV2:{symbol}`
    ///
    /// # Errors
    ///
    /// See [`SubscribeError`].
    pub async fn subscribe_to_ticker(
        &self,
        symbol: &str,
        handler: impl Fn(StreamEvent<FuturesTicker>) + Send + Sync + 'static,
        cancel: CancellationToken,
    ) -> Result<SubscriptionHandle, SubscribeError> {
        let symbol = require_symbol(symbol)?;
        let topic = Topic::with_symbol("/contractMarket/tickerV2", symbol);
        Arc::clone(&self.core)
            .subscribe(topic, false, DispatchTable::single(handler), cancel)
            .await
    }

    /// Subscribe to order book diffs for a contract.
    ///
    /// Topic: `/contractMarket/level2:{symbol}`
    ///
    /// The payload carries each change as the compound string
    /// `"price,side,quantity"`; empty or malformed change frames are benign
    /// heartbeats and are dropped without invoking the handler.
    ///
    /// # Errors
    ///
    /// See [`SubscribeError`].
    pub async fn subscribe_to_order_book_updates(
        &self,
        symbol: &str,
        handler: impl Fn(StreamEvent<FuturesOrderBookChange>) + Send + Sync + 'static,
        cancel: CancellationToken,
    ) -> Result<SubscriptionHandle, SubscribeError> {
        let symbol = require_symbol(symbol)?;
        let topic = Topic::with_symbol("/contractMarket/level2", symbol);

        let table = DispatchTable::builder()
            .raw(None, move |envelope, symbol| {
                FuturesOrderBookChange::from_payload(&envelope.payload).map_or(
                    DispatchOutcome::Skipped,
                    |change| {
                        handler(StreamEvent {
                            topic: envelope.topic.clone(),
                            subject: envelope.subject.clone(),
                            symbol: symbol.map(ToOwned::to_owned),
                            received_at: envelope.received_at,
                            data: change,
                        });
                        DispatchOutcome::Delivered
                    },
                )
            })
            .build();

        Arc::clone(&self.core).subscribe(topic, false, table, cancel).await
    }

    /// Subscribe to partial order book snapshots for a contract.
    ///
    /// Topic: `/contractMarket/level2Depth{limit}:{symbol}`
    ///
    /// # Errors
    ///
    /// `InvalidParameter` when `limit` is not 5, 20, or 50; otherwise see
    /// [`SubscribeError`].
    pub async fn subscribe_to_partial_order_book(
        &self,
        symbol: &str,
        limit: u32,
        handler: impl Fn(StreamEvent<FuturesPartialOrderBook>) + Send + Sync + 'static,
        cancel: CancellationToken,
    ) -> Result<SubscriptionHandle, SubscribeError> {
        let symbol = require_symbol(symbol)?;
        validate_depth_limit(limit)?;
        let topic = Topic::with_symbol(format!("/contractMarket/level2Depth{limit}"), symbol);
        Arc::clone(&self.core)
            .subscribe(topic, false, DispatchTable::single(handler), cancel)
            .await
    }

    /// Subscribe to instrument updates for a contract: mark/index price and
    /// funding rate, multiplexed over one topic.
    ///
    /// Topic: `/contract/instrument:{symbol}`
    ///
    /// Messages with subject `mark.index.price` go to
    /// `on_mark_index_price`; everything else on the stream is a funding
    /// rate update.
    ///
    /// # Errors
    ///
    /// See [`SubscribeError`].
    pub async fn subscribe_to_instrument_updates(
        &self,
        symbol: &str,
        on_mark_index_price: impl Fn(StreamEvent<MarkIndexPrice>) + Send + Sync + 'static,
        on_funding_rate: impl Fn(StreamEvent<FundingRate>) + Send + Sync + 'static,
        cancel: CancellationToken,
    ) -> Result<SubscriptionHandle, SubscribeError> {
        let symbol = require_symbol(symbol)?;
        let topic = Topic::with_symbol("/contract/instrument", symbol);

        let table = DispatchTable::builder()
            .on_subject("mark.index.price", on_mark_index_price)
            .fallback(on_funding_rate)
            .build();

        Arc::clone(&self.core).subscribe(topic, false, table, cancel).await
    }

    /// Subscribe to funding fee settlement announcements.
    ///
    /// Topic: `/contract/announcement`
    ///
    /// The announcement's `event` field is stamped from the envelope's
    /// subject (`funding.begin` / `funding.end`).
    ///
    /// # Errors
    ///
    /// See [`SubscribeError`].
    pub async fn subscribe_to_system_announcements(
        &self,
        handler: impl Fn(StreamEvent<ContractAnnouncement>) + Send + Sync + 'static,
        cancel: CancellationToken,
    ) -> Result<SubscriptionHandle, SubscribeError> {
        let topic = Topic::channel("/contract/announcement");

        let table = DispatchTable::builder()
            .raw(None, move |envelope, _symbol| {
                match serde_json::from_value::<ContractAnnouncement>(envelope.payload.clone()) {
                    Ok(mut announcement) => {
                        announcement.event = envelope.subject.clone().unwrap_or_default();
                        let symbol = Some(announcement.symbol.clone());
                        handler(StreamEvent {
                            topic: envelope.topic.clone(),
                            subject: envelope.subject.clone(),
                            symbol,
                            received_at: envelope.received_at,
                            data: announcement,
                        });
                        DispatchOutcome::Delivered
                    }
                    Err(e) => DispatchOutcome::DecodeFailed(e.to_string()),
                }
            })
            .build();

        Arc::clone(&self.core).subscribe(topic, false, table, cancel).await
    }

    /// Subscribe to 24 hour transaction statistic snapshots for a contract.
    ///
    /// Topic: `/contractMarket/snapshot:{symbol}`
    ///
    /// # Errors
    ///
    /// See [`SubscribeError`].
    pub async fn subscribe_to_24h_snapshots(
        &self,
        symbol: &str,
        handler: impl Fn(StreamEvent<TransactionStatistics>) + Send + Sync + 'static,
        cancel: CancellationToken,
    ) -> Result<SubscriptionHandle, SubscribeError> {
        let symbol = require_symbol(symbol)?;
        let topic = Topic::with_symbol("/contractMarket/snapshot", symbol);
        Arc::clone(&self.core)
            .subscribe(topic, false, DispatchTable::single(handler), cancel)
            .await
    }

    /// Subscribe to order updates. Requires credentials.
    ///
    /// Topic: `/contractMarket/tradeOrders:{symbol}`, or
    /// `/contractMarket/tradeOrders` covering all symbols when no symbol is
    /// supplied. The event's symbol is taken from the payload.
    ///
    /// # Errors
    ///
    /// See [`SubscribeError`].
    pub async fn subscribe_to_order_updates(
        &self,
        symbol: Option<&str>,
        handler: impl Fn(StreamEvent<FuturesOrderUpdate>) + Send + Sync + 'static,
        cancel: CancellationToken,
    ) -> Result<SubscriptionHandle, SubscribeError> {
        let topic = match symbol {
            Some(symbol) => {
                Topic::with_symbol("/contractMarket/tradeOrders", require_symbol(symbol)?)
            }
            None => Topic::channel("/contractMarket/tradeOrders"),
        };

        let table = DispatchTable::builder()
            .fallback_extracting::<FuturesOrderUpdate, _>(
                |update| Some(update.symbol.clone()),
                handler,
            )
            .build();

        Arc::clone(&self.core).subscribe(topic, true, table, cancel).await
    }

    /// Subscribe to stop order updates for all symbols. Requires
    /// credentials.
    ///
    /// Topic: `/contractMarket/advancedOrders`
    ///
    /// The stream pushes the wider futures stop-order payload; handlers
    /// receive the narrowed common view.
    ///
    /// # Errors
    ///
    /// See [`SubscribeError`].
    pub async fn subscribe_to_stop_order_updates(
        &self,
        handler: impl Fn(StreamEvent<StopOrderUpdate>) + Send + Sync + 'static,
        cancel: CancellationToken,
    ) -> Result<SubscriptionHandle, SubscribeError> {
        let topic = Topic::channel("/contractMarket/advancedOrders");

        let table = DispatchTable::builder()
            .raw(None, move |envelope, _symbol| {
                match serde_json::from_value::<FuturesStopOrderUpdate>(envelope.payload.clone()) {
                    Ok(full) => {
                        let narrowed: StopOrderUpdate = full.into();
                        let symbol = Some(narrowed.symbol.clone());
                        handler(StreamEvent {
                            topic: envelope.topic.clone(),
                            subject: envelope.subject.clone(),
                            symbol,
                            received_at: envelope.received_at,
                            data: narrowed,
                        });
                        DispatchOutcome::Delivered
                    }
                    Err(e) => DispatchOutcome::DecodeFailed(e.to_string()),
                }
            })
            .build();

        Arc::clone(&self.core).subscribe(topic, true, table, cancel).await
    }

    /// Subscribe to wallet balance updates. Requires credentials.
    ///
    /// Topic: `/contractAccount/wallet`
    ///
    /// One stream multiplexes three event kinds by subject:
    /// `orderMargin.change`, `availableBalance.change`, and
    /// `withdrawHold.change`. Unknown subjects are logged and dropped.
    /// Events are tagged with the payload's currency.
    ///
    /// # Errors
    ///
    /// See [`SubscribeError`].
    pub async fn subscribe_to_balance_updates(
        &self,
        on_order_margin: impl Fn(StreamEvent<OrderMarginUpdate>) + Send + Sync + 'static,
        on_balance: impl Fn(StreamEvent<AvailableBalanceUpdate>) + Send + Sync + 'static,
        on_withdrawable: impl Fn(StreamEvent<WithdrawableUpdate>) + Send + Sync + 'static,
        cancel: CancellationToken,
    ) -> Result<SubscriptionHandle, SubscribeError> {
        let topic = Topic::channel("/contractAccount/wallet");

        let table = DispatchTable::builder()
            .on_subject_extracting::<OrderMarginUpdate, _>(
                "orderMargin.change",
                |update| Some(update.currency.clone()),
                on_order_margin,
            )
            .on_subject_extracting::<AvailableBalanceUpdate, _>(
                "availableBalance.change",
                |update| Some(update.currency.clone()),
                on_balance,
            )
            .on_subject_extracting::<WithdrawableUpdate, _>(
                "withdrawHold.change",
                |update| Some(update.currency.clone()),
                on_withdrawable,
            )
            .build();

        Arc::clone(&self.core).subscribe(topic, true, table, cancel).await
    }

    /// Subscribe to position updates for a contract. Requires credentials.
    ///
    /// Topic: `/contract/position:{symbol}`
    ///
    /// # Errors
    ///
    /// See [`SubscribeError`].
    pub async fn subscribe_to_position_updates(
        &self,
        symbol: &str,
        handler: impl Fn(StreamEvent<PositionUpdate>) + Send + Sync + 'static,
        cancel: CancellationToken,
    ) -> Result<SubscriptionHandle, SubscribeError> {
        let symbol = require_symbol(symbol)?;
        let topic = Topic::with_symbol("/contract/position", symbol);
        Arc::clone(&self.core)
            .subscribe(topic, true, DispatchTable::single(handler), cancel)
            .await
    }
}
