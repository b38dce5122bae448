//! Spot Push Message Models
//!
//! Wire types for KuCoin spot streams. Unlike the futures feed, the spot
//! feed quotes most numeric fields as strings; `Decimal` fields accept both
//! encodings, and sequence/time fields that arrive quoted use explicit
//! helpers.
//!
//! # Streams
//!
//! - `/market/match:{symbol}`: trade matches
//! - `/market/ticker:{symbol}`: best bid/ask ticker
//! - `/market/level2:{symbol}`: order book diffs
//! - `/spotMarket/level2Depth{limit}:{symbol}`: partial book snapshots
//! - `/spotMarket/tradeOrders`: order updates (private)
//! - `/spotMarket/advancedOrders`: stop order updates (private)
//! - `/account/balance`: balance updates (private)

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::common::{
    BookLevel, OrderEventType, OrderSide, OrderStatus, i64_from_str_or_number,
    u64_from_str_or_number,
};

// =============================================================================
// Market Data
// =============================================================================

/// A trade match.
///
/// # Wire Format (JSON)
/// ```json
/// {
///   "sequence": "1545896669145",
///   "type": "match",
///   "symbol": "BTC-USDT",
///   "side": "buy",
///   "price": "0.08200000000000000000",
///   "size": "0.01022222000000000000",
///   "tradeId": "5c24c5da03aa673885cd67aa",
///   "takerOrderId": "5c24c5d903aa6772d55b371e",
///   "makerOrderId": "5c2187d003aa677bd09d5c93",
///   "time": "1545913818099033203"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotMatch {
    /// Message sequence number.
    #[serde(deserialize_with = "u64_from_str_or_number")]
    pub sequence: u64,
    /// Trading pair symbol.
    pub symbol: String,
    /// Taker side.
    pub side: OrderSide,
    /// Fill price.
    pub price: Decimal,
    /// Filled quantity.
    pub size: Decimal,
    /// Trade id.
    pub trade_id: String,
    /// Taker order id.
    pub taker_order_id: String,
    /// Maker order id.
    pub maker_order_id: String,
    /// Exchange timestamp, nanoseconds.
    #[serde(deserialize_with = "i64_from_str_or_number")]
    pub time: i64,
}

/// Best bid/ask ticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotTicker {
    /// Message sequence number.
    #[serde(deserialize_with = "u64_from_str_or_number")]
    pub sequence: u64,
    /// Last traded price.
    pub price: Decimal,
    /// Last traded quantity.
    pub size: Decimal,
    /// Best ask price.
    pub best_ask: Decimal,
    /// Quantity at the best ask.
    pub best_ask_size: Decimal,
    /// Best bid price.
    pub best_bid: Decimal,
    /// Quantity at the best bid.
    pub best_bid_size: Decimal,
    /// Exchange timestamp, milliseconds.
    #[serde(default)]
    pub time: Option<i64>,
}

/// One changed level of the spot order book diff.
///
/// # Wire Format (JSON)
///
/// A three-element string array: price, size, book sequence.
/// ```json
/// ["6500.07", "0.31", "1545896669106"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpotBookChange {
    /// Price of the changed level.
    pub price: Decimal,
    /// New quantity at the level (0 removes it).
    pub size: Decimal,
    /// Book sequence of the change.
    pub sequence: u64,
}

impl<'de> Deserialize<'de> for SpotBookChange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (price, size, sequence) = <(Decimal, Decimal, String)>::deserialize(deserializer)?;
        Ok(Self {
            price,
            size,
            sequence: sequence.parse().map_err(serde::de::Error::custom)?,
        })
    }
}

/// Changed ask and bid levels of one order book diff.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotBookChanges {
    /// Changed ask levels.
    #[serde(default)]
    pub asks: Vec<SpotBookChange>,
    /// Changed bid levels.
    #[serde(default)]
    pub bids: Vec<SpotBookChange>,
}

/// Order book diff update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotOrderBookUpdate {
    /// First book sequence covered by this diff.
    #[serde(deserialize_with = "u64_from_str_or_number")]
    pub sequence_start: u64,
    /// Last book sequence covered by this diff.
    #[serde(deserialize_with = "u64_from_str_or_number")]
    pub sequence_end: u64,
    /// Trading pair symbol.
    #[serde(default)]
    pub symbol: Option<String>,
    /// Changed levels.
    pub changes: SpotBookChanges,
}

/// Partial order book snapshot (level2Depth streams).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotPartialOrderBook {
    /// Ask levels, best first.
    pub asks: Vec<BookLevel>,
    /// Bid levels, best first.
    pub bids: Vec<BookLevel>,
    /// Exchange timestamp, milliseconds.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

// =============================================================================
// Private Streams
// =============================================================================

/// Order lifecycle update (`subject: orderChange`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotOrderUpdate {
    /// Order id.
    pub order_id: String,
    /// Trading pair symbol.
    pub symbol: String,
    /// The lifecycle event.
    #[serde(rename = "type")]
    pub event: OrderEventType,
    /// Current order status.
    pub status: OrderStatus,
    /// Order type (limit, market).
    #[serde(default)]
    pub order_type: Option<String>,
    /// Order side.
    #[serde(default)]
    pub side: Option<OrderSide>,
    /// Order price.
    #[serde(default)]
    pub price: Option<Decimal>,
    /// Order quantity.
    #[serde(default)]
    pub size: Option<Decimal>,
    /// Remaining open quantity.
    #[serde(default)]
    pub remain_size: Option<Decimal>,
    /// Cumulative filled quantity.
    #[serde(default)]
    pub filled_size: Option<Decimal>,
    /// Quantity filled by this event, for match events.
    #[serde(default)]
    pub match_size: Option<Decimal>,
    /// Fill price, for match events.
    #[serde(default)]
    pub match_price: Option<Decimal>,
    /// Trade id, for match events.
    #[serde(default)]
    pub trade_id: Option<String>,
    /// Client-assigned order id.
    #[serde(default)]
    pub client_oid: Option<String>,
    /// Order placement time, nanoseconds.
    #[serde(default)]
    pub order_time: Option<i64>,
    /// Exchange timestamp, nanoseconds.
    pub ts: i64,
}

/// Stop order update (`subject: stopOrder`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotStopOrderUpdate {
    /// Order id.
    pub order_id: String,
    /// Trading pair symbol.
    pub symbol: String,
    /// Stop order event: `open`, `triggered`, or `cancel`.
    #[serde(rename = "type")]
    pub event: String,
    /// Order type.
    #[serde(default)]
    pub order_type: Option<String>,
    /// Order side.
    #[serde(default)]
    pub side: Option<OrderSide>,
    /// Order quantity.
    #[serde(default)]
    pub size: Option<Decimal>,
    /// Order price.
    #[serde(default)]
    pub order_price: Option<Decimal>,
    /// Trigger direction: `up` or `down`.
    #[serde(default)]
    pub stop: Option<String>,
    /// Configured stop price.
    #[serde(default)]
    pub stop_price: Option<Decimal>,
    /// Trade type (`TRADE`, `MARGIN_TRADE`).
    #[serde(default)]
    pub trade_type: Option<String>,
    /// Whether the trigger fired successfully.
    #[serde(default)]
    pub trigger_success: Option<bool>,
    /// Order creation time, milliseconds.
    #[serde(default)]
    pub created_at: Option<i64>,
    /// Exchange timestamp, nanoseconds.
    pub ts: i64,
}

/// Account balance change (`subject: account.balance`).
///
/// # Wire Format (JSON)
/// ```json
/// {
///   "total": "88",
///   "available": "88",
///   "availableChange": "88",
///   "currency": "KCS",
///   "hold": "0",
///   "holdChange": "0",
///   "relationEvent": "trade.setted",
///   "relationEventId": "5c21e80303aa677bd09d7dff",
///   "relationContext": {"symbol": "BTC-USDT", "orderId": "5c...e03"},
///   "time": "1545743136994"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotBalanceUpdate {
    /// Total balance.
    pub total: Decimal,
    /// Available balance.
    pub available: Decimal,
    /// Change in available balance.
    #[serde(default)]
    pub available_change: Option<Decimal>,
    /// Asset currency.
    pub currency: String,
    /// Balance on hold.
    pub hold: Decimal,
    /// Change in held balance.
    #[serde(default)]
    pub hold_change: Option<Decimal>,
    /// Business event that moved the balance.
    #[serde(default)]
    pub relation_event: Option<String>,
    /// Id of the related business event.
    #[serde(default)]
    pub relation_event_id: Option<String>,
    /// Context of the related business event.
    #[serde(default)]
    pub relation_context: Option<RelationContext>,
    /// Exchange timestamp, milliseconds.
    #[serde(default, deserialize_with = "opt_time")]
    pub time: Option<i64>,
}

/// Context identifying the order/trade behind a balance change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationContext {
    /// Trading pair symbol.
    #[serde(default)]
    pub symbol: Option<String>,
    /// Related trade id.
    #[serde(default)]
    pub trade_id: Option<String>,
    /// Related order id.
    #[serde(default)]
    pub order_id: Option<String>,
}

fn opt_time<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    i64_from_str_or_number(deserializer).map(Some)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    #[test]
    fn decodes_match_with_quoted_numbers() {
        let data: SpotMatch = serde_json::from_value(json!({
            "sequence": "1545896669145",
            "type": "match",
            "symbol": "BTC-USDT",
            "side": "buy",
            "price": "0.08200000000000000000",
            "size": "0.01022222000000000000",
            "tradeId": "5c24c5da03aa673885cd67aa",
            "takerOrderId": "5c24c5d903aa6772d55b371e",
            "makerOrderId": "5c2187d003aa677bd09d5c93",
            "time": "1545913818099033203"
        }))
        .unwrap();

        assert_eq!(data.sequence, 1_545_896_669_145);
        assert_eq!(data.price, dec("0.082"));
        assert_eq!(data.time, 1_545_913_818_099_033_203);
    }

    #[test]
    fn decodes_ticker() {
        let data: SpotTicker = serde_json::from_value(json!({
            "sequence": "1545896668986",
            "price": "0.08",
            "size": "0.011",
            "bestAsk": "0.08",
            "bestAskSize": "0.18",
            "bestBid": "0.049",
            "bestBidSize": "0.036",
            "time": 1704085320346i64
        }))
        .unwrap();

        assert_eq!(data.best_bid, dec("0.049"));
        assert_eq!(data.time, Some(1_704_085_320_346));
    }

    #[test]
    fn decodes_book_update_change_triples() {
        let update: SpotOrderBookUpdate = serde_json::from_value(json!({
            "sequenceStart": 1545896669105i64,
            "sequenceEnd": 1545896669106i64,
            "symbol": "BTC-USDT",
            "changes": {
                "asks": [["6500.07", "0.31", "1545896669106"]],
                "bids": []
            }
        }))
        .unwrap();

        assert_eq!(update.sequence_end, 1_545_896_669_106);
        assert_eq!(update.changes.asks.len(), 1);
        assert_eq!(update.changes.asks[0].price, dec("6500.07"));
        assert_eq!(update.changes.asks[0].sequence, 1_545_896_669_106);
        assert!(update.changes.bids.is_empty());
    }

    #[test]
    fn book_change_rejects_non_numeric_sequence() {
        let result: Result<SpotBookChange, _> =
            serde_json::from_value(json!(["6500.07", "0.31", "not a number"]));
        assert!(result.is_err());
    }

    #[test]
    fn decodes_partial_book() {
        let book: SpotPartialOrderBook = serde_json::from_value(json!({
            "asks": [["9989", "8"], ["9990", "32"]],
            "bids": [["9988", "56"]],
            "timestamp": 1586948108193i64
        }))
        .unwrap();

        assert_eq!(book.asks.len(), 2);
        assert_eq!(book.bids[0].size, dec("56"));
    }

    #[test]
    fn decodes_order_update() {
        let update: SpotOrderUpdate = serde_json::from_value(json!({
            "symbol": "KCS-USDT",
            "orderType": "limit",
            "side": "buy",
            "orderId": "5efab07953bdea00089965d2",
            "type": "open",
            "orderTime": 1593487481683297666i64,
            "size": "0.1",
            "filledSize": "0",
            "price": "0.937",
            "clientOid": "1593487481000906",
            "remainSize": "0.1",
            "status": "open",
            "ts": 1593487481683297666i64
        }))
        .unwrap();

        assert_eq!(update.event, OrderEventType::Open);
        assert_eq!(update.status, OrderStatus::Open);
        assert_eq!(update.remain_size, Some(dec("0.1")));
    }

    #[test]
    fn decodes_stop_order_update() {
        let update: SpotStopOrderUpdate = serde_json::from_value(json!({
            "createdAt": 1589789942337i64,
            "orderId": "5ec244f6a8a75e0009958237",
            "orderPrice": "9600",
            "orderType": "stop",
            "side": "buy",
            "size": "1",
            "stop": "up",
            "stopPrice": "10000",
            "symbol": "BTC-USDT",
            "tradeType": "TRADE",
            "triggerSuccess": true,
            "ts": 1589790121382281286i64,
            "type": "triggered"
        }))
        .unwrap();

        assert_eq!(update.event, "triggered");
        assert_eq!(update.stop_price, Some(dec("10000")));
    }

    #[test]
    fn decodes_balance_update() {
        let update: SpotBalanceUpdate = serde_json::from_value(json!({
            "total": "88",
            "available": "88",
            "availableChange": "88",
            "currency": "KCS",
            "hold": "0",
            "holdChange": "0",
            "relationEvent": "trade.setted",
            "relationEventId": "5c21e80303aa677bd09d7dff",
            "relationContext": {
                "symbol": "BTC-USDT",
                "tradeId": "5e6a5dca9e16882a7d83b7a4",
                "orderId": "5ea10479415e2f0009949d54"
            },
            "time": "1545743136994"
        }))
        .unwrap();

        assert_eq!(update.currency, "KCS");
        assert_eq!(update.total, dec("88"));
        assert_eq!(update.time, Some(1_545_743_136_994));
        assert_eq!(
            update.relation_context.unwrap().symbol.as_deref(),
            Some("BTC-USDT")
        );
    }
}
