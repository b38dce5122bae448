//! Futures Push Message Models
//!
//! Wire types for KuCoin futures streams. Field names map to KuCoin's
//! camelCase JSON; money fields use `Decimal` (tolerant of both string and
//! numeric encodings); raw exchange epochs stay integers (`ts` is
//! nanoseconds, `timestamp` milliseconds, matching the wire).
//!
//! # Streams
//!
//! - `/contractMarket/execution:{symbol}`: trade executions
//! - `/contractMarket/tickerV2:{symbol}`: best bid/ask ticker
//! - `/contractMarket/level2:{symbol}`: order book diffs (compound `change`)
//! - `/contractMarket/level2Depth{limit}:{symbol}`: partial book snapshots
//! - `/contract/instrument:{symbol}`: mark/index price and funding rate
//! - `/contract/announcement`: funding fee settlement announcements
//! - `/contractMarket/snapshot:{symbol}`: 24h transaction statistics
//! - `/contractMarket/tradeOrders[:{symbol}]`: order updates (private)
//! - `/contractMarket/advancedOrders`: stop order updates (private)
//! - `/contractAccount/wallet`: balance updates (private)
//! - `/contract/position:{symbol}`: position updates (private)

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::common::{BookLevel, OrderEventType, OrderSide, OrderStatus};

// =============================================================================
// Market Data
// =============================================================================

/// A trade execution.
///
/// # Wire Format (JSON)
/// ```json
/// {
///   "symbol": "XBTUSDM",
///   "sequence": 36,
///   "side": "buy",
///   "matchSize": 1,
///   "size": 1,
///   "price": 3600.0,
///   "takerOrderId": "5c9dd00870744d71c43f5e25",
///   "makerOrderId": "5c9d852070744d0976909a0c",
///   "tradeId": "5c9dd00970744d6f5a3d32fc",
///   "ts": 1553846281766256031
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuturesMatch {
    /// Contract symbol.
    pub symbol: String,
    /// Message sequence number.
    pub sequence: u64,
    /// Taker side.
    pub side: OrderSide,
    /// Filled quantity.
    pub size: Decimal,
    /// Fill price.
    pub price: Decimal,
    /// Taker order id.
    pub taker_order_id: String,
    /// Maker order id.
    pub maker_order_id: String,
    /// Trade id.
    pub trade_id: String,
    /// Exchange timestamp, nanoseconds.
    pub ts: i64,
}

/// Best bid/ask ticker (tickerV2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuturesTicker {
    /// Contract symbol.
    pub symbol: String,
    /// Message sequence number.
    pub sequence: u64,
    /// Best bid price.
    pub best_bid_price: Decimal,
    /// Quantity at the best bid.
    pub best_bid_size: Decimal,
    /// Best ask price.
    pub best_ask_price: Decimal,
    /// Quantity at the best ask.
    pub best_ask_size: Decimal,
    /// Exchange timestamp, nanoseconds.
    pub ts: i64,
}

/// One order book diff, parsed from the level2 compound `change` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuturesOrderBookChange {
    /// Book sequence number.
    pub sequence: u64,
    /// Price of the changed level.
    pub price: Decimal,
    /// Changed side.
    pub side: OrderSide,
    /// New quantity at the level (0 removes it).
    pub quantity: Decimal,
}

impl FuturesOrderBookChange {
    /// Parse the level2 payload.
    ///
    /// The payload carries the change as the compound string
    /// `"price,side,quantity"` next to a `sequence` field:
    ///
    /// ```json
    /// {"sequence": 18, "change": "5000.0,sell,83", "timestamp": 1551770400000}
    /// ```
    ///
    /// Returns `None` for empty or malformed content - the exchange emits
    /// empty `change` frames as benign heartbeats, so these are dropped
    /// silently rather than treated as errors.
    #[must_use]
    pub fn from_payload(payload: &serde_json::Value) -> Option<Self> {
        let change = payload.get("change")?.as_str()?;
        if change.is_empty() {
            return None;
        }
        let sequence = match payload.get("sequence")? {
            serde_json::Value::Number(n) => n.as_u64()?,
            serde_json::Value::String(s) if !s.is_empty() => s.parse().ok()?,
            _ => return None,
        };

        let mut parts = change.split(',');
        let price = parts.next()?.parse().ok()?;
        let side = OrderSide::from_wire(parts.next()?)?;
        let quantity = parts.next()?.parse().ok()?;

        Some(Self {
            sequence,
            price,
            side,
            quantity,
        })
    }
}

/// Partial order book snapshot (level2Depth streams).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuturesPartialOrderBook {
    /// Ask levels, best first.
    pub asks: Vec<BookLevel>,
    /// Bid levels, best first.
    pub bids: Vec<BookLevel>,
    /// Exchange timestamp, nanoseconds.
    #[serde(default)]
    pub ts: Option<i64>,
}

/// Mark and index price update (`subject: mark.index.price`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkIndexPrice {
    /// Granularity of the update, milliseconds.
    pub granularity: i64,
    /// Index price.
    pub index_price: Decimal,
    /// Mark price.
    #[serde(default)]
    pub mark_price: Option<Decimal>,
    /// Exchange timestamp, milliseconds.
    pub timestamp: i64,
}

/// Funding rate update (`subject: funding.rate`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingRate {
    /// Granularity of the update, milliseconds.
    pub granularity: i64,
    /// Current funding rate.
    pub funding_rate: Decimal,
    /// Exchange timestamp, milliseconds.
    pub timestamp: i64,
}

/// Funding fee settlement announcement.
///
/// The event kind lives in the envelope's subject (`funding.begin` /
/// `funding.end`) and is stamped onto the model at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractAnnouncement {
    /// Announcement event, from the envelope subject.
    #[serde(default)]
    pub event: String,
    /// Contract symbol.
    pub symbol: String,
    /// Funding rate being settled.
    #[serde(default)]
    pub funding_rate: Option<Decimal>,
    /// Settlement time, milliseconds.
    #[serde(default)]
    pub funding_time: Option<i64>,
    /// Exchange timestamp, milliseconds.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// 24 hour transaction statistics snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStatistics {
    /// Contract symbol.
    #[serde(default)]
    pub symbol: Option<String>,
    /// 24h traded volume.
    pub volume: Decimal,
    /// 24h turnover.
    pub turnover: Decimal,
    /// Last traded price.
    pub last_price: Decimal,
    /// 24h price change percentage.
    pub price_chg_pct: Decimal,
    /// Exchange timestamp, nanoseconds.
    pub ts: i64,
}

// =============================================================================
// Private Streams
// =============================================================================

/// Order lifecycle update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuturesOrderUpdate {
    /// Order id.
    pub order_id: String,
    /// Contract symbol.
    pub symbol: String,
    /// The lifecycle event.
    #[serde(rename = "type")]
    pub event: OrderEventType,
    /// Current order status.
    pub status: OrderStatus,
    /// Quantity filled by this event, for match events.
    #[serde(default)]
    pub match_size: Option<Decimal>,
    /// Fill price, for match events.
    #[serde(default)]
    pub match_price: Option<Decimal>,
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
    /// Canceled quantity.
    #[serde(default)]
    pub canceled_size: Option<Decimal>,
    /// Trade id, for match events.
    #[serde(default)]
    pub trade_id: Option<String>,
    /// Client-assigned order id.
    #[serde(default)]
    pub client_oid: Option<String>,
    /// Order placement time, nanoseconds.
    #[serde(default)]
    pub order_time: Option<i64>,
    /// Size before an update event.
    #[serde(default)]
    pub old_size: Option<Decimal>,
    /// Whether this event added or removed liquidity (maker/taker).
    #[serde(default)]
    pub liquidity: Option<String>,
    /// Exchange timestamp, nanoseconds.
    pub ts: i64,
}

/// Stop order update, the caller-facing narrowed view.
///
/// The advanced-orders stream carries the wider
/// [`FuturesStopOrderUpdate`]; subscribers receive this common subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopOrderUpdate {
    /// Order id.
    pub order_id: String,
    /// Contract symbol.
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
    /// Configured stop price.
    #[serde(default)]
    pub stop_price: Option<Decimal>,
    /// Order creation time, milliseconds.
    #[serde(default)]
    pub created_at: Option<i64>,
    /// Exchange timestamp, nanoseconds.
    pub ts: i64,
}

/// Stop order update as pushed by the futures advanced-orders stream; a
/// strict superset of [`StopOrderUpdate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuturesStopOrderUpdate {
    /// The common stop-order fields.
    #[serde(flatten)]
    pub order: StopOrderUpdate,
    /// Trigger direction: `up` or `down`.
    #[serde(default)]
    pub stop: Option<String>,
    /// Price type the trigger compares against (`TP`, `IP`, `MP`).
    #[serde(default)]
    pub stop_price_type: Option<String>,
    /// Whether the trigger fired successfully.
    #[serde(default)]
    pub trigger_success: Option<bool>,
    /// Failure reason when triggering failed.
    #[serde(default)]
    pub error: Option<String>,
    /// Price of the order placed on trigger.
    #[serde(default)]
    pub order_price: Option<Decimal>,
}

impl From<FuturesStopOrderUpdate> for StopOrderUpdate {
    fn from(update: FuturesStopOrderUpdate) -> Self {
        update.order
    }
}

/// Order margin change (`subject: orderMargin.change`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderMarginUpdate {
    /// Margin currently reserved for open orders.
    pub order_margin: Decimal,
    /// Settlement currency.
    pub currency: String,
    /// Exchange timestamp, milliseconds.
    pub timestamp: i64,
}

/// Available balance change (`subject: availableBalance.change`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableBalanceUpdate {
    /// Balance available for trading or withdrawal.
    pub available_balance: Decimal,
    /// Balance on hold.
    #[serde(default)]
    pub hold_balance: Option<Decimal>,
    /// Settlement currency.
    pub currency: String,
    /// Exchange timestamp, milliseconds.
    pub timestamp: i64,
}

/// Withdrawal hold change (`subject: withdrawHold.change`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawableUpdate {
    /// Amount frozen for pending withdrawals.
    pub withdraw_hold: Decimal,
    /// Settlement currency.
    pub currency: String,
    /// Exchange timestamp, milliseconds.
    pub timestamp: i64,
}

/// Position change (`subject: position.change`).
///
/// The exchange pushes the full position state on every change; fields the
/// wire omits for lite positions stay `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionUpdate {
    /// Contract symbol.
    #[serde(default)]
    pub symbol: Option<String>,
    /// Current position quantity; negative for shorts.
    #[serde(default)]
    pub current_qty: Option<Decimal>,
    /// Average entry price.
    #[serde(default)]
    pub avg_entry_price: Option<Decimal>,
    /// Current mark price.
    #[serde(default)]
    pub mark_price: Option<Decimal>,
    /// Liquidation price.
    #[serde(default)]
    pub liquidation_price: Option<Decimal>,
    /// Unrealised profit and loss.
    #[serde(default)]
    pub unrealised_pnl: Option<Decimal>,
    /// Realised profit and loss.
    #[serde(default)]
    pub realised_pnl: Option<Decimal>,
    /// Position margin.
    #[serde(default)]
    pub pos_margin: Option<Decimal>,
    /// Maintenance margin.
    #[serde(default)]
    pub maint_margin: Option<Decimal>,
    /// Leverage actually in effect.
    #[serde(default)]
    pub real_leverage: Option<Decimal>,
    /// Whether a position is open.
    #[serde(default)]
    pub is_open: Option<bool>,
    /// What triggered the change (e.g. `positionChange`, `markPriceChange`).
    #[serde(default)]
    pub change_reason: Option<String>,
    /// Settlement currency.
    #[serde(default)]
    pub settle_currency: Option<String>,
    /// When the position was opened, milliseconds.
    #[serde(default)]
    pub opening_timestamp: Option<i64>,
    /// Exchange timestamp, milliseconds.
    #[serde(default)]
    pub current_timestamp: Option<i64>,
}

// =============================================================================
// Tests
// =============================================================================
