//! Shared Wire Types
//!
//! Enums and helpers used by both the spot and futures message models.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    /// Buy side.
    Buy,
    /// Sell side.
    Sell,
}

impl OrderSide {
    /// Parse the wire literal, as found inside compound payload strings.
    #[must_use]
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "buy" => Some(Self::Buy),
            "sell" => Some(Self::Sell),
            _ => None,
        }
    }
}

/// Order status carried on order-update events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order is in the matching phase.
    Match,
    /// Order is resting on the book.
    Open,
    /// Order is finished (filled or canceled).
    Done,
}

/// The lifecycle event an order update describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderEventType {
    /// Order entered the book.
    Open,
    /// Order (partially) matched.
    Match,
    /// Order fully filled.
    Filled,
    /// Order canceled.
    Canceled,
    /// Order attributes updated (e.g. size reduced).
    Update,
}

// =============================================================================
// Order Book Levels
// =============================================================================

/// One price level of a partial order book snapshot.
///
/// # Wire Format (JSON)
///
/// A two-element array; futures sends numbers, spot sends strings:
/// ```json
/// [3988.62, 56]
/// ["9989", "8"]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookLevel {
    /// Price of the level.
    pub price: Decimal,
    /// Quantity resting at the level.
    pub size: Decimal,
}

impl<'de> Deserialize<'de> for BookLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (price, size) = <(Decimal, Decimal)>::deserialize(deserializer)?;
        Ok(Self { price, size })
    }
}

impl Serialize for BookLevel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.price, self.size).serialize(serializer)
    }
}

// =============================================================================
// Serde Helpers
// =============================================================================

/// Deserialize a `u64` that may arrive as a JSON number or a decimal string
/// (spot streams quote their sequence numbers).
pub(crate) fn u64_from_str_or_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

/// Deserialize an `i64` timestamp that may arrive as a JSON number or a
/// decimal string.
pub(crate) fn i64_from_str_or_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

// =============================================================================
// Tests
// =============================================================================
