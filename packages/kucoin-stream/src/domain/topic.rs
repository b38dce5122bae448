//! Push-Stream Topics
//!
//! A topic identifies one KuCoin push-message stream. Topics are a channel
//! template (e.g. `/contractMarket/execution`) optionally parameterized by an
//! instrument symbol; the wire form joins the two with a colon
//! (`/contractMarket/execution:XBTUSDM`). Streams that cover all symbols
//! (e.g. order updates subscribed without a symbol) use the bare template.

use std::fmt;

// =============================================================================
// Topic
// =============================================================================

/// Immutable key identifying a push-message stream.
///
/// Distinct `(template, symbol)` pairs are distinct subscriptions: a
/// subscription to `/contractMarket/execution:XBTUSDM` is unrelated to one
/// for `/contractMarket/execution:ETHUSDM`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic {
    template: String,
    symbol: Option<String>,
}

impl Topic {
    /// Create a symbol-agnostic topic from a channel template.
    #[must_use]
    pub fn channel(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            symbol: None,
        }
    }

    /// Create a topic parameterized by an instrument symbol.
    #[must_use]
    pub fn with_symbol(template: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            symbol: Some(symbol.into()),
        }
    }

    /// Parse a wire topic string back into template and symbol.
    ///
    /// The symbol, when present, follows the last `:`. Channel templates
    /// never contain a colon.
    #[must_use]
    pub fn parse(wire: &str) -> Self {
        match wire.rsplit_once(':') {
            Some((template, symbol)) if !symbol.is_empty() => {
                Self::with_symbol(template, symbol)
            }
            _ => Self::channel(wire),
        }
    }

    /// Get the channel template.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Get the instrument symbol, if this topic is symbol-parameterized.
    #[must_use]
    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    /// Compose the wire form: `template` or `template:symbol`.
    #[must_use]
    pub fn to_wire(&self) -> String {
        self.symbol.as_ref().map_or_else(
            || self.template.clone(),
            |symbol| format!("{}:{symbol}", self.template),
        )
    }

    /// Check whether a subscription under this topic should receive a message
    /// that arrived under `incoming`.
    ///
    /// Templates must match exactly. A symbol-parameterized subscription only
    /// matches its own symbol; a symbol-agnostic subscription matches any
    /// symbol (and the bare template).
    #[must_use]
    pub fn matches(&self, incoming: &Self) -> bool {
        if self.template != incoming.template {
            return false;
        }
        match (&self.symbol, &incoming.symbol) {
            (None, _) => true,
            (Some(own), Some(theirs)) => own == theirs,
            (Some(_), None) => false,
        }
    }

    /// Match specificity, used to order resolution results: exact-symbol
    /// subscriptions rank above symbol-agnostic ones.
    #[must_use]
    pub(crate) const fn specificity(&self) -> u8 {
        if self.symbol.is_some() { 1 } else { 0 }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.symbol {
            Some(symbol) => write!(f, "{}:{symbol}", self.template),
            None => f.write_str(&self.template),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn wire_form_with_symbol() {
        let topic = Topic::with_symbol("/contractMarket/level2Depth20", "XBTUSDM");
        assert_eq!(topic.to_wire(), "/contractMarket/level2Depth20:XBTUSDM");
    }

    #[test]
    fn wire_form_without_symbol() {
        let topic = Topic::channel("/contract/announcement");
        assert_eq!(topic.to_wire(), "/contract/announcement");
    }

    #[test]
    fn parse_splits_symbol() {
        let topic = Topic::parse("/market/match:BTC-USDT");
        assert_eq!(topic.template(), "/market/match");
        assert_eq!(topic.symbol(), Some("BTC-USDT"));
    }

    #[test]
    fn parse_bare_template() {
        let topic = Topic::parse("/contractAccount/wallet");
        assert_eq!(topic.template(), "/contractAccount/wallet");
        assert_eq!(topic.symbol(), None);
    }

    #[test]
    fn exact_symbol_matches_only_itself() {
        let sub = Topic::with_symbol("/contractMarket/execution", "XBTUSDM");
        assert!(sub.matches(&Topic::parse("/contractMarket/execution:XBTUSDM")));
        assert!(!sub.matches(&Topic::parse("/contractMarket/execution:ETHUSDM")));
        assert!(!sub.matches(&Topic::parse("/contractMarket/execution")));
    }

    #[test]
    fn symbol_agnostic_matches_any_symbol() {
        let sub = Topic::channel("/contractMarket/tradeOrders");
        assert!(sub.matches(&Topic::parse("/contractMarket/tradeOrders")));
        assert!(sub.matches(&Topic::parse("/contractMarket/tradeOrders:XBTUSDM")));
        assert!(!sub.matches(&Topic::parse("/contractMarket/advancedOrders")));
    }

    #[test]
    fn specificity_orders_exact_first() {
        let exact = Topic::with_symbol("/contractMarket/tradeOrders", "XBTUSDM");
        let agnostic = Topic::channel("/contractMarket/tradeOrders");
        assert!(exact.specificity() > agnostic.specificity());
    }

    proptest! {
        #[test]
        fn compose_parse_round_trip(
            template in "/[a-zA-Z]{3,12}/[a-zA-Z0-9]{3,16}",
            symbol in "[A-Z0-9-]{3,12}",
        ) {
            let topic = Topic::with_symbol(template, symbol);
            prop_assert_eq!(Topic::parse(&topic.to_wire()), topic);
        }
    }
}
