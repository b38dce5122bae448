//! Application services - the typed dispatcher and the per-market
//! subscription facades.

/// Typed envelope dispatch.
pub mod dispatcher;

/// Futures subscription facade.
pub mod futures_streams;

/// Spot subscription facade.
pub mod spot_streams;

pub use futures_streams::FuturesStreams;
pub use spot_streams::SpotStreams;

use crate::client::SubscribeError;

/// Depth limits accepted by the partial order book streams.
pub const PARTIAL_DEPTH_LIMITS: [u32; 3] = [5, 20, 50];

/// Validate a partial-depth limit against the allowed set, before any
/// network interaction.
pub(crate) fn validate_depth_limit(limit: u32) -> Result<(), SubscribeError> {
    if PARTIAL_DEPTH_LIMITS.contains(&limit) {
        Ok(())
    } else {
        Err(SubscribeError::InvalidParameter(format!(
            "depth limit must be one of {PARTIAL_DEPTH_LIMITS:?}, got {limit}"
        )))
    }
}

/// Reject empty symbols before any network interaction.
pub(crate) fn require_symbol(symbol: &str) -> Result<&str, SubscribeError> {
    if symbol.is_empty() {
        Err(SubscribeError::InvalidParameter(
            "symbol cannot be empty".to_owned(),
        ))
    } else {
        Ok(symbol)
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(5; "five")]
    #[test_case(20; "twenty")]
    #[test_case(50; "fifty")]
    fn allowed_depth_limits_pass(limit: u32) {
        assert!(validate_depth_limit(limit).is_ok());
    }

    #[test_case(0; "zero")]
    #[test_case(10; "ten")]
    #[test_case(100; "hundred")]
    fn disallowed_depth_limits_fail(limit: u32) {
        assert!(matches!(
            validate_depth_limit(limit),
            Err(SubscribeError::InvalidParameter(_))
        ));
    }

    #[test]
    fn empty_symbol_rejected() {
        assert!(matches!(
            require_symbol(""),
            Err(SubscribeError::InvalidParameter(_))
        ));
        assert_eq!(require_symbol("XBTUSDM").unwrap(), "XBTUSDM");
    }
}
