//! Inbound Frame Decoder
//!
//! Decodes raw frames from KuCoin's WebSocket streams. Every frame is a JSON
//! object discriminated by a `type` field:
//!
//! - `welcome`: connection greeting, carries the connect id
//! - `ack`: acknowledgement of a subscribe/unsubscribe request
//! - `error`: request failure with a numeric code
//! - `pong`: heartbeat reply (the transport owns heartbeats)
//! - `message`: push data with `topic`, `subject`, and `data` payload
//!
//! The protocol is additive/versioned: unknown fields and unknown frame
//! types are tolerated.
//!
//! # Wire Format (JSON)
//! ```json
//! {"id":"hQvf8jkno","type":"welcome"}
//! {"id":"3","type":"ack"}
//! {"id":"4","type":"error","code":404,"data":"topic /bad not found"}
//! {
//!   "type": "message",
//!   "topic": "/contractMarket/execution:XBTUSDM",
//!   "subject": "match",
//!   "data": {"symbol": "XBTUSDM", "...": "..."}
//! }
//! ```

use serde::Deserialize;

use crate::domain::event::PushEnvelope;

/// Decode errors. Malformed frames are logged and dropped by the caller,
/// never surfaced to subscription handlers.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The frame was not valid JSON, or not an object.
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    /// A required field was absent for the frame's type.
    #[error("frame missing required field `{0}`")]
    MissingField(&'static str),

    /// The echoed correlation id was not numeric.
    #[error("unparsable correlation id `{0}`")]
    BadCorrelationId(String),
}

/// A decoded inbound frame.
#[derive(Debug)]
pub enum InboundFrame {
    /// Connection greeting.
    Welcome {
        /// Server-assigned connect id.
        connect_id: Option<String>,
    },

    /// Request acknowledged.
    Ack {
        /// Correlation id echoed from the request.
        correlation_id: u64,
    },

    /// Request rejected, or a connection-level error.
    Error {
        /// Correlation id, when the error answers a request.
        correlation_id: Option<u64>,
        /// Numeric error code.
        code: i64,
        /// Error message text.
        message: String,
    },

    /// Heartbeat reply.
    Pong,

    /// Push data.
    Push(PushEnvelope),

    /// A frame type this crate does not know; ignored.
    Other(String),
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    id: Option<String>,
    #[serde(rename = "type")]
    frame_type: String,
    topic: Option<String>,
    subject: Option<String>,
    code: Option<i64>,
    data: Option<serde_json::Value>,
}

/// Decode one raw frame.
///
/// # Errors
///
/// Returns a [`DecodeError`] for frames that are not valid JSON or are
/// missing fields their type requires.
pub fn decode_frame(raw: &str) -> Result<InboundFrame, DecodeError> {
    let frame: RawFrame = serde_json::from_str(raw)?;

    match frame.frame_type.as_str() {
        "welcome" => Ok(InboundFrame::Welcome {
            connect_id: frame.id,
        }),
        "ack" => Ok(InboundFrame::Ack {
            correlation_id: parse_correlation_id(frame.id.ok_or(DecodeError::MissingField("id"))?)?,
        }),
        "error" => {
            let correlation_id = frame.id.map(parse_correlation_id).transpose()?;
            let message = frame
                .data
                .as_ref()
                .and_then(|data| data.as_str())
                .unwrap_or("")
                .to_owned();
            Ok(InboundFrame::Error {
                correlation_id,
                code: frame.code.unwrap_or(0),
                message,
            })
        }
        "pong" => Ok(InboundFrame::Pong),
        "message" => {
            let topic = frame.topic.ok_or(DecodeError::MissingField("topic"))?;
            let payload = frame.data.ok_or(DecodeError::MissingField("data"))?;
            Ok(InboundFrame::Push(PushEnvelope::new(
                topic,
                frame.subject,
                payload,
            )))
        }
        other => Ok(InboundFrame::Other(other.to_owned())),
    }
}

fn parse_correlation_id(id: String) -> Result<u64, DecodeError> {
    id.parse().map_err(|_| DecodeError::BadCorrelationId(id))
}

// =============================================================================
// Tests
// =============================================================================
