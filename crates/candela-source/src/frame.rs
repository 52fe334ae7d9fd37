//! Kraken v2 websocket frame parsing.
//!
//! Frames are JSON objects distinguished by `channel` (data and heartbeats)
//! or `method` (request acknowledgements):
//!
//! ```json
//! {"channel":"heartbeat"}
//! {"method":"subscribe","success":true,"result":{"channel":"trade","symbol":"BTC/USD"}}
//! {"channel":"trade","type":"update","data":[{"symbol":"BTC/USD","price":42000.1,"qty":0.5,"timestamp":"2024-01-01T00:36:45.456789Z"}]}
//! ```

use candela_types::{DataShapeError, Trade, iso8601_to_ms};
use serde::Deserialize;
use serde_json::Value;

use crate::TransportError;

/// A decoded websocket frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Keep-alive sent when no trades happened.
    Heartbeat,
    /// Exchange status update.
    Status,
    /// Acknowledgement of a subscribe request.
    SubscribeAck {
        /// Whether the subscription was accepted.
        success: bool,
        /// Error text for rejected subscriptions.
        error: Option<String>,
    },
    /// Reply to an application-level ping.
    Pong,
    /// Trade update; each entry is validated independently.
    Trades(Vec<Result<Trade, DataShapeError>>),
    /// Any other channel or method.
    Other(String),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

/// Builds the subscribe request for the trade channel of one symbol.
#[must_use]
pub fn subscribe_message(symbol: &str) -> String {
    serde_json::json!({
        "method": "subscribe",
        "params": {
            "channel": "trade",
            "symbol": [symbol],
            "snapshot": false,
        }
    })
    .to_string()
}

/// Parses a text frame.
///
/// # Errors
///
/// Returns [`TransportError::MalformedFrame`] if the text is not a JSON
/// object, or if a trade frame carries no `data` array.
pub fn parse_frame(text: &str) -> Result<Frame, TransportError> {
    let envelope: Envelope = serde_json::from_str(text)
        .map_err(|e| TransportError::MalformedFrame(format!("{e}: {text}")))?;

    if let Some(method) = envelope.method.as_deref() {
        return Ok(match method {
            "subscribe" => Frame::SubscribeAck {
                success: envelope.success.unwrap_or(false),
                error: envelope.error,
            },
            "pong" => Frame::Pong,
            other => Frame::Other(other.to_string()),
        });
    }

    match envelope.channel.as_deref() {
        Some("heartbeat") => Ok(Frame::Heartbeat),
        Some("status") => Ok(Frame::Status),
        Some("trade") => match envelope.data {
            Some(Value::Array(items)) => Ok(Frame::Trades(items.iter().map(parse_trade).collect())),
            _ => Err(TransportError::MalformedFrame(format!(
                "trade frame without data array: {text}"
            ))),
        },
        Some(other) => Ok(Frame::Other(other.to_string())),
        None => Err(TransportError::MalformedFrame(format!(
            "frame has neither channel nor method: {text}"
        ))),
    }
}

/// Converts one entry of a trade frame into a [`Trade`].
///
/// # Errors
///
/// Returns a [`DataShapeError`] for missing fields, unparseable numbers or
/// timestamps, and values the trade invariants reject.
pub fn parse_trade(item: &Value) -> Result<Trade, DataShapeError> {
    let symbol = item
        .get("symbol")
        .and_then(Value::as_str)
        .ok_or(DataShapeError::MissingField("symbol"))?;
    let price = number_field(item, "price")?;
    let quantity = number_field(item, "qty")?;
    let timestamp = item
        .get("timestamp")
        .and_then(Value::as_str)
        .ok_or(DataShapeError::MissingField("timestamp"))?;

    Trade::new(symbol, price, quantity, iso8601_to_ms(timestamp)?)
}

/// Reads a number that may be encoded as a JSON number or a numeric string.
fn number_field(item: &Value, field: &'static str) -> Result<f64, DataShapeError> {
    parse_number(item.get(field), field)
}

pub(crate) fn parse_number(value: Option<&Value>, field: &'static str) -> Result<f64, DataShapeError> {
    match value {
        None | Some(Value::Null) => Err(DataShapeError::MissingField(field)),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| DataShapeError::InvalidNumber {
            field,
            value: n.to_string(),
        }),
        Some(Value::String(s)) => s.parse().map_err(|_| DataShapeError::InvalidNumber {
            field,
            value: s.clone(),
        }),
        Some(other) => Err(DataShapeError::InvalidNumber {
            field,
            value: other.to_string(),
        }),
    }
}
