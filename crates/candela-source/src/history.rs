//! Historical trade queries.

use std::path::PathBuf;

use async_trait::async_trait;
use candela_types::{DataShapeError, RawTrade, TimeRange, Trade};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::frame::parse_number;
use crate::url::{rest_pair, trades_url};
use crate::{RestClient, TransportError};

/// A query interface returning the trades of one instrument in a time range.
///
/// Entries are validated individually so that the caller can count and drop
/// bad rows without failing the whole query.
#[async_trait]
pub trait TradeHistory: Send + Sync {
    /// Fetches all trades for `instrument_id` within `range`.
    async fn fetch(
        &self,
        instrument_id: &str,
        range: TimeRange,
    ) -> Result<Vec<Result<Trade, DataShapeError>>, TransportError>;
}

/// History backed by the Kraken public trades endpoint.
///
/// Pages through `GET /0/public/Trades` following the `last` cursor until the
/// end of the range is reached.
#[derive(Debug, Clone)]
pub struct KrakenRestHistory {
    client: RestClient,
}

impl KrakenRestHistory {
    /// Creates a history over the given client.
    #[must_use]
    pub const fn new(client: RestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TradeHistory for KrakenRestHistory {
    async fn fetch(
        &self,
        instrument_id: &str,
        range: TimeRange,
    ) -> Result<Vec<Result<Trade, DataShapeError>>, TransportError> {
        let pair = rest_pair(instrument_id);
        let mut since = range.start_ms.div_euclid(1000).to_string();
        let mut entries = Vec::new();
        let mut pages = 0u32;

        info!(%pair, %range, "querying trade history");
        loop {
            let url = trades_url(&self.client.config().base_url, &pair, &since);
            let body = self.client.get(&url).await?;
            let page = parse_rest_page(&body, instrument_id)?;
            pages += 1;

            let rows = page.entries.len();
            let reached_end = page.max_event_time_ms.is_some_and(|ms| ms >= range.end_ms);
            entries.extend(page.entries.into_iter().filter(|entry| match entry {
                Ok(trade) => range.contains(trade.event_time_ms()),
                Err(_) => true,
            }));
            debug!(page = pages, rows, total = entries.len(), cursor = %page.last, "history page");

            if rows == 0 || reached_end || page.last == since {
                break;
            }
            since = page.last;
            tokio::time::sleep(self.client.config().page_delay).await;
        }

        info!(%pair, pages, entries = entries.len(), "trade history fetched");
        Ok(entries)
    }
}

/// One decoded page of the public trades endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct RestPage {
    /// Trades in the page, each validated independently.
    pub entries: Vec<Result<Trade, DataShapeError>>,
    /// Cursor for the next page.
    pub last: String,
    /// Latest event time among the valid trades.
    pub max_event_time_ms: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RestResponse {
    #[serde(default)]
    error: Vec<String>,
    #[serde(default)]
    result: Option<Map<String, Value>>,
}

/// Decodes a public trades response body.
///
/// Rows have the shape `[price, volume, time, side, type, misc, trade_id]`
/// with prices as strings and `time` as fractional unix seconds.
///
/// # Errors
///
/// Returns [`TransportError::Api`] if the body reports errors and
/// [`TransportError::MalformedFrame`] if it cannot be decoded.
pub fn parse_rest_page(body: &[u8], instrument_id: &str) -> Result<RestPage, TransportError> {
    let response: RestResponse =
        serde_json::from_slice(body).map_err(|e| TransportError::MalformedFrame(e.to_string()))?;
    if !response.error.is_empty() {
        return Err(TransportError::Api(response.error.join("; ")));
    }

    let mut result = response
        .result
        .ok_or_else(|| TransportError::MalformedFrame("response has no result".to_string()))?;
    let last = match result.remove("last") {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(TransportError::MalformedFrame("response has no cursor".to_string())),
    };
    let rows = result
        .into_iter()
        .find_map(|(_, value)| match value {
            Value::Array(rows) => Some(rows),
            _ => None,
        })
        .unwrap_or_default();

    let entries: Vec<_> = rows.iter().map(|row| rest_row(row, instrument_id)).collect();
    let max_event_time_ms = entries
        .iter()
        .filter_map(|entry| entry.as_ref().ok().map(Trade::event_time_ms))
        .max();

    Ok(RestPage {
        entries,
        last,
        max_event_time_ms,
    })
}

fn rest_row(row: &Value, instrument_id: &str) -> Result<Trade, DataShapeError> {
    let Value::Array(fields) = row else {
        return Err(DataShapeError::Malformed(row.to_string()));
    };
    let price = parse_number(fields.first(), "price")?;
    let quantity = parse_number(fields.get(1), "volume")?;
    let secs = parse_number(fields.get(2), "time")?;
    Trade::new(instrument_id, price, quantity, (secs * 1000.0).floor() as i64)
}

/// History replayed from a newline-delimited JSON file of trades.
///
/// Each line uses the trade wire format
/// (`{"product_id":..,"price":..,"quantity":..,"timestamp_ms":..}`).
#[derive(Debug, Clone)]
pub struct JsonlHistory {
    path: PathBuf,
}

impl JsonlHistory {
    /// Creates a history over the given file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TradeHistory for JsonlHistory {
    async fn fetch(
        &self,
        instrument_id: &str,
        range: TimeRange,
    ) -> Result<Vec<Result<Trade, DataShapeError>>, TransportError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let entries: Vec<_> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str::<RawTrade>(line)
                    .map_err(|e| DataShapeError::Malformed(e.to_string()))
                    .and_then(RawTrade::validate)
            })
            .filter(|entry| match entry {
                Ok(trade) => {
                    trade.instrument_id() == instrument_id && range.contains(trade.event_time_ms())
                }
                Err(_) => true,
            })
            .collect();
        info!(path = %self.path.display(), entries = entries.len(), "trade history loaded");
        Ok(entries)
    }
}
