//! Kraken endpoint and symbol helpers.

/// Default Kraken v2 websocket endpoint.
pub const KRAKEN_WS_URL: &str = "wss://ws.kraken.com/v2";

/// Default Kraken REST base URL.
pub const KRAKEN_REST_URL: &str = "https://api.kraken.com";

/// Path of the public trades endpoint.
pub const TRADES_PATH: &str = "/0/public/Trades";

/// Converts a websocket symbol into a REST pair name.
///
/// The websocket API uses `BTC/USD`; the REST API wants `XBTUSD`.
///
/// # Example
///
/// ```
/// use candela_source::url::rest_pair;
///
/// assert_eq!(rest_pair("BTC/USD"), "XBTUSD");
/// assert_eq!(rest_pair("eth/eur"), "ETHEUR");
/// ```
#[must_use]
pub fn rest_pair(symbol: &str) -> String {
    symbol
        .split('/')
        .map(|asset| match asset.to_uppercase().as_str() {
            "BTC" => "XBT".to_string(),
            other => other.to_string(),
        })
        .collect()
}

/// Builds the public trades URL for a pair.
///
/// `since` is either a unix timestamp in seconds or the `last` cursor of a
/// previous page.
#[must_use]
pub fn trades_url(base_url: &str, pair: &str, since: &str) -> String {
    format!(
        "{}{}?pair={}&since={}",
        base_url.trim_end_matches('/'),
        TRADES_PATH,
        pair,
        since
    )
}
