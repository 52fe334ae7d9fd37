//! Live trade feed over the Kraken v2 websocket API.

use std::time::Duration;

use async_trait::async_trait;
use candela_types::{Result, Trade};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use crate::frame::{Frame, parse_frame, subscribe_message};
use crate::url::KRAKEN_WS_URL;
use crate::{TradeSource, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Configuration for the live feed.
#[derive(Debug, Clone)]
pub struct LiveFeedConfig {
    /// Websocket endpoint.
    pub url: String,
    /// Symbol to subscribe to (e.g., "BTC/USD").
    pub instrument_id: String,
    /// Longest a single `get_trades` call waits for a frame.
    pub poll_interval: Duration,
    /// Longest the subscription handshake may take.
    pub handshake_timeout: Duration,
}

impl Default for LiveFeedConfig {
    fn default() -> Self {
        Self {
            url: KRAKEN_WS_URL.to_string(),
            instrument_id: "BTC/USD".to_string(),
            poll_interval: Duration::from_secs(1),
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

impl LiveFeedConfig {
    /// Creates a configuration for the given symbol on the default endpoint.
    #[must_use]
    pub fn new(instrument_id: impl Into<String>) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            ..Self::default()
        }
    }

    /// Sets the websocket endpoint.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Sets the poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Sets the handshake timeout.
    #[must_use]
    pub const fn with_handshake_timeout(mut self, handshake_timeout: Duration) -> Self {
        self.handshake_timeout = handshake_timeout;
        self
    }
}

/// Live trade source backed by a websocket subscription.
///
/// [`get_trades`](TradeSource::get_trades) waits at most the poll interval for
/// the next frame and returns an empty batch on timeout or on control frames
/// such as heartbeats.
pub struct KrakenLiveSource {
    config: LiveFeedConfig,
    ws: Option<WsStream>,
    rejected: u64,
}

impl std::fmt::Debug for KrakenLiveSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KrakenLiveSource")
            .field("config", &self.config)
            .field("connected", &self.ws.is_some())
            .field("rejected", &self.rejected)
            .finish()
    }
}

impl KrakenLiveSource {
    /// Connects to the feed and completes the subscription handshake.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails, the subscription is rejected,
    /// or no acknowledgement arrives within the handshake timeout.
    pub async fn connect(config: LiveFeedConfig) -> std::result::Result<Self, TransportError> {
        let ws = open(&config).await?;
        Ok(Self {
            config,
            ws: Some(ws),
            rejected: 0,
        })
    }

    /// Returns the feed configuration.
    #[must_use]
    pub const fn config(&self) -> &LiveFeedConfig {
        &self.config
    }

    /// Returns true while the socket is open.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.ws.is_some()
    }

    async fn send(&mut self, message: Message) -> std::result::Result<(), TransportError> {
        let ws = self.ws.as_mut().ok_or(TransportError::Closed)?;
        ws.send(message).await?;
        Ok(())
    }

    fn handle_text(&mut self, text: &str) -> std::result::Result<Vec<Trade>, TransportError> {
        match parse_frame(text)? {
            Frame::Heartbeat => {
                debug!("heartbeat received");
                Ok(Vec::new())
            }
            Frame::Trades(entries) => {
                let mut trades = Vec::with_capacity(entries.len());
                for entry in entries {
                    match entry {
                        Ok(trade) => trades.push(trade),
                        Err(e) => {
                            self.rejected += 1;
                            warn!(error = %e, "dropping invalid trade");
                        }
                    }
                }
                trades.sort_by_key(Trade::event_time_ms);
                debug!(count = trades.len(), "trades received");
                Ok(trades)
            }
            frame => {
                debug!(?frame, "ignoring control frame");
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl TradeSource for KrakenLiveSource {
    async fn get_trades(&mut self) -> Result<Vec<Trade>> {
        let poll_interval = self.config.poll_interval;
        let next = {
            let ws = self.ws.as_mut().ok_or(TransportError::Closed)?;
            match tokio::time::timeout(poll_interval, ws.next()).await {
                Ok(next) => next,
                Err(_) => return Ok(Vec::new()),
            }
        };

        match next {
            Some(Ok(Message::Text(text))) => Ok(self.handle_text(&text)?),
            Some(Ok(Message::Ping(payload))) => {
                self.send(Message::Pong(payload)).await?;
                Ok(Vec::new())
            }
            Some(Ok(Message::Close(frame))) => {
                warn!(?frame, "live feed closed by remote");
                self.ws = None;
                Err(TransportError::Closed.into())
            }
            Some(Ok(_)) => Ok(Vec::new()),
            Some(Err(e)) => {
                self.ws = None;
                Err(TransportError::from(e).into())
            }
            None => {
                self.ws = None;
                Err(TransportError::Closed.into())
            }
        }
    }

    fn is_done(&self) -> bool {
        false
    }

    fn rejected_trades(&self) -> u64 {
        self.rejected
    }

    async fn reconnect(&mut self) -> Result<()> {
        if let Some(mut ws) = self.ws.take() {
            if let Err(e) = ws.close(None).await {
                debug!(error = %e, "closing stale connection failed");
            }
        }
        let ws = open(&self.config).await?;
        self.ws = Some(ws);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut ws) = self.ws.take() {
            info!(instrument = %self.config.instrument_id, "closing live feed");
            match ws.close(None).await {
                Ok(())
                | Err(
                    tokio_tungstenite::tungstenite::Error::ConnectionClosed
                    | tokio_tungstenite::tungstenite::Error::AlreadyClosed,
                ) => {}
                Err(e) => return Err(TransportError::from(e).into()),
            }
        }
        Ok(())
    }
}

/// Opens the socket, subscribes and waits for the acknowledgement.
async fn open(config: &LiveFeedConfig) -> std::result::Result<WsStream, TransportError> {
    info!(url = %config.url, instrument = %config.instrument_id, "connecting to live trade feed");
    let (mut ws, _response) = connect_async(config.url.as_str()).await?;

    ws.send(Message::Text(subscribe_message(&config.instrument_id)))
        .await?;

    let timeout_ms = u64::try_from(config.handshake_timeout.as_millis()).unwrap_or(u64::MAX);
    tokio::time::timeout(config.handshake_timeout, await_subscription(&mut ws))
        .await
        .map_err(|_| TransportError::HandshakeTimeout(timeout_ms))??;

    info!(instrument = %config.instrument_id, "subscribed to trade channel");
    Ok(ws)
}

/// Reads frames until the subscribe acknowledgement, discarding the rest.
async fn await_subscription(ws: &mut WsStream) -> std::result::Result<(), TransportError> {
    while let Some(message) = ws.next().await {
        match message? {
            Message::Text(text) => match parse_frame(&text)? {
                Frame::SubscribeAck { success: true, .. } => return Ok(()),
                Frame::SubscribeAck {
                    success: false,
                    error,
                } => {
                    return Err(TransportError::SubscriptionRejected(
                        error.unwrap_or_else(|| "no reason given".to_string()),
                    ));
                }
                frame => debug!(?frame, "discarding handshake frame"),
            },
            Message::Ping(payload) => ws.send(Message::Pong(payload)).await?,
            Message::Close(_) => return Err(TransportError::Closed),
            _ => {}
        }
    }
    Err(TransportError::Closed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    /// Serves one websocket client: acknowledges the subscription and then
    /// sends the scripted frames.
    async fn serve(ack: &'static str, frames: Vec<&'static str>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();

            let Some(Ok(Message::Text(request))) = ws.next().await else {
                return;
            };
            assert!(request.contains("\"subscribe\""));

            ws.send(Message::Text(
                r#"{"channel":"status","type":"update","data":[{"system":"online"}]}"#.to_string(),
            ))
            .await
            .unwrap();
            ws.send(Message::Text(ack.to_string())).await.unwrap();
            for frame in frames {
                ws.send(Message::Text(frame.to_string())).await.unwrap();
            }
            // Keep the socket open until the client goes away.
            while let Some(Ok(_)) = ws.next().await {}
        });

        format!("ws://{addr}")
    }

    const ACK: &str = r#"{"method":"subscribe","result":{"channel":"trade","symbol":"BTC/USD"},"success":true}"#;

    fn config(url: String) -> LiveFeedConfig {
        LiveFeedConfig::new("BTC/USD")
            .with_url(url)
            .with_poll_interval(Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_handshake_and_trades() {
        let url = serve(
            ACK,
            vec![
                r#"{"channel":"heartbeat"}"#,
                r#"{"channel":"trade","type":"update","data":[
                    {"symbol":"BTC/USD","price":101.0,"qty":1.0,"timestamp":"2024-01-01T00:00:01.500Z"},
                    {"symbol":"BTC/USD","price":100.0,"qty":2.0,"timestamp":"2024-01-01T00:00:01Z"},
                    {"symbol":"BTC/USD","price":-1.0,"qty":2.0,"timestamp":"2024-01-01T00:00:02Z"}
                ]}"#,
            ],
        )
        .await;

        let mut source = KrakenLiveSource::connect(config(url)).await.unwrap();
        assert!(source.is_connected());

        assert!(source.get_trades().await.unwrap().is_empty());

        let trades = source.get_trades().await.unwrap();
        assert_eq!(trades.len(), 2);
        assert!(trades[0].event_time_ms() <= trades[1].event_time_ms());
        assert_eq!(source.rejected_trades(), 1);
        assert!(!source.is_done());

        source.close().await.unwrap();
        assert!(!source.is_connected());
    }

    #[tokio::test]
    async fn test_equal_timestamps_keep_arrival_order() {
        let url = serve(
            ACK,
            vec![
                r#"{"channel":"trade","type":"update","data":[
                    {"symbol":"BTC/USD","price":100.0,"qty":1.0,"timestamp":"2024-01-01T00:00:05Z"},
                    {"symbol":"BTC/USD","price":90.0,"qty":2.0,"timestamp":"2024-01-01T00:00:05Z"},
                    {"symbol":"BTC/USD","price":95.0,"qty":1.0,"timestamp":"2024-01-01T00:00:04Z"}
                ]}"#,
            ],
        )
        .await;

        let mut source = KrakenLiveSource::connect(config(url)).await.unwrap();
        let trades = source.get_trades().await.unwrap();
        let prices: Vec<f64> = trades.iter().map(Trade::price).collect();
        assert_eq!(prices, vec![95.0, 100.0, 90.0]);
    }

    #[tokio::test]
    async fn test_heartbeat_only_feed() {
        let url = serve(ACK, vec![r#"{"channel":"heartbeat"}"#; 5]).await;
        let mut source = KrakenLiveSource::connect(config(url)).await.unwrap();

        for _ in 0..8 {
            assert!(source.get_trades().await.unwrap().is_empty());
        }
        assert_eq!(source.rejected_trades(), 0);
    }

    #[tokio::test]
    async fn test_subscription_rejected() {
        let url = serve(
            r#"{"method":"subscribe","error":"Currency pair not supported","success":false}"#,
            vec![],
        )
        .await;

        let err = KrakenLiveSource::connect(config(url)).await.unwrap_err();
        assert!(matches!(err, TransportError::SubscriptionRejected(_)));
    }

    #[tokio::test]
    async fn test_malformed_frame_is_transport_error() {
        let url = serve(ACK, vec!["garbage"]).await;
        let mut source = KrakenLiveSource::connect(config(url)).await.unwrap();

        let err = source.get_trades().await.unwrap_err();
        assert!(err.is_transport());
    }
}
