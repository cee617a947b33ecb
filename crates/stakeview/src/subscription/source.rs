//! New-block event sources.

use super::SubscriptionError;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};
use url::Url;

const NEW_BLOCK_QUERY: &str = "tm.event='NewBlock'";
const SUBSCRIBE_ID: &str = "stakeview-new-block";

/// Stream of new-block heights for one network.
#[async_trait]
pub trait BlockSource: Send {
    /// Connect and subscribe; returns once the node acknowledged.
    async fn subscribe(&mut self) -> Result<(), SubscriptionError>;

    /// Height of the next new block; `None` once the stream has ended.
    async fn next_height(&mut self) -> Result<Option<u64>, SubscriptionError>;
}

/// Websocket endpoint of a Tendermint RPC URL (`http://host:26657` → `ws://host:26657/websocket`).
pub fn websocket_url(rpc_url: &str) -> Result<Url, SubscriptionError> {
    let mut url = Url::parse(rpc_url).map_err(|e| SubscriptionError::InvalidUrl(format!("{rpc_url}: {e}")))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(SubscriptionError::InvalidUrl(format!("unsupported scheme {other}"))),
    };
    url.set_scheme(scheme)
        .map_err(|()| SubscriptionError::InvalidUrl(rpc_url.to_string()))?;
    if !url.path().ends_with("/websocket") {
        let path = format!("{}/websocket", url.path().trim_end_matches('/'));
        url.set_path(&path);
    }
    Ok(url)
}

/// Height carried by a `NewBlock` event; `None` for any other message.
pub fn event_height(message: &Value) -> Option<u64> {
    let height = message.pointer("/result/data/value/block/header/height")?;
    match height {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Tendermint RPC `subscribe` over a websocket.
pub struct TendermintSource {
    url: Url,
    stream: Option<WsStream>,
}

impl TendermintSource {
    pub fn new(rpc_url: &str) -> Result<Self, SubscriptionError> {
        Ok(Self {
            url: websocket_url(rpc_url)?,
            stream: None,
        })
    }

    async fn next_json(stream: &mut WsStream) -> Result<Option<Value>, SubscriptionError> {
        while let Some(message) = stream.next().await {
            match message? {
                Message::Text(text) => return Ok(Some(serde_json::from_str(text.as_str())?)),
                Message::Close(frame) => {
                    debug!(?frame, "websocket closed by node");
                    return Ok(None);
                }
                _ => {}
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl BlockSource for TendermintSource {
    async fn subscribe(&mut self) -> Result<(), SubscriptionError> {
        let (mut stream, _) = connect_async(self.url.as_str()).await?;
        let request = json!({
            "jsonrpc": "2.0",
            "method": "subscribe",
            "id": SUBSCRIBE_ID,
            "params": { "query": NEW_BLOCK_QUERY },
        });
        stream.send(Message::text(request.to_string())).await?;
        loop {
            let Some(reply) = Self::next_json(&mut stream).await? else {
                return Err(SubscriptionError::Closed);
            };
            if reply.get("id").and_then(Value::as_str) != Some(SUBSCRIBE_ID) {
                continue;
            }
            if let Some(error) = reply.get("error") {
                return Err(SubscriptionError::Rejected(error.to_string()));
            }
            break;
        }
        info!(url = %self.url, "subscribed to new blocks");
        self.stream = Some(stream);
        Ok(())
    }

    async fn next_height(&mut self) -> Result<Option<u64>, SubscriptionError> {
        let stream = self.stream.as_mut().ok_or(SubscriptionError::NotSubscribed)?;
        while let Some(message) = Self::next_json(stream).await? {
            if let Some(height) = event_height(&message) {
                return Ok(Some(height));
            }
        }
        Ok(None)
    }
}

/// Heights pushed through a channel; for embedding and tests.
pub struct ChannelSource {
    heights: mpsc::Receiver<u64>,
}

impl ChannelSource {
    pub fn new(heights: mpsc::Receiver<u64>) -> Self {
        Self { heights }
    }
}

#[async_trait]
impl BlockSource for ChannelSource {
    async fn subscribe(&mut self) -> Result<(), SubscriptionError> {
        Ok(())
    }

    async fn next_height(&mut self) -> Result<Option<u64>, SubscriptionError> {
        Ok(self.heights.recv().await)
    }
}
