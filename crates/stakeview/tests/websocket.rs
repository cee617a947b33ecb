//! Tendermint websocket source against a local node.

mod common;

use common::*;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use stakeview::subscription::{BlockSource, TendermintSource};
use stakeview::{
    BlockSubscription, ChainEvent, EventBus, MemoryUpstream, SubscriptionConfig, SubscriptionError,
    Topic,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::error::{Error as WsError, UrlError};
use tokio_tungstenite::tungstenite::Message;

fn new_block(id: &Value, height: &str) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "result": {
        "query": "tm.event='NewBlock'",
        "data": {"type": "tendermint/event/NewBlock", "value": {"block": {"header": {"height": height}}}}
    }})
}

/// Accept one websocket client, read its subscribe request, send the frames
/// `replies` builds from it, then close. Resolves to the request.
async fn node_once<F>(replies: F) -> (String, JoinHandle<Value>)
where
    F: FnOnce(&Value) -> Vec<Value> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(tcp).await.unwrap();
        let request: Value = match ws.next().await.unwrap().unwrap() {
            Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("unexpected frame {other:?}"),
        };
        for reply in replies(&request) {
            ws.send(Message::text(reply.to_string())).await.unwrap();
        }
        ws.close(None).await.ok();
        request
    });
    (format!("http://{addr}"), handle)
}

async fn within<T>(fut: impl std::future::Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("completed within timeout")
}

#[tokio::test]
async fn websocket_subscribe_waits_for_matching_ack() {
    let (url, node) = node_once(|request| {
        let id = &request["id"];
        vec![
            json!({"jsonrpc": "2.0", "id": "someone-else", "result": {}}),
            json!({"jsonrpc": "2.0", "id": id, "result": {}}),
            new_block(id, "4321"),
        ]
    })
    .await;
    let mut source = TendermintSource::new(&url).unwrap();
    within(source.subscribe()).await.unwrap();
    assert_eq!(within(source.next_height()).await.unwrap(), Some(4321));
    assert!(!matches!(within(source.next_height()).await, Ok(Some(_))));

    let request = node.await.unwrap();
    assert_eq!(request["method"], "subscribe");
    assert_eq!(request["params"]["query"], "tm.event='NewBlock'");
}

#[tokio::test]
async fn websocket_error_reply_is_rejected() {
    let (url, _node) = node_once(|request| {
        vec![json!({"jsonrpc": "2.0", "id": request["id"], "error": {"code": -32603, "message": "already subscribed"}})]
    })
    .await;
    let mut source = TendermintSource::new(&url).unwrap();
    match within(source.subscribe()).await {
        Err(SubscriptionError::Rejected(message)) => assert!(message.contains("already subscribed")),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn websocket_close_before_ack_is_an_error() {
    let (url, _node) = node_once(|_| Vec::new()).await;
    let mut source = TendermintSource::new(&url).unwrap();
    assert!(within(source.subscribe()).await.is_err());
}

#[tokio::test]
async fn websocket_next_height_requires_subscribe() {
    let mut source = TendermintSource::new("http://127.0.0.1:1").unwrap();
    assert!(matches!(
        source.next_height().await,
        Err(SubscriptionError::NotSubscribed)
    ));
}

#[tokio::test]
async fn websocket_heights_drive_the_block_pipeline() {
    let up = Arc::new(MemoryUpstream::new());
    seed_validators(&up);
    seed_block(&up);
    let bus = Arc::new(EventBus::default());
    let mut blocks = bus.subscribe(Topic::block_added(NETWORK)).unwrap();
    let subscription = BlockSubscription::new(
        Arc::new(client(&up)),
        Arc::clone(&bus),
        SubscriptionConfig {
            settle_delay: Duration::ZERO,
        },
    );
    let (url, _node) = node_once(|request| {
        let id = &request["id"];
        vec![json!({"jsonrpc": "2.0", "id": id, "result": {}}), new_block(id, "100")]
    })
    .await;
    let (_stop, shutdown) = broadcast::channel(1);

    let source = TendermintSource::new(&url).unwrap();
    within(subscription.run(source, shutdown)).await.unwrap();
    match blocks.try_recv().unwrap() {
        ChainEvent::BlockAdded { block, .. } => assert_eq!(block.height, 100),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn websocket_https_urls_negotiate_tls() {
    // a plain TCP peer that hangs up: the client must get as far as a TLS handshake
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((tcp, _)) = listener.accept().await {
            drop(tcp);
        }
    });
    let mut source = TendermintSource::new(&format!("https://{addr}")).unwrap();
    match within(source.subscribe()).await {
        Err(SubscriptionError::WebSocket(err)) => {
            assert!(
                !matches!(*err, WsError::Url(UrlError::TlsFeatureNotEnabled)),
                "tls support missing: {err}"
            );
        }
        other => panic!("unexpected {other:?}"),
    }
}
