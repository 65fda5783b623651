use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use url::Url;
use zurfy_link::domain::model::{ChannelState, Credentials};
use zurfy_link::domain::ports::Connector;
use zurfy_link::{
    ChannelConfig, ClientError, CredentialStore, EventChannel, MemoryStore, WebSocketConnector,
};

/// 啟動只接受一條連線的 echo server；`greeting` 會在握手後先送出
async fn spawn_echo_server(greeting: Option<String>) -> Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
            return;
        };
        if let Some(greeting) = greeting {
            if ws.send(Message::Text(greeting)).await.is_err() {
                return;
            }
        }
        while let Some(Ok(message)) = ws.next().await {
            match message {
                Message::Text(_) => {
                    if ws.send(message).await.is_err() {
                        break;
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    Ok(addr)
}

#[tokio::test]
async fn test_link_round_trips_text_frames() -> Result<()> {
    let addr = spawn_echo_server(None).await?;
    let connector = WebSocketConnector::default();

    let mut link = connector
        .open(&Url::parse(&format!("ws://{addr}/?token=abc"))?)
        .await?;
    link.outbound.send("hello".to_string())?;

    let echoed = tokio::time::timeout(Duration::from_secs(5), link.inbound.recv()).await?;
    assert_eq!(echoed.as_deref(), Some("hello"));
    Ok(())
}

#[tokio::test]
async fn test_server_close_ends_inbound() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Ok((stream, _)) = listener.accept().await {
            if let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await {
                let _ = ws.close(None).await;
            }
        }
    });

    let mut link = WebSocketConnector::default()
        .open(&Url::parse(&format!("ws://{addr}"))?)
        .await?;

    let closed = tokio::time::timeout(Duration::from_secs(5), link.inbound.recv()).await?;
    assert!(closed.is_none());
    Ok(())
}

#[tokio::test]
async fn test_refused_connection_is_transport_error() -> Result<()> {
    // 先綁定再釋放，取得一個目前沒人監聽的 port
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        listener.local_addr()?
    };

    let result = WebSocketConnector::new(Duration::from_secs(2))
        .open(&Url::parse(&format!("ws://{addr}"))?)
        .await;

    assert!(matches!(result, Err(ClientError::Transport { .. })));
    Ok(())
}

#[tokio::test]
async fn test_event_channel_over_websocket() -> Result<()> {
    let greeting = json!({"type": "notification", "payload": {"text": "welcome"}}).to_string();
    let addr = spawn_echo_server(Some(greeting)).await?;

    let credentials = CredentialStore::new(Arc::new(MemoryStore::new()));
    credentials.set(Credentials::new("access", "refresh"), None).await;

    let config = ChannelConfig::new(Url::parse(&format!("ws://{addr}"))?)
        .with_reconnect(Duration::from_millis(50), 1);
    let channel = EventChannel::new(config, Arc::new(WebSocketConnector::default()), credentials);

    let (seen_tx, mut seen) = mpsc::unbounded_channel();
    let notifications = seen_tx.clone();
    let _notification = channel.subscribe("notification", move |payload| {
        let _ = notifications.send(("notification", payload.clone()));
    });
    let _echo = channel.subscribe("design.watch", move |payload| {
        let _ = seen_tx.send(("design.watch", payload.clone()));
    });

    channel.connect();

    let first = tokio::time::timeout(Duration::from_secs(5), seen.recv()).await?;
    assert_eq!(first, Some(("notification", json!({"text": "welcome"}))));

    let mut states = channel.state_changes();
    tokio::time::timeout(
        Duration::from_secs(5),
        states.wait_for(|s| *s == ChannelState::Connected),
    )
    .await??;

    assert!(channel.send("design.watch", json!({"id": "d1"})));
    let echoed = tokio::time::timeout(Duration::from_secs(5), seen.recv()).await?;
    assert_eq!(echoed, Some(("design.watch", json!({"id": "d1"}))));

    channel.disconnect();
    assert_eq!(channel.state(), ChannelState::Disconnected);
    Ok(())
}
