use crate::domain::ports::{Connector, Link};
use crate::utils::error::{ClientError, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

/// 以 tokio-tungstenite 實作的 realtime 連線
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    connect_timeout: Duration,
}

impl WebSocketConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for WebSocketConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn open(&self, url: &Url) -> Result<Link> {
        let (ws_stream, response) = timeout(self.connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| ClientError::Transport {
                message: "WebSocket connect timeout".to_string(),
            })?
            .map_err(|e| ClientError::Transport {
                message: format!("WebSocket connect failed: {e}"),
            })?;

        tracing::debug!("🔌 WebSocket handshake status: {}", response.status());

        let (mut write, mut read) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();

        // 寫出：outbound sender 被 drop 時送出 close frame
        tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                if let Err(e) = write.send(Message::Text(text)).await {
                    tracing::debug!("🔌 WebSocket write failed: {}", e);
                    break;
                }
            }
            let _ = write.close().await;
        });

        // 讀入：對端關閉或出錯時結束，inbound 隨之回傳 None
        tokio::spawn(async move {
            while let Some(message) = read.next().await {
                let text = match message {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Binary(data)) => String::from_utf8_lossy(&data).into_owned(),
                    Ok(Message::Close(frame)) => {
                        tracing::debug!("🔌 WebSocket closed by peer: {:?}", frame);
                        break;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::warn!("🔌 WebSocket read error: {}", e);
                        break;
                    }
                };
                if inbound_tx.send(text).is_err() {
                    break;
                }
            }
        });

        Ok(Link {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}
