use crate::core::credentials::CredentialStore;
use crate::core::registry::{Subscription, SubscriptionRegistry};
use crate::domain::model::{ChannelState, Envelope};
use crate::domain::ports::{Connector, Link};
use crate::utils::error::ClientError;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use url::Url;

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub url: Url,
    pub reconnect_interval: Duration,
    pub max_reconnect_attempts: u32,
}

impl ChannelConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            reconnect_interval: Duration::from_millis(5000),
            max_reconnect_attempts: 10,
        }
    }

    pub fn with_reconnect(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.reconnect_interval = interval;
        self.max_reconnect_attempts = max_attempts;
        self
    }
}

struct Status {
    state: ChannelState,
    attempts: u32,
    outbound: Option<mpsc::UnboundedSender<String>>,
    cycle: Option<CancellationToken>,
}

struct ChannelInner {
    config: ChannelConfig,
    connector: Arc<dyn Connector>,
    credentials: CredentialStore,
    registry: SubscriptionRegistry,
    status: Mutex<Status>,
    state_tx: watch::Sender<ChannelState>,
}

/// 單一 realtime 連線：有上限的自動重連，並把訊息分派給 topic 訂閱者
#[derive(Clone)]
pub struct EventChannel {
    inner: Arc<ChannelInner>,
}

enum Closed {
    Cancelled,
    Dropped,
}

impl EventChannel {
    pub fn new(
        config: ChannelConfig,
        connector: Arc<dyn Connector>,
        credentials: CredentialStore,
    ) -> Self {
        let (state_tx, _) = watch::channel(ChannelState::Disconnected);
        Self {
            inner: Arc::new(ChannelInner {
                config,
                connector,
                credentials,
                registry: SubscriptionRegistry::new(),
                status: Mutex::new(Status {
                    state: ChannelState::Disconnected,
                    attempts: 0,
                    outbound: None,
                    cycle: None,
                }),
                state_tx,
            }),
        }
    }

    pub fn state(&self) -> ChannelState {
        self.inner.lock().state
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.lock().attempts
    }

    pub fn state_changes(&self) -> watch::Receiver<ChannelState> {
        self.inner.state_tx.subscribe()
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.inner.registry
    }

    /// 重連次數用盡時回傳 `ChannelFailed`
    pub fn failure(&self) -> Option<ClientError> {
        let status = self.inner.lock();
        (status.state == ChannelState::Failed).then(|| ClientError::ChannelFailed {
            attempts: status.attempts,
        })
    }

    /// 沒有 access token 或連線週期已在進行時不做事
    pub fn connect(&self) {
        if self.inner.credentials.access_token().is_none() {
            tracing::debug!("🔌 No access token, realtime connect skipped");
            return;
        }

        let cycle = {
            let mut status = self.inner.lock();
            match status.state {
                ChannelState::Connecting | ChannelState::Connected | ChannelState::Reconnecting => {
                    return;
                }
                ChannelState::Disconnected => {}
                ChannelState::Failed => {
                    // 重新開始一律從 Disconnected 出發
                    self.inner.set_state(&mut status, ChannelState::Disconnected);
                }
            }
            let cycle = CancellationToken::new();
            status.attempts = 0;
            status.cycle = Some(cycle.clone());
            self.inner.set_state(&mut status, ChannelState::Connecting);
            cycle
        };

        tokio::spawn(run_cycle(self.inner.clone(), cycle));
    }

    /// 從任何狀態回到 Disconnected，並取消等待中的重連
    pub fn disconnect(&self) {
        let mut status = self.inner.lock();
        if let Some(cycle) = status.cycle.take() {
            cycle.cancel();
        }
        status.outbound = None;
        status.attempts = 0;
        if status.state != ChannelState::Disconnected {
            tracing::info!("🔌 Realtime channel disconnected");
        }
        self.inner.set_state(&mut status, ChannelState::Disconnected);
    }

    /// 未連線時直接丟棄，不排隊；回傳是否已交給 transport
    pub fn send(&self, topic: &str, payload: serde_json::Value) -> bool {
        let status = self.inner.lock();
        let outbound = match (&status.state, &status.outbound) {
            (ChannelState::Connected, Some(outbound)) => outbound,
            _ => {
                tracing::debug!("📭 Dropping '{}' message while {}", topic, status.state);
                return false;
            }
        };

        let frame = Envelope {
            topic: topic.to_string(),
            payload,
        };
        match serde_json::to_string(&frame) {
            Ok(text) => outbound.send(text).is_ok(),
            Err(e) => {
                tracing::warn!("⚠️ Could not encode '{}' message: {}", topic, e);
                false
            }
        }
    }

    pub fn subscribe<F>(&self, topic: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(&serde_json::Value) + Send + Sync + 'static,
    {
        self.inner.registry.subscribe(topic, callback)
    }
}

impl ChannelInner {
    fn lock(&self) -> std::sync::MutexGuard<'_, Status> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, status: &mut Status, state: ChannelState) {
        if status.state != state {
            tracing::debug!("🔌 Channel {} -> {}", status.state, state);
        }
        status.state = state;
        self.state_tx.send_replace(state);
    }

    /// 只在本週期尚未被取消時才轉移狀態
    fn transition(&self, cycle: &CancellationToken, state: ChannelState) -> bool {
        let mut status = self.lock();
        if cycle.is_cancelled() {
            return false;
        }
        self.set_state(&mut status, state);
        true
    }

    fn realtime_url(&self, token: &str) -> Url {
        let mut url = self.config.url.clone();
        url.query_pairs_mut().append_pair("token", token);
        url
    }

    fn dispatch_frame(&self, text: &str) {
        match serde_json::from_str::<Envelope>(text) {
            Ok(envelope) => {
                let delivered = self.registry.dispatch(&envelope.topic, &envelope.payload);
                tracing::debug!("📨 '{}' delivered to {} subscriber(s)", envelope.topic, delivered);
            }
            Err(e) => tracing::warn!("⚠️ Dropping malformed realtime message: {}", e),
        }
    }
}

async fn run_cycle(inner: Arc<ChannelInner>, cycle: CancellationToken) {
    loop {
        let token = match inner.credentials.access_token() {
            Some(token) => token,
            None => {
                tracing::info!("🔌 Access token gone, realtime channel stopped");
                let mut status = inner.lock();
                if !cycle.is_cancelled() {
                    status.cycle = None;
                    status.attempts = 0;
                    inner.set_state(&mut status, ChannelState::Disconnected);
                }
                return;
            }
        };

        let url = inner.realtime_url(&token);
        let opened = tokio::select! {
            _ = cycle.cancelled() => return,
            opened = inner.connector.open(&url) => opened,
        };

        match opened {
            Ok(link) => {
                if let Closed::Cancelled = pump(&inner, &cycle, link).await {
                    return;
                }
            }
            Err(e) => tracing::warn!("🔌 Realtime connect failed: {}", e),
        }

        {
            let mut status = inner.lock();
            if cycle.is_cancelled() {
                return;
            }
            status.outbound = None;
            if status.attempts >= inner.config.max_reconnect_attempts {
                tracing::error!(
                    "❌ Realtime channel failed after {} reconnect attempts",
                    status.attempts
                );
                status.cycle = None;
                inner.set_state(&mut status, ChannelState::Failed);
                return;
            }
            status.attempts += 1;
            tracing::info!(
                "🔄 Attempting to reconnect ({}/{})",
                status.attempts,
                inner.config.max_reconnect_attempts
            );
            inner.set_state(&mut status, ChannelState::Reconnecting);
        }

        tokio::select! {
            _ = cycle.cancelled() => return,
            _ = tokio::time::sleep(inner.config.reconnect_interval) => {}
        }

        if !inner.transition(&cycle, ChannelState::Connecting) {
            return;
        }
    }
}

async fn pump(inner: &ChannelInner, cycle: &CancellationToken, link: Link) -> Closed {
    let Link {
        outbound,
        mut inbound,
    } = link;

    {
        let mut status = inner.lock();
        if cycle.is_cancelled() {
            return Closed::Cancelled;
        }
        status.attempts = 0;
        status.outbound = Some(outbound);
        inner.set_state(&mut status, ChannelState::Connected);
    }
    tracing::info!("🔌 Realtime channel connected");

    loop {
        tokio::select! {
            _ = cycle.cancelled() => return Closed::Cancelled,
            frame = inbound.recv() => match frame {
                Some(text) => inner.dispatch_frame(&text),
                None => {
                    tracing::info!("🔌 Realtime channel closed by server");
                    return Closed::Dropped;
                }
            },
        }
    }
}
