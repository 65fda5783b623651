use crate::adapters::{FileStore, WebSocketConnector};
use crate::app::designs::DesignService;
use crate::app::workflows::WorkflowClient;
use crate::config::ClientConfig;
use crate::core::channel::{ChannelConfig, EventChannel};
use crate::core::credentials::CredentialStore;
use crate::core::dispatcher::{ApiRequest, RequestDispatcher};
use crate::core::scoring::ScoringEngine;
use crate::domain::model::{Credentials, ScoreInput, ScoreResult, SessionEvent};
use crate::domain::ports::{Connector, DesignScorer, KeyValueStore};
use crate::utils::error::{ClientError, Result};
use crate::utils::validation::{self, HTTP_SCHEMES, WS_SCHEMES};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// 應用程式的組裝點：每個服務只建立一次，之後以參照傳給使用端
pub struct Session {
    credentials: CredentialStore,
    dispatcher: RequestDispatcher,
    channel: EventChannel,
    workflows: Option<WorkflowClient>,
    designs: DesignService,
    scoring: ScoringEngine,
    expiry_watch: JoinHandle<()>,
}

impl Session {
    /// 以檔案持久層與 WebSocket 連線建立 session
    pub async fn from_config(config: &ClientConfig) -> Result<Self> {
        let persistence: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(config.storage_path()));
        let connector: Arc<dyn Connector> =
            Arc::new(WebSocketConnector::new(config.connect_timeout()));
        Self::with_ports(config, persistence, connector).await
    }

    pub async fn with_ports(
        config: &ClientConfig,
        persistence: Arc<dyn KeyValueStore>,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        let credentials = CredentialStore::restore(persistence).await?;

        let dispatcher = RequestDispatcher::new(
            config.api_base_url(),
            config.request_timeout(),
            credentials.clone(),
        )?;

        let realtime_url =
            validation::validate_url("realtime.url", config.realtime_url(), WS_SCHEMES)?;
        let channel = EventChannel::new(
            ChannelConfig::new(realtime_url).with_reconnect(
                config.reconnect_interval(),
                config.max_reconnect_attempts(),
            ),
            connector,
            credentials.clone(),
        );

        let workflows = match &config.workflow {
            Some(workflow) => {
                validation::validate_url("workflow.webhook_url", &workflow.webhook_url, HTTP_SCHEMES)?;
                Some(WorkflowClient::new(
                    &workflow.webhook_url,
                    workflow.api_key.clone(),
                    config.request_timeout(),
                )?)
            }
            None => None,
        };

        let expiry_watch = spawn_expiry_watch(&credentials, channel.clone());
        let designs = DesignService::new(dispatcher.clone());

        Ok(Self {
            credentials,
            dispatcher,
            channel,
            workflows,
            designs,
            scoring: ScoringEngine::new(),
            expiry_watch,
        })
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    pub fn channel(&self) -> &EventChannel {
        &self.channel
    }

    pub fn workflows(&self) -> Option<&WorkflowClient> {
        self.workflows.as_ref()
    }

    pub fn designs(&self) -> &DesignService {
        &self.designs
    }

    pub fn scoring(&self) -> &ScoringEngine {
        &self.scoring
    }

    /// 已有保存的 session 時直接連上 realtime channel
    pub fn initialize(&self) {
        if self.is_authenticated() {
            tracing::info!("🔑 Resuming saved session");
            self.channel.connect();
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_authenticated()
    }

    /// realtime 重連用盡時回傳 `ChannelFailed`
    pub fn offline(&self) -> Option<ClientError> {
        self.channel.failure()
    }

    pub fn current_user(&self) -> Option<Value> {
        self.credentials.user()
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Value> {
        let request =
            ApiRequest::post("/auth/login", json!({ "email": email, "password": password }))
                .anonymous();
        self.authenticate(&request).await
    }

    pub async fn register(&self, user_data: Value) -> Result<Value> {
        let request = ApiRequest::post("/auth/register", user_data).anonymous();
        self.authenticate(&request).await
    }

    pub async fn logout(&self) {
        self.dispatcher.wait_for_refresh().await;
        self.channel.disconnect();
        self.credentials.clear().await;
        tracing::info!("👋 Logged out");
    }

    pub async fn update_profile(&self, profile: Value) -> Result<Value> {
        let data: Value = self
            .dispatcher
            .send_json(&ApiRequest::put("/auth/profile", profile))
            .await?;

        if let Some(user) = data.get("user").filter(|u| !u.is_null()) {
            self.credentials.set_user(user.clone()).await;
        }
        Ok(data)
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<Value> {
        let request = ApiRequest::post("/auth/forgot-password", json!({ "email": email })).anonymous();
        self.dispatcher.send_json(&request).await
    }

    pub async fn reset_password(&self, token: &str, password: &str) -> Result<Value> {
        let request = ApiRequest::post(
            "/auth/reset-password",
            json!({ "token": token, "password": password }),
        )
        .anonymous();
        self.dispatcher.send_json(&request).await
    }

    /// workflow runner 優先，其次是已登入時的後端分析，最後才用本地引擎
    pub async fn score_design(&self, input: &ScoreInput) -> Result<ScoreResult> {
        self.scorer().score_design(input).await
    }

    fn scorer(&self) -> &dyn DesignScorer {
        match &self.workflows {
            Some(workflows) => workflows,
            None if self.is_authenticated() => &self.designs,
            None => &self.scoring,
        }
    }

    async fn authenticate(&self, request: &ApiRequest) -> Result<Value> {
        self.dispatcher.wait_for_refresh().await;
        let data: Value = self.dispatcher.send_json(request).await?;

        let access_token = data.get("accessToken").and_then(Value::as_str);
        match access_token {
            Some(access_token) => {
                let refresh_token = data
                    .get("refreshToken")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                let user = data.get("user").filter(|u| !u.is_null()).cloned();

                self.credentials
                    .set(
                        Credentials {
                            access_token: Some(access_token.to_string()),
                            refresh_token,
                        },
                        user,
                    )
                    .await;
                tracing::info!("✅ Signed in via {}", request.path);
                self.channel.connect();
            }
            None => {
                tracing::warn!("⚠️ {} response carried no access token", request.path);
            }
        }
        Ok(data)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.expiry_watch.abort();
        self.channel.disconnect();
    }
}

fn spawn_expiry_watch(credentials: &CredentialStore, channel: EventChannel) -> JoinHandle<()> {
    let mut events = credentials.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::Expired) => {
                    tracing::warn!("🔒 Session expired, please sign in again");
                    channel.disconnect();
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Session event watcher skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .field("channel", &self.channel.state())
            .field("workflows", &self.workflows.is_some())
            .finish()
    }
}
