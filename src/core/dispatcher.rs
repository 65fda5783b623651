use crate::core::credentials::CredentialStore;
use crate::utils::error::{ClientError, Result};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const REFRESH_PATH: &str = "/auth/refresh";

/// 一個邏輯 API 呼叫；憑證由 dispatcher 注入，不由呼叫端提供
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub authenticated: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            authenticated: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn put(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::PUT, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// 不帶 bearer，也不觸發 refresh（登入、註冊）
    pub fn anonymous(mut self) -> Self {
        self.authenticated = false;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        if self.body.trim().is_empty() {
            return Ok(serde_json::from_value(serde_json::Value::Null)?);
        }
        Ok(serde_json::from_str(&self.body)?)
    }

    /// 非 2xx 回應轉為 `Http` 錯誤，訊息取自 body 的 `message`
    pub fn into_error(self) -> ClientError {
        let message = match serde_json::from_str::<serde_json::Value>(&self.body) {
            Ok(value) => value
                .get("message")
                .and_then(|m| m.as_str())
                .filter(|m| !m.is_empty())
                .unwrap_or("Something went wrong")
                .to_string(),
            Err(_) => "Network error".to_string(),
        };
        ClientError::Http {
            status: self.status.as_u16(),
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RefreshOutcome {
    Refreshed(String),
    Failed,
}

type RefreshFuture = Shared<BoxFuture<'static, RefreshOutcome>>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

struct DispatcherInner {
    client: Client,
    base_url: String,
    credentials: CredentialStore,
    inflight: Mutex<Option<RefreshFuture>>,
    refresh_calls: AtomicU64,
}

/// 帶憑證的 HTTP 呼叫；401 時所有並行呼叫端共用同一次 refresh
#[derive(Clone)]
pub struct RequestDispatcher {
    inner: Arc<DispatcherInner>,
}

impl RequestDispatcher {
    pub fn new(base_url: &str, timeout: Duration, credentials: CredentialStore) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, credentials))
    }

    pub fn with_client(client: Client, base_url: &str, credentials: CredentialStore) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
                credentials,
                inflight: Mutex::new(None),
                refresh_calls: AtomicU64::new(0),
            }),
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.inner.credentials
    }

    /// 目前為止實際送出的 refresh 次數
    pub fn refresh_count(&self) -> u64 {
        self.inner.refresh_calls.load(Ordering::SeqCst)
    }

    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        if !request.authenticated {
            return self.execute(request, None).await;
        }

        let snapshot = self.inner.credentials.snapshot();
        let response = self
            .execute(request, snapshot.credentials.access_token.as_deref())
            .await?;

        if response.status != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::debug!(
            "🔐 {} {} unauthorized (epoch {}), waiting for refresh",
            request.method,
            request.path,
            snapshot.epoch
        );

        match self.refresh_after(snapshot.epoch).await {
            // 只重送一次；即使又是 401 也直接回傳
            RefreshOutcome::Refreshed(token) => self.execute(request, Some(&token)).await,
            RefreshOutcome::Failed => Err(ClientError::AuthExpired),
        }
    }

    pub async fn send_with_cancel(
        &self,
        request: &ApiRequest,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse> {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("🛑 {} {} cancelled", request.method, request.path);
                Err(ClientError::Cancelled)
            }
            response = self.send(request) => response,
        }
    }

    pub async fn send_json<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T> {
        let response = self.send(request).await?;
        if !response.is_success() {
            return Err(response.into_error());
        }
        response.json()
    }

    /// 等待進行中的 refresh 結束（登入/登出前呼叫，避免與 refresh 同時寫入憑證）
    pub async fn wait_for_refresh(&self) {
        let pending = self.lock_inflight().clone();
        if let Some(pending) = pending {
            pending.await;
        }
    }

    fn lock_inflight(&self) -> std::sync::MutexGuard<'_, Option<RefreshFuture>> {
        self.inner
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn refresh_after(&self, stale_epoch: u64) -> RefreshOutcome {
        let pending = {
            let mut slot = self.lock_inflight();
            match slot.as_ref() {
                Some(existing) => existing.clone(),
                None => {
                    let current = self.inner.credentials.snapshot();
                    if current.epoch != stale_epoch {
                        // 憑證在這個請求送出後已更新過
                        return match current.credentials.access_token {
                            Some(token) => RefreshOutcome::Refreshed(token),
                            None => RefreshOutcome::Failed,
                        };
                    }
                    // refresh 在獨立 task 執行，等待端全部取消也會跑完並寫回憑證
                    let task = tokio::spawn(run_refresh(self.inner.clone()));
                    let inner = self.inner.clone();
                    let refresh = async move {
                        task.await.unwrap_or_else(|e| {
                            tracing::error!("❌ Token refresh task aborted: {}", e);
                            inner
                                .inflight
                                .lock()
                                .unwrap_or_else(PoisonError::into_inner)
                                .take();
                            RefreshOutcome::Failed
                        })
                    }
                    .boxed()
                    .shared();
                    *slot = Some(refresh.clone());
                    refresh
                }
            }
        };
        pending.await
    }

    async fn execute(&self, request: &ApiRequest, token: Option<&str>) -> Result<ApiResponse> {
        let url = format!("{}{}", self.inner.base_url, request.path);
        let mut builder = self.inner.client.request(request.method.clone(), &url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!("📡 API error ({} {}): {}", request.method, request.path, e);
            ClientError::Network(e)
        })?;
        let status = response.status();
        let body = response.text().await?;

        tracing::debug!("📡 {} {} -> {}", request.method, request.path, status);
        Ok(ApiResponse { status, body })
    }
}

async fn run_refresh(inner: Arc<DispatcherInner>) -> RefreshOutcome {
    inner.refresh_calls.fetch_add(1, Ordering::SeqCst);
    tracing::info!("🔄 Refreshing access token");

    let outcome = match call_refresh(&inner).await {
        Ok(refreshed) => {
            inner
                .credentials
                .apply_refresh(refreshed.access_token.clone(), refreshed.refresh_token)
                .await;
            tracing::info!("✅ Access token refreshed");
            RefreshOutcome::Refreshed(refreshed.access_token)
        }
        Err(e) => {
            tracing::warn!("❌ Token refresh failed: {}", e);
            inner.credentials.expire().await;
            RefreshOutcome::Failed
        }
    };

    inner
        .inflight
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    outcome
}

async fn call_refresh(inner: &DispatcherInner) -> Result<RefreshResponse> {
    let refresh_token = inner
        .credentials
        .refresh_token()
        .ok_or(ClientError::AuthExpired)?;

    let response = inner
        .client
        .post(format!("{}{}", inner.base_url, REFRESH_PATH))
        .json(&serde_json::json!({ "refreshToken": refresh_token }))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiResponse { status, body }.into_error());
    }

    Ok(response.json::<RefreshResponse>().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builders() {
        let request = ApiRequest::get("/designs").with_query("status", "active");
        assert_eq!(request.method, Method::GET);
        assert!(request.authenticated);
        assert_eq!(request.query, vec![("status".to_string(), "active".to_string())]);

        let login = ApiRequest::post("/auth/login", serde_json::json!({"email": "a@b.c"})).anonymous();
        assert!(!login.authenticated);
        assert!(login.body.is_some());
    }

    #[test]
    fn test_into_error_uses_message_field() {
        let response = ApiResponse {
            status: StatusCode::BAD_REQUEST,
            body: r#"{"message":"Title is required"}"#.to_string(),
        };
        match response.into_error() {
            ClientError::Http { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Title is required");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_into_error_fallback_messages() {
        let no_message = ApiResponse {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "{}".to_string(),
        };
        assert!(matches!(
            no_message.into_error(),
            ClientError::Http { ref message, .. } if message == "Something went wrong"
        ));

        let not_json = ApiResponse {
            status: StatusCode::BAD_GATEWAY,
            body: "<html>bad gateway</html>".to_string(),
        };
        assert!(matches!(
            not_json.into_error(),
            ClientError::Http { ref message, .. } if message == "Network error"
        ));
    }

    #[test]
    fn test_empty_body_decodes_as_null() {
        let response = ApiResponse {
            status: StatusCode::NO_CONTENT,
            body: String::new(),
        };
        let value: serde_json::Value = response.json().unwrap();
        assert!(value.is_null());
    }
}
