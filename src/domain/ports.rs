use crate::domain::model::{ScoreInput, ScoreResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

/// 跨重新載入保存狀態用的 key-value 儲存
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// 一條已開啟的 realtime 連線。
///
/// `inbound` 回傳 `None` 代表連線已關閉；drop `outbound` 會關閉連線。
pub struct Link {
    pub outbound: mpsc::UnboundedSender<String>,
    pub inbound: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, url: &Url) -> Result<Link>;
}

/// 本地引擎與遠端 workflow runner 共用的評分介面
#[async_trait]
pub trait DesignScorer: Send + Sync {
    async fn score_design(&self, input: &ScoreInput) -> Result<ScoreResult>;
}
