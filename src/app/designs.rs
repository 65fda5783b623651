use crate::app::workflows::DesignAnalysis;
use crate::core::dispatcher::{ApiRequest, RequestDispatcher};
use crate::domain::model::{ScoreInput, ScoreResult};
use crate::domain::ports::DesignScorer;
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

pub const ANALYZE_PATH: &str = "/designs/analyze";
pub const BULK_ANALYZE_PATH: &str = "/designs/bulk-analyze";

/// `POST /designs/analyze` 的回應；`analysis` 與 runner 共用同一份結構
#[derive(Debug, Clone, Deserialize)]
pub struct BackendAnalysis {
    pub analysis: DesignAnalysis,
    #[serde(default)]
    pub design: Option<Value>,
}

/// 經由後端 API 分析設計，請求走 dispatcher 以便共用 token refresh
#[derive(Clone)]
pub struct DesignService {
    dispatcher: RequestDispatcher,
}

impl DesignService {
    pub fn new(dispatcher: RequestDispatcher) -> Self {
        Self { dispatcher }
    }

    pub async fn analyze_design(&self, design: &ScoreInput) -> Result<BackendAnalysis> {
        tracing::info!("🎨 Analyzing '{}' via backend", design.title);
        let request = ApiRequest::post(ANALYZE_PATH, serde_json::to_value(design)?);
        self.dispatcher.send_json(&request).await
    }

    /// 後端自行排程，回應原樣交給呼叫端
    pub async fn bulk_analyze(&self, design_ids: &[String]) -> Result<Value> {
        tracing::info!("🎨 Bulk analyzing {} designs via backend", design_ids.len());
        let request = ApiRequest::post(BULK_ANALYZE_PATH, json!({ "designIds": design_ids }));
        self.dispatcher.send_json(&request).await
    }
}

#[async_trait]
impl DesignScorer for DesignService {
    async fn score_design(&self, input: &ScoreInput) -> Result<ScoreResult> {
        Ok(self.analyze_design(input).await?.analysis.into_score_result())
    }
}
