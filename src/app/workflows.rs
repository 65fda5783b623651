use crate::core::scoring::{self, ScoringEngine};
use crate::domain::model::{RevenueEstimate, ScoreInput, ScoreResult, Tier};
use crate::domain::ports::DesignScorer;
use crate::utils::error::{ClientError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;

pub const WORKFLOW_SOURCE: &str = "zurfy-frontend";

pub const DEFAULT_PRODUCT_PLATFORMS: &[&str] = &["etsy", "shopify", "printify"];
pub const DEFAULT_TREND_CATEGORIES: &[&str] = &["art", "quotes", "animals", "nature"];

/// Workflow runner 上的自動化流程，每個 variant 對應一個 webhook
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowOperation {
    AnalyzeDesign {
        design: ScoreInput,
    },
    CreateProducts {
        design_id: String,
        platforms: Vec<String>,
    },
    OptimizePricing {
        product_id: String,
        platforms: Vec<String>,
    },
    GenerateSeo {
        design: ScoreInput,
        platform: String,
    },
    MarketResearch {
        keywords: Vec<String>,
        platforms: Vec<String>,
    },
    CompetitorAnalysis {
        niche: String,
        platform: String,
    },
    DetectTrends {
        categories: Vec<String>,
    },
    QualityCheck {
        product_id: String,
    },
    MonitorPerformance {
        product_ids: Vec<String>,
    },
    BulkUpdate {
        operation: String,
        product_ids: Vec<String>,
        data: Value,
    },
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl WorkflowOperation {
    pub fn create_products(design_id: impl Into<String>) -> Self {
        WorkflowOperation::CreateProducts {
            design_id: design_id.into(),
            platforms: owned(DEFAULT_PRODUCT_PLATFORMS),
        }
    }

    pub fn detect_trends() -> Self {
        WorkflowOperation::DetectTrends {
            categories: owned(DEFAULT_TREND_CATEGORIES),
        }
    }

    pub fn webhook_path(&self) -> &'static str {
        match self {
            WorkflowOperation::AnalyzeDesign { .. } => "design-analysis",
            WorkflowOperation::CreateProducts { .. } => "create-products",
            WorkflowOperation::OptimizePricing { .. } => "price-optimization",
            WorkflowOperation::GenerateSeo { .. } => "seo-content-generator",
            WorkflowOperation::MarketResearch { .. } => "market-research",
            WorkflowOperation::CompetitorAnalysis { .. } => "competitor-analysis",
            WorkflowOperation::DetectTrends { .. } => "trend-detection",
            WorkflowOperation::QualityCheck { .. } => "quality-check",
            WorkflowOperation::MonitorPerformance { .. } => "performance-monitor",
            WorkflowOperation::BulkUpdate { .. } => "bulk-operations",
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            WorkflowOperation::AnalyzeDesign { .. } => "analyze",
            WorkflowOperation::CreateProducts { .. } => "create_products",
            WorkflowOperation::OptimizePricing { .. } => "optimize_pricing",
            WorkflowOperation::GenerateSeo { .. } => "generate_content",
            WorkflowOperation::MarketResearch { .. } => "research",
            WorkflowOperation::CompetitorAnalysis { .. } => "analyze_competitors",
            WorkflowOperation::DetectTrends { .. } => "detect_trends",
            WorkflowOperation::QualityCheck { .. } => "quality_check",
            WorkflowOperation::MonitorPerformance { .. } => "monitor_performance",
            WorkflowOperation::BulkUpdate { .. } => "bulk_update",
        }
    }

    /// webhook 的 request body（不含 source/timestamp）
    pub fn payload(&self) -> Value {
        let action = self.action();
        match self {
            WorkflowOperation::AnalyzeDesign { design } => json!({
                "design": design,
                "action": action,
                "requestedFeatures": ["color_analysis", "trend_check", "market_research", "success_prediction"],
            }),
            WorkflowOperation::CreateProducts {
                design_id,
                platforms,
            } => json!({
                "designId": design_id,
                "platforms": platforms,
                "action": action,
                "variations": ["t-shirt", "poster", "mug", "sticker"],
            }),
            WorkflowOperation::OptimizePricing {
                product_id,
                platforms,
            } => json!({
                "productId": product_id,
                "platforms": platforms,
                "action": action,
                "strategy": "competitive_analysis",
            }),
            WorkflowOperation::GenerateSeo { design, platform } => json!({
                "design": design,
                "platform": platform,
                "action": action,
                "contentTypes": ["title", "description", "tags", "alt_text"],
            }),
            WorkflowOperation::MarketResearch {
                keywords,
                platforms,
            } => json!({
                "keywords": keywords,
                "platforms": platforms,
                "action": action,
                "depth": "comprehensive",
            }),
            WorkflowOperation::CompetitorAnalysis { niche, platform } => json!({
                "niche": niche,
                "platform": platform,
                "action": action,
                "metrics": ["pricing", "popularity", "trends", "gaps"],
            }),
            WorkflowOperation::DetectTrends { categories } => json!({
                "categories": categories,
                "action": action,
                "platforms": ["etsy", "pinterest", "google_trends"],
                "timeframe": "30_days",
            }),
            WorkflowOperation::QualityCheck { product_id } => json!({
                "productId": product_id,
                "action": action,
                "checks": ["image_quality", "text_readability", "size_requirements", "platform_compliance"],
            }),
            WorkflowOperation::MonitorPerformance { product_ids } => json!({
                "productIds": product_ids,
                "action": action,
                "metrics": ["views", "favorites", "sales", "ranking"],
            }),
            WorkflowOperation::BulkUpdate {
                operation,
                product_ids,
                data,
            } => json!({
                "operation": operation,
                "productIds": product_ids,
                "data": data,
                "action": action,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenuePrediction {
    pub min_monthly: u32,
    pub max_monthly: u32,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignAnalysis {
    pub success_score: f64,
    pub prediction: String,
    #[serde(default)]
    pub market_potential: Option<f64>,
    #[serde(default)]
    pub trend_alignment: Option<f64>,
    pub revenue_prediction: RevenuePrediction,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// design-analysis webhook 的回應；本地引擎也能產生同樣的結構
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignAnalysisResponse {
    pub status: String,
    pub analysis: DesignAnalysis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_input: Option<ScoreInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<Value>,
}

fn percent(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

impl DesignAnalysisResponse {
    pub fn from_score(input: &ScoreInput, execution_id: Option<Value>) -> Self {
        let subs = scoring::sub_scores(input);
        let result = scoring::score(input);

        Self {
            status: "success".to_string(),
            analysis: DesignAnalysis {
                success_score: f64::from(result.success_score),
                prediction: result.tier.label().to_string(),
                market_potential: Some(f64::from(subs.market)),
                trend_alignment: Some(subs.trend_alignment()),
                revenue_prediction: RevenuePrediction {
                    min_monthly: result.revenue_estimate.min,
                    max_monthly: result.revenue_estimate.max,
                    confidence: f64::from(result.revenue_estimate.confidence_percent),
                },
                recommendations: result.recommendations,
            },
            design_input: Some(input.clone()),
            execution_id,
        }
    }

    pub fn into_score_result(self) -> Result<ScoreResult> {
        if self.status != "success" {
            return Err(ClientError::Workflow {
                workflow: "design-analysis".to_string(),
                message: format!("runner reported status '{}'", self.status),
            });
        }
        Ok(self.analysis.into_score_result())
    }
}

impl DesignAnalysis {
    /// prediction 標籤無法辨識時以分數推回 tier
    pub fn into_score_result(self) -> ScoreResult {
        let success_score = percent(self.success_score);
        let tier = Tier::from_label(&self.prediction).unwrap_or_else(|| {
            tracing::warn!(
                "⚠️ Unknown prediction '{}', tier derived from score",
                self.prediction
            );
            Tier::from_score(success_score)
        });

        ScoreResult {
            success_score,
            tier,
            recommendations: self.recommendations,
            revenue_estimate: RevenueEstimate {
                min: self.revenue_prediction.min_monthly,
                max: self.revenue_prediction.max_monthly,
                confidence_percent: percent(self.revenue_prediction.confidence),
            },
        }
    }
}

/// 透過 webhook 呼叫 workflow runner
#[derive(Clone)]
pub struct WorkflowClient {
    client: Client,
    webhook_url: String,
    api_key: Option<String>,
}

impl WorkflowClient {
    pub fn new(webhook_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, webhook_url, api_key))
    }

    pub fn with_client(client: Client, webhook_url: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            webhook_url: webhook_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub async fn execute(&self, operation: &WorkflowOperation) -> Result<Value> {
        let workflow = operation.webhook_path();
        let url = format!("{}/{}", self.webhook_url, workflow);

        let mut body = match operation.payload() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        body.insert("source".to_string(), json!(WORKFLOW_SOURCE));
        body.insert(
            "timestamp".to_string(),
            json!(chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
        );

        tracing::info!("⚙️ Executing workflow '{}'", workflow);

        let mut request = self.client.post(&url).json(&Value::Object(body));
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!("❌ Workflow '{}' request failed: {}", workflow, e);
            ClientError::Network(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("❌ Workflow '{}' returned {}", workflow, status);
            return Err(ClientError::Workflow {
                workflow: workflow.to_string(),
                message: format!(
                    "workflow execution failed: {}",
                    status.canonical_reason().unwrap_or(status.as_str())
                ),
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ClientError::Workflow {
            workflow: workflow.to_string(),
            message: format!("malformed response: {}", e),
        })
    }

    pub async fn analyze_design(&self, design: &ScoreInput) -> Result<DesignAnalysisResponse> {
        let operation = WorkflowOperation::AnalyzeDesign {
            design: design.clone(),
        };
        let value = self.execute(&operation).await?;

        serde_json::from_value(value).map_err(|e| ClientError::Workflow {
            workflow: operation.webhook_path().to_string(),
            message: format!("unexpected analysis shape: {}", e),
        })
    }
}

#[async_trait]
impl DesignScorer for WorkflowClient {
    async fn score_design(&self, input: &ScoreInput) -> Result<ScoreResult> {
        self.analyze_design(input).await?.into_score_result()
    }
}

#[async_trait]
impl DesignScorer for ScoringEngine {
    async fn score_design(&self, input: &ScoreInput) -> Result<ScoreResult> {
        Ok(self.score(input))
    }
}
