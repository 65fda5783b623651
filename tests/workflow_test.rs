use anyhow::Result;
use httpmock::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use zurfy_link::app::workflows::DesignAnalysisResponse;
use zurfy_link::domain::model::{ScoreInput, Tier};
use zurfy_link::domain::ports::DesignScorer;
use zurfy_link::{ClientConfig, ClientError, MemoryStore, ScoringEngine, Session, WebSocketConnector};
use zurfy_link::{WorkflowClient, WorkflowOperation};

fn sample_design() -> ScoreInput {
    ScoreInput::new("Sleepy Cat Print", "A cozy illustration")
        .with_tags(["minimalist", "modern"])
        .with_colors(["Deep Purple", "Navy Blue"])
}

fn client_for(server: &MockServer) -> Result<WorkflowClient> {
    let client = WorkflowClient::new(
        &server.url("/webhook"),
        Some("runner-key".to_string()),
        Duration::from_secs(5),
    )?;
    Ok(client)
}

#[tokio::test]
async fn test_analyze_design_posts_payload_with_source() -> Result<()> {
    let server = MockServer::start_async().await;
    let design = sample_design();
    let runner_response = DesignAnalysisResponse::from_score(&design, Some(json!(42)));

    let webhook = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/webhook/design-analysis")
                .header("authorization", "Bearer runner-key")
                .json_body_partial(
                    r#"{
                        "action": "analyze",
                        "source": "zurfy-frontend",
                        "design": {"title": "Sleepy Cat Print"},
                        "requestedFeatures": ["color_analysis", "trend_check", "market_research", "success_prediction"]
                    }"#,
                );
            then.status(200).json_body(serde_json::to_value(&runner_response).unwrap());
        })
        .await;

    let client = client_for(&server)?;
    let result = client.score_design(&design).await?;

    webhook.assert_hits_async(1).await;
    // 遠端與本地引擎使用同一份契約
    assert_eq!(result, ScoringEngine::new().score(&design));
    assert_eq!(result.tier, Tier::Low);
    Ok(())
}

#[tokio::test]
async fn test_execute_returns_runner_json() -> Result<()> {
    let server = MockServer::start_async().await;
    let webhook = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/webhook/create-products")
                .json_body_partial(
                    r#"{"designId": "d-1", "action": "create_products", "platforms": ["etsy", "shopify", "printify"]}"#,
                );
            then.status(200).json_body(json!({
                "status": "success",
                "message": "Successfully created 12 products across 3 platforms"
            }));
        })
        .await;

    let client = client_for(&server)?;
    let response = client
        .execute(&WorkflowOperation::create_products("d-1"))
        .await?;

    webhook.assert_hits_async(1).await;
    assert_eq!(response["status"], "success");
    Ok(())
}

#[tokio::test]
async fn test_runner_failure_is_workflow_error() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/webhook/trend-detection");
            then.status(500).body("boom");
        })
        .await;

    let client = client_for(&server)?;
    let result = client.execute(&WorkflowOperation::detect_trends()).await;

    match result {
        Err(ClientError::Workflow { workflow, message }) => {
            assert_eq!(workflow, "trend-detection");
            assert!(message.contains("Internal Server Error"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_malformed_analysis_is_workflow_error() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/webhook/design-analysis");
            then.status(200).json_body(json!({"status": "success"}));
        })
        .await;

    let client = client_for(&server)?;
    let result = client.analyze_design(&sample_design()).await;

    assert!(matches!(result, Err(ClientError::Workflow { .. })));
    Ok(())
}

#[tokio::test]
async fn test_session_prefers_configured_runner() -> Result<()> {
    let server = MockServer::start_async().await;
    let design = sample_design();
    let runner_response = DesignAnalysisResponse::from_score(&design, None);
    let webhook = server
        .mock_async(|when, then| {
            when.method(POST).path("/webhook/design-analysis");
            then.status(200).json_body(serde_json::to_value(&runner_response).unwrap());
        })
        .await;

    let config = ClientConfig::from_toml_str(&format!(
        r#"
[api]
base_url = "{}"

[workflow]
webhook_url = "{}"
"#,
        server.url("/api"),
        server.url("/webhook")
    ))?;
    let session = Session::with_ports(
        &config,
        Arc::new(MemoryStore::new()),
        Arc::new(WebSocketConnector::default()),
    )
    .await?;

    let result = session.score_design(&design).await?;

    webhook.assert_hits_async(1).await;
    assert_eq!(result.success_score, 45);
    Ok(())
}
