use clap::Parser;
use reqwest::Method;
use std::time::Duration;
use zurfy_link::config::Command;
use zurfy_link::domain::model::ScoreResult;
use zurfy_link::utils::error::ErrorSeverity;
use zurfy_link::utils::{logger, validation::Validate};
use zurfy_link::{ApiRequest, ClientConfig, ClientError, CliConfig, Session};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 驗證配置
    let config = match cli.validate().and_then(|_| cli.resolve()) {
        Ok(config) => config,
        Err(e) => {
            logger::init_cli_logger(cli.verbose);
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if config.json_logs() {
        logger::init_json_logger(config.log_level());
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting zurfy CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = run(&cli, &config).await {
        // 記錄詳細錯誤信息
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn run(cli: &CliConfig, config: &ClientConfig) -> zurfy_link::Result<()> {
    match &cli.command {
        Command::Score(args) => {
            let input = args.to_input()?;
            let result = zurfy_link::ScoringEngine::new().score(&input);
            print_score(&result)
        }
        Command::Analyze(args) => {
            let input = args.to_input()?;
            let session = Session::from_config(config).await?;
            let result = session.score_design(&input).await?;
            print_score(&result)
        }
        Command::Login { email, password } => {
            let session = Session::from_config(config).await?;
            let data = session.login(email, password).await?;
            if session.is_authenticated() {
                println!("✅ Logged in");
                if let Some(user) = session.current_user() {
                    println!("{}", serde_json::to_string_pretty(&user)?);
                }
            } else {
                println!("⚠️ Login response carried no token");
                println!("{}", serde_json::to_string_pretty(&data)?);
            }
            Ok(())
        }
        Command::Logout => {
            let session = Session::from_config(config).await?;
            session.logout().await;
            println!("👋 Logged out");
            Ok(())
        }
        Command::Request { path, method, body } => {
            let session = Session::from_config(config).await?;
            let method = Method::from_bytes(method.to_uppercase().as_bytes()).map_err(|_| {
                ClientError::InvalidConfigValueError {
                    field: "method".to_string(),
                    value: method.clone(),
                    reason: "Not a valid HTTP method".to_string(),
                }
            })?;

            let mut request = ApiRequest::new(method, path.clone());
            if let Some(body) = body {
                request = request.with_body(serde_json::from_str(body)?);
            }

            let value: serde_json::Value = session.dispatcher().send_json(&request).await?;
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Command::Listen { topics, seconds } => listen(config, topics, *seconds).await,
    }
}

async fn listen(config: &ClientConfig, topics: &[String], seconds: Option<u64>) -> zurfy_link::Result<()> {
    let session = Session::from_config(config).await?;
    if !session.is_authenticated() {
        return Err(ClientError::AuthExpired);
    }

    let subscriptions: Vec<_> = topics
        .iter()
        .map(|topic| {
            let label = topic.clone();
            session.channel().subscribe(topic.clone(), move |payload| {
                println!("📨 [{}] {}", label, payload);
            })
        })
        .collect();

    let mut states = session.channel().state_changes();
    session.initialize();

    let deadline = async {
        match seconds {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(deadline, interrupted);

    let outcome = loop {
        tokio::select! {
            _ = &mut interrupted => break Ok(()),
            _ = &mut deadline => break Ok(()),
            changed = states.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let state = *states.borrow_and_update();
                println!("🔌 {}", state);
                if let Some(failure) = session.offline() {
                    break Err(failure);
                }
            }
        }
    };

    for subscription in subscriptions {
        subscription.unsubscribe();
    }
    session.channel().disconnect();
    outcome
}

fn print_score(result: &ScoreResult) -> zurfy_link::Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}
