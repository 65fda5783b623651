use crate::config::toml_config::{ClientConfig, RealtimeConfig, StorageConfig, WorkflowConfig};
use crate::domain::model::ScoreInput;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "zurfy")]
#[command(about = "Zurfy client: design scoring, authenticated API calls and realtime events")]
pub struct CliConfig {
    #[arg(short, long, global = true, help = "TOML configuration file")]
    pub config: Option<String>,

    #[arg(long, global = true, help = "Override [api] base_url")]
    pub api_url: Option<String>,

    #[arg(long, global = true, help = "Override [realtime] url")]
    pub realtime_url: Option<String>,

    #[arg(long, global = true, help = "Override [workflow] webhook_url")]
    pub webhook_url: Option<String>,

    #[arg(long, global = true, help = "Override [storage] path")]
    pub storage_path: Option<String>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// 以本地引擎評分
    Score(DesignArgs),
    /// 遠端評分：workflow runner 優先，其次是已登入的後端
    Analyze(DesignArgs),
    /// 登入並保存 session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// 清除保存的 session
    Logout,
    /// 送出一個帶憑證的 API 請求
    Request {
        path: String,
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,
        #[arg(long, help = "JSON request body")]
        body: Option<String>,
    },
    /// 連上 realtime channel 並印出收到的訊息
    Listen {
        #[arg(long, value_delimiter = ',', required = true)]
        topics: Vec<String>,
        #[arg(long, help = "Stop after N seconds (default: until Ctrl-C)")]
        seconds: Option<u64>,
    },
}

#[derive(Debug, Clone, Args)]
pub struct DesignArgs {
    #[arg(long, help = "Design JSON file with title/description/tags/colors")]
    pub file: Option<String>,

    #[arg(long, default_value = "")]
    pub title: String,

    #[arg(long, default_value = "")]
    pub description: String,

    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,

    #[arg(long, value_delimiter = ',')]
    pub colors: Vec<String>,
}

impl DesignArgs {
    pub fn to_input(&self) -> Result<ScoreInput> {
        match &self.file {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                let value: serde_json::Value = serde_json::from_str(&content)?;
                Ok(ScoreInput::from_value(&value))
            }
            None => Ok(ScoreInput::new(self.title.clone(), self.description.clone())
                .with_tags(self.tags.iter().map(|t| t.trim()))
                .with_colors(self.colors.iter().map(|c| c.trim()))),
        }
    }
}

impl CliConfig {
    /// 讀取設定檔（若有），再套用命令列覆寫
    pub fn resolve(&self) -> Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::from_file(path)?,
            None => ClientConfig::default(),
        };

        if let Some(api_url) = &self.api_url {
            config.api.base_url = api_url.clone();
        }

        if let Some(realtime_url) = &self.realtime_url {
            match config.realtime.as_mut() {
                Some(realtime) => realtime.url = realtime_url.clone(),
                None => {
                    config.realtime = Some(RealtimeConfig {
                        url: realtime_url.clone(),
                        reconnect_interval_ms: None,
                        max_reconnect_attempts: None,
                        connect_timeout_seconds: None,
                    })
                }
            }
        }

        if let Some(webhook_url) = &self.webhook_url {
            match config.workflow.as_mut() {
                Some(workflow) => workflow.webhook_url = webhook_url.clone(),
                None => {
                    config.workflow = Some(WorkflowConfig {
                        webhook_url: webhook_url.clone(),
                        api_key: None,
                    })
                }
            }
        }

        if let Some(storage_path) = &self.storage_path {
            config.storage = Some(StorageConfig {
                path: storage_path.clone(),
            });
        }

        Ok(config)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        self.resolve()?.validate()
    }
}
