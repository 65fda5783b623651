use crate::utils::error::{ClientError, Result};
use crate::utils::validation::{self, Validate, HTTP_SCHEMES, WS_SCHEMES};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:3001/api";
pub const DEFAULT_REALTIME_URL: &str = "ws://localhost:3001";
pub const DEFAULT_STORAGE_PATH: &str = "./.zurfy";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub realtime: Option<RealtimeConfig>,
    pub workflow: Option<WorkflowConfig>,
    pub storage: Option<StorageConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    pub url: String,
    pub reconnect_interval_ms: Option<u64>,
    pub max_reconnect_attempts: Option<u32>,
    pub connect_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub webhook_url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub format: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: DEFAULT_API_URL.to_string(),
                request_timeout_seconds: None,
            },
            realtime: None,
            workflow: None,
            storage: None,
            logging: None,
        }
    }
}

impl ClientConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ClientError::Io)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ClientError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${N8N_API_KEY})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ClientError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("api.base_url", &self.api.base_url, HTTP_SCHEMES)?;

        if let Some(timeout) = self.api.request_timeout_seconds {
            validation::validate_range("api.request_timeout_seconds", timeout, 1, 300)?;
        }

        if let Some(realtime) = &self.realtime {
            validation::validate_url("realtime.url", &realtime.url, WS_SCHEMES)?;
            if let Some(interval) = realtime.reconnect_interval_ms {
                validation::validate_positive_number("realtime.reconnect_interval_ms", interval, 1)?;
            }
            if let Some(attempts) = realtime.max_reconnect_attempts {
                validation::validate_range("realtime.max_reconnect_attempts", attempts, 0, 1000)?;
            }
        }

        if let Some(workflow) = &self.workflow {
            validation::validate_url("workflow.webhook_url", &workflow.webhook_url, HTTP_SCHEMES)?;
            if let Some(api_key) = &workflow.api_key {
                validation::validate_non_empty_string("workflow.api_key", api_key)?;
                if api_key.starts_with("${") {
                    return Err(ClientError::MissingConfigError {
                        field: format!("workflow.api_key (environment variable {})", api_key),
                    });
                }
            }
        }

        if let Some(storage) = &self.storage {
            validation::validate_path("storage.path", &storage.path)?;
        }

        if let Some(format) = self.logging.as_ref().and_then(|l| l.format.as_deref()) {
            if !["compact", "json"].contains(&format) {
                return Err(ClientError::InvalidConfigValueError {
                    field: "logging.format".to_string(),
                    value: format.to_string(),
                    reason: "Unsupported format. Valid formats: compact, json".to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn api_base_url(&self) -> &str {
        &self.api.base_url
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_seconds.unwrap_or(30))
    }

    pub fn realtime_url(&self) -> &str {
        self.realtime
            .as_ref()
            .map(|r| r.url.as_str())
            .unwrap_or(DEFAULT_REALTIME_URL)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(
            self.realtime
                .as_ref()
                .and_then(|r| r.reconnect_interval_ms)
                .unwrap_or(5000),
        )
    }

    pub fn max_reconnect_attempts(&self) -> u32 {
        self.realtime
            .as_ref()
            .and_then(|r| r.max_reconnect_attempts)
            .unwrap_or(10)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(
            self.realtime
                .as_ref()
                .and_then(|r| r.connect_timeout_seconds)
                .unwrap_or(10),
        )
    }

    pub fn storage_path(&self) -> &str {
        self.storage
            .as_ref()
            .map(|s| s.path.as_str())
            .unwrap_or(DEFAULT_STORAGE_PATH)
    }

    pub fn log_level(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or("info")
    }

    pub fn json_logs(&self) -> bool {
        self.logging
            .as_ref()
            .and_then(|l| l.format.as_deref())
            .map(|f| f == "json")
            .unwrap_or(false)
    }
}

impl Validate for ClientConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
