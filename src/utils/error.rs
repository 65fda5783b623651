use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Session expired. Please log in again.")]
    AuthExpired,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request failed with status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Realtime channel failed after {attempts} reconnect attempts")]
    ChannelFailed { attempts: u32 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Workflow '{workflow}' failed: {message}")]
    Workflow { workflow: String, message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    Network,
    Realtime,
    Workflow,
    Configuration,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ClientError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ClientError::AuthExpired => ErrorCategory::Authentication,
            ClientError::Network(_) | ClientError::Http { .. } | ClientError::Cancelled => {
                ErrorCategory::Network
            }
            ClientError::ChannelFailed { .. } | ClientError::Transport { .. } => {
                ErrorCategory::Realtime
            }
            ClientError::Workflow { .. } => ErrorCategory::Workflow,
            ClientError::ConfigError { .. }
            | ClientError::ConfigValidationError { .. }
            | ClientError::InvalidConfigValueError { .. }
            | ClientError::MissingConfigError { .. } => ErrorCategory::Configuration,
            ClientError::Serialization(_) => ErrorCategory::Data,
            ClientError::Storage { .. } | ClientError::Io(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ClientError::Cancelled => ErrorSeverity::Low,
            ClientError::Network(_)
            | ClientError::Http { .. }
            | ClientError::Transport { .. }
            | ClientError::Workflow { .. } => ErrorSeverity::Medium,
            ClientError::AuthExpired
            | ClientError::ChannelFailed { .. }
            | ClientError::Serialization(_)
            | ClientError::ConfigError { .. }
            | ClientError::ConfigValidationError { .. }
            | ClientError::InvalidConfigValueError { .. }
            | ClientError::MissingConfigError { .. } => ErrorSeverity::High,
            ClientError::Storage { .. } | ClientError::Io(_) => ErrorSeverity::Critical,
        }
    }

    /// 給終端使用者看的訊息
    pub fn user_friendly_message(&self) -> String {
        match self {
            ClientError::AuthExpired => "Session expired. Please log in again.".to_string(),
            ClientError::Network(_) => {
                "Network error. Please check your connection and try again.".to_string()
            }
            ClientError::Http { message, .. } => message.clone(),
            ClientError::ChannelFailed { .. } => {
                "You are offline. Live updates are paused.".to_string()
            }
            ClientError::Cancelled => "The operation was cancelled.".to_string(),
            ClientError::Workflow { workflow, .. } => {
                format!("Workflow '{}' could not be completed.", workflow)
            }
            ClientError::ConfigError { .. }
            | ClientError::ConfigValidationError { .. }
            | ClientError::InvalidConfigValueError { .. }
            | ClientError::MissingConfigError { .. } => format!("Configuration problem: {}", self),
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Authentication => "Log in again to start a new session",
            ErrorCategory::Network => "Check the API URL and your network connection, then retry",
            ErrorCategory::Realtime => "Reconnect the realtime channel once the server is reachable",
            ErrorCategory::Workflow => "Verify the webhook URL and API key of the workflow runner",
            ErrorCategory::Configuration => "Review the configuration file and environment variables",
            ErrorCategory::Data => "Inspect the server response format",
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
