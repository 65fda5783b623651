use serde::{Deserialize, Serialize};
use std::fmt;

/// 目前的存取/更新憑證
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token: Some(refresh_token.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// Credential Store 廣播的 session 事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    Refreshed,
    Expired,
    LoggedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Failed,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChannelState::Disconnected => "disconnected",
            ChannelState::Connecting => "connecting",
            ChannelState::Connected => "connected",
            ChannelState::Reconnecting => "reconnecting",
            ChannelState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Realtime frame: `{type, payload}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub topic: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreInput {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub colors: Vec<String>,
}

impl ScoreInput {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_colors<I, S>(mut self, colors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.colors = colors.into_iter().map(Into::into).collect();
        self
    }

    /// 寬鬆解析：缺少或格式錯誤的欄位以空字串/空陣列取代，不會失敗
    pub fn from_value(value: &serde_json::Value) -> Self {
        let text = |key: &str| -> String {
            match value.get(key) {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(serde_json::Value::Null) | None => String::new(),
                Some(other) => {
                    tracing::warn!("⚠️ Design field '{}' is not a string ({}), using empty", key, other);
                    String::new()
                }
            }
        };
        let list = |key: &str| -> Vec<String> {
            match value.get(key) {
                Some(serde_json::Value::Array(items)) => items
                    .iter()
                    .filter_map(|item| match item {
                        serde_json::Value::String(s) => Some(s.clone()),
                        other => {
                            tracing::warn!("⚠️ Dropping non-string entry in '{}': {}", key, other);
                            None
                        }
                    })
                    .collect(),
                Some(serde_json::Value::Null) | None => Vec::new(),
                Some(other) => {
                    tracing::warn!("⚠️ Design field '{}' is not a list ({}), using empty", key, other);
                    Vec::new()
                }
            }
        };

        Self {
            title: text("title"),
            description: text("description"),
            tags: list("tags"),
            colors: list("colors"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    High,
    Moderate,
    Low,
}

impl Tier {
    pub fn from_score(score: u8) -> Self {
        if score >= 80 {
            Tier::High
        } else if score >= 60 {
            Tier::Moderate
        } else {
            Tier::Low
        }
    }

    /// Workflow runner 使用的 `prediction` 文字
    pub fn label(&self) -> &'static str {
        match self {
            Tier::High => "High Success Potential",
            Tier::Moderate => "Moderate Success Potential",
            Tier::Low => "Low Success Potential",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let lower = label.trim().to_lowercase();
        if lower.starts_with("high") {
            Some(Tier::High)
        } else if lower.starts_with("moderate") {
            Some(Tier::Moderate)
        } else if lower.starts_with("low") {
            Some(Tier::Low)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueEstimate {
    pub min: u32,
    pub max: u32,
    pub confidence_percent: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub success_score: u8,
    pub tier: Tier,
    pub recommendations: Vec<String>,
    pub revenue_estimate: RevenueEstimate,
}

/// 三個子分數，供分析報告使用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubScores {
    pub color: u8,
    pub tag: u8,
    pub market: u8,
}

impl SubScores {
    pub fn trend_alignment(&self) -> f64 {
        (f64::from(self.color) + f64::from(self.tag)) / 2.0
    }
}
