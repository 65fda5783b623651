pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{FileStore, MemoryStore, WebSocketConnector};
pub use app::{DesignService, Session, WorkflowClient, WorkflowOperation};
pub use config::ClientConfig;
pub use crate::core::{
    channel::{ChannelConfig, EventChannel},
    credentials::CredentialStore,
    dispatcher::{ApiRequest, ApiResponse, RequestDispatcher},
    registry::{Subscription, SubscriptionRegistry},
    scoring::ScoringEngine,
};
pub use utils::error::{ClientError, Result};
