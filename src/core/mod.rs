pub mod channel;
pub mod credentials;
pub mod dispatcher;
pub mod registry;
pub mod scoring;

pub use crate::domain::model::{ChannelState, Credentials, ScoreInput, ScoreResult, SessionEvent};
pub use crate::domain::ports::{Connector, DesignScorer, KeyValueStore};
pub use crate::utils::error::Result;
