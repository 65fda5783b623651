pub mod designs;
pub mod session;
pub mod workflows;

pub use designs::DesignService;
pub use session::Session;
pub use workflows::{DesignAnalysisResponse, WorkflowClient, WorkflowOperation};
