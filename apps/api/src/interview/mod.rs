pub mod error;
pub mod handlers;
pub mod models;
pub mod orchestrator;
pub mod prompts;
pub mod store;
pub mod turn;

pub use error::InterviewError;
pub use orchestrator::InterviewOrchestrator;
