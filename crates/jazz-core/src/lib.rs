//! # Jazz Core
//!
//! Shared foundation for the Jazz groove scheduler: configuration, the error
//! type, the groove/agent domain types, and the narrow traits through which
//! the scheduling subsystem talks to the rest of the application (groove
//! discovery, agent resolution and execution, terminal prompting).

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{JazzConfig, JazzPaths};
pub use error::{JazzError, Result};
pub use traits::agent::{AgentExecutor, AgentResolver};
pub use traits::groove::GrooveProvider;
pub use traits::prompt::CatchUpPrompt;
pub use types::{
    AgentHandle, AgentRunOutcome, AgentRunRequest, AutoApprovePolicy, GrooveContent,
    GrooveMetadata,
};
