//! Agent resolution and execution seams.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{AgentHandle, AgentRunOutcome, AgentRunRequest};

/// Runs a prompt to completion on an agent.
///
/// Implemented by the agent execution engine; Jazz only sees the request and
/// the outcome.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    async fn run(&self, request: AgentRunRequest) -> Result<AgentRunOutcome>;
}

/// Resolves agent identifiers to runnable agents.
#[async_trait]
pub trait AgentResolver: Send + Sync {
    /// Look up an agent by its identifier. Ok(None) when unknown.
    async fn by_identifier(&self, id: &str) -> Result<Option<AgentHandle>>;
}
