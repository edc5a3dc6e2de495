//! Groove and agent domain types.

use serde::{Deserialize, Serialize};

/// Metadata describing a groove — a schedulable autonomous-agent task.
///
/// Supplied by the groove provider; Jazz consumes it read-only. Field names
/// serialize camelCase to match the on-disk groove format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrooveMetadata {
    /// Unique groove name.
    pub name: String,
    /// Cron schedule ("0 6 * * *"). None = manual-only groove.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    /// Whether a missed scheduled run should be caught up on startup.
    /// Opt-in: absent means disabled.
    #[serde(default)]
    pub catch_up_on_startup: bool,
    /// Maximum age in seconds a missed firing is still worth catching up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_catch_up_age: Option<i64>,
    /// Iteration budget handed to the agent run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,
    /// Tool auto-approval policy for unattended runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_approve: Option<AutoApprovePolicy>,
    /// Identifier of the agent that executes this groove.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

/// How far an unattended agent run may go without asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoApprovePolicy {
    /// Approve every tool call.
    Always,
    /// Approve only calls the executor classifies as safe.
    Safe,
    /// Never auto-approve.
    Never,
}

/// A groove resolved to its full content: metadata plus the prompt to run.
#[derive(Debug, Clone)]
pub struct GrooveContent {
    pub metadata: GrooveMetadata,
    pub prompt: String,
}

/// A resolved agent, ready to be handed to the executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentHandle {
    /// Stable identifier ("researcher", "inbox-triage").
    pub id: String,
    /// Display name.
    pub name: String,
}

/// One request to the external agent execution engine.
#[derive(Debug, Clone)]
pub struct AgentRunRequest {
    pub agent: AgentHandle,
    /// The groove prompt handed to the agent as user input.
    pub user_input: String,
    pub session_id: String,
    pub conversation_id: String,
    pub max_iterations: u32,
    pub auto_approve: Option<AutoApprovePolicy>,
}

/// Outcome of a completed agent run.
#[derive(Debug, Clone)]
pub struct AgentRunOutcome {
    /// Final agent response text.
    pub response: String,
}
