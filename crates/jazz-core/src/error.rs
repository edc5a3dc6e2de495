//! Jazz error type.

/// All errors surfaced by Jazz crates.
#[derive(Debug, thiserror::Error)]
pub enum JazzError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("Timed out waiting for lock at {0}")]
    LockTimeout(String),

    #[error("Groove not found: {0}")]
    GrooveNotFound(String),

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Agent run failed: {0}")]
    Agent(String),

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("Scheduling is not supported on this platform (supported: macOS launchd, Linux cron)")]
    UnsupportedPlatform,
}

pub type Result<T> = std::result::Result<T, JazzError>;
