//! Startup catch-up orchestration.
//!
//! Walks the scheduled entries, asks the decision engine which grooves missed
//! a firing while the process was offline, and runs the due ones through the
//! agent executor with run-history bookkeeping around each attempt. Catch-up
//! is attached to process startup, so every outer surface here is fail-open:
//! a broken history or scheduler mirror produces an empty batch, never a
//! startup failure.

use std::collections::HashMap;
use std::io::IsTerminal;
use std::sync::Arc;

use chrono::{DateTime, Days, Local, Utc};
use uuid::Uuid;

use jazz_core::error::Result;
use jazz_core::traits::agent::{AgentExecutor, AgentResolver};
use jazz_core::traits::groove::GrooveProvider;
use jazz_core::traits::prompt::CatchUpPrompt;
use jazz_core::types::{AgentRunRequest, AutoApprovePolicy};

use crate::catchup::{self, CatchUpDecision};
use crate::history::{RunHistory, RunRecord, RunStatus, RunUpdate, TriggeredBy};
use crate::service::Scheduler;
use crate::store::ScheduledEntry;

/// Iteration budget when a groove sets none.
const DEFAULT_MAX_ITERATIONS: u32 = 50;

/// A scheduled groove the decision engine wants to catch up.
#[derive(Debug, Clone)]
pub struct CatchUpCandidate {
    pub entry: ScheduledEntry,
    pub decision: CatchUpDecision,
}

/// Drives missed-run catch-up across all scheduled grooves.
#[derive(Clone)]
pub struct CatchUpOrchestrator {
    scheduler: Arc<dyn Scheduler>,
    grooves: Arc<dyn GrooveProvider>,
    agents: Arc<dyn AgentResolver>,
    executor: Arc<dyn AgentExecutor>,
    prompt: Arc<dyn CatchUpPrompt>,
    history: RunHistory,
}

impl CatchUpOrchestrator {
    pub fn new(
        scheduler: Arc<dyn Scheduler>,
        grooves: Arc<dyn GrooveProvider>,
        agents: Arc<dyn AgentResolver>,
        executor: Arc<dyn AgentExecutor>,
        prompt: Arc<dyn CatchUpPrompt>,
        history: RunHistory,
    ) -> Self {
        Self {
            scheduler,
            grooves,
            agents,
            executor,
            prompt,
            history,
        }
    }

    /// Scheduled grooves whose missed firing should be caught up now.
    pub async fn get_candidates(&self) -> Result<Vec<CatchUpCandidate>> {
        let entries = match self.scheduler.list().await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Could not list scheduled grooves: {e}");
                return Ok(Vec::new());
            }
        };
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let last_seen = self.last_seen_by_groove().await;
        let now = Utc::now();
        let mut candidates = Vec::new();
        for entry in entries {
            let metadata = match self.grooves.get(&entry.groove_name).await {
                Ok(Some(metadata)) => metadata,
                Ok(None) => {
                    tracing::debug!(
                        "Scheduled groove '{}' has no definition, skipping",
                        entry.groove_name
                    );
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Could not resolve groove '{}': {e}", entry.groove_name);
                    continue;
                }
            };
            let decision =
                catchup::decide(&metadata, last_seen.get(&entry.groove_name).copied(), now);
            if decision.should_run {
                candidates.push(CatchUpCandidate { entry, decision });
            }
        }
        Ok(candidates)
    }

    /// Run a batch of scheduled entries. Each groove is re-validated against
    /// current metadata and history just before running, so stale candidates
    /// fall out; one groove's failure never stops its siblings.
    pub async fn run_batch(&self, entries: &[ScheduledEntry]) {
        for entry in entries {
            if let Err(e) = self.run_one(entry).await {
                tracing::warn!("Catch-up for groove '{}' failed: {e}", entry.groove_name);
            }
        }
    }

    async fn run_one(&self, entry: &ScheduledEntry) -> Result<()> {
        let name = &entry.groove_name;

        let Some(content) = self.grooves.load(name).await? else {
            tracing::warn!("Groove '{name}' not found, skipping catch-up");
            return Ok(());
        };
        let metadata = content.metadata;

        let agent_id = metadata.agent.clone().unwrap_or_else(|| entry.agent.clone());
        let Some(agent) = self.agents.by_identifier(&agent_id).await? else {
            tracing::warn!("Agent '{agent_id}' for groove '{name}' not found, skipping catch-up");
            return Ok(());
        };

        // Time may have passed since candidates were computed; decide again
        // against the history as it is now.
        let last_seen = self.last_seen_by_groove().await;
        let decision = catchup::decide(&metadata, last_seen.get(name).copied(), Utc::now());
        if !decision.should_run {
            tracing::debug!("Groove '{name}' no longer due ({})", decision.reason);
            return Ok(());
        }

        self.history
            .append(RunRecord {
                groove_name: name.clone(),
                started_at: Utc::now(),
                completed_at: None,
                status: RunStatus::Running,
                error: None,
                triggered_by: TriggeredBy::Scheduled,
            })
            .await?;

        let run_id = format!("groove-{name}-{}", Uuid::new_v4());
        let request = AgentRunRequest {
            agent,
            user_input: content.prompt,
            session_id: run_id.clone(),
            conversation_id: run_id,
            max_iterations: metadata.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
            // Unattended runs default to full auto-approval.
            auto_approve: metadata.auto_approve.or(Some(AutoApprovePolicy::Always)),
        };

        tracing::info!("⏰ Catching up groove '{name}'");
        match self.executor.run(request).await {
            Ok(_) => {
                self.history
                    .patch_latest_running(name, RunUpdate::completed(Utc::now()))
                    .await?;
                tracing::info!("✅ Groove '{name}' caught up");
            }
            Err(e) => {
                self.history
                    .patch_latest_running(name, RunUpdate::failed(Utc::now(), e.to_string()))
                    .await?;
                tracing::warn!("Groove '{name}' catch-up run failed: {e}");
            }
        }
        Ok(())
    }

    /// Headless startup path: hand every scheduled entry to `run_batch` and
    /// let the per-groove re-evaluation sort out what is actually due.
    pub async fn run_all_non_interactive(&self) {
        let entries = match self.scheduler.list().await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Could not list scheduled grooves: {e}");
                return;
            }
        };
        self.run_batch(&entries).await;
    }

    /// Interactive startup path: show what was missed, confirm, select, and
    /// run the selection as a detached background batch.
    pub async fn prompt_interactive(&self) -> Result<()> {
        if !std::io::stdin().is_terminal() || !std::io::stdout().is_terminal() {
            return Ok(());
        }

        let candidates = match self.get_candidates().await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!("Catch-up candidate discovery failed: {e}");
                return Ok(());
            }
        };
        if candidates.is_empty() {
            return Ok(());
        }

        let now = Local::now();
        println!(
            "{} groove{} missed a scheduled run:",
            candidates.len(),
            if candidates.len() == 1 { "" } else { "s" }
        );
        let mut items = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            let phrase = candidate
                .decision
                .scheduled_at
                .map(|at| missed_phrase(at.with_timezone(&Local), now))
                .unwrap_or_else(|| "missed a run".to_string());
            println!("  {} — {phrase}", candidate.entry.groove_name);
            items.push(format!("{} ({phrase})", candidate.entry.groove_name));
        }

        if !self.prompt.confirm("Run missed grooves now?", false)? {
            return Ok(());
        }

        let selected = self.prompt.multi_select("Select grooves to run", &items)?;
        if selected.is_empty() {
            println!("No grooves selected.");
            return Ok(());
        }

        let entries: Vec<ScheduledEntry> = selected
            .into_iter()
            .filter_map(|i| candidates.get(i).map(|c| c.entry.clone()))
            .collect();

        // Detached: the prompt returns immediately, the batch reports through
        // tracing so it never interleaves with the interactive terminal.
        let orchestrator = self.clone();
        tokio::spawn(async move {
            let count = entries.len();
            orchestrator.run_batch(&entries).await;
            tracing::info!(
                "Catch-up batch finished ({count} groove{})",
                if count == 1 { "" } else { "s" }
            );
        });
        Ok(())
    }

    /// Latest moment each groove was seen running or finishing, from the run
    /// history. A broken history reads as empty rather than blocking catch-up.
    async fn last_seen_by_groove(&self) -> HashMap<String, DateTime<Utc>> {
        let records = match self.history.load().await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("Could not load run history, assuming empty: {e}");
                Vec::new()
            }
        };
        let mut last_seen: HashMap<String, DateTime<Utc>> = HashMap::new();
        for record in records {
            let seen = match record.completed_at {
                Some(completed) => completed.max(record.started_at),
                None => record.started_at,
            };
            last_seen
                .entry(record.groove_name)
                .and_modify(|current| *current = (*current).max(seen))
                .or_insert(seen);
        }
        last_seen
    }
}

/// "missed 06:00 today" / "… yesterday" / "… on 2026-02-01", by comparing the
/// firing's calendar day with today's in local time.
fn missed_phrase(scheduled_at: DateTime<Local>, now: DateTime<Local>) -> String {
    let time = scheduled_at.format("%H:%M");
    let fired = scheduled_at.date_naive();
    let today = now.date_naive();
    if fired == today {
        format!("missed {time} today")
    } else if Some(fired) == today.checked_sub_days(Days::new(1)) {
        format!("missed {time} yesterday")
    } else {
        format!("missed {time} on {}", fired.format("%Y-%m-%d"))
    }
}
