//! crontab scheduling (Linux).
//!
//! Each groove owns a two-line block in the user crontab: a marker comment
//! (`# Jazz groove: <name>`) followed by the schedule line. Registration is
//! strip-then-append against the current crontab, rewritten in one shot via
//! `crontab -` stdin. Every token in the generated command line is
//! single-quoted.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use jazz_core::config::{JazzPaths, SchedulerConfig};
use jazz_core::error::{JazzError, Result};
use jazz_core::types::GrooveMetadata;

use crate::service::{require_schedule, runner_invocation, shell_quote, Scheduler, SchedulerType};
use crate::store::{EntryStore, ScheduledEntry};

const MARKER_PREFIX: &str = "# Jazz groove: ";

fn marker(groove_name: &str) -> String {
    format!("{MARKER_PREFIX}{groove_name}")
}

/// Remove the two-line block for `groove_name`, leaving everything else
/// (including other grooves' blocks) untouched.
fn strip_block(crontab: &str, groove_name: &str) -> String {
    let marker = marker(groove_name);
    let mut kept = Vec::new();
    let mut lines = crontab.lines();
    while let Some(line) = lines.next() {
        if line.trim_end() == marker {
            // Drop the marker and the schedule line after it.
            lines.next();
            continue;
        }
        kept.push(line);
    }
    let mut out = kept.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Linux crontab scheduler.
pub struct CrontabScheduler {
    entries: EntryStore,
    logs_dir: PathBuf,
    config: SchedulerConfig,
}

impl CrontabScheduler {
    pub fn new(paths: &JazzPaths, config: &SchedulerConfig) -> Self {
        Self {
            entries: EntryStore::new(&paths.schedules_dir),
            logs_dir: paths.logs_dir.clone(),
            config: config.clone(),
        }
    }

    /// The groove's crontab block: marker line plus schedule line.
    fn render_block(&self, groove_name: &str, agent_id: &str, schedule: &str) -> Result<String> {
        let invocation = runner_invocation(&self.config, groove_name, agent_id)?
            .iter()
            .map(|token| shell_quote(token))
            .collect::<Vec<_>>()
            .join(" ");
        let log_path = self.logs_dir.join(format!("groove-{groove_name}.log"));
        Ok(format!(
            "{}\n{schedule} {invocation} >> {} 2>&1\n",
            marker(groove_name),
            shell_quote(&log_path.to_string_lossy())
        ))
    }

    /// Read the current user crontab. A missing crontab reads as empty.
    async fn read_crontab(&self) -> Result<String> {
        let output = Command::new("crontab").arg("-l").output().await?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Ok(String::new())
        }
    }

    /// Replace the user crontab wholesale via `crontab -` stdin.
    async fn install_crontab(&self, content: &str) -> Result<()> {
        let mut child = Command::new("crontab")
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(stdin) = child.stdin.as_mut() {
            stdin.write_all(content.as_bytes()).await?;
        }
        drop(child.stdin.take());
        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(JazzError::Scheduler(format!(
                "crontab rewrite failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Scheduler for CrontabScheduler {
    async fn schedule(&self, groove: &GrooveMetadata, agent_id: &str) -> Result<()> {
        let schedule = require_schedule(groove)?;
        let block = self.render_block(&groove.name, agent_id, schedule)?;

        fs::create_dir_all(&self.logs_dir).await?;
        let current = self.read_crontab().await?;
        let mut next = strip_block(&current, &groove.name);
        next.push_str(&block);
        self.install_crontab(&next).await?;

        self.entries
            .save(&ScheduledEntry {
                groove_name: groove.name.clone(),
                schedule: schedule.to_string(),
                agent: agent_id.to_string(),
                enabled: true,
            })
            .await?;

        tracing::info!("📅 Scheduled groove '{}' via crontab ({schedule})", groove.name);
        Ok(())
    }

    async fn unschedule(&self, groove_name: &str) -> Result<()> {
        let current = self.read_crontab().await?;
        let next = strip_block(&current, groove_name);
        if next != current {
            self.install_crontab(&next).await?;
        }
        self.entries.remove(groove_name).await?;
        tracing::info!("Unscheduled groove '{groove_name}' from crontab");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ScheduledEntry>> {
        self.entries.load_all().await
    }

    async fn is_scheduled(&self, groove_name: &str) -> Result<bool> {
        Ok(self.entries.get(groove_name).await.is_some())
    }

    fn scheduler_type(&self) -> SchedulerType {
        SchedulerType::Cron
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_block_removes_only_target() {
        let crontab = "\
MAILTO=\"\"
# Jazz groove: digest
0 6 * * * '/usr/bin/jazz' 'groove' 'run' 'digest' >> '/tmp/l' 2>&1
# Jazz groove: triage
0 7 * * * '/usr/bin/jazz' 'groove' 'run' 'triage' >> '/tmp/l' 2>&1
* * * * * /usr/bin/unrelated
";
        let stripped = strip_block(crontab, "digest");
        assert!(!stripped.contains("Jazz groove: digest"));
        assert!(!stripped.contains("'run' 'digest'"));
        assert!(stripped.contains("Jazz groove: triage"));
        assert!(stripped.contains("/usr/bin/unrelated"));
        assert!(stripped.contains("MAILTO"));
    }

    #[test]
    fn test_strip_block_without_match_is_identity() {
        let crontab = "0 1 * * * /bin/true\n";
        assert_eq!(strip_block(crontab, "nope"), crontab);
        assert_eq!(strip_block("", "nope"), "");
    }

    #[test]
    fn test_strip_then_append_round_trip() {
        let paths = JazzPaths::with_home(PathBuf::from("/tmp/jazz-test-crontab"));
        let scheduler = CrontabScheduler::new(&paths, &SchedulerConfig {
            runner_program: Some("/usr/local/bin/jazz".into()),
        });
        let block = scheduler.render_block("digest", "researcher", "0 6 * * *").unwrap();
        let installed = format!("{}{block}", strip_block("", "digest"));
        // Re-scheduling replaces, never duplicates.
        let reinstalled = format!("{}{block}", strip_block(&installed, "digest"));
        assert_eq!(installed, reinstalled);
        assert_eq!(installed.matches(MARKER_PREFIX).count(), 1);
    }

    #[test]
    fn test_render_block_shape() {
        let paths = JazzPaths::with_home(PathBuf::from("/tmp/jazz-test-crontab2"));
        let scheduler = CrontabScheduler::new(&paths, &SchedulerConfig {
            runner_program: Some("/usr/local/bin/jazz".into()),
        });
        let block = scheduler.render_block("digest", "researcher", "30 6 * * 1").unwrap();
        let mut lines = block.lines();
        assert_eq!(lines.next(), Some("# Jazz groove: digest"));
        let schedule_line = lines.next().unwrap();
        assert!(schedule_line.starts_with("30 6 * * 1 "));
        assert!(schedule_line.contains("'/usr/local/bin/jazz' 'groove' 'run' 'digest'"));
        assert!(schedule_line.contains("'--agent' 'researcher' '--auto-approve'"));
        assert!(schedule_line.ends_with("2>&1"));
        assert!(schedule_line.contains(">> '/tmp/jazz-test-crontab2/logs/groove-digest.log'"));
    }

    #[test]
    fn test_render_block_quotes_hostile_names() {
        let paths = JazzPaths::with_home(PathBuf::from("/tmp/jazz-test-crontab3"));
        let scheduler = CrontabScheduler::new(&paths, &SchedulerConfig {
            runner_program: Some("/usr/local/bin/jazz".into()),
        });
        let block = scheduler
            .render_block("x'; rm -rf ~", "agent", "0 6 * * *")
            .unwrap();
        // The hostile name stays inside one quoted token.
        assert!(block.contains(r"'x'\''; rm -rf ~'"));
    }
}
