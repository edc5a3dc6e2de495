//! launchd scheduling (macOS).
//!
//! Each groove becomes a user LaunchAgent: a plist with a
//! `StartCalendarInterval` dictionary, loaded and unloaded via `launchctl`.
//! Calendar intervals only hold literal integers, so cron step/range/list
//! syntax is rejected up front with an error naming the offending field.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::process::Command;

use jazz_core::config::{JazzPaths, SchedulerConfig};
use jazz_core::error::{JazzError, Result};
use jazz_core::types::GrooveMetadata;

use crate::service::{require_schedule, runner_invocation, Scheduler, SchedulerType};
use crate::store::{EntryStore, ScheduledEntry};

/// The launchd translation of a 5-field cron schedule. None = wildcard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarInterval {
    pub minute: Option<u32>,
    pub hour: Option<u32>,
    pub day: Option<u32>,
    pub month: Option<u32>,
    pub weekday: Option<u32>,
}

/// Translate a cron schedule into a launchd calendar interval. A normalized
/// 6-field expression has its seconds field dropped first; launchd has no
/// seconds slot.
pub fn translate_schedule(schedule: &str) -> Result<CalendarInterval> {
    let fields: Vec<&str> = schedule.split_whitespace().collect();
    let fields: &[&str] = match fields.len() {
        5 => &fields,
        6 => &fields[1..],
        n => {
            return Err(JazzError::Scheduler(format!(
                "Expected 5 cron fields for launchd translation, got {n}: '{schedule}'"
            )));
        }
    };
    Ok(CalendarInterval {
        minute: translate_field(fields[0], "minute", 0, 59)?,
        hour: translate_field(fields[1], "hour", 0, 23)?,
        day: translate_field(fields[2], "day-of-month", 1, 31)?,
        month: translate_field(fields[3], "month", 1, 12)?,
        weekday: translate_field(fields[4], "weekday", 0, 7)?,
    })
}

fn translate_field(value: &str, field: &str, min: u32, max: u32) -> Result<Option<u32>> {
    if value == "*" {
        return Ok(None);
    }
    if value.contains('/') {
        return Err(JazzError::Scheduler(format!(
            "launchd schedules cannot express step syntax in the {field} field: '{value}'"
        )));
    }
    if value.contains('-') {
        return Err(JazzError::Scheduler(format!(
            "launchd schedules cannot express range syntax in the {field} field: '{value}'"
        )));
    }
    if value.contains(',') {
        return Err(JazzError::Scheduler(format!(
            "launchd schedules cannot express list syntax in the {field} field: '{value}'"
        )));
    }
    let parsed: u32 = value.parse().map_err(|_| {
        JazzError::Scheduler(format!(
            "launchd schedules need a literal integer or '*' in the {field} field: '{value}'"
        ))
    })?;
    if parsed < min || parsed > max {
        return Err(JazzError::Scheduler(format!(
            "Value {parsed} is out of range {min}-{max} for the {field} field"
        )));
    }
    Ok(Some(parsed))
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Render the LaunchAgent plist for one groove.
fn render_plist(
    label: &str,
    program_args: &[String],
    interval: &CalendarInterval,
    stdout_path: &Path,
    stderr_path: &Path,
) -> String {
    let mut plist = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" \
         \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n\
         <plist version=\"1.0\">\n<dict>\n",
    );
    plist.push_str(&format!(
        "    <key>Label</key>\n    <string>{}</string>\n",
        xml_escape(label)
    ));
    plist.push_str("    <key>ProgramArguments</key>\n    <array>\n");
    for arg in program_args {
        plist.push_str(&format!("        <string>{}</string>\n", xml_escape(arg)));
    }
    plist.push_str("    </array>\n");
    plist.push_str("    <key>StartCalendarInterval</key>\n    <dict>\n");
    for (key, value) in [
        ("Minute", interval.minute),
        ("Hour", interval.hour),
        ("Day", interval.day),
        ("Month", interval.month),
        ("Weekday", interval.weekday),
    ] {
        if let Some(value) = value {
            plist.push_str(&format!(
                "        <key>{key}</key>\n        <integer>{value}</integer>\n"
            ));
        }
    }
    plist.push_str("    </dict>\n");
    plist.push_str(&format!(
        "    <key>StandardOutPath</key>\n    <string>{}</string>\n",
        xml_escape(&stdout_path.to_string_lossy())
    ));
    plist.push_str(&format!(
        "    <key>StandardErrorPath</key>\n    <string>{}</string>\n",
        xml_escape(&stderr_path.to_string_lossy())
    ));
    plist.push_str("    <key>RunAtLoad</key>\n    <false/>\n");
    plist.push_str("</dict>\n</plist>\n");
    plist
}

/// macOS launchd scheduler.
pub struct LaunchdScheduler {
    entries: EntryStore,
    launch_agents_dir: PathBuf,
    logs_dir: PathBuf,
    config: SchedulerConfig,
}

impl LaunchdScheduler {
    pub fn new(paths: &JazzPaths, config: &SchedulerConfig) -> Self {
        Self {
            entries: EntryStore::new(&paths.schedules_dir),
            launch_agents_dir: paths.launch_agents_dir.clone(),
            logs_dir: paths.logs_dir.clone(),
            config: config.clone(),
        }
    }

    fn label(groove_name: &str) -> String {
        format!("com.jazz.groove.{groove_name}")
    }

    fn plist_path(&self, groove_name: &str) -> PathBuf {
        self.launch_agents_dir
            .join(format!("{}.plist", Self::label(groove_name)))
    }

    async fn launchctl(&self, verb: &str, plist: &Path) -> Result<()> {
        let output = Command::new("launchctl")
            .arg(verb)
            .arg(plist)
            .output()
            .await?;
        if !output.status.success() {
            return Err(JazzError::Scheduler(format!(
                "launchctl {verb} failed for {}: {}",
                plist.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Scheduler for LaunchdScheduler {
    async fn schedule(&self, groove: &GrooveMetadata, agent_id: &str) -> Result<()> {
        let schedule = require_schedule(groove)?;
        let interval = translate_schedule(schedule)?;
        let program_args = runner_invocation(&self.config, &groove.name, agent_id)?;

        fs::create_dir_all(&self.logs_dir).await?;
        let stdout_path = self.logs_dir.join(format!("groove-{}.log", groove.name));
        let stderr_path = self.logs_dir.join(format!("groove-{}.err.log", groove.name));
        let plist = render_plist(
            &Self::label(&groove.name),
            &program_args,
            &interval,
            &stdout_path,
            &stderr_path,
        );

        // Replace any prior registration under the same label.
        let plist_path = self.plist_path(&groove.name);
        let _ = self.launchctl("unload", &plist_path).await;

        fs::create_dir_all(&self.launch_agents_dir).await?;
        fs::write(&plist_path, plist).await?;

        self.entries
            .save(&ScheduledEntry {
                groove_name: groove.name.clone(),
                schedule: schedule.to_string(),
                agent: agent_id.to_string(),
                enabled: true,
            })
            .await?;

        if let Err(e) = self.launchctl("load", &plist_path).await {
            // Keep the metadata mirror honest: no registration, no entry.
            let _ = self.entries.remove(&groove.name).await;
            return Err(e);
        }

        tracing::info!(
            "📅 Scheduled groove '{}' via launchd ({schedule})",
            groove.name
        );
        Ok(())
    }

    async fn unschedule(&self, groove_name: &str) -> Result<()> {
        let plist_path = self.plist_path(groove_name);
        // Best-effort at every step so a half-removed groove can be removed again.
        let _ = self.launchctl("unload", &plist_path).await;
        let _ = fs::remove_file(&plist_path).await;
        self.entries.remove(groove_name).await?;
        tracing::info!("Unscheduled groove '{groove_name}' from launchd");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ScheduledEntry>> {
        self.entries.load_all().await
    }

    async fn is_scheduled(&self, groove_name: &str) -> Result<bool> {
        Ok(self.entries.get(groove_name).await.is_some())
    }

    fn scheduler_type(&self) -> SchedulerType {
        SchedulerType::Launchd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_literals_and_wildcards() {
        let interval = translate_schedule("30 6 * * *").unwrap();
        assert_eq!(interval.minute, Some(30));
        assert_eq!(interval.hour, Some(6));
        assert_eq!(interval.day, None);
        assert_eq!(interval.month, None);
        assert_eq!(interval.weekday, None);
    }

    #[test]
    fn test_translate_drops_seconds_field() {
        let five = translate_schedule("0 8 * * 1").unwrap();
        let six = translate_schedule("0 0 8 * * 1").unwrap();
        assert_eq!(five, six);
        assert_eq!(six.weekday, Some(1));
    }

    #[test]
    fn test_translate_rejects_step() {
        let err = translate_schedule("*/15 * * * *").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("step"));
        assert!(message.contains("minute"));
        assert!(message.contains("*/15"));
    }

    #[test]
    fn test_translate_rejects_range() {
        let err = translate_schedule("0 9 * * 1-5").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("range"));
        assert!(message.contains("weekday"));
        assert!(message.contains("1-5"));
    }

    #[test]
    fn test_translate_rejects_list() {
        let err = translate_schedule("0 6,18 * * *").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("list"));
        assert!(message.contains("hour"));
        assert!(message.contains("6,18"));
    }

    #[test]
    fn test_translate_rejects_out_of_range() {
        assert!(translate_schedule("0 6 32 * *").is_err());
        assert!(translate_schedule("0 6 * 13 *").is_err());
        assert!(translate_schedule("0 6 * * 8").is_err());
    }

    #[test]
    fn test_render_plist_shape() {
        let interval = translate_schedule("0 6 * * *").unwrap();
        let plist = render_plist(
            "com.jazz.groove.digest",
            &["/usr/local/bin/jazz".into(), "groove".into(), "run".into(), "digest".into()],
            &interval,
            Path::new("/tmp/groove-digest.log"),
            Path::new("/tmp/groove-digest.err.log"),
        );
        assert!(plist.contains("<string>com.jazz.groove.digest</string>"));
        assert!(plist.contains("<key>Minute</key>"));
        assert!(plist.contains("<integer>0</integer>"));
        assert!(plist.contains("<key>Hour</key>"));
        assert!(plist.contains("<integer>6</integer>"));
        // Wildcard fields are omitted entirely.
        assert!(!plist.contains("<key>Day</key>"));
        assert!(!plist.contains("<key>Weekday</key>"));
        assert!(plist.contains("<key>RunAtLoad</key>\n    <false/>"));
    }

    #[tokio::test]
    async fn test_unschedule_never_scheduled_is_ok() {
        let dir = std::env::temp_dir().join("jazz-test-launchd-unsched");
        std::fs::remove_dir_all(&dir).ok();
        let paths = JazzPaths::with_home(dir.clone());
        let scheduler = LaunchdScheduler::new(&paths, &SchedulerConfig::default());
        scheduler.unschedule("never-scheduled").await.unwrap();
        assert!(!scheduler.is_scheduled("never-scheduled").await.unwrap());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_schedule_fails_before_os_registration() {
        let dir = std::env::temp_dir().join("jazz-test-launchd-reject");
        std::fs::remove_dir_all(&dir).ok();
        let paths = JazzPaths::with_home(dir.clone());
        let scheduler = LaunchdScheduler::new(&paths, &SchedulerConfig::default());
        let groove = GrooveMetadata {
            name: "stepper".into(),
            schedule: Some("*/15 * * * *".into()),
            catch_up_on_startup: false,
            max_catch_up_age: None,
            max_iterations: None,
            auto_approve: None,
            agent: None,
        };

        let err = scheduler.schedule(&groove, "researcher").await.unwrap_err();
        assert!(err.to_string().contains("minute"));
        // Untranslatable schedules leave no metadata behind.
        assert!(!scheduler.is_scheduled("stepper").await.unwrap());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_render_plist_escapes_arguments() {
        let interval = translate_schedule("* * * * *").unwrap();
        let plist = render_plist(
            "com.jazz.groove.x",
            &["a&b<c>".into()],
            &interval,
            Path::new("/tmp/o"),
            Path::new("/tmp/e"),
        );
        assert!(plist.contains("<string>a&amp;b&lt;c&gt;</string>"));
    }
}
