use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::{TimeZone, Timelike};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::task::Task;

/// Most recent completed tasks included in the history block.
pub const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Anytime,
}

impl TimeOfDay {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            0..=11 => Self::Morning,
            12..=17 => Self::Afternoon,
            _ => Self::Evening,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
            Self::Anytime => "anytime",
        }
    }
}

/// One history line, e.g. `Task: "Gym", Duration: 45 minutes, Completed: morning.`
pub fn history_line<Tz: TimeZone>(task: &Task, tz: &Tz) -> String {
    let time_of_day = task
        .completed_at
        .map(|at| TimeOfDay::from_hour(at.with_timezone(tz).hour()))
        .unwrap_or(TimeOfDay::Anytime);
    let duration = match task.actual_minutes {
        Some(minutes) if minutes > 0 => format!("{minutes} minutes"),
        _ => "unknown duration".to_string(),
    };
    format!(
        "Task: \"{}\", Duration: {}, Completed: {}.",
        task.title,
        duration,
        time_of_day.label()
    )
}

/// Completed tasks, most recently completed first, one line each.
#[tracing::instrument(skip(tasks, tz), fields(tasks = tasks.len()))]
pub fn format_history<Tz: TimeZone>(tasks: &[Task], tz: &Tz, limit: usize) -> String {
    let mut completed: Vec<&Task> = tasks.iter().filter(|task| task.completed).collect();
    completed.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));

    let lines: Vec<String> = completed
        .into_iter()
        .take(limit)
        .map(|task| history_line(task, tz))
        .collect();
    debug!(lines = lines.len(), "formatted task history");
    lines.join("\n")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    pub task_type: String,
    pub past_task_data: String,
}

impl ScheduleRequest {
    pub fn new(task_type: impl Into<String>, past_task_data: impl Into<String>) -> Self {
        Self {
            task_type: task_type.into(),
            past_task_data: past_task_data.into(),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.task_type.trim().is_empty() || self.past_task_data.trim().is_empty() {
            return Err(anyhow!("task type and past data are required"));
        }
        Ok(())
    }

    pub fn prompt(&self) -> String {
        format!(
            "You are an AI assistant that analyzes a user's past task data and suggests \
             optimal times for scheduling similar tasks in the future.\n\n\
             Analyze the following past task data:\n{}\n\n\
             For the task type: {},\n\
             suggest an optimal schedule with an explanation:\n",
            self.past_task_data.trim(),
            self.task_type.trim()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSuggestion {
    pub suggested_schedule: String,
    pub explanation: String,
}

/// The language-model service that turns history into a suggested schedule.
pub trait ScheduleAdvisor {
    fn suggest(&self, request: &ScheduleRequest) -> anyhow::Result<ScheduleSuggestion>;
}

/// Validates the request, then asks the advisor. Failures are reported, not retried.
#[tracing::instrument(skip(advisor, request), fields(task_type = %request.task_type))]
pub fn request_suggestion<A: ScheduleAdvisor + ?Sized>(
    advisor: &A,
    request: &ScheduleRequest,
) -> anyhow::Result<ScheduleSuggestion> {
    request.validate()?;
    let suggestion = advisor
        .suggest(request)
        .context("could not get a smart schedule suggestion")?;
    info!("received schedule suggestion");
    Ok(suggestion)
}

/// Reads a suggestion the service wrote to disk as JSON.
#[derive(Debug, Clone)]
pub struct ResponseFileAdvisor {
    path: PathBuf,
}

impl ResponseFileAdvisor {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl ScheduleAdvisor for ResponseFileAdvisor {
    fn suggest(&self, _request: &ScheduleRequest) -> anyhow::Result<ScheduleSuggestion> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let suggestion: ScheduleSuggestion = serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing suggestion in {}", self.path.display()))?;
        Ok(suggestion)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use chrono::{TimeZone, Utc};
    use tempfile::NamedTempFile;
    use uuid::Uuid;

    use super::*;
    use crate::task::TaskDraft;

    fn completed(title: &str, hour: u32, actual: Option<u32>) -> Task {
        let at = Utc.with_ymd_and_hms(2026, 6, 1, hour, 15, 0).unwrap();
        let mut task = Task::from_draft(
            TaskDraft {
                title: title.to_string(),
                category_id: Uuid::new_v4(),
                actual_minutes: actual,
                ..TaskDraft::default()
            },
            "u1",
            at,
        )
        .unwrap();
        task.set_completed(true, at);
        task
    }

    struct FixedAdvisor;

    impl ScheduleAdvisor for FixedAdvisor {
        fn suggest(&self, request: &ScheduleRequest) -> anyhow::Result<ScheduleSuggestion> {
            Ok(ScheduleSuggestion {
                suggested_schedule: format!("{} at 9 AM", request.task_type),
                explanation: "mornings go well".to_string(),
            })
        }
    }

    #[test]
    fn history_lines_use_fixed_format() {
        let tz = chrono_tz::UTC;
        assert_eq!(
            history_line(&completed("Gym", 7, Some(45)), &tz),
            "Task: \"Gym\", Duration: 45 minutes, Completed: morning."
        );
        assert_eq!(
            history_line(&completed("Report", 14, None), &tz),
            "Task: \"Report\", Duration: unknown duration, Completed: afternoon."
        );
        assert_eq!(
            history_line(&completed("Read", 21, Some(30)), &tz),
            "Task: \"Read\", Duration: 30 minutes, Completed: evening."
        );
    }

    #[test]
    fn missing_completion_time_is_anytime() {
        let mut task = completed("Legacy", 10, None);
        task.completed_at = None;
        assert!(history_line(&task, &chrono_tz::UTC).ends_with("Completed: anytime."));
    }

    #[test]
    fn history_is_most_recent_first_and_skips_active() {
        let mut active = completed("Active", 8, None);
        active.set_completed(false, Utc::now());
        let tasks = vec![completed("Early", 6, None), active, completed("Late", 20, None)];

        let history = format_history(&tasks, &chrono_tz::UTC, HISTORY_LIMIT);
        let lines: Vec<&str> = history.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Late"));
        assert!(lines[1].contains("Early"));

        assert_eq!(format_history(&tasks, &chrono_tz::UTC, 1).lines().count(), 1);
    }

    #[test]
    fn request_requires_both_fields() {
        let advisor = FixedAdvisor;
        assert!(request_suggestion(&advisor, &ScheduleRequest::new("  ", "data")).is_err());
        assert!(request_suggestion(&advisor, &ScheduleRequest::new("Study", "")).is_err());

        let suggestion =
            request_suggestion(&advisor, &ScheduleRequest::new("Study", "Task: \"x\"")).unwrap();
        assert_eq!(suggestion.suggested_schedule, "Study at 9 AM");
    }

    #[test]
    fn prompt_embeds_history_and_type() {
        let prompt = ScheduleRequest::new("Workout", "Task: \"Gym\"").prompt();
        assert!(prompt.contains("Task: \"Gym\""));
        assert!(prompt.contains("For the task type: Workout,"));
    }

    #[test]
    fn response_file_advisor_reads_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"suggestedSchedule":"Mornings","explanation":"You finish early tasks faster."}}"#
        )
        .unwrap();

        let advisor = ResponseFileAdvisor::new(file.path());
        let suggestion =
            request_suggestion(&advisor, &ScheduleRequest::new("Study", "Task: \"x\"")).unwrap();
        assert_eq!(suggestion.suggested_schedule, "Mornings");
    }
}
