use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecurrencePattern {
    Daily,
    Weekly,
    Monthly,
}

impl fmt::Display for RecurrencePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        };
        f.write_str(label)
    }
}

impl FromStr for RecurrencePattern {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(anyhow!("unknown recurrence pattern: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: Uuid,

    pub user_id: String,

    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    pub category_id: Uuid,

    #[serde(default)]
    pub estimated_minutes: Option<u32>,

    #[serde(default)]
    pub actual_minutes: Option<u32>,

    #[serde(default)]
    pub due: Option<DateTime<Utc>>,

    #[serde(default)]
    pub reminder: Option<DateTime<Utc>>,

    #[serde(default)]
    pub recurring: bool,

    #[serde(default)]
    pub recurrence: Option<RecurrencePattern>,

    #[serde(default)]
    pub completed: bool,

    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn from_draft(draft: TaskDraft, user_id: &str, now: DateTime<Utc>) -> anyhow::Result<Self> {
        draft.validate()?;

        let mut task = Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            title: draft.title.trim().to_string(),
            description: normalize_text(draft.description),
            category_id: draft.category_id,
            estimated_minutes: draft.estimated_minutes,
            actual_minutes: draft.actual_minutes,
            due: draft.due,
            reminder: draft.reminder,
            recurring: draft.recurrence.is_some(),
            recurrence: draft.recurrence,
            completed: false,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        task.set_completed(draft.completed, now);
        Ok(task)
    }

    /// Keeps `completed_at` present exactly when `completed` is set.
    pub fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) {
        if completed && !self.completed {
            self.completed_at = Some(now);
        } else if completed {
            self.completed_at = self.completed_at.or(Some(now));
        } else {
            self.completed_at = None;
        }
        self.completed = completed;
        self.updated_at = now;
    }

    /// True when `completed_at` is present exactly when `completed` is set.
    pub fn has_consistent_completion(&self) -> bool {
        self.completed == self.completed_at.is_some()
    }

    pub fn is_active(&self) -> bool {
        !self.completed
    }

    pub fn short_id(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }
}

/// Input for a new task, as collected by the add form.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub category_id: Uuid,
    pub estimated_minutes: Option<u32>,
    pub actual_minutes: Option<u32>,
    pub due: Option<DateTime<Utc>>,
    pub reminder: Option<DateTime<Utc>>,
    pub recurrence: Option<RecurrencePattern>,
    pub completed: bool,
}

impl TaskDraft {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.title.trim().is_empty() {
            return Err(anyhow!("title is required"));
        }
        validate_minutes("estimated time", self.estimated_minutes)?;
        validate_minutes("actual time", self.actual_minutes)?;
        Ok(())
    }
}

/// Partial update; `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub category_id: Option<Uuid>,
    pub estimated_minutes: Option<Option<u32>>,
    pub actual_minutes: Option<Option<u32>>,
    pub due: Option<Option<DateTime<Utc>>>,
    pub reminder: Option<Option<DateTime<Utc>>>,
    pub recurrence: Option<Option<RecurrencePattern>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category_id.is_none()
            && self.estimated_minutes.is_none()
            && self.actual_minutes.is_none()
            && self.due.is_none()
            && self.reminder.is_none()
            && self.recurrence.is_none()
    }

    pub fn apply(self, task: &mut Task, now: DateTime<Utc>) -> anyhow::Result<()> {
        if let Some(title) = self.title {
            if title.trim().is_empty() {
                return Err(anyhow!("title is required"));
            }
            task.title = title.trim().to_string();
        }
        if let Some(description) = self.description {
            task.description = normalize_text(description);
        }
        if let Some(category_id) = self.category_id {
            task.category_id = category_id;
        }
        if let Some(estimated) = self.estimated_minutes {
            validate_minutes("estimated time", estimated)?;
            task.estimated_minutes = estimated;
        }
        if let Some(actual) = self.actual_minutes {
            validate_minutes("actual time", actual)?;
            task.actual_minutes = actual;
        }
        if let Some(due) = self.due {
            task.due = due;
        }
        if let Some(reminder) = self.reminder {
            task.reminder = reminder;
        }
        if let Some(recurrence) = self.recurrence {
            task.recurring = recurrence.is_some();
            task.recurrence = recurrence;
        }
        task.updated_at = now;
        Ok(())
    }
}

fn validate_minutes(label: &str, minutes: Option<u32>) -> anyhow::Result<()> {
    match minutes {
        Some(0) => Err(anyhow!("{label} must be a positive number of minutes")),
        _ => Ok(()),
    }
}

fn normalize_text(text: Option<String>) -> Option<String> {
    text.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
