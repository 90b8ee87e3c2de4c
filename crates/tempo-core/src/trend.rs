use std::collections::HashMap;

use chrono::{DateTime, Days, NaiveDate, TimeZone};

use crate::task::Task;

/// Days shown by the completion trend chart.
pub const TREND_WINDOW_DAYS: usize = 7;

pub const TREND_EMPTY_MESSAGE: &str = "No task completion data for the last 7 days.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendBucket {
    pub date: NaiveDate,
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionTrend {
    pub buckets: Vec<TrendBucket>,
}

impl CompletionTrend {
    /// False when every bucket is zero; the chart is replaced by an empty-state message then.
    pub fn has_data(&self) -> bool {
        self.buckets.iter().any(|bucket| bucket.count > 0)
    }

    pub fn total(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.count).sum()
    }

    pub fn max_count(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.count).max().unwrap_or(0)
    }
}

/// Consecutive calendar days ending at `today`, oldest first.
pub fn day_window(today: NaiveDate, days: usize) -> Vec<NaiveDate> {
    (0..days)
        .rev()
        .filter_map(|offset| today.checked_sub_days(Days::new(offset as u64)))
        .collect()
}

/// Counts completions per local calendar day over the window ending at `now`.
///
/// Days are compared in `now`'s timezone, so a task completed late in the
/// evening lands on that evening's bucket even when its UTC date differs.
#[tracing::instrument(skip(tasks, now), fields(task_count = tasks.len()))]
pub fn completion_trend<Tz: TimeZone>(
    tasks: &[Task],
    now: &DateTime<Tz>,
    days: usize,
) -> CompletionTrend {
    let tz = now.timezone();

    let mut per_day: HashMap<NaiveDate, usize> = HashMap::new();
    for task in tasks.iter().filter(|task| task.completed) {
        if let Some(completed_at) = task.completed_at {
            let day = completed_at.with_timezone(&tz).date_naive();
            *per_day.entry(day).or_default() += 1;
        }
    }

    let buckets = day_window(now.date_naive(), days)
        .into_iter()
        .map(|date| TrendBucket {
            date,
            label: date.format("%b %-d").to_string(),
            count: per_day.get(&date).copied().unwrap_or(0),
        })
        .collect();

    CompletionTrend { buckets }
}
