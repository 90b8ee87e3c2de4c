use std::collections::HashMap;

use uuid::Uuid;

use crate::category::{Category, FALLBACK_PALETTE};
use crate::format::truncate_label;
use crate::task::Task;

pub const CATEGORY_TIME_EMPTY_MESSAGE: &str = "No time tracked yet to display this chart.";
pub const ESTIMATE_EMPTY_MESSAGE: &str = "No tasks with estimated and actual time to display.";

/// Rows shown by the estimated-vs-actual chart.
pub const ESTIMATE_ROW_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTime {
    pub category_id: Uuid,
    pub name: String,
    pub minutes: u64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EstimateRow {
    pub task_id: Uuid,
    pub label: String,
    pub estimated: u32,
    pub actual: u32,
}

impl EstimateRow {
    pub fn overrun(&self) -> i64 {
        i64::from(self.actual) - i64::from(self.estimated)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardSummary {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    pub estimated_minutes: u64,
    pub actual_minutes: u64,
}

impl DashboardSummary {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let completed = tasks.iter().filter(|task| task.completed).count();
        Self {
            total: tasks.len(),
            completed,
            active: tasks.len() - completed,
            estimated_minutes: tasks
                .iter()
                .map(|task| u64::from(task.estimated_minutes.unwrap_or(0)))
                .sum(),
            actual_minutes: tasks
                .iter()
                .map(|task| u64::from(task.actual_minutes.unwrap_or(0)))
                .sum(),
        }
    }
}

/// Actual time summed per category, in category order.
///
/// Missing actual time counts as zero and categories whose sum stays at zero
/// are dropped. Categories without a colour take a palette entry chosen by
/// their position.
#[tracing::instrument(skip_all, fields(tasks = tasks.len(), categories = categories.len()))]
pub fn time_per_category(tasks: &[Task], categories: &[Category]) -> Vec<CategoryTime> {
    let mut totals: HashMap<Uuid, u64> = HashMap::new();
    for task in tasks {
        *totals.entry(task.category_id).or_default() +=
            u64::from(task.actual_minutes.unwrap_or(0));
    }

    categories
        .iter()
        .enumerate()
        .filter_map(|(index, category)| {
            let minutes = totals.get(&category.id).copied().unwrap_or(0);
            if minutes == 0 {
                return None;
            }
            let color = if category.has_color() {
                category.color.clone()
            } else {
                FALLBACK_PALETTE[index % FALLBACK_PALETTE.len()].to_string()
            };
            Some(CategoryTime {
                category_id: category.id,
                name: category.name.clone(),
                minutes,
                color,
            })
        })
        .collect()
}

/// Completed tasks carrying both an estimate and an actual time, in input order.
pub fn estimated_vs_actual(tasks: &[Task], limit: usize) -> Vec<EstimateRow> {
    tasks
        .iter()
        .filter(|task| task.completed)
        .filter_map(|task| match (task.estimated_minutes, task.actual_minutes) {
            (Some(estimated), Some(actual)) if estimated > 0 && actual > 0 => Some(EstimateRow {
                task_id: task.id,
                label: truncate_label(&task.title),
                estimated,
                actual,
            }),
            _ => None,
        })
        .take(limit)
        .collect()
}
