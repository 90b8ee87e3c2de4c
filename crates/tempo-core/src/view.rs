use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::{
    CATEGORY_TIME_EMPTY_MESSAGE, CategoryTime, DashboardSummary, ESTIMATE_EMPTY_MESSAGE,
    ESTIMATE_ROW_LIMIT, EstimateRow, estimated_vs_actual, time_per_category,
};
use crate::category::{Category, CategoryIndex};
use crate::contrast::contrast_color;
use crate::filter::{LIST_EMPTY_MESSAGE, TaskFilter};
use crate::format::{
    NOT_AVAILABLE, format_completion_rate, format_due, minutes_to_hours, relative_time,
};
use crate::icon::IconKey;
use crate::task::{RecurrencePattern, Task};
use crate::trend::{CompletionTrend, TREND_EMPTY_MESSAGE, TREND_WINDOW_DAYS, completion_trend};

pub const ALL_TASKS_PILL: &str = "All Tasks";

/// Full owner-scoped state as delivered by the store.
///
/// Each change replaces the whole snapshot; views are recomputed from
/// scratch rather than patched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub categories: Vec<Category>,
    pub tasks: Vec<Task>,
}

/// A derived view, or the message to show in place of an empty chart.
#[derive(Debug, Clone, PartialEq)]
pub enum Panel<T> {
    Ready(T),
    Empty(&'static str),
}

impl<T> Panel<T> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Panel::Empty(_))
    }
}

fn rows_panel<R>(rows: Vec<R>, empty: &'static str) -> Panel<Vec<R>> {
    if rows.is_empty() {
        Panel::Empty(empty)
    } else {
        Panel::Ready(rows)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub summary: DashboardSummary,
    pub completion_rate: String,
    pub actual_hours: String,
    pub estimated_hours: String,
    pub time_per_category: Panel<Vec<CategoryTime>>,
    pub trend: Panel<CompletionTrend>,
    pub estimates: Panel<Vec<EstimateRow>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskCard {
    pub id: Uuid,
    pub short_id: String,
    pub title: String,
    pub description: Option<String>,
    pub category_name: String,
    pub category_color: String,
    pub category_icon: IconKey,
    pub estimated_minutes: Option<u32>,
    pub actual_minutes: Option<u32>,
    pub due: Option<String>,
    pub created: String,
    pub recurrence: Option<RecurrencePattern>,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskListView {
    pub filter: TaskFilter,
    pub cards: Panel<Vec<TaskCard>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryPill {
    pub category_id: Option<Uuid>,
    pub label: String,
    pub selected: bool,
    /// Border and unselected text colour; `None` for the neutral "All Tasks" pill.
    pub accent: Option<String>,
    /// Background and text colour when the pill is selected.
    pub fill: Option<(String, &'static str)>,
}

impl Snapshot {
    pub fn new(categories: Vec<Category>, tasks: Vec<Task>) -> Self {
        Self { categories, tasks }
    }

    pub fn category_index(&self) -> CategoryIndex<'_> {
        CategoryIndex::new(&self.categories)
    }

    #[tracing::instrument(skip(self, now), fields(tasks = self.tasks.len()))]
    pub fn dashboard<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DashboardView {
        let summary = DashboardSummary::from_tasks(&self.tasks);
        let trend = completion_trend(&self.tasks, now, TREND_WINDOW_DAYS);

        DashboardView {
            completion_rate: format_completion_rate(summary.completed, summary.total),
            actual_hours: minutes_to_hours(summary.actual_minutes),
            estimated_hours: if summary.estimated_minutes > 0 {
                minutes_to_hours(summary.estimated_minutes)
            } else {
                NOT_AVAILABLE.to_string()
            },
            time_per_category: rows_panel(
                time_per_category(&self.tasks, &self.categories),
                CATEGORY_TIME_EMPTY_MESSAGE,
            ),
            trend: if trend.has_data() {
                Panel::Ready(trend)
            } else {
                Panel::Empty(TREND_EMPTY_MESSAGE)
            },
            estimates: rows_panel(
                estimated_vs_actual(&self.tasks, ESTIMATE_ROW_LIMIT),
                ESTIMATE_EMPTY_MESSAGE,
            ),
            summary,
        }
    }

    /// Cards for the filtered list, with times rendered in `now`'s timezone.
    #[tracing::instrument(skip(self, now), fields(tasks = self.tasks.len()))]
    pub fn task_list<Tz: TimeZone>(&self, filter: TaskFilter, now: &DateTime<Tz>) -> TaskListView
    where
        Tz::Offset: std::fmt::Display,
    {
        let index = self.category_index();
        let tz = now.timezone();

        let cards = filter
            .apply(&self.tasks)
            .into_iter()
            .map(|task| {
                let category = index.resolve(task.category_id);
                TaskCard {
                    id: task.id,
                    short_id: task.short_id(),
                    title: task.title.clone(),
                    description: task.description.clone(),
                    category_name: category.name.to_string(),
                    category_color: category.color.to_string(),
                    category_icon: category.icon,
                    estimated_minutes: task.estimated_minutes,
                    actual_minutes: task.actual_minutes,
                    due: task.due.map(|due| format_due(&due.with_timezone(&tz))),
                    created: relative_time(&task.created_at, now),
                    recurrence: task.recurrence,
                    completed: task.completed,
                }
            })
            .collect();

        TaskListView {
            filter,
            cards: rows_panel(cards, LIST_EMPTY_MESSAGE),
        }
    }

    /// The "All Tasks" pill followed by one pill per category.
    pub fn category_pills(&self, selected: Option<Uuid>) -> Vec<CategoryPill> {
        let mut pills = Vec::with_capacity(self.categories.len() + 1);
        pills.push(CategoryPill {
            category_id: None,
            label: ALL_TASKS_PILL.to_string(),
            selected: selected.is_none(),
            accent: None,
            fill: None,
        });

        for category in &self.categories {
            let is_selected = selected == Some(category.id);
            pills.push(CategoryPill {
                category_id: Some(category.id),
                label: category.name.clone(),
                selected: is_selected,
                accent: Some(category.color.clone()),
                fill: is_selected
                    .then(|| (category.color.clone(), contrast_color(&category.color))),
            });
        }

        pills
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    use super::{ALL_TASKS_PILL, Panel, Snapshot};
    use crate::category::{Category, UNCATEGORIZED_NAME};
    use crate::contrast::LIGHT_FOREGROUND;
    use crate::filter::{CategoryFilter, LIST_EMPTY_MESSAGE, StatusFilter, TaskFilter};
    use crate::format::NO_TASKS_PLACEHOLDER;
    use crate::icon::IconKey;
    use crate::task::{Task, TaskDraft};
    use crate::trend::TREND_EMPTY_MESSAGE;

    fn scenario() -> Snapshot {
        let now = Utc.with_ymd_and_hms(2026, 4, 10, 12, 0, 0).unwrap();
        let mut general = Category::default_for("u1", now);
        general.color = String::new();
        let work = Category::new("u1", "Work", "#FF0000", IconKey::Briefcase, now).unwrap();

        let mut done = Task::from_draft(
            TaskDraft {
                title: "Ship release".to_string(),
                category_id: work.id,
                actual_minutes: Some(120),
                ..TaskDraft::default()
            },
            "u1",
            now - Duration::days(2),
        )
        .unwrap();
        done.set_completed(true, now - Duration::hours(5));

        let open = Task::from_draft(
            TaskDraft {
                title: "Tidy desk".to_string(),
                category_id: general.id,
                ..TaskDraft::default()
            },
            "u1",
            now - Duration::days(1),
        )
        .unwrap();

        Snapshot::new(vec![general, work], vec![done, open])
    }

    #[test]
    fn dashboard_scenario_shows_only_work_row() {
        let now = Utc.with_ymd_and_hms(2026, 4, 10, 12, 0, 0).unwrap();
        let view = scenario().dashboard(&now);

        let Panel::Ready(rows) = &view.time_per_category else {
            panic!("expected category rows");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Work");
        assert_eq!(rows[0].minutes, 120);
        assert_eq!(rows[0].color, "#FF0000");

        assert_eq!(view.completion_rate, "50%");
        assert_eq!(view.actual_hours, "2.0");
        assert_eq!(view.estimated_hours, "N/A");
        assert!(!view.trend.is_empty());
        assert!(view.estimates.is_empty());
    }

    #[test]
    fn empty_snapshot_yields_empty_states() {
        let now = Utc.with_ymd_and_hms(2026, 4, 10, 12, 0, 0).unwrap();
        let view = Snapshot::default().dashboard(&now);
        assert_eq!(view.completion_rate, NO_TASKS_PLACEHOLDER);
        assert_eq!(view.trend, Panel::Empty(TREND_EMPTY_MESSAGE));
        assert!(view.time_per_category.is_empty());
    }

    #[test]
    fn task_list_resolves_categories_and_defaults_to_active() {
        let now = Utc.with_ymd_and_hms(2026, 4, 10, 12, 0, 0).unwrap();
        let mut snapshot = scenario();
        let mut orphan = snapshot.tasks[1].clone();
        orphan.id = Uuid::new_v4();
        orphan.category_id = Uuid::new_v4();
        snapshot.tasks.push(orphan);

        let view = snapshot.task_list(TaskFilter::default(), &now);
        let Panel::Ready(cards) = &view.cards else {
            panic!("expected cards");
        };
        assert_eq!(cards.len(), 2);
        assert!(cards.iter().all(|card| !card.completed));
        assert_eq!(cards[0].created, "1 day ago");
        assert_eq!(cards[1].category_name, UNCATEGORIZED_NAME);
    }

    #[test]
    fn task_list_reports_empty_filter() {
        let now = Utc.with_ymd_and_hms(2026, 4, 10, 12, 0, 0).unwrap();
        let snapshot = scenario();
        let filter = TaskFilter::new(
            CategoryFilter::Only(snapshot.categories[0].id),
            StatusFilter::Completed,
        );
        let view = snapshot.task_list(filter, &now);
        assert_eq!(view.cards, Panel::Empty(LIST_EMPTY_MESSAGE));
    }

    #[test]
    fn selected_pill_uses_contrast_foreground() {
        let snapshot = scenario();
        let work_id = snapshot.categories[1].id;

        let pills = snapshot.category_pills(Some(work_id));
        assert_eq!(pills.len(), 3);
        assert_eq!(pills[0].label, ALL_TASKS_PILL);
        assert!(!pills[0].selected);
        assert!(pills[2].selected);
        assert_eq!(
            pills[2].fill,
            Some(("#FF0000".to_string(), LIGHT_FOREGROUND))
        );
        assert!(pills[1].fill.is_none());

        let unselected = snapshot.category_pills(None);
        assert!(unselected[0].selected);
    }
}
