use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use tracing::trace;
use uuid::Uuid;

use crate::task::Task;

pub const LIST_EMPTY_MESSAGE: &str =
  "No tasks found for this category or \
   filter.";

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
)]
pub enum StatusFilter {
  /// Hides completed tasks; the list
  /// opens this way.
  #[default]
  Active,
  Completed,
  All
}

impl StatusFilter {
  pub fn matches(
    self,
    task: &Task
  ) -> bool {
    match self {
      | Self::Active => !task.completed,
      | Self::Completed => task.completed,
      | Self::All => true
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      | Self::Active => "Active",
      | Self::Completed => "Completed",
      | Self::All => "All"
    }
  }
}

impl fmt::Display for StatusFilter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.label())
  }
}

impl FromStr for StatusFilter {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "active" | "pending" => {
        Ok(Self::Active)
      }
      | "completed" | "done" => {
        Ok(Self::Completed)
      }
      | "all" => Ok(Self::All),
      | other => Err(anyhow!(
        "unknown status filter: \
         {other} (expected active, \
         completed or all)"
      ))
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
)]
pub enum CategoryFilter {
  #[default]
  All,
  Only(Uuid)
}

impl CategoryFilter {
  pub fn matches(
    self,
    task: &Task
  ) -> bool {
    match self {
      | Self::All => true,
      | Self::Only(id) => {
        task.category_id == id
      }
    }
  }

  pub fn selected(
    self
  ) -> Option<Uuid> {
    match self {
      | Self::All => None,
      | Self::Only(id) => Some(id)
    }
  }
}

impl From<Option<Uuid>>
  for CategoryFilter
{
  fn from(value: Option<Uuid>) -> Self {
    value
      .map(Self::Only)
      .unwrap_or_default()
  }
}

/// Conjunction of a category and a
/// status constraint.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
)]
pub struct TaskFilter {
  pub category: CategoryFilter,
  pub status:   StatusFilter
}

impl TaskFilter {
  pub fn new(
    category: CategoryFilter,
    status: StatusFilter
  ) -> Self {
    Self {
      category,
      status
    }
  }

  pub fn matches(
    &self,
    task: &Task
  ) -> bool {
    self.category.matches(task)
      && self.status.matches(task)
  }

  /// Matching tasks in input order.
  #[tracing::instrument(skip(self, tasks), fields(filter = ?self))]
  pub fn apply<'a>(
    &self,
    tasks: &'a [Task]
  ) -> Vec<&'a Task> {
    let out: Vec<&Task> = tasks
      .iter()
      .filter(|task| self.matches(task))
      .collect();
    trace!(
      input = tasks.len(),
      matched = out.len(),
      "applied task filter"
    );
    out
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    TimeZone,
    Utc
  };
  use uuid::Uuid;

  use super::{
    CategoryFilter,
    StatusFilter,
    TaskFilter
  };
  use crate::task::{
    Task,
    TaskDraft
  };

  fn task(
    title: &str,
    category_id: Uuid,
    completed: bool
  ) -> Task {
    let now = Utc
      .with_ymd_and_hms(
        2026, 2, 16, 5, 0, 0
      )
      .unwrap();
    let mut task = Task::from_draft(
      TaskDraft {
        title: title.to_string(),
        category_id,
        ..TaskDraft::default()
      },
      "u1",
      now
    )
    .unwrap();
    task.set_completed(completed, now);
    task
  }

  fn titles(
    tasks: &[&Task]
  ) -> Vec<String> {
    tasks
      .iter()
      .map(|t| t.title.clone())
      .collect()
  }

  #[test]
  fn default_is_active_and_all_categories()
  {
    let filter = TaskFilter::default();
    assert_eq!(
      filter.status,
      StatusFilter::Active
    );
    assert_eq!(
      filter.category,
      CategoryFilter::All
    );
  }

  #[test]
  fn combines_category_and_status() {
    let work = Uuid::new_v4();
    let home = Uuid::new_v4();
    let tasks = vec![
      task("a", work, false),
      task("b", home, false),
      task("c", work, true),
      task("d", work, false),
    ];

    let active_work = TaskFilter::new(
      CategoryFilter::Only(work),
      StatusFilter::Active
    );
    assert_eq!(
      titles(&active_work.apply(&tasks)),
      vec!["a", "d"]
    );

    let done = TaskFilter::new(
      CategoryFilter::All,
      StatusFilter::Completed
    );
    assert_eq!(
      titles(&done.apply(&tasks)),
      vec!["c"]
    );
  }

  #[test]
  fn refiltering_is_idempotent() {
    let work = Uuid::new_v4();
    let tasks = vec![
      task("a", work, false),
      task("b", work, true),
      task("c", Uuid::new_v4(), false),
    ];
    let filter = TaskFilter::new(
      CategoryFilter::Only(work),
      StatusFilter::Active
    );

    let once: Vec<Task> = filter
      .apply(&tasks)
      .into_iter()
      .cloned()
      .collect();
    let twice = TaskFilter::new(
      CategoryFilter::All,
      StatusFilter::Active
    )
    .apply(&once);
    assert_eq!(
      titles(&twice),
      vec!["a"]
    );
  }

  #[test]
  fn pass_order_does_not_matter() {
    let work = Uuid::new_v4();
    let home = Uuid::new_v4();
    let tasks = vec![
      task("a", work, false),
      task("b", home, false),
      task("c", work, true),
      task("d", work, false),
      task("e", home, true),
      task("f", work, false),
    ];

    let by_category = TaskFilter::new(
      CategoryFilter::Only(work),
      StatusFilter::All
    );
    let by_status = TaskFilter::new(
      CategoryFilter::All,
      StatusFilter::Active
    );
    let combined = TaskFilter::new(
      CategoryFilter::Only(work),
      StatusFilter::Active
    );

    let owned = |refs: Vec<&Task>| {
      refs
        .into_iter()
        .cloned()
        .collect::<Vec<Task>>()
    };
    let category_first = owned(
      by_category.apply(&tasks)
    );
    let status_first = owned(
      by_status.apply(&tasks)
    );

    let expected =
      titles(&combined.apply(&tasks));
    assert_eq!(
      expected,
      vec!["a", "d", "f"]
    );
    assert_eq!(
      titles(
        &by_status.apply(&category_first)
      ),
      expected
    );
    assert_eq!(
      titles(
        &by_category.apply(&status_first)
      ),
      expected
    );
  }

  #[test]
  fn all_status_is_superset_of_active() {
    let work = Uuid::new_v4();
    let tasks = vec![
      task("a", work, false),
      task("b", work, true),
      task("c", work, false),
    ];

    let all = TaskFilter::new(
      CategoryFilter::Only(work),
      StatusFilter::All
    )
    .apply(&tasks);
    let active = TaskFilter::new(
      CategoryFilter::Only(work),
      StatusFilter::Active
    )
    .apply(&tasks);

    assert!(active.iter().all(|t| {
      all.iter().any(|a| a.id == t.id)
    }));
    assert_eq!(all.len(), 3);
  }

  #[test]
  fn parses_status_names() {
    assert_eq!(
      "Completed"
        .parse::<StatusFilter>()
        .ok(),
      Some(StatusFilter::Completed)
    );
    assert!(
      "later"
        .parse::<StatusFilter>()
        .is_err()
    );
  }

  #[test]
  fn optional_id_converts_to_category_filter()
  {
    let id = Uuid::new_v4();
    assert_eq!(
      CategoryFilter::from(Some(id)),
      CategoryFilter::Only(id)
    );
    assert_eq!(
      CategoryFilter::from(None),
      CategoryFilter::All
    );
  }
}
