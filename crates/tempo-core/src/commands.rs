use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::category::{CategoryPatch, DEFAULT_CATEGORY_ICON};
use crate::cli::{AddArgs, CategoryCommand, Command, EditArgs, ListArgs, ProfileArgs, ScheduleArgs};
use crate::config::Config;
use crate::datastore::DataStore;
use crate::datetime::{display_timezone, parse_date_expr, to_local};
use crate::filter::{CategoryFilter, StatusFilter, TaskFilter};
use crate::render::Renderer;
use crate::schedule::{ResponseFileAdvisor, ScheduleRequest, format_history, request_suggestion};
use crate::task::{TaskDraft, TaskPatch};

#[instrument(skip(store, cfg, renderer, command, now))]
pub fn dispatch(
    store: &DataStore,
    cfg: &Config,
    renderer: &Renderer,
    command: Command,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    debug!(?command, "dispatching command");

    match command {
        Command::Tasks(args) => cmd_tasks(store, cfg, renderer, args, now),
        Command::Add(args) => cmd_add(store, renderer, args, now),
        Command::Edit(args) => cmd_edit(store, renderer, args, now),
        Command::Done { ids } => cmd_set_completed(store, renderer, &ids, true, now),
        Command::Undone { ids } => cmd_set_completed(store, renderer, &ids, false, now),
        Command::Toggle { id } => {
            let task = store.toggle_completed(&id, now)?;
            let state = if task.completed { "completed" } else { "active" };
            renderer.message(&format!("Task {} is now {state}.", task.short_id()));
            Ok(())
        }
        Command::Delete { id } => {
            let task = store.delete_task(&id)?;
            renderer.message(&format!("Deleted task {} '{}'.", task.short_id(), task.title));
            Ok(())
        }
        Command::Categories => renderer.print_categories(&store.snapshot()?.categories),
        Command::Category(sub) => cmd_category(store, renderer, sub, now),
        Command::Dashboard => {
            let snapshot = store.snapshot()?;
            renderer.print_dashboard(&snapshot.dashboard(&to_local(now)))
        }
        Command::History { limit } => {
            let snapshot = store.snapshot()?;
            let history = format_history(&snapshot.tasks, display_timezone(), limit);
            if history.is_empty() {
                renderer.message("No completed tasks yet.");
            } else {
                renderer.message(&history);
            }
            Ok(())
        }
        Command::Schedule(args) => cmd_schedule(store, renderer, args),
        Command::Contrast { color } => renderer.print_contrast(&color),
        Command::Icons => renderer.print_icons(),
        Command::Profile(args) => cmd_profile(store, renderer, args),
    }
}

#[instrument(skip(store, cfg, renderer, args, now))]
fn cmd_tasks(
    store: &DataStore,
    cfg: &Config,
    renderer: &Renderer,
    args: ListArgs,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let status = match args.status {
        Some(status) => status,
        None => match cfg.get("filter.status") {
            Some(raw) => raw.parse::<StatusFilter>().context("invalid filter.status")?,
            None => StatusFilter::default(),
        },
    };
    let category = args
        .category
        .as_deref()
        .map(|selector| store.resolve_category_id(selector))
        .transpose()?;

    let snapshot = store.snapshot()?;
    let filter = TaskFilter::new(CategoryFilter::from(category), status);
    let view = snapshot.task_list(filter, &to_local(now));
    let pills = snapshot.category_pills(category);

    info!(status = %status, "listing tasks");
    renderer.print_task_list(&pills, &view)
}

#[instrument(skip(store, renderer, args, now), fields(title = %args.title))]
fn cmd_add(
    store: &DataStore,
    renderer: &Renderer,
    args: AddArgs,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let category_id = match args.category.as_deref() {
        Some(selector) => store.resolve_category_id(selector)?,
        None => default_category_id(store)?,
    };

    let draft = TaskDraft {
        title: args.title,
        description: args.description,
        category_id,
        estimated_minutes: args.estimate,
        actual_minutes: args.actual,
        due: parse_optional_date(args.due.as_deref(), now)?,
        reminder: parse_optional_date(args.reminder.as_deref(), now)?,
        recurrence: args.recur,
        completed: args.done,
    };

    let task = store.add_task(draft, now)?;
    renderer.message(&format!("Created task {}.", task.short_id()));
    Ok(())
}

#[instrument(skip(store, renderer, args, now), fields(id = %args.id))]
fn cmd_edit(
    store: &DataStore,
    renderer: &Renderer,
    args: EditArgs,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let patch = TaskPatch {
        title: args.title,
        description: clearable(args.description, args.clear_description),
        category_id: args
            .category
            .as_deref()
            .map(|selector| store.resolve_category_id(selector))
            .transpose()?,
        estimated_minutes: clearable(args.estimate, args.clear_estimate),
        actual_minutes: clearable(args.actual, args.clear_actual),
        due: clearable(parse_optional_date(args.due.as_deref(), now)?, args.clear_due),
        reminder: clearable(
            parse_optional_date(args.reminder.as_deref(), now)?,
            args.clear_reminder,
        ),
        recurrence: clearable(args.recur, args.no_recur),
    };

    if patch.is_empty() {
        return Err(anyhow!("nothing to change"));
    }

    let task = store.update_task(&args.id, patch, now)?;
    let snapshot = store.snapshot()?;
    let category = snapshot.category_index().resolve(task.category_id);
    renderer.print_task_detail(&task, category.name)
}

fn cmd_set_completed(
    store: &DataStore,
    renderer: &Renderer,
    ids: &[String],
    completed: bool,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    if ids.is_empty() {
        return Err(anyhow!("at least one task id is required"));
    }

    let selectors: Vec<&str> = ids.iter().map(String::as_str).collect();
    let verb = if completed { "Completed" } else { "Reopened" };
    for task in store.set_completed_many(&selectors, completed, now)? {
        renderer.message(&format!("{verb} task {} '{}'.", task.short_id(), task.title));
    }
    Ok(())
}

#[instrument(skip(store, renderer, command, now))]
fn cmd_category(
    store: &DataStore,
    renderer: &Renderer,
    command: CategoryCommand,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    match command {
        CategoryCommand::Add { name, color, icon } => {
            let category = store.add_category(
                &name,
                color.as_deref().unwrap_or_default(),
                icon.unwrap_or(DEFAULT_CATEGORY_ICON),
                now,
            )?;
            renderer.message(&format!(
                "Created category {} '{}' ({}).",
                category.short_id(),
                category.name,
                category.color
            ));
        }
        CategoryCommand::Edit {
            selector,
            name,
            color,
            icon,
        } => {
            let patch = CategoryPatch { name, color, icon };
            if patch.is_empty() {
                return Err(anyhow!("nothing to change"));
            }
            let category = store.update_category(&selector, patch, now)?;
            renderer.message(&format!("Updated category '{}'.", category.name));
        }
        CategoryCommand::Delete { selector } => {
            let category = store.delete_category(&selector)?;
            renderer.message(&format!("Deleted category '{}'.", category.name));
        }
    }
    Ok(())
}

#[instrument(skip(store, renderer, args), fields(task_type = %args.task_type))]
fn cmd_schedule(store: &DataStore, renderer: &Renderer, args: ScheduleArgs) -> anyhow::Result<()> {
    let snapshot = store.snapshot()?;
    let history = format_history(&snapshot.tasks, display_timezone(), args.limit);
    let request = ScheduleRequest::new(args.task_type, history);
    request
        .validate()
        .context("complete some tasks first so there is history to learn from")?;

    match args.response {
        Some(path) => {
            let advisor = ResponseFileAdvisor::new(&path);
            let suggestion = request_suggestion(&advisor, &request)?;
            renderer.print_suggestion(&suggestion)
        }
        None => {
            warn!("no --response given; printing the request for an external service");
            renderer.print_schedule_request(&request)
        }
    }
}

fn cmd_profile(store: &DataStore, renderer: &Renderer, args: ProfileArgs) -> anyhow::Result<()> {
    let mut profile = store.load_profile()?;
    let changed = args.name.is_some()
        || args.email.is_some()
        || args.avatar.is_some()
        || args.theme.is_some();

    if let Some(name) = args.name {
        profile.display_name = Some(name).filter(|n| !n.trim().is_empty());
    }
    if let Some(email) = args.email {
        profile.email = Some(email).filter(|e| !e.trim().is_empty());
    }
    if let Some(avatar) = args.avatar {
        profile.avatar_url = Some(avatar).filter(|a| !a.trim().is_empty());
    }
    if let Some(theme) = args.theme {
        profile.theme = theme;
    }

    if changed {
        store.save_profile(&profile)?;
        info!(uid = %profile.uid, "profile updated");
    }
    renderer.print_profile(&profile)
}

fn default_category_id(store: &DataStore) -> anyhow::Result<uuid::Uuid> {
    let categories = store.load_categories()?;
    categories
        .iter()
        .find(|category| category.protected)
        .or_else(|| categories.first())
        .map(|category| category.id)
        .ok_or_else(|| anyhow!("no categories available; create one first"))
}

fn parse_optional_date(
    raw: Option<&str>,
    now: DateTime<Utc>,
) -> anyhow::Result<Option<DateTime<Utc>>> {
    raw.map(|value| parse_date_expr(value, now)).transpose()
}

/// Maps a set/clear flag pair onto a patch field.
fn clearable<T>(value: Option<T>, clear: bool) -> Option<Option<T>> {
    if clear { Some(None) } else { value.map(Some) }
}

#[cfg(test)]
mod tests {
    use super::clearable;

    #[test]
    fn clear_flag_wins_over_missing_value() {
        assert_eq!(clearable::<u32>(None, true), Some(None));
        assert_eq!(clearable(Some(5), false), Some(Some(5)));
        assert_eq!(clearable::<u32>(None, false), None);
    }
}
