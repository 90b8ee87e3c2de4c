use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::category::{Category, CategoryPatch, swatch_for};
use crate::icon::IconKey;
use crate::profile::UserProfile;
use crate::task::{Task, TaskDraft, TaskPatch};
use crate::view::Snapshot;

/// Owner-scoped document store kept as JSONL files under `<data>/<owner>/`.
#[derive(Debug)]
pub struct DataStore {
    pub owner: String,
    pub owner_dir: PathBuf,
    pub tasks_path: PathBuf,
    pub categories_path: PathBuf,
    pub profile_path: PathBuf,
}

impl DataStore {
    /// Opens the owner's store, creating the profile and the default category on first use.
    #[tracing::instrument(skip(data_dir, now))]
    pub fn open(data_dir: &Path, owner: &str, now: DateTime<Utc>) -> anyhow::Result<Self> {
        validate_owner(owner)?;

        let owner_dir = data_dir.join(owner);
        fs::create_dir_all(&owner_dir)
            .with_context(|| format!("failed to create {}", owner_dir.display()))?;

        let tasks_path = owner_dir.join("tasks.data");
        let categories_path = owner_dir.join("categories.data");
        let profile_path = owner_dir.join("profile.json");

        for path in [&tasks_path, &categories_path] {
            if !path.exists() {
                fs::write(path, "")
                    .with_context(|| format!("failed to create {}", path.display()))?;
            }
        }

        let store = Self {
            owner: owner.to_string(),
            owner_dir,
            tasks_path,
            categories_path,
            profile_path,
        };
        store.bootstrap(now)?;

        info!(
            owner = %store.owner,
            dir = %store.owner_dir.display(),
            "opened datastore"
        );
        Ok(store)
    }

    fn bootstrap(&self, now: DateTime<Utc>) -> anyhow::Result<()> {
        if !self.profile_path.exists() {
            info!(owner = %self.owner, "creating user profile");
            self.save_profile(&UserProfile::new(&self.owner, None))?;
        }

        let categories = self.load_categories()?;
        if categories.is_empty() {
            let general = Category::default_for(&self.owner, now);
            info!(category = %general.name, "creating default category");
            self.save_categories(&[general])?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn load_tasks(&self) -> anyhow::Result<Vec<Task>> {
        let tasks: Vec<Task> =
            load_jsonl(&self.tasks_path).context("failed to load tasks.data")?;
        let tasks = self.scoped(tasks, |task| &task.user_id);

        for task in tasks
            .iter()
            .filter(|task| !task.has_consistent_completion())
        {
            warn!(
                id = %task.id,
                completed = task.completed,
                "task completion flag and timestamp disagree"
            );
        }
        Ok(tasks)
    }

    #[tracing::instrument(skip(self))]
    pub fn load_categories(&self) -> anyhow::Result<Vec<Category>> {
        let categories: Vec<Category> =
            load_jsonl(&self.categories_path).context("failed to load categories.data")?;
        Ok(self.scoped(categories, |category| &category.user_id))
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn save_tasks(&self, tasks: &[Task]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.tasks_path, tasks).context("failed to save tasks.data")
    }

    #[tracing::instrument(skip(self, categories))]
    pub fn save_categories(&self, categories: &[Category]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.categories_path, categories)
            .context("failed to save categories.data")
    }

    pub fn load_profile(&self) -> anyhow::Result<UserProfile> {
        let raw = fs::read_to_string(&self.profile_path)
            .with_context(|| format!("failed reading {}", self.profile_path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing {}", self.profile_path.display()))
    }

    pub fn save_profile(&self, profile: &UserProfile) -> anyhow::Result<()> {
        save_json_atomic(&self.profile_path, profile).context("failed to save profile.json")
    }

    /// Full current state: categories by name (case-sensitive), tasks newest first.
    #[tracing::instrument(skip(self))]
    pub fn snapshot(&self) -> anyhow::Result<Snapshot> {
        let mut categories = self.load_categories()?;
        categories.sort_by(|a, b| a.name.cmp(&b.name));

        let mut tasks = self.load_tasks()?;
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        debug!(
            categories = categories.len(),
            tasks = tasks.len(),
            "loaded snapshot"
        );
        Ok(Snapshot::new(categories, tasks))
    }

    #[tracing::instrument(skip(self, draft, now), fields(title = %draft.title))]
    pub fn add_task(&self, draft: TaskDraft, now: DateTime<Utc>) -> anyhow::Result<Task> {
        let categories = self.load_categories()?;
        ensure_category_exists(&categories, draft.category_id)?;

        let task = Task::from_draft(draft, &self.owner, now)?;
        let mut tasks = self.load_tasks()?;
        tasks.push(task.clone());
        self.save_tasks(&tasks)?;

        info!(id = %task.id, "task added");
        Ok(task)
    }

    #[tracing::instrument(skip(self, patch, now))]
    pub fn update_task(
        &self,
        selector: &str,
        patch: TaskPatch,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Task> {
        if let Some(category_id) = patch.category_id {
            ensure_category_exists(&self.load_categories()?, category_id)?;
        }

        let mut tasks = self.load_tasks()?;
        let idx = find_task(&tasks, selector)?;
        patch.apply(&mut tasks[idx], now)?;
        let updated = tasks[idx].clone();
        self.save_tasks(&tasks)?;

        info!(id = %updated.id, "task updated");
        Ok(updated)
    }

    #[tracing::instrument(skip(self, now))]
    pub fn set_completed(
        &self,
        selector: &str,
        completed: bool,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Task> {
        let mut tasks = self.load_tasks()?;
        let idx = find_task(&tasks, selector)?;
        tasks[idx].set_completed(completed, now);
        let updated = tasks[idx].clone();
        self.save_tasks(&tasks)?;

        info!(id = %updated.id, completed, "task completion changed");
        Ok(updated)
    }

    /// Resolves every selector before changing anything, then saves once.
    #[tracing::instrument(skip(self, now))]
    pub fn set_completed_many(
        &self,
        selectors: &[&str],
        completed: bool,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Task>> {
        let mut tasks = self.load_tasks()?;
        let mut indices = Vec::with_capacity(selectors.len());
        for selector in selectors {
            let idx = find_task(&tasks, selector)?;
            if !indices.contains(&idx) {
                indices.push(idx);
            }
        }

        for &idx in &indices {
            tasks[idx].set_completed(completed, now);
        }
        self.save_tasks(&tasks)?;

        info!(count = indices.len(), completed, "task completion changed");
        Ok(indices.into_iter().map(|idx| tasks[idx].clone()).collect())
    }

    #[tracing::instrument(skip(self, now))]
    pub fn toggle_completed(&self, selector: &str, now: DateTime<Utc>) -> anyhow::Result<Task> {
        let tasks = self.load_tasks()?;
        let idx = find_task(&tasks, selector)?;
        let completed = !tasks[idx].completed;
        self.set_completed(&tasks[idx].id.to_string(), completed, now)
    }

    #[tracing::instrument(skip(self))]
    pub fn delete_task(&self, selector: &str) -> anyhow::Result<Task> {
        let mut tasks = self.load_tasks()?;
        let idx = find_task(&tasks, selector)?;
        let removed = tasks.remove(idx);
        self.save_tasks(&tasks)?;

        info!(id = %removed.id, "task deleted");
        Ok(removed)
    }

    /// Adds a category; an empty colour picks the next swatch.
    #[tracing::instrument(skip(self, now))]
    pub fn add_category(
        &self,
        name: &str,
        color: &str,
        icon: IconKey,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Category> {
        let mut categories = self.load_categories()?;
        if categories
            .iter()
            .any(|category| category.name.eq_ignore_ascii_case(name.trim()))
        {
            warn!(name, "category name already in use");
        }

        let color = if color.trim().is_empty() {
            swatch_for(categories.len())
        } else {
            color
        };
        let category = Category::new(&self.owner, name, color, icon, now)?;
        categories.push(category.clone());
        self.save_categories(&categories)?;

        info!(id = %category.id, "category added");
        Ok(category)
    }

    #[tracing::instrument(skip(self, patch, now))]
    pub fn update_category(
        &self,
        selector: &str,
        patch: CategoryPatch,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Category> {
        let mut categories = self.load_categories()?;
        let idx = find_category(&categories, selector)?;
        patch.apply(&mut categories[idx], now)?;
        let updated = categories[idx].clone();
        self.save_categories(&categories)?;

        info!(id = %updated.id, "category updated");
        Ok(updated)
    }

    /// Removes a category. Protected categories are refused; tasks that
    /// referenced the category are kept and show as uncategorized.
    #[tracing::instrument(skip(self))]
    pub fn delete_category(&self, selector: &str) -> anyhow::Result<Category> {
        let mut categories = self.load_categories()?;
        let idx = find_category(&categories, selector)?;
        categories[idx].ensure_deletable()?;

        let removed = categories.remove(idx);
        self.save_categories(&categories)?;

        let orphaned = self
            .load_tasks()?
            .iter()
            .filter(|task| task.category_id == removed.id)
            .count();
        if orphaned > 0 {
            warn!(category = %removed.name, orphaned, "deleted category still referenced by tasks");
        }
        info!(id = %removed.id, "category deleted");
        Ok(removed)
    }

    pub fn resolve_category_id(&self, selector: &str) -> anyhow::Result<Uuid> {
        let categories = self.load_categories()?;
        let idx = find_category(&categories, selector)?;
        Ok(categories[idx].id)
    }

    fn scoped<T>(&self, records: Vec<T>, owner_of: impl Fn(&T) -> &String) -> Vec<T> {
        let before = records.len();
        let kept: Vec<T> = records
            .into_iter()
            .filter(|record| owner_of(record) == &self.owner)
            .collect();
        if kept.len() != before {
            warn!(
                owner = %self.owner,
                skipped = before - kept.len(),
                "skipped records owned by another user"
            );
        }
        kept
    }
}

fn validate_owner(owner: &str) -> anyhow::Result<()> {
    let valid = !owner.is_empty()
        && owner != "."
        && owner != ".."
        && owner
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'));
    if valid {
        Ok(())
    } else {
        Err(anyhow!("invalid user id: {owner:?}"))
    }
}

fn ensure_category_exists(categories: &[Category], id: Uuid) -> anyhow::Result<()> {
    if categories.iter().any(|category| category.id == id) {
        Ok(())
    } else {
        Err(anyhow!("unknown category: {id}"))
    }
}

/// Resolves a full id or a unique id prefix.
pub fn resolve_id(selector: &str, ids: impl IntoIterator<Item = Uuid>) -> anyhow::Result<Uuid> {
    let wanted = selector.trim().to_ascii_lowercase().replace('-', "");
    if wanted.is_empty() {
        return Err(anyhow!("empty id"));
    }

    let mut matches = ids
        .into_iter()
        .filter(|id| id.simple().to_string().starts_with(&wanted));
    let first = matches
        .next()
        .ok_or_else(|| anyhow!("no record matches id {selector}"))?;
    if matches.next().is_some() {
        return Err(anyhow!("id prefix {selector} is ambiguous"));
    }
    Ok(first)
}

fn find_task(tasks: &[Task], selector: &str) -> anyhow::Result<usize> {
    let id = resolve_id(selector, tasks.iter().map(|task| task.id))?;
    tasks
        .iter()
        .position(|task| task.id == id)
        .ok_or_else(|| anyhow!("task not found: {selector}"))
}

/// Categories are selected by exact name (case-insensitive) or id prefix.
fn find_category(categories: &[Category], selector: &str) -> anyhow::Result<usize> {
    if let Some(idx) = categories
        .iter()
        .position(|category| category.name.eq_ignore_ascii_case(selector.trim()))
    {
        return Ok(idx);
    }

    let id = resolve_id(selector, categories.iter().map(|category| category.id))
        .with_context(|| format!("category not found: {selector}"))?;
    categories
        .iter()
        .position(|category| category.id == id)
        .ok_or_else(|| anyhow!("category not found: {selector}"))
}

#[tracing::instrument(skip(path))]
fn load_jsonl<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let record: T = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(record);
    }

    debug!(count = out.len(), "loaded records from jsonl");
    Ok(out)
}

#[tracing::instrument(skip(path, records))]
fn save_jsonl_atomic<T: Serialize>(path: &Path, records: &[T]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = records.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for record in records {
        let serialized = serde_json::to_string(record)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}

fn save_json_atomic<T: Serialize>(path: &Path, record: &T) -> anyhow::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut temp, record)?;
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
