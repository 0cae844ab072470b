use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::task::Task;

/// Owns the ordered category list and the task list, plus the two files
/// backing them. Sole source of truth: both collections load once at open
/// and every mutating operation persists before returning.
#[derive(Debug)]
pub struct Store {
    pub data_dir: PathBuf,
    categories_path: PathBuf,
    tasks_path: PathBuf,
    categories: Vec<String>,
    tasks: Vec<Task>,
}

impl Store {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let categories_path = data_dir.join("categories.data");
        let tasks_path = data_dir.join("tasks.data");

        if !categories_path.exists() {
            fs::write(&categories_path, "[]")?;
        }
        if !tasks_path.exists() {
            fs::write(&tasks_path, "[]")?;
        }

        let categories: Vec<String> =
            load_json_array(&categories_path).context("failed to load categories.data")?;
        let mut tasks: Vec<Task> =
            load_json_array(&tasks_path).context("failed to load tasks.data")?;
        assign_missing_ids(&mut tasks);

        info!(
            data_dir = %data_dir.display(),
            categories = categories.len(),
            tasks = tasks.len(),
            "opened store"
        );

        Ok(Self {
            data_dir,
            categories_path,
            tasks_path,
            categories,
            tasks,
        })
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn next_id(&self) -> u64 {
        self.tasks.iter().filter_map(|task| task.id).max().unwrap_or(0) + 1
    }

    /// Append a category. Rejects names that trim to empty or exactly match
    /// an existing name (case-sensitive); the list is unchanged on rejection.
    #[tracing::instrument(skip(self, name))]
    pub fn add_category(&mut self, name: &str) -> anyhow::Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(anyhow!("category name cannot be empty"));
        }
        if self.categories.iter().any(|existing| existing == name) {
            return Err(anyhow!("category already exists: {name}"));
        }

        self.categories.push(name.to_string());
        self.persist_categories()?;
        debug!(category = %name, count = self.categories.len(), "category added");
        Ok(name.to_string())
    }

    /// Remove the category at `index`, then remove every task whose category
    /// list contains the removed name. The cascade is destructive: tasks are
    /// deleted, not un-tagged. Returns the name and the number of tasks
    /// removed with it.
    #[tracing::instrument(skip(self))]
    pub fn delete_category(&mut self, index: usize) -> anyhow::Result<(String, usize)> {
        if index >= self.categories.len() {
            return Err(anyhow!("no category at position {}", index + 1));
        }

        let name = self.categories.remove(index);
        let before = self.tasks.len();
        self.tasks.retain(|task| !task.in_category(&name));
        let removed = before - self.tasks.len();

        self.persist_categories()?;
        self.persist_tasks()?;
        info!(category = %name, tasks_removed = removed, "category deleted with cascade");
        Ok((name, removed))
    }

    /// Resolve a 1-based list position or an exact name to a category index.
    pub fn category_index(&self, selector: &str) -> anyhow::Result<usize> {
        if let Ok(position) = selector.parse::<usize>()
            && position >= 1
            && position <= self.categories.len()
        {
            return Ok(position - 1);
        }

        self.categories
            .iter()
            .position(|name| name == selector)
            .ok_or_else(|| anyhow!("unknown category: {selector}"))
    }

    /// Append a task with a fresh identity and `completed = false`. Rejects
    /// text that trims to empty. Category names are stored as given — they
    /// are not validated against the category list.
    #[tracing::instrument(skip(self, text, categories))]
    pub fn add_task(
        &mut self,
        text: &str,
        due: Option<NaiveDate>,
        categories: Vec<String>,
    ) -> anyhow::Result<u64> {
        let text = text.trim();
        if text.is_empty() {
            return Err(anyhow!("task text cannot be empty"));
        }

        let id = self.next_id();
        self.tasks.push(Task::new(text.to_string(), due, categories, id));
        self.persist_tasks()?;
        debug!(id, count = self.tasks.len(), "task added");
        Ok(id)
    }

    /// Flip the completion flag of the task with stable id `id`. Returns the
    /// new flag value.
    #[tracing::instrument(skip(self))]
    pub fn toggle_complete(&mut self, id: u64) -> anyhow::Result<bool> {
        let task = self.task_mut(id)?;
        task.completed = !task.completed;
        let completed = task.completed;
        self.persist_tasks()?;
        debug!(id, completed, "task toggled");
        Ok(completed)
    }

    /// Overwrite text, due date, and category list of the task with id `id`.
    /// Rejects text that trims to empty, leaving the task untouched. The
    /// completion flag is not part of an edit.
    #[tracing::instrument(skip(self, text, categories))]
    pub fn edit_task(
        &mut self,
        id: u64,
        text: &str,
        due: Option<NaiveDate>,
        categories: Vec<String>,
    ) -> anyhow::Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(anyhow!("task text cannot be empty"));
        }

        let task = self.task_mut(id)?;
        task.text = text.to_string();
        task.due = due;
        task.categories = categories;
        self.persist_tasks()?;
        debug!(id, "task edited");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn delete_task(&mut self, id: u64) -> anyhow::Result<()> {
        let idx = self
            .tasks
            .iter()
            .position(|task| task.id == Some(id))
            .ok_or_else(|| anyhow!("no task with id {id}"))?;

        self.tasks.remove(idx);
        self.persist_tasks()?;
        debug!(id, count = self.tasks.len(), "task deleted");
        Ok(())
    }

    pub fn task(&self, id: u64) -> anyhow::Result<&Task> {
        self.tasks
            .iter()
            .find(|task| task.id == Some(id))
            .ok_or_else(|| anyhow!("no task with id {id}"))
    }

    fn task_mut(&mut self, id: u64) -> anyhow::Result<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|task| task.id == Some(id))
            .ok_or_else(|| anyhow!("no task with id {id}"))
    }

    fn persist_categories(&self) -> anyhow::Result<()> {
        save_json_array(&self.categories_path, &self.categories)
            .context("failed to save categories.data")
    }

    fn persist_tasks(&self) -> anyhow::Result<()> {
        save_json_array(&self.tasks_path, &self.tasks).context("failed to save tasks.data")
    }
}

/// Entries predating stable ids get one here, after the existing maximum.
fn assign_missing_ids(tasks: &mut [Task]) {
    let mut next = tasks.iter().filter_map(|task| task.id).max().unwrap_or(0) + 1;
    for task in tasks {
        if task.id.is_none() {
            task.id = Some(next);
            next += 1;
        }
    }
}

#[tracing::instrument(skip(path))]
fn load_json_array<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    debug!(file = %path.display(), "loading json array");
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading {}", path.display()))?;
    let items: Vec<T> = serde_json::from_str(&raw)
        .with_context(|| format!("failed parsing {}", path.display()))?;

    debug!(count = items.len(), "loaded entries");
    Ok(items)
}

#[tracing::instrument(skip(path, items))]
fn save_json_array<T: Serialize>(path: &Path, items: &[T]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = items.len(), "saving json array atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(serde_json::to_string(items)?.as_bytes())?;
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use super::Store;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid date")
    }

    #[test]
    fn blank_category_name_is_rejected_without_change() {
        let temp = tempdir().expect("tempdir");
        let mut store = Store::open(temp.path()).expect("open store");
        store.add_category("home").expect("add category");

        assert!(store.add_category("   ").is_err());
        assert_eq!(store.categories(), ["home".to_string()]);
    }

    #[test]
    fn duplicate_category_name_is_rejected_without_change() {
        let temp = tempdir().expect("tempdir");
        let mut store = Store::open(temp.path()).expect("open store");
        store.add_category("home").expect("add category");

        assert!(store.add_category("home").is_err());
        // Case-sensitive match: a different casing is a different category.
        store.add_category("Home").expect("add distinct casing");
        assert_eq!(store.categories().len(), 2);
    }

    #[test]
    fn category_name_is_trimmed_before_insert_and_compare() {
        let temp = tempdir().expect("tempdir");
        let mut store = Store::open(temp.path()).expect("open store");
        store.add_category("  home ").expect("add category");

        assert_eq!(store.categories(), ["home".to_string()]);
        assert!(store.add_category(" home").is_err());
    }

    #[test]
    fn deleting_a_category_removes_its_tasks_and_spares_the_rest() {
        let temp = tempdir().expect("tempdir");
        let mut store = Store::open(temp.path()).expect("open store");
        store.add_category("home").expect("add category");
        store.add_category("work").expect("add category");

        store
            .add_task("Pay rent", None, vec!["home".to_string()])
            .expect("add task");
        store
            .add_task("File taxes", None, vec!["home".to_string(), "work".to_string()])
            .expect("add task");
        store
            .add_task("Ship report", None, vec!["work".to_string()])
            .expect("add task");

        let index = store.category_index("home").expect("resolve category");
        let (name, removed) = store.delete_category(index).expect("delete category");

        assert_eq!(name, "home");
        assert_eq!(removed, 2);
        assert_eq!(store.categories(), ["work".to_string()]);
        assert_eq!(store.tasks().len(), 1);
        assert_eq!(store.tasks()[0].text, "Ship report");
        // The surviving task's category list is untouched.
        assert_eq!(store.tasks()[0].categories, vec!["work".to_string()]);
    }

    #[test]
    fn empty_text_edit_leaves_the_task_unchanged() {
        let temp = tempdir().expect("tempdir");
        let mut store = Store::open(temp.path()).expect("open store");
        let id = store
            .add_task("Water plants", Some(date("2026-09-01")), vec!["home".to_string()])
            .expect("add task");

        assert!(store.edit_task(id, "  ", None, vec![]).is_err());

        let task = store.task(id).expect("task still there");
        assert_eq!(task.text, "Water plants");
        assert_eq!(task.due, Some(date("2026-09-01")));
        assert_eq!(task.categories, vec!["home".to_string()]);
    }

    #[test]
    fn toggle_flips_and_survives_reopen() {
        let temp = tempdir().expect("tempdir");
        let id = {
            let mut store = Store::open(temp.path()).expect("open store");
            let id = store.add_task("Call dentist", None, vec![]).expect("add task");
            assert!(store.toggle_complete(id).expect("toggle on"));
            id
        };

        let mut store = Store::open(temp.path()).expect("reopen store");
        assert!(store.task(id).expect("find task").completed);
        assert!(!store.toggle_complete(id).expect("toggle off"));
    }

    #[test]
    fn ids_stay_stable_when_display_order_differs_from_storage() {
        let temp = tempdir().expect("tempdir");
        let mut store = Store::open(temp.path()).expect("open store");
        let first = store
            .add_task("Oldest", Some(date("2030-01-01")), vec![])
            .expect("add task");
        let second = store.add_task("Middle", Some(date("2020-01-01")), vec![]).expect("add task");
        let third = store.add_task("Newest", None, vec![]).expect("add task");
        store.toggle_complete(first).expect("complete first");

        // Display order now starts with `second`; deleting by id is immune
        // to the difference.
        store.delete_task(second).expect("delete by id");
        let ids: Vec<u64> = store.tasks().iter().filter_map(|task| task.id).collect();
        assert_eq!(ids, vec![first, third]);
    }

    #[test]
    fn unknown_ids_and_positions_error() {
        let temp = tempdir().expect("tempdir");
        let mut store = Store::open(temp.path()).expect("open store");

        assert!(store.toggle_complete(41).is_err());
        assert!(store.delete_task(41).is_err());
        assert!(store.delete_category(0).is_err());
        assert!(store.category_index("nope").is_err());
    }
}
