use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unit of work: free text, an optional calendar due date, the category
/// names it is tagged with, and a completion flag.
///
/// `dueDate` and `category` are the storage field names; `dueDate` is an ISO
/// `YYYY-MM-DD` string, empty when unset. `uuid` and `id` are stable
/// identifiers — operations select tasks by `id`, never by display position.
/// Entries written without them still load: a missing `uuid` gets a fresh
/// v4, a missing `id` is assigned when the store opens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    #[serde(default = "Uuid::new_v4")]
    pub uuid: Uuid,

    #[serde(default)]
    pub id: Option<u64>,

    pub text: String,

    #[serde(rename = "dueDate", default, with = "iso_date_serde")]
    pub due: Option<NaiveDate>,

    #[serde(rename = "category", default)]
    pub categories: Vec<String>,

    #[serde(default)]
    pub completed: bool,
}

impl Task {
    pub fn new(text: String, due: Option<NaiveDate>, categories: Vec<String>, id: u64) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            id: Some(id),
            text,
            due,
            categories,
            completed: false,
        }
    }

    pub fn in_category(&self, name: &str) -> bool {
        self.categories.iter().any(|category| category == name)
    }
}

/// Display order: incomplete tasks before completed ones, then due date
/// ascending with undated tasks after all dated ones. Pure — the stored
/// order is never touched; callers recompute this on every display.
pub fn order_for_display(tasks: &[Task]) -> Vec<Task> {
    let mut ordered = tasks.to_vec();
    ordered.sort_by_key(|task| (task.completed, task.due.is_none(), task.due));
    ordered
}

pub mod iso_date_serde {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(due: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match due {
            Some(date) => serializer.serialize_str(&date.format("%Y-%m-%d").to_string()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt = Option::<String>::deserialize(deserializer)?;
        match opt.as_deref() {
            None | Some("") => Ok(None),
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{Task, order_for_display};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid date")
    }

    fn task(text: &str, due: Option<NaiveDate>, completed: bool, id: u64) -> Task {
        let mut task = Task::new(text.to_string(), due, vec![], id);
        task.completed = completed;
        task
    }

    #[test]
    fn incomplete_before_complete_then_due_then_undated() {
        let tasks = vec![
            task("done early", Some(date("2024-01-01")), true, 1),
            task("open feb", Some(date("2024-02-01")), false, 2),
            task("open undated", None, false, 3),
        ];

        let ordered = order_for_display(&tasks);
        let texts: Vec<&str> = ordered.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["open feb", "open undated", "done early"]);
    }

    #[test]
    fn stored_order_is_untouched() {
        let tasks = vec![
            task("b", None, true, 1),
            task("a", Some(date("2030-01-01")), false, 2),
        ];

        let _ = order_for_display(&tasks);
        assert_eq!(tasks[0].text, "b");
        assert_eq!(tasks[1].text, "a");
    }

    #[test]
    fn legacy_four_field_entry_loads() {
        let raw = r#"{"text":"Pay rent","dueDate":"","category":["home"],"completed":false}"#;
        let task: Task = serde_json::from_str(raw).expect("parse legacy task");

        assert_eq!(task.text, "Pay rent");
        assert!(task.due.is_none());
        assert_eq!(task.categories, vec!["home".to_string()]);
        assert!(!task.completed);
        assert!(task.id.is_none());
    }

    #[test]
    fn due_date_serializes_under_wire_name() {
        let task = task("Ship it", Some(date("2026-03-01")), false, 7);
        let raw = serde_json::to_string(&task).expect("serialize task");

        assert!(raw.contains(r#""dueDate":"2026-03-01""#));
        assert!(raw.contains(r#""category":[]"#));
    }
}
