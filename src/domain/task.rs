use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::domain::subtasks::{Subtask, SubtaskList};
use crate::error::{FieldError, JoinError};

/// Unique identifier for a task, allocated from the store's ticket counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    /// Creates a new TaskId from a counter value
    pub fn new(counter: u64) -> Self {
        Self(counter)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl FromStr for TaskId {
    type Err = JoinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<u64>() {
            Ok(n) if n > 0 => Ok(Self(n)),
            _ => Err(JoinError::InvalidTaskId(s.to_string())),
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Column a task sits in on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    AwaitingFeedback,
    Done,
}

impl TaskStatus {
    /// Board order, left to right
    pub const ALL: [TaskStatus; 4] = [
        Self::Todo,
        Self::InProgress,
        Self::AwaitingFeedback,
        Self::Done,
    ];

    pub fn index(self) -> usize {
        match self {
            Self::Todo => 0,
            Self::InProgress => 1,
            Self::AwaitingFeedback => 2,
            Self::Done => 3,
        }
    }

    /// The status one column to the right, if any
    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.index() + 1).copied()
    }

    /// The status one column to the left, if any
    pub fn previous(self) -> Option<Self> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }

    /// Wire name as stored remotely
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in-progress",
            Self::AwaitingFeedback => "awaiting-feedback",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Todo => write!(f, "To do"),
            Self::InProgress => write!(f, "In progress"),
            Self::AwaitingFeedback => write!(f, "Await feedback"),
            Self::Done => write!(f, "Done"),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', ' '], "-");
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "Invalid status '{}'. Valid statuses: todo, in-progress, awaiting-feedback, done",
                    s
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Urgent,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Higher is more pressing
    pub fn rank(self) -> u8 {
        match self {
            Self::Urgent => 2,
            Self::Medium => 1,
            Self::Low => 0,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Urgent => write!(f, "Urgent"),
            Self::Medium => write!(f, "Medium"),
            Self::Low => write!(f, "Low"),
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "urgent" => Ok(Self::Urgent),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(format!(
                "Invalid priority '{}'. Valid priorities: urgent, medium, low",
                s
            )),
        }
    }
}

/// A task card as stored under `tickets/ticket/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub due_date: NaiveDate,
    pub priority: Priority,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_color: Option<String>,
    // The store drops empty arrays, so absent means empty.
    #[serde(default)]
    pub assignees: Vec<String>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    pub status: TaskStatus,
}

impl Task {
    /// Returns (completed, total) subtasks
    pub fn subtask_progress(&self) -> (usize, usize) {
        let done = self.subtasks.iter().filter(|s| s.done).count();
        (done, self.subtasks.len())
    }

    /// Case-insensitive match against title, description and subtask text
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.title.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
            || self
                .subtasks
                .iter()
                .any(|s| s.text.to_lowercase().contains(&query))
    }
}

/// Parses a due date as entered in the task form (`YYYY-MM-DD`).
pub fn parse_due_date(input: &str) -> Result<NaiveDate, FieldError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(FieldError::new("dueDate", "This field is required"));
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|_| FieldError::new("dueDate", format!("'{}' is not a valid date", input)))
}

/// Contents of the add-task form before an id has been allocated
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    pub category: String,
    pub category_color: Option<String>,
    pub assignees: Vec<String>,
    pub subtasks: SubtaskList,
    /// Column the task starts in; the board's per-column "+" buttons set this
    pub status: Option<TaskStatus>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_due_date(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Adds an assignee; repeated names are ignored
    pub fn assign(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.assignees.contains(&name) {
            self.assignees.push(name);
        }
        self
    }

    /// Checks the required fields, collecting every failure so the form can
    /// show each message next to its field.
    pub fn validate(&self) -> Result<(), JoinError> {
        let mut errors = Vec::new();
        if self.title.trim().is_empty() {
            errors.push(FieldError::new("title", "This field is required"));
        }
        if self.due_date.is_none() {
            errors.push(FieldError::new("dueDate", "This field is required"));
        }
        if self.category.trim().is_empty() {
            errors.push(FieldError::new("category", "Select a task category"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(JoinError::Validation(errors))
        }
    }

    /// Turns a validated draft into a task with the allocated id.
    pub fn into_task(self, id: TaskId) -> Result<Task, JoinError> {
        self.validate()?;
        let due_date = self
            .due_date
            .ok_or_else(|| JoinError::Validation(vec![FieldError::new("dueDate", "This field is required")]))?;

        Ok(Task {
            id,
            title: self.title.trim().to_string(),
            description: self.description,
            due_date,
            priority: self.priority,
            category: self.category.trim().to_string(),
            category_color: self.category_color,
            assignees: self.assignees,
            subtasks: self.subtasks.into_vec(),
            status: self.status.unwrap_or(TaskStatus::Todo),
        })
    }
}

/// Fields to merge into an existing task record; `None` leaves a field alone
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignees: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtasks: Option<Vec<Subtask>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.priority.is_none()
            && self.category.is_none()
            && self.category_color.is_none()
            && self.assignees.is_none()
            && self.subtasks.is_none()
            && self.status.is_none()
    }

    /// Rejects edits that would blank out a required field
    pub fn validate(&self) -> Result<(), JoinError> {
        let mut errors = Vec::new();
        if matches!(&self.title, Some(t) if t.trim().is_empty()) {
            errors.push(FieldError::new("title", "This field is required"));
        }
        if matches!(&self.category, Some(c) if c.trim().is_empty()) {
            errors.push(FieldError::new("category", "Select a task category"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(JoinError::Validation(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_draft() -> TaskDraft {
        TaskDraft::new("Write spec")
            .with_due_date(NaiveDate::from_ymd_opt(2025, 1, 10).unwrap())
            .with_priority(Priority::Medium)
            .with_category("Design")
    }

    #[test]
    fn test_task_id_parsing() {
        assert_eq!(TaskId::from_str("7").unwrap(), TaskId::new(7));
        assert_eq!(TaskId::from_str(" 42 ").unwrap().value(), 42);
        assert!(TaskId::from_str("0").is_err());
        assert!(TaskId::from_str("abc").is_err());
        assert!(TaskId::from_str("-3").is_err());
    }

    #[test]
    fn test_status_order_and_neighbours() {
        assert_eq!(TaskStatus::Todo.previous(), None);
        assert_eq!(TaskStatus::Todo.next(), Some(TaskStatus::InProgress));
        assert_eq!(
            TaskStatus::AwaitingFeedback.previous(),
            Some(TaskStatus::InProgress)
        );
        assert_eq!(TaskStatus::Done.next(), None);
    }

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&TaskStatus::AwaitingFeedback).unwrap();
        assert_eq!(json, "\"awaiting-feedback\"");

        let status: TaskStatus = serde_json::from_str("\"in-progress\"").unwrap();
        assert_eq!(status, TaskStatus::InProgress);

        assert!(serde_json::from_str::<TaskStatus>("\"archived\"").is_err());
        assert_eq!(
            TaskStatus::from_str("Awaiting Feedback").unwrap(),
            TaskStatus::AwaitingFeedback
        );
    }

    #[test]
    fn test_priority_parsing() {
        assert_eq!(Priority::from_str("URGENT").unwrap(), Priority::Urgent);
        assert!(Priority::from_str("whenever").is_err());
        assert!(Priority::Urgent.rank() > Priority::Low.rank());
    }

    #[test]
    fn test_draft_validation_collects_all_fields() {
        let err = TaskDraft::new("  ").validate().unwrap_err();
        match err {
            JoinError::Validation(fields) => {
                let names: Vec<_> = fields.iter().map(|f| f.field).collect();
                assert_eq!(names, vec!["title", "dueDate", "category"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_draft_into_task_defaults_to_todo() {
        let task = sample_draft().into_task(TaskId::new(3)).unwrap();
        assert_eq!(task.id, TaskId::new(3));
        assert_eq!(task.status, TaskStatus::Todo);
        assert!(task.assignees.is_empty());
    }

    #[test]
    fn test_draft_assign_ignores_duplicates() {
        let draft = sample_draft().assign("Anna").assign("Ben").assign("Anna");
        assert_eq!(draft.assignees, vec!["Anna", "Ben"]);
    }

    #[test]
    fn test_parse_due_date() {
        assert_eq!(
            parse_due_date("2025-01-10").unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()
        );
        assert_eq!(parse_due_date("").unwrap_err().field, "dueDate");
        assert!(parse_due_date("10.01.2025").is_err());
    }

    #[test]
    fn test_task_wire_format() {
        let task = sample_draft().into_task(TaskId::new(1)).unwrap();
        let value = serde_json::to_value(&task).unwrap();

        assert_eq!(value["id"], 1);
        assert_eq!(value["dueDate"], "2025-01-10");
        assert_eq!(value["priority"], "medium");
        assert_eq!(value["status"], "todo");
        assert!(value.get("categoryColor").is_none());
    }

    #[test]
    fn test_task_deserializes_without_empty_collections() {
        let json = r#"{
            "id": 5,
            "title": "Legacy",
            "dueDate": "2024-06-01",
            "priority": "low",
            "category": "Technical Task",
            "status": "done"
        }"#;

        let task: Task = serde_json::from_str(json).unwrap();
        assert!(task.subtasks.is_empty());
        assert!(task.assignees.is_empty());
        assert_eq!(task.description, "");
    }

    #[test]
    fn test_task_matches_query() {
        let mut task = sample_draft()
            .with_description("Outline the board module")
            .into_task(TaskId::new(1))
            .unwrap();
        task.subtasks.push(Subtask::new("Review glossary"));

        assert!(task.matches("SPEC"));
        assert!(task.matches("board"));
        assert!(task.matches("glossary"));
        assert!(!task.matches("deploy"));
    }

    #[test]
    fn test_patch_serializes_only_set_fields() {
        let patch = TaskPatch {
            title: Some("Renamed".to_string()),
            status: Some(TaskStatus::Done),
            ..TaskPatch::default()
        };
        let value = serde_json::to_value(&patch).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), 2);
        assert_eq!(object["title"], "Renamed");
        assert_eq!(object["status"], "done");
        assert!(!patch.is_empty());
        assert!(TaskPatch::default().is_empty());
    }

    #[test]
    fn test_patch_rejects_blank_title() {
        let patch = TaskPatch {
            title: Some(" ".to_string()),
            ..TaskPatch::default()
        };
        assert!(matches!(patch.validate(), Err(JoinError::Validation(_))));
    }
}
