//! Pure view-models for the board. No I/O; the UI renders these.

use serde::Serialize;

use crate::domain::board::Columns;
use crate::domain::contact::{initials, Contact, UNKNOWN_BADGE_COLOR};
use crate::domain::task::{Priority, Task, TaskId, TaskStatus};

const DESCRIPTION_PREVIEW_CHARS: usize = 50;
const DEFAULT_CATEGORY_COLOR: &str = "#0038FF";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssigneeBadge {
    pub name: String,
    pub initials: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtaskProgress {
    pub done: usize,
    pub total: usize,
    pub percent: u8,
    pub label: String,
}

impl SubtaskProgress {
    fn of(task: &Task) -> Option<Self> {
        let (done, total) = task.subtask_progress();
        if total == 0 {
            return None;
        }
        Some(Self {
            done,
            total,
            percent: ((done * 100) / total) as u8,
            label: format!("{}/{} Subtasks", done, total),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskCardView {
    pub id: TaskId,
    pub category: String,
    pub category_color: String,
    pub title: String,
    pub description_preview: String,
    /// `None` hides the progress bar
    pub progress: Option<SubtaskProgress>,
    pub priority: Priority,
    pub assignees: Vec<AssigneeBadge>,
}

fn preview(text: &str) -> String {
    if text.chars().count() <= DESCRIPTION_PREVIEW_CHARS {
        text.to_string()
    } else {
        let cut: String = text.chars().take(DESCRIPTION_PREVIEW_CHARS).collect();
        format!("{}...", cut.trim_end())
    }
}

impl TaskCardView {
    pub fn build(task: &Task, contacts: &[Contact]) -> Self {
        let assignees = task
            .assignees
            .iter()
            .map(|name| {
                let contact = contacts.iter().find(|c| &c.name == name);
                AssigneeBadge {
                    name: name.clone(),
                    initials: initials(name),
                    color: contact
                        .map_or(UNKNOWN_BADGE_COLOR, Contact::badge_color)
                        .to_string(),
                }
            })
            .collect();

        Self {
            id: task.id,
            category: task.category.clone(),
            category_color: task
                .category_color
                .clone()
                .unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string()),
            title: task.title.clone(),
            description_preview: preview(&task.description),
            progress: SubtaskProgress::of(task),
            priority: task.priority,
            assignees,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnView {
    pub status: TaskStatus,
    pub title: String,
    pub cards: Vec<TaskCardView>,
    /// Shown in place of cards when the column is empty
    pub empty_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardView {
    pub columns: Vec<ColumnView>,
}

impl BoardView {
    pub fn build(columns: &Columns<'_>, contacts: &[Contact]) -> Self {
        let columns = columns
            .iter()
            .map(|column| ColumnView {
                status: column.status,
                title: column.status.to_string(),
                cards: column
                    .tasks
                    .iter()
                    .map(|task| TaskCardView::build(task, contacts))
                    .collect(),
                empty_text: column
                    .is_empty()
                    .then(|| format!("No tasks {}", column.status)),
            })
            .collect();

        Self { columns }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::contact::NewContact;
    use crate::domain::subtasks::Subtask;
    use crate::domain::task::TaskDraft;
    use chrono::NaiveDate;

    fn task() -> Task {
        TaskDraft::new("Build board")
            .with_due_date(NaiveDate::from_ymd_opt(2025, 1, 10).unwrap())
            .with_category("User Story")
            .with_description("Render every column with its cards and keep the empty state visible")
            .assign("Anna Schmidt")
            .assign("Ghost User")
            .into_task(TaskId::new(1))
            .unwrap()
    }

    #[test]
    fn test_card_view() {
        let anna = NewContact::new("Anna Schmidt", "anna@example.com")
            .into_contact(2)
            .unwrap();
        let mut task = task();
        task.subtasks = vec![Subtask::new("a"), Subtask::new("b")];
        task.subtasks[1].toggle();

        let card = TaskCardView::build(&task, &[anna.clone()]);

        assert_eq!(card.category_color, DEFAULT_CATEGORY_COLOR);
        assert!(card.description_preview.ends_with("..."));
        assert!(card.description_preview.chars().count() <= DESCRIPTION_PREVIEW_CHARS + 3);

        let progress = card.progress.unwrap();
        assert_eq!(progress.percent, 50);
        assert_eq!(progress.label, "1/2 Subtasks");

        assert_eq!(card.assignees[0].initials, "AS");
        assert_eq!(card.assignees[0].color, anna.badge_color());
        assert_eq!(card.assignees[1].color, UNKNOWN_BADGE_COLOR);
    }

    #[test]
    fn test_short_description_kept() {
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn test_board_view_empty_columns() {
        let tasks = vec![task()];
        let columns = Columns::partition(&tasks);

        let view = BoardView::build(&columns, &[]);

        assert_eq!(view.columns.len(), 4);
        assert_eq!(view.columns[0].cards.len(), 1);
        assert_eq!(view.columns[0].empty_text, None);
        assert_eq!(
            view.columns[3].empty_text.as_deref(),
            Some("No tasks Done")
        );
        assert!(view.columns[0].cards[0].progress.is_none());
    }
}
