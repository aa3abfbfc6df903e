use crate::domain::task::Task;
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::str::FromStr;

/// Fields available for ordering cards within a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Title,
    DueDate,
    Priority,
    SubtaskProgress,
}

/// Sort order direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "id" => Ok(SortField::Id),
            "title" => Ok(SortField::Title),
            "due" | "due-date" => Ok(SortField::DueDate),
            "priority" => Ok(SortField::Priority),
            "progress" => Ok(SortField::SubtaskProgress),
            _ => Err(format!(
                "Invalid sort field '{}'. Valid fields: id, title, due-date, priority, progress",
                s
            )),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Ascending),
            "desc" => Ok(SortOrder::Descending),
            _ => Err(format!(
                "Invalid sort order '{}'. Valid orders: asc, desc",
                s
            )),
        }
    }
}

/// Sorts tasks (owned or borrowed) in place.
///
/// The sort is stable, so ties keep their board order.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use join_board::domain::sorting::{sort_tasks, SortField, SortOrder};
/// use join_board::domain::task::{TaskDraft, TaskId};
///
/// let due = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
/// let make = |id, title: &str| {
///     TaskDraft::new(title)
///         .with_due_date(due)
///         .with_category("Design")
///         .into_task(TaskId::new(id))
///         .unwrap()
/// };
/// let mut tasks = vec![make(2, "B"), make(1, "A")];
///
/// sort_tasks(&mut tasks, SortField::Id, SortOrder::Ascending);
/// assert_eq!(tasks[0].id, TaskId::new(1));
/// ```
pub fn sort_tasks<T: Borrow<Task>>(tasks: &mut [T], field: SortField, order: SortOrder) {
    tasks.sort_by(|a, b| {
        let (a, b) = (a.borrow(), b.borrow());
        let cmp = match field {
            SortField::Id => a.id.cmp(&b.id),
            SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            SortField::DueDate => a.due_date.cmp(&b.due_date),
            SortField::Priority => a.priority.rank().cmp(&b.priority.rank()),
            SortField::SubtaskProgress => compare_progress(a, b),
        };

        match order {
            SortOrder::Ascending => cmp,
            SortOrder::Descending => cmp.reverse(),
        }
    });
}

/// Compare by share of finished subtasks.
///
/// Tasks without subtasks count as 0% complete.
fn compare_progress(a: &Task, b: &Task) -> Ordering {
    fn progress_pct(t: &Task) -> f64 {
        match t.subtask_progress() {
            (_, 0) => 0.0,
            (done, total) => (done as f64) / (total as f64),
        }
    }

    progress_pct(a)
        .partial_cmp(&progress_pct(b))
        .unwrap_or(Ordering::Equal)
}
