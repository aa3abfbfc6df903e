use std::collections::HashSet;

use crate::domain::sorting::{sort_tasks, SortField, SortOrder};
use crate::domain::task::{Task, TaskId, TaskStatus};

/// One status bucket of the board
#[derive(Debug, Clone)]
pub struct Column<'a> {
    pub status: TaskStatus,
    pub tasks: Vec<&'a Task>,
}

impl<'a> Column<'a> {
    pub fn new(status: TaskStatus) -> Self {
        Self {
            status,
            tasks: Vec::new(),
        }
    }

    /// Empty columns show a "No tasks" placeholder
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.iter().any(|t| t.id == id)
    }
}

/// The four fixed columns, in board order
#[derive(Debug, Clone)]
pub struct Columns<'a> {
    columns: [Column<'a>; 4],
}

impl<'a> Columns<'a> {
    /// Partitions tasks by status. Every task lands in exactly one column and
    /// keeps its relative input order.
    pub fn partition(tasks: &'a [Task]) -> Self {
        let mut columns = TaskStatus::ALL.map(Column::new);
        for task in tasks {
            columns[task.status.index()].tasks.push(task);
        }
        Self { columns }
    }

    /// Like [`Self::partition`], then orders each column by `field`.
    pub fn partition_sorted(tasks: &'a [Task], field: SortField, order: SortOrder) -> Self {
        let mut columns = Self::partition(tasks);
        for column in &mut columns.columns {
            sort_tasks(&mut column.tasks, field, order);
        }
        columns
    }

    pub fn get(&self, status: TaskStatus) -> &Column<'a> {
        &self.columns[status.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Column<'a>> {
        self.columns.iter()
    }

    pub fn total(&self) -> usize {
        self.columns.iter().map(Column::len).sum()
    }
}

/// Which mobile move buttons a card in `status` should offer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailableMoves {
    pub up: Option<TaskStatus>,
    pub down: Option<TaskStatus>,
}

pub fn available_moves(status: TaskStatus) -> AvailableMoves {
    AvailableMoves {
        up: status.previous(),
        down: status.next(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A column's bounding box in viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Edges count as inside, so a pointer on the border keeps the highlight.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left
            && point.x <= self.left + self.width
            && point.y >= self.top
            && point.y <= self.top + self.height
    }
}

/// Whether the task form is creating a new card or editing an open one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    #[default]
    Viewing,
    Editing(TaskId),
}

/// UI state for one open board: drag slot, drop highlights and overlay.
#[derive(Debug, Default)]
pub struct BoardSession {
    dragged: Option<TaskId>,
    highlighted: HashSet<TaskStatus>,
    open_detail: Option<TaskId>,
    edit_mode: EditMode,
}

impl BoardSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starting a drag replaces whatever was in the slot.
    pub fn start_drag(&mut self, id: TaskId) -> Option<TaskId> {
        self.dragged.replace(id)
    }

    pub fn dragged(&self) -> Option<TaskId> {
        self.dragged
    }

    pub fn take_dragged(&mut self) -> Option<TaskId> {
        self.dragged.take()
    }

    pub fn highlight(&mut self, status: TaskStatus) {
        self.highlighted.insert(status);
    }

    pub fn unhighlight(&mut self, status: TaskStatus) {
        self.highlighted.remove(&status);
    }

    pub fn clear_highlights(&mut self) {
        self.highlighted.clear();
    }

    pub fn is_highlighted(&self, status: TaskStatus) -> bool {
        self.highlighted.contains(&status)
    }

    pub fn has_highlights(&self) -> bool {
        !self.highlighted.is_empty()
    }

    pub fn open_detail(&mut self, id: TaskId) {
        self.open_detail = Some(id);
    }

    /// Closing the overlay also leaves edit mode
    pub fn close_detail(&mut self) {
        self.open_detail = None;
        self.edit_mode = EditMode::Viewing;
    }

    pub fn detail(&self) -> Option<TaskId> {
        self.open_detail
    }

    pub fn set_edit_mode(&mut self, mode: EditMode) {
        self.edit_mode = mode;
    }

    pub fn edit_mode(&self) -> EditMode {
        self.edit_mode
    }
}
