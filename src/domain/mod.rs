pub mod board;
pub mod contact;
pub mod session;
pub mod sorting;
pub mod subtasks;
pub mod task;

pub use board::{available_moves, BoardSession, Column, Columns, EditMode, Point, Rect};
pub use contact::{Contact, NewContact};
pub use session::Session;
pub use sorting::{sort_tasks, SortField, SortOrder};
pub use subtasks::{Subtask, SubtaskId, SubtaskList};
pub use task::{Priority, Task, TaskDraft, TaskId, TaskPatch, TaskStatus};
