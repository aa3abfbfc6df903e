//! Drag-and-drop and mobile move handling on top of a [`TaskRepository`].
//!
//! All transient UI state (drag slot, highlighted drop zones, open overlay)
//! lives in the controller's [`BoardSession`] instead of free-standing globals.

use tracing::debug;

use crate::domain::board::{available_moves, BoardSession, Columns, EditMode, Point, Rect};
use crate::domain::task::{TaskId, TaskStatus};
use crate::error::{JoinError, Result};
use crate::repository::TaskRepository;
use crate::store::RemoteStore;

/// What a drop did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    Moved {
        id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },
    /// Dropped back onto its own column
    Unchanged(TaskId),
    /// The slot was empty or the dragged task no longer exists
    NothingDragged,
}

pub struct BoardController<S> {
    repo: TaskRepository<S>,
    session: BoardSession,
}

impl<S: RemoteStore> BoardController<S> {
    pub fn new(repo: TaskRepository<S>) -> Self {
        Self {
            repo,
            session: BoardSession::new(),
        }
    }

    pub fn repository(&self) -> &TaskRepository<S> {
        &self.repo
    }

    pub fn repository_mut(&mut self) -> &mut TaskRepository<S> {
        &mut self.repo
    }

    pub fn session(&self) -> &BoardSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut BoardSession {
        &mut self.session
    }

    pub fn columns(&self) -> Columns<'_> {
        self.repo.columns()
    }

    /// Puts `id` in the drag slot, replacing any earlier drag
    pub fn start_drag(&mut self, id: TaskId) {
        if let Some(previous) = self.session.start_drag(id) {
            debug!(task_id = %id, previous = %previous, "Drag slot overwritten");
        }
    }

    /// Marks `status` as a drop target; nothing moves yet
    pub fn drag_over(&mut self, status: TaskStatus) {
        self.session.highlight(status);
    }

    /// Drops the highlight only once the pointer is really outside the
    /// column's box; leave events fired while crossing the column's own
    /// cards are ignored.
    pub fn drag_leave(&mut self, status: TaskStatus, column: Rect, pointer: Point) {
        if !column.contains(pointer) {
            self.session.unhighlight(status);
        }
    }

    /// Ends the drag on `target`. Highlights are cleared whatever happens.
    ///
    /// Any column is a valid target; only the mobile `move_up`/`move_down`
    /// buttons are limited to neighbouring columns.
    pub async fn drop_on(&mut self, target: TaskStatus) -> Result<DropOutcome> {
        let dragged = self.session.take_dragged();
        let outcome = self.apply_drop(dragged, target).await;
        self.session.clear_highlights();
        outcome
    }

    async fn apply_drop(&mut self, dragged: Option<TaskId>, target: TaskStatus) -> Result<DropOutcome> {
        let Some(id) = dragged else {
            return Ok(DropOutcome::NothingDragged);
        };
        let Some(from) = self.repo.get(id).map(|t| t.status) else {
            debug!(task_id = %id, "Dragged task is gone");
            return Ok(DropOutcome::NothingDragged);
        };

        if self.repo.move_task(id, target).await? {
            Ok(DropOutcome::Moved { id, from, to: target })
        } else {
            Ok(DropOutcome::Unchanged(id))
        }
    }

    /// Mobile "move up": one column to the left
    pub async fn move_up(&mut self, id: TaskId) -> Result<TaskStatus> {
        self.step(id, |status| available_moves(status).up).await
    }

    /// Mobile "move down": one column to the right
    pub async fn move_down(&mut self, id: TaskId) -> Result<TaskStatus> {
        self.step(id, |status| available_moves(status).down).await
    }

    async fn step<F>(&mut self, id: TaskId, neighbour: F) -> Result<TaskStatus>
    where
        F: Fn(TaskStatus) -> Option<TaskStatus>,
    {
        let from = self
            .repo
            .get(id)
            .map(|t| t.status)
            .ok_or_else(|| JoinError::TaskNotFound(id.to_string()))?;

        let to = neighbour(from).ok_or_else(|| JoinError::InvalidStatusTransition {
            from: from.to_string(),
            to: "none".to_string(),
        })?;

        self.repo.move_task(id, to).await?;
        Ok(to)
    }

    /// Sets any status directly, as the edit form does; no adjacency rule
    pub async fn set_status(&mut self, id: TaskId, status: TaskStatus) -> Result<bool> {
        self.repo.move_task(id, status).await
    }

    pub fn open_detail(&mut self, id: TaskId) -> Result<()> {
        if self.repo.get(id).is_none() {
            return Err(JoinError::TaskNotFound(id.to_string()));
        }
        self.session.open_detail(id);
        Ok(())
    }

    pub fn close_detail(&mut self) {
        self.session.close_detail();
    }

    /// Switches the open detail overlay into the edit form
    pub fn begin_edit(&mut self) -> Result<TaskId> {
        let id = self
            .session
            .detail()
            .ok_or_else(|| JoinError::TaskNotFound("no task is open".to_string()))?;
        self.session.set_edit_mode(EditMode::Editing(id));
        Ok(id)
    }

    /// Back to the read-only detail view
    pub fn end_edit(&mut self) {
        self.session.set_edit_mode(EditMode::Viewing);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::TaskDraft;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    async fn board_with(statuses: &[TaskStatus]) -> (BoardController<MemoryStore>, Vec<TaskId>) {
        let mut repo = TaskRepository::new(MemoryStore::new());
        let mut ids = Vec::new();
        for (i, status) in statuses.iter().enumerate() {
            let task = repo
                .create(
                    TaskDraft::new(format!("Task {i}"))
                        .with_due_date(NaiveDate::from_ymd_opt(2025, 1, 10).unwrap())
                        .with_category("Design")
                        .with_status(*status),
                )
                .await
                .unwrap();
            ids.push(task.id);
        }
        (BoardController::new(repo), ids)
    }

    #[tokio::test]
    async fn test_drop_on_same_column_is_noop() {
        let (mut board, ids) = board_with(&[TaskStatus::Todo]).await;
        let writes = board.repository().store().write_count();

        board.start_drag(ids[0]);
        board.drag_over(TaskStatus::Todo);
        let outcome = board.drop_on(TaskStatus::Todo).await.unwrap();

        assert_eq!(outcome, DropOutcome::Unchanged(ids[0]));
        assert_eq!(board.repository().store().write_count(), writes);
        assert!(!board.session().has_highlights());
    }

    #[tokio::test]
    async fn test_drop_may_skip_columns() {
        let (mut board, ids) = board_with(&[TaskStatus::Todo]).await;

        board.start_drag(ids[0]);
        let outcome = board.drop_on(TaskStatus::Done).await.unwrap();

        assert_eq!(
            outcome,
            DropOutcome::Moved {
                id: ids[0],
                from: TaskStatus::Todo,
                to: TaskStatus::Done
            }
        );

        // The mobile buttons still step one column at a time.
        assert_eq!(
            board.move_up(ids[0]).await.unwrap(),
            TaskStatus::AwaitingFeedback
        );
    }

    #[tokio::test]
    async fn test_drop_without_drag() {
        let (mut board, _) = board_with(&[]).await;
        board.drag_over(TaskStatus::Done);

        let outcome = board.drop_on(TaskStatus::Done).await.unwrap();

        assert_eq!(outcome, DropOutcome::NothingDragged);
        assert!(!board.session().has_highlights());
    }

    #[tokio::test]
    async fn test_drop_failure_still_clears_highlights() {
        let (mut board, ids) = board_with(&[TaskStatus::Todo]).await;
        board.repository().store().set_offline(true);

        board.start_drag(ids[0]);
        board.drag_over(TaskStatus::Done);
        assert!(board.drop_on(TaskStatus::Done).await.is_err());

        assert!(!board.session().has_highlights());
        assert_eq!(board.session().dragged(), None);
    }

    #[tokio::test]
    async fn test_drag_leave_uses_bounding_box() {
        let (mut board, _) = board_with(&[]).await;
        let column = Rect::new(0.0, 0.0, 200.0, 600.0);

        board.drag_over(TaskStatus::InProgress);
        board.drag_leave(TaskStatus::InProgress, column, Point::new(100.0, 300.0));
        assert!(board.session().is_highlighted(TaskStatus::InProgress));

        board.drag_leave(TaskStatus::InProgress, column, Point::new(250.0, 300.0));
        assert!(!board.session().is_highlighted(TaskStatus::InProgress));
    }

    #[tokio::test]
    async fn test_mobile_moves_respect_edges() {
        let (mut board, ids) = board_with(&[TaskStatus::Todo, TaskStatus::Done]).await;

        let err = board.move_up(ids[0]).await.unwrap_err();
        assert!(matches!(err, JoinError::InvalidStatusTransition { .. }));
        assert!(board.move_down(ids[1]).await.is_err());

        assert_eq!(board.move_down(ids[0]).await.unwrap(), TaskStatus::InProgress);
        assert_eq!(board.move_up(ids[1]).await.unwrap(), TaskStatus::AwaitingFeedback);
    }

    #[tokio::test]
    async fn test_set_status_skips_columns() {
        let (mut board, ids) = board_with(&[TaskStatus::Todo]).await;

        assert!(board.set_status(ids[0], TaskStatus::Done).await.unwrap());
        assert_eq!(
            board.repository().get(ids[0]).unwrap().status,
            TaskStatus::Done
        );
    }

    #[tokio::test]
    async fn test_open_detail_requires_task() {
        let (mut board, ids) = board_with(&[TaskStatus::Todo]).await;

        assert!(board.open_detail(TaskId::new(99)).is_err());
        board.open_detail(ids[0]).unwrap();
        assert_eq!(board.session().detail(), Some(ids[0]));

        board.close_detail();
        assert_eq!(board.session().detail(), None);
    }

    #[tokio::test]
    async fn test_edit_mode_follows_detail() {
        let (mut board, ids) = board_with(&[TaskStatus::Todo]).await;
        assert!(board.begin_edit().is_err());

        board.open_detail(ids[0]).unwrap();
        assert_eq!(board.begin_edit().unwrap(), ids[0]);
        assert_eq!(board.session().edit_mode(), EditMode::Editing(ids[0]));

        board.end_edit();
        assert_eq!(board.session().edit_mode(), EditMode::Viewing);

        board.begin_edit().unwrap();
        board.close_detail();
        assert_eq!(board.session().edit_mode(), EditMode::Viewing);
    }
}
