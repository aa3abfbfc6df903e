//! Task repository: the board's authoritative in-memory task list, kept in
//! step with `tickets/ticket` in the remote store.
//!
//! Every mutation writes to the store first and only then updates memory and
//! notifies subscribers, so a failed write leaves the local view untouched.

use serde_json::{json, Value};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::domain::board::Columns;
use crate::domain::subtasks::{SubtaskId, SubtaskList};
use crate::domain::task::{Task, TaskDraft, TaskId, TaskPatch, TaskStatus};
use crate::error::{JoinError, Result};
use crate::store::{collection_entries, paths, RemoteStore};

const EVENT_CAPACITY: usize = 64;
const MAX_ALLOCATION_ATTEMPTS: u32 = 5;

/// Change notifications, sent after the remote write has completed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    Loaded { count: usize },
    Created(TaskId),
    Updated(TaskId),
    Moved {
        id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },
    Deleted(TaskId),
}

pub struct TaskRepository<S> {
    store: S,
    tasks: Vec<Task>,
    /// Highest id handed out by this repository
    last_issued: u64,
    events: broadcast::Sender<BoardEvent>,
}

fn logged<T>(operation: &'static str, result: Result<T>) -> Result<T> {
    if let Err(err) = &result {
        warn!(operation, error = %err, "Task operation failed");
    }
    result
}

/// Decodes one stored record, filling in the id from its key when the record
/// predates ids being stored inline.
fn decode_task(path: &str, id: TaskId, mut record: Value) -> Result<Task> {
    let Some(fields) = record.as_object_mut() else {
        return Err(JoinError::malformed(path, "task record is not an object"));
    };
    fields.entry("id").or_insert_with(|| json!(id.value()));

    let task: Task = serde_json::from_value(record).map_err(|err| JoinError::malformed(path, err))?;
    if task.id != id {
        return Err(JoinError::malformed(
            path,
            format!("record id {} does not match its key {}", task.id, id),
        ));
    }
    Ok(task)
}

fn decode_collection(value: Value) -> Result<Vec<Task>> {
    collection_entries(value)
        .into_iter()
        .map(|(key, record)| -> Result<Task> {
            let path = format!("{}/{}", paths::TICKETS, key);
            let id: TaskId = key
                .parse()
                .map_err(|_| JoinError::malformed(&path, "key is not a task id"))?;
            decode_task(&path, id, record)
        })
        .collect()
}

fn decode_counter(value: Option<Value>) -> Result<u64> {
    match value {
        None => Ok(0),
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| JoinError::malformed(paths::TICKET_COUNTER, "counter is not a non-negative integer")),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| JoinError::malformed(paths::TICKET_COUNTER, "counter is not a non-negative integer")),
        Some(other) => Err(JoinError::malformed(
            paths::TICKET_COUNTER,
            format!("unexpected counter value {}", other),
        )),
    }
}

impl<S: RemoteStore> TaskRepository<S> {
    pub fn new(store: S) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            tasks: Vec::new(),
            last_issued: 0,
            events,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Receives a [`BoardEvent`] for every change made through this repository
    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.events.subscribe()
    }

    /// Tasks currently held in memory, ordered by id
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn columns(&self) -> Columns<'_> {
        Columns::partition(&self.tasks)
    }

    /// Case-insensitive search over title, description and subtasks; a blank
    /// query matches everything.
    pub fn search(&self, query: &str) -> Vec<&Task> {
        let query = query.trim();
        self.tasks
            .iter()
            .filter(|t| query.is_empty() || t.matches(query))
            .collect()
    }

    fn emit(&self, event: BoardEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn require(&self, id: TaskId) -> Result<&Task> {
        self.get(id)
            .ok_or_else(|| JoinError::TaskNotFound(id.to_string()))
    }

    /// Replaces the in-memory list with the store's full task collection.
    pub async fn load_all(&mut self) -> Result<&[Task]> {
        let value = logged("load", self.store.read(paths::TICKETS).await)?;
        let mut tasks = match value {
            Some(value) => logged("load", decode_collection(value))?,
            None => Vec::new(),
        };
        tasks.sort_by_key(|t| t.id);

        let count = tasks.len();
        self.tasks = tasks;
        info!(count, "Loaded tasks");
        self.emit(BoardEvent::Loaded { count });
        Ok(&self.tasks)
    }

    /// Validates the draft, allocates the next id and stores the new task.
    pub async fn create(&mut self, draft: TaskDraft) -> Result<Task> {
        logged("create", draft.validate())?;
        let id = logged("create", self.allocate_id().await)?;
        let task = draft.into_task(id)?;

        let record = serde_json::to_value(&task)?;
        logged("create", self.store.write(&paths::ticket(id), &record).await)?;

        self.tasks.push(task.clone());
        self.tasks.sort_by_key(|t| t.id);
        info!(task_id = %id, status = task.status.as_str(), "Created task");
        self.emit(BoardEvent::Created(id));
        Ok(task)
    }

    /// Bumps `tickets/ticketCounter` with a compare-and-set and returns the new id.
    ///
    /// The next id is one past the largest of the stored counter, any id held
    /// in memory and any id this repository already issued, so ids keep
    /// increasing even if the counter was reset or lags behind the records.
    async fn allocate_id(&mut self) -> Result<TaskId> {
        let local_max = self
            .tasks
            .iter()
            .map(|t| t.id.value())
            .max()
            .unwrap_or(0)
            .max(self.last_issued);

        for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
            let (value, revision) = self.store.read_versioned(paths::TICKET_COUNTER).await?;
            let next = decode_counter(value)?.max(local_max) + 1;

            if self
                .store
                .write_if(paths::TICKET_COUNTER, &json!(next), &revision)
                .await?
            {
                self.last_issued = next;
                return Ok(TaskId::new(next));
            }
            debug!(attempt, "Ticket counter changed underneath us, retrying");
        }

        Err(JoinError::CounterContention {
            attempts: MAX_ALLOCATION_ATTEMPTS,
        })
    }

    /// Merges the set fields of `patch` into the stored record (read, merge,
    /// write back; last write wins) and refreshes the in-memory copy.
    pub async fn update(&mut self, id: TaskId, patch: TaskPatch) -> Result<Task> {
        logged("update", patch.validate())?;
        if patch.is_empty() {
            return self.require(id).cloned();
        }
        logged("update", self.merge_remote(id, &patch).await)
    }

    async fn merge_remote(&mut self, id: TaskId, patch: &TaskPatch) -> Result<Task> {
        let path = paths::ticket(id);
        let current = self
            .store
            .read(&path)
            .await?
            .ok_or_else(|| JoinError::TaskNotFound(id.to_string()))?;

        let Value::Object(mut record) = current else {
            return Err(JoinError::malformed(&path, "task record is not an object"));
        };
        if let Value::Object(fields) = serde_json::to_value(patch)? {
            record.extend(fields);
        }
        let merged = Value::Object(record);

        // Refuse to write back something that would no longer load.
        let task = decode_task(&path, id, merged.clone())?;
        self.store.write(&path, &merged).await?;

        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(slot) => *slot = task.clone(),
            None => {
                self.tasks.push(task.clone());
                self.tasks.sort_by_key(|t| t.id);
            }
        }
        info!(task_id = %id, "Updated task");
        self.emit(BoardEvent::Updated(id));
        Ok(task)
    }

    /// Changes only the task's status. Returns `false` without touching the
    /// store when the task is already in `status`.
    pub async fn move_task(&mut self, id: TaskId, status: TaskStatus) -> Result<bool> {
        let from = logged("move", self.require(id))?.status;
        if from == status {
            debug!(task_id = %id, status = status.as_str(), "Task already in target column");
            return Ok(false);
        }

        let value = serde_json::to_value(status)?;
        logged("move", self.store.write(&paths::ticket_status(id), &value).await)?;

        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
            task.status = status;
        }
        info!(task_id = %id, from = from.as_str(), to = status.as_str(), "Moved task");
        self.emit(BoardEvent::Moved { id, from, to: status });
        Ok(true)
    }

    /// Removes the task from the store and from memory.
    pub async fn delete(&mut self, id: TaskId) -> Result<()> {
        logged("delete", self.require(id))?;
        logged("delete", self.store.delete(&paths::ticket(id)).await)?;

        self.tasks.retain(|t| t.id != id);
        info!(task_id = %id, "Deleted task");
        self.emit(BoardEvent::Deleted(id));
        Ok(())
    }

    /// Flips a subtask's `done` flag and stores the task's subtask list.
    pub async fn toggle_subtask(&mut self, id: TaskId, subtask: SubtaskId) -> Result<bool> {
        let task = logged("toggle_subtask", self.require(id))?;
        let mut list = SubtaskList::from_vec(task.subtasks.clone());
        let done = logged("toggle_subtask", list.toggle(subtask))?;

        let patch = TaskPatch {
            subtasks: Some(list.into_vec()),
            ..TaskPatch::default()
        };
        self.update(id, patch).await?;
        Ok(done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::Priority;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn draft(title: &str) -> TaskDraft {
        TaskDraft::new(title)
            .with_due_date(NaiveDate::from_ymd_opt(2025, 1, 10).unwrap())
            .with_priority(Priority::Urgent)
            .with_category("Technical Task")
    }

    #[test]
    fn test_decode_counter() {
        assert_eq!(decode_counter(None).unwrap(), 0);
        assert_eq!(decode_counter(Some(json!(7))).unwrap(), 7);
        assert_eq!(decode_counter(Some(json!("12"))).unwrap(), 12);
        assert!(decode_counter(Some(json!(-1))).is_err());
        assert!(decode_counter(Some(json!({"n": 1}))).is_err());
    }

    #[test]
    fn test_decode_task_fills_missing_id() {
        let record = json!({
            "title": "Legacy",
            "dueDate": "2024-02-01",
            "priority": "low",
            "category": "User Story",
            "status": "todo"
        });
        let task = decode_task("tickets/ticket/9", TaskId::new(9), record).unwrap();
        assert_eq!(task.id, TaskId::new(9));
    }

    #[test]
    fn test_decode_task_rejects_mismatched_id() {
        let record = json!({
            "id": 3,
            "title": "Moved",
            "dueDate": "2024-02-01",
            "priority": "low",
            "category": "User Story",
            "status": "todo"
        });
        assert!(decode_task("tickets/ticket/9", TaskId::new(9), record).is_err());
    }

    #[tokio::test]
    async fn test_create_bumps_counter() {
        let mut repo = TaskRepository::new(MemoryStore::new());

        let first = repo.create(draft("First")).await.unwrap();
        let second = repo.create(draft("Second")).await.unwrap();

        assert_eq!(first.id, TaskId::new(1));
        assert_eq!(second.id, TaskId::new(2));
        assert_eq!(
            repo.store().read(paths::TICKET_COUNTER).await.unwrap(),
            Some(json!(2))
        );
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_draft_without_writing() {
        let mut repo = TaskRepository::new(MemoryStore::new());

        let err = repo.create(TaskDraft::new("No date")).await.unwrap_err();

        assert!(matches!(err, JoinError::Validation(_)));
        assert_eq!(repo.store().write_count(), 0);
        assert!(repo.tasks().is_empty());
    }

    #[tokio::test]
    async fn test_counter_behind_records_does_not_reuse_ids() {
        let store = MemoryStore::with_data(json!({
            "tickets": {
                "ticketCounter": 1,
                "ticket": {"5": {
                    "id": 5, "title": "Old", "dueDate": "2024-01-01",
                    "priority": "low", "category": "User Story", "status": "done"
                }}
            }
        }));
        let mut repo = TaskRepository::new(store);
        repo.load_all().await.unwrap();

        let task = repo.create(draft("New")).await.unwrap();
        assert_eq!(task.id, TaskId::new(6));
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let mut repo = TaskRepository::new(MemoryStore::new());
        let task = repo
            .create(draft("Original").with_description("keep me"))
            .await
            .unwrap();

        let patch = TaskPatch {
            title: Some("Renamed".to_string()),
            ..TaskPatch::default()
        };
        let updated = repo.update(task.id, patch).await.unwrap();

        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.description, "keep me");
        assert_eq!(repo.get(task.id).unwrap().title, "Renamed");

        let stored = repo.store().read(&paths::ticket(task.id)).await.unwrap().unwrap();
        assert_eq!(stored["title"], "Renamed");
        assert_eq!(stored["description"], "keep me");
    }

    #[tokio::test]
    async fn test_update_missing_task() {
        let mut repo = TaskRepository::new(MemoryStore::new());
        let patch = TaskPatch {
            title: Some("Ghost".to_string()),
            ..TaskPatch::default()
        };

        let err = repo.update(TaskId::new(42), patch).await.unwrap_err();
        assert!(matches!(err, JoinError::TaskNotFound(_)));
    }

    #[tokio::test]
    async fn test_empty_patch_writes_nothing() {
        let mut repo = TaskRepository::new(MemoryStore::new());
        let task = repo.create(draft("Same")).await.unwrap();
        let writes = repo.store().write_count();

        let unchanged = repo.update(task.id, TaskPatch::default()).await.unwrap();

        assert_eq!(unchanged, task);
        assert_eq!(repo.store().write_count(), writes);
    }

    #[tokio::test]
    async fn test_move_writes_only_status() {
        let mut repo = TaskRepository::new(MemoryStore::new());
        let task = repo.create(draft("Move me")).await.unwrap();

        assert!(repo.move_task(task.id, TaskStatus::Done).await.unwrap());

        let stored = repo.store().read(&paths::ticket(task.id)).await.unwrap().unwrap();
        assert_eq!(stored["status"], "done");
        assert_eq!(stored["title"], "Move me");
        assert_eq!(repo.get(task.id).unwrap().status, TaskStatus::Done);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_memory_untouched() {
        let mut repo = TaskRepository::new(MemoryStore::new());
        let task = repo.create(draft("Sticky")).await.unwrap();

        repo.store().set_offline(true);
        assert!(repo.move_task(task.id, TaskStatus::Done).await.is_err());
        assert!(repo.delete(task.id).await.is_err());

        assert_eq!(repo.get(task.id).unwrap().status, TaskStatus::Todo);
    }

    #[tokio::test]
    async fn test_toggle_subtask() {
        let mut repo = TaskRepository::new(MemoryStore::new());
        let mut d = draft("With subtasks");
        let sub = d.subtasks.push("check").unwrap();
        let task = repo.create(d).await.unwrap();

        assert!(repo.toggle_subtask(task.id, sub).await.unwrap());
        assert_eq!(repo.get(task.id).unwrap().subtask_progress(), (1, 1));

        assert!(!repo.toggle_subtask(task.id, sub).await.unwrap());
        assert_eq!(repo.get(task.id).unwrap().subtask_progress(), (0, 1));
    }

    #[tokio::test]
    async fn test_events_follow_mutations() {
        let mut repo = TaskRepository::new(MemoryStore::new());
        let mut events = repo.subscribe();

        let task = repo.create(draft("Observed")).await.unwrap();
        repo.move_task(task.id, TaskStatus::InProgress).await.unwrap();
        repo.move_task(task.id, TaskStatus::InProgress).await.unwrap();
        repo.delete(task.id).await.unwrap();

        assert_eq!(events.recv().await.unwrap(), BoardEvent::Created(task.id));
        assert_eq!(
            events.recv().await.unwrap(),
            BoardEvent::Moved {
                id: task.id,
                from: TaskStatus::Todo,
                to: TaskStatus::InProgress
            }
        );
        // The no-op move sends nothing.
        assert_eq!(events.recv().await.unwrap(), BoardEvent::Deleted(task.id));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_search() {
        let mut repo = TaskRepository::new(MemoryStore::new());
        repo.create(draft("Kochwelt page")).await.unwrap();
        repo.create(draft("Contact form").with_description("Build the form"))
            .await
            .unwrap();

        assert_eq!(repo.search("form").len(), 1);
        assert_eq!(repo.search("KOCHWELT").len(), 1);
        assert_eq!(repo.search("  ").len(), 2);
        assert!(repo.search("nothing").is_empty());
    }
}
