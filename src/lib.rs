//! # Join Board
//!
//! Board synchronization core for the Join kanban board.
//!
//! Keeps an in-memory list of task cards consistent with a Firebase Realtime
//! Database style JSON store across create, edit, move and delete, and
//! provides the drag-and-drop board controller, contacts, user login and the
//! view-models the UI renders.

pub mod config;
pub mod controller;
pub mod domain;
pub mod error;
pub mod repository;
pub mod store;
pub mod telemetry;
pub mod view;

// Re-export commonly used types
pub use config::JoinConfig;
pub use controller::{BoardController, DropOutcome};
pub use domain::{
    board::{BoardSession, Columns},
    contact::{Contact, NewContact},
    session::Session,
    task::{Priority, Task, TaskDraft, TaskId, TaskPatch, TaskStatus},
};
pub use error::{JoinError, Result};
pub use repository::{BoardEvent, ContactRepository, TaskRepository, UserDirectory};
pub use store::{HttpStore, MemoryStore, RemoteStore};
