pub mod contacts;
pub mod tasks;
pub mod users;

pub use contacts::ContactRepository;
pub use tasks::{BoardEvent, TaskRepository};
pub use users::{UserAccount, UserDirectory};
